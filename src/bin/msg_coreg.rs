use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use modis_msg_coreg::app::{App, AuthResult};
use modis_msg_coreg::catalog::Session;
use modis_msg_coreg::cmr::{CmrHttpClient, EarthdataSession};
use modis_msg_coreg::config::{ConfigLoader, ConfigOverrides};
use modis_msg_coreg::domain::BoundingBox;
use modis_msg_coreg::error::CoregError;
use modis_msg_coreg::eumetsat::{EumetsatCredentials, EumetsatHttpClient};
use modis_msg_coreg::output::{JsonOutput, LogSink, print_summary};

#[derive(Parser)]
#[command(name = "msg-coreg")]
#[command(
    about = "Download MODIS overpasses with the nearest MSG/SEVIRI scans and pair their timestamps"
)]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run one co-registration over a region and period")]
    Run(RunArgs),
    #[command(about = "Report whether an Earthdata session is available")]
    CheckAuth(CheckAuthArgs),
}

#[derive(Args)]
struct RunArgs {
    /// JSON run configuration (default: msg-coreg.json if present)
    #[arg(long)]
    config: Option<String>,

    /// MODIS short name, e.g. MYD021KM (Aqua) or MOD021KM (Terra)
    #[arg(long)]
    product: Option<String>,

    #[arg(long)]
    start_date: Option<String>,

    #[arg(long)]
    end_date: Option<String>,

    #[arg(long)]
    start_time: Option<String>,

    #[arg(long)]
    end_time: Option<String>,

    /// "min_lon min_lat max_lon max_lat"
    #[arg(long, allow_hyphen_values = true)]
    bbox: Option<BoundingBox>,

    #[arg(long)]
    save_dir: Option<String>,

    #[arg(long)]
    no_cloud_mask: bool,

    #[arg(long)]
    fire_mask: bool,

    /// Print the run report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CheckAuthArgs {
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(coreg) = report.downcast_ref::<CoregError>() {
            return ExitCode::from(map_exit_code(coreg));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CoregError) -> u8 {
    match error {
        CoregError::Authentication
        | CoregError::MissingCredentials(_)
        | CoregError::UnknownProduct(_)
        | CoregError::UnsupportedProduct { .. }
        | CoregError::InvalidBoundingBox(_)
        | CoregError::InvalidDate(_)
        | CoregError::InvalidTime(_)
        | CoregError::InvalidWindow(_)
        | CoregError::ConfigRead(_)
        | CoregError::ConfigParse(_) => 2,
        CoregError::CmrHttp(_)
        | CoregError::CmrStatus { .. }
        | CoregError::EumetsatHttp(_)
        | CoregError::EumetsatStatus { .. } => 3,
        CoregError::Reconciliation { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run_coregistration(args),
        Commands::CheckAuth(args) => check_auth(args),
    }
}

fn run_coregistration(args: RunArgs) -> miette::Result<()> {
    let overrides = ConfigOverrides {
        product: args.product,
        start_date: args.start_date,
        end_date: args.end_date,
        start_time: args.start_time,
        end_time: args.end_time,
        bounding_box: args.bbox,
        save_dir: args.save_dir,
        cloud_mask: args.no_cloud_mask.then_some(false),
        fire_mask: args.fire_mask.then_some(true),
    };
    let config = ConfigLoader::resolve(args.config.as_deref(), overrides)?;

    let session = EarthdataSession::from_env();
    let cmr = CmrHttpClient::new(&session)?;
    let eumetsat = EumetsatHttpClient::new(EumetsatCredentials::from_env()?)?;
    let app = App::new(session, cmr.clone(), cmr, eumetsat);

    if args.json {
        let report = app.run(&config, &JsonOutput)?;
        JsonOutput::print_report(&report).into_diagnostic()?;
    } else {
        let report = app.run(&config, &LogSink)?;
        print_summary(&report).into_diagnostic()?;
    }
    Ok(())
}

fn check_auth(args: CheckAuthArgs) -> miette::Result<()> {
    let session = EarthdataSession::from_env();
    let result = AuthResult {
        authenticated: session.authenticated(),
        method: session.method().map(str::to_string),
    };
    if args.json {
        JsonOutput::print_auth(&result).into_diagnostic()?;
    } else if let Some(method) = &result.method {
        println!("Earthdata session available ({method})");
    }
    if !result.authenticated {
        return Err(CoregError::Authentication.into());
    }
    Ok(())
}
