use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::domain::{DATE_FORMAT, Instant, format_instant};
use crate::error::CoregError;
use crate::naming::FilenameParser;
use crate::store::write_atomic;

pub const MODIS_COLUMN: &str = "MODIS";
pub const MSG_COLUMN: &str = "MSG";
pub const MODIS_CLOUD_MASK_COLUMN: &str = "MODIS_cloudmask";
pub const MSG_CLOUD_MASK_COLUMN: &str = "MSG_cloudmask";

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestRow {
    /// MODIS overpass instant the MSG scan was requested for.
    pub modis: Instant,
    /// Acquisition instant of the MSG scan actually downloaded.
    pub msg: Instant,
    pub cloud_mask: Option<(Instant, Instant)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub rows: Vec<ManifestRow>,
    /// Why cloud-mask columns were left out, when they were requested but could not be paired.
    pub cloud_mask_skipped: Option<String>,
}

impl Manifest {
    pub fn has_cloud_mask(&self) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|row| row.cloud_mask.is_some())
    }

    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec![MODIS_COLUMN, MSG_COLUMN];
        if self.has_cloud_mask() {
            columns.push(MODIS_CLOUD_MASK_COLUMN);
            columns.push(MSG_CLOUD_MASK_COLUMN);
        }
        columns
    }

    pub fn records(&self) -> Vec<Vec<String>> {
        let with_cloud_mask = self.has_cloud_mask();
        self.rows
            .iter()
            .map(|row| {
                let mut record = vec![format_instant(&row.modis), format_instant(&row.msg)];
                if with_cloud_mask {
                    if let Some((modis, msg)) = &row.cloud_mask {
                        record.push(format_instant(modis));
                        record.push(format_instant(msg));
                    }
                }
                record
            })
            .collect()
    }

    /// Writes the manifest as CSV, replacing any file already at `path`.
    pub fn write(&self, path: &Path) -> Result<(), CoregError> {
        write_atomic(path, |file| {
            let mut writer = csv::Writer::from_writer(file);
            writer
                .write_record(self.columns())
                .map_err(|err| CoregError::ManifestWrite(err.to_string()))?;
            for record in self.records() {
                writer
                    .write_record(&record)
                    .map_err(|err| CoregError::ManifestWrite(err.to_string()))?;
            }
            writer
                .flush()
                .map_err(|err| CoregError::ManifestWrite(err.to_string()))
        })?;
        info!(path = %path.display(), rows = self.rows.len(), "manifest written");
        Ok(())
    }
}

/// `msg-<product>-timestamps_<start_date>_<end_date>.csv`
pub fn manifest_file_name(product: &str, start_date: NaiveDate, end_date: NaiveDate) -> String {
    format!(
        "msg-{product}-timestamps_{}_{}.csv",
        start_date.format(DATE_FORMAT),
        end_date.format(DATE_FORMAT)
    )
}

/// Cloud-mask downloads paired with the instants that produced them.
#[derive(Debug, Clone, Copy)]
pub struct CloudMaskInputs<'a> {
    pub files: &'a [PathBuf],
    pub queries: &'a [Instant],
}

pub struct ManifestBuilder<P: FilenameParser> {
    parser: P,
}

impl<P: FilenameParser> ManifestBuilder<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    /// Pairs MODIS overpasses with the MSG scans downloaded for them.
    ///
    /// Returns `Ok(None)` when no MSG file was produced. A base file/query count mismatch
    /// is an error; a cloud-mask mismatch only drops the cloud-mask columns.
    pub fn build(
        &self,
        modis_query_timestamps: &[Instant],
        msg_files: &[PathBuf],
        msg_queries: &[Instant],
        cloud_mask: Option<CloudMaskInputs<'_>>,
    ) -> Result<Option<Manifest>, CoregError> {
        check_pairing("MSG base", msg_files, msg_queries)?;
        if msg_files.is_empty() {
            info!("no MSG files downloaded, skipping manifest");
            return Ok(None);
        }
        if msg_files.len() != modis_query_timestamps.len() {
            warn!(
                overpasses = modis_query_timestamps.len(),
                matched = msg_files.len(),
                "not every MODIS overpass has an MSG scan"
            );
        }

        let realized = self.acquisition_instants(msg_files)?;
        let mut rows: Vec<ManifestRow> = msg_queries
            .iter()
            .zip(realized)
            .map(|(modis, msg)| ManifestRow {
                modis: *modis,
                msg,
                cloud_mask: None,
            })
            .collect();

        let mut cloud_mask_skipped = None;
        if let Some(inputs) = cloud_mask {
            match self.cloud_mask_pairs(inputs, msg_queries) {
                Ok(pairs) => {
                    for (row, pair) in rows.iter_mut().zip(pairs) {
                        row.cloud_mask = Some(pair);
                    }
                }
                Err(err) => {
                    error!("could not add cloud mask timestamps to manifest: {err}");
                    cloud_mask_skipped = Some(err.to_string());
                }
            }
        }

        Ok(Some(Manifest {
            rows,
            cloud_mask_skipped,
        }))
    }

    /// Cloud-mask pairs keyed by the overpass each base row was matched for, in base row
    /// order. Every base row needs a cloud-mask scan for the same overpass.
    fn cloud_mask_pairs(
        &self,
        inputs: CloudMaskInputs<'_>,
        base_queries: &[Instant],
    ) -> Result<Vec<(Instant, Instant)>, CoregError> {
        check_pairing("MSG cloud mask", inputs.files, inputs.queries)?;
        let realized = self.acquisition_instants(inputs.files)?;
        let pairs: Vec<(Instant, Instant)> = base_queries
            .iter()
            .filter_map(|modis| {
                inputs
                    .queries
                    .iter()
                    .position(|query| query == modis)
                    .map(|idx| (*modis, realized[idx]))
            })
            .collect();
        if pairs.len() != base_queries.len() {
            return Err(CoregError::Reconciliation {
                product: "MSG cloud mask against base manifest".to_string(),
                files: pairs.len(),
                queries: base_queries.len(),
            });
        }
        Ok(pairs)
    }

    fn acquisition_instants(&self, files: &[PathBuf]) -> Result<Vec<Instant>, CoregError> {
        files
            .iter()
            .map(|file| self.parser.acquisition_instant(file))
            .collect()
    }
}

fn check_pairing(product: &str, files: &[PathBuf], queries: &[Instant]) -> Result<(), CoregError> {
    if files.len() == queries.len() {
        return Ok(());
    }
    Err(CoregError::Reconciliation {
        product: product.to_string(),
        files: files.len(),
        queries: queries.len(),
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::NaiveDateTime;

    use super::*;
    use crate::naming::MsgFileNames;

    fn instant(s: &str) -> Instant {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn base_mismatch_is_fatal() {
        let builder = ManifestBuilder::new(MsgFileNames);
        let files = vec![PathBuf::from(
            "MSG4-SEVI-MSG15-0100-NA-20230601123743.664000000Z-NA.nat",
        )];
        let queries = vec![instant("2023-06-01 12:35:00"), instant("2023-06-02 12:35:00")];

        let err = builder.build(&queries, &files, &queries, None).unwrap_err();
        assert_matches!(err, CoregError::Reconciliation { files: 1, queries: 2, .. });
    }

    #[test]
    fn no_files_is_a_no_op() {
        let builder = ManifestBuilder::new(MsgFileNames);
        let overpasses = vec![instant("2023-06-01 12:35:00")];
        let manifest = builder.build(&overpasses, &[], &[], None).unwrap();
        assert!(manifest.is_none());
    }

    #[test]
    fn cloud_mask_follows_overpass_not_position() {
        let builder = ManifestBuilder::new(MsgFileNames);
        let overpasses = vec![
            instant("2023-06-01 12:35:00"),
            instant("2023-06-02 11:40:00"),
            instant("2023-06-03 12:20:00"),
        ];
        let base_files = vec![
            PathBuf::from("MSG4-SEVI-MSG15-0100-NA-20230601123743.664000000Z-NA.nat"),
            PathBuf::from("MSG4-SEVI-MSG15-0100-NA-20230603122243.664000000Z-NA.nat"),
        ];
        let base_queries = vec![overpasses[0], overpasses[2]];
        let cm_files = vec![
            PathBuf::from("MSG4-SEVI-MSGCLMK-0100-0100-20230601124500.000000000Z-NA.grb"),
            PathBuf::from("MSG4-SEVI-MSGCLMK-0100-0100-20230602114500.000000000Z-NA.grb"),
        ];
        let cm_queries = vec![overpasses[0], overpasses[1]];

        let manifest = builder
            .build(
                &overpasses,
                &base_files,
                &base_queries,
                Some(CloudMaskInputs {
                    files: &cm_files,
                    queries: &cm_queries,
                }),
            )
            .unwrap()
            .unwrap();

        assert_eq!(manifest.rows.len(), 2);
        assert!(!manifest.has_cloud_mask());
        assert!(manifest.cloud_mask_skipped.is_some());
        assert_eq!(manifest.columns(), vec![MODIS_COLUMN, MSG_COLUMN]);
    }

    #[test]
    fn cloud_mask_pairs_reorder_to_base_rows() {
        let builder = ManifestBuilder::new(MsgFileNames);
        let overpasses = vec![instant("2023-06-01 12:35:00"), instant("2023-06-02 11:40:00")];
        let base_files = vec![
            PathBuf::from("MSG4-SEVI-MSG15-0100-NA-20230601123743.664000000Z-NA.nat"),
            PathBuf::from("MSG4-SEVI-MSG15-0100-NA-20230602114243.664000000Z-NA.nat"),
        ];
        let cm_files = vec![
            PathBuf::from("MSG4-SEVI-MSGCLMK-0100-0100-20230602114500.000000000Z-NA.grb"),
            PathBuf::from("MSG4-SEVI-MSGCLMK-0100-0100-20230601123000.000000000Z-NA.grb"),
        ];
        let cm_queries = vec![overpasses[1], overpasses[0]];

        let manifest = builder
            .build(
                &overpasses,
                &base_files,
                &overpasses,
                Some(CloudMaskInputs {
                    files: &cm_files,
                    queries: &cm_queries,
                }),
            )
            .unwrap()
            .unwrap();

        assert!(manifest.has_cloud_mask());
        for row in &manifest.rows {
            let (cm_modis, _) = row.cloud_mask.unwrap();
            assert_eq!(cm_modis, row.modis);
        }
        assert_eq!(
            manifest.rows[0].cloud_mask,
            Some((overpasses[0], instant("2023-06-01 12:30:00")))
        );
    }

    #[test]
    fn file_name_uses_product_and_dates() {
        let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 9, 30).unwrap();
        assert_eq!(
            manifest_file_name("MYD021KM", start, end),
            "msg-MYD021KM-timestamps_2023-06-01_2023-09-30.csv"
        );
    }
}
