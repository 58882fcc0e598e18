use std::fs;

use assert_matches::assert_matches;

use modis_msg_coreg::config::{ConfigLoader, ConfigOverrides};
use modis_msg_coreg::domain::BoundingBox;
use modis_msg_coreg::error::CoregError;

#[test]
fn file_values_and_overrides_resolve_together() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("run.json");
    fs::write(
        &path,
        r#"{
            "product": "MOD021KM",
            "start_date": "2023-07-01",
            "end_date": "2023-07-15",
            "bounding_box": [0.0, 10.0, 20.0, 30.0],
            "save_dir": "/data/coreg"
        }"#,
    )
    .unwrap();

    let overrides = ConfigOverrides {
        end_date: Some("2023-07-02".to_string()),
        fire_mask: Some(true),
        ..Default::default()
    };
    let resolved = ConfigLoader::resolve(path.to_str(), overrides).unwrap();

    assert_eq!(resolved.product, "MOD021KM");
    assert_eq!(resolved.window.end_date().to_string(), "2023-07-02");
    assert_eq!(resolved.bbox, BoundingBox::new(0.0, 10.0, 20.0, 30.0).unwrap());
    assert_eq!(resolved.save_dir.as_str(), "/data/coreg");
    assert!(resolved.cloud_mask);
    assert!(resolved.fire_mask);
    assert!(
        resolved
            .store()
            .manifest_path(&resolved.product, &resolved.window)
            .ends_with("msg-MOD021KM-timestamps_2023-07-01_2023-07-02.csv")
    );
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()),
        Err(CoregError::ConfigRead(_))
    );
}

#[test]
fn unknown_keys_are_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("run.json");
    fs::write(&path, r#"{"prodcut": "MYD021KM"}"#).unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str(), ConfigOverrides::default()),
        Err(CoregError::ConfigParse(_))
    );
}
