use std::fs;

use camino::Utf8PathBuf;

use modis_msg_coreg::domain::{GeoProduct, PolarProduct};
use modis_msg_coreg::store::{Store, write_atomic};

#[test]
fn product_directories_nest_under_platform() {
    let store = Store::new("/data/fire");
    assert!(store.polar_product_dir(PolarProduct::Base).ends_with("modis/L1b"));
    assert!(store.polar_product_dir(PolarProduct::FireMask).ends_with("modis/FM"));
    assert!(store.geo_product_dir(GeoProduct::CloudMask).ends_with("msg/CM"));
    assert!(store.msg_dir().starts_with(store.root()));
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let store = Store::new(root);
    let path = store.root().join("out.csv");
    fs::write(path.as_std_path(), "old,contents\n").unwrap();

    write_atomic(path.as_std_path(), |file| {
        use std::io::Write;
        file.write_all(b"MODIS,MSG\n")
            .map_err(|err| modis_msg_coreg::error::CoregError::Filesystem(err.to_string()))
    })
    .unwrap();

    assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "MODIS,MSG\n");
    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);
}
