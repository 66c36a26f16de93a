//! API key file storage tests

use deconz_exporter::error::ExporterError;
use deconz_exporter::pairing::{FileKeyStore, KeyStore};
use secrecy::{ExposeSecret, SecretString};
use std::fs;

#[test]
fn test_stored_key_loads_back_identically() {
    // Given: An empty key directory
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileKeyStore::new(dir.path()).expect("open store");

    // When: Storing and loading a key
    store
        .store("00212EFFFF012345", &SecretString::from("83B7780291"))
        .expect("store failed");
    let loaded = store.load("00212EFFFF012345").expect("load failed");

    // Then: The same key comes back, and the file holds only the raw key
    assert_eq!(loaded.expect("key missing").expose_secret(), "83B7780291");
    let raw = fs::read_to_string(dir.path().join("00212EFFFF012345")).expect("read file");
    assert_eq!(raw, "83B7780291");
}

#[test]
fn test_missing_key_loads_as_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileKeyStore::new(dir.path()).expect("open store");

    assert!(store.load("00212EFFFF099999").expect("load failed").is_none());
}

#[test]
fn test_directory_is_created_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let nested = dir.path().join("state").join("api_keys");

    let store = FileKeyStore::new(&nested).expect("open store");

    assert!(nested.is_dir());
    assert_eq!(store.directory(), nested.as_path());
}

#[test]
fn test_trailing_newline_is_ignored() {
    // Given: A key file written by hand with a trailing newline
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("gw1"), "HANDWRITTEN\n").expect("write file");
    let store = FileKeyStore::new(dir.path()).expect("open store");

    // Then: The newline is not part of the key
    let key = store.load("gw1").expect("load failed").expect("key missing");
    assert_eq!(key.expose_secret(), "HANDWRITTEN");
}

#[test]
fn test_empty_key_file_counts_as_unpaired() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("gw1"), "").expect("write file");
    let store = FileKeyStore::new(dir.path()).expect("open store");

    assert!(store.load("gw1").expect("load failed").is_none());
}

#[test]
fn test_store_replaces_previous_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileKeyStore::new(dir.path()).expect("open store");

    store.store("gw1", &SecretString::from("OLD")).expect("store");
    store.store("gw1", &SecretString::from("NEW")).expect("store");

    let key = store.load("gw1").expect("load failed").expect("key missing");
    assert_eq!(key.expose_secret(), "NEW");
}

#[test]
fn test_path_like_gateway_ids_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileKeyStore::new(dir.path()).expect("open store");

    for id in ["", ".", "..", "../escape", "a/b", "a\\b"] {
        let err = store.load(id).expect_err("id should be rejected");
        assert!(
            matches!(err, ExporterError::InvalidGatewayId(_)),
            "unexpected error for {:?}: {}",
            id,
            err
        );
        assert!(store.store(id, &SecretString::from("KEY")).is_err());
    }
}

#[cfg(unix)]
#[test]
fn test_key_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileKeyStore::new(dir.path()).expect("open store");
    store.store("gw1", &SecretString::from("KEY")).expect("store");

    let mode = fs::metadata(dir.path().join("gw1"))
        .expect("metadata")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[cfg(unix)]
#[test]
fn test_existing_world_readable_key_file_is_tightened() {
    use std::os::unix::fs::PermissionsExt;

    // Given: A key file left readable by everyone
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gw1");
    fs::write(&path, "OLD-KEY").expect("seed key file");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");
    let store = FileKeyStore::new(dir.path()).expect("open store");

    // When: A new key is stored over it
    store.store("gw1", &SecretString::from("NEW-KEY")).expect("store");

    // Then: The file is owner-only and holds just the new key
    let mode = fs::metadata(&path).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(fs::read_to_string(&path).expect("read"), "NEW-KEY");
}
