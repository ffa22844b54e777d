//! Registry error-message, atomic-write-safety, and workbench integration tests.
//! Storage: ~/.workshop/workshops/<workshop>.yaml

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use std::fs;
use std::path::PathBuf;
use workshop_core::{registry, types::Workshop, RegistryError, WorkshopName};

fn shop() -> WorkshopName {
    WorkshopName::from("forge")
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_workshop_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = registry::load_workshop_at(home.path(), &shop()).unwrap_err();
    assert!(matches!(err, RegistryError::WorkshopNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("workshop not found"));
    assert!(err.to_string().contains("forge.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let dir = home.path().join(".workshop").join("workshops");
    fs::create_dir_all(&dir).expect("mkdir");
    fs::write(dir.join("forge.yaml"), b": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = registry::load_workshop_at(home.path(), &shop()).unwrap_err();
    assert!(matches!(err, RegistryError::Parse { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("forge.yaml"), "must contain file path, got: {msg}");
}

#[test]
fn list_fails_loudly_on_one_corrupt_file() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    registry::init_at(home.path(), shop()).expect("init");
    home.child(".workshop/workshops/broken.yaml")
        .write_str("- this is a list, not a mapping\n")
        .expect("write");

    let err = registry::list_workshops_at(home.path()).unwrap_err();
    assert!(matches!(err, RegistryError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("broken.yaml"));
}

// ---------------------------------------------------------------------------
// 2. Atomic write safety
// ---------------------------------------------------------------------------

#[test]
fn mid_write_crash_leaves_original_intact() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    registry::save_workshop_at(home.path(), &Workshop::new(shop())).expect("save");

    let yaml_path = registry::workshop_path_at(home.path(), &shop());
    let original_bytes = fs::read(&yaml_path).expect("read original");

    // Simulate crash: .tmp written but process died before rename
    let tmp = yaml_path.with_file_name("forge.yaml.tmp");
    fs::write(&tmp, b"CRASH - INCOMPLETE WRITE").expect("write crash tmp");

    let current_bytes = fs::read(&yaml_path).expect("read after crash");
    assert_eq!(original_bytes, current_bytes, "original must be unchanged after crash");

    // Orphaned .tmp files are not workshops.
    let list = registry::list_workshops_at(home.path()).expect("list");
    assert_eq!(list.len(), 1);
}

// ---------------------------------------------------------------------------
// 3. Init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_workshop_yaml() {
    let home = assert_fs::TempDir::new().expect("home tempdir");
    let workshop = registry::init_at(home.path(), shop()).expect("init");

    home.child(".workshop/workshops/forge.yaml")
        .assert(predicate::path::exists());

    let yaml_path = registry::workshop_path_at(home.path(), &shop());
    let contents = fs::read_to_string(&yaml_path).expect("read");
    let loaded: Workshop = serde_yaml::from_str(&contents).expect("roundtrip");
    assert_eq!(loaded.id, workshop.id);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&yaml_path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "expected 0600, got {mode:o}");
    }
}

#[test]
fn init_is_idempotent() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let first = registry::init_at(home.path(), shop()).expect("first init");
    let second = registry::init_at(home.path(), shop()).expect("second init");

    // Same id: the second call loads instead of regenerating.
    assert_eq!(first.id, second.id);
    assert_eq!(registry::list_workshops_at(home.path()).expect("list").len(), 1);
}

#[test]
fn init_rejects_reserved_names() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = registry::init_at(home.path(), WorkshopName::from("a:b")).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidName { .. }), "got: {err}");
    home.child(".workshop/workshops").assert(predicate::path::missing());
}

// ---------------------------------------------------------------------------
// 4. Workbenches and list
// ---------------------------------------------------------------------------

#[test]
fn add_workbench_appends_in_order() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    registry::init_at(home.path(), shop()).expect("init");

    let api = registry::add_workbench_at(home.path(), &shop(), "api", PathBuf::from("/code/api"))
        .expect("add api");
    registry::add_workbench_at(home.path(), &shop(), "web", PathBuf::from("/code/web"))
        .expect("add web");

    let loaded = registry::load_workshop_at(home.path(), &shop()).expect("load");
    let desired = loaded.desired_workbenches();
    assert_eq!(desired.len(), 2);
    assert_eq!(desired[0].name, "api");
    assert_eq!(desired[0].id, api.id);
    assert_eq!(desired[1].path, PathBuf::from("/code/web"));
}

#[test]
fn add_duplicate_workbench_errors() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    registry::init_at(home.path(), shop()).expect("init");
    registry::add_workbench_at(home.path(), &shop(), "api", PathBuf::from("/a")).expect("add");

    let err = registry::add_workbench_at(home.path(), &shop(), "api", PathBuf::from("/b"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateWorkbench { .. }), "got: {err}");
}

#[test]
fn add_workbench_to_missing_workshop_errors() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = registry::add_workbench_at(home.path(), &shop(), "api", PathBuf::from("/a"))
        .unwrap_err();
    assert!(matches!(err, RegistryError::WorkshopNotFound { .. }));
}

#[test]
fn list_is_sorted_and_deterministic() {
    let home = assert_fs::TempDir::new().expect("tempdir");

    // Register beta before alpha intentionally
    registry::init_at(home.path(), WorkshopName::from("beta")).expect("beta");
    registry::init_at(home.path(), WorkshopName::from("alpha")).expect("alpha");

    let list = registry::list_workshops_at(home.path()).expect("list");
    let names: Vec<&str> = list.iter().map(|w| w.name.0.as_str()).collect();
    assert_eq!(names, ["alpha", "beta"]);
}
