//! Per-workshop YAML registry.
//!
//! # Storage layout
//!
//! ```text
//! ~/.workshop/
//!   config.yaml             (optional settings, see `config`)
//!   workshops/
//!     <workshop_name>.yaml  (one file per workshop, mode 0600)
//! ```
//!
//! # API pattern
//!
//! Every function takes the home directory explicitly (`fn_at(home: &Path, …)`)
//! so tests can point it at a `TempDir`. Binaries resolve the real one once
//! with [`home`].

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::RegistryError;
use crate::types::{validate_name, Workbench, WorkbenchId, Workshop, WorkshopName};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.workshop/`
pub fn workshop_root(home: &Path) -> PathBuf {
    home.join(".workshop")
}

/// `<home>/.workshop/workshops/`. Pure, no I/O.
pub fn workshops_dir_at(home: &Path) -> PathBuf {
    workshop_root(home).join("workshops")
}

/// `<home>/.workshop/workshops/<name>.yaml`. Pure, no I/O.
pub fn workshop_path_at(home: &Path, name: &WorkshopName) -> PathBuf {
    workshops_dir_at(home).join(format!("{}.yaml", name.0))
}

/// Create `<home>/.workshop/workshops/` (mode `0700`) if it does not yet exist.
fn ensure_workshops_dir(home: &Path) -> Result<PathBuf, RegistryError> {
    let dir = workshops_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load a single workshop from `<home>/.workshop/workshops/<name>.yaml`.
///
/// Returns `RegistryError::WorkshopNotFound` if absent,
/// `RegistryError::Parse` (with path + line context) if malformed YAML.
pub fn load_workshop_at(home: &Path, name: &WorkshopName) -> Result<Workshop, RegistryError> {
    let path = workshop_path_at(home, name);
    if !path.exists() {
        return Err(RegistryError::WorkshopNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse { path, source: e })
}

/// Read every `<home>/.workshop/workshops/*.yaml`, sorted by file name.
pub fn list_workshops_at(home: &Path) -> Result<Vec<Workshop>, RegistryError> {
    let dir = workshops_dir_at(home);
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut entries: Vec<_> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut result = Vec::new();
    for entry in entries {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("yaml") {
            continue;
        }
        let contents = std::fs::read_to_string(&path)?;
        let workshop: Workshop = serde_yaml::from_str(&contents)
            .map_err(|e| RegistryError::Parse { path: path.clone(), source: e })?;
        result.push(workshop);
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save a workshop to `<home>/.workshop/workshops/<name>.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// `.tmp` is always in the same directory as the target (same filesystem, so no EXDEV on macOS).
pub fn save_workshop_at(home: &Path, workshop: &Workshop) -> Result<(), RegistryError> {
    ensure_workshops_dir(home)?;
    let path = workshop_path_at(home, &workshop.name);
    let tmp_path = path.with_file_name(format!("{}.yaml.tmp", workshop.name.0));

    let yaml = serde_yaml::to_string(workshop)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Register a workshop named `name`.
///
/// Creates `<home>/.workshop/workshops/<name>.yaml`.
/// Idempotent: if the file already exists, loads and returns it unchanged.
pub fn init_at(home: &Path, name: WorkshopName) -> Result<Workshop, RegistryError> {
    validate_name(&name.0)?;

    let yaml_path = workshop_path_at(home, &name);
    if yaml_path.exists() {
        return load_workshop_at(home, &name);
    }

    let workshop = Workshop::new(name);
    save_workshop_at(home, &workshop)?;
    tracing::debug!(workshop = %workshop.name, "workshop registered");
    Ok(workshop)
}

// ---------------------------------------------------------------------------
// 5. Workbench membership
// ---------------------------------------------------------------------------

/// Append a workbench to an existing workshop.
///
/// Returns `RegistryError::WorkshopNotFound` if the workshop isn't registered
/// and `RegistryError::DuplicateWorkbench` if the name is already taken.
pub fn add_workbench_at(
    home: &Path,
    workshop: &WorkshopName,
    bench_name: &str,
    path: PathBuf,
) -> Result<Workbench, RegistryError> {
    validate_name(bench_name)?;
    let mut shop = load_workshop_at(home, workshop)?;
    if shop.workbench(bench_name).is_some() {
        return Err(RegistryError::DuplicateWorkbench {
            workshop: workshop.0.clone(),
            workbench: bench_name.to_owned(),
        });
    }

    let now = Utc::now();
    let bench = Workbench {
        id: WorkbenchId::generate(),
        name: bench_name.to_owned(),
        path,
        created_at: now,
    };
    shop.workbenches.push(bench.clone());
    shop.updated_at = now;
    save_workshop_at(home, &shop)?;
    Ok(bench)
}

/// Remove a workbench from a workshop and return it.
///
/// The tmux window is left alone; the reconciler never deletes workbench
/// windows that fall out of the desired set.
pub fn remove_workbench_at(
    home: &Path,
    workshop: &WorkshopName,
    bench_name: &str,
) -> Result<Workbench, RegistryError> {
    let mut shop = load_workshop_at(home, workshop)?;
    let position = shop
        .workbenches
        .iter()
        .position(|b| b.name == bench_name)
        .ok_or_else(|| RegistryError::WorkbenchNotFound {
            workshop: workshop.0.clone(),
            workbench: bench_name.to_owned(),
        })?;
    let removed = shop.workbenches.remove(position);
    shop.updated_at = Utc::now();
    save_workshop_at(home, &shop)?;
    Ok(removed)
}

/// The user's home directory, from `dirs::home_dir()`.
pub fn home() -> Result<PathBuf, RegistryError> {
    dirs::home_dir().ok_or(RegistryError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
