//! Domain types for the workshop registry.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! All types are serializable/deserializable via serde + serde_yaml.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RegistryError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for a workshop. Doubles as the tmux session name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkshopName(pub String);

impl fmt::Display for WorkshopName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for WorkshopName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkshopName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Stable identifier of a workshop, stamped onto every pane it owns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkshopId(pub String);

impl WorkshopId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for WorkshopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for WorkshopId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkshopId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Stable identifier of a workbench, stamped onto its three panes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkbenchId(pub String);

impl WorkbenchId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for WorkbenchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for WorkbenchId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkbenchId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Registry structs
// ---------------------------------------------------------------------------

/// One agent workspace: a tmux window with editor, agent and shell panes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workbench {
    pub id: WorkbenchId,
    /// Window name inside the workshop session.
    pub name: String,
    /// Working directory for all three panes.
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// A workshop: one tmux session holding an ordered set of workbenches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workshop {
    pub id: WorkshopId,
    pub name: WorkshopName,
    #[serde(default)]
    pub workbenches: Vec<Workbench>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workshop {
    pub fn new(name: WorkshopName) -> Self {
        let now = Utc::now();
        Self {
            id: WorkshopId::generate(),
            name,
            workbenches: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn workbench(&self, name: &str) -> Option<&Workbench> {
        self.workbenches.iter().find(|b| b.name == name)
    }

    /// The declarative target for reconciliation, in registry order.
    pub fn desired_workbenches(&self) -> Vec<DesiredWorkbench> {
        self.workbenches
            .iter()
            .map(|bench| DesiredWorkbench {
                name: bench.name.clone(),
                path: bench.path.clone(),
                id: bench.id.clone(),
                workshop_id: self.id.clone(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Reconciliation input
// ---------------------------------------------------------------------------

/// A workbench the session should contain.
///
/// Order matters: when the session does not exist, the first entry
/// bootstraps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredWorkbench {
    pub name: String,
    pub path: PathBuf,
    pub id: WorkbenchId,
    pub workshop_id: WorkshopId,
}

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

/// Suffix reserved for overflow windows.
pub const OVERFLOW_SUFFIX: &str = "-imps";

/// Check a workshop or workbench name before it reaches tmux or the filesystem.
///
/// `:` and `.` are tmux target separators, `/` would escape the registry
/// directory, and the overflow suffix is reserved.
pub fn validate_name(name: &str) -> Result<(), RegistryError> {
    let invalid = |reason| RegistryError::InvalidName {
        name: name.to_owned(),
        reason,
    };
    if name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name.contains([':', '.', '/', '\\']) {
        return Err(invalid("name must not contain ':', '.', '/' or '\\'"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(invalid("name must not contain whitespace"));
    }
    if name.ends_with(OVERFLOW_SUFFIX) {
        return Err(invalid("names ending in '-imps' are reserved for overflow windows"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn bench(name: &str) -> Workbench {
        Workbench {
            id: WorkbenchId::from(format!("id-{name}").as_str()),
            name: name.to_string(),
            path: PathBuf::from(format!("/code/{name}")),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn newtype_display() {
        assert_eq!(WorkshopName::from("foo").to_string(), "foo");
        assert_eq!(WorkbenchId::from("b-01").to_string(), "b-01");
        assert_eq!(WorkshopId::from("w-01").to_string(), "w-01");
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(WorkbenchId::generate(), WorkbenchId::generate());
        assert_ne!(WorkshopId::generate(), WorkshopId::generate());
    }

    #[test]
    fn desired_workbenches_keep_registry_order_and_carry_workshop_id() {
        let mut shop = Workshop::new(WorkshopName::from("forge"));
        shop.workbenches = vec![bench("api"), bench("web"), bench("docs")];

        let desired = shop.desired_workbenches();
        let names: Vec<&str> = desired.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["api", "web", "docs"]);
        assert!(desired.iter().all(|d| d.workshop_id == shop.id));
        assert_eq!(desired[1].path, PathBuf::from("/code/web"));
        assert_eq!(desired[1].id, WorkbenchId::from("id-web"));
    }

    #[test]
    fn workshop_serde_roundtrip() {
        let mut shop = Workshop::new(WorkshopName::from("forge"));
        shop.workbenches.push(bench("api"));
        let yaml = serde_yaml::to_string(&shop).expect("serialize");
        let back: Workshop = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back, shop);
    }

    #[test]
    fn validate_name_rejects_tmux_separators_and_reserved_suffix() {
        assert!(validate_name("api").is_ok());
        assert!(validate_name("api_v2-beta").is_ok());
        for bad in ["", "  ", "a:b", "a.b", "a/b", "has space", "api-imps"] {
            assert!(validate_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
