//! Workshop core library: domain types, registry persistence, settings, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes, workshops, workbenches, desired workbench targets
//! - [`error`]: [`RegistryError`]
//! - [`registry`]: load / save / init / workbench membership
//! - [`config`]: [`Settings`] loaded from `~/.workshop/config.yaml`

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use config::{DaemonSettings, NudgeSettings, Settings};
pub use error::RegistryError;
pub use types::{
    DesiredWorkbench, Workbench, WorkbenchId, Workshop, WorkshopId, WorkshopName,
};
