//! Reconciliation Driver
//!
//! A driver exposes get/list/create/update/delete for the kinds it declares.
//! Every pass follows the same sequence:
//!
//! ```text
//! start -> list -> [create | update | delete]* -> finalize
//! ```
//!
//! `start` opens the pass and `finalize` commits it; both run exactly once per
//! pass. Passes for the same agent must not overlap.

pub mod direct;

pub use direct::DirectDriver;

use crate::error::DriverError;
use crate::model::Resource;
use std::collections::BTreeSet;

/// Driver surface consumed by the scheduler
pub trait CapabilityDriver {
    /// Kinds this driver manages
    fn get_capabilities(&self) -> BTreeSet<String>;

    /// Open a reconciliation pass
    fn start(&mut self) -> Result<(), DriverError>;

    fn get(&self, resource: &Resource) -> Result<Resource, DriverError>;

    fn list(&self, capability: &str) -> Result<Vec<Resource>, DriverError>;

    fn create(&mut self, resource: &Resource) -> Result<Resource, DriverError>;

    fn update(&mut self, resource: &Resource) -> Result<Resource, DriverError>;

    /// Idempotent: a resource already gone remotely is a success
    fn delete(&mut self, resource: &Resource) -> Result<(), DriverError>;

    /// Commit the pass
    fn finalize(&mut self) -> Result<(), DriverError>;

    /// Discard the open pass without committing; a no-op outside a pass
    fn abort(&mut self);
}

/// One-sided drift observed by a list call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListReport {
    /// Resources present on both sides
    pub returned: usize,
    /// Reported by the backend but unknown to the local store
    pub missing_local: usize,
    /// Owned locally but absent from the backend
    pub missing_remote: usize,
}

impl ListReport {
    pub fn has_drift(&self) -> bool {
        self.missing_local > 0 || self.missing_remote > 0
    }
}
