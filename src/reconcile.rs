//! One reconciliation pass for a single capability
//!
//! The driver does not decide what to change. This module compares the
//! desired resources with what the driver lists and applies the difference:
//!
//! ```text
//! target only         -> create
//! both, hash differs  -> update
//! actual only         -> delete
//! ```

use crate::driver::CapabilityDriver;
use crate::error::{DriverError, HashError};
use crate::hash::canonical_hash_subset;
use crate::model::Resource;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub create: Vec<Resource>,
    pub update: Vec<Resource>,
    pub delete: Vec<Resource>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Compute the changes that bring `actuals` in line with `targets`
///
/// A target owns every attribute of its value; an actual is compared over
/// the fields the driver recorded for it.
pub fn plan(targets: &[Resource], actuals: &[Resource]) -> Result<Plan, HashError> {
    let mut actual_by_uuid: BTreeMap<Uuid, &Resource> =
        actuals.iter().map(|r| (r.uuid, r)).collect();

    let mut plan = Plan::default();
    for target in targets {
        match actual_by_uuid.remove(&target.uuid) {
            None => plan.create.push(target.clone()),
            Some(actual) => {
                let desired = canonical_hash_subset(&target.value, &target.value_fields())?;
                if desired != actual.hash()? {
                    plan.update.push(target.clone());
                }
            }
        }
    }
    plan.delete = actual_by_uuid.into_values().cloned().collect();
    Ok(plan)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
}

#[derive(Debug)]
pub struct Failure {
    pub action: Action,
    pub uuid: Uuid,
    pub error: DriverError,
}

/// What one pass did
#[derive(Debug, Default)]
pub struct PassOutcome {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Creates that lost a race with another writer; retried as update next pass
    pub conflicts: usize,
    pub failures: Vec<Failure>,
}

impl PassOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run start, list, apply and finalize for one capability
///
/// Per-resource failures are collected rather than aborting the pass, so the
/// successful operations still get committed. If the driver cannot start
/// or list, nothing is applied and the error is returned.
pub fn run_pass<D: CapabilityDriver + ?Sized>(
    driver: &mut D,
    capability: &str,
    targets: &[Resource],
) -> Result<PassOutcome, DriverError> {
    driver.start()?;
    let plan = match driver
        .list(capability)
        .and_then(|actuals| plan(targets, &actuals).map_err(DriverError::from))
    {
        Ok(plan) => plan,
        Err(e) => {
            driver.abort();
            return Err(e);
        }
    };
    debug!(
        kind = %capability,
        create = plan.create.len(),
        update = plan.update.len(),
        delete = plan.delete.len(),
        "Reconciliation plan"
    );

    let mut outcome = PassOutcome::default();

    for resource in &plan.create {
        match driver.create(resource) {
            Ok(_) => outcome.created += 1,
            Err(DriverError::ResourceAlreadyExists { .. }) => {
                warn!(uuid = %resource.uuid, kind = %capability, "Resource created concurrently");
                outcome.conflicts += 1;
            }
            Err(error) => outcome.failures.push(Failure {
                action: Action::Create,
                uuid: resource.uuid,
                error,
            }),
        }
    }

    for resource in &plan.update {
        match driver.update(resource) {
            Ok(_) => outcome.updated += 1,
            Err(error) => outcome.failures.push(Failure {
                action: Action::Update,
                uuid: resource.uuid,
                error,
            }),
        }
    }

    for resource in &plan.delete {
        match driver.delete(resource) {
            Ok(()) => outcome.deleted += 1,
            Err(error) => outcome.failures.push(Failure {
                action: Action::Delete,
                uuid: resource.uuid,
                error,
            }),
        }
    }

    driver.finalize()?;

    for failure in &outcome.failures {
        warn!(uuid = %failure.uuid, action = ?failure.action, error = %failure.error, "Reconciliation step failed");
    }
    info!(
        kind = %capability,
        created = outcome.created,
        updated = outcome.updated,
        deleted = outcome.deleted,
        failed = outcome.failures.len(),
        "Reconciliation pass finished"
    );
    Ok(outcome)
}
