//! Direct driver: reads every resource straight from the backend
//!
//! The backend alone cannot say which attributes of an object this agent
//! manages, since the server adds its own bookkeeping fields and other
//! writers may add more. The driver therefore records the owned attribute
//! names in the Target Field Store and always takes them from there, never
//! from the backend object. That keeps `Resource::hash` reproducible.

use crate::backend::{BackendClient, BackendItem};
use crate::driver::{CapabilityDriver, ListReport};
use crate::error::{BackendError, DriverError};
use crate::model::Resource;
use crate::store::{FieldTransaction, TargetFieldItem, TargetFieldStore};
use crate::transform::TransformerMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

pub struct DirectDriver {
    client: Arc<dyn BackendClient>,
    store: TargetFieldStore,
    transformers: TransformerMap,
    capabilities: BTreeSet<String>,
    pass: Option<FieldTransaction>,
}

impl DirectDriver {
    pub fn new<I, S>(client: Arc<dyn BackendClient>, store: TargetFieldStore, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            client,
            store,
            transformers: TransformerMap::new(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            pass: None,
        }
    }

    pub fn with_transformers(mut self, transformers: TransformerMap) -> Self {
        self.transformers = transformers;
        self
    }

    pub fn is_pass_open(&self) -> bool {
        self.pass.is_some()
    }

    /// Read-only view of the open pass's bookkeeping
    pub fn target_fields(&self, kind: &str) -> Result<Vec<TargetFieldItem>, DriverError> {
        Ok(self.pass()?.list(kind))
    }

    fn pass(&self) -> Result<&FieldTransaction, DriverError> {
        self.pass.as_ref().ok_or(DriverError::PassNotStarted)
    }

    fn validate(&self, kind: &str) -> Result<(), DriverError> {
        if !self.capabilities.contains(kind) {
            return Err(DriverError::UnsupportedCapability(kind.to_string()));
        }
        Ok(())
    }

    /// Build a driver resource from whatever the backend returned
    fn materialize(
        &self,
        kind: &str,
        uuid: Uuid,
        item: BackendItem,
        target_fields: BTreeSet<String>,
    ) -> Resource {
        match item {
            BackendItem::Typed(resource) => resource,
            BackendItem::Raw(view) => Resource {
                uuid,
                kind: kind.to_string(),
                value: self.transformers.apply(kind, view),
                target_fields,
            },
            BackendItem::Model(model) => {
                let mut view = model.dump_view();
                for field in model.ignore_fields() {
                    view.remove(&field);
                }
                Resource {
                    uuid: model.resource_uuid(),
                    kind: kind.to_string(),
                    value: self.transformers.apply(kind, view),
                    target_fields,
                }
            }
        }
    }

    /// List with one-sided drift counted instead of only logged
    ///
    /// The result is the intersection by uuid of the local store and the
    /// backend. Items on only one side are excluded here; healing them is up
    /// to the caller.
    pub fn list_with_report(
        &self,
        capability: &str,
    ) -> Result<(Vec<Resource>, ListReport), DriverError> {
        self.validate(capability)?;
        let tx = self.pass()?;

        let stored: BTreeMap<Uuid, BTreeSet<String>> = tx
            .list(capability)
            .into_iter()
            .map(|item| (item.uuid, item.fields))
            .collect();

        let mut report = ListReport::default();
        let mut remote: BTreeMap<Uuid, Resource> = BTreeMap::new();

        for item in self.client.list(capability)? {
            let Some(uuid) = item.uuid() else {
                warn!(kind = %capability, "Backend item without a valid uuid, skipping");
                continue;
            };

            match stored.get(&uuid) {
                Some(fields) => {
                    let resource = self.materialize(capability, uuid, item, fields.clone());
                    remote.insert(uuid, resource);
                }
                None => {
                    warn!(uuid = %uuid, kind = %capability, "Missing storage item for backend resource");
                    report.missing_local += 1;
                }
            }
        }

        let mut resources = Vec::with_capacity(stored.len());
        for uuid in stored.keys() {
            match remote.remove(uuid) {
                Some(resource) => resources.push(resource),
                None => {
                    warn!(uuid = %uuid, kind = %capability, "Owned resource missing on backend");
                    report.missing_remote += 1;
                }
            }
        }
        report.returned = resources.len();

        if report.has_drift() {
            warn!(
                kind = %capability,
                returned = report.returned,
                missing_local = report.missing_local,
                missing_remote = report.missing_remote,
                "One-sided drift excluded from list"
            );
        }

        Ok((resources, report))
    }
}

impl CapabilityDriver for DirectDriver {
    fn get_capabilities(&self) -> BTreeSet<String> {
        self.capabilities.clone()
    }

    fn start(&mut self) -> Result<(), DriverError> {
        if self.pass.is_some() {
            return Err(DriverError::PassAlreadyStarted);
        }
        self.pass = Some(self.store.load()?);
        debug!("Reconciliation pass started");
        Ok(())
    }

    fn get(&self, resource: &Resource) -> Result<Resource, DriverError> {
        self.validate(&resource.kind)?;

        let fields = match self.pass()?.get(&resource.kind, resource.uuid) {
            Ok(item) => item.fields,
            Err(_) => {
                error!(uuid = %resource.uuid, "Unable to find resource in target field store");
                return Err(DriverError::ResourceNotFound {
                    kind: resource.kind.clone(),
                    uuid: resource.uuid,
                });
            }
        };

        let item = match self.client.get(resource) {
            Ok(item) => item,
            Err(BackendError::ResourceNotFound { kind, uuid }) => {
                error!(uuid = %uuid, "Unable to find resource on backend");
                return Err(DriverError::ResourceNotFound { kind, uuid });
            }
            Err(e) => return Err(e.into()),
        };

        Ok(self.materialize(&resource.kind, resource.uuid, item, fields))
    }

    fn list(&self, capability: &str) -> Result<Vec<Resource>, DriverError> {
        self.list_with_report(capability).map(|(resources, _)| resources)
    }

    fn create(&mut self, resource: &Resource) -> Result<Resource, DriverError> {
        self.validate(&resource.kind)?;

        let target_fields = resource.value_fields();
        let item = TargetFieldItem::new(resource.kind.clone(), resource.uuid, target_fields.clone());

        // Record intent before the remote call; if the call fails the next
        // pass retries with the same ownership scope
        self.pass
            .as_mut()
            .ok_or(DriverError::PassNotStarted)?
            .create(item, true)?;

        let response = match self.client.create(resource) {
            Ok(response) => response,
            Err(BackendError::ResourceAlreadyExists { kind, uuid }) => {
                error!(uuid = %uuid, "The resource already exists");
                return Err(DriverError::ResourceAlreadyExists { kind, uuid });
            }
            Err(e) => return Err(e.into()),
        };
        debug!(uuid = %resource.uuid, kind = %resource.kind, "Created resource");

        Ok(self.materialize(&resource.kind, resource.uuid, response, target_fields))
    }

    fn update(&mut self, resource: &Resource) -> Result<Resource, DriverError> {
        self.validate(&resource.kind)?;
        if self.pass.is_none() {
            return Err(DriverError::PassNotStarted);
        }

        let target_fields = resource.value_fields();

        let response = match self.client.update(resource) {
            Ok(response) => response,
            Err(BackendError::ResourceNotFound { kind, uuid }) => {
                error!(uuid = %uuid, "The resource does not exist");
                return Err(DriverError::ResourceNotFound { kind, uuid });
            }
            Err(e) => return Err(e.into()),
        };

        // Commit the new ownership scope only once the backend applied it
        let item = TargetFieldItem::new(resource.kind.clone(), resource.uuid, target_fields.clone());
        self.pass
            .as_mut()
            .ok_or(DriverError::PassNotStarted)?
            .create(item, true)?;
        debug!(uuid = %resource.uuid, kind = %resource.kind, "Updated resource");

        Ok(self.materialize(&resource.kind, resource.uuid, response, target_fields))
    }

    fn delete(&mut self, resource: &Resource) -> Result<(), DriverError> {
        self.validate(&resource.kind)?;
        if self.pass.is_none() {
            return Err(DriverError::PassNotStarted);
        }

        let remote = match self.client.delete(resource) {
            Ok(()) => {
                debug!(uuid = %resource.uuid, kind = %resource.kind, "Deleted resource");
                Ok(())
            }
            Err(BackendError::ResourceNotFound { .. }) => {
                warn!(uuid = %resource.uuid, "The resource is already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        };

        // Ownership without a remote object would still count as owned
        let item = TargetFieldItem::new(resource.kind.clone(), resource.uuid, BTreeSet::new());
        self.pass
            .as_mut()
            .ok_or(DriverError::PassNotStarted)?
            .delete(&item, true)?;

        remote.map_err(DriverError::from)
    }

    fn finalize(&mut self) -> Result<(), DriverError> {
        let tx = self.pass.take().ok_or(DriverError::PassNotStarted)?;
        self.store.persist(tx)?;
        debug!("Reconciliation pass finalized");
        Ok(())
    }

    fn abort(&mut self) {
        if self.pass.take().is_some() {
            warn!("Reconciliation pass aborted, target field changes discarded");
        }
    }
}
