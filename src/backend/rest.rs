//! REST collection backend
//!
//! Each kind maps to a collection path under one endpoint. Objects are plain
//! JSON attribute mappings, so every response resolves to `BackendItem::Raw`.

use crate::backend::{prepare_create_body, prepare_update_body, BackendClient, BackendItem};
use crate::error::BackendError;
use crate::model::Resource;
use crate::types::AttributeMap;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

const BACKEND_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn build_backend_http_client(timeout: Duration) -> Result<Client, BackendError> {
    Client::builder()
        .connect_timeout(BACKEND_HTTP_CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::Transport(format!("Failed to create HTTP client: {}", e)))
}

/// Map a non-success status to the backend error set
pub(crate) fn map_status(status: StatusCode, kind: &str, uuid: Uuid) -> BackendError {
    match status {
        StatusCode::NOT_FOUND => BackendError::ResourceNotFound {
            kind: kind.to_string(),
            uuid,
        },
        StatusCode::CONFLICT => BackendError::ResourceAlreadyExists {
            kind: kind.to_string(),
            uuid,
        },
        other => BackendError::Transport(format!("Request failed with status {}", other)),
    }
}

fn map_http_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Transport(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        BackendError::Transport(format!("Connection error: {}", error))
    } else {
        BackendError::Transport(format!("HTTP error: {}", error))
    }
}

pub struct RestBackendClient {
    client: Client,
    endpoint: String,
    collections: HashMap<String, String>,
    project_id: String,
}

impl RestBackendClient {
    pub fn new(
        endpoint: impl Into<String>,
        collections: HashMap<String, String>,
        project_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_backend_http_client(timeout)?,
            endpoint: endpoint.into(),
            collections,
            project_id: project_id.into(),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Absolute collection URL for a kind, always ending in `/`
    pub fn collection_url(&self, kind: &str) -> Result<String, BackendError> {
        let path = self
            .collections
            .get(kind)
            .ok_or_else(|| BackendError::UnknownKind(kind.to_string()))?;
        Ok(format!(
            "{}/{}/",
            self.endpoint.trim_end_matches('/'),
            path.trim_matches('/')
        ))
    }

    fn resource_url(&self, resource: &Resource) -> Result<String, BackendError> {
        Ok(format!("{}{}", self.collection_url(&resource.kind)?, resource.uuid))
    }

    fn decode_object(response: Response) -> Result<AttributeMap, BackendError> {
        response
            .json::<AttributeMap>()
            .map_err(|e| BackendError::Decode(format!("Expected JSON object: {}", e)))
    }

    fn check(response: Response, resource: &Resource) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(map_status(status, &resource.kind, resource.uuid))
        }
    }
}

impl BackendClient for RestBackendClient {
    fn get(&self, resource: &Resource) -> Result<BackendItem, BackendError> {
        let url = self.resource_url(resource)?;
        let response = self.client.get(url).send().map_err(map_http_error)?;
        let view = Self::decode_object(Self::check(response, resource)?)?;
        Ok(BackendItem::Raw(view))
    }

    fn create(&self, resource: &Resource) -> Result<BackendItem, BackendError> {
        let url = self.collection_url(&resource.kind)?;
        let body = prepare_create_body(resource, &self.project_id)?;
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .map_err(map_http_error)?;
        let view = Self::decode_object(Self::check(response, resource)?)?;
        Ok(BackendItem::Raw(view))
    }

    fn update(&self, resource: &Resource) -> Result<BackendItem, BackendError> {
        let url = self.resource_url(resource)?;
        let body = prepare_update_body(resource);
        let response = self
            .client
            .put(url)
            .json(&body)
            .send()
            .map_err(map_http_error)?;
        let view = Self::decode_object(Self::check(response, resource)?)?;
        Ok(BackendItem::Raw(view))
    }

    fn list(&self, kind: &str) -> Result<Vec<BackendItem>, BackendError> {
        let url = self.collection_url(kind)?;
        let response = self
            .client
            .get(url)
            .query(&[("project_id", self.project_id.as_str())])
            .send()
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Transport(format!(
                "Listing {} failed with status {}",
                kind, status
            )));
        }

        let views = response
            .json::<Vec<AttributeMap>>()
            .map_err(|e| BackendError::Decode(format!("Expected JSON array: {}", e)))?;
        Ok(views.into_iter().map(BackendItem::Raw).collect())
    }

    fn delete(&self, resource: &Resource) -> Result<(), BackendError> {
        let url = self.resource_url(resource)?;
        let response = self.client.delete(url).send().map_err(map_http_error)?;
        Self::check(response, resource)?;
        Ok(())
    }
}
