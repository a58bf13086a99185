use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors coming back from the remote management API or the evaluation client.
/// Messages are surfaced to callers verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("{0}")]
    Transport(String),
    #[error("remote returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected remote response: {0}")]
    InvalidResponse(String),
}

/// The identity flags are evaluated for. Only the evaluation client interprets it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EvaluationContext {
    pub kind: String,
    pub key: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl EvaluationContext {
    pub fn new(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            key: key.into(),
            attributes: Map::new(),
        }
    }

    /// A single "user" context with the given key.
    pub fn user(key: impl Into<String>) -> Self {
        Self::new("user", key)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteVariation {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteFlag {
    pub key: String,
    pub variations: Vec<RemoteVariation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteEnvironment {
    pub key: String,
    pub name: String,
}

/// One flag as evaluated by the remote evaluation client. Anything else the client reports
/// about the evaluation is not kept.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EvaluatedFlag {
    pub value: Value,
    #[serde(default)]
    pub version: Option<i64>,
}

pub type AllFlagsState = HashMap<String, EvaluatedFlag>;

/// Calls against the remote flag-management API.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ApiAdapter: Send + Sync {
    async fn get_sdk_key(
        &self,
        cloud_project_key: &str,
        environment_key: &str,
    ) -> Result<String, RemoteError>;

    async fn get_all_flags(&self, cloud_project_key: &str) -> Result<Vec<RemoteFlag>, RemoteError>;

    async fn get_project_environments(
        &self,
        cloud_project_key: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RemoteEnvironment>, RemoteError>;
}

/// Flag evaluation, delegated to the remote SDK.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SdkAdapter: Send + Sync {
    async fn get_all_flags_state(
        &self,
        context: &EvaluationContext,
        sdk_key: &str,
    ) -> Result<AllFlagsState, RemoteError>;
}
