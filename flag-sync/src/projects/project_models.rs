use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::EvaluationContext,
    flags::flag_models::{FlagVariation, FlagsState},
};

/// A local mirror of one environment of a cloud project.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Project {
    pub key: String,
    pub source_environment_key: String,
    /// The cloud project to sync from. Unset for projects whose key is the cloud key; for
    /// clones it always names the cloud project, never another local project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_project_key: Option<String>,
    pub context: EvaluationContext,
    pub last_sync_time: DateTime<Utc>,
    #[serde(default)]
    pub all_flags_state: FlagsState,
    #[serde(default)]
    pub available_variations: Vec<FlagVariation>,
}

impl Project {
    /// A project with no synced state yet.
    pub fn new(
        key: impl Into<String>,
        source_environment_key: impl Into<String>,
        context: EvaluationContext,
    ) -> Self {
        Self {
            key: key.into(),
            source_environment_key: source_environment_key.into(),
            source_project_key: None,
            context,
            last_sync_time: DateTime::<Utc>::UNIX_EPOCH,
            all_flags_state: FlagsState::new(),
            available_variations: Vec::new(),
        }
    }

    /// The key to use for management API calls.
    pub fn cloud_project_key(&self) -> &str {
        match self.source_project_key.as_deref() {
            Some(source) if !source.is_empty() => source,
            _ => &self.key,
        }
    }
}
