pub mod memory;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::{
    flags::flag_models::FlagVariation,
    overrides::override_models::{Override, Overrides},
    projects::project_models::Project,
};

pub use memory::MemoryStore;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },
    #[error("{entity} {key} already exists")]
    AlreadyExists { entity: &'static str, key: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub fn project_not_found(key: &str) -> Self {
        StoreError::NotFound {
            entity: "project",
            key: key.to_string(),
        }
    }
}

/// Persistence for projects, their overrides and their variation catalogs.
///
/// Implementations own all serialization concerns: nothing above this trait assumes a
/// single writer, and `update_project` reporting `false` is the only signal that a
/// concurrent write or delete won.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_dev_project_keys(&self) -> Result<Vec<String>, StoreError>;

    async fn get_dev_project(&self, key: &str) -> Result<Project, StoreError>;

    /// Fails with `AlreadyExists` when the key is taken.
    async fn insert_project(&self, project: Project) -> Result<(), StoreError>;

    /// Returns whether a stored project was actually changed.
    async fn update_project(&self, project: Project) -> Result<bool, StoreError>;

    /// Returns whether a project was removed. Its overrides go with it.
    async fn delete_dev_project(&self, key: &str) -> Result<bool, StoreError>;

    async fn get_overrides_for_project(&self, project_key: &str) -> Result<Overrides, StoreError>;

    /// Inserts or replaces the override for `(project_key, flag_key)`. The store assigns the
    /// version; the one on the argument is ignored.
    async fn upsert_override(&self, flag_override: Override) -> Result<Override, StoreError>;

    /// Marks an override inactive and returns its new version.
    async fn deactivate_override(&self, project_key: &str, flag_key: &str)
        -> Result<i64, StoreError>;

    async fn get_available_variations_for_project(
        &self,
        project_key: &str,
    ) -> Result<Vec<FlagVariation>, StoreError>;
}
