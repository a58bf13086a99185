use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Store, StoreError};
use crate::{
    flags::flag_models::FlagVariation,
    overrides::override_models::{Override, Overrides},
    projects::project_models::Project,
};

#[derive(Default)]
struct Tables {
    projects: HashMap<String, Project>,
    // keyed by (project_key, flag_key) so listing a project's overrides is ordered
    overrides: BTreeMap<(String, String), Override>,
}

/// A process-local `Store`. Nothing survives a restart; it backs tests and embedders that
/// bring their own persistence later.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_dev_project_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.lock().projects.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn get_dev_project(&self, key: &str) -> Result<Project, StoreError> {
        self.lock()
            .projects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::project_not_found(key))
    }

    async fn insert_project(&self, project: Project) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if tables.projects.contains_key(&project.key) {
            return Err(StoreError::AlreadyExists {
                entity: "project",
                key: project.key,
            });
        }
        tables.projects.insert(project.key.clone(), project);
        Ok(())
    }

    async fn update_project(&self, project: Project) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        match tables.projects.get_mut(&project.key) {
            Some(stored) => {
                *stored = project;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_dev_project(&self, key: &str) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let removed = tables.projects.remove(key).is_some();
        tables.overrides.retain(|(project_key, _), _| project_key != key);
        Ok(removed)
    }

    async fn get_overrides_for_project(&self, project_key: &str) -> Result<Overrides, StoreError> {
        let tables = self.lock();
        let overrides = tables
            .overrides
            .iter()
            .filter(|((key, _), _)| key == project_key)
            .map(|(_, o)| o.clone())
            .collect::<Vec<_>>();
        Ok(Overrides(overrides))
    }

    async fn upsert_override(&self, flag_override: Override) -> Result<Override, StoreError> {
        let mut tables = self.lock();
        if !tables.projects.contains_key(&flag_override.project_key) {
            return Err(StoreError::project_not_found(&flag_override.project_key));
        }
        let id = (
            flag_override.project_key.clone(),
            flag_override.flag_key.clone(),
        );
        let version = tables.overrides.get(&id).map_or(1, |o| o.version + 1);
        let stored = Override {
            version,
            ..flag_override
        };
        tables.overrides.insert(id, stored.clone());
        Ok(stored)
    }

    async fn deactivate_override(
        &self,
        project_key: &str,
        flag_key: &str,
    ) -> Result<i64, StoreError> {
        let mut tables = self.lock();
        let id = (project_key.to_string(), flag_key.to_string());
        match tables.overrides.get_mut(&id) {
            Some(stored) => {
                stored.active = false;
                stored.version += 1;
                Ok(stored.version)
            }
            None => Err(StoreError::NotFound {
                entity: "override",
                key: format!("{project_key}/{flag_key}"),
            }),
        }
    }

    async fn get_available_variations_for_project(
        &self,
        project_key: &str,
    ) -> Result<Vec<FlagVariation>, StoreError> {
        self.lock()
            .projects
            .get(project_key)
            .map(|p| p.available_variations.clone())
            .ok_or_else(|| StoreError::project_not_found(project_key))
    }
}
