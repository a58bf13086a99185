use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use serde_json::Value;

use crate::{
    adapters::{
        AllFlagsState, ApiAdapter, EvaluatedFlag, EvaluationContext, RemoteEnvironment,
        RemoteError, RemoteFlag, RemoteVariation, SdkAdapter,
    },
    config::DEFAULT_TEST_CONFIG,
    context::RequestContext,
    flags::flag_models::{FlagState, FlagVariation, FlagsState},
    observers::{Observer, Observers, ProjectEvent},
    overrides::override_models::{Override, Overrides},
    projects::project_models::Project,
    store::{MemoryStore, Store, StoreError},
};

pub fn random_string(prefix: &str, length: usize) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    format!("{}{}", prefix, suffix)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdapterCall {
    pub op: String,
    pub key: String,
}

fn not_configured(what: String) -> RemoteError {
    RemoteError::Status {
        status: 404,
        message: format!("{what} not configured"),
    }
}

/// Management API stand-in answering from canned responses and recording every call.
#[derive(Clone, Default)]
pub struct FakeApiAdapter {
    sdk_key_ret: HashMap<(String, String), Result<String, RemoteError>>,
    all_flags_ret: HashMap<String, Result<Vec<RemoteFlag>, RemoteError>>,
    environments_ret: HashMap<String, Result<Vec<RemoteEnvironment>, RemoteError>>,
    calls: Arc<Mutex<Vec<AdapterCall>>>,
}

impl FakeApiAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sdk_key_ret(
        &mut self,
        cloud_project_key: &str,
        environment_key: &str,
        ret: Result<String, RemoteError>,
    ) -> Self {
        self.sdk_key_ret.insert(
            (cloud_project_key.to_owned(), environment_key.to_owned()),
            ret,
        );
        self.clone()
    }

    pub fn all_flags_ret(
        &mut self,
        cloud_project_key: &str,
        ret: Result<Vec<RemoteFlag>, RemoteError>,
    ) -> Self {
        self.all_flags_ret.insert(cloud_project_key.to_owned(), ret);
        self.clone()
    }

    pub fn environments_ret(
        &mut self,
        cloud_project_key: &str,
        ret: Result<Vec<RemoteEnvironment>, RemoteError>,
    ) -> Self {
        self.environments_ret
            .insert(cloud_project_key.to_owned(), ret);
        self.clone()
    }

    pub fn get_calls(&self) -> Vec<AdapterCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, op: &str, key: String) {
        lock(&self.calls).push(AdapterCall {
            op: op.to_string(),
            key,
        });
    }
}

#[async_trait]
impl ApiAdapter for FakeApiAdapter {
    async fn get_sdk_key(
        &self,
        cloud_project_key: &str,
        environment_key: &str,
    ) -> Result<String, RemoteError> {
        self.record(
            "get_sdk_key",
            format!("{cloud_project_key}/{environment_key}"),
        );
        self.sdk_key_ret
            .get(&(cloud_project_key.to_owned(), environment_key.to_owned()))
            .cloned()
            .unwrap_or_else(|| {
                Err(not_configured(format!(
                    "sdk key for {cloud_project_key}/{environment_key}"
                )))
            })
    }

    async fn get_all_flags(&self, cloud_project_key: &str) -> Result<Vec<RemoteFlag>, RemoteError> {
        self.record("get_all_flags", cloud_project_key.to_string());
        self.all_flags_ret
            .get(cloud_project_key)
            .cloned()
            .unwrap_or_else(|| Err(not_configured(format!("flags for {cloud_project_key}"))))
    }

    async fn get_project_environments(
        &self,
        cloud_project_key: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<RemoteEnvironment>, RemoteError> {
        self.record("get_project_environments", cloud_project_key.to_string());
        let environments = self
            .environments_ret
            .get(cloud_project_key)
            .cloned()
            .unwrap_or_else(|| {
                Err(not_configured(format!(
                    "environments for {cloud_project_key}"
                )))
            })?;
        Ok(environments
            .into_iter()
            .filter(|e| query.is_empty() || e.key.contains(query) || e.name.contains(query))
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }
}

/// Evaluation client stand-in keyed by SDK key.
#[derive(Clone, Default)]
pub struct FakeSdkAdapter {
    all_flags_state_ret: HashMap<String, Result<AllFlagsState, RemoteError>>,
    calls: Arc<Mutex<Vec<AdapterCall>>>,
}

impl FakeSdkAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_flags_state_ret(
        &mut self,
        sdk_key: &str,
        ret: Result<AllFlagsState, RemoteError>,
    ) -> Self {
        self.all_flags_state_ret.insert(sdk_key.to_owned(), ret);
        self.clone()
    }

    pub fn get_calls(&self) -> Vec<AdapterCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl SdkAdapter for FakeSdkAdapter {
    async fn get_all_flags_state(
        &self,
        context: &EvaluationContext,
        sdk_key: &str,
    ) -> Result<AllFlagsState, RemoteError> {
        lock(&self.calls).push(AdapterCall {
            op: "get_all_flags_state".to_string(),
            key: format!("{sdk_key}/{}", context.key),
        });
        self.all_flags_state_ret
            .get(sdk_key)
            .cloned()
            .unwrap_or_else(|| Err(not_configured(format!("flag state for {sdk_key}"))))
    }
}

/// Keeps every event it is handed.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ProjectEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProjectEvent> {
        lock(&self.events).clone()
    }
}

impl Observer for RecordingObserver {
    fn handle(&self, event: &ProjectEvent) -> anyhow::Result<()> {
        lock(&self.events).push(event.clone());
        Ok(())
    }
}

/// A `MemoryStore` where another writer always deletes the project just before an update
/// lands, so every `update_project` reports no change.
pub struct DeleteBeforeUpdateStore {
    inner: Arc<MemoryStore>,
}

impl DeleteBeforeUpdateStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Store for DeleteBeforeUpdateStore {
    async fn get_dev_project_keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.get_dev_project_keys().await
    }

    async fn get_dev_project(&self, key: &str) -> Result<Project, StoreError> {
        self.inner.get_dev_project(key).await
    }

    async fn insert_project(&self, project: Project) -> Result<(), StoreError> {
        self.inner.insert_project(project).await
    }

    async fn update_project(&self, project: Project) -> Result<bool, StoreError> {
        self.inner.delete_dev_project(&project.key).await?;
        self.inner.update_project(project).await
    }

    async fn delete_dev_project(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete_dev_project(key).await
    }

    async fn get_overrides_for_project(&self, project_key: &str) -> Result<Overrides, StoreError> {
        self.inner.get_overrides_for_project(project_key).await
    }

    async fn upsert_override(&self, flag_override: Override) -> Result<Override, StoreError> {
        self.inner.upsert_override(flag_override).await
    }

    async fn deactivate_override(
        &self,
        project_key: &str,
        flag_key: &str,
    ) -> Result<i64, StoreError> {
        self.inner.deactivate_override(project_key, flag_key).await
    }

    async fn get_available_variations_for_project(
        &self,
        project_key: &str,
    ) -> Result<Vec<FlagVariation>, StoreError> {
        self.inner
            .get_available_variations_for_project(project_key)
            .await
    }
}

pub fn setup_request_context(
    store: Arc<dyn Store>,
    api: FakeApiAdapter,
    sdk: FakeSdkAdapter,
    observers: Arc<Observers>,
) -> RequestContext {
    RequestContext::new(
        store,
        Arc::new(api),
        Arc::new(sdk),
        observers,
        Arc::new(DEFAULT_TEST_CONFIG.clone()),
    )
}

pub fn all_flags_state(flags: &[(&str, Value, Option<i64>)]) -> AllFlagsState {
    flags
        .iter()
        .map(|(key, value, version)| {
            (
                key.to_string(),
                EvaluatedFlag {
                    value: value.clone(),
                    version: *version,
                },
            )
        })
        .collect()
}

pub fn remote_flag(key: &str, variations: &[(&str, Value)]) -> RemoteFlag {
    RemoteFlag {
        key: key.to_string(),
        variations: variations
            .iter()
            .map(|(id, value)| RemoteVariation {
                id: Some(id.to_string()),
                name: None,
                description: None,
                value: value.clone(),
            })
            .collect(),
    }
}

pub fn flags_state(flags: &[(&str, Value, i64)]) -> FlagsState {
    flags
        .iter()
        .map(|(key, value, version)| {
            (
                key.to_string(),
                FlagState {
                    value: value.clone(),
                    version: *version,
                },
            )
        })
        .collect()
}

/// A synced-looking project with a single boolean flag.
pub fn project_fixture(key: &str) -> Project {
    let mut project = Project::new(key, "production", EvaluationContext::user("test-user"));
    project.all_flags_state = flags_state(&[("flag1", Value::Bool(true), 1)]);
    project
}
