use std::sync::Arc;

use serde_json::json;

use flag_sync::config::DEFAULT_TEST_CONFIG;
use flag_sync::context::RequestContext;
use flag_sync::observers::Observers;
use flag_sync::store::MemoryStore;
use flag_sync::telemetry::init_tracing;
use flag_sync::utils::test_utils::{
    all_flags_state, remote_flag, setup_request_context, FakeApiAdapter, FakeSdkAdapter,
    RecordingObserver,
};

pub const SDK_KEY: &str = "thing";

/// One engine wired to an in-memory store, canned remotes and a recording observer.
pub struct TestHarness {
    pub ctx: RequestContext,
    pub store: Arc<MemoryStore>,
    pub api: FakeApiAdapter,
    pub sdk: FakeSdkAdapter,
    pub observer: Arc<RecordingObserver>,
}

impl TestHarness {
    pub fn new(api: FakeApiAdapter, sdk: FakeSdkAdapter) -> Self {
        // several test binaries share a process per binary; only the first init wins
        init_tracing(&DEFAULT_TEST_CONFIG).ok();

        let store = Arc::new(MemoryStore::new());
        let observers = Arc::new(Observers::new());
        let observer = Arc::new(RecordingObserver::new());
        observers.register_observer(observer.clone());
        let ctx = setup_request_context(store.clone(), api.clone(), sdk.clone(), observers);

        TestHarness {
            ctx,
            store,
            api,
            sdk,
            observer,
        }
    }

    /// Remotes that serve `cloud_project_key` in environment `env` with a single boolean flag.
    pub fn with_bool_flag(cloud_project_key: &str, env: &str) -> Self {
        let api = FakeApiAdapter::new()
            .sdk_key_ret(cloud_project_key, env, Ok(SDK_KEY.to_string()))
            .all_flags_ret(
                cloud_project_key,
                Ok(vec![remote_flag(
                    "boolFlag",
                    &[("true", json!(true)), ("false", json!(false))],
                )]),
            );
        let sdk = FakeSdkAdapter::new().all_flags_state_ret(
            SDK_KEY,
            Ok(all_flags_state(&[("boolFlag", json!(true), Some(7))])),
        );
        Self::new(api, sdk)
    }
}
