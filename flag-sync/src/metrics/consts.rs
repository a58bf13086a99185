// Sync counters
pub const PROJECT_REFRESH_COUNTER: &str = "flag_sync_project_refresh_total";
pub const PROJECT_CREATE_COUNTER: &str = "flag_sync_project_create_total";
pub const PROJECT_UPDATE_COUNTER: &str = "flag_sync_project_update_total";
pub const PROJECT_CLONE_COUNTER: &str = "flag_sync_project_clone_total";
pub const CLONED_OVERRIDES_COUNTER: &str = "flag_sync_cloned_overrides_total";

// Override counters
pub const OVERRIDE_WRITES_COUNTER: &str = "flag_sync_override_writes_total";

// Observer counters
pub const OBSERVER_NOTIFICATIONS_COUNTER: &str = "flag_sync_observer_notifications_total";
pub const OBSERVER_FAILURES_COUNTER: &str = "flag_sync_observer_failures_total";

// Remote and store calls
pub const CANCELLED_CALLS_COUNTER: &str = "flag_sync_cancelled_calls_total";
pub const TIMED_OUT_CALLS_COUNTER: &str = "flag_sync_timed_out_calls_total";
