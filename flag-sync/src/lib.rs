pub mod adapters;
pub mod api;
pub mod config;
pub mod context;
pub mod flags;
pub mod metrics;
pub mod observers;
pub mod overrides;
pub mod projects;
pub mod store;
pub mod telemetry;

// Not behind cfg(test): the integration tests under tests/ link against the library built
// without it.
pub mod utils;
