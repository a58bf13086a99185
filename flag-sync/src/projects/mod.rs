pub mod environment_operations;
pub mod project_models;
pub mod project_operations;
