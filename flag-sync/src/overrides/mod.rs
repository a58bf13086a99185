pub mod override_models;
pub mod override_operations;
