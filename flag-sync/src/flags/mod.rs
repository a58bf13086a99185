pub mod flag_models;
