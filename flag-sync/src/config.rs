use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;

use envconfig::Envconfig;
use once_cell::sync::Lazy;

use crate::adapters::EvaluationContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlexBool(pub bool);

impl FromStr for FlexBool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(FlexBool(true)),
            "false" | "0" | "no" | "off" | "" => Ok(FlexBool(false)),
            _ => Err(format!("Invalid boolean value: {}", s)),
        }
    }
}

impl From<FlexBool> for bool {
    fn from(flex: FlexBool) -> Self {
        flex.0
    }
}

impl Deref for FlexBool {
    type Target = bool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "DEBUG", default = "false")]
    pub debug: FlexBool,

    // Identity used for evaluation when a project is created without a context
    #[envconfig(default = "user")]
    pub default_context_kind: String,

    #[envconfig(default = "dev-environment")]
    pub default_context_key: String,

    // Upper bound for a single management API or evaluation call
    #[envconfig(default = "30000")]
    pub remote_timeout_ms: u64,

    #[envconfig(default = "5000")]
    pub store_timeout_ms: u64,
}

impl Config {
    pub fn default_test_config() -> Self {
        Self {
            debug: FlexBool(false),
            default_context_kind: "user".to_string(),
            default_context_key: "dev-environment".to_string(),
            remote_timeout_ms: 1000,
            store_timeout_ms: 1000,
        }
    }

    pub fn default_context(&self) -> EvaluationContext {
        EvaluationContext::new(&self.default_context_kind, &self.default_context_key)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

pub static DEFAULT_TEST_CONFIG: Lazy<Config> = Lazy::new(Config::default_test_config);

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::init_from_hashmap(&Default::default()).unwrap();

        assert!(!*config.debug);
        assert_eq!(config.default_context_kind, "user");
        assert_eq!(config.default_context_key, "dev-environment");
        assert_eq!(config.remote_timeout(), Duration::from_secs(30));
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_overrides() {
        let env: HashMap<String, String> = [
            ("DEBUG".to_string(), "yes".to_string()),
            ("DEFAULT_CONTEXT_KEY".to_string(), "me".to_string()),
            ("REMOTE_TIMEOUT_MS".to_string(), "250".to_string()),
        ]
        .into_iter()
        .collect();

        let config = Config::init_from_hashmap(&env).unwrap();

        assert!(*config.debug);
        assert_eq!(config.default_context(), EvaluationContext::user("me"));
        assert_eq!(config.remote_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_flex_bool_rejects_garbage() {
        assert!("maybe".parse::<FlexBool>().is_err());
        assert_eq!("ON".parse::<FlexBool>(), Ok(FlexBool(true)));
    }
}
