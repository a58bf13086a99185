use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::flags::flag_models::{FlagState, FlagsState};

/// A manual value for one flag in one project, layered over the synced state at read time.
///
/// `active == false` keeps the override stored but suppressed: it is skipped by layering
/// and left out of anything shown to clients.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Override {
    pub project_key: String,
    pub flag_key: String,
    pub value: Value,
    pub active: bool,
    pub version: i64,
}

impl Override {
    /// Layers this override over a synced flag state. Inactive overrides return the state as is.
    /// An active override bumps the version by one so consumers can tell the value differs
    /// from the remote. The version saturates at `i64::MAX`.
    pub fn apply(&self, state: &FlagState) -> FlagState {
        if !self.active {
            return state.clone();
        }
        FlagState {
            value: self.value.clone(),
            version: state.version.saturating_add(1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Overrides(pub Vec<Override>);

impl Overrides {
    /// Returns the active override for a flag, if any.
    pub fn get_flag(&self, flag_key: &str) -> Option<&Override> {
        self.0.iter().find(|o| o.active && o.flag_key == flag_key)
    }

    /// The overrides shown to clients, keyed by flag. Inactive overrides are excluded.
    pub fn active_flag_states(&self) -> FlagsState {
        self.0
            .iter()
            .filter(|o| o.active)
            .map(|o| {
                (
                    o.flag_key.clone(),
                    FlagState {
                        value: o.value.clone(),
                        version: o.version,
                    },
                )
            })
            .collect()
    }

    /// Layers the active overrides over `synced` and returns a new map. Overrides for flags
    /// missing from the synced state are ignored.
    pub fn layer_over(&self, synced: &FlagsState) -> FlagsState {
        synced
            .iter()
            .map(|(flag_key, state)| {
                let state = match self.get_flag(flag_key) {
                    Some(flag_override) => flag_override.apply(state),
                    None => state.clone(),
                };
                (flag_key.clone(), state)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Override> {
        self.0.iter()
    }
}

impl From<Vec<Override>> for Overrides {
    fn from(overrides: Vec<Override>) -> Self {
        Overrides(overrides)
    }
}

impl IntoIterator for Overrides {
    type Item = Override;
    type IntoIter = std::vec::IntoIter<Override>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
