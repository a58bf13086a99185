use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::{AllFlagsState, RemoteFlag};

/// The synced value of a single flag, as last reported by the remote evaluation client.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FlagState {
    pub value: Value,
    pub version: i64,
}

/// Flag key to synced state. Never carries overrides unless it was produced by layering.
pub type FlagsState = HashMap<String, FlagState>;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Variation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FlagVariation {
    pub flag_key: String,
    pub variation: Variation,
}

/// Converts the evaluation client's all-flags result into the stored snapshot.
/// Flags the client reports without a version are stored at version 0.
pub fn flags_state_from_all_flags(all_flags: AllFlagsState) -> FlagsState {
    all_flags
        .into_iter()
        .map(|(key, evaluated)| {
            (
                key,
                FlagState {
                    value: evaluated.value,
                    version: evaluated.version.unwrap_or_default(),
                },
            )
        })
        .collect()
}

/// Flattens the remote flag list into one catalog entry per variation, keeping
/// flag order and then variation order.
pub fn flatten_variations(flags: Vec<RemoteFlag>) -> Vec<FlagVariation> {
    let mut all_variations = Vec::new();
    for flag in flags {
        for variation in flag.variations {
            // TRICKY: the management API marks the id optional, but every real variation has one.
            let Some(id) = variation.id else {
                tracing::warn!(flag_key = %flag.key, "skipping variation without an id");
                continue;
            };
            all_variations.push(FlagVariation {
                flag_key: flag.key.clone(),
                variation: Variation {
                    id,
                    name: variation.name,
                    description: variation.description,
                    value: variation.value,
                },
            });
        }
    }
    all_variations
}

/// Groups the variation catalog by flag key, the shape clients use to build override pickers.
pub fn group_variations_by_flag(variations: &[FlagVariation]) -> HashMap<String, Vec<Variation>> {
    let mut grouped: HashMap<String, Vec<Variation>> = HashMap::new();
    for flag_variation in variations {
        grouped
            .entry(flag_variation.flag_key.clone())
            .or_default()
            .push(flag_variation.variation.clone());
    }
    grouped
}
