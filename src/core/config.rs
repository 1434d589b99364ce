use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::Result;

/// Default for [`GateConfig::max_batch_size`].
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10_000;

/// How a push event's text is allowed to seed the text the operator is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// Only fill slots that are still empty, so an in-progress edit is never clobbered.
    #[default]
    FillEmpty,
    /// Always replace the local text with the pushed one.
    Overwrite,
}

/// Which protocol the iteration gate speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IteratorMode {
    /// Free navigation over the whole batch, one persisted text per item.
    #[default]
    Navigable,
    /// Deprecated forward-only mode: submit one item, advance manually.
    Sequential,
}

/// Settings shared by every gate a host creates.
///
/// Every key is optional in the JSON form; missing keys take the [`Default`] value.
///
/// # Example
/// ```rust
/// use pausegate::{GateConfig, SeedPolicy};
///
/// let config = GateConfig::from_json_str(r#"{ "seed_policy": "overwrite" }"#).unwrap();
/// assert_eq!(config.seed_policy, SeedPolicy::Overwrite);
/// assert!(config.default_blocking);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Initial value of the `blocking` field on newly created gates.
    pub default_blocking: bool,
    /// Text seeding policy of the iteration gate.
    pub seed_policy: SeedPolicy,
    /// Protocol variant of the iteration gate.
    pub iterator_mode: IteratorMode,
    /// Whether push events without an instance scope fan out to every instance of their type.
    pub broadcast_unscoped: bool,
    /// Largest batch an iteration gate accepts. Pushes announcing more items are dropped.
    pub max_batch_size: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            default_blocking: true,
            seed_policy: SeedPolicy::default(),
            iterator_mode: IteratorMode::default(),
            broadcast_unscoped: true,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl GateConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}
