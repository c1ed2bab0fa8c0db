//! Configuration parsing and validation.
//!
//! hvfleet configuration is a JSON document describing which boards and
//! channels should exist (`board_info`), the per-layer default voltage and
//! maximum current profile, and an optional `supervisor` section with the
//! ambient knobs (refresh TTL, base ramp rates, current range, storage
//! path, log level).
//!
//! Configuration problems are fatal at startup: no partial supervisor is
//! ever started from a config that fails [`Config::validate`].

use crate::core::error::{HvError, HvResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Layer key that marks a channel as ungrouped (the sentinel layer).
const UNGROUPED_LAYER: i64 = -1;

/// Fallback maximum current when a layer has no configured default.
const FALLBACK_MAX_CURRENT: f64 = 50.0;

/// Top-level hvfleet configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Board declarations keyed by board address.
    pub board_info: BTreeMap<String, BoardEntry>,

    /// Default target voltage per layer (layer number as a string key).
    pub default_voltages: BTreeMap<String, f64>,

    /// Default maximum current per layer.
    pub default_max_current: BTreeMap<String, f64>,

    /// Supervisor runtime settings.
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

/// One board declaration.
///
/// The field set is closed: a board entry with missing or extra fields is a
/// configuration error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoardEntry {
    /// Conet number of the physical bus path.
    pub conet: i64,

    /// Link number of the physical bus path.
    pub link: i64,

    /// Channel numbers grouped by layer (layer number as a string key).
    pub channels_by_layer: BTreeMap<String, Vec<u16>>,

    /// Channel aliases, indexed by channel number.
    pub aliases: Vec<String>,
}

/// Supervisor runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Maximum age of cached channel parameters before a live read, in seconds.
    #[serde(default = "default_refresh_time_seconds")]
    pub refresh_time_seconds: u64,

    /// Base ramp-up speed in V/s.
    #[serde(default = "default_ramp_up")]
    pub ramp_up: f64,

    /// Base ramp-down speed in V/s.
    #[serde(default = "default_ramp_down")]
    pub ramp_down: f64,

    /// Read currents on the high range (`IMonH`) rather than the low range.
    #[serde(default = "default_is_high_range")]
    pub is_high_range: bool,

    /// Path of the persistent parameter cache.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            refresh_time_seconds: default_refresh_time_seconds(),
            ramp_up: default_ramp_up(),
            ramp_down: default_ramp_down(),
            is_high_range: default_is_high_range(),
            storage_path: default_storage_path(),
            log_level: default_log_level(),
        }
    }
}

// Default value functions

fn default_refresh_time_seconds() -> u64 {
    10
}

fn default_ramp_up() -> f64 {
    10.0
}

fn default_ramp_down() -> f64 {
    100.0
}

fn default_is_high_range() -> bool {
    true
}

fn default_storage_path() -> String {
    "data/hvfleet.redb".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One channel derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Channel number on its board.
    pub channel: u16,

    /// Human-readable label. Informational only.
    pub alias: String,

    /// Layer grouping key; `None` for the ungrouped sentinel.
    pub layer: Option<i64>,
}

/// One board derived from configuration, with its full channel set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSpec {
    /// Unique board address.
    pub address: String,

    /// Conet number of the physical bus path.
    pub conet: i64,

    /// Link number of the physical bus path.
    pub link: i64,

    /// Channels this board should expose, sorted by channel number.
    pub channels: Vec<ChannelSpec>,
}

/// Per-layer default voltage and maximum current profile.
#[derive(Debug, Clone)]
pub struct VoltageProfile {
    default_voltages: BTreeMap<i64, f64>,
    default_max_current: BTreeMap<i64, f64>,
    max_default_voltage: f64,
}

impl VoltageProfile {
    /// Default target voltage for a layer. Zero for the ungrouped sentinel
    /// and for layers with no configured default.
    pub fn default_voltage(&self, layer: Option<i64>) -> f64 {
        match layer {
            Some(layer) => self.default_voltages.get(&layer).copied().unwrap_or(0.0),
            None => 0.0,
        }
    }

    /// Default maximum current for a layer, falling back to 50.0.
    pub fn max_current(&self, layer: Option<i64>) -> f64 {
        match layer {
            Some(layer) => self
                .default_max_current
                .get(&layer)
                .copied()
                .unwrap_or(FALLBACK_MAX_CURRENT),
            None => FALLBACK_MAX_CURRENT,
        }
    }

    /// The maximum default voltage across all configured layers.
    pub fn max_default_voltage(&self) -> f64 {
        self.max_default_voltage
    }

    /// Ramp speed modifier for a layer: its default voltage relative to the
    /// fleet-wide maximum. The ungrouped sentinel ramps at full speed.
    pub fn layer_speed_mod(&self, layer: Option<i64>) -> f64 {
        match layer {
            Some(_) => self.default_voltage(layer) / self.max_default_voltage,
            None => 1.0,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    /// Load configuration from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(content).with_context(|| "failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        // The derivations run the full key-parsing and cross-checking logic.
        self.board_specs()?;
        self.profile()?;
        self.validate_supervisor()?;
        Ok(())
    }

    fn validate_supervisor(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.supervisor.log_level.as_str()) {
            anyhow::bail!(
                "supervisor.log_level must be one of {:?}, got: {}",
                valid_levels,
                self.supervisor.log_level
            );
        }
        if self.supervisor.refresh_time_seconds == 0 {
            anyhow::bail!("supervisor.refresh_time_seconds must be > 0");
        }
        if self.supervisor.ramp_up <= 0.0 || self.supervisor.ramp_down <= 0.0 {
            anyhow::bail!("supervisor ramp rates must be > 0");
        }
        Ok(())
    }

    /// Derive the board specs the directory reconciles against, sorted by
    /// address so fleet operations process boards in a stable order.
    pub fn board_specs(&self) -> HvResult<Vec<BoardSpec>> {
        let mut specs = Vec::with_capacity(self.board_info.len());
        for (address, entry) in &self.board_info {
            let mut channels = Vec::new();
            for (layer_key, channel_nums) in &entry.channels_by_layer {
                let layer = parse_layer_key(layer_key, address)?;
                for &channel in channel_nums {
                    let alias = entry.aliases.get(channel as usize).cloned().ok_or_else(|| {
                        HvError::config(format!(
                            "board {address}: no alias for channel {channel} \
                             (aliases are indexed by channel number)"
                        ))
                    })?;
                    channels.push(ChannelSpec {
                        channel,
                        alias,
                        layer,
                    });
                }
            }
            channels.sort_by_key(|ch| ch.channel);
            channels.dedup_by_key(|ch| ch.channel);
            specs.push(BoardSpec {
                address: address.clone(),
                conet: entry.conet,
                link: entry.link,
                channels,
            });
        }
        Ok(specs)
    }

    /// Derive the per-layer voltage/current profile.
    pub fn profile(&self) -> HvResult<VoltageProfile> {
        let default_voltages = parse_layer_map(&self.default_voltages, "default_voltages")?;
        let default_max_current =
            parse_layer_map(&self.default_max_current, "default_max_current")?;

        let max_default_voltage = default_voltages
            .values()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if !max_default_voltage.is_finite() || max_default_voltage <= 0.0 {
            return Err(HvError::config(
                "default_voltages must contain at least one layer with a positive voltage",
            ));
        }

        Ok(VoltageProfile {
            default_voltages,
            default_max_current,
            max_default_voltage,
        })
    }
}

/// Parse a layer map key. `-1` is the ungrouped sentinel.
fn parse_layer_key(key: &str, context: &str) -> HvResult<Option<i64>> {
    let layer: i64 = key.parse().map_err(|_| {
        HvError::config(format!("{context}: layer key '{key}' is not an integer"))
    })?;
    if layer == UNGROUPED_LAYER {
        Ok(None)
    } else {
        Ok(Some(layer))
    }
}

fn parse_layer_map(
    map: &BTreeMap<String, f64>,
    field: &str,
) -> HvResult<BTreeMap<i64, f64>> {
    let mut out = BTreeMap::new();
    for (key, value) in map {
        let layer: i64 = key.parse().map_err(|_| {
            HvError::config(format!("{field}: layer key '{key}' is not an integer"))
        })?;
        out.insert(layer, *value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "board_info": {
                "40000000": {
                    "conet": 0,
                    "link": 0,
                    "channels_by_layer": {"1": [0], "2": [1], "-1": [2]},
                    "aliases": ["l1", "l2", "spare"]
                }
            },
            "default_voltages": {"1": 1000.0, "2": 2000.0},
            "default_max_current": {"1": 20.0, "2": 40.0}
        }"#
    }

    #[test]
    fn parses_and_derives_specs() {
        let config = Config::from_json_str(sample_json()).unwrap();
        let specs = config.board_specs().unwrap();
        assert_eq!(specs.len(), 1);
        let board = &specs[0];
        assert_eq!(board.address, "40000000");
        assert_eq!(board.channels.len(), 3);
        assert_eq!(board.channels[0].layer, Some(1));
        assert_eq!(board.channels[2].layer, None);
        assert_eq!(board.channels[2].alias, "spare");
    }

    #[test]
    fn profile_scaling_values() {
        let config = Config::from_json_str(sample_json()).unwrap();
        let profile = config.profile().unwrap();
        assert_eq!(profile.max_default_voltage(), 2000.0);
        assert_eq!(profile.default_voltage(Some(1)), 1000.0);
        assert_eq!(profile.default_voltage(Some(7)), 0.0);
        assert_eq!(profile.default_voltage(None), 0.0);
        assert_eq!(profile.layer_speed_mod(Some(1)), 0.5);
        assert_eq!(profile.layer_speed_mod(None), 1.0);
        assert_eq!(profile.max_current(Some(2)), 40.0);
        assert_eq!(profile.max_current(Some(9)), 50.0);
    }

    #[test]
    fn missing_alias_is_a_config_error() {
        let bad = r#"{
            "board_info": {
                "b": {
                    "conet": 0, "link": 0,
                    "channels_by_layer": {"1": [5]},
                    "aliases": ["only-one"]
                }
            },
            "default_voltages": {"1": 100.0},
            "default_max_current": {}
        }"#;
        assert!(Config::from_json_str(bad).is_err());
    }

    #[test]
    fn extra_board_field_is_rejected() {
        let bad = r#"{
            "board_info": {
                "b": {
                    "conet": 0, "link": 0,
                    "channels_by_layer": {}, "aliases": [],
                    "surprise": 1
                }
            },
            "default_voltages": {"1": 100.0},
            "default_max_current": {}
        }"#;
        assert!(Config::from_json_str(bad).is_err());
    }

    #[test]
    fn empty_default_voltages_is_fatal() {
        let bad = r#"{
            "board_info": {},
            "default_voltages": {},
            "default_max_current": {}
        }"#;
        assert!(Config::from_json_str(bad).is_err());
    }

    #[test]
    fn supervisor_defaults_apply() {
        let config = Config::from_json_str(sample_json()).unwrap();
        assert_eq!(config.supervisor.refresh_time_seconds, 10);
        assert_eq!(config.supervisor.ramp_up, 10.0);
        assert_eq!(config.supervisor.ramp_down, 100.0);
        assert!(config.supervisor.is_high_range);
    }
}
