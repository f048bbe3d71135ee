use crate::Uint256;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Holds all the "constants" for a network, restricted to those used up to Bellatrix.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ChainSpec {
    /*
     * Config name
     */
    pub config_name: Option<String>,

    /*
     * Time parameters
     */
    pub seconds_per_slot: u64,
    pub slots_per_epoch: u64,

    /*
     * State list lengths
     */
    pub slots_per_historical_root: u64,
    pub epochs_per_historical_vector: u64,

    /*
     * Merge
     */
    pub terminal_total_difficulty: Uint256,
}

impl ChainSpec {
    /// Returns a `ChainSpec` for Ethereum mainnet.
    ///
    /// The merge is not configured: the terminal total difficulty is unreachable.
    pub fn mainnet() -> Self {
        Self {
            config_name: Some("mainnet".to_string()),
            seconds_per_slot: 12,
            slots_per_epoch: 32,
            slots_per_historical_root: 8_192,
            epochs_per_historical_vector: 65_536,
            terminal_total_difficulty: Uint256::MAX,
        }
    }

    /// The `minimal` preset used by testnets and tests.
    pub fn minimal() -> Self {
        Self {
            config_name: Some("minimal".to_string()),
            seconds_per_slot: 6,
            slots_per_epoch: 8,
            slots_per_historical_root: 64,
            epochs_per_historical_vector: 64,
            ..ChainSpec::mainnet()
        }
    }

    pub fn preset_base(&self) -> &str {
        match self.slots_per_epoch {
            8 => "minimal",
            _ => "mainnet",
        }
    }
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self::mainnet()
    }
}

/// Exact YAML representation of the runtime config values this node consumes.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "UPPERCASE")]
pub struct Config {
    #[serde(default)]
    pub config_name: Option<String>,
    #[serde(default = "default_preset_base")]
    pub preset_base: String,

    #[serde(default = "default_terminal_total_difficulty")]
    #[serde(with = "serde_utils::quoted_u256")]
    pub terminal_total_difficulty: Uint256,

    #[serde(default = "default_seconds_per_slot")]
    #[serde(with = "serde_utils::quoted_u64")]
    pub seconds_per_slot: u64,
}

fn default_preset_base() -> String {
    "mainnet".to_string()
}

fn default_terminal_total_difficulty() -> Uint256 {
    Uint256::MAX
}

fn default_seconds_per_slot() -> u64 {
    12
}

impl Default for Config {
    fn default() -> Self {
        Self::from_chain_spec(&ChainSpec::mainnet())
    }
}

impl Config {
    pub fn from_chain_spec(spec: &ChainSpec) -> Self {
        Self {
            config_name: spec.config_name.clone(),
            preset_base: spec.preset_base().to_string(),
            terminal_total_difficulty: spec.terminal_total_difficulty,
            seconds_per_slot: spec.seconds_per_slot,
        }
    }

    pub fn from_file(filename: &Path) -> Result<Self, String> {
        let f = File::open(filename)
            .map_err(|e| format!("Error opening spec at {}: {:?}", filename.display(), e))?;
        serde_yaml::from_reader(f)
            .map_err(|e| format!("Error parsing spec at {}: {:?}", filename.display(), e))
    }

    /// Overlays this config on the preset it names. Returns `None` for an unknown preset.
    pub fn apply_to_chain_spec(&self, chain_spec: &ChainSpec) -> Option<ChainSpec> {
        let base = match self.preset_base.as_str() {
            "mainnet" => ChainSpec::mainnet(),
            "minimal" => ChainSpec::minimal(),
            _ => return None,
        };

        if chain_spec.preset_base() != base.preset_base() {
            return None;
        }

        Some(ChainSpec {
            config_name: self.config_name.clone(),
            seconds_per_slot: self.seconds_per_slot,
            terminal_total_difficulty: self.terminal_total_difficulty,
            ..chain_spec.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_ttd_is_unreachable() {
        assert_eq!(ChainSpec::mainnet().terminal_total_difficulty, Uint256::MAX);
        assert_eq!(ChainSpec::minimal().terminal_total_difficulty, Uint256::MAX);
    }

    #[test]
    fn config_from_yaml_file() {
        let mut file = NamedTempFile::new().expect("should create temp file");
        write!(
            file,
            "CONFIG_NAME: 'kiln'\n\
             PRESET_BASE: 'minimal'\n\
             TERMINAL_TOTAL_DIFFICULTY: '20000000000000'\n\
             SECONDS_PER_SLOT: 3\n"
        )
        .expect("should write config");

        let config = Config::from_file(file.path()).expect("should parse config");
        assert_eq!(config.config_name.as_deref(), Some("kiln"));
        assert_eq!(
            config.terminal_total_difficulty,
            Uint256::from(20_000_000_000_000u64)
        );

        let spec = config
            .apply_to_chain_spec(&ChainSpec::minimal())
            .expect("should apply to minimal");
        assert_eq!(spec.seconds_per_slot, 3);
        assert_eq!(spec.slots_per_epoch, 8);
        assert_eq!(spec.terminal_total_difficulty, config.terminal_total_difficulty);

        assert!(config.apply_to_chain_spec(&ChainSpec::mainnet()).is_none());
    }

    #[test]
    fn config_yaml_round_trip() {
        let config = Config::from_chain_spec(&ChainSpec::minimal());
        let yaml = serde_yaml::to_string(&config).expect("should serialize");
        assert!(yaml.contains("TERMINAL_TOTAL_DIFFICULTY"));
        let decoded: Config = serde_yaml::from_str(&yaml).expect("should deserialize");
        assert_eq!(decoded, config);
    }
}
