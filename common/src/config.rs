use crate::util::SerdeLevelFilter;
use anyhow::{anyhow, Context};
use log::LevelFilter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::{
    env::{self, VarError},
    fs,
    path::{Path, PathBuf},
};

static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

const SEED_ENV_VAR: &str = "WOLFSTREET_SEED";
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

pub struct Config {
    pub starting_balance: Decimal,
    pub instruments: Vec<InstrumentSeed>,
    pub rng_seed: Option<u64>,
    pub log_level_filter: LevelFilter,
}

/// Values supplied on the command line, which take precedence over everything on disk.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub path: Option<PathBuf>,
    pub starting_balance: Option<Decimal>,
    pub rng_seed: Option<u64>,
}

impl Config {
    pub fn get() -> &'static Self {
        GLOBAL_CONFIG.get().expect("Config not set")
    }

    pub fn init(overrides: ConfigOverrides) -> anyhow::Result<()> {
        let config_path = overrides
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let on_disk_config = OnDiskConfig::load_or_create(&config_path)?;

        let env_seed = match read_opt_env_var(SEED_ENV_VAR)? {
            Some(var) => match var.parse::<u64>() {
                Ok(seed) => Some(seed),
                Err(_) => return Err(anyhow!("Invalid value for env var {SEED_ENV_VAR}: {var}")),
            },
            None => None,
        };

        let me = Self::resolve(on_disk_config, overrides, env_seed)?;

        GLOBAL_CONFIG
            .set(me)
            .map_err(|_| anyhow!("Config already initialized"))
    }

    // Precedence is command line, then environment, then the config file
    fn resolve(
        on_disk: OnDiskConfig,
        overrides: ConfigOverrides,
        env_seed: Option<u64>,
    ) -> anyhow::Result<Self> {
        let starting_balance = overrides
            .starting_balance
            .unwrap_or(on_disk.starting_balance);

        if starting_balance < Decimal::ZERO {
            return Err(anyhow!(
                "Starting balance cannot be negative, got {starting_balance}"
            ));
        }

        if on_disk.instruments.is_empty() {
            return Err(anyhow!("At least one instrument must be configured"));
        }

        Ok(Self {
            starting_balance,
            instruments: on_disk.instruments,
            rng_seed: overrides.rng_seed.or(env_seed).or(on_disk.rng_seed),
            log_level_filter: on_disk.log_level_filter,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentSeed {
    pub name: String,
    pub price: Decimal,
}

impl InstrumentSeed {
    fn new(name: &str, price: i64) -> Self {
        Self {
            name: name.to_owned(),
            price: Decimal::new(price, 0),
        }
    }
}

fn default_instruments() -> Vec<InstrumentSeed> {
    vec![
        InstrumentSeed::new("Apple", 150),
        InstrumentSeed::new("Google", 2500),
        InstrumentSeed::new("Microsoft", 300),
        InstrumentSeed::new("Amazon", 3200),
        InstrumentSeed::new("Facebook", 350),
        InstrumentSeed::new("Tesla", 700),
        InstrumentSeed::new("Netflix", 550),
        InstrumentSeed::new("Adobe", 600),
        InstrumentSeed::new("Nvidia", 800),
        InstrumentSeed::new("Intel", 50),
    ]
}

fn read_opt_env_var(env_var: &str) -> anyhow::Result<Option<String>> {
    match env::var(env_var) {
        Ok(var) => Ok(Some(var)),
        Err(VarError::NotPresent) => Ok(None),
        Err(error @ VarError::NotUnicode(_)) => {
            Err(anyhow!("Failed to parse env var {env_var}: {error}"))
        }
    }
}

#[derive(Serialize, Deserialize)]
struct OnDiskConfig {
    starting_balance: Decimal,
    instruments: Vec<InstrumentSeed>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rng_seed: Option<u64>,
    #[serde(with = "SerdeLevelFilter")]
    log_level_filter: LevelFilter,
}

impl OnDiskConfig {
    fn load_or_create(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let (default, buf) = Self::default_serialized();
            fs::write(config_path, buf.as_bytes()).context("Failed to write default config")?;
            return Ok(default);
        }

        let buf = fs::read_to_string(config_path).context("Failed to read config file")?;

        match serde_json::from_str::<OnDiskConfig>(&buf) {
            Ok(config) => Ok(config),
            Err(error) => {
                println!("Failed to read on-disk config ({error}), writing default config.");
                let (default, buf) = Self::default_serialized();
                fs::write(config_path, buf.as_bytes())
                    .context("Failed to write default config")?;
                Ok(default)
            }
        }
    }

    fn default_serialized() -> (Self, String) {
        let default = Self::default();
        let serialized =
            serde_json::to_string_pretty(&default).expect("Failed to serialize on-disk config");

        (default, serialized)
    }
}

impl Default for OnDiskConfig {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::new(10_000, 0),
            instruments: default_instruments(),
            rng_seed: None,
            log_level_filter: LevelFilter::Debug,
        }
    }
}
