//! Runtime configuration for the harness.
//!
//! Settings resolve from layered sources, later ones winning: built-in
//! defaults, an optional YAML file, `CACHEBENCH_`-prefixed environment
//! variables, and finally the positional request-count argument.

use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use argh::FromArgs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "CACHEBENCH_";

/// Synthetic load generator for a cache service.
#[derive(Debug, FromArgs)]
pub struct Args {
    /// path to the yaml configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    /// number of measured requests, overriding the configured value
    #[argh(positional)]
    pub num_requests: Option<usize>,
}

/// Benchmark settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Host of the cache service.
    pub host: String,
    /// Port of the cache service.
    pub port: u16,
    /// Number of measured requests.
    pub num_requests: usize,
    /// Number of SET requests issued before measuring.
    pub warmup_steps: usize,
    /// Base seed of the measured request stream; request `i` derives its
    /// sample from `seed + i`.
    pub seed: u64,
    /// Smallest generated key length.
    pub min_key_size: usize,
    /// Largest generated key length.
    pub max_key_size: usize,
    /// Smallest generated value length.
    pub min_val_size: usize,
    /// Largest generated value length.
    pub max_val_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            num_requests: 1000,
            warmup_steps: 100,
            seed: 0,
            min_key_size: 1,
            max_key_size: 250,
            min_val_size: 1,
            max_val_size: 10000,
        }
    }
}

impl Config {
    /// Resolves the configuration for the given command line.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(config_path) = &args.config {
            figment = figment.merge(Yaml::file(config_path));
        }
        let mut config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .context("failed to load configuration")?;

        if let Some(num_requests) = args.num_requests {
            config.num_requests = num_requests;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.num_requests >= 1, "num_requests must be at least 1");
        ensure!(
            1 <= self.min_key_size && self.min_key_size <= self.max_key_size,
            "key size bounds must satisfy 1 <= min <= max (got [{}, {}])",
            self.min_key_size,
            self.max_key_size,
        );
        ensure!(
            1 <= self.min_val_size && self.min_val_size <= self.max_val_size,
            "value size bounds must satisfy 1 <= min <= max (got [{}, {}])",
            self.min_val_size,
            self.max_val_size,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = Config::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.num_requests, 1000);
        assert_eq!(config.warmup_steps, 100);
        assert_eq!(config.seed, 0);
        assert_eq!((config.min_key_size, config.max_key_size), (1, 250));
        assert_eq!((config.min_val_size, config.max_val_size), (1, 10000));
    }

    #[test]
    fn positional_argument_overrides_num_requests() {
        let args = Args {
            config: None,
            num_requests: Some(25),
        };
        let config = Config::resolve(&args).unwrap();
        assert_eq!(config.num_requests, 25);
    }

    #[test]
    fn rejects_zero_requests() {
        let args = Args {
            config: None,
            num_requests: Some(0),
        };
        assert!(Config::resolve(&args).is_err());
    }

    #[test]
    fn rejects_inverted_size_bounds() {
        let config = Config {
            min_key_size: 10,
            max_key_size: 5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
