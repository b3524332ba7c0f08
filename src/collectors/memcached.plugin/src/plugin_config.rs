use anyhow::{Context, Result};
use clap::Parser;
use rt::NetdataEnv;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "memcached.yaml";

/// Parse a duration string for clap (e.g., "5s", "500ms")
fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s)
        .map_err(|e| format!("Invalid duration format: '{}'. Use formats like '5s', '500ms'. Error: {}", s, e))
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "memcached.plugin")]
#[command(about = "Collects memcached statistics for netdata.")]
#[command(version = "0.1")]
pub struct Cli {
    /// Collection interval in seconds, as passed by netdata
    pub update_every: Option<String>,

    /// Comma separated list of memcached IP:PORT
    #[arg(long, value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Time allowed for one stats exchange with a target
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// YAML configuration file, used when no targets are given
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub targets: Vec<String>,

    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl FileConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config file: {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    pub interval: Duration,
    pub targets: Vec<String>,
    pub timeout: Duration,
}

impl PluginConfig {
    /// Merge the command line with the config file found through `env`.
    ///
    /// Targets on the command line win; the config file is only read when
    /// there are none.
    pub fn resolve(cli: Cli, env: &NetdataEnv) -> Result<Self> {
        let interval = match cli.update_every.as_deref() {
            Some(arg) => rt::parse_interval_seconds(Some(arg)),
            None => env
                .update_interval()
                .unwrap_or_else(|| rt::parse_interval_seconds(None)),
        };

        let file = if cli.targets.is_empty() {
            match cli.config.clone().or_else(|| env.find_config(CONFIG_FILE)) {
                Some(path) => FileConfig::from_yaml_file(path)?,
                None => FileConfig::default(),
            }
        } else {
            FileConfig::default()
        };

        let targets = if cli.targets.is_empty() { file.targets } else { cli.targets };
        let targets: Vec<String> = targets
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if targets.is_empty() {
            anyhow::bail!("missing targets");
        }
        for target in &targets {
            validate_target(target)?;
        }

        let timeout = cli.timeout.or(file.timeout).unwrap_or(interval);

        Ok(Self {
            interval,
            targets,
            timeout,
        })
    }
}

fn validate_target(target: &str) -> Result<()> {
    let Some((host, port)) = target.rsplit_once(':') else {
        anyhow::bail!("invalid address {}, must be IP:PORT", target);
    };
    if host.is_empty() || port.parse::<u16>().is_err() {
        anyhow::bail!("invalid address {}, must be IP:PORT", target);
    }
    Ok(())
}
