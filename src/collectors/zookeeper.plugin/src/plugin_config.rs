use anyhow::{Context, Result};
use clap::Parser;
use rt::NetdataEnv;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "zookeeper.yaml";
const DEFAULT_NAMESPACE: &str = "OPENIO";
const DEFAULT_PREFIX: &str = "zookeeper";

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "zookeeper.plugin")]
#[command(about = "Collects zookeeper mntr statistics for netdata.")]
#[command(version = "0.1")]
pub struct Cli {
    /// Collection interval in seconds, as passed by netdata
    pub update_every: Option<String>,

    /// Comma separated list of zookeeper IP:PORT
    #[arg(long, value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Namespace used in dimension ids
    #[arg(long)]
    pub ns: Option<String>,

    /// Chart type of every chart
    #[arg(long)]
    pub prefix: Option<String>,

    /// Collection cycles before the plugin exits to be restarted by netdata
    #[arg(long, default_value_t = rt::retry::POLLS_BEFORE_RELOAD)]
    pub max_cycles: u64,

    /// YAML configuration file, used when no targets are given
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub targets: Vec<String>,

    #[serde(default)]
    pub ns: Option<String>,

    #[serde(default)]
    pub prefix: Option<String>,
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
    pub ns: String,
    pub prefix: String,
    pub max_cycles: u64,
}

impl PluginConfig {
    pub fn resolve(cli: Cli, env: &NetdataEnv) -> Result<Self> {
        let interval = match cli.update_every.as_deref() {
            Some(arg) => rt::parse_interval_seconds(Some(arg)),
            None => env
                .update_interval()
                .unwrap_or_else(|| rt::parse_interval_seconds(None)),
        };

        let file = match cli.config.clone().or_else(|| env.find_config(CONFIG_FILE)) {
            Some(path) => FileConfig::from_yaml_file(path)?,
            None => FileConfig::default(),
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
            if !matches!(target.rsplit_once(':'), Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok())
            {
                anyhow::bail!("invalid address {}, must be IP:PORT", target);
            }
        }

        Ok(Self {
            interval,
            targets,
            ns: cli.ns.or(file.ns).unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            prefix: cli.prefix.or(file.prefix).unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            max_cycles: cli.max_cycles.max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("zookeeper.plugin").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = PluginConfig::resolve(cli(&["1", "--targets", "10.0.0.1:2181"]), &NetdataEnv::default())
            .unwrap();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.ns, "OPENIO");
        assert_eq!(config.prefix, "zookeeper");
        assert_eq!(config.max_cycles, 1000);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            "targets: [\"10.0.0.1:2181\", \"10.0.0.2:2181\"]\nns: PROD\nprefix: zk\n",
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let config = PluginConfig::resolve(cli(&["--config", path, "--ns", "TEST"]), &NetdataEnv::default())
            .unwrap();
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.ns, "TEST");
        assert_eq!(config.prefix, "zk");
        assert_eq!(config.interval, Duration::from_secs(10));
    }

    #[test]
    fn test_bad_targets() {
        assert!(PluginConfig::resolve(cli(&["10"]), &NetdataEnv::default()).is_err());
        assert!(PluginConfig::resolve(cli(&["10", "--targets", "zk1:port"]), &NetdataEnv::default()).is_err());
    }
}
