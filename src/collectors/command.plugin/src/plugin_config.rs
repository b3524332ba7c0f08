use anyhow::{Context, Result};
use clap::Parser;
use rt::NetdataEnv;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "commands.yaml";
const DEFAULT_CONF: &str = "/etc/netdata/commands.conf";
const DEFAULT_FAMILY: &str = "commands";

/// Parse a duration string for clap (e.g., "60s", "5m")
fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s)
        .map_err(|e| format!("Invalid duration format: '{}'. Use formats like '60s', '5m'. Error: {}", s, e))
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "command.plugin")]
#[command(about = "Runs shell commands and charts their output for netdata.")]
#[command(version = "0.1")]
pub struct Cli {
    /// Collection interval in seconds, as passed by netdata
    pub update_every: Option<String>,

    /// Command configuration file, YAML (.yml, .yaml) or name=command lines
    #[arg(long)]
    pub conf: Option<PathBuf>,

    /// Minimum time between two runs of a command. Default: the collection interval.
    #[arg(long, value_parser = parse_duration)]
    pub command_interval: Option<Duration>,

    /// Time allowed for one command to finish
    #[arg(long, value_parser = parse_duration, default_value = "30s")]
    pub timeout: Duration,
}

/// One command to run.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommandSpec {
    pub name: String,

    pub command: String,

    #[serde(default = "default_family")]
    pub family: String,

    #[serde(default)]
    pub desc: Option<String>,

    /// Overrides `--command-interval` for this command
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,

    /// Always chart the output as a label, even when it is a number
    #[serde(default)]
    pub value_is_label: bool,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            family: default_family(),
            desc: None,
            interval: None,
            value_is_label: false,
        }
    }

    /// Chart title: the description, or the command line itself.
    pub fn title(&self) -> &str {
        self.desc.as_deref().unwrap_or(&self.command)
    }
}

fn default_family() -> String {
    DEFAULT_FAMILY.to_string()
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommandsFile {
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

/// Load commands from `path`.
///
/// Files ending in `.yml` or `.yaml` hold a `commands:` list. Anything else
/// is read as `name = command` lines, in name order.
pub fn load_commands(path: &Path) -> Result<Vec<CommandSpec>> {
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yml") | Some("yaml")
    );

    if is_yaml {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let file: CommandsFile = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config file: {}", path.display()))?;
        return Ok(file.commands);
    }

    let conf = rt::read_key_value_conf(path, "=")
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    Ok(conf
        .into_iter()
        .map(|(name, command)| CommandSpec::new(name, command))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    pub interval: Duration,
    pub command_interval: Duration,
    pub timeout: Duration,
    pub commands: Vec<CommandSpec>,
}

impl PluginConfig {
    pub fn resolve(cli: Cli, env: &NetdataEnv) -> Result<Self> {
        let interval = match cli.update_every.as_deref() {
            Some(arg) => rt::parse_interval_seconds(Some(arg)),
            None => env
                .update_interval()
                .unwrap_or_else(|| rt::parse_interval_seconds(None)),
        };

        let conf = cli
            .conf
            .or_else(|| env.find_config(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONF));
        let commands = load_commands(&conf).context("could not load commands")?;

        for command in &commands {
            if command.name.trim().is_empty() || command.command.trim().is_empty() {
                anyhow::bail!("{}: every command needs a name and a command line", conf.display());
            }
        }

        tracing::info!("loaded {} commands from {}", commands.len(), conf.display());

        Ok(Self {
            interval,
            command_interval: cli.command_interval.unwrap_or(interval),
            timeout: cli.timeout,
            commands,
        })
    }
}
