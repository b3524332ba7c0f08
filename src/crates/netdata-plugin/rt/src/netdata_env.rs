//! Environment netdata sets for the plugins it spawns.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Variables netdata exports to external plugins.
///
/// A plugin started by hand sees none of them; [`running_under_netdata`]
/// tells the two cases apart.
///
/// [`running_under_netdata`]: NetdataEnv::running_under_netdata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetdataEnv {
    pub user_config_dir: Option<PathBuf>,
    pub stock_config_dir: Option<PathBuf>,
    pub update_every: Option<u64>,
    pub log_level: Option<LogLevel>,
    pub systemd_journal_path: Option<PathBuf>,
}

/// Severity names used by `NETDATA_LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
}

impl LogLevel {
    /// The closest `tracing` filter directive.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Emergency | LogLevel::Alert | LogLevel::Critical | LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Notice | LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "emergency" | "emerg" => Ok(LogLevel::Emergency),
            "alert" => Ok(LogLevel::Alert),
            "critical" | "crit" => Ok(LogLevel::Critical),
            "error" | "err" => Ok(LogLevel::Error),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "notice" => Ok(LogLevel::Notice),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl NetdataEnv {
    pub fn from_environment() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Self {
            user_config_dir: var("NETDATA_USER_CONFIG_DIR").map(PathBuf::from),
            stock_config_dir: var("NETDATA_STOCK_CONFIG_DIR").map(PathBuf::from),
            update_every: var("NETDATA_UPDATE_EVERY").and_then(|s| s.trim().parse().ok()),
            log_level: var("NETDATA_LOG_LEVEL").and_then(|s| s.trim().parse().ok()),
            systemd_journal_path: var("NETDATA_SYSTEMD_JOURNAL_PATH").map(PathBuf::from),
        }
    }

    pub fn running_under_netdata(&self) -> bool {
        self.user_config_dir.is_some() || self.stock_config_dir.is_some()
    }

    /// Locate `file_name` in the user config dir, then the stock config dir.
    pub fn find_config(&self, file_name: &str) -> Option<PathBuf> {
        [&self.user_config_dir, &self.stock_config_dir]
            .into_iter()
            .flatten()
            .map(|dir| dir.join(file_name))
            .find(|path| path.is_file())
    }

    /// Update interval requested by netdata, if any.
    pub fn update_interval(&self) -> Option<Duration> {
        self.update_every
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> NetdataEnv {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NetdataEnv::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_standalone() {
        let env = env_from(&[]);
        assert!(!env.running_under_netdata());
        assert_eq!(env.update_interval(), None);
        assert_eq!(env.find_config("memcached.yaml"), None);
    }

    #[test]
    fn test_under_netdata() {
        let env = env_from(&[
            ("NETDATA_STOCK_CONFIG_DIR", "/usr/lib/netdata/conf.d"),
            ("NETDATA_UPDATE_EVERY", "5"),
            ("NETDATA_LOG_LEVEL", "warning"),
            ("NETDATA_SYSTEMD_JOURNAL_PATH", ""),
        ]);
        assert!(env.running_under_netdata());
        assert_eq!(env.update_interval(), Some(Duration::from_secs(5)));
        assert_eq!(env.log_level, Some(LogLevel::Warning));
        assert_eq!(env.systemd_journal_path, None);
    }

    #[test]
    fn test_log_level_filters() {
        assert_eq!("crit".parse::<LogLevel>().unwrap().as_filter(), "error");
        assert_eq!("NOTICE".parse::<LogLevel>().unwrap().as_filter(), "info");
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_user_config_wins() {
        let user = tempfile::tempdir().unwrap();
        let stock = tempfile::tempdir().unwrap();
        std::fs::write(stock.path().join("zookeeper.yaml"), "targets: []\n").unwrap();

        let env = NetdataEnv {
            user_config_dir: Some(user.path().to_path_buf()),
            stock_config_dir: Some(stock.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(
            env.find_config("zookeeper.yaml"),
            Some(stock.path().join("zookeeper.yaml"))
        );

        std::fs::write(user.path().join("zookeeper.yaml"), "targets: []\n").unwrap();
        assert_eq!(
            env.find_config("zookeeper.yaml"),
            Some(user.path().join("zookeeper.yaml"))
        );
    }
}
