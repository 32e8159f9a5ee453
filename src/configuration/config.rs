#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path;
use std::str::FromStr;

use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumString;
use strum::IntoEnumIterator;
use tokio::fs;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Eq, PartialEq, EnumIter, EnumString, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    AsrAccessToken,
    AsrAppId,
    AsrBinaryFrames,
    AsrReconnectDelay,
    AsrUid,
    ChatStuckTimeout,
    ChatTimeout,
    ConfigFile,
    InitialChatDelay,
    Model,
    ProactiveThreshold,
    ScreenshotInterval,
    ServerHost,
    StateFile,
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    /// Numeric keys (timeouts, intervals, thresholds) fall back to their
    /// default when unset or unparseable.
    pub fn get_number(key: ConfigKey) -> u64 {
        if let Ok(val) = Config::get(key).parse::<u64>() {
            return val;
        }

        return Config::default(key).parse::<u64>().unwrap_or(0);
    }

    pub fn set(key: ConfigKey, value: &str) {
        if key == ConfigKey::ServerHost {
            CONFIG.insert(key.to_string(), Config::normalize_host(value));
            return;
        }

        CONFIG.insert(key.to_string(), value.to_string());
    }

    /// Server addresses arrive from user-facing settings and may carry a
    /// scheme or trailing slashes. The transports only want `host:port`.
    pub fn normalize_host(raw: &str) -> String {
        let mut host = raw.trim();
        for scheme in ["http://", "https://", "ws://", "wss://"] {
            if host.len() >= scheme.len() && host[..scheme.len()].eq_ignore_ascii_case(scheme) {
                host = &host[scheme.len()..];
                break;
            }
        }

        return host.trim_end_matches('/').to_string();
    }

    pub fn default(key: ConfigKey) -> String {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| return path::PathBuf::from("."))
            .join("sidekick");

        let res = match key {
            ConfigKey::AsrAccessToken => "".to_string(),
            ConfigKey::AsrAppId => "".to_string(),
            ConfigKey::AsrBinaryFrames => "false".to_string(),
            ConfigKey::AsrReconnectDelay => "3000".to_string(),
            ConfigKey::AsrUid => "SIDEKICK_CLIENT".to_string(),
            ConfigKey::ChatStuckTimeout => "60000".to_string(),
            ConfigKey::ChatTimeout => "30000".to_string(),
            ConfigKey::InitialChatDelay => "1000".to_string(),
            ConfigKey::Model => "bot-20241114164326-xlcc91".to_string(),
            ConfigKey::ProactiveThreshold => "5".to_string(),
            ConfigKey::ScreenshotInterval => "3".to_string(),
            ConfigKey::ServerHost => "".to_string(),

            // Special
            ConfigKey::ConfigFile => cache_dir.join("config.toml").to_string_lossy().to_string(),
            ConfigKey::StateFile => cache_dir.join("state.json").to_string_lossy().to_string(),
        };

        return res;
    }

    pub fn parse_key(name: &str) -> Option<ConfigKey> {
        return ConfigKey::from_str(name).ok();
    }

    pub async fn load(matches: &ArgMatches) -> Result<()> {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key))
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        if let Some(arg_config_file) = matches.get_one::<String>(&ConfigKey::ConfigFile.to_string())
        {
            config_file = arg_config_file.to_string();
        }

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if let Some(val) = doc.get(&key.to_string()) {
                    if let Some(val_int) = val.as_integer() {
                        Config::set(key, &val_int.to_string());
                    } else if let Some(val_bool) = val.as_bool() {
                        Config::set(key, &val_bool.to_string());
                    } else if let Some(val_str) = val.as_str() {
                        if val_str.is_empty() {
                            continue;
                        }
                        Config::set(key, val_str);
                    }
                }
            }
        }

        for key in ConfigKey::iter() {
            if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                if val.is_empty() {
                    continue;
                }
                Config::set(key, val)
            }
        }

        tracing::debug!(
            server_host = Config::get(ConfigKey::ServerHost),
            model = Config::get(ConfigKey::Model),
            screenshot_interval = Config::get(ConfigKey::ScreenshotInterval),
            proactive_threshold = Config::get(ConfigKey::ProactiveThreshold),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConfigFile || key == ConfigKey::StateFile {
                    return None;
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long().unwrap() == key.to_string())?;

                let description = arg
                    .get_help()
                    .unwrap()
                    .to_string()
                    .split("[default:")
                    .next()
                    .unwrap()
                    .trim()
                    .to_string();

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<i64>().is_ok() || val.parse::<bool>().is_ok() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
