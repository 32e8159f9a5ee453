use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::Arg;
use clap::Command;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;

fn config_arg(key: ConfigKey, env_var: &'static str, help: &str) -> Arg {
    let mut help_text = help.to_string();
    let default = Config::default(key);
    if !default.is_empty() {
        help_text = format!("{help} [default: {default}]");
    }

    return Arg::new(key.to_string())
        .long(key.to_string())
        .env(env_var)
        .num_args(1)
        .help(help_text);
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

pub fn build() -> Command {
    return Command::new("sidekick")
        .about("Screen-aware AI companion. Watches your screen, chats about what it sees, and takes live speech input.")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand(subcommand_config())
        .arg(
            config_arg(
                ConfigKey::ConfigFile,
                "SIDEKICK_CONFIG_FILE",
                "Path to the configuration file.",
            )
            .short('c'),
        )
        .arg(
            config_arg(
                ConfigKey::ServerHost,
                "SIDEKICK_SERVER_HOST",
                "Companion server address as host:port. Schemes and trailing slashes are stripped.",
            )
            .short('s'),
        )
        .arg(
            config_arg(
                ConfigKey::Model,
                "SIDEKICK_MODEL",
                "Model identifier sent with every chat turn.",
            )
            .short('m'),
        )
        .arg(config_arg(
            ConfigKey::ScreenshotInterval,
            "SIDEKICK_SCREENSHOT_INTERVAL",
            "Seconds between screenshot captures.",
        ))
        .arg(config_arg(
            ConfigKey::ProactiveThreshold,
            "SIDEKICK_PROACTIVE_THRESHOLD",
            "Number of uploaded screenshots that triggers a proactive chat turn.",
        ))
        .arg(config_arg(
            ConfigKey::ChatTimeout,
            "SIDEKICK_CHAT_TIMEOUT",
            "Time in milliseconds before an in-flight chat request is cancelled.",
        ))
        .arg(config_arg(
            ConfigKey::ChatStuckTimeout,
            "SIDEKICK_CHAT_STUCK_TIMEOUT",
            "Time in milliseconds before stuck in-flight chat state is force-cleared.",
        ))
        .arg(config_arg(
            ConfigKey::InitialChatDelay,
            "SIDEKICK_INITIAL_CHAT_DELAY",
            "Delay in milliseconds before the opening chat turn after start.",
        ))
        .arg(config_arg(
            ConfigKey::AsrAppId,
            "SIDEKICK_ASR_APP_ID",
            "App id for the speech recognition relay.",
        ))
        .arg(config_arg(
            ConfigKey::AsrAccessToken,
            "SIDEKICK_ASR_ACCESS_TOKEN",
            "Access token for the speech recognition relay.",
        ))
        .arg(config_arg(
            ConfigKey::AsrUid,
            "SIDEKICK_ASR_UID",
            "User id reported in the recognition init frame.",
        ))
        .arg(config_arg(
            ConfigKey::AsrBinaryFrames,
            "SIDEKICK_ASR_BINARY_FRAMES",
            "Send recognition frames in the binary wire format instead of JSON.",
        ))
        .arg(config_arg(
            ConfigKey::AsrReconnectDelay,
            "SIDEKICK_ASR_RECONNECT_DELAY",
            "Delay in milliseconds before reopening a dropped recognition link.",
        ));
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(config_file_path.clone()).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    let config_path_display = config_file_path.as_os_str().to_string_lossy();
    println!("Created default config file at {config_path_display}");

    return Ok(());
}

/// Returns false when a subcommand handled everything and the process should
/// exit instead of running the session.
pub async fn parse() -> Result<bool> {
    let matches = build().get_matches();

    if let Some(("config", subcmd_matches)) = matches.subcommand() {
        match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
            }
            _ => {
                println!("{}", Config::serialize_default(build()));
            }
        }

        return Ok(false);
    }

    Config::load(&matches).await?;

    return Ok(true);
}
