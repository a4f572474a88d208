use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use hub::HubConfig;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Number of events buffered per WebSocket subscriber before it is evicted as too slow
    #[arg(long, env, default_value_t = hub::config::DEFAULT_MAILBOX_CAPACITY)]
    pub hub_mailbox_capacity: usize,

    /// Number of published events the hub queues before dropping new ones
    #[arg(long, env, default_value_t = hub::config::DEFAULT_PUBLISH_BUFFER)]
    pub hub_publish_buffer: usize,

    /// Seconds between keepalive pings sent to each subscriber (must be below the pong wait)
    #[arg(long, env, default_value_t = 54)]
    pub hub_ping_period_secs: u64,

    /// Seconds a subscriber may stay silent (no pong) before it is disconnected
    #[arg(long, env, default_value_t = 60)]
    pub hub_pong_wait_secs: u64,

    /// Seconds allowed for a single write to a subscriber
    #[arg(long, env, default_value_t = 10)]
    pub hub_write_wait_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        // Built from defaults only, never from the process arguments.
        Config::parse_from(["todo_hub_rs"])
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    /// The hub tuning described by this configuration.
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            mailbox_capacity: self.hub_mailbox_capacity,
            publish_buffer: self.hub_publish_buffer,
            ping_period: Duration::from_secs(self.hub_ping_period_secs),
            pong_wait: Duration::from_secs(self.hub_pong_wait_secs),
            write_wait: Duration::from_secs(self.hub_write_wait_secs),
        }
        .validated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_hub_defaults() {
        let config = Config::default();

        assert_eq!(config.hub_config(), HubConfig::default());
    }

    #[test]
    fn test_arguments_override_hub_settings() {
        let config = Config::parse_from([
            "todo_hub_rs",
            "--hub-mailbox-capacity",
            "8",
            "--hub-pong-wait-secs",
            "20",
            "--hub-ping-period-secs",
            "30",
        ]);

        let hub_config = config.hub_config();
        assert_eq!(hub_config.mailbox_capacity, 8);
        assert_eq!(hub_config.pong_wait, Duration::from_secs(20));
        // Pinging slower than the pong wait would drop healthy peers.
        assert_eq!(hub_config.ping_period, Duration::from_secs(18));
    }

    #[test]
    fn test_runtime_env_parsing_is_case_insensitive() {
        assert_eq!("PRODUCTION".parse::<RustEnv>(), Ok(RustEnv::Production));
        assert_eq!("staging".parse::<RustEnv>(), Ok(RustEnv::Staging));
        assert_eq!("qa".parse::<RustEnv>(), Err(RustEnvParseError));
    }

    #[test]
    fn test_allowed_origins_are_comma_separated() {
        let config = Config::parse_from([
            "todo_hub_rs",
            "--allowed-origins",
            "http://a.test,http://b.test",
        ]);

        assert_eq!(config.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }
}
