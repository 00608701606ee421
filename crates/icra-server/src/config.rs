//! Server configuration
//!
//! Values are read from `ICRA_*` environment variables, then `VCAP_APP_PORT`
//! (set by Cloud Foundry) overrides the port, then command line flags
//! override everything.

use crate::bridge::BrokerAddress;
use crate::cli::Cli;
use crate::error::{Error, Result};
use config::{Config, Environment};
use icra_core::HubConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Environment variable prefix
const ENV_PREFIX: &str = "ICRA";

/// Port variable provided by the hosting platform
const PLATFORM_PORT_VAR: &str = "VCAP_APP_PORT";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_address")]
    pub address: String,

    /// Web server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Message broker address
    #[serde(default)]
    pub broker: String,

    /// Broker topics to subscribe to
    #[serde(default)]
    pub topic: Vec<String>,

    /// Number of visits buffered per client
    #[serde(default = "default_buffer_size", alias = "buffersize")]
    pub buffer_size: usize,

    /// Number of visits replayed to new clients
    #[serde(default = "default_cache_size", alias = "cachesize")]
    pub cache_size: usize,

    /// Directory of static files
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// Load configuration from the process environment and CLI overrides
    pub fn load(cli: &Cli) -> Result<Self> {
        let platform_port = std::env::var(PLATFORM_PORT_VAR).ok();
        Self::from_sources(Environment::with_prefix(ENV_PREFIX), platform_port, cli)
    }

    /// Load configuration from an explicit environment source
    pub fn from_sources(
        env: Environment,
        platform_port: Option<String>,
        cli: &Cli,
    ) -> Result<Self> {
        let env = env
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("topic");

        let mut config: Self = Config::builder()
            .add_source(env)
            .build()?
            .try_deserialize()?;

        match platform_port.filter(|p| !p.is_empty()) {
            Some(port) => {
                config.port = port.parse().map_err(|_| {
                    Error::config(format!("{} is not a valid port: {}", PLATFORM_PORT_VAR, port))
                })?;
            }
            None => {
                tracing::warn!(
                    port = config.port,
                    "{} not set, using configured port",
                    PLATFORM_PORT_VAR
                );
            }
        }

        config.apply_cli(cli);
        Ok(config)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(address) = &cli.address {
            self.address = address.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(broker) = &cli.broker {
            self.broker = broker.clone();
        }
        if !cli.topics.is_empty() {
            self.topic = cli.topics.clone();
        }
        if let Some(buffer_size) = cli.buffer_size {
            self.buffer_size = buffer_size;
        }
        if let Some(cache_size) = cli.cache_size {
            self.cache_size = cache_size;
        }
        if let Some(static_dir) = &cli.static_dir {
            self.static_dir = static_dir.clone();
        }
    }

    /// Check everything the server needs before anything is started
    pub fn validate(&self) -> Result<()> {
        if self.broker.is_empty() {
            return Err(Error::config("a message broker address is required"));
        }
        BrokerAddress::parse(&self.broker)?;

        if self.topics().next().is_none() {
            return Err(Error::config("at least one broker topic is required"));
        }

        self.hub_config().validate()?;
        self.listen_addr()?;
        Ok(())
    }

    /// Non-empty topic names
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topic.iter().map(|t| t.trim()).filter(|t| !t.is_empty())
    }

    /// Hub sizing derived from this configuration
    pub fn hub_config(&self) -> HubConfig {
        HubConfig::new(self.buffer_size, self.cache_size)
    }

    /// Socket address to listen on
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.address, self.port)
            .parse()
            .map_err(|e| Error::config(format!("invalid listen address: {}", e)))
    }
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_buffer_size() -> usize {
    100
}

fn default_cache_size() -> usize {
    50
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}
