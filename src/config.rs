//! Server configuration from command-line flags, environment variables and `.env`.

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

pub const DEV_JWT_SECRET: &str = "contract_hub_dev_secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "contract_hub")]
#[command(about = "Contract document backend: users, templates, clauses and signable contracts")]
pub struct Config {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Directory holding the Sled database
    #[arg(long, env = "CONTRACT_HUB_DATA", default_value = "contract_hub_data")]
    pub data_dir: String,

    /// HMAC secret used to sign identity tokens
    #[arg(long, env = "JWT_SECRET", default_value = DEV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "BCRYPT_COST", default_value_t = 10)]
    pub bcrypt_cost: u32,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Also write daily-rotated log files into this directory
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Loads `.env` (if any) and then parses flags and environment.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::parse()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["contract_hub"]).unwrap();
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_flags_override_and_bind_addr() {
        let config = Config::try_parse_from([
            "contract_hub",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--jwt-secret",
            "s3cret",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(config.bind_addr().unwrap(), "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.uses_dev_secret());
    }
}
