use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// 永続ストアの種別
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite { path: PathBuf },
    Memory,
}

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub store: StoreKind,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意のキー参照関数から構築（テスト用に環境変数を差し替え可能）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host: IpAddr = parse_or(&lookup, "HOST", "127.0.0.1".parse().ok())?;
        let port: u16 = parse_or(&lookup, "PORT", Some(8080))?;

        let store = match lookup("TODO_STORE").as_deref().unwrap_or("sqlite") {
            "sqlite" => StoreKind::Sqlite {
                path: PathBuf::from(
                    lookup("DATABASE_PATH").unwrap_or_else(|| "todo.db".to_string()),
                ),
            },
            "memory" => StoreKind::Memory,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "TODO_STORE",
                    value: other.to_string(),
                })
            }
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().unwrap_or("text") {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Config {
            host,
            port,
            store,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => default.ok_or(ConfigError::InvalidValue {
            key,
            value: String::new(),
        }),
    }
}
