use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::{Display, Formatter};

pub const MIN_NEW_ALIAS_LENGTH_ENV: &str = "MIN_NEW_ALIAS_LENGTH";
pub const MAX_NEW_ALIAS_LENGTH_ENV: &str = "MAX_NEW_ALIAS_LENGTH";
pub const INTEGRITY_ERROR_LIMIT_ENV: &str = "INTEGRITY_ERROR_LIMIT";
pub const STORAGE_BACKEND_ENV: &str = "SNIP_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "SNIP_MYSQL_DSN";
pub const BASE_URL_ENV: &str = "SNIP_BASE_URL";
pub const LOG_FORMAT_ENV: &str = "SNIP_LOG_FORMAT";

pub const DEFAULT_MIN_NEW_ALIAS_LENGTH: &str = "3";
pub const DEFAULT_MAX_NEW_ALIAS_LENGTH: &str = "5";
pub const DEFAULT_INTEGRITY_ERROR_LIMIT: &str = "10";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shortens each URL, printing its short and preview URLs.
    Shorten {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Prints the target URL behind each alias.
    Resolve {
        #[arg(required = true)]
        aliases: Vec<String>,
    },
}

#[derive(Debug, Parser)]
#[command(name = "snip", about = "Shortens URLs into compact aliases")]
pub struct CLI {
    #[arg(long, env = MIN_NEW_ALIAS_LENGTH_ENV, default_value = DEFAULT_MIN_NEW_ALIAS_LENGTH)]
    pub min_new_alias_length: i64,

    #[arg(long, env = MAX_NEW_ALIAS_LENGTH_ENV, default_value = DEFAULT_MAX_NEW_ALIAS_LENGTH)]
    pub max_new_alias_length: i64,

    #[arg(
        long,
        env = INTEGRITY_ERROR_LIMIT_ENV,
        default_value = DEFAULT_INTEGRITY_ERROR_LIMIT,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub integrity_error_limit: u64,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}
