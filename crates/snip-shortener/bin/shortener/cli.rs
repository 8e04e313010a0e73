use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const STORAGE_BACKEND_ENV: &str = "SNIP_STORAGE_BACKEND";
pub const FILE_STORAGE_PATH_ENV: &str = "SNIP_FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "SNIP_DATABASE_DSN";
pub const DATABASE_MAX_CONNECTIONS_ENV: &str = "SNIP_DATABASE_MAX_CONNECTIONS";
pub const DELETION_QUEUE_CAPACITY_ENV: &str = "SNIP_DELETION_QUEUE_CAPACITY";
pub const DELETION_BATCH_LIMIT_ENV: &str = "SNIP_DELETION_BATCH_LIMIT";
pub const DELETION_FLUSH_INTERVAL_ENV: &str = "SNIP_DELETION_FLUSH_INTERVAL_SECS";
pub const SHUTDOWN_GRACE_ENV: &str = "SNIP_SHUTDOWN_GRACE_SECS";
pub const LOG_FORMAT_ENV: &str = "SNIP_LOG_FORMAT";

pub const DEFAULT_FILE_STORAGE_PATH: &str = "files/data.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "memory")]
    Memory,
    #[value(name = "file")]
    File,
    #[value(name = "postgres")]
    Postgres,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::Memory => write!(f, "memory"),
            StorageBackendArg::File => write!(f, "file"),
            StorageBackendArg::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "snip-shortener")]
pub struct CLI {
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::File
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = FILE_STORAGE_PATH_ENV, default_value = DEFAULT_FILE_STORAGE_PATH)]
    pub file_storage_path: PathBuf,

    #[arg(long, env = DATABASE_DSN_ENV, required_if_eq("storage", "postgres"))]
    pub database_dsn: Option<String>,

    #[arg(long, env = DATABASE_MAX_CONNECTIONS_ENV, default_value_t = 10)]
    pub database_max_connections: u32,

    #[arg(
        long,
        env = DELETION_QUEUE_CAPACITY_ENV,
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub deletion_queue_capacity: u64,

    #[arg(
        long,
        env = DELETION_BATCH_LIMIT_ENV,
        default_value_t = 100,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub deletion_batch_limit: u64,

    #[arg(
        long,
        env = DELETION_FLUSH_INTERVAL_ENV,
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub deletion_flush_interval_secs: u64,

    #[arg(
        long,
        env = SHUTDOWN_GRACE_ENV,
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub shutdown_grace_secs: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}
