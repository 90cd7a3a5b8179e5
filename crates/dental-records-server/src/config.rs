//! Server configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. Optional TOML file (`--config`)
//! 3. `DENTAL_*` environment variables (`DENTAL_BIND_ADDR`, `DENTAL_BACKEND`, ...)
//! 4. Command-line flags

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use dental_records_core::store::{
    JsonFileStore, MemoryStore, PatientStore, SqliteStore, StoreResult,
};

/// Which store adapter backs the API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `patients.json` under the data directory
    Json,
    Sqlite,
    /// Nothing survives a restart
    Memory,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Json => "json",
            Backend::Sqlite => "sqlite",
            Backend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub backend: Backend,
    pub data_dir: PathBuf,
    pub sqlite_path: PathBuf,
    /// Default tracing filter; `RUST_LOG` takes precedence
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            backend: Backend::Json,
            data_dir: PathBuf::from("data"),
            sqlite_path: PathBuf::from("data/patients.db"),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load defaults, the optional file and `DENTAL_*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(file, Environment::with_prefix("DENTAL"))
    }

    fn load_from(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();
        let mut builder = Config::builder()
            .set_default("bind_addr", defaults.bind_addr)?
            .set_default("backend", defaults.backend.as_str())?
            .set_default("data_dir", defaults.data_dir.to_string_lossy().into_owned())?
            .set_default("sqlite_path", defaults.sqlite_path.to_string_lossy().into_owned())?
            .set_default("log_level", defaults.log_level)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        builder.add_source(env).build()?.try_deserialize()
    }

    /// Apply command-line overrides.
    pub fn apply(&mut self, args: &CliArgs) {
        if let Some(addr) = &args.bind_addr {
            self.bind_addr = addr.clone();
        }
        if let Some(backend) = args.backend {
            self.backend = backend;
        }
        if let Some(dir) = &args.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(path) = &args.sqlite_path {
            self.sqlite_path = path.clone();
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
    }

    /// Open the configured store adapter.
    pub fn open_store(&self) -> StoreResult<Arc<dyn PatientStore>> {
        let store: Arc<dyn PatientStore> = match self.backend {
            Backend::Json => Arc::new(JsonFileStore::open(&self.data_dir)?),
            Backend::Sqlite => {
                if let Some(parent) = self.sqlite_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Arc::new(SqliteStore::open(&self.sqlite_path)?)
            }
            Backend::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(store)
    }
}

#[derive(Debug, Default, Parser)]
#[command(name = "dental-records-server")]
#[command(about = "JSON API for dental patient records", long_about = None)]
pub struct CliArgs {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long)]
    pub bind_addr: Option<String>,

    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(long)]
    pub sqlite_path: Option<PathBuf>,

    #[arg(long)]
    pub log_level: Option<String>,
}
