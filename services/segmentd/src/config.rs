use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 20;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

// Service configuration sourced from environment variables, with an optional
// yaml file (SEGMENTD_CONFIG) layered on top.
#[derive(Debug, Clone)]
pub struct SegmentdConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub sweep_interval_secs: u64,
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct SegmentdConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<String>,
    postgres_url: Option<String>,
    sweep_interval_secs: Option<u64>,
    shutdown_grace_secs: Option<u64>,
}

impl SegmentdConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("SEGMENTD_BIND")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .with_context(|| "parse SEGMENTD_BIND")?;
        let metrics_bind = std::env::var("SEGMENTD_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9300".to_string())
            .parse()
            .with_context(|| "parse SEGMENTD_METRICS_BIND")?;
        let storage = parse_storage(
            &std::env::var("SEGMENTD_STORAGE").unwrap_or_else(|_| "memory".to_string()),
        )?;
        let postgres = match std::env::var("SEGMENTD_POSTGRES_URL") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_u64("SEGMENTD_PG_MAX_CONNECTIONS", 10)? as u32,
                acquire_timeout_ms: env_u64("SEGMENTD_PG_ACQUIRE_TIMEOUT_MS", 5_000)?,
            }),
            Err(_) => None,
        };
        let sweep_interval_secs =
            env_u64("SEGMENTD_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        let shutdown_grace_secs =
            env_u64("SEGMENTD_SHUTDOWN_GRACE_SECS", DEFAULT_SHUTDOWN_GRACE_SECS)?;

        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            sweep_interval_secs,
            shutdown_grace_secs,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        let Ok(path) = std::env::var("SEGMENTD_CONFIG") else {
            return Ok(config);
        };

        let contents =
            fs::read_to_string(&path).with_context(|| format!("read SEGMENTD_CONFIG: {path}"))?;
        let overrides: SegmentdConfigOverride =
            serde_yaml::from_str(&contents).with_context(|| "parse segmentd config yaml")?;

        if let Some(value) = overrides.bind_addr {
            config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = overrides.metrics_bind {
            config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = overrides.storage {
            config.storage = parse_storage(&value)?;
        }
        if let Some(url) = overrides.postgres_url {
            let base = config.postgres.take();
            config.postgres = Some(PostgresConfig {
                url,
                max_connections: base.as_ref().map(|pg| pg.max_connections).unwrap_or(10),
                acquire_timeout_ms: base.as_ref().map(|pg| pg.acquire_timeout_ms).unwrap_or(5_000),
            });
        }
        if let Some(value) = overrides.sweep_interval_secs {
            config.sweep_interval_secs = value;
        }
        if let Some(value) = overrides.shutdown_grace_secs {
            config.shutdown_grace_secs = value;
        }
        Ok(config)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn parse_storage(value: &str) -> Result<StorageBackend> {
    match value.to_ascii_lowercase().as_str() {
        "memory" => Ok(StorageBackend::Memory),
        "postgres" => Ok(StorageBackend::Postgres),
        other => anyhow::bail!("unsupported storage backend: {other}"),
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(value) => value.parse().with_context(|| format!("parse {key}")),
        Err(_) => Ok(default),
    }
}
