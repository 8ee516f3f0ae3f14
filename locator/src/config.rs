// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use clap::{Parser, ValueEnum};
use common::payload::NumberPolicy;
use dirs::data_local_dir;
use ingest::IngestConfig;
use rest::{RestConfig, TlsFiles};
use std::{net::IpAddr, path::PathBuf, time::Duration};
use storage::{InfluxConfig, Precision};
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// Keep positions in memory, lost on restart.
    Memory,
    /// Append positions to a log file in the data directory.
    File,
    /// Write positions to an InfluxDB 1.x server.
    Influx,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Receives GPS position reports and serves the latest position and track", long_about = None)]
pub struct Cli {
    #[arg(short, long, env = "LOCATOR_ADDRESS", default_value = "0.0.0.0")]
    pub address: IpAddr,
    #[arg(short, long, env = "LOCATOR_PORT", default_value_t = 8023)]
    pub port: u16,
    /// PEM certificate chain, enables TLS together with --tls-key.
    #[arg(long, env = "LOCATOR_TLS_CERT", requires = "tls_key")]
    pub tls_cert: Option<PathBuf>,
    #[arg(long, env = "LOCATOR_TLS_KEY", requires = "tls_cert")]
    pub tls_key: Option<PathBuf>,
    /// Directory served as static files at `/`.
    #[arg(long, env = "LOCATOR_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    #[arg(short, long, env = "LOCATOR_STORE", value_enum, default_value_t = StoreBackend::File)]
    pub store: StoreBackend,
    /// Directory of the file store. Defaults to the local data directory.
    #[arg(short, long, env = "LOCATOR_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
    #[arg(long, env = "LOCATOR_INFLUX_URL", default_value = "http://localhost:8086")]
    pub influx_url: String,
    #[arg(long, env = "LOCATOR_INFLUX_DB", default_value = "locator")]
    pub influx_db: String,
    #[arg(long, env = "LOCATOR_INFLUX_MEASUREMENT", default_value = "position")]
    pub influx_measurement: String,
    #[arg(long, env = "LOCATOR_INFLUX_USER")]
    pub influx_user: Option<String>,
    #[arg(long, env = "LOCATOR_INFLUX_PASSWORD", hide_env_values = true)]
    pub influx_password: Option<String>,
    /// Write precision: ns, u, ms or s.
    #[arg(long, env = "LOCATOR_INFLUX_PRECISION", default_value = "ns")]
    pub influx_precision: Precision,

    /// Reports waiting for storage before new ones are dropped.
    #[arg(long, env = "LOCATOR_QUEUE_CAPACITY", default_value_t = 1024)]
    pub queue_capacity: usize,
    /// Positions in `GET /track` without `n`.
    #[arg(long, env = "LOCATOR_TRACK_LENGTH", default_value_t = 100)]
    pub track_length: usize,
    #[arg(long, env = "LOCATOR_QUERY_TIMEOUT_MS", default_value_t = 3000)]
    pub query_timeout_ms: u64,
    /// Read malformed coordinates as 0 instead of dropping the report.
    #[arg(long, env = "LOCATOR_LENIENT_NUMBERS")]
    pub lenient_numbers: bool,
}

impl Cli {
    pub fn rest_config(&self) -> RestConfig {
        let tls = match (&self.tls_cert, &self.tls_key) {
            (Some(certs), Some(key)) => Some(TlsFiles {
                certs: certs.clone(),
                key: key.clone(),
            }),
            _ => None,
        };
        RestConfig {
            address: self.address,
            port: self.port,
            tls,
            static_dir: self.static_dir.clone(),
            track_length: self.track_length,
            ..RestConfig::default()
        }
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            queue_capacity: self.queue_capacity,
            number_policy: if self.lenient_numbers {
                NumberPolicy::Lenient
            } else {
                NumberPolicy::Strict
            },
        }
    }

    pub fn influx_config(&self) -> InfluxConfig {
        InfluxConfig {
            url: self.influx_url.clone(),
            database: self.influx_db.clone(),
            measurement: self.influx_measurement.clone(),
            username: self.influx_user.clone(),
            password: self.influx_password.clone(),
            precision: self.influx_precision,
            timeout: self.query_timeout(),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn storage_dir(&self) -> Result<PathBuf, ()> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let mut storage_dir = data_local_dir().ok_or_else(|| {
            error!("Could not determine local data directory");
        })?;
        storage_dir.push("locator");
        Ok(storage_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["locator"]).unwrap();
        assert_eq!(cli.port, 8023);
        assert_eq!(cli.store, StoreBackend::File);
        assert_eq!(cli.ingest_config().number_policy, NumberPolicy::Strict);
        assert!(cli.rest_config().tls.is_none());
        assert_eq!(cli.query_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn influx_options() {
        let cli = Cli::try_parse_from([
            "locator",
            "--store",
            "influx",
            "--influx-db",
            "tracker",
            "--influx-precision",
            "ms",
            "--lenient-numbers",
        ])
        .unwrap();
        let influx = cli.influx_config();
        assert_eq!(cli.store, StoreBackend::Influx);
        assert_eq!(influx.database, "tracker");
        assert_eq!(influx.precision, Precision::Milliseconds);
        assert_eq!(cli.ingest_config().number_policy, NumberPolicy::Lenient);
    }

    #[test]
    fn tls_needs_cert_and_key() {
        assert!(Cli::try_parse_from(["locator", "--tls-cert", "cert.pem"]).is_err());
        let cli = Cli::try_parse_from([
            "locator",
            "--tls-cert",
            "cert.pem",
            "--tls-key",
            "key.pem",
        ])
        .unwrap();
        assert!(cli.rest_config().tls.is_some());
    }
}
