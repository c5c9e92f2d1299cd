#![allow(clippy::expect_used)]
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, str::FromStr};

/// Settings the service reads once at startup.
///
/// Every field has a default, so an empty environment yields a usable
/// configuration apart from the connection string, which stays unset.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    pub address: SocketAddr,
    pub database_url: Option<String>,
    pub database_url_file: Option<Utf8PathBuf>,
    pub table: String,
    pub list_default_limit: i64,
    pub list_max_limit: i64,
    pub storage_timeout_secs: u64,
    /// Forces `sslmode=require` unless the connection string sets `sslmode` itself.
    pub require_tls: bool,
    pub otlp: bool,
    /// Header used for `path` when the body has none; unset to skip it.
    pub path_header: Option<String>,
    pub payload_from_body: bool,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            address: SocketAddr::from_str("0.0.0.0:3000")
                .expect("Default value for config should never panic!"),
            database_url: None,
            database_url_file: None,
            table: "messages".to_string(),
            list_default_limit: 50,
            list_max_limit: 200,
            storage_timeout_secs: 10,
            require_tls: true,
            otlp: false,
            path_header: Some("x-vercel-deployment-url".to_string()),
            payload_from_body: false,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}
