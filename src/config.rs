use color_eyre::Result;
use config::{Config, Environment, File};
use secrecy::SecretString;
use std::env;
use std::fs::read_to_string;
use tap::Tap;
use tracing::{debug, info};

/// Names a TOML file layered between the built-in defaults and the environment.
pub const CONFIG_FILE_VAR: &str = "EVENTLOG_CONFIG_FILE";

/// Connection string aliases read after the `EVENTLOG_*` settings, in order.
pub const DATABASE_URL_ALIASES: [&str; 6] = [
    "POSTGRES_URL",
    "DATABASE_URL",
    "POSTGRES_CONNECTION_STRING",
    "STORAGE_DATABASE_URL",
    "NEON_DATABASE_URL",
    "DB_URL",
];

/// Every place a connection string is looked for, highest precedence first.
pub fn database_url_sources() -> Vec<&'static str> {
    let mut sources = vec!["EVENTLOG_DATABASE_URL", "EVENTLOG_DATABASE_URL_FILE"];
    sources.extend(DATABASE_URL_ALIASES);
    sources
}

#[tracing::instrument]
pub fn new_config() -> Result<Application> {
    let mut builder = Config::builder();
    if let Ok(path) = env::var(CONFIG_FILE_VAR) {
        info!(%path, "Reading config file");
        builder = builder.add_source(File::with_name(&path));
    }
    let s = builder
        .add_source(Environment::with_prefix("eventlog"))
        .build()?;

    let base: eventlog_cfg::Config = s.try_deserialize()?;
    debug!(?base, "Loaded config");

    let database_url = resolve_database_url(&base, |name| env::var(name).ok())?;
    Ok(Application::new(base, database_url))
}

/// Picks the connection string from the first non-empty source.
///
/// `lookup` reads an environment variable; it is a parameter so the
/// precedence order can be checked without touching the process environment.
///
/// # Errors
///
/// `database_url_file` is set but cannot be read.
#[tracing::instrument(skip(lookup))]
pub fn resolve_database_url<F>(
    base: &eventlog_cfg::Config,
    lookup: F,
) -> Result<Option<SecretString>>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = non_empty(base.database_url.clone()) {
        info!(source = "EVENTLOG_DATABASE_URL", "Resolved database url");
        return Ok(Some(url.into()));
    }

    if let Some(path) = &base.database_url_file {
        debug!(?path, "Reading database url file");
        let contents = read_to_string(path)?;
        if let Some(url) = non_empty(Some(contents)) {
            info!(?path, "Resolved database url from file");
            return Ok(Some(url.into()));
        }
    }

    let found = DATABASE_URL_ALIASES
        .iter()
        .find_map(|name| non_empty(lookup(name)).map(|url| (*name, url)))
        .tap(|found| {
            if let Some((source, _)) = found {
                info!(source, "Resolved database url");
            }
        });
    Ok(found.map(|(_, url)| url.into()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[derive(Clone, Debug)]
pub struct Application {
    pub base: eventlog_cfg::Config,
    pub database_url: Option<SecretString>,
}

impl Application {
    pub const fn new(base: eventlog_cfg::Config, database_url: Option<SecretString>) -> Self {
        Self { base, database_url }
    }
}
