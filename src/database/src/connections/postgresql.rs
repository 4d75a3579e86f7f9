//! PostgreSQL connections via sqlx
//!
//! One plain `PgConnection` per connect call; there is no pool. The merged
//! `ConnectionConfig` is translated into `PgConnectOptions`, mapping the
//! pass-through keys the driver understands and ignoring the rest.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use sqlx::{Connection, PgConnection};
use tracing::{debug, info};

use super::{ConnectionConfig, DatabaseClient, DatabaseConnector};
use crate::DatabaseError;

/// Driver settings recognised in the pass-through options
#[derive(Debug, Clone, Default)]
pub struct DriverSettings {
    pub ssl_mode: Option<PgSslMode>,
    pub application_name: Option<String>,
    pub statement_cache_capacity: Option<usize>,
    /// Server runtime parameters sent in the startup packet
    pub runtime_params: Vec<(String, String)>,
    /// Option keys with no driver mapping
    pub ignored: Vec<String>,
}

const KNOWN_KEYS: [&str; 7] = [
    "ssl",
    "sslmode",
    "application_name",
    "statement_cache_capacity",
    "statement_timeout",
    "query_timeout",
    "options",
];

fn scalar_to_param(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(true) => Some("on".to_string()),
        Value::Bool(false) => Some("off".to_string()),
        _ => None,
    }
}

impl DriverSettings {
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, DatabaseError> {
        let mut settings = DriverSettings::default();

        settings.ssl_mode = match config.option("ssl") {
            Some(Value::Bool(true)) | Some(Value::Object(_)) => Some(PgSslMode::Require),
            Some(Value::Bool(false)) => Some(PgSslMode::Disable),
            _ => None,
        };

        // an explicit sslmode wins over the boolean form
        if let Some(mode) = config.option("sslmode") {
            let mode = mode.as_str().ok_or_else(|| {
                DatabaseError::InvalidOption(format!("sslmode must be a string, got {}", mode))
            })?;
            let mode = mode.parse::<PgSslMode>().map_err(|e| {
                DatabaseError::InvalidOption(format!("sslmode '{}': {}", mode, e))
            })?;
            settings.ssl_mode = Some(mode);
        }

        settings.application_name = config
            .option("application_name")
            .and_then(Value::as_str)
            .map(str::to_string);

        settings.statement_cache_capacity = config
            .option("statement_cache_capacity")
            .and_then(Value::as_u64)
            .map(|capacity| capacity as usize);

        let timeout = config
            .option("statement_timeout")
            .or_else(|| config.option("query_timeout"));
        if let Some(timeout) = timeout.and_then(scalar_to_param) {
            settings
                .runtime_params
                .push(("statement_timeout".to_string(), timeout));
        }

        if let Some(Value::Object(params)) = config.option("options") {
            for (name, value) in params {
                match scalar_to_param(value) {
                    Some(value) => settings.runtime_params.push((name.clone(), value)),
                    None => settings.ignored.push(format!("options.{}", name)),
                }
            }
        }

        settings.ignored.extend(
            config
                .options
                .keys()
                .filter(|key| !KNOWN_KEYS.contains(&key.as_str()))
                .cloned(),
        );

        Ok(settings)
    }

    pub fn to_connect_options(&self, config: &ConnectionConfig) -> PgConnectOptions {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        if let Some(mode) = self.ssl_mode {
            options = options.ssl_mode(mode);
        }

        if let Some(name) = &self.application_name {
            options = options.application_name(name);
        }

        if let Some(capacity) = self.statement_cache_capacity {
            options = options.statement_cache_capacity(capacity);
        }

        if !self.runtime_params.is_empty() {
            options = options.options(
                self.runtime_params
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str())),
            );
        }

        options
    }
}

/// I/O failures while opening a connection carry the node address
fn connect_error(config: &ConnectionConfig, error: sqlx::Error) -> DatabaseError {
    match error {
        sqlx::Error::Io(e) => {
            DatabaseError::Connection(format!("{}:{}: {}", config.host, config.port, e))
        }
        other => DatabaseError::Postgres(other),
    }
}

/// Result rows that do not decode as timestamps are query errors
fn query_error(sql: &str, error: sqlx::Error) -> DatabaseError {
    match error {
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. } => {
            DatabaseError::Query(format!("{}: {}", sql, error))
        }
        other => DatabaseError::Postgres(other),
    }
}

/// One open PostgreSQL connection
pub struct PostgresClient {
    connection: PgConnection,
    host: String,
}

impl PostgresClient {
    /// Host of the node this connection was routed to
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.connection
    }

    pub fn into_inner(self) -> PgConnection {
        self.connection
    }

    pub async fn close(self) -> Result<(), DatabaseError> {
        info!("Closing PostgreSQL connection to {}", self.host);
        self.connection.close().await?;
        Ok(())
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn query_timestamps(&mut self, sql: &str) -> Result<Vec<DateTime<Utc>>, DatabaseError> {
        sqlx::query_scalar::<_, DateTime<Utc>>(sql)
            .fetch_all(&mut self.connection)
            .await
            .map_err(|e| query_error(sql, e))
    }
}

/// Opens single PostgreSQL connections
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

#[async_trait]
impl DatabaseConnector for PostgresConnector {
    type Client = PostgresClient;

    async fn connect(&self, config: &ConnectionConfig) -> Result<PostgresClient, DatabaseError> {
        let settings = DriverSettings::from_config(config)?;
        for key in &settings.ignored {
            debug!("Ignoring connection option '{}' with no driver mapping", key);
        }

        info!(
            "Connecting to PostgreSQL at {}:{}/{}",
            config.host, config.port, config.database
        );

        let connection = PgConnection::connect_with(&settings.to_connect_options(config))
            .await
            .map_err(|e| connect_error(config, e))?;

        info!("PostgreSQL connection to {} established", config.host);

        Ok(PostgresClient {
            connection,
            host: config.host.clone(),
        })
    }
}
