//! SQL Server connection implementation using tiberius

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use schemata_core::{ConnectionConfig, Result, Row, RowSource, RowStream, SchemataError, Value};
use std::sync::Arc;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, Row as TiberiusRow};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// Port SQL Server listens on unless configured otherwise
pub const DEFAULT_PORT: u16 = 1433;

/// SQL Server connection errors
#[derive(Debug, thiserror::Error)]
pub enum MssqlConnectionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    #[error("Tiberius error: {0}")]
    Tiberius(#[from] tiberius::error::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MssqlConnectionError> for SchemataError {
    fn from(err: MssqlConnectionError) -> Self {
        match err {
            MssqlConnectionError::ConnectionFailed(_)
            | MssqlConnectionError::AuthenticationFailed(_)
            | MssqlConnectionError::Io(_) => SchemataError::Connection(err.to_string()),
            MssqlConnectionError::QueryFailed(_) | MssqlConnectionError::Tiberius(_) => {
                SchemataError::Query(err.to_string())
            }
            MssqlConnectionError::TypeConversion(_) => SchemataError::Driver(err.to_string()),
        }
    }
}

/// SQL Server connection using tiberius
///
/// The client is not shareable, so statements are serialized behind an async
/// mutex and each result set is buffered before the lock is released.
pub struct MssqlConnection {
    client: Mutex<Client<Compat<TcpStream>>>,
    database: Option<String>,
}

impl MssqlConnection {
    /// Connect with SQL Server authentication.
    ///
    /// `trust_cert` skips certificate validation, for development servers with
    /// self-signed certificates.
    #[tracing::instrument(skip(password))]
    pub async fn connect(
        host: &str,
        port: u16,
        database: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
        trust_cert: bool,
    ) -> std::result::Result<Self, MssqlConnectionError> {
        tracing::debug!("connecting to SQL Server at {}:{}", host, port);

        let mut config = Config::new();
        config.host(host);
        config.port(port);
        config.application_name("schemata");

        if let Some(db) = database {
            config.database(db);
        }

        if trust_cert {
            config.trust_cert();
        }

        config.encryption(EncryptionLevel::Required);

        let Some(user) = username else {
            return Err(MssqlConnectionError::AuthenticationFailed(
                "a username is required for SQL Server authentication".to_string(),
            ));
        };
        config.authentication(AuthMethod::sql_server(user, password.unwrap_or("")));

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| MssqlConnectionError::ConnectionFailed(e.to_string()))?;

        tcp.set_nodelay(true)?;
        let compat_stream = tcp.compat_write();

        let client = Client::connect(config, compat_stream)
            .await
            .map_err(|e| MssqlConnectionError::ConnectionFailed(e.to_string()))?;

        tracing::debug!("successfully connected to SQL Server");

        Ok(Self {
            client: Mutex::new(client),
            database: database.map(String::from),
        })
    }

    /// Connect using the standard configuration keys plus `trust_cert`.
    pub async fn from_config(
        config: &ConnectionConfig,
    ) -> std::result::Result<Self, MssqlConnectionError> {
        let host = config
            .get_string("host")
            .unwrap_or_else(|| "localhost".to_string());
        let port = config.port_or(DEFAULT_PORT);
        let database = config.get_string("database");
        let username = config.get_string("username");
        let password = config.get_string("password");
        let trust_cert = config.get_bool("trust_cert");

        Self::connect(
            &host,
            port,
            database.as_deref(),
            username.as_deref(),
            password.as_deref(),
            trust_cert,
        )
        .await
    }
}

#[async_trait]
impl RowSource for MssqlConnection {
    fn driver_name(&self) -> &str {
        "mssql"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn stream_rows<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> Result<RowStream<'a>> {
        let tiberius_params = values_to_tiberius_params(params);
        let param_refs: Vec<&dyn tiberius::ToSql> = tiberius_params
            .iter()
            .map(|p| p as &dyn tiberius::ToSql)
            .collect();

        let tib_rows = {
            let mut client = self.client.lock().await;
            let query_stream = client
                .query(sql, &param_refs[..])
                .await
                .map_err(|e| MssqlConnectionError::QueryFailed(e.to_string()))?;
            query_stream
                .into_first_result()
                .await
                .map_err(|e| MssqlConnectionError::QueryFailed(e.to_string()))?
        };

        let columns: Arc<[String]> = match tib_rows.first() {
            Some(first) => first.columns().iter().map(|c| c.name().to_string()).collect(),
            None => Arc::from(Vec::new()),
        };

        let rows = tib_rows
            .into_iter()
            .map(move |row| -> Result<Row> {
                Ok(Row::new(columns.clone(), tiberius_row_to_values(row)?))
            });
        Ok(stream::iter(rows).boxed())
    }
}

/// Convert a tiberius row to a vector of Values by consuming the row
fn tiberius_row_to_values(row: TiberiusRow) -> Result<Vec<Value>> {
    row.into_iter()
        .map(|col_data| column_data_to_value(col_data).map_err(SchemataError::from))
        .collect()
}

/// Convert tiberius `ColumnData` to a catalog value.
///
/// Catalog queries never project temporal columns, so those are rejected
/// rather than decoded.
pub(crate) fn column_data_to_value(
    col_data: ColumnData<'static>,
) -> std::result::Result<Value, MssqlConnectionError> {
    match col_data {
        ColumnData::Bit(None)
        | ColumnData::U8(None)
        | ColumnData::I16(None)
        | ColumnData::I32(None)
        | ColumnData::I64(None)
        | ColumnData::F32(None)
        | ColumnData::F64(None)
        | ColumnData::String(None)
        | ColumnData::Guid(None)
        | ColumnData::Binary(None)
        | ColumnData::Numeric(None)
        | ColumnData::Xml(None)
        | ColumnData::DateTime(None)
        | ColumnData::SmallDateTime(None)
        | ColumnData::DateTime2(None)
        | ColumnData::DateTimeOffset(None)
        | ColumnData::Date(None)
        | ColumnData::Time(None) => Ok(Value::Null),
        ColumnData::Bit(Some(v)) => Ok(Value::Bool(v)),
        ColumnData::U8(Some(v)) => Ok(Value::Int16(v as i16)),
        ColumnData::I16(Some(v)) => Ok(Value::Int16(v)),
        ColumnData::I32(Some(v)) => Ok(Value::Int32(v)),
        ColumnData::I64(Some(v)) => Ok(Value::Int64(v)),
        ColumnData::F32(Some(v)) => Ok(Value::Float32(v)),
        ColumnData::F64(Some(v)) => Ok(Value::Float64(v)),
        ColumnData::String(Some(v)) => Ok(Value::String(v.into_owned())),
        ColumnData::Guid(Some(v)) => Ok(Value::String(v.to_string())),
        ColumnData::Binary(Some(v)) => Ok(Value::Bytes(v.into_owned())),
        ColumnData::Numeric(Some(v)) => Ok(Value::Decimal(v.to_string())),
        ColumnData::Xml(Some(v)) => Ok(Value::String(v.into_owned().into_string())),
        ColumnData::DateTime(Some(_))
        | ColumnData::SmallDateTime(Some(_))
        | ColumnData::DateTime2(Some(_))
        | ColumnData::DateTimeOffset(Some(_))
        | ColumnData::Date(Some(_))
        | ColumnData::Time(Some(_)) => Err(MssqlConnectionError::TypeConversion(
            "temporal values are not part of the catalog value set".to_string(),
        )),
    }
}

/// Container for tiberius parameter values
#[derive(Debug)]
pub(crate) enum TiberiusParam {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl tiberius::ToSql for TiberiusParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            TiberiusParam::Null => ColumnData::I32(None),
            TiberiusParam::Bool(v) => ColumnData::Bit(Some(*v)),
            TiberiusParam::I16(v) => ColumnData::I16(Some(*v)),
            TiberiusParam::I32(v) => ColumnData::I32(Some(*v)),
            TiberiusParam::I64(v) => ColumnData::I64(Some(*v)),
            TiberiusParam::F32(v) => ColumnData::F32(Some(*v)),
            TiberiusParam::F64(v) => ColumnData::F64(Some(*v)),
            TiberiusParam::String(v) => {
                ColumnData::String(Some(std::borrow::Cow::Borrowed(v.as_str())))
            }
            TiberiusParam::Bytes(v) => {
                ColumnData::Binary(Some(std::borrow::Cow::Borrowed(v.as_slice())))
            }
        }
    }
}

/// Convert catalog values to tiberius parameters
pub(crate) fn values_to_tiberius_params(values: &[Value]) -> Vec<TiberiusParam> {
    values
        .iter()
        .map(|v| match v {
            Value::Null => TiberiusParam::Null,
            Value::Bool(b) => TiberiusParam::Bool(*b),
            Value::Int8(i) => TiberiusParam::I16(*i as i16),
            Value::Int16(i) => TiberiusParam::I16(*i),
            Value::Int32(i) => TiberiusParam::I32(*i),
            Value::Int64(i) => TiberiusParam::I64(*i),
            Value::Float32(f) => TiberiusParam::F32(*f),
            Value::Float64(f) => TiberiusParam::F64(*f),
            Value::Decimal(d) => TiberiusParam::String(d.clone()),
            Value::String(s) => TiberiusParam::String(s.clone()),
            Value::Bytes(b) => TiberiusParam::Bytes(b.clone()),
        })
        .collect()
}

impl std::fmt::Debug for MssqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlConnection")
            .field("database", &self.database)
            .finish()
    }
}
