//! PostgreSQL connection implementation

use async_trait::async_trait;
use futures::StreamExt;
use postgres_types::{FromSql, IsNull, Kind, ToSql, Type};
use schemata_core::{Result, Row, RowSource, RowStream, SchemataError, Value};
use std::sync::Arc;
use tokio_postgres::{Client, NoTls, Row as PgRow};

use crate::tls::{PgSslMode, build_connector};

type BoxError = Box<dyn std::error::Error + Sync + Send>;

pub(crate) fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail()
        && !detail.trim().is_empty()
    {
        message.push_str(&format!(" (detail: {})", detail));
    }

    if let Some(hint) = db_error.hint()
        && !hint.trim().is_empty()
    {
        message.push_str(&format!(" (hint: {})", hint));
    }

    format!("{} (code: {})", message, db_error.code().code())
}

/// PostgreSQL connection wrapper
///
/// `tokio_postgres::Client` pipelines requests itself, so no lock is held and
/// rows stream straight from the socket.
pub struct PostgresConnection {
    client: Client,
}

impl PostgresConnection {
    /// Connect to a PostgreSQL database
    #[tracing::instrument(skip(password, ca_cert))]
    pub async fn connect(
        host: &str,
        port: u16,
        database: &str,
        user: Option<&str>,
        password: Option<&str>,
        ssl_mode: PgSslMode,
        ca_cert: Option<&str>,
    ) -> Result<Self> {
        tracing::info!("connecting to PostgreSQL database");

        let mut config = tokio_postgres::Config::new();
        config
            .host(host)
            .port(port)
            .dbname(database)
            .application_name("schemata")
            .ssl_mode(ssl_mode.ssl_mode());

        if let Some(u) = user {
            config.user(u);
        }
        if let Some(p) = password {
            config.password(p);
        }

        let client = if ssl_mode.uses_tls() {
            let tls = build_connector(ssl_mode, ca_cert)?;
            let (client, connection) = config.connect(tls).await.map_err(|e| {
                SchemataError::Connection(format!(
                    "Failed to connect to PostgreSQL: {}",
                    format_postgres_error(&e)
                ))
            })?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "PostgreSQL connection error");
                }
            });
            client
        } else {
            let (client, connection) = config.connect(NoTls).await.map_err(|e| {
                SchemataError::Connection(format!(
                    "Failed to connect to PostgreSQL: {}",
                    format_postgres_error(&e)
                ))
            })?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "PostgreSQL connection error");
                }
            });
            client
        };

        tracing::info!("PostgreSQL connection established");
        Ok(Self { client })
    }
}

#[async_trait]
impl RowSource for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgres"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn stream_rows<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> Result<RowStream<'a>> {
        let statement = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| SchemataError::Query(format_postgres_error(&e)))?;

        let columns: Arc<[String]> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let pg_params: Vec<PgParam> = params.iter().map(PgParam::from).collect();
        let rows = self
            .client
            .query_raw(&statement, pg_params)
            .await
            .map_err(|e| SchemataError::Query(format_postgres_error(&e)))?;

        tracing::debug!(columns = columns.len(), "query started");
        Ok(rows
            .map(move |row| {
                let row = row.map_err(|e| SchemataError::Query(format_postgres_error(&e)))?;
                pg_row_to_row(&row, columns.clone())
            })
            .boxed())
    }
}

fn pg_row_to_row(row: &PgRow, columns: Arc<[String]>) -> Result<Row> {
    let values = (0..row.len())
        .map(|idx| postgres_to_value(row, idx))
        .collect::<Result<Vec<_>>>()?;
    Ok(Row::new(columns, values))
}

/// Raw wire bytes of any column type
struct PgRaw<'a>(&'a [u8]);

impl<'a> FromSql<'a> for PgRaw<'a> {
    fn from_sql(_: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        Ok(Self(raw))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// Follow domain types down to the type that defines their wire format.
///
/// The information schema is built from domains (`sql_identifier` over
/// `name`, `cardinal_number` over `int4`, `yes_or_no` over `varchar`).
pub(crate) fn base_type(ty: &Type) -> &Type {
    let mut current = ty;
    while let Kind::Domain(inner) = current.kind() {
        current = inner;
    }
    current
}

fn postgres_to_value(row: &PgRow, idx: usize) -> Result<Value> {
    let ty = row.columns()[idx].type_();
    let raw = row
        .try_get::<_, Option<PgRaw>>(idx)
        .map_err(|e| SchemataError::Query(e.to_string()))?;
    match raw {
        None => Ok(Value::Null),
        Some(PgRaw(bytes)) => decode_raw(ty, bytes),
    }
}

/// Decode one binary-format value by its base type.
///
/// Types outside the closed set catalog queries use come back as bytes, which
/// catalog decoding then rejects as a type mismatch.
pub(crate) fn decode_raw(ty: &Type, raw: &[u8]) -> Result<Value> {
    let base = base_type(ty);
    let decoded = match *base {
        Type::BOOL => bool::from_sql(base, raw).map(Value::Bool),
        Type::CHAR => i8::from_sql(base, raw).map(Value::Int8),
        Type::INT2 => i16::from_sql(base, raw).map(Value::Int16),
        Type::INT4 => i32::from_sql(base, raw).map(Value::Int32),
        Type::INT8 => i64::from_sql(base, raw).map(Value::Int64),
        Type::OID => u32::from_sql(base, raw).map(|v| Value::Int64(v as i64)),
        Type::FLOAT4 => f32::from_sql(base, raw).map(Value::Float32),
        Type::FLOAT8 => f64::from_sql(base, raw).map(Value::Float64),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            String::from_sql(base, raw).map(Value::String)
        }
        _ => Ok(Value::Bytes(raw.to_vec())),
    };
    decoded.map_err(|e| {
        SchemataError::Query(format!("failed to decode {} value: {}", ty.name(), e))
    })
}

/// Owned parameter value bound through `query_raw`
#[derive(Debug)]
pub(crate) enum PgParam {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl From<&Value> for PgParam {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => PgParam::Null,
            Value::Bool(v) => PgParam::Bool(*v),
            Value::Int8(v) => PgParam::Int16(*v as i16),
            Value::Int16(v) => PgParam::Int16(*v),
            Value::Int32(v) => PgParam::Int32(*v),
            Value::Int64(v) => PgParam::Int64(*v),
            Value::Float32(v) => PgParam::Float32(*v),
            Value::Float64(v) => PgParam::Float64(*v),
            Value::Decimal(v) | Value::String(v) => PgParam::String(v.clone()),
            Value::Bytes(v) => PgParam::Bytes(v.clone()),
        }
    }
}

impl ToSql for PgParam {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> std::result::Result<IsNull, BoxError> {
        match self {
            PgParam::Null => Ok(IsNull::Yes),
            PgParam::Bool(v) => v.to_sql(ty, out),
            PgParam::Int16(v) => v.to_sql(ty, out),
            PgParam::Int32(v) => v.to_sql(ty, out),
            PgParam::Int64(v) => v.to_sql(ty, out),
            PgParam::Float32(v) => v.to_sql(ty, out),
            PgParam::Float64(v) => v.to_sql(ty, out),
            PgParam::String(v) => v.to_sql(ty, out),
            PgParam::Bytes(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}
