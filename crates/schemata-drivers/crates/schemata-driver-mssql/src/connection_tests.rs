//! Tests for SQL Server value conversion

use crate::connection::{
    MssqlConnectionError, TiberiusParam, column_data_to_value, values_to_tiberius_params,
};
use pretty_assertions::assert_eq;
use schemata_core::{SchemataError, Value};
use std::borrow::Cow;
use tiberius::{ColumnData, ToSql};

// Value conversion tests

#[test]
fn test_values_to_tiberius_params() {
    let params = values_to_tiberius_params(&[
        Value::Null,
        Value::Bool(true),
        Value::Int8(4),
        Value::Int32(42),
        Value::String("dbo".to_string()),
        Value::Bytes(vec![0x01, 0x02]),
    ]);
    assert_eq!(params.len(), 6);
    assert!(matches!(params[2], TiberiusParam::I16(4)));
    assert!(matches!(params[4], TiberiusParam::String(ref s) if s == "dbo"));
}

#[test]
fn test_string_param_borrows_value() {
    let param = TiberiusParam::String("sales".to_string());
    match param.to_sql() {
        ColumnData::String(Some(Cow::Borrowed(s))) => assert_eq!(s, "sales"),
        other => panic!("unexpected column data: {:?}", other),
    }
    assert!(matches!(TiberiusParam::Null.to_sql(), ColumnData::I32(None)));
}

// Column data conversion tests

#[test]
fn test_column_data_nulls() {
    assert_eq!(column_data_to_value(ColumnData::I32(None)).unwrap(), Value::Null);
    assert_eq!(column_data_to_value(ColumnData::String(None)).unwrap(), Value::Null);
    assert_eq!(column_data_to_value(ColumnData::Date(None)).unwrap(), Value::Null);
}

#[test]
fn test_column_data_scalars() {
    assert_eq!(column_data_to_value(ColumnData::Bit(Some(true))).unwrap(), Value::Bool(true));
    assert_eq!(column_data_to_value(ColumnData::U8(Some(200))).unwrap(), Value::Int16(200));
    assert_eq!(column_data_to_value(ColumnData::I32(Some(42))).unwrap(), Value::Int32(42));
    assert_eq!(
        column_data_to_value(ColumnData::String(Some(Cow::Owned("Orders".to_string())))).unwrap(),
        Value::String("Orders".to_string())
    );
    assert_eq!(
        column_data_to_value(ColumnData::Guid(Some(tiberius::Uuid::nil()))).unwrap(),
        Value::String("00000000-0000-0000-0000-000000000000".to_string())
    );
}

#[test]
fn test_column_data_numeric_is_decimal() {
    let numeric = tiberius::numeric::Numeric::new_with_scale(12345, 2);
    assert_eq!(
        column_data_to_value(ColumnData::Numeric(Some(numeric))).unwrap(),
        Value::Decimal("123.45".to_string())
    );
}

#[test]
fn test_column_data_temporal_rejected() {
    let date = tiberius::time::Date::new(0);
    let err = column_data_to_value(ColumnData::Date(Some(date))).unwrap_err();
    assert!(matches!(err, MssqlConnectionError::TypeConversion(_)));
}

// Error conversion tests

#[test]
fn test_error_conversion_by_kind() {
    let err: SchemataError = MssqlConnectionError::ConnectionFailed("refused".to_string()).into();
    assert!(matches!(err, SchemataError::Connection(ref m) if m.contains("refused")));

    let err: SchemataError = MssqlConnectionError::AuthenticationFailed("bad password".to_string()).into();
    assert!(matches!(err, SchemataError::Connection(_)));

    let err: SchemataError = MssqlConnectionError::QueryFailed("Invalid object name".to_string()).into();
    assert!(matches!(err, SchemataError::Query(ref m) if m.contains("Invalid object name")));

    let err: SchemataError = MssqlConnectionError::TypeConversion("datetime".to_string()).into();
    assert!(matches!(err, SchemataError::Driver(_)));
}

#[test]
fn test_error_display() {
    let err = MssqlConnectionError::ConnectionFailed("test".to_string());
    assert!(err.to_string().contains("Connection failed"));

    let err = MssqlConnectionError::QueryFailed("syntax error".to_string());
    assert!(err.to_string().contains("Query execution failed"));
}
