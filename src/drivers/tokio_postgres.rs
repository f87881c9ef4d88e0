use std::error::Error;
use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tokio::task::JoinHandle;
use tokio_postgres::types::{to_sql_checked, Format, FromSql, IsNull, Kind, ToSql, Type};
use tokio_postgres::{Client, Config, NoTls, Statement};
use tracing::{debug, error, trace, warn};

use super::placeholders::placeholder_offsets;
use super::rowset::{describe_prepared, RowSet};
use crate::binding::{ColumnBinding, ParameterBinding};
use crate::diagnostics::{CallResult, Diagnostic, Failure, Outcome};
use crate::options::parse_descriptor;
use crate::traits::{BackendKind, CursorMode, Driver, FetchOrientation, NativeStatement, Session};
use crate::types::{ColumnDescription, ParamDescription, SqlType};

type BoxError = Box<dyn Error + Sync + Send>;

/// PostgreSQL driver implementation using tokio-postgres.
///
/// Results are read in full on execution, so every cursor is static.
/// Sessions run in autocommit mode.
pub struct TokioPostgresDriver {
    name: String,
}

impl TokioPostgresDriver {
    pub fn new() -> Self {
        Self {
            name: "PostgreSQL Unicode".to_string(),
        }
    }
}

impl Default for TokioPostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for TokioPostgresDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self, descriptor: &str) -> CallResult<Box<dyn Session>> {
        let config = config_from_descriptor(descriptor)?;
        let (client, connection) = config.connect(NoTls).await.map_err(|e| {
            let mut err = failure(e);
            if let Some(record) = err.diagnostics.first_mut() {
                if record.state == "HY000" {
                    record.state = "08001".to_string();
                }
            }
            err
        })?;

        // Spawn the connection handler
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "postgres connection error");
            }
        });

        let session: Box<dyn Session> = Box::new(PgSession {
            client: Arc::new(client),
            connection,
        });
        Ok(Outcome::ok(session))
    }
}

fn config_from_descriptor(descriptor: &str) -> Result<Config, Failure> {
    let mut config = Config::new();
    config.application_name("dbint");
    for (keyword, value) in parse_descriptor(descriptor) {
        match keyword.to_ascii_lowercase().as_str() {
            "server" => {
                let (server, instance) = match value.split_once('\\') {
                    Some((server, instance)) => (server, Some(instance)),
                    None => (value.as_str(), None),
                };
                if let Some(instance) = instance {
                    warn!(instance, "named instances are not supported by postgres, ignoring");
                }
                match server.split_once(',') {
                    Some((host, port)) => {
                        let port = port.trim().parse::<u16>().map_err(|_| {
                            Failure::new(Diagnostic::new(
                                "08001",
                                0,
                                format!("Invalid port '{port}' in server '{server}'"),
                            ))
                        })?;
                        config.host(host.trim());
                        config.port(port);
                    }
                    None => {
                        config.host(server.trim());
                    }
                }
            }
            "database" => {
                config.dbname(&value);
            }
            "user id" | "uid" => {
                config.user(&value);
            }
            "password" | "pwd" => {
                config.password(&value);
            }
            "driver" => {}
            other => debug!(keyword = other, "ignoring descriptor keyword"),
        }
    }
    Ok(config)
}

/// Turns a driver error into diagnostic records, keeping the server's
/// SQLSTATE when there is one.
fn failure(err: tokio_postgres::Error) -> Failure {
    let state = match err.code() {
        Some(code) => code.code().to_string(),
        None if err.is_closed() => "08S01".to_string(),
        None => "HY000".to_string(),
    };
    let message = match err.as_db_error() {
        Some(db) => db.message().to_string(),
        None => err.to_string(),
    };
    Failure::new(Diagnostic::new(state, 0, message))
}

fn sequence_error() -> Failure {
    Failure::new(Diagnostic::new("HY010", 0, "Function sequence error"))
}

struct PgSession {
    client: Arc<Client>,
    connection: JoinHandle<()>,
}

#[async_trait]
impl Session for PgSession {
    async fn ping(&self) -> CallResult<()> {
        self.client.simple_query("").await.map_err(failure)?;
        Ok(Outcome::ok(()))
    }

    async fn allocate_statement(&self, mode: CursorMode) -> CallResult<Box<dyn NativeStatement>> {
        trace!(?mode, "allocating postgres statement");
        let statement: Box<dyn NativeStatement> = Box::new(PgStatement {
            client: Arc::clone(&self.client),
            statement: None,
            described: Vec::new(),
            result: None,
            affected_rows: 0,
        });
        Ok(Outcome::ok(statement))
    }

    async fn disconnect(&self) -> CallResult<()> {
        self.connection.abort();
        Ok(Outcome::ok(()))
    }
}

struct PgStatement {
    client: Arc<Client>,
    statement: Option<Statement>,
    /// Result columns of the prepared text, until it is executed.
    described: Vec<ColumnDescription>,
    result: Option<RowSet>,
    affected_rows: u64,
}

impl PgStatement {
    async fn run(&mut self, statement: &Statement, values: &[TextParam]) -> CallResult<()> {
        self.result = None;
        self.described.clear();
        self.affected_rows = 0;
        let params: Vec<&(dyn ToSql + Sync)> =
            values.iter().map(|v| v as &(dyn ToSql + Sync)).collect();

        if statement.columns().is_empty() {
            self.affected_rows = self
                .client
                .execute(statement, &params)
                .await
                .map_err(failure)?;
            return Ok(Outcome::ok(()));
        }

        let rows = self
            .client
            .query(statement, &params)
            .await
            .map_err(failure)?;
        let columns = describe_columns(statement);

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(row.len());
            for index in 0..row.len() {
                let value: Option<AnyText> = row.try_get(index).map_err(failure)?;
                values.push(value.map(|v| v.0));
            }
            data.push(values);
        }
        self.affected_rows = data.len() as u64;
        self.result = Some(RowSet::new(columns, data));
        Ok(Outcome::ok(()))
    }
}

#[async_trait]
impl NativeStatement for PgStatement {
    async fn prepare(&mut self, sql: &[u16]) -> CallResult<()> {
        self.statement = None;
        self.described.clear();
        self.result = None;
        let sql = rewrite_placeholders(&String::from_utf16_lossy(sql));
        let statement = self.client.prepare(&sql).await.map_err(failure)?;
        self.described = describe_columns(&statement);
        self.statement = Some(statement);
        Ok(Outcome::ok(()))
    }

    async fn num_params(&mut self) -> CallResult<usize> {
        Ok(Outcome::ok(
            self.statement.as_ref().map_or(0, |s| s.params().len()),
        ))
    }

    async fn describe_param(&mut self, ordinal: usize) -> CallResult<ParamDescription> {
        let ty = self
            .statement
            .as_ref()
            .and_then(|s| s.params().get(ordinal.wrapping_sub(1)))
            .ok_or_else(|| {
                Failure::new(Diagnostic::new(
                    "07009",
                    0,
                    format!("Invalid parameter number {ordinal}"),
                ))
            })?;
        let (sql_type, size) = native_type(ty);
        Ok(Outcome::ok(ParamDescription::new(sql_type, size)))
    }

    async fn execute(&mut self, params: &[ParameterBinding]) -> CallResult<()> {
        let statement = self.statement.clone().ok_or_else(sequence_error)?;
        let values: Vec<TextParam> = params
            .iter()
            .map(|p| TextParam(p.value().to_text()))
            .collect();
        self.run(&statement, &values).await
    }

    async fn execute_direct(&mut self, sql: &[u16]) -> CallResult<()> {
        let sql = String::from_utf16_lossy(sql);
        let statement = self.client.prepare(&sql).await.map_err(failure)?;
        self.run(&statement, &[]).await
    }

    async fn num_result_cols(&mut self) -> CallResult<usize> {
        Ok(Outcome::ok(
            self.result
                .as_ref()
                .map_or(self.described.len(), |r| r.columns.len()),
        ))
    }

    async fn describe_col(&mut self, column: usize) -> CallResult<ColumnDescription> {
        match &self.result {
            Some(result) => result.describe(column),
            None => describe_prepared(&self.described, column),
        }
    }

    async fn row_count(&mut self) -> CallResult<u64> {
        Ok(Outcome::ok(match &self.result {
            Some(result) => result.len() as u64,
            None => self.affected_rows,
        }))
    }

    async fn fetch(
        &mut self,
        orientation: FetchOrientation,
        columns: &mut [ColumnBinding],
    ) -> CallResult<bool> {
        match &mut self.result {
            Some(result) => result.fetch(orientation, columns),
            None => Err(Failure::new(Diagnostic::new("24000", 0, "Invalid cursor state"))),
        }
    }

    async fn close(&mut self) -> CallResult<()> {
        self.result = None;
        self.described.clear();
        self.statement = None;
        Ok(Outcome::ok(()))
    }
}

fn describe_columns(statement: &Statement) -> Vec<ColumnDescription> {
    statement
        .columns()
        .iter()
        .map(|c| {
            let (sql_type, size) = native_type(c.type_());
            ColumnDescription::new(c.name(), sql_type, size)
        })
        .collect()
}

/// Rewrites `?` placeholders into `$1`, `$2`, ... outside literals,
/// comments and dollar-quoted bodies.
fn rewrite_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut copied = 0;
    for (index, offset) in placeholder_offsets(sql).into_iter().enumerate() {
        out.push_str(&sql[copied..offset]);
        let _ = write!(out, "${}", index + 1);
        copied = offset + 1;
    }
    out.push_str(&sql[copied..]);
    out
}

/// Native type code and display size for a PostgreSQL type.
fn native_type(ty: &Type) -> (SqlType, usize) {
    if *ty == Type::BOOL {
        (SqlType::BIT, 1)
    } else if *ty == Type::INT2 {
        (SqlType::SMALLINT, 6)
    } else if *ty == Type::INT4 {
        (SqlType::INTEGER, 11)
    } else if *ty == Type::INT8 {
        (SqlType::BIGINT, 20)
    } else if *ty == Type::OID {
        (SqlType::BIGINT, 10)
    } else if *ty == Type::FLOAT4 {
        (SqlType::REAL, 14)
    } else if *ty == Type::FLOAT8 {
        (SqlType::DOUBLE, 24)
    } else if *ty == Type::NUMERIC {
        (SqlType::NUMERIC, 0)
    } else if *ty == Type::BPCHAR || *ty == Type::CHAR {
        (SqlType::WCHAR, 0)
    } else if *ty == Type::VARCHAR {
        (SqlType::WVARCHAR, 0)
    } else if *ty == Type::NAME {
        (SqlType::WVARCHAR, 63)
    } else if *ty == Type::TEXT || *ty == Type::JSON || *ty == Type::JSONB {
        (SqlType::WLONGVARCHAR, 0)
    } else if *ty == Type::DATE {
        (SqlType::TYPE_DATE, 10)
    } else if *ty == Type::TIME {
        (SqlType::TYPE_TIME, 15)
    } else if *ty == Type::TIMESTAMP {
        (SqlType::TYPE_TIMESTAMP, 26)
    } else if *ty == Type::TIMESTAMPTZ {
        (SqlType::SS_TIMESTAMPOFFSET, 32)
    } else if *ty == Type::UUID {
        (SqlType::GUID, 36)
    } else if *ty == Type::BYTEA {
        (SqlType::VARBINARY, 0)
    } else if *ty == Type::XML {
        (SqlType::SS_XML, 0)
    } else if matches!(ty.kind(), Kind::Enum(_)) {
        (SqlType::WVARCHAR, 0)
    } else {
        (SqlType::UNKNOWN, 0)
    }
}

fn is_textual(ty: &Type) -> bool {
    [
        Type::TEXT,
        Type::VARCHAR,
        Type::BPCHAR,
        Type::CHAR,
        Type::NAME,
        Type::JSON,
        Type::XML,
        Type::UNKNOWN,
    ]
    .contains(ty)
        || matches!(ty.kind(), Kind::Enum(_))
}

/// A parameter sent in the text format, letting the server parse it into
/// whatever type the placeholder has.
#[derive(Debug)]
struct TextParam(Option<String>);

impl ToSql for TextParam {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match &self.0 {
            Some(text) => {
                out.put_slice(text.as_bytes());
                Ok(IsNull::No)
            }
            None => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}

/// Any result value rendered as text.
struct AnyText(String);

impl<'a> FromSql<'a> for AnyText {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let text = if *ty == Type::BOOL {
            let flag = if bool::from_sql(ty, raw)? { "1" } else { "0" };
            flag.to_string()
        } else if *ty == Type::INT2 {
            i16::from_sql(ty, raw)?.to_string()
        } else if *ty == Type::INT4 {
            i32::from_sql(ty, raw)?.to_string()
        } else if *ty == Type::INT8 {
            i64::from_sql(ty, raw)?.to_string()
        } else if *ty == Type::OID {
            u32::from_sql(ty, raw)?.to_string()
        } else if *ty == Type::FLOAT4 {
            f32::from_sql(ty, raw)?.to_string()
        } else if *ty == Type::FLOAT8 {
            f64::from_sql(ty, raw)?.to_string()
        } else if *ty == Type::NUMERIC {
            decode_numeric(raw)?
        } else if *ty == Type::DATE {
            NaiveDate::from_sql(ty, raw)?.format("%Y-%m-%d").to_string()
        } else if *ty == Type::TIME {
            NaiveTime::from_sql(ty, raw)?.format("%H:%M:%S%.f").to_string()
        } else if *ty == Type::TIMESTAMP {
            NaiveDateTime::from_sql(ty, raw)?
                .format("%Y-%m-%d %H:%M:%S%.f")
                .to_string()
        } else if *ty == Type::TIMESTAMPTZ {
            DateTime::<Utc>::from_sql(ty, raw)?
                .format("%Y-%m-%d %H:%M:%S%.f%:z")
                .to_string()
        } else if *ty == Type::UUID {
            decode_uuid(raw)?
        } else if *ty == Type::JSONB {
            // binary jsonb carries a one byte version prefix
            String::from_utf8_lossy(raw.get(1..).unwrap_or_default()).into_owned()
        } else if is_textual(ty) {
            String::from_utf8_lossy(raw).into_owned()
        } else {
            hex(raw)
        };
        Ok(AnyText(text))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn hex(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len() * 2);
    for byte in raw {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn decode_uuid(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() != 16 {
        return Err("invalid uuid length".into());
    }
    let digits = hex(raw);
    Ok(format!(
        "{}-{}-{}-{}-{}",
        &digits[..8],
        &digits[8..12],
        &digits[12..16],
        &digits[16..20],
        &digits[20..]
    ))
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Decodes the binary `numeric` wire format: a header of digit count,
/// weight, sign and display scale, then base-10000 digits.
fn decode_numeric(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() < 8 {
        return Err("invalid numeric header".into());
    }
    let word = |i: usize| u16::from_be_bytes([raw[i], raw[i + 1]]);
    let ndigits = word(0) as usize;
    let weight = word(2) as i16 as i32;
    let sign = word(4);
    let dscale = word(6) as usize;

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        _ => {}
    }
    if raw.len() < 8 + ndigits * 2 {
        return Err("truncated numeric digits".into());
    }
    let digit = |i: i32| -> u16 {
        if i < 0 || i as usize >= ndigits {
            0
        } else {
            word(8 + 2 * i as usize)
        }
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        for i in 0..=weight {
            if i == 0 {
                let _ = write!(out, "{}", digit(i));
            } else {
                let _ = write!(out, "{:04}", digit(i));
            }
        }
    }
    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut i = weight + 1;
        while fraction.len() < dscale {
            let _ = write!(fraction, "{:04}", digit(i));
            i += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;

    fn numeric(weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&(digits.len() as u16).to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&dscale.to_be_bytes());
        for d in digits {
            raw.extend_from_slice(&d.to_be_bytes());
        }
        raw
    }

    #[test]
    fn test_rewrite_placeholders() {
        assert_eq!(
            rewrite_placeholders("UPDATE t SET a = ? WHERE b = ?"),
            "UPDATE t SET a = $1 WHERE b = $2"
        );
        assert_eq!(
            rewrite_placeholders("SELECT '?', \"c?\" FROM t WHERE x = ?"),
            "SELECT '?', \"c?\" FROM t WHERE x = $1"
        );
        assert_eq!(rewrite_placeholders("commit"), "commit");
        assert_eq!(
            rewrite_placeholders("SELECT a -- b = ?\nFROM t WHERE c = ? AND d = $$?$$"),
            "SELECT a -- b = ?\nFROM t WHERE c = $1 AND d = $$?$$"
        );
    }

    #[test]
    fn test_decode_numeric() {
        assert_eq!(decode_numeric(&numeric(0, 0, 2, &[123, 4500])).unwrap(), "123.45");
        assert_eq!(decode_numeric(&numeric(-1, 0, 2, &[500])).unwrap(), "0.05");
        assert_eq!(decode_numeric(&numeric(1, 0, 0, &[1])).unwrap(), "10000");
        assert_eq!(
            decode_numeric(&numeric(0, NUMERIC_NEG, 1, &[1, 5000])).unwrap(),
            "-1.5"
        );
        assert_eq!(decode_numeric(&numeric(0, 0, 2, &[])).unwrap(), "0.00");
        assert_eq!(decode_numeric(&numeric(0, NUMERIC_NAN, 0, &[])).unwrap(), "NaN");
        assert!(decode_numeric(&[0, 1]).is_err());
    }

    #[test]
    fn test_native_type_mapping() {
        assert_eq!(native_type(&Type::INT4).0.column_type(), ColumnType::Number);
        assert_eq!(native_type(&Type::VARCHAR).0.column_type(), ColumnType::Text);
        assert_eq!(
            native_type(&Type::TIMESTAMPTZ).0.column_type(),
            ColumnType::Date
        );
        assert_eq!(native_type(&Type::BYTEA).0.column_type(), ColumnType::Lob);
        assert_eq!(native_type(&Type::POINT).0.column_type(), ColumnType::Unset);
        assert_eq!(native_type(&Type::UUID), (SqlType::GUID, 36));
    }

    #[test]
    fn test_decode_uuid_and_hex() {
        let raw: Vec<u8> = (0u8..16).collect();
        assert_eq!(
            decode_uuid(&raw).unwrap(),
            "00010203-0405-0607-0809-0a0b0c0d0e0f"
        );
        assert_eq!(hex(&[0xde, 0xad]), "dead");
    }

    #[test]
    fn test_config_from_descriptor() {
        let config = config_from_descriptor(
            "Driver={PostgreSQL Unicode};Server=db.local,5433\\main;Database=sales;User Id=app;Password=pw;",
        )
        .unwrap();
        assert_eq!(config.get_ports(), &[5433]);
        assert_eq!(config.get_dbname(), Some("sales"));
        assert_eq!(config.get_user(), Some("app"));

        let err = config_from_descriptor("Server=h,notaport;").unwrap_err();
        assert_eq!(err.diagnostics[0].state, "08001");
    }
}
