//! DuckDB-based database query engine
//!
//! Provides unified read access to PostgreSQL, MySQL, SQLite and DuckDB
//! files via DuckDB extensions. The source is attached read-only as
//! `source_db` inside an in-memory DuckDB session.

use super::source::RowSource;
use crate::error::{Error, Result};
use crate::loader::{DatabaseConnectionDef, DatabaseEngine as DbType, PortDef, TableSpec};
use crate::template::{self, TemplateContext};
use crate::types::{Row, Value};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use duckdb::types::{TimeUnit, Value as DuckValue};
use duckdb::Connection;

/// Alias under which the source database is attached
const SOURCE_ALIAS: &str = "source_db";

/// Column type DuckDB reports for zone-aware timestamps
const ZONED_TIMESTAMP: &str = "TIMESTAMP WITH TIME ZONE";

/// Database query engine using DuckDB
#[derive(Debug)]
pub struct DatabaseEngine {
    /// DuckDB connection
    conn: Connection,
    /// Database type
    db_type: DbType,
    /// Whether a source database was attached (false for in-memory DuckDB)
    attached: bool,
    /// Connection string used (for logging)
    connection_string: String,
    /// Zone in which zone-aware timestamps are rendered
    time_zone: Tz,
}

impl DatabaseEngine {
    /// Open the single session used for a whole run
    ///
    /// Fails with a connection error when DuckDB cannot start or the source
    /// cannot be attached.
    pub fn open(connection: &DatabaseConnectionDef, context: &TemplateContext) -> Result<Self> {
        let connection_string = Self::build_connection_string(connection, context)?;

        let conn = Connection::open_in_memory()
            .map_err(|e| Error::connection(format!("Failed to create DuckDB connection: {e}")))?;

        let mut engine = Self {
            conn,
            db_type: connection.engine,
            attached: false,
            connection_string,
            time_zone: Tz::UTC,
        };

        engine.attach_database()?;
        engine.time_zone = engine.resolve_time_zone(connection, context)?;
        tracing::info!(
            "Connected to {} ({}, time zone {})",
            engine.db_type,
            engine.connection_info(),
            engine.time_zone
        );

        Ok(engine)
    }

    /// Open a private in-memory DuckDB database
    pub fn in_memory() -> Result<Self> {
        let connection = DatabaseConnectionDef {
            engine: DbType::Duckdb,
            ..Default::default()
        };
        Self::open(&connection, &TemplateContext::new())
    }

    /// Build connection string from config
    fn build_connection_string(
        connection: &DatabaseConnectionDef,
        context: &TemplateContext,
    ) -> Result<String> {
        if let Some(ref conn_str) = connection.connection_string {
            return template::render(conn_str, context);
        }

        let host = template::render_opt(connection.host.as_deref(), context)?
            .unwrap_or_else(|| "localhost".to_string());
        let user = template::render_opt(connection.user.as_deref(), context)?
            .unwrap_or_else(|| "postgres".to_string());
        let password =
            template::render_opt(connection.password.as_deref(), context)?.unwrap_or_default();

        let port = match &connection.port {
            Some(PortDef::Number(p)) => *p,
            Some(PortDef::Template(t)) => {
                let rendered = template::render(t, context)?;
                rendered
                    .trim()
                    .parse()
                    .map_err(|_| Error::config(format!("Invalid database port: '{rendered}'")))?
            }
            None => match connection.engine {
                DbType::Postgres => 5432,
                DbType::Mysql => 3306,
                DbType::Sqlite | DbType::Duckdb => 0,
            },
        };

        match connection.engine {
            DbType::Postgres => {
                let database = template::render_opt(connection.database.as_deref(), context)?
                    .unwrap_or_else(|| "postgres".to_string());
                Ok(format!(
                    "postgresql://{user}:{password}@{host}:{port}/{database}"
                ))
            }
            DbType::Mysql => {
                let database = template::render_opt(connection.database.as_deref(), context)?
                    .unwrap_or_else(|| "mysql".to_string());
                Ok(format!(
                    "mysql://{user}:{password}@{host}:{port}/{database}"
                ))
            }
            // SQLite and DuckDB use database as file path
            DbType::Sqlite => template::render_opt(connection.database.as_deref(), context)?
                .ok_or_else(|| Error::config("SQLite source requires `database` (file path)")),
            DbType::Duckdb => Ok(template::render_opt(connection.database.as_deref(), context)?
                .unwrap_or_else(|| ":memory:".to_string())),
        }
    }

    /// Attach external database to DuckDB
    fn attach_database(&mut self) -> Result<()> {
        let (extension, attach_type) = match self.db_type {
            DbType::Postgres => (Some("postgres"), Some("POSTGRES")),
            DbType::Mysql => (Some("mysql"), Some("MYSQL")),
            DbType::Sqlite => (Some("sqlite"), Some("SQLITE")),
            DbType::Duckdb => {
                if self.connection_string == ":memory:" {
                    return Ok(());
                }
                (None, None)
            }
        };

        if let Some(extension) = extension {
            self.conn
                .execute_batch(&format!("INSTALL {extension}; LOAD {extension};"))
                .map_err(|e| {
                    Error::connection(format!("Failed to load {extension} extension: {e}"))
                })?;
        }

        let options = match attach_type {
            Some(t) => format!("TYPE {t}, READ_ONLY"),
            None => "READ_ONLY".to_string(),
        };
        let attach_sql = format!(
            "ATTACH '{}' AS {SOURCE_ALIAS} ({options});",
            self.connection_string.replace('\'', "''")
        );
        self.conn.execute_batch(&attach_sql).map_err(|e| {
            Error::connection(format!(
                "Failed to attach {} at {}: {e}",
                self.db_type,
                self.connection_info()
            ))
        })?;

        self.attached = true;
        Ok(())
    }

    /// Zone for rendering zone-aware timestamps
    ///
    /// An explicit `timezone` wins. Otherwise PostgreSQL sources report their
    /// session `TimeZone`; every other source renders in UTC.
    fn resolve_time_zone(
        &self,
        connection: &DatabaseConnectionDef,
        context: &TemplateContext,
    ) -> Result<Tz> {
        let name = match template::render_opt(connection.timezone.as_deref(), context)? {
            Some(name) => name,
            None if self.db_type == DbType::Postgres && self.attached => {
                match self.source_time_zone() {
                    Ok(name) => name,
                    Err(e) => {
                        tracing::warn!("Could not read source time zone, using UTC: {}", e);
                        return Ok(Tz::UTC);
                    }
                }
            }
            None => return Ok(Tz::UTC),
        };

        name.trim().parse::<Tz>().map_err(|_| {
            Error::connection(format!(
                "Unknown time zone '{name}'; set `database.timezone` to an IANA zone name"
            ))
        })
    }

    /// The PostgreSQL session `TimeZone` setting
    fn source_time_zone(&self) -> std::result::Result<String, duckdb::Error> {
        let sql = format!(
            "SELECT * FROM postgres_query('{SOURCE_ALIAS}', 'SELECT current_setting(''TimeZone'')')"
        );
        self.conn.query_row(&sql, [], |row| row.get::<_, String>(0))
    }

    /// Zone used for zone-aware timestamps
    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Test database connection
    pub fn check_connection(&self) -> Result<()> {
        let query = match self.db_type {
            DbType::Postgres => "SELECT 1 FROM source_db.pg_catalog.pg_tables LIMIT 1",
            DbType::Mysql => "SELECT 1 FROM source_db.information_schema.tables LIMIT 1",
            DbType::Sqlite => "SELECT 1 FROM source_db.sqlite_master LIMIT 1",
            DbType::Duckdb => "SELECT 1",
        };

        self.conn
            .execute_batch(query)
            .map_err(|e| Error::connection(format!("Connection check failed: {e}")))?;

        Ok(())
    }

    /// Execute raw SQL statements against the session
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::connection(format!("Failed to execute SQL: {e}")))
    }

    /// Fully-qualified, quoted table reference
    fn qualified_table(&self, name: &str) -> String {
        let quoted: Vec<String> = name.split('.').map(quote_ident).collect();
        let table = quoted.join(".");

        if !self.attached {
            return table;
        }

        match self.db_type {
            // Default to public schema for postgres
            DbType::Postgres if quoted.len() == 1 => format!("{SOURCE_ALIAS}.public.{table}"),
            _ => format!("{SOURCE_ALIAS}.{table}"),
        }
    }

    /// Full-snapshot query selecting exactly the mapped columns, in order
    pub fn select_query(&self, table: &TableSpec) -> String {
        let columns: Vec<String> = table
            .source_columns
            .iter()
            .map(|c| quote_ident(c))
            .collect();
        format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            self.qualified_table(&table.name)
        )
    }

    /// Get database type
    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    /// Get connection string (for logging - password masked)
    pub fn connection_info(&self) -> String {
        if let Some(at_pos) = self.connection_string.find('@') {
            if let Some(colon_pos) = self.connection_string[..at_pos].rfind(':') {
                let before_pass = &self.connection_string[..=colon_pos];
                let after_at = &self.connection_string[at_pos..];
                if before_pass.contains("://") {
                    return format!("{before_pass}****{after_at}");
                }
            }
        }
        self.connection_string.clone()
    }

    /// Close the session
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| Error::connection(format!("Failed to close connection: {e}")))
    }
}

impl DatabaseEngine {
    /// Which result columns of `query` carry a time zone
    fn zoned_columns(&self, query: &str) -> std::result::Result<Vec<bool>, duckdb::Error> {
        let mut stmt = self.conn.prepare(&format!("DESCRIBE {query}"))?;
        let types = stmt.query_map([], |row| row.get::<_, String>(1))?;
        types
            .map(|t| t.map(|t| t.eq_ignore_ascii_case(ZONED_TIMESTAMP)))
            .collect()
    }
}

impl RowSource for DatabaseEngine {
    fn extract(&self, table: &TableSpec) -> Result<Vec<Row>> {
        let query = self.select_query(table);
        tracing::debug!("Executing query: {}", query);

        let arity = table.source_columns.len();
        let fail = |e: duckdb::Error| Error::extraction(&table.name, e.to_string());

        let zoned = self.zoned_columns(&query).map_err(fail)?;

        let mut stmt = self.conn.prepare(&query).map_err(fail)?;
        let mut rows = stmt.query([]).map_err(fail)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(fail)? {
            let mut values = Vec::with_capacity(arity);
            for i in 0..arity {
                let value: DuckValue = row.get(i).map_err(fail)?;
                let value = duckdb_value_to_value(value).map_err(|msg| {
                    Error::extraction(
                        &table.name,
                        format!("column {}: {msg}", table.source_columns[i]),
                    )
                })?;
                values.push(match value {
                    Value::Timestamp(utc) if zoned.get(i).copied().unwrap_or(false) => {
                        Value::Timestamp(self.time_zone.from_utc_datetime(&utc).naive_local())
                    }
                    other => other,
                });
            }
            out.push(values);
        }

        tracing::info!("Extracted {} rows from table {}", out.len(), table.name);
        Ok(out)
    }
}

/// Quote an SQL identifier
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.trim().replace('"', "\"\""))
}

fn to_micros(unit: TimeUnit, value: i64) -> Option<i64> {
    match unit {
        TimeUnit::Second => value.checked_mul(1_000_000),
        TimeUnit::Millisecond => value.checked_mul(1_000),
        TimeUnit::Microsecond => Some(value),
        TimeUnit::Nanosecond => Some(value / 1_000),
    }
}

/// Convert DuckDB Value to crate Value
///
/// Values with no faithful text rendering (nested types, out-of-range
/// temporals) are rejected rather than written in some ad-hoc form.
fn duckdb_value_to_value(value: DuckValue) -> std::result::Result<Value, String> {
    let value = match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::Int(i.into()),
        DuckValue::SmallInt(i) => Value::Int(i.into()),
        DuckValue::Int(i) => Value::Int(i.into()),
        DuckValue::BigInt(i) => Value::Int(i),
        DuckValue::HugeInt(i) => {
            i64::try_from(i).map_or_else(|_| Value::Text(i.to_string()), Value::Int)
        }
        DuckValue::UTinyInt(i) => Value::UInt(i.into()),
        DuckValue::USmallInt(i) => Value::UInt(i.into()),
        DuckValue::UInt(i) => Value::UInt(i.into()),
        DuckValue::UBigInt(i) => Value::UInt(i),
        DuckValue::Float(f) => Value::Float(f64::from(f)),
        DuckValue::Double(f) => Value::Float(f),
        DuckValue::Decimal(d) => Value::Text(d.to_string()),
        DuckValue::Text(s) => Value::Text(s),
        DuckValue::Enum(s) => Value::Text(s),
        DuckValue::Blob(b) => Value::Blob(b),
        DuckValue::Timestamp(unit, i) => to_micros(unit, i)
            .and_then(DateTime::from_timestamp_micros)
            .map(|dt| Value::Timestamp(dt.naive_utc()))
            .ok_or_else(|| format!("timestamp out of range ({i})"))?,
        DuckValue::Date32(d) => {
            // Days since epoch (719163 is the number of days from 1 CE to 1970-01-01)
            d.checked_add(719_163)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .map(Value::Date)
                .ok_or_else(|| format!("date out of range ({d})"))?
        }
        DuckValue::Time64(unit, t) => to_micros(unit, t)
            .and_then(|micros| {
                let secs = u32::try_from(micros.div_euclid(1_000_000)).ok()?;
                let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok()?;
                NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
            })
            .map(Value::Time)
            .ok_or_else(|| format!("time out of range ({t})"))?,
        DuckValue::Interval {
            months,
            days,
            nanos,
        } => Value::Interval {
            months,
            days,
            micros: nanos / 1_000,
        },
        DuckValue::List(_) | DuckValue::Array(_) => {
            return Err("unsupported type LIST; cast it to VARCHAR in a view".to_string())
        }
        DuckValue::Struct(_) => {
            return Err("unsupported type STRUCT; cast it to VARCHAR in a view".to_string())
        }
        DuckValue::Map(_) => {
            return Err("unsupported type MAP; cast it to VARCHAR in a view".to_string())
        }
        _ => return Err("unsupported column type".to_string()),
    };
    Ok(value)
}
