use crate::{Error, Result};
use log::{debug, info};
use market_data::TickerPoint;
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// target table of a collection job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerTable {
    /// coin against currency, the coin code is stored as is
    Asset,
    /// currency against currency, both codes resolved to currency ids
    Currency,
}

impl TickerTable {
    pub fn name(self) -> &'static str {
        match self {
            TickerTable::Asset => "asset_ticker",
            TickerTable::Currency => "currency_ticker",
        }
    }

    /// upsert statement, parameters are (timestamp, subject, counter, value)
    ///
    /// only the value is updated on conflict, so replaying a window is harmless
    pub fn upsert_sql(self, dialect: Dialect) -> &'static str {
        match (self, dialect) {
            (TickerTable::Asset, Dialect::Sqlite) => {
                "INSERT INTO asset_ticker (\"timestamp\", asset_id, vs_currency_id, value) \
                 VALUES (?1, ?2, (SELECT id FROM currency WHERE code = ?3), ?4) \
                 ON CONFLICT (\"timestamp\", asset_id, vs_currency_id) \
                 DO UPDATE SET value = excluded.value"
            }
            (TickerTable::Currency, Dialect::Sqlite) => {
                "INSERT INTO currency_ticker (\"timestamp\", currency_id, vs_currency_id, value) \
                 VALUES (?1, (SELECT id FROM currency WHERE code = ?2), \
                 (SELECT id FROM currency WHERE code = ?3), ?4) \
                 ON CONFLICT (\"timestamp\", currency_id, vs_currency_id) \
                 DO UPDATE SET value = excluded.value"
            }
            (TickerTable::Asset, Dialect::Postgres) => {
                "INSERT INTO \"data\".\"asset_ticker\" (\"timestamp\", \"asset_id\", \"vs_currency_id\", \"value\") \
                 VALUES ($1, $2, (SELECT \"id\" FROM \"data\".\"currency\" WHERE \"code\" = $3), $4) \
                 ON CONFLICT (\"timestamp\", \"asset_id\", \"vs_currency_id\") \
                 DO UPDATE SET \"value\" = EXCLUDED.\"value\""
            }
            (TickerTable::Currency, Dialect::Postgres) => {
                "INSERT INTO \"data\".\"currency_ticker\" (\"timestamp\", \"currency_id\", \"vs_currency_id\", \"value\") \
                 VALUES ($1, (SELECT \"id\" FROM \"data\".\"currency\" WHERE \"code\" = $2), \
                 (SELECT \"id\" FROM \"data\".\"currency\" WHERE \"code\" = $3), $4) \
                 ON CONFLICT (\"timestamp\", \"currency_id\", \"vs_currency_id\") \
                 DO UPDATE SET \"value\" = EXCLUDED.\"value\""
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

/// one upsert of one point, values are bound and never spliced into the sql
#[derive(Debug, Clone, Copy)]
pub struct UpsertStatement<'a> {
    pub sql: &'static str,
    pub point: &'a TickerPoint,
}

pub fn build_upserts<'a>(
    table: TickerTable,
    dialect: Dialect,
    points: &'a [TickerPoint],
) -> impl Iterator<Item = UpsertStatement<'a>> {
    let sql = table.upsert_sql(dialect);
    points.iter().map(move |point| UpsertStatement { sql, point })
}

/// destination of normalized points
pub trait TickerSink {
    /// writes all points in one transaction, returns the number of statements executed
    fn write(&mut self, table: TickerTable, points: &[TickerPoint]) -> Result<usize>;
}

/// sqlite database, the connection lives as long as the sink
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// opens an existing database file, tables are expected to exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        Ok(SqliteSink::new(conn))
    }

    pub fn new(conn: Connection) -> Self {
        SqliteSink { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl TickerSink for SqliteSink {
    fn write(&mut self, table: TickerTable, points: &[TickerPoint]) -> Result<usize> {
        if points.is_empty() {
            return Ok(0);
        }
        info!("Executing {} SQL commands on {}.", points.len(), table.name());
        // dropping the transaction without commit rolls it back
        let trx = self.conn.transaction()?;
        let mut written = 0;
        for upsert in build_upserts(table, Dialect::Sqlite, points) {
            let p = upsert.point;
            debug!(
                "Executing SQL command: {} with ({}, {}, {}, {})",
                upsert.sql,
                p.canonical_timestamp(),
                p.subject_code,
                p.counter_code,
                p.value
            );
            let mut stmt = trx.prepare_cached(upsert.sql)?;
            stmt.execute(params![
                p.canonical_timestamp(),
                &p.subject_code,
                &p.counter_code,
                p.value
            ])?;
            written += 1;
        }
        info!("Committing to database.");
        trx.commit()?;
        info!("Committed to database.");
        Ok(written)
    }
}

/// connection parameters of the postgres database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl PgConfig {
    /// libpq keyword/value connection string
    pub fn conninfo(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            quote_conninfo(&self.host),
            self.port,
            quote_conninfo(&self.user),
            quote_conninfo(&self.password),
            quote_conninfo(&self.database)
        )
    }
}

fn quote_conninfo(v: &str) -> String {
    format!("'{}'", v.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// where collected points are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    Sqlite(PathBuf),
    Postgres(PgConfig),
}

/// opens the single connection of a run
pub fn open_sink(target: &DbTarget) -> Result<Box<dyn TickerSink>> {
    info!("Opening the database connection.");
    let sink: Box<dyn TickerSink> = match target {
        DbTarget::Sqlite(path) => Box::new(SqliteSink::open(path)?),
        DbTarget::Postgres(cfg) => open_pg_sink(cfg)?,
    };
    info!("Database connection opened.");
    Ok(sink)
}

#[cfg(feature = "postgres")]
fn open_pg_sink(cfg: &PgConfig) -> Result<Box<dyn TickerSink>> {
    Ok(Box::new(pg::PgSink::connect(cfg)?))
}

#[cfg(not(feature = "postgres"))]
fn open_pg_sink(cfg: &PgConfig) -> Result<Box<dyn TickerSink>> {
    Err(Error::Config(format!(
        "cannot connect to {}:{}, built without the postgres feature, use --file",
        cfg.host, cfg.port
    )))
}

#[cfg(feature = "postgres")]
pub mod pg {
    use super::{build_upserts, Dialect, PgConfig, TickerSink, TickerTable};
    use crate::{Error, Result};
    use diesel::pg::PgConnection;
    use diesel::prelude::*;
    use diesel::sql_types::{Double, Text, Timestamptz};
    use log::{debug, info};
    use market_data::TickerPoint;

    pub struct PgSink {
        conn: PgConnection,
    }

    impl PgSink {
        pub fn connect(cfg: &PgConfig) -> Result<Self> {
            let conn = PgConnection::establish(&cfg.conninfo())?;
            Ok(PgSink { conn })
        }
    }

    impl TickerSink for PgSink {
        fn write(&mut self, table: TickerTable, points: &[TickerPoint]) -> Result<usize> {
            if points.is_empty() {
                return Ok(0);
            }
            info!("Executing {} SQL commands on {}.", points.len(), table.name());
            let conn = &self.conn;
            let written = conn.transaction::<usize, Error, _>(|| {
                let mut written = 0;
                for upsert in build_upserts(table, Dialect::Postgres, points) {
                    let p = upsert.point;
                    debug!("Executing SQL command: {} for {:?}", upsert.sql, p);
                    diesel::sql_query(upsert.sql)
                        .bind::<Timestamptz, _>(p.timestamp)
                        .bind::<Text, _>(p.subject_code.clone())
                        .bind::<Text, _>(p.counter_code.clone())
                        .bind::<Double, _>(p.value)
                        .execute(conn)?;
                    written += 1;
                }
                info!("Committing to database.");
                Ok(written)
            })?;
            info!("Committed to database.");
            Ok(written)
        }
    }
}
