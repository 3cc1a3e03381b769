//! Query execution and dump ingestion against one open SQLite connection.

use log::trace;

use crate::error::Error;
use crate::schema;

/// A single cell of a query result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

/// One row of a query result: an ordered list of cells matching the
/// query's `SELECT` projection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row(Vec<Cell>);

impl Row {
    pub fn get(&self, index: usize) -> &Cell {
        &self.0[index]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub struct Connection {
    conn: rusqlite::Connection,
}

impl Connection {
    pub(crate) fn new(conn: rusqlite::Connection) -> Self {
        Connection { conn }
    }

    /// Runs a parameterised query, returning every matching row.
    pub fn query(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Row>, Error> {
        let mut stmt = self.conn.prepare(sql)?;
        let column_count = stmt.column_count();

        let rows = stmt.query_map(params, |row| {
            let mut cells = Vec::with_capacity(column_count);
            for i in 0..column_count {
                cells.push(match row.get_ref(i)? {
                    rusqlite::types::ValueRef::Null => Cell::Null,
                    rusqlite::types::ValueRef::Integer(n) => Cell::Integer(n),
                    rusqlite::types::ValueRef::Real(f) => Cell::Real(f),
                    rusqlite::types::ValueRef::Text(t) => {
                        Cell::Text(String::from_utf8_lossy(t).into_owned())
                    }
                    rusqlite::types::ValueRef::Blob(b) => {
                        Cell::Text(String::from_utf8_lossy(b).into_owned())
                    }
                });
            }
            Ok(Row(cells))
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Error::from)
    }

    /// Ingests a stream of dump events, creating one transaction per table
    /// (committed at `table_end`) so throughput doesn't pay a per-record
    /// fsync cost while still bounding how much an aborted ingest loses.
    pub fn ingest<I>(&mut self, events: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Result<ccm_dump::Event, ccm_dump::Error>>,
    {
        use ccm_dump::Event;

        let mut current_table: Option<String> = None;

        for event in events {
            match event? {
                Event::Version(v) => trace!("dump version {}", v),
                Event::Platform(p) => trace!("dump platform {}", p),
                Event::SchemaVersion(s) => trace!("dump schemaversion {}", s),
                Event::Section(section) => {
                    trace!("skipping section '{}' ({} items)", section.name, section.items.len());
                }
                Event::TableStart(start) => {
                    schema::column_count(&start.name)
                        .ok_or_else(|| Error::UnknownTable(start.name.clone()))?;
                    self.conn.execute_batch("BEGIN")?;
                    current_table = Some(start.name);
                }
                Event::TableRecord(record) => {
                    if current_table.as_deref() != Some(record.table.as_str()) {
                        return Err(Error::RecordOutsideTable(record.table));
                    }
                    self.insert_record(&record.table, &record.record)?;
                }
                Event::TableEnd(end) => {
                    self.conn.execute_batch("COMMIT")?;
                    trace!("committed table {} ({} records)", end.name, end.record_count);
                    current_table = None;
                }
            }
        }

        Ok(())
    }

    fn insert_record(&self, table: &str, record: &[ccm_dump::Value]) -> Result<(), Error> {
        let expected = schema::column_count(table).ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        if record.len() != expected {
            return Err(Error::ColumnCountMismatch {
                table: table.to_string(),
                expected,
                actual: record.len(),
            });
        }

        let placeholders = (1..=record.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} VALUES ({})",
            schema::quoted_table_name(table),
            placeholders
        );

        let params: Vec<rusqlite::types::Value> = record.iter().map(dump_value_to_sql).collect();
        self.conn
            .execute(&sql, rusqlite::params_from_iter(params.iter()))?;

        Ok(())
    }
}

fn dump_value_to_sql(value: &ccm_dump::Value) -> rusqlite::types::Value {
    match value {
        ccm_dump::Value::Str(s) => rusqlite::types::Value::Text(s.clone()),
        ccm_dump::Value::Int(n) => rusqlite::types::Value::Integer(*n),
        ccm_dump::Value::Float(f) => rusqlite::types::Value::Real(*f),
        ccm_dump::Value::Null => rusqlite::types::Value::Null,
    }
}
