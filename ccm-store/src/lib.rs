//! A single-file relational store for the backup dump's seven tables,
//! created once from a dump and thereafter opened read-only.
//!
//! Concrete binding is `rusqlite` against a bundled SQLite file, matching
//! how the teacher's `git-cvs-fast-import-store` crate wraps its own
//! on-disk store. Unlike that crate, ingestion here is single-threaded and
//! sequential (there is no per-table worker thread): the source dump is
//! itself a single sequential stream, so there is nothing to parallelise.

mod connection;
mod error;
mod functions;
mod schema;

use std::path::{Path, PathBuf};

pub use connection::{Cell, Connection, Row};
pub use error::Error;

mod embedded {
    refinery::embed_migrations!("./migrations");
}

/// A relational image on disk. Opening it for ingestion refuses to
/// overwrite an existing file; opening it for read access does not.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Creates a fresh store at `path`, running the embedded schema
    /// migrations. Fails if a file already exists at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if path.exists() {
            return Err(Error::AlreadyExists(path.to_path_buf()));
        }

        let store = Store {
            path: path.to_path_buf(),
        };
        let mut conn = store.open_raw()?;
        embedded::migrations::runner().run(&mut conn)?;
        Ok(store)
    }

    /// Opens an existing store read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let store = Store {
            path: path.as_ref().to_path_buf(),
        };
        // fail fast if the file doesn't look like a store at all.
        store.open_raw()?;
        Ok(store)
    }

    /// Opens a new connection to this store, with `ccm_status` registered.
    pub fn connection(&self) -> Result<Connection, Error> {
        Ok(Connection::new(self.open_raw()?))
    }

    fn open_raw(&self) -> Result<rusqlite::Connection, Error> {
        let conn = rusqlite::Connection::open(&self.path)?;
        functions::register(&conn)?;
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccm_dump::{Event, TableEnd, TableRecord, TableStart, Value};

    #[test]
    fn refuses_to_create_over_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite3");
        std::fs::write(&path, b"not a store").unwrap();
        assert!(matches!(Store::create(&path), Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn create_then_open_then_ingest_a_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite3");
        let store = Store::create(&path).unwrap();

        let events: Vec<Result<Event, ccm_dump::Error>> = vec![
            Ok(Event::TableStart(TableStart {
                name: "release".to_string(),
            })),
            Ok(Event::TableRecord(TableRecord {
                table: "release".to_string(),
                record: vec![Value::Int(1), Value::Str("my-release".to_string())],
            })),
            Ok(Event::TableEnd(TableEnd {
                name: "release".to_string(),
                record_count: 1,
            })),
        ];

        let mut conn = store.connection().unwrap();
        conn.ingest(events).unwrap();

        let rows = conn.query("SELECT id, name FROM \"release\"", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(0), &Cell::Integer(1));
        assert_eq!(rows[0].get(1), &Cell::Text("my-release".to_string()));

        // reopening for read access is fine.
        let reopened = Store::open(&path).unwrap();
        let rows = reopened
            .connection()
            .unwrap()
            .query("SELECT COUNT(*) FROM \"release\"", &[])
            .unwrap();
        assert_eq!(rows[0].get(0), &Cell::Integer(1));
    }
}
