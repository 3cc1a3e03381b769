//! A small hand-built backup used by every module's `#[cfg(test)]` suite:
//! one `project`, one `dir` bound under it, one `file` bound under the
//! `dir`, plus the `base~1:model:base` delimiter object every four-part
//! name lookup depends on.

use ccm_dump::{Event, TableEnd, TableRecord, TableStart, Value};
use tempfile::TempDir;

use crate::LookupContext;

pub const BASE_ID: i64 = 1;
pub const PROJECT_ID: i64 = 10;
pub const DIR_ID: i64 = 20;
pub const FILE_ID: i64 = 30;
pub const FILE_V2_ID: i64 = 31;
pub const FILE_V3_ID: i64 = 32;
pub const DELIM: &str = "-";

pub struct Fixture {
    _dir: TempDir,
    pub ctx: LookupContext,
}

fn compver_row(id: i64, status: &str, cvtype: &str, name: &str, version: &str, subsystem: &str) -> Vec<Value> {
    let mut row = vec![Value::Null; 37];
    row[0] = Value::Int(id);
    row[1] = Value::Str(status.to_string());
    row[2] = Value::Int(0);
    row[3] = Value::Int(0);
    row[4] = Value::Str("tester".to_string());
    row[5] = Value::Int(0);
    row[6] = Value::Int(0);
    row[7] = Value::Str(subsystem.to_string());
    row[8] = Value::Str(cvtype.to_string());
    row[9] = Value::Str(name.to_string());
    row[10] = Value::Str(version.to_string());
    row
}

fn attrib_row(
    id: i64,
    name: &str,
    is_attr_of: i64,
    textval: Option<&str>,
    strval: Option<&str>,
) -> Vec<Value> {
    vec![
        Value::Int(id),
        Value::Str(name.to_string()),
        Value::Int(0),
        textval.map(|s| Value::Str(s.to_string())).unwrap_or(Value::Null),
        Value::Null,
        strval.map(|s| Value::Str(s.to_string())).unwrap_or(Value::Null),
        Value::Null,
        Value::Null,
        Value::Int(is_attr_of),
        Value::Null,
    ]
}

fn bind_row(asm: i64, child: i64, parent: i64) -> Vec<Value> {
    vec![
        Value::Int(asm),
        Value::Null,
        Value::Int(child),
        Value::Int(parent),
        Value::Int(0),
        Value::Null,
        Value::Null,
    ]
}

fn relate_row(name: &str, from_cv: i64, to_cv: i64) -> Vec<Value> {
    vec![
        Value::Str(name.to_string()),
        Value::Int(from_cv),
        Value::Int(to_cv),
        Value::Int(0),
    ]
}

/// Builds the fixture's events: a `project` (id 10), a `dir` (id 20) bound
/// directly under it, and a `file` (id 30) bound under the `dir`.
pub fn build() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = ccm_store::Store::create(dir.path().join("store.sqlite3")).unwrap();
    let mut conn = store.connection().unwrap();

    let mut events: Vec<Result<Event, ccm_dump::Error>> = Vec::new();

    events.push(Ok(Event::TableStart(TableStart {
        name: "compver".to_string(),
    })));
    for record in [
        compver_row(BASE_ID, "working", "model", "base", "1", "base"),
        compver_row(PROJECT_ID, "integrate", "project", "myproj", "1", "mysys"),
        compver_row(DIR_ID, "integrate", "dir", "mydir", "1", "mysys"),
        compver_row(FILE_ID, "integrate", "file", "myfile.txt", "1", "mysys"),
        compver_row(FILE_V2_ID, "integrate", "file", "myfile.txt", "2", "mysys"),
        compver_row(FILE_V3_ID, "integrate", "file", "myfile.txt", "3", "mysys"),
    ] {
        events.push(Ok(Event::TableRecord(TableRecord {
            table: "compver".to_string(),
            record,
        })));
    }
    events.push(Ok(Event::TableEnd(TableEnd {
        name: "compver".to_string(),
        record_count: 6,
    })));

    events.push(Ok(Event::TableStart(TableStart {
        name: "attrib".to_string(),
    })));
    for record in [
        attrib_row(100, "delimiter", BASE_ID, None, Some(DELIM)),
        attrib_row(
            101,
            "status_log",
            PROJECT_ID,
            Some("Mon Jan 01 00:00:00 2020: Status set to 'integrate' by tester\n"),
            None,
        ),
        attrib_row(
            102,
            "status_log",
            DIR_ID,
            Some("Mon Feb 01 00:00:00 2020: Status set to 'integrate' by tester\n"),
            None,
        ),
        attrib_row(
            103,
            "status_log",
            FILE_ID,
            Some("Mon Mar 01 00:00:00 2020: Status set to 'integrate' by tester\n"),
            None,
        ),
        attrib_row(
            104,
            "source",
            FILE_ID,
            Some("ccm_rcs\n1.1\nmysys/file/myfile.txt/1.1,v"),
            None,
        ),
        attrib_row(
            105,
            "status_log",
            FILE_V2_ID,
            Some("Thu Jun 01 00:00:00 2020: Status set to 'integrate' by tester\n"),
            None,
        ),
        attrib_row(
            106,
            "status_log",
            FILE_V3_ID,
            Some("Sat Aug 01 00:00:00 2020: Status set to 'integrate' by tester\n"),
            None,
        ),
    ] {
        events.push(Ok(Event::TableRecord(TableRecord {
            table: "attrib".to_string(),
            record,
        })));
    }
    events.push(Ok(Event::TableEnd(TableEnd {
        name: "attrib".to_string(),
        record_count: 7,
    })));

    events.push(Ok(Event::TableStart(TableStart {
        name: "bind".to_string(),
    })));
    for record in [
        bind_row(PROJECT_ID, DIR_ID, PROJECT_ID),
        bind_row(PROJECT_ID, FILE_ID, DIR_ID),
    ] {
        events.push(Ok(Event::TableRecord(TableRecord {
            table: "bind".to_string(),
            record,
        })));
    }
    events.push(Ok(Event::TableEnd(TableEnd {
        name: "bind".to_string(),
        record_count: 2,
    })));

    events.push(Ok(Event::TableStart(TableStart {
        name: "relate".to_string(),
    })));
    for record in [
        relate_row("successor", FILE_ID, FILE_V2_ID),
        relate_row("successor", FILE_V2_ID, FILE_V3_ID),
    ] {
        events.push(Ok(Event::TableRecord(TableRecord {
            table: "relate".to_string(),
            record,
        })));
    }
    events.push(Ok(Event::TableEnd(TableEnd {
        name: "relate".to_string(),
        record_count: 2,
    })));

    conn.ingest(events).unwrap();

    let ctx = LookupContext::open(conn, dir.path());
    Fixture { _dir: dir, ctx }
}
