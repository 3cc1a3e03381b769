//! Event-driven parser for the legacy backup dump format: a line-oriented
//! stream of scalar cells grouped into sections and tables.
//!
//! The parser is exposed as an iterator of [`Event`]s rather than the
//! callback registry the format was originally read with; each event still
//! carries the same data the original callbacks received.

mod cell;
mod error;
mod reader;

use std::io::Read;
use std::path::Path;

pub use error::Error;

use reader::LineReader;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub items: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableStart {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRecord {
    pub table: String,
    pub record: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableEnd {
    pub name: String,
    pub record_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Version(String),
    Platform(String),
    SchemaVersion(String),
    Section(Section),
    TableStart(TableStart),
    TableRecord(TableRecord),
    TableEnd(TableEnd),
}

enum State {
    TopLevel,
    InTable { name: String, count: u64 },
    Done,
}

pub struct DumpParser<R> {
    reader: LineReader<R>,
    state: State,
}

impl DumpParser<Box<dyn Read>> {
    /// Opens a dump file on disk, transparently decompressing `.Z`/`.z`
    /// inputs.
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(DumpParser {
            reader: reader::open_dump(path)?,
            state: State::TopLevel,
        })
    }
}

impl<R: Read> DumpParser<R> {
    pub fn new(source: R) -> Self {
        DumpParser {
            reader: LineReader::new(source),
            state: State::TopLevel,
        }
    }

    fn next_line(&mut self) -> Result<String, Error> {
        self.reader
            .read_line()?
            .ok_or(Error::UnexpectedEof { line: self.reader.lineno() })
    }

    fn dispatch_top_level(&mut self, line: &str) -> Result<Event, Error> {
        let instruction = line.split(' ').next().unwrap_or("");
        match instruction {
            "version" => Ok(Event::Version(second_token(line))),
            "platform" => Ok(Event::Platform(second_token(line))),
            "schemaversion" => Ok(Event::SchemaVersion(second_token(line))),
            "Section" => self.parse_section(line).map(Event::Section),
            "table" => {
                let name = second_token(line);
                self.state = State::InTable {
                    name: name.clone(),
                    count: 0,
                };
                Ok(Event::TableStart(TableStart { name }))
            }
            other => Err(Error::UnknownInstruction {
                line: self.reader.lineno(),
                instruction: other.to_string(),
            }),
        }
    }

    fn dispatch_table_line(&mut self, name: String, count: u64) -> Result<Event, Error> {
        let line = self.next_line()?;

        if line == "rs" {
            let record = self.parse_record()?;
            self.state = State::InTable {
                name: name.clone(),
                count: count + 1,
            };
            Ok(Event::TableRecord(TableRecord { table: name, record }))
        } else if let Some(rest) = line.strip_prefix("tblend ") {
            let (end_name, end_count) = parse_tblend(rest);
            if end_name != name {
                return Err(Error::TableNameMismatch {
                    line: self.reader.lineno(),
                    expected: name,
                    actual: end_name,
                });
            }
            if end_count != count {
                return Err(Error::TableCountMismatch {
                    line: self.reader.lineno(),
                    expected: count,
                    actual: end_count,
                });
            }
            self.state = State::TopLevel;
            Ok(Event::TableEnd(TableEnd {
                name,
                record_count: count,
            }))
        } else {
            Err(Error::UnexpectedTableLine {
                line: self.reader.lineno(),
                found: line,
            })
        }
    }

    fn parse_section(&mut self, header_line: &str) -> Result<Section, Error> {
        let items_in_header: Vec<&str> = header_line.split(' ').collect();
        let name = items_in_header
            .get(2..)
            .map(|rest| rest.iter().take(2).copied().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();

        let mut items = Vec::new();
        loop {
            let line = self.next_line()?;
            if line == "Section END" {
                break;
            }
            items.push(self.parse_value(&line)?);
        }

        Ok(Section { name, items })
    }

    fn parse_record(&mut self) -> Result<Vec<Value>, Error> {
        let mut record = Vec::new();
        loop {
            let line = self.next_line()?;
            if line == "re" {
                break;
            }
            record.push(self.parse_value(&line)?);
        }
        Ok(record)
    }

    fn parse_value(&mut self, line: &str) -> Result<Value, Error> {
        match cell::header(line) {
            Ok((_, cell::Header::Str(s))) => Ok(Value::Str(s.to_string())),
            Ok((_, cell::Header::Int(n))) => Ok(Value::Int(n)),
            Ok((_, cell::Header::Float(f))) => Ok(Value::Float(f)),
            Ok((_, cell::Header::Text(count))) => self.parse_text(count).map(Value::Str),
            Ok((_, cell::Header::NullStr))
            | Ok((_, cell::Header::NullInt))
            | Ok((_, cell::Header::NullText))
            | Ok((_, cell::Header::NullBinary))
            | Ok((_, cell::Header::NullFloat)) => Ok(Value::Null),
            Err(_) => Err(Error::UnknownCellPrefix {
                line: self.reader.lineno(),
                prefix: line.to_string(),
            }),
        }
    }

    /// Reads a `tx`/`te`-delimited text body of declared latin-1 byte
    /// length `count`, then peels its leading type tag and unescapes it.
    fn parse_text(&mut self, count: usize) -> Result<String, Error> {
        let mut text = String::new();
        loop {
            let line = self.next_line()?;
            let line = line.replace("\\\\", "\\");
            text.push_str(&line);
            if latin1_len(&text) >= count {
                break;
            }
        }

        let line = self.next_line()?;
        if line != "te" {
            return Err(Error::MissingTextEnd {
                line: self.reader.lineno(),
                found: line,
            });
        }

        Ok(unescape_tagged_text(&text)?)
    }
}

impl<R: Read> Iterator for DumpParser<R> {
    type Item = Result<Event, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Done => None,
            State::TopLevel => {
                let line = match self.reader.read_line() {
                    Ok(Some(line)) => line,
                    Ok(None) => return None,
                    Err(e) => return Some(Err(e)),
                };
                self.state = State::TopLevel;
                Some(self.dispatch_top_level(&line))
            }
            State::InTable { name, count } => Some(self.dispatch_table_line(name, count)),
        }
    }
}

fn second_token(line: &str) -> String {
    line.split(' ').nth(1).unwrap_or("").to_string()
}

fn parse_tblend(rest: &str) -> (String, u64) {
    let mut parts = rest.splitn(2, ' ');
    let name = parts.next().unwrap_or("").to_string();
    let count = parts
        .next()
        .map(|s| s.trim_start_matches('(').trim_end_matches(')'))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    (name, count)
}

fn latin1_len(s: &str) -> usize {
    s.chars().count()
}

fn unescape_tagged_text(text: &str) -> Result<String, ccm_escape::Error> {
    if let Some(rest) = text
        .strip_prefix("oa")
        .or_else(|| text.strip_prefix("ob"))
        .or_else(|| text.strip_prefix("oj"))
    {
        return Ok(rest.to_string());
    }

    if let Ok((rest, _)) = cell::ol_header(text) {
        return ccm_escape::unescape_ol(rest);
    }

    Ok(ccm_escape::unescape_default(text))
}
