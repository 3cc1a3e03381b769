//! Line splitting over a latin-1-encoded byte stream, transparently
//! decompressing `.Z`/`.z`-suffixed inputs.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::Error;

pub(crate) struct LineReader<R> {
    inner: BufReader<R>,
    lineno: u64,
}

impl<R: Read> LineReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        LineReader {
            inner: BufReader::new(inner),
            lineno: 0,
        }
    }

    pub(crate) fn lineno(&self) -> u64 {
        self.lineno
    }

    /// Reads one logical line, decoding each byte as its latin-1 code
    /// point. Returns `None` at end of input.
    pub(crate) fn read_line(&mut self) -> Result<Option<String>, Error> {
        let mut buf = Vec::new();
        let n = self.inner.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.lineno += 1;

        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }

        Ok(Some(buf.into_iter().map(|b| b as char).collect()))
    }
}

/// Opens a dump file, transparently decompressing it if its extension
/// marks it as gzip-compressed (`.Z` or `.z`).
pub(crate) fn open_dump(path: &Path) -> Result<LineReader<Box<dyn Read>>, Error> {
    let file = File::open(path)?;
    let compressed = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("z") | Some("Z")
    );

    let inner: Box<dyn Read> = if compressed {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    Ok(LineReader::new(inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    #[test]
    fn splits_on_newline_and_strips_crlf() {
        let mut reader = LineReader::new(Cursor::new(b"one\r\ntwo\nthree".to_vec()));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("one"));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("two"));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("three"));
        assert_eq!(reader.read_line().unwrap(), None);
    }

    #[test]
    fn decodes_high_bytes_as_latin1_code_points() {
        let mut reader = LineReader::new(Cursor::new(vec![0xE9, b'\n']));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("\u{00E9}"));
    }

    #[test]
    fn gzip_stream_decompresses_transparently() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello\nworld\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut reader = LineReader::new(GzDecoder::new(Cursor::new(compressed)));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("hello"));
        assert_eq!(reader.read_line().unwrap().as_deref(), Some("world"));
    }
}
