//! Fetching a file revision's contents: either from the `ccm_delta` XDELTA
//! archive tree, or by shelling out to `rcs co -p<version>` for anything
//! recorded as `ccm_rcs` (spec.md §4.8, `File::data`).
//!
//! Grounded on `CcmFile.data`, and on the exit-status/signal error mapping
//! in the teacher's own external-process wrapper, adapted from async to a
//! synchronous call since there is exactly one subprocess per lookup
//! rather than a long-lived pipe.

use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::Error;
use crate::object::Object;

/// Abstracts the `rcs` invocation so tests can substitute a fake without
/// touching the filesystem or spawning a process.
pub trait ExternalRcs {
    fn checkout(&self, path: &Path, version: &str) -> Result<Vec<u8>, Error>;
}

/// The real `rcs co -p<version> <path>` implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRcs;

impl ExternalRcs for SystemRcs {
    fn checkout(&self, path: &Path, version: &str) -> Result<Vec<u8>, Error> {
        let arg = format!("-p{version}");
        let output = Command::new("rcs")
            .arg("co")
            .arg(&arg)
            .arg(path)
            .output()?;

        if output.status.success() {
            return Ok(output.stdout);
        }

        if let Some(signal) = output.status.signal() {
            log::error!("rcs co for {} exited due to signal {}", path.display(), signal);
        }

        Err(Error::ExternalTool {
            object: path.display().to_string(),
            command: format!("rcs co {} {}", arg, path.display()),
            status: output.status,
        })
    }
}

/// The parsed form of a `file`/`dir` object's `source` attribute: three
/// newline-separated fields naming how and where to find its data.
struct Source {
    kind: String,
    version: String,
    archive_path: PathBuf,
}

fn parse_source(text: &str) -> Option<Source> {
    let mut lines = text.splitn(3, '\n');
    let kind = lines.next()?.to_string();
    let version = lines.next()?.to_string();
    let archive_path = PathBuf::from(lines.next()?);
    Some(Source {
        kind,
        version,
        archive_path,
    })
}

/// Reads `object`'s content, dispatching on its `source` attribute's kind:
/// `ccm_delta` is read from the XDELTA archive under `st_root`, anything
/// else is checked out of the RCS file it names via `rcs`.
pub fn data(object: &Object<'_>, rcs: &dyn ExternalRcs) -> Result<Vec<u8>, Error> {
    let text = object
        .attribute("source")?
        .and_then(|value| value.as_str().map(str::to_string))
        .ok_or_else(|| Error::MissingAttribute {
            attribute: "source".to_string(),
        })?;

    let source = parse_source(&text).ok_or_else(|| Error::MissingAttribute {
        attribute: "source".to_string(),
    })?;

    let path = object
        .backup_root()
        .join("st_root")
        .join(&source.archive_path);

    if !path.exists() {
        return Err(Error::ArchiveNotFound {
            object: object.full_name().unwrap_or_default(),
            path,
        });
    }

    match source.kind.as_str() {
        "ccm_delta" => {
            let file = std::fs::File::open(&path)?;
            let mut reader = ccm_archive::CcmArchiveReader::new(file)?;
            Ok(reader.extract(&source.version)?)
        }
        "ccm_rcs" => rcs.checkout(&path, &source.version),
        other => Err(Error::UnknownSourceKind(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_line_source() {
        let source = parse_source("ccm_delta\n3\nfoo/bar.ext").unwrap();
        assert_eq!(source.kind, "ccm_delta");
        assert_eq!(source.version, "3");
        assert_eq!(source.archive_path, PathBuf::from("foo/bar.ext"));
    }

    #[test]
    fn rejects_short_source() {
        assert!(parse_source("ccm_delta\n3").is_none());
    }

    struct FakeRcs(Vec<u8>);
    impl ExternalRcs for FakeRcs {
        fn checkout(&self, _path: &Path, _version: &str) -> Result<Vec<u8>, Error> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn fake_rcs_returns_fixed_content() {
        let rcs = FakeRcs(b"hello".to_vec());
        assert_eq!(rcs.checkout(Path::new("/tmp/x,v"), "1.1").unwrap(), b"hello");
    }
}
