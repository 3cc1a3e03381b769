//! Reads a single backed-up file's revision history out of its per-file
//! archive: a zip of opaque data members described by an XML manifest at
//! `META-INF/ARCHIVE-HEADER`.
//!
//! Each entry is either a head (no predecessor, its data member is a full
//! blob) or a delta (its data member is an XDELTA patch against its
//! predecessor). `extract` walks the predecessor chain from the requested
//! revision back to its head, then folds the patches forward to reconstruct
//! the requested bytes.

mod manifest;

use std::io::{Cursor, Read, Seek};

use log::debug;
use thiserror::Error;
use zip::ZipArchive;

pub use manifest::Entry;

const MANIFEST_PATH: &str = "META-INF/ARCHIVE-HEADER";
const XDELTA_FORMAT: &str = "XDELTA";

#[derive(Debug, Error)]
pub enum Error {
    #[error("manifest is malformed: {0}")]
    MalformedManifest(&'static str),

    #[error("revision not found: {0}")]
    EntryNotFound(String),

    #[error("unknown delta format: {0}")]
    UnknownDeltaFormat(String),

    #[error("predecessor chain does not resolve at: {0}")]
    BrokenPredecessorChain(String),

    #[error(transparent)]
    Xdelta(#[from] ccm_xdelta::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct CcmArchiveReader<R: Read + Seek> {
    zip: ZipArchive<R>,
    entries: Vec<Entry>,
}

impl<R: Read + Seek> CcmArchiveReader<R> {
    pub fn new(source: R) -> Result<Self, Error> {
        let mut zip = ZipArchive::new(source)?;
        let manifest_xml = read_member(&mut zip, MANIFEST_PATH)?;
        let entries = manifest::parse(&manifest_xml)?;
        Ok(CcmArchiveReader { zip, entries })
    }

    /// Reconstructs the bytes of `revision` by walking its predecessor chain
    /// back to a head entry, then applying patches forward.
    pub fn extract(&mut self, revision: &str) -> Result<Vec<u8>, Error> {
        let chain = self.predecessor_chain(revision)?;
        let (head, patches) = chain.split_first().expect("chain is never empty");

        let mut data = read_member(&mut self.zip, &head.full_name)?;
        debug!("head entry {} is {} bytes", head.full_name, data.len());

        for entry in patches {
            let delta_format = entry
                .delta_format
                .as_deref()
                .ok_or(Error::UnknownDeltaFormat(entry.full_name.clone()))?;
            if delta_format != XDELTA_FORMAT {
                return Err(Error::UnknownDeltaFormat(delta_format.to_string()));
            }

            let patch = read_member(&mut self.zip, &entry.full_name)?;
            let mut source = Cursor::new(data);
            let mut target = Vec::new();
            ccm_xdelta::apply(&mut source, &mut Cursor::new(patch), &mut target)?;
            data = target;
        }

        Ok(data)
    }

    /// Entries from head to `revision`, inclusive, in application order.
    ///
    /// The original reader walks forward from the head, at each step
    /// searching for the entry whose `predecessor` names the current
    /// entry's `fullName`. Since a `fullName` has at most one entry naming
    /// it as predecessor, that forward search and this backward walk visit
    /// the same chain; materialising it backward and reversing lets each
    /// lookup be a single indexed hop instead of a linear manifest scan.
    fn predecessor_chain(&self, revision: &str) -> Result<Vec<Entry>, Error> {
        let mut by_full_name = std::collections::HashMap::new();
        for entry in &self.entries {
            by_full_name.insert(entry.full_name.as_str(), entry);
        }

        let target = by_full_name
            .get(revision)
            .ok_or_else(|| Error::EntryNotFound(revision.to_string()))?;

        let mut chain = vec![(*target).clone()];
        let mut current = *target;
        let mut seen = std::collections::HashSet::new();
        seen.insert(current.full_name.as_str());

        while let Some(predecessor) = current.predecessor.as_deref() {
            let entry = by_full_name
                .get(predecessor)
                .ok_or_else(|| Error::BrokenPredecessorChain(predecessor.to_string()))?;
            if !seen.insert(entry.full_name.as_str()) {
                return Err(Error::BrokenPredecessorChain(predecessor.to_string()));
            }
            chain.push((*entry).clone());
            current = entry;
        }

        chain.reverse();
        Ok(chain)
    }
}

fn read_member<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>, Error> {
    let mut file = zip.by_name(name)?;
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_archive(manifest_xml: &str, members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut buf);
            let options = FileOptions::default();
            writer.start_file(MANIFEST_PATH, options).unwrap();
            writer.write_all(manifest_xml.as_bytes()).unwrap();
            for (name, data) in members {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn extracts_head_only_revision() {
        let xml = r#"<archive><entry><fullName>obj/1</fullName></entry></archive>"#;
        let archive = build_archive(xml, &[("obj/1", b"hello world")]);
        let mut reader = CcmArchiveReader::new(Cursor::new(archive)).unwrap();
        assert_eq!(reader.extract("obj/1").unwrap(), b"hello world");
    }

    #[test]
    fn applies_single_delta_from_head() {
        // head is 8 'A's, delta is a copy-of-first-4 + insert "BBBB".
        let head_data = vec![b'A'; 8];
        let patch = [0x80 | 4u8, 0x00, 4u8, b'B', b'B', b'B', b'B'];

        let xml = r#"<archive>
            <entry><fullName>obj/1</fullName></entry>
            <entry><fullName>obj/2</fullName><predecessor>obj/1</predecessor><deltaFormat>XDELTA</deltaFormat></entry>
        </archive>"#;
        let archive = build_archive(xml, &[("obj/1", &head_data), ("obj/2", &patch)]);

        let mut reader = CcmArchiveReader::new(Cursor::new(archive)).unwrap();
        assert_eq!(reader.extract("obj/2").unwrap(), b"AAAABBBB");
    }

    #[test]
    fn unknown_revision_is_an_error() {
        let xml = r#"<archive><entry><fullName>obj/1</fullName></entry></archive>"#;
        let archive = build_archive(xml, &[("obj/1", b"x")]);
        let mut reader = CcmArchiveReader::new(Cursor::new(archive)).unwrap();
        assert!(matches!(
            reader.extract("obj/missing"),
            Err(Error::EntryNotFound(_))
        ));
    }

    #[test]
    fn unresolved_predecessor_is_an_error() {
        let xml = r#"<archive>
            <entry><fullName>obj/2</fullName><predecessor>obj/ghost</predecessor><deltaFormat>XDELTA</deltaFormat></entry>
        </archive>"#;
        let archive = build_archive(xml, &[("obj/2", b"patch")]);
        let mut reader = CcmArchiveReader::new(Cursor::new(archive)).unwrap();
        assert!(matches!(
            reader.extract("obj/2"),
            Err(Error::BrokenPredecessorChain(_))
        ));
    }

    #[test]
    fn unknown_delta_format_is_an_error() {
        let xml = r#"<archive>
            <entry><fullName>obj/1</fullName></entry>
            <entry><fullName>obj/2</fullName><predecessor>obj/1</predecessor><deltaFormat>ZDELTA</deltaFormat></entry>
        </archive>"#;
        let archive = build_archive(xml, &[("obj/1", b"base"), ("obj/2", b"patch")]);
        let mut reader = CcmArchiveReader::new(Cursor::new(archive)).unwrap();
        assert!(matches!(
            reader.extract("obj/2"),
            Err(Error::UnknownDeltaFormat(_))
        ));
    }
}
