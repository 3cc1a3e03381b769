//! Parses the `META-INF/ARCHIVE-HEADER` manifest: a flat list of `entry`
//! elements, each a bag of same-depth child elements (`fullName`,
//! `predecessor`, `deltaFormat`, and others this reader doesn't care about).

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::Error;

#[derive(Debug, Clone)]
pub struct Entry {
    pub full_name: String,
    pub predecessor: Option<String>,
    pub delta_format: Option<String>,
}

pub fn parse(xml: &[u8]) -> Result<Vec<Entry>, Error> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut depth = 0u32;
    let mut fields: Option<HashMap<String, String>> = None;
    let mut current_tag: Option<String> = None;
    let mut entry_depth = 0u32;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                depth += 1;
                if name == "entry" {
                    fields = Some(HashMap::new());
                    entry_depth = depth;
                } else if fields.is_some() && depth == entry_depth + 1 {
                    current_tag = Some(name);
                }
            }
            Event::Text(t) => {
                if let (Some(fields), Some(tag)) = (fields.as_mut(), current_tag.as_ref()) {
                    let text = t.unescape()?.into_owned();
                    fields.insert(tag.clone(), text);
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "entry" && fields.is_some() {
                    let f = fields.take().unwrap();
                    let full_name = f
                        .get("fullName")
                        .cloned()
                        .ok_or(Error::MalformedManifest("entry missing fullName"))?;
                    entries.push(Entry {
                        full_name,
                        predecessor: f.get("predecessor").cloned(),
                        delta_format: f.get("deltaFormat").cloned(),
                    });
                }
                if depth == entry_depth + 1 {
                    current_tag = None;
                }
                depth -= 1;
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_head_and_delta_entries() {
        let xml = br#"<?xml version="1.0"?>
        <archive>
          <entry>
            <fullName>obj/1</fullName>
            <size>1024</size>
          </entry>
          <entry>
            <fullName>obj/2</fullName>
            <predecessor>obj/1</predecessor>
            <deltaFormat>XDELTA</deltaFormat>
          </entry>
        </archive>"#;

        let entries = parse(xml).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].full_name, "obj/1");
        assert!(entries[0].predecessor.is_none());
        assert_eq!(entries[1].predecessor.as_deref(), Some("obj/1"));
        assert_eq!(entries[1].delta_format.as_deref(), Some("XDELTA"));
    }

    #[test]
    fn missing_full_name_is_malformed() {
        let xml = br#"<archive><entry><predecessor>x</predecessor></entry></archive>"#;
        assert!(matches!(parse(xml), Err(Error::MalformedManifest(_))));
    }
}
