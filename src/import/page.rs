//! MediaWiki export records and the streaming XML decoder shared by all readers

use super::source::ImportError;
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// A namespace declared in the dump header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub key: i32,
    pub case: String,
    pub name: String,
}

/// The top-level site info describing basic dump properties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub site_name: String,
    pub db_name: String,
    pub base: String,
    pub generator: String,
    pub case: String,
    pub namespaces: Vec<Namespace>,
}

impl SiteInfo {
    /// Look up a namespace name by key
    pub fn namespace_name(&self, key: i32) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|ns| ns.key == key)
            .map(|ns| ns.name.as_str())
    }
}

/// A user who contributed a revision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub id: u64,
    pub username: String,
    /// Set instead of id/username for anonymous edits
    pub ip: Option<String>,
}

/// A revision to a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: u64,
    pub parent_id: Option<u64>,
    pub timestamp: String,
    pub contributor: Contributor,
    pub minor: bool,
    pub comment: String,
    pub model: String,
    pub format: String,
    pub text: String,
    pub sha1: String,
}

impl Revision {
    /// Parse the revision timestamp
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// A wiki page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub title: String,
    pub id: u64,
    pub namespace: u64,
    /// Redirect target, if the page is a redirect
    pub redirect: Option<String>,
    pub revisions: Vec<Revision>,
}

impl Page {
    /// The newest revision in the export (dumps list them oldest first)
    pub fn latest_revision(&self) -> Option<&Revision> {
        self.revisions.last()
    }

    /// Text of the first revision, or empty if the page has none
    pub fn text(&self) -> &str {
        self.revisions
            .first()
            .map(|r| r.text.as_str())
            .unwrap_or_default()
    }
}

/// Pull decoder for `<page>` elements
///
/// The decoder does not require a well-formed document: a multistream
/// segment is just a run of `<page>` elements, so unmatched end tags are
/// tolerated and anything outside a page is skipped.
pub struct PageDecoder<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl<R: BufRead> PageDecoder<R> {
    /// Create a decoder over an XML byte stream
    pub fn new(reader: R) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().check_end_names = false;
        reader.config_mut().allow_unmatched_ends = true;
        Self {
            reader,
            buf: Vec::with_capacity(8192),
        }
    }

    /// Read the `<mediawiki>` opening tag and the `<siteinfo>` block that follows it
    pub fn read_site_info(&mut self) -> Result<SiteInfo, ImportError> {
        self.expect_start("mediawiki")?;
        self.expect_start("siteinfo")?;

        let mut site = SiteInfo::default();
        let mut path: Vec<String> = vec!["siteinfo".to_string()];
        let mut text = String::new();
        let mut pending_ns: Option<Namespace> = None;

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(ref e) => {
                    let name = element_name(e);
                    if name == "namespace" {
                        pending_ns = Some(namespace_from(e)?);
                    }
                    path.push(name);
                    text.clear();
                }
                Event::Empty(ref e) => {
                    if element_name(e) == "namespace" {
                        site.namespaces.push(namespace_from(e)?);
                    }
                }
                Event::Text(ref e) => text.push_str(&e.unescape()?),
                Event::CData(ref e) => text.push_str(&String::from_utf8_lossy(e)),
                Event::End(_) => {
                    let name = path.pop().unwrap_or_default();
                    if path.is_empty() {
                        return Ok(site);
                    }
                    match name.as_str() {
                        "sitename" => site.site_name = text.trim().to_string(),
                        "dbname" => site.db_name = text.trim().to_string(),
                        "base" => site.base = text.trim().to_string(),
                        "generator" => site.generator = text.trim().to_string(),
                        "case" => site.case = text.trim().to_string(),
                        "namespace" => {
                            if let Some(mut ns) = pending_ns.take() {
                                ns.name = text.clone();
                                site.namespaces.push(ns);
                            }
                        }
                        _ => {}
                    }
                    text.clear();
                }
                Event::Eof => {
                    return Err(ImportError::InvalidFormat(
                        "unexpected end of input inside <siteinfo>".into(),
                    ))
                }
                _ => {}
            }
        }
    }

    /// Decode the next `<page>`, or `None` when the input ends first
    pub fn next_page(&mut self) -> Result<Option<Page>, ImportError> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(ref e) if e.local_name().as_ref() == b"page" => break,
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
        self.read_page_body().map(Some)
    }

    fn read_page_body(&mut self) -> Result<Page, ImportError> {
        let mut page = Page::default();
        let mut path: Vec<String> = vec!["page".to_string()];
        let mut text = String::new();

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(ref e) => {
                    let name = element_name(e);
                    match name.as_str() {
                        "revision" => page.revisions.push(Revision::default()),
                        "redirect" => page.redirect = Some(attribute(e, "title")?.unwrap_or_default()),
                        _ => {}
                    }
                    path.push(name);
                    text.clear();
                }
                Event::Empty(ref e) => match element_name(e).as_str() {
                    "redirect" => page.redirect = Some(attribute(e, "title")?.unwrap_or_default()),
                    "minor" => {
                        if let Some(rev) = page.revisions.last_mut() {
                            rev.minor = true;
                        }
                    }
                    _ => {}
                },
                Event::Text(ref e) => text.push_str(&e.unescape()?),
                Event::CData(ref e) => text.push_str(&String::from_utf8_lossy(e)),
                Event::End(_) => {
                    let name = path.pop().unwrap_or_default();
                    let Some(parent) = path.last() else {
                        return Ok(page);
                    };
                    assign_field(&mut page, parent, &name, &text)?;
                    text.clear();
                }
                Event::Eof => {
                    return Err(ImportError::InvalidRecord(format!(
                        "input ended inside page {:?}",
                        page.title
                    )))
                }
                _ => {}
            }
        }
    }

    /// Skip prolog noise and require the next element to be `name`
    fn expect_start(&mut self, name: &str) -> Result<(), ImportError> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(ref e) => {
                    let found = element_name(e);
                    if found == name {
                        return Ok(());
                    }
                    return Err(ImportError::InvalidFormat(format!(
                        "expected <{}>, found <{}>",
                        name, found
                    )));
                }
                Event::Text(ref e) if e.iter().all(u8::is_ascii_whitespace) => {}
                Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
                Event::Eof => {
                    return Err(ImportError::InvalidFormat(format!(
                        "unexpected end of input before <{}>",
                        name
                    )))
                }
                other => {
                    return Err(ImportError::InvalidFormat(format!(
                        "expected <{}>, found {:?}",
                        name, other
                    )))
                }
            }
        }
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, ImportError> {
    match e.try_get_attribute(key)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn namespace_from(e: &BytesStart<'_>) -> Result<Namespace, ImportError> {
    let key = attribute(e, "key")?.unwrap_or_default();
    let key = key
        .parse()
        .map_err(|_| ImportError::XmlParse(format!("invalid namespace key {:?}", key)))?;
    Ok(Namespace {
        key,
        case: attribute(e, "case")?.unwrap_or_default(),
        name: String::new(),
    })
}

fn parse_number(field: &str, value: &str) -> Result<u64, ImportError> {
    value
        .trim()
        .parse()
        .map_err(|_| ImportError::InvalidRecord(format!("invalid <{}> value {:?}", field, value)))
}

/// Store the text of a closed element, keyed by its enclosing element
fn assign_field(page: &mut Page, parent: &str, name: &str, text: &str) -> Result<(), ImportError> {
    match parent {
        "page" => match name {
            "title" => page.title = text.to_string(),
            "id" => page.id = parse_number(name, text)?,
            "ns" => page.namespace = parse_number(name, text)?,
            _ => {}
        },
        "revision" => {
            let Some(rev) = page.revisions.last_mut() else {
                return Ok(());
            };
            match name {
                "id" => rev.id = parse_number(name, text)?,
                "parentid" => rev.parent_id = Some(parse_number(name, text)?),
                "timestamp" => rev.timestamp = text.trim().to_string(),
                "comment" => rev.comment = text.to_string(),
                "model" => rev.model = text.trim().to_string(),
                "format" => rev.format = text.trim().to_string(),
                "text" => rev.text = text.to_string(),
                "sha1" => rev.sha1 = text.trim().to_string(),
                _ => {}
            }
        }
        "contributor" => {
            let Some(rev) = page.revisions.last_mut() else {
                return Ok(());
            };
            match name {
                "id" => rev.contributor.id = parse_number(name, text)?,
                "username" => rev.contributor.username = text.to_string(),
                "ip" => rev.contributor.ip = Some(text.trim().to_string()),
                _ => {}
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = r#"<mediawiki xmlns="http://www.mediawiki.org/xml/export-0.10/" version="0.10" xml:lang="en">
  <siteinfo>
    <sitename>Wikipedia</sitename>
    <dbname>enwiki</dbname>
    <base>https://en.wikipedia.org/wiki/Main_Page</base>
    <generator>MediaWiki 1.41.0-wmf.1</generator>
    <case>first-letter</case>
    <namespaces>
      <namespace key="-2" case="first-letter">Media</namespace>
      <namespace key="0" case="first-letter" />
      <namespace key="1" case="first-letter">Talk</namespace>
    </namespaces>
  </siteinfo>
"#;

    const PAGES: &str = r#"  <page>
    <title>AccessibleComputing</title>
    <ns>0</ns>
    <id>10</id>
    <redirect title="Computer accessibility" />
    <revision>
      <id>1002250816</id>
      <parentid>854851586</parentid>
      <timestamp>2021-01-23T15:15:01Z</timestamp>
      <contributor>
        <username>Elli</username>
        <id>20842734</id>
      </contributor>
      <minor />
      <comment>shel</comment>
      <model>wikitext</model>
      <format>text/x-wiki</format>
      <text bytes="111" xml:space="preserve">#REDIRECT [[Computer accessibility]] &amp; more</text>
      <sha1>kmysdltgexdwkv2xsml3j44jb56dxvn</sha1>
    </revision>
  </page>
  <page>
    <title>Talk:Anarchism</title>
    <ns>1</ns>
    <id>12</id>
    <revision>
      <id>200</id>
      <timestamp>2024-01-15T10:30:00Z</timestamp>
      <contributor>
        <ip>192.0.2.7</ip>
      </contributor>
      <text><![CDATA[Some <b>raw</b> text]]></text>
    </revision>
  </page>
"#;

    fn full_document() -> String {
        format!("<?xml version=\"1.0\"?>\n{}{}</mediawiki>\n", HEADER, PAGES)
    }

    #[test]
    fn test_reads_site_info() {
        let mut decoder = PageDecoder::new(Cursor::new(full_document()));
        let site = decoder.read_site_info().unwrap();

        assert_eq!(site.site_name, "Wikipedia");
        assert_eq!(site.db_name, "enwiki");
        assert_eq!(site.case, "first-letter");
        assert_eq!(site.namespaces.len(), 3);
        assert_eq!(site.namespace_name(-2), Some("Media"));
        assert_eq!(site.namespace_name(0), Some(""));
        assert_eq!(site.namespace_name(1), Some("Talk"));
    }

    #[test]
    fn test_decodes_pages() {
        let mut decoder = PageDecoder::new(Cursor::new(full_document()));
        decoder.read_site_info().unwrap();

        let first = decoder.next_page().unwrap().unwrap();
        assert_eq!(first.title, "AccessibleComputing");
        assert_eq!(first.id, 10);
        assert_eq!(first.namespace, 0);
        assert_eq!(first.redirect.as_deref(), Some("Computer accessibility"));
        assert_eq!(first.revisions.len(), 1);

        let rev = &first.revisions[0];
        assert_eq!(rev.id, 1002250816);
        assert_eq!(rev.parent_id, Some(854851586));
        assert_eq!(rev.contributor.username, "Elli");
        assert_eq!(rev.contributor.id, 20842734);
        assert!(rev.minor);
        assert_eq!(rev.text, "#REDIRECT [[Computer accessibility]] & more");
        assert_eq!(rev.model, "wikitext");
        assert!(rev.modified().is_some());

        let second = decoder.next_page().unwrap().unwrap();
        assert_eq!(second.title, "Talk:Anarchism");
        assert_eq!(second.namespace, 1);
        assert_eq!(second.redirect, None);
        assert_eq!(second.text(), "Some <b>raw</b> text");
        assert_eq!(second.revisions[0].contributor.ip.as_deref(), Some("192.0.2.7"));
        assert!(!second.revisions[0].minor);

        assert!(decoder.next_page().unwrap().is_none());
    }

    #[test]
    fn test_decodes_bare_segment() {
        // A multistream segment has no header and no enclosing root element
        let segment = format!("{}</mediawiki>", PAGES);
        let mut decoder = PageDecoder::new(Cursor::new(segment));

        assert_eq!(decoder.next_page().unwrap().unwrap().id, 10);
        assert_eq!(decoder.next_page().unwrap().unwrap().id, 12);
        assert!(decoder.next_page().unwrap().is_none());
    }

    #[test]
    fn test_truncated_page_is_an_error() {
        let truncated = &PAGES[..PAGES.find("<contributor>").unwrap()];
        let mut decoder = PageDecoder::new(Cursor::new(truncated.to_string()));
        assert!(decoder.next_page().is_err());
    }

    #[test]
    fn test_bad_numeric_field_is_an_error() {
        let xml = "<page><title>X</title><id>ten</id></page>";
        let mut decoder = PageDecoder::new(Cursor::new(xml));
        assert!(matches!(
            decoder.next_page(),
            Err(ImportError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_site_info_requires_mediawiki_root() {
        let mut decoder = PageDecoder::new(Cursor::new("<page><title>X</title></page>"));
        assert!(matches!(
            decoder.read_site_info(),
            Err(ImportError::InvalidFormat(_))
        ));

        let mut decoder = PageDecoder::new(Cursor::new(""));
        assert!(decoder.read_site_info().is_err());

        let cut = &HEADER[..HEADER.find("<generator>").unwrap()];
        let mut decoder = PageDecoder::new(Cursor::new(cut.to_string()));
        assert!(decoder.read_site_info().is_err());
    }
}
