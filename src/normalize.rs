use std::sync::LazyLock;

use eyre::{Result, bail};
use log::debug;
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;

use crate::Segment;

/// Duration assumed when a caption carries no `dur` attribute
pub const DEFAULT_DURATION: f64 = 2.0;

static LENIENT_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<text start="([\d.]+)"(?: dur="([\d.]+)")?[^>]*>([^<]*)</text>"#).expect("valid regex")
});

/// A caption record before cleaning
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    pub text: String,
    pub start: f64,
    pub duration: Option<f64>,
}

impl From<Segment> for RawSegment {
    fn from(s: Segment) -> Self {
        Self {
            text: s.text,
            start: s.start,
            duration: Some(s.duration),
        }
    }
}

/// Parse timed-text XML and clean the result
pub fn segments_from_xml(xml: &str) -> Vec<Segment> {
    normalize(parse_timed_text(xml))
}

/// Parse timed-text XML into raw records.
///
/// Malformed markup falls back to a regex scan of the raw body.
pub fn parse_timed_text(xml: &str) -> Vec<RawSegment> {
    match parse_strict(xml) {
        Ok(records) => records,
        Err(e) => {
            debug!("Strict timed-text parse failed ({e}), using lenient extraction");
            parse_lenient(xml)
        }
    }
}

/// Trim text, drop blank or malformed records, and fill in default durations
pub fn normalize<I>(records: I) -> Vec<Segment>
where
    I: IntoIterator<Item = RawSegment>,
{
    records
        .into_iter()
        .filter_map(|r| {
            let text = r.text.trim();
            if text.is_empty() || !r.start.is_finite() || r.start < 0.0 {
                return None;
            }
            let duration = match r.duration {
                None => DEFAULT_DURATION,
                Some(d) if d.is_finite() && d >= 0.0 => d,
                Some(_) => return None,
            };
            Some(Segment {
                text: text.to_string(),
                start: r.start,
                duration,
            })
        })
        .collect()
}

/// A `<text>` element whose closing tag has not been read yet
#[derive(Default)]
struct OpenText {
    start: f64,
    duration: Option<f64>,
    malformed: bool,
    text: String,
}

fn parse_strict(xml: &str) -> Result<Vec<RawSegment>> {
    let mut reader = Reader::from_str(xml);
    let mut records = Vec::new();
    let mut current: Option<OpenText> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) if e.name().as_ref() == b"text" => {
                let mut open = OpenText::default();
                for attr in e.attributes() {
                    let attr = attr?;
                    let value = String::from_utf8_lossy(&attr.value);
                    let parsed = value.trim().parse::<f64>();
                    match (attr.key.as_ref(), parsed) {
                        (b"start", Ok(s)) => open.start = s,
                        (b"dur", Ok(d)) => open.duration = Some(d),
                        (b"start" | b"dur", Err(_)) => open.malformed = true,
                        _ => {}
                    }
                }
                current = Some(open);
            }
            Event::Text(ref e) => {
                if let Some(open) = current.as_mut() {
                    let raw = e.unescape()?;
                    open.text.push_str(&html_escape::decode_html_entities(&raw));
                }
            }
            Event::CData(ref e) => {
                if let Some(open) = current.as_mut() {
                    open.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Event::End(ref e) if e.name().as_ref() == b"text" => {
                match current.take() {
                    Some(open) if open.malformed => debug!("Skipping caption with unparseable timing"),
                    Some(open) => records.push(RawSegment {
                        text: open.text,
                        start: open.start,
                        duration: open.duration,
                    }),
                    None => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if current.is_some() {
        bail!("unterminated <text> element");
    }

    Ok(records)
}

fn parse_lenient(xml: &str) -> Vec<RawSegment> {
    LENIENT_TEXT
        .captures_iter(xml)
        .filter_map(|caps| {
            let start = caps[1].parse::<f64>().ok()?;
            let duration = match caps.get(2) {
                Some(m) => Some(m.as_str().parse::<f64>().ok()?),
                None => None,
            };
            Some(RawSegment {
                text: html_escape::decode_html_entities(&caps[3]).to_string(),
                start,
                duration,
            })
        })
        .collect()
}
