//! Bulk find/replace over the paragraphs of a .docx package.
//!
//! A paragraph's text is the concatenation of its `w:t` elements, so a match
//! may span several runs. When a paragraph changes, its whole new text goes
//! into the first text-bearing `w:t` and the others are emptied; the first
//! run's formatting is what survives.

use std::io::{Cursor, Read, Write};

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{Error, Result};

const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub find: String,
    pub replace: String,
}

impl Replacement {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceReport {
    pub paragraphs: usize,
    pub paragraphs_changed: usize,
    pub occurrences: usize,
}

/// Pairs find and replace texts by position.
///
/// Both sides are trimmed; pairs whose find text is blank are dropped.
pub fn pair_up<S: AsRef<str>>(finds: &[S], replaces: &[S]) -> Result<Vec<Replacement>> {
    if finds.len() != replaces.len() {
        return Err(Error::MismatchedPairs {
            finds: finds.len(),
            replaces: replaces.len(),
        });
    }
    Ok(finds
        .iter()
        .zip(replaces)
        .map(|(f, r)| (f.as_ref().trim(), r.as_ref().trim()))
        .filter(|(f, _)| !f.is_empty())
        .map(|(f, r)| Replacement::new(f, r))
        .collect())
}

/// Applies every replacement in order; returns the new text when anything
/// matched, with the number of occurrences replaced.
fn apply(text: &str, pairs: &[Replacement]) -> Option<(String, usize)> {
    let mut current = text.to_string();
    let mut occurrences = 0;
    for pair in pairs {
        if pair.find.is_empty() {
            continue;
        }
        let n = current.matches(pair.find.as_str()).count();
        if n > 0 {
            current = current.replace(&pair.find, &pair.replace);
            occurrences += n;
        }
    }
    (occurrences > 0).then_some((current, occurrences))
}

struct TextSlot {
    start: usize,
    text: usize,
}

#[derive(Default)]
struct OpenParagraph {
    events: Vec<Event<'static>>,
    slots: Vec<TextSlot>,
    texts: Vec<String>,
    open_t: Option<usize>,
}

impl OpenParagraph {
    fn rewrite(&mut self, pairs: &[Replacement], report: &mut ReplaceReport) {
        report.paragraphs += 1;
        let joined: String = self.texts.concat();
        let Some((new_text, n)) = apply(&joined, pairs) else {
            return;
        };
        report.paragraphs_changed += 1;
        report.occurrences += n;

        for (i, slot) in self.slots.iter().enumerate() {
            if i == 0 {
                let mut start = BytesStart::new("w:t");
                start.push_attribute(("xml:space", "preserve"));
                self.events[slot.start] = Event::Start(start);
                self.events[slot.text] = Event::Text(BytesText::new(&new_text).into_owned());
            } else {
                self.events[slot.text] = Event::Text(BytesText::new("").into_owned());
            }
        }
    }
}

/// Rewrites the paragraphs of a WordprocessingML main part.
pub fn replace_in_document_xml(
    xml: &str,
    pairs: &[Replacement],
) -> Result<(String, ReplaceReport)> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut stack: Vec<OpenParagraph> = Vec::new();
    let mut report = ReplaceReport::default();

    loop {
        let event = reader.read_event()?;
        if matches!(event, Event::Eof) {
            break;
        }

        if matches!(&event, Event::Start(e) if e.name().as_ref() == b"w:p") {
            let mut p = OpenParagraph::default();
            p.events.push(event.into_owned());
            stack.push(p);
            continue;
        }

        if matches!(&event, Event::End(e) if e.name().as_ref() == b"w:p") {
            if let Some(mut p) = stack.pop() {
                p.events.push(event.into_owned());
                p.rewrite(pairs, &mut report);
                match stack.last_mut() {
                    Some(parent) => parent.events.extend(p.events),
                    None => {
                        for ev in p.events {
                            writer.write_event(ev)?;
                        }
                    }
                }
                continue;
            }
        }

        let Some(p) = stack.last_mut() else {
            writer.write_event(event)?;
            continue;
        };
        match &event {
            Event::Start(e) if e.name().as_ref() == b"w:t" => {
                p.open_t = Some(p.events.len());
            }
            Event::End(e) if e.name().as_ref() == b"w:t" => {
                p.open_t = None;
            }
            Event::Text(t) => {
                if let Some(start) = p.open_t {
                    p.texts.push(t.unescape()?.into_owned());
                    p.slots.push(TextSlot {
                        start,
                        text: p.events.len(),
                    });
                }
            }
            _ => {}
        }
        p.events.push(event.into_owned());
    }

    // Unbalanced input: flush whatever is still open untouched.
    for p in stack {
        for ev in p.events {
            writer.write_event(ev)?;
        }
    }

    let out = String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Encoding(format!("{DOCUMENT_PART}: {e}")))?;
    Ok((out, report))
}

/// Applies `pairs` to the main document part of a .docx package.
///
/// Every other part is copied as-is.
pub fn replace_in_docx(docx: &[u8], pairs: &[Replacement]) -> Result<(Vec<u8>, ReplaceReport)> {
    let mut archive = ZipArchive::new(Cursor::new(docx))?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opt = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut report = None;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_dir() {
            zip.add_directory(name, opt)?;
            continue;
        }

        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        drop(entry);

        if name == DOCUMENT_PART {
            let xml = String::from_utf8(data)
                .map_err(|e| Error::Encoding(format!("{DOCUMENT_PART}: {e}")))?;
            let (new_xml, r) = replace_in_document_xml(&xml, pairs)?;
            data = new_xml.into_bytes();
            report = Some(r);
        }

        zip.start_file(name, opt)?;
        zip.write_all(&data)?;
    }

    let report = report.ok_or_else(|| Error::MissingPart(DOCUMENT_PART.to_string()))?;
    let bytes = zip.finish()?.into_inner();
    log::debug!(
        "find/replace: {} of {} paragraphs changed, {} occurrences",
        report.paragraphs_changed,
        report.paragraphs,
        report.occurrences
    );
    Ok((bytes, report))
}
