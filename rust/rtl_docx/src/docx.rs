//! WordprocessingML package writer.

use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::document::{Alignment, Block, Direction, Document, Heading, Paragraph, Run};
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct DocxOptions {
    /// Written to `docProps/core.xml` when set.
    pub title: Option<String>,
}

fn xml_escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn bidi_xml(direction: Direction) -> &'static str {
    match direction {
        Direction::Rtl => r#"<w:bidi w:val="1"/>"#,
        Direction::Ltr => r#"<w:bidi w:val="0"/>"#,
    }
}

fn text_xml(text: &str) -> String {
    format!(
        r#"<w:t xml:space="preserve">{}</w:t>"#,
        xml_escape_text(text)
    )
}

fn run_xml(run: &Run) -> String {
    let mut out = String::new();
    out.push_str("<w:r>");
    if run.bold {
        out.push_str("<w:rPr><w:b/><w:bCs/></w:rPr>");
    }
    out.push_str(&text_xml(&run.text));
    out.push_str("</w:r>");
    out
}

fn heading_xml(h: &Heading) -> String {
    let mut out = String::new();
    out.push_str("<w:p><w:pPr>");
    out.push_str(r#"<w:pStyle w:val="Heading1"/>"#);
    out.push_str(bidi_xml(h.direction));
    if h.alignment == Alignment::Center {
        out.push_str(r#"<w:jc w:val="center"/>"#);
    }
    out.push_str("</w:pPr>");

    // Sizes are in half-points.
    let half_points = h.font_size_pt * 2;
    out.push_str("<w:r><w:rPr>");
    out.push_str(&format!(
        r#"<w:sz w:val="{half_points}"/><w:szCs w:val="{half_points}"/>"#
    ));
    out.push_str("</w:rPr>");
    out.push_str(&text_xml(&h.text));
    out.push_str("</w:r></w:p>");
    out
}

fn paragraph_xml(p: &Paragraph) -> String {
    let mut out = String::new();
    out.push_str("<w:p><w:pPr>");
    out.push_str(bidi_xml(p.direction));
    out.push_str("</w:pPr>");
    for run in &p.runs {
        out.push_str(&run_xml(run));
    }
    out.push_str("</w:p>");
    out
}

const PAGE_BREAK_XML: &str = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;

pub fn document_xml(doc: &Document) -> String {
    let mut body = String::new();
    for b in &doc.blocks {
        match b {
            Block::Heading(h) => body.push_str(&heading_xml(h)),
            Block::Paragraph(p) | Block::ListItem(p) => body.push_str(&paragraph_xml(p)),
            Block::PageBreak => body.push_str(PAGE_BREAK_XML),
        }
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
 xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    {body}
    <w:sectPr>
      <w:pgSz w:w="12240" w:h="15840"/>
      <w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/>
      <w:cols w:space="708"/>
      <w:docGrid w:linePitch="360"/>
    </w:sectPr>
  </w:body>
</w:document>"#
    )
}

fn content_types_xml(has_core: bool) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    out.push('\n');
    out.push_str(
        r#"  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    );
    out.push('\n');
    out.push_str(r#"  <Default Extension="xml" ContentType="application/xml"/>"#);
    out.push('\n');
    out.push_str(r#"  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#);
    out.push('\n');
    out.push_str(r#"  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#);
    out.push('\n');
    if has_core {
        out.push_str(r#"  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);
        out.push('\n');
    }
    out.push_str("</Types>");
    out
}

fn rels_xml(has_core: bool) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    out.push('\n');
    out.push_str(r#"  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#);
    out.push('\n');
    if has_core {
        out.push_str(r#"  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#);
        out.push('\n');
    }
    out.push_str("</Relationships>");
    out
}

fn document_rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#
}

fn core_xml(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
 xmlns:dc="http://purl.org/dc/elements/1.1/"
 xmlns:dcterms="http://purl.org/dc/terms/"
 xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>{}</dc:title>
</cp:coreProperties>"#,
        xml_escape_text(title)
    )
}

fn styles_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading1">
    <w:name w:val="heading 1"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:uiPriority w:val="9"/>
    <w:qFormat/>
    <w:pPr>
      <w:keepNext/>
      <w:spacing w:before="360" w:after="120"/>
      <w:outlineLvl w:val="0"/>
    </w:pPr>
    <w:rPr>
      <w:b/>
      <w:bCs/>
    </w:rPr>
  </w:style>
</w:styles>"#
}

/// Writes `doc` as a .docx package into `writer` and hands the writer back.
pub fn write_docx<W: Write + Seek>(doc: &Document, opts: &DocxOptions, writer: W) -> Result<W> {
    let title = opts.title.as_deref().filter(|t| !t.trim().is_empty());
    let mut zip = ZipWriter::new(writer);
    let opt = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", opt)?;
    zip.write_all(content_types_xml(title.is_some()).as_bytes())?;

    zip.start_file("_rels/.rels", opt)?;
    zip.write_all(rels_xml(title.is_some()).as_bytes())?;

    if let Some(title) = title {
        zip.start_file("docProps/core.xml", opt)?;
        zip.write_all(core_xml(title).as_bytes())?;
    }

    zip.start_file("word/document.xml", opt)?;
    zip.write_all(document_xml(doc).as_bytes())?;

    zip.start_file("word/_rels/document.xml.rels", opt)?;
    zip.write_all(document_rels_xml().as_bytes())?;

    zip.start_file("word/styles.xml", opt)?;
    zip.write_all(styles_xml().as_bytes())?;

    Ok(zip.finish()?)
}

pub fn to_docx_bytes(doc: &Document, opts: &DocxOptions) -> Result<Vec<u8>> {
    let cursor = write_docx(doc, opts, Cursor::new(Vec::new()))?;
    Ok(cursor.into_inner())
}

pub fn save(doc: &Document, opts: &DocxOptions, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    write_docx(doc, opts, file)?;
    log::info!(
        "wrote {} ({} blocks, {} pages)",
        path.display(),
        doc.blocks.len(),
        doc.page_count()
    );
    Ok(())
}
