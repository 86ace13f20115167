//! Renders one page's HTML fragment into document blocks.
//!
//! Only top-level `h1`, `p` and `ol` elements are structure. Everything else at
//! the top level is skipped; inside `p` and `li`, any child other than `b` is
//! kept as an opaque plain run (its markup, for elements).
//!
//! Parsing goes through html5ever, so malformed input never fails: unclosed
//! tags are closed by the HTML5 tree builder and unknown tags become ordinary
//! elements that the dispatcher ignores.
//!
//! The tree builder reopens an unclosed `b` in every following block. Those
//! copies are not bold: each source `<b>` start tag is numbered before
//! parsing, and a `b` element whose number was already seen earlier in
//! document order is a copy whose children are dispatched as if it were absent.
//!
//! Text goes through the HTML5 input stream preprocessing, so a `\r\n` or lone
//! `\r` in a fragment arrives in the runs as `\n`.

use std::collections::HashSet;
use std::rc::Rc;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use crate::bidi::normalize;
use crate::document::{
    Alignment, Direction, DocumentBuilder, Heading, Paragraph, Run, HEADING_FONT_SIZE_PT,
};

/// Plain substring looked for in an `h1` style attribute.
const CENTER_STYLE: &str = "text-align: center";

/// Ordinal of a `<b>` start tag in the fragment source.
const SOURCE_B_ATTR: &str = "data-source-b";

/// `b` elements the tree builder made up rather than read from a start tag.
type Reopened = HashSet<*const Node>;

enum TopLevel {
    Heading(Handle),
    Paragraph(Handle),
    OrderedList(Handle),
    Ignored,
}

fn html5_parse(input: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(input)
}

/// Adds `data-source-b="<n>"` to every `<b>` start tag, skipping comments.
fn number_bold_starts(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 32);
    let mut rest = input;
    let mut n: u32 = 0;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let tail = &rest[lt..];
        if tail.starts_with("<!--") {
            let end = tail[4..].find("-->").map_or(tail.len(), |e| e + 7);
            out.push_str(&tail[..end]);
            rest = &tail[end..];
            continue;
        }
        let bytes = tail.as_bytes();
        let is_b_start = bytes.len() > 2
            && bytes[1].eq_ignore_ascii_case(&b'b')
            && matches!(bytes[2], b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r' | b'\x0c');
        if is_b_start {
            out.push_str(&tail[..2]);
            out.push_str(&format!(" {SOURCE_B_ATTR}=\"{n}\""));
            n += 1;
            rest = &tail[2..];
        } else {
            out.push('<');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Walks the whole tree in document order; the first `b` holding a given
/// ordinal is the source element, later ones are reopened copies.
fn reopened_bold(dom: &RcDom) -> Reopened {
    fn walk(node: &Handle, seen: &mut HashSet<String>, copies: &mut Reopened) {
        if tag_lower(node).as_deref() == Some("b") {
            if let Some(n) = attr_get(node, SOURCE_B_ATTR) {
                if !seen.insert(n) {
                    copies.insert(Rc::as_ptr(node));
                }
            }
        }
        for c in node.children.borrow().iter() {
            walk(c, seen, copies);
        }
    }

    let mut seen = HashSet::new();
    let mut copies = Reopened::new();
    walk(&dom.document, &mut seen, &mut copies);
    copies
}

fn tag_lower(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_ascii_lowercase()),
        _ => None,
    }
}

fn attr_get(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.to_string().eq_ignore_ascii_case(name))
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

fn body_children(dom: &RcDom) -> Vec<Handle> {
    fn find_body(node: &Handle) -> Option<Handle> {
        if tag_lower(node).as_deref() == Some("body") {
            return Some(node.clone());
        }
        for c in node.children.borrow().iter() {
            if let Some(b) = find_body(c) {
                return Some(b);
            }
        }
        None
    }

    match find_body(&dom.document) {
        Some(body) => body.children.borrow().clone(),
        None => dom.document.children.borrow().clone(),
    }
}

fn classify(node: &Handle) -> TopLevel {
    match tag_lower(node).as_deref() {
        Some("h1") => TopLevel::Heading(node.clone()),
        Some("p") => TopLevel::Paragraph(node.clone()),
        Some("ol") => TopLevel::OrderedList(node.clone()),
        _ => TopLevel::Ignored,
    }
}

/// Flattened descendant text, tags stripped, comments skipped.
fn text_content(node: &Handle) -> String {
    fn walk(node: &Handle, out: &mut String) {
        match &node.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            NodeData::Element { .. } | NodeData::Document => {
                for c in node.children.borrow().iter() {
                    walk(c, out);
                }
            }
            _ => {}
        }
    }
    let mut out = String::new();
    walk(node, &mut out);
    out
}

fn esc_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn esc_attr(s: &str) -> String {
    esc_text(s).replace('"', "&quot;")
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "wbr"
    )
}

/// Markup of an element that is not structure, e.g. `<i>x</i>` or `<br/>`.
fn outer_html(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&esc_text(&contents.borrow())),
        NodeData::Comment { contents } => {
            out.push_str("<!--");
            out.push_str(contents);
            out.push_str("-->");
        }
        NodeData::Element { name, attrs, .. } => {
            let tag = name.local.to_string();
            out.push('<');
            out.push_str(&tag);
            for a in attrs.borrow().iter() {
                if &*a.name.local == SOURCE_B_ATTR {
                    continue;
                }
                out.push(' ');
                out.push_str(&a.name.local);
                out.push_str("=\"");
                out.push_str(&esc_attr(&a.value));
                out.push('"');
            }
            if is_void(&tag) {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for c in node.children.borrow().iter() {
                outer_html(c, out);
            }
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
        _ => {}
    }
}

/// One run per immediate child: `b` is bold with its flattened text, any
/// other child is a plain run of its string form. A reopened `b` adds the
/// runs of its own children instead.
fn inline_runs(node: &Handle, reopened: &Reopened) -> Vec<Run> {
    let mut runs = Vec::new();
    for child in node.children.borrow().iter() {
        match &child.data {
            NodeData::Element { .. } if tag_lower(child).as_deref() == Some("b") => {
                if reopened.contains(&Rc::as_ptr(child)) {
                    runs.extend(inline_runs(child, reopened));
                } else {
                    runs.push(Run::bold(normalize(&text_content(child))));
                }
            }
            NodeData::Element { .. } => {
                let mut markup = String::new();
                outer_html(child, &mut markup);
                runs.push(Run::plain(normalize(&markup)));
            }
            NodeData::Text { contents } => {
                runs.push(Run::plain(normalize(&contents.borrow())));
            }
            NodeData::Comment { contents } => {
                runs.push(Run::plain(normalize(contents)));
            }
            _ => {}
        }
    }
    runs
}

fn heading(node: &Handle) -> Heading {
    let centered = attr_get(node, "style").is_some_and(|s| s.contains(CENTER_STYLE));
    Heading {
        text: normalize(&text_content(node)),
        direction: Direction::Rtl,
        alignment: if centered {
            Alignment::Center
        } else {
            Alignment::Default
        },
        font_size_pt: HEADING_FONT_SIZE_PT,
    }
}

fn render_list(node: &Handle, reopened: &Reopened, doc: &mut DocumentBuilder) {
    let mut number: u32 = 1;
    for li in node.children.borrow().iter() {
        if tag_lower(li).as_deref() != Some("li") {
            continue;
        }
        let mut runs = vec![Run::bold(format!(" .{number} "))];
        runs.extend(inline_runs(li, reopened));
        doc.push_list_item(Paragraph::rtl(runs));
        number += 1;
    }
}

/// Appends the blocks for one page fragment, then a page break.
///
/// The page break is appended even when the fragment holds nothing
/// recognizable, so source pages and output pages stay aligned.
pub fn render(fragment: &str, doc: &mut DocumentBuilder) {
    let dom = html5_parse(&number_bold_starts(fragment));
    let reopened = reopened_bold(&dom);
    let start = doc.len();

    for node in body_children(&dom) {
        match classify(&node) {
            TopLevel::Heading(h) => doc.push_heading(heading(&h)),
            // A stray `</p>` makes an empty element; it carries no text.
            TopLevel::Paragraph(p) if p.children.borrow().is_empty() => {
                log::trace!("skipping empty <p>");
            }
            TopLevel::Paragraph(p) => {
                doc.push_paragraph(Paragraph::rtl(inline_runs(&p, &reopened)))
            }
            TopLevel::OrderedList(ol) => render_list(&ol, &reopened, doc),
            TopLevel::Ignored => {
                if let Some(tag) = tag_lower(&node) {
                    log::trace!("ignoring top-level <{tag}>");
                }
            }
        }
    }

    doc.push_page_break();
    log::debug!(
        "rendered fragment: {} bytes -> {} blocks",
        fragment.len(),
        doc.len() - start
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Block;

    fn render_fresh(html: &str) -> Vec<Block> {
        let mut doc = DocumentBuilder::new();
        render(html, &mut doc);
        doc.finish().blocks
    }

    fn runs_of(block: &Block) -> Vec<(String, bool)> {
        match block {
            Block::Paragraph(p) | Block::ListItem(p) => {
                p.runs.iter().map(|r| (r.text.clone(), r.bold)).collect()
            }
            other => panic!("expected paragraph-like block, got {other:?}"),
        }
    }

    #[test]
    fn bold_spans_keep_their_order() {
        let blocks = render_fresh("<p>A<b>B</b>C</p>");
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            runs_of(&blocks[0]),
            vec![
                ("A".to_string(), false),
                ("B".to_string(), true),
                ("C".to_string(), false)
            ]
        );
    }

    #[test]
    fn centered_heading_only_with_center_style() {
        let blocks = render_fresh(r#"<h1 style="text-align: center;">Title</h1><h1>Title</h1><h1 style="color: red">T</h1>"#);
        let alignments: Vec<Alignment> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading(h) => Some(h.alignment),
                _ => None,
            })
            .collect();
        assert_eq!(
            alignments,
            vec![Alignment::Center, Alignment::Default, Alignment::Default]
        );
    }

    #[test]
    fn heading_text_is_flattened_and_sized() {
        let blocks = render_fresh("<h1>باب <b>(الأول)</b></h1>");
        let Block::Heading(h) = &blocks[0] else {
            panic!("expected heading");
        };
        assert_eq!(h.text, "باب \u{200E}(\u{200E}الأول\u{200E})\u{200E}");
        assert_eq!(h.direction, Direction::Rtl);
        assert_eq!(h.font_size_pt, 16);
    }

    #[test]
    fn list_numbering_restarts_per_list() {
        let blocks = render_fresh(
            "<ol><li>a</li><li>b</li><li>c</li></ol><ol><li>d</li><li>e</li><li>f</li></ol>",
        );
        let markers: Vec<String> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::ListItem(p) => Some(p.runs[0].text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec![" .1 ", " .2 ", " .3 ", " .1 ", " .2 ", " .3 "]);
    }

    #[test]
    fn numbering_does_not_carry_across_fragments() {
        let mut doc = DocumentBuilder::new();
        render("<ol><li>a</li><li>b</li></ol>", &mut doc);
        render("<ol><li>c</li></ol>", &mut doc);
        let doc = doc.finish();
        let Block::ListItem(p) = &doc.blocks[3] else {
            panic!("expected list item");
        };
        assert_eq!(p.runs[0], Run::bold(" .1 "));
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn empty_and_unknown_fragments_still_break_the_page() {
        for html in ["", "   ", "<div><p>nested</p></div>", "<table><tr><td>x</td></tr></table>", "```html\n```"] {
            let blocks = render_fresh(html);
            assert_eq!(blocks, vec![Block::PageBreak], "fragment {html:?}");
        }
    }

    #[test]
    fn stray_li_and_b_are_not_dispatched() {
        let blocks = render_fresh("<li>x</li><b>y</b>");
        assert_eq!(blocks, vec![Block::PageBreak]);
    }

    #[test]
    fn malformed_markup_is_recovered() {
        let blocks = render_fresh("<p>one <b>two</p><p>three");
        assert_eq!(blocks.len(), 3);
        assert_eq!(
            runs_of(&blocks[0]),
            vec![("one ".to_string(), false), ("two".to_string(), true)]
        );
        assert_eq!(runs_of(&blocks[1]), vec![("three".to_string(), false)]);
        assert!(matches!(blocks.last(), Some(Block::PageBreak)));
    }

    #[test]
    fn unclosed_bold_stays_in_its_paragraph() {
        let blocks = render_fresh("<p>قال <b>الشيخ</p><p>نص</p>");
        assert_eq!(
            runs_of(&blocks[0]),
            vec![("قال ".to_string(), false), ("الشيخ".to_string(), true)]
        );
        assert_eq!(runs_of(&blocks[1]), vec![("نص".to_string(), false)]);
    }

    #[test]
    fn unclosed_bold_stays_in_its_list_item() {
        let blocks = render_fresh("<ol><li>x <b>y</li><li>z</li></ol>");
        assert_eq!(
            runs_of(&blocks[0]),
            vec![
                (" .1 ".to_string(), true),
                ("x ".to_string(), false),
                ("y".to_string(), true)
            ]
        );
        assert_eq!(
            runs_of(&blocks[1]),
            vec![(" .2 ".to_string(), true), ("z".to_string(), false)]
        );
    }

    #[test]
    fn bold_after_an_unclosed_one_is_still_bold() {
        let blocks = render_fresh("<p><b>a</p><p>b <B>c</B> d</p>");
        assert_eq!(
            runs_of(&blocks[1]),
            vec![
                ("b ".to_string(), false),
                ("c".to_string(), true),
                (" d".to_string(), false)
            ]
        );
    }

    #[test]
    fn bold_inside_foreign_markup_serializes_cleanly() {
        let blocks = render_fresh("<p><i><b>x</b></i></p>");
        assert_eq!(runs_of(&blocks[0]), vec![("<i><b>x</b></i>".to_string(), false)]);
    }

    #[test]
    fn bold_start_tags_are_numbered_outside_comments() {
        assert_eq!(
            number_bold_starts("<b>a</b><!-- <b> --><B class=x><br><body>"),
            r#"<b data-source-b="0">a</b><!-- <b> --><B data-source-b="1" class=x><br><body>"#
        );
    }

    #[test]
    fn carriage_returns_arrive_as_newlines() {
        let blocks = render_fresh("<p>a\r\nb\rc</p>");
        assert_eq!(runs_of(&blocks[0]), vec![("a\nb\nc".to_string(), false)]);
    }

    #[test]
    fn list_inside_paragraph_leaves_no_empty_paragraph() {
        let blocks = render_fresh("<p>text<ol><li>x</li></ol></p>");
        assert_eq!(blocks.len(), 3);
        assert_eq!(runs_of(&blocks[0]), vec![("text".to_string(), false)]);
        assert!(matches!(blocks[1], Block::ListItem(_)));
        assert_eq!(blocks[2], Block::PageBreak);
    }

    #[test]
    fn whitespace_and_foreign_inline_markup_are_kept() {
        let blocks = render_fresh("<p>  a <i>b</i><br> c </p>");
        assert_eq!(
            runs_of(&blocks[0]),
            vec![
                ("  a ".to_string(), false),
                ("<i>b</i>".to_string(), false),
                ("<br/>".to_string(), false),
                (" c ".to_string(), false)
            ]
        );
    }

    #[test]
    fn every_text_block_is_rtl() {
        let blocks = render_fresh("<h1>a</h1><p>b</p><ol><li>c</li></ol>");
        for b in &blocks[..3] {
            assert_eq!(b.direction(), Some(Direction::Rtl));
        }
    }
}
