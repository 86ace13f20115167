//! Append-only document model built one page fragment at a time.

/// Default heading size in points.
pub const HEADING_FONT_SIZE_PT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rtl,
    Ltr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Whatever the paragraph direction implies (start edge).
    #[default]
    Default,
    Center,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub text: String,
    pub direction: Direction,
    pub alignment: Alignment,
    pub font_size_pt: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub direction: Direction,
}

impl Paragraph {
    pub fn rtl(runs: Vec<Run>) -> Self {
        Self {
            runs,
            direction: Direction::Rtl,
        }
    }

    /// Concatenated run text.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(Heading),
    Paragraph(Paragraph),
    /// A plain paragraph whose first run is the manual ordinal marker.
    ListItem(Paragraph),
    PageBreak,
}

impl Block {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Block::Heading(h) => Some(h.direction),
            Block::Paragraph(p) | Block::ListItem(p) => Some(p.direction),
            Block::PageBreak => None,
        }
    }
}

/// A finished document, ready for serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::PageBreak))
            .count()
    }
}

/// Caller-owned document-in-progress.
///
/// Blocks can only be appended; nothing already added is edited or removed.
/// `finish` consumes the builder, so a serialized document cannot grow.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    blocks: Vec<Block>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_heading(&mut self, heading: Heading) {
        self.blocks.push(Block::Heading(heading));
    }

    pub fn push_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }

    pub fn push_list_item(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::ListItem(paragraph));
    }

    pub fn push_page_break(&mut self) {
        self.blocks.push(Block::PageBreak);
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn finish(self) -> Document {
        Document {
            blocks: self.blocks,
        }
    }
}
