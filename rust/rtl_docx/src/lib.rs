//! # rtl_docx
//!
//! Builds right-to-left Word documents from per-page HTML fragments, and runs
//! bulk find/replace over existing .docx files.
//!
//! ```no_run
//! use rtl_docx::{docx, render, DocumentBuilder};
//!
//! fn main() -> rtl_docx::Result<()> {
//!     let mut doc = DocumentBuilder::new();
//!     for page in ["<h1>مقدمة</h1>", "<p>نص (تجريبي) هنا.</p>"] {
//!         render(page, &mut doc);
//!     }
//!     docx::save(&doc.finish(), &Default::default(), "out.docx")
//! }
//! ```

pub mod bidi;
pub mod document;
pub mod docx;
pub mod error;
pub mod render;
pub mod replace;

pub use bidi::normalize;
pub use document::{
    Alignment, Block, Direction, Document, DocumentBuilder, Heading, Paragraph, Run,
};
pub use docx::DocxOptions;
pub use error::{Error, Result};
pub use render::render;
pub use replace::{pair_up, replace_in_docx, ReplaceReport, Replacement};
