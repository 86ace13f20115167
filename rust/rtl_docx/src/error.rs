//! Error types for rtl_docx.

use std::io;
use thiserror::Error;

/// Result type alias for rtl_docx operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing a package.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The DOCX container could not be read or written.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A WordprocessingML part is not well-formed XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A part the package must contain is absent.
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// Find and replace lists differ in length.
    #[error("Find and replace lists must have the same length ({finds} find, {replaces} replace)")]
    MismatchedPairs { finds: usize, replaces: usize },

    /// A package part is not valid UTF-8.
    #[error("Encoding error: {0}")]
    Encoding(String),
}
