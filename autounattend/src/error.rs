use thiserror::Error;

/// Errors surfaced by the answer file core.
///
/// Anything else (missing optional fields, empty lists, unset flags) is
/// modeled as a default, never as an error.
#[derive(Debug, Error)]
pub enum UnattendError {
    /// The input text is not well-formed XML. Fatal to a parse call; no
    /// partial result is returned.
    #[error("malformed XML document: {0}")]
    MalformedDocument(String),

    /// The XML writer failed while rendering a document tree.
    #[error("XML serialization failed: {0}")]
    Serialization(String),
}

impl From<quick_xml::Error> for UnattendError {
    fn from(err: quick_xml::Error) -> Self {
        UnattendError::MalformedDocument(err.to_string())
    }
}

impl From<std::io::Error> for UnattendError {
    fn from(err: std::io::Error) -> Self {
        UnattendError::Serialization(err.to_string())
    }
}
