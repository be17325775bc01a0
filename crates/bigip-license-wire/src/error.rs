//! Wire-level errors
use thiserror::Error;

/// Response bytes that could not be read as XML
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("MALFORMED/Provided XML payload is invalid. Received '{0}'.")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("ENVELOPE/{0}")]
    Render(String),
}
