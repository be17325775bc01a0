//! BIG-IP License Wire: the activation service's SOAP dialect
//!
//! - [`envelope`] renders the `getLicense` request envelope
//! - [`parser`] reads a response into a [`ParsedResponse`] record
//! - [`outcome`] turns that record into a [`NegotiationOutcome`]
//!
//! ```text
//! LicenseRequest + Dossier + EULA ──render──▶ envelope ──POST──▶ authority
//!                                                                   │
//! NegotiationOutcome ◀──outcome── ParsedResponse ◀──parse── response bytes
//! ```

pub mod envelope;
pub mod error;
pub mod outcome;
pub mod parser;

pub use envelope::render_envelope;
pub use error::{EnvelopeError, ParseError};
pub use outcome::{LicenseArtifact, NegotiationOutcome, TransactionState};
pub use parser::{ParsedResponse, ResponseParser};
