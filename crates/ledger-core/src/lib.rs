//! Domain model, envelope builder, validator, and input parsers for the
//! single-writer append path.

pub mod envelope;
pub mod error;
pub mod model;
pub mod parse;
pub mod validate;

pub use envelope::build_envelope;
pub use error::{LedgerError, LedgerResult};
pub use model::{Envelope, SubmittedEvent, FORBIDDEN_FIELDS};
pub use parse::{parse_if_match, utc_now_iso};
pub use validate::{ValidatedSubmission, Validator};
