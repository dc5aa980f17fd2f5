//! Ingestion pipeline building blocks.
//!
//! - [`EnvelopeValidator`] checks transport framing before parsing
//! - [`RecordProcessor`] runs one envelope through validation, parsing and registration
//! - [`IngestionLifecycle`] tracks the state of the ingestion subsystem

pub mod lifecycle;
pub mod processor;
pub mod validator;

pub use lifecycle::{IngestionLifecycle, IngestionState, LifecycleError};
pub use processor::{RecordError, RecordOutcome, RecordProcessor};
pub use validator::{EnvelopeValidator, Rejection};
