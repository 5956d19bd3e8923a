//! Update ingestion.
//!
//! Consumes change events from an `UpdateSource`, resolves the target record
//! (stored or default), applies the field-mask merge, and writes the result
//! back. One bad event never stops the loop.

pub mod error;
pub mod feed;
pub mod ingestor;
pub mod source;

pub use error::IngestError;
pub use feed::{publish, PgUpdateFeed};
pub use ingestor::{IngestStats, Ingestor, Outcome};
pub use source::{ChannelSource, UpdateSource};
