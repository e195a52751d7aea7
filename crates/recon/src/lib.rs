//! `nzn-recon`: Newspaper registry reconciliation engine.
//!
//! Pure engine crate: receives decoded MARC records and an existing
//! registry, classifies each entry and writes through the [`store`] traits.
//! No file or CLI dependencies.

pub mod bib;
pub mod config;
pub mod date;
pub mod decide;
pub mod error;
pub mod index;
pub mod marc;
pub mod model;
pub mod place;
pub mod progress;
pub mod run;
pub mod store;

pub use config::ReconConfig;
pub use date::PartialDate;
pub use decide::{Decision, DecisionEngine, SkipReason};
pub use error::ReconError;
pub use index::IdentifierIndex;
pub use marc::MarcRecord;
pub use model::NewspaperRecord;
pub use run::{Coordinator, RunMode, RunOptions, RunSummary};
pub use store::{ArchiveSink, RecordStore};
