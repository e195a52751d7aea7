// File I/O: MARC21 input, registry TSV, JSON record store, archive and dataset output

pub mod archive;
pub mod dataset;
pub mod error;
pub mod marc21;
pub mod registry;
pub mod store;

pub use archive::MarcArchive;
pub use error::IoError;
pub use marc21::MarcReader;
pub use store::JsonDirStore;
