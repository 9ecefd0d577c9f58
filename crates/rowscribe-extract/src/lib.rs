//! Row extraction from source tables.

pub mod extractor;
pub mod memory;
pub mod options;
pub mod postgres;
pub mod sql;

pub use extractor::{Extraction, Filter, TableExtractor};
pub use memory::MemoryExtractor;
pub use options::ExtractOptions;
pub use postgres::PostgresExtractor;

pub use rowscribe_core::{ColumnDescriptor, ExtractedRow, TableRef};
