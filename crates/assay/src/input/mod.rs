//! Input parsing and in-memory tabular data.

mod parser;
mod source;

pub use parser::{Parser, ParserConfig, write_table};
pub use source::{DataTable, SourceMetadata, parse_numeric};
