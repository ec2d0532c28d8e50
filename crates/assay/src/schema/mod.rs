//! Column types and schema inference.

mod infer;
mod types;

pub use infer::{Schema, infer_column_type, infer_schema};
pub use types::ColumnType;
