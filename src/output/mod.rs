//! Output module
//!
//! Materializes a run's records as a partitioned dataset.
//!
//! # Overview
//!
//! - A fixed column schema per unit system, shared by every format
//! - CSV, JSON-lines and Parquet writers
//! - [`BatchWriter`], which groups records by partition and writes one
//!   file per group, all named after the run timestamp
//! - Parquet read-back for verification

mod batch;
mod schema;
mod writer;

pub use batch::{BatchWriter, PartitionWrite, WriteReport};
pub use schema::{
    batch_to_records, column_names, columns, record_cells, record_schema, records_to_batch, Cell,
    ColumnDef, ColumnType,
};
pub use writer::{
    read_parquet_records, write_csv, write_json_lines, write_parquet, write_records,
    FormatOptions, ParquetWriterConfig,
};
