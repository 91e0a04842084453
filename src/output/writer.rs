//! Format writers
//!
//! Each writer consumes an already opened file, so the caller decides the
//! open mode. The batch writer always opens with create-new semantics.

use super::schema::{column_names, record_cells, records_to_batch, Cell};
use crate::error::{Error, Result};
use crate::record::WeatherRecord;
use crate::types::{OutputFormat, UnitSystem};
use arrow::json::writer::{LineDelimited, WriterBuilder as JsonWriterBuilder};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 64 * 1024,
        }
    }
}

impl ParquetWriterConfig {
    /// Compression in use
    #[must_use]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Build writer properties
    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Options shared by every format
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Unit system of every record
    pub units: UnitSystem,
    /// CSV token for absent values
    pub csv_null: String,
    /// Parquet settings
    pub parquet: ParquetWriterConfig,
}

impl FormatOptions {
    pub fn new(units: UnitSystem) -> Self {
        Self {
            units,
            csv_null: "null".to_string(),
            parquet: ParquetWriterConfig::default(),
        }
    }
}

/// Serialize records into `file` in the given format; returns rows written
pub fn write_records(
    file: File,
    format: OutputFormat,
    records: &[WeatherRecord],
    options: &FormatOptions,
) -> Result<usize> {
    match format {
        OutputFormat::Csv => write_csv(file, records, options.units, &options.csv_null),
        OutputFormat::Json => write_json_lines(file, records, options.units),
        OutputFormat::Parquet => write_parquet(file, records, options.units, &options.parquet),
    }
}

/// Header row plus one row per record; absent values become `null_token`
pub fn write_csv(
    file: File,
    records: &[WeatherRecord],
    units: UnitSystem,
    null_token: &str,
) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));

    let names = column_names(units);
    writer.write_record(&names)?;
    for record in records {
        let cells = record_cells(record);
        let collision = names
            .iter()
            .zip(&cells)
            .find(|(_, cell)| matches!(cell, Cell::Text(text) if text == null_token));
        if let Some((column, _)) = collision {
            return Err(Error::Other(format!(
                "{}: value of '{column}' equals the CSV null token '{null_token}'",
                record.city_id()
            )));
        }
        writer.write_record(cells.iter().map(|c| c.render(null_token)))?;
    }

    let mut inner = writer.into_inner().map_err(|e| e.into_error())?;
    inner.flush()?;
    inner.get_ref().sync_all()?;
    Ok(records.len())
}

/// One JSON object per line; absent values are explicit `null`
pub fn write_json_lines(file: File, records: &[WeatherRecord], units: UnitSystem) -> Result<usize> {
    let batch = records_to_batch(records, units)?;

    let mut writer = JsonWriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, LineDelimited>(BufWriter::new(file));
    writer.write(&batch)?;
    writer.finish()?;

    let mut inner = writer.into_inner();
    inner.flush()?;
    inner.get_ref().sync_all()?;
    Ok(batch.num_rows())
}

/// Single Parquet file holding all records
pub fn write_parquet(
    file: File,
    records: &[WeatherRecord],
    units: UnitSystem,
    config: &ParquetWriterConfig,
) -> Result<usize> {
    let batch = records_to_batch(records, units)?;

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(config.build_properties()))?;
    writer.write(&batch)?;
    let file = writer.into_inner()?;
    file.sync_all()?;

    Ok(batch.num_rows())
}

/// Read every record back from a Parquet file
pub fn read_parquet_records(path: impl AsRef<Path>) -> Result<Vec<WeatherRecord>> {
    let file = File::open(path.as_ref())?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut records = Vec::new();
    for batch in reader {
        records.extend(super::schema::batch_to_records(&batch?)?);
    }
    Ok(records)
}
