//! Fixed column schema of the output dataset
//!
//! Every format writes the same columns in the same order. Unit-bearing
//! column names carry the run's unit suffix, so the schema is a function of
//! the [`UnitSystem`] alone.

use crate::error::{Error, Result};
use crate::record::{WeatherRecord, TIMESTAMP_FORMAT};
use crate::types::UnitSystem;
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;

/// Physical type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Utf8,
    Float64,
    Int64,
}

impl ColumnType {
    fn data_type(self) -> DataType {
        match self {
            Self::Utf8 => DataType::Utf8,
            Self::Float64 => DataType::Float64,
            Self::Int64 => DataType::Int64,
        }
    }
}

/// One output column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl ColumnDef {
    fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Utf8,
            nullable: false,
        }
    }

    fn optional(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
        }
    }
}

/// A single value ready for a text format
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Float(f64),
    Int(i64),
    Null,
}

impl Cell {
    /// Text rendering with the given absent-value token
    pub fn render(&self, null_token: &str) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Float(f) => f.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Null => null_token.to_string(),
        }
    }
}

/// Columns in output order
pub fn columns(units: UnitSystem) -> Vec<ColumnDef> {
    let t = units.temperature_suffix();
    let w = units.wind_speed_suffix();

    vec![
        ColumnDef::required("city"),
        ColumnDef::required("country"),
        ColumnDef::required("timestamp"),
        ColumnDef::required("utc_offset"),
        ColumnDef::optional("weather", ColumnType::Utf8),
        ColumnDef::optional("weather_description", ColumnType::Utf8),
        ColumnDef::optional(format!("temperature_current_{t}"), ColumnType::Float64),
        ColumnDef::optional(format!("temperature_min_{t}"), ColumnType::Float64),
        ColumnDef::optional(format!("temperature_max_{t}"), ColumnType::Float64),
        ColumnDef::optional(format!("temperature_feels_like_{t}"), ColumnType::Float64),
        ColumnDef::optional("pressure_hpa", ColumnType::Int64),
        ColumnDef::optional("humidity_pct", ColumnType::Int64),
        ColumnDef::optional("cloudiness_pct", ColumnType::Int64),
        ColumnDef::optional(format!("wind_speed_{w}"), ColumnType::Float64),
        ColumnDef::optional("wind_direction_deg", ColumnType::Float64),
        ColumnDef::optional("wind_direction", ColumnType::Utf8),
        ColumnDef::optional("sunrise", ColumnType::Utf8),
        ColumnDef::optional("sunset", ColumnType::Utf8),
        ColumnDef::required("units"),
    ]
}

/// Column names in output order
pub fn column_names(units: UnitSystem) -> Vec<String> {
    columns(units).into_iter().map(|c| c.name).collect()
}

/// Arrow schema for the given unit system
pub fn record_schema(units: UnitSystem) -> SchemaRef {
    let fields: Vec<Field> = columns(units)
        .into_iter()
        .map(|c| Field::new(c.name, c.column_type.data_type(), c.nullable))
        .collect();
    Arc::new(Schema::new(fields))
}

fn text(value: &Option<String>) -> Cell {
    value.as_ref().map_or(Cell::Null, |s| Cell::Text(s.clone()))
}

fn float(value: Option<f64>) -> Cell {
    value.map_or(Cell::Null, Cell::Float)
}

fn int(value: Option<i64>) -> Cell {
    value.map_or(Cell::Null, Cell::Int)
}

fn instant(value: Option<DateTime<Utc>>) -> Cell {
    value.map_or(Cell::Null, |at| Cell::Text(at.format(TIMESTAMP_FORMAT).to_string()))
}

/// A record's values in column order
pub fn record_cells(record: &WeatherRecord) -> Vec<Cell> {
    vec![
        Cell::Text(record.city.clone()),
        Cell::Text(record.country.clone()),
        Cell::Text(record.timestamp_text()),
        Cell::Text(record.utc_offset.clone()),
        text(&record.weather),
        text(&record.weather_description),
        float(record.temperature_current),
        float(record.temperature_min),
        float(record.temperature_max),
        float(record.temperature_feels_like),
        int(record.pressure),
        int(record.humidity),
        int(record.cloudiness),
        float(record.wind_speed),
        float(record.wind_direction_deg),
        text(&record.wind_direction),
        instant(record.sunrise),
        instant(record.sunset),
        Cell::Text(record.units.as_str().to_string()),
    ]
}

/// Build an Arrow batch from records sharing one unit system
pub fn records_to_batch(records: &[WeatherRecord], units: UnitSystem) -> Result<RecordBatch> {
    let rows: Vec<Vec<Cell>> = records.iter().map(record_cells).collect();
    let schema = record_schema(units);

    let arrays = columns(units)
        .iter()
        .enumerate()
        .map(|(i, column)| build_array(&rows, i, column.column_type))
        .collect();

    Ok(RecordBatch::try_new(schema, arrays)?)
}

fn build_array(rows: &[Vec<Cell>], index: usize, column_type: ColumnType) -> ArrayRef {
    let cells = rows.iter().map(|row| &row[index]);
    match column_type {
        ColumnType::Utf8 => {
            let arr: StringArray = cells
                .map(|c| match c {
                    Cell::Text(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect();
            Arc::new(arr)
        }
        ColumnType::Float64 => {
            let arr: Float64Array = cells
                .map(|c| match c {
                    Cell::Float(f) => Some(*f),
                    _ => None,
                })
                .collect();
            Arc::new(arr)
        }
        ColumnType::Int64 => {
            let arr: Int64Array = cells
                .map(|c| match c {
                    Cell::Int(i) => Some(*i),
                    _ => None,
                })
                .collect();
            Arc::new(arr)
        }
    }
}

// ============================================================================
// Read-back
// ============================================================================

/// Rebuild records from a batch written by [`records_to_batch`]
pub fn batch_to_records(batch: &RecordBatch) -> Result<Vec<WeatherRecord>> {
    let expected = columns(units_of(batch)?);
    if batch.num_columns() != expected.len() {
        return Err(Error::Other(format!(
            "expected {} columns, found {}",
            expected.len(),
            batch.num_columns()
        )));
    }

    let utf8 = |i: usize| string_column(batch, i, &expected[i].name);
    let f64s = |i: usize| float_column(batch, i, &expected[i].name);
    let i64s = |i: usize| int_column(batch, i, &expected[i].name);

    let (city, country, timestamp, utc_offset) = (utf8(0)?, utf8(1)?, utf8(2)?, utf8(3)?);
    let (weather, description) = (utf8(4)?, utf8(5)?);
    let (current, min, max, feels_like) = (f64s(6)?, f64s(7)?, f64s(8)?, f64s(9)?);
    let (pressure, humidity, cloudiness) = (i64s(10)?, i64s(11)?, i64s(12)?);
    let (wind_speed, wind_deg, wind_dir) = (f64s(13)?, f64s(14)?, utf8(15)?);
    let (sunrise, sunset, units) = (utf8(16)?, utf8(17)?, utf8(18)?);

    (0..batch.num_rows())
        .map(|row| {
            let units_text = opt_str(units, row).unwrap_or_default();
            Ok(WeatherRecord {
                city: opt_str(city, row).unwrap_or_default(),
                country: opt_str(country, row).unwrap_or_default(),
                observed_at: parse_instant(timestamp, row)?.ok_or_else(|| {
                    Error::Other(format!("row {row} has no timestamp"))
                })?,
                utc_offset: opt_str(utc_offset, row).unwrap_or_default(),
                weather: opt_str(weather, row),
                weather_description: opt_str(description, row),
                temperature_current: opt_f64(current, row),
                temperature_min: opt_f64(min, row),
                temperature_max: opt_f64(max, row),
                temperature_feels_like: opt_f64(feels_like, row),
                pressure: opt_i64(pressure, row),
                humidity: opt_i64(humidity, row),
                cloudiness: opt_i64(cloudiness, row),
                wind_speed: opt_f64(wind_speed, row),
                wind_direction_deg: opt_f64(wind_deg, row),
                wind_direction: opt_str(wind_dir, row),
                sunrise: parse_instant(sunrise, row)?,
                sunset: parse_instant(sunset, row)?,
                units: UnitSystem::parse(&units_text).ok_or_else(|| {
                    Error::Other(format!("row {row} has unknown units '{units_text}'"))
                })?,
            })
        })
        .collect()
}

/// Unit system implied by the batch's temperature column name
fn units_of(batch: &RecordBatch) -> Result<UnitSystem> {
    let schema = batch.schema();
    [UnitSystem::Metric, UnitSystem::Imperial, UnitSystem::Default]
        .into_iter()
        .find(|units| {
            let name = format!("temperature_current_{}", units.temperature_suffix());
            schema.column_with_name(&name).is_some()
        })
        .ok_or_else(|| Error::Other("batch has no temperature column".to_string()))
}

fn string_column<'a>(batch: &'a RecordBatch, i: usize, name: &str) -> Result<&'a StringArray> {
    batch
        .column(i)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Other(format!("column '{name}' is not Utf8")))
}

fn float_column<'a>(batch: &'a RecordBatch, i: usize, name: &str) -> Result<&'a Float64Array> {
    batch
        .column(i)
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::Other(format!("column '{name}' is not Float64")))
}

fn int_column<'a>(batch: &'a RecordBatch, i: usize, name: &str) -> Result<&'a Int64Array> {
    batch
        .column(i)
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| Error::Other(format!("column '{name}' is not Int64")))
}

fn opt_str(array: &StringArray, row: usize) -> Option<String> {
    array.is_valid(row).then(|| array.value(row).to_string())
}

fn opt_f64(array: &Float64Array, row: usize) -> Option<f64> {
    array.is_valid(row).then(|| array.value(row))
}

fn opt_i64(array: &Int64Array, row: usize) -> Option<i64> {
    array.is_valid(row).then(|| array.value(row))
}

fn parse_instant(array: &StringArray, row: usize) -> Result<Option<DateTime<Utc>>> {
    opt_str(array, row)
        .map(|text| {
            NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT)
                .map(|naive| naive.and_utc())
                .map_err(|e| Error::Other(format!("row {row}: bad instant '{text}': {e}")))
        })
        .transpose()
}
