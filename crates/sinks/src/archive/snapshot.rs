//! CSV snapshot of a record batch

use bytes::Bytes;
use csv::{Terminator, WriterBuilder};
use tempest_protocol::{AlertRecord, RecordField};

use crate::common::SinkError;

use super::ARCHIVE;

/// Header line plus one line per record, columns in `RecordField::ALL` order
///
/// Line breaks inside values are flattened to spaces so a snapshot of `n`
/// records always has exactly `n + 1` lines.
///
/// # Errors
///
/// Returns `SinkError::Delivery` if the writer fails.
pub fn serialize_snapshot(records: &[AlertRecord]) -> Result<Bytes, SinkError> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(128 * (records.len() + 1)));

    writer
        .write_record(RecordField::ALL.iter().map(|f| f.as_str()))
        .map_err(csv_error)?;

    for record in records {
        writer
            .write_record(record.row().iter().map(|v| flatten(v)))
            .map_err(csv_error)?;
    }

    let body = writer
        .into_inner()
        .map_err(|e| SinkError::delivery(ARCHIVE, format!("snapshot flush: {e}")))?;
    Ok(Bytes::from(body))
}

fn flatten(value: &str) -> String {
    if value.contains(['\n', '\r']) {
        value.replace("\r\n", " ").replace(['\n', '\r'], " ")
    } else {
        value.to_string()
    }
}

fn csv_error(e: csv::Error) -> SinkError {
    SinkError::delivery(ARCHIVE, format!("snapshot write: {e}"))
}
