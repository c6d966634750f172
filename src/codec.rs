//! CSV encoding of datasets.
//!
//! Header names are kept byte-for-byte since they double as lookup keys.
//! A header naming a column twice is rejected. Short rows are padded with
//! empty cells; rows longer than the header are rejected.

use itertools::Itertools as _;

use crate::{
    ErrorContext, ErrorDetail,
    record::{Dataset, Row},
};

pub fn decode(ctx: &ErrorContext, bytes: &[u8]) -> Result<Dataset, crate::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let header = reader
        .headers()
        .map_err(|error| ctx.error(ErrorDetail::Decode(error)))?
        .iter()
        .map(str::to_owned)
        .collect::<Vec<_>>();
    let duplicates = header.iter().duplicates().cloned().collect::<Vec<_>>();
    if !duplicates.is_empty() {
        return Err(ctx.with_line(1).error(ErrorDetail::DuplicateColumns(duplicates)));
    }
    let mut dataset = Dataset::new(header.clone());
    for record in reader.records() {
        let record = record.map_err(|error| ctx.error(ErrorDetail::Decode(error)))?;
        if record.len() > header.len() {
            let line = record.position().map(|pos| pos.line()).unwrap_or_default();
            return Err(ctx.with_line(line).error(ErrorDetail::RowWidth {
                expected: header.len(),
                got: record.len(),
            }));
        }
        let row = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), record.get(i).unwrap_or_default()))
            .collect::<Row>();
        dataset.push(row);
    }
    Ok(dataset)
}

pub fn encode(ctx: &ErrorContext, dataset: &Dataset) -> Result<Vec<u8>, crate::Error> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    if !dataset.header().is_empty() {
        writer
            .write_record(dataset.header())
            .map_err(|error| ctx.error(ErrorDetail::Encode(error)))?;
    }
    for row in dataset.rows() {
        writer
            .write_record(dataset.header().iter().map(|column| row.text(column)))
            .map_err(|error| ctx.error(ErrorDetail::Encode(error)))?;
    }
    writer
        .into_inner()
        .map_err(|error| ctx.error(ErrorDetail::Encode(error.into_error().into())))
}
