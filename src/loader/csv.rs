use crate::config::LoadOptions;
use crate::error::RustyPbixError;
use crate::table::infer_scalar;
use crate::table::Scalar;
use csv::ReaderBuilder;
use csv::StringRecord;

/// Reads delimited text. Records may be ragged; `Table::new` pads short ones
/// and rejects long ones.
pub(super) fn read_csv(bytes: &[u8], options: &LoadOptions) -> Result<(Vec<String>, Vec<Vec<Scalar>>), RustyPbixError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.csv_delimiter as u8)
        .from_reader(bytes);

    let mut records = reader.records();
    let first = match records.next() {
        Some(record) => record?,
        None => Err(RustyPbixError::MalformedInputError("no header record".to_owned()))?,
    };

    let mut rows = Vec::<Vec<Scalar>>::new();
    let names = if options.header {
        first.iter().map(|name| name.trim().to_owned()).collect()
    } else {
        rows.push(to_row(&first, options));
        (1..=first.len()).map(|index| format!("column{index}")).collect()
    };
    for record in records {
        rows.push(to_row(&record?, options));
    }
    Ok((names, rows))
}

fn to_row(record: &StringRecord, options: &LoadOptions) -> Vec<Scalar> {
    record.iter().map(|field| infer_scalar(field, options)).collect()
}
