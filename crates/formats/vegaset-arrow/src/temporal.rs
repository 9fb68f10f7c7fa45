//! Column hints that refine inferred text columns into temporal types.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_cast::cast::{CastOptions, cast_with_options};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use log::debug;
use vegaset_core_common::LogicalType;
use vegaset_formats_shared::FormatResult;

/// Arrow type a hinted text column is parsed into.
#[must_use]
pub fn hinted_type(logical: LogicalType) -> Option<DataType> {
    match logical {
        LogicalType::Date => Some(DataType::Date32),
        LogicalType::Datetime => Some(DataType::Timestamp(TimeUnit::Millisecond, None)),
        _ => None,
    }
}

/// Parses hinted `Utf8` columns into their temporal types.
///
/// A column is converted only if every value parses. Otherwise it is left as
/// text, so published hints never make an artifact unreadable.
///
/// # Errors
///
/// Returns an error only if the rebuilt batch is inconsistent, which would be a bug.
pub fn apply_column_hints(
    batch: RecordBatch,
    hints: &BTreeMap<String, LogicalType>,
) -> FormatResult<RecordBatch> {
    if hints.is_empty() {
        return Ok(batch);
    }

    let schema = batch.schema();
    let strict = CastOptions {
        safe: false,
        ..CastOptions::default()
    };
    let mut changed = false;
    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut columns = Vec::with_capacity(batch.num_columns());

    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let target = hints.get(field.name()).copied().and_then(hinted_type);
        match target {
            Some(data_type) if field.data_type() == &DataType::Utf8 => {
                match cast_with_options(column.as_ref(), &data_type, &strict) {
                    Ok(parsed) => {
                        fields.push(Arc::new(Field::clone(field).with_data_type(data_type)));
                        columns.push(parsed);
                        changed = true;
                    },
                    Err(err) => {
                        debug!("Leaving column '{}' as text: {err}", field.name());
                        fields.push(Arc::clone(field));
                        columns.push(Arc::clone(column));
                    },
                }
            },
            _ => {
                fields.push(Arc::clone(field));
                columns.push(Arc::clone(column));
            },
        }
    }

    if !changed {
        return Ok(batch);
    }
    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

#[cfg(test)]
mod tests {
    use arrow_array::{ArrayRef, Int64Array, StringArray};

    use super::*;

    fn batch(dates: Vec<&str>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("date", DataType::Utf8, false),
            Field::new("count", DataType::Int64, false),
        ]));
        let count = Int64Array::from_iter_values(0..i64::try_from(dates.len()).unwrap());
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(dates)) as ArrayRef,
                Arc::new(count) as ArrayRef,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_date_hint_parses_iso_dates() {
        let hints = BTreeMap::from([("date".to_string(), LogicalType::Date)]);
        let parsed = apply_column_hints(batch(vec!["2012-01-01", "2012-01-02"]), &hints).unwrap();

        assert_eq!(parsed.schema().field(0).data_type(), &DataType::Date32);
        assert_eq!(parsed.schema().field(1).data_type(), &DataType::Int64);
    }

    #[test]
    fn test_unparseable_dates_stay_text() {
        let hints = BTreeMap::from([("date".to_string(), LogicalType::Date)]);
        let parsed = apply_column_hints(batch(vec!["Jan 1 2000", "Feb 1 2000"]), &hints).unwrap();

        assert_eq!(parsed.schema().field(0).data_type(), &DataType::Utf8);
    }

    #[test]
    fn test_datetime_hint() {
        let hints = BTreeMap::from([("date".to_string(), LogicalType::Datetime)]);
        let parsed = apply_column_hints(batch(vec!["2010-01-01T06:30:00"]), &hints).unwrap();

        assert_eq!(
            parsed.schema().field(0).data_type(),
            &DataType::Timestamp(TimeUnit::Millisecond, None)
        );
    }

    #[test]
    fn test_non_temporal_hints_are_ignored() {
        let hints = BTreeMap::from([("count".to_string(), LogicalType::String)]);
        let original = batch(vec!["2012-01-01"]);
        let parsed = apply_column_hints(original.clone(), &hints).unwrap();

        assert_eq!(parsed, original);
    }
}
