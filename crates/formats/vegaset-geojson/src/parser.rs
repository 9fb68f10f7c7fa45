//! `GeoJSON` parsing into flat feature records.

use std::fmt;

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue};
use vegaset_formats_shared::{FormatReadError, FormatResult, SourcePosition};

/// Parsed `GeoJSON` feature with materialized properties and geometry.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    /// Feature identifier, rendered as text
    pub id: Option<String>,
    pub properties: JsonObject,
    pub geometry: Option<Geometry>,
}

/// Parse raw bytes into a vector of `FeatureRecord`s.
///
/// Accepts a `FeatureCollection`, a single `Feature` or `Geometry`, or a
/// newline-delimited sequence of those.
///
/// # Errors
///
/// Returns [`FormatReadError::Parse`] when the bytes are neither a `GeoJSON`
/// document nor a `GeoJSON` sequence. `TopoJSON` documents fail here too.
pub fn parse_geojson_bytes(
    bytes: &[u8],
    context: impl Into<String>,
) -> FormatResult<Vec<FeatureRecord>> {
    let context = context.into();
    let reader = std::io::Cursor::new(bytes);

    match GeoJson::from_reader(reader) {
        Ok(geojson) => Ok(geojson_to_records(geojson)),
        Err(primary_err) => {
            let primary_err_message = primary_err.to_string();
            match parse_geojson_sequence(bytes, &context) {
                Ok(records) => Ok(records),
                Err(sequence_err) => {
                    Err(combine_errors(&primary_err_message, &sequence_err, context))
                },
            }
        },
    }
}

fn geojson_to_records(geojson: GeoJson) -> Vec<FeatureRecord> {
    match geojson {
        GeoJson::FeatureCollection(collection) => feature_collection_to_records(collection),
        GeoJson::Feature(feature) => vec![feature_to_record(feature)],
        GeoJson::Geometry(geometry) => vec![FeatureRecord {
            id: None,
            properties: JsonObject::new(),
            geometry: Some(geometry),
        }],
    }
}

fn feature_collection_to_records(collection: FeatureCollection) -> Vec<FeatureRecord> {
    collection
        .features
        .into_iter()
        .map(feature_to_record)
        .collect()
}

fn feature_to_record(feature: Feature) -> FeatureRecord {
    let id = feature.id.map(|id| match id {
        geojson::feature::Id::String(text) => text,
        geojson::feature::Id::Number(number) => number.to_string(),
    });

    FeatureRecord {
        id,
        properties: feature.properties.unwrap_or_default(),
        geometry: feature.geometry,
    }
}

fn parse_geojson_sequence(bytes: &[u8], context: &str) -> FormatResult<Vec<FeatureRecord>> {
    let mut records = Vec::new();
    for (line_idx, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
        let line_number = (line_idx + 1) as u64;
        let position = Some(SourcePosition {
            line: Some(line_number),
            ..SourcePosition::default()
        });
        let line = match std::str::from_utf8(raw_line) {
            Ok(line) => line.trim(),
            Err(err) => {
                return Err(FormatReadError::Parse {
                    message: format!("GeoJSON line is not valid UTF-8: {err}"),
                    position,
                    context: Some(context.to_string()),
                });
            },
        };

        if line.is_empty() {
            continue;
        }

        let geojson = line
            .parse::<GeoJson>()
            .map_err(|err| FormatReadError::Parse {
                message: format!("Failed to parse GeoJSON feature: {err}"),
                position,
                context: Some(context.to_string()),
            })?;

        records.append(&mut geojson_to_records(geojson));
    }

    if records.is_empty() {
        Err(FormatReadError::Parse {
            message: "No GeoJSON features found".to_string(),
            position: None,
            context: Some(context.to_string()),
        })
    } else {
        Ok(records)
    }
}

fn combine_errors(
    collection_err: &str,
    sequence_err: &FormatReadError,
    context: String,
) -> FormatReadError {
    let message = format!(
        "Failed to parse GeoJSON as FeatureCollection ({collection_err}); \
         also failed to parse as GeoJSON sequence: {sequence_err}"
    );
    FormatReadError::Parse {
        message,
        position: None,
        context: Some(context),
    }
}

impl FeatureRecord {
    /// Flattens the record into one JSON object: properties, then `id` and `geometry`.
    ///
    /// The geometry is kept as `GeoJSON` text so the table stays free of nested types.
    /// Properties named `id` or `geometry` are shadowed.
    #[must_use]
    pub fn into_row(self) -> JsonObject {
        let mut row = self.properties;
        row.insert(
            "id".to_string(),
            self.id.map_or(JsonValue::Null, JsonValue::String),
        );
        row.insert(
            "geometry".to_string(),
            self.geometry
                .map_or(JsonValue::Null, |g| JsonValue::String(g.to_string())),
        );
        row
    }
}

impl fmt::Display for FeatureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let geom = if self.geometry.is_some() {
            "Some(Geometry)"
        } else {
            "None"
        };
        write!(
            f,
            "FeatureRecord {{ id: {:?}, properties: {} keys, geometry: {geom} }}",
            self.id,
            self.properties.len()
        )
    }
}
