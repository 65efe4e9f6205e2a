//! GeoJSON artifact format.
//!
//! A FeatureCollection with one Point feature per visible (time, cell) row.
//! The grid and the full dekad axis travel as foreign members so the
//! collection parses back into the exact table it came from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use drought_common::series::is_missing;
use drought_common::{Dekad, DroughtError, DroughtResult, GridSpec};

use crate::artifact::{Column, LabelColumn, SeriesTable};

#[derive(Debug, Serialize, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    type_: String,
    grid: GridSpec,
    times: Vec<Dekad>,
    columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label_column: Option<String>,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Feature {
    #[serde(rename = "type")]
    type_: String,
    geometry: Geometry,
    properties: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Point { coordinates: [f64; 2] },
}

/// Serialize a table as a GeoJSON FeatureCollection.
pub fn write(table: &SeriesTable) -> DroughtResult<Vec<u8>> {
    let cells = table.grid.num_cells();
    let mut features = Vec::new();

    for (t, dekad) in table.times.iter().enumerate() {
        for cell in 0..cells {
            let row = t * cells + cell;
            if !table.row_visible(row) {
                continue;
            }

            let (lon, lat) = table.grid.index_to_coords(cell);
            let mut properties = Map::new();
            properties.insert("date".to_string(), Value::String(dekad.to_string()));
            for col in &table.columns {
                let v = col.values[row];
                let value = if is_missing(v) {
                    Value::Null
                } else {
                    serde_json::Number::from_f64(v as f64)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                };
                properties.insert(col.name.clone(), value);
            }
            if let Some(labels) = &table.labels {
                let value = match &labels.values[row] {
                    Some(s) => Value::String(s.clone()),
                    None => Value::Null,
                };
                properties.insert(labels.name.clone(), value);
            }

            features.push(Feature {
                type_: "Feature".to_string(),
                geometry: Geometry::Point {
                    coordinates: [lon, lat],
                },
                properties,
            });
        }
    }

    let collection = FeatureCollection {
        type_: "FeatureCollection".to_string(),
        grid: table.grid,
        times: table.times.clone(),
        columns: table.columns.iter().map(|c| c.name.clone()).collect(),
        label_column: table.labels.as_ref().map(|l| l.name.clone()),
        features,
    };

    Ok(serde_json::to_vec_pretty(&collection)?)
}

/// Parse a GeoJSON FeatureCollection back into a table.
pub fn read(bytes: &[u8]) -> DroughtResult<SeriesTable> {
    let collection: FeatureCollection = serde_json::from_slice(bytes)?;
    let cells = collection.grid.num_cells();
    let rows = collection.times.len() * cells;

    let mut table = SeriesTable {
        grid: collection.grid,
        times: collection.times,
        columns: collection
            .columns
            .iter()
            .map(|name| Column {
                name: name.clone(),
                values: vec![f32::NAN; rows],
            })
            .collect(),
        labels: collection.label_column.map(|name| LabelColumn {
            name,
            values: vec![None; rows],
        }),
        mask: vec![true; rows],
    };

    let mut seen = vec![false; rows];
    for feature in collection.features {
        let Geometry::Point {
            coordinates: [lon, lat],
        } = feature.geometry;
        let cell = table.grid.nearest_index(lon, lat);

        let date = feature
            .properties
            .get("date")
            .and_then(Value::as_str)
            .ok_or_else(|| DroughtError::artifact("feature without a date property"))?;
        let t = table
            .times
            .iter()
            .position(|dk| dk.to_string() == date)
            .ok_or_else(|| {
                DroughtError::artifact(format!("feature date {} not on the time axis", date))
            })?;

        let row = t * cells + cell;
        seen[row] = true;
        for col in &mut table.columns {
            col.values[row] = match feature.properties.get(&col.name) {
                Some(Value::Number(n)) => n.as_f64().map(|v| v as f32).unwrap_or(f32::NAN),
                _ => f32::NAN,
            };
        }
        if let Some(labels) = &mut table.labels {
            labels.values[row] = feature
                .properties
                .get(&labels.name)
                .and_then(Value::as_str)
                .map(|s| s.to_string());
        }
    }

    table.restore_hidden_rows(&seen);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use drought_common::series::{is_outside, OUTSIDE_AREA};
    use drought_common::BoundingBox;

    fn dekad(y: i32, m: u32, d: u32) -> Dekad {
        Dekad::containing(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn sample_table() -> SeriesTable {
        let grid = GridSpec::new(BoundingBox::new(0.0, 50.0, 2.0, 51.0), 2, 1);
        let times = vec![dekad(2022, 1, 1), dekad(2022, 1, 11)];
        SeriesTable {
            grid,
            times,
            columns: vec![Column {
                name: "spi".to_string(),
                // cell 1 is outside the requested polygon throughout
                values: vec![-1.2, OUTSIDE_AREA, f32::NAN, OUTSIDE_AREA],
            }],
            labels: None,
            mask: vec![true, false, true, false],
        }
    }

    #[test]
    fn test_write_skips_outside_cells() {
        let bytes = write(&sample_table()).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let features = parsed["features"].as_array().unwrap();
        // two times, one inside cell; the missing value is kept as a gap
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["properties"]["spi"], serde_json::json!(-1.2));
        assert!(features[1]["properties"]["spi"].is_null());
    }

    #[test]
    fn test_roundtrip_preserves_sentinels() {
        let table = sample_table();
        let bytes = write(&table).unwrap();
        let back = read(&bytes).unwrap();

        assert_eq!(back.grid, table.grid);
        assert_eq!(back.times, table.times);
        let col = back.column("spi").unwrap();
        assert_eq!(col.values[0], -1.2);
        assert!(is_outside(col.values[1]));
        assert!(col.values[2].is_nan());
        assert!(is_outside(col.values[3]));
    }

    #[test]
    fn test_write_is_deterministic() {
        let table = sample_table();
        assert_eq!(write(&table).unwrap(), write(&table).unwrap());
    }

    #[test]
    fn test_labels_roundtrip() {
        let mut table = sample_table();
        table.labels = Some(LabelColumn {
            name: "status".to_string(),
            values: vec![Some("Watch".to_string()), None, None, None],
        });
        let bytes = write(&table).unwrap();
        let back = read(&bytes).unwrap();
        let labels = back.labels.unwrap();
        assert_eq!(labels.values[0].as_deref(), Some("Watch"));
        assert_eq!(labels.values[2], None);
    }
}
