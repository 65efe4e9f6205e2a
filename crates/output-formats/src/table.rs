//! Tabular CSV artifact format.
//!
//! Two comment lines carry the grid and the full dekad axis, then a header
//! and one row per visible (time, cell). Missing values serialize as empty
//! fields so sparse runs keep their gaps.

use drought_common::series::is_missing;
use drought_common::{BoundingBox, Dekad, DroughtError, DroughtResult, GridSpec};
use chrono::NaiveDate;

use crate::artifact::{Column, LabelColumn, SeriesTable};

/// Serialize a table as CSV.
pub fn write(table: &SeriesTable) -> Vec<u8> {
    let mut out = String::new();
    let bbox = table.grid.bbox;
    out.push_str(&format!(
        "# grid {} {} {} {} {} {}\n",
        bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat, table.grid.width, table.grid.height
    ));
    let times: Vec<String> = table.times.iter().map(|dk| dk.to_string()).collect();
    out.push_str(&format!("# times {}\n", times.join(",")));

    out.push_str("date,lat,lon");
    for col in &table.columns {
        out.push(',');
        out.push_str(&col.name);
    }
    if let Some(labels) = &table.labels {
        out.push(',');
        out.push_str(&labels.name);
    }
    out.push('\n');

    let cells = table.grid.num_cells();
    for (t, dekad) in table.times.iter().enumerate() {
        for cell in 0..cells {
            let row = t * cells + cell;
            if !table.row_visible(row) {
                continue;
            }
            let (lon, lat) = table.grid.index_to_coords(cell);
            out.push_str(&format!("{},{:.6},{:.6}", dekad, lat, lon));
            for col in &table.columns {
                out.push(',');
                let v = col.values[row];
                if !is_missing(v) {
                    out.push_str(&format!("{}", v));
                }
            }
            if let Some(labels) = &table.labels {
                out.push(',');
                if let Some(s) = &labels.values[row] {
                    out.push_str(s);
                }
            }
            out.push('\n');
        }
    }

    out.into_bytes()
}

/// Parse a CSV artifact back into a table.
pub fn read(bytes: &[u8]) -> DroughtResult<SeriesTable> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DroughtError::artifact(format!("artifact is not UTF-8: {}", e)))?;
    let mut lines = text.lines();

    let grid = parse_grid_line(
        lines
            .next()
            .ok_or_else(|| DroughtError::artifact("empty CSV artifact"))?,
    )?;
    let times = parse_times_line(
        lines
            .next()
            .ok_or_else(|| DroughtError::artifact("CSV artifact missing times line"))?,
    )?;
    let header = lines
        .next()
        .ok_or_else(|| DroughtError::artifact("CSV artifact missing header"))?;
    let names: Vec<&str> = header.split(',').collect();
    if names.len() < 3 || names[0] != "date" {
        return Err(DroughtError::artifact("unexpected CSV header"));
    }

    // any trailing non-numeric column is the label column; detect by probing
    // the first data row
    let value_names: Vec<String> = names[3..].iter().map(|s| s.to_string()).collect();
    let cells = grid.num_cells();
    let rows = times.len() * cells;

    let mut columns: Vec<Column> = Vec::new();
    let mut labels: Option<LabelColumn> = None;
    for (i, name) in value_names.iter().enumerate() {
        let is_label = i == value_names.len() - 1 && name == "status";
        if is_label {
            labels = Some(LabelColumn {
                name: name.clone(),
                values: vec![None; rows],
            });
        } else {
            columns.push(Column {
                name: name.clone(),
                values: vec![f32::NAN; rows],
            });
        }
    }

    let mut table = SeriesTable {
        grid,
        times,
        columns,
        labels,
        mask: vec![true; rows],
    };
    let mut seen = vec![false; rows];

    for line in lines {
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != names.len() {
            return Err(DroughtError::artifact(format!(
                "CSV row has {} fields, header has {}",
                fields.len(),
                names.len()
            )));
        }

        let date = NaiveDate::parse_from_str(fields[0], "%Y-%m-%d")
            .map_err(|e| DroughtError::artifact(format!("bad date '{}': {}", fields[0], e)))?;
        let t = table
            .times
            .iter()
            .position(|dk| dk.start() == date)
            .ok_or_else(|| {
                DroughtError::artifact(format!("row date {} not on the time axis", date))
            })?;
        let lat: f64 = fields[1]
            .parse()
            .map_err(|_| DroughtError::artifact(format!("bad latitude '{}'", fields[1])))?;
        let lon: f64 = fields[2]
            .parse()
            .map_err(|_| DroughtError::artifact(format!("bad longitude '{}'", fields[2])))?;
        let cell = table.grid.nearest_index(lon, lat);
        let row = t * cells + cell;
        seen[row] = true;

        let mut field_idx = 3;
        for col in &mut table.columns {
            let raw = fields[field_idx];
            col.values[row] = if raw.is_empty() {
                f32::NAN
            } else {
                raw.parse()
                    .map_err(|_| DroughtError::artifact(format!("bad value '{}'", raw)))?
            };
            field_idx += 1;
        }
        if let Some(labels) = &mut table.labels {
            let raw = fields[field_idx];
            labels.values[row] = if raw.is_empty() {
                None
            } else {
                Some(raw.to_string())
            };
        }
    }

    table.restore_hidden_rows(&seen);
    Ok(table)
}

fn parse_grid_line(line: &str) -> DroughtResult<GridSpec> {
    let rest = line
        .strip_prefix("# grid ")
        .ok_or_else(|| DroughtError::artifact("CSV artifact missing grid line"))?;
    let parts: Vec<&str> = rest.split_whitespace().collect();
    if parts.len() != 6 {
        return Err(DroughtError::artifact("malformed grid line"));
    }
    let nums: Vec<f64> = parts[..4]
        .iter()
        .map(|p| p.parse())
        .collect::<Result<_, _>>()
        .map_err(|_| DroughtError::artifact("malformed grid bounds"))?;
    let width: usize = parts[4]
        .parse()
        .map_err(|_| DroughtError::artifact("malformed grid width"))?;
    let height: usize = parts[5]
        .parse()
        .map_err(|_| DroughtError::artifact("malformed grid height"))?;
    Ok(GridSpec::new(
        BoundingBox::new(nums[0], nums[1], nums[2], nums[3]),
        width,
        height,
    ))
}

fn parse_times_line(line: &str) -> DroughtResult<Vec<Dekad>> {
    let rest = line
        .strip_prefix("# times ")
        .ok_or_else(|| DroughtError::artifact("CSV artifact missing times line"))?;
    rest.split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Dekad::containing)
                .map_err(|e| DroughtError::artifact(format!("bad time '{}': {}", s, e)))
        })
        .collect()
}
