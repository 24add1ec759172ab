//! Road test cases stored as json.
//!
//! A file holds an array of records shaped like
//! `{"meta_data": {"test_info": {"test_outcome": "FAIL"}}, "road_points": [{"x": 0.0, "y": 0.0}, ...]}`.
//! Not-executed records need only `road_points`. Extra keys are kept, the whole
//! record is the road's identifier and is what gets written back out.

use geo_types::Coord;
use serde::Deserialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{DetourError, Result};
use crate::road::RoadTestCase;

const OUTCOME_POINTER: &str = "/meta_data/test_info/test_outcome";

#[derive(Debug, Deserialize)]
struct RoadPoint {
    x: f64,
    y: f64,
}

pub fn roads_from_records(
    records: Vec<Value>,
    is_executed: bool,
) -> Result<Vec<RoadTestCase<Value>>> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| road_from_record(index, record, is_executed))
        .collect()
}

fn road_from_record(
    index: usize,
    record: Value,
    is_executed: bool,
) -> Result<RoadTestCase<Value>> {
    let raw_points = record.get("road_points").ok_or_else(|| DetourError::Record {
        index,
        reason: "missing road_points".to_string(),
    })?;
    let points: Vec<RoadPoint> =
        Vec::<RoadPoint>::deserialize(raw_points).map_err(|e| DetourError::Record {
            index,
            reason: format!("bad road_points: {e}"),
        })?;
    let points: Vec<Coord<f64>> = points
        .into_iter()
        .map(|p| Coord { x: p.x, y: p.y })
        .collect();

    if !is_executed {
        return Ok(RoadTestCase::not_executed(record, points));
    }

    let outcome = record
        .pointer(OUTCOME_POINTER)
        .and_then(Value::as_str)
        .ok_or_else(|| DetourError::Record {
            index,
            reason: format!("executed record has no {OUTCOME_POINTER}"),
        })?;
    let is_failing = outcome == "FAIL";
    Ok(RoadTestCase::executed(record, points, is_failing))
}

pub fn roads_from_json_str(json: &str, is_executed: bool) -> Result<Vec<RoadTestCase<Value>>> {
    let records: Vec<Value> = serde_json::from_str(json).map_err(|source| DetourError::Json {
        path: "<string>".into(),
        source,
    })?;
    roads_from_records(records, is_executed)
}

pub fn load_roads(path: &Path, is_executed: bool) -> Result<Vec<RoadTestCase<Value>>> {
    let file = File::open(path).map_err(|source| DetourError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<Value> =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| DetourError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    roads_from_records(records, is_executed)
}

/// Writes identifiers as a json array indented by four spaces.
pub fn write_ids<W: Write>(writer: W, ids: &[&Value]) -> serde_json::Result<()> {
    let mut serializer =
        serde_json::Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"    "));
    serde::Serialize::serialize(ids, &mut serializer)
}

pub fn save_ids(path: &Path, ids: &[&Value]) -> Result<()> {
    let io_err = |source| DetourError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    write_ids(&mut writer, ids).map_err(|source| DetourError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)
}
