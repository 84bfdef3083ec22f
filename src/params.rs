//! Typed accessors for the free-form parameter maps carried by
//! transformations and projections.
//!
//! Parameter maps stay JSON so they can round-trip through snapshots and the
//! API boundary unchanged; these helpers are the single place that coerces
//! them into numeric types.

use nalgebra::{DMatrix, DVector};
use serde_json::Value;

use crate::error::{Result, StrataError};
use crate::model::ParamMap;

/// Float parameter with a default.
pub fn f64_or(params: &ParamMap, key: &str, default: f64) -> f64 {
    params.get(key).and_then(Value::as_f64).unwrap_or(default)
}

/// Unsigned integer parameter with a default.
pub fn usize_or(params: &ParamMap, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(default)
}

/// Boolean parameter with a default.
pub fn bool_or(params: &ParamMap, key: &str, default: bool) -> bool {
    params.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// String parameter with a default.
pub fn str_or<'a>(params: &'a ParamMap, key: &str, default: &'a str) -> &'a str {
    params.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// Optional list of floats.
pub fn f64_list(params: &ParamMap, key: &str) -> Option<Vec<f64>> {
    let list = params.get(key)?.as_array()?;
    list.iter().map(Value::as_f64).collect()
}

/// Optional list of unsigned integers.
pub fn usize_list(params: &ParamMap, key: &str) -> Option<Vec<usize>> {
    let list = params.get(key)?.as_array()?;
    list.iter()
        .map(|v| v.as_u64().map(|u| u as usize))
        .collect()
}

/// Optional row-major matrix (list of equal-length rows).
pub fn matrix(params: &ParamMap, key: &str) -> Result<Option<DMatrix<f64>>> {
    let Some(value) = params.get(key) else {
        return Ok(None);
    };
    let rows = value
        .as_array()
        .ok_or_else(|| StrataError::invalid_input(format!("'{}' must be a list of rows", key)))?;
    if rows.is_empty() {
        return Err(StrataError::invalid_input(format!("'{}' has no rows", key)));
    }

    let mut data: Vec<f64> = Vec::new();
    let mut width: Option<usize> = None;
    for row in rows {
        let row = row.as_array().ok_or_else(|| {
            StrataError::invalid_input(format!("'{}' rows must be lists of numbers", key))
        })?;
        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                return Err(StrataError::invalid_input(format!(
                    "'{}' rows have inconsistent lengths",
                    key
                )));
            }
            Some(_) => {}
        }
        for value in row {
            data.push(value.as_f64().ok_or_else(|| {
                StrataError::invalid_input(format!("'{}' contains a non-numeric entry", key))
            })?);
        }
    }

    let width = width.unwrap_or(0);
    Ok(Some(DMatrix::from_row_slice(rows.len(), width, &data)))
}

/// Direction vectors from an `axes` parameter:
/// `[{"type": "direction", "vector": [..]}, ...]`.
///
/// Entries of other types (or without a numeric vector) are skipped; norm
/// filtering happens later in the oblique math.
pub fn axis_directions(params: &ParamMap) -> Vec<DVector<f64>> {
    let Some(axes) = params.get("axes").and_then(Value::as_array) else {
        return Vec::new();
    };
    axes.iter()
        .filter_map(|entry| {
            let entry = entry.as_object()?;
            if entry.get("type").and_then(Value::as_str) != Some("direction") {
                return None;
            }
            let vector: Vec<f64> = entry
                .get("vector")?
                .as_array()?
                .iter()
                .map(Value::as_f64)
                .collect::<Option<Vec<f64>>>()?;
            Some(DVector::from_vec(vector))
        })
        .collect()
}
