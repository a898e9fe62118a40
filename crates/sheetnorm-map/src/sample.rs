//! Column sampling for detectors.

use serde_json::Value;

/// At most `size` values spread evenly over `values`.
///
/// The first and last values are always included when `size >= 2`; a size of
/// one yields only the last value.
pub fn sample_column(values: &[Value], size: usize) -> Vec<Value> {
    let len = values.len();
    if size == 0 || len == 0 {
        return Vec::new();
    }
    if len <= size {
        return values.to_vec();
    }
    if size == 1 {
        return vec![values[len - 1].clone()];
    }
    (0..size)
        .map(|i| values[i * (len - 1) / (size - 1)].clone())
        .collect()
}
