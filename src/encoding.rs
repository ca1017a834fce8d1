//! Feature encoding pipeline.
//!
//! Turns mixed-type feature rows into a fixed-order numeric matrix:
//!
//! ```text
//! [standardized columns] ++ [min-max columns] ++ [one-hot columns]
//! ```
//!
//! Each block is fitted only on its own columns at learn time and reused
//! unchanged at sample time. A block with no columns contributes a
//! zero-width slice, so the output width is identical for training
//! matrices and single sampled records.
//!
//! # Scalers
//!
//! - [`StandardScaler`]: (x − mean) / σ with population σ.
//! - [`MinMaxScaler`]: (x − min) / (max − min), mapping the training
//!   range onto [0, 1]. Values outside the range are not clipped.
//! - [`OneHotEncoder`]: one indicator per sorted distinct category.
//!
//! A zero spread (σ = 0 or max = min) is replaced by a scale of 1.

use ndarray::{Array2, ArrayViewMut1};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::stats::Summary;
use crate::table::{Record, Table, Value};

/// Read access to one row, either from a [`Table`] or a [`Record`].
trait RowSource {
    fn value(&self, column: &str) -> Result<&Value, ModelError>;
}

struct TableRow<'a> {
    table: &'a Table,
    index: usize,
}

impl RowSource for TableRow<'_> {
    fn value(&self, column: &str) -> Result<&Value, ModelError> {
        Ok(&self.table.column(column)?[self.index])
    }
}

impl RowSource for Record {
    fn value(&self, column: &str) -> Result<&Value, ModelError> {
        self.get(column)
            .ok_or_else(|| ModelError::MissingColumn(column.to_string()))
    }
}

fn non_zero_scale(spread: f64) -> f64 {
    if spread > 0.0 && spread.is_finite() {
        spread
    } else {
        1.0
    }
}

// ============================================================================
// Column partition
// ============================================================================

/// Split of the feature columns into the three encoding blocks.
///
/// Standardization and one-hot columns are given explicitly; every other
/// feature column is min-max normalized ("rest"), keeping the original
/// relative order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPartition {
    standardization: Vec<String>,
    rest: Vec<String>,
    onehot: Vec<String>,
}

impl ColumnPartition {
    /// Builds the partition.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConfig`] if a standardization or one-hot
    /// column is not a feature column, if a column is listed in both, or
    /// if any list contains duplicates.
    pub fn new(
        feature_columns: &[String],
        standardization_columns: &[String],
        onehot_columns: &[String],
    ) -> Result<Self, ModelError> {
        for (label, list) in [
            ("feature", feature_columns),
            ("standardization", standardization_columns),
            ("one-hot", onehot_columns),
        ] {
            for (i, name) in list.iter().enumerate() {
                if list[..i].contains(name) {
                    return Err(ModelError::InvalidConfig(format!(
                        "{label} column '{name}' is listed twice"
                    )));
                }
            }
        }
        for name in standardization_columns.iter().chain(onehot_columns) {
            if !feature_columns.contains(name) {
                return Err(ModelError::InvalidConfig(format!(
                    "column '{name}' is not a feature column"
                )));
            }
        }
        if let Some(name) = standardization_columns
            .iter()
            .find(|c| onehot_columns.contains(c))
        {
            return Err(ModelError::InvalidConfig(format!(
                "column '{name}' is both standardized and one-hot encoded"
            )));
        }
        let rest = feature_columns
            .iter()
            .filter(|c| !standardization_columns.contains(c) && !onehot_columns.contains(c))
            .cloned()
            .collect();
        Ok(Self {
            standardization: standardization_columns.to_vec(),
            rest,
            onehot: onehot_columns.to_vec(),
        })
    }

    pub fn standardization(&self) -> &[String] {
        &self.standardization
    }

    pub fn rest(&self) -> &[String] {
        &self.rest
    }

    pub fn onehot(&self) -> &[String] {
        &self.onehot
    }
}

// ============================================================================
// StandardScaler
// ============================================================================

/// Z-score scaler over a fixed list of numeric columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fits column means and population standard deviations.
    pub fn fit(table: &Table, columns: &[String]) -> Result<Self, ModelError> {
        let mut means = Vec::with_capacity(columns.len());
        let mut scales = Vec::with_capacity(columns.len());
        for name in columns {
            let mut summary = Summary::new();
            for x in table.numeric_column(name)? {
                summary.push(x);
            }
            means.push(summary.mean().unwrap_or(0.0));
            scales.push(non_zero_scale(summary.population_std_dev().unwrap_or(0.0)));
        }
        Ok(Self {
            columns: columns.to_vec(),
            means,
            scales,
        })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    fn encode_row(&self, row: &dyn RowSource, mut out: ArrayViewMut1<f64>) -> Result<(), ModelError> {
        for (j, name) in self.columns.iter().enumerate() {
            let x = row.value(name)?.as_number(name)?;
            out[j] = (x - self.means[j]) / self.scales[j];
        }
        Ok(())
    }
}

// ============================================================================
// MinMaxScaler
// ============================================================================

/// Min-max scaler mapping each training column range onto [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    columns: Vec<String>,
    mins: Vec<f64>,
    ranges: Vec<f64>,
}

impl MinMaxScaler {
    pub fn fit(table: &Table, columns: &[String]) -> Result<Self, ModelError> {
        let mut mins = Vec::with_capacity(columns.len());
        let mut ranges = Vec::with_capacity(columns.len());
        for name in columns {
            let mut summary = Summary::new();
            for x in table.numeric_column(name)? {
                summary.push(x);
            }
            let (lo, hi) = summary.range().unwrap_or((0.0, 0.0));
            mins.push(lo);
            ranges.push(non_zero_scale(hi - lo));
        }
        Ok(Self {
            columns: columns.to_vec(),
            mins,
            ranges,
        })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    fn encode_row(&self, row: &dyn RowSource, mut out: ArrayViewMut1<f64>) -> Result<(), ModelError> {
        for (j, name) in self.columns.iter().enumerate() {
            let x = row.value(name)?.as_number(name)?;
            out[j] = (x - self.mins[j]) / self.ranges[j];
        }
        Ok(())
    }
}

// ============================================================================
// OneHotEncoder
// ============================================================================

/// One-hot encoder with sorted per-column category lists.
///
/// A category not seen during fitting is an error at transform time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn fit(table: &Table, columns: &[String]) -> Result<Self, ModelError> {
        let mut categories = Vec::with_capacity(columns.len());
        for name in columns {
            let mut distinct = table.category_column(name)?;
            distinct.sort_unstable();
            distinct.dedup();
            categories.push(distinct);
        }
        Ok(Self {
            columns: columns.to_vec(),
            categories,
        })
    }

    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Sorted categories of each encoded column.
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    fn encode_row(&self, row: &dyn RowSource, mut out: ArrayViewMut1<f64>) -> Result<(), ModelError> {
        out.fill(0.0);
        let mut offset = 0;
        for (name, categories) in self.columns.iter().zip(&self.categories) {
            let key = row.value(name)?.category();
            let idx = categories
                .binary_search(&key)
                .map_err(|_| ModelError::UnknownCategory {
                    column: name.clone(),
                    value: key.clone(),
                })?;
            out[offset + idx] = 1.0;
            offset += categories.len();
        }
        Ok(())
    }
}

// ============================================================================
// FeaturePipeline
// ============================================================================

/// The three fitted encoders, applied in fixed block order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeaturePipeline {
    standardizer: StandardScaler,
    normalizer: MinMaxScaler,
    encoder: OneHotEncoder,
}

impl FeaturePipeline {
    /// Fits each block on its designated columns of `table`.
    pub fn fit(table: &Table, partition: &ColumnPartition) -> Result<Self, ModelError> {
        Ok(Self {
            standardizer: StandardScaler::fit(table, partition.standardization())?,
            normalizer: MinMaxScaler::fit(table, partition.rest())?,
            encoder: OneHotEncoder::fit(table, partition.onehot())?,
        })
    }

    /// Width of the encoded feature vector.
    pub fn width(&self) -> usize {
        self.standardizer.width() + self.normalizer.width() + self.encoder.width()
    }

    pub fn standardizer(&self) -> &StandardScaler {
        &self.standardizer
    }

    pub fn normalizer(&self) -> &MinMaxScaler {
        &self.normalizer
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    /// Encodes every row of `table` into an `n × width` matrix.
    pub fn transform(&self, table: &Table) -> Result<Array2<f64>, ModelError> {
        let mut out = Array2::zeros((table.len(), self.width()));
        for (index, row) in out.rows_mut().into_iter().enumerate() {
            self.encode_row(&TableRow { table, index }, row)?;
        }
        Ok(out)
    }

    /// Encodes a single record into a `1 × width` matrix.
    pub fn transform_record(&self, record: &Record) -> Result<Array2<f64>, ModelError> {
        let mut out = Array2::zeros((1, self.width()));
        self.encode_row(record, out.row_mut(0))?;
        Ok(out)
    }

    fn encode_row(&self, row: &dyn RowSource, mut out: ArrayViewMut1<f64>) -> Result<(), ModelError> {
        let s = self.standardizer.width();
        let r = self.normalizer.width();
        self.standardizer
            .encode_row(row, out.slice_mut(ndarray::s![..s]))?;
        self.normalizer
            .encode_row(row, out.slice_mut(ndarray::s![s..s + r]))?;
        self.encoder
            .encode_row(row, out.slice_mut(ndarray::s![s + r..]))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sample_table() -> Table {
        Table::new()
            .with_column("age", [20.0, 30.0, 40.0, 50.0])
            .unwrap()
            .with_column("amount", [100.0, 200.0, 300.0, 500.0])
            .unwrap()
            .with_column("hour", [8.0, 12.0, 16.0, 8.0])
            .unwrap()
            .with_column("resource", ["bob", "alice", "bob", "carol"])
            .unwrap()
    }

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_partition_rest_keeps_order() {
        let p = ColumnPartition::new(
            &names(&["a", "b", "c", "d", "e"]),
            &names(&["d"]),
            &names(&["b"]),
        )
        .unwrap();
        assert_eq!(p.rest(), names(&["a", "c", "e"]).as_slice());
    }

    #[test]
    fn test_partition_rejects_overlap_and_strangers() {
        let features = names(&["a", "b"]);
        assert!(ColumnPartition::new(&features, &names(&["a"]), &names(&["a"])).is_err());
        assert!(ColumnPartition::new(&features, &names(&["z"]), &[]).is_err());
        assert!(ColumnPartition::new(&names(&["a", "a"]), &[], &[]).is_err());
    }

    #[test]
    fn test_standard_scaler_population_sigma() {
        let t = sample_table();
        let s = StandardScaler::fit(&t, &names(&["age"])).unwrap();
        assert!((s.means()[0] - 35.0).abs() < 1e-12);
        assert!((s.scales()[0] - 125.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_block_order_and_values() {
        let t = sample_table();
        let p = ColumnPartition::new(
            &names(&["resource", "age", "amount"]),
            &names(&["age"]),
            &names(&["resource"]),
        )
        .unwrap();
        let pipeline = FeaturePipeline::fit(&t, &p).unwrap();
        assert_eq!(pipeline.width(), 1 + 1 + 3);
        let m = pipeline.transform(&t).unwrap();
        assert_eq!(m.dim(), (4, 5));
        // amount is min-max normalized: (200 − 100) / 400
        assert!((m[[1, 1]] - 0.25).abs() < 1e-12);
        // categories sorted: alice, bob, carol
        assert_eq!(m.row(1).slice(ndarray::s![2..]).to_vec(), vec![1.0, 0.0, 0.0]);
        assert_eq!(m.row(3).slice(ndarray::s![2..]).to_vec(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_record_transform_matches_table_row() {
        let t = sample_table();
        let p = ColumnPartition::new(
            &names(&["age", "amount", "hour", "resource"]),
            &names(&["age"]),
            &names(&["resource"]),
        )
        .unwrap();
        let pipeline = FeaturePipeline::fit(&t, &p).unwrap();
        let full = pipeline.transform(&t).unwrap();
        let single = pipeline.transform_record(&t.record(2).unwrap()).unwrap();
        assert_eq!(single.row(0), full.row(2));
    }

    #[test]
    fn test_empty_blocks_have_zero_width() {
        let t = sample_table();
        let p = ColumnPartition::new(&names(&["resource"]), &[], &names(&["resource"])).unwrap();
        let pipeline = FeaturePipeline::fit(&t, &p).unwrap();
        assert_eq!(pipeline.standardizer().width(), 0);
        assert_eq!(pipeline.normalizer().width(), 0);
        assert_eq!(pipeline.transform(&t).unwrap().ncols(), 3);
        let r = record(&[("resource", Value::from("alice"))]);
        assert_eq!(pipeline.transform_record(&r).unwrap().ncols(), 3);
    }

    #[test]
    fn test_unknown_category_fails() {
        let t = sample_table();
        let p = ColumnPartition::new(&names(&["resource"]), &[], &names(&["resource"])).unwrap();
        let pipeline = FeaturePipeline::fit(&t, &p).unwrap();
        let r = record(&[("resource", Value::from("mallory"))]);
        assert!(matches!(
            pipeline.transform_record(&r),
            Err(ModelError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_missing_feature_fails() {
        let t = sample_table();
        let p = ColumnPartition::new(&names(&["age", "hour"]), &names(&["age"]), &[]).unwrap();
        let pipeline = FeaturePipeline::fit(&t, &p).unwrap();
        let r = record(&[("age", Value::from(30.0))]);
        assert!(matches!(
            pipeline.transform_record(&r),
            Err(ModelError::MissingColumn(c)) if c == "hour"
        ));
    }

    #[test]
    fn test_constant_column_scale_is_one() {
        let t = Table::new().with_column("k", [4.0, 4.0, 4.0]).unwrap();
        let mm = MinMaxScaler::fit(&t, &names(&["k"])).unwrap();
        let ss = StandardScaler::fit(&t, &names(&["k"])).unwrap();
        assert_eq!(mm.ranges[0], 1.0);
        assert_eq!(ss.scales()[0], 1.0);
    }
}
