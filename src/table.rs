//! Mixed-type tabular data.
//!
//! A [`Table`] is a set of equally long named columns of [`Value`]s, the
//! training input of the stratified model. A [`Record`] is a single row
//! keyed by column name, the sampling input.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// One cell of a feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value, for standardized and min-max columns.
    pub fn as_number(&self, column: &str) -> Result<f64, ModelError> {
        match self {
            Value::Number(x) if x.is_finite() => Ok(*x),
            Value::Number(x) => Err(ModelError::NonFinite {
                column: column.to_string(),
                value: *x,
            }),
            Value::Text(s) => Err(ModelError::NonNumeric {
                column: column.to_string(),
                value: s.clone(),
            }),
        }
    }

    /// Categorical view of the value, for one-hot and stratifier columns.
    ///
    /// Numbers use their shortest round-trip decimal form, so `3.0` and
    /// `3` map to the same category `"3"`, and `-0.0` to `"0"`.
    pub fn category(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // matches -0.0 too, which would otherwise print as "-0"
            Value::Number(x) if *x == 0.0 => f.write_str("0"),
            Value::Number(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(x)
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Number(x as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// A single feature record: column name → value.
pub type Record = HashMap<String, Value>;

/// Column-oriented table with a fixed row count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: HashMap<String, Vec<Value>>,
    rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a column.
    ///
    /// # Errors
    /// Returns [`ModelError::RaggedColumn`] if the column length differs
    /// from the columns already present.
    pub fn with_column<V: Into<Value>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let replacing_only_column = self.columns.len() == 1 && self.columns.contains_key(&name);
        if !self.columns.is_empty() && !replacing_only_column && values.len() != self.rows {
            return Err(ModelError::RaggedColumn {
                column: name,
                expected: self.rows,
                actual: values.len(),
            });
        }
        self.rows = values.len();
        self.columns.insert(name, values);
        Ok(self)
    }

    /// Builds a table from row records. Every record must carry the same
    /// set of column names.
    pub fn from_records(records: &[Record]) -> Result<Self, ModelError> {
        let Some(first) = records.first() else {
            return Ok(Self::default());
        };
        let mut columns: HashMap<String, Vec<Value>> = first
            .keys()
            .map(|k| (k.clone(), Vec::with_capacity(records.len())))
            .collect();
        for record in records {
            if record.len() != columns.len() {
                if let Some(extra) = record.keys().find(|k| !columns.contains_key(*k)) {
                    return Err(ModelError::MissingColumn(extra.clone()));
                }
            }
            for (name, column) in columns.iter_mut() {
                let value = record
                    .get(name)
                    .ok_or_else(|| ModelError::MissingColumn(name.clone()))?;
                column.push(value.clone());
            }
        }
        Ok(Self {
            columns,
            rows: records.len(),
        })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Returns the named column.
    pub fn column(&self, name: &str) -> Result<&[Value], ModelError> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ModelError::MissingColumn(name.to_string()))
    }

    /// Returns the named column as numbers.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, ModelError> {
        self.column(name)?
            .iter()
            .map(|v| v.as_number(name))
            .collect()
    }

    /// Returns the named column as category keys.
    pub fn category_column(&self, name: &str) -> Result<Vec<String>, ModelError> {
        Ok(self.column(name)?.iter().map(Value::category).collect())
    }

    /// Returns row `index` as a record.
    pub fn record(&self, index: usize) -> Option<Record> {
        if index >= self.rows {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|(name, values)| (name.clone(), values[index].clone()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_with_column_and_lookup() {
        let t = Table::new()
            .with_column("duration", [1.0, 2.0, 3.0])
            .unwrap()
            .with_column("activity", ["a", "b", "a"])
            .unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.numeric_column("duration").unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(t.category_column("activity").unwrap(), vec!["a", "b", "a"]);
        assert!(matches!(t.column("missing"), Err(ModelError::MissingColumn(_))));
    }

    #[test]
    fn test_ragged_column_rejected() {
        let t = Table::new().with_column("x", [1.0, 2.0]).unwrap();
        let err = t.with_column("y", [1.0]).unwrap_err();
        assert!(matches!(err, ModelError::RaggedColumn { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn test_numeric_column_rejects_text() {
        let t = Table::new().with_column("x", ["oops"]).unwrap();
        assert!(matches!(t.numeric_column("x"), Err(ModelError::NonNumeric { .. })));
    }

    #[test]
    fn test_from_records_roundtrip() {
        let records = vec![
            record(&[("x", Value::from(1.0)), ("r", Value::from("alice"))]),
            record(&[("x", Value::from(2.0)), ("r", Value::from("bob"))]),
        ];
        let t = Table::from_records(&records).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.record(1).unwrap(), records[1]);
        assert!(t.record(2).is_none());
    }

    #[test]
    fn test_from_records_missing_column() {
        let records = vec![
            record(&[("x", Value::from(1.0)), ("r", Value::from("alice"))]),
            record(&[("x", Value::from(2.0))]),
        ];
        assert!(matches!(
            Table::from_records(&records),
            Err(ModelError::MissingColumn(c)) if c == "r"
        ));
    }

    #[test]
    fn test_number_category_is_canonical() {
        assert_eq!(Value::from(3.0).category(), "3");
        assert_eq!(Value::from(3_i64).category(), "3");
        assert_eq!(Value::from(2.5).category(), "2.5");
        assert_eq!(Value::from(-0.0).category(), "0");
        assert_eq!(Value::from(-0.0).category(), Value::from(0.0).category());
        assert_eq!(Value::from(-1.5).category(), "-1.5");
    }
}
