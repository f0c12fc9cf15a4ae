use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_TEXT_COLUMN: &str = "Log Message";
pub const CLEANED_COLUMN: &str = "Cleaned Log";
pub const CLUSTER_COLUMN: &str = "Cluster";
pub const COUNT_COLUMN: &str = "Count";
pub const REPRESENTATIVE_COLUMN: &str = "Representative Log";

/// In-memory table with named columns. Cells are JSON values so numeric or
/// boolean fields survive until the normalizer stringifies them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl LogTable {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self { columns: columns.into_iter().map(Into::into).collect(), rows: Vec::new() }
    }

    /// Single-column table, one row per line.
    pub fn from_lines<S: AsRef<str>>(column: &str, lines: &[S]) -> Self {
        let mut t = Self::new([column]);
        for l in lines {
            t.rows.push(vec![Value::String(l.as_ref().to_string())]);
        }
        t
    }

    /// Build a table from JSON-lines input. Objects are flattened to dotted
    /// keys and become columns (in first-seen order); lines that are not JSON
    /// objects are stored verbatim under [`DEFAULT_TEXT_COLUMN`]. Missing
    /// cells are `null`.
    pub fn from_json_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut t = Self::default();
        let mut parsed: Vec<BTreeMap<String, Value>> = Vec::with_capacity(lines.len());
        for line in lines {
            let line = line.as_ref();
            let mut flat = BTreeMap::new();
            match serde_json::from_str::<Value>(line) {
                Ok(v @ Value::Object(_)) => flatten_json("", &v, &mut flat),
                _ => {
                    flat.insert(DEFAULT_TEXT_COLUMN.to_string(), Value::String(line.trim_end().to_string()));
                }
            }
            for k in flat.keys() {
                if t.column_index(k).is_none() {
                    t.columns.push(k.clone());
                }
            }
            parsed.push(flat);
        }
        for mut flat in parsed {
            let row = t.columns.iter().map(|c| flat.remove(c).unwrap_or(Value::Null)).collect();
            t.rows.push(row);
        }
        t
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Append a row; short rows are padded with `null`, extra cells dropped.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Set a column's values, adding the column when it does not exist yet.
    pub(crate) fn set_column(&mut self, name: &str, values: Vec<Value>) {
        let idx = match self.column_index(name) {
            Some(i) => i,
            None => {
                self.columns.push(name.to_string());
                for r in &mut self.rows {
                    r.push(Value::Null);
                }
                self.columns.len() - 1
            }
        };
        for (r, v) in self.rows.iter_mut().zip(values) {
            r[idx] = v;
        }
    }
}

fn flatten_json(prefix: &str, v: &Value, out: &mut BTreeMap<String, Value>) {
    match v {
        Value::Object(map) => {
            for (k, v) in map.iter() {
                let key = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
                flatten_json(&key, v, out);
            }
        }
        Value::Array(arr) => {
            for (idx, item) in arr.iter().enumerate() {
                let key = if prefix.is_empty() { idx.to_string() } else { format!("{prefix}.{idx}") };
                flatten_json(&key, item, out);
            }
        }
        leaf => {
            out.insert(prefix.to_string(), leaf.clone());
        }
    }
}
