use crate::aggregator::{self, AnnotatedRecord, LogRecord, NoiseGroup};
use crate::error::InputError;
use crate::normalizer::{self, Normalizer};
use crate::partitioner::Partitioner;
use crate::table::{
    LogTable, CLEANED_COLUMN, CLUSTER_COLUMN, COUNT_COLUMN, DEFAULT_TEXT_COLUMN, REPRESENTATIVE_COLUMN,
};
use crate::vectorizer::{StopWords, Vectorizer};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ClusterOpts {
    pub cluster_count: usize,
    pub text_column: String,
    /// `None` keeps clustering non-deterministic across runs.
    pub seed: Option<u64>,
    pub max_iter: usize,
    pub tolerance: f64,
    pub stop_words: StopWords,
    /// Normalize rows and assign clusters on the rayon pool.
    pub parallel: bool,
    /// Capacity of the per-run normalization cache; 0 disables it.
    pub cache_capacity: usize,
}

impl Default for ClusterOpts {
    fn default() -> Self {
        Self {
            cluster_count: 5,
            text_column: DEFAULT_TEXT_COLUMN.to_string(),
            seed: None,
            max_iter: 100,
            tolerance: 1e-4,
            stop_words: StopWords::English,
            parallel: false,
            cache_capacity: 8192,
        }
    }
}

impl ClusterOpts {
    fn partitioner(&self) -> Partitioner {
        Partitioner {
            seed: self.seed,
            max_iter: self.max_iter,
            tolerance: self.tolerance,
            parallel: self.parallel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_lines: usize,
    pub unique_patterns: usize,
    pub clusters: usize,
    pub compression_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseReport {
    pub summary: Summary,
    pub groups: Vec<NoiseGroup>,
}

impl NoiseReport {
    pub fn from_groups(groups: Vec<NoiseGroup>, total_lines: usize) -> Self {
        let mut labels: Vec<usize> = groups.iter().map(|g| g.cluster).collect();
        labels.sort_unstable();
        labels.dedup();
        let compression_ratio = if groups.is_empty() { 0.0 } else { total_lines as f64 / groups.len() as f64 };
        Self {
            summary: Summary { total_lines, unique_patterns: groups.len(), clusters: labels.len(), compression_ratio },
            groups,
        }
    }

    /// Keep only the `n` most frequent groups; the summary still describes the full input.
    pub fn top(mut self, n: usize) -> Self {
        self.groups.truncate(n);
        self
    }

    pub fn min_count(mut self, min: usize) -> Self {
        self.groups.retain(|g| g.count >= min);
        self
    }

    pub fn to_table(&self) -> LogTable {
        let mut t = LogTable::new([CLUSTER_COLUMN, CLEANED_COLUMN, COUNT_COLUMN, REPRESENTATIVE_COLUMN]);
        for g in &self.groups {
            t.push_row(vec![
                Value::from(g.cluster),
                Value::String(g.normalized.clone()),
                Value::from(g.count),
                Value::String(g.representative.clone()),
            ]);
        }
        t
    }
}

/// Both artifacts of one run: the annotated input and the noise report.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub annotated: LogTable,
    pub report: NoiseReport,
}

/// Pull the designated text column out of a table as ordered records.
pub fn records_from_table(table: &LogTable, text_column: &str) -> Result<Vec<LogRecord>, InputError> {
    let cells = table
        .column(text_column)
        .ok_or_else(|| InputError::MissingColumn { column: text_column.to_string() })?;
    Ok(cells
        .into_iter()
        .enumerate()
        .map(|(position, v)| LogRecord { position, raw: normalizer::value_to_text(v) })
        .collect())
}

/// Normalize, vectorize and partition. Every piece of model state is built
/// inside this call and dropped with it.
pub fn annotate(records: Vec<LogRecord>, opts: &ClusterOpts) -> Vec<AnnotatedRecord> {
    if records.is_empty() {
        tracing::debug!("no records to cluster");
        return Vec::new();
    }

    let normalized: Vec<String> = if opts.parallel {
        records.par_iter().map(|r| normalizer::normalize(&r.raw)).collect()
    } else {
        let mut n = Normalizer::new(opts.cache_capacity);
        let out = records.iter().map(|r| n.normalize(&r.raw)).collect();
        tracing::debug!(hits = n.cache_hits(), "normalization cache");
        out
    };

    let matrix = Vectorizer::new(opts.stop_words).fit_transform(&normalized);
    let partition = opts.partitioner().fit(&matrix, opts.cluster_count);
    tracing::debug!(
        rows = records.len(),
        k = partition.k,
        iterations = partition.iterations,
        converged = partition.converged,
        "clustered records"
    );

    records
        .into_iter()
        .zip(normalized)
        .zip(partition.labels)
        .map(|((record, normalized), cluster)| AnnotatedRecord { record, normalized, cluster })
        .collect()
}

/// Add `Cleaned Log` and `Cluster` columns to a copy of `table`.
pub fn cluster_logs(table: &LogTable, cluster_count: usize, text_column: &str) -> Result<LogTable, InputError> {
    let opts = ClusterOpts { cluster_count, text_column: text_column.to_string(), ..Default::default() };
    cluster_logs_with_opts(table, &opts)
}

pub fn cluster_logs_with_opts(table: &LogTable, opts: &ClusterOpts) -> Result<LogTable, InputError> {
    let records = records_from_table(table, &opts.text_column)?;
    let annotated = annotate(records, opts);
    Ok(annotated_table(table, &annotated))
}

fn annotated_table(table: &LogTable, annotated: &[AnnotatedRecord]) -> LogTable {
    let mut out = table.clone();
    out.set_column(CLEANED_COLUMN, annotated.iter().map(|a| Value::String(a.normalized.clone())).collect());
    out.set_column(CLUSTER_COLUMN, annotated.iter().map(|a| Value::from(a.cluster)).collect());
    out
}

/// Summarize an annotated table into one row per (cluster, cleaned text).
///
/// A table that was never clustered comes back unchanged.
pub fn identify_noise(table: &LogTable, text_column: &str) -> Result<LogTable, InputError> {
    if !table.has_column(CLUSTER_COLUMN) {
        return Ok(table.clone());
    }
    let records = annotated_from_table(table, text_column)?;
    Ok(NoiseReport::from_groups(aggregator::aggregate(&records), records.len()).to_table())
}

fn annotated_from_table(table: &LogTable, text_column: &str) -> Result<Vec<AnnotatedRecord>, InputError> {
    let raw = records_from_table(table, text_column)?;
    let cleaned = table
        .column(CLEANED_COLUMN)
        .ok_or_else(|| InputError::MissingColumn { column: CLEANED_COLUMN.to_string() })?;
    let labels = table
        .column(CLUSTER_COLUMN)
        .ok_or_else(|| InputError::MissingColumn { column: CLUSTER_COLUMN.to_string() })?;

    raw.into_iter()
        .zip(cleaned)
        .zip(labels)
        .map(|((record, cleaned), label)| {
            let cluster = parse_label(label).ok_or_else(|| InputError::InvalidLabel {
                row: record.position,
                value: normalizer::value_to_text(label),
            })?;
            Ok(AnnotatedRecord { record, normalized: normalizer::value_to_text(cleaned), cluster })
        })
        .collect()
}

fn parse_label(v: &Value) -> Option<usize> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One pass producing both the annotated table and the noise report.
pub fn run(table: &LogTable, opts: &ClusterOpts) -> Result<Analysis, InputError> {
    let records = records_from_table(table, &opts.text_column)?;
    let annotated = annotate(records, opts);
    let report = NoiseReport::from_groups(aggregator::aggregate(&annotated), annotated.len());
    tracing::debug!(
        lines = report.summary.total_lines,
        patterns = report.summary.unique_patterns,
        "noise report built"
    );
    Ok(Analysis { annotated: annotated_table(table, &annotated), report })
}
