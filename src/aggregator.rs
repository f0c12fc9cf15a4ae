use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One input line and its position in the original input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub position: usize,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedRecord {
    pub record: LogRecord,
    pub normalized: String,
    pub cluster: usize,
}

/// A distinct (cluster, normalized text) pattern and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseGroup {
    pub cluster: usize,
    pub normalized: String,
    pub count: usize,
    pub representative: String,
}

/// Collapse annotated records into noise groups, most frequent first.
///
/// Groups come out of key order (cluster, then normalized text) and a stable
/// sort on count keeps that order among equal counts. The representative is
/// the raw text of the earliest record by `position`.
pub fn aggregate(records: &[AnnotatedRecord]) -> Vec<NoiseGroup> {
    let mut groups: BTreeMap<(usize, &str), (usize, &LogRecord)> = BTreeMap::new();
    for r in records {
        groups
            .entry((r.cluster, r.normalized.as_str()))
            .and_modify(|(count, first)| {
                *count += 1;
                if r.record.position < first.position {
                    *first = &r.record;
                }
            })
            .or_insert((1, &r.record));
    }

    let mut out: Vec<NoiseGroup> = groups
        .into_iter()
        .map(|((cluster, normalized), (count, first))| NoiseGroup {
            cluster,
            normalized: normalized.to_string(),
            count,
            representative: first.raw.clone(),
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(position: usize, raw: &str, normalized: &str, cluster: usize) -> AnnotatedRecord {
        AnnotatedRecord {
            record: LogRecord { position, raw: raw.into() },
            normalized: normalized.into(),
            cluster,
        }
    }

    #[test]
    fn earliest_position_wins_even_out_of_order() {
        let groups = aggregate(&[rec(5, "late", "x", 0), rec(2, "early", "x", 0)]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].representative, "early");
        assert_eq!(groups[0].count, 2);
    }

    #[test]
    fn ties_keep_key_order() {
        let groups = aggregate(&[
            rec(0, "b", "b", 1),
            rec(1, "a", "a", 1),
            rec(2, "z", "z", 0),
        ]);
        let keys: Vec<(usize, &str)> = groups.iter().map(|g| (g.cluster, g.normalized.as_str())).collect();
        assert_eq!(keys, vec![(0, "z"), (1, "a"), (1, "b")]);
    }

    #[test]
    fn same_text_in_two_clusters_is_two_groups() {
        let groups = aggregate(&[rec(0, "x1", "x", 0), rec(1, "x2", "x", 1)]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(aggregate(&[]).is_empty());
    }
}
