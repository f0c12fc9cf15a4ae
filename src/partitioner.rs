use crate::vectorizer::{SparseRow, TfidfMatrix};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// K-means over TF-IDF rows with greedy k-means++ seeding.
///
/// A fresh RNG is built for every call: `seed: None` draws from OS entropy,
/// `Some(s)` makes the labels reproducible.
#[derive(Debug, Clone)]
pub struct Partitioner {
    pub seed: Option<u64>,
    pub max_iter: usize,
    pub tolerance: f64,
    pub parallel: bool,
}

impl Default for Partitioner {
    fn default() -> Self {
        Self { seed: None, max_iter: 100, tolerance: 1e-4, parallel: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub labels: Vec<usize>,
    pub k: usize,
    pub iterations: usize,
    pub converged: bool,
    pub inertia: f64,
}

struct Centroids {
    width: usize,
    data: Vec<Vec<f64>>,
    norms_sq: Vec<f64>,
}

impl Centroids {
    fn new(width: usize) -> Self {
        Self { width, data: Vec::new(), norms_sq: Vec::new() }
    }

    fn push_point(&mut self, row: &SparseRow) {
        self.data.push(row.to_dense(self.width));
        self.norms_sq.push(row.norm_sq());
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn dist_sq(&self, c: usize, row: &SparseRow) -> f64 {
        // ||x - c||^2 = ||x||^2 + ||c||^2 - 2 x.c ; clamp rounding noise
        (row.norm_sq() + self.norms_sq[c] - 2.0 * row.dot_dense(&self.data[c])).max(0.0)
    }

    fn nearest(&self, row: &SparseRow) -> (usize, f64) {
        let mut best = (0usize, f64::INFINITY);
        for c in 0..self.len() {
            let d = self.dist_sq(c, row);
            if d < best.1 {
                best = (c, d);
            }
        }
        best
    }
}

/// Clamp a requested cluster count to what the input can support.
pub fn effective_k(requested: usize, rows: usize) -> usize {
    requested.min(rows)
}

impl Partitioner {
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn partition(&self, matrix: &TfidfMatrix, k_requested: usize) -> Vec<usize> {
        self.fit(matrix, k_requested).labels
    }

    pub fn fit(&self, matrix: &TfidfMatrix, k_requested: usize) -> Partition {
        let rows = matrix.rows();
        let k = effective_k(k_requested, rows.len());
        if k_requested > rows.len() && !rows.is_empty() {
            tracing::warn!(requested = k_requested, rows = rows.len(), "cluster count clamped to row count");
        }
        if k == 0 {
            return Partition { labels: vec![0; rows.len()], k: 0, iterations: 0, converged: true, inertia: 0.0 };
        }

        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let mut centroids = seed_centroids(rows, matrix.n_cols(), k, &mut rng);
        // Labels always come from at least one assignment, even with max_iter == 0
        let mut assigned = self.assign(&centroids, rows);
        let mut labels: Vec<usize> = assigned.iter().map(|(c, _)| *c).collect();
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iter {
            iterations += 1;
            let shift = update_centroids(&mut centroids, rows, &labels, &assigned);
            assigned = self.assign(&centroids, rows);
            let changed = assigned.iter().zip(&labels).any(|((c, _), l)| c != l);
            labels = assigned.iter().map(|(c, _)| *c).collect();
            if !changed || shift <= self.tolerance {
                converged = true;
                break;
            }
        }
        if !converged {
            tracing::debug!(max_iter = self.max_iter, "k-means stopped at iteration cap");
        }

        let inertia = rows.iter().zip(&labels).map(|(r, &c)| centroids.dist_sq(c, r)).sum();
        Partition { labels, k, iterations, converged, inertia }
    }

    fn assign(&self, centroids: &Centroids, rows: &[SparseRow]) -> Vec<(usize, f64)> {
        if self.parallel {
            rows.par_iter().map(|r| centroids.nearest(r)).collect()
        } else {
            rows.iter().map(|r| centroids.nearest(r)).collect()
        }
    }
}

/// Greedy k-means++: each new centre is the best of `2 + ln k` candidates
/// drawn proportionally to squared distance from the current centres.
fn seed_centroids(rows: &[SparseRow], width: usize, k: usize, rng: &mut StdRng) -> Centroids {
    let n = rows.len();
    let n_trials = 2 + (k as f64).ln() as usize;
    let mut centroids = Centroids::new(width);
    centroids.push_point(&rows[rng.gen_range(0..n)]);
    let mut closest: Vec<f64> = rows.iter().map(|r| centroids.dist_sq(0, r)).collect();

    while centroids.len() < k {
        let potential: f64 = closest.iter().sum();
        let mut best: Option<(usize, f64, Vec<f64>)> = None;
        for _ in 0..n_trials {
            let cand = if potential > 0.0 {
                sample_weighted(&closest, potential, rng)
            } else {
                rng.gen_range(0..n)
            };
            let mut probe = Centroids::new(width);
            probe.push_point(&rows[cand]);
            let dists: Vec<f64> = rows
                .iter()
                .zip(&closest)
                .map(|(r, &d)| d.min(probe.dist_sq(0, r)))
                .collect();
            let pot: f64 = dists.iter().sum();
            if best.as_ref().map_or(true, |(_, p, _)| pot < *p) {
                best = Some((cand, pot, dists));
            }
        }
        if let Some((cand, _, dists)) = best {
            centroids.push_point(&rows[cand]);
            closest = dists;
        }
    }
    centroids
}

fn sample_weighted(weights: &[f64], total: f64, rng: &mut StdRng) -> usize {
    let mut target = rng.gen::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        if target < *w {
            return i;
        }
        target -= w;
    }
    // rounding left us past the end; take the last weighted point
    weights.iter().rposition(|w| *w > 0.0).unwrap_or(0)
}

/// Recompute means; returns the summed squared shift of all centroids.
fn update_centroids(
    centroids: &mut Centroids,
    rows: &[SparseRow],
    labels: &[usize],
    assigned: &[(usize, f64)],
) -> f64 {
    let k = centroids.len();
    let mut sums = vec![vec![0.0; centroids.width]; k];
    let mut counts = vec![0usize; k];
    for (row, &c) in rows.iter().zip(labels) {
        row.add_to(&mut sums[c]);
        counts[c] += 1;
    }

    // Empty clusters take over the points that sit farthest from their centre
    let mut by_distance: Vec<usize> = (0..rows.len()).collect();
    by_distance.sort_by(|&a, &b| assigned[b].1.total_cmp(&assigned[a].1));
    let mut donors = by_distance.into_iter();

    let mut shift = 0.0;
    for c in 0..k {
        let new = if counts[c] == 0 {
            match donors.next() {
                Some(i) => rows[i].to_dense(centroids.width),
                None => centroids.data[c].clone(),
            }
        } else {
            sums[c].iter().map(|s| s / counts[c] as f64).collect()
        };
        shift += new
            .iter()
            .zip(&centroids.data[c])
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>();
        centroids.norms_sq[c] = new.iter().map(|v| v * v).sum();
        centroids.data[c] = new;
    }
    shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::Vectorizer;

    fn matrix(docs: &[&str]) -> TfidfMatrix {
        Vectorizer::default().fit_transform(docs)
    }

    #[test]
    fn separates_distinct_vocabularies() {
        let m = matrix(&["disk space low", "disk space low", "user logged", "user logged"]);
        let labels = Partitioner::default().with_seed(Some(7)).partition(&m, 2);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn identical_rows_do_not_fail() {
        let m = matrix(&["same line", "same line", "same line"]);
        let p = Partitioner::default().with_seed(Some(1)).fit(&m, 3);
        assert_eq!(p.k, 3);
        assert_eq!(p.labels.len(), 3);
        assert!(p.labels.iter().all(|&l| l < 3));
    }

    #[test]
    fn zero_column_matrix_still_labels_every_row() {
        let m = matrix(&["the", "of", "a"]);
        let labels = Partitioner::default().with_seed(Some(3)).partition(&m, 2);
        assert_eq!(labels.len(), 3);
        assert!(labels.iter().all(|&l| l < 2));
    }

    #[test]
    fn zero_requested_clusters_label_everything_zero() {
        let m = matrix(&["alpha", "beta"]);
        assert_eq!(Partitioner::default().partition(&m, 0), vec![0, 0]);
    }

    #[test]
    fn iteration_cap_returns_best_effort_labels() {
        let m = matrix(&["disk low", "disk full", "user in", "user out", "net down", "net up", "cpu hot"]);
        let capped = Partitioner { max_iter: 0, ..Partitioner::default() }.with_seed(Some(5)).fit(&m, 3);
        assert!(!capped.converged);
        assert_eq!(capped.iterations, 0);
        assert_eq!(capped.labels.len(), 7);
        assert!(capped.labels.iter().all(|&l| l < 3));

        let one = Partitioner { max_iter: 1, ..Partitioner::default() }.with_seed(Some(5)).fit(&m, 3);
        assert_eq!(one.iterations, 1);
        assert_eq!(one.labels.len(), 7);
        assert!(one.labels.iter().all(|&l| l < 3));
        assert!(one.inertia.is_finite());
    }

    #[test]
    fn parallel_assignment_matches_sequential() {
        let m = matrix(&["disk low", "disk full now", "user in", "user out", "net down", "net up"]);
        let seq = Partitioner::default().with_seed(Some(11)).partition(&m, 3);
        let par = Partitioner { parallel: true, ..Partitioner::default() }.with_seed(Some(11)).partition(&m, 3);
        assert_eq!(seq, par);
    }
}
