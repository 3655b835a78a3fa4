use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

/// Largest `k` whose labels fit a `ClusterLabel`.
pub const MAX_CLUSTERS: usize = u16::MAX as usize + 1;

/// Fixed-k clustering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of clusters per bucket.
    pub k: usize,
    /// Independent initialisations; the lowest-inertia run is kept.
    pub restarts: usize,
    /// Hard cap on refinement steps per run, converged or not.
    pub max_iter: usize,
    pub seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: 5,
            restarts: 100,
            max_iter: 1000,
            seed: 42,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.k == 0 || self.k > MAX_CLUSTERS {
            return Err(PipelineError::InvalidClusterCount);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster index per input point, in input order.
    pub labels: Vec<usize>,
    pub centroids: Vec<[f64; 2]>,
    /// Sum of squared distances to the assigned centroid.
    pub inertia: f64,
    /// Refinement steps taken by the kept run.
    pub iterations: usize,
}

/// Lloyd's k-means on 2-D points with k-means++ seeding and restarts.
///
/// When there are fewer points than `k`, `k` shrinks to the point count.
pub fn kmeans(points: &[[f64; 2]], config: &ClusterConfig) -> Result<KMeansFit, PipelineError> {
    config.validate()?;
    if points.is_empty() {
        return Err(PipelineError::Clustering("no points to cluster".into()));
    }
    if points.iter().any(|p| !p[0].is_finite() || !p[1].is_finite()) {
        return Err(PipelineError::Clustering("non-finite point".into()));
    }

    let k = config.k.min(points.len());
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<KMeansFit> = None;

    for _ in 0..config.restarts.max(1) {
        let initial = seed_centroids(points, k, &mut rng);
        let fit = refine(points, initial, config.max_iter);
        if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
            best = Some(fit);
        }
    }

    best.ok_or_else(|| PipelineError::Clustering("no run completed".into()))
}

/// k-means++ initialisation.
fn seed_centroids(points: &[[f64; 2]], k: usize, rng: &mut StdRng) -> Vec<[f64; 2]> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    while centroids.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| nearest(p, &centroids).1)
            .collect();
        let total: f64 = weights.iter().sum();

        let idx = if total <= 0.0 {
            rng.gen_range(0..points.len())
        } else {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = points.len() - 1;
            for (i, w) in weights.iter().enumerate() {
                if target < *w {
                    chosen = i;
                    break;
                }
                target -= w;
            }
            chosen
        };
        centroids.push(points[idx]);
    }
    centroids
}

fn refine(points: &[[f64; 2]], mut centroids: Vec<[f64; 2]>, max_iter: usize) -> KMeansFit {
    let mut labels = assign(points, &centroids);
    let mut iterations = 0;

    while iterations < max_iter {
        iterations += 1;
        centroids = update(points, &labels, &centroids);
        let next = assign(points, &centroids);
        if next == labels {
            break;
        }
        labels = next;
    }

    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &l)| squared_distance(p, &centroids[l]))
        .sum();

    KMeansFit {
        labels,
        centroids,
        inertia,
        iterations,
    }
}

fn assign(points: &[[f64; 2]], centroids: &[[f64; 2]]) -> Vec<usize> {
    points.iter().map(|p| nearest(p, centroids).0).collect()
}

/// Move each centroid to the mean of its points. An empty cluster is
/// relocated onto the point currently farthest from its own centroid.
fn update(points: &[[f64; 2]], labels: &[usize], centroids: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let k = centroids.len();
    let mut sums = vec![[0.0f64; 2]; k];
    let mut counts = vec![0usize; k];
    for (p, &l) in points.iter().zip(labels) {
        sums[l][0] += p[0];
        sums[l][1] += p[1];
        counts[l] += 1;
    }

    // Donor ordering is only needed when some cluster lost all its points.
    let mut donors = if counts.contains(&0) {
        let mut by_distance: Vec<usize> = (0..points.len()).collect();
        by_distance.sort_by(|&a, &b| {
            let da = squared_distance(&points[a], &centroids[labels[a]]);
            let db = squared_distance(&points[b], &centroids[labels[b]]);
            db.total_cmp(&da)
        });
        by_distance
    } else {
        Vec::new()
    }
    .into_iter();

    (0..k)
        .map(|c| {
            if counts[c] > 0 {
                let n = counts[c] as f64;
                [sums[c][0] / n, sums[c][1] / n]
            } else {
                donors.next().map_or(centroids[c], |i| points[i])
            }
        })
        .collect()
}

/// Index of and squared distance to the closest centroid (lowest index on ties).
fn nearest(p: &[f64; 2], centroids: &[[f64; 2]]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(p, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn squared_distance(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<[f64; 2]> {
        vec![
            [1.0, 0.1],
            [1.1, 0.0],
            [0.9, -0.1],
            [50.0, 2.0],
            [51.0, 2.1],
            [49.5, 1.9],
        ]
    }

    fn config(k: usize) -> ClusterConfig {
        ClusterConfig {
            k,
            restarts: 10,
            max_iter: 100,
            seed: 7,
        }
    }

    #[test]
    fn test_separates_obvious_groups() {
        let fit = kmeans(&two_blobs(), &config(2)).unwrap();
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[1], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_eq!(fit.labels[4], fit.labels[5]);
        assert_ne!(fit.labels[0], fit.labels[3]);
        assert!(fit.inertia < 5.0);
    }

    #[test]
    fn test_same_seed_same_result() {
        let points = two_blobs();
        let a = kmeans(&points, &config(3)).unwrap();
        let b = kmeans(&points, &config(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_labels_within_k() {
        let points: Vec<[f64; 2]> = (0..40).map(|i| [i as f64, (i % 7) as f64]).collect();
        let fit = kmeans(&points, &config(5)).unwrap();
        assert_eq!(fit.labels.len(), 40);
        assert!(fit.labels.iter().all(|&l| l < 5));
        assert_eq!(fit.centroids.len(), 5);
    }

    #[test]
    fn test_fewer_points_than_k() {
        let fit = kmeans(&[[1.0, 1.0], [2.0, 2.0]], &config(5)).unwrap();
        assert_eq!(fit.centroids.len(), 2);
        assert_ne!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.inertia, 0.0);
    }

    #[test]
    fn test_identical_points() {
        let fit = kmeans(&[[3.0, 0.5]; 6], &config(3)).unwrap();
        assert_eq!(fit.inertia, 0.0);
        assert!(fit.labels.iter().all(|&l| l < 3));
    }

    #[test]
    fn test_iteration_cap_is_respected() {
        let points: Vec<[f64; 2]> = (0..200).map(|i| [(i * 37 % 101) as f64, (i % 13) as f64]).collect();
        let mut cfg = config(5);
        cfg.max_iter = 1;
        let fit = kmeans(&points, &cfg).unwrap();
        assert!(fit.iterations <= 1);

        cfg.max_iter = 0;
        let fit = kmeans(&points, &cfg).unwrap();
        assert_eq!(fit.iterations, 0);
        assert_eq!(fit.labels.len(), 200);
    }

    #[test]
    fn test_empty_cluster_takes_farthest_point() {
        let points = [[0.0, 0.0], [1.0, 0.0], [10.0, 0.0]];
        let centroids = update(&points, &[0, 0, 0], &[[0.0, 0.0], [100.0, 0.0]]);
        assert_eq!(centroids[0], [11.0 / 3.0, 0.0]);
        assert_eq!(centroids[1], [10.0, 0.0]);
    }

    #[test]
    fn test_update_without_empty_cluster_is_plain_mean() {
        let points = [[0.0, 0.0], [2.0, 2.0], [10.0, 0.0]];
        let centroids = update(&points, &[0, 0, 1], &[[0.0, 0.0], [9.0, 0.0]]);
        assert_eq!(centroids, vec![[1.0, 1.0], [10.0, 0.0]]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(kmeans(&two_blobs(), &config(0)), Err(PipelineError::InvalidClusterCount));
        assert_eq!(
            kmeans(&two_blobs(), &config(MAX_CLUSTERS + 1)),
            Err(PipelineError::InvalidClusterCount)
        );
        assert!(config(MAX_CLUSTERS).validate().is_ok());
        assert!(kmeans(&[], &config(2)).is_err());
        assert!(kmeans(&[[f64::NAN, 0.0]], &config(1)).is_err());
    }
}
