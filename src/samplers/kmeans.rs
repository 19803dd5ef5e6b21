use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// K-Means clustering over entity vectors.
///
/// Lloyd's algorithm with k-means++ initialization. Rows of the input matrix
/// are points; `k` is clamped to the number of points.
#[derive(Debug, Clone)]
pub struct KMeans {
    n_clusters: usize,
    max_iter: usize,
    tol: f64,
    random_state: Option<u64>,
    centroids: Option<Array2<f64>>,
    labels: Option<Vec<usize>>,
    inertia: f64,
    n_iter: usize,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 100,
            tol: 1e-4,
            random_state: None,
            centroids: None,
            labels: None,
            inertia: 0.0,
            n_iter: 0,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol.max(0.0);
        self
    }

    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Cluster the rows of `data`.
    pub fn fit(&mut self, data: &Array2<f64>) -> Result<()> {
        let n = data.nrows();
        if n == 0 {
            return Err(Error::InvalidParameter {
                param: "data",
                message: "cannot cluster an empty matrix".to_string(),
            });
        }
        if self.n_clusters == 0 {
            return Err(Error::InvalidParameter {
                param: "n_clusters",
                message: "must be at least 1".to_string(),
            });
        }
        let k = self.n_clusters.min(n);
        let dim = data.ncols();

        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut centroids = self.init_plus_plus(data, k, &mut rng);
        let mut labels = vec![0usize; n];
        let mut inertia = 0.0;

        for iteration in 0..self.max_iter {
            // Assignment step
            inertia = 0.0;
            for (i, point) in data.rows().into_iter().enumerate() {
                let mut best = f64::INFINITY;
                let mut best_cluster = 0;
                for (c, centroid) in centroids.rows().into_iter().enumerate() {
                    let dist = squared_distance(point, centroid);
                    if dist < best {
                        best = dist;
                        best_cluster = c;
                    }
                }
                labels[i] = best_cluster;
                inertia += best;
            }

            // Update step; empty clusters keep their previous centroid
            let mut sums = Array2::<f64>::zeros((k, dim));
            let mut counts = vec![0usize; k];
            for (i, point) in data.rows().into_iter().enumerate() {
                let c = labels[i];
                counts[c] += 1;
                for (j, &v) in point.iter().enumerate() {
                    sums[[c, j]] += v;
                }
            }

            let mut shift = 0.0;
            for c in 0..k {
                if counts[c] == 0 {
                    continue;
                }
                for j in 0..dim {
                    let updated = sums[[c, j]] / counts[c] as f64;
                    let delta = updated - centroids[[c, j]];
                    shift += delta * delta;
                    centroids[[c, j]] = updated;
                }
            }

            self.n_iter = iteration + 1;
            if shift < self.tol {
                break;
            }
        }

        // Final assignment against the converged centroids
        inertia = 0.0;
        for (i, point) in data.rows().into_iter().enumerate() {
            let mut best = f64::INFINITY;
            let mut best_cluster = 0;
            for (c, centroid) in centroids.rows().into_iter().enumerate() {
                let dist = squared_distance(point, centroid);
                if dist < best {
                    best = dist;
                    best_cluster = c;
                }
            }
            labels[i] = best_cluster;
            inertia += best;
        }

        self.centroids = Some(centroids);
        self.labels = Some(labels);
        self.inertia = inertia;
        Ok(())
    }

    /// k-means++ seeding: the first centroid is uniform, later ones are
    /// drawn proportionally to squared distance from the nearest chosen
    /// centroid.
    fn init_plus_plus(&self, data: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
        let n = data.nrows();
        let dim = data.ncols();
        let mut centroids = Array2::<f64>::zeros((k, dim));

        let first = rng.gen_range(0..n);
        centroids.row_mut(0).assign(&data.row(first));

        let mut distances: Vec<f64> = data
            .rows()
            .into_iter()
            .map(|p| squared_distance(p, centroids.row(0)))
            .collect();

        for c in 1..k {
            let total: f64 = distances.iter().sum();
            let chosen = if total > 0.0 {
                let mut target = rng.gen::<f64>() * total;
                let mut chosen = n - 1;
                for (i, &d) in distances.iter().enumerate() {
                    target -= d;
                    if target <= 0.0 {
                        chosen = i;
                        break;
                    }
                }
                chosen
            } else {
                rng.gen_range(0..n)
            };
            centroids.row_mut(c).assign(&data.row(chosen));

            for (i, point) in data.rows().into_iter().enumerate() {
                let dist = squared_distance(point, centroids.row(c));
                if dist < distances[i] {
                    distances[i] = dist;
                }
            }
        }
        centroids
    }

    pub fn centroids(&self) -> Option<&Array2<f64>> {
        self.centroids.as_ref()
    }

    pub fn labels(&self) -> Option<&[usize]> {
        self.labels.as_deref()
    }

    /// Sum of squared distances to the assigned centroids.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blob_data() -> Array2<f64> {
        Array2::from_shape_vec(
            (6, 2),
            vec![
                1.0, 2.0, //
                1.0, 4.0, //
                1.0, 0.0, //
                10.0, 2.0, //
                10.0, 4.0, //
                10.0, 0.0,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_fit_separates_two_blobs() {
        let data = two_blob_data();
        let mut kmeans = KMeans::new(2).with_random_state(0);
        kmeans.fit(&data).unwrap();

        let labels = kmeans.labels().unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);

        // Cluster means are (1, 2) and (10, 2), in either order.
        let centroids = kmeans.centroids().unwrap();
        let mut xs: Vec<f64> = centroids.column(0).to_vec();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((xs[0] - 1.0).abs() < 1e-9);
        assert!((xs[1] - 10.0).abs() < 1e-9);
        assert!((centroids[[0, 1]] - 2.0).abs() < 1e-9);
        assert!((centroids[[1, 1]] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_k_clamped_to_point_count() {
        let data = Array2::from_shape_vec((2, 1), vec![0.0, 5.0]).unwrap();
        let mut kmeans = KMeans::new(8).with_random_state(1);
        kmeans.fit(&data).unwrap();
        assert_eq!(kmeans.centroids().unwrap().nrows(), 2);
        assert!(kmeans.inertia() < 1e-9);
    }

    #[test]
    fn test_empty_data_is_an_error() {
        let data = Array2::<f64>::zeros((0, 2));
        let mut kmeans = KMeans::new(2);
        assert!(kmeans.fit(&data).is_err());
    }

    #[test]
    fn test_seeded_fit_is_deterministic() {
        let data = two_blob_data();
        let mut a = KMeans::new(2).with_random_state(7);
        let mut b = KMeans::new(2).with_random_state(7);
        a.fit(&data).unwrap();
        b.fit(&data).unwrap();
        assert_eq!(a.labels().unwrap(), b.labels().unwrap());
    }
}
