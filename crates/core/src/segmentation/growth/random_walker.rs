//! Random-walker segmentation
//!
//! Each unlabelled cell is assigned the label whose markers a random walker
//! starting at that cell is most likely to reach first. The walk is biased by
//! the cost surface: stepping between cells of very different cost is unlikely.
//!
//! # Algorithm
//!
//! 1. Restrict the graph to masked cells connected to at least one marker
//! 2. Weight each face edge: `w_ij = exp(-beta' * (c_i - c_j)^2) + EPS`, with costs
//!    normalised to `[0, 1]` and `beta' = beta / (10 * std(c))`
//! 3. For each label `l`, solve the Dirichlet problem `L_U x_l = b_l`, where
//!    `L_U` is the graph Laplacian over unlabelled cells and `b_l` collects the
//!    edge weights to markers of label `l`
//! 4. Assign each unlabelled cell `argmax_l x_l`, ties to the smallest label
//!
//! Restricting to marker-connected components keeps `L_U` positive definite.
//!
//! # References
//!
//! - Grady (2006) "Random Walks for Image Segmentation"

use super::{reachable_from_markers, seeded_output, GrowthAlgorithm};
use crate::config::{RandomWalkerConfig, RandomWalkerMode};
use crate::error::{Result, SegmentationError};
use crate::grid::{FrameShape, BACKGROUND};
use crate::segmentation::cost::CostSurface;
use crate::segmentation::markers::MarkerArray;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

/// Added to every edge weight so no edge is fully disconnected
const EPS: f64 = 1e-6;

/// Random-walker growth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomWalker {
    config: RandomWalkerConfig,
}

impl RandomWalker {
    /// Create a random walker with the given numerics
    #[must_use]
    pub fn new(config: RandomWalkerConfig) -> Self {
        Self { config }
    }
}

impl Default for RandomWalker {
    fn default() -> Self {
        Self::new(RandomWalkerConfig::default())
    }
}

/// Edge weights derived from a normalised cost surface
struct EdgeWeights {
    data: Vec<f64>,
    beta: f64,
}

impl EdgeWeights {
    fn new(cost: &CostSurface, beta: f64) -> Self {
        let data: Vec<f64> = cost
            .costs()
            .iter()
            .map(|&c| f64::from(c) / f64::from(u16::MAX))
            .collect();
        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let variance = data.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        let beta = if std > 0.0 { beta / (10.0 * std) } else { 0.0 };
        Self { data, beta }
    }

    #[inline]
    fn between(&self, a: usize, b: usize) -> f64 {
        let gradient = self.data[a] - self.data[b];
        (-self.beta * gradient * gradient).exp() + EPS
    }
}

/// Laplacian over unlabelled cells in compressed-row form
///
/// Off-diagonal entries are stored as positive weights and subtracted in
/// [`SparseLaplacian::mul`].
struct SparseLaplacian {
    diag: Vec<f64>,
    row_start: Vec<usize>,
    cols: Vec<usize>,
    weights: Vec<f64>,
}

impl SparseLaplacian {
    fn size(&self) -> usize {
        self.diag.len()
    }

    fn mul(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(self.size(), |row, _| {
            let off: f64 = (self.row_start[row]..self.row_start[row + 1])
                .map(|k| self.weights[k] * x[self.cols[k]])
                .sum();
            self.diag[row] * x[row] - off
        })
    }

    fn to_dense(&self) -> DMatrix<f64> {
        let n = self.size();
        let mut dense = DMatrix::zeros(n, n);
        for row in 0..n {
            dense[(row, row)] = self.diag[row];
            for k in self.row_start[row]..self.row_start[row + 1] {
                dense[(row, self.cols[k])] -= self.weights[k];
            }
        }
        dense
    }
}

/// Linear system of one frame: Laplacian plus one right-hand side per label
struct WalkerSystem {
    laplacian: SparseLaplacian,
    rhs: DMatrix<f64>,
}

impl WalkerSystem {
    /// Assemble over `cells` (unlabelled, marker-connected), `row_of` maps a flat
    /// index to its row in the system
    fn assemble(
        shape: FrameShape,
        cells: &[usize],
        row_of: &[Option<usize>],
        markers: &MarkerArray,
        labels: &[u32],
        weights: &EdgeWeights,
    ) -> Self {
        let n = cells.len();
        let mut diag = vec![0.0; n];
        let mut row_start = Vec::with_capacity(n + 1);
        let mut cols = Vec::new();
        let mut off = Vec::new();
        let mut rhs = DMatrix::zeros(n, labels.len());
        let seeds = markers.labels();

        for (row, &cell) in cells.iter().enumerate() {
            row_start.push(cols.len());
            shape.for_each_neighbor(cell, |neighbor| {
                let seed = seeds[neighbor];
                if seed != BACKGROUND {
                    let w = weights.between(cell, neighbor);
                    diag[row] += w;
                    if let Ok(k) = labels.binary_search(&seed) {
                        rhs[(row, k)] += w;
                    }
                } else if let Some(col) = row_of[neighbor] {
                    let w = weights.between(cell, neighbor);
                    diag[row] += w;
                    cols.push(col);
                    off.push(w);
                }
            });
        }
        row_start.push(cols.len());

        Self {
            laplacian: SparseLaplacian {
                diag,
                row_start,
                cols,
                weights: off,
            },
            rhs,
        }
    }

    fn solve(&self, frame: usize, config: &RandomWalkerConfig) -> Result<DMatrix<f64>> {
        match config.mode {
            RandomWalkerMode::BruteForce => self.solve_dense(frame),
            RandomWalkerMode::ConjugateGradient => self.solve_cg(frame, config),
        }
    }

    fn solve_dense(&self, frame: usize) -> Result<DMatrix<f64>> {
        let cholesky =
            self.laplacian
                .to_dense()
                .cholesky()
                .ok_or_else(|| SegmentationError::SolverFailed {
                    frame,
                    reason: "Laplacian is not positive definite".to_owned(),
                })?;
        Ok(cholesky.solve(&self.rhs))
    }

    fn solve_cg(&self, frame: usize, config: &RandomWalkerConfig) -> Result<DMatrix<f64>> {
        let n = self.laplacian.size();
        let inv_diag = DVector::from_iterator(n, self.laplacian.diag.iter().map(|d| 1.0 / d));
        let mut solution = DMatrix::zeros(n, self.rhs.ncols());

        for label in 0..self.rhs.ncols() {
            let b: DVector<f64> = self.rhs.column(label).into_owned();
            let (x, iterations) = conjugate_gradient(&self.laplacian, &inv_diag, &b, config)
                .ok_or_else(|| SegmentationError::SolverFailed {
                    frame,
                    reason: format!(
                        "conjugate gradient did not reach tolerance {} in {} iterations",
                        config.tolerance, config.max_iterations
                    ),
                })?;
            trace!(
                "Frame {}: label column {} converged in {} iterations",
                frame,
                label,
                iterations
            );
            solution.set_column(label, &x);
        }
        Ok(solution)
    }
}

/// Jacobi-preconditioned conjugate gradient
///
/// Stops when `||r|| / ||b|| < tolerance`. Returns the solution and the number of
/// iterations used, or `None` if the iteration cap is reached first.
fn conjugate_gradient(
    a: &SparseLaplacian,
    inv_diag: &DVector<f64>,
    b: &DVector<f64>,
    config: &RandomWalkerConfig,
) -> Option<(DVector<f64>, usize)> {
    let n = b.len();
    let mut x = DVector::zeros(n);
    let b_norm = b.norm();
    if b_norm == 0.0 {
        return Some((x, 0));
    }

    let mut r = b.clone();
    let mut z = r.component_mul(inv_diag);
    let mut p = z.clone();
    let mut rz = r.dot(&z);

    for iteration in 1..=config.max_iterations {
        let ap = a.mul(&p);
        let alpha = rz / p.dot(&ap);
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);
        if r.norm() / b_norm < config.tolerance {
            return Some((x, iteration));
        }
        z = r.component_mul(inv_diag);
        let rz_next = r.dot(&z);
        p = &z + &p * (rz_next / rz);
        rz = rz_next;
    }
    None
}

impl GrowthAlgorithm for RandomWalker {
    fn grow(
        &self,
        frame: usize,
        cost: &CostSurface,
        markers: &MarkerArray,
        unmasked: &[bool],
    ) -> Result<Vec<u32>> {
        let shape = cost.shape();
        let mut output = seeded_output(markers);
        if markers.is_empty() {
            return Ok(output);
        }

        let active = reachable_from_markers(shape, markers, unmasked);
        let mut row_of = vec![None; shape.len()];
        let mut cells = Vec::new();
        for (index, &reached) in active.iter().enumerate() {
            if reached && markers.labels()[index] == BACKGROUND {
                row_of[index] = Some(cells.len());
                cells.push(index);
            }
        }
        if cells.is_empty() {
            return Ok(output);
        }

        let mut labels: Vec<u32> = markers.seeds().map(|(_, label)| label).collect();
        labels.sort_unstable();
        labels.dedup();

        let weights = EdgeWeights::new(cost, self.config.beta);
        let system = WalkerSystem::assemble(shape, &cells, &row_of, markers, &labels, &weights);
        debug!(
            "Frame {}: random walker over {} cells, {} labels ({:?})",
            frame,
            cells.len(),
            labels.len(),
            self.config.mode
        );
        let probabilities = system.solve(frame, &self.config)?;

        for (row, &cell) in cells.iter().enumerate() {
            let mut best = 0;
            for k in 1..labels.len() {
                if probabilities[(row, k)] > probabilities[(row, best)] {
                    best = k;
                }
            }
            output[cell] = labels[best];
        }

        Ok(output)
    }

    fn name(&self) -> &'static str {
        "random_walker"
    }
}
