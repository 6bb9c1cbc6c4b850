/*
    Nyx, blazing fast astrodynamics
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::{ConvergenceStatus, IterationStatistics, ResidualRms};
use crate::linalg::{DMatrix, DVector};
use crate::od::estimate::SolveForElement;
use crate::time::Epoch;
use std::fmt;

/// Summary of one iteration of the batch estimator.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationReport {
    /// Zero-based index of the iteration
    pub iteration: usize,
    pub status: ConvergenceStatus,
    pub rms: ResidualRms,
    /// Estimate after the correction of this iteration
    pub state: DVector<f64>,
    pub correction: DVector<f64>,
    pub statistics: IterationStatistics,
}

impl fmt::Display for IterationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Iteration {}: {} -- {}; |dx| = {:.6e}",
            self.iteration,
            self.status,
            self.rms,
            self.correction.norm()
        )?;
        write!(f, "{}", self.statistics)
    }
}

/// The final solution of the batch estimator.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchSolution {
    pub estimation_epoch: Epoch,
    pub elements: Vec<SolveForElement>,
    /// Estimated solve-for vector at the estimation epoch
    pub state: DVector<f64>,
    /// Covariance of the solve-for vector, i.e. the inverse of the final information matrix
    pub covariance: DMatrix<f64>,
    /// Covariance of the Cartesian state of the estimated objects
    pub cartesian_covariance: DMatrix<f64>,
    /// Covariance of the Keplerian elements, unavailable for orbits where they are singular
    pub keplerian_covariance: Option<DMatrix<f64>>,
    pub status: ConvergenceStatus,
    pub iterations: usize,
    pub rms: ResidualRms,
    pub reports: Vec<IterationReport>,
}

impl BatchSolution {
    pub fn converged(&self) -> bool {
        self.status.is_converged()
    }

    /// One sigma standard deviation of each solve-for element
    pub fn sigmas(&self) -> DVector<f64> {
        self.covariance.diagonal().map(|v| v.abs().sqrt())
    }

    /// Correlation matrix of the solve-for elements; elements with a null variance have null correlations
    pub fn correlation(&self) -> DMatrix<f64> {
        correlation(&self.covariance)
    }

    /// Index of the provided element in the solve-for vector
    pub fn element_index(&self, element: &SolveForElement) -> Option<usize> {
        self.elements.iter().position(|e| e == element)
    }
}

/// Normalizes a covariance into a correlation matrix
pub fn correlation(covariance: &DMatrix<f64>) -> DMatrix<f64> {
    let sigmas = covariance.diagonal().map(|v| v.abs().sqrt());
    DMatrix::from_fn(covariance.nrows(), covariance.ncols(), |i, j| {
        let denom = sigmas[i] * sigmas[j];
        if denom > 0.0 {
            covariance[(i, j)] / denom
        } else {
            0.0
        }
    })
}

impl fmt::Display for BatchSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "Iterations: {}", self.iterations)?;
        writeln!(f, "Final {}", self.rms)?;
        writeln!(f, "Estimation epoch: {}", self.estimation_epoch)?;
        let sigmas = self.sigmas();
        for (i, element) in self.elements.iter().enumerate() {
            writeln!(
                f,
                "{:<24} {:>+.9e} +/- {:.6e}",
                element.to_string(),
                self.state[i],
                sigmas[i]
            )?;
        }
        write!(f, "Correlation:{:.4}", self.correlation())
    }
}

#[cfg(test)]
mod ut_solution {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn correlation_matrix() {
        let covar = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 9.0, 0.0, 0.0, 0.0, 0.0]);
        let corr = correlation(&covar);
        assert_abs_diff_eq!(corr[(0, 0)], 1.0);
        assert_abs_diff_eq!(corr[(1, 1)], 1.0);
        assert_abs_diff_eq!(corr[(0, 1)], 1.0 / 6.0);
        assert_abs_diff_eq!(corr[(1, 0)], 1.0 / 6.0);
        assert_eq!(corr[(2, 2)], 0.0);
    }
}
