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

use super::inversion::{invert, InversionAlgorithm};
use crate::linalg::{DMatrix, DVector, RowDVector};
use crate::od::ODError;

/// The normal equations of one pass over the observations: the information matrix Λ = Σ Hᵀ W H (plus the
/// apriori information) and the right hand side Σ Hᵀ W r (plus the apriori term).
///
/// The accepted rows are kept to compute the predicted RMS once the correction is known.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalEquations {
    information: DMatrix<f64>,
    rhs: DVector<f64>,
    partials: Vec<RowDVector<f64>>,
    residuals: Vec<f64>,
    weights: Vec<f64>,
}

impl NormalEquations {
    /// Initializes the normal equations of a state of the provided size, with the apriori information if any.
    /// With an apriori, Λ starts at the apriori information and the right hand side at `Λ·x0bar`.
    pub fn new(size: usize, apriori_information: Option<&DMatrix<f64>>, x0bar: &DVector<f64>) -> Self {
        let (information, rhs) = match apriori_information {
            Some(info) => (info.clone(), info * x0bar),
            None => (DMatrix::zeros(size, size), DVector::zeros(size)),
        };
        Self {
            information,
            rhs,
            partials: Vec::new(),
            residuals: Vec::new(),
            weights: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.rhs.len()
    }

    /// Adds one accepted scalar residual, with its weight and its row of partials mapped to the estimation epoch.
    pub fn accumulate(
        &mut self,
        partials: RowDVector<f64>,
        residual: f64,
        weight: f64,
    ) -> Result<(), ODError> {
        if partials.len() != self.size() {
            return Err(ODError::Measurement {
                details: format!(
                    "measurement partials have {} columns but the estimation state has {} elements",
                    partials.len(),
                    self.size()
                ),
            });
        }
        self.information += partials.transpose() * &partials * weight;
        self.rhs += partials.transpose() * (weight * residual);
        self.partials.push(partials);
        self.residuals.push(residual);
        self.weights.push(weight);
        Ok(())
    }

    pub fn information(&self) -> &DMatrix<f64> {
        &self.information
    }

    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    /// Number of accumulated scalar residuals
    pub fn residual_count(&self) -> usize {
        self.residuals.len()
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Weighted root mean square of the accumulated residuals, `sqrt(Σ w r² / n)`, or zero without residuals.
    pub fn weighted_rms(&self) -> f64 {
        if self.residuals.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .residuals
            .iter()
            .zip(&self.weights)
            .map(|(r, w)| w * r * r)
            .sum();
        (sum / self.residuals.len() as f64).sqrt()
    }

    /// Weighted sum of the squares of the residuals after the linearized correction: `Σ w (r − h·dx)²`.
    pub fn predicted_sum_squares(&self, dx: &DVector<f64>) -> f64 {
        self.partials
            .iter()
            .zip(self.residuals.iter().zip(&self.weights))
            .map(|(h, (r, w))| {
                let post_fit = r - h.dot(&dx.transpose());
                w * post_fit * post_fit
            })
            .sum()
    }

    /// Solves the normal equations, returning the covariance `Λ⁻¹` and the correction `dx = Λ⁻¹·RHS`.
    pub fn solve(
        &self,
        algorithm: InversionAlgorithm,
    ) -> Result<(DMatrix<f64>, DVector<f64>), ODError> {
        let covariance = invert(&self.information, algorithm)?;
        let dx = &covariance * &self.rhs;
        Ok((covariance, dx))
    }
}
