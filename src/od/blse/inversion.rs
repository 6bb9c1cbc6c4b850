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

use crate::linalg::DMatrix;
use crate::od::ODError;
use enum_iterator::Sequence;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Relative tolerance of the pivots of the Cholesky factorization
pub const CHOLESKY_EPSILON: f64 = 1e-8;

/// Algorithm used to invert the information matrix.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Sequence)]
pub enum InversionAlgorithm {
    /// Gaussian elimination with partial pivoting (nalgebra's `try_inverse`)
    #[default]
    Internal,
    /// Bordering method: the inverse is grown one row and column at a time
    Schur,
    /// Inverse of the upper triangular factor R of `A = RᵀR`
    Cholesky,
}

impl fmt::Display for InversionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Internal => "Internal",
            Self::Schur => "Schur",
            Self::Cholesky => "Cholesky",
        };
        write!(f, "{name}")
    }
}

impl FromStr for InversionAlgorithm {
    type Err = ODError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        enum_iterator::all::<Self>()
            .find(|algo| algo.to_string() == s)
            .ok_or_else(|| {
                ODError::config(format!(
                    "the requested inversion routine {s} is not an allowed value for the field \
                     \"InversionAlgorithm\"; allowed values are \"Internal\", \"Schur\" and \"Cholesky\""
                ))
            })
    }
}

impl InversionAlgorithm {
    /// Inverts the provided symmetric matrix, returning None if it is singular
    pub fn try_invert(self, matrix: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        if !matrix.is_square() {
            return None;
        }
        match self {
            Self::Internal => matrix.clone().try_inverse(),
            Self::Schur => schur_inverse(matrix),
            Self::Cholesky => cholesky_inverse(matrix),
        }
    }
}

/// Inverts the normal matrix with the provided algorithm.
pub fn invert(matrix: &DMatrix<f64>, algorithm: InversionAlgorithm) -> Result<DMatrix<f64>, ODError> {
    algorithm
        .try_invert(matrix)
        .ok_or_else(|| ODError::SingularMatrix {
            dimension: matrix.nrows(),
            details: format!("Normal matrix is singular ({algorithm} inversion)"),
        })
}

/// Inverts the apriori covariance into the apriori information matrix.
pub fn invert_apriori(covariance: &DMatrix<f64>) -> Result<DMatrix<f64>, ODError> {
    InversionAlgorithm::Internal
        .try_invert(covariance)
        .ok_or_else(|| ODError::SingularMatrix {
            dimension: covariance.nrows(),
            details: "Apriori covariance matrix is singular".to_string(),
        })
}

/// Inverse by the bordering method: the inverse of each leading block is built from the previous one.
fn schur_inverse(matrix: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let size = matrix.nrows();
    if size == 0 || matrix[(0, 0)] == 0.0 {
        return None;
    }

    let mut inv = DMatrix::from_element(1, 1, 1.0 / matrix[(0, 0)]);
    for n in 1..size {
        let b = matrix.view((0, n), (n, 1)).clone_owned();
        let delta = &inv * &b;
        let w = matrix[(n, n)] - b.dot(&delta);
        if w == 0.0 || !w.is_finite() {
            return None;
        }

        let mut grown = DMatrix::zeros(n + 1, n + 1);
        grown
            .view_mut((0, 0), (n, n))
            .copy_from(&(&inv + &delta * delta.transpose() / w));
        grown.view_mut((0, n), (n, 1)).copy_from(&(-&delta / w));
        grown
            .view_mut((n, 0), (1, n))
            .copy_from(&(-delta.transpose() / w));
        grown[(n, n)] = 1.0 / w;
        inv = grown;
    }
    Some(inv)
}

fn cholesky_inverse(matrix: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let size = matrix.nrows();
    let mut r = DMatrix::<f64>::zeros(size, size);

    for j in 0..size {
        for i in 0..=j {
            let mut dsum = matrix[(i, j)];
            for k in 0..i {
                dsum -= r[(k, i)] * r[(k, j)];
            }
            if i == j {
                // Pivots must be positive and above the numerical noise of the diagonal
                if dsum <= (CHOLESKY_EPSILON * matrix[(j, j)]).abs() {
                    return None;
                }
                r[(j, j)] = dsum.sqrt();
            } else {
                r[(i, j)] = dsum / r[(i, i)];
            }
        }
    }

    let r_inv = r.solve_upper_triangular(&DMatrix::identity(size, size))?;
    Some(&r_inv * r_inv.transpose())
}
