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

use crate::cosmic::EARTH_GM_KM3_S2;
use crate::linalg::{Matrix6, Vector3, Vector6, U4};
use hyperdual::linalg::norm;
use hyperdual::{hyperspace_from_vector, Float, OHyperdual};
use snafu::Snafu;

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DynamicsError {
    #[snafu(display("state is at the singularity of the dynamics: radius of {rmag_km} km"))]
    Singularity { rmag_km: f64 },
}

/// A trait for models with equations of motion that can be integrated, and differentiated for the state transition matrix.
pub trait Dynamics: Clone + Send + Sync {
    /// Defines the equations of motion of the Cartesian state, in [km, km/s].
    fn eom(&self, delta_t_s: f64, state: &Vector6<f64>) -> Result<Vector6<f64>, DynamicsError>;

    /// Defines the equations of motion and their gradient with respect to the state, the "A" matrix.
    fn dual_eom(
        &self,
        delta_t_s: f64,
        state: &Vector6<f64>,
    ) -> Result<(Vector6<f64>, Matrix6<f64>), DynamicsError>;
}

/// `TwoBody` provides the point mass equations of motion of the central body.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TwoBody {
    pub mu_km3_s2: f64,
}

impl TwoBody {
    pub fn new(mu_km3_s2: f64) -> Self {
        Self { mu_km3_s2 }
    }
}

impl Default for TwoBody {
    fn default() -> Self {
        Self::new(EARTH_GM_KM3_S2)
    }
}

impl Dynamics for TwoBody {
    fn eom(&self, _delta_t_s: f64, state: &Vector6<f64>) -> Result<Vector6<f64>, DynamicsError> {
        let radius = state.fixed_rows::<3>(0).into_owned();
        let rmag_km = radius.norm();
        if rmag_km <= f64::EPSILON {
            return Err(DynamicsError::Singularity { rmag_km });
        }
        let body_acceleration = (-self.mu_km3_s2 / rmag_km.powi(3)) * radius;

        Ok(Vector6::from_iterator(
            state
                .fixed_rows::<3>(3)
                .iter()
                .chain(body_acceleration.iter())
                .cloned(),
        ))
    }

    fn dual_eom(
        &self,
        _delta_t_s: f64,
        state: &Vector6<f64>,
    ) -> Result<(Vector6<f64>, Matrix6<f64>), DynamicsError> {
        // Only the position partials are non trivial, so build a 3D hyperspace
        let radius_real: Vector3<f64> = state.fixed_rows::<3>(0).into_owned();
        let radius: Vector3<OHyperdual<f64, U4>> =
            hyperspace_from_vector(&radius_real);

        let rmag = norm(&radius);
        if rmag.real() <= f64::EPSILON {
            return Err(DynamicsError::Singularity {
                rmag_km: rmag.real(),
            });
        }
        let body_acceleration =
            radius * (OHyperdual::<f64, U4>::from(-self.mu_km3_s2) / rmag.powi(3));

        let mut fx = Vector6::zeros();
        let mut grad = Matrix6::zeros();
        for i in 0..3 {
            fx[i] = state[i + 3];
            // d(position)/dt = velocity
            grad[(i, i + 3)] = 1.0;
            fx[i + 3] = body_acceleration[i].real();
            for j in 1..4 {
                grad[(i + 3, j - 1)] = body_acceleration[i][j];
            }
        }

        Ok((fx, grad))
    }
}

#[cfg(test)]
mod ut_dynamics {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gradient_matches_finite_differences() {
        let dyn_ = TwoBody::default();
        let state = Vector6::new(7_000.0, 1_200.0, -300.0, 0.5, 7.2, 1.1);
        let (fx, grad) = dyn_.dual_eom(0.0, &state).unwrap();
        let eom = dyn_.eom(0.0, &state).unwrap();
        for i in 0..6 {
            assert_relative_eq!(fx[i], eom[i], max_relative = 1e-14);
        }

        let h = 1e-2;
        for j in 0..3 {
            let mut plus = state;
            plus[j] += h;
            let mut minus = state;
            minus[j] -= h;
            let fd = (dyn_.eom(0.0, &plus).unwrap() - dyn_.eom(0.0, &minus).unwrap()) / (2.0 * h);
            for i in 3..6 {
                assert_relative_eq!(grad[(i, j)], fd[i], max_relative = 1e-6, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn singular_state() {
        assert!(TwoBody::default().eom(0.0, &Vector6::zeros()).is_err());
    }
}
