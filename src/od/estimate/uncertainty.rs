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

use crate::linalg::{DMatrix, Matrix6, Vector6};
use crate::od::ODError;
use std::fmt;
use typed_builder::TypedBuilder;

/// Builds the apriori covariance of a Cartesian state, from its one sigma uncertainty on each component.
///
/// # Usage
/// Use the `TypedBuilder` trait, e.g. `StateUncertainty::builder().x_km(0.5).y_km(0.5).z_km(0.5).build()`
/// to build an uncertainty of 500 meters on each position component and the default on the velocity.
#[derive(Clone, Copy, Debug, TypedBuilder)]
#[builder(doc)]
pub struct StateUncertainty {
    #[builder(default = 0.5)]
    pub x_km: f64,
    #[builder(default = 0.5)]
    pub y_km: f64,
    #[builder(default = 0.5)]
    pub z_km: f64,
    #[builder(default = 50e-5)]
    pub vx_km_s: f64,
    #[builder(default = 50e-5)]
    pub vy_km_s: f64,
    #[builder(default = 50e-5)]
    pub vz_km_s: f64,
    /// Uncertainty of each bias component, in the unit of its measurement
    #[builder(default = 1.0)]
    pub bias: f64,
}

impl StateUncertainty {
    /// Returns the diagonal covariance of the Cartesian state
    pub fn cartesian_covariance(&self) -> Result<Matrix6<f64>, ODError> {
        let sigmas = Vector6::new(
            self.x_km,
            self.y_km,
            self.z_km,
            self.vx_km_s,
            self.vy_km_s,
            self.vz_km_s,
        );
        if sigmas.iter().any(|s| *s <= 0.0) {
            return Err(ODError::config(format!(
                "uncertainties must be strictly positive, got {sigmas}"
            )));
        }
        Ok(Matrix6::from_diagonal(&sigmas.map(|s| s.powi(2))))
    }

    /// Returns the diagonal covariance of a state made of the Cartesian state and the provided number of bias components
    pub fn covariance(&self, num_bias_components: usize) -> Result<DMatrix<f64>, ODError> {
        if num_bias_components > 0 && self.bias <= 0.0 {
            return Err(ODError::config(format!(
                "bias uncertainty must be strictly positive, got {}",
                self.bias
            )));
        }
        let size = 6 + num_bias_components;
        let mut covar = DMatrix::zeros(size, size);
        covar
            .view_mut((0, 0), (6, 6))
            .copy_from(&self.cartesian_covariance()?);
        for i in 6..size {
            covar[(i, i)] = self.bias.powi(2);
        }
        Ok(covar)
    }
}

impl fmt::Display for StateUncertainty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "σ_x = {} km  σ_y = {} km  σ_z = {} km",
            self.x_km, self.y_km, self.z_km
        )?;
        writeln!(
            f,
            "σ_vx = {} km/s  σ_vy = {} km/s  σ_vz = {} km/s",
            self.vx_km_s, self.vy_km_s, self.vz_km_s
        )?;
        write!(f, "σ_bias = {}", self.bias)
    }
}
