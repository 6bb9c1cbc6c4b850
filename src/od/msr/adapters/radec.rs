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

use super::range::signal_feasibility;
use super::ObservableModel;
use crate::linalg::Vector3;
use crate::od::msr::{elevation_angle, wrap_degrees, Feasibility, MeasurementType, PhysicalMeasurement};
use crate::od::ODError;
use crate::time::Epoch;

/// Topocentric right ascension and declination of the second participant, in degrees, from the inertial range vector.
#[derive(Clone, Debug)]
pub struct RaDec {
    msr: PhysicalMeasurement,
}

impl RaDec {
    pub fn new(msr: PhysicalMeasurement) -> Self {
        Self { msr }
    }
}

/// Right ascension in (-π, π] and declination in radians of the provided vector
fn right_ascension_declination(rho: &Vector3<f64>) -> (f64, f64) {
    (rho.y.atan2(rho.x), elevation_angle(rho))
}

impl ObservableModel for RaDec {
    fn msr_type(&self) -> MeasurementType {
        MeasurementType::RaDec
    }

    fn physical(&self) -> &PhysicalMeasurement {
        &self.msr
    }

    fn physical_mut(&mut self) -> &mut PhysicalMeasurement {
        &mut self.msr
    }

    fn compute_value(&mut self, epoch: Epoch) -> Result<Vec<f64>, ODError> {
        let rho = self.msr.core.compute_geometry(epoch)?.range_vec_inertial;
        let (ra, dec) = right_ascension_declination(&rho);
        Ok(vec![wrap_degrees(ra.to_degrees()), dec.to_degrees()])
    }

    fn check_feasibility(&mut self, epoch: Epoch, with_events: bool) -> Result<Feasibility, ODError> {
        signal_feasibility(&mut self.msr, epoch, with_events)
    }

    fn gradients(&mut self, epoch: Epoch) -> Result<Vec<(Vector3<f64>, Vector3<f64>)>, ODError> {
        let rho = self.msr.core.compute_geometry(epoch)?.range_vec_inertial;
        let r = rho.norm();
        let (ra, dec) = right_ascension_declination(&rho);
        let (sin_ra, cos_ra) = ra.sin_cos();
        let (sin_dec, cos_dec) = dec.sin_cos();

        let d_ra = (Vector3::new(-sin_ra, cos_ra, 0.0) / (r * cos_dec)).map(f64::to_degrees);
        let d_dec =
            (Vector3::new(-sin_dec * cos_ra, -sin_dec * sin_ra, cos_dec) / r).map(f64::to_degrees);
        let zero = Vector3::zeros();

        Ok(vec![(d_ra, zero), (d_dec, zero)])
    }
}
