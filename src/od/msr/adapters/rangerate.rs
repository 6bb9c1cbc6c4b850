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
use crate::od::msr::{Feasibility, MeasurementType, PhysicalMeasurement};
use crate::od::ODError;
use crate::time::Epoch;

/// Instantaneous range rate between both participants, in km/s.
#[derive(Clone, Debug)]
pub struct RangeRate {
    msr: PhysicalMeasurement,
}

impl RangeRate {
    pub fn new(msr: PhysicalMeasurement) -> Self {
        Self { msr }
    }
}

impl ObservableModel for RangeRate {
    fn msr_type(&self) -> MeasurementType {
        MeasurementType::RangeRate
    }

    fn physical(&self) -> &PhysicalMeasurement {
        &self.msr
    }

    fn physical_mut(&mut self) -> &mut PhysicalMeasurement {
        &mut self.msr
    }

    fn compute_value(&mut self, epoch: Epoch) -> Result<Vec<f64>, ODError> {
        let geom = self.msr.core.compute_geometry(epoch)?;
        let unit = geom.range_vec_inertial / geom.range_km();
        Ok(vec![unit.dot(&geom.range_rate_vec_inertial)])
    }

    fn check_feasibility(&mut self, epoch: Epoch, with_events: bool) -> Result<Feasibility, ODError> {
        signal_feasibility(&mut self.msr, epoch, with_events)
    }

    fn gradients(&mut self, epoch: Epoch) -> Result<Vec<(Vector3<f64>, Vector3<f64>)>, ODError> {
        let geom = self.msr.core.compute_geometry(epoch)?;
        let rho = geom.range_km();
        let unit = geom.range_vec_inertial / rho;
        let rho_dot = unit.dot(&geom.range_rate_vec_inertial);
        Ok(vec![(
            (geom.range_rate_vec_inertial - rho_dot * unit) / rho,
            unit,
        )])
    }
}
