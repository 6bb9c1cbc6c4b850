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

use super::ObservableModel;
use crate::cosmic::SPEED_OF_LIGHT_KM_S;
use crate::linalg::Vector3;
use crate::od::msr::BLOCKED_BY_ELEVATION;
use crate::od::msr::{elevation_angle, Feasibility, MeasurementType, PhysicalMeasurement};
use crate::od::ODError;
use crate::time::Epoch;

/// Returns the feasibility of a measurement at the provided elevation: the elevation must be strictly above the mask.
pub fn elevation_feasibility(elevation_deg: f64, mask_deg: f64) -> Feasibility {
    if elevation_deg > mask_deg {
        Feasibility::feasible(elevation_deg)
    } else {
        Feasibility::blocked(elevation_deg, BLOCKED_BY_ELEVATION)
    }
}

/// Feasibility of a signal between both participants: above the elevation mask of the station, or clear of the Earth
/// between two spacecraft. Without events, the signal is always feasible.
pub(crate) fn signal_feasibility(
    msr: &mut PhysicalMeasurement,
    epoch: Epoch,
    with_events: bool,
) -> Result<Feasibility, ODError> {
    let geom = *msr.core.compute_geometry(epoch)?;
    let station = msr
        .core
        .participants()
        .iter()
        .find_map(|p| p.as_ground_station());

    match station {
        Some(gs) => {
            let elevation_deg = elevation_angle(&geom.range_vec_obs).to_degrees();
            if with_events {
                Ok(elevation_feasibility(elevation_deg, gs.elevation_mask_deg))
            } else {
                Ok(Feasibility::feasible(elevation_deg))
            }
        }
        None if with_events => msr.core.check_earth_line_of_sight(),
        None => Ok(Feasibility::feasible(geom.range_km())),
    }
}

/// Range between both participants, in km, including the hardware delays and the media corrections.
#[derive(Clone, Debug)]
pub struct Range {
    msr: PhysicalMeasurement,
}

impl Range {
    pub fn new(msr: PhysicalMeasurement) -> Self {
        Self { msr }
    }
}

impl ObservableModel for Range {
    fn msr_type(&self) -> MeasurementType {
        MeasurementType::Range
    }

    fn physical(&self) -> &PhysicalMeasurement {
        &self.msr
    }

    fn physical_mut(&mut self) -> &mut PhysicalMeasurement {
        &mut self.msr
    }

    fn compute_value(&mut self, epoch: Epoch) -> Result<Vec<f64>, ODError> {
        let range_km = self.msr.core.compute_geometry(epoch)?.range_km();
        let delay_km = SPEED_OF_LIGHT_KM_S * self.msr.core.total_delay_s();
        let media = self.msr.media_correction(epoch)?;
        Ok(vec![range_km + delay_km + media.range_m * 1e-3])
    }

    fn check_feasibility(&mut self, epoch: Epoch, with_events: bool) -> Result<Feasibility, ODError> {
        signal_feasibility(&mut self.msr, epoch, with_events)
    }

    fn gradients(&mut self, epoch: Epoch) -> Result<Vec<(Vector3<f64>, Vector3<f64>)>, ODError> {
        let geom = self.msr.core.compute_geometry(epoch)?;
        let unit = geom.range_vec_inertial / geom.range_km();
        Ok(vec![(unit, Vector3::zeros())])
    }
}
