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

use super::{Feasibility, Geometry, Participant};
use crate::cosmic::{EARTH_EQUATORIAL_RADIUS_KM, OCCULTATION_MARGIN_KM};
use crate::linalg::Vector3;
use crate::od::{MeasurementSnafu, ODError};
use crate::time::Epoch;
use snafu::ensure;

/// Reason code of a measurement blocked by the elevation mask of the station
pub const BLOCKED_BY_ELEVATION: &str = "B1";
/// Reason code of an inter-satellite link blocked by the central body
pub const BLOCKED_BY_CENTRAL_BODY: &str = "B2";

/// The bookkeeping shared by all measurement models: the ordered participants and their geometry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoreMeasurement {
    participants: Vec<Participant>,
    initialized: bool,
    geometry: Option<Geometry>,
}

impl CoreMeasurement {
    pub fn new(participants: Vec<Participant>) -> Result<Self, ODError> {
        let mut me = Self::default();
        me.initialize(participants)?;
        Ok(me)
    }

    /// Fixes the order of the participants: a ground station always sorts first.
    /// Subsequent calls are no-ops and return false.
    pub fn initialize(&mut self, mut participants: Vec<Participant>) -> Result<bool, ODError> {
        if self.initialized {
            return Ok(false);
        }

        ensure!(
            participants.len() == 2,
            MeasurementSnafu {
                details: format!(
                    "a measurement requires exactly two participants, got {}",
                    participants.len()
                )
            }
        );

        // Stable: two spacecraft keep their signal path order
        participants.sort_by_key(|p| p.is_spacecraft());

        self.participants = participants;
        self.geometry = None;
        self.initialized = true;
        Ok(true)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant_ids(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.id().to_string()).collect()
    }

    /// Replaces the participant with the same identifier, e.g. with an updated spacecraft state.
    /// Returns whether a participant was replaced.
    pub fn update_participant(&mut self, participant: &Participant) -> bool {
        match self
            .participants
            .iter_mut()
            .find(|p| p.id() == participant.id())
        {
            Some(existing) => {
                *existing = participant.clone();
                self.geometry = None;
                true
            }
            None => false,
        }
    }

    /// Returns the index of the first spacecraft participant.
    pub fn spacecraft_index(&self) -> Result<usize, ODError> {
        self.participants
            .iter()
            .position(|p| p.is_spacecraft())
            .ok_or_else(|| ODError::Measurement {
                details: "neither participant is a spacecraft".to_string(),
            })
    }

    /// Computes the geometry at the provided epoch, unless it was already computed at that epoch.
    pub fn compute_geometry(&mut self, epoch: Epoch) -> Result<&Geometry, ODError> {
        ensure!(
            self.initialized,
            MeasurementSnafu {
                details: "geometry requested before the measurement was initialized".to_string()
            }
        );

        let geom = match self.geometry {
            Some(geom) if geom.rotations.is_valid_at(epoch) => geom,
            _ => Geometry::compute(epoch, &self.participants[0], &self.participants[1]),
        };
        Ok(self.geometry.insert(geom))
    }

    /// The geometry computed by the last call to `compute_geometry`
    pub fn geometry(&self) -> Result<&Geometry, ODError> {
        self.geometry.as_ref().ok_or_else(|| ODError::Measurement {
            details: "geometry was not computed".to_string(),
        })
    }

    /// Checks the line of sight between both participants, using the last computed geometry.
    ///
    /// From a ground station, the spacecraft must be above the local horizon. Between two spacecraft, the link
    /// must clear the obscuring body by the occultation margin.
    pub fn check_line_of_sight(&self, obscuring_radius_km: f64) -> Result<Feasibility, ODError> {
        let geom = self.geometry()?;
        if self.participants.iter().any(|p| p.is_ground_station()) {
            let z = geom.range_vec_obs.z;
            if z > 0.0 {
                Ok(Feasibility::feasible(z))
            } else {
                Ok(Feasibility::blocked(z, BLOCKED_BY_ELEVATION))
            }
        } else if line_of_sight_clear(&geom.positions[0], &geom.positions[1], obscuring_radius_km)
        {
            Ok(Feasibility::feasible(geom.range_km()))
        } else {
            Ok(Feasibility::blocked(geom.range_km(), BLOCKED_BY_CENTRAL_BODY))
        }
    }

    /// Checks the line of sight with the Earth as the obscuring body
    pub fn check_earth_line_of_sight(&self) -> Result<Feasibility, ODError> {
        self.check_line_of_sight(EARTH_EQUATORIAL_RADIUS_KM)
    }

    /// Returns the signal delay in seconds of the provided hardware of the provided participant, or zero if that
    /// participant has no such hardware.
    pub fn get_delay(
        &self,
        participant_index: usize,
        hardware_index: usize,
    ) -> Result<f64, ODError> {
        ensure!(
            participant_index < self.participants.len(),
            MeasurementSnafu {
                details: format!(
                    "participant index {participant_index} out of range, the measurement has {} participants",
                    self.participants.len()
                )
            }
        );

        let hardware = self.participants[participant_index].hardware();
        if hardware_index >= hardware.len() {
            Ok(0.0)
        } else {
            Ok(hardware[hardware_index].delay_s)
        }
    }

    /// Sum of the signal delays of all of the hardware on the signal path, in seconds
    pub fn total_delay_s(&self) -> f64 {
        self.participants
            .iter()
            .flat_map(|p| p.hardware())
            .map(|hw| hw.delay_s)
            .sum()
    }
}

/// Returns whether the segment between both inertial positions clears a sphere of the provided radius centered at the
/// origin, with the occultation margin.
pub fn line_of_sight_clear(p1: &Vector3<f64>, p2: &Vector3<f64>, radius_km: f64) -> bool {
    let rho = p2 - p1;
    let rho_sq = rho.norm_squared();
    if rho_sq == 0.0 {
        return true;
    }
    // Closest approach parameter, measured back from p2
    let tau = rho.dot(p2) / rho_sq;
    if tau <= 0.0 || tau >= 1.0 {
        return true;
    }
    (p2 - tau * rho).norm() > radius_km + OCCULTATION_MARGIN_KM
}
