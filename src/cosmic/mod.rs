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

use crate::time::{Duration, Epoch};
use serde_derive::{Deserialize, Serialize};

mod orbit;
pub use orbit::{rss_orbit_errors, Orbit};

mod orbitdual;
pub use orbitdual::{KeplerianElement, OrbitDual, OrbitPartial};

/// Provides the body fixed, inertial and topocentric rotations, and the per-epoch rotation set.
pub mod rotation;
pub use rotation::RotationSet;

mod spacecraft;
pub use spacecraft::Spacecraft;

/// Speed of light in vacuum, in km/s
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;
/// Earth equatorial radius in km (WGS-84)
pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6_378.137;
/// Earth flattening (WGS-84)
pub const EARTH_FLATTENING: f64 = 1.0 / 298.257_223_563;
/// Earth gravitational parameter in km^3/s^2
pub const EARTH_GM_KM3_S2: f64 = 398_600.435_436_096;
/// Rate of the Earth rotation angle, in rad/s
pub const EARTH_ANGULAR_VELOCITY_RAD_S: f64 = 7.292_115_146_706_979e-5;
/// Minimum clearance of an inter-satellite link above the obscuring body, in km
pub const OCCULTATION_MARGIN_KM: f64 = 50.0;

/// A trait allowing for something to have an epoch
pub trait TimeTagged {
    /// Retrieve the Epoch
    fn epoch(&self) -> Epoch;
    /// Set the Epoch
    fn set_epoch(&mut self, epoch: Epoch);

    /// Shift this epoch by a duration (can be negative)
    fn shift_by(&mut self, duration: Duration) {
        self.set_epoch(self.epoch() + duration);
    }
}

/// A piece of hardware on a tracking participant (transponder, antenna, receiver) which delays the signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hardware {
    pub name: String,
    /// Signal delay through this hardware, in seconds
    #[serde(default)]
    pub delay_s: f64,
}

impl Hardware {
    pub fn new(name: &str, delay_s: f64) -> Self {
        Self {
            name: name.to_string(),
            delay_s,
        }
    }
}
