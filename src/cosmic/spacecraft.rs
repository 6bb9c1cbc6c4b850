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

use super::{Hardware, Orbit, TimeTagged};
use crate::time::Epoch;
use std::fmt;

/// A spacecraft tracking participant: an identifier, its orbit, and its signal path hardware.
#[derive(Clone, Debug, PartialEq)]
pub struct Spacecraft {
    pub name: String,
    /// Unique tracking identifier
    pub id: String,
    pub orbit: Orbit,
    pub hardware: Vec<Hardware>,
}

impl Spacecraft {
    pub fn new(id: &str, orbit: Orbit) -> Self {
        Self {
            name: id.to_string(),
            id: id.to_string(),
            orbit,
            hardware: Vec::new(),
        }
    }

    /// Returns a copy of this spacecraft with the provided hardware appended to its signal path
    pub fn with_hardware(mut self, hardware: Hardware) -> Self {
        self.hardware.push(hardware);
        self
    }

    /// Returns a copy of this spacecraft with the provided orbit
    pub fn with_orbit(mut self, orbit: Orbit) -> Self {
        self.orbit = orbit;
        self
    }
}

impl TimeTagged for Spacecraft {
    fn epoch(&self) -> Epoch {
        self.orbit.epoch
    }

    fn set_epoch(&mut self, epoch: Epoch) {
        self.orbit.epoch = epoch
    }
}

impl fmt::Display for Spacecraft {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.id, self.orbit)
    }
}
