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

use enum_iterator::Sequence;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Periodicity of a measurement component: its period and the minimum of its range.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Periodicity {
    pub period: f64,
    pub minimum: f64,
}

#[derive(Copy, Clone, Debug, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Sequence)]
pub enum MeasurementType {
    #[serde(rename = "range_km")]
    Range,
    #[serde(rename = "range_rate_km_s")]
    RangeRate,
    #[serde(rename = "azimuth_deg")]
    Azimuth,
    #[serde(rename = "elevation_deg")]
    Elevation,
    #[serde(rename = "azimuth_elevation_deg")]
    AzEl,
    #[serde(rename = "right_ascension_declination_deg")]
    RaDec,
}

impl MeasurementType {
    /// Returns the number of components of this measurement
    pub fn size(self) -> usize {
        match self {
            Self::Range | Self::RangeRate | Self::Azimuth | Self::Elevation => 1,
            Self::AzEl | Self::RaDec => 2,
        }
    }

    /// Returns the expected unit of this measurement type
    pub fn unit(self) -> &'static str {
        match self {
            Self::Range => "km",
            Self::RangeRate => "km/s",
            Self::Azimuth | Self::Elevation | Self::AzEl | Self::RaDec => "deg",
        }
    }

    /// Returns the periodicity of the provided component, if it is periodic.
    pub fn periodicity(self, component: usize) -> Option<Periodicity> {
        let angle = Periodicity {
            period: 360.0,
            minimum: 0.0,
        };
        match (self, component) {
            (Self::Azimuth, 0) | (Self::AzEl, 0) | (Self::RaDec, 0) => Some(angle),
            _ => None,
        }
    }

    /// Returns whether the provided component is periodic
    pub fn is_periodic(self, component: usize) -> bool {
        self.periodicity(component).is_some()
    }

    /// Whether this measurement is made of angles
    pub fn is_angle(self) -> bool {
        matches!(
            self,
            Self::Azimuth | Self::Elevation | Self::AzEl | Self::RaDec
        )
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Range => "Range",
            Self::RangeRate => "RangeRate",
            Self::Azimuth => "Azimuth",
            Self::Elevation => "Elevation",
            Self::AzEl => "AzEl",
            Self::RaDec => "RADec",
        };
        write!(f, "{name}")
    }
}
