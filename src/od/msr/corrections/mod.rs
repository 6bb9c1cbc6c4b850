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

use crate::od::ODError;
use crate::time::Epoch;
use std::fmt::Debug;
use std::ops::{Add, AddAssign};

mod troposphere;
pub use troposphere::HopfieldSaastamoinen;

/// Name of the Hopfield-Saastamoinen troposphere model
pub const HOPFIELD_SAASTAMOINEN: &str = "HopfieldSaastamoinen";
/// Name of the IRI2007 ionosphere model
pub const IRI2007: &str = "IRI2007";
/// Name used to disable a media correction
pub const NO_CORRECTION: &str = "None";

/// The media through which a signal is delayed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Troposphere,
    Ionosphere,
}

impl MediaKind {
    /// Range correction outside of this interval (in meters) is suspicious and warned about.
    pub fn expected_range_m(self) -> (f64, f64) {
        match self {
            Self::Troposphere => (0.0, 60.0),
            Self::Ionosphere => (0.0, 20.0),
        }
    }
}

/// Signal path and local weather inputs of a media correction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MediaInput {
    pub epoch: Epoch,
    pub frequency_mhz: f64,
    pub elevation_rad: f64,
    pub range_m: f64,
    pub temperature_k: f64,
    pub pressure_hpa: f64,
    pub humidity_pct: f64,
}

/// Media correction of a signal path.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MediaCorrectionOutput {
    /// Range correction, in meters
    pub range_m: f64,
    /// Elevation angle correction, in arcseconds
    pub angle_arcsec: f64,
    /// Signal time delay, in seconds
    pub time_s: f64,
}

impl Add for MediaCorrectionOutput {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            range_m: self.range_m + rhs.range_m,
            angle_arcsec: self.angle_arcsec + rhs.angle_arcsec,
            time_s: self.time_s + rhs.time_s,
        }
    }
}

impl AddAssign for MediaCorrectionOutput {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// A media correction plugin.
pub trait MediaCorrection: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> MediaKind;

    fn correction(&self, input: &MediaInput) -> Result<MediaCorrectionOutput, ODError>;
}
