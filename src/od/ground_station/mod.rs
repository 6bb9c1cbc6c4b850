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

use crate::cosmic::rotation::{body_fixed_to_inertial, body_fixed_to_sez};
use crate::cosmic::{Hardware, EARTH_EQUATORIAL_RADIUS_KM, EARTH_FLATTENING};
use crate::io::ConfigRepr;
use crate::od::msr::{elevation_angle, wrap_degrees};
use crate::linalg::{Matrix3, Vector3};
use crate::time::Epoch;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

mod builtin;

fn default_temperature_k() -> f64 {
    295.1
}

fn default_pressure_hpa() -> f64 {
    1013.5
}

fn default_humidity_pct() -> f64 {
    55.0
}

/// GroundStation defines a tracking station on the surface of the Earth, with its local weather for the media corrections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroundStation {
    pub name: String,
    /// Unique tracking identifier
    pub id: String,
    /// in degrees
    #[serde(default)]
    pub elevation_mask_deg: f64,
    /// geodetic, in degrees
    pub latitude_deg: f64,
    /// in degrees
    pub longitude_deg: f64,
    /// in km
    pub height_km: f64,
    /// in Kelvin
    #[serde(default = "default_temperature_k")]
    pub temperature_k: f64,
    /// in hectoPascal
    #[serde(default = "default_pressure_hpa")]
    pub pressure_hpa: f64,
    /// relative humidity, in percent
    #[serde(default = "default_humidity_pct")]
    pub humidity_pct: f64,
    #[serde(default)]
    pub hardware: Vec<Hardware>,
}

impl GroundStation {
    /// Initializes a point on the surface of the Earth, with the standard weather and no elevation mask.
    pub fn from_point(
        id: &str,
        latitude_deg: f64,
        longitude_deg: f64,
        height_km: f64,
    ) -> Self {
        Self {
            name: id.to_string(),
            id: id.to_string(),
            elevation_mask_deg: 0.0,
            latitude_deg,
            longitude_deg,
            height_km,
            temperature_k: default_temperature_k(),
            pressure_hpa: default_pressure_hpa(),
            humidity_pct: default_humidity_pct(),
            hardware: Vec::new(),
        }
    }

    /// Returns a copy of this station with the provided elevation mask, in degrees
    pub fn with_elevation_mask(mut self, elevation_mask_deg: f64) -> Self {
        self.elevation_mask_deg = elevation_mask_deg;
        self
    }

    /// Returns a copy of this station with the provided hardware appended to its signal path
    pub fn with_hardware(mut self, hardware: Hardware) -> Self {
        self.hardware.push(hardware);
        self
    }

    /// Position of this station in the Earth body fixed frame, in km (WGS-84 ellipsoid).
    pub fn body_fixed_position(&self) -> Vector3<f64> {
        let e2 = EARTH_FLATTENING * (2.0 - EARTH_FLATTENING);
        let (sin_lat, cos_lat) = self.latitude_deg.to_radians().sin_cos();
        let (sin_long, cos_long) = self.longitude_deg.to_radians().sin_cos();
        let n = EARTH_EQUATORIAL_RADIUS_KM / (1.0 - e2 * sin_lat.powi(2)).sqrt();
        Vector3::new(
            (n + self.height_km) * cos_lat * cos_long,
            (n + self.height_km) * cos_lat * sin_long,
            (n * (1.0 - e2) + self.height_km) * sin_lat,
        )
    }

    /// Position (km) and velocity (km/s) of this station in the inertial frame at the provided epoch.
    pub fn inertial_state(&self, epoch: Epoch) -> (Vector3<f64>, Vector3<f64>) {
        let (dcm, dcm_dt) = body_fixed_to_inertial(epoch);
        let r_fixed = self.body_fixed_position();
        (dcm * r_fixed, dcm_dt * r_fixed)
    }

    /// Rotation from the Earth body fixed frame to the South-East-Zenith frame of this station
    pub fn sez_dcm(&self) -> Matrix3<f64> {
        body_fixed_to_sez(self.latitude_deg, self.longitude_deg)
    }

    /// Computes the azimuth and elevation, in degrees, of the provided inertial position seen from this station.
    /// Also returns the slant range in km.
    pub fn azimuth_elevation_of(&self, position_km: &Vector3<f64>, epoch: Epoch) -> (f64, f64, f64) {
        let (dcm, _) = body_fixed_to_inertial(epoch);
        let rho_fixed = dcm.transpose() * position_km - self.body_fixed_position();
        let rho_sez = self.sez_dcm() * rho_fixed;
        let range_km = rho_sez.norm();

        let elevation_deg = elevation_angle(&rho_sez).to_degrees();
        if (elevation_deg - 90.0).abs() < 1e-6 {
            warn!("object nearly overhead (el = {elevation_deg} deg), azimuth may be incorrect");
        }
        let azimuth_deg = wrap_degrees(rho_sez.y.atan2(-rho_sez.x).to_degrees());

        (azimuth_deg, elevation_deg, range_km)
    }
}

impl ConfigRepr for GroundStation {}

impl fmt::Display for GroundStation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} [{}] (lat.: {:.4} deg    long.: {:.4} deg    alt.: {:.3} m)",
            self.name,
            self.id,
            self.latitude_deg,
            self.longitude_deg,
            self.height_km * 1e3,
        )
    }
}
