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

use super::{TimeTagged, EARTH_GM_KM3_S2};
use crate::linalg::{Vector3, Vector6};
use crate::time::{Duration, Epoch, Unit};
use std::f64::consts::TAU;
use std::fmt;

/// Orbit defines a Cartesian orbital state in the Earth centered inertial frame.
///
/// Regardless of the constructor used, this struct stores all the state information in Cartesian coordinates
/// as these are always non singular.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Orbit {
    /// in km
    pub radius_km: Vector3<f64>,
    /// in km/s
    pub velocity_km_s: Vector3<f64>,
    pub epoch: Epoch,
    /// Gravitational parameter of the central body, in km^3/s^2
    pub mu_km3_s2: f64,
}

impl Orbit {
    /// Creates a new Earth centered Cartesian state.
    #[allow(clippy::too_many_arguments)]
    pub fn cartesian(
        x_km: f64,
        y_km: f64,
        z_km: f64,
        vx_km_s: f64,
        vy_km_s: f64,
        vz_km_s: f64,
        epoch: Epoch,
    ) -> Self {
        Self {
            radius_km: Vector3::new(x_km, y_km, z_km),
            velocity_km_s: Vector3::new(vx_km_s, vy_km_s, vz_km_s),
            epoch,
            mu_km3_s2: EARTH_GM_KM3_S2,
        }
    }

    /// Creates a new Earth centered state from a position and velocity vector.
    pub fn from_cartesian_vec(state: &Vector6<f64>, epoch: Epoch) -> Self {
        Self::cartesian(
            state[0], state[1], state[2], state[3], state[4], state[5], epoch,
        )
    }

    /// Creates a new Earth centered orbit from the Keplerian elements, angles in degrees.
    ///
    /// The true anomaly is used as the fast variable. Only elliptical orbits are supported.
    #[allow(clippy::too_many_arguments)]
    pub fn keplerian(
        sma_km: f64,
        ecc: f64,
        inc_deg: f64,
        raan_deg: f64,
        aop_deg: f64,
        ta_deg: f64,
        epoch: Epoch,
    ) -> Self {
        let mu = EARTH_GM_KM3_S2;
        let p_km = sma_km * (1.0 - ecc.powi(2));
        let (sin_raan, cos_raan) = raan_deg.to_radians().sin_cos();
        let (sin_aop, cos_aop) = aop_deg.to_radians().sin_cos();
        let (sin_inc, cos_inc) = inc_deg.to_radians().sin_cos();
        let (sin_ta, cos_ta) = ta_deg.to_radians().sin_cos();

        // Perifocal P and Q unit vectors expressed in the inertial frame
        let p_hat = Vector3::new(
            cos_raan * cos_aop - sin_raan * sin_aop * cos_inc,
            sin_raan * cos_aop + cos_raan * sin_aop * cos_inc,
            sin_aop * sin_inc,
        );
        let q_hat = Vector3::new(
            -cos_raan * sin_aop - sin_raan * cos_aop * cos_inc,
            -sin_raan * sin_aop + cos_raan * cos_aop * cos_inc,
            cos_aop * sin_inc,
        );

        let rmag_km = p_km / (1.0 + ecc * cos_ta);
        let sqrt_mu_p = (mu / p_km).sqrt();

        Self {
            radius_km: rmag_km * (cos_ta * p_hat + sin_ta * q_hat),
            velocity_km_s: sqrt_mu_p * (-sin_ta * p_hat + (ecc + cos_ta) * q_hat),
            epoch,
            mu_km3_s2: mu,
        }
    }

    /// Returns this state as a Cartesian Vector6 in [km, km, km, km/s, km/s, km/s]
    pub fn to_cartesian_vec(&self) -> Vector6<f64> {
        Vector6::new(
            self.radius_km.x,
            self.radius_km.y,
            self.radius_km.z,
            self.velocity_km_s.x,
            self.velocity_km_s.y,
            self.velocity_km_s.z,
        )
    }

    /// Returns a copy of this orbit at the provided epoch with the provided Cartesian state.
    pub fn with_cartesian_vec(self, state: &Vector6<f64>, epoch: Epoch) -> Self {
        Self {
            radius_km: Vector3::new(state[0], state[1], state[2]),
            velocity_km_s: Vector3::new(state[3], state[4], state[5]),
            epoch,
            mu_km3_s2: self.mu_km3_s2,
        }
    }

    /// Returns the magnitude of the radius vector in km
    pub fn rmag_km(&self) -> f64 {
        self.radius_km.norm()
    }

    /// Returns the magnitude of the velocity vector in km/s
    pub fn vmag_km_s(&self) -> f64 {
        self.velocity_km_s.norm()
    }

    /// Returns the specific mechanical energy in km^2/s^2
    pub fn energy_km2_s2(&self) -> f64 {
        self.vmag_km_s().powi(2) / 2.0 - self.mu_km3_s2 / self.rmag_km()
    }

    /// Returns the semi-major axis in km
    pub fn sma_km(&self) -> f64 {
        -self.mu_km3_s2 / (2.0 * self.energy_km2_s2())
    }

    /// Returns the period of this orbit, only meaningful for closed orbits.
    pub fn period(&self) -> Duration {
        TAU * (self.sma_km().powi(3) / self.mu_km3_s2).sqrt() * Unit::Second
    }
}

impl TimeTagged for Orbit {
    fn epoch(&self) -> Epoch {
        self.epoch
    }

    fn set_epoch(&mut self, epoch: Epoch) {
        self.epoch = epoch
    }
}

impl fmt::Display for Orbit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let decimals = f.precision().unwrap_or(6);
        write!(
            f,
            "[Earth J2000] {}\tposition = [{}, {}, {}] km\tvelocity = [{}, {}, {}] km/s",
            self.epoch,
            format!("{:.*}", decimals, self.radius_km.x),
            format!("{:.*}", decimals, self.radius_km.y),
            format!("{:.*}", decimals, self.radius_km.z),
            format!("{:.*}", decimals, self.velocity_km_s.x),
            format!("{:.*}", decimals, self.velocity_km_s.y),
            format!("{:.*}", decimals, self.velocity_km_s.z)
        )
    }
}

/// Returns the RSS position and velocity errors between two orbits, in km and km/s.
pub fn rss_orbit_errors(prop_err: &Orbit, cur_state: &Orbit) -> (f64, f64) {
    (
        (prop_err.radius_km - cur_state.radius_km).norm(),
        (prop_err.velocity_km_s - cur_state.velocity_km_s).norm(),
    )
}
