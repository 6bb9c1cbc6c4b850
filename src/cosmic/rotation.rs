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

use super::EARTH_ANGULAR_VELOCITY_RAD_S;
use crate::linalg::Matrix3;
use crate::time::Epoch;
use std::f64::consts::TAU;

/// Julian date of the J2000 reference epoch
const J2000_JD: f64 = 2_451_545.0;

/// Returns the Earth rotation angle in radians, in [0, 2π).
pub fn earth_rotation_angle(epoch: Epoch) -> f64 {
    let du = epoch.to_jde_utc_days() - J2000_JD;
    let turns = 0.779_057_273_264_0 + 1.002_737_811_911_354_48 * du;
    (TAU * turns).rem_euclid(TAU)
}

/// Returns the rotation from the Earth body fixed frame to the inertial frame, and its time derivative.
pub fn body_fixed_to_inertial(epoch: Epoch) -> (Matrix3<f64>, Matrix3<f64>) {
    let (s, c) = earth_rotation_angle(epoch).sin_cos();
    let w = EARTH_ANGULAR_VELOCITY_RAD_S;

    #[rustfmt::skip]
    let dcm = Matrix3::new(
        c, -s, 0.0,
        s, c, 0.0,
        0.0, 0.0, 1.0,
    );

    #[rustfmt::skip]
    let dcm_dt = Matrix3::new(
        -w * s, -w * c, 0.0,
        w * c, -w * s, 0.0,
        0.0, 0.0, 0.0,
    );

    (dcm, dcm_dt)
}

/// Returns the rotation from the Earth body fixed frame to the topocentric South-East-Zenith frame of a
/// point at the provided geodetic latitude and longitude (in degrees).
pub fn body_fixed_to_sez(latitude_deg: f64, longitude_deg: f64) -> Matrix3<f64> {
    let (sin_lat, cos_lat) = latitude_deg.to_radians().sin_cos();
    let (sin_long, cos_long) = longitude_deg.to_radians().sin_cos();

    #[rustfmt::skip]
    let dcm = Matrix3::new(
        sin_lat * cos_long, sin_lat * sin_long, -cos_lat,
        -sin_long, cos_long, 0.0,
        cos_lat * cos_long, cos_lat * sin_long, sin_lat,
    );
    dcm
}

/// Frame in which a tracking participant is natively expressed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NativeFrame {
    /// Earth centered inertial
    Inertial,
    /// Earth body fixed
    BodyFixed,
}

/// The set of rotations needed to evaluate a measurement between two participants at a single epoch.
///
/// All matrices rotate *into* the inertial frame, except the observation matrices which rotate the inertial frame
/// into the observation (topocentric) frame. The set is only valid at its epoch.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RotationSet {
    pub epoch: Epoch,
    /// First participant native frame to inertial
    pub r_j2k_1: Matrix3<f64>,
    pub rdot_j2k_1: Matrix3<f64>,
    /// Second participant native frame to inertial
    pub r_j2k_2: Matrix3<f64>,
    pub rdot_j2k_2: Matrix3<f64>,
    /// Inertial to observation frame
    pub r_obs_j2k: Matrix3<f64>,
    pub rdot_obs_j2k: Matrix3<f64>,
}

impl RotationSet {
    /// Computes the rotation set at the provided epoch.
    ///
    /// The observation frame is the topocentric frame of the provided geodetic location (in degrees), or the inertial frame if none.
    pub fn compute(
        epoch: Epoch,
        frame_1: NativeFrame,
        frame_2: NativeFrame,
        observer_lat_long_deg: Option<(f64, f64)>,
    ) -> Self {
        let (bf_dcm, bf_dcm_dt) = body_fixed_to_inertial(epoch);

        let native = |frame: NativeFrame| match frame {
            NativeFrame::Inertial => (Matrix3::identity(), Matrix3::zeros()),
            NativeFrame::BodyFixed => (bf_dcm, bf_dcm_dt),
        };

        let (r_j2k_1, rdot_j2k_1) = native(frame_1);
        let (r_j2k_2, rdot_j2k_2) = native(frame_2);

        let (r_obs_j2k, rdot_obs_j2k) = match observer_lat_long_deg {
            Some((lat_deg, long_deg)) => {
                let sez = body_fixed_to_sez(lat_deg, long_deg);
                (sez * bf_dcm.transpose(), sez * bf_dcm_dt.transpose())
            }
            None => (Matrix3::identity(), Matrix3::zeros()),
        };

        Self {
            epoch,
            r_j2k_1,
            rdot_j2k_1,
            r_j2k_2,
            rdot_j2k_2,
            r_obs_j2k,
            rdot_obs_j2k,
        }
    }

    /// Returns whether this rotation set is valid at the provided epoch
    pub fn is_valid_at(&self, epoch: Epoch) -> bool {
        self.epoch == epoch
    }
}
