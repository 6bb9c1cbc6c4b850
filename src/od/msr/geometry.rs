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

use super::Participant;
use crate::cosmic::RotationSet;
use crate::linalg::{Matrix3, Vector3};
use crate::time::Epoch;

/// Wraps an angle in degrees into [0, 360).
pub fn wrap_degrees(angle_deg: f64) -> f64 {
    let wrapped = angle_deg.rem_euclid(360.0);
    // Tiny negative angles round up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Angle in radians between a vector and the XY plane of its frame, in [-π/2, π/2]. Unlike the arcsine of the
/// normalized Z component, this never leaves its domain along the Z axis.
pub fn elevation_angle(v: &Vector3<f64>) -> f64 {
    v.z.atan2(v.x.hypot(v.y))
}

/// Inertial and observation frame geometry between two participants at a single epoch.
///
/// The range vector points from the first participant to the second, and both participants share the Earth centered
/// inertial origin. When a ground station participates, the observation frame is its topocentric South-East-Zenith frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Geometry {
    pub epoch: Epoch,
    pub rotations: RotationSet,
    /// Inertial positions of each participant, in km
    pub positions: [Vector3<f64>; 2],
    /// Inertial velocities of each participant, in km/s
    pub velocities: [Vector3<f64>; 2],
    pub range_vec_inertial: Vector3<f64>,
    pub range_vec_obs: Vector3<f64>,
    pub range_rate_vec_inertial: Vector3<f64>,
    pub range_rate_vec_obs: Vector3<f64>,
}

impl Geometry {
    pub fn compute(epoch: Epoch, first: &Participant, second: &Participant) -> Self {
        let observer = [first, second]
            .into_iter()
            .find_map(|p| p.as_ground_station())
            .map(|gs| (gs.latitude_deg, gs.longitude_deg));

        let rotations = RotationSet::compute(
            epoch,
            first.native_frame(),
            second.native_frame(),
            observer,
        );

        let (r1, v1) = inertial_state(first, &rotations.r_j2k_1, &rotations.rdot_j2k_1);
        let (r2, v2) = inertial_state(second, &rotations.r_j2k_2, &rotations.rdot_j2k_2);

        let range_vec_inertial = r2 - r1;
        let range_rate_vec_inertial = v2 - v1;

        let (range_vec_obs, range_rate_vec_obs) = if observer.is_some() {
            (
                rotations.r_obs_j2k * range_vec_inertial,
                rotations.r_obs_j2k * range_rate_vec_inertial
                    + rotations.rdot_obs_j2k * range_vec_inertial,
            )
        } else {
            (range_vec_inertial, range_rate_vec_inertial)
        };

        Self {
            epoch,
            rotations,
            positions: [r1, r2],
            velocities: [v1, v2],
            range_vec_inertial,
            range_vec_obs,
            range_rate_vec_inertial,
            range_rate_vec_obs,
        }
    }

    /// Range in km
    pub fn range_km(&self) -> f64 {
        self.range_vec_inertial.norm()
    }

    /// Rotation from the native frame of the provided participant into the inertial frame
    pub fn native_to_inertial(&self, participant_index: usize) -> Matrix3<f64> {
        if participant_index == 0 {
            self.rotations.r_j2k_1
        } else {
            self.rotations.r_j2k_2
        }
    }
}

/// Inertial position and velocity of a participant, where the rotation maps its native frame into the inertial frame.
fn inertial_state(
    participant: &Participant,
    dcm: &Matrix3<f64>,
    dcm_dt: &Matrix3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    match participant {
        Participant::Spacecraft(sc) => (sc.orbit.radius_km, sc.orbit.velocity_km_s),
        Participant::GroundStation(gs) => {
            let r_fixed = gs.body_fixed_position();
            (dcm * r_fixed, dcm_dt * r_fixed)
        }
    }
}

#[cfg(test)]
mod ut_geometry {
    use super::*;
    use crate::cosmic::{Orbit, Spacecraft};
    use crate::od::GroundStation;
    use approx::assert_abs_diff_eq;

    #[test]
    fn station_matches_its_own_rotations() {
        let epoch = Epoch::from_gregorian_utc_hms(2023, 6, 1, 3, 0, 0);
        let gs = GroundStation::dss34_canberra(5.0);
        let orbit = Orbit::keplerian(8000.0, 0.01, 40.0, 150.0, 10.0, 20.0, epoch);
        let sc = Spacecraft::new("SC", orbit);

        let geom = Geometry::compute(epoch, &gs.clone().into(), &sc.into());

        let (r_gs, v_gs) = gs.inertial_state(epoch);
        assert_abs_diff_eq!(geom.positions[0], r_gs, epsilon = 1e-9);
        assert_abs_diff_eq!(geom.velocities[0], v_gs, epsilon = 1e-12);
        assert_abs_diff_eq!(geom.range_vec_inertial, orbit.radius_km - r_gs, epsilon = 1e-9);
        // The observation frame preserves the range
        assert_abs_diff_eq!(geom.range_vec_obs.norm(), geom.range_km(), epsilon = 1e-9);
    }

    #[test]
    fn inter_satellite_is_inertial() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2023, 6, 1);
        let sc1 = Spacecraft::new(
            "A",
            Orbit::cartesian(7000.0, 0.0, 0.0, 0.0, 7.5, 0.0, epoch),
        );
        let sc2 = Spacecraft::new(
            "B",
            Orbit::cartesian(0.0, 7000.0, 0.0, -7.5, 0.0, 0.0, epoch),
        );
        let geom = Geometry::compute(epoch, &sc1.into(), &sc2.into());
        assert_eq!(geom.range_vec_obs, geom.range_vec_inertial);
        assert_eq!(geom.range_rate_vec_inertial, Vector3::new(-7.5, -7.5, 0.0));
        assert_abs_diff_eq!(geom.range_km(), 7000.0 * 2.0_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn wrapped_angles_never_reach_a_full_turn() {
        assert_eq!(wrap_degrees(-1e-15), 0.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert_eq!(wrap_degrees(-90.0), 270.0);
        assert_abs_diff_eq!(wrap_degrees(-1e-9), 360.0 - 1e-9, epsilon = 1e-12);
        assert!(wrap_degrees(-1e-9) < 360.0);
    }

    #[test]
    fn elevation_along_the_axis() {
        // The normalized Z component may exceed one along the axis
        let zenith = Vector3::new(1e-17, 0.0, 0.1 + 0.2);
        let elevation = elevation_angle(&zenith);
        assert!(!elevation.is_nan());
        assert_abs_diff_eq!(elevation, std::f64::consts::FRAC_PI_2, epsilon = 1e-15);
        assert_eq!(elevation_angle(&Vector3::new(0.0, 0.0, -3.0)), -std::f64::consts::FRAC_PI_2);
        assert_abs_diff_eq!(
            elevation_angle(&Vector3::new(1.0, 1.0, 2.0_f64.sqrt())).to_degrees(),
            45.0,
            epsilon = 1e-12
        );
    }
}
