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
use crate::linalg::Vector3;
use crate::od::msr::{
    elevation_angle, wrap_degrees, Feasibility, MeasurementType, PhysicalMeasurement,
    BLOCKED_BY_ELEVATION,
};
use crate::od::{MeasurementSnafu, ODError};
use crate::time::Epoch;
use snafu::ensure;
use std::f64::consts::FRAC_PI_2;

/// Azimuth and elevation of the second participant seen from the first, in degrees.
///
/// The azimuth is measured clockwise from the North in [0, 360), and the elevation is in [-90, 90]. The model
/// computes the azimuth, the elevation, or both, depending on its measurement type.
#[derive(Clone, Debug)]
pub struct AzimuthElevation {
    msr: PhysicalMeasurement,
    msr_type: MeasurementType,
}

impl AzimuthElevation {
    pub fn new(msr: PhysicalMeasurement, msr_type: MeasurementType) -> Self {
        Self {
            msr,
            msr_type,
        }
    }

    /// Topocentric range vector, from the geometry cached for this epoch
    fn topocentric_range(&mut self, epoch: Epoch) -> Result<Vector3<f64>, ODError> {
        Ok(self.msr.core.compute_geometry(epoch)?.range_vec_obs)
    }

    /// Azimuth in (-π, π] and elevation in radians of the topocentric range vector
    fn angles(rho: &Vector3<f64>) -> (f64, f64) {
        (rho.y.atan2(-rho.x), elevation_angle(rho))
    }
}

impl ObservableModel for AzimuthElevation {
    fn msr_type(&self) -> MeasurementType {
        self.msr_type
    }

    fn physical(&self) -> &PhysicalMeasurement {
        &self.msr
    }

    fn physical_mut(&mut self) -> &mut PhysicalMeasurement {
        &mut self.msr
    }

    fn compute_value(&mut self, epoch: Epoch) -> Result<Vec<f64>, ODError> {
        let rho = self.topocentric_range(epoch)?;
        let (azimuth, elevation) = Self::angles(&rho);

        if self.msr_type != MeasurementType::Elevation {
            ensure!(
                (elevation - FRAC_PI_2).abs() > f64::EPSILON,
                MeasurementSnafu {
                    details: "Error computing azimuth - elevation is 90 degrees".to_string()
                }
            );
        }

        let media = self.msr.media_correction(epoch)?;
        let elevation_deg = elevation.to_degrees() + media.angle_arcsec / 3600.0;
        let azimuth_deg = wrap_degrees(azimuth.to_degrees());

        Ok(match self.msr_type {
            MeasurementType::Azimuth => vec![azimuth_deg],
            MeasurementType::Elevation => vec![elevation_deg],
            _ => vec![azimuth_deg, elevation_deg],
        })
    }

    fn check_feasibility(&mut self, epoch: Epoch, with_events: bool) -> Result<Feasibility, ODError> {
        let has_station = self
            .msr
            .core
            .participants()
            .iter()
            .any(|p| p.is_ground_station());
        if !has_station {
            let geom = *self.msr.core.compute_geometry(epoch)?;
            if !with_events {
                return Ok(Feasibility::feasible(geom.range_km()));
            }
            return self.msr.core.check_earth_line_of_sight();
        }

        let rho = self.topocentric_range(epoch)?;
        let elevation_deg = elevation_angle(&rho).to_degrees();
        if !with_events || (rho.z > 0.0 && rho.x.abs() >= 1e-8) {
            Ok(Feasibility::feasible(elevation_deg))
        } else {
            Ok(Feasibility::blocked(elevation_deg, BLOCKED_BY_ELEVATION))
        }
    }

    fn gradients(&mut self, epoch: Epoch) -> Result<Vec<(Vector3<f64>, Vector3<f64>)>, ODError> {
        let rho = self.topocentric_range(epoch)?;
        let r = rho.norm();
        let (azimuth, elevation) = Self::angles(&rho);
        let (sin_az, cos_az) = azimuth.sin_cos();
        let (sin_el, cos_el) = elevation.sin_cos();

        // Gradients in the South-East-Zenith frame, where North is -S
        let d_az = Vector3::new(sin_az, cos_az, 0.0) / (r * cos_el);
        let d_el = Vector3::new(sin_el * cos_az, -sin_el * sin_az, cos_el) / r;

        let to_inertial = self.msr.core.geometry()?.rotations.r_obs_j2k.transpose();
        let d_az = (to_inertial * d_az).map(f64::to_degrees);
        let d_el = (to_inertial * d_el).map(f64::to_degrees);
        let zero = Vector3::zeros();

        Ok(match self.msr_type {
            MeasurementType::Azimuth => vec![(d_az, zero)],
            MeasurementType::Elevation => vec![(d_el, zero)],
            _ => vec![(d_az, zero), (d_el, zero)],
        })
    }
}

#[cfg(test)]
mod ut_angles {
    use super::*;
    use crate::cosmic::rotation::body_fixed_to_inertial;
    use crate::cosmic::{Orbit, Spacecraft};
    use crate::od::msr::adapters::DerivativeParameter;
    use crate::od::msr::{MeasurementModel, Periodicity};
    use crate::od::GroundStation;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;
    use std::f64::consts::SQRT_2;

    fn epoch() -> Epoch {
        Epoch::from_gregorian_utc_hms(2022, 11, 2, 16, 0, 0)
    }

    /// A spacecraft seen from Canberra in the provided SEZ direction, at 1500 km
    fn setup(sez_direction: Vector3<f64>) -> (GroundStation, Spacecraft) {
        let gs = GroundStation::dss34_canberra(0.0);
        let (dcm, _) = body_fixed_to_inertial(epoch());
        let dir = dcm * gs.sez_dcm().transpose() * sez_direction.normalize();
        let pos = dcm * gs.body_fixed_position() + dir * 1500.0;
        let sc = Spacecraft::new(
            "SC",
            Orbit::cartesian(pos.x, pos.y, pos.z, -2.0, 5.0, 3.0, epoch()),
        );
        (gs, sc)
    }

    #[rstest]
    #[case(Vector3::new(-1.0, 0.0, 1.0), 0.0, 45.0)]
    #[case(Vector3::new(-1.0, 1.0, SQRT_2), 45.0, 45.0)]
    #[case(Vector3::new(1.0, 0.0, 1.0), 180.0, 45.0)]
    #[case(Vector3::new(1.0, -1.0, 1.0), 225.0, 35.264_389_682_754_654)]
    #[case(Vector3::new(-1.0, -1e-4, 2.0), 359.994_270_422_048_7, 63.434_948_7)]
    fn azimuth_elevation_values(
        #[case] direction: Vector3<f64>,
        #[case] azimuth_deg: f64,
        #[case] elevation_deg: f64,
    ) {
        let (gs, sc) = setup(direction);
        let mut model =
            MeasurementModel::new(MeasurementType::AzEl, vec![gs.into(), sc.into()]).unwrap();
        let msr = model.evaluate(epoch(), true).unwrap();
        assert!(msr.is_feasible());
        assert_abs_diff_eq!(msr.value[0], azimuth_deg, epsilon = 1e-6);
        assert_abs_diff_eq!(msr.value[1], elevation_deg, epsilon = 1e-6);
        assert!((0.0..360.0).contains(&msr.value[0]));
        assert!((-90.0..=90.0).contains(&msr.value[1]));
    }

    #[test]
    fn periodicity_metadata() {
        assert_eq!(
            MeasurementType::Azimuth.periodicity(0),
            Some(Periodicity {
                period: 360.0,
                minimum: 0.0
            })
        );
        assert_eq!(MeasurementType::Elevation.periodicity(0), None);
    }

    #[test]
    fn below_horizon_is_blocked() {
        let (gs, sc) = setup(Vector3::new(-1.0, 0.3, -0.2));
        let mut model =
            MeasurementModel::new(MeasurementType::Elevation, vec![gs.into(), sc.into()]).unwrap();
        let msr = model.evaluate(epoch(), true).unwrap();
        assert!(!msr.is_feasible());
        assert_eq!(msr.feasibility.reason, "B1");
        assert_eq!(msr.value, vec![0.0]);
    }

    #[test]
    fn partials_match_finite_differences() {
        let (gs, sc) = setup(Vector3::new(-0.4, 0.7, 0.8));
        let mut model = MeasurementModel::new(
            MeasurementType::AzEl,
            vec![gs.clone().into(), sc.clone().into()],
        )
        .unwrap();
        let nominal = model.evaluate(epoch(), true).unwrap().value;
        let partials = model
            .compute_derivative(epoch(), 1, DerivativeParameter::CartesianState)
            .unwrap();
        assert_eq!(partials.shape(), (2, 6));

        let step = 1e-4;
        for i in 0..3 {
            let mut state = sc.orbit.to_cartesian_vec();
            state[i] += step;
            let perturbed = sc.clone().with_orbit(sc.orbit.with_cartesian_vec(&state, epoch()));
            let mut other = MeasurementModel::new(
                MeasurementType::AzEl,
                vec![gs.clone().into(), perturbed.into()],
            )
            .unwrap();
            let value = other.evaluate(epoch(), true).unwrap().value;
            for row in 0..2 {
                assert_abs_diff_eq!(
                    partials[(row, i)],
                    (value[row] - nominal[row]) / step,
                    epsilon = 1e-6
                );
            }
            // No dependency on the velocity
            assert_eq!(partials[(0, i + 3)], 0.0);
        }
    }

    #[test]
    fn overhead_azimuth_fails() {
        let (gs, sc) = setup(Vector3::new(0.0, 0.0, 1.0));
        let mut az =
            MeasurementModel::new(MeasurementType::Azimuth, vec![gs.clone().into(), sc.clone().into()])
                .unwrap();
        // Either infeasible because of the tiny South component, or an error
        match az.evaluate(epoch(), true) {
            Ok(msr) => assert!(!msr.is_feasible()),
            Err(e) => assert!(e.to_string().contains("elevation is 90 degrees")),
        }
    }

    #[test]
    fn azimuth_just_west_of_north_wraps_to_zero() {
        let (azimuth, elevation) = AzimuthElevation::angles(&Vector3::new(-1000.0, -1e-14, 500.0));
        let azimuth_deg = wrap_degrees(azimuth.to_degrees());
        assert!((0.0..360.0).contains(&azimuth_deg));
        assert_abs_diff_eq!(azimuth_deg, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(elevation.to_degrees(), 26.565_051_177_077_99, epsilon = 1e-9);
    }

    #[test]
    fn zenith_elevation_is_ninety() {
        let (_, elevation) = AzimuthElevation::angles(&Vector3::new(0.0, 0.0, 1000.0));
        assert_abs_diff_eq!(elevation.to_degrees(), 90.0, epsilon = 1e-12);

        let (gs, sc) = setup(Vector3::new(0.0, 0.0, 1.0));
        let mut model =
            MeasurementModel::new(MeasurementType::Elevation, vec![gs.into(), sc.into()]).unwrap();
        let msr = model.evaluate(epoch(), false).unwrap();
        assert!(msr.is_feasible());
        assert!(!msr.value[0].is_nan());
        assert_abs_diff_eq!(msr.value[0], 90.0, epsilon = 1e-6);
    }

    #[test]
    fn feasible_without_events() {
        let (gs, sc) = setup(Vector3::new(-1.0, 0.3, -0.2));
        let mut model =
            MeasurementModel::new(MeasurementType::Elevation, vec![gs.into(), sc.into()]).unwrap();
        let msr = model.evaluate(epoch(), false).unwrap();
        assert!(msr.is_feasible());
        assert!(msr.value[0] < 0.0);
    }
}
