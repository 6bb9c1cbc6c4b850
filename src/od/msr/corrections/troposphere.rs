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

use super::{MediaCorrection, MediaCorrectionOutput, MediaInput, MediaKind, HOPFIELD_SAASTAMOINEN};
use crate::cosmic::{EARTH_EQUATORIAL_RADIUS_KM, SPEED_OF_LIGHT_KM_S};
use crate::od::ODError;

const SPEED_OF_LIGHT_M_S: f64 = SPEED_OF_LIGHT_KM_S * 1e3;
const ABSOLUTE_ZERO_C: f64 = -273.15;

/// Hopfield-Saastamoinen troposphere model, using a dry and a wet refractivity component.
///
/// The elevation correction is computed in radians and reported in arcseconds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HopfieldSaastamoinen {
    /// Radius of the Earth, in meters
    pub earth_radius_m: f64,
}

impl Default for HopfieldSaastamoinen {
    fn default() -> Self {
        Self {
            earth_radius_m: EARTH_EQUATORIAL_RADIUS_KM * 1e3,
        }
    }
}

impl HopfieldSaastamoinen {
    /// Returns the range correction (m), the elevation correction (rad), and the time delay (s).
    pub fn compute(&self, input: &MediaInput) -> (f64, f64, f64) {
        let re = self.earth_radius_m;

        let lambda = SPEED_OF_LIGHT_M_S / (input.frequency_mhz * 1e6);
        let lp2_inv = 1.0 / (lambda * 1e6).powi(2);
        let denom = 173.3 - lp2_inv;
        let ce = (170.2649 / denom) * (78.8828 / 77.624);
        let crho = ce * (173.3 + lp2_inv) / denom;

        let p = input.pressure_hpa;
        let t = input.temperature_k;
        let fh = input.humidity_pct / 100.0;
        let (sin_e, cos_e) = input.elevation_rad.sin_cos();
        let cos_e2 = cos_e * cos_e;
        let rho = input.range_m;

        // Dry and wet refractivities
        let tc = t + ABSOLUTE_ZERO_C;
        let e = 6.10 * fh * (17.15 * tc / (234.7 + tc)).exp();
        let refractivity = [77.624 * p / t, 371_900.0 * e / (t * t) - 12.92 * e / t];

        // Heights of the top of each layer
        let height = [
            5.0 * 0.002277 * p / (refractivity[0] * 1e-6),
            5.0 * 0.002277 * e * (1255.0 / t + 0.05) / (refractivity[1] * 1e-6),
        ];

        let mut drho = 0.0;
        let mut de = 0.0;
        for (n_j, h_j) in refractivity.into_iter().zip(height) {
            let r = ((re + h_j).powi(2) - re * re * cos_e2).sqrt() - re * sin_e;
            let a = -sin_e / h_j;
            let b = -cos_e2 / (2.0 * h_j * re);

            let alpha = [
                1.0,
                4.0 * a,
                6.0 * a * a + 4.0 * b,
                4.0 * a * (a * a + 3.0 * b),
                a.powi(4) + 12.0 * a * a * b + 6.0 * b * b,
                4.0 * a * b * (a * a + 3.0 * b),
                b * b * (6.0 * a * a + 4.0 * b),
                4.0 * a * b.powi(3),
                b.powi(4),
            ];
            let beta = [
                1.0,
                3.0 * a,
                3.0 * (a * a + b),
                a * (a * a + 6.0 * b),
                3.0 * b * (a * a + b),
                3.0 * a * b * b,
                b.powi(3),
            ];

            let sum1: f64 = alpha
                .iter()
                .enumerate()
                .map(|(i, alpha_i)| alpha_i * r.powi(i as i32 + 1) / (i as f64 + 1.0))
                .sum();

            let sum2: f64 = beta
                .iter()
                .enumerate()
                .map(|(k, beta_k)| {
                    let kk = k as f64;
                    beta_k * r.powi(k as i32 + 2) / ((kk + 1.0) * (kk + 2.0))
                        + beta_k * r.powi(k as i32 + 1) * (rho - r) / (kk + 1.0)
                })
                .sum();

            drho += n_j * 1e-6 * sum1;
            de += n_j * 1e-6 * sum2 / h_j;
        }

        let drho = crho * drho;
        let de = ce * 4.0 * cos_e * de / rho;

        (drho, de, drho / SPEED_OF_LIGHT_M_S)
    }
}

impl MediaCorrection for HopfieldSaastamoinen {
    fn name(&self) -> &'static str {
        HOPFIELD_SAASTAMOINEN
    }

    fn kind(&self) -> MediaKind {
        MediaKind::Troposphere
    }

    fn correction(&self, input: &MediaInput) -> Result<MediaCorrectionOutput, ODError> {
        let (range_m, angle_rad, time_s) = self.compute(input);
        Ok(MediaCorrectionOutput {
            range_m,
            angle_arcsec: angle_rad.to_degrees() * 3600.0,
            time_s,
        })
    }
}

#[cfg(test)]
mod ut_troposphere {
    use super::*;
    use crate::time::Epoch;
    use approx::assert_relative_eq;

    fn input(elevation_deg: f64) -> MediaInput {
        MediaInput {
            epoch: Epoch::from_gregorian_utc_at_midnight(2020, 1, 1),
            frequency_mhz: 2090.659968,
            elevation_rad: elevation_deg.to_radians(),
            range_m: 4.0e7,
            temperature_k: 295.1,
            pressure_hpa: 1013.5,
            humidity_pct: 55.0,
        }
    }

    #[test]
    fn zenith_delay_is_a_few_meters() {
        let model = HopfieldSaastamoinen::default();
        let (drho, de, dt) = model.compute(&input(90.0));
        // Zenith delay is about 2.3 m dry plus some decimeters wet
        assert!(drho > 2.0 && drho < 3.0, "zenith delay {drho} m");
        // No bending at zenith
        assert!(de.abs() < 1e-12);
        assert_relative_eq!(dt, drho / SPEED_OF_LIGHT_M_S);
    }

    #[test]
    fn delay_grows_at_low_elevation() {
        let model = HopfieldSaastamoinen::default();
        let mut prev = 0.0;
        for elevation_deg in [90.0, 45.0, 20.0, 10.0, 5.0] {
            let out = model.correction(&input(elevation_deg)).unwrap();
            assert!(out.range_m > prev, "{elevation_deg} deg: {}", out.range_m);
            assert!(out.angle_arcsec >= 0.0);
            prev = out.range_m;
        }
        // Still within the expected bounds at five degrees
        assert!(prev < 60.0);
    }
}
