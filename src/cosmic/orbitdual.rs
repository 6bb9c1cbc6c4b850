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

use super::Orbit;
use crate::linalg::{Matrix6, Vector3, U7};
use hyperdual::linalg::norm;
use hyperdual::{Float, OHyperdual};
use std::f64::consts::PI;
use std::fmt;

/// Eccentricity below which the argument of periapsis and true anomaly are ill-defined
const ECC_EPSILON: f64 = 1e-11;

/// The Keplerian elements for which the partials with respect to the Cartesian state are available.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeplerianElement {
    SMA,
    Eccentricity,
    Inclination,
    RAAN,
    AoP,
    TrueAnomaly,
}

/// OrbitDual stores the Cartesian state as hyperdual numbers to compute exact partials of the orbital elements.
#[derive(Copy, Clone, Debug)]
pub struct OrbitDual {
    /// in km
    pub x: OHyperdual<f64, U7>,
    /// in km
    pub y: OHyperdual<f64, U7>,
    /// in km
    pub z: OHyperdual<f64, U7>,
    /// in km/s
    pub vx: OHyperdual<f64, U7>,
    /// in km/s
    pub vy: OHyperdual<f64, U7>,
    /// in km/s
    pub vz: OHyperdual<f64, U7>,
    pub mu_km3_s2: f64,
}

impl From<Orbit> for OrbitDual {
    /// Initialize a new OrbitDual from an orbit, no other initializers
    fn from(orbit: Orbit) -> Self {
        Self {
            x: OHyperdual::from_slice(&[orbit.radius_km.x, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            y: OHyperdual::from_slice(&[orbit.radius_km.y, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
            z: OHyperdual::from_slice(&[orbit.radius_km.z, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]),
            vx: OHyperdual::from_slice(&[orbit.velocity_km_s.x, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
            vy: OHyperdual::from_slice(&[orbit.velocity_km_s.y, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            vz: OHyperdual::from_slice(&[orbit.velocity_km_s.z, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
            mu_km3_s2: orbit.mu_km3_s2,
        }
    }
}

/// A type which stores the partial of an element
#[derive(Copy, Clone, Debug)]
pub struct OrbitPartial {
    pub param: KeplerianElement,
    pub dual: OHyperdual<f64, U7>,
}

impl OrbitPartial {
    /// Returns the real value of this parameter
    pub fn real(&self) -> f64 {
        self.dual[0]
    }

    /// Returns the partials of this parameter with respect to [X, Y, Z, VX, VY, VZ]
    pub fn wtr_cartesian(&self) -> [f64; 6] {
        [
            self.dual[1],
            self.dual[2],
            self.dual[3],
            self.dual[4],
            self.dual[5],
            self.dual[6],
        ]
    }
}

impl fmt::Display for OrbitPartial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} {}", self.param, self.dual)
    }
}

impl OrbitDual {
    pub fn partial_for(&self, param: KeplerianElement) -> OrbitPartial {
        let dual = match param {
            KeplerianElement::SMA => self.sma_km(),
            KeplerianElement::Eccentricity => self.ecc(),
            KeplerianElement::Inclination => self.inc_deg(),
            KeplerianElement::RAAN => self.raan_deg(),
            KeplerianElement::AoP => self.aop_deg(),
            KeplerianElement::TrueAnomaly => self.ta_deg(),
        };
        OrbitPartial { param, dual }
    }

    /// Returns the Jacobian of the Keplerian elements [SMA, ECC, INC, RAAN, AOP, TA] with respect to the Cartesian state.
    /// Angles are in degrees.
    pub fn keplerian_jacobian(&self) -> Matrix6<f64> {
        let mut jac = Matrix6::zeros();
        for (i, param) in [
            KeplerianElement::SMA,
            KeplerianElement::Eccentricity,
            KeplerianElement::Inclination,
            KeplerianElement::RAAN,
            KeplerianElement::AoP,
            KeplerianElement::TrueAnomaly,
        ]
        .iter()
        .enumerate()
        {
            let partials = self.partial_for(*param).wtr_cartesian();
            for (j, partial) in partials.iter().enumerate() {
                jac[(i, j)] = *partial;
            }
        }
        jac
    }

    fn radius(&self) -> Vector3<OHyperdual<f64, U7>> {
        Vector3::new(self.x, self.y, self.z)
    }

    fn velocity(&self) -> Vector3<OHyperdual<f64, U7>> {
        Vector3::new(self.vx, self.vy, self.vz)
    }

    fn hvec(&self) -> Vector3<OHyperdual<f64, U7>> {
        self.radius().cross(&self.velocity())
    }

    fn node_vec(&self) -> Vector3<OHyperdual<f64, U7>> {
        Vector3::new(
            OHyperdual::from(0.0),
            OHyperdual::from(0.0),
            OHyperdual::from(1.0),
        )
        .cross(&self.hvec())
    }

    fn rmag_km(&self) -> OHyperdual<f64, U7> {
        norm(&self.radius())
    }

    fn energy_km2_s2(&self) -> OHyperdual<f64, U7> {
        norm(&self.velocity()).powi(2) / OHyperdual::from(2.0)
            - OHyperdual::from(self.mu_km3_s2) / self.rmag_km()
    }

    fn sma_km(&self) -> OHyperdual<f64, U7> {
        -OHyperdual::from(self.mu_km3_s2) / (OHyperdual::from(2.0) * self.energy_km2_s2())
    }

    fn evec(&self) -> Vector3<OHyperdual<f64, U7>> {
        let r = self.radius();
        let v = self.velocity();
        let hgm = OHyperdual::from(self.mu_km3_s2);
        // Split up this operation because it doesn't seem to be implemented
        Vector3::new(
            ((norm(&v).powi(2) - hgm / norm(&r)) * r[0] - (r.dot(&v)) * v[0]) / hgm,
            ((norm(&v).powi(2) - hgm / norm(&r)) * r[1] - (r.dot(&v)) * v[1]) / hgm,
            ((norm(&v).powi(2) - hgm / norm(&r)) * r[2] - (r.dot(&v)) * v[2]) / hgm,
        )
    }

    fn ecc(&self) -> OHyperdual<f64, U7> {
        norm(&self.evec())
    }

    fn inc_deg(&self) -> OHyperdual<f64, U7> {
        (self.hvec()[2] / norm(&self.hvec())).acos().to_degrees()
    }

    fn raan_deg(&self) -> OHyperdual<f64, U7> {
        let n = self.node_vec();
        let raan = (n[0] / norm(&n)).acos();
        if raan.real().is_nan() {
            warn!("RAAN is NaN");
            OHyperdual::from(0.0)
        } else if n[1].real() < 0.0 {
            (OHyperdual::from(2.0 * PI) - raan).to_degrees()
        } else {
            raan.to_degrees()
        }
    }

    fn aop_deg(&self) -> OHyperdual<f64, U7> {
        let n = self.node_vec();
        let evec = self.evec();
        let aop = (n.dot(&evec) / (norm(&n) * self.ecc())).acos();
        if aop.real().is_nan() {
            warn!("AoP is NaN");
            OHyperdual::from(0.0)
        } else if evec[2].real() < 0.0 {
            (OHyperdual::from(2.0 * PI) - aop).to_degrees()
        } else {
            aop.to_degrees()
        }
    }

    fn ta_deg(&self) -> OHyperdual<f64, U7> {
        let ecc = self.ecc();
        if ecc.real() < ECC_EPSILON {
            warn!(
                "true anomaly ill-defined for circular orbit (e = {})",
                ecc.real()
            );
        }
        let cos_nu = self.evec().dot(&self.radius()) / (ecc * self.rmag_km());
        if (cos_nu.real().abs() - 1.0).abs() < f64::EPSILON {
            if cos_nu.real() > 1.0 {
                OHyperdual::from(180.0)
            } else {
                OHyperdual::from(0.0)
            }
        } else {
            let ta = cos_nu.acos();
            if ta.real().is_nan() {
                warn!("TA is NaN");
                OHyperdual::from(0.0)
            } else if self.radius().dot(&self.velocity()).real() < 0.0 {
                (OHyperdual::from(2.0 * PI) - ta).to_degrees()
            } else {
                ta.to_degrees()
            }
        }
    }
}

#[cfg(test)]
mod ut_orbitdual {
    use super::*;
    use crate::time::Epoch;
    use approx::assert_relative_eq;

    #[test]
    fn jacobian_matches_finite_differences() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2021, 6, 1);
        let orbit = Orbit::keplerian(9_000.0, 0.05, 40.0, 30.0, 60.0, 45.0, epoch);
        let jac = OrbitDual::from(orbit).keplerian_jacobian();

        // Finite difference on the semi-major axis with respect to X
        let h = 1e-3;
        let mut plus = orbit;
        plus.radius_km.x += h;
        let mut minus = orbit;
        minus.radius_km.x -= h;
        let fd = (plus.sma_km() - minus.sma_km()) / (2.0 * h);
        assert_relative_eq!(jac[(0, 0)], fd, max_relative = 1e-6);

        // Real parts agree with the plain Orbit computation
        let sma = OrbitDual::from(orbit).partial_for(KeplerianElement::SMA);
        assert_relative_eq!(sma.real(), orbit.sma_km(), max_relative = 1e-12);
        let inc = OrbitDual::from(orbit).partial_for(KeplerianElement::Inclination);
        assert_relative_eq!(inc.real(), 40.0, epsilon = 1e-9);
    }
}
