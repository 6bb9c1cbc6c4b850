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

/// The `RK` trait defines an explicit fixed step Runge Kutta integrator.
#[allow(clippy::upper_case_acronyms)]
pub trait RK
where
    Self: Sized,
{
    /// Returns the order of this integrator
    const ORDER: u8;

    /// Returns the stages of this integrator (as usize because it's used as indexing)
    const STAGES: usize;

    /// The lower triangle of the A coefficients of the Butcher table, row by row, of size STAGES*(STAGES-1)/2.
    /// *Warning:* this RK trait supposes that the implementation is consistent, i.e. c_i = \sum_j a_{ij}.
    const A_COEFFS: &'static [f64];
    /// The b_i weights of the Butcher table, of size STAGES.
    const B_COEFFS: &'static [f64];
}

/// The classical fourth order Runge Kutta.
#[derive(Copy, Clone, Debug)]
pub struct RK4Fixed {}

impl RK for RK4Fixed {
    const ORDER: u8 = 4;
    const STAGES: usize = 4;
    const A_COEFFS: &'static [f64] = &[0.5, 0.0, 0.5, 0.0, 0.0, 1.0];
    const B_COEFFS: &'static [f64] = &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0];
}

/// Ralston's third order method, mostly useful to check the order of convergence of the propagator.
#[derive(Copy, Clone, Debug)]
pub struct Ralston3 {}

impl RK for Ralston3 {
    const ORDER: u8 = 3;
    const STAGES: usize = 3;
    const A_COEFFS: &'static [f64] = &[0.5, 0.0, 0.75];
    const B_COEFFS: &'static [f64] = &[2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0];
}
