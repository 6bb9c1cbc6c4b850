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

/*! # nyx-batch

Batch weighted least squares orbit determination: an externally stepped estimation state machine,
and the measurement models (range, range rate, azimuth, elevation, right ascension and declination)
with their analytic partials and media corrections.
*/

/// Provides the fixed step propagator used to linearize the dynamics about the reference trajectory.
pub mod propagators;

/// Provides the two body dynamics and their hyperdual gradient.
pub mod dynamics;

/// Provides the orbital states, the Earth constants, and the frame rotations.
pub mod cosmic;

/// All the input/output needs for this library, i.e. loading configurations from YAML.
pub mod io;

/// All the orbit determination tools: measurement modeling and the batch least squares estimator.
pub mod od;

#[macro_use]
extern crate log;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export some useful things
pub use self::cosmic::{Orbit, Spacecraft};
