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

use snafu::prelude::*;
use std::fmt;

use crate::dynamics::DynamicsError;
use crate::linalg::{DMatrix, DVector};
use crate::time::{Duration, Epoch};

mod instance;
pub use instance::*;
mod rk_methods;
pub use rk_methods::*;

/// Stores the details of the previous integration step of a given propagator.
#[derive(Copy, Clone, Debug)]
pub struct IntegrationDetails {
    /// step size used
    pub step: Duration,
    /// number of steps taken since the last reinitialization
    pub steps: usize,
}

impl fmt::Display for IntegrationDetails {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "IntegrationDetails {{step: {}, steps: {}}}",
            self.step, self.steps
        )
    }
}

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PropagationError {
    #[snafu(display("encountered a dynamics error {source}"))]
    Dynamics { source: DynamicsError },
    #[snafu(display("expected a state of size {expected} but got {got}"))]
    StateSize { expected: usize, got: usize },
    #[snafu(display("propagator step must be strictly positive, got {step}"))]
    InvalidStep { step: Duration },
}

/// The propagator interface used by the estimator: it integrates the reference trajectory and its state transition matrix.
pub trait Propagator {
    /// Epoch of the current propagator state
    fn epoch(&self) -> Epoch;

    /// Resets the propagator to the provided state and epoch, and the state transition matrix to identity.
    fn reinitialize(&mut self, epoch: Epoch, state: &DVector<f64>)
        -> Result<(), PropagationError>;

    /// Propagates forward or backward to the provided epoch, returning the state and the state transition matrix
    /// from the epoch of the last reinitialization.
    fn propagate_to(
        &mut self,
        epoch: Epoch,
    ) -> Result<(DVector<f64>, DMatrix<f64>), PropagationError>;

    /// Current state
    fn state(&self) -> DVector<f64>;

    /// Current state transition matrix
    fn stm(&self) -> DMatrix<f64>;
}
