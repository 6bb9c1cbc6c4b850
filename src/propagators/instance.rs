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

use super::{
    DynamicsSnafu, IntegrationDetails, PropagationError, Propagator, StateSizeSnafu, RK, RK4Fixed,
};
use crate::dynamics::{Dynamics, TwoBody};
use crate::linalg::{DMatrix, DVector, Matrix6, SVector, Vector6};
use crate::time::{Duration, Epoch, Unit};
use snafu::{ensure, ResultExt};
use std::marker::PhantomData;

/// Size of the integrated vector: the Cartesian state and the 6x6 state transition matrix, column major
const PROP_VEC_LEN: usize = 42;

type PropVector = SVector<f64, PROP_VEC_LEN>;

/// A fixed step Runge Kutta propagator of a Cartesian state and of its state transition matrix.
///
/// The STM is integrated alongside the state as dΦ/dt = A Φ, where A is the gradient of the dynamics
/// computed with hyperdual numbers. Steps may be negative to propagate backward in time.
#[derive(Clone, Debug)]
pub struct FixedStepPropagator<D: Dynamics, M: RK> {
    pub dynamics: D,
    /// Magnitude of the integration step
    pub step_size: Duration,
    epoch: Epoch,
    state: Vector6<f64>,
    stm: Matrix6<f64>,
    details: IntegrationDetails,
    _method: PhantomData<M>,
}

/// Two body dynamics integrated with the classical RK4.
pub type TwoBodyPropagator = FixedStepPropagator<TwoBody, RK4Fixed>;

impl TwoBodyPropagator {
    /// Initializes a two body propagator with the default step of 10 seconds.
    pub fn two_body(mu_km3_s2: f64, epoch: Epoch, state: Vector6<f64>) -> Self {
        Self::new(TwoBody::new(mu_km3_s2), 10 * Unit::Second, epoch, state)
    }
}

impl<D: Dynamics, M: RK> FixedStepPropagator<D, M> {
    pub fn new(dynamics: D, step_size: Duration, epoch: Epoch, state: Vector6<f64>) -> Self {
        Self {
            dynamics,
            step_size: step_size.abs(),
            epoch,
            state,
            stm: Matrix6::identity(),
            details: IntegrationDetails {
                step: step_size.abs(),
                steps: 0,
            },
            _method: PhantomData,
        }
    }

    /// Returns the details of the latest integration step
    pub fn latest_details(&self) -> IntegrationDetails {
        self.details
    }

    /// Returns the current Cartesian state
    pub fn cartesian_state(&self) -> Vector6<f64> {
        self.state
    }

    /// Returns the current state transition matrix
    pub fn state_transition(&self) -> Matrix6<f64> {
        self.stm
    }

    fn pack(&self) -> PropVector {
        PropVector::from_iterator(self.state.iter().chain(self.stm.iter()).cloned())
    }

    fn unpack(&mut self, vec: &PropVector) {
        self.state = vec.fixed_rows::<6>(0).into_owned();
        self.stm = Matrix6::from_column_slice(&vec.as_slice()[6..]);
    }

    /// Derivative of the full integrated vector
    fn derivative(&self, delta_t_s: f64, vec: &PropVector) -> Result<PropVector, PropagationError> {
        let state: Vector6<f64> = vec.fixed_rows::<6>(0).into_owned();
        let stm = Matrix6::from_column_slice(&vec.as_slice()[6..]);
        let (d_state, grad) = self
            .dynamics
            .dual_eom(delta_t_s, &state)
            .context(DynamicsSnafu)?;
        let d_stm = grad * stm;
        Ok(PropVector::from_iterator(
            d_state.iter().chain(d_stm.iter()).cloned(),
        ))
    }

    /// Takes a single step of the provided size (in seconds, may be negative).
    fn single_step(&mut self, step_s: f64) -> Result<(), PropagationError> {
        let state_vec = self.pack();
        let mut k: Vec<PropVector> = Vec::with_capacity(M::STAGES);
        k.push(self.derivative(0.0, &state_vec)?);

        let mut a_idx: usize = 0;
        for i in 0..(M::STAGES - 1) {
            // c_i is the sum of the a_ij of this row
            let mut ci: f64 = 0.0;
            let mut wi = PropVector::zeros();
            for kj in &k[0..i + 1] {
                let a_ij = M::A_COEFFS[a_idx];
                ci += a_ij;
                wi += a_ij * kj;
                a_idx += 1;
            }
            let ki = self.derivative(ci * step_s, &(state_vec + step_s * wi))?;
            k.push(ki);
        }

        let mut next_state = state_vec;
        for (i, ki) in k.iter().enumerate() {
            next_state += step_s * M::B_COEFFS[i] * ki;
        }

        self.unpack(&next_state);
        self.epoch += step_s * Unit::Second;
        self.details.steps += 1;
        Ok(())
    }

    /// Propagates until the provided epoch, forward or backward, landing exactly on it.
    pub fn until_epoch(&mut self, epoch: Epoch) -> Result<Vector6<f64>, PropagationError> {
        ensure!(
            self.step_size > Duration::ZERO,
            super::InvalidStepSnafu {
                step: self.step_size
            }
        );

        let step_s = self.step_size.to_seconds();
        loop {
            let remaining_s = (epoch - self.epoch).to_seconds();
            if remaining_s.abs() < 1e-9 {
                break;
            }
            let this_step_s = if remaining_s.abs() <= step_s {
                remaining_s
            } else {
                step_s.copysign(remaining_s)
            };
            self.details.step = this_step_s * Unit::Second;
            self.single_step(this_step_s)?;
        }
        // Remove any round off on the epoch
        self.epoch = epoch;
        trace!("propagated to {epoch} in {} steps", self.details.steps);
        Ok(self.state)
    }
}

impl<D: Dynamics, M: RK> Propagator for FixedStepPropagator<D, M> {
    fn epoch(&self) -> Epoch {
        self.epoch
    }

    fn reinitialize(&mut self, epoch: Epoch, state: &DVector<f64>) -> Result<(), PropagationError> {
        ensure!(
            state.len() == 6,
            StateSizeSnafu {
                expected: 6_usize,
                got: state.len()
            }
        );
        self.epoch = epoch;
        self.state = Vector6::from_iterator(state.iter().cloned());
        self.stm = Matrix6::identity();
        self.details.steps = 0;
        Ok(())
    }

    fn propagate_to(
        &mut self,
        epoch: Epoch,
    ) -> Result<(DVector<f64>, DMatrix<f64>), PropagationError> {
        self.until_epoch(epoch)?;
        Ok((self.state(), self.stm()))
    }

    fn state(&self) -> DVector<f64> {
        DVector::from_iterator(6, self.state.iter().cloned())
    }

    fn stm(&self) -> DMatrix<f64> {
        DMatrix::from_iterator(6, 6, self.stm.iter().cloned())
    }
}
