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

use crate::io::ConfigError;
use crate::linalg::{DMatrix, DVector};
use crate::propagators::PropagationError;
use crate::time::Epoch;
use snafu::prelude::Snafu;

/// Provides the ground station tracking participant.
mod ground_station;
pub use ground_station::GroundStation;

/// Provides the solve-for elements, the measurement biases, and the Cartesian estimation state manager.
pub mod estimate;

/// Provides all of the supported measurement models and their partial derivatives.
pub mod msr;

/// Provides the tracking arc measurement manager, including light time events.
pub mod tracking;

/// Provides all of the functionality to simulate measurements from ground stations
pub mod simulator;

/// Provides the batch weighted least squares estimator.
pub mod blse;

pub use crate::propagators::Propagator;
use estimate::{SolveForElement, SolveForObjects};
use msr::{MeasurementData, MeasurementModel, Observation};

#[allow(unused_imports)]
pub mod prelude {
    pub use super::blse::*;
    pub use super::estimate::*;
    pub use super::ground_station::*;
    pub use super::msr::*;
    pub use super::simulator::*;
    pub use super::tracking::*;
    pub use super::*;

    pub use crate::cosmic::{Hardware, Orbit, Spacecraft};
    pub use crate::propagators::{Propagator, TwoBodyPropagator};
    pub use crate::time::{Duration, Epoch, TimeUnits, Unit};
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ODError {
    #[snafu(display("OD failed because {source}"))]
    ODConfigError { source: ConfigError },
    #[snafu(display("measurement error: {details}"))]
    Measurement { details: String },
    #[snafu(display("{details}: the {dimension}x{dimension} matrix is singular"))]
    SingularMatrix { dimension: usize, details: String },
    #[snafu(display("two ground stations share the identifier {id}"))]
    DuplicateIdentifier { id: String },
    #[snafu(display("{capability} currently is not available"))]
    UnavailableCapability { capability: String },
    #[snafu(display("at least {need} measurements required for {action}"))]
    TooFewMeasurements { need: usize, action: &'static str },
    #[snafu(display("during an orbit determination, encountered {source}"))]
    ODPropError { source: PropagationError },
    #[snafu(display("invalid estimator state: {action}"))]
    InvalidState { action: String },
}

impl ODError {
    /// Shorthand to build a configuration error from a message
    pub(crate) fn config(msg: String) -> Self {
        Self::ODConfigError {
            source: ConfigError::InvalidConfig { msg },
        }
    }
}

/// The measurement manager drives the observations of a tracking arc and the models which compute them.
///
/// Observations are processed one at a time, in order. The manager keeps the computed measurement of the
/// current observation until the next observation is loaded.
pub trait MeasurementManager {
    /// Checks that no two ground stations share an identifier, returning the offending identifier otherwise
    fn validate_duplicate_ground_station_ids(&self) -> Result<(), String>;

    /// Loads the frequency ramp tables, if any
    fn load_ramp_tables(&mut self) -> Result<(), ODError>;

    /// Rewinds to the first observation; the edit tags of the observations are kept
    fn reset(&mut self);

    /// Epoch of the current observation, or None once all observations have been processed
    fn epoch(&self) -> Option<Epoch>;

    /// Moves to the next observation, returning its epoch, or None if there are no more observations
    fn advance_observation(&mut self) -> Option<Epoch>;

    /// The current observation
    fn current_observation(&self) -> Option<&Observation>;

    /// The current observation, mutable so that its edit tag may be updated
    fn current_observation_mut(&mut self) -> Option<&mut Observation>;

    /// Number of observations in the arc
    fn observation_count(&self) -> usize;

    /// Computes the measurement matching the current observation with the provided objects.
    /// Returns false if no model matches the observation, and true otherwise.
    fn calculate_measurements(
        &mut self,
        objects: &SolveForObjects,
        with_events: bool,
    ) -> Result<bool, ODError>;

    /// The computed measurement of the current observation, if any
    fn measurement(&self) -> Option<&MeasurementData>;

    /// Number of pending events of the current measurement
    fn event_count(&self) -> usize;

    /// Polls the event, returning whether it is located
    fn locate_event(&mut self, index: usize) -> Result<bool, ODError>;

    /// Hands the located event back to the measurement model
    fn process_event(&mut self, index: usize) -> Result<(), ODError>;

    /// Partials of the current measurement with respect to the provided solve-for elements, one row per measurement component
    fn measurement_derivatives(
        &mut self,
        objects: &SolveForObjects,
        elements: &[SolveForElement],
    ) -> Result<DMatrix<f64>, ODError>;

    /// Clears any cached ionosphere computation
    fn clear_ionosphere_cache(&mut self);

    /// Whether all of the observations have been processed
    fn processing_complete(&self) -> bool;

    /// All of the tracking data adapters (measurement models)
    fn tracking_data_adapters(&self) -> &[MeasurementModel];
}

/// The estimation state manager maps the solve-for vector to and from the participant objects.
pub trait EstimationStateManager {
    /// Number of solve-for elements
    fn state_size(&self) -> usize;

    /// The ordered solve-for elements
    fn solve_for_elements(&self) -> &[SolveForElement];

    /// The participants and biases, at the current propagation epoch
    fn objects(&self) -> &SolveForObjects;

    /// The estimation epoch
    fn estimation_epoch(&self) -> Epoch;

    /// The current epoch of the objects
    fn epoch(&self) -> Epoch;

    /// The solve-for vector at the current epoch of the objects
    fn state(&self) -> DVector<f64>;

    /// The solve-for vector at the estimation epoch, i.e. the current estimate
    fn estimation_state(&self) -> DVector<f64>;

    /// Sets the estimate at the estimation epoch, and resets the objects to it
    fn map_vector_to_objects(&mut self, estimate: &DVector<f64>) -> Result<(), ODError>;

    /// Rebuilds the solve-for vector from the objects
    fn map_objects_to_vector(&mut self) -> DVector<f64>;

    /// Returns the solve-for state transition matrix from the estimation epoch to the current epoch
    fn map_objects_to_stm(&self) -> DMatrix<f64>;

    /// Sets the solve-for state transition matrix
    fn map_stm_to_objects(&mut self, stm: &DMatrix<f64>) -> Result<(), ODError>;

    /// The state which the propagator must integrate
    fn propagation_state(&self) -> DVector<f64>;

    /// Stores the propagated state and its transition matrix in the objects
    fn set_propagated(
        &mut self,
        epoch: Epoch,
        state: &DVector<f64>,
        stm: &DMatrix<f64>,
    ) -> Result<(), ODError>;

    /// The apriori covariance of the solve-for state, if configured
    fn apriori_covariance(&self) -> Option<DMatrix<f64>>;

    /// Partials of the solve-for vector with respect to the Cartesian state of the estimated objects
    fn cartesian_to_solve_for_matrix(&self) -> DMatrix<f64>;

    /// Partials of the Cartesian state of the estimated objects with respect to the solve-for vector
    fn solve_for_to_cartesian_matrix(&self) -> DMatrix<f64>;

    /// Partials of the Keplerian elements with respect to the solve-for vector at the estimation epoch
    fn solve_for_to_keplerian_matrix(&self) -> Result<DMatrix<f64>, ODError>;
}
