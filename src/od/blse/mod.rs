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

use crate::linalg::{DMatrix, DVector};
use crate::od::{
    EstimationStateManager, MeasurementManager, ODError, ODPropSnafu, TooFewMeasurementsSnafu,
};
use crate::propagators::Propagator;
use crate::time::{Duration, Epoch};
use snafu::prelude::*;
use std::fmt;

mod conf;
mod convergence;
mod editing;
mod inversion;
mod normal;
mod solution;
mod statistics;

pub use conf::{BatchConfig, BatchParameter, ParameterKind};
pub use convergence::{test_for_convergence, ConvergenceStatus, ResidualRms};
pub use editing::{residual, DataEditor};
pub use inversion::{invert, invert_apriori, InversionAlgorithm, CHOLESKY_EPSILON};
pub use normal::NormalEquations;
pub use solution::{correlation, BatchSolution, IterationReport};
pub use statistics::{EditCounts, IterationStatistics, ResidualStatistics};

/// States of the batch estimator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EstimatorState {
    Initializing,
    Propagating,
    Calculating,
    Locating,
    Accumulating,
    Estimating,
    CheckingRun,
    Finished,
}

impl fmt::Display for EstimatorState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Initializing => "INITIALIZING",
            Self::Propagating => "PROPAGATING",
            Self::Calculating => "CALCULATING",
            Self::Locating => "LOCATING",
            Self::Accumulating => "ACCUMULATING",
            Self::Estimating => "ESTIMATING",
            Self::CheckingRun => "CHECKINGRUN",
            Self::Finished => "FINISHED",
        };
        write!(f, "{name}")
    }
}

/// A batch weighted least squares estimator, stepped by [`BatchEstimator::advance_state`].
///
/// Each iteration propagates the reference trajectory from the estimation epoch through every observation,
/// accumulates the accepted residuals into the normal equations, then solves for the correction of the
/// estimate at the estimation epoch. Any error finishes the run.
pub struct BatchEstimator<P: Propagator, M: MeasurementManager, S: EstimationStateManager> {
    /// Propagator of the reference trajectory and its state transition matrix
    pub prop: P,
    pub msr_manager: M,
    pub esm: S,
    config: BatchConfig,
    editor: DataEditor,
    state: EstimatorState,
    initialized: bool,
    failed: bool,
    estimation_epoch: Epoch,
    current_epoch: Epoch,
    next_epoch: Option<Epoch>,
    time_step: Duration,
    iterations_taken: usize,
    status: ConvergenceStatus,
    consecutive_divergences: usize,
    rms: ResidualRms,
    reset_best_residual_rms: f64,
    /// Estimate at the start of the first iteration
    initial_estimate: DVector<f64>,
    estimate: DVector<f64>,
    /// Difference between the initial estimate and the current estimate
    x0bar: DVector<f64>,
    dx: DVector<f64>,
    apriori_information: Option<DMatrix<f64>>,
    normal: NormalEquations,
    covariance: Option<DMatrix<f64>>,
    statistics: IterationStatistics,
    reports: Vec<IterationReport>,
    solution: Option<BatchSolution>,
}

impl<P: Propagator, M: MeasurementManager, S: EstimationStateManager> BatchEstimator<P, M, S> {
    /// Builds a new batch estimator, checking the configuration.
    pub fn new(prop: P, msr_manager: M, esm: S, config: BatchConfig) -> Result<Self, ODError> {
        config.validate()?;
        let size = esm.state_size();
        let epoch = esm.estimation_epoch();
        Ok(Self {
            prop,
            msr_manager,
            esm,
            editor: DataEditor::from_config(&config),
            config,
            state: EstimatorState::Initializing,
            initialized: false,
            failed: false,
            estimation_epoch: epoch,
            current_epoch: epoch,
            next_epoch: None,
            time_step: Duration::ZERO,
            iterations_taken: 0,
            status: ConvergenceStatus::Unknown,
            consecutive_divergences: 0,
            rms: ResidualRms::default(),
            reset_best_residual_rms: 0.0,
            initial_estimate: DVector::zeros(size),
            estimate: DVector::zeros(size),
            x0bar: DVector::zeros(size),
            dx: DVector::zeros(size),
            apriori_information: None,
            normal: NormalEquations::new(size, None, &DVector::zeros(size)),
            covariance: None,
            statistics: IterationStatistics::default(),
            reports: Vec::new(),
            solution: None,
        })
    }

    /// Executes the action of the current state and moves to the next state, which is returned.
    ///
    /// Any error moves the estimator to [`EstimatorState::Finished`] before being returned. Once finished, the
    /// first step builds the solution and any further step does nothing.
    pub fn advance_state(&mut self) -> Result<EstimatorState, ODError> {
        let outcome = match self.state {
            EstimatorState::Initializing => self.initialize(),
            EstimatorState::Propagating => self.propagate(),
            EstimatorState::Calculating => self.calculate(),
            EstimatorState::Locating => self.locate(),
            EstimatorState::Accumulating => self.accumulate(),
            EstimatorState::Estimating => self.estimate_step(),
            EstimatorState::CheckingRun => self.check_completion(),
            EstimatorState::Finished => {
                self.complete();
                Ok(EstimatorState::Finished)
            }
        };

        match outcome {
            Ok(next) => {
                if next != self.state {
                    trace!("{} -> {next}", self.state);
                }
                self.state = next;
                Ok(next)
            }
            Err(e) => {
                error!("batch estimator failed in {}: {e}", self.state);
                self.failed = true;
                self.state = EstimatorState::Finished;
                Err(e)
            }
        }
    }

    /// Steps the estimator until it finishes, and returns its solution.
    pub fn run(&mut self) -> Result<BatchSolution, ODError> {
        while self.advance_state()? != EstimatorState::Finished {}
        // Builds the solution
        self.advance_state()?;
        self.solution.clone().ok_or_else(|| ODError::InvalidState {
            action: "the batch estimator finished without a solution".to_string(),
        })
    }

    /// Executes an action by name: only "Reset" is supported, which returns to initialization.
    /// Returns whether the action was executed.
    pub fn take_action(&mut self, action: &str) -> bool {
        match action {
            "Reset" => {
                info!("resetting the batch estimator");
                self.state = EstimatorState::Initializing;
                self.initialized = false;
                true
            }
            _ => false,
        }
    }

    fn initialize(&mut self) -> Result<EstimatorState, ODError> {
        self.config.validate()?;
        self.editor = DataEditor::from_config(&self.config);

        if let Err(id) = self.msr_manager.validate_duplicate_ground_station_ids() {
            return Err(ODError::DuplicateIdentifier { id });
        }
        self.msr_manager.load_ramp_tables()?;

        let size = self.esm.state_size();
        self.estimation_epoch = self.esm.estimation_epoch();
        self.estimate = self.esm.estimation_state();
        self.initial_estimate = self.estimate.clone();
        self.x0bar = DVector::zeros(size);
        self.dx = DVector::zeros(size);

        self.apriori_information = if self.config.use_initial_covariance {
            let covariance = self.esm.apriori_covariance().ok_or_else(|| {
                ODError::config(
                    "UseInitialCovariance is set but the estimation state has no apriori covariance"
                        .to_string(),
                )
            })?;
            Some(invert_apriori(&covariance)?)
        } else {
            None
        };
        self.normal = NormalEquations::new(size, self.apriori_information.as_ref(), &self.x0bar);

        self.iterations_taken = 0;
        self.status = ConvergenceStatus::Unknown;
        self.consecutive_divergences = 0;
        self.rms = ResidualRms::default();
        self.reset_best_residual_rms = 0.0;
        self.covariance = None;
        self.statistics = IterationStatistics::default();
        self.reports.clear();
        self.solution = None;
        self.failed = false;

        self.esm.map_vector_to_objects(&self.estimate)?;
        self.prop
            .reinitialize(self.estimation_epoch, &self.esm.propagation_state())
            .context(ODPropSnafu)?;
        self.current_epoch = self.estimation_epoch;
        self.time_step = Duration::ZERO;

        self.msr_manager.reset();
        self.next_epoch = self.msr_manager.epoch();
        ensure!(
            self.next_epoch.is_some(),
            TooFewMeasurementsSnafu {
                need: 1_usize,
                action: "a batch estimate"
            }
        );

        info!(
            "Batch estimator initialized with {} observations and {} solve-for elements at {}",
            self.msr_manager.observation_count(),
            size,
            self.estimation_epoch
        );
        self.initialized = true;

        Ok(self.calculate_or_propagate())
    }

    fn calculate_or_propagate(&self) -> EstimatorState {
        if self.next_epoch == Some(self.current_epoch) {
            EstimatorState::Calculating
        } else {
            EstimatorState::Propagating
        }
    }

    fn propagate(&mut self) -> Result<EstimatorState, ODError> {
        let Some(next) = self.next_epoch else {
            return Ok(EstimatorState::Estimating);
        };
        if next == self.current_epoch {
            return Ok(EstimatorState::Calculating);
        }

        // The propagator integrates backward for observations before the estimation epoch
        self.time_step = next - self.current_epoch;
        let (state, stm) = self.prop.propagate_to(next).context(ODPropSnafu)?;
        self.esm.set_propagated(next, &state, &stm)?;
        self.current_epoch = next;
        trace!("propagated by {} to {next}", self.time_step);

        Ok(EstimatorState::Calculating)
    }

    fn calculate(&mut self) -> Result<EstimatorState, ODError> {
        if !self
            .msr_manager
            .calculate_measurements(self.esm.objects(), true)?
        {
            return Ok(EstimatorState::Accumulating);
        }

        if self.msr_manager.event_count() > 0 {
            Ok(EstimatorState::Locating)
        } else {
            Ok(EstimatorState::Accumulating)
        }
    }

    fn locate(&mut self) -> Result<EstimatorState, ODError> {
        let mut pending = false;
        for index in 0..self.msr_manager.event_count() {
            if self.msr_manager.locate_event(index)? {
                self.msr_manager.process_event(index)?;
            } else {
                pending = true;
            }
        }

        if pending {
            Ok(EstimatorState::Locating)
        } else {
            Ok(EstimatorState::Accumulating)
        }
    }

    fn accumulate(&mut self) -> Result<EstimatorState, ODError> {
        let observation = self
            .msr_manager
            .current_observation()
            .cloned()
            .ok_or_else(|| ODError::InvalidState {
                action: "no current observation to accumulate".to_string(),
            })?;
        let measurement = self.msr_manager.measurement().cloned();

        let residuals = match &measurement {
            Some(computed) if computed.is_feasible() => {
                if computed.value.len() != observation.value.len() {
                    return Err(ODError::Measurement {
                        details: format!(
                            "{observation} has {} components but its model computed {}",
                            observation.value.len(),
                            computed.value.len()
                        ),
                    });
                }
                observation
                    .value
                    .iter()
                    .zip(&computed.value)
                    .enumerate()
                    .map(|(k, (o, c))| residual(*o, *c, observation.msr_type.periodicity(k)))
                    .collect()
            }
            _ => Vec::new(),
        };
        let weights: Vec<f64> = (0..residuals.len())
            .map(|k| observation.weight(k))
            .collect();

        let sigma = if self.config.use_rmsp {
            self.rms.predicted
        } else {
            self.rms.new
        };
        let tag = self.editor.edit(
            self.iterations_taken,
            &observation,
            measurement.as_ref(),
            &residuals,
            sigma,
        );

        if let Some(obs) = self.msr_manager.current_observation_mut() {
            obs.edit_tag = tag.clone();
        }

        let accepted = tag.is_accepted() && !residuals.is_empty();
        self.statistics.record(
            observation.tracker(),
            observation.msr_type,
            &tag,
            accepted.then_some((residuals.as_slice(), weights.as_slice())),
        );

        if accepted {
            let h_tilde = self
                .msr_manager
                .measurement_derivatives(self.esm.objects(), self.esm.solve_for_elements())?;
            let h = h_tilde * self.esm.map_objects_to_stm();
            if h.nrows() != residuals.len() {
                return Err(ODError::Measurement {
                    details: format!(
                        "{observation} has {} components but {} rows of partials",
                        residuals.len(),
                        h.nrows()
                    ),
                });
            }
            for (k, (r, w)) in residuals.iter().zip(&weights).enumerate() {
                self.normal.accumulate(h.row(k).clone_owned(), *r, *w)?;
            }
        }
        debug!("{observation}: O-C = {residuals:?} [{tag}]");

        match self.msr_manager.advance_observation() {
            Some(epoch) => {
                self.next_epoch = Some(epoch);
                Ok(EstimatorState::Propagating)
            }
            None => {
                self.next_epoch = None;
                Ok(EstimatorState::Estimating)
            }
        }
    }

    fn estimate_step(&mut self) -> Result<EstimatorState, ODError> {
        let size = self.esm.state_size();
        let count = self.normal.residual_count();
        ensure!(
            count > 0,
            TooFewMeasurementsSnafu {
                need: 1_usize,
                action: "a batch estimate"
            }
        );
        // The apriori information constrains the otherwise unobservable directions
        if self.apriori_information.is_none() {
            ensure!(
                count >= size,
                TooFewMeasurementsSnafu {
                    need: size,
                    action: "a batch estimate without apriori"
                }
            );
        }

        if self.iterations_taken > 0 {
            self.rms.old = self.rms.new;
        }
        self.rms.new = self.normal.weighted_rms();
        // A diverging iteration may already have reset the best RMS to its own RMS
        if self.iterations_taken == 0 {
            self.rms.best = self.rms.new;
        } else {
            self.rms.best = self.rms.best.min(self.rms.new);
        }

        let (covariance, dx) = self.normal.solve(self.config.inversion_algorithm)?;
        self.estimate += &dx;
        self.esm.map_vector_to_objects(&self.estimate)?;

        let apriori_term = match &self.apriori_information {
            Some(info) => {
                let delta = &self.estimate - &self.initial_estimate;
                delta.dot(&(info * &delta))
            }
            None => 0.0,
        };
        self.rms.predicted =
            ((apriori_term + self.normal.predicted_sum_squares(&dx)) / count as f64).sqrt();

        info!(
            "[{}/{}] {} with {count} residuals; corrections: {:.3} m\t{:.3} m/s",
            self.iterations_taken + 1,
            self.config.maximum_iterations,
            self.rms,
            dx.rows(0, size.min(3)).norm() * 1e3,
            dx.rows(size.min(3), size.min(6).saturating_sub(3)).norm() * 1e3,
        );
        info!("[{}/{}] {}", self.iterations_taken + 1, self.config.maximum_iterations, self.statistics.edits());

        self.dx = dx;
        self.covariance = Some(covariance);
        Ok(EstimatorState::CheckingRun)
    }

    fn check_completion(&mut self) -> Result<EstimatorState, ODError> {
        let (status, divergences) = test_for_convergence(
            &self.config,
            &self.rms,
            self.iterations_taken,
            self.consecutive_divergences,
        );
        self.status = status;
        self.consecutive_divergences = divergences;
        if self.config.reset_best_rms_if_diverging && status == ConvergenceStatus::Diverging {
            self.reset_best_residual_rms = self.rms.new;
        }

        self.reports.push(IterationReport {
            iteration: self.iterations_taken,
            status,
            rms: self.rms,
            state: self.estimate.clone(),
            correction: self.dx.clone(),
            statistics: self.statistics.clone(),
        });
        self.iterations_taken += 1;

        match status {
            ConvergenceStatus::AbsoluteTolConverged
            | ConvergenceStatus::RelativeTolConverged
            | ConvergenceStatus::AbsAndRelConverged => {
                info!(
                    "*** CONVERGED *** ({status}) after {} iterations",
                    self.iterations_taken
                );
                return Ok(EstimatorState::Finished);
            }
            ConvergenceStatus::MaxConsecutiveDiverged | ConvergenceStatus::MaxIterationsDiverged => {
                warn!(
                    "*** DIVERGED *** ({status}) after {} iterations",
                    self.iterations_taken
                );
                return Ok(EstimatorState::Finished);
            }
            ConvergenceStatus::Diverging => warn!(
                "[{}/{}] diverging ({} consecutive)",
                self.iterations_taken, self.config.maximum_iterations, self.consecutive_divergences
            ),
            ConvergenceStatus::Converging | ConvergenceStatus::Unknown => {}
        }

        // Start a new iteration from the corrected estimate
        let size = self.esm.state_size();
        self.esm.map_vector_to_objects(&self.estimate)?;
        self.current_epoch = self.estimation_epoch;
        self.time_step = Duration::ZERO;
        self.msr_manager.reset();
        self.msr_manager.clear_ionosphere_cache();
        self.next_epoch = self.msr_manager.epoch();

        self.x0bar -= &self.dx;
        self.normal = NormalEquations::new(size, self.apriori_information.as_ref(), &self.x0bar);
        if self.config.reset_best_rms_if_diverging && status == ConvergenceStatus::Diverging {
            self.rms.best = self.reset_best_residual_rms;
        }
        self.statistics = IterationStatistics::default();

        self.prop
            .reinitialize(self.estimation_epoch, &self.esm.propagation_state())
            .context(ODPropSnafu)?;

        Ok(self.calculate_or_propagate())
    }

    /// Builds the solution once; never modifies the estimate nor the normal equations.
    fn complete(&mut self) {
        if self.solution.is_some() || self.failed {
            return;
        }
        let Some(covariance) = &self.covariance else {
            return;
        };

        let to_cartesian = self.esm.solve_for_to_cartesian_matrix();
        let cartesian_covariance = &to_cartesian * covariance * to_cartesian.transpose();
        let keplerian_covariance = match self.esm.solve_for_to_keplerian_matrix() {
            Ok(jac) => Some(&jac * covariance * jac.transpose()),
            Err(e) => {
                warn!("Keplerian covariance unavailable: {e}");
                None
            }
        };

        let solution = BatchSolution {
            estimation_epoch: self.estimation_epoch,
            elements: self.esm.solve_for_elements().to_vec(),
            state: self.estimate.clone(),
            covariance: covariance.clone(),
            cartesian_covariance,
            keplerian_covariance,
            status: self.status,
            iterations: self.iterations_taken,
            rms: self.rms,
            reports: self.reports.clone(),
        };
        info!("Batch estimate:\n{solution}");
        self.solution = Some(solution);
    }

    pub fn state(&self) -> EstimatorState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Replaces the configuration after validating it
    pub fn set_config(&mut self, config: BatchConfig) -> Result<(), ODError> {
        config.validate()?;
        self.editor = DataEditor::from_config(&config);
        self.config = config;
        Ok(())
    }

    pub fn status(&self) -> ConvergenceStatus {
        self.status
    }

    pub fn iterations_taken(&self) -> usize {
        self.iterations_taken
    }

    pub fn rms(&self) -> &ResidualRms {
        &self.rms
    }

    pub fn estimation_epoch(&self) -> Epoch {
        self.estimation_epoch
    }

    /// Epoch of the reference trajectory
    pub fn current_epoch(&self) -> Epoch {
        self.current_epoch
    }

    /// Last propagation step, signed
    pub fn time_step(&self) -> Duration {
        self.time_step
    }

    /// Current estimate of the solve-for vector at the estimation epoch
    pub fn estimate(&self) -> &DVector<f64> {
        &self.estimate
    }

    /// Last correction of the estimate
    pub fn correction(&self) -> &DVector<f64> {
        &self.dx
    }

    pub fn information_matrix(&self) -> &DMatrix<f64> {
        self.normal.information()
    }

    pub fn rhs(&self) -> &DVector<f64> {
        self.normal.rhs()
    }

    pub fn covariance(&self) -> Option<&DMatrix<f64>> {
        self.covariance.as_ref()
    }

    /// Statistics of the iteration in progress
    pub fn statistics(&self) -> &IterationStatistics {
        &self.statistics
    }

    pub fn reports(&self) -> &[IterationReport] {
        &self.reports
    }

    pub fn solution(&self) -> Option<&BatchSolution> {
        self.solution.as_ref()
    }

    pub fn get_real_parameter(&self, name: &str) -> Result<f64, ODError> {
        self.config.get_real_parameter(name)
    }

    pub fn set_real_parameter(&mut self, name: &str, value: f64) -> Result<(), ODError> {
        self.config.set_real_parameter(name, value)?;
        self.editor = DataEditor::from_config(&self.config);
        Ok(())
    }

    pub fn get_integer_parameter(&self, name: &str) -> Result<i64, ODError> {
        self.config.get_integer_parameter(name)
    }

    pub fn set_integer_parameter(&mut self, name: &str, value: i64) -> Result<(), ODError> {
        self.config.set_integer_parameter(name, value)?;
        self.editor = DataEditor::from_config(&self.config);
        Ok(())
    }

    pub fn get_boolean_parameter(&self, name: &str) -> Result<bool, ODError> {
        self.config.get_boolean_parameter(name)
    }

    pub fn set_boolean_parameter(&mut self, name: &str, value: bool) -> Result<(), ODError> {
        self.config.set_boolean_parameter(name, value)?;
        self.editor = DataEditor::from_config(&self.config);
        Ok(())
    }

    /// Returns a string parameter by name, including the read-only convergence status
    pub fn get_string_parameter(&self, name: &str) -> Result<String, ODError> {
        match BatchParameter::lookup(name, ParameterKind::String)? {
            BatchParameter::ConvergentStatus => Ok(self.status.to_string()),
            _ => self.config.get_string_parameter(name),
        }
    }

    pub fn set_string_parameter(&mut self, name: &str, value: &str) -> Result<(), ODError> {
        self.config.set_string_parameter(name, value)
    }
}
