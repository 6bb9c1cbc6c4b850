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

use super::BatchConfig;
use crate::od::msr::{EditTag, MeasurementData, Observation, Periodicity};

/// Computes the observed minus computed residual, wrapping periodic measurements so that the residual is
/// within half a period of zero.
pub fn residual(observed: f64, computed: f64, periodicity: Option<Periodicity>) -> f64 {
    match periodicity {
        Some(p) => {
            let turns = ((computed - observed) / p.period + 0.5).floor();
            observed + turns * p.period - computed
        }
        None => observed - computed,
    }
}

/// Decides whether each observation is accepted in the normal equations.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DataEditor {
    /// Maximum weighted residual at the first iteration
    pub initial_rms_sigma: f64,
    pub multiplicative_constant: f64,
    pub additive_constant: f64,
    /// Freeze the sigma edits from the freeze iteration on
    pub freeze: bool,
    pub freeze_iteration: usize,
}

impl DataEditor {
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            initial_rms_sigma: config.olse_initial_rms_sigma,
            multiplicative_constant: config.olse_multiplicative_constant,
            additive_constant: config.olse_additive_constant,
            freeze: config.freeze_measurement_editing,
            freeze_iteration: config.freeze_iteration,
        }
    }

    /// Whether sigma edits may no longer change at the provided iteration
    pub fn is_frozen(&self, iteration: usize) -> bool {
        self.freeze && iteration >= self.freeze_iteration
    }

    /// Returns the sigma edit of these residuals, if any of their weighted components exceeds the threshold.
    ///
    /// At the first iteration, the threshold is the initial RMS sigma. Afterwards, it is the outer loop sigma
    /// edit threshold, i.e. the multiplicative constant times `sigma` plus the additive constant, where sigma is
    /// the RMS of the previous iteration (or its predicted RMS).
    pub fn sigma_edit(
        &self,
        iteration: usize,
        residuals: &[f64],
        weights: &[f64],
        sigma: f64,
    ) -> Option<EditTag> {
        let (threshold, tag) = if iteration == 0 {
            (self.initial_rms_sigma, EditTag::InitialRMSSigmaEdit)
        } else {
            (
                self.multiplicative_constant * sigma + self.additive_constant,
                EditTag::OuterLoopSigmaEdit,
            )
        };

        residuals
            .iter()
            .zip(weights)
            .any(|(r, w)| w.sqrt() * r.abs() > threshold)
            .then_some(tag)
    }

    /// Computes the edit tag of an observation.
    ///
    /// User edits are never overwritten, and neither are sigma edits once the editing is frozen. Otherwise, a missing
    /// or infeasible measurement is a structural edit, which is always reevaluated. Once frozen, no new sigma edit
    /// is written.
    pub fn edit(
        &self,
        iteration: usize,
        observation: &Observation,
        measurement: Option<&MeasurementData>,
        residuals: &[f64],
        sigma: f64,
    ) -> EditTag {
        if observation.edit_tag == EditTag::UserEdit {
            return EditTag::UserEdit;
        }
        let frozen = self.is_frozen(iteration);
        if frozen && observation.edit_tag.is_sigma_edit() {
            return observation.edit_tag.clone();
        }

        let Some(measurement) = measurement else {
            return EditTag::Unused;
        };
        if !measurement.is_feasible() {
            return measurement.feasibility.edit_tag();
        }

        if frozen {
            EditTag::NotEdited
        } else {
            let weights: Vec<f64> = (0..residuals.len()).map(|k| observation.weight(k)).collect();
            self.sigma_edit(iteration, residuals, &weights, sigma)
                .unwrap_or(EditTag::NotEdited)
        }
    }
}

impl Default for DataEditor {
    fn default() -> Self {
        Self::from_config(&BatchConfig::default())
    }
}
