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
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Status of the batch estimator after an iteration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    #[default]
    Unknown,
    AbsoluteTolConverged,
    RelativeTolConverged,
    AbsAndRelConverged,
    MaxConsecutiveDiverged,
    MaxIterationsDiverged,
    Converging,
    Diverging,
}

impl ConvergenceStatus {
    /// Whether the estimator stops iterating with this status
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::AbsoluteTolConverged
                | Self::RelativeTolConverged
                | Self::AbsAndRelConverged
                | Self::MaxConsecutiveDiverged
                | Self::MaxIterationsDiverged
        )
    }

    pub fn is_converged(self) -> bool {
        matches!(
            self,
            Self::AbsoluteTolConverged | Self::RelativeTolConverged | Self::AbsAndRelConverged
        )
    }
}

impl fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::AbsoluteTolConverged => "AbsoluteTolConverged",
            Self::RelativeTolConverged => "RelativeTolConverged",
            Self::AbsAndRelConverged => "AbsAndRelConverged",
            Self::MaxConsecutiveDiverged => "MaxConsecutiveDiverged",
            Self::MaxIterationsDiverged => "MaxIterationsDiverged",
            Self::Converging => "Converging",
            Self::Diverging => "Diverging",
        };
        write!(f, "{name}")
    }
}

/// Weighted root mean square of the residuals, tracked across iterations.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidualRms {
    /// RMS of the iteration which just completed
    pub new: f64,
    /// RMS of the previous iteration
    pub old: f64,
    /// RMS expected at the next iteration from the linearized correction
    pub predicted: f64,
    /// Best RMS so far
    pub best: f64,
}

impl fmt::Display for ResidualRms {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "RMS: {:.6e} (previous {:.6e}; predicted {:.6e}; best {:.6e})",
            self.new, self.old, self.predicted, self.best
        )
    }
}

/// Tests whether the estimator has converged or diverged.
///
/// The tests are ordered: the absolute and the relative tolerances first (both are evaluated, and combine into
/// [`ConvergenceStatus::AbsAndRelConverged`]), then the maximum number of iterations, then the divergence. The
/// `iterations_taken` counts the iterations completed before this one, and `consecutive_divergences` is the
/// current divergence counter. Returns the status and the updated counter.
pub fn test_for_convergence(
    config: &BatchConfig,
    rms: &ResidualRms,
    iterations_taken: usize,
    consecutive_divergences: usize,
) -> (ConvergenceStatus, usize) {
    let absolute = rms.new <= config.absolute_tol;
    let relative = ((rms.predicted - rms.best) / rms.best).abs() <= config.relative_tol;

    match (absolute, relative) {
        (true, true) => return (ConvergenceStatus::AbsAndRelConverged, consecutive_divergences),
        (true, false) => return (ConvergenceStatus::AbsoluteTolConverged, consecutive_divergences),
        (false, true) => return (ConvergenceStatus::RelativeTolConverged, consecutive_divergences),
        (false, false) => {}
    }

    if iterations_taken + 1 >= config.maximum_iterations {
        return (ConvergenceStatus::MaxIterationsDiverged, consecutive_divergences);
    }

    if iterations_taken >= 1 {
        if rms.new > rms.old {
            let count = consecutive_divergences + 1;
            if count >= config.max_consecutive_divergences {
                (ConvergenceStatus::MaxConsecutiveDiverged, count)
            } else {
                (ConvergenceStatus::Diverging, count)
            }
        } else {
            (ConvergenceStatus::Converging, 0)
        }
    } else {
        (ConvergenceStatus::Unknown, consecutive_divergences)
    }
}
