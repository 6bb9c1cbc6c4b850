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

use super::{EditTag, MeasurementType};
use crate::cosmic::TimeTagged;
use crate::linalg::DMatrix;
use crate::time::Epoch;
use std::fmt;

/// Reason code of a feasible measurement
pub const FEASIBLE_REASON: &str = "N";

/// Outcome of a feasibility check: infeasibility is not an error.
#[derive(Clone, Debug, PartialEq)]
pub struct Feasibility {
    pub is_feasible: bool,
    /// Value on which the feasibility was decided, e.g. the elevation in degrees
    pub value: f64,
    /// "N" when feasible, otherwise the blocking reason, e.g. "B1"
    pub reason: String,
}

impl Feasibility {
    pub fn feasible(value: f64) -> Self {
        Self {
            is_feasible: true,
            value,
            reason: FEASIBLE_REASON.to_string(),
        }
    }

    pub fn blocked(value: f64, reason: &str) -> Self {
        Self {
            is_feasible: false,
            value,
            reason: reason.to_string(),
        }
    }

    /// Returns the edit tag matching this feasibility
    pub fn edit_tag(&self) -> EditTag {
        if self.is_feasible {
            EditTag::NotEdited
        } else {
            EditTag::Blocked(self.reason.clone())
        }
    }
}

/// A computed measurement: what the model predicts for an observation.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementData {
    pub msr_type: MeasurementType,
    /// Participant identifiers, in the order of the model
    pub participant_ids: Vec<String>,
    pub epoch: Epoch,
    /// Computed value(s), of the size of the measurement type
    pub value: Vec<f64>,
    pub feasibility: Feasibility,
    /// Edit status assigned to this measurement by the estimator
    pub edit_tag: EditTag,
    /// Partials of the value with respect to the solve-for state, one row per component
    pub derivatives: Option<DMatrix<f64>>,
}

impl MeasurementData {
    pub fn new(
        msr_type: MeasurementType,
        participant_ids: Vec<String>,
        epoch: Epoch,
        value: Vec<f64>,
        feasibility: Feasibility,
    ) -> Self {
        Self {
            msr_type,
            participant_ids,
            epoch,
            value,
            feasibility,
            edit_tag: EditTag::NotEdited,
            derivatives: None,
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.feasibility.is_feasible
    }
}

impl TimeTagged for MeasurementData {
    fn epoch(&self) -> Epoch {
        self.epoch
    }

    fn set_epoch(&mut self, epoch: Epoch) {
        self.epoch = epoch
    }
}

impl fmt::Display for MeasurementData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {:?} = {:?} {} (feasible: {}, {})",
            self.epoch,
            self.msr_type,
            self.participant_ids,
            self.value,
            self.msr_type.unit(),
            self.feasibility.is_feasible,
            self.feasibility.reason
        )
    }
}
