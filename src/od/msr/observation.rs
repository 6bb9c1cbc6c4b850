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

use super::MeasurementType;
use crate::cosmic::TimeTagged;
use crate::io::{epoch_from_str, epoch_to_str};
use crate::time::Epoch;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// The editing status of an observation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditTag {
    /// Accepted
    #[default]
    NotEdited,
    /// No measurement model matches the observation
    Unused,
    /// Out of the valid range of the model
    OutOfRange,
    /// Blocked, with the full infeasibility reason code, e.g. "B1"
    Blocked(String),
    OuterLoopSigmaEdit,
    InnerLoopSigmaEdit,
    InitialRMSSigmaEdit,
    /// Edited out by the user, never overwritten
    UserEdit,
}

impl EditTag {
    /// Returns the full code of this tag
    pub fn code(&self) -> &str {
        match self {
            Self::NotEdited => "-",
            Self::Unused => "U",
            Self::OutOfRange => "R",
            Self::Blocked(reason) => reason.as_str(),
            Self::OuterLoopSigmaEdit => "OLSE",
            Self::InnerLoopSigmaEdit => "ILSE",
            Self::InitialRMSSigmaEdit => "IRMS",
            Self::UserEdit => "USER",
        }
    }

    /// Returns the category of this tag, i.e. its code without the reason details
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotEdited => "-",
            Self::Unused => "U",
            Self::OutOfRange => "R",
            Self::Blocked(_) => "B",
            Self::OuterLoopSigmaEdit => "OLSE",
            Self::InnerLoopSigmaEdit => "ILSE",
            Self::InitialRMSSigmaEdit => "IRMS",
            Self::UserEdit => "USER",
        }
    }

    /// Builds a tag from its code
    pub fn from_code(code: &str) -> Self {
        match code {
            "-" | "" | "N" => Self::NotEdited,
            "U" => Self::Unused,
            "R" => Self::OutOfRange,
            "OLSE" => Self::OuterLoopSigmaEdit,
            "ILSE" => Self::InnerLoopSigmaEdit,
            "IRMS" => Self::InitialRMSSigmaEdit,
            "USER" => Self::UserEdit,
            other => Self::Blocked(other.to_string()),
        }
    }

    /// Whether the observation is accepted in the normal equations
    pub fn is_accepted(&self) -> bool {
        *self == Self::NotEdited
    }

    /// Sigma edits are adaptive, and frozen late in the iterations if so configured
    pub fn is_sigma_edit(&self) -> bool {
        matches!(
            self,
            Self::OuterLoopSigmaEdit | Self::InnerLoopSigmaEdit | Self::InitialRMSSigmaEdit
        )
    }

    /// Structural edits come from the measurement model itself
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Unused | Self::OutOfRange | Self::Blocked(_))
    }
}

impl fmt::Display for EditTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// An observation of a tracking arc: what was actually measured.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(serialize_with = "epoch_to_str", deserialize_with = "epoch_from_str")]
    pub epoch: Epoch,
    pub msr_type: MeasurementType,
    /// Identifiers of the participants, in signal path order
    pub participant_ids: Vec<String>,
    /// Observed value(s), one per measurement component
    pub value: Vec<f64>,
    /// Standard deviation of the noise of each component, same unit as the value
    #[serde(default)]
    pub noise_sigma: Vec<f64>,
    #[serde(default)]
    pub edit_tag: EditTag,
}

impl Observation {
    pub fn new(
        epoch: Epoch,
        msr_type: MeasurementType,
        participant_ids: Vec<String>,
        value: Vec<f64>,
        noise_sigma: Vec<f64>,
    ) -> Self {
        Self {
            epoch,
            msr_type,
            participant_ids,
            value,
            noise_sigma,
            edit_tag: EditTag::NotEdited,
        }
    }

    /// Returns the weight of the provided component, i.e. the inverse of its variance, or one if no noise is configured
    pub fn weight(&self, component: usize) -> f64 {
        match self.noise_sigma.get(component) {
            Some(sigma) if *sigma != 0.0 => 1.0 / sigma.powi(2),
            _ => 1.0,
        }
    }

    /// Identifier of the observing end of the signal path, typically the ground station
    pub fn tracker(&self) -> &str {
        self.participant_ids
            .first()
            .map(|id| id.as_str())
            .unwrap_or_default()
    }
}

impl TimeTagged for Observation {
    fn epoch(&self) -> Epoch {
        self.epoch
    }

    fn set_epoch(&mut self, epoch: Epoch) {
        self.epoch = epoch
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {:?} = {:?} {} [{}]",
            self.epoch,
            self.msr_type,
            self.participant_ids,
            self.value,
            self.msr_type.unit(),
            self.edit_tag
        )
    }
}
