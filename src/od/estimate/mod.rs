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

use crate::cosmic::Spacecraft;
use crate::od::msr::MeasurementType;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

mod cartesian;
pub use cartesian::CartesianStateManager;

mod uncertainty;
pub use uncertainty::StateUncertainty;

/// The kind of a scalar solve-for element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    PositionX,
    PositionY,
    PositionZ,
    VelocityX,
    VelocityY,
    VelocityZ,
    /// Component of a measurement bias
    Bias {
        msr_type: MeasurementType,
        component: usize,
    },
}

impl ElementKind {
    /// The Cartesian components, in the order of the state vector
    pub const CARTESIAN: [Self; 6] = [
        Self::PositionX,
        Self::PositionY,
        Self::PositionZ,
        Self::VelocityX,
        Self::VelocityY,
        Self::VelocityZ,
    ];

    /// Index of this element in the Cartesian state, if it is a Cartesian element
    pub fn cartesian_index(&self) -> Option<usize> {
        Self::CARTESIAN.iter().position(|k| k == self)
    }
}

/// A scalar element of the estimation state, tagged with its owner.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolveForElement {
    /// Identifier of the spacecraft, or of the tracker for a bias
    pub owner: String,
    pub kind: ElementKind,
}

impl SolveForElement {
    pub fn new(owner: &str, kind: ElementKind) -> Self {
        Self {
            owner: owner.to_string(),
            kind,
        }
    }
}

impl fmt::Display for SolveForElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ElementKind::Bias {
                msr_type,
                component,
            } => write!(f, "{}.{msr_type}Bias[{component}]", self.owner),
            kind => write!(f, "{}.{kind:?}", self.owner),
        }
    }
}

/// A constant bias of all of the observations of one type from one tracker, in the unit of the measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementBias {
    pub tracker: String,
    pub msr_type: MeasurementType,
    /// One value per measurement component
    pub values: Vec<f64>,
}

impl MeasurementBias {
    /// A zero bias of the provided measurement type
    pub fn zero(tracker: &str, msr_type: MeasurementType) -> Self {
        Self {
            tracker: tracker.to_string(),
            msr_type,
            values: vec![0.0; msr_type.size()],
        }
    }
}

/// The participants and biases whose parameters are estimated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolveForObjects {
    pub spacecraft: Vec<Spacecraft>,
    pub biases: Vec<MeasurementBias>,
}

impl SolveForObjects {
    pub fn spacecraft_by_id(&self, id: &str) -> Option<&Spacecraft> {
        self.spacecraft.iter().find(|sc| sc.id == id)
    }

    pub fn bias_for(&self, tracker: &str, msr_type: MeasurementType) -> Option<&MeasurementBias> {
        self.biases
            .iter()
            .find(|b| b.tracker == tracker && b.msr_type == msr_type)
    }
}
