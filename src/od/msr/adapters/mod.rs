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

use super::{CoreMeasurement, Feasibility, MeasurementData, MeasurementType, Participant, PhysicalMeasurement};
use crate::linalg::{DMatrix, Vector3};
use crate::od::{MeasurementSnafu, ODError};
use crate::time::Epoch;
use snafu::ensure;
use std::fmt;

mod angles;
mod radec;
mod range;
mod rangerate;

pub use angles::AzimuthElevation;
pub use radec::RaDec;
pub use range::{elevation_feasibility, Range};
pub use rangerate::RangeRate;

/// The parameter with respect to which a measurement is differentiated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DerivativeParameter {
    /// Three columns
    Position,
    /// Three columns
    Velocity,
    /// Six columns, position then velocity
    CartesianState,
    /// As many columns as the measurement has components
    Bias,
}

impl DerivativeParameter {
    pub fn size(self, msr_type: MeasurementType) -> usize {
        match self {
            Self::Position | Self::Velocity => 3,
            Self::CartesianState => 6,
            Self::Bias => msr_type.size(),
        }
    }
}

/// An observable computed from the geometry between two participants, with its partial derivatives.
pub trait ObservableModel {
    fn msr_type(&self) -> MeasurementType;

    fn physical(&self) -> &PhysicalMeasurement;

    fn physical_mut(&mut self) -> &mut PhysicalMeasurement;

    /// Computes the value(s) of this observable from the geometry at the provided epoch, including any media correction.
    fn compute_value(&mut self, epoch: Epoch) -> Result<Vec<f64>, ODError>;

    /// Checks whether the observable can be measured with the geometry at the provided epoch
    fn check_feasibility(&mut self, epoch: Epoch, with_events: bool) -> Result<Feasibility, ODError>;

    /// Inertial gradients of each component with respect to the position and to the velocity of the second participant.
    /// The first participant's gradients are their negatives.
    fn gradients(&mut self, epoch: Epoch) -> Result<Vec<(Vector3<f64>, Vector3<f64>)>, ODError>;

    fn core(&self) -> &CoreMeasurement {
        &self.physical().core
    }

    /// Partials of the observable with respect to the provided parameter of the provided participant, one row per
    /// component. A ground station's partials are expressed in its body fixed frame.
    fn compute_derivative(
        &mut self,
        epoch: Epoch,
        participant_index: usize,
        parameter: DerivativeParameter,
    ) -> Result<DMatrix<f64>, ODError> {
        let size = self.msr_type().size();
        if parameter == DerivativeParameter::Bias {
            return Ok(DMatrix::identity(size, size));
        }

        ensure!(
            participant_index < 2,
            MeasurementSnafu {
                details: format!(
                    "cannot differentiate {} with respect to participant {participant_index}",
                    self.msr_type()
                )
            }
        );

        let gradients = self.gradients(epoch)?;
        let geom = self.physical().core.geometry()?;
        let dcm = geom.native_to_inertial(participant_index);
        let sign = if participant_index == 0 { -1.0 } else { 1.0 };

        let (pos_col, vel_col) = match parameter {
            DerivativeParameter::Position => (Some(0), None),
            DerivativeParameter::Velocity => (None, Some(0)),
            DerivativeParameter::CartesianState => (Some(0), Some(3)),
            DerivativeParameter::Bias => (None, None),
        };

        let mut partials = DMatrix::zeros(size, parameter.size(self.msr_type()));
        for (row, (wrt_pos, wrt_vel)) in gradients.iter().enumerate() {
            let wrt_pos = sign * dcm.transpose() * wrt_pos;
            let wrt_vel = sign * dcm.transpose() * wrt_vel;
            for i in 0..3 {
                if let Some(col) = pos_col {
                    partials[(row, col + i)] = wrt_pos[i];
                }
                if let Some(col) = vel_col {
                    partials[(row, col + i)] = wrt_vel[i];
                }
            }
        }
        Ok(partials)
    }

    /// Evaluates this observable at the provided epoch.
    fn evaluate(&mut self, epoch: Epoch, with_events: bool) -> Result<MeasurementData, ODError> {
        self.core().spacecraft_index()?;
        self.physical_mut().core.compute_geometry(epoch)?;
        let feasibility = self.check_feasibility(epoch, with_events)?;
        let value = if feasibility.is_feasible || !self.msr_type().is_angle() {
            self.compute_value(epoch)?
        } else {
            vec![0.0; self.msr_type().size()]
        };

        Ok(MeasurementData::new(
            self.msr_type(),
            self.core().participant_ids(),
            epoch,
            value,
            feasibility,
        ))
    }
}

/// The closed set of tracking data adapters.
#[derive(Clone, Debug)]
pub enum MeasurementModel {
    Range(Range),
    RangeRate(RangeRate),
    Azimuth(AzimuthElevation),
    Elevation(AzimuthElevation),
    AzEl(AzimuthElevation),
    RaDec(RaDec),
}

impl MeasurementModel {
    /// Builds the model of the provided type between both participants.
    pub fn new(
        msr_type: MeasurementType,
        participants: Vec<Participant>,
    ) -> Result<Self, ODError> {
        let physical = PhysicalMeasurement::new(CoreMeasurement::new(participants)?);
        Ok(match msr_type {
            MeasurementType::Range => Self::Range(Range::new(physical)),
            MeasurementType::RangeRate => Self::RangeRate(RangeRate::new(physical)),
            MeasurementType::Azimuth => {
                Self::Azimuth(AzimuthElevation::new(physical, MeasurementType::Azimuth))
            }
            MeasurementType::Elevation => {
                Self::Elevation(AzimuthElevation::new(physical, MeasurementType::Elevation))
            }
            MeasurementType::AzEl => {
                Self::AzEl(AzimuthElevation::new(physical, MeasurementType::AzEl))
            }
            MeasurementType::RaDec => Self::RaDec(RaDec::new(physical)),
        })
    }

    pub fn observable(&self) -> &dyn ObservableModel {
        match self {
            Self::Range(m) => m,
            Self::RangeRate(m) => m,
            Self::Azimuth(m) | Self::Elevation(m) | Self::AzEl(m) => m,
            Self::RaDec(m) => m,
        }
    }

    pub fn observable_mut(&mut self) -> &mut dyn ObservableModel {
        match self {
            Self::Range(m) => m,
            Self::RangeRate(m) => m,
            Self::Azimuth(m) | Self::Elevation(m) | Self::AzEl(m) => m,
            Self::RaDec(m) => m,
        }
    }

    pub fn msr_type(&self) -> MeasurementType {
        self.observable().msr_type()
    }

    pub fn participant_ids(&self) -> Vec<String> {
        self.observable().core().participant_ids()
    }

    /// Whether this model computes observations of the provided type between the provided participants, in any order
    pub fn matches(&self, msr_type: MeasurementType, participant_ids: &[String]) -> bool {
        let mut mine = self.participant_ids();
        let mut theirs = participant_ids.to_vec();
        mine.sort();
        theirs.sort();
        self.msr_type() == msr_type && mine == theirs
    }

    pub fn physical_mut(&mut self) -> &mut PhysicalMeasurement {
        self.observable_mut().physical_mut()
    }

    /// Replaces the participant with the same identifier, e.g. with an updated spacecraft state
    pub fn update_participant(&mut self, participant: &Participant) -> bool {
        self.physical_mut().core.update_participant(participant)
    }

    pub fn evaluate(&mut self, epoch: Epoch, with_events: bool) -> Result<MeasurementData, ODError> {
        self.observable_mut().evaluate(epoch, with_events)
    }

    pub fn compute_derivative(
        &mut self,
        epoch: Epoch,
        participant_index: usize,
        parameter: DerivativeParameter,
    ) -> Result<DMatrix<f64>, ODError> {
        self.observable_mut()
            .compute_derivative(epoch, participant_index, parameter)
    }
}

impl fmt::Display for MeasurementModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {:?}", self.msr_type(), self.participant_ids())
    }
}
