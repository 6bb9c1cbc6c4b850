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

mod types;
pub use types::{MeasurementType, Periodicity};

mod observation;
pub use observation::{EditTag, Observation};

mod measurement;
pub use measurement::{Feasibility, MeasurementData, FEASIBLE_REASON};

mod participant;
pub use participant::Participant;

mod geometry;
pub use geometry::{elevation_angle, wrap_degrees, Geometry};

mod core_msr;
pub use core_msr::{
    line_of_sight_clear, CoreMeasurement, BLOCKED_BY_CENTRAL_BODY, BLOCKED_BY_ELEVATION,
};

/// Troposphere and ionosphere signal corrections.
pub mod corrections;

mod physical;
pub use physical::{FrequencyBand, PhysicalMeasurement, DEFAULT_FREQUENCY_HZ};

/// The tracking data adapters: one measurement model per observable type.
pub mod adapters;
pub use adapters::{DerivativeParameter, MeasurementModel, ObservableModel};

pub mod trackingdata;
pub use trackingdata::TrackingDataArc;
