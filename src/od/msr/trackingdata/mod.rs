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

use super::{MeasurementType, Observation};
use crate::io::ConfigRepr;
use hifitime::prelude::{Duration, Epoch};
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::ops::RangeBounds;

/// Tracking data storing all of the observations of an arc, sorted by epoch.
/// Several trackers may observe at the same epoch, in which case their insertion order is kept.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TrackingDataArc {
    /// All observations in this data arc
    pub observations: Vec<Observation>,
    /// Source file if loaded from a file or saved to a file.
    #[serde(default)]
    pub source: Option<String>,
}

impl TrackingDataArc {
    pub fn new(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|obs| obs.epoch);
        Self {
            observations,
            source: None,
        }
    }

    /// Inserts an observation after all of the observations at or before its epoch
    pub fn push(&mut self, observation: Observation) {
        let idx = self
            .observations
            .partition_point(|obs| obs.epoch <= observation.epoch);
        self.observations.insert(idx, observation);
    }

    /// Returns the unique list of trackers in this tracking data arc
    pub fn unique_trackers(&self) -> BTreeSet<String> {
        self.unique().0
    }

    /// Returns the unique measurement types in this tracking data arc
    pub fn unique_types(&self) -> BTreeSet<MeasurementType> {
        self.unique().1
    }

    /// Returns the unique trackers and unique measurement types in this data arc
    pub fn unique(&self) -> (BTreeSet<String>, BTreeSet<MeasurementType>) {
        let mut trackers = BTreeSet::new();
        let mut types = BTreeSet::new();
        for obs in &self.observations {
            trackers.insert(obs.tracker().to_string());
            types.insert(obs.msr_type);
        }
        (trackers, types)
    }

    /// Returns the start epoch of this tracking arc
    pub fn start_epoch(&self) -> Option<Epoch> {
        self.observations.first().map(|obs| obs.epoch)
    }

    /// Returns the end epoch of this tracking arc
    pub fn end_epoch(&self) -> Option<Epoch> {
        self.observations.last().map(|obs| obs.epoch)
    }

    /// Returns the number of observations in this data arc
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Returns whether this arc has no observations.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Returns the minimum non-zero duration between two subsequent observations.
    pub fn min_duration_sep(&self) -> Option<Duration> {
        self.observations
            .windows(2)
            .map(|pair| pair[1].epoch - pair[0].epoch)
            .filter(|sep| *sep > Duration::ZERO)
            .min()
    }

    /// Returns a new tracking arc that only contains observations that fall within the given epoch range.
    pub fn filter_by_epoch<R: RangeBounds<Epoch>>(mut self, bound: R) -> Self {
        self.observations.retain(|obs| bound.contains(&obs.epoch));
        self
    }

    /// Returns a new tracking arc that only contains observations that fall within the given offset from the first epoch
    pub fn filter_by_offset<R: RangeBounds<Duration>>(self, bound: R) -> Self {
        let (Some(first), Some(last)) = (self.start_epoch(), self.end_epoch()) else {
            return self;
        };
        let start = match bound.start_bound() {
            Unbounded => Unbounded,
            Included(offset) => Included(first + *offset),
            Excluded(offset) => Excluded(first + *offset),
        };
        let end = match bound.end_bound() {
            Unbounded => Included(last),
            Included(offset) => Included(first + *offset),
            Excluded(offset) => Excluded(first + *offset),
        };
        self.filter_by_epoch((start, end))
    }

    /// Returns a new tracking arc that only contains observations from the desired tracker.
    pub fn filter_by_tracker(mut self, tracker: &str) -> Self {
        self.observations.retain(|obs| obs.tracker() == tracker);
        self
    }

    /// Returns a new tracking arc that only contains observations of the desired type.
    pub fn filter_by_type(mut self, msr_type: MeasurementType) -> Self {
        self.observations.retain(|obs| obs.msr_type == msr_type);
        self
    }
}

impl ConfigRepr for TrackingDataArc {}

impl fmt::Display for TrackingDataArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start_epoch(), self.end_epoch()) {
            (Some(start), Some(end)) => {
                let src = match &self.source {
                    Some(src) => format!(" (source: {src})"),
                    None => String::new(),
                };
                write!(
                    f,
                    "Tracking arc with {} observations of type {:?} over {} (from {start} to {end}) with trackers {:?}{src}",
                    self.len(),
                    self.unique_types(),
                    end - start,
                    self.unique_trackers()
                )
            }
            _ => write!(f, "Empty tracking arc"),
        }
    }
}

impl fmt::Debug for TrackingDataArc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self} @ {self:p}")
    }
}

impl PartialEq for TrackingDataArc {
    fn eq(&self, other: &Self) -> bool {
        self.observations == other.observations
    }
}

#[cfg(test)]
mod ut_tracking_arc {
    use super::*;
    use hifitime::TimeUnits;

    fn obs(epoch: Epoch, tracker: &str, msr_type: MeasurementType) -> Observation {
        Observation::new(
            epoch,
            msr_type,
            vec![tracker.to_string(), "SC".to_string()],
            vec![1.0; msr_type.size()],
            vec![],
        )
    }

    #[test]
    fn sorted_and_filtered() {
        let start = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let mut arc = TrackingDataArc::new(vec![
            obs(start + 2.minutes(), "A", MeasurementType::Range),
            obs(start, "B", MeasurementType::AzEl),
            obs(start + 1.minutes(), "A", MeasurementType::Range),
        ]);
        arc.push(obs(start + 1.minutes(), "B", MeasurementType::RangeRate));

        assert_eq!(arc.len(), 4);
        assert_eq!(arc.start_epoch(), Some(start));
        assert_eq!(arc.end_epoch(), Some(start + 2.minutes()));
        assert_eq!(arc.observations[2].tracker(), "B");
        assert_eq!(arc.min_duration_sep(), Some(1.minutes()));
        assert_eq!(arc.unique_trackers().len(), 2);
        assert_eq!(arc.unique_types().len(), 3);

        assert_eq!(arc.clone().filter_by_tracker("A").len(), 2);
        assert_eq!(
            arc.clone().filter_by_type(MeasurementType::Range).len(),
            2
        );
        assert_eq!(
            arc.clone()
                .filter_by_epoch(start + 30.seconds()..start + 2.minutes())
                .len(),
            2
        );
        assert_eq!(arc.clone().filter_by_offset(..1.minutes()).len(), 1);
        assert!(format!("{arc}").contains("4 observations"));
        assert_eq!(format!("{}", TrackingDataArc::default()), "Empty tracking arc");
    }

    #[test]
    fn yaml_round_trip() {
        let start = Epoch::from_gregorian_utc_at_midnight(2024, 1, 1);
        let arc = TrackingDataArc::new(vec![obs(start, "A", MeasurementType::Elevation)]);
        let yaml = serde_yaml::to_string(&arc).unwrap();
        let loaded = TrackingDataArc::loads(&yaml).unwrap();
        assert_eq!(loaded, arc);
    }
}
