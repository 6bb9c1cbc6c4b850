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

use crate::od::msr::{EditTag, MeasurementType};
use std::collections::BTreeMap;
use std::fmt;

/// Number of observations per edit category.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EditCounts {
    pub unused: usize,
    pub out_of_range: usize,
    pub blocked: usize,
    pub initial_rms: usize,
    pub outer_loop: usize,
    pub inner_loop: usize,
    pub user: usize,
}

impl EditCounts {
    pub fn record(&mut self, tag: &EditTag) {
        match tag {
            EditTag::NotEdited => {}
            EditTag::Unused => self.unused += 1,
            EditTag::OutOfRange => self.out_of_range += 1,
            EditTag::Blocked(_) => self.blocked += 1,
            EditTag::InitialRMSSigmaEdit => self.initial_rms += 1,
            EditTag::OuterLoopSigmaEdit => self.outer_loop += 1,
            EditTag::InnerLoopSigmaEdit => self.inner_loop += 1,
            EditTag::UserEdit => self.user += 1,
        }
    }

    /// Count of the provided edit category, e.g. "B" or "OLSE"
    pub fn count(&self, category: &str) -> usize {
        match category {
            "U" => self.unused,
            "R" => self.out_of_range,
            "B" => self.blocked,
            "IRMS" => self.initial_rms,
            "OLSE" => self.outer_loop,
            "ILSE" => self.inner_loop,
            "USER" => self.user,
            _ => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.unused
            + self.out_of_range
            + self.blocked
            + self.initial_rms
            + self.outer_loop
            + self.inner_loop
            + self.user
    }
}

impl fmt::Display for EditCounts {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "U: {}  R: {}  B: {}  IRMS: {}  OLSE: {}  ILSE: {}  USER: {}",
            self.unused,
            self.out_of_range,
            self.blocked,
            self.initial_rms,
            self.outer_loop,
            self.inner_loop,
            self.user
        )
    }
}

/// Residual statistics of a set of observations. Only accepted residuals enter the sums.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResidualStatistics {
    /// Number of observations
    pub total: usize,
    /// Number of accepted observations
    pub accepted: usize,
    /// Number of accepted scalar residuals
    pub components: usize,
    pub sum: f64,
    pub sum_squares: f64,
    pub weighted_sum_squares: f64,
    pub edits: EditCounts,
}

impl ResidualStatistics {
    /// Records an observation, with its residuals and weights if it was accepted
    pub fn record(&mut self, tag: &EditTag, accepted: Option<(&[f64], &[f64])>) {
        self.total += 1;
        self.edits.record(tag);
        if let Some((residuals, weights)) = accepted {
            self.accepted += 1;
            for (r, w) in residuals.iter().zip(weights) {
                self.components += 1;
                self.sum += r;
                self.sum_squares += r * r;
                self.weighted_sum_squares += w * r * r;
            }
        }
    }

    pub fn mean(&self) -> Option<f64> {
        (self.components > 0).then(|| self.sum / self.components as f64)
    }

    /// Population standard deviation of the accepted residuals
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = self.sum_squares / self.components as f64 - mean * mean;
        Some(variance.max(0.0).sqrt())
    }

    pub fn rms(&self) -> Option<f64> {
        (self.components > 0).then(|| (self.sum_squares / self.components as f64).sqrt())
    }

    pub fn weighted_rms(&self) -> Option<f64> {
        (self.components > 0).then(|| (self.weighted_sum_squares / self.components as f64).sqrt())
    }
}

impl fmt::Display for ResidualStatistics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:>5} / {:<5}", self.accepted, self.total)?;
        match (self.mean(), self.std_dev(), self.weighted_rms()) {
            (Some(mean), Some(std_dev), Some(wrms)) => write!(
                f,
                " mean: {mean:.6e}  std dev: {std_dev:.6e}  weighted RMS: {wrms:.6e}"
            ),
            _ => write!(f, " no accepted residuals"),
        }
    }
}

/// Residual statistics of one iteration, by tracker and measurement type, and by measurement type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IterationStatistics {
    pub by_tracker: BTreeMap<(String, MeasurementType), ResidualStatistics>,
    pub by_type: BTreeMap<MeasurementType, ResidualStatistics>,
    pub overall: ResidualStatistics,
}

impl IterationStatistics {
    pub fn record(
        &mut self,
        tracker: &str,
        msr_type: MeasurementType,
        tag: &EditTag,
        accepted: Option<(&[f64], &[f64])>,
    ) {
        self.by_tracker
            .entry((tracker.to_string(), msr_type))
            .or_default()
            .record(tag, accepted);
        self.by_type
            .entry(msr_type)
            .or_default()
            .record(tag, accepted);
        self.overall.record(tag, accepted);
    }

    pub fn edits(&self) -> &EditCounts {
        &self.overall.edits
    }
}

impl fmt::Display for IterationStatistics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for ((tracker, msr_type), stats) in &self.by_tracker {
            writeln!(f, "{tracker:<12} {msr_type:<10} {stats}")?;
        }
        for (msr_type, stats) in &self.by_type {
            writeln!(f, "{:<12} {msr_type:<10} {stats}", "all")?;
        }
        write!(f, "edits: {}", self.overall.edits)
    }
}

#[cfg(test)]
mod ut_statistics {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn per_tracker_and_type() {
        let mut stats = IterationStatistics::default();
        stats.record(
            "DSS-65",
            MeasurementType::Range,
            &EditTag::NotEdited,
            Some((&[1.0][..], &[4.0][..])),
        );
        stats.record(
            "DSS-65",
            MeasurementType::Range,
            &EditTag::NotEdited,
            Some((&[-3.0][..], &[1.0][..])),
        );
        stats.record(
            "DSS-65",
            MeasurementType::Range,
            &EditTag::Blocked("B1".to_string()),
            None,
        );
        stats.record(
            "DSS-34",
            MeasurementType::AzEl,
            &EditTag::OuterLoopSigmaEdit,
            None,
        );

        let range = &stats.by_tracker[&("DSS-65".to_string(), MeasurementType::Range)];
        assert_eq!(range.total, 3);
        assert_eq!(range.accepted, 2);
        assert_abs_diff_eq!(range.mean().unwrap(), -1.0);
        assert_abs_diff_eq!(range.std_dev().unwrap(), 2.0);
        assert_abs_diff_eq!(range.weighted_rms().unwrap(), (13.0_f64 / 2.0).sqrt());
        assert_eq!(range.edits.count("B"), 1);

        assert_eq!(stats.by_type[&MeasurementType::AzEl].accepted, 0);
        assert!(stats.by_type[&MeasurementType::AzEl].mean().is_none());
        assert_eq!(stats.edits().count("OLSE"), 1);
        assert_eq!(stats.edits().total(), 2);
        assert_eq!(stats.overall.total, 4);
    }
}
