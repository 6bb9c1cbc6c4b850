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

use super::InversionAlgorithm;
use crate::io::ConfigRepr;
use crate::od::ODError;
use enum_iterator::Sequence;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use typed_builder::TypedBuilder;

/// Configuration of the batch least squares estimator.
///
/// Every setter validates its value: invalid values are rejected, never clamped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
#[serde(default)]
pub struct BatchConfig {
    /// Converged when the weighted RMS of the residuals is below this tolerance
    #[builder(default = 1e-3)]
    pub absolute_tol: f64,
    /// Converged when the predicted RMS is within this fraction of the best RMS
    #[builder(default = 1e-4)]
    pub relative_tol: f64,
    /// Include the apriori covariance of the estimation state in the normal equations
    #[builder(default = false)]
    pub use_initial_covariance: bool,
    #[builder(default)]
    pub inversion_algorithm: InversionAlgorithm,
    /// Number of consecutive iterations with an increasing RMS before declaring divergence
    #[builder(default = 3)]
    pub max_consecutive_divergences: usize,
    /// When diverging, the best RMS is reset to the RMS of the diverging iteration
    #[builder(default = false)]
    pub reset_best_rms_if_diverging: bool,
    /// Freeze the sigma edits from `freeze_iteration` on
    #[builder(default = false)]
    pub freeze_measurement_editing: bool,
    #[builder(default = 4)]
    pub freeze_iteration: usize,
    #[builder(default = 15)]
    pub maximum_iterations: usize,
    /// Maximum weighted residual accepted at the first iteration
    #[builder(default = 3000.0)]
    pub olse_initial_rms_sigma: f64,
    #[builder(default = 3.0)]
    pub olse_multiplicative_constant: f64,
    #[builder(default = 0.0)]
    pub olse_additive_constant: f64,
    /// Use the predicted RMS instead of the previous RMS as the outer loop sigma
    #[builder(default = false)]
    pub use_rmsp: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConfigRepr for BatchConfig {}

impl BatchConfig {
    /// Validates all of the fields
    pub fn validate(&self) -> Result<(), ODError> {
        check_absolute_tol(self.absolute_tol)?;
        check_relative_tol(self.relative_tol)?;
        check_max_consecutive_divergences(self.max_consecutive_divergences as i64)?;
        check_at_least_one(BatchParameter::FreezeIteration, self.freeze_iteration as i64)?;
        check_at_least_one(BatchParameter::MaximumIterations, self.maximum_iterations as i64)?;
        check_positive(BatchParameter::OLSEInitialRMSSigma, self.olse_initial_rms_sigma)?;
        check_positive(
            BatchParameter::OLSEMultiplicativeConstant,
            self.olse_multiplicative_constant,
        )?;
        check_non_negative(BatchParameter::OLSEAdditiveConstant, self.olse_additive_constant)?;
        Ok(())
    }

    pub fn set_absolute_tol(&mut self, value: f64) -> Result<(), ODError> {
        self.absolute_tol = check_absolute_tol(value)?;
        Ok(())
    }

    pub fn set_relative_tol(&mut self, value: f64) -> Result<(), ODError> {
        self.relative_tol = check_relative_tol(value)?;
        Ok(())
    }

    pub fn set_max_consecutive_divergences(&mut self, value: i64) -> Result<(), ODError> {
        self.max_consecutive_divergences = check_max_consecutive_divergences(value)?;
        Ok(())
    }

    pub fn set_freeze_iteration(&mut self, value: i64) -> Result<(), ODError> {
        self.freeze_iteration = check_at_least_one(BatchParameter::FreezeIteration, value)?;
        Ok(())
    }

    pub fn set_maximum_iterations(&mut self, value: i64) -> Result<(), ODError> {
        self.maximum_iterations = check_at_least_one(BatchParameter::MaximumIterations, value)?;
        Ok(())
    }

    /// Returns the value of a real parameter by name
    pub fn get_real_parameter(&self, name: &str) -> Result<f64, ODError> {
        match BatchParameter::lookup(name, ParameterKind::Real)? {
            BatchParameter::AbsoluteTol => Ok(self.absolute_tol),
            BatchParameter::RelativeTol => Ok(self.relative_tol),
            BatchParameter::OLSEInitialRMSSigma => Ok(self.olse_initial_rms_sigma),
            BatchParameter::OLSEMultiplicativeConstant => Ok(self.olse_multiplicative_constant),
            BatchParameter::OLSEAdditiveConstant => Ok(self.olse_additive_constant),
            other => Err(other.wrong_kind(ParameterKind::Real)),
        }
    }

    /// Sets a real parameter by name
    pub fn set_real_parameter(&mut self, name: &str, value: f64) -> Result<(), ODError> {
        match BatchParameter::lookup(name, ParameterKind::Real)? {
            BatchParameter::AbsoluteTol => self.set_absolute_tol(value),
            BatchParameter::RelativeTol => self.set_relative_tol(value),
            BatchParameter::OLSEInitialRMSSigma => {
                self.olse_initial_rms_sigma = check_positive(BatchParameter::OLSEInitialRMSSigma, value)?;
                Ok(())
            }
            BatchParameter::OLSEMultiplicativeConstant => {
                self.olse_multiplicative_constant =
                    check_positive(BatchParameter::OLSEMultiplicativeConstant, value)?;
                Ok(())
            }
            BatchParameter::OLSEAdditiveConstant => {
                self.olse_additive_constant =
                    check_non_negative(BatchParameter::OLSEAdditiveConstant, value)?;
                Ok(())
            }
            other => Err(other.wrong_kind(ParameterKind::Real)),
        }
    }

    /// Returns the value of an integer parameter by name
    pub fn get_integer_parameter(&self, name: &str) -> Result<i64, ODError> {
        match BatchParameter::lookup(name, ParameterKind::Integer)? {
            BatchParameter::MaxConsecutiveDivergences => Ok(self.max_consecutive_divergences as i64),
            BatchParameter::FreezeIteration => Ok(self.freeze_iteration as i64),
            BatchParameter::MaximumIterations => Ok(self.maximum_iterations as i64),
            other => Err(other.wrong_kind(ParameterKind::Integer)),
        }
    }

    /// Sets an integer parameter by name
    pub fn set_integer_parameter(&mut self, name: &str, value: i64) -> Result<(), ODError> {
        match BatchParameter::lookup(name, ParameterKind::Integer)? {
            BatchParameter::MaxConsecutiveDivergences => self.set_max_consecutive_divergences(value),
            BatchParameter::FreezeIteration => self.set_freeze_iteration(value),
            BatchParameter::MaximumIterations => self.set_maximum_iterations(value),
            other => Err(other.wrong_kind(ParameterKind::Integer)),
        }
    }

    /// Returns the value of a boolean parameter by name
    pub fn get_boolean_parameter(&self, name: &str) -> Result<bool, ODError> {
        match BatchParameter::lookup(name, ParameterKind::Boolean)? {
            BatchParameter::UseInitialCovariance => Ok(self.use_initial_covariance),
            BatchParameter::ResetBestRMSIfDiverging => Ok(self.reset_best_rms_if_diverging),
            BatchParameter::FreezeMeasurementEditing => Ok(self.freeze_measurement_editing),
            BatchParameter::UseRMSP => Ok(self.use_rmsp),
            other => Err(other.wrong_kind(ParameterKind::Boolean)),
        }
    }

    /// Sets a boolean parameter by name
    pub fn set_boolean_parameter(&mut self, name: &str, value: bool) -> Result<(), ODError> {
        let field = match BatchParameter::lookup(name, ParameterKind::Boolean)? {
            BatchParameter::UseInitialCovariance => &mut self.use_initial_covariance,
            BatchParameter::ResetBestRMSIfDiverging => &mut self.reset_best_rms_if_diverging,
            BatchParameter::FreezeMeasurementEditing => &mut self.freeze_measurement_editing,
            BatchParameter::UseRMSP => &mut self.use_rmsp,
            other => return Err(other.wrong_kind(ParameterKind::Boolean)),
        };
        *field = value;
        Ok(())
    }

    /// Returns the value of a string parameter by name. The convergence status belongs to the estimator.
    pub fn get_string_parameter(&self, name: &str) -> Result<String, ODError> {
        match BatchParameter::lookup(name, ParameterKind::String)? {
            BatchParameter::InversionAlgorithm => Ok(self.inversion_algorithm.to_string()),
            other => Err(ODError::config(format!(
                "{other} is reported by the estimator, not by its configuration"
            ))),
        }
    }

    /// Sets a string parameter by name
    pub fn set_string_parameter(&mut self, name: &str, value: &str) -> Result<(), ODError> {
        let param = BatchParameter::lookup(name, ParameterKind::String)?;
        if param.is_read_only() {
            return Err(ODError::config(format!("{param} is a read-only parameter")));
        }
        self.inversion_algorithm = InversionAlgorithm::from_str(value)?;
        Ok(())
    }
}

fn check_absolute_tol(value: f64) -> Result<f64, ODError> {
    check_positive(BatchParameter::AbsoluteTol, value)
}

fn check_relative_tol(value: f64) -> Result<f64, ODError> {
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(ODError::config(format!(
            "RelativeTol has invalid value ({value}). It has to be a real number in (0, 1]."
        )))
    }
}

fn check_max_consecutive_divergences(value: i64) -> Result<usize, ODError> {
    if value < 1 {
        Err(ODError::config(format!(
            "MaxConsecutiveDivergences has invalid value ({value}). It has to be a positive integer greater than 0."
        )))
    } else {
        Ok(value as usize)
    }
}

fn check_at_least_one(param: BatchParameter, value: i64) -> Result<usize, ODError> {
    if value < 1 {
        Err(ODError::config(format!(
            "{param} has invalid value ({value}). It has to be a positive integer greater than 0."
        )))
    } else {
        Ok(value as usize)
    }
}

fn check_positive(param: BatchParameter, value: f64) -> Result<f64, ODError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ODError::config(format!(
            "{param} has invalid value ({value}). It has to be a positive real number."
        )))
    }
}

fn check_non_negative(param: BatchParameter, value: f64) -> Result<f64, ODError> {
    if value >= 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ODError::config(format!(
            "{param} has invalid value ({value}). It has to be a non-negative real number."
        )))
    }
}

/// Type of the value of a named parameter
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    Real,
    Integer,
    Boolean,
    String,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Real => "real",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::String => "string",
        };
        write!(f, "{name}")
    }
}

/// Registry of the named parameters of the batch estimator, used by script-like interfaces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Sequence)]
pub enum BatchParameter {
    AbsoluteTol,
    RelativeTol,
    UseInitialCovariance,
    InversionAlgorithm,
    MaxConsecutiveDivergences,
    ResetBestRMSIfDiverging,
    FreezeMeasurementEditing,
    FreezeIteration,
    ConvergentStatus,
    MaximumIterations,
    OLSEInitialRMSSigma,
    OLSEMultiplicativeConstant,
    OLSEAdditiveConstant,
    UseRMSP,
}

impl BatchParameter {
    pub fn name(self) -> &'static str {
        match self {
            Self::AbsoluteTol => "AbsoluteTol",
            Self::RelativeTol => "RelativeTol",
            Self::UseInitialCovariance => "UseInitialCovariance",
            Self::InversionAlgorithm => "InversionAlgorithm",
            Self::MaxConsecutiveDivergences => "MaxConsecutiveDivergences",
            Self::ResetBestRMSIfDiverging => "ResetBestRMSIfDiverging",
            Self::FreezeMeasurementEditing => "FreezeMeasurementEditing",
            Self::FreezeIteration => "FreezeIteration",
            Self::ConvergentStatus => "ConvergentStatus",
            Self::MaximumIterations => "MaximumIterations",
            Self::OLSEInitialRMSSigma => "OLSEInitialRMSSigma",
            Self::OLSEMultiplicativeConstant => "OLSEMultiplicativeConstant",
            Self::OLSEAdditiveConstant => "OLSEAdditiveConstant",
            Self::UseRMSP => "UseRMSP",
        }
    }

    pub fn kind(self) -> ParameterKind {
        match self {
            Self::AbsoluteTol
            | Self::RelativeTol
            | Self::OLSEInitialRMSSigma
            | Self::OLSEMultiplicativeConstant
            | Self::OLSEAdditiveConstant => ParameterKind::Real,
            Self::MaxConsecutiveDivergences | Self::FreezeIteration | Self::MaximumIterations => {
                ParameterKind::Integer
            }
            Self::UseInitialCovariance
            | Self::ResetBestRMSIfDiverging
            | Self::FreezeMeasurementEditing
            | Self::UseRMSP => ParameterKind::Boolean,
            Self::InversionAlgorithm | Self::ConvergentStatus => ParameterKind::String,
        }
    }

    pub fn is_read_only(self) -> bool {
        self == Self::ConvergentStatus
    }

    /// Finds the parameter of that name and checks that it is of the expected kind
    pub fn lookup(name: &str, kind: ParameterKind) -> Result<Self, ODError> {
        let param = Self::from_str(name)?;
        if param.kind() == kind {
            Ok(param)
        } else {
            Err(param.wrong_kind(kind))
        }
    }

    fn wrong_kind(self, kind: ParameterKind) -> ODError {
        ODError::config(format!(
            "{self} is a {} parameter, not a {kind} parameter",
            self.kind()
        ))
    }
}

impl FromStr for BatchParameter {
    type Err = ODError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        enum_iterator::all::<Self>()
            .find(|param| param.name() == s)
            .ok_or_else(|| ODError::config(format!("unknown batch estimator parameter {s}")))
    }
}

impl fmt::Display for BatchParameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod ut_conf {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = BatchConfig::default();
        assert_eq!(cfg.absolute_tol, 1e-3);
        assert_eq!(cfg.relative_tol, 1e-4);
        assert_eq!(cfg.max_consecutive_divergences, 3);
        assert_eq!(cfg.freeze_iteration, 4);
        assert_eq!(cfg.maximum_iterations, 15);
        assert_eq!(cfg.olse_initial_rms_sigma, 3000.0);
        assert_eq!(cfg.olse_multiplicative_constant, 3.0);
        assert_eq!(cfg.olse_additive_constant, 0.0);
        assert_eq!(cfg.inversion_algorithm, InversionAlgorithm::Internal);
        assert!(!cfg.use_initial_covariance);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn max_consecutive_divergences() {
        let mut cfg = BatchConfig::default();
        let err = cfg
            .set_integer_parameter("MaxConsecutiveDivergences", 0)
            .unwrap_err();
        assert!(err.to_string().contains(
            "MaxConsecutiveDivergences has invalid value (0). It has to be a positive integer greater than 0."
        ));
        // Never clamped
        assert_eq!(cfg.max_consecutive_divergences, 3);

        cfg.set_integer_parameter("MaxConsecutiveDivergences", 5)
            .unwrap();
        assert_eq!(
            cfg.get_integer_parameter("MaxConsecutiveDivergences")
                .unwrap(),
            5
        );
        cfg.set_integer_parameter("MaxConsecutiveDivergences", 3)
            .unwrap();
        assert_eq!(
            cfg.get_integer_parameter("MaxConsecutiveDivergences")
                .unwrap(),
            3
        );
    }

    #[test]
    fn tolerances() {
        let mut cfg = BatchConfig::default();
        assert!(cfg.set_absolute_tol(0.0).is_err());
        assert!(cfg.set_absolute_tol(-1.0).is_err());
        assert!(cfg.set_relative_tol(0.0).is_err());
        assert!(cfg.set_relative_tol(1.5).is_err());
        cfg.set_relative_tol(1.0).unwrap();
        cfg.set_real_parameter("AbsoluteTol", 1e-6).unwrap();
        assert_eq!(cfg.get_real_parameter("AbsoluteTol").unwrap(), 1e-6);
        assert!(cfg.set_freeze_iteration(0).is_err());
        assert!(cfg.set_real_parameter("OLSEAdditiveConstant", -1.0).is_err());
    }

    #[test]
    fn registry() {
        let mut cfg = BatchConfig::default();
        assert_eq!(enum_iterator::all::<BatchParameter>().count(), 14);
        assert_eq!(
            "ConvergentStatus".parse::<BatchParameter>().unwrap(),
            BatchParameter::ConvergentStatus
        );
        assert!("Bogus".parse::<BatchParameter>().is_err());

        // Kinds are checked
        assert!(cfg.get_real_parameter("MaximumIterations").is_err());
        assert!(cfg.set_boolean_parameter("AbsoluteTol", true).is_err());

        cfg.set_boolean_parameter("FreezeMeasurementEditing", true)
            .unwrap();
        assert!(cfg.freeze_measurement_editing);
        cfg.set_string_parameter("InversionAlgorithm", "Cholesky")
            .unwrap();
        assert_eq!(cfg.inversion_algorithm, InversionAlgorithm::Cholesky);
        assert!(cfg
            .set_string_parameter("InversionAlgorithm", "LU")
            .is_err());
        assert!(cfg
            .set_string_parameter("ConvergentStatus", "Converging")
            .is_err());
    }

    #[test]
    fn yaml() {
        let cfg = BatchConfig::loads(
            "absolute_tol: 1.0e-6\nuse_initial_covariance: true\ninversion_algorithm: Schur\n",
        )
        .unwrap();
        assert_eq!(cfg.absolute_tol, 1e-6);
        assert!(cfg.use_initial_covariance);
        assert_eq!(cfg.inversion_algorithm, InversionAlgorithm::Schur);
        // Unspecified fields keep their defaults
        assert_eq!(cfg.maximum_iterations, 15);
    }
}
