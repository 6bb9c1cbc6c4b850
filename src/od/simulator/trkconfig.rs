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

use crate::io::{duration_from_str, duration_to_str, ConfigRepr};
use crate::od::ODError;
use crate::time::{Duration, TimeUnits};
use serde_derive::{Deserialize, Serialize};

/// Stores a tracking configuration, there is one per measurement model of the simulator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrkConfig {
    #[serde(
        serialize_with = "duration_to_str",
        deserialize_with = "duration_from_str"
    )]
    pub sampling: Duration,
    /// Standard deviation of the Gaussian noise of each component, in the unit of the measurement. Zero or empty
    /// means noise free.
    #[serde(default)]
    pub noise_sigma: Vec<f64>,
}

impl TrkConfig {
    /// Noise free measurements at the provided sampling
    pub fn noise_free(sampling: Duration) -> Self {
        Self {
            sampling,
            noise_sigma: Vec::new(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ODError> {
        if self.sampling <= Duration::ZERO {
            return Err(ODError::config(format!(
                "tracking sampling must be strictly positive, got {}",
                self.sampling
            )));
        }
        if let Some(sigma) = self.noise_sigma.iter().find(|s| !s.is_finite() || **s < 0.0) {
            return Err(ODError::config(format!(
                "tracking noise must be finite and non negative, got {sigma}"
            )));
        }
        Ok(())
    }
}

impl Default for TrkConfig {
    /// The default configuration is to generate a noise free measurement every minute
    fn default() -> Self {
        Self::noise_free(1.minutes())
    }
}

impl ConfigRepr for TrkConfig {}

#[test]
fn serde_trkconfig() {
    let cfg = TrkConfig::default();
    let serialized = serde_yaml::to_string(&cfg).unwrap();
    let deserd: TrkConfig = serde_yaml::from_str(&serialized).unwrap();
    assert_eq!(deserd, cfg);

    let cfg = TrkConfig::loads("sampling: 45 s\nnoise_sigma: [1.0e-3]").unwrap();
    assert_eq!(cfg.sampling, 45.seconds());
    assert_eq!(cfg.noise_sigma, vec![1e-3]);
    assert!(cfg.validate().is_ok());

    assert!(TrkConfig::noise_free(0.seconds()).validate().is_err());
}
