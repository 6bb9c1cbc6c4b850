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

use super::corrections::{
    HopfieldSaastamoinen, MediaCorrection, MediaCorrectionOutput, MediaInput, MediaKind,
    HOPFIELD_SAASTAMOINEN, IRI2007, NO_CORRECTION,
};
use super::CoreMeasurement;
use crate::cosmic::rotation::body_fixed_to_inertial;
use crate::linalg::Vector3;
use crate::od::{GroundStation, MeasurementSnafu, ODError};
use crate::time::Epoch;
use snafu::ensure;
use std::fmt;
use std::sync::Arc;

/// Default carrier frequency, in Hz
pub const DEFAULT_FREQUENCY_HZ: f64 = 2.3e9;

/// Frequency band of the carrier signal
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrequencyBand {
    S = 1,
    X = 2,
}

impl fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::S => write!(f, "S-band"),
            Self::X => write!(f, "X-band"),
        }
    }
}

/// A measurement of a physical signal: the core bookkeeping plus a carrier frequency and optional media corrections.
#[derive(Clone, Debug)]
pub struct PhysicalMeasurement {
    pub core: CoreMeasurement,
    frequency_hz: f64,
    corrections: Vec<Arc<dyn MediaCorrection>>,
    troposphere_warned: bool,
    ionosphere_warned: bool,
}

impl PhysicalMeasurement {
    pub fn new(core: CoreMeasurement) -> Self {
        Self {
            core,
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            corrections: Vec::new(),
            troposphere_warned: false,
            ionosphere_warned: false,
        }
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    pub fn set_frequency(&mut self, frequency_hz: f64) -> Result<(), ODError> {
        ensure!(
            frequency_hz > 0.0,
            MeasurementSnafu {
                details: format!("Frequency was set to a non-positive value ({frequency_hz} Hz)")
            }
        );
        self.frequency_hz = frequency_hz;
        Ok(())
    }

    /// Returns the frequency band of the carrier
    pub fn frequency_band(&self) -> Result<FrequencyBand, ODError> {
        let freq = self.frequency_hz;
        if (2.0e9..=4.0e9).contains(&freq) {
            Ok(FrequencyBand::S)
        } else if (7.0e9..=8.4e9).contains(&freq) {
            Ok(FrequencyBand::X)
        } else {
            Err(ODError::Measurement {
                details: format!("no frequency band is defined for {freq} Hz"),
            })
        }
    }

    /// Enables the media correction of the provided name.
    pub fn add_correction(&mut self, name: &str) -> Result<(), ODError> {
        match name {
            HOPFIELD_SAASTAMOINEN => {
                self.add_correction_model(Arc::new(HopfieldSaastamoinen::default()));
                Ok(())
            }
            IRI2007 => Err(ODError::UnavailableCapability {
                capability: format!("Ionosphere {IRI2007} model"),
            }),
            NO_CORRECTION => Ok(()),
            other => Err(ODError::config(format!(
                "unknown media correction {other}: supported models are {HOPFIELD_SAASTAMOINEN} and {IRI2007}"
            ))),
        }
    }

    /// Adds a correction model, replacing any enabled model of the same media.
    pub fn add_correction_model(&mut self, model: Arc<dyn MediaCorrection>) {
        self.corrections.retain(|m| m.kind() != model.kind());
        self.corrections.push(model);
    }

    pub fn corrections(&self) -> &[Arc<dyn MediaCorrection>] {
        &self.corrections
    }

    pub fn has_corrections(&self) -> bool {
        !self.corrections.is_empty()
    }

    /// Computes the sum of the enabled media corrections of the signal path between the provided station and spacecraft
    /// inertial positions. Below the elevation mask of the station, there is no correction.
    pub fn calculate_media_correction(
        &mut self,
        frequency_hz: f64,
        station: &GroundStation,
        station_pos_km: &Vector3<f64>,
        spacecraft_pos_km: &Vector3<f64>,
        epoch: Epoch,
    ) -> Result<MediaCorrectionOutput, ODError> {
        let mut total = MediaCorrectionOutput::default();
        if self.corrections.is_empty() {
            return Ok(total);
        }

        let range_vec = spacecraft_pos_km - station_pos_km;
        let range_km = range_vec.norm();
        let (dcm, _) = body_fixed_to_inertial(epoch);
        let rho_sez = station.sez_dcm() * dcm.transpose() * range_vec;
        let elevation_rad = rho_sez.z.atan2(rho_sez.x.hypot(rho_sez.y));

        if elevation_rad <= station.elevation_mask_deg.to_radians() {
            return Ok(total);
        }

        let input = MediaInput {
            epoch,
            frequency_mhz: frequency_hz * 1e-6,
            elevation_rad,
            range_m: range_km * 1e3,
            temperature_k: station.temperature_k,
            pressure_hpa: station.pressure_hpa,
            humidity_pct: station.humidity_pct,
        };

        for model in &self.corrections {
            let out = model.correction(&input)?;
            let (lower, upper) = model.kind().expected_range_m();
            if out.range_m < lower || out.range_m > upper {
                let warned = match model.kind() {
                    MediaKind::Troposphere => &mut self.troposphere_warned,
                    MediaKind::Ionosphere => &mut self.ionosphere_warned,
                };
                if !*warned {
                    warn!(
                        "{} correction of {:.3} m outside of [{lower}, {upper}] m for {} at {epoch}",
                        model.name(),
                        out.range_m,
                        station.id
                    );
                    *warned = true;
                }
            }
            total += out;
        }

        Ok(total)
    }

    /// Media correction of the signal path at the provided epoch, zero without a ground station.
    pub fn media_correction(&mut self, epoch: Epoch) -> Result<MediaCorrectionOutput, ODError> {
        if self.corrections.is_empty() {
            return Ok(MediaCorrectionOutput::default());
        }
        let Some(gs_index) = self
            .core
            .participants()
            .iter()
            .position(|p| p.is_ground_station())
        else {
            return Ok(MediaCorrectionOutput::default());
        };
        let sc_index = self.core.spacecraft_index()?;

        let geom = *self.core.compute_geometry(epoch)?;
        match self.core.participants()[gs_index].as_ground_station().cloned() {
            Some(station) => self.calculate_media_correction(
                self.frequency_hz,
                &station,
                &geom.positions[gs_index],
                &geom.positions[sc_index],
                epoch,
            ),
            None => Ok(MediaCorrectionOutput::default()),
        }
    }
}
