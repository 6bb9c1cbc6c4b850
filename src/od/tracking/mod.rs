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

use crate::linalg::DMatrix;
use crate::od::estimate::{ElementKind, SolveForElement, SolveForObjects};
use crate::od::msr::{
    DerivativeParameter, MeasurementData, MeasurementModel, Observation, Participant,
    TrackingDataArc,
};
use crate::od::{GroundStation, MeasurementManager, ODError};
use crate::time::Epoch;

mod light_time;
pub use light_time::{LightTimeEvent, LIGHT_TIME_TOLERANCE_S, MAX_LIGHT_TIME_POLLS};

/// Processes the observations of a tracking arc, in order, with the measurement models matching each observation.
#[derive(Clone, Debug)]
pub struct TrackingArcManager {
    arc: TrackingDataArc,
    models: Vec<MeasurementModel>,
    cursor: usize,
    current_model: Option<usize>,
    measurement: Option<MeasurementData>,
    /// Bias added to the measurement being processed
    current_bias: Vec<f64>,
    light_time: bool,
    /// Light time events of the current measurement, and whether each was processed
    events: Vec<(LightTimeEvent, bool)>,
}

impl TrackingArcManager {
    pub fn new(arc: TrackingDataArc, models: Vec<MeasurementModel>) -> Self {
        Self {
            arc,
            models,
            cursor: 0,
            current_model: None,
            measurement: None,
            current_bias: Vec::new(),
            light_time: false,
            events: Vec::new(),
        }
    }

    /// Enables or disables the light time correction of the measurements computed with events
    pub fn with_light_time(mut self, enabled: bool) -> Self {
        self.light_time = enabled;
        self
    }

    pub fn arc(&self) -> &TrackingDataArc {
        &self.arc
    }

    pub fn observations(&self) -> &[Observation] {
        &self.arc.observations
    }

    /// Observations of the arc, e.g. to reweight them or to change their edit tags between two iterations
    pub fn observations_mut(&mut self) -> &mut [Observation] {
        &mut self.arc.observations
    }

    pub fn models_mut(&mut self) -> &mut [MeasurementModel] {
        &mut self.models
    }

    fn clear_current(&mut self) {
        self.current_model = None;
        self.measurement = None;
        self.current_bias.clear();
        self.events.clear();
    }

    fn add_bias(&self, msr: &mut MeasurementData) {
        for (value, bias) in msr.value.iter_mut().zip(&self.current_bias) {
            *value += bias;
        }
    }

    /// Builds the light time event of the measurement just computed by the provided model, if the signal is
    /// transmitted by a spacecraft.
    fn light_time_event(model: &MeasurementModel, epoch: Epoch) -> Result<Option<LightTimeEvent>, ODError> {
        let core = model.observable().core();
        let receiver_km = core.geometry()?.positions[0];
        Ok(core
            .participants()
            .get(1)
            .and_then(|p| p.as_spacecraft())
            .map(|sc| LightTimeEvent::new(epoch, receiver_km, sc.orbit)))
    }
}

impl MeasurementManager for TrackingArcManager {
    fn validate_duplicate_ground_station_ids(&self) -> Result<(), String> {
        let mut seen: Vec<&GroundStation> = Vec::new();
        for model in &self.models {
            for gs in model
                .observable()
                .core()
                .participants()
                .iter()
                .filter_map(|p| p.as_ground_station())
            {
                match seen.iter().find(|other| other.id == gs.id) {
                    Some(other) if *other != gs => return Err(gs.id.clone()),
                    Some(_) => {}
                    None => seen.push(gs),
                }
            }
        }
        Ok(())
    }

    fn load_ramp_tables(&mut self) -> Result<(), ODError> {
        debug!("no frequency ramp tables for {}", self.arc);
        Ok(())
    }

    fn reset(&mut self) {
        self.cursor = 0;
        self.clear_current();
    }

    fn epoch(&self) -> Option<Epoch> {
        self.arc.observations.get(self.cursor).map(|obs| obs.epoch)
    }

    fn advance_observation(&mut self) -> Option<Epoch> {
        self.cursor = (self.cursor + 1).min(self.arc.len());
        self.clear_current();
        self.epoch()
    }

    fn current_observation(&self) -> Option<&Observation> {
        self.arc.observations.get(self.cursor)
    }

    fn current_observation_mut(&mut self) -> Option<&mut Observation> {
        self.arc.observations.get_mut(self.cursor)
    }

    fn observation_count(&self) -> usize {
        self.arc.len()
    }

    fn calculate_measurements(
        &mut self,
        objects: &SolveForObjects,
        with_events: bool,
    ) -> Result<bool, ODError> {
        self.clear_current();

        let (msr_type, participant_ids, epoch, tracker) = match self.current_observation() {
            Some(obs) => (
                obs.msr_type,
                obs.participant_ids.clone(),
                obs.epoch,
                obs.tracker().to_string(),
            ),
            None => return Ok(false),
        };

        let Some(idx) = self
            .models
            .iter()
            .position(|m| m.matches(msr_type, &participant_ids))
        else {
            trace!("no model for {msr_type} {participant_ids:?} at {epoch}");
            return Ok(false);
        };

        let model = &mut self.models[idx];
        for sc in &objects.spacecraft {
            model.update_participant(&Participant::Spacecraft(sc.clone()));
        }

        let mut computed = model.evaluate(epoch, with_events)?;
        let event = if self.light_time && with_events && computed.is_feasible() {
            Self::light_time_event(model, epoch)?
        } else {
            None
        };

        self.current_bias = objects
            .bias_for(&tracker, msr_type)
            .map(|b| b.values.clone())
            .unwrap_or_default();
        self.add_bias(&mut computed);

        self.current_model = Some(idx);
        self.measurement = Some(computed);
        self.events = event.into_iter().map(|e| (e, false)).collect();
        Ok(true)
    }

    fn measurement(&self) -> Option<&MeasurementData> {
        self.measurement.as_ref()
    }

    fn event_count(&self) -> usize {
        self.events.len()
    }

    fn locate_event(&mut self, index: usize) -> Result<bool, ODError> {
        match self.events.get_mut(index) {
            Some((event, _)) => Ok(event.poll()),
            None => Err(ODError::InvalidState {
                action: format!("cannot locate event #{index}: the measurement has no such event"),
            }),
        }
    }

    fn process_event(&mut self, index: usize) -> Result<(), ODError> {
        let (event, processed) = match self.events.get(index) {
            Some((event, processed)) => (event.clone(), *processed),
            None => {
                return Err(ODError::InvalidState {
                    action: format!("cannot process event #{index}: the measurement has no such event"),
                })
            }
        };
        if processed {
            return Ok(());
        }
        if !event.is_located() {
            return Err(ODError::InvalidState {
                action: format!("cannot process {event} before it is located"),
            });
        }

        let (Some(idx), Some(previous)) = (self.current_model, self.measurement.take()) else {
            return Err(ODError::InvalidState {
                action: "cannot process an event without a computed measurement".to_string(),
            });
        };

        let model = &mut self.models[idx];
        let transmitter = model
            .observable()
            .core()
            .participants()
            .get(1)
            .and_then(|p| p.as_spacecraft())
            .map(|sc| sc.clone().with_orbit(event.transmitter_state()));
        if let Some(sc) = transmitter {
            model.update_participant(&Participant::Spacecraft(sc));
        }

        let mut computed = model.evaluate(previous.epoch, false)?;
        computed.feasibility = previous.feasibility;
        self.add_bias(&mut computed);
        debug!("{event}");

        self.measurement = Some(computed);
        if let Some(entry) = self.events.get_mut(index) {
            entry.1 = true;
        }
        Ok(())
    }

    fn measurement_derivatives(
        &mut self,
        objects: &SolveForObjects,
        elements: &[SolveForElement],
    ) -> Result<DMatrix<f64>, ODError> {
        let (Some(idx), Some(msr)) = (self.current_model, self.measurement.as_ref()) else {
            return Err(ODError::InvalidState {
                action: "cannot differentiate before computing a measurement".to_string(),
            });
        };
        let epoch = msr.epoch;
        let tracker = self
            .current_observation()
            .map(|obs| obs.tracker().to_string())
            .unwrap_or_default();

        let model = &mut self.models[idx];
        let msr_type = model.msr_type();
        let size = msr_type.size();
        let ids = model.participant_ids();

        let mut partials: Vec<Option<DMatrix<f64>>> = vec![None; ids.len()];
        let mut h_tilde = DMatrix::zeros(size, elements.len());

        for (col, element) in elements.iter().enumerate() {
            match element.kind {
                ElementKind::Bias {
                    msr_type: bias_type,
                    component,
                } => {
                    if bias_type == msr_type && element.owner == tracker && component < size {
                        let wrt_bias = model.compute_derivative(epoch, 0, DerivativeParameter::Bias)?;
                        h_tilde[(component, col)] = wrt_bias[(component, component)];
                    }
                }
                kind => {
                    let (Some(cart_idx), Some(p_idx)) = (
                        kind.cartesian_index(),
                        ids.iter().position(|id| *id == element.owner),
                    ) else {
                        continue;
                    };
                    if objects.spacecraft_by_id(&element.owner).is_none() {
                        continue;
                    }
                    if partials[p_idx].is_none() {
                        partials[p_idx] = Some(model.compute_derivative(
                            epoch,
                            p_idx,
                            DerivativeParameter::CartesianState,
                        )?);
                    }
                    if let Some(wrt_state) = &partials[p_idx] {
                        for row in 0..size {
                            h_tilde[(row, col)] = wrt_state[(row, cart_idx)];
                        }
                    }
                }
            }
        }

        Ok(h_tilde)
    }

    fn clear_ionosphere_cache(&mut self) {
        // No ionosphere model caches anything.
    }

    fn processing_complete(&self) -> bool {
        self.cursor >= self.arc.len()
    }

    fn tracking_data_adapters(&self) -> &[MeasurementModel] {
        &self.models
    }
}
