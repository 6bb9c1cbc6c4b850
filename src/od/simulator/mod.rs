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

use crate::cosmic::{Orbit, Spacecraft};
use crate::linalg::Vector6;
use crate::od::msr::{MeasurementModel, Observation, Participant, TrackingDataArc};
use crate::od::{ODError, ODPropSnafu};
use crate::propagators::Propagator;
use crate::time::{Epoch, TimeSeries};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64Mcg;
use snafu::ResultExt;

mod trkconfig;
pub use trkconfig::TrkConfig;

/// Simulates the observations of a spacecraft along a truth trajectory, with optional Gaussian noise.
pub struct TrackingArcSim<P: Propagator> {
    /// Measurement models and their tracking configuration
    pub devices: Vec<(MeasurementModel, TrkConfig)>,
    /// Truth spacecraft at the start of the arc
    pub truth: Spacecraft,
    propagator: P,
    /// Random number generator used for this tracking arc, ensures repeatability
    rng: Pcg64Mcg,
}

impl<P: Propagator> TrackingArcSim<P> {
    pub fn with_rng(
        devices: Vec<(MeasurementModel, TrkConfig)>,
        truth: Spacecraft,
        propagator: P,
        rng: Pcg64Mcg,
    ) -> Result<Self, ODError> {
        for (_, cfg) in &devices {
            cfg.validate()?;
        }
        Ok(Self {
            devices,
            truth,
            propagator,
            rng,
        })
    }

    pub fn with_seed(
        devices: Vec<(MeasurementModel, TrkConfig)>,
        truth: Spacecraft,
        propagator: P,
        seed: u64,
    ) -> Result<Self, ODError> {
        Self::with_rng(devices, truth, propagator, Pcg64Mcg::new(seed.into()))
    }

    pub fn new(
        devices: Vec<(MeasurementModel, TrkConfig)>,
        truth: Spacecraft,
        propagator: P,
    ) -> Result<Self, ODError> {
        Self::with_rng(devices, truth, propagator, Pcg64Mcg::from_entropy())
    }

    /// Generates the observations of every device until the provided epoch, included, sampled per the tracking
    /// configuration of each device. Infeasible measurements are not generated.
    ///
    /// Notes:
    /// Although mutable, this function may be called several times to generate different observations.
    pub fn generate_observations(&mut self, end: Epoch) -> Result<TrackingDataArc, ODError> {
        let start = self.truth.orbit.epoch;
        let state = self.truth.orbit.to_cartesian_vec();
        self.propagator
            .reinitialize(start, &crate::linalg::DVector::from_column_slice(state.as_slice()))
            .context(ODPropSnafu)?;

        // Compute the smallest sampling of all the devices
        let Some(step) = self.devices.iter().map(|(_, cfg)| cfg.sampling).min() else {
            return Ok(TrackingDataArc::default());
        };

        let mut observations = Vec::new();
        for epoch in TimeSeries::inclusive(start, end, step) {
            let (state, _) = self.propagator.propagate_to(epoch).context(ODPropSnafu)?;
            let orbit = Orbit::from_cartesian_vec(&Vector6::from_iterator(state.iter().copied()), epoch);
            let sc = Participant::Spacecraft(self.truth.clone().with_orbit(orbit));

            for (model, cfg) in self.devices.iter_mut() {
                // Only sample the devices at their own rate
                let since_start = (epoch - start).to_seconds();
                let sampling = cfg.sampling.to_seconds();
                if (since_start / sampling).round() * sampling - since_start != 0.0 {
                    continue;
                }

                model.update_participant(&sc);
                let computed = model.evaluate(epoch, true)?;
                if !computed.is_feasible() {
                    continue;
                }

                let mut value = computed.value;
                for (component, sigma) in cfg.noise_sigma.iter().enumerate() {
                    if *sigma > 0.0 && component < value.len() {
                        let noise = Normal::new(0.0, *sigma)
                            .map_err(|e| ODError::config(format!("invalid noise {sigma}: {e}")))?;
                        value[component] += noise.sample(&mut self.rng);
                    }
                }

                observations.push(Observation::new(
                    epoch,
                    computed.msr_type,
                    computed.participant_ids,
                    value,
                    cfg.noise_sigma.clone(),
                ));
            }
        }

        let arc = TrackingDataArc::new(observations);
        info!("Generated {arc}");
        Ok(arc)
    }
}

#[cfg(test)]
mod ut_simulator {
    use super::*;
    use crate::od::msr::MeasurementType;
    use crate::od::GroundStation;
    use crate::propagators::TwoBodyPropagator;
    use crate::time::TimeUnits;

    fn sim(noise: Vec<f64>, seed: u64) -> TrackingArcSim<TwoBodyPropagator> {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2020, 1, 1);
        let gs = GroundStation::from_point("GS", 0.0, 0.0, 0.0);
        let (r_gs, _) = gs.inertial_state(epoch);
        // Circular orbit starting overhead of the station
        let r = r_gs * (7000.0 / r_gs.norm());
        let v = crate::linalg::Vector3::z() * (crate::cosmic::EARTH_GM_KM3_S2 / 7000.0).sqrt();
        let orbit = Orbit::cartesian(r.x, r.y, r.z, v.x, v.y, v.z, epoch);
        let sc = Spacecraft::new("SC", orbit);

        let range = MeasurementModel::new(
            MeasurementType::Range,
            vec![gs.into(), sc.clone().into()],
        )
        .unwrap();
        let prop = TwoBodyPropagator::two_body(
            crate::cosmic::EARTH_GM_KM3_S2,
            epoch,
            orbit.to_cartesian_vec(),
        );
        TrackingArcSim::with_seed(
            vec![(
                range,
                TrkConfig {
                    sampling: 30.seconds(),
                    noise_sigma: noise,
                },
            )],
            sc,
            prop,
            seed,
        )
        .unwrap()
    }

    #[test]
    fn noise_free_then_noisy() {
        let end = Epoch::from_gregorian_utc_at_midnight(2020, 1, 1) + 2.minutes();

        let clean = sim(vec![], 0).generate_observations(end).unwrap();
        assert_eq!(clean.len(), 5);
        assert!((clean.observations[0].value[0] - 621.863).abs() < 1.0);

        let noisy = sim(vec![1e-3], 42).generate_observations(end).unwrap();
        let again = sim(vec![1e-3], 42).generate_observations(end).unwrap();
        assert_eq!(noisy, again);
        for (n, c) in noisy.observations.iter().zip(&clean.observations) {
            assert!((n.value[0] - c.value[0]).abs() < 1e-2);
            assert_ne!(n.value[0], c.value[0]);
        }
    }
}
