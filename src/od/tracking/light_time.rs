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

use crate::cosmic::{Orbit, SPEED_OF_LIGHT_KM_S};
use crate::linalg::Vector3;
use crate::time::Epoch;
use std::fmt;

/// Convergence threshold on the light time, in seconds
pub const LIGHT_TIME_TOLERANCE_S: f64 = 1e-12;
/// Maximum number of polls of a light time event
pub const MAX_LIGHT_TIME_POLLS: usize = 10;

/// Light time correction of a signal received at a known position, transmitted by a spacecraft.
///
/// The light time is found by fixed point iteration of `τ = |r_sc(t - τ) - r_rx(t)| / c`, where the transmitter is
/// stepped back in time with a second order two body expansion.
#[derive(Clone, Debug, PartialEq)]
pub struct LightTimeEvent {
    /// Reception epoch
    pub epoch: Epoch,
    receiver_km: Vector3<f64>,
    transmitter: Orbit,
    light_time_s: f64,
    polls: usize,
    located: bool,
}

impl LightTimeEvent {
    pub fn new(epoch: Epoch, receiver_km: Vector3<f64>, transmitter: Orbit) -> Self {
        let light_time_s = (transmitter.radius_km - receiver_km).norm() / SPEED_OF_LIGHT_KM_S;
        Self {
            epoch,
            receiver_km,
            transmitter,
            light_time_s,
            polls: 0,
            located: false,
        }
    }

    fn acceleration(&self) -> Vector3<f64> {
        let r = self.transmitter.radius_km;
        -self.transmitter.mu_km3_s2 / r.norm().powi(3) * r
    }

    fn position_at(&self, light_time_s: f64) -> Vector3<f64> {
        self.transmitter.radius_km - self.transmitter.velocity_km_s * light_time_s
            + 0.5 * self.acceleration() * light_time_s.powi(2)
    }

    /// Runs one fixed point iteration, returning whether the event is located.
    pub fn poll(&mut self) -> bool {
        if self.located {
            return true;
        }
        let light_time_s =
            (self.position_at(self.light_time_s) - self.receiver_km).norm() / SPEED_OF_LIGHT_KM_S;
        let delta = (light_time_s - self.light_time_s).abs();
        self.light_time_s = light_time_s;
        self.polls += 1;
        self.located = delta < LIGHT_TIME_TOLERANCE_S || self.polls >= MAX_LIGHT_TIME_POLLS;
        trace!(
            "light time poll #{}: {:.15} s (change of {delta:e} s)",
            self.polls,
            self.light_time_s
        );
        self.located
    }

    pub fn is_located(&self) -> bool {
        self.located
    }

    pub fn light_time_s(&self) -> f64 {
        self.light_time_s
    }

    pub fn polls(&self) -> usize {
        self.polls
    }

    /// State of the transmitter at the transmission time, tagged with the reception epoch.
    pub fn transmitter_state(&self) -> Orbit {
        let mut orbit = self.transmitter;
        orbit.radius_km = self.position_at(self.light_time_s);
        orbit.velocity_km_s =
            self.transmitter.velocity_km_s - self.acceleration() * self.light_time_s;
        orbit
    }
}

impl fmt::Display for LightTimeEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "light time at {}: {:.9} ms ({} polls, {})",
            self.epoch,
            self.light_time_s * 1e3,
            self.polls,
            if self.located { "located" } else { "pending" }
        )
    }
}

#[cfg(test)]
mod ut_light_time {
    use super::*;

    #[test]
    fn converges_for_leo() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2020, 1, 1);
        let orbit = Orbit::keplerian(7000.0, 0.001, 51.6, 0.0, 0.0, 0.0, epoch);
        let receiver = orbit.radius_km * (6378.0 / orbit.rmag_km());
        let mut event = LightTimeEvent::new(epoch, receiver, orbit);
        let initial = event.light_time_s();

        while !event.poll() {}

        assert!(event.is_located());
        assert!(event.polls() < MAX_LIGHT_TIME_POLLS);
        // About 615 km overhead, i.e. about 2 ms, and the spacecraft moved by about 15 m meanwhile
        assert!((event.light_time_s() - initial).abs() < 1e-7);
        assert!((event.light_time_s() - (orbit.rmag_km() - 6378.0) / SPEED_OF_LIGHT_KM_S).abs() < 1e-7);
        let moved = (event.transmitter_state().radius_km - orbit.radius_km).norm();
        assert!(moved > 1e-3 && moved < 0.1, "{moved}");
        assert_eq!(event.transmitter_state().epoch, epoch);
    }
}
