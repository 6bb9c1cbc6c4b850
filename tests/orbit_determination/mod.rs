extern crate nyx_batch as nyx;

use nyx::cosmic::EARTH_GM_KM3_S2;
use nyx::linalg::Vector3;
use nyx::od::prelude::*;

mod blse;
mod config;
mod measurements;

/// Reference epoch of the test scenarios
pub fn epoch() -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(2020, 1, 1)
}

/// Station on the equator at the prime meridian
pub fn equator_station() -> GroundStation {
    GroundStation::from_point("GS", 0.0, 0.0, 0.0)
}

/// Spacecraft on a circular polar orbit of 7000 km heading north, `arc_deg` south of the zenith of the provided
/// equatorial station: it flies over the station without starting at the zenith, where the azimuth is singular.
pub fn approaching_spacecraft(gs: &GroundStation, epoch: Epoch, arc_deg: f64) -> Spacecraft {
    let (r_gs, _) = gs.inertial_state(epoch);
    let u = r_gs / r_gs.norm();
    let (sin, cos) = arc_deg.to_radians().sin_cos();
    let r = (u * cos - Vector3::z() * sin) * 7000.0;
    let v = (u * sin + Vector3::z() * cos) * (EARTH_GM_KM3_S2 / 7000.0).sqrt();
    Spacecraft::new("SC", Orbit::cartesian(r.x, r.y, r.z, v.x, v.y, v.z, epoch))
}

pub fn two_body(orbit: &Orbit) -> TwoBodyPropagator {
    TwoBodyPropagator::two_body(EARTH_GM_KM3_S2, orbit.epoch, orbit.to_cartesian_vec())
}

/// Simulates noise free observations of the truth every `sampling` until `end`, and sets their noise sigma,
/// hence their weights, per measurement type.
pub fn simulate(
    models: Vec<MeasurementModel>,
    truth: &Spacecraft,
    sampling: Duration,
    end: Epoch,
    sigma: impl Fn(MeasurementType) -> Vec<f64>,
) -> TrackingDataArc {
    let devices = models
        .into_iter()
        .map(|model| (model, TrkConfig::noise_free(sampling)))
        .collect();
    let mut sim = TrackingArcSim::with_seed(devices, truth.clone(), two_body(&truth.orbit), 0).unwrap();
    let mut arc = sim.generate_observations(end).unwrap();
    for obs in arc.observations.iter_mut() {
        obs.noise_sigma = sigma(obs.msr_type);
    }
    arc
}

/// Displaces the position of the provided spacecraft
pub fn displaced(sc: &Spacecraft, dr_km: Vector3<f64>) -> Spacecraft {
    let mut state = sc.orbit.to_cartesian_vec();
    for i in 0..3 {
        state[i] += dr_km[i];
    }
    sc.clone()
        .with_orbit(sc.orbit.with_cartesian_vec(&state, sc.orbit.epoch))
}
