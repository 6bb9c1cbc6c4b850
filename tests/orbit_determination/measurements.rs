extern crate nyx_batch as nyx;
extern crate pretty_env_logger;

use super::{approaching_spacecraft, displaced, epoch, equator_station, two_body};

use approx::assert_abs_diff_eq;
use nyx::linalg::{Vector3, Vector6};
use nyx::od::msr::corrections::{HOPFIELD_SAASTAMOINEN, IRI2007};
use nyx::od::prelude::*;
use nyx::time::TimeSeries;

/// Spacecraft states of a pass over the equator station, every 30 seconds for 15 minutes
fn pass(mask_deg: f64) -> (GroundStation, Vec<Spacecraft>) {
    let gs = equator_station().with_elevation_mask(mask_deg);
    let sc = approaching_spacecraft(&gs, epoch(), 25.0);
    let mut prop = two_body(&sc.orbit);
    let states = TimeSeries::inclusive(epoch(), epoch() + 15.minutes(), 30.seconds())
        .map(|e| {
            let (state, _) = prop.propagate_to(e).unwrap();
            let orbit = Orbit::from_cartesian_vec(&Vector6::from_iterator(state.iter().copied()), e);
            sc.clone().with_orbit(orbit)
        })
        .collect();
    (gs, states)
}

#[test]
fn elevation_mask_over_a_pass() {
    let _ = pretty_env_logger::try_init();

    let mask_deg = 30.0;
    let (gs, states) = pass(mask_deg);
    let mut range = MeasurementModel::new(
        MeasurementType::Range,
        vec![states[0].clone().into(), gs.clone().into()],
    )
    .unwrap();
    let mut azel = MeasurementModel::new(
        MeasurementType::AzEl,
        vec![gs.clone().into(), states[0].clone().into()],
    )
    .unwrap();
    // The station always sorts first
    assert_eq!(range.participant_ids(), vec!["GS".to_string(), "SC".to_string()]);

    let (mut feasible, mut blocked) = (0, 0);
    for sc in &states {
        let epoch = sc.orbit.epoch;
        range.update_participant(&sc.clone().into());
        azel.update_participant(&sc.clone().into());

        let computed = range.evaluate(epoch, true).unwrap();
        let angles = azel.evaluate(epoch, false).unwrap();
        assert!(angles.is_feasible());

        let (azimuth_deg, elevation_deg) = (angles.value[0], angles.value[1]);
        assert!((0.0..360.0).contains(&azimuth_deg));
        assert!((-90.0..=90.0).contains(&elevation_deg));
        assert_abs_diff_eq!(computed.feasibility.value, elevation_deg, epsilon = 1e-9);

        if elevation_deg > mask_deg {
            assert!(computed.is_feasible(), "{computed}");
            assert_eq!(computed.feasibility.reason, FEASIBLE_REASON);
            feasible += 1;
        } else {
            assert!(!computed.is_feasible(), "{computed}");
            assert_eq!(computed.feasibility.reason, "B1");
            assert_eq!(
                computed.feasibility.edit_tag(),
                EditTag::Blocked("B1".to_string())
            );
            blocked += 1;
        }

        // Without events, the range is always computed
        assert!(range.evaluate(epoch, false).unwrap().is_feasible());
    }
    println!("{feasible} feasible and {blocked} blocked");
    assert!(feasible > 0);
    assert!(blocked > 0);
}

#[test]
fn troposphere_lengthens_the_range() {
    let _ = pretty_env_logger::try_init();

    let (gs, states) = pass(0.0);
    // Near the zenith of the station
    let sc = &states[13];
    let epoch = sc.orbit.epoch;
    let mut range = MeasurementModel::new(
        MeasurementType::Range,
        vec![gs.into(), sc.clone().into()],
    )
    .unwrap();

    let geometric_km = range.evaluate(epoch, true).unwrap().value[0];
    range
        .physical_mut()
        .add_correction(HOPFIELD_SAASTAMOINEN)
        .unwrap();
    let corrected_km = range.evaluate(epoch, true).unwrap().value[0];
    let delay_m = (corrected_km - geometric_km) * 1e3;
    println!("tropospheric delay: {delay_m:.3} m");
    assert!((2.0..3.5).contains(&delay_m));

    assert!(matches!(
        range.physical_mut().add_correction(IRI2007),
        Err(ODError::UnavailableCapability { .. })
    ));
    assert!(matches!(
        range.physical_mut().add_correction("Klobuchar"),
        Err(ODError::ODConfigError { .. })
    ));
}

#[test]
fn azel_partials_match_finite_differences() {
    let (gs, states) = pass(0.0);
    let sc = &states[10];
    let epoch = sc.orbit.epoch;
    let mut azel = MeasurementModel::new(
        MeasurementType::AzEl,
        vec![gs.into(), sc.clone().into()],
    )
    .unwrap();

    azel.evaluate(epoch, false).unwrap();
    let partials = azel
        .compute_derivative(epoch, 1, DerivativeParameter::Position)
        .unwrap();
    assert_eq!(partials.shape(), (2, 3));

    let h_km = 1e-3;
    for axis in 0..3 {
        let mut dr = Vector3::zeros();
        dr[axis] = h_km;
        azel.update_participant(&displaced(sc, dr).into());
        let plus = azel.evaluate(epoch, false).unwrap().value;
        azel.update_participant(&displaced(sc, -dr).into());
        let minus = azel.evaluate(epoch, false).unwrap().value;
        for component in 0..2 {
            let numerical = (plus[component] - minus[component]) / (2.0 * h_km);
            assert_abs_diff_eq!(partials[(component, axis)], numerical, epsilon = 1e-6);
        }
    }

    // Bias partials are the identity
    let bias = azel
        .compute_derivative(epoch, 0, DerivativeParameter::Bias)
        .unwrap();
    assert_eq!(bias, nyx::linalg::DMatrix::identity(2, 2));
}

#[test]
fn two_stations_cannot_be_measured() {
    let gs = equator_station();
    let other = GroundStation::dss65_madrid(0.0);
    let mut range = MeasurementModel::new(
        MeasurementType::Range,
        vec![gs.into(), other.into()],
    )
    .unwrap();

    match range.evaluate(epoch(), true) {
        Err(ODError::Measurement { details }) => {
            assert_eq!(details, "neither participant is a spacecraft")
        }
        other => panic!("expected a measurement error, got {other:?}"),
    }
}

#[test]
fn exactly_two_participants() {
    let gs = equator_station();
    let sc = approaching_spacecraft(&gs, epoch(), 10.0);
    assert!(MeasurementModel::new(MeasurementType::Range, vec![sc.clone().into()]).is_err());
    assert!(MeasurementModel::new(
        MeasurementType::Range,
        vec![gs.clone().into(), sc.clone().into(), gs.into()]
    )
    .is_err());
}
