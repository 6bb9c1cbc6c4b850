extern crate nyx_batch as nyx;
extern crate pretty_env_logger;

use super::{approaching_spacecraft, displaced, epoch, equator_station, simulate, two_body};

use approx::assert_abs_diff_eq;
use nyx::cosmic::rss_orbit_errors;
use nyx::linalg::Vector3;
use nyx::od::prelude::*;
use rstest::*;

fn range_sigma(msr_type: MeasurementType) -> Vec<f64> {
    match msr_type {
        MeasurementType::Range => vec![1e-4],
        _ => vec![1e-3, 1e-3],
    }
}

/// Range and azimuth-elevation models of a station north east of the ground track, so that the pass never crosses
/// its zenith.
fn offset_station_models(truth: &Spacecraft) -> Vec<MeasurementModel> {
    let gs = GroundStation::from_point("GS2", 5.0, 5.0, 0.0);
    [MeasurementType::Range, MeasurementType::AzEl]
        .into_iter()
        .map(|msr_type| {
            MeasurementModel::new(msr_type, vec![gs.clone().into(), truth.clone().into()]).unwrap()
        })
        .collect()
}

/// Noise free range from a single station, at five epochs spread over ten minutes of a pass. Five ranges cannot
/// observe the six components of the state, so the apriori carries a well known velocity and a loose position.
#[test]
fn blse_range_with_apriori() {
    let _ = pretty_env_logger::try_init();

    let gs = GroundStation::from_point("GS2", 5.0, 5.0, 0.0);
    let truth = approaching_spacecraft(&equator_station(), epoch(), 15.0);
    let model = MeasurementModel::new(
        MeasurementType::Range,
        vec![gs.into(), truth.clone().into()],
    )
    .unwrap();

    let arc = simulate(
        vec![model.clone()],
        &truth,
        150.seconds(),
        epoch() + 10.minutes(),
        range_sigma,
    );
    assert_eq!(arc.len(), 5);
    println!("{arc}");

    let initial = displaced(&truth, Vector3::new(0.01, -0.01, 0.005));
    let (init_pos_err_km, _) = rss_orbit_errors(&truth.orbit, &initial.orbit);

    let esm = CartesianStateManager::new(initial.clone(), vec![])
        .with_uncertainty(
            StateUncertainty::builder()
                .x_km(10.0)
                .y_km(10.0)
                .z_km(10.0)
                .vx_km_s(1e-6)
                .vy_km_s(1e-6)
                .vz_km_s(1e-6)
                .build(),
        )
        .unwrap();

    let config = BatchConfig::builder()
        .absolute_tol(1e-6)
        .use_initial_covariance(true)
        .build();

    let mut blse = BatchEstimator::new(
        two_body(&initial.orbit),
        TrackingArcManager::new(arc, vec![model]),
        esm,
        config,
    )
    .unwrap();

    let solution = blse.run().unwrap();
    println!("{solution}");

    assert!(
        matches!(
            solution.status,
            ConvergenceStatus::AbsoluteTolConverged | ConvergenceStatus::AbsAndRelConverged
        ),
        "unexpected status {}",
        solution.status
    );
    assert!(solution.iterations < 10);
    assert_eq!(solution.reports.len(), solution.iterations);
    assert!(solution.rms.new <= 1e-6);

    let (pos_err_km, vel_err_km_s) =
        rss_orbit_errors(&truth.orbit, &blse.esm.estimated_spacecraft().orbit);
    println!(
        "position error: {:.3} m -> {:.3e} m\tvelocity error: {:.3e} m/s",
        init_pos_err_km * 1e3,
        pos_err_km * 1e3,
        vel_err_km_s * 1e3
    );
    assert!(pos_err_km < 1e-5);
    assert!(vel_err_km_s < 1e-8);

    for obs in blse.msr_manager.observations() {
        assert_eq!(obs.edit_tag, EditTag::NotEdited);
    }

    assert_eq!(
        blse.get_string_parameter("ConvergentStatus").unwrap(),
        solution.status.to_string()
    );
    assert!(blse
        .set_string_parameter("ConvergentStatus", "Converging")
        .is_err());
}

/// Every range is shifted by one kilometer after the first iteration, so the second one diverges. With the reset
/// enabled, the best RMS of the next iteration starts from the RMS of the diverging iteration.
#[rstest]
#[case(true)]
#[case(false)]
fn blse_diverging_iteration_best_rms(#[case] reset: bool) {
    let _ = pretty_env_logger::try_init();

    let truth = approaching_spacecraft(&equator_station(), epoch(), 15.0);
    let models = offset_station_models(&truth);
    let arc = simulate(
        models.clone(),
        &truth,
        30.seconds(),
        epoch() + 2.minutes(),
        range_sigma,
    );

    let initial = displaced(&truth, Vector3::new(0.01, -0.01, 0.005));
    let config = BatchConfig::builder()
        .reset_best_rms_if_diverging(reset)
        // No outer loop edit of the shifted ranges
        .olse_multiplicative_constant(1e6)
        .build();
    let mut blse = BatchEstimator::new(
        two_body(&initial.orbit),
        TrackingArcManager::new(arc, models),
        CartesianStateManager::new(initial, vec![]),
        config,
    )
    .unwrap();

    while blse.iterations_taken() < 1 {
        blse.advance_state().unwrap();
    }
    assert_eq!(blse.status(), ConvergenceStatus::Unknown);

    for obs in blse.msr_manager.observations_mut() {
        if obs.msr_type == MeasurementType::Range {
            obs.value[0] += 1.0;
        }
    }
    while blse.iterations_taken() < 2 {
        blse.advance_state().unwrap();
    }
    assert_eq!(blse.status(), ConvergenceStatus::Diverging);

    let first = blse.reports()[0].rms;
    let second = blse.reports()[1].rms;
    assert!(second.new > first.new);
    assert_eq!(second.old, first.new);
    // The best RMS of the diverging iteration itself is not reset
    assert_eq!(second.best, first.new);

    let expected_best = if reset { second.new } else { first.new };
    assert_eq!(blse.rms().best, expected_best);
    assert_eq!(
        blse.get_boolean_parameter("ResetBestRMSIfDiverging").unwrap(),
        reset
    );

    while blse.iterations_taken() < 3 {
        blse.advance_state().unwrap();
    }
    let third = blse.reports()[2].rms;
    assert_eq!(third.best, expected_best.min(third.new));
}

/// A range outlier in the middle of the pass, with a large initial error: the outer loop sigma edit of the second
/// iteration only catches it when it is based on the predicted RMS, which ignores the initial error.
#[rstest]
#[case(true, 1)]
#[case(false, 0)]
fn blse_outer_loop_sigma(#[case] use_rmsp: bool, #[case] edited_at_second_iteration: usize) {
    let _ = pretty_env_logger::try_init();

    let truth = approaching_spacecraft(&equator_station(), epoch(), 15.0);
    let models = offset_station_models(&truth);
    let mut arc = simulate(
        models.clone(),
        &truth,
        10.seconds(),
        epoch() + 5.minutes(),
        range_sigma,
    );
    assert_eq!(arc.len(), 62);

    let outlier = arc
        .observations
        .iter()
        .position(|obs| {
            obs.msr_type == MeasurementType::Range && obs.epoch == epoch() + 150.seconds()
        })
        .unwrap();
    // Five hundred sigmas
    arc.observations[outlier].value[0] += 0.05;

    let initial = displaced(&truth, Vector3::new(1.0, -1.0, 0.5));
    let config = BatchConfig::builder()
        .absolute_tol(1e-6)
        .olse_initial_rms_sigma(1e6)
        .use_rmsp(use_rmsp)
        .build();
    let mut blse = BatchEstimator::new(
        two_body(&initial.orbit),
        TrackingArcManager::new(arc, models),
        CartesianStateManager::new(initial, vec![]),
        config,
    )
    .unwrap();

    let solution = blse.run().unwrap();
    println!("{solution}");
    assert!(solution.converged(), "{solution}");

    let first = &solution.reports[0];
    assert_eq!(first.statistics.edits().total(), 0);
    assert!(first.rms.predicted < first.rms.new);
    assert_eq!(
        solution.reports[1].statistics.edits().count("OLSE"),
        edited_at_second_iteration
    );

    // Eventually edited either way
    assert_eq!(
        blse.msr_manager.observations()[outlier].edit_tag,
        EditTag::OuterLoopSigmaEdit
    );
    let (pos_err_km, _) = rss_orbit_errors(&truth.orbit, &blse.esm.estimated_spacecraft().orbit);
    assert!(pos_err_km < 1e-5);
}

/// Once frozen, an initial RMS sigma edit is kept through every iteration, even after its tracker stops being
/// modeled.
#[test]
fn blse_frozen_sigma_edit() {
    let _ = pretty_env_logger::try_init();

    let truth = approaching_spacecraft(&equator_station(), epoch(), 15.0);
    let models = offset_station_models(&truth);
    let mut arc = simulate(
        models.clone(),
        &truth,
        30.seconds(),
        epoch() + 2.minutes(),
        range_sigma,
    );
    let outlier = arc
        .observations
        .iter()
        .position(|obs| obs.msr_type == MeasurementType::Range && obs.epoch == epoch() + 1.minutes())
        .unwrap();
    arc.observations[outlier].value[0] += 5.0;

    let initial = displaced(&truth, Vector3::new(0.01, -0.01, 0.005));
    let config = BatchConfig::builder()
        .absolute_tol(1e-6)
        .freeze_measurement_editing(true)
        .freeze_iteration(1)
        .build();
    let mut blse = BatchEstimator::new(
        two_body(&initial.orbit),
        TrackingArcManager::new(arc, models),
        CartesianStateManager::new(initial, vec![]),
        config,
    )
    .unwrap();

    while blse.iterations_taken() < 1 {
        blse.advance_state().unwrap();
    }
    assert_eq!(
        blse.msr_manager.observations()[outlier].edit_tag,
        EditTag::InitialRMSSigmaEdit
    );

    // No model matches this observation anymore
    blse.msr_manager.observations_mut()[outlier].participant_ids[0] = "ELSEWHERE".to_string();

    let solution = blse.run().unwrap();
    assert!(solution.converged(), "{solution}");
    assert!(solution.iterations > 1);
    for report in &solution.reports {
        assert_eq!(report.statistics.edits().count("IRMS"), 1);
        assert_eq!(report.statistics.edits().count("U"), 0);
        assert_eq!(report.statistics.edits().count("OLSE"), 0);
    }
    assert_eq!(
        blse.msr_manager.observations()[outlier].edit_tag,
        EditTag::InitialRMSSigmaEdit
    );

    let (pos_err_km, _) = rss_orbit_errors(&truth.orbit, &blse.esm.estimated_spacecraft().orbit);
    assert!(pos_err_km < 1e-5);
}

/// Range and azimuth-elevation from a single station fully observe the state: the estimator recovers the truth
/// with every inversion algorithm.
#[rstest]
#[case(InversionAlgorithm::Internal)]
#[case(InversionAlgorithm::Schur)]
#[case(InversionAlgorithm::Cholesky)]
fn blse_range_azel(#[case] algorithm: InversionAlgorithm) {
    let _ = pretty_env_logger::try_init();

    let gs = equator_station();
    let truth = approaching_spacecraft(&gs, epoch(), 10.0);
    let models = vec![
        MeasurementModel::new(
            MeasurementType::Range,
            vec![gs.clone().into(), truth.clone().into()],
        )
        .unwrap(),
        MeasurementModel::new(
            MeasurementType::AzEl,
            vec![gs.into(), truth.clone().into()],
        )
        .unwrap(),
    ];

    let arc = simulate(
        models.clone(),
        &truth,
        30.seconds(),
        epoch() + 2.minutes(),
        range_sigma,
    );
    assert_eq!(arc.len(), 10);

    let initial = displaced(&truth, Vector3::new(0.01, -0.01, 0.005));
    let config = BatchConfig::builder()
        .absolute_tol(1e-6)
        .inversion_algorithm(algorithm)
        .build();

    let mut blse = BatchEstimator::new(
        two_body(&initial.orbit),
        TrackingArcManager::new(arc, models),
        CartesianStateManager::new(initial, vec![]),
        config,
    )
    .unwrap();

    let solution = blse.run().unwrap();
    assert!(solution.converged(), "{solution}");
    assert!(solution.iterations < 10);

    let (pos_err_km, vel_err_km_s) =
        rss_orbit_errors(&truth.orbit, &blse.esm.estimated_spacecraft().orbit);
    println!("[{algorithm}] errors: {:.3e} m\t{:.3e} m/s", pos_err_km * 1e3, vel_err_km_s * 1e3);
    assert!(pos_err_km < 1e-5);
    assert!(vel_err_km_s < 1e-6);

    // Covariance products
    assert_eq!(solution.covariance.shape(), (6, 6));
    assert!(solution.sigmas().iter().all(|s| *s > 0.0));
    let corr = solution.correlation();
    for i in 0..6 {
        assert_abs_diff_eq!(corr[(i, i)], 1.0, epsilon = 1e-9);
    }
}

/// A constant range bias of one station is estimated alongside the state, thanks to a second station.
#[test]
fn blse_range_bias() {
    let _ = pretty_env_logger::try_init();

    let gs = equator_station();
    let gs2 = GroundStation::from_point("GS2", 5.0, 5.0, 0.0);
    let truth = approaching_spacecraft(&gs, epoch(), 10.0);

    let mut models = Vec::new();
    for station in [gs, gs2] {
        for msr_type in [MeasurementType::Range, MeasurementType::AzEl] {
            models.push(
                MeasurementModel::new(msr_type, vec![station.clone().into(), truth.clone().into()])
                    .unwrap(),
            );
        }
    }

    let bias_km = 0.05;
    let mut arc = simulate(
        models.clone(),
        &truth,
        30.seconds(),
        epoch() + 2.minutes(),
        range_sigma,
    );
    assert_eq!(arc.len(), 20);
    for obs in arc.observations.iter_mut() {
        if obs.tracker() == "GS" && obs.msr_type == MeasurementType::Range {
            obs.value[0] += bias_km;
        }
    }

    let initial = displaced(&truth, Vector3::new(0.01, -0.01, 0.005));
    let esm = CartesianStateManager::new(
        initial.clone(),
        vec![MeasurementBias::zero("GS", MeasurementType::Range)],
    );
    assert_eq!(esm.state_size(), 7);

    let mut blse = BatchEstimator::new(
        two_body(&initial.orbit),
        TrackingArcManager::new(arc, models),
        esm,
        BatchConfig::builder().absolute_tol(1e-6).build(),
    )
    .unwrap();

    let solution = blse.run().unwrap();
    assert!(solution.converged(), "{solution}");

    let bias_idx = solution
        .element_index(&SolveForElement::new(
            "GS",
            ElementKind::Bias {
                msr_type: MeasurementType::Range,
                component: 0,
            },
        ))
        .unwrap();
    assert_eq!(bias_idx, 6);
    assert_abs_diff_eq!(solution.state[bias_idx], bias_km, epsilon = 1e-6);

    let (pos_err_km, _) = rss_orbit_errors(&truth.orbit, &blse.esm.estimated_spacecraft().orbit);
    assert!(pos_err_km < 1e-5);
}

/// Once finished, stepping never changes the estimate nor the normal equations.
#[test]
fn blse_finished_is_inert() {
    let _ = pretty_env_logger::try_init();

    let gs = equator_station();
    let truth = approaching_spacecraft(&gs, epoch(), 10.0);
    let models = vec![
        MeasurementModel::new(
            MeasurementType::Range,
            vec![gs.clone().into(), truth.clone().into()],
        )
        .unwrap(),
        MeasurementModel::new(
            MeasurementType::AzEl,
            vec![gs.into(), truth.clone().into()],
        )
        .unwrap(),
    ];
    let arc = simulate(
        models.clone(),
        &truth,
        30.seconds(),
        epoch() + 2.minutes(),
        range_sigma,
    );

    let initial = displaced(&truth, Vector3::new(0.001, 0.0, 0.0));
    let mut blse = BatchEstimator::new(
        two_body(&initial.orbit),
        TrackingArcManager::new(arc, models),
        CartesianStateManager::new(initial, vec![]),
        BatchConfig::builder().maximum_iterations(2).build(),
    )
    .unwrap();

    assert_eq!(blse.state(), EstimatorState::Initializing);
    assert_eq!(blse.advance_state().unwrap(), EstimatorState::Calculating);
    assert!(blse.is_initialized());

    let solution = blse.run().unwrap();
    assert_eq!(blse.state(), EstimatorState::Finished);

    let estimate = blse.estimate().clone();
    let information = blse.information_matrix().clone();
    let rhs = blse.rhs().clone();
    for _ in 0..3 {
        assert_eq!(blse.advance_state().unwrap(), EstimatorState::Finished);
    }
    assert_eq!(blse.estimate(), &estimate);
    assert_eq!(blse.information_matrix(), &information);
    assert_eq!(blse.rhs(), &rhs);
    assert_eq!(blse.solution(), Some(&solution));

    // Reset returns to the initialization
    assert!(!blse.take_action("Rewind"));
    assert!(blse.take_action("Reset"));
    assert_eq!(blse.state(), EstimatorState::Initializing);
    assert!(!blse.is_initialized());
    let again = blse.run().unwrap();
    assert!(again.iterations >= 1);
}

#[test]
fn blse_duplicate_station_ids() {
    let _ = pretty_env_logger::try_init();

    let gs = equator_station();
    // Another station, at another location, with the same identifier
    let impostor = GroundStation::from_point("GS", 1.0, 1.0, 0.0);
    let truth = approaching_spacecraft(&gs, epoch(), 10.0);
    let models = vec![
        MeasurementModel::new(
            MeasurementType::Range,
            vec![gs.into(), truth.clone().into()],
        )
        .unwrap(),
        MeasurementModel::new(
            MeasurementType::AzEl,
            vec![impostor.into(), truth.clone().into()],
        )
        .unwrap(),
    ];
    let arc = simulate(
        models.clone(),
        &truth,
        30.seconds(),
        epoch() + 1.minutes(),
        range_sigma,
    );

    let mut blse = BatchEstimator::new(
        two_body(&truth.orbit),
        TrackingArcManager::new(arc, models),
        CartesianStateManager::new(truth.clone(), vec![]),
        BatchConfig::default(),
    )
    .unwrap();

    match blse.advance_state() {
        Err(ODError::DuplicateIdentifier { id }) => assert_eq!(id, "GS"),
        other => panic!("expected a duplicate identifier error, got {other:?}"),
    }
    assert_eq!(blse.state(), EstimatorState::Finished);
    assert!(blse.solution().is_none());
    // Stepping again does nothing
    assert_eq!(blse.advance_state().unwrap(), EstimatorState::Finished);
    assert!(blse.solution().is_none());
}

#[test]
fn blse_too_few_measurements() {
    let _ = pretty_env_logger::try_init();

    let gs = equator_station();
    let truth = approaching_spacecraft(&gs, epoch(), 10.0);
    let models = vec![MeasurementModel::new(
        MeasurementType::Range,
        vec![gs.into(), truth.clone().into()],
    )
    .unwrap()];
    // Only two range observations for six unknowns
    let arc = simulate(
        models.clone(),
        &truth,
        30.seconds(),
        epoch() + 30.seconds(),
        range_sigma,
    );
    assert_eq!(arc.len(), 2);

    let mut blse = BatchEstimator::new(
        two_body(&truth.orbit),
        TrackingArcManager::new(arc, models),
        CartesianStateManager::new(truth.clone(), vec![]),
        BatchConfig::default(),
    )
    .unwrap();

    match blse.run() {
        Err(ODError::TooFewMeasurements { need, .. }) => assert_eq!(need, 6),
        other => panic!("expected too few measurements, got {other:?}"),
    }
    assert_eq!(blse.state(), EstimatorState::Finished);
}

#[test]
fn blse_apriori_required() {
    let gs = equator_station();
    let truth = approaching_spacecraft(&gs, epoch(), 10.0);
    let models = vec![MeasurementModel::new(
        MeasurementType::Range,
        vec![gs.into(), truth.clone().into()],
    )
    .unwrap()];
    let arc = simulate(
        models.clone(),
        &truth,
        30.seconds(),
        epoch() + 2.minutes(),
        range_sigma,
    );

    let mut blse = BatchEstimator::new(
        two_body(&truth.orbit),
        TrackingArcManager::new(arc, models),
        CartesianStateManager::new(truth.clone(), vec![]),
        BatchConfig::builder().use_initial_covariance(true).build(),
    )
    .unwrap();
    assert!(matches!(
        blse.advance_state(),
        Err(ODError::ODConfigError { .. })
    ));
    assert_eq!(blse.state(), EstimatorState::Finished);
}
