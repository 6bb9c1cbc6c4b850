extern crate nyx_batch as nyx;
extern crate pretty_env_logger;

use super::{approaching_spacecraft, epoch, two_body};

use nyx::io::ConfigRepr;
use nyx::od::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

fn config_path(name: &str) -> PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "data", "tests", "config", name]
        .iter()
        .collect()
}

#[test]
fn load_batch_config() {
    let _ = pretty_env_logger::try_init();

    let cfg = BatchConfig::load(config_path("batch.yaml")).unwrap();
    dbg!(&cfg);
    assert_eq!(cfg.absolute_tol, 1e-6);
    assert_eq!(cfg.relative_tol, 1e-5);
    assert!(cfg.use_initial_covariance);
    assert_eq!(cfg.inversion_algorithm, InversionAlgorithm::Cholesky);
    assert_eq!(cfg.max_consecutive_divergences, 5);
    assert!(cfg.freeze_measurement_editing);
    assert_eq!(cfg.freeze_iteration, 3);
    assert_eq!(cfg.maximum_iterations, 25);
    assert_eq!(cfg.olse_initial_rms_sigma, 1000.0);
    // Unspecified fields keep their defaults
    let defaults = BatchConfig::default();
    assert_eq!(cfg.olse_multiplicative_constant, defaults.olse_multiplicative_constant);
    assert_eq!(cfg.olse_additive_constant, defaults.olse_additive_constant);
    assert_eq!(cfg.use_rmsp, defaults.use_rmsp);
    assert!(cfg.validate().is_ok());

    // The parameters are reachable by name
    assert_eq!(cfg.get_integer_parameter("MaximumIterations").unwrap(), 25);
    assert_eq!(
        cfg.get_string_parameter("InversionAlgorithm").unwrap(),
        "Cholesky"
    );
}

#[test]
fn invalid_batch_config_is_rejected() {
    let gs = GroundStation::from_point("GS", 0.0, 0.0, 0.0);
    let sc = approaching_spacecraft(&gs, epoch(), 10.0);
    let cfg = BatchConfig::load(config_path("invalid_batch.yaml")).unwrap();
    assert_eq!(cfg.max_consecutive_divergences, 0);

    let err = BatchEstimator::new(
        two_body(&sc.orbit),
        TrackingArcManager::new(TrackingDataArc::default(), vec![]),
        CartesianStateManager::new(sc, vec![]),
        cfg,
    )
    .err()
    .unwrap();
    assert!(err.to_string().contains(
        "MaxConsecutiveDivergences has invalid value (0). It has to be a positive integer greater than 0."
    ));
}

#[test]
fn load_named_ground_stations() {
    let stations = GroundStation::load_named(config_path("many_ground_stations.yaml")).unwrap();
    assert_eq!(stations.len(), 2);

    let canberra = &stations["Canberra"];
    assert_eq!(canberra.id, "DSS34");
    assert_eq!(canberra.elevation_mask_deg, 10.0);
    assert!(canberra.hardware.is_empty());

    let demo = &stations["Demo ground station"];
    assert_eq!(demo.hardware.len(), 1);
    assert_eq!(demo.hardware[0].delay_s, 1.0e-6);
}

#[test]
fn duplicate_ids_from_yaml() {
    let stations = GroundStation::load_many(config_path("ground_stations.yaml")).unwrap();
    assert_eq!(stations.len(), 2);
    let sc = approaching_spacecraft(&stations[0], epoch(), 10.0);

    let models = stations
        .into_iter()
        .map(|gs| MeasurementModel::new(MeasurementType::Range, vec![gs.into(), sc.clone().into()]).unwrap())
        .collect();
    let mgr = TrackingArcManager::new(TrackingDataArc::default(), models);
    assert_eq!(
        mgr.validate_duplicate_ground_station_ids(),
        Err("GS".to_string())
    );
}

#[test]
fn load_tracking_configs() {
    let configs: BTreeMap<String, TrkConfig> =
        TrkConfig::load_named(config_path("trk_cfg.yaml")).unwrap();
    assert_eq!(configs["Range"].sampling, 30.seconds());
    assert_eq!(configs["Range"].noise_sigma, vec![1e-4]);
    assert_eq!(configs["AzEl"].sampling, 1.minutes());
    assert_eq!(configs["AzEl"].noise_sigma.len(), 2);
}
