//! Stage preparation against realistic WPS/MPAS configuration files.

use forecast_common::InitDate;
use mpas_config::{ConfigError, Namelist, NamelistValue, Streams};
use runner::stages::{self, Stage, StageParams};
use runner::RunError;
use test_utils::paths::layout;
use test_utils::ModelRoot;

fn params(root: &ModelRoot) -> StageParams {
    StageParams {
        root_dir: root.path().to_path_buf(),
        domain: "colorado12km".to_string(),
        init_date: InitDate::parse("2023-06-01T06").unwrap(),
        flength: 24,
        resolution_km: 12,
    }
}

fn namelist(root: &ModelRoot, rel: &str) -> Namelist {
    Namelist::parse(&root.read(rel), rel).unwrap()
}

fn streams(root: &ModelRoot, rel: &str) -> Streams {
    Streams::parse(&root.read(rel), rel).unwrap()
}

fn text(value: &str) -> Option<NamelistValue> {
    Some(NamelistValue::Text(value.to_string()))
}

#[test]
fn test_wps_namelist_window() {
    let root = ModelRoot::new();
    Stage::Wps.prepare(&params(&root)).unwrap();

    let nml = namelist(&root, layout::NAMELIST_WPS);
    assert_eq!(nml.get("share", "start_date").unwrap(), text("2023-06-01_06:00:00"));
    assert_eq!(nml.get("share", "end_date").unwrap(), text("2023-06-02_06:00:00"));
    assert_eq!(
        nml.get("share", "interval_seconds").unwrap(),
        Some(NamelistValue::Integer(3600))
    );
    // Untouched groups survive
    assert_eq!(
        nml.get("geogrid", "map_proj").unwrap(),
        text("lambert")
    );
}

#[test]
fn test_initial_conditions() {
    let root = ModelRoot::new();
    Stage::InitialConditions.prepare(&params(&root)).unwrap();

    let s = streams(&root, layout::STREAMS_INIT);
    assert_eq!(
        s.attribute("input", "filename_template").unwrap().as_deref(),
        Some("colorado12km.static.nc")
    );
    assert_eq!(
        s.attribute("output", "filename_template").unwrap().as_deref(),
        Some("colorado12km.init.nc")
    );

    let nml = namelist(&root, layout::NAMELIST_INIT);
    assert_eq!(
        nml.get("nhyd_model", "config_init_case").unwrap(),
        Some(NamelistValue::Integer(7))
    );
    assert_eq!(
        nml.get("nhyd_model", "config_start_time").unwrap(),
        text("2023-06-01_06:00:00")
    );
    assert_eq!(
        nml.get("nhyd_model", "config_stop_time").unwrap(),
        text("2023-06-02_06:00:00")
    );
    assert_eq!(
        nml.get("dimensions", "config_nfglevels").unwrap(),
        Some(NamelistValue::Integer(38))
    );
    assert_eq!(
        nml.get("vertical_grid", "config_blend_bdy_terrain").unwrap(),
        Some(NamelistValue::Logical(true))
    );
    assert_eq!(
        nml.get("preproc_stages", "config_static_interp").unwrap(),
        Some(NamelistValue::Logical(false))
    );
    assert_eq!(
        nml.get("preproc_stages", "config_met_interp").unwrap(),
        Some(NamelistValue::Logical(true))
    );
    assert_eq!(
        nml.get("decomposition", "config_block_decomp_file_prefix").unwrap(),
        text("colorado12km.graph.info.part.")
    );
}

#[test]
fn test_boundary_conditions_follow_initial_conditions() {
    let root = ModelRoot::new();
    let params = params(&root);
    Stage::InitialConditions.prepare(&params).unwrap();
    Stage::BoundaryConditions.prepare(&params).unwrap();

    let s = streams(&root, layout::STREAMS_INIT);
    assert_eq!(
        s.attribute("input", "filename_template").unwrap().as_deref(),
        Some("colorado12km.init.nc")
    );
    assert_eq!(
        s.attribute("output", "filename_template").unwrap().as_deref(),
        Some("colorado12km.foo.nc")
    );
    assert_eq!(
        s.attribute("lbc", "output_interval").unwrap().as_deref(),
        Some("1:00:00")
    );

    let nml = namelist(&root, layout::NAMELIST_INIT);
    assert_eq!(
        nml.get("nhyd_model", "config_init_case").unwrap(),
        Some(NamelistValue::Integer(9))
    );
    assert_eq!(
        nml.get("vertical_grid", "config_blend_bdy_terrain").unwrap(),
        Some(NamelistValue::Logical(false))
    );
    assert_eq!(
        nml.get("data_sources", "config_fg_interval").unwrap(),
        Some(NamelistValue::Integer(3600))
    );
    assert_eq!(nml.get("data_sources", "config_met_prefix").unwrap(), text("FILE"));
    // Keys the stage does not own are kept
    assert_eq!(nml.get("data_sources", "config_sfc_prefix").unwrap(), text("SST"));
}

#[test]
fn test_forecast_run() {
    let root = ModelRoot::new();
    Stage::Forecast.prepare(&params(&root)).unwrap();

    let s = streams(&root, layout::STREAMS_RUN);
    assert_eq!(
        s.attribute("input", "filename_template").unwrap().as_deref(),
        Some("colorado12km.init.nc")
    );
    assert_eq!(
        s.attribute("lbc_in", "input_interval").unwrap().as_deref(),
        Some("1:00:00")
    );
    assert_eq!(
        s.attribute("diagnostics", "output_interval").unwrap().as_deref(),
        Some("3:00:00")
    );

    let nml = namelist(&root, layout::NAMELIST_RUN);
    assert_eq!(
        nml.get("nhyd_model", "config_run_duration").unwrap(),
        text("1_00:00:00")
    );
    assert_eq!(
        nml.get("nhyd_model", "config_dt").unwrap(),
        Some(NamelistValue::Real(72.0))
    );
    assert_eq!(
        nml.get("nhyd_model", "config_len_disp").unwrap(),
        Some(NamelistValue::Real(12000.0))
    );
    assert_eq!(
        nml.get("limited_area", "config_apply_lbcs").unwrap(),
        Some(NamelistValue::Logical(true))
    );
    assert!(root
        .read(layout::NAMELIST_RUN)
        .contains("    config_dt = 72.0\n"));
}

#[test]
fn test_short_forecast_duration() {
    let root = ModelRoot::new();
    let mut params = params(&root);
    params.flength = 6;
    stages::prep_run_namelist(&params).unwrap();

    let nml = namelist(&root, layout::NAMELIST_RUN);
    assert_eq!(
        nml.get("nhyd_model", "config_run_duration").unwrap(),
        text("0_06:00:00")
    );
}

#[test]
fn test_missing_group_is_a_config_error() {
    let root = ModelRoot::new();
    root.write(layout::NAMELIST_RUN, "&nhyd_model\n    config_dt = 720.0\n/\n");

    let err = stages::prep_run_namelist(&params(&root)).unwrap_err();

    assert!(matches!(
        err,
        RunError::Config(ConfigError::MissingGroup { ref group, .. }) if group == "limited_area"
    ));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_missing_file_is_a_config_error() {
    let root = ModelRoot::new();
    std::fs::remove_file(root.path().join(layout::STREAMS_RUN)).unwrap();

    let err = stages::prep_run_streams(&params(&root)).unwrap_err();

    assert!(matches!(err, RunError::Config(ConfigError::Io { .. })));
}
