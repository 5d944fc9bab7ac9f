//! Namelist and streams preparation for each model stage.
//!
//! Every stage edits its files in place under the root directory; only the
//! values listed here change, the rest of each file is written back as read.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use forecast_common::{namelist_date, run_duration, InitDate};
use mpas_config::{Namelist, NamelistValue, Streams};
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::layout;
use crate::error::RunResult;

/// Seconds between lateral boundary condition updates.
pub const LBC_INTERVAL_SECONDS: i64 = 3600;
/// The same interval as written in streams files.
pub const LBC_INTERVAL: &str = "1:00:00";

/// Init case for real-data initial conditions.
pub const INIT_CASE_IC: i64 = 7;
/// Init case for lateral boundary conditions.
pub const INIT_CASE_LBC: i64 = 9;

/// Preprocessing steps run by `init_atmosphere` when the static fields
/// already exist.
pub const PREPROC_STAGES: [(&str, bool); 6] = [
    ("config_static_interp", false),
    ("config_native_gwd_static", false),
    ("config_vertical_grid", true),
    ("config_met_interp", true),
    ("config_input_sst", false),
    ("config_frac_seaice", true),
];

/// A model stage that is prepared by editing files and then run by a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Wps,
    InitialConditions,
    BoundaryConditions,
    Forecast,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Wps,
        Stage::InitialConditions,
        Stage::BoundaryConditions,
        Stage::Forecast,
    ];

    /// Script in `scripts/` that runs this stage.
    pub fn script(&self) -> &'static str {
        match self {
            Self::Wps => "run_wps.sh",
            Self::InitialConditions | Self::BoundaryConditions => "run_init_atmosphere.sh",
            Self::Forecast => "run_atmosphere.sh",
        }
    }

    /// Edit the configuration files this stage reads.
    pub fn prepare(&self, params: &StageParams) -> RunResult<()> {
        match self {
            Self::Wps => update_wps_namelist(params),
            Self::InitialConditions => {
                prep_initial_streams(params)?;
                prep_initial_namelist(params)
            }
            Self::BoundaryConditions => {
                prep_lbc_streams(params)?;
                prep_lbc_namelist(params)
            }
            Self::Forecast => {
                prep_run_streams(params)?;
                prep_run_namelist(params)
            }
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wps => "wps",
            Self::InitialConditions => "initial_conditions",
            Self::BoundaryConditions => "boundary_conditions",
            Self::Forecast => "forecast",
        };
        f.write_str(name)
    }
}

/// Everything stage preparation needs to know about the run.
#[derive(Debug, Clone)]
pub struct StageParams {
    pub root_dir: PathBuf,
    pub domain: String,
    pub init_date: InitDate,
    pub flength: u32,
    pub resolution_km: u32,
}

impl StageParams {
    fn path(&self, relative: &str) -> PathBuf {
        self.root_dir.join(relative)
    }

    fn start(&self) -> DateTime<Utc> {
        self.init_date.datetime()
    }

    fn end(&self) -> DateTime<Utc> {
        self.init_date.valid_time(self.flength)
    }

    fn decomp_prefix(&self) -> String {
        format!("{}.graph.info.part.", self.domain)
    }
}

/// `tools/WPS-4.4/namelist.wps`: run window and hourly input interval.
#[instrument(skip_all, fields(init_date = %params.init_date))]
pub fn update_wps_namelist(params: &StageParams) -> RunResult<()> {
    edit_namelist(&params.path(layout::NAMELIST_WPS), |nml| {
        nml.update(
            "share",
            &[
                ("start_date", namelist_date(params.start()).into()),
                ("end_date", namelist_date(params.end()).into()),
                ("interval_seconds", LBC_INTERVAL_SECONDS.into()),
            ],
        )
    })
}

/// `streams.init_atmosphere` for initial conditions: static mesh in, init file out.
pub fn prep_initial_streams(params: &StageParams) -> RunResult<()> {
    edit_streams(&params.path(layout::STREAMS_INIT), |streams| {
        streams.set_attribute(
            "input",
            "filename_template",
            &format!("{}.static.nc", params.domain),
        )?;
        streams.set_attribute(
            "output",
            "filename_template",
            &format!("{}.init.nc", params.domain),
        )
    })
}

/// `namelist.init_atmosphere` for initial conditions (case 7).
#[instrument(skip_all, fields(domain = %params.domain))]
pub fn prep_initial_namelist(params: &StageParams) -> RunResult<()> {
    edit_namelist(&params.path(layout::NAMELIST_INIT), |nml| {
        set_init_window(nml, params, INIT_CASE_IC)?;
        nml.update(
            "dimensions",
            &[
                ("config_nvertlevels", 55.into()),
                ("config_nsoillevels", 4.into()),
                ("config_nfglevels", 38.into()),
                ("config_nfgsoillevels", 4.into()),
            ],
        )?;
        nml.set("vertical_grid", "config_blend_bdy_terrain", true)?;
        nml.replace_group("preproc_stages", &preproc_stages())?;
        nml.set(
            "decomposition",
            "config_block_decomp_file_prefix",
            params.decomp_prefix(),
        )
    })
}

/// `streams.init_atmosphere` for boundary conditions: init file in, hourly LBCs out.
pub fn prep_lbc_streams(params: &StageParams) -> RunResult<()> {
    edit_streams(&params.path(layout::STREAMS_INIT), |streams| {
        streams.set_attribute(
            "input",
            "filename_template",
            &format!("{}.init.nc", params.domain),
        )?;
        // The output stream is not used by case 9; point it away from the init file
        streams.set_attribute(
            "output",
            "filename_template",
            &format!("{}.foo.nc", params.domain),
        )?;
        streams.set_attribute("lbc", "output_interval", LBC_INTERVAL)
    })
}

/// `namelist.init_atmosphere` for boundary conditions (case 9).
#[instrument(skip_all, fields(domain = %params.domain))]
pub fn prep_lbc_namelist(params: &StageParams) -> RunResult<()> {
    edit_namelist(&params.path(layout::NAMELIST_INIT), |nml| {
        set_init_window(nml, params, INIT_CASE_LBC)?;
        nml.set("vertical_grid", "config_blend_bdy_terrain", false)?;
        nml.replace_group("preproc_stages", &preproc_stages())?;
        nml.update(
            "data_sources",
            &[
                ("config_fg_interval", LBC_INTERVAL_SECONDS.into()),
                ("config_met_prefix", "FILE".into()),
            ],
        )?;
        nml.set(
            "decomposition",
            "config_block_decomp_file_prefix",
            params.decomp_prefix(),
        )
    })
}

/// `streams.atmosphere`: init file in, hourly LBCs read.
pub fn prep_run_streams(params: &StageParams) -> RunResult<()> {
    edit_streams(&params.path(layout::STREAMS_RUN), |streams| {
        streams.set_attribute(
            "input",
            "filename_template",
            &format!("{}.init.nc", params.domain),
        )?;
        streams.set_attribute("lbc_in", "input_interval", LBC_INTERVAL)
    })
}

/// `namelist.atmosphere`: run window, time step and limited-area boundaries.
#[instrument(skip_all, fields(domain = %params.domain, resolution_km = params.resolution_km))]
pub fn prep_run_namelist(params: &StageParams) -> RunResult<()> {
    let resolution = params.resolution_km as f64;
    edit_namelist(&params.path(layout::NAMELIST_RUN), |nml| {
        nml.update(
            "nhyd_model",
            &[
                ("config_start_time", namelist_date(params.start()).into()),
                (
                    "config_run_duration",
                    run_duration(Duration::hours(params.flength as i64)).into(),
                ),
                // 6 s per km is the MPAS guidance for a stable time step
                ("config_dt", (6.0 * resolution).into()),
                ("config_len_disp", (1000.0 * resolution).into()),
            ],
        )?;
        nml.set("limited_area", "config_apply_lbcs", true)?;
        nml.set(
            "decomposition",
            "config_block_decomp_file_prefix",
            params.decomp_prefix(),
        )
    })
}

fn set_init_window(
    nml: &mut Namelist,
    params: &StageParams,
    case: i64,
) -> mpas_config::ConfigResult<()> {
    nml.update(
        "nhyd_model",
        &[
            ("config_init_case", case.into()),
            ("config_start_time", namelist_date(params.start()).into()),
            ("config_stop_time", namelist_date(params.end()).into()),
        ],
    )
}

fn preproc_stages() -> Vec<(&'static str, NamelistValue)> {
    PREPROC_STAGES
        .iter()
        .map(|&(key, enabled)| (key, NamelistValue::from(enabled)))
        .collect()
}

fn edit_namelist<F>(path: &Path, edit: F) -> RunResult<()>
where
    F: FnOnce(&mut Namelist) -> mpas_config::ConfigResult<()>,
{
    let mut nml = Namelist::from_path(path)?;
    edit(&mut nml)?;
    nml.write(path)?;
    info!(path = %path.display(), "Updated namelist");
    Ok(())
}

fn edit_streams<F>(path: &Path, edit: F) -> RunResult<()>
where
    F: FnOnce(&mut Streams) -> mpas_config::ConfigResult<()>,
{
    let mut streams = Streams::from_path(path)?;
    edit(&mut streams)?;
    streams.write(path)?;
    info!(path = %path.display(), "Updated streams");
    Ok(())
}
