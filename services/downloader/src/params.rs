//! Remote request and local filename construction for GFS GRIB fetches.
//!
//! Two sources are supported:
//! - [`GribSource::Filtered`]: the NOMADS `filter_gfs_0p25_1hr.pl` CGI, which
//!   cuts the 0.25° hourly output down to a bounding box server side.
//! - [`GribSource::Global0p50`]: full 0.5° global files every 3 hours from
//!   the NOMADS production directory.

use forecast_common::{BoundingBox, InitDate, ModelCycle};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// NOMADS grib filter for hourly 0.25° GFS output.
pub const FILTER_URL: &str = "https://nomads.ncep.noaa.gov/cgi-bin/filter_gfs_0p25_1hr.pl";

/// NOMADS production directory for full GFS files.
pub const GLOBAL_URL: &str = "https://nomads.ncep.noaa.gov/pub/data/nccf/com/gfs/prod";

/// Model name used in local filenames.
pub const MODEL: &str = "gfs";

/// Where GRIB files are fetched from.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum GribSource {
    /// Bounding-box subset of the 0.25° hourly output
    #[default]
    Filtered,
    /// Full 0.5° global files, 3-hourly
    #[value(name = "global0p50")]
    #[serde(rename = "global0p50")]
    Global0p50,
}

impl GribSource {
    /// Default base URL for this source.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Filtered => FILTER_URL,
            Self::Global0p50 => GLOBAL_URL,
        }
    }

    /// Hours between available forecast files.
    pub fn step_hours(&self) -> u32 {
        match self {
            Self::Filtered => 1,
            Self::Global0p50 => 3,
        }
    }

    /// Forecast hours to fetch for a run of `flength` hours, inclusive.
    pub fn forecast_hours(&self, flength: u32) -> Vec<u32> {
        (0..=flength).step_by(self.step_hours() as usize).collect()
    }
}

/// One remote resource and the local file it is stored as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,
    pub filename: String,
}

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("Invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },
}

/// Builds [`FetchRequest`]s for one source and base URL.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    source: GribSource,
    base_url: Url,
}

impl RequestBuilder {
    /// Create a builder, using the source's NOMADS URL unless `base_url` is given.
    pub fn new(source: GribSource, base_url: Option<&str>) -> Result<Self, ParamsError> {
        let raw = base_url.unwrap_or_else(|| source.default_base_url());
        let invalid = |message: String| ParamsError::InvalidBaseUrl {
            url: raw.to_string(),
            message,
        };

        let base_url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("not a hierarchical URL".to_string()));
        }

        Ok(Self { source, base_url })
    }

    pub fn source(&self) -> GribSource {
        self.source
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Forecast hours to fetch for a run of `flength` hours.
    pub fn forecast_hours(&self, flength: u32) -> Vec<u32> {
        self.source.forecast_hours(flength)
    }

    pub fn build(
        &self,
        init_date: InitDate,
        cycle: ModelCycle,
        forecast_hour: u32,
        bbox: &BoundingBox,
    ) -> FetchRequest {
        match self.source {
            GribSource::Filtered => {
                build_fetch_params(&self.base_url, init_date, cycle, forecast_hour, bbox)
            }
            GribSource::Global0p50 => {
                build_global_params(&self.base_url, init_date, cycle, forecast_hour)
            }
        }
    }
}

/// Build the grib filter request for one forecast hour of a cycle.
///
/// Query parameters are always emitted in the same order, so identical
/// inputs produce byte-identical URLs. Bounding-box edges are passed through
/// unchanged; they must already be in the -180..180 convention.
pub fn build_fetch_params(
    base_url: &Url,
    init_date: InitDate,
    cycle: ModelCycle,
    forecast_hour: u32,
    bbox: &BoundingBox,
) -> FetchRequest {
    let mut url = base_url.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("file", &format!("gfs.t{}z.pgrb2.0p25.f{:03}", cycle, forecast_hour))
        .append_pair("all_lev", "on")
        .append_pair("all_var", "on")
        .append_pair("subregion", "")
        .append_pair("leftlon", &bbox.west.to_string())
        .append_pair("rightlon", &bbox.east.to_string())
        .append_pair("toplat", &bbox.north.to_string())
        .append_pair("bottomlat", &bbox.south.to_string())
        .append_pair("dir", &format!("/gfs.{}/{}/atmos", init_date.day_string(), cycle));

    FetchRequest {
        url,
        filename: local_filename(init_date, cycle, forecast_hour),
    }
}

/// Build the request for a full 0.5° global file.
pub fn build_global_params(
    base_url: &Url,
    init_date: InitDate,
    cycle: ModelCycle,
    forecast_hour: u32,
) -> FetchRequest {
    let mut url = base_url.clone();
    let path = format!(
        "{}/gfs.{}/{}/atmos/gfs.t{}z.pgrb2.0p50.f{:03}",
        base_url.path().trim_end_matches('/'),
        init_date.day_string(),
        cycle,
        cycle,
        forecast_hour
    );
    url.set_path(&path);
    url.set_query(None);

    FetchRequest {
        url,
        filename: local_filename(init_date, cycle, forecast_hour),
    }
}

/// Local file name: `gfs.t{cc}.f{hh}.{valid time}.grib2`.
pub fn local_filename(init_date: InitDate, cycle: ModelCycle, forecast_hour: u32) -> String {
    let valid = init_date.valid_time(forecast_hour);
    format!(
        "{}.t{}.f{:02}.{}.grib2",
        MODEL,
        cycle,
        forecast_hour,
        valid.format("%Y-%m-%dT%H:%M:%S")
    )
}

/// Valid time encoded in a local filename, if it follows [`local_filename`].
pub fn filename_valid_time(filename: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let stem = filename.strip_suffix(".grib2")?;
    let (_, stamp) = stem.split_once(".f")?;
    let (_, stamp) = stamp.split_once('.')?;
    let naive = chrono::NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S").ok()?;
    Some(naive.and_utc())
}
