//! Geographic extent of MPAS limited-area meshes.
//!
//! The GRIB subset fetched for a regional run must cover the whole mesh.
//! MPAS stores vertex coordinates as `latVertex`/`lonVertex` in radians with
//! longitudes in `0..2π`; this crate turns them into a [`BoundingBox`] in
//! degrees with longitudes in `-180..180`.
//!
//! # Implementation Notes
//!
//! By default the coordinates are read with the `ncdump` command-line tool.
//! Enabling the `netcdf` feature reads them directly through libnetcdf.

pub mod error;
pub mod ncdump;
#[cfg(feature = "netcdf")]
pub mod native;

use std::path::Path;

use forecast_common::BoundingBox;
use tracing::debug;

pub use error::{MeshError, MeshResult};

/// Name of the vertex latitude variable.
pub const LAT_VERTEX: &str = "latVertex";
/// Name of the vertex longitude variable.
pub const LON_VERTEX: &str = "lonVertex";

/// Convert a longitude in degrees from `0..360` to `-180..180`.
pub fn normalize_lon(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}

/// Bounding box of the given vertex coordinates (radians).
pub fn vertex_extent(lat_rad: &[f64], lon_rad: &[f64]) -> MeshResult<BoundingBox> {
    if lat_rad.len() != lon_rad.len() {
        return Err(MeshError::InvalidFormat(format!(
            "{} has {} values but {} has {}",
            LAT_VERTEX,
            lat_rad.len(),
            LON_VERTEX,
            lon_rad.len()
        )));
    }
    if lat_rad.is_empty() {
        return Err(MeshError::MissingData("mesh has no vertices".to_string()));
    }

    let mut extent = BoundingBox::new(f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for (&lat, &lon) in lat_rad.iter().zip(lon_rad) {
        if !lat.is_finite() || !lon.is_finite() {
            continue;
        }
        let lat = lat.to_degrees();
        let lon = normalize_lon(lon.to_degrees());
        extent.west = extent.west.min(lon);
        extent.east = extent.east.max(lon);
        extent.south = extent.south.min(lat);
        extent.north = extent.north.max(lat);
    }

    if extent.west > extent.east {
        return Err(MeshError::InvalidFormat(
            "mesh has no finite vertex coordinates".to_string(),
        ));
    }
    Ok(extent)
}

/// Read the vertex extent of the mesh file at `path`.
pub fn read_mesh_extent(path: &Path) -> MeshResult<BoundingBox> {
    if !path.exists() {
        return Err(MeshError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("mesh file {} not found", path.display()),
        )));
    }

    #[cfg(feature = "netcdf")]
    let (lat, lon) = native::read_vertex_coordinates(path)?;
    #[cfg(not(feature = "netcdf"))]
    let (lat, lon) = ncdump::read_vertex_coordinates(path)?;

    let extent = vertex_extent(&lat, &lon)?;
    debug!(
        path = %path.display(),
        vertices = lat.len(),
        extent = %extent,
        "Computed mesh extent"
    );
    Ok(extent)
}
