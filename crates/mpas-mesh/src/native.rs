//! Native vertex coordinate reading using the netcdf library.

use std::path::Path;

use crate::error::{MeshError, MeshResult};
use crate::{LAT_VERTEX, LON_VERTEX};

/// Read `(latVertex, lonVertex)` from a mesh file.
pub fn read_vertex_coordinates(path: &Path) -> MeshResult<(Vec<f64>, Vec<f64>)> {
    let file = netcdf::open(path)
        .map_err(|e| MeshError::InvalidFormat(format!("Failed to open NetCDF: {}", e)))?;

    Ok((read_f64(&file, LAT_VERTEX)?, read_f64(&file, LON_VERTEX)?))
}

fn read_f64(file: &netcdf::File, name: &str) -> MeshResult<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| MeshError::MissingData(format!("{} variable", name)))?;
    let values: Vec<f64> = var
        .get_values(..)
        .map_err(|e| MeshError::InvalidFormat(format!("Failed to read {}: {}", name, e)))?;
    Ok(values)
}
