//! Generators for synthetic MPAS mesh vertex coordinates.
//!
//! MPAS stores `latVertex`/`lonVertex` in radians with longitudes in
//! `0..2π`, so the generators produce the same convention.

/// Creates a regular lattice of vertex coordinates covering the given
/// extent, returned as `(lat_vertex, lon_vertex)` in radians.
///
/// Longitudes are given in degrees east in the -180..180 convention and are
/// shifted into `0..360` before conversion, as MPAS writes them.
///
/// # Example
///
/// ```
/// use test_utils::create_vertex_lattice;
///
/// let (lat, lon) = create_vertex_lattice((-110.0, -100.0), (35.0, 42.0), 5, 4);
/// assert_eq!(lat.len(), 20);
/// assert_eq!(lon.len(), 20);
/// ```
pub fn create_vertex_lattice(
    lon_range: (f64, f64),
    lat_range: (f64, f64),
    nx: usize,
    ny: usize,
) -> (Vec<f64>, Vec<f64>) {
    let mut lat = Vec::with_capacity(nx * ny);
    let mut lon = Vec::with_capacity(nx * ny);

    for j in 0..ny {
        let frac_y = if ny > 1 { j as f64 / (ny - 1) as f64 } else { 0.0 };
        let lat_deg = lat_range.0 + frac_y * (lat_range.1 - lat_range.0);
        for i in 0..nx {
            let frac_x = if nx > 1 { i as f64 / (nx - 1) as f64 } else { 0.0 };
            let lon_deg = lon_range.0 + frac_x * (lon_range.1 - lon_range.0);
            lat.push(lat_deg.to_radians());
            lon.push(lon_deg.rem_euclid(360.0).to_radians());
        }
    }

    (lat, lon)
}
