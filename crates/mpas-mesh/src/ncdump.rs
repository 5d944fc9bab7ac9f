//! Vertex coordinate reading through the `ncdump` command-line tool.
//!
//! Slower than the native reader but needs nothing beyond the NetCDF
//! utilities that every WPS/MPAS installation already has on `PATH`.

use std::path::Path;
use std::process::Command;

use crate::error::{MeshError, MeshResult};
use crate::{LAT_VERTEX, LON_VERTEX};

/// Read `(latVertex, lonVertex)` from a mesh file using `ncdump -v`.
pub fn read_vertex_coordinates(path: &Path) -> MeshResult<(Vec<f64>, Vec<f64>)> {
    let output = Command::new("ncdump")
        .arg("-v")
        .arg(format!("{},{}", LAT_VERTEX, LON_VERTEX))
        .arg(path)
        .output()
        .map_err(|e| MeshError::CommandError(format!("Failed to run ncdump: {}", e)))?;

    if !output.status.success() {
        return Err(MeshError::CommandError(format!(
            "ncdump failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let cdl = String::from_utf8_lossy(&output.stdout);
    Ok((
        parse_cdl_variable(&cdl, LAT_VERTEX)?,
        parse_cdl_variable(&cdl, LON_VERTEX)?,
    ))
}

/// Extract the values of `name` from the `data:` section of CDL text.
///
/// Fill values (`_`) are returned as NaN.
pub fn parse_cdl_variable(cdl: &str, name: &str) -> MeshResult<Vec<f64>> {
    let data = cdl
        .split_once("\ndata:")
        .map(|(_, data)| data)
        .ok_or_else(|| MeshError::InvalidFormat("CDL output has no data section".to_string()))?;

    let start = data
        .lines()
        .scan(0usize, |offset, line| {
            let line_start = *offset;
            *offset += line.len() + 1;
            Some((line_start, line))
        })
        .find_map(|(line_start, line)| {
            let (lhs, _) = line.split_once('=')?;
            (lhs.trim() == name).then(|| line_start + line.find('=').unwrap_or(0) + 1)
        })
        .ok_or_else(|| MeshError::MissingData(format!("{} variable", name)))?;

    let body = &data[start..];
    let end = body
        .find(';')
        .ok_or_else(|| MeshError::InvalidFormat(format!("{} values are not terminated", name)))?;

    body[..end]
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            if token == "_" {
                return Ok(f64::NAN);
            }
            token
                .trim_end_matches(|c| matches!(c, 'f' | 'F'))
                .parse::<f64>()
                .map_err(|_| MeshError::InvalidFormat(format!("bad {} value '{}'", name, token)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CDL: &str = "netcdf colorado12km.static {
dimensions:
\tnVertices = 4 ;
variables:
\tdouble latVertex(nVertices) ;
\tdouble lonVertex(nVertices) ;
data:

 latVertex = 0.59, 0.6, 
    0.61, _ ;

 lonVertex = 4.43, 4.44, 4.45, 4.46 ;
}
";

    #[test]
    fn test_parse_variables() {
        let lat = parse_cdl_variable(CDL, "latVertex").unwrap();
        assert_eq!(lat.len(), 4);
        assert_eq!(&lat[..3], &[0.59, 0.6, 0.61]);
        assert!(lat[3].is_nan());

        let lon = parse_cdl_variable(CDL, "lonVertex").unwrap();
        assert_eq!(lon, vec![4.43, 4.44, 4.45, 4.46]);
    }

    #[test]
    fn test_header_declaration_not_matched() {
        let header_only = "netcdf x {\nvariables:\n\tdouble latVertex(nVertices) ;\n}\n";
        assert!(matches!(
            parse_cdl_variable(header_only, "latVertex"),
            Err(MeshError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_variable() {
        assert!(matches!(
            parse_cdl_variable(CDL, "xVertex"),
            Err(MeshError::MissingData(_))
        ));
    }
}
