//! Bounding box types and operations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A geographic bounding box used to request a spatial subset of model output.
///
/// Coordinates are in degrees. Longitudes follow the -180..180 convention
/// expected by the NOMADS filter service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Default regional extent (western and central North America).
    pub const DEFAULT: BoundingBox = BoundingBox {
        west: -135.0,
        east: -80.0,
        south: 20.0,
        north: 60.0,
    };

    /// Create a new bounding box from its four edges.
    pub fn new(west: f64, east: f64, south: f64, north: f64) -> Self {
        Self {
            west,
            east,
            south,
            north,
        }
    }

    /// Build a bounding box from `(lon_min, lon_max)` and `(lat_min, lat_max)` ranges.
    pub fn from_ranges(lon: (f64, f64), lat: (f64, f64)) -> Self {
        Self::new(lon.0, lon.1, lat.0, lat.1)
    }

    /// Grow the box by `margin` degrees on every side.
    pub fn buffered(&self, margin: f64) -> Self {
        Self {
            west: self.west - margin,
            east: self.east + margin,
            south: self.south - margin,
            north: self.north + margin,
        }
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Check that edges are ordered and latitudes are on the globe.
    pub fn validate(&self) -> Result<(), BboxParseError> {
        let values = [self.west, self.east, self.south, self.north];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(BboxParseError::OutOfRange(self.to_string()));
        }
        if self.west >= self.east || self.south >= self.north {
            return Err(BboxParseError::Inverted(self.to_string()));
        }
        if self.south < -90.0 || self.north > 90.0 {
            return Err(BboxParseError::OutOfRange(self.to_string()));
        }
        Ok(())
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.east, self.south, self.north)
    }
}

/// Parse "west,east,south,north", the order used on the command line.
impl FromStr for BoundingBox {
    type Err = BboxParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |p: &str| -> Result<f64, BboxParseError> {
            p.parse()
                .map_err(|_| BboxParseError::InvalidNumber(p.to_string()))
        };

        let bbox = Self::new(
            parse(parts[0])?,
            parse(parts[1])?,
            parse(parts[2])?,
            parse(parts[3])?,
        );
        bbox.validate()?;
        Ok(bbox)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid extent format: {0}. Expected 'west,east,south,north'")]
    InvalidFormat(String),

    #[error("Invalid number in extent: {0}")]
    InvalidNumber(String),

    #[error("Extent edges are inverted: {0}")]
    Inverted(String),

    #[error("Extent is outside the globe: {0}")]
    OutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered() {
        let bbox = BoundingBox::new(-110.0, -100.0, 35.0, 42.0).buffered(1.0);
        assert_eq!(bbox, BoundingBox::new(-111.0, -99.0, 34.0, 43.0));
    }

    #[test]
    fn test_display_uses_short_floats() {
        let bbox = BoundingBox::new(-125.0, -87.5, 25.0, 52.0);
        assert_eq!(bbox.to_string(), "-125,-87.5,25,52");
    }
}
