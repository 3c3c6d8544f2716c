//! Regular latitude/longitude grids.

use serde::{Deserialize, Serialize};

/// Specification of a regular lat/lon grid in the canonical layout.
///
/// Locations are indexed row-major: latitude rows from south to north, each
/// row running west to east starting at `lon_min` (-180° after rewrap).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegularGrid {
    /// Number of points in longitude direction
    pub nx: usize,
    /// Number of points in latitude direction
    pub ny: usize,
    /// Latitude of the first row (degrees)
    pub lat_min: f32,
    /// Longitude of the first column (degrees)
    pub lon_min: f32,
    /// Cell size in longitude direction (degrees)
    pub dx: f32,
    /// Cell size in latitude direction (degrees)
    pub dy: f32,
}

impl RegularGrid {
    pub const fn new(nx: usize, ny: usize, lat_min: f32, lon_min: f32, dx: f32, dy: f32) -> Self {
        Self {
            nx,
            ny,
            lat_min,
            lon_min,
            dx,
            dy,
        }
    }

    /// Total number of grid points.
    pub fn count(&self) -> usize {
        self.nx * self.ny
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0
    }

    /// Get the 1D location index for a 2D grid position.
    pub fn flat_index(&self, x: usize, y: usize) -> usize {
        y * self.nx + x
    }

    /// Nearest location index for a coordinate.
    ///
    /// Longitudes are wrapped into the grid's range so both -170° and 190°
    /// resolve to the same column.
    pub fn find_point(&self, lat: f32, lon: f32) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let y = ((lat - self.lat_min) / self.dy).round();
        if y < 0.0 || y >= self.ny as f32 {
            return None;
        }
        let x = ((lon - self.lon_min) / self.dx).round() as isize;
        let x = x.rem_euclid(self.nx as isize) as usize;
        Some(self.flat_index(x, y as usize))
    }

    /// Coordinates (lat, lon) of a location index.
    pub fn coordinates(&self, index: usize) -> Option<(f32, f32)> {
        if index >= self.count() {
            return None;
        }
        let y = index / self.nx;
        let x = index % self.nx;
        Some((
            self.lat_min + y as f32 * self.dy,
            self.lon_min + x as f32 * self.dx,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quarter_degree() -> RegularGrid {
        RegularGrid::new(1440, 720, -90.0, -180.0, 0.25, 0.25)
    }

    #[test]
    fn test_count() {
        assert_eq!(quarter_degree().count(), 1440 * 720);
    }

    #[test]
    fn test_find_point_origin() {
        let grid = quarter_degree();
        assert_eq!(grid.find_point(-90.0, -180.0), Some(0));
        assert_eq!(grid.find_point(-90.0, -179.75), Some(1));
        assert_eq!(grid.find_point(-89.75, -180.0), Some(1440));
    }

    #[test]
    fn test_find_point_wraps_longitude() {
        let grid = quarter_degree();
        assert_eq!(grid.find_point(0.0, 190.0), grid.find_point(0.0, -170.0));
        assert_eq!(grid.find_point(0.0, 180.0), grid.find_point(0.0, -180.0));
    }

    #[test]
    fn test_find_point_out_of_range() {
        let grid = quarter_degree();
        assert_eq!(grid.find_point(95.0, 0.0), None);
    }

    #[test]
    fn test_coordinates_inverse() {
        let grid = quarter_degree();
        let index = grid.find_point(47.5, 8.5).unwrap();
        let (lat, lon) = grid.coordinates(index).unwrap();
        assert!((lat - 47.5).abs() < 1e-3);
        assert!((lon - 8.5).abs() < 1e-3);
        assert_eq!(grid.coordinates(grid.count()), None);
    }
}
