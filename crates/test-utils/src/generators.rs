//! Generators for synthetic archive contents.
//!
//! Fields use the archive layout `[time][lat][lon]` with longitudes running
//! 0°..360°, i.e. before any rewrap.

/// Creates a 2D grid where each cell is `col * 1000 + row`.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a `[time][lat][lon]` series from a per-cell function `f(t, y, x)`.
pub fn create_field_series(
    nx: usize,
    ny: usize,
    nt: usize,
    f: impl Fn(usize, usize, usize) -> f32,
) -> Vec<f32> {
    let mut data = Vec::with_capacity(nx * ny * nt);
    for t in 0..nt {
        for y in 0..ny {
            for x in 0..nx {
                data.push(f(t, y, x));
            }
        }
    }
    data
}

/// Creates a series with every value set to `value`.
pub fn create_constant_series(nx: usize, ny: usize, nt: usize, value: f32) -> Vec<f32> {
    vec![value; nx * ny * nt]
}

/// Temperatures in Kelvin, warmest at the equator and rising by 0.1 K per day.
pub fn create_temperature_series(nx: usize, ny: usize, nt: usize) -> Vec<f32> {
    create_field_series(nx, ny, nt, |t, y, _| {
        let lat_frac = if ny > 1 { y as f32 / (ny - 1) as f32 } else { 0.5 };
        let equator_distance = (lat_frac - 0.5).abs() * 2.0;
        300.0 - 50.0 * equator_distance + 0.1 * t as f32
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_series_order() {
        let data = create_field_series(3, 2, 2, |t, y, x| (t * 100 + y * 10 + x) as f32);
        assert_eq!(data.len(), 12);
        assert_eq!(data[4], 11.0);
        assert_eq!(data[6], 100.0);
    }

    #[test]
    fn test_temperature_series_range() {
        let data = create_temperature_series(8, 9, 3);
        assert!(data.iter().all(|v| (250.0..=301.0).contains(v)));
    }
}
