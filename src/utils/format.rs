//! Number formatting shared by POI strings, file names and text outputs.

/// Shortest representation that round-trips (`1`, `-0.5`, `0.0001`).
/// Negative zero prints as `0` so that fixed parameters never read `p=-0`.
pub fn fmt_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}

/// Scanned and seeded POI values inside `-p` strings.
pub fn fmt_poi_value(value: f64) -> String {
    format!("{:.6}", value)
}

/// Scan point values inside file and job names.
pub fn fmt_tag_value(value: f64) -> String {
    format!("{:.4}", value)
}

/// Evenly spaced grid including both ends; a single point sits at `min`.
pub fn linspace(n: usize, min: f64, max: f64) -> Vec<f64> {
    if n <= 1 {
        return vec![min];
    }
    let step = (max - min) / (n - 1) as f64;
    (0..n).map(|i| min + i as f64 * step).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_number() {
        assert_eq!(fmt_number(1.0), "1");
        assert_eq!(fmt_number(-3.0), "-3");
        assert_eq!(fmt_number(0.0001), "0.0001");
        assert_eq!(fmt_number(-0.0), "0");
        assert_eq!(fmt_number(2.5), "2.5");
    }

    #[test]
    fn test_fixed_formats() {
        assert_eq!(fmt_poi_value(0.5), "0.500000");
        assert_eq!(fmt_poi_value(-1.25), "-1.250000");
        assert_eq!(fmt_tag_value(-0.3), "-0.3000");
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(1, -1.0, 1.0), vec![-1.0]);
        assert_eq!(linspace(0, 2.0, 3.0), vec![2.0]);
        let grid = linspace(5, -1.0, 1.0);
        assert_eq!(grid.len(), 5);
        assert_eq!(grid[0], -1.0);
        assert_eq!(grid[2], 0.0);
        assert_eq!(grid[4], 1.0);
    }

    #[test]
    fn test_linspace_descending() {
        let grid = linspace(3, 0.0, -2.0);
        assert_eq!(grid, vec![0.0, -1.0, -2.0]);
    }
}
