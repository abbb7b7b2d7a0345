//! Best fit and confidence intervals of a one-dimensional likelihood profile.

/// 2ΔNLL thresholds for one degree of freedom.
pub const CL68_1D: f64 = 1.0;
pub const CL95_1D: f64 = 3.84;

/// Interval edges; `None` when the profile never crosses the threshold on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Interval {
    pub lo: Option<f64>,
    pub hi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile1d {
    pub best_fit: f64,
    /// `(value, 2ΔNLL)` sorted by value, shifted so the minimum is zero.
    pub curve: Vec<(f64, f64)>,
    pub cl68: Interval,
    pub cl95: Interval,
}

/// Builds the profile from `(value, ΔNLL)` points.
pub fn profile_1d(points: &[(f64, f64)]) -> Option<Profile1d> {
    let mut sorted: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let min = sorted.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let curve: Vec<(f64, f64)> = sorted.iter().map(|(x, y)| (*x, 2.0 * (y - min))).collect();
    let best = curve
        .iter()
        .enumerate()
        .min_by(|a, b| a.1 .1.total_cmp(&b.1 .1))
        .map(|(i, _)| i)?;

    Some(Profile1d {
        best_fit: curve[best].0,
        cl68: crossings(&curve, best, CL68_1D),
        cl95: crossings(&curve, best, CL95_1D),
        curve,
    })
}

fn crossings(curve: &[(f64, f64)], best: usize, threshold: f64) -> Interval {
    let lo = (0..best)
        .rev()
        .find(|&i| curve[i].1 >= threshold)
        .map(|i| interpolate(curve[i], curve[i + 1], threshold));
    let hi = (best + 1..curve.len())
        .find(|&i| curve[i].1 >= threshold)
        .map(|i| interpolate(curve[i - 1], curve[i], threshold));
    Interval { lo, hi }
}

fn interpolate(a: (f64, f64), b: (f64, f64), level: f64) -> f64 {
    if (b.1 - a.1).abs() < f64::EPSILON {
        return a.0;
    }
    a.0 + (level - a.1) * (b.0 - a.0) / (b.1 - a.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parabola() -> Vec<(f64, f64)> {
        (0..=12)
            .map(|i| {
                let x = -3.0 + 0.5 * i as f64;
                (x, 0.5 * x * x + 7.0)
            })
            .collect()
    }

    #[test]
    fn test_parabola_intervals() {
        let profile = profile_1d(&parabola()).unwrap();
        assert_eq!(profile.best_fit, 0.0);
        assert_eq!(profile.cl68.lo, Some(-1.0));
        assert_eq!(profile.cl68.hi, Some(1.0));

        let hi95 = profile.cl95.hi.unwrap();
        assert!((hi95 - (1.5 + 1.59 * 0.5 / 1.75)).abs() < 1e-9);
        assert!((profile.cl95.lo.unwrap() + hi95).abs() < 1e-9);
        assert!(profile.curve.iter().all(|(_, y)| *y >= 0.0));
    }

    #[test]
    fn test_open_interval_and_unsorted_input() {
        let points = vec![(2.0, 0.4), (0.0, 0.0), (1.0, 0.1), (-1.0, 2.5)];
        let profile = profile_1d(&points).unwrap();
        assert_eq!(profile.best_fit, 0.0);
        assert!(profile.cl68.lo.is_some());
        assert_eq!(profile.cl68.hi, None);
        assert!(profile_1d(&[]).is_none());
    }
}
