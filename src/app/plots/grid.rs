//! Binning of scattered 2D scan points and contour extraction.

/// ΔNLL levels for two degrees of freedom.
pub const CL68_2D: f64 = 1.15;
pub const CL95_2D: f64 = 3.0;
/// Lower bound applied to ΔNLL so log-scaled colours stay defined.
pub const DELTA_NLL_FLOOR: f64 = 0.001;

const TOLERANCE: f64 = 1e-9;

pub type Segment = ((f64, f64), (f64, f64));

/// Values on the grid spanned by the unique x and y coordinates.
/// `values[iy][ix]` is `None` where no point was scanned.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2d {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl Grid2d {
    /// Bins `(x, y, value)` points; duplicates keep the smallest value.
    pub fn from_points(points: &[(f64, f64, f64)]) -> Option<Self> {
        let finite: Vec<(f64, f64, f64)> = points
            .iter()
            .copied()
            .filter(|(x, y, v)| x.is_finite() && y.is_finite() && v.is_finite())
            .collect();
        if finite.is_empty() {
            return None;
        }

        let xs = unique_sorted(finite.iter().map(|p| p.0));
        let ys = unique_sorted(finite.iter().map(|p| p.1));
        let mut values = vec![vec![None; xs.len()]; ys.len()];

        for (x, y, v) in finite {
            let (Some(ix), Some(iy)) = (position(&xs, x), position(&ys, y)) else {
                continue;
            };
            let cell: &mut Option<f64> = &mut values[iy][ix];
            *cell = Some(cell.map_or(v, |old: f64| old.min(v)));
        }

        Some(Self { xs, ys, values })
    }

    /// Bins raw NLL values and shifts them to ΔNLL, floored at [`DELTA_NLL_FLOOR`].
    pub fn delta_nll(points: &[(f64, f64, f64)]) -> Option<Self> {
        let mut grid = Self::from_points(points)?;
        let (min, _) = grid.value_range()?;
        for row in &mut grid.values {
            for cell in row.iter_mut().flatten() {
                *cell = (*cell - min).max(DELTA_NLL_FLOOR);
            }
        }
        Some(grid)
    }

    pub fn x_edges(&self) -> Vec<f64> {
        edges(&self.xs)
    }

    pub fn y_edges(&self) -> Vec<f64> {
        edges(&self.ys)
    }

    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut filled = self.values.iter().flatten().flatten().copied();
        let first = filled.next()?;
        Some(filled.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    /// Coordinates and value of the smallest filled cell.
    pub fn minimum(&self) -> Option<(f64, f64, f64)> {
        let mut best: Option<(f64, f64, f64)> = None;
        for (iy, row) in self.values.iter().enumerate() {
            for (ix, value) in row.iter().enumerate() {
                if let Some(v) = *value {
                    if best.map_or(true, |(_, _, b)| v < b) {
                        best = Some((self.xs[ix], self.ys[iy], v));
                    }
                }
            }
        }
        best
    }

    /// Filled bins as `((x_lo, x_hi), (y_lo, y_hi), value)`.
    pub fn cells(&self) -> Vec<((f64, f64), (f64, f64), f64)> {
        let x_edges = self.x_edges();
        let y_edges = self.y_edges();
        let mut cells = Vec::new();
        for (iy, row) in self.values.iter().enumerate() {
            for (ix, value) in row.iter().enumerate() {
                if let Some(v) = *value {
                    cells.push((
                        (x_edges[ix], x_edges[ix + 1]),
                        (y_edges[iy], y_edges[iy + 1]),
                        v,
                    ));
                }
            }
        }
        cells
    }

    /// Marching-squares line segments where the surface crosses `level`.
    /// Cells with a missing corner are skipped.
    pub fn contour(&self, level: f64) -> Vec<Segment> {
        let mut segments = Vec::new();
        for iy in 0..self.ys.len().saturating_sub(1) {
            for ix in 0..self.xs.len().saturating_sub(1) {
                let corners = [
                    (ix, iy),
                    (ix + 1, iy),
                    (ix + 1, iy + 1),
                    (ix, iy + 1),
                ];
                let mut filled = [(0.0, 0.0, 0.0); 4];
                let mut complete = true;
                for (slot, (cx, cy)) in filled.iter_mut().zip(corners) {
                    match self.values[cy][cx] {
                        Some(v) => *slot = (self.xs[cx], self.ys[cy], v),
                        None => complete = false,
                    }
                }
                if complete {
                    cell_segments(&filled, level, &mut segments);
                }
            }
        }
        segments
    }
}

/// Corners run counter-clockwise from bottom-left; edge `k` joins corner `k`
/// and corner `k + 1`.
fn cell_segments(corners: &[(f64, f64, f64); 4], level: f64, out: &mut Vec<Segment>) {
    let above = |k: usize| corners[k].2 >= level;
    let crossing = |k: usize| -> Option<(f64, f64)> {
        let (a, b) = (corners[k], corners[(k + 1) % 4]);
        if above(k) == above((k + 1) % 4) {
            return None;
        }
        let t = (level - a.2) / (b.2 - a.2);
        Some((a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1)))
    };
    let points: Vec<(usize, (f64, f64))> =
        (0..4).filter_map(|k| crossing(k).map(|p| (k, p))).collect();

    match points.len() {
        2 => out.push((points[0].1, points[1].1)),
        4 => {
            // Saddle: the cell centre decides which corners are joined.
            let centre = corners.iter().map(|c| c.2).sum::<f64>() / 4.0;
            let p = |k: usize| points[k].1;
            if (centre >= level) == above(0) {
                out.push((p(0), p(1)));
                out.push((p(2), p(3)));
            } else {
                out.push((p(3), p(0)));
                out.push((p(1), p(2)));
            }
        }
        _ => {}
    }
}

fn unique_sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|a, b| (*a - *b).abs() <= TOLERANCE * b.abs().max(1.0));
    sorted
}

fn position(axis: &[f64], value: f64) -> Option<usize> {
    axis.iter()
        .position(|c| (c - value).abs() <= TOLERANCE * value.abs().max(1.0))
}

/// Bin edges half a step either side of each centre.
fn edges(centres: &[f64]) -> Vec<f64> {
    match centres {
        [] => Vec::new(),
        [only] => vec![only - 0.5, only + 0.5],
        _ => {
            let n = centres.len();
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centres[0] - (centres[1] - centres[0]) / 2.0);
            for pair in centres.windows(2) {
                edges.push((pair[0] + pair[1]) / 2.0);
            }
            edges.push(centres[n - 1] + (centres[n - 1] - centres[n - 2]) / 2.0);
            edges
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bowl() -> Vec<(f64, f64, f64)> {
        let mut points = Vec::new();
        for ix in -2..=2 {
            for iy in -2..=2 {
                let (x, y) = (ix as f64, iy as f64);
                points.push((x, y, 100.0 + x * x + y * y));
            }
        }
        points
    }

    #[test]
    fn test_binning_and_edges() {
        let grid = Grid2d::from_points(&[(0.0, 1.0, 3.0), (1.0, 1.0, 2.0), (1.0, 1.0, 5.0)])
            .unwrap();
        assert_eq!(grid.xs, vec![0.0, 1.0]);
        assert_eq!(grid.ys, vec![1.0]);
        assert_eq!(grid.values, vec![vec![Some(3.0), Some(2.0)]]);
        assert_eq!(grid.x_edges(), vec![-0.5, 0.5, 1.5]);
        assert_eq!(grid.y_edges(), vec![0.5, 1.5]);
        assert_eq!(grid.minimum(), Some((1.0, 1.0, 2.0)));
        assert_eq!(grid.cells().len(), 2);
    }

    #[test]
    fn test_delta_nll_floor() {
        let grid = Grid2d::delta_nll(&bowl()).unwrap();
        assert_eq!(grid.minimum(), Some((0.0, 0.0, DELTA_NLL_FLOOR)));
        assert_eq!(grid.value_range(), Some((DELTA_NLL_FLOOR, 8.0)));
    }

    #[test]
    fn test_contour_surrounds_minimum() {
        let grid = Grid2d::delta_nll(&bowl()).unwrap();
        let segments = grid.contour(CL68_2D);
        assert!(segments.len() >= 4);
        for (a, b) in segments {
            for (x, y) in [a, b] {
                let r = (x * x + y * y).sqrt();
                assert!(r > 1.0 && r < 1.6, "radius {}", r);
            }
        }
        assert!(grid.contour(50.0).is_empty());
    }

    #[test]
    fn test_missing_corner_skips_cell() {
        let grid =
            Grid2d::from_points(&[(0.0, 0.0, 0.0), (1.0, 0.0, 2.0), (0.0, 1.0, 2.0)]).unwrap();
        assert!(grid.contour(1.0).is_empty());
        assert!(Grid2d::from_points(&[]).is_none());
    }
}
