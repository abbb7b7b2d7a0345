//! SVG renderers built on plotters.

use super::data::{ProfilePoint, ProfiledPoint};
use super::grid::{Grid2d, Segment, CL68_2D, CL95_2D, DELTA_NLL_FLOOR};
use super::labels::poi_label;
use super::profile::{profile_1d, Profile1d, CL68_1D, CL95_1D};
use crate::domain::model::ParameterEstimate;
use crate::utils::error::{QfError, Result};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;

type DrawResult = std::result::Result<(), Box<dyn Error>>;

const SIZE: (u32, u32) = (800, 600);
const SERIES_COLORS: [RGBColor; 4] = [BLACK, BLUE, RED, RGBColor(0, 153, 0)];
const HEAT_ANCHORS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

fn series_color(index: usize) -> RGBColor {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

/// Colour for `t` in `[0, 1]` along a dark-blue to yellow scale.
fn heat_color(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (HEAT_ANCHORS.len() - 1) as f64;
    let i = (scaled.floor() as usize).min(HEAT_ANCHORS.len() - 2);
    let f = scaled - i as f64;
    let (a, b) = (HEAT_ANCHORS[i], HEAT_ANCHORS[i + 1]);
    let mix = |x: u8, y: u8| (x as f64 + f * (y as f64 - x as f64)).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// `(lo, hi)` of finite values with a little padding; never an empty range.
fn padded_bounds(values: impl Iterator<Item = f64>, pad_fraction: f64) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    let span = hi - lo;
    let pad = if span > 1e-9 {
        span * pad_fraction
    } else {
        lo.abs().max(1.0) * 0.1
    };
    (lo - pad, hi + pad)
}

fn prepare_output(output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn finish(output: &Path, result: DrawResult) -> Result<()> {
    result.map_err(QfError::plot)?;
    tracing::info!("📊 Saved {}", output.display());
    Ok(())
}

fn fmt_bound(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v))
}

/// Overlays 1D scans (`(label, [(value, ΔNLL)])`) as 2ΔNLL curves with the
/// 68% and 95% CL thresholds. Returns the profile of every drawable input.
pub fn plot_scan_1d(
    inputs: &[(String, Vec<(f64, f64)>)],
    poi: &str,
    output: &Path,
) -> Result<Vec<(String, Profile1d)>> {
    let profiles: Vec<(String, Profile1d)> = inputs
        .iter()
        .filter_map(|(label, points)| profile_1d(points).map(|p| (label.clone(), p)))
        .collect();
    if profiles.is_empty() {
        return Err(QfError::plot("no finite scan points to draw"));
    }

    prepare_output(output)?;
    finish(output, draw_scan_1d(&profiles, poi, output))?;
    Ok(profiles)
}

fn draw_scan_1d(profiles: &[(String, Profile1d)], poi: &str, output: &Path) -> DrawResult {
    let xs = profiles.iter().flat_map(|(_, p)| p.curve.iter().map(|c| c.0));
    let (x_lo, x_hi) = padded_bounds(xs, 0.0);
    let y_hi = profiles
        .iter()
        .flat_map(|(_, p)| p.curve.iter().map(|c| c.1))
        .filter(|y| y.is_finite())
        .fold(CL95_1D * 1.3, f64::max)
        * 1.05;

    let root = SVGBackend::new(output, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Likelihood scan of {}", poi_label(poi)), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)?;

    chart
        .configure_mesh()
        .x_desc(poi_label(poi))
        .y_desc("-2 Δln L")
        .draw()?;

    for level in [CL68_1D, CL95_1D] {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x_lo, level), (x_hi, level)],
            BLACK.mix(0.3),
        )))?;
    }

    for (i, (label, profile)) in profiles.iter().enumerate() {
        let color = series_color(i);
        let legend = format!(
            "{}: {:.3} [{}, {}]",
            label,
            profile.best_fit,
            fmt_bound(profile.cl68.lo),
            fmt_bound(profile.cl68.hi)
        );
        chart
            .draw_series(LineSeries::new(profile.curve.clone(), color.stroke_width(2)))?
            .label(legend)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        chart.draw_series(
            profile
                .curve
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
        )?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Draws 2D ΔNLL scans. A single input also gets the density map; several
/// inputs are compared through their 68% and 95% CL contours only.
pub fn plot_scan_2d(
    inputs: &[(String, Grid2d)],
    poi1: &str,
    poi2: &str,
    output: &Path,
) -> Result<()> {
    if inputs.is_empty() {
        return Err(QfError::plot("no 2D scans to draw"));
    }
    if inputs.len() > 1 {
        tracing::info!("Several inputs, drawing contours without the density map");
    }

    prepare_output(output)?;
    finish(output, draw_scan_2d(inputs, poi1, poi2, output))
}

type Chart2d<'a, 'b> = ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_segments(chart: &mut Chart2d<'_, '_>, segments: &[Segment], style: ShapeStyle) -> DrawResult {
    chart.draw_series(
        segments
            .iter()
            .map(move |&(a, b)| PathElement::new(vec![a, b], style)),
    )?;
    Ok(())
}

fn draw_scan_2d(inputs: &[(String, Grid2d)], poi1: &str, poi2: &str, output: &Path) -> DrawResult {
    let (x_lo, x_hi) = padded_bounds(inputs.iter().flat_map(|(_, g)| g.x_edges()), 0.0);
    let (y_lo, y_hi) = padded_bounds(inputs.iter().flat_map(|(_, g)| g.y_edges()), 0.0);

    let root = SVGBackend::new(output, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} vs {}", poi_label(poi2), poi_label(poi1)),
            ("sans-serif", 20),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(poi_label(poi1))
        .y_desc(poi_label(poi2))
        .draw()?;

    if let [(_, grid)] = inputs {
        let (_, max) = grid.value_range().unwrap_or((DELTA_NLL_FLOOR, 1.0));
        let log_span = (max / DELTA_NLL_FLOOR).ln().max(f64::EPSILON);
        chart.draw_series(grid.cells().into_iter().map(|((x0, x1), (y0, y1), v)| {
            let t = (v.max(DELTA_NLL_FLOOR) / DELTA_NLL_FLOOR).ln() / log_span;
            Rectangle::new([(x0, y0), (x1, y1)], heat_color(t).filled())
        }))?;
    }

    for (i, (label, grid)) in inputs.iter().enumerate() {
        let color = if inputs.len() == 1 { WHITE } else { series_color(i) };
        draw_segments(&mut chart, &grid.contour(CL68_2D), color.stroke_width(2))?;
        draw_segments(&mut chart, &grid.contour(CL95_2D), color.mix(0.6).stroke_width(1))?;

        if let Some((bx, by, _)) = grid.minimum() {
            let marker = if inputs.len() == 1 { RED } else { color };
            chart
                .draw_series(std::iter::once(Circle::new((bx, by), 5, marker.filled())))?
                .label(format!("{} best fit ({:.3}, {:.3})", label, bx, by))
                .legend(move |(x, y)| Circle::new((x + 10, y), 5, marker.filled()));
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Top panel: 2ΔNLL against the scanned POI. One panel below per floating
/// POI with its fitted value and asymmetric errors.
pub fn plot_profile(
    points: &[ProfilePoint],
    poi: &str,
    floating: &[String],
    output: &Path,
) -> Result<()> {
    if points.is_empty() {
        return Err(QfError::plot("no profile points to draw"));
    }
    prepare_output(output)?;
    finish(output, draw_profile(points, poi, floating, output))
}

fn draw_profile(points: &[ProfilePoint], poi: &str, floating: &[String], output: &Path) -> DrawResult {
    let min_nll = points.iter().map(|p| p.nll).fold(f64::INFINITY, f64::min);
    let curve: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (p.scanned, 2.0 * (p.nll - min_nll)))
        .collect();
    let (x_lo, x_hi) = padded_bounds(curve.iter().map(|c| c.0), 0.02);
    let y_hi = curve.iter().map(|c| c.1).fold(CL95_1D * 1.3, f64::max) * 1.05;

    let height = SIZE.1 / 2 * (1 + floating.len() as u32);
    let root = SVGBackend::new(output, (SIZE.0, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((1 + floating.len(), 1));

    let mut chart = ChartBuilder::on(&panels[0])
        .caption(format!("Profile of {}", poi_label(poi)), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)?;
    chart
        .configure_mesh()
        .x_desc(poi_label(poi))
        .y_desc("-2 Δln L")
        .draw()?;
    for level in [CL68_1D, CL95_1D] {
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x_lo, level), (x_hi, level)],
            BLACK.mix(0.3),
        )))?;
    }
    chart.draw_series(LineSeries::new(curve.clone(), BLACK.stroke_width(2)))?;
    chart.draw_series(curve.iter().map(|&(x, y)| Circle::new((x, y), 3, BLACK.filled())))?;

    for (i, name) in floating.iter().enumerate() {
        let values: Vec<(f64, ParameterEstimate)> = points
            .iter()
            .filter_map(|p| p.floating.get(name).map(|est| (p.scanned, *est)))
            .collect();
        let (v_lo, v_hi) = padded_bounds(
            values
                .iter()
                .flat_map(|(_, e)| [e.value + e.error_lo, e.value + e.error_hi]),
            0.1,
        );
        let color = series_color(i + 1);

        let mut panel = ChartBuilder::on(&panels[i + 1])
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(x_lo..x_hi, v_lo..v_hi)?;
        panel
            .configure_mesh()
            .x_desc(poi_label(poi))
            .y_desc(poi_label(name))
            .draw()?;
        panel.draw_series(values.iter().map(|&(x, e)| {
            PathElement::new(
                vec![(x, e.value + e.error_lo), (x, e.value + e.error_hi)],
                color.stroke_width(1),
            )
        }))?;
        panel.draw_series(LineSeries::new(
            values.iter().map(|&(x, e)| (x, e.value)),
            color.stroke_width(2),
        ))?;
        panel.draw_series(
            values
                .iter()
                .map(|&(x, e)| Circle::new((x, e.value), 3, color.filled())),
        )?;
    }

    root.present()?;
    Ok(())
}

/// Colours the value a floating POI takes across a 2D scan; ΔNLL contours
/// are overlaid when the points carry likelihood values.
pub fn plot_profiled_2d(
    points: &[ProfiledPoint],
    poi1: &str,
    poi2: &str,
    floating: &str,
    output: &Path,
) -> Result<()> {
    let values: Vec<(f64, f64, f64)> = points.iter().map(|p| (p.x, p.y, p.floating)).collect();
    let grid = Grid2d::from_points(&values)
        .ok_or_else(|| QfError::plot("no finite points to draw"))?;
    let nll: Vec<(f64, f64, f64)> = points
        .iter()
        .filter_map(|p| p.nll.map(|nll| (p.x, p.y, nll)))
        .collect();
    let contours = Grid2d::delta_nll(&nll);

    prepare_output(output)?;
    finish(
        output,
        draw_profiled_2d(&grid, contours.as_ref(), poi1, poi2, floating, output),
    )
}

fn draw_profiled_2d(
    grid: &Grid2d,
    contours: Option<&Grid2d>,
    poi1: &str,
    poi2: &str,
    floating: &str,
    output: &Path,
) -> DrawResult {
    let (x_lo, x_hi) = padded_bounds(grid.x_edges().into_iter(), 0.0);
    let (y_lo, y_hi) = padded_bounds(grid.y_edges().into_iter(), 0.0);
    let (v_min, v_max) = grid.value_range().unwrap_or((0.0, 1.0));
    let span = (v_max - v_min).max(f64::EPSILON);

    let root = SVGBackend::new(output, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "Profiled {} ({:.3} to {:.3})",
                poi_label(floating),
                v_min,
                v_max
            ),
            ("sans-serif", 20),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(poi_label(poi1))
        .y_desc(poi_label(poi2))
        .draw()?;

    chart.draw_series(grid.cells().into_iter().map(|((x0, x1), (y0, y1), v)| {
        Rectangle::new([(x0, y0), (x1, y1)], heat_color((v - v_min) / span).filled())
    }))?;

    if let Some(nll) = contours {
        draw_segments(&mut chart, &nll.contour(CL68_2D), WHITE.stroke_width(2))?;
        draw_segments(&mut chart, &nll.contour(CL95_2D), WHITE.mix(0.6).stroke_width(1))?;
    }

    root.present()?;
    Ok(())
}

/// Best-fit values with asymmetric error bars, one row per POI and one
/// colour per labelled result, against the SM expectation at zero.
pub fn plot_fit_summary(
    results: &[(String, BTreeMap<String, ParameterEstimate>)],
    pois: &[String],
    output: &Path,
) -> Result<()> {
    if results.is_empty() || pois.is_empty() {
        return Err(QfError::plot("nothing to summarise"));
    }
    prepare_output(output)?;
    finish(output, draw_fit_summary(results, pois, output))
}

fn draw_fit_summary(
    results: &[(String, BTreeMap<String, ParameterEstimate>)],
    pois: &[String],
    output: &Path,
) -> DrawResult {
    let n_pois = pois.len() as f64;
    let n_results = results.len() as f64;
    let (x_lo, x_hi) = (-4.0, 4.0);

    let root = SVGBackend::new(output, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Fit summary", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(20)
        .build_cartesian_2d(x_lo..x_hi, 0.0..n_pois)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(0)
        .x_desc("Wilson coefficient value")
        .draw()?;

    chart.draw_series(std::iter::once(PathElement::new(
        vec![(0.0, 0.0), (0.0, n_pois)],
        BLACK.mix(0.4),
    )))?;
    chart.draw_series(pois.iter().enumerate().map(|(i, poi)| {
        Text::new(
            poi_label(poi),
            (x_lo + 0.1, i as f64 + 0.85),
            ("sans-serif", 16).into_font(),
        )
    }))?;

    for (idx, (label, estimates)) in results.iter().enumerate() {
        let color = series_color(idx);
        let offset = (idx as f64 - n_results / 2.0 + 0.5) * 0.15;
        let rows: Vec<(f64, ParameterEstimate)> = pois
            .iter()
            .enumerate()
            .filter_map(|(i, poi)| estimates.get(poi).map(|e| (i as f64 + 0.5 + offset, *e)))
            .collect();

        chart.draw_series(rows.iter().map(|&(y, e)| {
            PathElement::new(
                vec![(e.value + e.error_lo, y), (e.value + e.error_hi, y)],
                color.stroke_width(2),
            )
        }))?;
        chart
            .draw_series(rows.iter().map(|&(y, e)| Circle::new((e.value, y), 4, color.filled())))?
            .label(label.as_str())
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_heat_color_ends() {
        assert_eq!(heat_color(0.0), RGBColor(68, 1, 84));
        assert_eq!(heat_color(1.0), RGBColor(253, 231, 37));
        assert_eq!(heat_color(f64::NAN), RGBColor(68, 1, 84));
    }

    #[test]
    fn test_padded_bounds() {
        assert_eq!(padded_bounds([0.0, 2.0].into_iter(), 0.5), (-1.0, 3.0));
        assert_eq!(padded_bounds(std::iter::empty(), 0.1), (-1.0, 1.0));
        let (lo, hi) = padded_bounds([3.0].into_iter(), 0.1);
        assert!(lo < 3.0 && hi > 3.0);
    }

    #[test]
    fn test_plot_scan_1d_writes_svg() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("plots/scan.svg");
        let points: Vec<(f64, f64)> = (-4..=4).map(|i| (i as f64 * 0.5, (i * i) as f64 / 8.0)).collect();

        let profiles = plot_scan_1d(&[("obs".to_string(), points)], "cHWtil_combine", &output).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].1.best_fit, 0.0);

        let svg = std::fs::read_to_string(&output).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_plot_scan_2d_and_summary_write_svg() {
        let dir = TempDir::new().unwrap();
        let mut points = Vec::new();
        for ix in -2..=2 {
            for iy in -2..=2 {
                points.push((ix as f64, iy as f64, (ix * ix + iy * iy) as f64));
            }
        }
        let grid = Grid2d::delta_nll(&points).unwrap();
        let scan = dir.path().join("scan2d.svg");
        plot_scan_2d(&[("obs".to_string(), grid)], "a", "b", &scan).unwrap();
        assert!(scan.is_file());

        let estimate = ParameterEstimate { value: 0.5, error: 0.2, error_hi: 0.25, error_lo: -0.2 };
        let results = vec![(
            "Observed".to_string(),
            BTreeMap::from([("a".to_string(), estimate)]),
        )];
        let summary = dir.path().join("summary.svg");
        plot_fit_summary(&results, &["a".to_string(), "b".to_string()], &summary).unwrap();
        assert!(summary.is_file());
    }

    #[test]
    fn test_empty_inputs_are_rejected() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("x.svg");
        assert!(matches!(plot_scan_1d(&[], "a", &out), Err(QfError::PlotError { .. })));
        assert!(matches!(plot_scan_2d(&[], "a", "b", &out), Err(QfError::PlotError { .. })));
        assert!(plot_profile(&[], "a", &[], &out).is_err());
        assert!(!out.exists());
    }
}
