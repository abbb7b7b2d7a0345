//! Loads plot inputs from directories of per-point fit outputs.

use crate::core::converter::{extract_value_from_filename, matching_files};
use crate::core::result_parser::{nll_of, PoiFilter, ResultParser};
use crate::domain::model::{ParameterEstimate, ResultEntry};
use crate::utils::error::{QfError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Most fit results a summary plot distinguishes.
pub const MAX_SUMMARY_RESULTS: usize = 4;

/// One fit of a variable scan: the scanned value, its likelihood and the
/// floating POIs it profiled.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilePoint {
    pub scanned: f64,
    pub nll: f64,
    pub floating: BTreeMap<String, ParameterEstimate>,
}

/// One fit of a 2D scan with the value a floating POI settled at.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfiledPoint {
    pub x: f64,
    pub y: f64,
    pub floating: f64,
    pub nll: Option<f64>,
}

fn first_entry(parser: &ResultParser<'_>, path: &Path) -> Option<ResultEntry> {
    match parser.extract_scan_tree(path) {
        Ok(entries) => entries.into_iter().next(),
        Err(e) => {
            tracing::warn!("⚠️ Skipping {}: {}", path.display(), e);
            None
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Scanned value from the tree, falling back to the file name.
fn scanned_value(entry: &ResultEntry, path: &Path, poi: &str) -> Result<Option<f64>> {
    match entry.get(poi) {
        Some(value) => Ok(Some(*value)),
        None => extract_value_from_filename(&file_name(path), poi),
    }
}

/// Reads `fit_<poi>_*` outputs of a variable scan, sorted by scanned value.
pub fn load_profile_points(
    parser: &ResultParser<'_>,
    dir: &Path,
    poi: &str,
    floating: &[String],
    pattern: &str,
) -> Result<Vec<ProfilePoint>> {
    let filter = PoiFilter::Names(floating.to_vec());
    let mut points = Vec::new();

    for path in matching_files(dir, pattern)? {
        let Some(entry) = first_entry(parser, &path) else {
            continue;
        };
        let scanned = scanned_value(&entry, &path, poi)?;
        let nll = nll_of(parser.schema(), &entry);
        match (scanned, nll) {
            (Some(scanned), Some(nll)) => points.push(ProfilePoint {
                scanned,
                nll,
                floating: parser.estimates(&entry, &filter),
            }),
            _ => tracing::warn!("⚠️ No {} or likelihood value in {}", poi, path.display()),
        }
    }

    if points.is_empty() {
        return Err(QfError::ExtractionError {
            path: dir.to_path_buf(),
            details: format!("no usable '{}' files", pattern),
        });
    }
    points.sort_by(|a, b| a.scanned.total_cmp(&b.scanned));
    Ok(points)
}

/// Reads a 2D scan directory, keeping the value of `floating` at each point.
pub fn load_profiled_points(
    parser: &ResultParser<'_>,
    dir: &Path,
    poi1: &str,
    poi2: &str,
    floating: &str,
    pattern: &str,
) -> Result<Vec<ProfiledPoint>> {
    let mut points = Vec::new();

    for path in matching_files(dir, pattern)? {
        let Some(entry) = first_entry(parser, &path) else {
            continue;
        };
        let x = scanned_value(&entry, &path, poi1)?;
        let y = scanned_value(&entry, &path, poi2)?;
        match (x, y, entry.get(floating)) {
            (Some(x), Some(y), Some(value)) => points.push(ProfiledPoint {
                x,
                y,
                floating: *value,
                nll: nll_of(parser.schema(), &entry),
            }),
            _ => tracing::warn!(
                "⚠️ {} lacks {}, {} or {}",
                path.display(),
                poi1,
                poi2,
                floating
            ),
        }
    }

    if points.is_empty() {
        return Err(QfError::ExtractionError {
            path: dir.to_path_buf(),
            details: format!("no usable '{}' files", pattern),
        });
    }
    Ok(points)
}

/// Loads up to [`MAX_SUMMARY_RESULTS`] labelled fit results.
pub fn load_fit_summary(
    parser: &ResultParser<'_>,
    inputs: &[(String, PathBuf)],
    pois: &[String],
) -> Result<Vec<(String, BTreeMap<String, ParameterEstimate>)>> {
    if inputs.is_empty() || inputs.len() > MAX_SUMMARY_RESULTS {
        return Err(QfError::InvalidConfigValueError {
            field: "input".to_string(),
            value: inputs.len().to_string(),
            reason: format!("expected between 1 and {} fit results", MAX_SUMMARY_RESULTS),
        });
    }

    let filter = PoiFilter::Names(pois.to_vec());
    inputs
        .iter()
        .map(|(label, path)| Ok((label.clone(), parser.extract_detailed(path, &filter)?)))
        .collect()
}

/// Splits `label=path`; a bare path is labelled by its file stem.
pub fn parse_labelled_input(raw: &str) -> (String, PathBuf) {
    match raw.split_once('=') {
        Some((label, path)) if !label.is_empty() => (label.to_string(), PathBuf::from(path)),
        _ => {
            let path = PathBuf::from(raw);
            let label = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| raw.to_string());
            (label, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::root::TextTableReader;
    use crate::config::AnalysisConfig;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_profile_points() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "fit_cHWtil_combine_1.0000.txt",
            "cHWtil_combine\tnll\tcHBtil_combine\tcHBtil_combine_err\n1.0\t11.0\t0.3\t0.1\n",
        );
        write(
            dir.path(),
            "fit_cHWtil_combine_-1.0000.txt",
            "nll\tcHBtil_combine\n10.5\t-0.2\n",
        );
        write(dir.path(), "fit_cHWtil_combine_2.0000.txt", "status\n0\n");

        let config = AnalysisConfig::default();
        let parser = ResultParser::new(&TextTableReader, &config);
        let points = load_profile_points(
            &parser,
            dir.path(),
            "cHWtil_combine",
            &["cHBtil_combine".to_string()],
            "fit_cHWtil_combine_*.txt",
        )
        .unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].scanned, -1.0);
        assert_eq!(points[1].floating["cHBtil_combine"].error, 0.1);
    }

    #[test]
    fn test_load_profiled_points_and_empty_dir() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "fit_a_0.5000__b_-0.5000.txt",
            "c\tnll\n0.25\t3.0\n",
        );

        let config = AnalysisConfig::default();
        let parser = ResultParser::new(&TextTableReader, &config);
        let points =
            load_profiled_points(&parser, dir.path(), "a", "b", "c", "fit_*.txt").unwrap();
        assert_eq!(
            points,
            vec![ProfiledPoint { x: 0.5, y: -0.5, floating: 0.25, nll: Some(3.0) }]
        );

        let empty = TempDir::new().unwrap();
        assert!(load_profiled_points(&parser, empty.path(), "a", "b", "c", "fit_*").is_err());
    }

    #[test]
    fn test_parse_labelled_input() {
        assert_eq!(
            parse_labelled_input("Observed=out/obs.root"),
            ("Observed".to_string(), PathBuf::from("out/obs.root"))
        );
        assert_eq!(
            parse_labelled_input("out/asimov.root"),
            ("asimov".to_string(), PathBuf::from("out/asimov.root"))
        );
    }

    #[test]
    fn test_summary_rejects_too_many_results() {
        let config = AnalysisConfig::default();
        let parser = ResultParser::new(&TextTableReader, &config);
        let inputs: Vec<(String, PathBuf)> = (0..5)
            .map(|i| (format!("r{}", i), PathBuf::from(format!("r{}.txt", i))))
            .collect();
        assert!(matches!(
            load_fit_summary(&parser, &inputs, &[]),
            Err(QfError::InvalidConfigValueError { .. })
        ));
    }
}
