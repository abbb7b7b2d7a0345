//! Turns a directory of per-point fit outputs into a ΔNLL text table.

use crate::config::ResultSchema;
use crate::core::result_parser::{nll_of, status_of};
use crate::domain::ports::ResultReader;
use crate::utils::error::{QfError, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// One converted point; `values` holds one entry per scanned POI.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSample {
    pub values: Vec<f64>,
    pub nll: f64,
    pub status: Option<i32>,
}

pub struct ScanConverter<'a> {
    reader: &'a dyn ResultReader,
    schema: ResultSchema,
}

impl<'a> ScanConverter<'a> {
    pub fn new(reader: &'a dyn ResultReader, schema: ResultSchema) -> Self {
        Self { reader, schema }
    }

    /// Writes `value\tdelta_nll` lines sorted by value; returns the number of points.
    pub fn convert_1d_scan(
        &self,
        input_dir: &Path,
        output_file: &Path,
        poi: &str,
        pattern: &str,
    ) -> Result<usize> {
        let mut samples = Vec::new();
        for path in matching_files(input_dir, pattern)? {
            let name = file_name(&path);
            let entry = match self.first_entry(&path) {
                Some(entry) => entry,
                None => continue,
            };

            let value = extract_value_from_filename(&name, poi)?
                .or_else(|| entry.get(poi).copied());
            let nll = nll_of(&self.schema, &entry);

            match (value, nll) {
                (Some(value), Some(nll)) => samples.push(ScanSample {
                    values: vec![value],
                    nll,
                    status: status_of(&self.schema, &entry),
                }),
                _ => tracing::warn!("⚠️ Could not extract data from {}", name),
            }
        }

        self.write_samples(samples, output_file)
    }

    /// Writes `v1\tv2\tdelta_nll` lines sorted by `(v1, v2)`.
    pub fn convert_2d_scan(
        &self,
        input_dir: &Path,
        output_file: &Path,
        poi1: &str,
        poi2: &str,
        pattern: &str,
    ) -> Result<usize> {
        let mut samples = Vec::new();
        for path in matching_files(input_dir, pattern)? {
            let name = file_name(&path);
            let v1 = extract_value_from_filename(&name, poi1)?;
            let v2 = extract_value_from_filename(&name, poi2)?;
            let (v1, v2) = match (v1, v2) {
                (Some(v1), Some(v2)) => (v1, v2),
                _ => {
                    tracing::warn!("⚠️ No {} / {} values in file name {}", poi1, poi2, name);
                    continue;
                }
            };

            let entry = match self.first_entry(&path) {
                Some(entry) => entry,
                None => continue,
            };
            match nll_of(&self.schema, &entry) {
                Some(nll) => samples.push(ScanSample {
                    values: vec![v1, v2],
                    nll,
                    status: status_of(&self.schema, &entry),
                }),
                None => tracing::warn!("⚠️ No likelihood value in {}", name),
            }
        }

        self.write_samples(samples, output_file)
    }

    fn first_entry(&self, path: &Path) -> Option<crate::domain::model::ResultEntry> {
        match self.reader.read_entries(path, &self.schema.tree) {
            Ok(entries) => {
                let first = entries.into_iter().next();
                if first.is_none() {
                    tracing::warn!("⚠️ {} has an empty {} tree", path.display(), self.schema.tree);
                }
                first
            }
            Err(e) => {
                tracing::warn!("⚠️ Skipping {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_samples(&self, mut samples: Vec<ScanSample>, output_file: &Path) -> Result<usize> {
        if samples.is_empty() {
            return Err(QfError::ExtractionError {
                path: output_file.to_path_buf(),
                details: "no valid data points extracted".to_string(),
            });
        }

        let failed = samples
            .iter()
            .filter(|s| s.status.map(|code| code != 0).unwrap_or(false))
            .count();
        if failed > 0 {
            tracing::warn!("⚠️ {} points report a non-zero fit status", failed);
        }

        samples.sort_by(|a, b| {
            a.values
                .iter()
                .zip(&b.values)
                .map(|(x, y)| x.partial_cmp(y).unwrap_or(Ordering::Equal))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let nll_min = samples
            .iter()
            .map(|s| s.nll)
            .fold(f64::INFINITY, f64::min);

        if let Some(parent) = output_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_path(output_file)?;
        for sample in &samples {
            let mut record: Vec<String> = sample.values.iter().map(|v| format!("{:.6}", v)).collect();
            record.push(format!("{:.6}", sample.nll - nll_min));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        tracing::info!("✅ Wrote {} points to {}", samples.len(), output_file.display());
        Ok(samples.len())
    }
}

/// Reads the value of `poi` out of names like `fit_<poi>_<value>.root`,
/// falling back to `<poi><value>`.
pub fn extract_value_from_filename(name: &str, poi: &str) -> Result<Option<f64>> {
    let escaped = regex::escape(poi);
    for pattern in [
        format!(r"{}_(-?\d+\.?\d*)", escaped),
        format!(r"{}(-?\d+\.?\d*)", escaped),
    ] {
        let re = Regex::new(&pattern)?;
        if let Some(value) = re
            .captures(name)
            .and_then(|caps| caps[1].trim_end_matches('.').parse::<f64>().ok())
        {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Files in `dir` whose name matches a `*`/`?` wildcard pattern, sorted by name.
pub fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let re = wildcard_regex(pattern)?;
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && re.is_match(&file_name(path)))
        .collect();
    files.sort();

    if files.is_empty() {
        tracing::warn!("⚠️ No files matching {} in {}", pattern, dir.display());
    }
    Ok(files)
}

pub fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Ok(Regex::new(&re)?)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::root::TextTableReader;
    use tempfile::TempDir;

    #[test]
    fn test_extract_value_from_filename() {
        let v = extract_value_from_filename("fit_cHWtil_combine_0.5000.root", "cHWtil_combine");
        assert_eq!(v.unwrap(), Some(0.5));

        let name = "fit_cHWtil_combine_0.5000__cHBtil_combine_-0.3000.root";
        assert_eq!(
            extract_value_from_filename(name, "cHBtil_combine").unwrap(),
            Some(-0.3)
        );
        assert_eq!(
            extract_value_from_filename("fit_cHWtil-1.2.root", "cHWtil").unwrap(),
            Some(-1.2)
        );
        assert_eq!(
            extract_value_from_filename("fit_mu_ggF_1.root", "cHWtil").unwrap(),
            None
        );
    }

    #[test]
    fn test_wildcard_regex() {
        let re = wildcard_regex("fit_*.root").unwrap();
        assert!(re.is_match("fit_a_0.5000.root"));
        assert!(!re.is_match("fit_a_0.5000.root.bak"));
        assert!(!re.is_match("xfit_a.root"));
        assert!(wildcard_regex("fit_?.txt").unwrap().is_match("fit_1.txt"));
    }

    fn write_point(dir: &Path, name: &str, header: &str, row: &str) {
        std::fs::write(dir.join(name), format!("{}\n{}\n", header, row)).unwrap();
    }

    #[test]
    fn test_convert_1d_scan() {
        let dir = TempDir::new().unwrap();
        write_point(dir.path(), "fit_c_1.0000.txt", "nll\tstatus", "12.5\t0");
        write_point(dir.path(), "fit_c_-1.0000.txt", "nll\tstatus", "11.0\t0");
        write_point(dir.path(), "fit_c_0.0000.txt", "nll\tstatus", "10.0\t0");
        write_point(dir.path(), "fit_broken.txt", "status", "4");

        let out = dir.path().join("out/scan.txt");
        let converter = ScanConverter::new(&TextTableReader, ResultSchema::default());
        let n = converter
            .convert_1d_scan(dir.path(), &out, "c", "fit_*.txt")
            .unwrap();

        assert_eq!(n, 3);
        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(
            text,
            "-1.000000\t1.000000\n0.000000\t0.000000\n1.000000\t2.500000\n"
        );
    }

    #[test]
    fn test_convert_2d_scan() {
        let dir = TempDir::new().unwrap();
        write_point(dir.path(), "fit_a_1.0000__b_0.0000.txt", "nll", "5");
        write_point(dir.path(), "fit_a_0.0000__b_1.0000.txt", "nll", "4");
        write_point(dir.path(), "fit_a_0.0000__b_0.0000.txt", "nll", "3");

        let out = dir.path().join("scan2d.txt");
        let converter = ScanConverter::new(&TextTableReader, ResultSchema::default());
        converter
            .convert_2d_scan(dir.path(), &out, "a", "b", "fit_*.txt")
            .unwrap();

        let lines: Vec<String> = std::fs::read_to_string(&out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(lines[0], "0.000000\t0.000000\t0.000000");
        assert_eq!(lines[1], "0.000000\t1.000000\t1.000000");
        assert_eq!(lines[2], "1.000000\t0.000000\t2.000000");
    }

    #[test]
    fn test_no_valid_points_is_an_error() {
        let dir = TempDir::new().unwrap();
        let converter = ScanConverter::new(&TextTableReader, ResultSchema::default());
        let result = converter.convert_1d_scan(dir.path(), &dir.path().join("o.txt"), "c", "fit_*.root");
        assert!(matches!(result, Err(QfError::ExtractionError { .. })));
    }
}
