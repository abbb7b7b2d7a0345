use crate::utils::error::{QfError, Result};
use std::path::Path;

/// Numeric rows of a converted scan: `value delta` or `v1 v2 delta`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanTable {
    pub rows: Vec<Vec<f64>>,
}

impl ScanTable {
    /// `(value, delta_nll)` pairs from the first two columns.
    pub fn points_1d(&self) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter(|row| row.len() >= 2)
            .map(|row| (row[0], row[1]))
            .collect()
    }

    /// `(v1, v2, delta_nll)` triples from the first three columns.
    pub fn points_2d(&self) -> Vec<(f64, f64, f64)> {
        self.rows
            .iter()
            .filter(|row| row.len() >= 3)
            .map(|row| (row[0], row[1], row[2]))
            .collect()
    }
}

/// Reads a tab- or whitespace-separated scan table. A first line that does
/// not parse as numbers is taken as a header.
pub fn read_scan_table(path: &Path) -> Result<ScanTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let fields: Vec<&str> = record
            .iter()
            .flat_map(|field| field.split_whitespace())
            .collect();
        if fields.is_empty() {
            continue;
        }

        let parsed: std::result::Result<Vec<f64>, _> =
            fields.iter().map(|f| f.parse::<f64>()).collect();
        match parsed {
            Ok(values) => rows.push(values),
            Err(_) if index == 0 => tracing::debug!("Skipping header of {}", path.display()),
            Err(_) => tracing::warn!(
                "⚠️ Skipping malformed line {} in {}",
                index + 1,
                path.display()
            ),
        }
    }

    if rows.is_empty() {
        return Err(QfError::ExtractionError {
            path: path.to_path_buf(),
            details: "no numeric rows".to_string(),
        });
    }
    Ok(ScanTable { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_with_header_and_spaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.txt");
        std::fs::write(&path, "poi\tdnll\n-1.0\t0.5\n0.0  0.0\n# note\n1.0\t0.7\n").unwrap();

        let table = read_scan_table(&path).unwrap();
        assert_eq!(table.points_1d(), vec![(-1.0, 0.5), (0.0, 0.0), (1.0, 0.7)]);
        assert!(table.points_2d().is_empty());
    }

    #[test]
    fn test_read_2d_and_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan2d.txt");
        std::fs::write(&path, "0\t0\t0\n0\t1\t2.5\n").unwrap();
        assert_eq!(read_scan_table(&path).unwrap().points_2d().len(), 2);

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "header only\n").unwrap();
        assert!(matches!(
            read_scan_table(&empty),
            Err(QfError::ExtractionError { .. })
        ));
    }
}
