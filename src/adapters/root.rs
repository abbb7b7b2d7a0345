use crate::domain::model::ResultEntry;
use crate::domain::ports::ResultReader;
use crate::utils::error::{QfError, Result};
use oxyroot::{Branch, RootFile};
use std::path::Path;

/// Reads numeric branches of a TTree with `oxyroot`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootTreeReader;

impl ResultReader for RootTreeReader {
    fn read_entries(&self, path: &Path, tree: &str) -> Result<Vec<ResultEntry>> {
        let read_error = |message: String| QfError::RootReadError {
            path: path.to_path_buf(),
            message,
        };

        let mut file = RootFile::open(path).map_err(|e| read_error(e.to_string()))?;
        let tree = file
            .get_tree(tree)
            .map_err(|e| read_error(format!("tree '{}': {}", tree, e)))?;

        let mut columns: Vec<(String, Vec<f64>)> = Vec::new();
        for branch in tree.branches() {
            match read_numeric_branch(branch) {
                Some(values) => columns.push((branch.name().to_string(), values)),
                None => tracing::debug!(
                    "Skipping non-numeric branch {} ({})",
                    branch.name(),
                    branch.item_type_name()
                ),
            }
        }

        Ok(columns_to_entries(columns))
    }
}

fn read_numeric_branch(branch: &Branch) -> Option<Vec<f64>> {
    match branch.item_type_name().as_str() {
        "double" | "Double_t" | "Double32_t" => {
            branch.as_iter::<f64>().ok().map(|it| it.collect())
        }
        "float" | "Float_t" | "Float16_t" => branch
            .as_iter::<f32>()
            .ok()
            .map(|it| it.map(f64::from).collect()),
        "int" | "Int_t" => branch
            .as_iter::<i32>()
            .ok()
            .map(|it| it.map(f64::from).collect()),
        "unsigned int" | "UInt_t" => branch
            .as_iter::<u32>()
            .ok()
            .map(|it| it.map(f64::from).collect()),
        "long" | "Long64_t" => branch
            .as_iter::<i64>()
            .ok()
            .map(|it| it.map(|v| v as f64).collect()),
        "bool" | "Bool_t" => branch
            .as_iter::<bool>()
            .ok()
            .map(|it| it.map(|v| if v { 1.0 } else { 0.0 }).collect()),
        _ => None,
    }
}

/// Transposes branch columns into per-entry maps; short columns leave gaps.
fn columns_to_entries(columns: Vec<(String, Vec<f64>)>) -> Vec<ResultEntry> {
    let n_entries = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
    (0..n_entries)
        .map(|i| {
            columns
                .iter()
                .filter_map(|(name, values)| values.get(i).map(|v| (name.clone(), *v)))
                .collect()
        })
        .collect()
}

/// Tab-separated dump of a tree: a header line of branch names, one entry per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextTableReader;

impl ResultReader for TextTableReader {
    fn read_entries(&self, path: &Path, _tree: &str) -> Result<Vec<ResultEntry>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .flexible(true)
            .from_path(path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut entries = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let mut entry = ResultEntry::new();
            for (name, field) in headers.iter().zip(record.iter()) {
                match field.parse::<f64>() {
                    Ok(value) => {
                        entry.insert(name.clone(), value);
                    }
                    Err(_) => tracing::warn!(
                        "⚠️ {}: row {} has non-numeric {}='{}'",
                        path.display(),
                        line + 1,
                        name,
                        field
                    ),
                }
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// `.root` files go through [`RootTreeReader`], everything else through [`TextTableReader`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoReader;

impl ResultReader for AutoReader {
    fn read_entries(&self, path: &Path, tree: &str) -> Result<Vec<ResultEntry>> {
        let is_root = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("root"))
            .unwrap_or(false);

        if is_root {
            RootTreeReader.read_entries(path, tree)
        } else {
            TextTableReader.read_entries(path, tree)
        }
    }
}
