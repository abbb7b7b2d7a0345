use crate::config::{AnalysisConfig, ResultSchema};
use crate::domain::model::{ParameterEstimate, ResultEntry, Seeds};
use crate::domain::ports::ResultReader;
use crate::utils::error::{QfError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Which parameter branches count as results.
#[derive(Debug, Clone, PartialEq)]
pub enum PoiFilter {
    /// Names matching one of the configured POI patterns.
    PoiLike,
    Names(Vec<String>),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    /// `name=value` per line.
    Simple,
    /// `name=value,name=value` on one line, as accepted by `poi --previous`.
    Seeds,
    Detailed,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedResult {
    pub parameters: BTreeMap<String, ParameterEstimate>,
    pub nll: Option<f64>,
    pub status: Option<i32>,
}

/// Reads fit parameters out of quickFit result files.
pub struct ResultParser<'a> {
    reader: &'a dyn ResultReader,
    schema: ResultSchema,
    poi_patterns: Vec<String>,
}

impl<'a> ResultParser<'a> {
    pub fn new(reader: &'a dyn ResultReader, config: &AnalysisConfig) -> Self {
        Self {
            reader,
            schema: config.results.clone(),
            poi_patterns: config.poi_patterns.clone(),
        }
    }

    pub fn schema(&self) -> &ResultSchema {
        &self.schema
    }

    /// Every entry of the result tree, in file order.
    pub fn extract_scan_tree(&self, path: &Path) -> Result<Vec<ResultEntry>> {
        if !path.is_file() {
            return Err(QfError::ExtractionError {
                path: path.to_path_buf(),
                details: "file does not exist".to_string(),
            });
        }
        self.reader.read_entries(path, &self.schema.tree)
    }

    fn first_entry(&self, path: &Path) -> Result<ResultEntry> {
        self.extract_scan_tree(path)?
            .into_iter()
            .next()
            .ok_or_else(|| QfError::ExtractionError {
                path: path.to_path_buf(),
                details: format!("tree '{}' has no entries", self.schema.tree),
            })
    }

    fn accepts(&self, name: &str, filter: &PoiFilter) -> bool {
        if self.schema.is_bookkeeping_branch(name) {
            return false;
        }
        match filter {
            PoiFilter::PoiLike => self.poi_patterns.iter().any(|p| name.contains(p.as_str())),
            PoiFilter::Names(names) => names.iter().any(|n| n == name),
            PoiFilter::All => true,
        }
    }

    pub fn extract_pois(&self, path: &Path, filter: &PoiFilter) -> Result<Seeds> {
        let entry = self.first_entry(path)?;
        Ok(entry
            .into_iter()
            .filter(|(name, value)| self.accepts(name, filter) && value.is_finite())
            .collect())
    }

    /// Values with errors; missing asymmetric errors fall back to ±error.
    pub fn extract_detailed(
        &self,
        path: &Path,
        filter: &PoiFilter,
    ) -> Result<BTreeMap<String, ParameterEstimate>> {
        let entry = self.first_entry(path)?;
        Ok(self.estimates(&entry, filter))
    }

    /// Estimates for the accepted parameters of an already loaded entry.
    pub fn estimates(
        &self,
        entry: &ResultEntry,
        filter: &PoiFilter,
    ) -> BTreeMap<String, ParameterEstimate> {
        let lookup = |name: &str, suffix: &str| {
            entry
                .get(&format!("{}{}", name, suffix))
                .copied()
                .filter(|v| v.is_finite() && *v != 0.0)
        };

        let mut results = BTreeMap::new();
        for (name, value) in entry {
            if !self.accepts(name, filter) {
                continue;
            }
            let error = lookup(name, &self.schema.error_suffix).unwrap_or(0.0);
            let estimate = ParameterEstimate {
                value: *value,
                error,
                error_hi: lookup(name, &self.schema.error_hi_suffix).unwrap_or(error),
                error_lo: lookup(name, &self.schema.error_lo_suffix)
                    .map(|v| -v.abs())
                    .unwrap_or(-error),
            };
            results.insert(name.clone(), estimate);
        }
        results
    }

    pub fn extract_nll(&self, path: &Path) -> Result<Option<f64>> {
        let entry = self.first_entry(path)?;
        Ok(nll_of(&self.schema, &entry))
    }

    pub fn extract_status(&self, path: &Path) -> Result<Option<i32>> {
        let entry = self.first_entry(path)?;
        Ok(status_of(&self.schema, &entry))
    }

    pub fn extract_full(&self, path: &Path, filter: &PoiFilter) -> Result<DetailedResult> {
        let entry = self.first_entry(path)?;
        Ok(DetailedResult {
            parameters: self.estimates(&entry, filter),
            nll: nll_of(&self.schema, &entry),
            status: status_of(&self.schema, &entry),
        })
    }
}

/// First likelihood branch present in `entry`.
pub fn nll_of(schema: &ResultSchema, entry: &ResultEntry) -> Option<f64> {
    schema
        .nll_branches
        .iter()
        .find_map(|branch| entry.get(branch).copied())
}

pub fn status_of(schema: &ResultSchema, entry: &ResultEntry) -> Option<i32> {
    schema
        .status_branches
        .iter()
        .find_map(|branch| entry.get(branch).map(|v| v.round() as i32))
}

pub fn format_simple(values: &Seeds) -> String {
    values
        .iter()
        .map(|(name, value)| format!("{}={:.6}\n", name, value))
        .collect()
}

pub fn format_seeds(values: &Seeds) -> String {
    crate::core::poi_builder::format_seed_string(values)
}

pub fn format_detailed(result: &DetailedResult) -> String {
    let width = result
        .parameters
        .keys()
        .map(String::len)
        .max()
        .unwrap_or(9)
        .max(9);

    let mut out = format!(
        "{:<width$} {:>12} {:>12} {:>12} {:>12}\n",
        "parameter",
        "value",
        "error",
        "error_hi",
        "error_lo",
        width = width
    );
    for (name, est) in &result.parameters {
        out.push_str(&format!(
            "{:<width$} {:>12.6} {:>12.6} {:>12.6} {:>12.6}\n",
            name,
            est.value,
            est.error,
            est.error_hi,
            est.error_lo,
            width = width
        ));
    }
    if let Some(nll) = result.nll {
        out.push_str(&format!("NLL: {:.6}\n", nll));
    }
    if let Some(status) = result.status {
        out.push_str(&format!("status: {}\n", status));
    }
    out
}

pub fn format_json(result: &DetailedResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}
