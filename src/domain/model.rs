use crate::utils::format::fmt_tag_value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Best-fit values carried from one scan point to the next.
pub type Seeds = BTreeMap<String, f64>;

/// One entry of a result tree: branch name to value.
pub type ResultEntry = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Independent points, never seeded.
    Parallel,
    /// Points run in order, each seeded with the previous best fit.
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Local,
    Condor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Systematics {
    #[default]
    #[cfg_attr(feature = "cli", value(name = "full_syst"))]
    FullSyst,
    #[cfg_attr(feature = "cli", value(name = "stat_only"))]
    StatOnly,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Parallel => write!(f, "parallel"),
            ExecutionMode::Sequential => write!(f, "sequential"),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Local => write!(f, "local"),
            Backend::Condor => write!(f, "condor"),
        }
    }
}

/// Fixed POI values of a single fit in a scan grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanPoint {
    pub coordinates: Vec<(String, f64)>,
}

impl ScanPoint {
    pub fn one(poi: &str, value: f64) -> Self {
        Self {
            coordinates: vec![(poi.to_string(), value)],
        }
    }

    pub fn two(poi1: &str, value1: f64, poi2: &str, value2: f64) -> Self {
        Self {
            coordinates: vec![(poi1.to_string(), value1), (poi2.to_string(), value2)],
        }
    }

    /// `fit_<poi>_<v>` or `fit_<p1>_<v1>__<p2>_<v2>`.
    pub fn file_stem(&self) -> String {
        let parts: Vec<String> = self
            .coordinates
            .iter()
            .map(|(poi, value)| format!("{}_{}", poi, fmt_tag_value(*value)))
            .collect();
        format!("fit_{}", parts.join("__"))
    }

    pub fn describe(&self) -> String {
        self.coordinates
            .iter()
            .map(|(poi, value)| format!("{}={}", poi, fmt_tag_value(*value)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Exit state of one quickFit invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    pub success: bool,
    pub exit_code: Option<i32>,
}

impl RunStatus {
    pub fn from_code(code: Option<i32>) -> Self {
        Self {
            success: code == Some(0),
            exit_code: code,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PointOutcome {
    pub index: usize,
    pub point: ScanPoint,
    pub output_file: PathBuf,
    pub log_file: PathBuf,
    pub success: bool,
    /// Handed to the batch scheduler; the fit has not run yet.
    pub submitted: bool,
    pub exit_code: Option<i32>,
    pub seeds_used: usize,
    pub seeds_extracted: usize,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub tag: String,
    pub root_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub backend: Backend,
    pub mode: ExecutionMode,
    pub points: Vec<PointOutcome>,
    pub submit_files: Vec<PathBuf>,
}

impl ScanOutcome {
    pub fn successes(&self) -> usize {
        self.points.iter().filter(|p| p.success).count()
    }

    pub fn failures(&self) -> Vec<&PointOutcome> {
        self.points
            .iter()
            .filter(|p| !p.success && !p.submitted)
            .collect()
    }

    pub fn submitted(&self) -> usize {
        self.points.iter().filter(|p| p.submitted).count()
    }

    pub fn summary(&self) -> serde_json::Value {
        let total_duration: Duration = self.points.iter().map(|p| p.duration).sum();
        let failed: Vec<serde_json::Value> = self
            .failures()
            .iter()
            .map(|p| serde_json::Value::String(p.point.describe()))
            .collect();

        serde_json::json!({
            "tag": self.tag,
            "backend": self.backend,
            "mode": self.mode,
            "root_dir": self.root_dir,
            "total_points": self.points.len(),
            "successful_points": self.successes(),
            "submitted_points": self.submitted(),
            "failed_points": failed,
            "seeded_points": self.points.iter().filter(|p| p.seeds_used > 0).count(),
            "total_duration_ms": total_duration.as_millis() as u64,
            "submit_files": self.submit_files,
            "generated_at": chrono::Utc::now().to_rfc3339(),
        })
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

/// Value, symmetric error and asymmetric errors of one fitted parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterEstimate {
    pub value: f64,
    pub error: f64,
    pub error_hi: f64,
    pub error_lo: f64,
}
