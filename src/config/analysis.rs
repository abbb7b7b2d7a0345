use crate::domain::model::Systematics;
use crate::utils::error::{QfError, Result};
use crate::utils::format::{fmt_number, linspace};
use crate::utils::validation::{
    validate_non_empty_string, validate_ordered_bounds, validate_parameter_name, validate_path,
    validate_positive_number, validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// A parameter of interest that floats (or is pinned) in every fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoiConfig {
    pub name: String,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub fixed: bool,
}

impl PoiConfig {
    /// Bare-name entries get a symmetric ±5 range around 0.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: 0.0,
            min: -5.0,
            max: 5.0,
            fixed: false,
        }
    }

    /// `name=val` when fixed, `name=val_min_max` otherwise.
    pub fn to_quickfit_str(&self, value: Option<f64>) -> String {
        let val = value.unwrap_or(self.default);
        if self.fixed {
            format!("{}={}", self.name, fmt_number(val))
        } else {
            format!(
                "{}={}_{}_{}",
                self.name,
                fmt_number(val),
                fmt_number(self.min),
                fmt_number(self.max)
            )
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PoiEntry {
    Name(String),
    Full(PoiSpec),
}

#[derive(Debug, Clone, Deserialize)]
struct PoiSpec {
    name: String,
    #[serde(default = "default_float_poi_value")]
    default: f64,
    #[serde(default = "default_float_poi_min")]
    min: f64,
    #[serde(default = "default_float_poi_max")]
    max: f64,
    #[serde(default)]
    fixed: bool,
}

impl From<PoiEntry> for PoiConfig {
    fn from(entry: PoiEntry) -> Self {
        match entry {
            PoiEntry::Name(name) => PoiConfig::named(name),
            PoiEntry::Full(spec) => PoiConfig {
                name: spec.name,
                default: spec.default,
                min: spec.min,
                max: spec.max,
                fixed: spec.fixed,
            },
        }
    }
}

fn default_float_poi_value() -> f64 {
    1.0
}

fn default_float_poi_min() -> f64 {
    -10.0
}

fn default_float_poi_max() -> f64 {
    10.0
}

fn deserialize_float_pois<'de, D>(deserializer: D) -> std::result::Result<Vec<PoiConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries: Option<Vec<PoiEntry>> = Option::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(PoiConfig::from)
        .collect())
}

/// A serialized statistical model consumed by quickFit.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceConfig {
    pub label: String,
    pub path: String,
    pub workspace_name: String,
    pub data_name: String,
    pub model_config: String,
}

impl WorkspaceConfig {
    pub fn new(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            workspace_name: default_workspace_name(),
            data_name: default_data_name(),
            model_config: default_model_config(),
        }
    }

    /// Whether the workspace file exists on this host.
    pub fn validate(&self) -> bool {
        Path::new(&self.path).is_file()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum WorkspaceEntry {
    Path(String),
    Full {
        path: String,
        #[serde(default = "default_workspace_name")]
        workspace_name: String,
        #[serde(default = "default_data_name")]
        data_name: String,
        #[serde(default = "default_model_config")]
        model_config: String,
    },
}

fn default_workspace_name() -> String {
    "combWS".to_string()
}

fn default_data_name() -> String {
    "combData".to_string()
}

fn default_model_config() -> String {
    "ModelConfig".to_string()
}

mod workspace_map {
    use super::{WorkspaceConfig, WorkspaceEntry};
    use crate::config::ordered_map;
    use serde::{Deserializer, Serializer};

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(
        workspaces: &Vec<WorkspaceConfig>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let entries: Vec<(String, WorkspaceEntry)> = workspaces
            .iter()
            .map(|ws| {
                (
                    ws.label.clone(),
                    WorkspaceEntry::Full {
                        path: ws.path.clone(),
                        workspace_name: ws.workspace_name.clone(),
                        data_name: ws.data_name.clone(),
                        model_config: ws.model_config.clone(),
                    },
                )
            })
            .collect();
        ordered_map::serialize(&entries, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<WorkspaceConfig>, D::Error> {
        let entries: Vec<(String, WorkspaceEntry)> = ordered_map::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|(label, entry)| match entry {
                WorkspaceEntry::Path(path) => WorkspaceConfig::new(label, path),
                WorkspaceEntry::Full {
                    path,
                    workspace_name,
                    data_name,
                    model_config,
                } => WorkspaceConfig {
                    label,
                    path,
                    workspace_name,
                    data_name,
                    model_config,
                },
            })
            .collect())
    }
}

/// Scan range override for one POI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_points: Option<usize>,
}

/// A one-dimensional grid of scan values.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRange {
    pub poi: String,
    pub min: f64,
    pub max: f64,
    pub n_points: usize,
}

impl ScanRange {
    pub fn new(poi: impl Into<String>, min: f64, max: f64, n_points: usize) -> Self {
        Self {
            poi: poi.into(),
            min,
            max,
            n_points,
        }
    }

    pub fn step(&self) -> f64 {
        if self.n_points <= 1 {
            return 0.0;
        }
        (self.max - self.min) / (self.n_points - 1) as f64
    }

    pub fn values(&self) -> Vec<f64> {
        linspace(self.n_points, self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickFitDefaults {
    pub min_tolerance: f64,
    pub minos: u32,
    pub hesse: u32,
    pub save_fit_result: u32,
    pub save_errors: u32,
}

impl Default for QuickFitDefaults {
    fn default() -> Self {
        Self {
            min_tolerance: 0.0001,
            minos: 0,
            hesse: 0,
            save_fit_result: 1,
            save_errors: 1,
        }
    }
}

/// Batch scheduler settings written into wrapper and submit files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CondorSettings {
    pub universe: String,
    pub use_os: String,
    pub request_cpus: u32,
    pub request_memory: u32,
    pub default_queue: String,
    pub setup_commands: Vec<String>,
}

impl Default for CondorSettings {
    fn default() -> Self {
        Self {
            universe: "vanilla".to_string(),
            use_os: "el9".to_string(),
            request_cpus: 1,
            request_memory: 64000,
            default_queue: "medium".to_string(),
            setup_commands: vec![
                "export ATLAS_LOCAL_ROOT_BASE=/cvmfs/atlas.cern.ch/repo/ATLASLocalRootBase".to_string(),
                "source ${ATLAS_LOCAL_ROOT_BASE}/user/atlasLocalSetup.sh 2>/dev/null || true"
                    .to_string(),
            ],
        }
    }
}

/// Where quickFit puts its numbers inside the output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultSchema {
    pub tree: String,
    pub nll_branches: Vec<String>,
    pub status_branches: Vec<String>,
    pub error_suffix: String,
    pub error_hi_suffix: String,
    pub error_lo_suffix: String,
}

impl Default for ResultSchema {
    fn default() -> Self {
        Self {
            tree: "nllscan".to_string(),
            nll_branches: ["nll", "NLL", "minNll", "deltaNLL"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            status_branches: ["status", "fitStatus", "fit_status", "covQual"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            error_suffix: "_err".to_string(),
            error_hi_suffix: "__up".to_string(),
            error_lo_suffix: "__down".to_string(),
        }
    }
}

impl ResultSchema {
    /// Branches that carry fit metadata rather than parameter values.
    pub fn is_bookkeeping_branch(&self, name: &str) -> bool {
        self.nll_branches.iter().any(|b| b == name)
            || self.status_branches.iter().any(|b| b == name)
            || name.ends_with(&self.error_suffix)
            || name.ends_with(&self.error_hi_suffix)
            || name.ends_with(&self.error_lo_suffix)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_analysis_name")]
    pub name: String,
    /// Combination-level POIs that scans run over.
    #[serde(default)]
    pub scan_pois: Vec<String>,
    /// Per-channel POIs, pinned to 1 when the combination-level ones are scanned.
    #[serde(default, alias = "individual_wilson_coeffs")]
    pub channel_pois: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_float_pois")]
    pub float_pois: Vec<PoiConfig>,
    #[serde(default, with = "crate::config::ordered_map")]
    pub fixed_pois: Vec<(String, f64)>,
    #[serde(default)]
    pub exclude_nps: Vec<String>,
    #[serde(default = "default_stat_only_nps")]
    pub stat_only_nps: Vec<String>,
    #[serde(default, with = "workspace_map")]
    pub workspaces: Vec<WorkspaceConfig>,
    #[serde(default)]
    pub scan_ranges: BTreeMap<String, RangeSpec>,
    #[serde(default)]
    pub quickfit_defaults: QuickFitDefaults,
    #[serde(default = "default_quickfit_path")]
    pub quickfit_path: String,
    #[serde(default = "default_channel_prefixes")]
    pub channel_prefixes: Vec<String>,
    #[serde(default = "default_poi_patterns")]
    pub poi_patterns: Vec<String>,
    #[serde(default)]
    pub condor: CondorSettings,
    #[serde(default)]
    pub results: ResultSchema,
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

fn default_analysis_name() -> String {
    "analysis".to_string()
}

fn default_stat_only_nps() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_quickfit_path() -> String {
    "quickFit".to_string()
}

fn default_channel_prefixes() -> Vec<String> {
    ["cHWtil_", "cHBtil_", "cHWBtil_", "chwtilde_", "chbtilde_", "chbwtilde_"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_poi_patterns() -> Vec<String> {
    [
        "cHWtil", "cHBtil", "cHWBtil", "chwtilde", "chbtilde", "chbwtilde", "mu_", "SigXsec",
        "CSM_", "_combine",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            name: default_analysis_name(),
            scan_pois: Vec::new(),
            channel_pois: Vec::new(),
            float_pois: Vec::new(),
            fixed_pois: Vec::new(),
            exclude_nps: Vec::new(),
            stat_only_nps: default_stat_only_nps(),
            workspaces: Vec::new(),
            scan_ranges: BTreeMap::new(),
            quickfit_defaults: QuickFitDefaults::default(),
            quickfit_path: default_quickfit_path(),
            channel_prefixes: default_channel_prefixes(),
            poi_patterns: default_poi_patterns(),
            condor: CondorSettings::default(),
            results: ResultSchema::default(),
            config_path: None,
        }
    }
}

impl AnalysisConfig {
    /// Loads YAML, or TOML when the file ends in `.toml`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(QfError::IoError)?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let mut config = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };

        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        config.config_path = Some(absolute);
        tracing::debug!(
            "Loaded analysis '{}' from {} ({} scan POIs, {} workspaces)",
            config.name,
            path.display(),
            config.scan_pois.len(),
            config.workspaces.len()
        );
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        Ok(serde_yaml_ng::from_str(&processed)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        toml::from_str(&processed).map_err(|e| QfError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    pub fn workspace(&self, label: &str) -> Result<&WorkspaceConfig> {
        self.workspaces
            .iter()
            .find(|ws| ws.label == label)
            .ok_or_else(|| QfError::UnknownWorkspace {
                label: label.to_string(),
                available: self
                    .workspaces
                    .iter()
                    .map(|ws| ws.label.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Configured range for `poi`, or −3..3 with 25 points.
    pub fn scan_range(&self, poi: &str) -> ScanRange {
        match self.scan_ranges.get(poi) {
            Some(spec) => ScanRange::new(
                poi,
                spec.min.unwrap_or(-3.0),
                spec.max.unwrap_or(3.0),
                spec.n_points.unwrap_or(25),
            ),
            None => ScanRange::new(poi, -3.0, 3.0, 25),
        }
    }

    /// Value of quickFit's `-n` flag; empty means no flag.
    pub fn exclude_nps_pattern(&self, systematics: Systematics) -> String {
        let mut patterns: Vec<&str> = self.exclude_nps.iter().map(String::as_str).collect();
        if systematics == Systematics::StatOnly {
            for pattern in &self.stat_only_nps {
                if !patterns.contains(&pattern.as_str()) {
                    patterns.push(pattern);
                }
            }
        }
        patterns.join(",")
    }

    pub fn is_scan_poi(&self, name: &str) -> bool {
        self.scan_pois.iter().any(|p| p == name)
    }

    pub fn is_channel_poi(&self, name: &str) -> bool {
        self.channel_pois.iter().any(|p| p == name)
    }

    /// Per-channel coefficients are recognised by name prefix.
    pub fn is_channel_like(&self, name: &str) -> bool {
        self.channel_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    /// Result branches matching one of `poi_patterns` count as POIs, the rest as nuisance parameters.
    pub fn is_poi_like(&self, name: &str) -> bool {
        self.poi_patterns.iter().any(|p| name.contains(p.as_str()))
    }

    pub fn float_poi(&self, name: &str) -> Option<&PoiConfig> {
        self.float_pois.iter().find(|p| p.name == name)
    }

    /// Every parameter name the configuration knows about.
    pub fn known_parameters(&self) -> HashSet<&str> {
        self.scan_pois
            .iter()
            .chain(self.channel_pois.iter())
            .map(String::as_str)
            .chain(self.float_pois.iter().map(|p| p.name.as_str()))
            .chain(self.fixed_pois.iter().map(|(name, _)| name.as_str()))
            .collect()
    }

    pub fn require_known_poi(&self, name: &str) -> Result<()> {
        if self.known_parameters().contains(name) {
            Ok(())
        } else {
            Err(QfError::UnknownPoi {
                name: name.to_string(),
            })
        }
    }

    /// Labels of workspaces whose files are missing on this host.
    pub fn missing_workspaces(&self) -> Vec<&WorkspaceConfig> {
        self.workspaces.iter().filter(|ws| !ws.validate()).collect()
    }
}

impl Validate for AnalysisConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("name", &self.name)?;
        validate_non_empty_string("quickfit_path", &self.quickfit_path)?;

        for poi in &self.scan_pois {
            validate_parameter_name("scan_pois", poi)?;
        }
        for poi in &self.channel_pois {
            validate_parameter_name("channel_pois", poi)?;
        }
        for poi in &self.float_pois {
            validate_parameter_name("float_pois", &poi.name)?;
            if !poi.fixed {
                validate_ordered_bounds(&format!("float_pois.{}", poi.name), poi.min, poi.max)?;
            }
        }
        for (name, _) in &self.fixed_pois {
            validate_parameter_name("fixed_pois", name)?;
        }

        let mut seen = HashSet::new();
        for ws in &self.workspaces {
            validate_path(&format!("workspaces.{}.path", ws.label), &ws.path)?;
            validate_non_empty_string(
                &format!("workspaces.{}.workspace_name", ws.label),
                &ws.workspace_name,
            )?;
            if !seen.insert(ws.label.as_str()) {
                return Err(QfError::ConfigValidationError {
                    field: "workspaces".to_string(),
                    message: format!("duplicate workspace label '{}'", ws.label),
                });
            }
        }

        for poi in self.scan_ranges.keys() {
            let range = self.scan_range(poi);
            validate_ordered_bounds(&format!("scan_ranges.{}", poi), range.min, range.max)?;
            validate_positive_number(&format!("scan_ranges.{}.n_points", poi), range.n_points, 1)?;
        }

        validate_range("quickfit_defaults.minos", self.quickfit_defaults.minos, 0, 1)?;
        validate_range("quickfit_defaults.hesse", self.quickfit_defaults.hesse, 0, 1)?;
        if self.quickfit_defaults.min_tolerance <= 0.0 {
            return Err(QfError::InvalidConfigValueError {
                field: "quickfit_defaults.min_tolerance".to_string(),
                value: self.quickfit_defaults.min_tolerance.to_string(),
                reason: "Tolerance must be positive".to_string(),
            });
        }

        validate_non_empty_string("results.tree", &self.results.tree)?;
        Ok(())
    }
}

/// Replaces `${VAR}` with the environment value; unknown variables stay verbatim.
fn substitute_env_vars(content: &str) -> Result<String> {
    substitute_vars(content, |name| std::env::var(name).ok())
}

fn substitute_vars(content: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        lookup(var_name).unwrap_or_else(|| format!("${{{}}}", var_name))
    });
    Ok(result.to_string())
}
