use crate::config::{AnalysisConfig, ScanRange};
use crate::core::result_parser::OutputFormat;
use crate::core::runner::ScanRequest;
use crate::domain::model::{Backend, ExecutionMode, Systematics};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "qfscan")]
#[command(about = "Runs quickFit likelihood scans, converts their outputs and plots them")]
pub struct CliConfig {
    #[arg(short, long, global = true, default_value = "configs/analysis.yaml")]
    pub config: PathBuf,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, global = true, help = "Write batch files without submitting them")]
    pub dry_run: bool,

    #[arg(long, global = true, help = "quickFit executable, overrides quickfit_path")]
    pub quickfit: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Scan one POI over a grid
    Scan1d {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        range: RangeArgs,
        /// Pin the other scan POIs at 0 instead of floating them
        #[arg(long)]
        fix_others: bool,
    },
    /// Scan two POIs over a row-major grid
    Scan2d {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        poi1: String,
        #[arg(long, allow_negative_numbers = true)]
        min1: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        max1: Option<f64>,
        #[arg(long)]
        n1: Option<usize>,
        #[arg(long)]
        poi2: String,
        #[arg(long, allow_negative_numbers = true)]
        min2: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        max2: Option<f64>,
        #[arg(long)]
        n2: Option<usize>,
        #[arg(long)]
        fix_others: bool,
    },
    /// Unconditional fit of every scan POI
    Fit {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        hesse: bool,
    },
    /// 1D scan floating a chosen subset of the other scan POIs
    VariableScan {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, value_delimiter = ',')]
        float_pois: Vec<String>,
        /// Two sequential legs from 0 towards max and towards min
        #[arg(long)]
        split_scan: bool,
    },
    /// Print the quickFit -p string for one point
    Poi(PoiArgs),
    /// Print fitted values from a result file
    Parse {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Simple)]
        format: OutputFormat,
        /// Only these parameters
        #[arg(long, value_delimiter = ',')]
        pois: Vec<String>,
        /// Every parameter, nuisance parameters included
        #[arg(long, conflicts_with = "pois")]
        all: bool,
    },
    /// Turn a directory of per-point outputs into a ΔNLL table
    Convert {
        #[arg(short, long)]
        input_dir: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        poi: String,
        /// Second POI of a 2D scan
        #[arg(long)]
        poi2: Option<String>,
        #[arg(long, default_value = "fit_*.root")]
        pattern: String,
    },
    #[command(subcommand)]
    Plot(PlotCommand),
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Options shared by every command that runs fits.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[arg(short, long)]
    pub workspace: String,

    #[arg(long, value_enum, default_value_t = ExecutionMode::Parallel)]
    pub mode: ExecutionMode,

    #[arg(long, value_enum, default_value_t = Backend::Local)]
    pub backend: Backend,

    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub tag: Option<String>,

    #[arg(long, help = "HTCondor job category")]
    pub queue: Option<String>,

    #[arg(long, value_enum)]
    pub systematics: Option<Systematics>,

    /// Passed to quickFit unchanged; repeat for several
    #[arg(long = "extra-arg", allow_hyphen_values = true)]
    pub extra_args: Vec<String>,
}

impl RunArgs {
    pub fn to_request(&self, default_systematics: Systematics) -> ScanRequest {
        let mut request = ScanRequest::new(&self.workspace)
            .with_mode(self.mode)
            .with_backend(self.backend)
            .with_output_dir(&self.output_dir)
            .with_systematics(self.systematics.unwrap_or(default_systematics));
        if let Some(tag) = &self.tag {
            request = request.with_tag(tag);
        }
        request.queue = self.queue.clone();
        request.extra_args = self.extra_args.clone();
        request
    }
}

/// Grid of one POI; unset bounds come from `scan_ranges` in the configuration.
#[derive(Debug, Clone, Args)]
pub struct RangeArgs {
    #[arg(long)]
    pub poi: String,
    #[arg(long, allow_negative_numbers = true)]
    pub min: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub max: Option<f64>,
    #[arg(long)]
    pub n_points: Option<usize>,
}

impl RangeArgs {
    pub fn resolve(&self, config: &AnalysisConfig) -> ScanRange {
        resolve_range(config, &self.poi, self.min, self.max, self.n_points)
    }
}

pub fn resolve_range(
    config: &AnalysisConfig,
    poi: &str,
    min: Option<f64>,
    max: Option<f64>,
    n_points: Option<usize>,
) -> ScanRange {
    let defaults = config.scan_range(poi);
    ScanRange::new(
        poi,
        min.unwrap_or(defaults.min),
        max.unwrap_or(defaults.max),
        n_points.unwrap_or(defaults.n_points),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PoiScanType {
    #[value(name = "1d")]
    OneD,
    #[value(name = "2d")]
    TwoD,
    Fit,
    Channel,
    Variable,
}

#[derive(Debug, Clone, Args)]
pub struct PoiArgs {
    #[arg(long, value_enum)]
    pub scan_type: PoiScanType,
    #[arg(long)]
    pub scan_par: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub scan_val: Option<f64>,
    #[arg(long)]
    pub scan_par2: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub scan_val2: Option<f64>,
    #[arg(long, value_delimiter = ',')]
    pub float_pois: Vec<String>,
    #[arg(long)]
    pub fix_others: bool,
    /// Seeds as `name=value,...`, usually the output of `parse --format seeds`
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub previous: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum PlotCommand {
    /// Overlay 1D scan tables (`label=path` or `path`)
    Scan1d {
        #[arg(short, long = "input", required = true)]
        inputs: Vec<String>,
        #[arg(long)]
        poi: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Density and contours of 2D scan tables
    Scan2d {
        #[arg(short, long = "input", required = true)]
        inputs: Vec<String>,
        #[arg(long)]
        poi1: String,
        #[arg(long)]
        poi2: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Likelihood and floating POIs along a variable scan
    Profile {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        poi: String,
        #[arg(long, value_delimiter = ',')]
        floating: Vec<String>,
        /// Defaults to `fit_<poi>_*.root`
        #[arg(long)]
        pattern: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Value of a floating POI across a 2D scan
    Profiled2d {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        poi1: String,
        #[arg(long)]
        poi2: String,
        /// Defaults to the first scan POI that is neither poi1 nor poi2
        #[arg(long)]
        floating: Option<String>,
        #[arg(long, default_value = "fit_*.root")]
        pattern: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Best-fit values with errors for up to four results (`label=path`)
    Summary {
        #[arg(short, long = "input", required = true)]
        inputs: Vec<String>,
        /// Defaults to the configured scan POIs
        #[arg(long, value_delimiter = ',')]
        pois: Vec<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Validate the configuration and report missing workspace files
    Check,
    /// Print the effective configuration as YAML
    Dump,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan1d_with_negative_bounds() {
        let cli = CliConfig::try_parse_from([
            "qfscan",
            "--config",
            "a.yaml",
            "scan1d",
            "--workspace",
            "linear_obs",
            "--poi",
            "cHWtil_combine",
            "--min",
            "-2",
            "--max=2",
            "--mode",
            "sequential",
            "--extra-arg",
            "--hesse",
        ])
        .unwrap();

        match cli.command {
            Command::Scan1d { run, range, fix_others } => {
                assert_eq!(range.min, Some(-2.0));
                assert_eq!(range.max, Some(2.0));
                assert_eq!(run.mode, ExecutionMode::Sequential);
                assert_eq!(run.extra_args, vec!["--hesse"]);
                assert!(!fix_others);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_poi_command_like_batch_script() {
        let cli = CliConfig::try_parse_from([
            "qfscan",
            "poi",
            "--config",
            "/abs/config.yaml",
            "--scan-type=2d",
            "--scan-par=a",
            "--scan-val=-0.500000",
            "--scan-par2=b",
            "--scan-val2=1.000000",
            "--previous=",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("/abs/config.yaml"));
        let Command::Poi(args) = cli.command else {
            panic!("expected poi");
        };
        assert_eq!(args.scan_type, PoiScanType::TwoD);
        assert_eq!(args.scan_val, Some(-0.5));
        assert_eq!(args.previous, "");
    }

    #[test]
    fn test_run_args_to_request() {
        let cli = CliConfig::try_parse_from([
            "qfscan",
            "variable-scan",
            "-w",
            "linear_obs",
            "--poi",
            "a",
            "--float-pois",
            "b,c",
            "--backend",
            "condor",
            "--tag",
            "t1",
        ])
        .unwrap();

        let Command::VariableScan { run, float_pois, split_scan, .. } = cli.command else {
            panic!("expected variable-scan");
        };
        assert_eq!(float_pois, vec!["b", "c"]);
        assert!(!split_scan);

        let request = run.to_request(Systematics::StatOnly);
        assert_eq!(request.backend, Backend::Condor);
        assert_eq!(request.systematics, Systematics::StatOnly);
        assert_eq!(request.tag.as_deref(), Some("t1"));
    }

    #[test]
    fn test_resolve_range_defaults() {
        let config = AnalysisConfig::default();
        let range = resolve_range(&config, "x", Some(-1.0), None, None);
        assert_eq!((range.min, range.max, range.n_points), (-1.0, 3.0, 25));
    }
}
