//! Executes parsed `qfscan` subcommands.

use crate::adapters::{AutoReader, CondorSubmitter, DryRunSubmitter, LocalExecutor};
use crate::app::plots;
use crate::config::cli::{
    resolve_range, CliConfig, Command, ConfigCommand, PlotCommand, PoiArgs, PoiScanType,
};
use crate::config::AnalysisConfig;
use crate::core::converter::ScanConverter;
use crate::core::poi_builder::{parse_seed_string, PoiBuilder};
use crate::core::result_parser::{
    format_detailed, format_json, format_seeds, format_simple, OutputFormat, PoiFilter,
    ResultParser,
};
use crate::core::runner::ScanRunner;
use crate::domain::model::{ScanOutcome, Systematics};
use crate::domain::ports::JobSubmitter;
use crate::utils::error::{QfError, Result};
use crate::utils::validation::Validate;
use async_trait::async_trait;
use std::path::Path;

/// Real or dry-run submission, picked from `--dry-run`.
enum Submitter {
    Condor(CondorSubmitter),
    DryRun(DryRunSubmitter),
}

#[async_trait]
impl JobSubmitter for Submitter {
    async fn submit(&self, submit_file: &Path) -> Result<()> {
        match self {
            Submitter::Condor(s) => s.submit(submit_file).await,
            Submitter::DryRun(s) => s.submit(submit_file).await,
        }
    }
}

type Runner = ScanRunner<LocalExecutor, AutoReader, Submitter>;

fn load_config(cli: &CliConfig) -> Result<AnalysisConfig> {
    let mut config = AnalysisConfig::from_file(&cli.config)?;
    if let Some(quickfit) = &cli.quickfit {
        config.quickfit_path = quickfit.clone();
    }
    config.validate()?;
    tracing::debug!("Loaded configuration '{}' from {}", config.name, cli.config.display());
    Ok(config)
}

fn runner(cli: &CliConfig, config: AnalysisConfig) -> Runner {
    let submitter = if cli.dry_run {
        Submitter::DryRun(DryRunSubmitter)
    } else {
        Submitter::Condor(CondorSubmitter::default())
    };
    ScanRunner::new(config, LocalExecutor::new(), AutoReader, submitter)
}

fn report(outcome: &ScanOutcome) {
    tracing::info!("📁 Results in {}", outcome.root_dir.display());
    tracing::info!("📝 Logs in {}", outcome.logs_dir.display());
    for failure in outcome.failures() {
        tracing::warn!(
            "❌ {} failed, see {}",
            failure.point.describe(),
            failure.log_file.display()
        );
    }
    for submit_file in &outcome.submit_files {
        tracing::info!("📤 Submit file: {}", submit_file.display());
    }
}

pub async fn execute(cli: &CliConfig) -> Result<()> {
    match &cli.command {
        Command::Scan1d { run, range, fix_others } => {
            let config = load_config(cli)?;
            let range = range.resolve(&config);
            let mut request = run.to_request(Systematics::FullSyst);
            request.fix_other_scan_pois = *fix_others;
            let outcome = runner(cli, config).run_1d_scan(&request, &range).await?;
            report(&outcome);
        }
        Command::Scan2d {
            run,
            poi1,
            min1,
            max1,
            n1,
            poi2,
            min2,
            max2,
            n2,
            fix_others,
        } => {
            let config = load_config(cli)?;
            let range1 = resolve_range(&config, poi1, *min1, *max1, *n1);
            let range2 = resolve_range(&config, poi2, *min2, *max2, *n2);
            let mut request = run.to_request(Systematics::FullSyst);
            request.fix_other_scan_pois = *fix_others;
            let outcome = runner(cli, config)
                .run_2d_scan(&request, &range1, &range2)
                .await?;
            report(&outcome);
        }
        Command::Fit { run, hesse } => {
            let config = load_config(cli)?;
            let request = run.to_request(Systematics::FullSyst);
            let outcome = runner(cli, config).run_fit(&request, *hesse).await?;
            report(&outcome);
        }
        Command::VariableScan {
            run,
            range,
            float_pois,
            split_scan,
        } => {
            let config = load_config(cli)?;
            let range = range.resolve(&config);
            let request = run.to_request(Systematics::StatOnly);
            let runner = runner(cli, config);
            if *split_scan {
                for outcome in runner.run_split_scan(&request, &range, float_pois).await? {
                    report(&outcome);
                }
            } else {
                let outcome = runner.run_variable_scan(&request, &range, float_pois).await?;
                report(&outcome);
            }
        }
        Command::Poi(args) => {
            let config = load_config(cli)?;
            println!("{}", build_poi_string(&config, args)?);
        }
        Command::Parse {
            input,
            format,
            pois,
            all,
        } => {
            let config = load_config(cli)?;
            let filter = if *all {
                PoiFilter::All
            } else if !pois.is_empty() {
                PoiFilter::Names(pois.clone())
            } else {
                PoiFilter::PoiLike
            };
            print!("{}", parse_output(&config, input, *format, &filter)?);
        }
        Command::Convert {
            input_dir,
            output,
            poi,
            poi2,
            pattern,
        } => {
            let config = load_config(cli)?;
            let converter = ScanConverter::new(&AutoReader, config.results.clone());
            let n = match poi2 {
                Some(poi2) => converter.convert_2d_scan(input_dir, output, poi, poi2, pattern)?,
                None => converter.convert_1d_scan(input_dir, output, poi, pattern)?,
            };
            tracing::info!("✅ Converted {} points", n);
        }
        Command::Plot(plot) => run_plot(cli, plot)?,
        Command::Config(ConfigCommand::Check) => {
            let config = load_config(cli)?;
            let missing = config.missing_workspaces();
            for ws in &missing {
                tracing::warn!("⚠️ Workspace '{}' not found at {}", ws.label, ws.path);
            }
            println!(
                "✅ {}: {} workspaces ({} missing), {} scan POIs",
                config.name,
                config.workspaces.len(),
                missing.len(),
                config.scan_pois.len()
            );
        }
        Command::Config(ConfigCommand::Dump) => {
            let config = load_config(cli)?;
            print!("{}", config.to_yaml_string()?);
        }
    }
    Ok(())
}

fn required<'a, T>(value: &'a Option<T>, flag: &str, scan_type: &str) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| QfError::MissingConfigError {
        field: format!("{} (needed by --scan-type={})", flag, scan_type),
    })
}

/// `-p` string for one point, seeded from `--previous`.
pub fn build_poi_string(config: &AnalysisConfig, args: &PoiArgs) -> Result<String> {
    let builder = PoiBuilder::new(config);
    let seeds = parse_seed_string(&args.previous);

    let pois = match args.scan_type {
        PoiScanType::Fit => builder.build_fit(&config.scan_ranges, &seeds),
        PoiScanType::OneD => builder.build_1d_scan(
            required(&args.scan_par, "--scan-par", "1d")?,
            *required(&args.scan_val, "--scan-val", "1d")?,
            &seeds,
            args.fix_others,
        ),
        PoiScanType::TwoD => builder.build_2d_scan(
            required(&args.scan_par, "--scan-par", "2d")?,
            *required(&args.scan_val, "--scan-val", "2d")?,
            required(&args.scan_par2, "--scan-par2", "2d")?,
            *required(&args.scan_val2, "--scan-val2", "2d")?,
            &seeds,
            args.fix_others,
        ),
        PoiScanType::Channel => builder.build_channel_scan(
            required(&args.scan_par, "--scan-par", "channel")?,
            *required(&args.scan_val, "--scan-val", "channel")?,
            &seeds,
        ),
        PoiScanType::Variable => builder.build_variable_scan(
            required(&args.scan_par, "--scan-par", "variable")?,
            *required(&args.scan_val, "--scan-val", "variable")?,
            &args.float_pois,
            &seeds,
        ),
    };
    Ok(pois)
}

pub fn parse_output(
    config: &AnalysisConfig,
    input: &Path,
    format: OutputFormat,
    filter: &PoiFilter,
) -> Result<String> {
    let reader = AutoReader;
    let parser = ResultParser::new(&reader, config);
    match format {
        OutputFormat::Simple => Ok(format_simple(&parser.extract_pois(input, filter)?)),
        OutputFormat::Seeds => Ok(format_seeds(&parser.extract_pois(input, filter)?) + "\n"),
        OutputFormat::Detailed => Ok(format_detailed(&parser.extract_full(input, filter)?)),
        OutputFormat::Json => Ok(format_json(&parser.extract_full(input, filter)?)? + "\n"),
    }
}

fn run_plot(cli: &CliConfig, plot: &PlotCommand) -> Result<()> {
    match plot {
        PlotCommand::Scan1d { inputs, poi, output } => {
            let mut curves = Vec::with_capacity(inputs.len());
            for raw in inputs {
                let (label, path) = plots::parse_labelled_input(raw);
                curves.push((label, plots::read_scan_table(&path)?.points_1d()));
            }
            for (label, profile) in plots::plot_scan_1d(&curves, poi, output)? {
                tracing::info!(
                    "📈 {}: best fit {:.4}, 68% CL [{:?}, {:?}], 95% CL [{:?}, {:?}]",
                    label,
                    profile.best_fit,
                    profile.cl68.lo,
                    profile.cl68.hi,
                    profile.cl95.lo,
                    profile.cl95.hi
                );
            }
        }
        PlotCommand::Scan2d {
            inputs,
            poi1,
            poi2,
            output,
        } => {
            let mut grids = Vec::with_capacity(inputs.len());
            for raw in inputs {
                let (label, path) = plots::parse_labelled_input(raw);
                let points = plots::read_scan_table(&path)?.points_2d();
                let grid = plots::Grid2d::delta_nll(&points).ok_or_else(|| {
                    QfError::ExtractionError {
                        path: path.clone(),
                        details: "no three-column rows".to_string(),
                    }
                })?;
                grids.push((label, grid));
            }
            plots::plot_scan_2d(&grids, poi1, poi2, output)?;
        }
        PlotCommand::Profile {
            input,
            poi,
            floating,
            pattern,
            output,
        } => {
            let config = load_config(cli)?;
            let reader = AutoReader;
            let parser = ResultParser::new(&reader, &config);
            let pattern = pattern
                .clone()
                .unwrap_or_else(|| format!("fit_{}_*.root", poi));
            let points = plots::load_profile_points(&parser, input, poi, floating, &pattern)?;
            plots::plot_profile(&points, poi, floating, output)?;
        }
        PlotCommand::Profiled2d {
            input,
            poi1,
            poi2,
            floating,
            pattern,
            output,
        } => {
            let config = load_config(cli)?;
            let floating = match floating {
                Some(name) => name.clone(),
                None => config
                    .scan_pois
                    .iter()
                    .find(|p| *p != poi1 && *p != poi2)
                    .cloned()
                    .ok_or_else(|| QfError::MissingConfigError {
                        field: "floating".to_string(),
                    })?,
            };
            let reader = AutoReader;
            let parser = ResultParser::new(&reader, &config);
            let points =
                plots::load_profiled_points(&parser, input, poi1, poi2, &floating, pattern)?;
            plots::plot_profiled_2d(&points, poi1, poi2, &floating, output)?;
        }
        PlotCommand::Summary {
            inputs,
            pois,
            output,
        } => {
            let config = load_config(cli)?;
            let pois = if pois.is_empty() {
                config.scan_pois.clone()
            } else {
                pois.clone()
            };
            let inputs: Vec<_> = inputs
                .iter()
                .map(|raw| plots::parse_labelled_input(raw))
                .collect();
            let reader = AutoReader;
            let parser = ResultParser::new(&reader, &config);
            let results = plots::load_fit_summary(&parser, &inputs, &pois)?;
            plots::plot_fit_summary(&results, &pois, output)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config() -> AnalysisConfig {
        AnalysisConfig::from_yaml_str(
            r#"
scan_pois: [cHWtil_combine, cHBtil_combine, cHWBtil_combine]
workspaces:
  linear_obs: ws.root
"#,
        )
        .unwrap()
    }

    fn poi_args(args: &[&str]) -> PoiArgs {
        let mut argv = vec!["qfscan", "poi"];
        argv.extend_from_slice(args);
        match CliConfig::try_parse_from(argv).unwrap().command {
            Command::Poi(args) => args,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_poi_string_uses_previous_seeds() {
        let config = config();
        let args = poi_args(&[
            "--scan-type=1d",
            "--scan-par=cHWtil_combine",
            "--scan-val=0.5",
            "--previous=cHBtil_combine=0.25,cHWBtil_combine=-0.1",
        ]);
        let pois = build_poi_string(&config, &args).unwrap();
        assert!(pois.contains("cHWtil_combine=0.5"));
        assert!(pois.contains("cHBtil_combine=0.25"));
    }

    #[test]
    fn test_poi_string_requires_scan_par() {
        let config = config();
        let args = poi_args(&["--scan-type=2d", "--scan-par=a", "--scan-val=1"]);
        assert!(matches!(
            build_poi_string(&config, &args),
            Err(QfError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_parse_output_seeds_from_text_table() {
        let config = config();
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "cHWtil_combine\tcHBtil_combine\talpha_JES\tnll").unwrap();
        writeln!(file, "0.1\t-0.2\t0.3\t5.0").unwrap();

        let seeds = parse_output(&config, file.path(), OutputFormat::Seeds, &PoiFilter::PoiLike)
            .unwrap();
        assert_eq!(seeds, "cHBtil_combine=-0.200000,cHWtil_combine=0.100000\n");

        let json = parse_output(&config, file.path(), OutputFormat::Json, &PoiFilter::All).unwrap();
        assert!(json.contains("alpha_JES"));
    }
}
