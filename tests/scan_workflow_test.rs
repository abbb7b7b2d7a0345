use anyhow::Result;
use async_trait::async_trait;
use qfscan::adapters::{DryRunSubmitter, TextTableReader};
use qfscan::app::plots::{self, Grid2d};
use qfscan::config::{AnalysisConfig, ResultSchema, ScanRange};
use qfscan::core::converter::ScanConverter;
use qfscan::domain::model::{Backend, ExecutionMode, RunStatus, ScanOutcome};
use qfscan::domain::ports::FitExecutor;
use qfscan::{QuickFitCommand, ScanRequest, ScanRunner};
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

const CONFIG: &str = r#"
name: cp_odd_combination
scan_pois: [cHWtil_combine, cHBtil_combine, cHWBtil_combine]
workspaces:
  linear_obs: workspaces/linear_obs.root
scan_ranges:
  cHWtil_combine: { min: -1.0, max: 2.0, n_points: 7 }
"#;

/// Stands in for quickFit: writes a one-row result table whose likelihood is
/// a parabola in the scanned POIs.
#[derive(Default)]
struct ParabolaFit {
    pois: Mutex<Vec<String>>,
}

fn pinned_value(pois: &str, name: &str) -> f64 {
    pois.split(',')
        .filter_map(|item| item.split_once('='))
        .find(|(poi, _)| *poi == name)
        .and_then(|(_, value)| value.split('_').next())
        .and_then(|value| value.parse().ok())
        .unwrap_or(0.0)
}

#[async_trait]
impl FitExecutor for ParabolaFit {
    async fn execute(
        &self,
        command: &QuickFitCommand,
        log_file: Option<&Path>,
    ) -> qfscan::Result<RunStatus> {
        let x = pinned_value(&command.pois, "cHWtil_combine");
        let y = pinned_value(&command.pois, "cHBtil_combine");
        let nll = 100.0 + 2.0 * (x - 0.5).powi(2) + (y + 0.5).powi(2);

        std::fs::write(
            &command.output_file,
            format!(
                "cHWtil_combine\tcHBtil_combine\tnll\tstatus\n{}\t{}\t{}\t0\n",
                x, y, nll
            ),
        )?;
        if let Some(log) = log_file {
            std::fs::write(log, command.to_shell_string())?;
        }
        self.pois.lock().unwrap().push(command.pois.clone());
        Ok(RunStatus::from_code(Some(0)))
    }
}

#[tokio::test]
async fn test_sequential_scan_convert_and_plot() -> Result<()> {
    let dir = TempDir::new()?;
    let config = AnalysisConfig::from_yaml_str(CONFIG)?;
    let range = config.scan_range("cHWtil_combine");
    let runner = ScanRunner::new(config, ParabolaFit::default(), TextTableReader, DryRunSubmitter);

    let request = ScanRequest::new("linear_obs")
        .with_mode(ExecutionMode::Sequential)
        .with_output_dir(dir.path())
        .with_tag("seq");
    let outcome = runner.run_1d_scan(&request, &range).await?;

    assert_eq!(outcome.points.len(), 7);
    assert_eq!(outcome.successes(), 7);
    assert!(outcome.logs_dir.join("scan_summary.json").is_file());

    let table = dir.path().join("scan_cHWtil.txt");
    let converter = ScanConverter::new(&TextTableReader, ResultSchema::default());
    let n = converter.convert_1d_scan(&outcome.root_dir, &table, "cHWtil_combine", "fit_*.root")?;
    assert_eq!(n, 7);

    let points = plots::read_scan_table(&table)?.points_1d();
    let output = dir.path().join("plots/scan_cHWtil.svg");
    let profiles = plots::plot_scan_1d(&[("seq".to_string(), points)], "cHWtil_combine", &output)?;

    let profile = &profiles[0].1;
    assert!((profile.best_fit - 0.5).abs() < 1e-9);
    assert!((profile.cl68.lo.unwrap() - 0.0).abs() < 1e-6);
    assert!((profile.cl68.hi.unwrap() - 1.0).abs() < 1e-6);
    assert!(output.is_file());
    Ok(())
}

#[tokio::test]
async fn test_sequential_seeds_reach_the_next_point() -> Result<()> {
    let dir = TempDir::new()?;
    let config = AnalysisConfig::from_yaml_str(CONFIG)?;
    let executor = ParabolaFit::default();
    let runner = ScanRunner::new(config, executor, TextTableReader, DryRunSubmitter);

    let request = ScanRequest::new("linear_obs")
        .with_mode(ExecutionMode::Sequential)
        .with_output_dir(dir.path())
        .with_tag("seeded");
    let outcome = runner
        .run_1d_scan(&request, &ScanRange::new("cHWtil_combine", 0.0, 1.0, 2))
        .await?;

    assert_eq!(outcome.points[0].seeds_used, 0);
    assert!(outcome.points[1].seeds_used > 0);
    Ok(())
}

#[tokio::test]
async fn test_parallel_2d_scan_to_contours() -> Result<()> {
    let dir = TempDir::new()?;
    let config = AnalysisConfig::from_yaml_str(CONFIG)?;
    let runner = ScanRunner::new(config, ParabolaFit::default(), TextTableReader, DryRunSubmitter);

    let request = ScanRequest::new("linear_obs")
        .with_output_dir(dir.path())
        .with_tag("grid");
    let outcome = runner
        .run_2d_scan(
            &request,
            &ScanRange::new("cHWtil_combine", -1.0, 2.0, 7),
            &ScanRange::new("cHBtil_combine", -2.0, 1.0, 7),
        )
        .await?;
    assert_eq!(outcome.points.len(), 49);
    assert!(outcome.points.iter().all(|p| p.seeds_used == 0));

    let table = dir.path().join("scan2d.txt");
    ScanConverter::new(&TextTableReader, ResultSchema::default()).convert_2d_scan(
        &outcome.root_dir,
        &table,
        "cHWtil_combine",
        "cHBtil_combine",
        "fit_*.root",
    )?;

    let points = plots::read_scan_table(&table)?.points_2d();
    let grid = Grid2d::delta_nll(&points).expect("grid");
    let (bx, by, _) = grid.minimum().expect("minimum");
    assert!((bx - 0.5).abs() < 1e-9 && (by + 0.5).abs() < 1e-9);
    assert!(!grid.contour(plots::grid::CL68_2D).is_empty());

    let output = dir.path().join("scan2d.svg");
    plots::plot_scan_2d(&[("grid".to_string(), grid)], "cHWtil_combine", "cHBtil_combine", &output)?;
    assert!(output.is_file());
    Ok(())
}

#[tokio::test]
async fn test_split_scan_runs_two_legs_from_zero() -> Result<()> {
    let dir = TempDir::new()?;
    let config = AnalysisConfig::from_yaml_str(CONFIG)?;
    let runner = ScanRunner::new(config, ParabolaFit::default(), TextTableReader, DryRunSubmitter);

    let request = ScanRequest::new("linear_obs")
        .with_output_dir(dir.path())
        .with_tag("split");
    let outcomes = runner
        .run_split_scan(
            &request,
            &ScanRange::new("cHWtil_combine", -1.0, 2.0, 5),
            &["cHBtil_combine".to_string()],
        )
        .await?;

    assert_eq!(outcomes.len(), 2);
    let (positive, negative) = (&outcomes[0], &outcomes[1]);
    assert_eq!(positive.tag, "split_positive");
    assert_eq!(negative.tag, "split_negative");
    assert_eq!(positive.root_dir, dir.path().join("root_split"));
    assert_eq!(negative.root_dir, positive.root_dir);

    let values = |outcome: &ScanOutcome| -> Vec<f64> {
        outcome.points.iter().map(|p| p.point.coordinates[0].1).collect()
    };
    assert_eq!(values(positive), vec![0.0, 1.0, 2.0]);
    assert_eq!(values(negative), vec![0.0, -0.5, -1.0]);
    assert!(outcomes.iter().all(|o| o.mode == ExecutionMode::Sequential));
    assert!(outcomes.iter().all(|o| o.points[0].seeds_used == 0));
    assert!(outcomes.iter().all(|o| o.points[1].seeds_used > 0));

    let logs = dir.path().join("logs_split");
    assert!(logs.join("scan_summary_positive.json").is_file());
    assert!(logs.join("scan_summary_negative.json").is_file());
    assert!(!logs.join("scan_summary.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_condor_sequential_dry_run_writes_callback_script() -> Result<()> {
    let dir = TempDir::new()?;
    let config_path = dir.path().join("analysis.yaml");
    std::fs::write(&config_path, CONFIG)?;
    let config = AnalysisConfig::from_file(&config_path)?;

    let runner = ScanRunner::new(config, ParabolaFit::default(), TextTableReader, DryRunSubmitter)
        .with_self_program("/opt/bin/qfscan")
        .with_workdir(dir.path());
    let request = ScanRequest::new("linear_obs")
        .with_mode(ExecutionMode::Sequential)
        .with_backend(Backend::Condor)
        .with_output_dir(dir.path())
        .with_tag("batch");
    let outcome = runner
        .run_1d_scan(&request, &ScanRange::new("cHWtil_combine", -1.0, 1.0, 3))
        .await?;

    assert_eq!(outcome.submitted(), 3);
    assert!(outcome.failures().is_empty());
    assert_eq!(outcome.submit_files.len(), 1);
    assert!(outcome.submit_files[0].is_file());

    let script = std::fs::read_to_string(outcome.logs_dir.join("batch_sequential.sh"))?;
    assert!(script.contains("qfscan=/opt/bin/qfscan"));
    assert_eq!(script.matches("\"$qfscan\" poi --config").count(), 3);
    assert_eq!(script.matches("\"$qfscan\" parse --config").count(), 2);
    assert!(script.contains("--scan-val=-1.000000"));
    Ok(())
}
