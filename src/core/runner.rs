//! Drives quickFit over grids of POI values.
//!
//! Locally every point runs to completion before the next one starts; in
//! sequential mode the best fit of a point seeds the next. On HTCondor the
//! runner only writes wrapper scripts and submit files and hands them to the
//! scheduler.

use crate::adapters::condor::{write_multi_submit, write_single_submit, write_wrapper};
use crate::config::{AnalysisConfig, QuickFitDefaults, RangeSpec, ScanRange, WorkspaceConfig};
use crate::core::command::{shell_quote, QuickFitCommand};
use crate::core::poi_builder::PoiBuilder;
use crate::core::result_parser::{PoiFilter, ResultParser};
use crate::domain::model::{
    Backend, ExecutionMode, PointOutcome, RunStatus, ScanOutcome, ScanPoint, Seeds, Systematics,
};
use crate::domain::ports::{FitExecutor, JobSubmitter, ResultReader};
use crate::utils::error::{QfError, Result};
use crate::utils::format::{fmt_poi_value, linspace};
use crate::utils::validation::validate_positive_number;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Settings shared by every kind of run.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub workspace: String,
    pub mode: ExecutionMode,
    pub backend: Backend,
    pub output_dir: PathBuf,
    pub tag: Option<String>,
    pub queue: Option<String>,
    pub extra_args: Vec<String>,
    pub systematics: Systematics,
    pub fix_other_scan_pois: bool,
}

impl ScanRequest {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            mode: ExecutionMode::Parallel,
            backend: Backend::Local,
            output_dir: PathBuf::from("."),
            tag: None,
            queue: None,
            extra_args: Vec::new(),
            systematics: Systematics::FullSyst,
            fix_other_scan_pois: false,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_systematics(mut self, systematics: Systematics) -> Self {
        self.systematics = systematics;
        self
    }

    fn resolve_tag(&self, parts: &[&str]) -> String {
        self.tag.clone().unwrap_or_else(|| {
            format!(
                "{}_{}_{}",
                self.workspace,
                parts.join("_"),
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            )
        })
    }
}

/// How the `-p` string of a point is assembled.
#[derive(Debug, Clone)]
enum PoiLayout {
    Grid { fix_others: bool },
    Variable { float_pois: Vec<String> },
    Fit,
}

impl PoiLayout {
    fn build(
        &self,
        builder: &PoiBuilder<'_>,
        point: &ScanPoint,
        seeds: &Seeds,
        ranges: &BTreeMap<String, RangeSpec>,
    ) -> String {
        match (self, point.coordinates.as_slice()) {
            (PoiLayout::Grid { fix_others }, [(poi, value)]) => {
                builder.build_1d_scan(poi, *value, seeds, *fix_others)
            }
            (PoiLayout::Grid { fix_others }, [(poi1, value1), (poi2, value2)]) => {
                builder.build_2d_scan(poi1, *value1, poi2, *value2, seeds, *fix_others)
            }
            (PoiLayout::Variable { float_pois }, [(poi, value)]) => {
                builder.build_variable_scan(poi, *value, float_pois, seeds)
            }
            _ => builder.build_fit(ranges, seeds),
        }
    }

    /// Arguments of `qfscan poi` that rebuild the same string inside a batch job.
    fn cli_args(&self, point: &ScanPoint) -> Vec<String> {
        let mut args = Vec::new();
        match (self, point.coordinates.as_slice()) {
            (PoiLayout::Grid { fix_others }, [(poi, value)]) => {
                args.push("--scan-type=1d".to_string());
                args.push(format!("--scan-par={}", poi));
                args.push(format!("--scan-val={}", fmt_poi_value(*value)));
                if *fix_others {
                    args.push("--fix-others".to_string());
                }
            }
            (PoiLayout::Grid { fix_others }, [(poi1, value1), (poi2, value2)]) => {
                args.push("--scan-type=2d".to_string());
                args.push(format!("--scan-par={}", poi1));
                args.push(format!("--scan-val={}", fmt_poi_value(*value1)));
                args.push(format!("--scan-par2={}", poi2));
                args.push(format!("--scan-val2={}", fmt_poi_value(*value2)));
                if *fix_others {
                    args.push("--fix-others".to_string());
                }
            }
            (PoiLayout::Variable { float_pois }, [(poi, value)]) => {
                args.push("--scan-type=variable".to_string());
                args.push(format!("--scan-par={}", poi));
                args.push(format!("--scan-val={}", fmt_poi_value(*value)));
                if !float_pois.is_empty() {
                    args.push(format!("--float-pois={}", float_pois.join(",")));
                }
            }
            _ => args.push("--scan-type=fit".to_string()),
        }
        args
    }
}

#[derive(Debug, Clone)]
struct PlannedPoint {
    point: ScanPoint,
    stem: String,
    job_name: String,
}

#[derive(Debug, Clone)]
struct ScanPlan {
    tag: String,
    job_name: String,
    root_dir: PathBuf,
    logs_dir: PathBuf,
    summary_file: String,
    workspace: WorkspaceConfig,
    layout: PoiLayout,
    defaults: QuickFitDefaults,
    points: Vec<PlannedPoint>,
}

impl ScanPlan {
    fn new(
        request: &ScanRequest,
        workspace: &WorkspaceConfig,
        defaults: &QuickFitDefaults,
        tag: String,
        layout: PoiLayout,
        points: Vec<ScanPoint>,
    ) -> Self {
        let points = points
            .into_iter()
            .map(|point| {
                let stem = point.file_stem();
                PlannedPoint {
                    job_name: format!("{}_{}", tag, stem),
                    stem,
                    point,
                }
            })
            .collect();

        Self {
            root_dir: request.output_dir.join(format!("root_{}", tag)),
            logs_dir: request.output_dir.join(format!("logs_{}", tag)),
            summary_file: "scan_summary.json".to_string(),
            job_name: tag.clone(),
            tag,
            workspace: workspace.clone(),
            layout,
            defaults: defaults.clone(),
            points,
        }
    }

    fn output_file(&self, planned: &PlannedPoint) -> PathBuf {
        self.root_dir.join(format!("{}.root", planned.stem))
    }

    fn log_file(&self, planned: &PlannedPoint) -> PathBuf {
        self.logs_dir.join(format!("{}.log", planned.stem))
    }
}

pub struct ScanRunner<E, R, S> {
    config: AnalysisConfig,
    executor: E,
    reader: R,
    submitter: S,
    self_program: Option<PathBuf>,
    workdir: Option<PathBuf>,
}

impl<E, R, S> ScanRunner<E, R, S>
where
    E: FitExecutor,
    R: ResultReader,
    S: JobSubmitter,
{
    pub fn new(config: AnalysisConfig, executor: E, reader: R, submitter: S) -> Self {
        Self {
            config,
            executor,
            reader,
            submitter,
            self_program: None,
            workdir: None,
        }
    }

    /// Binary that sequential batch jobs call back into; defaults to the running executable.
    pub fn with_self_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.self_program = Some(program.into());
        self
    }

    /// Directory batch jobs `cd` into; defaults to the current directory.
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn run_1d_scan(&self, request: &ScanRequest, range: &ScanRange) -> Result<ScanOutcome> {
        self.check_range(range)?;
        let workspace = self.resolve_workspace(&request.workspace)?;
        let mode = request.mode.to_string();
        let tag = request.resolve_tag(&[range.poi.as_str(), mode.as_str()]);

        let points = range
            .values()
            .into_iter()
            .map(|value| ScanPoint::one(&range.poi, value))
            .collect();

        tracing::info!(
            "🚀 Starting {} 1D scan of {} over [{}, {}] with {} points",
            request.mode,
            range.poi,
            range.min,
            range.max,
            range.n_points
        );

        let layout = PoiLayout::Grid {
            fix_others: request.fix_other_scan_pois,
        };
        let plan = ScanPlan::new(
            request,
            workspace,
            &self.config.quickfit_defaults,
            tag,
            layout,
            points,
        );
        self.execute_plan(request, request.mode, &plan).await
    }

    /// Row-major grid: the first POI is the outer loop.
    pub async fn run_2d_scan(
        &self,
        request: &ScanRequest,
        range1: &ScanRange,
        range2: &ScanRange,
    ) -> Result<ScanOutcome> {
        self.check_range(range1)?;
        self.check_range(range2)?;
        if range1.poi == range2.poi {
            return Err(QfError::InvalidConfigValueError {
                field: "poi2".to_string(),
                value: range2.poi.clone(),
                reason: "A 2D scan needs two different POIs".to_string(),
            });
        }
        let workspace = self.resolve_workspace(&request.workspace)?;
        let mode = request.mode.to_string();
        let tag = request.resolve_tag(&[range1.poi.as_str(), range2.poi.as_str(), mode.as_str()]);

        let values2 = range2.values();
        let points: Vec<ScanPoint> = range1
            .values()
            .into_iter()
            .flat_map(|v1| {
                values2
                    .iter()
                    .map(move |v2| ScanPoint::two(&range1.poi, v1, &range2.poi, *v2))
            })
            .collect();

        tracing::info!(
            "🚀 Starting {} 2D scan of {} x {} ({} points)",
            request.mode,
            range1.poi,
            range2.poi,
            points.len()
        );

        let layout = PoiLayout::Grid {
            fix_others: request.fix_other_scan_pois,
        };
        let plan = ScanPlan::new(
            request,
            workspace,
            &self.config.quickfit_defaults,
            tag,
            layout,
            points,
        );
        self.execute_plan(request, request.mode, &plan).await
    }

    /// Unconditional fit with every scan POI floating; output is `<tag>.root`.
    pub async fn run_fit(&self, request: &ScanRequest, hesse: bool) -> Result<ScanOutcome> {
        let workspace = self.resolve_workspace(&request.workspace)?;
        let tag = request.resolve_tag(&["fit"]);

        let mut defaults = self.config.quickfit_defaults.clone();
        if hesse {
            defaults.hesse = 1;
        }

        let mut plan = ScanPlan::new(request, workspace, &defaults, tag, PoiLayout::Fit, Vec::new());
        plan.points.push(PlannedPoint {
            point: ScanPoint {
                coordinates: Vec::new(),
            },
            stem: plan.tag.clone(),
            job_name: plan.tag.clone(),
        });

        tracing::info!("🚀 Starting fit on {} (hesse: {})", request.workspace, hesse);
        self.execute_plan(request, ExecutionMode::Parallel, &plan).await
    }

    /// 1D scan where only `float_pois` among the other scan POIs float.
    pub async fn run_variable_scan(
        &self,
        request: &ScanRequest,
        range: &ScanRange,
        float_pois: &[String],
    ) -> Result<ScanOutcome> {
        self.check_range(range)?;
        self.check_float_pois(&range.poi, float_pois)?;
        let workspace = self.resolve_workspace(&request.workspace)?;
        let scan_type = format!("{}POI", float_pois.len() + 1);
        let mode = request.mode.to_string();
        let tag = request.resolve_tag(&[range.poi.as_str(), scan_type.as_str(), mode.as_str()]);

        let points = range
            .values()
            .into_iter()
            .map(|value| ScanPoint::one(&range.poi, value))
            .collect();

        tracing::info!(
            "🚀 Starting {} {} scan of {} over [{}, {}] with {} points",
            scan_type,
            request.mode,
            range.poi,
            range.min,
            range.max,
            range.n_points
        );
        if float_pois.is_empty() {
            tracing::info!("📌 Other scan POIs fixed at 0");
        } else {
            tracing::info!("🎈 Floating: {}", float_pois.join(", "));
        }

        let layout = PoiLayout::Variable {
            float_pois: float_pois.to_vec(),
        };
        let plan = ScanPlan::new(
            request,
            workspace,
            &self.config.quickfit_defaults,
            tag,
            layout,
            points,
        );
        self.execute_plan(request, request.mode, &plan).await
    }

    /// Two sequential legs starting at 0, one towards `max` and one towards
    /// `min`, each with ⌈n/2⌉ points. Both legs share one output directory.
    pub async fn run_split_scan(
        &self,
        request: &ScanRequest,
        range: &ScanRange,
        float_pois: &[String],
    ) -> Result<Vec<ScanOutcome>> {
        self.check_range(range)?;
        self.check_float_pois(&range.poi, float_pois)?;
        let workspace = self.resolve_workspace(&request.workspace)?;
        let scan_type = format!("{}POI", float_pois.len() + 1);
        let base_tag = request.resolve_tag(&[range.poi.as_str(), scan_type.as_str(), "split"]);

        let n_leg = (range.n_points + 1) / 2;
        let legs = [("positive", range.max), ("negative", range.min)];

        tracing::info!(
            "🚀 Starting split {} scan of {}: 0 → {} and 0 → {} with {} points each",
            scan_type,
            range.poi,
            range.max,
            range.min,
            n_leg
        );

        let layout = PoiLayout::Variable {
            float_pois: float_pois.to_vec(),
        };

        let mut outcomes = Vec::with_capacity(legs.len());
        for (direction, end) in legs {
            let points = linspace(n_leg, 0.0, end)
                .into_iter()
                .map(|value| ScanPoint::one(&range.poi, value))
                .collect();

            let mut plan = ScanPlan::new(
                request,
                workspace,
                &self.config.quickfit_defaults,
                base_tag.clone(),
                layout.clone(),
                points,
            );
            plan.job_name = format!("{}_{}", base_tag, direction);
            plan.summary_file = format!("scan_summary_{}.json", direction);

            tracing::info!("➡️ {} leg: 0 → {}", direction, end);
            let mut outcome = self
                .execute_plan(request, ExecutionMode::Sequential, &plan)
                .await?;
            outcome.tag = plan.job_name.clone();
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn check_range(&self, range: &ScanRange) -> Result<()> {
        self.config.require_known_poi(&range.poi)?;
        validate_positive_number(&format!("{}.n_points", range.poi), range.n_points, 1)
    }

    fn check_float_pois(&self, scanned: &str, float_pois: &[String]) -> Result<()> {
        for poi in float_pois {
            if poi == scanned || !self.config.is_scan_poi(poi) {
                return Err(QfError::InvalidConfigValueError {
                    field: "float_pois".to_string(),
                    value: poi.clone(),
                    reason: "Floating POIs must be scan POIs other than the scanned one"
                        .to_string(),
                });
            }
        }
        Ok(())
    }

    fn resolve_workspace(&self, label: &str) -> Result<&WorkspaceConfig> {
        let workspace = self.config.workspace(label)?;
        if !workspace.validate() {
            tracing::warn!(
                "⚠️ Workspace file {} not found on this host",
                workspace.path
            );
        }
        Ok(workspace)
    }

    fn workdir(&self) -> Result<PathBuf> {
        match &self.workdir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    fn self_program(&self) -> Result<PathBuf> {
        match &self.self_program {
            Some(program) => Ok(program.clone()),
            None => Ok(std::env::current_exe()?),
        }
    }

    fn command_for(
        &self,
        request: &ScanRequest,
        plan: &ScanPlan,
        pois: String,
        output_file: &Path,
    ) -> QuickFitCommand {
        let mut command = QuickFitCommand::new(
            &self.config,
            &plan.workspace,
            pois,
            output_file,
            request.systematics,
        )
        .with_extra_args(request.extra_args.clone());
        command.defaults = plan.defaults.clone();
        command
    }

    async fn execute_plan(
        &self,
        request: &ScanRequest,
        mode: ExecutionMode,
        plan: &ScanPlan,
    ) -> Result<ScanOutcome> {
        std::fs::create_dir_all(&plan.root_dir)?;
        std::fs::create_dir_all(&plan.logs_dir)?;
        tracing::info!("📁 Output: {}", plan.root_dir.display());

        let (points, submit_files) = match request.backend {
            Backend::Local => (self.run_local(request, mode, plan).await?, Vec::new()),
            Backend::Condor => match mode {
                ExecutionMode::Parallel => self.submit_parallel(request, plan).await?,
                ExecutionMode::Sequential => self.submit_sequential(request, plan).await?,
            },
        };

        let outcome = ScanOutcome {
            tag: plan.tag.clone(),
            root_dir: plan.root_dir.clone(),
            logs_dir: plan.logs_dir.clone(),
            backend: request.backend,
            mode,
            points,
            submit_files,
        };

        let mut summary = outcome.summary();
        summary["points"] = serde_json::to_value(&outcome.points)?;
        let summary_path = plan.logs_dir.join(&plan.summary_file);
        std::fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
        tracing::debug!("📊 Summary written to {}", summary_path.display());

        match request.backend {
            Backend::Local => tracing::info!(
                "✅ Finished {} points: {} succeeded, {} failed",
                outcome.points.len(),
                outcome.successes(),
                outcome.failures().len()
            ),
            Backend::Condor => tracing::info!(
                "✅ Submitted {} points in {} submit file(s)",
                outcome.submitted(),
                outcome.submit_files.len()
            ),
        }

        Ok(outcome)
    }

    async fn run_local(
        &self,
        request: &ScanRequest,
        mode: ExecutionMode,
        plan: &ScanPlan,
    ) -> Result<Vec<PointOutcome>> {
        let builder = PoiBuilder::new(&self.config);
        let parser = ResultParser::new(&self.reader, &self.config);
        let total = plan.points.len();

        let mut seeds = Seeds::new();
        let mut outcomes = Vec::with_capacity(total);

        for (index, planned) in plan.points.iter().enumerate() {
            let seeds_used = match mode {
                ExecutionMode::Sequential => seeds.clone(),
                ExecutionMode::Parallel => Seeds::new(),
            };
            let pois = plan
                .layout
                .build(&builder, &planned.point, &seeds_used, &self.config.scan_ranges);

            let output_file = plan.output_file(planned);
            let log_file = plan.log_file(planned);
            let command = self.command_for(request, plan, pois, &output_file);

            tracing::info!(
                "🔄 [{}/{}] Fitting {}",
                index + 1,
                total,
                describe(&planned.point, &plan.tag)
            );
            tracing::debug!("-p {}", command.pois);

            let start = Instant::now();
            let status = match self.executor.execute(&command, Some(&log_file)).await {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!("⚠️ Could not run point {}: {}", index + 1, e);
                    RunStatus::from_code(None)
                }
            };
            let duration = start.elapsed();

            let success = status.success && output_file.is_file();
            if success {
                tracing::debug!("✅ Point done in {:?}", duration);
            } else {
                tracing::warn!(
                    "❌ Fit failed (exit code {:?}), see {}",
                    status.exit_code,
                    log_file.display()
                );
            }

            let mut seeds_extracted = 0;
            if mode == ExecutionMode::Sequential {
                if success {
                    seeds = extract_seeds(&parser, &output_file);
                    seeds_extracted = seeds.len();
                } else if !seeds.is_empty() {
                    tracing::debug!("🌱 Keeping seeds from the last converged point");
                }
            }

            outcomes.push(PointOutcome {
                index,
                point: planned.point.clone(),
                output_file,
                log_file,
                success,
                submitted: false,
                exit_code: status.exit_code,
                seeds_used: seeds_used.len(),
                seeds_extracted,
                duration,
            });
        }

        Ok(outcomes)
    }

    /// One wrapper per point, all queued from a single submit file.
    async fn submit_parallel(
        &self,
        request: &ScanRequest,
        plan: &ScanPlan,
    ) -> Result<(Vec<PointOutcome>, Vec<PathBuf>)> {
        let builder = PoiBuilder::new(&self.config);
        let workdir = self.workdir()?;
        let queue = self.queue(request);

        let mut jobs = Vec::with_capacity(plan.points.len());
        let mut outcomes = Vec::with_capacity(plan.points.len());

        for (index, planned) in plan.points.iter().enumerate() {
            let pois = plan.layout.build(
                &builder,
                &planned.point,
                &Seeds::new(),
                &self.config.scan_ranges,
            );
            let output_file = plan.output_file(planned);
            let command = self.command_for(request, plan, pois, &output_file);

            let wrapper = plan.logs_dir.join(format!("{}.sh", planned.job_name));
            write_wrapper(
                &wrapper,
                &[command.to_shell_string()],
                &workdir,
                &self.config.condor,
            )?;
            jobs.push((wrapper, planned.job_name.clone()));

            let log_file = plan.logs_dir.join(format!("{}.out", planned.job_name));
            outcomes.push(submitted_outcome(index, planned, output_file, log_file));
        }

        let submit_name = match plan.layout {
            PoiLayout::Fit => format!("{}.sub", plan.job_name),
            _ => format!("{}_parallel.sub", plan.job_name),
        };
        let submit_file = plan.logs_dir.join(submit_name);
        write_multi_submit(&submit_file, &jobs, &plan.logs_dir, &queue, &self.config.condor)?;
        self.submit(&submit_file).await?;

        Ok((outcomes, vec![submit_file]))
    }

    /// A single job that walks the grid in order. Between points it calls
    /// back into this binary to read the previous result and rebuild the
    /// `-p` string with those seeds.
    async fn submit_sequential(
        &self,
        request: &ScanRequest,
        plan: &ScanPlan,
    ) -> Result<(Vec<PointOutcome>, Vec<PathBuf>)> {
        let config_path = self.config.config_path.as_ref().ok_or_else(|| {
            QfError::config("sequential batch scans re-read the configuration file; load it from disk")
        })?;
        let program = self.self_program()?;
        let workdir = self.workdir()?;
        let queue = self.queue(request);
        let total = plan.points.len();

        let mut lines = vec![
            format!(
                "# {} points in order, each seeded with the previous best fit",
                total
            ),
            format!("qfscan={}", shell_quote(&program.to_string_lossy())),
            format!("config={}", shell_quote(&config_path.to_string_lossy())),
            "prev_results=\"\"".to_string(),
            String::new(),
        ];

        let mut outcomes = Vec::with_capacity(total);
        for (index, planned) in plan.points.iter().enumerate() {
            let output_file = plan.output_file(planned);
            let log_file = plan.log_file(planned);
            let output_quoted = shell_quote(&output_file.to_string_lossy());

            lines.push(format!(
                "echo '===== Point {}/{}: {} ====='",
                index + 1,
                total,
                planned.point.describe()
            ));

            let poi_args: Vec<String> = plan
                .layout
                .cli_args(&planned.point)
                .iter()
                .map(|arg| shell_quote(arg))
                .collect();
            lines.push(format!(
                "pois=$(\"$qfscan\" poi --config \"$config\" {} --previous=\"$prev_results\")",
                poi_args.join(" ")
            ));

            let command = self.command_for(request, plan, "$pois".to_string(), &output_file);
            lines.push(format!(
                "{} > {} 2>&1",
                command.to_shell_string(),
                shell_quote(&log_file.to_string_lossy())
            ));

            if index + 1 < total {
                lines.push(format!("if [ -f {} ]; then", output_quoted));
                lines.push(format!(
                    "    prev_results=$(\"$qfscan\" parse --config \"$config\" --input {} --format seeds 2>/dev/null || true)",
                    output_quoted
                ));
                lines.push("else".to_string());
                lines.push("    prev_results=\"\"".to_string());
                lines.push("fi".to_string());
            }
            lines.push(String::new());

            outcomes.push(submitted_outcome(index, planned, output_file, log_file));
        }
        lines.push("echo 'Sequential scan complete'".to_string());

        let job_name = format!("{}_sequential", plan.job_name);
        let wrapper = plan.logs_dir.join(format!("{}.sh", job_name));
        let submit_file = plan.logs_dir.join(format!("{}.sub", job_name));

        write_wrapper(&wrapper, &lines, &workdir, &self.config.condor)?;
        write_single_submit(
            &submit_file,
            &wrapper,
            &plan.logs_dir,
            &job_name,
            &queue,
            &self.config.condor,
        )?;
        self.submit(&submit_file).await?;

        Ok((outcomes, vec![submit_file]))
    }

    fn queue(&self, request: &ScanRequest) -> String {
        request
            .queue
            .clone()
            .unwrap_or_else(|| self.config.condor.default_queue.clone())
    }

    async fn submit(&self, submit_file: &Path) -> Result<()> {
        tracing::info!("📤 Submitting {}", submit_file.display());
        self.submitter.submit(submit_file).await
    }
}

fn describe(point: &ScanPoint, tag: &str) -> String {
    if point.coordinates.is_empty() {
        tag.to_string()
    } else {
        point.describe()
    }
}

fn submitted_outcome(
    index: usize,
    planned: &PlannedPoint,
    output_file: PathBuf,
    log_file: PathBuf,
) -> PointOutcome {
    PointOutcome {
        index,
        point: planned.point.clone(),
        output_file,
        log_file,
        success: false,
        submitted: true,
        exit_code: None,
        seeds_used: 0,
        seeds_extracted: 0,
        duration: Duration::ZERO,
    }
}

/// Seeds for the next point; unreadable results start it from defaults.
fn extract_seeds(parser: &ResultParser<'_>, output_file: &Path) -> Seeds {
    match parser.extract_pois(output_file, &PoiFilter::PoiLike) {
        Ok(seeds) => {
            tracing::debug!(
                "🌱 {} seeds from {}",
                seeds.len(),
                output_file.display()
            );
            seeds
        }
        Err(e) => {
            tracing::warn!(
                "⚠️ Could not extract seeds ({}); next point starts from defaults",
                e
            );
            Seeds::new()
        }
    }
}
