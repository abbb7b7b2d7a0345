use crate::config::{AnalysisConfig, QuickFitDefaults, WorkspaceConfig};
use crate::domain::model::Systematics;
use crate::utils::format::fmt_number;
use std::path::{Path, PathBuf};

/// One quickFit invocation, independent of where it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickFitCommand {
    pub program: String,
    pub workspace_file: String,
    pub workspace_name: String,
    pub data_name: String,
    pub pois: String,
    pub defaults: QuickFitDefaults,
    pub output_file: PathBuf,
    pub exclude_nps: Option<String>,
    pub extra_args: Vec<String>,
}

impl QuickFitCommand {
    pub fn new(
        config: &AnalysisConfig,
        workspace: &WorkspaceConfig,
        pois: impl Into<String>,
        output_file: impl AsRef<Path>,
        systematics: Systematics,
    ) -> Self {
        let exclude = config.exclude_nps_pattern(systematics);
        Self {
            program: config.quickfit_path.clone(),
            workspace_file: workspace.path.clone(),
            workspace_name: workspace.workspace_name.clone(),
            data_name: workspace.data_name.clone(),
            pois: pois.into(),
            defaults: config.quickfit_defaults.clone(),
            output_file: output_file.as_ref().to_path_buf(),
            exclude_nps: (!exclude.is_empty()).then_some(exclude),
            extra_args: Vec::new(),
        }
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Arguments after the program name, in the order quickFit documents them.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            self.workspace_file.clone(),
            "-w".to_string(),
            self.workspace_name.clone(),
            "-d".to_string(),
            self.data_name.clone(),
            "-p".to_string(),
            self.pois.clone(),
            "--minTolerance".to_string(),
            fmt_number(self.defaults.min_tolerance),
            "--minos".to_string(),
            self.defaults.minos.to_string(),
            "--hesse".to_string(),
            self.defaults.hesse.to_string(),
            "-o".to_string(),
            self.output_file.to_string_lossy().into_owned(),
            "--savefitresult".to_string(),
            self.defaults.save_fit_result.to_string(),
            "--saveErrors".to_string(),
            self.defaults.save_errors.to_string(),
        ];

        if let Some(pattern) = &self.exclude_nps {
            args.push("-n".to_string());
            args.push(pattern.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Single line for wrapper scripts and dry runs.
    pub fn to_shell_string(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.to_args())
            .map(|arg| shell_quote(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Plain words pass through, `$var` references stay expandable, the rest is single-quoted.
pub fn shell_quote(arg: &str) -> String {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || "_-./=,:+@%".contains(c);

    if !arg.is_empty() && arg.chars().all(is_safe) {
        return arg.to_string();
    }

    if let Some(name) = arg.strip_prefix('$') {
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return format!("\"{}\"", arg);
        }
    }

    format!("'{}'", arg.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> AnalysisConfig {
        AnalysisConfig::from_yaml_str(
            r#"
exclude_nps: ["ATLAS_LUMI*"]
workspaces:
  linear_obs: /data/ws/linear_obs.root
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_argument_order() {
        let config = sample_config();
        let ws = config.workspace("linear_obs").unwrap();
        let cmd = QuickFitCommand::new(
            &config,
            ws,
            "cHWtil_combine=0.500000",
            "root_t/fit_cHWtil_combine_0.5000.root",
            Systematics::FullSyst,
        );

        assert_eq!(
            cmd.to_args(),
            vec![
                "-f",
                "/data/ws/linear_obs.root",
                "-w",
                "combWS",
                "-d",
                "combData",
                "-p",
                "cHWtil_combine=0.500000",
                "--minTolerance",
                "0.0001",
                "--minos",
                "0",
                "--hesse",
                "0",
                "-o",
                "root_t/fit_cHWtil_combine_0.5000.root",
                "--savefitresult",
                "1",
                "--saveErrors",
                "1",
                "-n",
                "ATLAS_LUMI*",
            ]
        );
    }

    #[test]
    fn test_no_exclusion_flag_when_empty() {
        let mut config = sample_config();
        config.exclude_nps.clear();
        let ws = config.workspace("linear_obs").unwrap().clone();
        let cmd = QuickFitCommand::new(&config, &ws, "mu=1", "out.root", Systematics::FullSyst)
            .with_extra_args(vec!["--ssname".to_string(), "x".to_string()]);

        let args = cmd.to_args();
        assert!(!args.contains(&"-n".to_string()));
        assert_eq!(&args[args.len() - 2..], &["--ssname", "x"]);
    }

    #[test]
    fn test_stat_only_excludes_everything() {
        let config = sample_config();
        let ws = config.workspace("linear_obs").unwrap();
        let cmd = QuickFitCommand::new(&config, ws, "mu=1", "out.root", Systematics::StatOnly);
        assert_eq!(cmd.exclude_nps.as_deref(), Some("ATLAS_LUMI*,*"));
    }

    #[test]
    fn test_shell_string_quoting() {
        let config = sample_config();
        let ws = config.workspace("linear_obs").unwrap();
        let cmd = QuickFitCommand::new(&config, ws, "$pois", "out.root", Systematics::FullSyst);
        let line = cmd.to_shell_string();

        assert!(line.starts_with("quickFit -f /data/ws/linear_obs.root"));
        assert!(line.contains("-p \"$pois\""));
        assert!(line.ends_with("-n 'ATLAS_LUMI*'"));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("a=1_-3_3,b=2"), "a=1_-3_3,b=2");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("$prev_results"), "\"$prev_results\"");
    }
}
