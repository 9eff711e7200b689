use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agent::{Diagnoser, DiagnosisSettings, InferenceClient};
use crate::artifacts::{
    classify, ArtifactBundle, ArtifactSource, CommandClusterer, DirectorySource, FrequencyClusterer,
    LineClusterer, Orchestrator,
};
use crate::config::Config;
use crate::output::{
    print_report, render_breakdown_table, render_failure_breakdown, FailureBreakdown,
    PhaseProgress,
};
use crate::triage::{CategoryTag, FailureRecord, TriageReport};

const BREAKDOWN_CONCURRENCY: usize = 4;

#[derive(Parser)]
#[command(name = "citriage")]
#[command(author, version, about = "CI failure triage from job artifacts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./citriage.toml or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write JSON output to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Emit JSON instead of the human-readable report
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[arg(long, global = true, env = "INFERENCE_URL")]
    inference_url: Option<String>,

    #[arg(long, global = true, env = "INFERENCE_MODEL")]
    inference_model: Option<String>,

    #[arg(long, global = true, env = "INFERENCE_TOKEN", hide_env_values = true)]
    inference_token: Option<String>,

    #[arg(long, global = true, env = "INFERENCE_TIMEOUT")]
    inference_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a failed job from its artifact directory
    Analyze {
        dir: PathBuf,

        #[arg(short, long)]
        job_name: Option<String>,
    },
    /// Classify a failed job and ask the inference API for a root cause
    Diagnose {
        dir: PathBuf,

        #[arg(short, long)]
        job_name: Option<String>,
    },
    /// Summarize failure categories over many failed jobs
    Breakdown {
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// Jobs run in the period, failed or not (defaults to the number of directories)
        #[arg(short, long)]
        total_jobs: Option<usize>,

        /// Print the chat-ready markdown summary instead of a table
        #[arg(long, default_value_t = false)]
        markdown: bool,
    },
    /// Write the effective configuration to a file (format from extension)
    InitConfig {
        #[arg(default_value = "citriage.toml")]
        path: PathBuf,
    },
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(url) = &self.inference_url {
            config.inference.base_url.clone_from(url);
        }
        if let Some(model) = &self.inference_model {
            config.inference.model.clone_from(model);
        }
        if let Some(token) = &self.inference_token {
            config.inference.token = Some(token.clone());
        }
        if let Some(timeout) = self.inference_timeout {
            config.inference.timeout_secs = timeout;
        }

        Ok(config)
    }

    fn orchestrator(config: &Config) -> Result<Orchestrator> {
        let clusterer: Box<dyn LineClusterer> = match &config.analysis.cluster_command {
            Some(command) => Box::new(CommandClusterer::parse(command)?),
            None => Box::new(FrequencyClusterer),
        };
        Ok(Orchestrator::new(config.analysis.settings(), clusterer))
    }

    fn write_json(&self, value: &impl Serialize) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, json_output)
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            info!("Report written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }

    fn emit_report(&self, report: &TriageReport) -> Result<()> {
        if self.json || self.output.is_some() {
            self.write_json(report)
        } else {
            print_report(report);
            Ok(())
        }
    }

    async fn execute_analyze(&self, dir: &Path, job_name: Option<&str>) -> Result<()> {
        let config = self.load_config()?;
        let job = job_label(dir, job_name);
        info!("Analyzing artifacts for {job}");

        let record = analyze_dir(&Self::orchestrator(&config)?, dir, &job)?;
        self.emit_report(&build_report(job, record))
    }

    async fn execute_diagnose(&self, dir: &Path, job_name: Option<&str>) -> Result<()> {
        let config = self.load_config()?;
        let job = job_label(dir, job_name);
        let orchestrator = Self::orchestrator(&config)?;
        let client = InferenceClient::new(&config.inference)?;
        let diagnoser = Diagnoser::new(
            Arc::new(client),
            config.retry.policy(),
            DiagnosisSettings {
                max_context_chars: config.analysis.max_context_chars,
                max_tool_iterations: config.inference.max_tool_iterations,
            },
        );

        let progress = PhaseProgress::start(3, "Loading artifacts");
        let bundle = load_bundle(dir)?;
        let progress = progress.advance("Loaded artifacts", "Analyzing artifacts");
        let record = orchestrator.analyze(&bundle, &job);
        let progress = progress.advance("Analyzed artifacts", "Diagnosing with inference API");
        let diagnosis = diagnoser.diagnose(&record).await;
        progress.finish("Diagnosis complete");

        let mut report = build_report(job, record);
        report.diagnosis = Some(diagnosis);
        self.emit_report(&report)
    }

    async fn execute_breakdown(
        &self,
        dirs: &[PathBuf],
        total_jobs: Option<usize>,
        markdown: bool,
    ) -> Result<()> {
        let config = self.load_config()?;
        let orchestrator = Arc::new(Self::orchestrator(&config)?);
        let mut breakdown = collect_breakdown(orchestrator, dirs).await?;

        breakdown.total_jobs = match total_jobs {
            Some(total) if total < breakdown.total_failures => {
                warn!(
                    "--total-jobs {total} is below the {} failures analyzed, using the failure count",
                    breakdown.total_failures
                );
                breakdown.total_failures
            }
            Some(total) => total,
            None => dirs.len(),
        };

        if self.json || self.output.is_some() {
            self.write_json(&breakdown)
        } else if markdown {
            println!(
                "{}",
                render_failure_breakdown(
                    &breakdown.counts,
                    breakdown.total_jobs,
                    breakdown.total_failures
                )
            );
            Ok(())
        } else {
            println!("{}", render_breakdown_table(&breakdown));
            Ok(())
        }
    }

    /// Saves the file-based configuration. Flag and environment overrides
    /// are not written, so tokens passed that way stay out of the file.
    fn execute_init_config(&self, path: &Path) -> Result<()> {
        Config::load(self.config.as_deref())?.save(path)?;
        info!("Configuration written to: {}", path.display());
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Analyze { dir, job_name } => {
                self.execute_analyze(dir, job_name.as_deref()).await
            }
            Commands::Diagnose { dir, job_name } => {
                self.execute_diagnose(dir, job_name.as_deref()).await
            }
            Commands::Breakdown {
                dirs,
                total_jobs,
                markdown,
            } => self.execute_breakdown(dirs, *total_jobs, *markdown).await,
            Commands::InitConfig { path } => self.execute_init_config(path),
        }
    }
}

/// Job name given on the command line, else the artifact directory name.
fn job_label(dir: &Path, job_name: Option<&str>) -> String {
    job_name.map_or_else(
        || {
            dir.file_name()
                .map_or_else(|| dir.display().to_string(), |name| name.to_string_lossy().into_owned())
        },
        str::to_string,
    )
}

/// Classifies every directory, at most `BREAKDOWN_CONCURRENCY` at a time.
/// Only the category of each job outlives its analysis task.
async fn collect_breakdown(
    orchestrator: Arc<Orchestrator>,
    dirs: &[PathBuf],
) -> Result<FailureBreakdown> {
    let mut breakdown = FailureBreakdown::default();
    let mut tags = futures::stream::iter(dirs.iter().cloned())
        .map(|dir| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::task::spawn_blocking(move || classify_dir(&orchestrator, &dir))
        })
        .buffer_unordered(BREAKDOWN_CONCURRENCY);

    while let Some(joined) = tags.next().await {
        breakdown.record(joined.context("Artifact analysis task failed")??);
    }
    Ok(breakdown)
}

fn classify_dir(orchestrator: &Orchestrator, dir: &Path) -> Result<CategoryTag> {
    let record = analyze_dir(orchestrator, dir, &job_label(dir, None))?;
    Ok(classify_record(&record))
}

fn load_bundle(dir: &Path) -> Result<ArtifactBundle> {
    DirectorySource::new(dir)
        .load("")
        .with_context(|| format!("Failed to load artifacts from {}", dir.display()))
}

fn analyze_dir(orchestrator: &Orchestrator, dir: &Path, job: &str) -> Result<FailureRecord> {
    Ok(orchestrator.analyze(&load_bundle(dir)?, job))
}

fn classify_record(record: &FailureRecord) -> CategoryTag {
    classify(
        record.evidence.lines(),
        &record.category_message,
        record.is_maintenance_issue,
    )
}

fn build_report(job: String, record: FailureRecord) -> TriageReport {
    TriageReport {
        job,
        analyzed_at: Utc::now(),
        category: classify_record(&record),
        record,
        diagnosis: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::bundle::BUILD_LOG_FILE;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["citriage", "--json", "analyze", "artifacts/1234"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Analyze { ref dir, job_name: None } if dir == Path::new("artifacts/1234")));

        let cli = Cli::try_parse_from([
            "citriage", "breakdown", "a", "b", "--total-jobs", "10", "--markdown",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Breakdown { ref dirs, total_jobs: Some(10), markdown: true } if dirs.len() == 2
        ));
    }

    #[test]
    fn test_init_config_defaults_path() {
        let cli = Cli::try_parse_from(["citriage", "init-config"]).unwrap();
        assert!(matches!(cli.command, Commands::InitConfig { ref path } if path == Path::new("citriage.toml")));
    }

    #[test]
    fn test_breakdown_requires_directories() {
        assert!(Cli::try_parse_from(["citriage", "breakdown"]).is_err());
    }

    #[test]
    fn test_job_label() {
        assert_eq!(job_label(Path::new("/tmp/runs/1234"), None), "1234");
        assert_eq!(job_label(Path::new("/tmp/runs/1234"), Some("nightly")), "nightly");
    }

    #[test]
    fn test_maintenance_directory_classifies_as_maintenance() {
        let temp_dir = tempfile::tempdir().unwrap();
        let record = analyze_dir(&Orchestrator::default(), temp_dir.path(), "job").unwrap();
        let report = build_report("job".to_string(), record);

        assert_eq!(report.category, CategoryTag::Maintenance);
        assert!(report.record.is_maintenance_issue);
    }

    #[test]
    fn test_analyze_dir_reads_build_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            temp_dir.path().join(BUILD_LOG_FILE),
            "Logs for container test in pod e2e\n",
        )
        .unwrap();

        let record = analyze_dir(&Orchestrator::default(), temp_dir.path(), "job").unwrap();

        assert_eq!(record.evidence.headline(), Some("Somehow couldn't find clusteroperators.json file"));
        assert!(!record.is_maintenance_issue);
    }

    #[tokio::test]
    async fn test_collect_breakdown_counts_every_directory() {
        let dirs: Vec<tempfile::TempDir> = (0..6).map(|_| tempfile::tempdir().unwrap()).collect();
        std::fs::write(
            dirs[0].path().join(BUILD_LOG_FILE),
            "Logs for container test in pod e2e\n",
        )
        .unwrap();
        let paths: Vec<PathBuf> = dirs.iter().map(|dir| dir.path().to_path_buf()).collect();

        let breakdown = collect_breakdown(Arc::new(Orchestrator::default()), &paths)
            .await
            .unwrap();

        assert_eq!(breakdown.total_failures, 6);
        assert_eq!(breakdown.counts[&CategoryTag::Maintenance], 5);
        assert_eq!(breakdown.counts.values().sum::<usize>(), 6);
    }

    #[test]
    fn test_init_config_leaves_out_overrides() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("absent.toml");
        let target = temp_dir.path().join("citriage.toml");
        let args: Vec<std::ffi::OsString> = vec![
            "citriage".into(),
            "--config".into(),
            missing.into_os_string(),
            "--inference-token".into(),
            "s3cret-token".into(),
            "init-config".into(),
            target.clone().into_os_string(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        cli.execute_init_config(&target).unwrap();

        let written = std::fs::read_to_string(&target).unwrap();
        assert!(!written.contains("s3cret-token"));
        assert!(written.contains("base-url"));
    }
}
