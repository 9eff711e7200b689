use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use serde_json::{Map, Value};

use super::agentic::{run_agent, AgentOutcome};
use super::client::ChatClient;
use super::prompts::{ERROR_FILTER, ERROR_SUMMARIZATION, GENERIC_APP};
use super::retry::RetryPolicy;
use super::tools::{single_string_schema, Tool, ToolRegistry};
use crate::error::{Result, TriageError};
use crate::triage::{Diagnosis, FailureRecord};

pub const ANALYZE_LOG_TOOL: &str = "analyze_log";

/// Advice shown in place of an analysis for infrastructure failures.
pub const RETRIGGER_ADVICE: &str =
    "This appears to be an installation or maintenance issue. Please re-trigger the run.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosisSettings {
    /// Character ceiling for evidence placed in a prompt.
    pub max_context_chars: usize,
    pub max_tool_iterations: u32,
}

impl Default for DiagnosisSettings {
    fn default() -> Self {
        Self {
            max_context_chars: 15_000,
            max_tool_iterations: 5,
        }
    }
}

/// Lets the model request a focused root-cause analysis of a summary.
pub struct AnalyzeLogTool {
    client: Arc<dyn ChatClient>,
}

impl AnalyzeLogTool {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for AnalyzeLogTool {
    fn name(&self) -> &str {
        ANALYZE_LOG_TOOL
    }

    fn description(&self) -> &str {
        "Analyze logs from error summary. Input should be the error summary."
    }

    fn parameters(&self) -> Value {
        single_string_schema("The full error summary text to analyze.")
    }

    async fn invoke(&self, args: Map<String, Value>) -> anyhow::Result<Value> {
        let Some(query) = args.get("query").and_then(Value::as_str) else {
            anyhow::bail!("missing string argument 'query'");
        };
        let reply = self.client.chat(&GENERIC_APP.render(query), &[]).await?;
        Ok(Value::String(reply.content.unwrap_or_default()))
    }
}

/// Turns a failure record into a model-written diagnosis.
pub struct Diagnoser {
    client: Arc<dyn ChatClient>,
    tools: ToolRegistry,
    retry: RetryPolicy,
    settings: DiagnosisSettings,
}

impl Diagnoser {
    /// The `analyze_log` tool is always registered first.
    pub fn new(client: Arc<dyn ChatClient>, retry: RetryPolicy, settings: DiagnosisSettings) -> Self {
        let mut tools = ToolRegistry::new();
        tools.register(AnalyzeLogTool::new(Arc::clone(&client)));
        Self {
            client,
            tools,
            retry,
            settings,
        }
    }

    /// Condenses the evidence into a plain-text error summary.
    pub async fn filter_and_summarize(&self, record: &FailureRecord) -> Result<String> {
        self.retry.run(|| self.summarize_once(record)).await
    }

    async fn summarize_once(&self, record: &FailureRecord) -> Result<String> {
        let max_chars = self.settings.max_context_chars;
        let mut evidence = record.evidence.clone();

        if record.requires_llm_filter {
            info!("Filtering {} evidence lines", evidence.len());
            let prompt = ERROR_FILTER.render(&evidence.render(max_chars));
            let reply = self.client.chat(&prompt, &[]).await?;
            let filtered = reply.content.unwrap_or_default();
            info!("Model kept {} error lines", filtered.lines().count());

            evidence = std::iter::once(evidence.headline().unwrap_or_default())
                .chain(filtered.lines())
                .collect();
        }

        let prompt = ERROR_SUMMARIZATION.render(&evidence.render(max_chars));
        let reply = self.client.chat(&prompt, &[]).await?;
        Ok(reply.content.unwrap_or_default())
    }

    /// Runs the tool-calling analysis over an error summary.
    pub async fn run_agent_analysis(&self, summary: &str) -> Result<String> {
        info!("Using {} tools: {}", self.tools.len(), self.tools.names().join(", "));
        self.retry.run(|| self.analyze_once(summary)).await
    }

    async fn analyze_once(&self, summary: &str) -> Result<String> {
        let conversation = GENERIC_APP.render(summary);
        match run_agent(
            self.client.as_ref(),
            conversation,
            &self.tools,
            self.settings.max_tool_iterations,
        )
        .await?
        {
            AgentOutcome::Complete(text) => Ok(text),
            AgentOutcome::Incomplete { iterations } => Err(TriageError::AgentLimitExceeded(iterations)),
        }
    }

    /// Full pipeline for one record. Never fails: maintenance records are
    /// skipped and exhausted retries yield [`Diagnosis::Unavailable`].
    pub async fn diagnose(&self, record: &FailureRecord) -> Diagnosis {
        if record.is_maintenance_issue {
            info!("Maintenance issue, skipping model analysis");
            return Diagnosis::Skipped(RETRIGGER_ADVICE.to_string());
        }

        let summary = match self.filter_and_summarize(record).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Error summarization failed: {e}");
                return Diagnosis::Unavailable(e.to_string());
            }
        };

        match self.run_agent_analysis(&summary).await {
            Ok(analysis) => Diagnosis::Analyzed(analysis),
            Err(e) => {
                warn!("Agent analysis failed: {e}");
                Diagnosis::Unavailable(e.to_string())
            }
        }
    }
}
