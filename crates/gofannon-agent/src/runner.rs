//! The outer issue loop.
//!
//! Alternates explore and commit steps until the model stops producing
//! novel actions. A round where neither step does anything new counts as
//! unproductive; more than [`MAX_UNPRODUCTIVE_ROUNDS`] consecutive
//! unproductive rounds ends the run, and any novel action resets the
//! counter.

use crate::error::Result;
use crate::mode::AgentMode;
use crate::orchestrator::AgentOrchestrator;

/// Consecutive unproductive rounds tolerated before stopping.
const MAX_UNPRODUCTIVE_ROUNDS: u32 = 3;

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Explore/commit rounds executed.
    pub rounds: u32,
    /// Whether any commit-mode step landed a change.
    pub committed: bool,
    /// Final progress percentage.
    pub progress_percent: u32,
    /// Prompt tokens consumed across the run.
    pub token_input_total: u64,
    /// Completion tokens generated across the run.
    pub token_output_total: u64,
}

/// Drives one issue from text to committed change.
pub struct IssueRunner {
    orchestrator: AgentOrchestrator,
}

impl IssueRunner {
    /// Create a runner over a prepared orchestrator.
    pub fn new(orchestrator: AgentOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Run explore/commit rounds to completion.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let mut unproductive = 0u32;
        let mut rounds = 0u32;
        let mut committed = false;

        loop {
            rounds += 1;
            let explored = self.orchestrator.step(AgentMode::Explore).await?.is_done;
            let commit_report = self.orchestrator.step(AgentMode::Commit).await?;
            committed |= commit_report.is_done;

            if explored || commit_report.is_done {
                unproductive = 0;
            } else {
                unproductive += 1;
                tracing::info!(rounds, unproductive, "Unproductive round");
                if unproductive > MAX_UNPRODUCTIVE_ROUNDS {
                    break;
                }
            }
        }

        let state = self.orchestrator.state();
        tracing::info!(
            rounds,
            committed,
            progress = state.progress_percent,
            "Run finished"
        );
        Ok(RunSummary {
            rounds,
            committed,
            progress_percent: state.progress_percent,
            token_input_total: state.token_input_total,
            token_output_total: state.token_output_total,
        })
    }
}
