//! Structured pipeline events.
//!
//! Components never log their progress directly; they emit a
//! [`PipelineEvent`] into an injected [`EventSink`]. The service uses
//! [`TracingSink`], tests use [`RecordingSink`] and assert on the events.

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Layout,
    Content,
    Theme,
}

impl Stage {
    pub fn seed_label(self) -> &'static str {
        match self {
            Stage::Layout => crate::seed::LAYOUT_LABEL,
            Stage::Content => crate::seed::CONTENT_LABEL,
            Stage::Theme => crate::seed::THEME_LABEL,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Layout => "layout",
            Stage::Content => "content",
            Stage::Theme => "theme",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStarted {
        stage: Stage,
        candidate: Option<usize>,
    },
    StageSucceeded {
        stage: Stage,
        candidate: Option<usize>,
        repairs: u32,
    },
    StageFailed {
        stage: Stage,
        candidate: Option<usize>,
        violations: Vec<String>,
    },
    RepairAttempted {
        stage: Stage,
        candidate: Option<usize>,
        attempt: u32,
        violations: Vec<String>,
    },
    CandidateFailed {
        index: usize,
        reason: String,
    },
    CandidateScored {
        index: usize,
        score: u8,
        palette: String,
    },
    TargetedRepair {
        index: usize,
        before: u8,
        after: Option<u8>,
        adopted: bool,
    },
    DegradedOutput {
        score: u8,
        violations: Vec<String>,
    },
    PostProcessed {
        snapped: usize,
        nudged: usize,
        duplicates: usize,
        icons: usize,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Renders events as leveled tracing records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage, candidate } => {
                info!(%stage, ?candidate, "▶️ stage started")
            }
            PipelineEvent::StageSucceeded { stage, candidate, repairs } => {
                info!(%stage, ?candidate, repairs, "✅ stage succeeded")
            }
            PipelineEvent::StageFailed { stage, candidate, violations } => {
                warn!(%stage, ?candidate, ?violations, "❌ stage failed")
            }
            PipelineEvent::RepairAttempted { stage, candidate, attempt, violations } => {
                warn!(%stage, ?candidate, attempt, ?violations, "🔧 repair attempted")
            }
            PipelineEvent::CandidateFailed { index, reason } => {
                warn!(index, %reason, "⚠️ candidate excluded")
            }
            PipelineEvent::CandidateScored { index, score, palette } => {
                info!(index, score, %palette, "🎯 candidate scored")
            }
            PipelineEvent::TargetedRepair { index, before, after, adopted } => {
                info!(index, before, ?after, adopted, "🔧 targeted repair finished")
            }
            PipelineEvent::DegradedOutput { score, violations } => {
                warn!(score, ?violations, "⚠️ returning best available candidate below threshold")
            }
            PipelineEvent::PostProcessed { snapped, nudged, duplicates, icons } => {
                info!(snapped, nudged, duplicates, icons, "🧹 post-processing complete")
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| matches(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: PipelineEvent) {
        self.events.lock().push(event);
    }
}
