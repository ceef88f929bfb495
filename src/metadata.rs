use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AppType, Platform, ScoredCandidate, SCHEMA_VERSION};
use crate::postprocess::PostProcessReport;
use crate::seed::Seed;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub schema_version: String,
    pub seed: Seed,
    pub palette_name: String,
    pub type_scale_name: String,
    pub spacing_scale_name: String,
    pub linter_score: u8,
    pub passes: PassStats,
    pub timestamp: DateTime<Utc>,
    pub app_type: AppType,
    pub platform: Platform,
    /// Set when the returned spec scored below the repair threshold.
    pub degraded: bool,
    pub violations: Vec<String>,
    pub post_processing: PostProcessingStats,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PassStats {
    pub layout: LayoutStats,
    pub content: ContentStats,
    pub theme: ThemeStats,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutStats {
    pub pages: usize,
    pub nav_items: usize,
    pub repairs: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentStats {
    pub page_content: usize,
    pub forms: usize,
    pub tables: usize,
    pub repairs: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThemeStats {
    pub requested: usize,
    pub candidates: usize,
    pub failed: usize,
    /// Score of the top-ranked candidate before targeted repair.
    pub best_score: u8,
    pub targeted_repair: TargetedRepairStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetedRepairStatus {
    /// The winner already met the threshold.
    #[default]
    NotNeeded,
    Disabled,
    Adopted,
    /// A repair came back but did not score higher.
    Rejected,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostProcessingStats {
    pub snapped: usize,
    pub nudged: usize,
    pub duplicates: usize,
    pub icons: usize,
}

impl From<&PostProcessReport> for PostProcessingStats {
    fn from(report: &PostProcessReport) -> Self {
        Self {
            snapped: report.snapped.len(),
            nudged: report.nudged.len(),
            duplicates: report.duplicates.len(),
            icons: report.icons.len(),
        }
    }
}

/// Request-level facts known before the theme stage finishes.
#[derive(Debug, Clone, Copy)]
pub struct MetadataAssembler {
    pub seed: Seed,
    pub app_type: AppType,
    pub platform: Platform,
}

impl MetadataAssembler {
    pub fn assemble(
        &self,
        winner: &ScoredCandidate,
        passes: PassStats,
        post: &PostProcessReport,
        degraded: bool,
    ) -> GenerationMetadata {
        let tokens = &winner.candidate.tokens;
        GenerationMetadata {
            schema_version: SCHEMA_VERSION.to_string(),
            seed: self.seed,
            palette_name: tokens.palette.clone(),
            type_scale_name: tokens.type_scale.clone(),
            spacing_scale_name: tokens.spacing_scale.clone(),
            linter_score: winner.score,
            passes,
            timestamp: Utc::now(),
            app_type: self.app_type,
            platform: self.platform,
            degraded,
            violations: winner.violations.clone(),
            post_processing: PostProcessingStats::from(post),
        }
    }
}
