//! Layout → Content → Theme orchestration.
//!
//! Layout and content run once each. The theme stage fans out into
//! independent candidates on a bounded worker pool; survivors are scored,
//! ranked, optionally repaired, and the winner is post-processed.

use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::events::{EventSink, PipelineEvent, Stage};
use crate::lint::{rank_by_score, Linter};
use crate::metadata::{
    ContentStats, LayoutStats, MetadataAssembler, PassStats, TargetedRepairStatus, ThemeStats,
};
use crate::models::{
    AppType, ContentPlan, GenerateRequest, GenerateResponse, LayoutPlan, Platform, ScoredCandidate,
    ThemeCandidate, ThemedOutput, TokenNames, MAX_PROMPT_CHARS, SCHEMA_VERSION,
};
use crate::oracle::{Oracle, OracleClient};
use crate::postprocess::PostProcessor;
use crate::priors::{infer_app_type, infer_platform, DesignPriors};
use crate::prompts::{content_prompts, layout_prompts, theme_prompts};
use crate::seed::{apply_variety, derive_base_seed, Seed};
use crate::stage::{StageOutcome, StageRequest, StageRunner};
use crate::validate::{ContentRules, LayoutRules, Permissive, ThemeRules, Validator};

pub const LAYOUT_TEMPERATURE: f32 = 0.3;
pub const LAYOUT_MAX_REPAIRS: u32 = 2;
pub const CONTENT_TEMPERATURE: f32 = 0.2;
pub const CONTENT_MAX_REPAIRS: u32 = 1;
pub const THEME_TEMPERATURE: f32 = 0.35;
pub const THEME_MAX_REPAIRS: u32 = 1;
pub const TARGETED_REPAIR_ATTEMPTS: u32 = 1;

/// Caller options after validation and clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationOptions {
    pub n_candidates: usize,
    pub variety: i64,
    pub strict: bool,
}

impl GenerationOptions {
    pub fn from_map(options: &Map<String, Value>, config: &PipelineConfig) -> Result<Self, PipelineError> {
        let n_candidates = match options.get("n_candidates") {
            None | Some(Value::Null) => config.default_candidates,
            Some(v) => {
                let n = as_integer(v).ok_or_else(|| {
                    PipelineError::InvalidRequest(format!("n_candidates must be an integer, got {v}"))
                })?;
                n.clamp(1, config.max_candidates as i64) as usize
            }
        };
        let variety = match options.get("variety") {
            None | Some(Value::Null) => 0,
            Some(v) => as_integer(v).ok_or_else(|| {
                PipelineError::InvalidRequest(format!("variety must be an integer, got {v}"))
            })?,
        };
        let strict = match options.get("strict") {
            None | Some(Value::Null) => config.strict_validation,
            Some(v) => v.as_bool().ok_or_else(|| {
                PipelineError::InvalidRequest(format!("strict must be a boolean, got {v}"))
            })?,
        };
        Ok(Self { n_candidates, variety, strict })
    }
}

/// Integers, and floats with no fractional part such as `4.0`.
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Trims, collapses whitespace runs and enforces the length bound.
pub fn normalize_prompt(raw: &str) -> Result<String, PipelineError> {
    let prompt = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if prompt.is_empty() {
        return Err(PipelineError::InvalidRequest("prompt must not be empty".into()));
    }
    let chars = prompt.chars().count();
    if chars > MAX_PROMPT_CHARS {
        return Err(PipelineError::InvalidRequest(format!(
            "prompt is {chars} characters, the limit is {MAX_PROMPT_CHARS}"
        )));
    }
    Ok(prompt)
}

pub struct Pipeline {
    runner: Arc<StageRunner>,
    priors: Arc<DesignPriors>,
    linter: Linter,
    post: PostProcessor,
    config: PipelineConfig,
    events: Arc<dyn EventSink>,
}

impl Pipeline {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        priors: Arc<DesignPriors>,
        config: PipelineConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let client = Arc::new(OracleClient::new(
            oracle,
            config.oracle_max_concurrency,
            config.oracle_timeout,
        ));
        Self {
            runner: Arc::new(StageRunner::new(client, events.clone())),
            post: PostProcessor::new(priors.clone()),
            priors,
            linter: Linter::new(),
            config,
            events,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, PipelineError> {
        let prompt = normalize_prompt(&request.prompt)?;
        let options = GenerationOptions::from_map(&request.options, &self.config)?;
        let platform = infer_platform(&prompt);
        let app_type = infer_app_type(&prompt);
        let defaults = self.priors.defaults_for(app_type);
        let seed = apply_variety(
            derive_base_seed(&prompt, &request.options, SCHEMA_VERSION),
            options.variety,
        );
        info!(%seed, app_type = app_type.as_str(), platform = platform.as_str(), n = options.n_candidates, "🚀 generation started");

        let layout = self.layout_stage(&prompt, app_type, platform, seed, options.strict).await?;
        let content = self.content_stage(&layout.artifact, seed, options.strict).await?;
        let mut plan = content.artifact;
        plan.layout = layout.artifact;

        let fallback = TokenNames {
            palette: defaults.palette.clone(),
            type_scale: defaults.type_scale.clone(),
            spacing_scale: defaults.spacing_scale.clone(),
        };
        let plan = Arc::new(plan);
        let (candidates, failures) = self
            .theme_candidates(plan.clone(), seed, options.n_candidates, options.strict, &fallback)
            .await;
        let survived = candidates.len();
        if candidates.is_empty() {
            return Err(PipelineError::AllCandidatesFailed {
                attempted: options.n_candidates,
                failures,
            });
        }

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|c| {
                let s = self.score(c);
                self.events.emit(PipelineEvent::CandidateScored {
                    index: s.candidate.index,
                    score: s.score,
                    palette: s.candidate.tokens.palette.clone(),
                });
                s
            })
            .collect();
        rank_by_score(&mut scored, |s| s.score);
        let Some(mut winner) = scored.into_iter().next() else {
            return Err(PipelineError::AllCandidatesFailed { attempted: options.n_candidates, failures });
        };
        let best_score = winner.score;

        let targeted = if winner.score >= self.config.repair_threshold {
            TargetedRepairStatus::NotNeeded
        } else if !self.config.targeted_repair {
            TargetedRepairStatus::Disabled
        } else {
            self.targeted_repair(&mut winner, &plan, seed, &fallback).await
        };

        let report = self.post.run(&mut winner.candidate.spec);
        let meta = &mut winner.candidate.spec.meta;
        meta.platform = Some(platform.as_str().to_string());
        if meta.app_type.as_deref().map_or(true, |t| t.trim().is_empty()) {
            meta.app_type = Some(app_type.as_str().to_string());
        }
        self.events.emit(PipelineEvent::PostProcessed {
            snapped: report.snapped.len(),
            nudged: report.nudged.len(),
            duplicates: report.duplicates.len(),
            icons: report.icons.len(),
        });
        // Score, violations and the degraded flag all describe the returned spec.
        let lint = self.linter.score(&winner.candidate.spec);
        winner.score = lint.score;
        winner.violations = lint.violations;
        winner.violations.extend(report.duplicate_violations());
        let degraded = winner.score < self.config.repair_threshold;
        if degraded {
            self.events.emit(PipelineEvent::DegradedOutput {
                score: winner.score,
                violations: winner.violations.clone(),
            });
        }

        let passes = PassStats {
            layout: LayoutStats {
                pages: plan.layout.pages.len(),
                nav_items: plan.layout.nav_items.len(),
                repairs: layout.repairs,
            },
            content: ContentStats {
                page_content: plan.page_content.len(),
                forms: plan.forms.len(),
                tables: plan.tables.len(),
                repairs: content.repairs,
            },
            theme: ThemeStats {
                requested: options.n_candidates,
                candidates: survived,
                failed: failures.len(),
                best_score,
                targeted_repair: targeted,
            },
        };
        let meta = MetadataAssembler { seed, app_type, platform }.assemble(&winner, passes, &report, degraded);
        info!(score = meta.linter_score, palette = %meta.palette_name, degraded, "✅ generation finished");

        Ok(GenerateResponse { spec: winner.candidate.spec, meta })
    }

    async fn layout_stage(
        &self,
        prompt: &str,
        app_type: AppType,
        platform: Platform,
        seed: Seed,
        strict: bool,
    ) -> Result<StageOutcome<LayoutPlan>, PipelineError> {
        let defaults = self.priors.defaults_for(app_type);
        let prompts = layout_prompts(prompt, app_type, platform, &defaults, &self.priors);
        let request = StageRequest {
            stage: Stage::Layout,
            candidate: None,
            system: prompts.system,
            user: prompts.user,
            temperature: LAYOUT_TEMPERATURE,
            seed: seed.derive(Stage::Layout.seed_label()),
            max_repairs: LAYOUT_MAX_REPAIRS,
        };
        let validator: Box<dyn Validator<LayoutPlan>> = if strict {
            Box::new(LayoutRules { app_type, platform })
        } else {
            Box::new(Permissive)
        };
        Ok(self.runner.run(&request, validator.as_ref()).await?)
    }

    async fn content_stage(
        &self,
        layout: &LayoutPlan,
        seed: Seed,
        strict: bool,
    ) -> Result<StageOutcome<ContentPlan>, PipelineError> {
        let prompts = content_prompts(layout);
        let request = StageRequest {
            stage: Stage::Content,
            candidate: None,
            system: prompts.system,
            user: prompts.user,
            temperature: CONTENT_TEMPERATURE,
            seed: seed.derive(Stage::Content.seed_label()),
            max_repairs: CONTENT_MAX_REPAIRS,
        };
        let validator: Box<dyn Validator<ContentPlan>> = if strict {
            Box::new(ContentRules::new(layout))
        } else {
            Box::new(Permissive)
        };
        Ok(self.runner.run(&request, validator.as_ref()).await?)
    }

    fn theme_request(&self, plan: &ContentPlan, seed: Seed, index: usize, max_repairs: u32) -> StageRequest {
        let prompts = theme_prompts(plan, &self.priors, index);
        StageRequest {
            stage: Stage::Theme,
            candidate: Some(index),
            system: prompts.system,
            user: prompts.user,
            temperature: THEME_TEMPERATURE,
            seed: seed.derive(Stage::Theme.seed_label()).for_candidate(index),
            max_repairs,
        }
    }

    /// Runs every candidate on the worker pool. Returns the survivors in
    /// index order and one reason per failed candidate. Dropping the
    /// returned future aborts the candidates still in flight.
    async fn theme_candidates(
        &self,
        plan: Arc<ContentPlan>,
        seed: Seed,
        n: usize,
        strict: bool,
        fallback: &TokenNames,
    ) -> (Vec<ThemeCandidate>, Vec<String>) {
        let workers = Arc::new(Semaphore::new(self.config.candidate_workers.max(1)));
        let validator: Arc<dyn Validator<ThemedOutput>> = if strict {
            Arc::new(ThemeRules::new(&plan, &self.priors.palette_names()))
        } else {
            Arc::new(Permissive)
        };

        let mut tasks = JoinSet::new();
        for index in 0..n {
            let request = self.theme_request(&plan, seed, index, THEME_MAX_REPAIRS);
            let runner = self.runner.clone();
            let workers = workers.clone();
            let validator = validator.clone();
            tasks.spawn(async move {
                let Ok(_permit) = workers.acquire_owned().await else {
                    return (index, Err("worker pool closed".to_string()));
                };
                let outcome = runner.run(&request, validator.as_ref()).await;
                (index, outcome.map_err(|e| e.to_string()))
            });
        }

        let mut candidates = Vec::with_capacity(n);
        let mut failures = Vec::new();
        let mut settled = vec![false; n];
        let mut lost = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(outcome))) => {
                    settled[index] = true;
                    candidates.push(ThemeCandidate::from_output(index, outcome.artifact, fallback));
                }
                Ok((index, Err(reason))) => {
                    settled[index] = true;
                    self.fail_candidate(index, reason, &mut failures);
                }
                Err(err) => lost.push(format!("candidate task: {err}")),
            }
        }
        // A panicked task never reports its index; pair each join error with
        // an index that never settled.
        let unsettled = settled.iter().enumerate().filter(|(_, done)| !**done).map(|(i, _)| i);
        for (index, reason) in unsettled.zip(lost) {
            self.fail_candidate(index, reason, &mut failures);
        }
        candidates.sort_by_key(|c| c.index);
        (candidates, failures)
    }

    fn fail_candidate(&self, index: usize, reason: String, failures: &mut Vec<String>) {
        failures.push(format!("candidate {index}: {reason}"));
        self.events.emit(PipelineEvent::CandidateFailed { index, reason });
    }

    fn score(&self, candidate: ThemeCandidate) -> ScoredCandidate {
        let report = self.linter.score(&candidate.spec);
        ScoredCandidate { candidate, score: report.score, violations: report.violations }
    }

    /// One repair call for the winner from its own prompt and seed, with its
    /// lint violations as instructions. Any well-formed answer is scored and
    /// replaces the winner only if it scores strictly higher.
    async fn targeted_repair(
        &self,
        winner: &mut ScoredCandidate,
        plan: &ContentPlan,
        seed: Seed,
        fallback: &TokenNames,
    ) -> TargetedRepairStatus {
        let index = winner.candidate.index;
        let before = winner.score;
        let request = self.theme_request(plan, seed, index, TARGETED_REPAIR_ATTEMPTS);
        let repaired = self
            .runner
            .repair::<ThemedOutput>(&request, winner.violations.clone(), &Permissive)
            .await;
        let (status, after) = match repaired {
            Ok(outcome) => {
                let repaired = self.score(ThemeCandidate::from_output(index, outcome.artifact, fallback));
                let after = repaired.score;
                if after > before {
                    *winner = repaired;
                    (TargetedRepairStatus::Adopted, Some(after))
                } else {
                    (TargetedRepairStatus::Rejected, Some(after))
                }
            }
            Err(_) => (TargetedRepairStatus::Failed, None),
        };
        self.events.emit(PipelineEvent::TargetedRepair {
            index,
            before,
            after,
            adopted: status == TargetedRepairStatus::Adopted,
        });
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config() -> PipelineConfig {
        PipelineConfig { max_candidates: 6, default_candidates: 4, ..Default::default() }
    }

    fn options(value: Value) -> Result<GenerationOptions, PipelineError> {
        let map = value.as_object().cloned().unwrap_or_default();
        GenerationOptions::from_map(&map, &config())
    }

    #[test]
    fn options_default_and_clamp() {
        assert_eq!(
            options(json!({})).unwrap(),
            GenerationOptions { n_candidates: 4, variety: 0, strict: false }
        );
        assert_eq!(options(json!({"n_candidates": 50})).unwrap().n_candidates, 6);
        assert_eq!(options(json!({"n_candidates": 0})).unwrap().n_candidates, 1);
        assert_eq!(options(json!({"variety": -3, "strict": true})).unwrap().variety, -3);
        assert!(options(json!({"strict": true})).unwrap().strict);
    }

    #[test]
    fn options_reject_wrong_types() {
        assert!(matches!(options(json!({"n_candidates": "four"})), Err(PipelineError::InvalidRequest(_))));
        assert!(matches!(options(json!({"variety": 1.5})), Err(PipelineError::InvalidRequest(_))));
        assert!(matches!(options(json!({"strict": "yes"})), Err(PipelineError::InvalidRequest(_))));
        assert!(matches!(options(json!({"n_candidates": 2.5})), Err(PipelineError::InvalidRequest(_))));
    }

    #[test]
    fn whole_floats_count_as_integers() {
        assert_eq!(options(json!({"n_candidates": 4.0})).unwrap().n_candidates, 4);
        assert_eq!(options(json!({"variety": 2.0})).unwrap().variety, 2);
    }

    #[test]
    fn prompt_is_trimmed_and_collapsed() {
        assert_eq!(normalize_prompt("  Create   a\ttodo\napp ").unwrap(), "Create a todo app");
    }

    #[test]
    fn prompt_bounds_are_enforced() {
        assert!(matches!(normalize_prompt(" \n "), Err(PipelineError::InvalidRequest(_))));
        assert!(normalize_prompt(&"a".repeat(MAX_PROMPT_CHARS)).is_ok());
        assert!(matches!(
            normalize_prompt(&"a".repeat(MAX_PROMPT_CHARS + 1)),
            Err(PipelineError::InvalidRequest(_))
        ));
    }
}
