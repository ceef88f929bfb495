//! Generate, validate and repair a single stage artifact.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

use crate::events::{EventSink, PipelineEvent, Stage};
use crate::oracle::{OracleClient, OracleRequest};
use crate::prompts::repair_prompt;
use crate::seed::Seed;
use crate::validate::Validator;

/// Added to the stage temperature on repair calls.
pub const REPAIR_TEMPERATURE_STEP: f32 = 0.1;
/// Repair calls never run hotter than this.
pub const REPAIR_TEMPERATURE_CAP: f32 = 0.2;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StageError {
    #[error("{stage} stage failed validation after {repairs} repair attempt(s): {}", violations.join("; "))]
    ValidationExhausted {
        stage: Stage,
        candidate: Option<usize>,
        repairs: u32,
        violations: Vec<String>,
    },
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            StageError::ValidationExhausted { stage, .. } => *stage,
        }
    }

    pub fn violations(&self) -> &[String] {
        match self {
            StageError::ValidationExhausted { violations, .. } => violations,
        }
    }
}

/// Everything needed to call the oracle for one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRequest {
    pub stage: Stage,
    pub candidate: Option<usize>,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub seed: Seed,
    pub max_repairs: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome<T> {
    pub artifact: T,
    /// Repair calls it took; 0 when the first answer passed.
    pub repairs: u32,
}

pub struct StageRunner {
    client: Arc<OracleClient>,
    events: Arc<dyn EventSink>,
}

impl StageRunner {
    pub fn new(client: Arc<OracleClient>, events: Arc<dyn EventSink>) -> Self {
        Self { client, events }
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// One initial call followed by up to `max_repairs` repair calls.
    pub async fn run<T>(
        &self,
        request: &StageRequest,
        validator: &dyn Validator<T>,
    ) -> Result<StageOutcome<T>, StageError>
    where
        T: DeserializeOwned + Send,
    {
        self.events.emit(PipelineEvent::StageStarted {
            stage: request.stage,
            candidate: request.candidate,
        });
        let violations = match self
            .attempt(request, request.user.clone(), request.temperature, request.seed, validator)
            .await
        {
            Ok(artifact) => {
                self.succeeded(request, 0);
                return Ok(StageOutcome { artifact, repairs: 0 });
            }
            Err(violations) => violations,
        };
        self.repair(request, violations, validator).await
    }

    /// Runs only the repair loop, starting from an already known violation
    /// list.
    pub async fn repair<T>(
        &self,
        request: &StageRequest,
        mut violations: Vec<String>,
        validator: &dyn Validator<T>,
    ) -> Result<StageOutcome<T>, StageError>
    where
        T: DeserializeOwned + Send,
    {
        let temperature = (request.temperature + REPAIR_TEMPERATURE_STEP).min(REPAIR_TEMPERATURE_CAP);
        for attempt in 1..=request.max_repairs {
            self.events.emit(PipelineEvent::RepairAttempted {
                stage: request.stage,
                candidate: request.candidate,
                attempt,
                violations: violations.clone(),
            });
            let prompt = repair_prompt(&request.user, &violations);
            match self
                .attempt(request, prompt, temperature, request.seed.offset(attempt), validator)
                .await
            {
                Ok(artifact) => {
                    self.succeeded(request, attempt);
                    return Ok(StageOutcome { artifact, repairs: attempt });
                }
                Err(next) => violations = next,
            }
        }

        self.events.emit(PipelineEvent::StageFailed {
            stage: request.stage,
            candidate: request.candidate,
            violations: violations.clone(),
        });
        Err(StageError::ValidationExhausted {
            stage: request.stage,
            candidate: request.candidate,
            repairs: request.max_repairs,
            violations,
        })
    }

    fn succeeded(&self, request: &StageRequest, repairs: u32) {
        self.events.emit(PipelineEvent::StageSucceeded {
            stage: request.stage,
            candidate: request.candidate,
            repairs,
        });
    }

    /// Oracle failures and shape mismatches count as violations so they go
    /// through the same repair path as rule violations.
    async fn attempt<T>(
        &self,
        request: &StageRequest,
        user: String,
        temperature: f32,
        seed: Seed,
        validator: &dyn Validator<T>,
    ) -> Result<T, Vec<String>>
    where
        T: DeserializeOwned + Send,
    {
        let call = OracleRequest {
            stage: request.stage,
            system: request.system.clone(),
            user,
            temperature,
            seed,
            json_mode: true,
        };
        let value = self
            .client
            .invoke(&call)
            .await
            .map_err(|e| vec![format!("oracle: {e}")])?;
        let artifact: T = serde_json::from_value(value).map_err(|e| vec![format!("schema: {e}")])?;
        let validation = validator.validate(&artifact);
        if validation.is_valid() {
            Ok(artifact)
        } else {
            Err(validation.violations)
        }
    }
}
