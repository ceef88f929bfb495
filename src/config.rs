use std::str::FromStr;
use std::time::Duration;

use crate::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};

/// Placeholder key that switches the service to the offline demo oracle.
pub const DEMO_KEY: &str = "DEMO_KEY";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub pipeline: PipelineConfig,
}

/// Knobs of the generation pipeline itself.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub oracle_max_concurrency: usize,
    pub oracle_timeout: Duration,
    pub candidate_workers: usize,
    pub default_candidates: usize,
    pub max_candidates: usize,
    pub repair_threshold: u8,
    pub targeted_repair: bool,
    pub strict_validation: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            oracle_max_concurrency: 4,
            oracle_timeout: Duration::from_secs(60),
            candidate_workers: 4,
            default_candidates: 4,
            max_candidates: 8,
            repair_threshold: 85,
            targeted_repair: true,
            strict_validation: false,
        }
    }
}

impl Settings {
    /// Reads the process environment. Call `dotenv` first to pick up `.env`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or unparsable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = PipelineConfig::default();
        let parsed = |key: &str| -> Option<usize> { lookup(key).and_then(|v| v.trim().parse().ok()) };
        let flag = |key: &str, default: bool| lookup(key).map(|v| parse_flag(&v, default)).unwrap_or(default);
        let or = |v: Option<usize>, d: usize| v.unwrap_or(d);

        let max_candidates = or(parsed("MAX_CANDIDATES"), defaults.max_candidates).max(1);
        let pipeline = PipelineConfig {
            oracle_max_concurrency: or(parsed("ORACLE_MAX_CONCURRENCY"), defaults.oracle_max_concurrency).max(1),
            oracle_timeout: Duration::from_secs(parse_or(
                "ORACLE_TIMEOUT_SECS",
                &lookup,
                defaults.oracle_timeout.as_secs(),
            )),
            candidate_workers: or(parsed("CANDIDATE_WORKERS"), defaults.candidate_workers).max(1),
            default_candidates: or(parsed("DEFAULT_CANDIDATES"), defaults.default_candidates).clamp(1, max_candidates),
            max_candidates,
            repair_threshold: lookup("REPAIR_THRESHOLD")
                .and_then(|v| v.trim().parse::<u8>().ok())
                .filter(|t| *t <= 100)
                .unwrap_or(defaults.repair_threshold),
            targeted_repair: flag("TARGETED_REPAIR", defaults.targeted_repair),
            strict_validation: flag("STRICT_VALIDATION", defaults.strict_validation),
        };

        Self {
            port: parse_or("PORT", &lookup, 8080),
            api_key: lookup("GEMINI_API_KEY").unwrap_or_else(|| DEMO_KEY.into()),
            api_base: lookup("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()),
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            pipeline,
        }
    }

    pub fn demo_mode(&self) -> bool {
        self.api_key.trim().is_empty() || self.api_key == DEMO_KEY
    }
}

fn parse_or<T: FromStr>(key: &str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> T {
    lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_flag(raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
