use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Seeds live in `[0, 2^31 - 1)` so any oracle seed parameter accepts them.
pub const SEED_MODULUS: u64 = (1 << 31) - 1;

pub const LAYOUT_LABEL: &str = "pass_a";
pub const CONTENT_LABEL: &str = "pass_b";
pub const THEME_LABEL: &str = "pass_c";

/// A 31-bit deterministic seed. Sub-seeds are never stored on their own,
/// they are re-derived from the parent seed and a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(u32);

impl Seed {
    pub fn new(value: u64) -> Self {
        Seed((value % SEED_MODULUS) as u32)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Sub-seed for a stage or candidate label.
    pub fn derive(self, label: &str) -> Seed {
        hash_to_seed(&format!("{}|{}", self.0, label))
    }

    pub fn for_candidate(self, index: usize) -> Seed {
        self.derive(&candidate_label(index))
    }

    /// Shifted seed used by successive repair attempts.
    pub fn offset(self, by: u32) -> Seed {
        Seed::new(u64::from(self.0) + u64::from(by))
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn candidate_label(index: usize) -> String {
    format!("candidate_{index}")
}

/// Base seed for a request. The prompt is trimmed and lowercased and the
/// options are encoded with sorted keys, so formatting noise never moves it.
pub fn derive_base_seed(prompt: &str, options: &Map<String, Value>, schema_version: &str) -> Seed {
    let prompt = prompt.trim().to_lowercase();
    let options = canonical_options(options);
    hash_to_seed(&format!("{prompt}|{options}|{schema_version}"))
}

/// Applies the caller's variety factor. Non-positive factors keep the seed as is.
pub fn apply_variety(base: Seed, variety: i64) -> Seed {
    if variety > 0 {
        Seed::new(u64::from(base.value()) + variety as u64)
    } else {
        base
    }
}

/// Compact JSON with keys sorted at every depth.
pub fn canonical_options(options: &Map<String, Value>) -> String {
    canonicalize(&Value::Object(options.clone())).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn hash_to_seed(input: &str) -> Seed {
    let digest = Sha256::digest(input.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    Seed::new(u64::from_be_bytes(head))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashSet;

    fn options(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn base_seed_matches_known_digest() {
        let seed = derive_base_seed("Create a todo app", &Map::new(), "1.0.0");
        assert_eq!(seed.value(), 1_187_405_821);
    }

    #[test]
    fn base_seed_ignores_case_and_outer_whitespace() {
        let a = derive_base_seed("  Create a TODO app\n", &Map::new(), "1.0.0");
        let b = derive_base_seed("create a todo app", &Map::new(), "1.0.0");
        assert_eq!(a, b);
    }

    #[test]
    fn base_seed_is_stable_across_option_ordering() {
        let a = options(json!({"n_candidates": 4, "variety": 1, "nested": {"b": 1, "a": 2}}));
        let mut b = Map::new();
        b.insert("nested".into(), json!({"a": 2, "b": 1}));
        b.insert("variety".into(), json!(1));
        b.insert("n_candidates".into(), json!(4));
        assert_eq!(canonical_options(&a), canonical_options(&b));
        assert_eq!(
            derive_base_seed("dashboard", &a, "1.0.0"),
            derive_base_seed("dashboard", &b, "1.0.0")
        );
    }

    #[test]
    fn schema_version_moves_the_seed() {
        let a = derive_base_seed("dashboard", &Map::new(), "1.0.0");
        let b = derive_base_seed("dashboard", &Map::new(), "1.1.0");
        assert_ne!(a, b);
    }

    #[test]
    fn stage_sub_seeds_match_known_digests() {
        let base = Seed::new(1_187_405_821);
        assert_eq!(base.derive(LAYOUT_LABEL).value(), 937_900_621);
        assert_eq!(base.derive(CONTENT_LABEL).value(), 797_906_280);
        assert_eq!(base.derive(THEME_LABEL).value(), 946_356_030);
    }

    #[test]
    fn stage_sub_seeds_differ() {
        for raw in [0u64, 1, 42, 1_187_405_821, SEED_MODULUS - 1] {
            let base = Seed::new(raw);
            assert_ne!(base.derive(LAYOUT_LABEL), base.derive(CONTENT_LABEL));
            assert_ne!(base.derive(CONTENT_LABEL), base.derive(THEME_LABEL));
            assert_ne!(base.derive(LAYOUT_LABEL), base.derive(THEME_LABEL));
        }
    }

    #[test]
    fn ten_thousand_candidate_labels_do_not_collide() {
        for raw in [0u64, 42, 1_187_405_821] {
            let base = Seed::new(raw);
            let seeds: HashSet<Seed> = (0..10_000).map(|i| base.for_candidate(i)).collect();
            assert_eq!(seeds.len(), 10_000);
        }
    }

    #[test]
    fn seeds_stay_within_31_bits() {
        let base = Seed::new(u64::MAX);
        assert!(u64::from(base.value()) < SEED_MODULUS);
        assert!(u64::from(base.offset(u32::MAX).value()) < SEED_MODULUS);
    }

    #[test]
    fn variety_shifts_only_when_positive() {
        let base = Seed::new(100);
        assert_eq!(apply_variety(base, 0), base);
        assert_eq!(apply_variety(base, -3), base);
        assert_eq!(apply_variety(base, 2).value(), 102);
    }
}
