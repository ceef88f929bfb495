//! Normalization passes over the winning spec.
//!
//! Each pass is idempotent and best effort: a missing block skips that pass
//! (noted in the report) instead of failing the artifact.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::color::{contrast_ratio, Rgb, AA_TEXT};
use crate::models::{SectionKind, UiSpec};
use crate::priors::DesignPriors;

pub const NUDGE_STEP: i16 = 10;
pub const NUDGE_MAX_ITERATIONS: u32 = 10;
const FALLBACK_SCALE: [f64; 6] = [4.0, 8.0, 16.0, 24.0, 32.0, 48.0];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnappedGap {
    pub route: String,
    pub section_id: String,
    pub from: f64,
    pub to: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgedColor {
    pub token: String,
    pub from: String,
    pub to: String,
    pub ratio: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub route: String,
    pub kind: SectionKind,
    pub title: String,
    pub section_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacedIcon {
    pub route: String,
    pub section_id: Option<String>,
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostProcessReport {
    pub snapped: Vec<SnappedGap>,
    pub nudged: Vec<NudgedColor>,
    pub duplicates: Vec<DuplicateGroup>,
    pub icons: Vec<ReplacedIcon>,
    /// Passes that were skipped because their input was missing.
    pub skipped: Vec<String>,
}

impl PostProcessReport {
    /// Duplicate groups rendered as violations for observability.
    pub fn duplicate_violations(&self) -> Vec<String> {
        self.duplicates
            .iter()
            .map(|d| {
                format!(
                    "duplicates: page '{}' has {} {} sections titled '{}' ({})",
                    d.route,
                    d.section_ids.len(),
                    d.kind.as_str(),
                    d.title,
                    d.section_ids.join(", ")
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PostProcessor {
    priors: Arc<DesignPriors>,
}

impl PostProcessor {
    pub fn new(priors: Arc<DesignPriors>) -> Self {
        Self { priors }
    }

    /// Runs spacing snap, contrast nudge, duplicate detection and icon
    /// fallback, in that order.
    pub fn run(&self, spec: &mut UiSpec) -> PostProcessReport {
        let mut report = PostProcessReport::default();
        self.snap_spacing(spec, &mut report);
        self.nudge_contrast(spec, &mut report);
        self.detect_duplicates(spec, &mut report);
        self.fallback_icons(spec, &mut report);
        report
    }

    fn spacing_steps(&self, spec: &UiSpec) -> Vec<f64> {
        let theme = spec.theme.as_ref();
        if let Some(scale) = theme.map(|t| &t.spacing.scale).filter(|s| !s.is_empty()) {
            let mut steps = scale.clone();
            steps.sort_by(|a, b| a.total_cmp(b));
            return steps;
        }
        theme
            .and_then(|t| t.spacing_scale_name.as_deref())
            .and_then(|name| self.priors.spacing_scale(name))
            .map(|s| s.steps.clone())
            .unwrap_or_else(|| FALLBACK_SCALE.to_vec())
    }

    fn snap_spacing(&self, spec: &mut UiSpec, report: &mut PostProcessReport) {
        let steps = self.spacing_steps(spec);
        for page in &mut spec.pages {
            for section in page.sections.iter_mut().filter(|s| s.kind == SectionKind::Grid) {
                let Some(grid) = section.grid.as_mut() else { continue };
                let Some(gap) = grid.gap else { continue };
                let snapped = snap_to_nearest(gap, &steps);
                if snapped != gap {
                    grid.gap = Some(snapped);
                    report.snapped.push(SnappedGap {
                        route: page.route.clone(),
                        section_id: section.id.clone(),
                        from: gap,
                        to: snapped,
                    });
                }
            }
        }
    }

    fn nudge_contrast(&self, spec: &mut UiSpec, report: &mut PostProcessReport) {
        let Some(theme) = spec.theme.as_mut() else {
            report.skipped.push("contrast: no theme block".into());
            return;
        };
        let colors = &mut theme.colors;
        let background_hex = colors.background.clone().unwrap_or_else(|| "#ffffff".into());
        let Some(background) = Rgb::from_hex(&background_hex) else {
            report.skipped.push(format!("contrast: background '{background_hex}' is not a hex colour"));
            return;
        };

        for (token, slot) in [("primary", &mut colors.primary), ("foreground", &mut colors.foreground)] {
            let Some(current) = slot.clone() else { continue };
            let Some(rgb) = Rgb::from_hex(&current) else {
                report.skipped.push(format!("contrast: {token} '{current}' is not a hex colour"));
                continue;
            };
            if contrast_ratio(rgb, background) >= AA_TEXT {
                continue;
            }
            let outcome = nudge_for_contrast(rgb, background, AA_TEXT);
            let hex = outcome.color.to_hex();
            if hex != current.to_lowercase() {
                *slot = Some(hex.clone());
            }
            report.nudged.push(NudgedColor {
                token: token.to_string(),
                from: current,
                to: hex,
                ratio: outcome.ratio,
                converged: outcome.converged(),
            });
        }
    }

    fn detect_duplicates(&self, spec: &UiSpec, report: &mut PostProcessReport) {
        for page in &spec.pages {
            let mut groups: HashMap<(SectionKind, &str), Vec<String>> = HashMap::new();
            let mut order = Vec::new();
            for section in &page.sections {
                let Some(title) = section.title.as_deref().filter(|t| !t.trim().is_empty()) else {
                    continue;
                };
                let key = (section.kind, title);
                let ids = groups.entry(key).or_default();
                if ids.is_empty() {
                    order.push(key);
                }
                ids.push(section.id.clone());
            }
            for key in order {
                let ids = &groups[&key];
                if ids.len() > 1 {
                    report.duplicates.push(DuplicateGroup {
                        route: page.route.clone(),
                        kind: key.0,
                        title: key.1.to_string(),
                        section_ids: ids.clone(),
                    });
                }
            }
        }
    }

    fn fallback_icons(&self, spec: &mut UiSpec, report: &mut PostProcessReport) {
        let fallback = self.priors.fallback_icon.clone();
        for page in &mut spec.pages {
            if let Some(icon) = page.meta.icon.as_mut() {
                if !icon.is_empty() && !self.priors.is_known_icon(icon) {
                    report.icons.push(ReplacedIcon {
                        route: page.route.clone(),
                        section_id: None,
                        icon: std::mem::replace(icon, fallback.clone()),
                    });
                }
            }
            for section in &mut page.sections {
                let Some(Value::String(icon)) =
                    section.content.as_mut().and_then(|c| c.get_mut("icon"))
                else {
                    continue;
                };
                if !icon.is_empty() && !self.priors.is_known_icon(icon) {
                    report.icons.push(ReplacedIcon {
                        route: page.route.clone(),
                        section_id: Some(section.id.clone()),
                        icon: std::mem::replace(icon, fallback.clone()),
                    });
                }
            }
        }
    }
}

/// Nearest element of `scale` to `value`; the lower one on exact ties.
/// An empty scale leaves the value alone.
pub fn snap_to_nearest(value: f64, scale: &[f64]) -> f64 {
    let mut best: Option<f64> = None;
    for &step in scale {
        best = match best {
            None => Some(step),
            Some(b) => {
                let (d_step, d_best) = ((step - value).abs(), (b - value).abs());
                if d_step < d_best || (d_step == d_best && step < b) {
                    Some(step)
                } else {
                    Some(b)
                }
            }
        };
    }
    best.unwrap_or(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NudgeOutcome {
    pub color: Rgb,
    pub ratio: f64,
    pub iterations: u32,
    pub target: f64,
}

impl NudgeOutcome {
    pub fn converged(&self) -> bool {
        self.ratio >= self.target
    }
}

/// Steps every channel by ±10 until `color` reaches `target` against
/// `background`, for at most ten steps. Light backgrounds push the colour
/// darker, dark ones push it lighter.
pub fn nudge_for_contrast(color: Rgb, background: Rgb, target: f64) -> NudgeOutcome {
    let step = if background.luminance() > 0.5 { -NUDGE_STEP } else { NUDGE_STEP };
    let mut current = color;
    let mut iterations = 0;
    while iterations < NUDGE_MAX_ITERATIONS && contrast_ratio(current, background) < target {
        current = current.shifted(step);
        iterations += 1;
    }
    NudgeOutcome {
        color: current,
        ratio: contrast_ratio(current, background),
        iterations,
        target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GridConfig, Page, PageMeta, Section, SpacingTokens, Theme, ThemeColors};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn processor() -> PostProcessor {
        PostProcessor::new(Arc::new(DesignPriors::builtin()))
    }

    fn grid(id: &str, gap: f64) -> Section {
        let mut s = Section::new(id, SectionKind::Grid);
        s.grid = Some(GridConfig { gap: Some(gap), cols: Some(3), ..Default::default() });
        s
    }

    fn spec_with(theme: Option<Theme>, sections: Vec<Section>) -> UiSpec {
        UiSpec {
            version: "1.0.0".into(),
            meta: Default::default(),
            theme,
            pages: vec![Page { route: "/".into(), meta: PageMeta::default(), sections }],
            states: Default::default(),
        }
    }

    #[test]
    fn snap_picks_nearest_and_lower_on_ties() {
        let scale = [4.0, 8.0, 16.0, 24.0];
        assert_eq!(snap_to_nearest(7.0, &scale), 8.0);
        assert_eq!(snap_to_nearest(12.0, &scale), 8.0);
        assert_eq!(snap_to_nearest(20.0, &scale), 16.0);
        assert_eq!(snap_to_nearest(100.0, &scale), 24.0);
        assert_eq!(snap_to_nearest(-3.0, &scale), 4.0);
        assert_eq!(snap_to_nearest(5.0, &[]), 5.0);
    }

    #[test]
    fn snap_is_idempotent() {
        let scale = [4.0, 8.0, 12.0, 16.0, 24.0, 32.0];
        for x in (-10..60).map(|i| i as f64 * 0.75) {
            let once = snap_to_nearest(x, &scale);
            assert_eq!(snap_to_nearest(once, &scale), once);
        }
    }

    #[test]
    fn snaps_grid_gaps_to_theme_scale() {
        let theme = Theme {
            spacing: SpacingTokens { scale: vec![4.0, 8.0, 12.0, 16.0, 24.0, 32.0], unit: None },
            ..Default::default()
        };
        let mut spec = spec_with(Some(theme), vec![grid("features", 20.0), grid("stats", 12.0)]);
        let report = processor().run(&mut spec);
        assert_eq!(spec.pages[0].sections[0].grid.as_ref().unwrap().gap, Some(16.0));
        assert_eq!(spec.pages[0].sections[1].grid.as_ref().unwrap().gap, Some(12.0));
        assert_eq!(report.snapped.len(), 1);
    }

    #[test]
    fn snap_falls_back_to_named_then_default_scale() {
        let named = Theme { spacing_scale_name: Some("compact".into()), ..Default::default() };
        let mut spec = spec_with(Some(named), vec![grid("g", 11.0)]);
        processor().run(&mut spec);
        assert_eq!(spec.pages[0].sections[0].grid.as_ref().unwrap().gap, Some(12.0));

        let mut bare = spec_with(None, vec![grid("g", 11.0)]);
        let report = processor().run(&mut bare);
        assert_eq!(bare.pages[0].sections[0].grid.as_ref().unwrap().gap, Some(8.0));
        assert_eq!(report.skipped, vec!["contrast: no theme block".to_string()]);
    }

    #[test]
    fn nudge_stops_at_iteration_cap_for_grey_on_grey() {
        let color = Rgb::from_hex("#777777").unwrap();
        let background = Rgb::from_hex("#808080").unwrap();
        let outcome = nudge_for_contrast(color, background, AA_TEXT);
        assert!(outcome.converged() || outcome.iterations == NUDGE_MAX_ITERATIONS);
        assert_eq!(outcome.iterations, NUDGE_MAX_ITERATIONS);
        assert_eq!(outcome.color.to_hex(), "#dbdbdb");
    }

    #[test]
    fn nudge_darkens_on_light_background_until_passing() {
        let color = Rgb::from_hex("#999999").unwrap();
        let outcome = nudge_for_contrast(color, Rgb::WHITE, AA_TEXT);
        assert!(outcome.converged());
        assert!(outcome.iterations > 0 && outcome.iterations < NUDGE_MAX_ITERATIONS);
        assert!(outcome.color.r < 0x99);
    }

    #[test]
    fn nudge_rewrites_failing_tokens_only() {
        let theme = Theme {
            colors: ThemeColors {
                primary: Some("#999999".into()),
                foreground: Some("#0f172a".into()),
                background: Some("#ffffff".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut spec = spec_with(Some(theme), vec![]);
        let report = processor().run(&mut spec);
        let colors = &spec.theme.as_ref().unwrap().colors;
        assert_ne!(colors.primary.as_deref(), Some("#999999"));
        assert_eq!(colors.foreground.as_deref(), Some("#0f172a"));
        assert_eq!(report.nudged.len(), 1);
        assert!(report.nudged[0].converged);

        let again = processor().run(&mut spec);
        assert!(again.nudged.is_empty());
    }

    #[test]
    fn flags_duplicate_titled_sections_without_merging() {
        let mut a = Section::new("a", SectionKind::Card);
        a.title = Some("Stats".into());
        let mut b = Section::new("b", SectionKind::Card);
        b.title = Some("Stats".into());
        let mut c = Section::new("c", SectionKind::List);
        c.title = Some("Stats".into());
        let untitled = [Section::new("d", SectionKind::Card), Section::new("e", SectionKind::Card)];
        let mut sections = vec![a, b, c];
        sections.extend(untitled);
        let mut spec = spec_with(None, sections);
        let report = processor().run(&mut spec);
        assert_eq!(spec.pages[0].sections.len(), 5);
        assert_eq!(
            report.duplicates,
            vec![DuplicateGroup {
                route: "/".into(),
                kind: SectionKind::Card,
                title: "Stats".into(),
                section_ids: vec!["a".into(), "b".into()],
            }]
        );
        assert_eq!(
            report.duplicate_violations(),
            vec!["duplicates: page '/' has 2 card sections titled 'Stats' (a, b)".to_string()]
        );
    }

    #[test]
    fn unknown_icons_fall_back() {
        let mut hero = Section::new("hero", SectionKind::Hero);
        hero.content = json!({"icon": "HouseIcon"}).as_object().cloned();
        let mut card = Section::new("card", SectionKind::Card);
        card.content = json!({"icon": "Home"}).as_object().cloned();
        let mut spec = spec_with(None, vec![hero, card]);
        spec.pages[0].meta.icon = Some("Rocket".into());

        let report = processor().run(&mut spec);
        assert_eq!(spec.pages[0].meta.icon.as_deref(), Some("Circle"));
        assert_eq!(spec.pages[0].sections[0].content.as_ref().unwrap()["icon"], json!("Circle"));
        assert_eq!(spec.pages[0].sections[1].content.as_ref().unwrap()["icon"], json!("Home"));
        assert_eq!(report.icons.len(), 2);
        assert_eq!(report.icons[1].icon, "HouseIcon");
    }
}
