//! Design linter: scores a finished spec out of 100 against a fixed rubric.
//!
//! | Check | Weight |
//! |---|---|
//! | contrast | 25 |
//! | spacing consistency | 20 |
//! | grid responsiveness | 15 |
//! | type hierarchy | 15 |
//! | consistency | 15 |
//! | landmarks | 10 |
//!
//! Each check starts at its weight and deducts for problems, never going
//! below zero. Scoring is a pure function of the spec.

use serde::Serialize;

use crate::color::{estimate_contrast, Rgb, AA_ACCENT, AA_TEXT};
use crate::models::{FontSize, SectionKind, Theme, UiSpec};

pub const CONTRAST_WEIGHT: u8 = 25;
pub const SPACING_WEIGHT: u8 = 20;
pub const GRID_WEIGHT: u8 = 15;
pub const TYPE_WEIGHT: u8 = 15;
pub const CONSISTENCY_WEIGHT: u8 = 15;
pub const LANDMARK_WEIGHT: u8 = 10;

const DENSE_PAGE_SECTIONS: usize = 8;
const MAX_DESKTOP_COLS: u32 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckScores {
    pub contrast: u8,
    pub spacing: u8,
    pub grid: u8,
    pub typography: u8,
    pub consistency: u8,
    pub landmarks: u8,
}

impl CheckScores {
    pub fn total(&self) -> u8 {
        let sum = u32::from(self.contrast)
            + u32::from(self.spacing)
            + u32::from(self.grid)
            + u32::from(self.typography)
            + u32::from(self.consistency)
            + u32::from(self.landmarks);
        sum.min(100) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LintReport {
    pub score: u8,
    pub checks: CheckScores,
    pub violations: Vec<String>,
}

/// One rubric check: starts at its weight, deducts, floors at zero.
struct Check<'a> {
    name: &'static str,
    weight: u8,
    lost: u32,
    violations: &'a mut Vec<String>,
}

impl<'a> Check<'a> {
    fn new(name: &'static str, weight: u8, violations: &'a mut Vec<String>) -> Self {
        Self { name, weight, lost: 0, violations }
    }

    fn deduct(&mut self, points: u32, reason: String) {
        self.lost += points;
        self.violations.push(format!("{}: {reason} (-{points})", self.name));
    }

    fn finish(self) -> u8 {
        u32::from(self.weight).saturating_sub(self.lost) as u8
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Linter;

impl Linter {
    pub fn new() -> Self {
        Linter
    }

    pub fn score(&self, spec: &UiSpec) -> LintReport {
        let mut violations = Vec::new();
        let default_theme = Theme::default();
        let theme = spec.theme.as_ref().unwrap_or(&default_theme);

        let checks = CheckScores {
            contrast: contrast(theme, &mut violations),
            spacing: spacing(theme, spec, &mut violations),
            grid: grid(spec, &mut violations),
            typography: typography(theme, &mut violations),
            consistency: consistency(theme, &mut violations),
            landmarks: landmarks(spec, &mut violations),
        };
        LintReport { score: checks.total(), checks, violations }
    }
}

fn contrast(theme: &Theme, violations: &mut Vec<String>) -> u8 {
    let mut check = Check::new("contrast", CONTRAST_WEIGHT, violations);
    let colors = &theme.colors;
    let background = colors.background.as_deref().unwrap_or("#ffffff");
    let primary = colors.primary.as_deref().unwrap_or("#000000");
    let foreground = colors.foreground.as_deref().unwrap_or("#000000");
    let accent = colors.accent.as_deref().unwrap_or(primary);

    for (name, color) in [("background", background), ("primary", primary), ("foreground", foreground), ("accent", accent)] {
        if Rgb::from_hex(color).is_none() {
            check.violations.push(format!("contrast: {name} '{color}' is not a hex colour, treated as black"));
        }
    }

    for (name, color, threshold, penalty) in [
        ("primary", primary, AA_TEXT, 10),
        ("foreground", foreground, AA_TEXT, 10),
        ("accent", accent, AA_ACCENT, 5),
    ] {
        let ratio = estimate_contrast(color, background);
        if ratio < threshold {
            check.deduct(
                penalty,
                format!("{name} {color} on background {background} is {ratio:.2}:1, needs {threshold}:1"),
            );
        }
    }
    check.finish()
}

fn spacing(theme: &Theme, spec: &UiSpec, violations: &mut Vec<String>) -> u8 {
    let mut check = Check::new("spacing", SPACING_WEIGHT, violations);
    if theme.spacing.scale.is_empty() {
        check.deduct(10, "no spacing scale defined".into());
        return check.finish();
    }
    if let Some(page) = spec.pages.iter().find(|p| p.sections.len() > DENSE_PAGE_SECTIONS) {
        check.deduct(
            5,
            format!(
                "page '{}' has {} sections (more than {DENSE_PAGE_SECTIONS})",
                page.route,
                page.sections.len()
            ),
        );
    }
    check.finish()
}

fn grid(spec: &UiSpec, violations: &mut Vec<String>) -> u8 {
    let mut check = Check::new("grid", GRID_WEIGHT, violations);
    for page in &spec.pages {
        for section in page.sections.iter().filter(|s| s.kind == SectionKind::Grid) {
            let grid = section.grid.clone().unwrap_or_default();
            let mobile = grid.sm_cols.unwrap_or(1);
            if mobile != 1 {
                check.deduct(3, format!("grid '{}' uses {mobile} columns on mobile", section.id));
            }
            let desktop = grid.lg_cols.or(grid.cols).unwrap_or(1);
            if desktop > MAX_DESKTOP_COLS {
                check.deduct(
                    3,
                    format!("grid '{}' uses {desktop} columns on large screens", section.id),
                );
            }
        }
    }
    check.finish()
}

fn typography(theme: &Theme, violations: &mut Vec<String>) -> u8 {
    let mut check = Check::new("typography", TYPE_WEIGHT, violations);
    let size = |value: &Option<FontSize>, default: f64| {
        value.as_ref().and_then(FontSize::px).unwrap_or(default)
    };
    let t = &theme.typography;
    let body = size(&t.body, 16.0);
    let h1 = size(&t.h1, 48.0);
    let h2 = size(&t.h2, 36.0);

    if !(14.0..=20.0).contains(&body) {
        check.deduct(5, format!("body size {body}px outside 14-20px"));
    }
    if !(28.0..=72.0).contains(&h1) {
        check.deduct(5, format!("h1 size {h1}px outside 28-72px"));
    }
    if !(h1 > h2 && h2 > body) {
        check.deduct(5, format!("hierarchy h1 {h1} > h2 {h2} > body {body} violated"));
    }
    check.finish()
}

fn consistency(theme: &Theme, violations: &mut Vec<String>) -> u8 {
    let mut check = Check::new("consistency", CONSISTENCY_WEIGHT, violations);
    let radius = theme.radius.unwrap_or(8.0);
    if !(0.0..=16.0).contains(&radius) {
        check.deduct(5, format!("corner radius {radius} outside 0-16"));
    }
    let shadows = theme.shadows.as_ref().map(|s| s.style_count()).unwrap_or(1.0);
    if shadows > 2.0 {
        check.deduct(5, format!("{shadows} shadow styles, at most 2"));
    }
    check.finish()
}

fn landmarks(spec: &UiSpec, violations: &mut Vec<String>) -> u8 {
    let mut check = Check::new("landmarks", LANDMARK_WEIGHT, violations);
    let has = |sections: &[crate::models::Section], kind: SectionKind| {
        sections.iter().any(|s| s.kind == kind)
    };
    if let Some(page) = spec.pages.iter().find(|p| !has(&p.sections, SectionKind::Nav)) {
        check.deduct(5, format!("page '{}' has no nav section", page.route));
    }
    if !spec.pages.iter().any(|p| has(&p.sections, SectionKind::Footer)) {
        check.deduct(2, "no page has a footer section".into());
    }
    check.finish()
}

/// Orders candidates by score, highest first. The sort is stable, so equal
/// scores keep generation order.
pub fn rank_by_score<T>(items: &mut [T], score: impl Fn(&T) -> u8) {
    items.sort_by(|a, b| score(b).cmp(&score(a)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GridConfig, Page, PageMeta, Section, Shadows, SpacingTokens, ThemeColors, Typography};
    use pretty_assertions::assert_eq;

    fn section(id: &str, kind: SectionKind) -> Section {
        Section::new(id, kind)
    }

    fn page(route: &str, sections: Vec<Section>) -> Page {
        Page { route: route.into(), meta: PageMeta::default(), sections }
    }

    fn good_theme() -> Theme {
        Theme {
            palette_name: Some("slate".into()),
            colors: ThemeColors {
                primary: Some("#0f172a".into()),
                accent: Some("#3b82f6".into()),
                background: Some("#ffffff".into()),
                foreground: Some("#0f172a".into()),
                ..Default::default()
            },
            typography: Typography {
                h1: Some(FontSize::Px(48.0)),
                h2: Some(FontSize::Px(36.0)),
                body: Some(FontSize::Px(16.0)),
                ..Default::default()
            },
            spacing: SpacingTokens { scale: vec![4.0, 8.0, 16.0, 24.0, 32.0, 48.0], unit: Some(4.0) },
            radius: Some(8.0),
            shadows: Some(Shadows::Count(1.0)),
            ..Default::default()
        }
    }

    fn good_spec() -> UiSpec {
        UiSpec {
            version: "1.0.0".into(),
            meta: Default::default(),
            theme: Some(good_theme()),
            pages: vec![page(
                "/",
                vec![
                    section("nav", SectionKind::Nav),
                    section("tasks", SectionKind::List),
                    section("footer", SectionKind::Footer),
                ],
            )],
            states: Default::default(),
        }
    }

    #[test]
    fn clean_spec_scores_full_marks() {
        let report = Linter.score(&good_spec());
        assert_eq!(report.violations, Vec::<String>::new());
        assert_eq!(report.score, 100);
    }

    #[test]
    fn low_contrast_deducts_per_color() {
        let mut spec = good_spec();
        let colors = &mut spec.theme.as_mut().unwrap().colors;
        colors.primary = Some("#eeeeee".into());
        colors.foreground = Some("#dddddd".into());
        colors.accent = Some("#f0f0f0".into());
        let report = Linter.score(&spec);
        assert_eq!(report.checks.contrast, 0);
        assert_eq!(report.score, 75);
        assert_eq!(report.violations.len(), 3);
    }

    #[test]
    fn accent_uses_relaxed_threshold() {
        let mut spec = good_spec();
        // ~3.5:1 on white: fails text contrast, passes accent contrast.
        spec.theme.as_mut().unwrap().colors.accent = Some("#888888".into());
        assert_eq!(Linter.score(&spec).checks.contrast, 25);
    }

    #[test]
    fn raising_contrast_never_lowers_score() {
        let mut spec = good_spec();
        spec.theme.as_mut().unwrap().colors.primary = Some("#cccccc".into());
        let before = Linter.score(&spec).score;
        spec.theme.as_mut().unwrap().colors.primary = Some("#222222".into());
        let after = Linter.score(&spec).score;
        assert!(after >= before);
        assert_eq!(after - before, 10);
    }

    #[test]
    fn missing_spacing_scale_gets_partial_credit() {
        let mut spec = good_spec();
        spec.theme.as_mut().unwrap().spacing.scale.clear();
        assert_eq!(Linter.score(&spec).checks.spacing, 10);
    }

    #[test]
    fn dense_page_is_penalized_once() {
        let mut spec = good_spec();
        let crowded: Vec<Section> =
            (0..9).map(|i| section(&format!("card-{i}"), SectionKind::Card)).collect();
        spec.pages.push(page("/a", crowded.clone()));
        spec.pages.push(page("/b", crowded));
        assert_eq!(Linter.score(&spec).checks.spacing, 15);
    }

    #[test]
    fn grid_checks_mobile_and_desktop_columns() {
        let mut spec = good_spec();
        let mut wide = section("features", SectionKind::Grid);
        wide.grid = Some(GridConfig { sm_cols: Some(2), lg_cols: Some(6), ..Default::default() });
        let mut legacy = section("stats", SectionKind::Grid);
        legacy.grid = Some(GridConfig { cols: Some(5), ..Default::default() });
        spec.pages[0].sections.extend([wide, legacy]);
        let report = Linter.score(&spec);
        assert_eq!(report.checks.grid, 6);
    }

    #[test]
    fn grid_score_floors_at_zero() {
        let mut spec = good_spec();
        for i in 0..5 {
            let mut g = section(&format!("g{i}"), SectionKind::Grid);
            g.grid = Some(GridConfig { sm_cols: Some(3), lg_cols: Some(8), ..Default::default() });
            spec.pages[0].sections.push(g);
        }
        assert_eq!(Linter.score(&spec).checks.grid, 0);
    }

    #[test]
    fn type_hierarchy_checks_ranges_and_order() {
        let mut spec = good_spec();
        spec.theme.as_mut().unwrap().typography = Typography {
            h1: Some(FontSize::Css("24px".into())),
            h2: Some(FontSize::Css("30px".into())),
            body: Some(FontSize::Px(22.0)),
            ..Default::default()
        };
        assert_eq!(Linter.score(&spec).checks.typography, 0);
    }

    #[test]
    fn consistency_checks_radius_and_shadows() {
        let mut spec = good_spec();
        let theme = spec.theme.as_mut().unwrap();
        theme.radius = Some(24.0);
        theme.shadows = Some(Shadows::Styles(vec!["a".into(), "b".into(), "c".into()]));
        assert_eq!(Linter.score(&spec).checks.consistency, 5);
    }

    #[test]
    fn landmarks_require_nav_everywhere_and_a_footer() {
        let mut spec = good_spec();
        spec.pages[0].sections.retain(|s| s.kind != SectionKind::Footer);
        spec.pages.push(page("/settings", vec![section("prefs", SectionKind::Form)]));
        let report = Linter.score(&spec);
        assert_eq!(report.checks.landmarks, 3);
    }

    #[test]
    fn empty_spec_stays_in_bounds() {
        let spec: UiSpec = serde_json::from_str("{}").unwrap();
        let report = Linter.score(&spec);
        assert!(report.score <= 100);
        // Default theme: no spacing scale (-10), no footer (-2).
        assert_eq!(report.score, 88);
    }

    #[test]
    fn ranking_is_stable_for_ties() {
        let mut scored = vec![(0, 60u8), (1, 85), (2, 85), (3, 40)];
        rank_by_score(&mut scored, |c| c.1);
        assert_eq!(scored.iter().map(|c| c.0).collect::<Vec<_>>(), vec![1, 2, 0, 3]);
    }
}
