//! Prompt builders for the three stages and the repair loop.
//!
//! Plans handed to a later stage are embedded verbatim between
//! [`PLAN_OPEN`] and [`PLAN_CLOSE`] so the oracle (and the offline demo
//! oracle) can recover them exactly.

use serde::Serialize;

use crate::models::{AppType, ContentPlan, LayoutPlan, Platform, SectionKind};
use crate::priors::{Defaults, DesignPriors};

pub const PLAN_OPEN: &str = "<plan>";
pub const PLAN_CLOSE: &str = "</plan>";

#[derive(Debug, Clone, PartialEq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

fn embed_plan<T: Serialize>(plan: &T) -> String {
    let json = serde_json::to_string_pretty(plan).unwrap_or_else(|_| "{}".to_string());
    format!("{PLAN_OPEN}\n{json}\n{PLAN_CLOSE}")
}

/// Recovers the JSON embedded by [`embed_plan`], if any.
pub fn extract_plan(prompt: &str) -> Option<&str> {
    let start = prompt.find(PLAN_OPEN)? + PLAN_OPEN.len();
    let end = start + prompt[start..].find(PLAN_CLOSE)?;
    Some(prompt[start..end].trim())
}

pub fn layout_prompts(
    prompt: &str,
    app_type: AppType,
    platform: Platform,
    defaults: &Defaults,
    priors: &DesignPriors,
) -> PromptPair {
    let kinds: Vec<&str> = SectionKind::ALL.iter().map(|k| k.as_str()).collect();
    let platform_notes = match platform {
        Platform::Mobile => "MOBILE: functional apps use list, form and card sections. \
Grids are always 1 column. Use one nav section (bottom tab bar) for multi-page apps.",
        Platform::Web => "WEB: functional apps use nav, list, table and form sections. \
Marketing pages start with a hero, use 2-4 column grids and end with a footer.",
    };
    let hero_rule = if app_type == AppType::Marketing {
        "- Use kind=hero for the main section"
    } else {
        "- DO NOT use kind=hero sections (this is NOT a landing page)\n- Use kind=list, kind=form, kind=table, kind=card sections"
    };

    let system = format!(
        "You are a UI architect creating a layout plan. Output JSON only, no prose.\n\n\
# Task\nGenerate pages, routes and ordered sections. NO colors, NO copy.\n\n\
# Target platform\n{platform}: {platform_notes}\n\n\
# Constraints\n- App type: {app_type}\n- Section kinds ONLY: {kinds}\n- Patterns: {patterns}\n\
- Flag empty/loading/error states on lists and tables\n- Section ids are unique across the app\n\n\
# Output schema\n{{\"pages\": [{{\"route\": \"/path\", \"title\": \"Page\", \"description\": \"Purpose\", \
\"sections\": [{{\"id\": \"unique-id\", \"kind\": \"list\", \"pattern\": \"List-Detail\", \"gridCols\": 1, \
\"hasEmptyState\": true, \"hasLoadingState\": true, \"hasErrorState\": true}}]}}], \
\"navItems\": [\"Home\"], \"requiredPatterns\": [\"List-Detail\"], \"notes\": \"Brief reasoning\"}}\n\n\
Return valid JSON now.",
        platform = platform.as_str().to_uppercase(),
        app_type = app_type.as_str(),
        kinds = kinds.join(", "),
        patterns = priors.patterns.join(", "),
    );

    let user = format!(
        "User prompt: \"{prompt}\"\n\nPlatform: {platform}\nApp type: {app_type}\nSuggested patterns: {patterns}\n\n\
IMPORTANT: This is a {app_type} app.\n{hero_rule}\n\nGenerate the layout plan following the schema.",
        platform = platform.as_str(),
        app_type = app_type.as_str(),
        patterns = defaults.patterns.join(", "),
    );
    PromptPair { system, user }
}

pub fn content_prompts(layout: &LayoutPlan) -> PromptPair {
    let routes: Vec<&str> = layout.routes().collect();
    let system = format!(
        "You are a content designer. Add labels, copy, CTAs and data structures. Output JSON only.\n\n\
# Layout context\nPages: {routes}\nNav items: {nav}\n\n\
# Constraints\n- Every interactive element needs a label\n- Forms need success and error messages\n\
- Tables need at least 3 columns\n- Keys of pageContent are routes; keys of forms, tables and lists are section ids \
from the layout. Never invent, drop or rename a route or section id.\n\n\
# Output schema\n{{\"pageContent\": {{\"/route\": {{\"headline\": \"text\", \"description\": \"text\", \
\"ctaPrimary\": \"Get Started\", \"ctaSecondary\": \"Learn More\", \"sectionLabels\": {{\"section-id\": \"label\"}}, \
\"states\": {{\"empty\": \"No items yet.\", \"loading\": \"Loading...\", \"error\": \"Failed to load.\"}}}}}}, \
\"forms\": {{\"section-id\": {{\"fields\": [{{\"name\": \"email\", \"label\": \"Email\", \"type\": \"email\", \
\"placeholder\": \"you@example.com\", \"required\": true, \"validation\": \"email\", \"helperText\": \"...\"}}], \
\"submitLabel\": \"Save\", \"successMessage\": \"Saved!\", \"errorMessage\": \"Check your inputs\"}}}}, \
\"tables\": {{\"section-id\": {{\"columns\": [{{\"key\": \"name\", \"label\": \"Name\", \"type\": \"text\", \"sortable\": true}}]}}}}, \
\"lists\": {{\"section-id\": {{\"itemTemplate\": {{\"title\": \"Item\", \"description\": \"...\", \"cta\": \"View\"}}}}}}, \
\"ctaTargets\": {{\"Get Started\": \"/signup\"}}, \"notes\": \"Content decisions\"}}\n\n\
Return valid JSON now.",
        routes = routes.join(", "),
        nav = layout.nav_items.join(", "),
    );
    let user = format!(
        "Based on the layout plan, add all content, labels and copy.\n\n\
Layout summary:\n- Pages: {}\n- Nav items: {}\n\nLayout plan (JSON):\n{}\n\n\
Generate the complete content plan following the schema.",
        layout.pages.len(),
        layout.nav_items.join(", "),
        embed_plan(layout),
    );
    PromptPair { system, user }
}

pub fn theme_prompts(content: &ContentPlan, priors: &DesignPriors, candidate: usize) -> PromptPair {
    let summary: Vec<String> = content
        .layout
        .pages
        .iter()
        .map(|p| {
            let kinds: Vec<&str> = p.sections.iter().map(|s| s.kind.as_str()).collect();
            format!("{}: {}", p.route, if kinds.is_empty() { "no sections".into() } else { kinds.join(", ") })
        })
        .collect();

    let system = format!(
        "You are a design system architect. Choose theme tokens from curated options. Output JSON only.\n\n\
# Available choices\nPalettes: {palettes}\nType scales: {types}\nSpacing scales: {spacing}\nRadius: 0-16\n\n\
# Layout snapshot\n- Routes & sections: {summary}\n- Nav items: {nav}\n\n\
# Constraints\n- Keep pages, routes and section ids exactly as provided, in order.\n\
- Colors, typography and spacing come from the chosen palette, type scale and spacing scale.\n\
- At most 2 shadow styles. Check WCAG AA contrast for primary and foreground on background.\n\n\
# Candidate variation\nThis is candidate #{number}. Make theme choices distinct from other candidates.\n\n\
# Output contract\n{{\"spec\": {{\"version\": \"1.0.0\", \"meta\": {{\"title\": \"...\", \"description\": \"...\", \
\"appType\": \"crud\", \"platform\": \"web\"}}, \"theme\": {{\"paletteName\": \"...\", \"typeScaleName\": \"...\", \
\"spacingScaleName\": \"...\", \"colors\": {{\"primary\": \"#hex\", \"secondary\": \"#hex\", \"accent\": \"#hex\", \
\"background\": \"#hex\", \"foreground\": \"#hex\", \"muted\": \"#hex\", \"border\": \"#hex\"}}, \
\"typography\": {{\"baseSize\": 16, \"scaleRatio\": 1.25, \"h1\": 48, \"h2\": 36, \"h3\": 28, \"body\": 16, \"small\": 14}}, \
\"spacing\": {{\"scale\": [4, 8, 16, 24, 32, 48], \"unit\": 4}}, \"radius\": 8, \"shadows\": 1}}, \
\"pages\": [{{\"route\": \"/\", \"meta\": {{\"title\": \"...\", \"icon\": \"Home\"}}, \"sections\": [{{\"id\": \"...\", \
\"kind\": \"grid\", \"title\": \"...\", \"grid\": {{\"cols\": 3, \"gap\": 16, \"smCols\": 1, \"mdCols\": 2, \"lgCols\": 3}}, \
\"content\": {{}}, \"states\": {{\"hasEmpty\": true, \"hasLoading\": true, \"hasError\": false}}}}]}}], \"states\": {{}}}}, \
\"paletteName\": \"...\", \"typeScaleName\": \"...\", \"spacingScaleName\": \"...\", \
\"contrastCheck\": \"AA pass\", \"notes\": \"one sentence\"}}\n\nReturn valid JSON now.",
        palettes = priors.palette_names().join(", "),
        types = priors.type_scale_names().join(", "),
        spacing = priors.spacing_scale_names().join(", "),
        summary = summary.join("; "),
        nav = content.layout.nav_items.join(", "),
        number = candidate + 1,
    );
    let user = format!(
        "Generate themed UI spec candidate #{number}.\n\nRequirements:\n\
- Keep layout, routes, section ids and content exactly as provided.\n\
- Choose theme tokens from the allowed lists.\n- Ensure WCAG AA contrast and return JSON only.\n\n\
Plan stats:\n- Pages: {pages}\n- Forms: {forms}\n- Tables: {tables}\n\n\
Content plan (use verbatim):\n{plan}\n",
        number = candidate + 1,
        pages = content.layout.pages.len(),
        forms = content.forms.len(),
        tables = content.tables.len(),
        plan = embed_plan(content),
    );
    PromptPair { system, user }
}

/// The original prompt plus the violation list, asking for nothing else to change.
pub fn repair_prompt(original: &str, violations: &[String]) -> String {
    let bullets: Vec<String> = violations.iter().map(|v| format!("- {v}")).collect();
    format!(
        "{original}\n\nIMPORTANT: Your previous output had validation errors. Fix these specific issues:\n\n{}\n\n\
DO NOT make structural changes beyond fixing these violations.\nReturn the corrected JSON.",
        bullets.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LayoutPage, LayoutSection};
    use pretty_assertions::assert_eq;

    fn layout() -> LayoutPlan {
        LayoutPlan {
            pages: vec![LayoutPage {
                route: "/".into(),
                title: Some("Tasks".into()),
                description: None,
                sections: vec![LayoutSection {
                    id: "task-list".into(),
                    kind: SectionKind::List,
                    pattern: Some("List-Detail".into()),
                    grid_cols: None,
                    has_empty_state: true,
                    has_loading_state: true,
                    has_error_state: false,
                }],
            }],
            nav_items: vec!["Tasks".into()],
            ..Default::default()
        }
    }

    #[test]
    fn layout_prompt_forbids_hero_for_functional_apps() {
        let priors = DesignPriors::builtin();
        let defaults = priors.defaults_for(AppType::Crud);
        let pair = layout_prompts("Create a todo app", AppType::Crud, Platform::Web, &defaults, &priors);
        assert!(pair.user.contains("DO NOT use kind=hero"));
        assert!(pair.user.contains("App type: crud"));
        assert!(pair.system.contains("hero, grid, card, list, form, table, nav, footer, modal"));

        let marketing = priors.defaults_for(AppType::Marketing);
        let pair = layout_prompts("landing page", AppType::Marketing, Platform::Web, &marketing, &priors);
        assert!(pair.user.contains("Use kind=hero for the main section"));
    }

    #[test]
    fn content_prompt_embeds_layout_verbatim() {
        let plan = layout();
        let pair = content_prompts(&plan);
        let embedded: LayoutPlan = serde_json::from_str(extract_plan(&pair.user).unwrap()).unwrap();
        assert_eq!(embedded, plan);
    }

    #[test]
    fn theme_prompt_numbers_candidates_from_one() {
        let content = ContentPlan { layout: layout(), ..Default::default() };
        let pair = theme_prompts(&content, &DesignPriors::builtin(), 2);
        assert!(pair.user.starts_with("Generate themed UI spec candidate #3."));
        assert!(pair.system.contains("Palettes: slate, pine, sky, plum, sand"));
        assert!(pair.system.contains("/: list"));
        let embedded: ContentPlan = serde_json::from_str(extract_plan(&pair.user).unwrap()).unwrap();
        assert_eq!(embedded, content);
    }

    #[test]
    fn repair_prompt_lists_violations() {
        let prompt = repair_prompt("Make a layout", &["no pages".into(), "duplicate route '/'".into()]);
        assert!(prompt.starts_with("Make a layout\n\nIMPORTANT"));
        assert!(prompt.contains("- no pages\n- duplicate route '/'"));
        assert!(prompt.contains("DO NOT make structural changes"));
        // The embedded plan survives a repair round.
        let repaired = repair_prompt(&format!("x {PLAN_OPEN}{{}}{PLAN_CLOSE}"), &["v".into()]);
        assert_eq!(extract_plan(&repaired), Some("{}"));
    }
}
