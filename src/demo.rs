//! Offline oracle used when no API key is configured.
//!
//! Answers are built from the request itself: the layout comes from the
//! app type named in the prompt, content and theme answers echo the plan
//! embedded in the prompt, and the theme tokens are picked from the request
//! seed. Same request, same answer.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::events::Stage;
use crate::models::{
    AppType, ContentPlan, FontSize, FormContent, FormField, GridConfig, LayoutPage, LayoutPlan,
    LayoutSection, Page, PageContent, PageMeta, Platform, Section, SectionKind, SectionStates,
    Shadows, SpacingTokens, SpecMeta, TableColumn, TableContent, Theme, ThemeColors, ThemedOutput,
    Typography, UiSpec, SCHEMA_VERSION,
};
use crate::oracle::{preview, Oracle, OracleError, OracleRequest};
use crate::priors::DesignPriors;
use crate::prompts::extract_plan;

/// Grid gap the demo emits; deliberately off every spacing scale.
const DEMO_GRID_GAP: f64 = 20.0;

pub struct DemoOracle {
    priors: Arc<DesignPriors>,
}

impl DemoOracle {
    pub fn new(priors: Arc<DesignPriors>) -> Self {
        Self { priors }
    }

    fn theme(&self, content: &ContentPlan, seed: u32) -> Result<ThemedOutput, OracleError> {
        let seed = seed as usize;
        let palette = pick(&self.priors.palettes, seed, "palettes")?;
        let scale = pick(&self.priors.type_scales, seed / 7, "type scales")?;
        let spacing = pick(&self.priors.spacing_scales, seed / 11, "spacing scales")?;
        let colors = &palette.light;
        let px = |v: u32| Some(FontSize::Px(f64::from(v)));

        let theme = Theme {
            palette_name: Some(palette.name.clone()),
            type_scale_name: Some(scale.name.clone()),
            spacing_scale_name: Some(spacing.name.clone()),
            colors: ThemeColors {
                primary: Some(colors.primary.clone()),
                secondary: Some(colors.secondary.clone()),
                accent: Some(colors.accent.clone()),
                background: Some(colors.background.clone()),
                foreground: Some(colors.foreground.clone()),
                muted: Some(colors.muted.clone()),
                border: Some(colors.border.clone()),
            },
            typography: Typography {
                base_size: px(scale.base_size),
                scale_ratio: Some(scale.scale_ratio),
                h1: px(scale.h1),
                h2: px(scale.h2),
                h3: px(scale.h3),
                h4: px(scale.h4),
                body: px(scale.body),
                small: px(scale.small),
            },
            spacing: SpacingTokens {
                scale: spacing.steps.clone(),
                unit: Some(f64::from(spacing.unit)),
            },
            radius: Some([4.0, 8.0, 12.0][seed % 3]),
            shadows: Some(Shadows::Count(1.0)),
        };

        let layout = &content.layout;
        let title = layout
            .pages
            .first()
            .and_then(|p| p.title.clone())
            .unwrap_or_else(|| "Generated App".to_string());
        let pages = layout.pages.iter().map(|page| themed_page(page, content)).collect();

        Ok(ThemedOutput {
            spec: UiSpec {
                version: SCHEMA_VERSION.to_string(),
                meta: SpecMeta {
                    title,
                    description: layout.notes.clone(),
                    app_type: None,
                    platform: None,
                },
                theme: Some(theme),
                pages,
                states: Map::new(),
            },
            palette_name: Some(palette.name.clone()),
            type_scale_name: Some(scale.name.clone()),
            spacing_scale_name: Some(spacing.name.clone()),
            contrast_check: Some("AA pass".to_string()),
            notes: Some(format!("{} palette, {} mood", palette.name, palette.mood)),
        })
    }
}

#[async_trait]
impl Oracle for DemoOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError> {
        match request.stage {
            Stage::Layout => {
                let app_type = line_value(&request.user, "App type:")
                    .and_then(AppType::parse)
                    .unwrap_or(AppType::Crud);
                let platform = match line_value(&request.user, "Platform:") {
                    Some("mobile") => Platform::Mobile,
                    _ => Platform::Web,
                };
                encode(&layout_plan(app_type, platform))
            }
            Stage::Content => {
                let layout: LayoutPlan = embedded_plan(&request.user)?;
                encode(&content_plan(layout))
            }
            Stage::Theme => {
                let content: ContentPlan = embedded_plan(&request.user)?;
                encode(&self.theme(&content, request.seed.value())?)
            }
        }
    }
}

fn line_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines()
        .find_map(|line| line.trim().strip_prefix(key))
        .map(str::trim)
}

fn embedded_plan<T: serde::de::DeserializeOwned>(prompt: &str) -> Result<T, OracleError> {
    let raw = extract_plan(prompt)
        .ok_or_else(|| OracleError::Transport("demo oracle: prompt carries no plan".into()))?;
    serde_json::from_str(raw).map_err(|e| OracleError::MalformedJson {
        reason: e.to_string(),
        preview: preview(raw, 200),
    })
}

/// Seed-indexed choice from a priors table.
fn pick<'a, T>(items: &'a [T], n: usize, table: &str) -> Result<&'a T, OracleError> {
    n.checked_rem(items.len())
        .and_then(|i| items.get(i))
        .ok_or_else(|| OracleError::Transport(format!("demo oracle: no {table} in the design priors")))
}

fn encode<T: Serialize>(value: &T) -> Result<String, OracleError> {
    serde_json::to_string(value).map_err(|e| OracleError::Transport(e.to_string()))
}

fn section(id: &str, kind: SectionKind, pattern: Option<&str>, grid_cols: Option<u32>) -> LayoutSection {
    let stateful = matches!(kind, SectionKind::List | SectionKind::Table | SectionKind::Grid);
    LayoutSection {
        id: id.to_string(),
        kind,
        pattern: pattern.map(str::to_string),
        grid_cols,
        has_empty_state: stateful,
        has_loading_state: stateful,
        has_error_state: stateful,
    }
}

fn layout_plan(app_type: AppType, platform: Platform) -> LayoutPlan {
    let cols = |web: u32| Some(if platform == Platform::Mobile { 1 } else { web });
    let (home_title, body, second) = match app_type {
        AppType::Marketing => (
            "Welcome",
            vec![
                section("hero", SectionKind::Hero, Some("Hero-Center"), None),
                section("features", SectionKind::Grid, Some("Feature-3up"), cols(3)),
            ],
            ("/signup", "Sign Up", section("signup-form", SectionKind::Form, Some("Auth-Card"), None)),
        ),
        AppType::Dashboard => (
            "Overview",
            vec![
                section("stats", SectionKind::Grid, Some("Stats-4up"), cols(4)),
                section("activity-table", SectionKind::Table, Some("Table-With-Filters"), None),
            ],
            ("/settings", "Settings", section("settings-form", SectionKind::Form, Some("Settings-Sections"), None)),
        ),
        AppType::Crud => (
            "Items",
            vec![
                section("item-list", SectionKind::List, Some("List-Detail"), None),
                section("item-form", SectionKind::Form, None, None),
            ],
            ("/settings", "Settings", section("settings-form", SectionKind::Form, Some("Settings-Sections"), None)),
        ),
        AppType::AuthHeavy => (
            "Sign In",
            vec![section("login-form", SectionKind::Form, Some("Auth-Card"), None)],
            ("/account", "Account", section("account-form", SectionKind::Form, Some("Settings-Sections"), None)),
        ),
    };

    let mut home = vec![section("main-nav", SectionKind::Nav, None, None)];
    home.extend(body);
    home.push(section("site-footer", SectionKind::Footer, None, None));

    let (route, title, form) = second;
    let prefix = route.trim_start_matches('/');
    let other = vec![
        section(&format!("{prefix}-nav"), SectionKind::Nav, None, None),
        form,
        section(&format!("{prefix}-footer"), SectionKind::Footer, None, None),
    ];

    LayoutPlan {
        pages: vec![
            LayoutPage {
                route: "/".into(),
                title: Some(home_title.into()),
                description: Some(format!("Main {} view", app_type.as_str())),
                sections: home,
            },
            LayoutPage {
                route: route.into(),
                title: Some(title.into()),
                description: None,
                sections: other,
            },
        ],
        nav_items: vec![home_title.into(), title.into()],
        required_patterns: Vec::new(),
        notes: Some(format!("{} layout for {}", app_type.as_str(), platform.as_str())),
    }
}

fn title_case(id: &str) -> String {
    id.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn content_plan(layout: LayoutPlan) -> ContentPlan {
    let mut plan = ContentPlan::default();
    for page in &layout.pages {
        let title = page.title.clone().unwrap_or_else(|| title_case(page.route.trim_start_matches('/')));
        let mut labels = BTreeMap::new();
        for s in &page.sections {
            labels.insert(s.id.clone(), title_case(&s.id));
            match s.kind {
                SectionKind::Form => {
                    plan.forms.insert(
                        s.id.clone(),
                        FormContent {
                            fields: vec![
                                field("title", "Title", "text", true),
                                field("notes", "Notes", "textarea", false),
                            ],
                            submit_label: Some("Save".into()),
                            success_message: Some("Saved!".into()),
                            error_message: Some("Please check your inputs.".into()),
                        },
                    );
                }
                SectionKind::Table => {
                    let columns = [("name", "Name"), ("status", "Status"), ("updated", "Updated")]
                        .into_iter()
                        .map(|(key, label)| TableColumn {
                            key: key.into(),
                            label: label.into(),
                            column_type: "text".into(),
                            sortable: true,
                            width: None,
                        })
                        .collect();
                    plan.tables.insert(s.id.clone(), TableContent { columns });
                }
                SectionKind::List => {
                    plan.lists.insert(
                        s.id.clone(),
                        json!({"itemTemplate": {"title": "Item", "description": "Details", "cta": "View"}}),
                    );
                }
                _ => {}
            }
        }
        let states = [("empty", "Nothing here yet."), ("loading", "Loading..."), ("error", "Failed to load.")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        plan.page_content.insert(
            page.route.clone(),
            PageContent {
                headline: Some(title),
                description: page.description.clone(),
                cta_primary: Some("Get Started".into()),
                cta_secondary: None,
                section_labels: labels,
                states,
            },
        );
    }
    plan.cta_targets.insert("Get Started".into(), "/".into());
    plan.layout = layout;
    plan
}

fn field(name: &str, label: &str, kind: &str, required: bool) -> FormField {
    FormField {
        name: name.into(),
        label: label.into(),
        field_type: kind.into(),
        placeholder: None,
        required,
        validation: None,
        helper_text: None,
    }
}

fn page_icon(route: &str) -> &'static str {
    match route {
        "/" => "Home",
        "/settings" | "/account" => "Settings",
        "/signup" => "UserPlus",
        _ => "Circle",
    }
}

fn themed_page(page: &LayoutPage, content: &ContentPlan) -> Page {
    let copy = content.page_content.get(&page.route);
    let sections = page
        .sections
        .iter()
        .map(|s| {
            let mut out = Section::new(s.id.clone(), s.kind);
            out.title = copy
                .and_then(|c| c.section_labels.get(&s.id).cloned())
                .or_else(|| Some(title_case(&s.id)));
            out.states = Some(SectionStates {
                has_empty: s.has_empty_state,
                has_loading: s.has_loading_state,
                has_error: s.has_error_state,
            });
            match s.kind {
                SectionKind::Grid => {
                    let cols = s.grid_cols.unwrap_or(3);
                    out.grid = Some(GridConfig {
                        cols: Some(cols),
                        gap: Some(DEMO_GRID_GAP),
                        sm_cols: Some(1),
                        md_cols: Some(cols.min(2)),
                        lg_cols: Some(cols),
                    });
                }
                SectionKind::Form => {
                    if let Some(form) = content.forms.get(&s.id) {
                        out.fields = Some(form.fields.clone());
                        out.submit_label = form.submit_label.clone();
                    }
                }
                SectionKind::Table => {
                    out.columns = content.tables.get(&s.id).map(|t| t.columns.clone());
                }
                SectionKind::List => {
                    out.item_count = Some(5);
                    out.content = content.lists.get(&s.id).and_then(|v| v.as_object().cloned());
                }
                _ => {}
            }
            out
        })
        .collect();
    Page {
        route: page.route.clone(),
        meta: PageMeta {
            title: page.title.clone().unwrap_or_default(),
            description: copy.and_then(|c| c.description.clone()),
            icon: Some(page_icon(&page.route).to_string()),
        },
        sections,
    }
}
