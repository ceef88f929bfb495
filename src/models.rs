use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::collections::BTreeMap;

use crate::metadata::GenerationMetadata;

pub const SCHEMA_VERSION: &str = "1.0.0";
pub const MAX_PROMPT_CHARS: usize = 2000;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), options: Map::new() }
    }

    pub fn with_option(mut self, key: &str, value: Value) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerateResponse {
    pub spec: UiSpec,
    pub meta: GenerationMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Hero,
    Grid,
    Card,
    List,
    Form,
    Table,
    Nav,
    Footer,
    Modal,
}

impl SectionKind {
    pub const ALL: [SectionKind; 9] = [
        SectionKind::Hero,
        SectionKind::Grid,
        SectionKind::Card,
        SectionKind::List,
        SectionKind::Form,
        SectionKind::Table,
        SectionKind::Nav,
        SectionKind::Footer,
        SectionKind::Modal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Hero => "hero",
            SectionKind::Grid => "grid",
            SectionKind::Card => "card",
            SectionKind::List => "list",
            SectionKind::Form => "form",
            SectionKind::Table => "table",
            SectionKind::Nav => "nav",
            SectionKind::Footer => "footer",
            SectionKind::Modal => "modal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppType {
    Marketing,
    Dashboard,
    Crud,
    AuthHeavy,
}

impl AppType {
    pub fn as_str(self) -> &'static str {
        match self {
            AppType::Marketing => "marketing",
            AppType::Dashboard => "dashboard",
            AppType::Crud => "crud",
            AppType::AuthHeavy => "auth-heavy",
        }
    }

    pub fn parse(raw: &str) -> Option<AppType> {
        match raw.trim() {
            "marketing" => Some(AppType::Marketing),
            "dashboard" => Some(AppType::Dashboard),
            "crud" => Some(AppType::Crud),
            "auth-heavy" => Some(AppType::AuthHeavy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Web,
    Mobile,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Web => "web",
            Platform::Mobile => "mobile",
        }
    }
}

// --- Layout stage ---

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPlan {
    #[serde(default)]
    pub pages: Vec<LayoutPage>,
    #[serde(default)]
    pub nav_items: Vec<String>,
    #[serde(default)]
    pub required_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LayoutPlan {
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|p| p.route.as_str())
    }

    pub fn section_ids(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flat_map(|p| p.sections.iter().map(|s| s.id.as_str()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPage {
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub sections: Vec<LayoutSection>,
}

#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSection {
    pub id: String,
    pub kind: SectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_cols: Option<u32>,
    #[serde(default)]
    pub has_empty_state: bool,
    #[serde(default)]
    pub has_loading_state: bool,
    #[serde(default)]
    pub has_error_state: bool,
}

// --- Content stage ---

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentPlan {
    /// Carried forward from the layout stage; never taken from the oracle.
    #[serde(default)]
    pub layout: LayoutPlan,
    #[serde(default)]
    pub page_content: BTreeMap<String, PageContent>,
    #[serde(default)]
    pub forms: BTreeMap<String, FormContent>,
    #[serde(default)]
    pub tables: BTreeMap<String, TableContent>,
    #[serde(default)]
    pub lists: BTreeMap<String, Value>,
    #[serde(default)]
    pub cta_targets: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_secondary: Option<String>,
    #[serde(default)]
    pub section_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub states: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormContent {
    #[serde(default)]
    pub fields: Vec<FormField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_text: Option<String>,
}

fn default_field_type() -> String {
    "text".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableContent {
    #[serde(default)]
    pub columns: Vec<TableColumn>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub column_type: String,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
}

// --- Theme stage / final artifact ---

/// Raw oracle output of the theme stage.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThemedOutput {
    pub spec: UiSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_scale_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing_scale_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrast_check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UiSpec {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub meta: SpecMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub states: Map<String, Value>,
}

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpecMeta {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_scale_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing_scale_name: Option<String>,
    #[serde(default)]
    pub colors: ThemeColors,
    #[serde(default)]
    pub typography: Typography,
    #[serde(default)]
    pub spacing: SpacingTokens,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadows: Option<Shadows>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ThemeColors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_size: Option<FontSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h1: Option<FontSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h2: Option<FontSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h3: Option<FontSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h4: Option<FontSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<FontSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub small: Option<FontSize>,
}

/// Font sizes arrive as numbers, CSS strings (`"48px"`, `"2rem"`) or objects
/// such as `{"size": 48}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum FontSize {
    Px(f64),
    Css(String),
    Nested(Map<String, Value>),
}

impl FontSize {
    pub fn px(&self) -> Option<f64> {
        match self {
            FontSize::Px(v) => Some(*v),
            FontSize::Css(s) => css_length_px(s),
            FontSize::Nested(map) => ["size", "value", "px", "point", "pt"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(|v| match v {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => css_length_px(s),
                    _ => None,
                }),
        }
    }
}

/// `"18"`, `"18px"` → 18; `"2rem"`/`"2em"` → 32 (16px root).
fn css_length_px(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let value: f64 = number.parse().ok()?;
    match unit.trim() {
        "" | "px" | "pt" => Some(value),
        "rem" | "em" => Some(value * 16.0),
        _ => None,
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SpacingTokens {
    #[serde(default)]
    pub scale: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Shadows {
    Count(f64),
    Styles(Vec<Value>),
    Named(Map<String, Value>),
}

impl Shadows {
    pub fn style_count(&self) -> f64 {
        match self {
            Shadows::Count(n) => *n,
            Shadows::Styles(list) => list.len() as f64,
            Shadows::Named(map) => map.len() as f64,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub route: String,
    #[serde(default)]
    pub meta: PageMeta,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PageMeta {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub kind: SectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FormField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<TableColumn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<SectionStates>,
    /// Keys the renderer understands but the pipeline does not touch.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Section {
    pub fn new(id: impl Into<String>, kind: SectionKind) -> Self {
        Section {
            id: id.into(),
            kind,
            title: None,
            description: None,
            grid: None,
            fields: None,
            submit_label: None,
            columns: None,
            item_count: None,
            content: None,
            states: None,
            extra: Map::new(),
        }
    }
}

#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<f64>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sm_cols: Option<u32>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md_cols: Option<u32>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lg_cols: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionStates {
    #[serde(default)]
    pub has_empty: bool,
    #[serde(default)]
    pub has_loading: bool,
    #[serde(default)]
    pub has_error: bool,
}

// --- Candidates ---

/// The token sets a candidate settled on.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenNames {
    pub palette: String,
    pub type_scale: String,
    pub spacing_scale: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThemeCandidate {
    pub index: usize,
    pub spec: UiSpec,
    pub tokens: TokenNames,
}

impl ThemeCandidate {
    /// Token names come from the top-level answer first, then from the theme
    /// block, then from `fallback`.
    pub fn from_output(index: usize, output: ThemedOutput, fallback: &TokenNames) -> Self {
        let theme = output.spec.theme.as_ref();
        let pick = |top: Option<String>, nested: Option<&String>, default: &str| {
            top.filter(|s| !s.trim().is_empty())
                .or_else(|| nested.filter(|s| !s.trim().is_empty()).cloned())
                .unwrap_or_else(|| default.to_string())
        };
        let tokens = TokenNames {
            palette: pick(
                output.palette_name,
                theme.and_then(|t| t.palette_name.as_ref()),
                &fallback.palette,
            ),
            type_scale: pick(
                output.type_scale_name,
                theme.and_then(|t| t.type_scale_name.as_ref()),
                &fallback.type_scale,
            ),
            spacing_scale: pick(
                output.spacing_scale_name,
                theme.and_then(|t| t.spacing_scale_name.as_ref()),
                &fallback.spacing_scale,
            ),
        };
        Self { index, spec: output.spec, tokens }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: ThemeCandidate,
    pub score: u8,
    pub violations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn font_sizes_accept_numbers_css_and_objects() {
        let sizes: Vec<FontSize> =
            serde_json::from_value(json!([48, "36px", "2rem", {"size": "20px"}, "large"])).unwrap();
        let px: Vec<Option<f64>> = sizes.iter().map(FontSize::px).collect();
        assert_eq!(px, vec![Some(48.0), Some(36.0), Some(32.0), Some(20.0), None]);
    }

    #[test]
    fn grid_columns_accept_numeric_strings() {
        let grid: GridConfig =
            serde_json::from_value(json!({"cols": "3", "smCols": 1, "gap": 20})).unwrap();
        assert_eq!(grid.cols, Some(3));
        assert_eq!(grid.sm_cols, Some(1));
        assert_eq!(grid.gap, Some(20.0));
    }

    #[test]
    fn sections_keep_unknown_keys() {
        let section: Section = serde_json::from_value(json!({
            "id": "hero-1",
            "kind": "hero",
            "pattern": "Hero-Center",
        }))
        .unwrap();
        assert_eq!(section.extra.get("pattern"), Some(&json!("Hero-Center")));
        let back = serde_json::to_value(&section).unwrap();
        assert_eq!(back["pattern"], json!("Hero-Center"));
    }

    #[test]
    fn unknown_section_kind_is_rejected() {
        let result: Result<Section, _> =
            serde_json::from_value(json!({"id": "x", "kind": "carousel"}));
        assert!(result.is_err());
    }

    #[test]
    fn shadows_count_styles() {
        let shadows: Vec<Shadows> =
            serde_json::from_value(json!([2, ["sm", "md", "lg"], {"card": "0 1px 2px"}])).unwrap();
        let counts: Vec<f64> = shadows.iter().map(Shadows::style_count).collect();
        assert_eq!(counts, vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn spec_defaults_fill_missing_blocks() {
        let spec: UiSpec = serde_json::from_value(json!({"pages": []})).unwrap();
        assert_eq!(spec.version, SCHEMA_VERSION);
        assert!(spec.theme.is_none());
    }

    #[test]
    fn candidate_token_names_fall_back_in_order() {
        let output: ThemedOutput = serde_json::from_value(json!({
            "spec": {"theme": {"paletteName": "pine", "typeScaleName": "dashboard"}},
            "paletteName": "sky",
            "typeScaleName": "  "
        }))
        .unwrap();
        let fallback = TokenNames {
            palette: "slate".into(),
            type_scale: "modern".into(),
            spacing_scale: "relaxed".into(),
        };
        let candidate = ThemeCandidate::from_output(2, output, &fallback);
        assert_eq!(candidate.index, 2);
        assert_eq!(
            candidate.tokens,
            TokenNames {
                palette: "sky".into(),
                type_scale: "dashboard".into(),
                spacing_scale: "relaxed".into(),
            }
        );
    }
}
