//! Design priors: the curated palettes, scales, patterns and icons the
//! generator is allowed to choose from, plus the keyword heuristics used to
//! infer what kind of app a prompt describes.
//!
//! The tables are plain data owned by a [`DesignPriors`] value that is
//! injected into the pipeline, the scorer and the post-processor, so tests
//! can swap in their own fixtures.

use serde::Serialize;

use crate::models::{AppType, Platform};

pub const PRIORS_VERSION: &str = "1.0.0";
pub const FALLBACK_ICON: &str = "Circle";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaletteColors {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub foreground: String,
    pub muted: String,
    pub border: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Palette {
    pub name: String,
    pub mood: String,
    pub light: PaletteColors,
    pub dark: PaletteColors,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypeScale {
    pub name: String,
    pub base_size: u32,
    pub scale_ratio: f64,
    pub h1: u32,
    pub h2: u32,
    pub h3: u32,
    pub h4: u32,
    pub body: u32,
    pub small: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpacingScale {
    pub name: String,
    pub unit: u32,
    pub steps: Vec<f64>,
}

/// Starting choices for an inferred app type.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    pub patterns: Vec<String>,
    pub palette: String,
    pub type_scale: String,
    pub spacing_scale: String,
}

#[derive(Debug, Clone)]
pub struct DesignPriors {
    pub version: String,
    pub palettes: Vec<Palette>,
    pub type_scales: Vec<TypeScale>,
    pub spacing_scales: Vec<SpacingScale>,
    pub patterns: Vec<String>,
    pub known_icons: Vec<String>,
    pub fallback_icon: String,
}

impl Default for DesignPriors {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DesignPriors {
    pub fn builtin() -> Self {
        Self {
            version: PRIORS_VERSION.to_string(),
            palettes: vec![
                palette(
                    "slate",
                    "professional, neutral, modern",
                    ["#0f172a", "#475569", "#3b82f6", "#ffffff", "#0f172a", "#f1f5f9", "#e2e8f0"],
                    ["#f8fafc", "#cbd5e1", "#60a5fa", "#0f172a", "#f8fafc", "#1e293b", "#334155"],
                ),
                palette(
                    "pine",
                    "natural, calm, trustworthy",
                    ["#064e3b", "#059669", "#10b981", "#ffffff", "#064e3b", "#d1fae5", "#a7f3d0"],
                    ["#d1fae5", "#6ee7b7", "#34d399", "#064e3b", "#d1fae5", "#065f46", "#047857"],
                ),
                palette(
                    "sky",
                    "open, friendly, tech",
                    ["#0c4a6e", "#0284c7", "#0ea5e9", "#ffffff", "#0c4a6e", "#e0f2fe", "#bae6fd"],
                    ["#e0f2fe", "#7dd3fc", "#38bdf8", "#0c4a6e", "#e0f2fe", "#075985", "#0369a1"],
                ),
                palette(
                    "plum",
                    "creative, bold, premium",
                    ["#581c87", "#9333ea", "#a855f7", "#ffffff", "#581c87", "#f3e8ff", "#e9d5ff"],
                    ["#f3e8ff", "#d8b4fe", "#c084fc", "#581c87", "#f3e8ff", "#6b21a8", "#7e22ce"],
                ),
                palette(
                    "sand",
                    "warm, earthy, approachable",
                    ["#78350f", "#d97706", "#f59e0b", "#ffffff", "#78350f", "#fef3c7", "#fde68a"],
                    ["#fef3c7", "#fcd34d", "#fbbf24", "#78350f", "#fef3c7", "#92400e", "#b45309"],
                ),
            ],
            type_scales: vec![
                type_scale("modern", 16, 1.25, [48, 36, 28, 20, 16, 14]),
                type_scale("dashboard", 14, 1.2, [32, 24, 20, 16, 14, 12]),
                type_scale("marketing", 18, 1.33, [64, 48, 36, 24, 18, 16]),
            ],
            spacing_scales: vec![
                SpacingScale {
                    name: "compact".into(),
                    unit: 4,
                    steps: vec![4.0, 8.0, 12.0, 16.0, 24.0, 32.0],
                },
                SpacingScale {
                    name: "relaxed".into(),
                    unit: 4,
                    steps: vec![4.0, 8.0, 16.0, 24.0, 32.0, 48.0],
                },
            ],
            patterns: [
                "Hero-Left",
                "Hero-Center",
                "Feature-3up",
                "Stats-4up",
                "List-Detail",
                "Settings-Sections",
                "Auth-Card",
                "Table-With-Filters",
                "Empty-State",
                "Loading-Skeleton",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            known_icons: [
                "Home", "Search", "User", "Settings", "ShoppingCart", "Bell", "Heart", "Star",
                "Menu", "X", "ChevronLeft", "ChevronRight", "Plus", "Minus", "Check",
                "AlertCircle", "Info", "Mail", "Phone", "Calendar", "Clock", "MapPin", "Camera",
                "Image", "File", "Folder", "Edit", "Trash", "Download", "Upload", "Share", "Send",
                "MessageCircle", "Users", "TrendingUp", "BarChart", "PieChart", "Activity", "Zap",
                "Shield", "Lock", "Unlock", "Eye", "EyeOff",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fallback_icon: FALLBACK_ICON.to_string(),
        }
    }

    pub fn palette(&self, name: &str) -> Option<&Palette> {
        self.palettes.iter().find(|p| p.name == name)
    }

    pub fn type_scale(&self, name: &str) -> Option<&TypeScale> {
        self.type_scales.iter().find(|t| t.name == name)
    }

    pub fn spacing_scale(&self, name: &str) -> Option<&SpacingScale> {
        self.spacing_scales.iter().find(|s| s.name == name)
    }

    pub fn palette_names(&self) -> Vec<&str> {
        self.palettes.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn type_scale_names(&self) -> Vec<&str> {
        self.type_scales.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn spacing_scale_names(&self) -> Vec<&str> {
        self.spacing_scales.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn is_known_icon(&self, icon: &str) -> bool {
        self.known_icons.iter().any(|known| known == icon)
    }

    pub fn defaults_for(&self, app_type: AppType) -> Defaults {
        let (patterns, palette, type_scale, spacing) = match app_type {
            AppType::Marketing => (
                &["Hero-Center", "Feature-3up", "Stats-4up"][..],
                "sky",
                "marketing",
                "relaxed",
            ),
            AppType::Dashboard => (
                &["Stats-4up", "Table-With-Filters", "Empty-State"][..],
                "slate",
                "dashboard",
                "compact",
            ),
            AppType::Crud => (
                &["List-Detail", "Table-With-Filters", "Empty-State", "Loading-Skeleton"][..],
                "slate",
                "modern",
                "relaxed",
            ),
            AppType::AuthHeavy => (&["Auth-Card", "Settings-Sections"][..], "plum", "modern", "relaxed"),
        };
        Defaults {
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            palette: palette.to_string(),
            type_scale: type_scale.to_string(),
            spacing_scale: spacing.to_string(),
        }
    }
}

fn palette(name: &str, mood: &str, light: [&str; 7], dark: [&str; 7]) -> Palette {
    fn colors(c: [&str; 7]) -> PaletteColors {
        PaletteColors {
            primary: c[0].into(),
            secondary: c[1].into(),
            accent: c[2].into(),
            background: c[3].into(),
            foreground: c[4].into(),
            muted: c[5].into(),
            border: c[6].into(),
        }
    }
    Palette {
        name: name.into(),
        mood: mood.into(),
        light: colors(light),
        dark: colors(dark),
    }
}

fn type_scale(name: &str, base_size: u32, scale_ratio: f64, sizes: [u32; 6]) -> TypeScale {
    let [h1, h2, h3, h4, body, small] = sizes;
    TypeScale { name: name.into(), base_size, scale_ratio, h1, h2, h3, h4, body, small }
}

// --- Intent inference ---

const FUNCTIONAL_INDICATORS: &[&str] = &[
    "todo", "task", "chat", "message", "tracker", "organizer", "dashboard", "admin",
    "management", "inventory", "crm", "cms", "calendar", "contacts", "notes", "shopping cart",
];

const DASHBOARD_INDICATORS: &[&str] = &["dashboard", "admin"];

const MARKETING_EXPLICIT: &[&str] = &[
    "landing page", "marketing page", "marketing site", "product page", "promo page", "promotional",
];

const DASHBOARD_TERMS: &[&str] = &["dashboard", "analytics", "admin panel", "metrics", "monitoring"];

const MARKETING_KEYWORDS: &[&str] = &[
    "landing page", "marketing page", "product page", "marketing site", "startup website",
    "agency site", "portfolio site", "showcase site", "promo page", "promotional site",
];

const DASHBOARD_KEYWORDS: &[&str] = &[
    "dashboard", "analytics dashboard", "admin panel", "admin dashboard", "metrics dashboard",
    "charts", "reports", "monitoring", "stats dashboard", "insights", "overview dashboard",
];

const CRUD_KEYWORDS: &[&str] = &[
    "todo app", "todo list", "task manager", "task app", "note app", "note taking", "tracker app",
    "organizer app", "management app", "management system", "management tool", "chat app",
    "messaging app", "message board", "calendar app", "contacts app", "shopping app",
    "inventory system", "crm", "cms",
];

const AUTH_KEYWORDS: &[&str] = &[
    "login page", "signup page", "authentication", "register page", "account page",
    "user profile", "settings page", "onboarding flow", "wizard",
];

const MOBILE_EXPLICIT: &[&str] = &[
    "mobile app", "ios app", "android app", "phone app", "smartphone", "iphone app",
    "mobile application",
];

const MOBILE_WEAK: &[&str] = &["mobile", "ios", "android", "iphone"];

const WEB_INDICATORS: &[&str] = &["website", "web app", "landing", "saas", "dashboard", "portal"];

fn hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| text.contains(*k)).count()
}

/// Functional wording wins over marketing wording; anything ambiguous is crud.
pub fn infer_app_type(prompt: &str) -> AppType {
    let text = prompt.to_lowercase();

    if let Some(indicator) = FUNCTIONAL_INDICATORS.iter().find(|i| text.contains(*i)) {
        return if DASHBOARD_INDICATORS.contains(indicator) {
            AppType::Dashboard
        } else {
            AppType::Crud
        };
    }
    if hits(&text, MARKETING_EXPLICIT) > 0 {
        return AppType::Marketing;
    }
    if hits(&text, DASHBOARD_TERMS) > 0 {
        return AppType::Dashboard;
    }
    let auth = hits(&text, AUTH_KEYWORDS);
    if auth >= 2 {
        return AppType::AuthHeavy;
    }

    let marketing = hits(&text, MARKETING_KEYWORDS);
    let crud = hits(&text, CRUD_KEYWORDS);
    if marketing > 0 && marketing > crud {
        return AppType::Marketing;
    }
    let dashboard = hits(&text, DASHBOARD_KEYWORDS);
    // Ties resolve in table order: marketing, dashboard, crud, auth-heavy.
    let scored = [
        (AppType::Marketing, marketing),
        (AppType::Dashboard, dashboard),
        (AppType::Crud, crud),
        (AppType::AuthHeavy, auth),
    ];
    let best = scored.iter().map(|(_, n)| *n).max().unwrap_or(0);
    if best == 0 {
        return AppType::Crud;
    }
    scored
        .iter()
        .find(|(_, n)| *n == best)
        .map(|(t, _)| *t)
        .unwrap_or(AppType::Crud)
}

pub fn infer_platform(prompt: &str) -> Platform {
    let text = prompt.to_lowercase();
    if hits(&text, MOBILE_EXPLICIT) > 0 {
        return Platform::Mobile;
    }
    if hits(&text, MOBILE_WEAK) > 0 && hits(&text, WEB_INDICATORS) == 0 {
        return Platform::Mobile;
    }
    Platform::Web
}
