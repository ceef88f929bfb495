//! Stage validators.
//!
//! Every stage output passes through a [`Validator`] before the pipeline
//! moves on. The default is [`Permissive`], which accepts anything that
//! deserialized into the stage's type. The strict validators check the
//! structural rules the prompts ask for, and are opt-in.

use std::collections::{BTreeSet, HashSet};

use crate::models::{AppType, ContentPlan, LayoutPlan, Platform, SectionKind, ThemedOutput};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    pub violations: Vec<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    fn push(&mut self, violation: impl Into<String>) {
        self.violations.push(violation.into());
    }
}

pub trait Validator<T>: Send + Sync {
    fn validate(&self, artifact: &T) -> Validation;
}

/// Accepts every artifact. This is the default for all stages.
#[derive(Debug, Default, Clone, Copy)]
pub struct Permissive;

impl<T> Validator<T> for Permissive {
    fn validate(&self, _artifact: &T) -> Validation {
        Validation::ok()
    }
}

/// Structural rules for the layout plan.
#[derive(Debug, Clone)]
pub struct LayoutRules {
    pub app_type: AppType,
    pub platform: Platform,
}

impl Validator<LayoutPlan> for LayoutRules {
    fn validate(&self, plan: &LayoutPlan) -> Validation {
        let mut v = Validation::ok();
        if plan.pages.is_empty() {
            v.push("layout has no pages");
        }
        let mut routes = HashSet::new();
        let mut ids = HashSet::new();
        for page in &plan.pages {
            if !page.route.starts_with('/') {
                v.push(format!("route '{}' must start with '/'", page.route));
            }
            if !routes.insert(page.route.as_str()) {
                v.push(format!("duplicate route '{}'", page.route));
            }
            if page.sections.is_empty() {
                v.push(format!("page '{}' has no sections", page.route));
            }
            for section in &page.sections {
                if section.id.trim().is_empty() {
                    v.push(format!("page '{}' has a section without id", page.route));
                } else if !ids.insert(section.id.as_str()) {
                    v.push(format!("duplicate section id '{}'", section.id));
                }
                if section.kind == SectionKind::Hero && self.app_type != AppType::Marketing {
                    v.push(format!(
                        "section '{}' uses kind=hero but this is a {} app",
                        section.id,
                        self.app_type.as_str()
                    ));
                }
                if let Some(cols) = section.grid_cols {
                    let max = if self.platform == Platform::Mobile { 1 } else { 4 };
                    if cols == 0 || cols > max {
                        v.push(format!(
                            "section '{}' has gridCols={cols}, allowed 1..={max}",
                            section.id
                        ));
                    }
                }
            }
        }
        v
    }
}

/// The content plan may only reference routes and section ids the layout
/// introduced.
#[derive(Debug, Clone)]
pub struct ContentRules {
    routes: BTreeSet<String>,
    section_ids: BTreeSet<String>,
}

impl ContentRules {
    pub fn new(layout: &LayoutPlan) -> Self {
        Self {
            routes: layout.routes().map(str::to_string).collect(),
            section_ids: layout.section_ids().map(str::to_string).collect(),
        }
    }
}

impl Validator<ContentPlan> for ContentRules {
    fn validate(&self, plan: &ContentPlan) -> Validation {
        let mut v = Validation::ok();
        for route in plan.page_content.keys() {
            if !self.routes.contains(route) {
                v.push(format!("pageContent references unknown route '{route}'"));
            }
        }
        for (kind, keys) in [
            ("forms", plan.forms.keys().collect::<Vec<_>>()),
            ("tables", plan.tables.keys().collect()),
            ("lists", plan.lists.keys().collect()),
        ] {
            for id in keys {
                if !self.section_ids.contains(id) {
                    v.push(format!("{kind} references unknown section id '{id}'"));
                }
            }
        }
        for (id, form) in &plan.forms {
            if form.fields.is_empty() {
                v.push(format!("form '{id}' has no fields"));
            }
        }
        v
    }
}

/// A themed spec must mirror the content plan's pages and section ids in
/// order and pick a known palette.
#[derive(Debug, Clone)]
pub struct ThemeRules {
    pages: Vec<(String, Vec<String>)>,
    palettes: Vec<String>,
}

impl ThemeRules {
    pub fn new(content: &ContentPlan, palettes: &[&str]) -> Self {
        Self {
            pages: content
                .layout
                .pages
                .iter()
                .map(|p| (p.route.clone(), p.sections.iter().map(|s| s.id.clone()).collect()))
                .collect(),
            palettes: palettes.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl Validator<ThemedOutput> for ThemeRules {
    fn validate(&self, output: &ThemedOutput) -> Validation {
        let mut v = Validation::ok();
        let routes: Vec<&str> = output.spec.pages.iter().map(|p| p.route.as_str()).collect();
        let expected: Vec<&str> = self.pages.iter().map(|(r, _)| r.as_str()).collect();
        if routes != expected {
            v.push(format!("pages must be exactly {expected:?} in order, got {routes:?}"));
        }
        for page in &output.spec.pages {
            let Some((_, expected_ids)) = self.pages.iter().find(|(r, _)| *r == page.route) else {
                continue;
            };
            let ids: Vec<&str> = page.sections.iter().map(|s| s.id.as_str()).collect();
            if ids != expected_ids.iter().map(String::as_str).collect::<Vec<_>>() {
                v.push(format!(
                    "page '{}' must keep section ids {expected_ids:?}, got {ids:?}",
                    page.route
                ));
            }
        }
        let palette = output
            .palette_name
            .as_deref()
            .or_else(|| output.spec.theme.as_ref().and_then(|t| t.palette_name.as_deref()));
        match palette {
            Some(name) if self.palettes.iter().any(|p| p == name) => {}
            Some(name) => v.push(format!("unknown palette '{name}'")),
            None => v.push("no palette chosen"),
        }
        if output.spec.theme.is_none() {
            v.push("spec.theme is missing");
        }
        v
    }
}
