//! Commentary styles: parsing of `name[:size[:color]]` specs and the validated
//! source → style table built from them once per run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LogSink;

pub const DEFAULT_COLOR: &str = "#000000";

/// Non-fatal problem in one component of a commentary spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecParseError {
    #[error("invalid font size '{value}' in commentary spec '{spec}', using default")]
    InvalidSize { spec: String, value: String },

    #[error("invalid color '{value}' in commentary spec '{spec}', using default")]
    InvalidColor { spec: String, value: String },
}

/// One parsed commentary spec. Absent fields fall back to run defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSpec {
    pub source_name: String,
    pub size_hint: Option<u32>,
    pub color: Option<String>,
}

/// Parses `name[:fontSize[:color]]`.
///
/// An unparsable size or color is logged and dropped. A color gains a leading `#` if
/// missing and must then be 3, 4, 6 or 8 hex digits. Components past the third are ignored.
pub fn parse_commentary_spec(spec: &str, log: &dyn LogSink) -> StyleSpec {
    let mut parts = spec.split(':');
    let source_name = parts.next().unwrap_or_default().trim().to_string();

    let size_hint = match parts.next().map(str::trim) {
        Some(raw) if !raw.is_empty() => match parse_size(spec, raw) {
            Ok(size) => Some(size),
            Err(e) => {
                log.warn(&e.to_string());
                None
            }
        },
        _ => None,
    };

    let color = match parts.next().map(str::trim) {
        Some(raw) if !raw.is_empty() => match parse_color(spec, raw) {
            Ok(color) => Some(color),
            Err(e) => {
                log.warn(&e.to_string());
                None
            }
        },
        _ => None,
    };

    StyleSpec {
        source_name,
        size_hint,
        color,
    }
}

fn parse_size(spec: &str, raw: &str) -> Result<u32, SpecParseError> {
    raw.parse::<u32>().map_err(|_| SpecParseError::InvalidSize {
        spec: spec.to_string(),
        value: raw.to_string(),
    })
}

fn parse_color(spec: &str, raw: &str) -> Result<String, SpecParseError> {
    let color = if raw.starts_with('#') {
        raw.to_string()
    } else {
        format!("#{raw}")
    };
    if is_hex_color(&color) {
        Ok(color)
    } else {
        Err(SpecParseError::InvalidColor {
            spec: spec.to_string(),
            value: raw.to_string(),
        })
    }
}

/// `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
pub fn is_hex_color(color: &str) -> bool {
    color.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 4 | 6 | 8) && hex.bytes().all(|b| b.is_ascii_hexdigit())
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Style table
// ────────────────────────────────────────────────────────────────────────────

/// Concrete style of one commentary source after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStyle {
    pub font_size: u32,
    pub color: String,
}

/// Commentary source → style, plus the source priority order.
///
/// Lookups for sources missing from the table return the default style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleTable {
    order: Vec<String>,
    styles: HashMap<String, ResolvedStyle>,
    default_style: ResolvedStyle,
}

impl StyleTable {
    /// Builds the table from parsed specs. Sizes default to `base_font_size - 2`,
    /// colors to black. A repeated source keeps its first position and last style.
    pub fn from_specs(specs: &[StyleSpec], base_font_size: u32) -> Self {
        let default_style = ResolvedStyle {
            font_size: base_font_size.saturating_sub(2).max(1),
            color: DEFAULT_COLOR.to_string(),
        };

        let mut order = Vec::with_capacity(specs.len());
        let mut styles = HashMap::with_capacity(specs.len());
        for spec in specs.iter().filter(|s| !s.source_name.is_empty()) {
            if !styles.contains_key(&spec.source_name) {
                order.push(spec.source_name.clone());
            }
            styles.insert(
                spec.source_name.clone(),
                ResolvedStyle {
                    font_size: spec
                        .size_hint
                        .filter(|size| *size > 0)
                        .unwrap_or(default_style.font_size),
                    color: spec
                        .color
                        .clone()
                        .filter(|color| is_hex_color(color))
                        .unwrap_or_else(|| default_style.color.clone()),
                },
            );
        }

        Self {
            order,
            styles,
            default_style,
        }
    }

    /// Parses raw spec strings and builds the table in one step.
    pub fn parse(raw_specs: &[String], base_font_size: u32, log: &dyn LogSink) -> Self {
        let specs: Vec<StyleSpec> = raw_specs
            .iter()
            .map(|raw| parse_commentary_spec(raw, log))
            .collect();
        Self::from_specs(&specs, base_font_size)
    }

    /// Source names in caller priority order.
    pub fn source_order(&self) -> &[String] {
        &self.order
    }

    /// Style registered for `source_name`, if any.
    pub fn get(&self, source_name: &str) -> Option<&ResolvedStyle> {
        self.styles.get(source_name)
    }

    /// Style for `source_name`, falling back to the default for unknown sources.
    pub fn style_for(&self, source_name: &str) -> &ResolvedStyle {
        self.get(source_name).unwrap_or(&self.default_style)
    }

    pub fn default_style(&self) -> &ResolvedStyle {
        &self.default_style
    }

    /// Registered sources with their styles, in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedStyle)> {
        self.order
            .iter()
            .filter_map(|name| self.styles.get(name).map(|style| (name.as_str(), style)))
    }
}

/// Human-readable source name.
///
/// `Rashi_on_Berakhot` → `Rashi`, `Tosafot_Yeshanim` → `Tosafot Yeshanim`.
pub fn display_name(source_name: &str) -> String {
    let base = source_name
        .split_once("_on_")
        .map_or(source_name, |(head, _)| head);
    base.replace('_', " ")
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
