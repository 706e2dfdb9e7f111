//! Built-in print templates
//!
//! Every print group offers the same three sheet sizes. The editor canvas
//! for a template is laid out at a fixed two pixels per millimetre.

use crate::types::Template;

/// Editor canvas pixels per physical millimetre
pub const CANVAS_PX_PER_MM: f32 = 2.0;

/// Print groups with a template set, in catalog order
pub const PRINT_GROUPS: &[&str] = &[
    "dtf",
    "uv-dtf",
    "fotl",
    "sublimation",
    "vinyl",
    "vinyl-flock",
    "soft-shell",
    "reflective",
    "hi-viz",
    "glitter",
    "metallic",
    "holographic",
    "glow-in-dark",
    "puff",
    "foil",
    "photographic",
    "embroidery-badges",
    "applique-badges",
    "laser-cut-badges",
    "woven-badges",
];

/// (label, width_mm, height_mm), portrait
const SHEET_SIZES: [(&str, f32, f32); 3] = [("A3", 297.0, 420.0), ("A4", 210.0, 297.0), ("A5", 148.0, 210.0)];

/// A template for `group` at the given sheet size
pub fn template(group: &str, label: &str, width_mm: f32, height_mm: f32) -> Template {
    Template {
        id: format!("{}-{}", group, label),
        name: format!("{} {}", display_group(group), label),
        width_mm,
        height_mm,
        pixel_width: width_mm * CANVAS_PX_PER_MM,
        pixel_height: height_mm * CANVAS_PX_PER_MM,
        group: group.to_string(),
    }
}

/// All templates, grouped, largest sheet first
pub fn builtin_templates() -> Vec<Template> {
    PRINT_GROUPS
        .iter()
        .flat_map(|group| {
            SHEET_SIZES
                .iter()
                .map(move |(label, w, h)| template(group, label, *w, *h))
        })
        .collect()
}

/// Look up a built-in template by id, ignoring case
pub fn find_template(id: &str) -> Option<Template> {
    builtin_templates()
        .into_iter()
        .find(|t| t.id.eq_ignore_ascii_case(id))
}

fn display_group(group: &str) -> String {
    match group {
        "dtf" => "DTF".to_string(),
        "uv-dtf" => "UV DTF".to_string(),
        "fotl" => "Fruit of the Loom".to_string(),
        other => other
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}
