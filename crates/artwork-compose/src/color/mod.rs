//! Color decisions for print output
//!
//! - RGB to CMYK conversion matching the reference proofs (`convert`)
//! - Ink and garment palette lookup (`palette`)
//! - Per-asset color policy and override plans (`plan`)

mod convert;
mod palette;
mod plan;

pub use convert::{hex_to_cmyk, rgb_to_cmyk};
pub use palette::{Catalogs, Palette, PaletteEntry, SpaceKind};
pub use plan::{ColorId, ColorPlan, DetectedEntry, Operand, OperatorText};

use crate::types::{ColorSpec, ComposeError, DeviceColor, LogoAsset, MimeKind, Result};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Color Values
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB`, `RRGGBB` or `#RGB`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        parse_hex(hex).ok_or_else(|| ComposeError::Config(format!("Invalid hex color: {hex:?}")))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// CMYK in integer percent (0..=100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cmyk {
    pub c: u8,
    pub m: u8,
    pub y: u8,
    pub k: u8,
}

impl Cmyk {
    pub fn new(c: u8, m: u8, y: u8, k: u8) -> Self {
        Self { c, m, y, k }
    }

    /// Naive complement back to RGB, only used for on-screen stand-ins
    pub fn approximate_rgb(&self) -> Rgb {
        let channel = |v: u8| {
            let value = 255.0 * (1.0 - v as f32 / 100.0) * (1.0 - self.k as f32 / 100.0);
            value.round() as u8
        };
        Rgb::new(channel(self.c), channel(self.m), channel(self.y))
    }
}

impl fmt::Display for Cmyk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C:{} M:{} Y:{} K:{}", self.c, self.m, self.y, self.k)
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    let digits = hex.trim().trim_start_matches('#');
    if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    match digits.len() {
        6 => Some(Rgb::new(
            u8::from_str_radix(&digits[0..2], 16).ok()?,
            u8::from_str_radix(&digits[2..4], 16).ok()?,
            u8::from_str_radix(&digits[4..6], 16).ok()?,
        )),
        3 => {
            let expand = |i: usize| u8::from_str_radix(&digits[i..i + 1], 16).ok().map(|v| v * 17);
            Some(Rgb::new(expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}

/// A color as authored in a source asset, quantized for lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceColor {
    Rgb(Rgb),
    Cmyk(Cmyk),
    /// 0 = black, 255 = white
    Gray(u8),
}

impl SourceColor {
    /// Parse a color encoding as found in SVG or PDF sources.
    ///
    /// Accepts hex, `rgb(r, g, b)`, `cmyk(c, m, y, k)`, `device-cmyk(...)`,
    /// `gray(v)` and PDF operator form such as `1 0 0 rg` or `0 1 1 0 K`.
    pub fn parse(encoding: &str) -> Option<Self> {
        let text = encoding.trim();
        if let Some(rgb) = parse_hex(text) {
            return Some(SourceColor::Rgb(rgb));
        }

        let lower = text.to_ascii_lowercase();
        if let Some(args) = function_args(&lower, "rgb") {
            let [r, g, b] = numbers::<3>(args)?;
            return Some(SourceColor::Rgb(Rgb::new(byte(r)?, byte(g)?, byte(b)?)));
        }
        if let Some(args) =
            function_args(&lower, "device-cmyk").or_else(|| function_args(&lower, "cmyk"))
        {
            return parse_cmyk_args(args).map(SourceColor::Cmyk);
        }
        if let Some(args) = function_args(&lower, "gray") {
            let [v] = numbers::<1>(args)?;
            return Some(SourceColor::Gray(fraction_to_byte(v)?));
        }

        parse_pdf_operator(text)
    }

    /// Stable textual form used for hashing
    pub fn normalized(&self) -> String {
        match self {
            SourceColor::Rgb(rgb) => format!("rgb:{},{},{}", rgb.r, rgb.g, rgb.b),
            SourceColor::Cmyk(cmyk) => format!("cmyk:{},{},{},{}", cmyk.c, cmyk.m, cmyk.y, cmyk.k),
            SourceColor::Gray(v) => format!("gray:{v}"),
        }
    }

    /// Quantize PDF `rg` operands (0..1)
    pub fn from_rgb_fractions(r: f32, g: f32, b: f32) -> Option<Self> {
        Some(SourceColor::Rgb(Rgb::new(
            fraction_to_byte(r)?,
            fraction_to_byte(g)?,
            fraction_to_byte(b)?,
        )))
    }

    /// Quantize PDF `k` operands (0..1) to percent
    pub fn from_cmyk_fractions(c: f32, m: f32, y: f32, k: f32) -> Option<Self> {
        Some(SourceColor::Cmyk(Cmyk::new(
            fraction_to_percent(c)?,
            fraction_to_percent(m)?,
            fraction_to_percent(y)?,
            fraction_to_percent(k)?,
        )))
    }

    /// Quantize a PDF `g` operand (0..1)
    pub fn from_gray_fraction(v: f32) -> Option<Self> {
        Some(SourceColor::Gray(fraction_to_byte(v)?))
    }

    /// RGB to draw when a renderer cannot carry CMYK
    pub fn stand_in_rgb(&self) -> Rgb {
        match self {
            SourceColor::Rgb(rgb) => *rgb,
            SourceColor::Cmyk(cmyk) => cmyk.approximate_rgb(),
            SourceColor::Gray(v) => Rgb::new(*v, *v, *v),
        }
    }
}

fn function_args<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    text.strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn numbers<const N: usize>(args: &str) -> Option<[f32; N]> {
    let values: Vec<f32> = args
        .split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.trim_end_matches('%').parse::<f32>().ok())
        .collect::<Option<_>>()?;
    values.try_into().ok()
}

fn parse_cmyk_args(args: &str) -> Option<Cmyk> {
    let values = numbers::<4>(args)?;
    // Fractions when every component is <= 1 and no percent sign is present
    let fractional = !args.contains('%') && values.iter().all(|v| *v <= 1.0);
    let to_percent = |v: f32| {
        if fractional {
            fraction_to_percent(v)
        } else if (0.0..=100.0).contains(&v) {
            Some(v.round() as u8)
        } else {
            None
        }
    };
    Some(Cmyk::new(
        to_percent(values[0])?,
        to_percent(values[1])?,
        to_percent(values[2])?,
        to_percent(values[3])?,
    ))
}

fn parse_pdf_operator(text: &str) -> Option<SourceColor> {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    let operator = tokens.pop()?;
    let operands: Vec<f32> = tokens
        .iter()
        .map(|t| t.parse::<f32>().ok())
        .collect::<Option<_>>()?;
    match (operator, operands.as_slice()) {
        ("rg" | "RG", [r, g, b]) => SourceColor::from_rgb_fractions(*r, *g, *b),
        ("k" | "K", [c, m, y, k]) => SourceColor::from_cmyk_fractions(*c, *m, *y, *k),
        ("g" | "G", [v]) => Some(SourceColor::Gray(fraction_to_byte(*v)?)),
        _ => None,
    }
}

fn byte(value: f32) -> Option<u8> {
    (0.0..=255.0).contains(&value).then(|| value.round() as u8)
}

fn fraction_to_byte(value: f32) -> Option<u8> {
    (0.0..=1.0).contains(&value).then(|| (value * 255.0).round() as u8)
}

fn fraction_to_percent(value: f32) -> Option<u8> {
    (0.0..=1.0).contains(&value).then(|| (value * 100.0).round() as u8)
}

// =============================================================================
// Color Model
// =============================================================================

/// How colors inside an asset are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorPolicy {
    /// Keep CMYK as authored, convert RGB once per distinct color
    PreserveVector,
    /// Leave every pixel alone in its detected color space
    PreserveRaster,
}

/// Color resolution over an injected pair of palettes.
#[derive(Debug, Clone, Copy)]
pub struct ColorModel<'a> {
    catalogs: &'a Catalogs,
}

impl<'a> ColorModel<'a> {
    pub fn new(catalogs: &'a Catalogs) -> Self {
        Self { catalogs }
    }

    pub fn catalogs(&self) -> &'a Catalogs {
        self.catalogs
    }

    pub fn resolve_garment(&self, hex: &str) -> Result<ColorSpec> {
        resolve_in(&self.catalogs.garment, hex)
    }

    pub fn resolve_ink(&self, hex: &str) -> Result<ColorSpec> {
        resolve_in(&self.catalogs.ink, hex)
    }

    pub fn policy_for(kind: MimeKind) -> ColorPolicy {
        match kind {
            MimeKind::VectorSvg | MimeKind::VectorPdf => ColorPolicy::PreserveVector,
            MimeKind::RasterPng | MimeKind::RasterJpeg => ColorPolicy::PreserveRaster,
        }
    }

    /// Build the color plan for one placement of `asset`.
    pub fn plan_for(&self, asset: &LogoAsset, overrides: &BTreeMap<String, String>) -> ColorPlan {
        let policy = Self::policy_for(asset.mime_kind);
        if policy == ColorPolicy::PreserveRaster {
            if !overrides.is_empty() {
                log::warn!(
                    "Ignoring {} color override(s) on raster asset {}",
                    overrides.len(),
                    asset.id
                );
            }
            return ColorPlan::raster(overrides.keys().cloned().collect());
        }

        let mut plan = ColorPlan::vector(&asset.detected_colors);
        for (key, replacement) in overrides {
            let Some(entry) = plan.find_detected(key).cloned() else {
                log::warn!("Color override {key:?} matches no color in asset {}", asset.id);
                plan.mark_unmatched(key);
                continue;
            };
            match self.resolve_replacement(replacement) {
                Some((stand_in, device)) => {
                    if asset.mime_kind == MimeKind::VectorSvg {
                        plan.add_text_override(&entry, stand_in, device);
                    } else if !plan.add_operator_override(&entry, device) {
                        log::warn!("Color override {key:?} is not a PDF color operator in {}", asset.id);
                        plan.mark_unmatched(key);
                    }
                }
                None => {
                    log::warn!("Color override {key:?} has unparseable value {replacement:?}");
                    plan.mark_unmatched(key);
                }
            }
        }
        plan
    }

    /// Replacement colors given as hex go through the ink palette first.
    fn resolve_replacement(&self, replacement: &str) -> Option<(Rgb, DeviceColor)> {
        let source = SourceColor::parse(replacement)?;
        let device = match source {
            SourceColor::Rgb(rgb) => self
                .resolve_ink(&rgb.to_hex())
                .map(|spec| spec.value)
                .unwrap_or(DeviceColor::Cmyk(rgb_to_cmyk(rgb))),
            SourceColor::Cmyk(cmyk) => DeviceColor::Cmyk(cmyk),
            SourceColor::Gray(v) => {
                let k = ((1.0 - v as f32 / 255.0) * 100.0).round() as u8;
                DeviceColor::Cmyk(Cmyk::new(0, 0, 0, k))
            }
        };
        Some((source.stand_in_rgb(), device))
    }
}

fn resolve_in(palette: &Palette, hex: &str) -> Result<ColorSpec> {
    if let Some(entry) = palette.find_by_hex(hex) {
        return Ok(ColorSpec {
            value: DeviceColor::Cmyk(entry.cmyk),
            source_name: Some(entry.name.clone()),
        });
    }
    let rgb = Rgb::from_hex(hex)?;
    Ok(ColorSpec {
        value: DeviceColor::Cmyk(rgb_to_cmyk(rgb)),
        source_name: None,
    })
}
