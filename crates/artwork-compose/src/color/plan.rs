//! Per-placement color plan

use super::{rgb_to_cmyk, ColorPolicy, Rgb, SourceColor};
use crate::types::{DetectedColor, DeviceColor};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// Stable identifier of a detected color, usable as an override key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColorId(String);

impl ColorId {
    /// Hex digits kept from the digest
    const LEN: usize = 12;

    fn derive(source: &SourceColor, first_seen: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.normalized().as_bytes());
        hasher.update(b":");
        hasher.update(first_seen.to_string().as_bytes());
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        ColorId(format!("c-{}", &hex[..Self::LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed detected color
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedEntry {
    pub id: ColorId,
    pub encoding: String,
    pub source: SourceColor,
}

/// One numeric operand of a PDF color operator, kept as written
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Integer(i64),
    Real(f32),
}

impl Operand {
    fn parse(token: &str) -> Option<Self> {
        if token.contains('.') {
            token.parse::<f32>().ok().map(Operand::Real)
        } else {
            token.parse::<i64>().ok().map(Operand::Integer)
        }
    }

    pub fn value(&self) -> f32 {
        match self {
            Operand::Integer(i) => *i as f32,
            Operand::Real(r) => *r,
        }
    }

    /// Integers only equal integers and reals only reals, so `1` and
    /// `1.0` are different spellings.
    fn same_as(&self, other: &Operand) -> bool {
        match (self, other) {
            (Operand::Integer(a), Operand::Integer(b)) => a == b,
            (Operand::Real(a), Operand::Real(b)) => (a - b).abs() <= f32::EPSILON * a.abs().max(1.0),
            _ => false,
        }
    }
}

/// A PDF color operator spelled the way an override key names it
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorText {
    operator: String,
    operands: Vec<Operand>,
}

impl OperatorText {
    const COLOR_OPERATORS: [&'static str; 10] =
        ["rg", "RG", "k", "K", "g", "G", "sc", "SC", "scn", "SCN"];

    pub fn parse(encoding: &str) -> Option<Self> {
        let mut tokens: Vec<&str> = encoding.split_whitespace().collect();
        let operator = tokens.pop()?;
        if !Self::COLOR_OPERATORS.contains(&operator) {
            return None;
        }
        let operands = tokens
            .into_iter()
            .map(Operand::parse)
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            operator: operator.to_string(),
            operands,
        })
    }

    /// Same operator and the same operand tokens. Whitespace between
    /// tokens is not significant in a content stream.
    pub fn matches(&self, operator: &str, operands: &[Operand]) -> bool {
        self.operator == operator
            && self.operands.len() == operands.len()
            && self.operands.iter().zip(operands).all(|(a, b)| a.same_as(b))
    }
}

/// What to do with every color an asset draws with.
///
/// Built once per placement by [`super::ColorModel::plan_for`] and then
/// consulted while the asset's content is rewritten. Overrides only hit
/// the exact encoding they were keyed by: PDF operators are compared by
/// their tokens, SVG encodings are swapped for a stand-in RGB that no
/// detected color uses.
#[derive(Debug, Clone)]
pub struct ColorPlan {
    policy: ColorPolicy,
    detected: Vec<DetectedEntry>,
    operator_overrides: Vec<(OperatorText, DeviceColor)>,
    stand_ins: HashMap<Rgb, DeviceColor>,
    /// Encoding in the source text mapped to the RGB drawn in its place
    text_replacements: Vec<(String, Rgb)>,
    converted: HashMap<Rgb, DeviceColor>,
    unmatched: Vec<String>,
}

impl ColorPlan {
    fn empty(policy: ColorPolicy) -> Self {
        Self {
            policy,
            detected: Vec::new(),
            operator_overrides: Vec::new(),
            stand_ins: HashMap::new(),
            text_replacements: Vec::new(),
            converted: HashMap::new(),
            unmatched: Vec::new(),
        }
    }

    /// Pass-through plan for raster assets
    pub(crate) fn raster(ignored_overrides: Vec<String>) -> Self {
        Self {
            unmatched: ignored_overrides,
            ..Self::empty(ColorPolicy::PreserveRaster)
        }
    }

    pub(crate) fn vector(detected_colors: &[DetectedColor]) -> Self {
        let mut plan = Self::empty(ColorPolicy::PreserveVector);
        let mut first_seen: HashMap<SourceColor, usize> = HashMap::new();
        for (index, color) in detected_colors.iter().enumerate() {
            let Some(source) = SourceColor::parse(&color.encoding) else {
                log::debug!("Skipping unparseable color encoding {:?}", color.encoding);
                continue;
            };
            let seen = *first_seen.entry(source).or_insert(index);
            plan.detected.push(DetectedEntry {
                id: ColorId::derive(&source, seen),
                encoding: color.encoding.clone(),
                source,
            });
        }
        plan
    }

    pub(crate) fn find_detected(&self, key: &str) -> Option<&DetectedEntry> {
        self.detected
            .iter()
            .find(|entry| entry.encoding == key || entry.id.as_str() == key)
    }

    /// Override a PDF color operator. `false` when the detected encoding is
    /// not in operator form and so can never appear in a content stream.
    pub(crate) fn add_operator_override(&mut self, entry: &DetectedEntry, device: DeviceColor) -> bool {
        match OperatorText::parse(&entry.encoding) {
            Some(text) => {
                self.operator_overrides.push((text, device));
                true
            }
            None => false,
        }
    }

    /// Override an encoding in SVG text. Tools that only speak RGB draw the
    /// stand-in, which maps back to `device` once their output is recolored.
    pub(crate) fn add_text_override(&mut self, entry: &DetectedEntry, preferred: Rgb, device: DeviceColor) {
        let stand_in = self.unique_stand_in(preferred);
        self.stand_ins.insert(stand_in, device);
        self.text_replacements.push((entry.encoding.clone(), stand_in));
    }

    /// `preferred`, or the nearest RGB after it that no detected color and
    /// no other stand-in already draws with
    fn unique_stand_in(&self, preferred: Rgb) -> Rgb {
        let taken = |rgb: &Rgb| {
            self.stand_ins.contains_key(rgb)
                || self
                    .detected
                    .iter()
                    .any(|entry| entry.source.stand_in_rgb() == *rgb)
        };
        (0..=u8::MAX)
            .flat_map(|dg| (0..=u8::MAX).map(move |db| (dg, db)))
            .map(|(dg, db)| {
                Rgb::new(
                    preferred.r,
                    preferred.g.wrapping_add(dg),
                    preferred.b.wrapping_add(db),
                )
            })
            .find(|candidate| !taken(candidate))
            .unwrap_or(preferred)
    }

    pub(crate) fn mark_unmatched(&mut self, key: &str) {
        self.unmatched.push(key.to_string());
    }

    pub fn policy(&self) -> ColorPolicy {
        self.policy
    }

    pub fn detected(&self) -> &[DetectedEntry] {
        &self.detected
    }

    /// Override keys that did not apply
    pub fn unmatched_overrides(&self) -> &[String] {
        &self.unmatched
    }

    pub fn has_overrides(&self) -> bool {
        !self.text_replacements.is_empty() || !self.operator_overrides.is_empty()
    }

    /// Source text substitutions for assets rendered by external tools
    pub fn text_replacements(&self) -> &[(String, Rgb)] {
        &self.text_replacements
    }

    /// Override keyed by this exact operator spelling, if any
    pub fn override_for(&self, operator: &str, operands: &[Operand]) -> Option<DeviceColor> {
        if self.policy == ColorPolicy::PreserveRaster {
            return None;
        }
        self.operator_overrides
            .iter()
            .find(|(text, _)| text.matches(operator, operands))
            .map(|(_, device)| *device)
    }

    /// Output color for a source color, `None` when it stays as authored.
    ///
    /// RGB is converted on first sight and cached, so a color resolves to
    /// the same CMYK for the lifetime of the plan. Stand-ins for SVG
    /// overrides resolve to their override.
    pub fn resolve(&mut self, source: SourceColor) -> Option<DeviceColor> {
        if self.policy == ColorPolicy::PreserveRaster {
            return None;
        }
        if let SourceColor::Rgb(rgb) = source {
            if let Some(device) = self.stand_ins.get(&rgb) {
                return Some(*device);
            }
        }
        match source {
            SourceColor::Rgb(rgb) => Some(
                *self
                    .converted
                    .entry(rgb)
                    .or_insert_with(|| DeviceColor::Cmyk(rgb_to_cmyk(rgb))),
            ),
            SourceColor::Cmyk(_) | SourceColor::Gray(_) => None,
        }
    }

    /// One-line summary for fidelity reports, empty when nothing to say
    pub fn summary(&self) -> String {
        if self.unmatched.is_empty() {
            return String::new();
        }
        let verb = match self.policy {
            ColorPolicy::PreserveRaster => "ignored for raster artwork",
            ColorPolicy::PreserveVector => "matched no color",
        };
        format!("color overrides {}: {}", verb, self.unmatched.join(", "))
    }
}
