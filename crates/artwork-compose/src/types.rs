use std::collections::BTreeMap;
use thiserror::Error;

use crate::color::{Cmyk, Rgb};
use crate::constants::{MAX_GRID_CELLS, MAX_SPACING_MM, MIN_GRID_CELLS};

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Missing asset: {0}")]
    MissingAsset(String),
    #[error("{tool} failed: {message}")]
    ToolFailure { tool: String, message: String },
    #[error("Assembly failed: {0}")]
    FatalAssembly(String),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ComposeError {
    pub(crate) fn tool(tool: impl Into<String>, message: impl ToString) -> Self {
        ComposeError::ToolFailure {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error fails the whole document rather than one element.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ComposeError::MissingAsset(_) | ComposeError::ToolFailure { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ComposeError>;

// =============================================================================
// Inputs
// =============================================================================

/// Print substrate: physical size plus the canvas raster it was drawn on.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Template {
    pub id: String,
    pub name: String,
    pub width_mm: f32,
    pub height_mm: f32,
    pub pixel_width: f32,
    pub pixel_height: f32,
    pub group: String,
}

impl Template {
    /// Relative difference between the pixel and millimetre aspect ratios.
    pub fn aspect_mismatch(&self) -> f32 {
        let physical = self.width_mm / self.height_mm;
        let canvas = self.pixel_width / self.pixel_height;
        ((canvas - physical) / physical).abs()
    }

    pub fn has_positive_dimensions(&self) -> bool {
        self.width_mm > 0.0 && self.height_mm > 0.0 && self.pixel_width > 0.0 && self.pixel_height > 0.0
    }
}

/// One logo instance on the canvas. Geometry is in canvas pixels, origin top-left.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacedElement {
    pub id: String,
    pub logo_ref: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Clockwise, 0..360
    #[cfg_attr(feature = "serde", serde(default))]
    pub rotation_degrees: f32,
    /// Keys are the exact encoding found in the asset (or its `ColorId`).
    #[cfg_attr(feature = "serde", serde(default))]
    pub color_overrides: BTreeMap<String, String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub imposition: Option<ImpositionSpec>,
}

impl PlacedElement {
    pub fn new(id: impl Into<String>, logo_ref: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            id: id.into(),
            logo_ref: logo_ref.into(),
            x,
            y,
            width,
            height,
            rotation_degrees: 0.0,
            color_overrides: BTreeMap::new(),
            imposition: None,
        }
    }
}

/// Uploaded artwork format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MimeKind {
    VectorSvg,
    VectorPdf,
    RasterPng,
    RasterJpeg,
}

impl MimeKind {
    /// Detect the kind from a mime type, falling back to the file extension.
    pub fn from_mime_or_extension(mime: Option<&str>, filename: &str) -> Option<Self> {
        let by_mime = mime.and_then(|m| match m.to_ascii_lowercase().as_str() {
            "image/svg+xml" => Some(MimeKind::VectorSvg),
            "application/pdf" => Some(MimeKind::VectorPdf),
            "image/png" => Some(MimeKind::RasterPng),
            "image/jpeg" | "image/jpg" => Some(MimeKind::RasterJpeg),
            _ => None,
        });
        if by_mime.is_some() {
            return by_mime;
        }

        let extension = filename.rsplit_once('.')?.1.to_ascii_lowercase();
        match extension.as_str() {
            "svg" => Some(MimeKind::VectorSvg),
            "pdf" => Some(MimeKind::VectorPdf),
            "png" => Some(MimeKind::RasterPng),
            "jpg" | "jpeg" => Some(MimeKind::RasterJpeg),
            _ => None,
        }
    }

    pub fn is_vector(self) -> bool {
        matches!(self, MimeKind::VectorSvg | MimeKind::VectorPdf)
    }
}

/// Color space the artwork was authored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceColorSpace {
    Rgb,
    Cmyk,
    Grayscale,
    #[default]
    Unknown,
}

/// A discrete color found in a vector asset at ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectedColor {
    /// Exact encoding as it appears in the file, e.g. `#ff0000` or `0 1 1 0 k`
    pub encoding: String,
}

impl DetectedColor {
    pub fn new(encoding: impl Into<String>) -> Self {
        Self {
            encoding: encoding.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogoAsset {
    pub id: String,
    pub filename: String,
    pub mime_kind: MimeKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub original_color_space: SourceColorSpace,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub bytes: Vec<u8>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub native_width: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub native_height: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub detected_colors: Vec<DetectedColor>,
}

impl LogoAsset {
    pub fn new(id: impl Into<String>, filename: impl Into<String>, mime_kind: MimeKind, bytes: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            mime_kind,
            original_color_space: SourceColorSpace::Unknown,
            bytes,
            native_width: None,
            native_height: None,
            detected_colors: Vec::new(),
        }
    }
}

/// Project-level choices. Colors are hex strings picked in the designer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Project {
    pub name: String,
    pub quantity: u32,
    pub template: Template,
    pub garment_color: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ink_color: Option<String>,
}

// =============================================================================
// Imposition
// =============================================================================

/// Grid repetition of one placed element
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImpositionSpec {
    pub rows: u32,
    pub columns: u32,
    pub h_spacing_mm: f32,
    pub v_spacing_mm: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub center_on_template: bool,
}

impl Default for ImpositionSpec {
    fn default() -> Self {
        Self {
            rows: 1,
            columns: 1,
            h_spacing_mm: 10.0,
            v_spacing_mm: 10.0,
            center_on_template: false,
        }
    }
}

impl ImpositionSpec {
    /// Build a spec from raw user input.
    ///
    /// Negative values are clamped to the nearest valid bound; values above
    /// the valid range are passed through so validation can reject them.
    pub fn from_raw_input(
        rows: i64,
        columns: i64,
        h_spacing_mm: f32,
        v_spacing_mm: f32,
        center_on_template: bool,
    ) -> Self {
        let count = |n: i64| {
            if n < MIN_GRID_CELLS as i64 {
                MIN_GRID_CELLS
            } else {
                u32::try_from(n).unwrap_or(u32::MAX)
            }
        };
        Self {
            rows: count(rows),
            columns: count(columns),
            h_spacing_mm: h_spacing_mm.max(0.0),
            v_spacing_mm: v_spacing_mm.max(0.0),
            center_on_template,
        }
    }

    pub fn total_width_mm(&self, element_width_mm: f32) -> f32 {
        self.columns as f32 * element_width_mm
            + self.columns.saturating_sub(1) as f32 * self.h_spacing_mm
    }

    pub fn total_height_mm(&self, element_height_mm: f32) -> f32 {
        self.rows as f32 * element_height_mm + self.rows.saturating_sub(1) as f32 * self.v_spacing_mm
    }

    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    pub(crate) fn rows_in_range(&self) -> bool {
        (MIN_GRID_CELLS..=MAX_GRID_CELLS).contains(&self.rows)
    }

    pub(crate) fn columns_in_range(&self) -> bool {
        (MIN_GRID_CELLS..=MAX_GRID_CELLS).contains(&self.columns)
    }

    pub(crate) fn spacing_in_range(&self) -> bool {
        let valid = |s: f32| (0.0..=MAX_SPACING_MM).contains(&s);
        valid(self.h_spacing_mm) && valid(self.v_spacing_mm)
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// Device color written into the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceColor {
    Rgb(Rgb),
    Cmyk(Cmyk),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorSpace {
    Rgb,
    Cmyk,
}

impl DeviceColor {
    pub fn space(&self) -> ColorSpace {
        match self {
            DeviceColor::Rgb(_) => ColorSpace::Rgb,
            DeviceColor::Cmyk(_) => ColorSpace::Cmyk,
        }
    }

    /// Components in the 0..1 range PDF color operators expect
    pub fn components(&self) -> Vec<f32> {
        match self {
            DeviceColor::Rgb(rgb) => vec![
                rgb.r as f32 / 255.0,
                rgb.g as f32 / 255.0,
                rgb.b as f32 / 255.0,
            ],
            DeviceColor::Cmyk(cmyk) => vec![
                cmyk.c as f32 / 100.0,
                cmyk.m as f32 / 100.0,
                cmyk.y as f32 / 100.0,
                cmyk.k as f32 / 100.0,
            ],
        }
    }
}

/// A resolved color decision. `source_name` is set on a palette hit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColorSpec {
    pub value: DeviceColor,
    pub source_name: Option<String>,
}

impl ColorSpec {
    pub fn space(&self) -> ColorSpace {
        self.value.space()
    }

    pub fn components(&self) -> Vec<f32> {
        self.value.components()
    }

    pub fn is_named(&self) -> bool {
        self.source_name.is_some()
    }

    /// Human-readable name for proof labels
    pub fn display_name(&self) -> String {
        self.source_name.clone().unwrap_or_else(|| "Custom".to_string())
    }
}

/// How faithfully an element made it into the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Fidelity {
    /// Embedded as vector content, original CMYK preserved
    Vector,
    /// Embedded as an image
    HighResRaster,
    /// Drawn as a labelled box
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FidelityReport {
    pub element_id: String,
    pub fidelity: Fidelity,
    pub detail: String,
}

impl FidelityReport {
    pub fn new(element_id: impl Into<String>, fidelity: Fidelity, detail: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            fidelity,
            detail: detail.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.fidelity != Fidelity::Vector
    }
}

/// Finished two-page document plus one report per placed element
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComposedDocument {
    #[cfg_attr(feature = "serde", serde(skip))]
    pub bytes: Vec<u8>,
    pub reports: Vec<FidelityReport>,
}

pub type CompositionResult = Result<ComposedDocument>;
