//! Shared constants for print composition
//!
//! This module centralizes magic numbers and constants used throughout
//! the composition process.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 2.834_645_7;

/// Millimeters per inch
pub const MM_PER_INCH: f32 = 25.4;

// =============================================================================
// Validation Limits
// =============================================================================

/// Relative tolerance between canvas and physical aspect ratio
pub const ASPECT_TOLERANCE: f32 = 0.01;

/// Upper bound on placements after imposition, keeps output size bounded
pub const MAX_PLACEMENTS: usize = 400;

/// Imposition rows/columns range
pub const MIN_GRID_CELLS: u32 = 1;
pub const MAX_GRID_CELLS: u32 = 20;

/// Imposition spacing upper bound in millimeters
pub const MAX_SPACING_MM: f32 = 50.0;

/// Slack for floating point fit checks (mm)
pub const FIT_EPSILON_MM: f32 = 1e-3;

// =============================================================================
// Embedding
// =============================================================================

/// Target resolution for the raster fallback
pub const RASTER_FALLBACK_DPI: u32 = 300;

/// Largest raster edge the fallback will request, in pixels
pub const MAX_RASTER_EDGE_PX: u32 = 12_000;

// =============================================================================
// Placeholder and Labels
// =============================================================================

/// Line width for placeholder boxes (points)
pub const PLACEHOLDER_LINE_WIDTH: f32 = 0.75;

/// Font size for placeholder captions (points)
pub const PLACEHOLDER_FONT_SIZE: f32 = 7.0;

/// Font size for proof labels (points)
pub const LABEL_FONT_SIZE: f32 = 10.0;

/// Distance between label baselines (points)
pub const LABEL_LINE_HEIGHT: f32 = 15.0;

/// Left edge of the label block (points)
pub const LABEL_LEFT: f32 = 50.0;

/// Baseline of the lowest label line (points)
pub const LABEL_BOTTOM: f32 = 20.0;

/// Garment K value at or above which labels are drawn white
pub const DARK_GARMENT_K: u8 = 50;

/// Resource name of the Helvetica font on composed pages
pub const LABEL_FONT_RESOURCE: &str = "F1";
