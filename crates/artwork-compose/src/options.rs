use crate::constants::{ASPECT_TOLERANCE, MAX_PLACEMENTS, MAX_RASTER_EDGE_PX, RASTER_FALLBACK_DPI};
use crate::types::*;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Knobs for one document assembly
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AssemblyOptions {
    /// Try vector embedding before falling back to raster
    pub vector_embedding: bool,

    /// Resolution of the raster fallback
    pub raster_dpi: u32,

    /// Ceiling on placements after imposition
    pub max_placements: usize,

    /// Allowed relative difference between canvas and physical aspect ratio
    pub aspect_tolerance: f32,

    /// External SVG to PDF converter
    pub rsvg_convert_path: PathBuf,

    /// Directory of the Pdfium library used to render PDF artwork,
    /// system search paths when unset
    pub pdfium_library_dir: Option<PathBuf>,

    /// Draw project and color labels on the proof page
    pub draw_labels: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            vector_embedding: true,
            raster_dpi: RASTER_FALLBACK_DPI,
            max_placements: MAX_PLACEMENTS,
            aspect_tolerance: ASPECT_TOLERANCE,
            rsvg_convert_path: PathBuf::from("rsvg-convert"),
            pdfium_library_dir: None,
            draw_labels: true,
        }
    }
}

impl AssemblyOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options: AssemblyOptions = serde_json::from_slice(&bytes)
            .map_err(|e| ComposeError::Config(format!("Failed to parse options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ComposeError::Config(format!("Failed to serialize options: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.raster_dpi == 0 {
            return Err(ComposeError::Config("Raster DPI must be positive".to_string()));
        }
        if self.raster_dpi > MAX_RASTER_EDGE_PX {
            return Err(ComposeError::Config(format!(
                "Raster DPI {} exceeds the maximum of {}",
                self.raster_dpi, MAX_RASTER_EDGE_PX
            )));
        }

        if self.max_placements == 0 || self.max_placements > MAX_PLACEMENTS {
            return Err(ComposeError::Config(format!(
                "Placement ceiling must be between 1 and {}, got {}",
                MAX_PLACEMENTS, self.max_placements
            )));
        }

        if !self.aspect_tolerance.is_finite() || !(0.0..1.0).contains(&self.aspect_tolerance) {
            return Err(ComposeError::Config(format!(
                "Aspect tolerance must be in [0, 1), got {}",
                self.aspect_tolerance
            )));
        }

        if self.rsvg_convert_path.as_os_str().is_empty() {
            return Err(ComposeError::Config(
                "rsvg-convert path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
