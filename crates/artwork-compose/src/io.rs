//! Job files and document output
//!
//! A job file is JSON naming the project, its placements and the artwork
//! files behind each logo. Asset paths are resolved relative to the job
//! file's directory.

use crate::render::detect_color_space;
use crate::templates::find_template;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A template given either by built-in id or in full
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateRef {
    Id(String),
    Inline(Template),
}

impl TemplateRef {
    pub fn resolve(&self) -> Result<Template> {
        match self {
            TemplateRef::Inline(template) => Ok(template.clone()),
            TemplateRef::Id(id) => find_template(id)
                .ok_or_else(|| ComposeError::Config(format!("Unknown template id: {}", id))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProject {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub template: TemplateRef,
    pub garment_color: String,
    #[serde(default)]
    pub ink_color: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

/// One artwork file as listed in a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub id: String,
    pub path: PathBuf,
    /// MIME type, otherwise inferred from the file extension
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub original_color_space: SourceColorSpace,
    /// Exact color encodings found in the file at upload
    #[serde(default)]
    pub detected_colors: Vec<String>,
    #[serde(default)]
    pub native_width: Option<u32>,
    #[serde(default)]
    pub native_height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFile {
    pub project: JobProject,
    #[serde(default)]
    pub placements: Vec<PlacedElement>,
    #[serde(default)]
    pub assets: Vec<AssetDescriptor>,
}

/// A job with its template resolved and asset bytes in memory
#[derive(Debug, Clone)]
pub struct Job {
    pub project: Project,
    pub placements: Vec<PlacedElement>,
    pub assets: Vec<LogoAsset>,
}

impl Job {
    /// Load a job file and every asset it names
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file: JobFile = serde_json::from_slice(&bytes)
            .map_err(|e| ComposeError::Config(format!("Failed to parse job file: {}", e)))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_file(file, base).await
    }

    /// Resolve a parsed job, reading asset paths relative to `base`
    pub async fn from_file(file: JobFile, base: &Path) -> Result<Self> {
        let project = Project {
            name: file.project.name,
            quantity: file.project.quantity,
            template: file.project.template.resolve()?,
            garment_color: file.project.garment_color,
            ink_color: file.project.ink_color,
        };
        let assets = load_assets(&file.assets, base).await?;
        Ok(Self {
            project,
            placements: file.placements,
            assets,
        })
    }
}

/// Read every described asset. A missing file is left out with a warning
/// so the element referencing it ends up as a placeholder.
pub async fn load_assets(descriptors: &[AssetDescriptor], base: &Path) -> Result<Vec<LogoAsset>> {
    let mut assets = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let path = base.join(&descriptor.path);
        let filename = descriptor
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let kind = MimeKind::from_mime_or_extension(descriptor.mime.as_deref(), &filename)
            .ok_or_else(|| {
                ComposeError::Config(format!(
                    "Asset {}: unsupported file type {}",
                    descriptor.id, filename
                ))
            })?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Asset {}: {} not found", descriptor.id, path.display());
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let mut asset = LogoAsset::new(&descriptor.id, filename, kind, bytes);
        asset.original_color_space = match descriptor.original_color_space {
            SourceColorSpace::Unknown => detect_color_space(&asset.bytes, kind),
            known => known,
        };
        asset.native_width = descriptor.native_width;
        asset.native_height = descriptor.native_height;
        asset.detected_colors = descriptor
            .detected_colors
            .iter()
            .map(DetectedColor::new)
            .collect();
        log::debug!(
            "Loaded asset {} ({:?}, {:?}, {} bytes)",
            asset.id,
            asset.mime_kind,
            asset.original_color_space,
            asset.bytes.len()
        );
        assets.push(asset);
    }
    Ok(assets)
}

/// Write the finished PDF
pub async fn save_document(document: &ComposedDocument, path: impl AsRef<Path>) -> Result<()> {
    tokio::fs::write(path, &document.bytes).await?;
    Ok(())
}

/// Write the per-element reports as JSON
pub async fn save_reports(reports: &[FidelityReport], path: impl AsRef<Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(reports)
        .map_err(|e| ComposeError::Config(format!("Failed to serialize reports: {}", e)))?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
