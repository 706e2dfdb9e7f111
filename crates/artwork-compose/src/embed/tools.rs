//! External and in-process rendering collaborators
//!
//! The embedder only talks to these traits, so tests and deployments can
//! swap in their own converters.

use crate::types::{ComposeError, MimeKind, Result};
use image::{ImageFormat, RgbaImage};
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

#[cfg(feature = "pdfium")]
use pdfium_render::prelude::*;

/// Turns SVG source into a single-page vector PDF.
pub trait VectorConverter: Send + Sync {
    fn name(&self) -> &str;

    fn convert_to_vector_pdf(&self, svg: &[u8]) -> Result<Vec<u8>>;
}

/// Renders artwork to PNG bytes of an exact pixel size.
pub trait RasterRenderer: Send + Sync {
    fn name(&self) -> &str;

    fn render_to_raster_at(
        &self,
        source: &[u8],
        kind: MimeKind,
        width_px: u32,
        height_px: u32,
        dpi: u32,
    ) -> Result<Vec<u8>>;
}

// =============================================================================
// rsvg-convert
// =============================================================================

/// Runs `rsvg-convert -f pdf`, feeding the SVG on stdin
#[derive(Debug, Clone)]
pub struct RsvgConvert {
    program: PathBuf,
}

impl RsvgConvert {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for RsvgConvert {
    fn default() -> Self {
        Self::new("rsvg-convert")
    }
}

impl VectorConverter for RsvgConvert {
    fn name(&self) -> &str {
        "rsvg-convert"
    }

    fn convert_to_vector_pdf(&self, svg: &[u8]) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(["-f", "pdf"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ComposeError::tool(
                    self.name(),
                    format!("could not start {}: {}", self.program.display(), e),
                )
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ComposeError::tool(self.name(), "stdin unavailable"))?;
        let input = svg.to_vec();
        // Written from a thread so a full stdout pipe cannot deadlock us
        let writer = std::thread::spawn(move || stdin.write_all(&input));

        let output = child
            .wait_with_output()
            .map_err(|e| ComposeError::tool(self.name(), e))?;
        let written = writer
            .join()
            .map_err(|_| ComposeError::tool(self.name(), "stdin writer panicked"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ComposeError::tool(
                self.name(),
                format!("{}: {}", output.status, stderr.trim()),
            ));
        }
        written.map_err(|e| ComposeError::tool(self.name(), e))?;

        if !output.stdout.starts_with(b"%PDF") {
            return Err(ComposeError::tool(self.name(), "output is not a PDF"));
        }
        Ok(output.stdout)
    }
}

// =============================================================================
// resvg
// =============================================================================

/// In-process SVG rasterizer
#[derive(Clone)]
pub struct ResvgRenderer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl ResvgRenderer {
    /// Renderer with the system fonts loaded
    pub fn new() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        Self::with_fonts(Arc::new(db))
    }

    pub fn with_fonts(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self { fontdb }
    }
}

impl Default for ResvgRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResvgRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResvgRenderer")
            .field("faces", &self.fontdb.len())
            .finish()
    }
}

impl RasterRenderer for ResvgRenderer {
    fn name(&self) -> &str {
        "resvg"
    }

    fn render_to_raster_at(
        &self,
        source: &[u8],
        kind: MimeKind,
        width_px: u32,
        height_px: u32,
        dpi: u32,
    ) -> Result<Vec<u8>> {
        if kind != MimeKind::VectorSvg {
            return Err(ComposeError::tool(
                self.name(),
                format!("cannot render {:?} artwork", kind),
            ));
        }

        let options = usvg::Options {
            dpi: dpi as f32,
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_data(source, &options)
            .map_err(|e| ComposeError::tool(self.name(), format!("parse svg: {}", e)))?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(width_px, height_px).ok_or_else(|| {
            ComposeError::tool(
                self.name(),
                format!("cannot allocate {}x{} pixmap", width_px, height_px),
            )
        })?;
        let size = tree.size();
        let transform = resvg::tiny_skia::Transform::from_scale(
            width_px as f32 / size.width(),
            height_px as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        // tiny-skia keeps premultiplied alpha
        let straight: Vec<u8> = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        let image = RgbaImage::from_raw(width_px, height_px, straight)
            .ok_or_else(|| ComposeError::tool(self.name(), "pixel buffer size mismatch"))?;
        encode_png(&image)
    }
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

// =============================================================================
// Pdfium
// =============================================================================

/// Renders page one of PDF artwork with Pdfium
#[cfg(feature = "pdfium")]
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    /// Directory holding the Pdfium shared library, system search when unset
    library_dir: Option<PathBuf>,
}

#[cfg(feature = "pdfium")]
impl PdfiumRenderer {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }

    fn bind(&self) -> std::result::Result<Pdfium, PdfiumError> {
        let bindings = match &self.library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))?,
            None => Pdfium::bind_to_system_library()?,
        };
        Ok(Pdfium::new(bindings))
    }
}

#[cfg(feature = "pdfium")]
impl RasterRenderer for PdfiumRenderer {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn render_to_raster_at(
        &self,
        source: &[u8],
        kind: MimeKind,
        width_px: u32,
        height_px: u32,
        _dpi: u32,
    ) -> Result<Vec<u8>> {
        if kind != MimeKind::VectorPdf {
            return Err(ComposeError::tool(
                self.name(),
                format!("cannot render {:?} artwork", kind),
            ));
        }
        let fail = |e: PdfiumError| ComposeError::tool("pdfium", e);

        let pdfium = self.bind().map_err(fail)?;
        let document = pdfium.load_pdf_from_byte_slice(source, None).map_err(fail)?;
        let page = document.pages().get(0).map_err(fail)?;

        let config = PdfRenderConfig::new()
            .set_target_width(width_px as i32)
            .set_maximum_height(height_px as i32)
            .set_clear_color(PdfColor::new(255, 255, 255, 0));
        let bitmap = page.render_with_config(&config).map_err(fail)?;

        // The page box is stretched onto the element box, as vector embedding does
        let image = bitmap
            .as_image()
            .resize_exact(width_px, height_px, image::imageops::FilterType::Lanczos3);
        encode_png(&image.to_rgba8())
    }
}

// =============================================================================
// Routing by kind
// =============================================================================

/// Hands SVG and PDF artwork to the renderer that understands each
#[derive(Clone)]
pub struct ArtworkRenderer {
    svg: Arc<dyn RasterRenderer>,
    pdf: Arc<dyn RasterRenderer>,
}

impl ArtworkRenderer {
    pub fn new(svg: Arc<dyn RasterRenderer>, pdf: Arc<dyn RasterRenderer>) -> Self {
        Self { svg, pdf }
    }
}

impl RasterRenderer for ArtworkRenderer {
    fn name(&self) -> &str {
        "artwork renderer"
    }

    fn render_to_raster_at(
        &self,
        source: &[u8],
        kind: MimeKind,
        width_px: u32,
        height_px: u32,
        dpi: u32,
    ) -> Result<Vec<u8>> {
        let renderer = match kind {
            MimeKind::VectorSvg => &self.svg,
            MimeKind::VectorPdf => &self.pdf,
            other => {
                return Err(ComposeError::tool(
                    self.name(),
                    format!("cannot render {:?} artwork", other),
                ));
            }
        };
        log::debug!("Rendering {:?} artwork with {}", kind, renderer.name());
        renderer.render_to_raster_at(source, kind, width_px, height_px, dpi)
    }
}

// =============================================================================
// Unavailable
// =============================================================================

/// Stand-in for a tool that is not installed or not configured
#[derive(Debug, Clone)]
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl VectorConverter for Unavailable {
    fn name(&self) -> &str {
        "vector converter"
    }

    fn convert_to_vector_pdf(&self, _svg: &[u8]) -> Result<Vec<u8>> {
        Err(ComposeError::tool(VectorConverter::name(self), &self.reason))
    }
}

impl RasterRenderer for Unavailable {
    fn name(&self) -> &str {
        "raster renderer"
    }

    fn render_to_raster_at(
        &self,
        _source: &[u8],
        _kind: MimeKind,
        _width_px: u32,
        _height_px: u32,
        _dpi: u32,
    ) -> Result<Vec<u8>> {
        Err(ComposeError::tool(RasterRenderer::name(self), &self.reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
        <rect width="10" height="10" fill="#ff0000"/>
    </svg>"##;

    #[test]
    fn test_resvg_renders_exact_size() {
        let renderer = ResvgRenderer::with_fonts(Arc::new(usvg::fontdb::Database::new()));
        let png = renderer
            .render_to_raster_at(SQUARE, MimeKind::VectorSvg, 40, 20, 300)
            .unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (40, 20));
        assert_eq!(decoded.get_pixel(20, 10).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_resvg_refuses_pdf() {
        let renderer = ResvgRenderer::with_fonts(Arc::new(usvg::fontdb::Database::new()));
        let err = renderer
            .render_to_raster_at(b"%PDF-1.7", MimeKind::VectorPdf, 10, 10, 300)
            .unwrap_err();
        assert!(matches!(err, ComposeError::ToolFailure { .. }));
    }

    /// Answers with its own name so the route taken is visible
    struct Named(&'static str);

    impl RasterRenderer for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn render_to_raster_at(&self, _: &[u8], _: MimeKind, _: u32, _: u32, _: u32) -> Result<Vec<u8>> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    #[test]
    fn test_artwork_renderer_routes_by_kind() {
        let renderer = ArtworkRenderer::new(Arc::new(Named("svg")), Arc::new(Named("pdf")));
        let render = |kind| renderer.render_to_raster_at(b"", kind, 1, 1, 300);
        assert_eq!(render(MimeKind::VectorSvg).unwrap(), b"svg");
        assert_eq!(render(MimeKind::VectorPdf).unwrap(), b"pdf");
        assert!(matches!(
            render(MimeKind::RasterPng),
            Err(ComposeError::ToolFailure { .. })
        ));
    }

    #[cfg(feature = "pdfium")]
    #[test]
    fn test_pdfium_without_library_is_tool_failure() {
        let renderer = PdfiumRenderer::new(Some(PathBuf::from("/nonexistent/pdfium")));
        let err = renderer
            .render_to_raster_at(b"%PDF-1.7", MimeKind::VectorPdf, 10, 10, 300)
            .unwrap_err();
        match err {
            ComposeError::ToolFailure { tool, .. } => assert_eq!(tool, "pdfium"),
            other => panic!("Expected tool failure, got {:?}", other),
        }
        assert!(renderer
            .render_to_raster_at(SQUARE, MimeKind::VectorSvg, 10, 10, 300)
            .is_err());
    }

    #[test]
    fn test_missing_program_is_tool_failure() {
        let converter = RsvgConvert::new("/nonexistent/rsvg-convert");
        let err = converter.convert_to_vector_pdf(SQUARE).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_unavailable_always_fails() {
        let tool = Unavailable::new("not configured");
        assert!(tool.convert_to_vector_pdf(SQUARE).is_err());
        let err = tool
            .render_to_raster_at(SQUARE, MimeKind::VectorSvg, 1, 1, 300)
            .unwrap_err();
        assert_eq!(err.to_string(), "raster renderer failed: not configured");
    }
}
