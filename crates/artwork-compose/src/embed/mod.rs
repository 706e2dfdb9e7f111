//! Getting one placed logo onto the page
//!
//! Each element walks a fixed chain: vector embedding, then a high
//! resolution raster, then a labelled placeholder. Every step draws into
//! the element's exact box and the chain always ends with a report.

mod tools;

pub use tools::{
    ArtworkRenderer, RasterRenderer, ResvgRenderer, RsvgConvert, Unavailable, VectorConverter,
};
#[cfg(feature = "pdfium")]
pub use tools::PdfiumRenderer;

use crate::color::{ColorModel, ColorPlan, Rgb};
use crate::constants::{MAX_RASTER_EDGE_PX, MM_PER_INCH, PLACEHOLDER_FONT_SIZE, PLACEHOLDER_LINE_WIDTH};
use crate::options::AssemblyOptions;
use crate::render::{add_raster_image, import_first_page, FormXObject, ImageXObject, Layer};
use crate::types::{
    ComposeError, Fidelity, FidelityReport, LogoAsset, MimeKind, PlacedElement, Result,
    SourceColorSpace, Template,
};
use crate::units::{element_box, fmt_num, mm_from_pt, Matrix, Rect};
use lopdf::Document;
use std::collections::{BTreeMap, HashMap};

/// What an embedded object was made from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ArtKey {
    asset_id: String,
    overrides: BTreeMap<String, String>,
    /// Pixel size for rendered artwork
    size_px: Option<(u32, u32)>,
}

impl ArtKey {
    fn vector(asset: &LogoAsset, element: &PlacedElement) -> Self {
        Self {
            asset_id: asset.id.clone(),
            overrides: element.color_overrides.clone(),
            size_px: None,
        }
    }

    fn rendered(asset: &LogoAsset, element: &PlacedElement, width_px: u32, height_px: u32) -> Self {
        Self {
            size_px: Some((width_px, height_px)),
            ..Self::vector(asset, element)
        }
    }

    /// Raster artwork ignores overrides, so every placement shares one image
    fn native(asset: &LogoAsset) -> Self {
        Self {
            asset_id: asset.id.clone(),
            overrides: BTreeMap::new(),
            size_px: None,
        }
    }
}

/// Artwork already written to one output document.
///
/// Placements of the same asset with the same overrides draw the cached
/// object by reference instead of importing it again.
#[derive(Debug, Default)]
pub struct EmbedCache {
    forms: HashMap<ArtKey, FormXObject>,
    images: HashMap<ArtKey, ImageXObject>,
}

impl EmbedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct objects written so far
    pub fn len(&self) -> usize {
        self.forms.len() + self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct AssetEmbedder<'a> {
    converter: &'a dyn VectorConverter,
    renderer: &'a dyn RasterRenderer,
    options: &'a AssemblyOptions,
}

impl<'a> AssetEmbedder<'a> {
    pub fn new(
        converter: &'a dyn VectorConverter,
        renderer: &'a dyn RasterRenderer,
        options: &'a AssemblyOptions,
    ) -> Self {
        Self {
            converter,
            renderer,
            options,
        }
    }

    /// Draw `element` into `layer`. Never fails; degradation is reported.
    #[allow(clippy::too_many_arguments)]
    pub fn embed(
        &self,
        doc: &mut Document,
        layer: &mut Layer,
        cache: &mut EmbedCache,
        element: &PlacedElement,
        asset: Option<&LogoAsset>,
        template: &Template,
        color_model: &ColorModel,
    ) -> FidelityReport {
        let rect = element_box(element, template);

        let Some(asset) = asset else {
            let err = ComposeError::MissingAsset(element.logo_ref.clone());
            log::warn!("Element {}: {}", element.id, err);
            return self.placeholder(layer, element, &rect, &err);
        };

        let mut plan = color_model.plan_for(asset, &element.color_overrides);

        let outcome = if asset.mime_kind.is_vector() {
            self.embed_vector(doc, layer, cache, asset, element, &rect, &mut plan)
                .map(|()| (Fidelity::Vector, String::new()))
                .or_else(|vector_err| {
                    log::warn!(
                        "Element {}: vector embedding failed, trying raster: {}",
                        element.id,
                        vector_err
                    );
                    self.embed_rendered(doc, layer, cache, asset, element, &rect, &plan)
                        .map(|()| {
                            (
                                Fidelity::HighResRaster,
                                format!(
                                    "rendered at {} DPI, vector embedding failed: {}",
                                    self.options.raster_dpi, vector_err
                                ),
                            )
                        })
                })
        } else {
            self.embed_native_raster(doc, layer, cache, asset, element, &rect)
                .map(|space| {
                    (
                        Fidelity::HighResRaster,
                        format!("raster artwork embedded as supplied ({:?})", space),
                    )
                })
        };

        match outcome {
            Ok((fidelity, detail)) => {
                let detail = join_detail(detail, plan.summary());
                if fidelity != Fidelity::Vector {
                    log::warn!("Element {} degraded to {:?}: {}", element.id, fidelity, detail);
                }
                FidelityReport::new(&element.id, fidelity, detail)
            }
            Err(err) => {
                log::warn!("Element {}: raster fallback failed: {}", element.id, err);
                let report = self.placeholder(layer, element, &rect, &err);
                FidelityReport {
                    detail: join_detail(report.detail, plan.summary()),
                    ..report
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn embed_vector(
        &self,
        doc: &mut Document,
        layer: &mut Layer,
        cache: &mut EmbedCache,
        asset: &LogoAsset,
        element: &PlacedElement,
        rect: &Rect,
        plan: &mut ColorPlan,
    ) -> Result<()> {
        if !self.options.vector_embedding {
            return Err(ComposeError::tool("vector embedding", "disabled by options"));
        }

        let key = ArtKey::vector(asset, element);
        let form = match cache.forms.get(&key) {
            Some(form) => *form,
            None => {
                let form = match asset.mime_kind {
                    MimeKind::VectorPdf => import_first_page(doc, &asset.bytes, plan)?,
                    MimeKind::VectorSvg => {
                        let svg = apply_svg_overrides(&asset.bytes, plan)?;
                        let pdf = self.converter.convert_to_vector_pdf(&svg)?;
                        import_first_page(doc, &pdf, plan)?
                    }
                    other => {
                        return Err(ComposeError::Config(format!("{:?} is not vector artwork", other)));
                    }
                };
                cache.forms.insert(key, form);
                form
            }
        };

        let name = layer.add_xobject("Art", form.id);
        layer.draw_xobject(&name, &form.fit_matrix(rect, element.rotation_degrees));
        Ok(())
    }

    /// Render vector artwork to pixels sized for the element's physical box
    #[allow(clippy::too_many_arguments)]
    fn embed_rendered(
        &self,
        doc: &mut Document,
        layer: &mut Layer,
        cache: &mut EmbedCache,
        asset: &LogoAsset,
        element: &PlacedElement,
        rect: &Rect,
        plan: &ColorPlan,
    ) -> Result<()> {
        let dpi = self.options.raster_dpi;
        let width_px = pixels_for(rect.width, dpi);
        let height_px = pixels_for(rect.height, dpi);

        let key = ArtKey::rendered(asset, element, width_px, height_px);
        let image = match cache.images.get(&key) {
            Some(image) => *image,
            None => {
                let source = match asset.mime_kind {
                    MimeKind::VectorSvg => apply_svg_overrides(&asset.bytes, plan)?,
                    _ => asset.bytes.clone(),
                };
                let png = self
                    .renderer
                    .render_to_raster_at(&source, asset.mime_kind, width_px, height_px, dpi)?;
                let image = add_raster_image(doc, &png, MimeKind::RasterPng)?;
                cache.images.insert(key, image);
                image
            }
        };
        draw_image(layer, image.id, rect, element.rotation_degrees);
        Ok(())
    }

    fn embed_native_raster(
        &self,
        doc: &mut Document,
        layer: &mut Layer,
        cache: &mut EmbedCache,
        asset: &LogoAsset,
        element: &PlacedElement,
        rect: &Rect,
    ) -> Result<SourceColorSpace> {
        let key = ArtKey::native(asset);
        let image = match cache.images.get(&key) {
            Some(image) => *image,
            None => {
                let image = add_raster_image(doc, &asset.bytes, asset.mime_kind)?;
                log::debug!(
                    "Asset {}: {}x{} px {:?} image",
                    asset.id,
                    image.width,
                    image.height,
                    image.color_space
                );
                cache.images.insert(key, image);
                image
            }
        };
        draw_image(layer, image.id, rect, element.rotation_degrees);
        Ok(image.color_space)
    }

    /// Outline with diagonals and a caption, drawn at the exact box
    fn placeholder(
        &self,
        layer: &mut Layer,
        element: &PlacedElement,
        rect: &Rect,
        err: &ComposeError,
    ) -> FidelityReport {
        let matrix = Matrix::placement(rect, element.rotation_degrees);
        let (w, h) = (fmt_num(rect.width), fmt_num(rect.height));
        layer.push(format!(
            "q {} cm 0 0 0 0.6 K {} w 0 0 {} {} re S 0 0 m {} {} l S 0 {} m {} 0 l S\n",
            matrix.to_operands(),
            fmt_num(PLACEHOLDER_LINE_WIDTH),
            w,
            h,
            w,
            h,
            h,
            w
        ));
        layer.text(
            &element.logo_ref,
            PLACEHOLDER_LINE_WIDTH * 4.0,
            (rect.height - PLACEHOLDER_FONT_SIZE) / 2.0,
            PLACEHOLDER_FONT_SIZE,
            [0.0, 0.0, 0.0, 0.8],
        );
        layer.push("Q\n");

        FidelityReport::new(&element.id, Fidelity::Placeholder, err.to_string())
    }
}

fn draw_image(layer: &mut Layer, id: lopdf::ObjectId, rect: &Rect, rotation_degrees: f32) {
    let name = layer.add_xobject("Img", id);
    let matrix = Matrix::scale(rect.width, rect.height).then(&Matrix::placement(rect, rotation_degrees));
    layer.draw_xobject(&name, &matrix);
}

/// Pixels covering `length_pt` at `dpi`, at least one and at most the cap
fn pixels_for(length_pt: f32, dpi: u32) -> u32 {
    let inches = mm_from_pt(length_pt) / MM_PER_INCH;
    ((inches * dpi as f32).round() as u32).clamp(1, MAX_RASTER_EDGE_PX)
}

fn join_detail(detail: String, extra: String) -> String {
    match (detail.is_empty(), extra.is_empty()) {
        (_, true) => detail,
        (true, false) => extra,
        (false, false) => format!("{}; {}", detail, extra),
    }
}

/// Rewrite overridden colors in SVG source to their RGB stand-ins
fn apply_svg_overrides(svg: &[u8], plan: &ColorPlan) -> Result<Vec<u8>> {
    if !plan.has_overrides() {
        return Ok(svg.to_vec());
    }
    let mut text = std::str::from_utf8(svg)
        .map_err(|e| ComposeError::tool("svg overrides", format!("source is not UTF-8: {}", e)))?
        .to_string();
    for (encoding, stand_in) in plan.text_replacements() {
        text = replace_color_token(&text, encoding, stand_in);
    }
    Ok(text.into_bytes())
}

/// Replace whole-token occurrences of `from`, so `#fff` leaves `#ffffff` alone
fn replace_color_token(text: &str, from: &str, to: &Rgb) -> String {
    let is_word = |ch: char| ch.is_ascii_alphanumeric() || ch == '#' || ch == '-' || ch == '_';
    let replacement = to.to_hex();

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, _) in text.match_indices(from) {
        let end = start + from.len();
        let before_ok = text[..start].chars().next_back().is_none_or(|ch| !is_word(ch));
        let after_ok = text[end..].chars().next().is_none_or(|ch| !is_word(ch));
        if before_ok && after_ok && start >= last {
            out.push_str(&text[last..start]);
            out.push_str(&replacement);
            last = end;
        }
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_whole_tokens_only() {
        let svg = r##"<g fill="#fff" stroke="#ffffff"><path fill="#fff"/></g>"##;
        let out = replace_color_token(svg, "#fff", &Rgb::new(0, 0, 128));
        assert_eq!(
            out,
            r##"<g fill="#000080" stroke="#ffffff"><path fill="#000080"/></g>"##
        );
    }

    #[test]
    fn test_replace_in_style_attribute() {
        let svg = "style=\"fill:#ff0000;stroke:none\"";
        let out = replace_color_token(svg, "#ff0000", &Rgb::new(0, 255, 0));
        assert_eq!(out, "style=\"fill:#00FF00;stroke:none\"");
    }

    #[test]
    fn test_pixels_for_300_dpi() {
        // 25.4mm at 300 DPI
        let one_inch_pt = 72.0;
        assert_eq!(pixels_for(one_inch_pt, 300), 300);
        assert_eq!(pixels_for(0.0, 300), 1);
    }

    #[test]
    fn test_join_detail() {
        assert_eq!(join_detail(String::new(), String::new()), "");
        assert_eq!(join_detail("a".into(), String::new()), "a");
        assert_eq!(join_detail(String::new(), "b".into()), "b");
        assert_eq!(join_detail("a".into(), "b".into()), "a; b");
    }
}
