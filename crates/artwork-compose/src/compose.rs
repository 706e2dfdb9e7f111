//! Two-page document construction
//!
//! Page one carries the artwork only. Page two paints the garment color
//! under the very same artwork content stream and adds color labels, so
//! both pages show byte-identical artwork.

use crate::color::{Cmyk, ColorModel};
use crate::constants::{DARK_GARMENT_K, LABEL_BOTTOM, LABEL_FONT_SIZE, LABEL_LEFT, LABEL_LINE_HEIGHT};
use crate::embed::{AssetEmbedder, EmbedCache};
use crate::render::{helvetica, Layer};
use crate::types::*;
use crate::units::{fmt_num, page_size_pt};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// Where the composer is in building the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerState {
    Empty,
    Page1Built,
    Page2Built,
    Finalized,
}

/// What goes on the proof page besides the garment fill
#[derive(Debug, Clone, PartialEq)]
pub struct ProofLabels {
    pub project_name: String,
    pub quantity: u32,
    pub garment: ColorSpec,
    pub ink: Option<ColorSpec>,
}

impl ProofLabels {
    fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("{} - Qty {}", self.project_name, self.quantity),
            format!("Garment: {}", describe(&self.garment)),
        ];
        if let Some(ink) = &self.ink {
            lines.push(format!("Ink: {}", describe(ink)));
        }
        lines
    }
}

fn describe(spec: &ColorSpec) -> String {
    match spec.value {
        DeviceColor::Cmyk(cmyk) => format!("{} {}", spec.display_name(), cmyk),
        DeviceColor::Rgb(rgb) => format!("{} {}", spec.display_name(), rgb.to_hex()),
    }
}

struct Artwork {
    stream_id: ObjectId,
    layer: Layer,
}

pub struct PageComposer<'t> {
    template: &'t Template,
    state: ComposerState,
    doc: Document,
    pages_id: ObjectId,
    font_id: Option<ObjectId>,
    artwork: Option<Artwork>,
    embedded: EmbedCache,
    page_ids: Vec<ObjectId>,
    reports: Vec<FidelityReport>,
}

impl<'t> PageComposer<'t> {
    pub fn new(template: &'t Template) -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            template,
            state: ComposerState::Empty,
            doc,
            pages_id,
            font_id: None,
            artwork: None,
            embedded: EmbedCache::new(),
            page_ids: Vec::new(),
            reports: Vec::new(),
        }
    }

    pub fn state(&self) -> ComposerState {
        self.state
    }

    pub fn reports(&self) -> &[FidelityReport] {
        &self.reports
    }

    fn expect_state(&self, expected: ComposerState, action: &str) -> Result<()> {
        if self.state != expected {
            return Err(ComposeError::FatalAssembly(format!(
                "cannot {} in state {:?} (expected {:?})",
                action, self.state, expected
            )));
        }
        Ok(())
    }

    /// Embed every placement and emit the artwork page.
    pub fn build_artwork_page(
        &mut self,
        placements: &[PlacedElement],
        assets: &HashMap<&str, &LogoAsset>,
        embedder: &AssetEmbedder,
        color_model: &ColorModel,
    ) -> Result<()> {
        self.expect_state(ComposerState::Empty, "build the artwork page")?;

        let mut layer = Layer::new();
        for element in placements {
            let asset = assets.get(element.logo_ref.as_str()).copied();
            let report = embedder.embed(
                &mut self.doc,
                &mut layer,
                &mut self.embedded,
                element,
                asset,
                self.template,
                color_model,
            );
            self.reports.push(report);
        }

        log::debug!(
            "{} placement(s) drawn from {} embedded object(s)",
            placements.len(),
            self.embedded.len()
        );

        let stream_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), layer.content()));
        let artwork = Artwork { stream_id, layer };

        let mut resources = Dictionary::new();
        let font_id = self.font_for(&artwork.layer);
        artwork.layer.add_resources(&mut resources, font_id);
        let page_id = self.add_page(vec![stream_id], resources);
        self.page_ids.push(page_id);

        self.artwork = Some(artwork);
        self.state = ComposerState::Page1Built;
        Ok(())
    }

    /// Emit the proof page: garment fill, shared artwork, labels.
    pub fn build_proof_page(&mut self, labels: &ProofLabels, draw_labels: bool) -> Result<()> {
        self.expect_state(ComposerState::Page1Built, "build the proof page")?;
        let artwork = self
            .artwork
            .take()
            .ok_or_else(|| ComposeError::FatalAssembly("artwork layer missing".to_string()))?;

        let (width, height) = page_size_pt(self.template);
        let mut background = Layer::new();
        background.push(format!(
            "q {} 0 0 {} {} re f Q\n",
            fill_operator(&labels.garment.value),
            fmt_num(width),
            fmt_num(height)
        ));
        let background_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), background.content()));

        let mut contents = vec![background_id, artwork.stream_id];

        let mut label_layer = Layer::new();
        if draw_labels {
            let text_color = label_color(&labels.garment);
            let lines = labels.lines();
            for (i, line) in lines.iter().enumerate() {
                let y = LABEL_BOTTOM + (lines.len() - 1 - i) as f32 * LABEL_LINE_HEIGHT;
                label_layer.text(line, LABEL_LEFT, y, LABEL_FONT_SIZE, text_color);
            }
            contents.push(
                self.doc
                    .add_object(Stream::new(Dictionary::new(), label_layer.content())),
            );
        }

        let mut resources = Dictionary::new();
        let artwork_font = self.font_for(&artwork.layer);
        artwork.layer.add_resources(&mut resources, artwork_font);
        let label_font = self.font_for(&label_layer);
        label_layer.add_resources(&mut resources, label_font);

        let page_id = self.add_page(contents, resources);
        self.page_ids.push(page_id);

        self.artwork = Some(artwork);
        self.state = ComposerState::Page2Built;
        Ok(())
    }

    /// Close the page tree and catalog.
    pub fn finalize(&mut self) -> Result<()> {
        self.expect_state(ComposerState::Page2Built, "finalize")?;

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", catalog_id);

        self.state = ComposerState::Finalized;
        Ok(())
    }

    /// Serialize the finished document.
    pub fn into_document(mut self) -> Result<ComposedDocument> {
        self.expect_state(ComposerState::Finalized, "emit bytes")?;
        self.doc.compress();
        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(ComposedDocument {
            bytes,
            reports: self.reports,
        })
    }

    fn font_for(&mut self, layer: &Layer) -> Option<ObjectId> {
        if !layer.uses_font() {
            return None;
        }
        let doc = &mut self.doc;
        Some(*self.font_id.get_or_insert_with(|| doc.add_object(helvetica())))
    }

    fn add_page(&mut self, contents: Vec<ObjectId>, resources: Dictionary) -> ObjectId {
        let (width, height) = page_size_pt(self.template);
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ]),
            ),
            (
                "Contents",
                Object::Array(contents.into_iter().map(Object::Reference).collect()),
            ),
            ("Resources", Object::Dictionary(resources)),
        ]);
        self.doc.add_object(page)
    }
}

/// Fill color operator for a device color
fn fill_operator(color: &DeviceColor) -> String {
    let operands: Vec<String> = color.components().into_iter().map(fmt_num).collect();
    let operator = match color.space() {
        ColorSpace::Cmyk => "k",
        ColorSpace::Rgb => "rg",
    };
    format!("{} {}", operands.join(" "), operator)
}

/// White text on dark garments, black otherwise
fn label_color(garment: &ColorSpec) -> [f32; 4] {
    let dark = match garment.value {
        DeviceColor::Cmyk(Cmyk { k, .. }) => k >= DARK_GARMENT_K,
        DeviceColor::Rgb(rgb) => {
            let luma = 0.299 * rgb.r as f32 + 0.587 * rgb.g as f32 + 0.114 * rgb.b as f32;
            luma < 128.0
        }
    };
    if dark {
        [0.0, 0.0, 0.0, 0.0]
    } else {
        [0.0, 0.0, 0.0, 1.0]
    }
}
