//! Entry point: project + placements + assets in, document + reports out

use crate::color::{Catalogs, ColorModel};
use crate::compose::{PageComposer, ProofLabels};
use crate::embed::{AssetEmbedder, RasterRenderer, VectorConverter};
use crate::impose;
use crate::options::AssemblyOptions;
use crate::types::*;
use crate::units::element_size_mm;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds documents. Holds no per-document state, so one assembler can
/// serve many documents, including from several threads at once.
#[derive(Clone)]
pub struct DocumentAssembler {
    catalogs: Arc<Catalogs>,
    converter: Arc<dyn VectorConverter>,
    renderer: Arc<dyn RasterRenderer>,
    options: AssemblyOptions,
}

impl DocumentAssembler {
    pub fn new(
        catalogs: Catalogs,
        converter: Arc<dyn VectorConverter>,
        renderer: Arc<dyn RasterRenderer>,
        options: AssemblyOptions,
    ) -> Self {
        Self {
            catalogs: Arc::new(catalogs),
            converter,
            renderer,
            options,
        }
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    /// Compose the two-page document.
    ///
    /// Fails only on configuration problems or when the document itself
    /// cannot be produced. Per-element trouble is in the reports.
    pub fn assemble(
        &self,
        project: &Project,
        placements: &[PlacedElement],
        assets: &[LogoAsset],
    ) -> CompositionResult {
        self.options.validate()?;
        let template = &project.template;
        validate_template(template, self.options.aspect_tolerance)?;
        for element in placements {
            validate_element(element)?;
        }

        let expanded = impose::expand_all(placements, template)?;
        if expanded.len() > self.options.max_placements {
            return Err(ComposeError::Config(format!(
                "{} placements after imposition exceeds the limit of {}",
                expanded.len(),
                self.options.max_placements
            )));
        }

        let color_model = ColorModel::new(&self.catalogs);
        let garment = color_model.resolve_garment(&project.garment_color)?;
        let ink = project
            .ink_color
            .as_deref()
            .map(|hex| color_model.resolve_ink(hex))
            .transpose()?;

        log::info!(
            "Assembling {:?}: {} placement(s) on {} ({}x{}mm)",
            project.name,
            expanded.len(),
            template.id,
            template.width_mm,
            template.height_mm
        );

        let assets = index_assets(assets);
        let embedder = AssetEmbedder::new(
            self.converter.as_ref(),
            self.renderer.as_ref(),
            &self.options,
        );

        let mut composer = PageComposer::new(template);
        composer.build_artwork_page(&expanded, &assets, &embedder, &color_model)?;
        composer.build_proof_page(
            &ProofLabels {
                project_name: project.name.clone(),
                quantity: project.quantity,
                garment,
                ink,
            },
            self.options.draw_labels,
        )?;
        composer.finalize()?;
        let document = composer.into_document()?;

        let degraded = document.reports.iter().filter(|r| r.is_degraded()).count();
        log::info!(
            "Assembled {:?}: {} bytes, {} of {} element(s) degraded",
            project.name,
            document.bytes.len(),
            degraded,
            document.reports.len()
        );
        Ok(document)
    }

    /// [`assemble`](Self::assemble) on the blocking thread pool
    pub async fn assemble_async(
        &self,
        project: Project,
        placements: Vec<PlacedElement>,
        assets: Vec<LogoAsset>,
    ) -> CompositionResult {
        let assembler = self.clone();
        tokio::task::spawn_blocking(move || assembler.assemble(&project, &placements, &assets))
            .await?
    }
}

fn validate_template(template: &Template, tolerance: f32) -> Result<()> {
    if !template.has_positive_dimensions() {
        return Err(ComposeError::Config(format!(
            "Template {} must have positive dimensions, got {}x{}mm at {}x{}px",
            template.id,
            template.width_mm,
            template.height_mm,
            template.pixel_width,
            template.pixel_height
        )));
    }

    let mismatch = template.aspect_mismatch();
    if mismatch > tolerance {
        return Err(ComposeError::FatalAssembly(format!(
            "Template {} canvas aspect differs from its physical aspect by {:.2}% (limit {:.2}%)",
            template.id,
            mismatch * 100.0,
            tolerance * 100.0
        )));
    }
    Ok(())
}

fn validate_element(element: &PlacedElement) -> Result<()> {
    let finite = [element.x, element.y, element.width, element.height, element.rotation_degrees]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        return Err(ComposeError::Config(format!(
            "Element {} has a non-finite coordinate",
            element.id
        )));
    }
    if element.width <= 0.0 || element.height <= 0.0 {
        return Err(ComposeError::Config(format!(
            "Element {} must have positive size, got {}x{}px",
            element.id, element.width, element.height
        )));
    }
    if let Some(spec) = &element.imposition {
        impose::validate_spec(spec)?;
    }
    Ok(())
}

fn index_assets(assets: &[LogoAsset]) -> HashMap<&str, &LogoAsset> {
    let mut index = HashMap::with_capacity(assets.len());
    for asset in assets {
        if index.insert(asset.id.as_str(), asset).is_some() {
            log::warn!("Duplicate asset id {}, using the last one", asset.id);
        }
    }
    index
}

/// Physical size of every placement after imposition, in placement order
pub fn placement_sizes_mm(
    placements: &[PlacedElement],
    template: &Template,
) -> Result<Vec<(String, f32, f32)>> {
    let expanded = impose::expand_all(placements, template)?;
    Ok(expanded
        .iter()
        .map(|e| {
            let (w, h) = element_size_mm(e, template);
            (e.id.clone(), w, h)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::Unavailable;

    fn assembler() -> DocumentAssembler {
        let tool = Arc::new(Unavailable::new("not installed"));
        DocumentAssembler::new(
            Catalogs::builtin(),
            tool.clone(),
            tool,
            AssemblyOptions::default(),
        )
    }

    fn project(pixel_width: f32) -> Project {
        Project {
            name: "Test".to_string(),
            quantity: 1,
            template: Template {
                id: "a4".to_string(),
                name: "A4".to_string(),
                width_mm: 210.0,
                height_mm: 297.0,
                pixel_width,
                pixel_height: 594.0,
                group: "dtf".to_string(),
            },
            garment_color: "#000000".to_string(),
            ink_color: None,
        }
    }

    #[test]
    fn test_aspect_mismatch_is_fatal() {
        let err = assembler().assemble(&project(480.0), &[], &[]).unwrap_err();
        assert!(matches!(err, ComposeError::FatalAssembly(_)));
    }

    #[test]
    fn test_zero_template_is_config() {
        let mut p = project(420.0);
        p.template.height_mm = 0.0;
        let err = assembler().assemble(&p, &[], &[]).unwrap_err();
        assert!(matches!(err, ComposeError::Config(_)));
    }

    #[test]
    fn test_bad_garment_hex_is_config() {
        let mut p = project(420.0);
        p.garment_color = "black".to_string();
        let err = assembler().assemble(&p, &[], &[]).unwrap_err();
        assert!(matches!(err, ComposeError::Config(_)));
    }

    #[test]
    fn test_non_positive_element_is_config() {
        let element = PlacedElement::new("e", "logo", 0.0, 0.0, 0.0, 10.0);
        let err = assembler()
            .assemble(&project(420.0), &[element], &[])
            .unwrap_err();
        assert!(matches!(err, ComposeError::Config(_)));
    }

    #[test]
    fn test_placement_ceiling() {
        let mut element = PlacedElement::new("e", "logo", 0.0, 0.0, 10.0, 10.0);
        element.imposition = Some(ImpositionSpec {
            rows: 20,
            columns: 20,
            h_spacing_mm: 0.0,
            v_spacing_mm: 0.0,
            center_on_template: false,
        });
        let second = PlacedElement::new("f", "logo", 300.0, 500.0, 10.0, 10.0);
        let err = assembler()
            .assemble(&project(420.0), &[element, second], &[])
            .unwrap_err();
        match err {
            ComposeError::Config(msg) => assert!(msg.contains("401")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_assembler_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DocumentAssembler>();
    }
}
