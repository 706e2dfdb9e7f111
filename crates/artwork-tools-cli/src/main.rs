use anyhow::{bail, Context, Result};
use artwork_compose::io::{save_document, save_reports, Job};
use artwork_compose::{
    builtin_templates, find_template, summarize, ArtworkRenderer, AssemblyOptions, Catalogs,
    ColorModel, DeviceColor, DocumentAssembler, ImpositionSpec, PdfiumRenderer, PlacedElement,
    ResvgRenderer, RsvgConvert,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "artp", about = "Print artwork composition CLI", version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose the print PDF for a job file
    Compose {
        /// Job file (JSON)
        #[arg(short, long)]
        job: PathBuf,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Write per-element fidelity reports to this JSON file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Assembly options (JSON)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Skip vector embedding and render everything
        #[arg(long)]
        no_vector: bool,

        /// Path to the rsvg-convert executable
        #[arg(long)]
        rsvg_convert: Option<PathBuf>,

        /// Directory containing the Pdfium library
        #[arg(long)]
        pdfium: Option<PathBuf>,
    },

    /// Show how a hex color maps to print CMYK
    Color {
        /// Hex color, e.g. #000080
        hex: String,

        /// Palette to match against
        #[arg(long, default_value = "ink", value_enum)]
        catalog: CatalogArg,
    },

    /// Preview an imposition grid on a built-in template
    Plan {
        /// Template id, e.g. dtf-A4
        #[arg(short, long)]
        template: String,

        /// Element width in mm
        #[arg(long)]
        width_mm: f32,

        /// Element height in mm
        #[arg(long)]
        height_mm: f32,

        #[arg(long, default_value = "1")]
        rows: u32,

        #[arg(long, default_value = "1")]
        columns: u32,

        /// Horizontal gap between cells in mm
        #[arg(long, default_value = "0")]
        h_spacing: f32,

        /// Vertical gap between cells in mm
        #[arg(long, default_value = "0")]
        v_spacing: f32,

        /// Center the grid on the template
        #[arg(long)]
        center: bool,
    },

    /// List the built-in templates
    Templates,
}

#[derive(Clone, Copy, ValueEnum)]
enum CatalogArg {
    Ink,
    Garment,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Commands::Compose {
            job,
            output,
            report,
            options,
            no_vector,
            rsvg_convert,
            pdfium,
        } => {
            let mut options = match options {
                Some(path) => AssemblyOptions::load(&path)
                    .await
                    .with_context(|| format!("loading options from {}", path.display()))?,
                None => AssemblyOptions::default(),
            };
            if no_vector {
                options.vector_embedding = false;
            }
            if let Some(path) = rsvg_convert {
                options.rsvg_convert_path = path;
            }
            if pdfium.is_some() {
                options.pdfium_library_dir = pdfium;
            }

            let job = Job::load(&job)
                .await
                .with_context(|| format!("loading job {}", job.display()))?;

            let assembler = DocumentAssembler::new(
                Catalogs::builtin(),
                Arc::new(RsvgConvert::new(options.rsvg_convert_path.clone())),
                Arc::new(ArtworkRenderer::new(
                    Arc::new(ResvgRenderer::new()),
                    Arc::new(PdfiumRenderer::new(options.pdfium_library_dir.clone())),
                )),
                options,
            );
            let document = assembler
                .assemble_async(job.project, job.placements, job.assets)
                .await?;

            save_document(&document, &output).await?;
            println!("Composed {} bytes → {}", document.bytes.len(), output.display());

            let summary = summarize(&document.reports);
            println!("Fidelity:");
            println!("  Vector: {}", summary.vector);
            println!("  Raster: {}", summary.raster);
            println!("  Placeholder: {}", summary.placeholder);
            for r in document.reports.iter().filter(|r| r.is_degraded()) {
                println!("  {} {:?}: {}", r.element_id, r.fidelity, r.detail);
            }
            if let Some(warning) = summary.warning() {
                println!("Warning: {}", warning);
            }

            if let Some(path) = report {
                save_reports(&document.reports, &path).await?;
                println!("Reports → {}", path.display());
            }
        }

        Commands::Color { hex, catalog } => {
            let catalogs = Catalogs::builtin();
            let model = ColorModel::new(&catalogs);
            let spec = match catalog {
                CatalogArg::Ink => model.resolve_ink(&hex)?,
                CatalogArg::Garment => model.resolve_garment(&hex)?,
            };
            match spec.value {
                DeviceColor::Cmyk(cmyk) => println!("{}: {}", spec.display_name(), cmyk),
                DeviceColor::Rgb(rgb) => println!("{}: {}", spec.display_name(), rgb.to_hex()),
            }
        }

        Commands::Plan {
            template,
            width_mm,
            height_mm,
            rows,
            columns,
            h_spacing,
            v_spacing,
            center,
        } => {
            let Some(template) = find_template(&template) else {
                bail!("Unknown template: {}", template);
            };
            let spec = ImpositionSpec {
                rows,
                columns,
                h_spacing_mm: h_spacing,
                v_spacing_mm: v_spacing,
                center_on_template: center,
            };
            let element = PlacedElement::new(
                "element",
                "preview",
                0.0,
                0.0,
                width_mm * template.pixel_width / template.width_mm,
                height_mm * template.pixel_height / template.height_mm,
            );

            let cells = artwork_compose::impose::plan(&element, &template, &spec)?;
            println!(
                "{} cells on {} ({}x{}mm):",
                cells.len(),
                template.id,
                template.width_mm,
                template.height_mm
            );
            for cell in &cells {
                let (x, y) = (
                    artwork_compose::units::mm_from_px_x(cell.x, &template),
                    artwork_compose::units::mm_from_px_y(cell.y, &template),
                );
                println!("  {} at {:.1}, {:.1} mm", cell.id, x, y);
            }
        }

        Commands::Templates => {
            for t in builtin_templates() {
                println!("{:<24} {:<28} {}x{}mm", t.id, t.name, t.width_mm, t.height_mm);
            }
        }
    }

    Ok(())
}
