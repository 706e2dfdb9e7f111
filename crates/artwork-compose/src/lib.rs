mod assemble;
pub mod color;
mod compose;
pub mod constants;
pub mod embed;
pub mod impose;
#[cfg(feature = "serde")]
pub mod io;
mod options;
pub mod render;
mod stats;
pub mod templates;
mod types;
pub mod units;

pub use assemble::{placement_sizes_mm, DocumentAssembler};
pub use color::{Catalogs, Cmyk, ColorModel, ColorPolicy, Rgb, SourceColor};
pub use compose::{ComposerState, PageComposer, ProofLabels};
pub use embed::{
    ArtworkRenderer, RasterRenderer, ResvgRenderer, RsvgConvert, Unavailable, VectorConverter,
};
#[cfg(feature = "pdfium")]
pub use embed::PdfiumRenderer;
pub use impose::ImpositionError;
pub use options::*;
pub use stats::{summarize, FidelitySummary};
pub use templates::{builtin_templates, find_template};
pub use types::*;
