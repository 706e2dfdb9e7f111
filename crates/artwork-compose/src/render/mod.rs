//! PDF object construction for composed pages
//!
//! This module handles all PDF-specific operations:
//! - Importing vector artwork as Form XObjects
//! - Embedding raster artwork as image XObjects
//! - Rewriting content stream colors
//! - Collecting page content and resources

mod layer;
mod raster;
mod recolor;
mod xobject;

pub use layer::{helvetica, Layer};
pub use raster::{add_raster_image, detect_color_space, ImageXObject};
pub use recolor::recolor_content;
pub use xobject::{import_first_page, FormXObject};
