//! Form XObjects imported from vector PDF artwork
//!
//! The first page of a source PDF becomes a Form XObject in the output
//! document. Its resources are deep-copied and every content stream it
//! draws (the page itself and nested forms) is recolored through the
//! placement's [`ColorPlan`].

use super::recolor::{extract_number, recolor_content};
use crate::color::ColorPlan;
use crate::types::{ComposeError, Result};
use crate::units::{Matrix, Rect};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// US Letter, used when a page has no MediaBox anywhere in its tree
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// How far up the page tree to look for inherited attributes
const MAX_INHERITANCE_DEPTH: usize = 32;

/// An imported page ready to be drawn with `Do`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormXObject {
    pub id: ObjectId,
    /// `[llx lly urx ury]`
    pub bbox: [f32; 4],
}

impl FormXObject {
    pub fn width(&self) -> f32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> f32 {
        self.bbox[3] - self.bbox[1]
    }

    /// Matrix that stretches the form's bounding box onto `rect`.
    pub fn fit_matrix(&self, rect: &Rect, rotation_degrees: f32) -> Matrix {
        let width = self.width().abs().max(f32::EPSILON);
        let height = self.height().abs().max(f32::EPSILON);
        Matrix::translate(-self.bbox[0], -self.bbox[1])
            .then(&Matrix::scale(rect.width / width, rect.height / height))
            .then(&Matrix::placement(rect, rotation_degrees))
    }
}

/// Import page one of `pdf_bytes` into `output`.
pub fn import_first_page(
    output: &mut Document,
    pdf_bytes: &[u8],
    plan: &mut ColorPlan,
) -> Result<FormXObject> {
    let source = Document::load_mem(pdf_bytes)?;
    let page_id = source
        .get_pages()
        .into_values()
        .next()
        .ok_or_else(|| ComposeError::tool("pdf import", "document has no pages"))?;

    let mut cache = HashMap::new();
    create_page_xobject(output, &source, page_id, plan, &mut cache)
}

fn create_page_xobject(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    plan: &mut ColorPlan,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<FormXObject> {
    let page_dict = source.get_dictionary(page_id)?;

    let bbox = inherited(source, page_dict, b"CropBox")
        .or_else(|| inherited(source, page_dict, b"MediaBox"))
        .and_then(|obj| rect_numbers(source, obj))
        .unwrap_or(DEFAULT_MEDIA_BOX);

    let content = recolor_content(&get_page_content(source, page_dict)?, plan)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("FormType", Object::Integer(1));
    xobject_dict.set("BBox", Object::Array(bbox.iter().map(|v| Object::Real(*v)).collect()));

    if let Some(resources) = inherited(source, page_dict, b"Resources") {
        xobject_dict.set("Resources", copy_object_deep(output, source, resources, plan, cache)?);
    }

    let id = output.add_object(Stream::new(xobject_dict, content));
    Ok(FormXObject { id, bbox })
}

/// Look up a page attribute, walking `Parent` links for inherited ones
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut dict = page;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn rect_numbers(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let array = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?,
        other => other.as_array().ok()?,
    };
    let values: Vec<f32> = array.iter().filter_map(extract_number).collect();
    let [x0, y0, x1, y1]: [f32; 4] = values.try_into().ok()?;
    Some([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)])
}

/// Decoded content of a page, concatenating multiple streams
fn get_page_content(doc: &Document, page_dict: &Dictionary) -> Result<Vec<u8>> {
    let contents = match page_dict.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(Vec::new()),
    };

    let ids: Vec<ObjectId> = match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(arr) => arr.iter().filter_map(|o| o.as_reference().ok()).collect(),
            _ => vec![*id],
        },
        Object::Array(arr) => arr.iter().filter_map(|o| o.as_reference().ok()).collect(),
        _ => Vec::new(),
    };

    let mut result = Vec::new();
    for id in ids {
        if let Ok(stream) = doc.get_object(id)?.as_stream() {
            let content = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            result.extend_from_slice(&content);
            result.push(b'\n');
        }
    }
    Ok(result)
}

fn is_form(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Form")
}

/// Deep copy an object into `output`, following references.
///
/// Copied references are cached so shared objects stay shared. Nested form
/// streams are decoded and recolored on the way through.
fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    plan: &mut ColorPlan,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }
            // Reserve the id first so reference cycles terminate
            let new_id = output.new_object_id();
            cache.insert(*id, new_id);

            let referenced = source.get_object(*id)?;
            let copied = copy_object_deep(output, source, referenced, plan, cache)?;
            output.objects.insert(new_id, copied);
            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, plan, cache)?);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(arr) => {
            let mut new_arr = Vec::with_capacity(arr.len());
            for item in arr {
                new_arr.push(copy_object_deep(output, source, item, plan, cache)?);
            }
            Ok(Object::Array(new_arr))
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), copy_object_deep(output, source, value, plan, cache)?);
            }

            if is_form(&stream.dict) {
                let decoded = if stream.dict.has(b"Filter") {
                    stream.decompressed_content().ok()
                } else {
                    Some(stream.content.clone())
                };
                if let Some(decoded) = decoded {
                    new_dict.remove(b"Filter");
                    new_dict.remove(b"DecodeParms");
                    let content = recolor_content(&decoded, plan)?;
                    return Ok(Object::Stream(Stream::new(new_dict, content)));
                }
            }

            Ok(Object::Stream(
                Stream::new(new_dict, stream.content.clone())
                    .with_compression(stream.allows_compression),
            ))
        }
        _ => Ok(obj.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Catalogs, ColorModel};
    use crate::types::{LogoAsset, MimeKind};
    use lopdf::content::Content;
    use std::collections::BTreeMap;

    fn single_page_pdf(content: &[u8], media_box: [i64; 4]) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.to_vec()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(Dictionary::new())),
        ]));
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
                (
                    "MediaBox",
                    Object::Array(media_box.iter().map(|v| Object::Integer(*v)).collect()),
                ),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn vector_plan(catalogs: &Catalogs) -> ColorPlan {
        let asset = LogoAsset::new("logo", "logo.pdf", MimeKind::VectorPdf, Vec::new());
        ColorModel::new(catalogs).plan_for(&asset, &BTreeMap::new())
    }

    #[test]
    fn test_import_uses_inherited_media_box() {
        let catalogs = Catalogs::builtin();
        let mut plan = vector_plan(&catalogs);
        let bytes = single_page_pdf(b"0 0 1 rg 0 0 100 50 re f", [0, 0, 200, 100]);

        let mut output = Document::with_version("1.7");
        let form = import_first_page(&mut output, &bytes, &mut plan).unwrap();
        assert_eq!(form.bbox, [0.0, 0.0, 200.0, 100.0]);

        let stream = output.get_object(form.id).unwrap().as_stream().unwrap();
        let content = Content::decode(&stream.content).unwrap();
        assert_eq!(content.operations[0].operator, "k");
    }

    #[test]
    fn test_fit_matrix_maps_bbox_onto_rect() {
        let form = FormXObject {
            id: (1, 0),
            bbox: [10.0, 10.0, 110.0, 60.0],
        };
        let rect = Rect::new(0.0, 0.0, 200.0, 100.0);
        let m = form.fit_matrix(&rect, 0.0);
        assert_eq!(m.apply(10.0, 10.0), (0.0, 0.0));
        assert_eq!(m.apply(110.0, 60.0), (200.0, 100.0));
    }

    #[test]
    fn test_garbage_is_an_error() {
        let catalogs = Catalogs::builtin();
        let mut plan = vector_plan(&catalogs);
        let mut output = Document::with_version("1.7");
        assert!(import_first_page(&mut output, b"not a pdf", &mut plan).is_err());
    }
}
