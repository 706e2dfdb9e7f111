//! Content stream builder shared by the page composer and the embedder

use crate::constants::LABEL_FONT_RESOURCE;
use crate::units::{fmt_num, Matrix};
use lopdf::{Dictionary, Object, ObjectId};
use std::collections::BTreeMap;

/// Operators for one content stream plus the resources they reference.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    ops: Vec<String>,
    xobjects: BTreeMap<String, ObjectId>,
    uses_font: bool,
}

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: impl Into<String>) {
        self.ops.push(op.into());
    }

    /// Register an XObject and return the resource name it is drawn by.
    /// An object registered before keeps its first name.
    pub fn add_xobject(&mut self, prefix: &str, id: ObjectId) -> String {
        if let Some((name, _)) = self.xobjects.iter().find(|(_, existing)| **existing == id) {
            return name.clone();
        }
        let name = format!("{}{}", prefix, self.xobjects.len() + 1);
        self.xobjects.insert(name.clone(), id);
        name
    }

    /// `q <matrix> cm /<name> Do Q`
    pub fn draw_xobject(&mut self, name: &str, matrix: &Matrix) {
        self.ops
            .push(format!("q {} cm /{} Do Q\n", matrix.to_operands(), name));
    }

    /// Show `text` in Helvetica at `(x, y)` with a CMYK fill
    pub fn text(&mut self, text: &str, x: f32, y: f32, size: f32, cmyk: [f32; 4]) {
        self.uses_font = true;
        self.ops.push(format!(
            "BT {} {} {} {} k /{} {} Tf {} {} Td ({}) Tj ET\n",
            fmt_num(cmyk[0]),
            fmt_num(cmyk[1]),
            fmt_num(cmyk[2]),
            fmt_num(cmyk[3]),
            LABEL_FONT_RESOURCE,
            fmt_num(size),
            fmt_num(x),
            fmt_num(y),
            escape_text(text)
        ));
    }

    pub fn uses_font(&self) -> bool {
        self.uses_font
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn content(&self) -> Vec<u8> {
        self.ops.concat().into_bytes()
    }

    /// Merge this layer's resource names into a page resource dictionary
    pub fn add_resources(&self, resources: &mut Dictionary, font_id: Option<ObjectId>) {
        if !self.xobjects.is_empty() {
            let mut xobjects = match resources.get(b"XObject") {
                Ok(Object::Dictionary(existing)) => existing.clone(),
                _ => Dictionary::new(),
            };
            for (name, id) in &self.xobjects {
                xobjects.set(name.as_bytes(), Object::Reference(*id));
            }
            resources.set("XObject", Object::Dictionary(xobjects));
        }

        if let (true, Some(font_id)) = (self.uses_font, font_id) {
            let mut fonts = Dictionary::new();
            fonts.set(LABEL_FONT_RESOURCE, Object::Reference(font_id));
            resources.set("Font", Object::Dictionary(fonts));
        }
    }
}

/// Literal string body for Helvetica with WinAnsiEncoding
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            ' '..='~' => escaped.push(ch),
            _ => escaped.push('?'),
        }
    }
    escaped
}

/// Standard 14 Helvetica
pub fn helvetica() -> Dictionary {
    Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ])
}
