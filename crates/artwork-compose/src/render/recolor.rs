//! Content stream color rewriting
//!
//! Walks the operators of a content stream and swaps device color operands
//! according to a [`ColorPlan`]. Only the DeviceRGB, DeviceCMYK and
//! DeviceGray operators are touched; named and ICC-based color spaces stay
//! as authored. Overrides are looked up by the operator's exact tokens
//! before any value-based conversion.

use crate::color::{ColorPlan, ColorPolicy, Operand, SourceColor};
use crate::types::{DeviceColor, Result};
use lopdf::content::{Content, Operation};
use lopdf::Object;

/// Current color space of one side (fill or stroke) of the graphics state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Space {
    #[default]
    Gray,
    Rgb,
    Cmyk,
    /// Anything selected by name other than the device spaces
    Other,
}

impl Space {
    fn of(color: DeviceColor) -> Self {
        match color {
            DeviceColor::Rgb(_) => Space::Rgb,
            DeviceColor::Cmyk(_) => Space::Cmyk,
        }
    }

    fn from_name(name: &[u8]) -> Self {
        match name {
            b"DeviceGray" => Space::Gray,
            b"DeviceRGB" => Space::Rgb,
            b"DeviceCMYK" => Space::Cmyk,
            _ => Space::Other,
        }
    }

    fn name(&self) -> Option<&'static str> {
        match self {
            Space::Gray => Some("DeviceGray"),
            Space::Rgb => Some("DeviceRGB"),
            Space::Cmyk => Some("DeviceCMYK"),
            Space::Other => None,
        }
    }
}

/// Space as authored and space as written to the output
#[derive(Debug, Clone, Copy, Default)]
struct Side {
    authored: Space,
    emitted: Space,
}

#[derive(Debug, Clone, Copy, Default)]
struct Spaces {
    fill: Side,
    stroke: Side,
}

impl Spaces {
    fn side(&mut self, stroke: bool) -> &mut Side {
        if stroke { &mut self.stroke } else { &mut self.fill }
    }
}

pub fn recolor_content(content: &[u8], plan: &mut ColorPlan) -> Result<Vec<u8>> {
    if plan.policy() == ColorPolicy::PreserveRaster {
        return Ok(content.to_vec());
    }

    let decoded = Content::decode(content)?;
    let mut out: Vec<Operation> = Vec::with_capacity(decoded.operations.len());
    let mut spaces = Spaces::default();
    let mut saved: Vec<Spaces> = Vec::new();
    let mut rewritten = 0usize;

    for op in decoded.operations {
        let stroke = op.operator.starts_with(|ch: char| ch.is_ascii_uppercase());
        match op.operator.as_str() {
            "q" => {
                saved.push(spaces);
                out.push(op);
            }
            "Q" => {
                spaces = saved.pop().unwrap_or_default();
                out.push(op);
            }
            "rg" | "RG" | "k" | "K" | "g" | "G" => {
                let authored = match op.operator.as_str() {
                    "rg" | "RG" => Space::Rgb,
                    "k" | "K" => Space::Cmyk,
                    _ => Space::Gray,
                };
                let side = spaces.side(stroke);
                side.authored = authored;
                match resolve_operation(&op, authored, plan) {
                    Some(color) => {
                        side.emitted = Space::of(color);
                        out.push(color_operation(color, stroke));
                        rewritten += 1;
                    }
                    None => {
                        side.emitted = authored;
                        out.push(op);
                    }
                }
            }
            "cs" | "CS" => {
                let space = match op.operands.first() {
                    Some(Object::Name(name)) => Space::from_name(name),
                    _ => Space::Other,
                };
                *spaces.side(stroke) = Side {
                    authored: space,
                    emitted: space,
                };
                out.push(op);
            }
            "sc" | "scn" | "SC" | "SCN" => {
                let side = spaces.side(stroke);
                let resolved = resolve_operation(&op, side.authored, plan);
                // The output space follows whichever operands are written
                let (target, op) = match resolved {
                    Some(color) => {
                        rewritten += 1;
                        let op = Operation::new(&op.operator, operands(color.components()));
                        (Space::of(color), op)
                    }
                    None => (side.authored, op),
                };
                if side.emitted != target {
                    if let Some(name) = target.name() {
                        out.push(select_space(name, stroke));
                        side.emitted = target;
                    }
                }
                out.push(op);
            }
            _ => out.push(op),
        }
    }

    log::debug!("Rewrote {} color operator(s)", rewritten);
    Ok(Content { operations: out }.encode()?)
}

/// Override by exact spelling first, then the plan's value conversion
fn resolve_operation(op: &Operation, space: Space, plan: &mut ColorPlan) -> Option<DeviceColor> {
    if space == Space::Other {
        return None;
    }
    let tokens = op
        .operands
        .iter()
        .map(operand)
        .collect::<Option<Vec<Operand>>>()?;
    if let Some(device) = plan.override_for(&op.operator, &tokens) {
        return Some(device);
    }

    let values: Vec<f32> = tokens.iter().map(Operand::value).collect();
    let source = match (space, values.as_slice()) {
        (Space::Rgb, [r, g, b]) => SourceColor::from_rgb_fractions(*r, *g, *b),
        (Space::Cmyk, [c, m, y, k]) => SourceColor::from_cmyk_fractions(*c, *m, *y, *k),
        (Space::Gray, [v]) => SourceColor::from_gray_fraction(*v),
        _ => None,
    }?;
    plan.resolve(source)
}

fn operand(obj: &Object) -> Option<Operand> {
    match obj {
        Object::Integer(i) => Some(Operand::Integer(*i)),
        Object::Real(r) => Some(Operand::Real(*r)),
        _ => None,
    }
}

fn select_space(name: &str, stroke: bool) -> Operation {
    let operator = if stroke { "CS" } else { "cs" };
    Operation::new(operator, vec![Object::Name(name.as_bytes().to_vec())])
}

fn color_operation(color: DeviceColor, stroke: bool) -> Operation {
    let operator = match (color, stroke) {
        (DeviceColor::Cmyk(_), false) => "k",
        (DeviceColor::Cmyk(_), true) => "K",
        (DeviceColor::Rgb(_), false) => "rg",
        (DeviceColor::Rgb(_), true) => "RG",
    };
    Operation::new(operator, operands(color.components()))
}

fn operands(components: Vec<f32>) -> Vec<Object> {
    components.into_iter().map(Object::Real).collect()
}

pub(crate) fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
