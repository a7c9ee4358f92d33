//! Lowering of raw content-stream operations into [`PaintOp`]s.
//!
//! Only what the scanner needs survives: graphics-state save/restore,
//! matrix concatenation, marked-content scopes and image paints. Form
//! XObjects are expanded in place, wrapped in a save/restore pair with their
//! `/Matrix` applied.

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::content::{MarkedContentProps, PaintOp};
use crate::error::Result;
use crate::model::Matrix;

use super::backend::{
    decode_operations, decode_stream, get_number_from_value, ContentOp, PageId, PdfValue,
};

/// Lower one operation without consulting page resources.
///
/// `Do` is assumed to paint an image and named `BDC` property lists carry
/// no MCID; [`OperatorLowering`] refines both.
pub fn lower_simple(op: &ContentOp) -> PaintOp {
    let operands = &op.operands;
    match op.operator.as_str() {
        "q" => PaintOp::Save,
        "Q" => PaintOp::Restore,
        "cm" => {
            let values: Vec<f32> = operands.iter().filter_map(get_number_from_value).collect();
            match (operands.len(), Matrix::from_slice(&values)) {
                (6, Some(m)) => PaintOp::Concat(m),
                _ => {
                    log::debug!("Ignoring malformed cm operands {:?}", operands);
                    PaintOp::Other(op.operator.clone())
                }
            }
        }
        "BMC" => PaintOp::BeginMarkedContent {
            tag: operand_tag(operands),
        },
        "BDC" => PaintOp::BeginMarkedContentProps {
            tag: operand_tag(operands),
            props: operands
                .get(1)
                .map(props_from_inline)
                .unwrap_or_default(),
        },
        "EMC" => PaintOp::EndMarkedContent,
        "Do" => PaintOp::PaintImage {
            name: operands.first().and_then(name_string),
        },
        "BI" => PaintOp::PaintImage { name: None },
        other => PaintOp::Other(other.to_string()),
    }
}

fn name_string(value: &PdfValue) -> Option<String> {
    value
        .as_name()
        .map(|n| String::from_utf8_lossy(n).into_owned())
}

fn operand_tag(operands: &[PdfValue]) -> String {
    operands.first().and_then(name_string).unwrap_or_default()
}

fn props_from_inline(value: &PdfValue) -> MarkedContentProps {
    MarkedContentProps {
        mcid: value
            .dict_get(b"MCID")
            .and_then(PdfValue::as_i64)
            .and_then(|id| u32::try_from(id).ok()),
    }
}

fn props_from_dict(dict: &Dictionary) -> MarkedContentProps {
    MarkedContentProps {
        mcid: dict
            .get(b"MCID")
            .and_then(Object::as_i64)
            .ok()
            .and_then(|id| u32::try_from(id).ok()),
    }
}

/// Resource-aware lowering over a lopdf document.
pub struct OperatorLowering<'a> {
    doc: &'a Document,
    max_depth: usize,
}

impl<'a> OperatorLowering<'a> {
    pub fn new(doc: &'a Document, max_depth: usize) -> Self {
        Self { doc, max_depth }
    }

    /// Lower a page's decoded operations.
    pub fn lower_page(&self, page: PageId, ops: &[ContentOp]) -> Result<Vec<PaintOp>> {
        let resources = self.page_resources(page);
        let mut out = Vec::with_capacity(ops.len());
        let mut forms = Vec::new();
        self.lower_ops(ops, resources, 0, &mut forms, &mut out);
        Ok(out)
    }

    fn lower_ops(
        &self,
        ops: &[ContentOp],
        resources: Option<&'a Dictionary>,
        depth: usize,
        forms: &mut Vec<ObjectId>,
        out: &mut Vec<PaintOp>,
    ) {
        for op in ops {
            match op.operator.as_str() {
                "Do" => self.lower_do(op, resources, depth, forms, out),
                "BDC" => out.push(self.lower_bdc(op, resources)),
                _ => out.push(lower_simple(op)),
            }
        }
    }

    fn lower_bdc(&self, op: &ContentOp, resources: Option<&'a Dictionary>) -> PaintOp {
        let tag = operand_tag(&op.operands);
        let props = match op.operands.get(1) {
            Some(PdfValue::Name(name)) => self
                .lookup(resources, b"Properties", name)
                .map(props_from_dict)
                .unwrap_or_default(),
            Some(inline) => props_from_inline(inline),
            None => MarkedContentProps::default(),
        };
        PaintOp::BeginMarkedContentProps { tag, props }
    }

    fn lower_do(
        &self,
        op: &ContentOp,
        resources: Option<&'a Dictionary>,
        depth: usize,
        forms: &mut Vec<ObjectId>,
        out: &mut Vec<PaintOp>,
    ) {
        let Some(name) = op.operands.first().and_then(PdfValue::as_name) else {
            out.push(PaintOp::Other(op.operator.clone()));
            return;
        };
        let display = String::from_utf8_lossy(name).into_owned();

        let Some((id, stream)) = self.xobject(resources, name) else {
            log::debug!("XObject /{} not found in resources", display);
            out.push(PaintOp::Other(op.operator.clone()));
            return;
        };

        let subtype = stream
            .dict
            .get(b"Subtype")
            .and_then(Object::as_name)
            .unwrap_or(b"");

        match subtype {
            b"Image" => out.push(PaintOp::image(display)),
            b"Form" => self.expand_form(id, stream, &display, resources, depth, forms, out),
            _ => out.push(PaintOp::Other(op.operator.clone())),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_form(
        &self,
        id: Option<ObjectId>,
        stream: &'a lopdf::Stream,
        name: &str,
        parent: Option<&'a Dictionary>,
        depth: usize,
        forms: &mut Vec<ObjectId>,
        out: &mut Vec<PaintOp>,
    ) {
        if depth >= self.max_depth {
            log::warn!(
                "Form XObject /{} exceeds nesting limit {}; not expanded",
                name,
                self.max_depth
            );
            return;
        }
        if let Some(id) = id {
            if forms.contains(&id) {
                log::warn!("Form XObject /{} references itself; not expanded", name);
                return;
            }
        }

        let ops = match decode_stream(stream).and_then(|data| decode_operations(&data)) {
            Ok(ops) => ops,
            Err(e) => {
                log::warn!("Failed to decode Form XObject /{}: {}", name, e);
                return;
            }
        };

        let resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| self.resolve_dict(obj))
            .or(parent);

        out.push(PaintOp::Save);
        if let Some(matrix) = self.form_matrix(stream) {
            out.push(PaintOp::Concat(matrix));
        }

        if let Some(id) = id {
            forms.push(id);
        }
        self.lower_ops(&ops, resources, depth + 1, forms, out);
        if id.is_some() {
            forms.pop();
        }

        out.push(PaintOp::Restore);
    }

    fn form_matrix(&self, stream: &'a lopdf::Stream) -> Option<Matrix> {
        let values: Vec<f32> = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|obj| self.resolve(obj).as_array().ok())?
            .iter()
            .filter_map(|v| self.resolve(v).as_float().ok())
            .collect();
        let matrix = Matrix::from_slice(&values);
        if matrix.is_none() {
            log::debug!("Ignoring malformed form /Matrix {:?}", values);
        }
        matrix
    }

    /// Find `/XObject/<name>` and return it with its object id when indirect.
    fn xobject(
        &self,
        resources: Option<&'a Dictionary>,
        name: &[u8],
    ) -> Option<(Option<ObjectId>, &'a lopdf::Stream)> {
        let entry = resources?
            .get(b"XObject")
            .ok()
            .and_then(|obj| self.resolve_dict(obj))?
            .get(name)
            .ok()?;

        let id = entry.as_reference().ok();
        let stream = self.resolve(entry).as_stream().ok()?;
        Some((id, stream))
    }

    /// `resources[category][name]` as a dictionary.
    fn lookup(
        &self,
        resources: Option<&'a Dictionary>,
        category: &[u8],
        name: &[u8],
    ) -> Option<&'a Dictionary> {
        let category = resources?
            .get(category)
            .ok()
            .and_then(|obj| self.resolve_dict(obj))?;
        self.resolve_dict(category.get(name).ok()?)
    }

    /// Page `/Resources`, inherited through `/Parent` when absent.
    fn page_resources(&self, page: PageId) -> Option<&'a Dictionary> {
        let mut current = page;
        // Bounded walk over /Parent.
        for _ in 0..64 {
            let dict = self.doc.get_dictionary(current).ok()?;
            if let Ok(res) = dict.get(b"Resources") {
                return self.resolve_dict(res);
            }
            current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        }
        log::warn!("Page tree above {:?} is too deep or cyclic", page);
        None
    }

    fn resolve(&self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            _ => obj,
        }
    }

    fn resolve_dict(&self, obj: &'a Object) -> Option<&'a Dictionary> {
        self.resolve(obj).as_dict().ok()
    }
}
