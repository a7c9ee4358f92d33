//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for the page data the attribution engine
//! reads, isolating the concrete PDF library (lopdf) from the rest of the
//! crate.

use std::collections::BTreeMap;

use lopdf::{Document as LopdfDocument, Object, Stream};

use crate::content::PaintOp;
use crate::error::{Error, Result};
use crate::model::StructureNode;

use super::lowering::OperatorLowering;
use super::struct_tree::StructTreeReader;

pub use crate::resolve::PageId;

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Other,
}

impl PdfValue {
    /// Look up a key when this value is an inline dictionary.
    pub fn dict_get(&self, key: &[u8]) -> Option<&PdfValue> {
        match self {
            PdfValue::Dict(entries) => entries
                .iter()
                .find(|(k, _)| k.as_slice() == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            PdfValue::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PdfValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    pub fn new(operator: impl Into<String>, operands: Vec<PdfValue>) -> Self {
        Self {
            operator: operator.into(),
            operands,
        }
    }
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, content stream decoding, the
/// lowered paint-operator sequence and the per-page structure tree.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// The page's paint operators with Form XObjects expanded up to
    /// `max_form_depth` levels.
    fn page_operators(&self, page: PageId, max_form_depth: usize) -> Result<Vec<PaintOp>>;

    /// The logical structure restricted to one page, if the document is tagged.
    fn structure_tree(&self, page: PageId) -> Result<Option<StructureNode>>;
}

/// Simple text decoding for PDF text strings.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let utf16: Vec<u16> = body
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    // UTF-8, with or without BOM
    let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    if let Ok(s) = std::str::from_utf8(body) {
        return s.to_string();
    }

    // Fallback: Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// LopdfBackend: concrete implementation backed by lopdf
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path)?;
        Ok(Self::from_document(doc))
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self::from_document(doc))
    }

    /// Load from a reader.
    pub fn load_reader<R: std::io::Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load_bytes(&data)
    }

    /// Wrap an already loaded document.
    pub fn from_document(doc: LopdfDocument) -> Self {
        Self { doc }
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Check if the document is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    /// Whether the catalog has a `/StructTreeRoot`.
    pub fn is_tagged(&self) -> bool {
        StructTreeReader::root(&self.doc).is_some()
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;

        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            // A page without /Contents paints nothing.
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Reference(r) => match self.doc.get_object(*r)? {
                Object::Stream(s) => decode_stream(s),
                Object::Array(arr) => self.concat_streams(arr),
                _ => Err(Error::Corrupted("Invalid content stream".to_string())),
            },
            Object::Stream(s) => decode_stream(s),
            Object::Array(arr) => self.concat_streams(arr),
            _ => Err(Error::Corrupted("Invalid content stream".to_string())),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        decode_operations(data)
    }

    fn page_operators(&self, page: PageId, max_form_depth: usize) -> Result<Vec<PaintOp>> {
        let content = self.page_content(page)?;
        let ops = self.decode_content(&content)?;
        OperatorLowering::new(&self.doc, max_form_depth).lower_page(page, &ops)
    }

    fn structure_tree(&self, page: PageId) -> Result<Option<StructureNode>> {
        StructTreeReader::new(&self.doc).read_page(page)
    }
}

impl LopdfBackend {
    fn concat_streams(&self, parts: &[Object]) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        for obj in parts {
            let Ok(r) = obj.as_reference() else {
                continue;
            };
            match self.doc.get_object(r) {
                Ok(Object::Stream(s)) => match decode_stream(s) {
                    Ok(data) => {
                        content.extend_from_slice(&data);
                        content.push(b' ');
                    }
                    Err(e) => log::warn!("Skipping undecodable content stream {:?}: {}", r, e),
                },
                _ => log::warn!("Content entry {:?} is not a stream", r),
            }
        }
        Ok(content)
    }
}

/// Decode a stream's bytes, decompressing only when a filter is declared.
pub(crate) fn decode_stream(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| Error::Corrupted(format!("stream decompression failed: {}", e)))
    } else {
        Ok(stream.content.clone())
    }
}

/// Parse content stream bytes into backend-neutral operations.
///
/// Inline images are cut out before lopdf sees the stream, since its
/// decoder stops at the first `ID`. Each `BI ... ID ... EI` becomes a single
/// `BI` operation without operands.
pub(crate) fn decode_operations(data: &[u8]) -> Result<Vec<ContentOp>> {
    let mut ops = Vec::new();
    let mut cursor = 0;

    for span in inline_image_spans(data) {
        decode_segment(&data[cursor..span.start], &mut ops)?;
        ops.push(ContentOp::new("BI", Vec::new()));
        cursor = span.end;
    }
    decode_segment(&data[cursor..], &mut ops)?;

    Ok(ops)
}

fn decode_segment(data: &[u8], ops: &mut Vec<ContentOp>) -> Result<()> {
    if data.iter().all(|&b| is_whitespace(b)) {
        return Ok(());
    }
    let content =
        lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

    ops.extend(content.operations.into_iter().map(|op| ContentOp {
        operator: op.operator,
        operands: op.operands.iter().map(convert_object).collect(),
    }));
    Ok(())
}

/// Byte ranges covering each inline image, from `BI` through `EI`.
///
/// Strings, comments and names are stepped over so that `BI` only matches as
/// an operator.
fn inline_image_spans(data: &[u8]) -> Vec<std::ops::Range<usize>> {
    let mut spans = Vec::new();
    let mut i = 0;

    while i < data.len() {
        match data[i] {
            b if is_whitespace(b) => i += 1,
            b'%' => {
                while i < data.len() && !matches!(data[i], b'\r' | b'\n') {
                    i += 1;
                }
            }
            b'(' => i = skip_literal_string(data, i),
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'<' => {
                i = data[i..]
                    .iter()
                    .position(|&b| b == b'>')
                    .map_or(data.len(), |end| i + end + 1);
            }
            b'/' => i = skip_regular(data, i + 1),
            b if is_delimiter(b) => i += 1,
            _ => {
                let start = i;
                i = skip_regular(data, i);
                if &data[start..i] != b"BI" {
                    continue;
                }
                match inline_image_end(data, i) {
                    Some(end) => {
                        spans.push(start..end);
                        i = end;
                    }
                    None => {
                        log::warn!("Unterminated inline image at byte {}", start);
                        break;
                    }
                }
            }
        }
    }

    if !spans.is_empty() {
        log::trace!("Content stream has {} inline images", spans.len());
    }
    spans
}

/// End of the `EI` that closes an inline image whose dictionary starts at
/// `from`.
fn inline_image_end(data: &[u8], from: usize) -> Option<usize> {
    let id = (from..data.len().saturating_sub(2)).find(|&p| {
        is_whitespace(data[p - 1]) && &data[p..p + 2] == b"ID" && is_whitespace(data[p + 2])
    })?;

    // EI is preceded by whitespace and followed by whitespace, a delimiter
    // or the end of the stream.
    (id + 2..data.len().saturating_sub(2))
        .find(|&p| {
            is_whitespace(data[p])
                && &data[p + 1..p + 3] == b"EI"
                && data.get(p + 3).map_or(true, |&b| is_whitespace(b) || is_delimiter(b))
        })
        .map(|p| p + 3)
}

fn skip_literal_string(data: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    let mut i = open;
    while i < data.len() {
        match data[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    data.len()
}

fn skip_regular(data: &[u8], mut i: usize) -> usize {
    while i < data.len() && !is_whitespace(data[i]) && !is_delimiter(data[i]) {
        i += 1;
    }
    i
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x0C' | b'\0')
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        Object::Dictionary(dict) => PdfValue::Dict(
            dict.iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        _ => PdfValue::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_simple_utf8() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
        assert_eq!(decode_text_simple(b"\xEF\xBB\xBFBOM"), "BOM");
    }

    #[test]
    fn test_decode_text_simple_latin1() {
        let bytes = vec![0x43, 0x61, 0x66, 0xE9];
        assert_eq!(decode_text_simple(&bytes), "Café");
    }

    #[test]
    fn test_decode_text_simple_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_simple(&bytes), "Hi");
    }

    #[test]
    fn test_get_number_from_value() {
        assert_eq!(get_number_from_value(&PdfValue::Integer(42)), Some(42.0));
        assert_eq!(get_number_from_value(&PdfValue::Real(1.5)), Some(1.5));
        assert_eq!(get_number_from_value(&PdfValue::Other), None);
    }

    #[test]
    fn test_decode_operations_inline_image_keeps_following_ops() {
        let ops = decode_operations(
            b"q 10 0 0 10 0 0 cm BI /W 1 /H 1 /BPC 8 /CS /G /F /AHx ID 00> EI Q \
              q 5 0 0 5 0 0 cm /Im0 Do Q",
        )
        .unwrap();
        let names: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(names, vec!["q", "cm", "BI", "Q", "q", "cm", "Do", "Q"]);
        assert!(ops[2].operands.is_empty());
        assert_eq!(ops[6].operands[0].as_name(), Some(&b"Im0"[..]));
    }

    #[test]
    fn test_inline_image_binary_data() {
        // Raw bytes containing "EI" without surrounding whitespace and a
        // stray "BI" inside a string must not confuse the splitter.
        let mut data = b"(BI) Tj BI /W 2 /H 1 /BPC 8 /CS /G ID ".to_vec();
        data.extend_from_slice(b"xEIy\xff");
        data.extend_from_slice(b" EI/Im1 Do");

        let spans = inline_image_spans(&data);
        assert_eq!(spans.len(), 1);
        assert_eq!(&data[spans[0].clone()][..2], b"BI");
        assert!(data[spans[0].clone()].ends_with(b" EI"));

        let ops = decode_operations(&data).unwrap();
        let names: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(names, vec!["Tj", "BI", "Do"]);
    }

    #[test]
    fn test_names_and_comments_are_not_inline_images() {
        assert!(inline_image_spans(b"/BI Do % BI ID EI\n/Im0 Do").is_empty());
    }

    #[test]
    fn test_decode_operations_inline_properties() {
        let ops = decode_operations(b"/Figure <</MCID 4>> BDC q 10 0 0 10 5 5 cm /Im0 Do Q EMC")
            .unwrap();
        let names: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(names, vec!["BDC", "q", "cm", "Do", "Q", "EMC"]);
        assert_eq!(ops[0].operands[0].as_name(), Some(&b"Figure"[..]));
        assert_eq!(
            ops[0].operands[1].dict_get(b"MCID").and_then(PdfValue::as_i64),
            Some(4)
        );
    }
}
