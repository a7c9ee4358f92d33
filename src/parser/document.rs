//! A loaded PDF with an attached attribution engine.

use std::io::Read;
use std::path::Path;

use rayon::prelude::*;

use crate::content::PaintOp;
use crate::detect::{detect_format_from_bytes, detect_format_from_path};
use crate::error::{Error, Result};
use crate::model::{PageAltText, StructureNode};
use crate::resolve::{AltTextEngine, PageHandle};

use super::backend::{LopdfBackend, PageId, PdfBackend};
use super::options::{ErrorMode, ParseOptions};

/// A PDF document ready for alt-text resolution.
///
/// Results are cached per page for as long as the document lives.
pub struct AltTextDocument {
    backend: LopdfBackend,
    options: ParseOptions,
    engine: AltTextEngine,
}

impl AltTextDocument {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        detect_format_from_path(path)?;
        Ok(Self::with_backend(LopdfBackend::load_file(path)?, options))
    }

    /// Load a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Load a PDF from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        detect_format_from_bytes(data)?;
        Ok(Self::with_backend(LopdfBackend::load_bytes(data)?, options))
    }

    /// Load a PDF from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, ParseOptions::default())
    }

    /// Load a PDF from a reader with custom options.
    pub fn from_reader_with_options<R: Read>(mut reader: R, options: ParseOptions) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes_with_options(&data, options)
    }

    fn with_backend(backend: LopdfBackend, options: ParseOptions) -> Self {
        if backend.is_encrypted() {
            log::warn!("Document is encrypted; structure and content may be unreadable");
        }
        let engine = AltTextEngine::with_options(options.resolve.clone());
        Self {
            backend,
            options,
            engine,
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn engine(&self) -> &AltTextEngine {
        &self.engine
    }

    pub fn backend(&self) -> &LopdfBackend {
        &self.backend
    }

    pub fn page_count(&self) -> u32 {
        self.backend.pages().len() as u32
    }

    pub fn version(&self) -> String {
        self.backend.version()
    }

    pub fn is_encrypted(&self) -> bool {
        self.backend.is_encrypted()
    }

    /// Whether the document carries a logical structure tree.
    pub fn is_tagged(&self) -> bool {
        self.backend.is_tagged()
    }

    fn page_id(&self, number: u32) -> Result<PageId> {
        let pages = self.backend.pages();
        pages
            .get(&number)
            .copied()
            .ok_or(Error::PageOutOfRange(number, pages.len() as u32))
    }

    /// Page handle for a 1-indexed page number.
    pub fn page(&self, number: u32) -> Result<LopdfPage<'_>> {
        Ok(LopdfPage {
            backend: &self.backend,
            id: self.page_id(number)?,
            number,
            max_form_depth: self.options.max_form_depth,
        })
    }

    /// The structure tree of one page, as the engine sees it.
    pub fn structure_tree(&self, number: u32) -> Result<Option<StructureNode>> {
        self.backend.structure_tree(self.page_id(number)?)
    }

    /// Resolve one page with the configured fallback mode.
    pub fn resolve_page(&self, number: u32) -> Result<PageAltText> {
        let page = self.page(number)?;
        let results = self.engine.resolve(&page);
        Ok(PageAltText::new(number, results.to_vec()))
    }

    /// Resolve every selected page, in page order.
    ///
    /// Page inputs are read up front. An unreadable page is logged and
    /// treated as untagged, matching [`resolve_page`](Self::resolve_page);
    /// with [`ErrorMode::Strict`] it aborts the run instead.
    pub fn resolve_all(&self) -> Result<Vec<PageAltText>> {
        let mode = self.engine.options().fallback_mode;
        let mut inputs = Vec::new();

        for (number, id) in self.backend.pages() {
            if !self.options.pages.includes(number) {
                continue;
            }
            if self.engine.cached(id, mode).is_some() {
                inputs.push(PageInput::cached(number, id));
                continue;
            }
            match self.load_page(id) {
                Ok((tree, ops)) => inputs.push(PageInput::loaded(number, id, tree, ops)),
                Err(e) if self.options.error_mode == ErrorMode::Strict => return Err(e),
                Err(e) => {
                    log::warn!("Skipping unreadable page {}: {}", number, e);
                    inputs.push(PageInput::loaded(number, id, None, Vec::new()));
                }
            }
        }

        log::debug!(
            "Resolving {} pages ({})",
            inputs.len(),
            if self.options.parallel { "parallel" } else { "sequential" }
        );

        let engine = &self.engine;
        let resolve = |input: PageInput| {
            let results = engine.resolve_prefetched(input.id, mode, input.tree.as_ref(), &input.ops);
            PageAltText::new(input.number, results.to_vec())
        };

        let pages = if self.options.parallel {
            inputs.into_par_iter().map(resolve).collect()
        } else {
            inputs.into_iter().map(resolve).collect()
        };
        Ok(pages)
    }

    /// Structure tree and paint operators; operators are skipped for
    /// untagged pages since nothing can be attributed there.
    fn load_page(&self, id: PageId) -> Result<(Option<StructureNode>, Vec<PaintOp>)> {
        let tree = self.backend.structure_tree(id)?;
        let ops = match tree {
            Some(_) => self
                .backend
                .page_operators(id, self.options.max_form_depth)?,
            None => Vec::new(),
        };
        Ok((tree, ops))
    }

    /// Drop cached results for a page.
    pub fn release_page(&self, number: u32) -> Result<()> {
        self.engine.release_page(self.page_id(number)?);
        Ok(())
    }
}

struct PageInput {
    number: u32,
    id: PageId,
    tree: Option<StructureNode>,
    ops: Vec<PaintOp>,
}

impl PageInput {
    fn cached(number: u32, id: PageId) -> Self {
        Self::loaded(number, id, None, Vec::new())
    }

    fn loaded(number: u32, id: PageId, tree: Option<StructureNode>, ops: Vec<PaintOp>) -> Self {
        Self {
            number,
            id,
            tree,
            ops,
        }
    }
}

/// [`PageHandle`] over one page of a lopdf-backed document.
#[derive(Clone, Copy)]
pub struct LopdfPage<'a> {
    backend: &'a LopdfBackend,
    id: PageId,
    number: u32,
    max_form_depth: usize,
}

impl LopdfPage<'_> {
    /// 1-indexed page number.
    pub fn number(&self) -> u32 {
        self.number
    }
}

impl PageHandle for LopdfPage<'_> {
    fn page_id(&self) -> PageId {
        self.id
    }

    fn structure_tree(&self) -> Result<Option<StructureNode>> {
        self.backend.structure_tree(self.id)
    }

    fn operator_sequence(&self) -> Result<Vec<PaintOp>> {
        self.backend.page_operators(self.id, self.max_form_depth)
    }
}

impl std::fmt::Debug for AltTextDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AltTextDocument")
            .field("version", &self.version())
            .field("pages", &self.page_count())
            .field("options", &self.options)
            .finish()
    }
}
