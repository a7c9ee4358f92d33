//! Reads the tagged-PDF logical structure (`/StructTreeRoot`) for one page.
//!
//! The tree is flattened into an arena while reading so that arbitrarily deep
//! or cyclic documents are handled without recursion, then reassembled
//! bottom-up with everything that lives on other pages pruned away.

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::model::{StructChild, StructRole, StructureNode};

use super::backend::{decode_text_simple, PageId};

/// Steps followed through `/RoleMap` before giving up on a custom role.
const MAX_ROLE_MAP_STEPS: usize = 16;

struct Pending {
    role: StructRole,
    bbox: Option<Vec<f32>>,
    alt: Option<String>,
    page: Option<ObjectId>,
    kids: Vec<PendingKid>,
}

impl Pending {
    fn placeholder() -> Self {
        Self {
            role: StructRole::Other(String::new()),
            bbox: None,
            alt: None,
            page: None,
            kids: Vec::new(),
        }
    }
}

enum PendingKid {
    Node(usize),
    Mcid(u32, Option<ObjectId>),
}

/// Structure-tree reader bound to one document.
pub struct StructTreeReader<'a> {
    doc: &'a Document,
    role_map: HashMap<Vec<u8>, Vec<u8>>,
    single_page: bool,
}

impl<'a> StructTreeReader<'a> {
    pub fn new(doc: &'a Document) -> Self {
        let role_map = Self::root(doc)
            .and_then(|root| root.get(b"RoleMap").ok())
            .and_then(|obj| resolve(doc, obj).as_dict().ok())
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_name().ok()?.to_vec())))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            doc,
            role_map,
            single_page: doc.get_pages().len() == 1,
        }
    }

    /// The catalog's `/StructTreeRoot`, if present and a dictionary.
    pub fn root(doc: &Document) -> Option<&Dictionary> {
        let catalog = doc
            .trailer
            .get(b"Root")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_dict().ok())?;
        let root = catalog.get(b"StructTreeRoot").ok()?;
        resolve(doc, root).as_dict().ok()
    }

    /// The structure tree restricted to `page`, or `None` for untagged
    /// documents.
    pub fn read_page(&self, page: PageId) -> Result<Option<StructureNode>> {
        let catalog = self
            .doc
            .trailer
            .get(b"Root")
            .ok()
            .and_then(|obj| resolve(self.doc, obj).as_dict().ok())
            .ok_or_else(|| Error::MissingObject("document catalog".to_string()))?;

        let root_obj = match catalog.get(b"StructTreeRoot") {
            Ok(obj) => obj,
            Err(_) => return Ok(None),
        };
        let root = resolve(self.doc, root_obj)
            .as_dict()
            .map_err(|_| Error::Corrupted("/StructTreeRoot is not a dictionary".to_string()))?;

        let mut arena = vec![Pending {
            role: StructRole::Other("StructTreeRoot".to_string()),
            ..Pending::placeholder()
        }];
        let mut visited: HashSet<ObjectId> = HashSet::new();
        if let Ok(id) = root_obj.as_reference() {
            visited.insert(id);
        }

        let mut stack: Vec<(usize, &'a Dictionary, Option<ObjectId>)> = Vec::new();
        if let Ok(kids) = root.get(b"K") {
            self.add_kids(0, kids, None, &mut arena, &mut stack, &mut visited);
        }

        while let Some((idx, dict, inherited)) = stack.pop() {
            let own_page = dict.get(b"Pg").and_then(Object::as_reference).ok();
            let effective = own_page.or(inherited);

            let node = &mut arena[idx];
            node.role = self.role_of(dict);
            node.alt = self.alt_of(dict);
            node.bbox = self.bbox_of(dict);
            node.page = effective;

            if let Ok(kids) = dict.get(b"K") {
                self.add_kids(idx, kids, effective, &mut arena, &mut stack, &mut visited);
            }
        }

        log::debug!(
            "Structure tree has {} elements; assembling page {:?}",
            arena.len() - 1,
            page
        );
        Ok(Some(self.assemble(arena, page)))
    }

    fn add_kids(
        &self,
        parent: usize,
        kids: &'a Object,
        page: Option<ObjectId>,
        arena: &mut Vec<Pending>,
        stack: &mut Vec<(usize, &'a Dictionary, Option<ObjectId>)>,
        visited: &mut HashSet<ObjectId>,
    ) {
        let kids = match resolve(self.doc, kids) {
            Object::Array(items) => items.as_slice(),
            _ => std::slice::from_ref(kids),
        };

        for kid in kids {
            let dict = match kid {
                Object::Integer(mcid) => {
                    match u32::try_from(*mcid) {
                        Ok(mcid) => arena[parent].kids.push(PendingKid::Mcid(mcid, page)),
                        Err(_) => log::debug!("Ignoring negative MCID {}", mcid),
                    }
                    continue;
                }
                Object::Reference(id) => {
                    if !visited.insert(*id) {
                        log::warn!("Structure element {:?} is referenced twice; skipping", id);
                        continue;
                    }
                    match self.doc.get_dictionary(*id) {
                        Ok(dict) => dict,
                        Err(e) => {
                            log::warn!("Unreadable structure kid {:?}: {}", id, e);
                            continue;
                        }
                    }
                }
                Object::Dictionary(dict) => dict,
                other => {
                    log::debug!("Ignoring structure kid {:?}", other);
                    continue;
                }
            };

            let kind = dict.get(b"Type").and_then(Object::as_name).unwrap_or(b"");
            // Some writers omit /Type on marked-content references.
            let is_mcr = kind == b"MCR" || (!dict.has(b"S") && dict.has(b"MCID"));

            if is_mcr {
                let mcr_page = dict
                    .get(b"Pg")
                    .and_then(Object::as_reference)
                    .ok()
                    .or(page);
                let mcid = dict
                    .get(b"MCID")
                    .and_then(Object::as_i64)
                    .ok()
                    .and_then(|id| u32::try_from(id).ok());
                match mcid {
                    Some(mcid) => arena[parent].kids.push(PendingKid::Mcid(mcid, mcr_page)),
                    None => log::debug!("Marked-content reference without MCID"),
                }
            } else if kind == b"OBJR" {
                // Object references (annotations, XObjects) carry no MCID.
            } else if dict.has(b"S") {
                let idx = arena.len();
                arena.push(Pending::placeholder());
                arena[parent].kids.push(PendingKid::Node(idx));
                stack.push((idx, dict, page));
            } else {
                log::debug!("Ignoring structure kid without /S");
            }
        }
    }

    fn role_of(&self, dict: &Dictionary) -> StructRole {
        let Ok(mut name) = dict.get(b"S").and_then(Object::as_name) else {
            return StructRole::Other(String::new());
        };

        for _ in 0..MAX_ROLE_MAP_STEPS {
            let role = StructRole::from_name(&String::from_utf8_lossy(name));
            if !matches!(role, StructRole::Other(_)) {
                return role;
            }
            match self.role_map.get(name) {
                Some(mapped) if mapped.as_slice() != name => name = mapped.as_slice(),
                _ => return role,
            }
        }
        StructRole::from_name(&String::from_utf8_lossy(name))
    }

    fn alt_of(&self, dict: &Dictionary) -> Option<String> {
        let obj = resolve(self.doc, dict.get(b"Alt").ok()?);
        match obj {
            Object::String(bytes, _) => Some(decode_text_simple(bytes)),
            _ => {
                log::debug!("Ignoring non-string /Alt {:?}", obj);
                None
            }
        }
    }

    /// `/BBox` from the element's attribute object(s).
    fn bbox_of(&self, dict: &Dictionary) -> Option<Vec<f32>> {
        let attrs = resolve(self.doc, dict.get(b"A").ok()?);
        let candidates = match attrs {
            Object::Array(items) => items.as_slice(),
            _ => std::slice::from_ref(attrs),
        };

        candidates.iter().find_map(|attr| {
            let attr = resolve(self.doc, attr).as_dict().ok()?;
            let values = resolve(self.doc, attr.get(b"BBox").ok()?).as_array().ok()?;
            Some(
                values
                    .iter()
                    .map(|v| resolve(self.doc, v).as_float().unwrap_or(f32::NAN))
                    .collect(),
            )
        })
    }

    fn on_page(&self, node_page: Option<ObjectId>, page: PageId) -> bool {
        node_page.map_or(self.single_page, |p| p == page)
    }

    /// Rebuild owned nodes bottom-up. Kids always have higher arena indices
    /// than their parent, so a reverse pass sees every kid before its parent.
    fn assemble(&self, arena: Vec<Pending>, page: PageId) -> StructureNode {
        let mut built: Vec<Option<StructureNode>> = Vec::with_capacity(arena.len());
        built.resize_with(arena.len(), || None);

        for (idx, pending) in arena.into_iter().enumerate().rev() {
            let mut children = Vec::with_capacity(pending.kids.len());
            for kid in pending.kids {
                match kid {
                    PendingKid::Node(child) => {
                        if let Some(node) = built[child].take() {
                            children.push(StructChild::Node(node));
                        }
                    }
                    PendingKid::Mcid(mcid, mcid_page) => {
                        if self.on_page(mcid_page, page) {
                            children.push(StructChild::Mcid(mcid));
                        }
                    }
                }
            }

            let keep = idx == 0 || !children.is_empty() || self.on_page(pending.page, page);
            if keep {
                built[idx] = Some(StructureNode {
                    role: pending.role,
                    bounding_box: pending.bbox,
                    alt_text: pending.alt,
                    children,
                });
            }
        }

        built[0]
            .take()
            .unwrap_or_else(|| StructureNode::new(StructRole::Other("StructTreeRoot".to_string())))
    }
}

fn resolve<'d>(doc: &'d Document, obj: &'d Object) -> &'d Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}
