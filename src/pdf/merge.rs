//! PDF background concatenation using lopdf

use std::path::{Path, PathBuf};

use log::debug;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};

/// Page attributes a page may inherit from an ancestor `Pages` node
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guards the parent walk against cyclic page trees
const MAX_TREE_DEPTH: usize = 64;

/// A concatenated background PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPdf {
    /// Where the merged PDF was written
    pub path: PathBuf,
    /// Pages contributed by each input, in input order
    pub page_counts: Vec<usize>,
}

impl MergedPdf {
    pub fn total_pages(&self) -> usize {
        self.page_counts.iter().sum()
    }
}

/// Concatenate PDFs in order into `output_path`
///
/// Each input contributes all of its pages, in their own order, and inputs
/// are never interleaved. The same file listed twice contributes twice.
/// An empty input list writes nothing and returns `None`.
///
/// Object renumbering follows the lopdf merge example:
/// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
pub fn merge_pdfs(input_paths: &[PathBuf], output_path: &Path) -> Result<Option<MergedPdf>> {
    if input_paths.is_empty() {
        return Ok(None);
    }

    // Every input is parsed before anything is written
    let documents = input_paths
        .iter()
        .map(|path| load_background(path))
        .collect::<Result<Vec<_>>>()?;
    let page_counts = documents.iter().map(|(_, pages)| *pages).collect();

    let mut merged = Document::with_version("1.5");
    let mut page_ids: Vec<ObjectId> = Vec::new();
    for (doc, _) in documents {
        page_ids.extend(absorb(&mut merged, doc));
    }
    install_page_tree(&mut merged, &page_ids);

    merged.compress();
    merged.save(output_path)?;

    Ok(Some(MergedPdf {
        path: output_path.to_path_buf(),
        page_counts,
    }))
}

/// Parse one background PDF, returning it with its page count
fn load_background(path: &Path) -> Result<(Document, usize)> {
    let mut doc = Document::load(path).map_err(|e| Error::unreadable_pdf(path, e))?;

    let pages = doc.get_pages().len();
    if pages == 0 {
        return Err(Error::unreadable_pdf(path, "PDF has no pages"));
    }

    inline_inherited_attributes(&mut doc);
    debug!("Loaded {} ({} pages)", path.display(), pages);
    Ok((doc, pages))
}

/// Move the objects of `doc` into `merged` and return its pages in order
///
/// The source catalog and page tree nodes are dropped. The returned pages
/// still point at their old parent until [`install_page_tree`] runs.
fn absorb(merged: &mut Document, mut doc: Document) -> Vec<ObjectId> {
    doc.renumber_objects_with(merged.max_id + 1);

    // get_pages is keyed by page number, so this keeps source order
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

    let before = doc.objects.len();
    doc.objects.retain(|_, object| {
        !(is_of_type(object, b"Catalog") || is_of_type(object, b"Pages"))
    });
    debug!("Dropped {} catalog and page tree objects", before - doc.objects.len());

    merged.max_id = merged.max_id.max(doc.max_id);
    merged.objects.extend(doc.objects);
    pages
}

/// Add a single `Pages` node over `page_ids` and a catalog pointing at it
fn install_page_tree(merged: &mut Document, page_ids: &[ObjectId]) {
    let pages_id = merged.new_object_id();
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(page_ids.len() as i64));
    pages.set("Kids", Object::Array(kids));
    merged.objects.insert(pages_id, Object::Dictionary(pages));

    for &page_id in page_ids {
        if let Ok(Object::Dictionary(page)) = merged.get_object_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    let catalog_id = merged.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    merged.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged.trailer.set("Root", Object::Reference(catalog_id));
}

fn is_of_type(object: &Object, name: &[u8]) -> bool {
    match object {
        Object::Dictionary(dict) => dict.get(b"Type").and_then(Object::as_name).ok() == Some(name),
        _ => false,
    }
}

/// Copy attributes a page inherits from its ancestors onto the page itself
///
/// Pages are re-parented under a fresh `Pages` node, which would otherwise
/// lose a `MediaBox` or `Resources` declared higher up the tree.
fn inline_inherited_attributes(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for page_id in page_ids {
        let inherited = collect_inherited(doc, page_id);
        if inherited.is_empty() {
            continue;
        }
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
            for (key, value) in inherited {
                page.set(key, value);
            }
        }
    }
}

fn collect_inherited(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let page = match doc.get_dictionary(page_id) {
        Ok(page) => page,
        Err(_) => return Vec::new(),
    };

    let mut missing: Vec<&[u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    let mut found = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        if missing.is_empty() || depth >= MAX_TREE_DEPTH {
            break;
        }
        let node = match doc.get_dictionary(parent_id) {
            Ok(node) => node,
            Err(_) => break,
        };

        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });

        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    found
}
