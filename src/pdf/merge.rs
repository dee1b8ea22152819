//! PDF merging functionality using lopdf

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use crate::error::{Error, Result};
use crate::pdf::metadata::load;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic Parent chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// Options for merging PDFs
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input PDF file paths in the order they should be merged
    pub input_paths: Vec<PathBuf>,
    /// Output PDF file path
    pub output_path: PathBuf,
    /// Replace `output_path` if it already exists
    pub overwrite: bool,
}

/// One input's contribution to a merged document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeEntry {
    /// 0-based position in the merge order
    pub position: usize,
    pub path: PathBuf,
    pub page_count: usize,
}

/// A merged PDF that has been written to disk
#[derive(Debug, Clone)]
pub struct MergedOutput {
    pub path: PathBuf,
    /// Sum of the entries' page counts
    pub page_count: usize,
    /// Contributing inputs in merge order
    pub entries: Vec<MergeEntry>,
}

/// Merge multiple PDF files into a single PDF
///
/// Based on the lopdf merge example:
/// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
///
/// Every input is parsed before anything is written, and the result is
/// written to a temporary file next to the output and renamed into place, so
/// a failure never leaves a partial output behind.
///
/// # Example
///
/// ```no_run
/// use office_pdf_merge::pdf::{MergeOptions, merge_pdfs};
/// use std::path::PathBuf;
///
/// let options = MergeOptions {
///     input_paths: vec![
///         PathBuf::from("1. first.pdf"),
///         PathBuf::from("2. second.pdf"),
///     ],
///     output_path: PathBuf::from("merged.pdf"),
///     overwrite: false,
/// };
///
/// let merged = merge_pdfs(&options).expect("Failed to merge");
/// println!("{} pages", merged.page_count);
/// ```
pub fn merge_pdfs(options: &MergeOptions) -> Result<MergedOutput> {
    if options.input_paths.is_empty() {
        return Err(Error::EmptyInputSet);
    }

    if options.output_path.exists() && !options.overwrite {
        return Err(Error::OutputWriteFailed {
            path: options.output_path.clone(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "output file already exists"),
        });
    }

    // Load all documents
    let mut documents: Vec<(PathBuf, Document)> = Vec::with_capacity(options.input_paths.len());
    for path in &options.input_paths {
        let mut doc = load(path)?;

        if doc.get_pages().is_empty() {
            return Err(Error::unreadable(path, "document has no pages"));
        }

        push_down_inherited(&mut doc);
        documents.push((path.clone(), doc));
    }

    // Define a starting max_id for merged document
    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut entries: Vec<MergeEntry> = Vec::with_capacity(documents.len());

    for (position, (path, mut doc)) in documents.into_iter().enumerate() {
        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let pages = doc.get_pages();
        debug!("{}: {} pages, {} objects", path.display(), pages.len(), doc.objects.len());
        entries.push(MergeEntry {
            position,
            path,
            page_count: pages.len(),
        });
        page_ids.extend(pages.into_values());

        // The old catalog and page tree are replaced by a single new one
        objects.extend(
            doc.objects
                .into_iter()
                .filter(|(_, object)| !is_page_tree_node(object)),
        );
    }

    let mut merged_doc = Document::with_version("1.5");
    merged_doc.objects.extend(objects);

    // new_object_id() must hand out IDs above everything just inserted
    merged_doc.max_id = max_id - 1;

    let pages_id = merged_doc.new_object_id();

    let kids: Vec<Object> = page_ids
        .iter()
        .map(|&id| Object::Reference(id))
        .collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let catalog_id = merged_doc.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged_doc.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged_doc.objects.insert(pages_id, Object::Dictionary(pages_object));
    merged_doc.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = merged_doc.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    merged_doc.compress();
    write_atomically(&mut merged_doc, &options.output_path, options.overwrite)?;

    let page_count = entries.iter().map(|e| e.page_count).sum();
    info!(
        "merged {} PDFs ({} pages) into {}",
        entries.len(),
        page_count,
        options.output_path.display()
    );

    Ok(MergedOutput {
        path: options.output_path.clone(),
        page_count,
        entries,
    })
}

fn is_page_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type"),
            Ok(Object::Name(name)) if name.as_slice() == b"Catalog" || name.as_slice() == b"Pages"
        ),
        _ => false,
    }
}

/// Copy inherited attributes onto every page so they survive re-parenting
fn push_down_inherited(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    for page_id in page_ids {
        let inherited = inherited_attributes(doc, page_id);
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

/// Attributes the page lacks but an ancestor defines, nearest ancestor first
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
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
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
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

/// Save `doc` to a sibling temp file, then move it onto `output`
fn write_atomically(doc: &mut Document, output: &Path, overwrite: bool) -> Result<()> {
    let write_failed = |source: io::Error| Error::OutputWriteFailed {
        path: output.to_path_buf(),
        source,
    };

    let parent = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_failed)?;

    let mut temp = NamedTempFile::new_in(parent).map_err(write_failed)?;
    doc.save_to(&mut temp)
        .map_err(|e| write_failed(io::Error::other(e.to_string())))?;
    temp.as_file().sync_all().map_err(write_failed)?;

    let persisted = if overwrite {
        temp.persist(output)
    } else {
        temp.persist_noclobber(output)
    };
    persisted.map_err(|e| write_failed(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use tempfile::TempDir;

    #[test]
    fn test_merge_options_creation() {
        let options = MergeOptions {
            input_paths: vec![
                PathBuf::from("test1.pdf"),
                PathBuf::from("test2.pdf"),
            ],
            output_path: PathBuf::from("merged.pdf"),
            overwrite: false,
        };

        assert_eq!(options.input_paths.len(), 2);
        assert_eq!(options.output_path, Path::new("merged.pdf"));
    }

    #[test]
    fn test_empty_input_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let output_path = temp.path().join("empty.pdf");

        let result = merge_pdfs(&MergeOptions {
            input_paths: vec![],
            output_path: output_path.clone(),
            overwrite: false,
        });

        assert!(matches!(result, Err(Error::EmptyInputSet)));
        assert!(!output_path.exists());
    }

    #[test]
    fn test_page_tree_node_detection() {
        let pages = Object::Dictionary(dictionary! { "Type" => "Pages" });
        let catalog = Object::Dictionary(dictionary! { "Type" => "Catalog" });
        let page = Object::Dictionary(dictionary! { "Type" => "Page" });
        assert!(is_page_tree_node(&pages));
        assert!(is_page_tree_node(&catalog));
        assert!(!is_page_tree_node(&page));
        assert!(!is_page_tree_node(&Object::Integer(3)));
    }

    #[test]
    fn test_inherited_attributes_come_from_nearest_ancestor() {
        let mut doc = Document::with_version("1.5");
        let root_id = doc.new_object_id();
        let mid_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => mid_id,
            "Rotate" => 0,
        });
        doc.objects.insert(mid_id, Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Parent" => root_id,
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Rotate" => 90,
            "MediaBox" => vec![0.into(), 0.into(), 200.into(), 100.into()],
        }));
        doc.objects.insert(root_id, Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![mid_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => Dictionary::new(),
        }));

        let found = inherited_attributes(&doc, page_id);
        let keys: Vec<&[u8]> = found.iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![b"MediaBox".as_slice(), b"Resources".as_slice()]);

        let media_box = found[0].1.as_array().unwrap();
        assert_eq!(media_box[2].as_i64().unwrap(), 200);
    }
}
