//! Shared fixtures: generated PDFs and fake converter executables

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::fs;
use std::path::{Path, PathBuf};

/// Write a PDF with `pages` pages; page `i` (1-based) shows `"{label}-p{i}"`
///
/// MediaBox and Resources live on the page tree node and are inherited by
/// every page, the way many producers write them.
pub fn write_pdf(path: &Path, label: &str, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages);
    for i in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("{label}-p{i}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(path).expect("write fixture PDF");
}

/// Page labels of `path` in page order, read back from each content stream
pub fn page_labels(path: &Path) -> Vec<String> {
    let doc = Document::load(path).expect("load merged PDF");
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let content = doc.get_page_content(page_id).expect("page content");
            label_in(&String::from_utf8_lossy(&content))
        })
        .collect()
}

/// The text between the first `(` and `)` of a content stream
fn label_in(content: &str) -> String {
    let start = content.find('(').map(|i| i + 1).unwrap_or(0);
    let end = content[start..].find(')').map(|i| start + i).unwrap_or(content.len());
    content[start..end].to_string()
}

/// MediaBox of every page, after resolving inheritance
pub fn media_boxes(path: &Path) -> Vec<Vec<i64>> {
    let doc = Document::load(path).expect("load merged PDF");
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let page = doc.get_dictionary(page_id).expect("page dictionary");
            page.get(b"MediaBox")
                .and_then(Object::as_array)
                .map(|values| values.iter().filter_map(|v| v.as_i64().ok()).collect())
                .unwrap_or_default()
        })
        .collect()
}

/// Write an executable shell script standing in for `soffice`
pub fn fake_converter(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("soffice");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake converter");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake converter");
    }
    path
}

/// Script body that accepts the real argument shape and copies `template`
/// to `<outdir>/<input stem>.pdf`, failing for inputs whose name contains
/// `fail_marker`
pub fn copying_converter_body(template: &Path, fail_marker: &str) -> String {
    format!(
        r#"outdir=""
input=""
while [ $# -gt 0 ]; do
  case "$1" in
    --outdir) outdir="$2"; shift 2 ;;
    --headless) shift ;;
    --convert-to) shift 2 ;;
    *) input="$1"; shift ;;
  esac
done
case "$(basename "$input")" in
  *{fail_marker}*) echo "Error: source file could not be loaded" >&2; exit 1 ;;
esac
name="$(basename "$input")"
cp "{template}" "$outdir/${{name%.*}}.pdf"
"#,
        template = template.display(),
    )
}

/// Script body that "converts" by copying the input file itself, so a
/// source written with [`write_pdf`] comes back with its own page labels
pub fn input_copying_converter_body() -> String {
    r#"outdir=""
input=""
while [ $# -gt 0 ]; do
  case "$1" in
    --outdir) outdir="$2"; shift 2 ;;
    --headless) shift ;;
    --convert-to) shift 2 ;;
    *) input="$1"; shift ;;
  esac
done
name="$(basename "$input")"
cp "$input" "$outdir/${name%.*}.pdf"
"#
    .to_string()
}
