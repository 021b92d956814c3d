//! XML dossier conversion: a `folder` tree with `document` leaves, each rendered to markdown.
//!
//! Real exports are irregular. Documents may sit outside any folder, and ids or names
//! (`naam`) may be missing. Missing identity is inherited from the nearest enclosing folder,
//! and finally from the uploaded file's base name.

pub mod ast;
pub mod render;
pub mod tree;

use crate::error::IngestError;
use crate::models::{ExtractedUnit, SourceKind};
use ast::Block;
use std::path::Path;
use tracing::debug;
use tree::{Element, Node};

const UNTITLED: &str = "(untitled)";

/// Identity inherited by everything inside a folder.
#[derive(Debug, Clone)]
struct FolderScope {
    id: Option<String>,
    name: String,
}

/// Converts an XML dossier into one markdown unit per `document`, depth-first.
pub fn extract_dossier_units(
    bytes: &[u8],
    file_name: &str,
) -> Result<Vec<ExtractedUnit>, IngestError> {
    let root = tree::parse(bytes)?;
    let base_name = base_name(file_name);
    let folder = root_folder(root);

    let mut units = Vec::new();
    let scope = FolderScope {
        id: None,
        name: base_name.clone(),
    };
    traverse(&folder, &scope, &base_name, &mut units);

    debug!(file = file_name, documents = units.len(), "converted xml dossier");
    Ok(units)
}

/// Brings the three accepted root shapes down to a single folder.
fn root_folder(root: Element) -> Element {
    if root.is("folder") {
        return root;
    }
    if root.is("document") {
        return Element::with_children("folder", vec![root]);
    }

    let mut children = root.children;
    if let Some(position) = children
        .iter()
        .position(|node| matches!(node, Node::Element(element) if element.is("folder")))
    {
        if let Node::Element(folder) = children.swap_remove(position) {
            return folder;
        }
    }

    let members = children
        .into_iter()
        .filter_map(|node| match node {
            Node::Element(element) if element.is("document") || element.is("folder") => {
                Some(element)
            }
            _ => None,
        })
        .collect();
    Element::with_children("folder", members)
}

fn traverse(folder: &Element, parent: &FolderScope, base_name: &str, units: &mut Vec<ExtractedUnit>) {
    let scope = FolderScope {
        id: folder
            .non_empty_attr("id")
            .map(str::to_string)
            .or_else(|| parent.id.clone()),
        name: folder
            .child_text("naam")
            .unwrap_or_else(|| parent.name.clone()),
    };

    for document in folder.children_named("document") {
        units.push(document_unit(document, &scope, base_name));
    }

    for sub_folder in folder.children_named("folder") {
        traverse(sub_folder, &scope, base_name, units);
    }
}

fn document_unit(document: &Element, scope: &FolderScope, base_name: &str) -> ExtractedUnit {
    let own_id = document.non_empty_attr("id");
    let file = own_id
        .map(str::to_string)
        .or_else(|| scope.id.clone())
        .unwrap_or_else(|| base_name.to_string());

    let title = document
        .child_text("naam")
        .or_else(|| Some(scope.name.clone()).filter(|name| !name.is_empty()))
        .unwrap_or_else(|| UNTITLED.to_string());

    let body = document
        .child("document")
        .and_then(|inner| inner.child("section"))
        .or_else(|| document.child("section"));

    let text = body
        .map(|section| render::render_markdown(&Block::from_element(section)))
        .unwrap_or_default();

    debug!(document = %file, title = %title, chars = text.len(), "rendered dossier document");

    ExtractedUnit {
        kind: SourceKind::XmlDossier,
        title,
        file,
        text,
        ordinal: own_id.and_then(parse_number).unwrap_or(0),
        total_units: scope.id.as_deref().and_then(parse_number).unwrap_or(0),
    }
}

fn parse_number(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn base_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
        .to_string()
}
