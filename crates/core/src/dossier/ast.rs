//! Typed view of a dossier body. Built once from the element tree, rendered by `render`.

use super::tree::{Element, Node};

pub type InlineRun = Vec<Inline>;

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Strong(InlineRun),
    Emphasis(InlineRun),
    Code(String),
    Link { href: String, content: InlineRun },
    Image { src: String, alt: String },
    LineBreak,
    /// Unknown inline tag; only its content counts.
    Span(InlineRun),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: usize, content: InlineRun },
    Paragraph(InlineRun),
    CodeBlock(String),
    List(List),
    Table(Table),
    Footnote(String),
    /// Unknown container tag; its child elements are still visited.
    Container(Vec<Block>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub ordered: bool,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    /// Explicit `value` attribute, used as the ordered-list number.
    pub value: Option<String>,
    pub content: InlineRun,
    pub sublists: Vec<List>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// First row is the header.
    pub rows: Vec<Vec<InlineRun>>,
}

impl Block {
    pub fn from_element(element: &Element) -> Self {
        match element.tag.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Block::Heading {
                level: heading_level(&element.tag),
                content: inline_run(element),
            },
            "p" if is_code_paragraph(element) => Block::CodeBlock(element.text_content()),
            "p" => Block::Paragraph(inline_run(element)),
            tag if is_list_tag(tag) => Block::List(List::from_element(element)),
            "table" => Block::Table(Table::from_element(element)),
            "footnote" => Block::Footnote(element.text_content().trim().to_string()),
            _ => Block::Container(element.elements().map(Block::from_element).collect()),
        }
    }
}

impl List {
    fn from_element(element: &Element) -> Self {
        let bullet = element.attr("type").map_or(true, |kind| kind == "bullet");
        let ordered = !bullet || element.is("ol");

        let items = element
            .children_named("li")
            .map(|item| ListItem {
                value: item.non_empty_attr("value").map(str::to_string),
                content: match item.child("p") {
                    Some(paragraph) => inline_run(paragraph),
                    None => inline_run_without_lists(item),
                },
                sublists: item
                    .elements()
                    .filter(|child| is_list_tag(&child.tag))
                    .map(List::from_element)
                    .collect(),
            })
            .collect();

        Self { ordered, items }
    }
}

impl Table {
    fn from_element(element: &Element) -> Self {
        let group = element
            .child("tgroup")
            .filter(|group| group.elements().next().is_some())
            .unwrap_or(element);

        let mut rows = Vec::new();
        for child in group.elements() {
            match child.tag.as_str() {
                "row" => rows.push(table_row(child)),
                "thead" | "tbody" | "tfoot" => {
                    rows.extend(child.children_named("row").map(table_row));
                }
                _ => {}
            }
        }

        Self { rows }
    }
}

fn table_row(row: &Element) -> Vec<InlineRun> {
    row.children_named("entry").map(inline_run).collect()
}

pub fn inline_run(element: &Element) -> InlineRun {
    element.children.iter().map(inline_node).collect()
}

fn inline_run_without_lists(element: &Element) -> InlineRun {
    element
        .children
        .iter()
        .filter(|node| !matches!(node, Node::Element(child) if is_list_tag(&child.tag)))
        .map(inline_node)
        .collect()
}

fn inline_node(node: &Node) -> Inline {
    match node {
        Node::Text(text) => Inline::Text(text.clone()),
        Node::Element(element) => inline_element(element),
    }
}

fn inline_element(element: &Element) -> Inline {
    match element.tag.as_str() {
        "strong" | "b" => Inline::Strong(inline_run(element)),
        "em" | "i" => Inline::Emphasis(inline_run(element)),
        "code" => Inline::Code(element.text_content().trim().to_string()),
        "a" => Inline::Link {
            href: element.attr("href").unwrap_or_default().trim().to_string(),
            content: inline_run(element),
        },
        "img" => Inline::Image {
            src: element
                .attr("href")
                .or_else(|| element.attr("src"))
                .unwrap_or_default()
                .trim()
                .to_string(),
            alt: element
                .attr("alt")
                .or_else(|| element.attr("id"))
                .unwrap_or_default()
                .trim()
                .to_string(),
        },
        "br" => Inline::LineBreak,
        _ => Inline::Span(inline_run(element)),
    }
}

fn heading_level(tag: &str) -> usize {
    tag[1..].parse().unwrap_or(1)
}

fn is_code_paragraph(element: &Element) -> bool {
    element
        .attr("class")
        .is_some_and(|class| class.eq_ignore_ascii_case("code"))
}

fn is_list_tag(tag: &str) -> bool {
    matches!(tag, "list" | "ul" | "ol")
}
