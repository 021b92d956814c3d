//! Markdown rendering for the dossier AST. Pure functions, no I/O.

use super::ast::{Block, Inline, List, Table};

const INDENT: &str = "  ";

/// Renders a body as markdown; top-level blocks are separated by a blank line.
pub fn render_markdown(block: &Block) -> String {
    let mut blocks = Vec::new();
    collect_blocks(block, &mut blocks);
    blocks.join("\n\n")
}

fn collect_blocks(block: &Block, out: &mut Vec<String>) {
    match block {
        Block::Container(children) => {
            for child in children {
                collect_blocks(child, out);
            }
        }
        other => out.extend(render_block(other)),
    }
}

fn render_block(block: &Block) -> Option<String> {
    match block {
        Block::Heading { level, content } => {
            let text = render_inline(content);
            (!text.is_empty()).then(|| format!("{} {text}", "#".repeat(*level)))
        }
        Block::Paragraph(content) => Some(render_inline(content)).filter(|text| !text.is_empty()),
        Block::CodeBlock(code) => {
            let mut lines = vec!["```"];
            lines.extend(code.lines());
            lines.push("```");
            Some(lines.join("\n"))
        }
        Block::List(list) => {
            let mut lines = Vec::new();
            render_list(list, 0, &mut lines);
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        Block::Table(table) => render_table(table),
        Block::Footnote(text) => {
            (!text.is_empty()).then(|| format!("> **Footnote:** {text}"))
        }
        Block::Container(_) => {
            let rendered = render_markdown(block);
            (!rendered.is_empty()).then_some(rendered)
        }
    }
}

fn render_list(list: &List, depth: usize, lines: &mut Vec<String>) {
    let indent = INDENT.repeat(depth);
    for (position, item) in list.items.iter().enumerate() {
        let marker = if list.ordered {
            let number = item
                .value
                .clone()
                .unwrap_or_else(|| (position + 1).to_string());
            format!("{number}.")
        } else {
            "-".to_string()
        };

        lines.push(format!("{indent}{marker} {}", render_inline(&item.content)));
        for sublist in &item.sublists {
            render_list(sublist, depth + 1, lines);
        }
    }
}

fn render_table(table: &Table) -> Option<String> {
    let (header, body) = table.rows.split_first()?;
    let header = header.iter().map(|cell| render_inline(cell)).collect::<Vec<_>>();

    let mut lines = vec![
        format!("| {} |", header.join(" | ")),
        format!("| {} |", vec!["---"; header.len()].join(" | ")),
    ];
    for row in body {
        let cells = row.iter().map(|cell| render_inline(cell)).collect::<Vec<_>>();
        lines.push(format!("| {} |", cells.join(" | ")));
    }

    Some(lines.join("\n"))
}

/// Renders an inline run; nested runs are rendered (and trimmed) first so markup composes.
pub fn render_inline(run: &[Inline]) -> String {
    let mut out = String::new();
    for inline in run {
        match inline {
            Inline::Text(text) => out.push_str(text),
            Inline::Strong(inner) => out.push_str(&format!("**{}**", render_inline(inner))),
            Inline::Emphasis(inner) => out.push_str(&format!("*{}*", render_inline(inner))),
            Inline::Code(code) => out.push_str(&format!("`{code}`")),
            Inline::Link { href, content } => {
                out.push_str(&format!("[{}]({href})", render_inline(content)));
            }
            Inline::Image { src, alt } => out.push_str(&format!("![{alt}]({src})")),
            Inline::LineBreak => out.push_str("  \n"),
            Inline::Span(inner) => out.push_str(&render_inline(inner)),
        }
    }
    out.trim().to_string()
}
