use super::{collect_documents, display_path, read_document};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use paper_editor::model::{upgrade_document, Node};
use paper_extensions::default_extensions;
use serde::Serialize;
use std::path::Path;

const LABEL_WIDTH: usize = 60;

#[derive(Args, Debug)]
pub struct OutlineArgs {
    /// Documents, directories or glob patterns to outline
    #[arg(default_value = ".")]
    pub inputs: Vec<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Only list headings
    #[arg(long)]
    pub headings: bool,
}

/// One top-level block of a document, nested under the heading before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineEntry {
    pub depth: usize,
    pub kind: String,
    pub label: String,
}

#[derive(Debug, Serialize)]
struct DocumentOutline {
    path: String,
    title: Option<String>,
    entries: Vec<OutlineEntry>,
}

pub fn outline(args: OutlineArgs, cwd: &Path) -> Result<()> {
    if args.format != "text" && args.format != "json" {
        return Err(anyhow!("Unknown format: {}. Use: text or json", args.format));
    }

    let schema = default_extensions().build_schema()?;
    let files = collect_documents(&args.inputs, cwd)?;

    let mut outlines = Vec::new();
    for file in &files {
        let json = read_document(file)?;
        let doc = Node::from_json(&schema, &upgrade_document(json))
            .with_context(|| format!("Invalid document {}", display_path(file, cwd)))?;
        let mut entries = outline_of(&doc);
        if args.headings {
            entries.retain(|entry| entry.kind == "heading");
        }
        outlines.push(DocumentOutline {
            path: display_path(file, cwd).to_string(),
            title: doc.first_child().map(Node::text_content),
            entries,
        });
    }

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&outlines)?);
        return Ok(());
    }

    for outline in &outlines {
        println!(
            "{} {}",
            outline.path.bold(),
            outline.title.as_deref().unwrap_or("").dimmed()
        );
        for entry in &outline.entries {
            let indent = "  ".repeat(entry.depth + 1);
            let kind = if entry.kind == "heading" {
                entry.kind.bright_blue()
            } else {
                entry.kind.normal()
            };
            println!("{}{} {}", indent, kind, entry.label);
        }
        println!();
    }
    Ok(())
}

/// Headings open a level; other blocks sit one below the last heading.
pub fn outline_of(doc: &Node) -> Vec<OutlineEntry> {
    let mut entries = Vec::new();
    let mut section = 0;

    for block in doc.content().iter() {
        let kind = block.type_name().to_string();
        let depth = if kind == "heading" {
            let level = block.attr("level").and_then(|v| v.as_u64()).unwrap_or(1) as usize;
            section = level;
            level.saturating_sub(1)
        } else {
            section
        };
        entries.push(OutlineEntry {
            depth,
            label: label_of(block),
            kind,
        });
    }
    entries
}

fn label_of(block: &Node) -> String {
    let text = |name: &str| block.attr(name).and_then(|v| v.as_str()).map(str::to_string);
    let label = match block.type_name() {
        "code_block" => {
            let language = text("language").unwrap_or_else(|| "plain".to_string());
            match text("editorId") {
                Some(id) => format!("[{}] {}", language, id),
                None => format!("[{}]", language),
            }
        }
        "image_block" => text("src").unwrap_or_default(),
        "bullet_list" | "ordered_list" | "todo_list" => format!("{} items", block.child_count()),
        "table" => {
            let cols = block.first_child().map(Node::child_count).unwrap_or(0);
            format!("{}x{}", block.child_count(), cols)
        }
        _ => block.text_content(),
    };
    truncate(&label, LABEL_WIDTH)
}

fn truncate(text: &str, width: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > width {
        format!("{}…", line.chars().take(width).collect::<String>())
    } else {
        line.to_string()
    }
}
