use super::{collect_documents, display_path, open_editor};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use paper_editor::model::{upgrade_document, Node, NodeJson};
use paper_editor::{Editor, EditorConfig};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Documents, directories or glob patterns to check
    #[arg(default_value = ".")]
    pub inputs: Vec<String>,

    /// Also fail documents that `paper normalize` would rewrite
    #[arg(long)]
    pub strict: bool,

    /// List valid documents too
    #[arg(short, long)]
    pub verbose: bool,
}

/// What is wrong with one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    /// Not JSON, or not a document the schema accepts
    Invalid(String),
    /// Valid, but not in the shape the editor settles it into
    Unnormalized,
}

pub fn check(args: CheckArgs, cwd: &Path) -> Result<()> {
    let config = EditorConfig::load(cwd)?;
    let files = collect_documents(&args.inputs, cwd)?;

    println!("🔍 {} {} documents", "Checking".green().bold(), files.len());
    println!();

    let mut failed = 0;
    for file in &files {
        let source = fs::read_to_string(file)?;
        let mut editor = open_editor(&config, Some("check"))?;
        match check_source(&mut editor, &source, args.strict) {
            None => {
                if args.verbose {
                    println!("  {} {}", "✓".green(), display_path(file, cwd));
                }
            }
            Some(Finding::Invalid(reason)) => {
                failed += 1;
                println!("  {} {} - {}", "✗".red(), display_path(file, cwd), reason.red());
            }
            Some(Finding::Unnormalized) => {
                failed += 1;
                println!(
                    "  {} {} - {}",
                    "✗".yellow(),
                    display_path(file, cwd),
                    "not normalized".yellow()
                );
            }
        }
    }

    println!();
    if failed > 0 {
        return Err(anyhow!("{} of {} documents failed the check", failed, files.len()));
    }
    println!("{} {} documents are valid", "✅".green(), files.len());
    Ok(())
}

/// Check one document source with a fresh editor.
pub fn check_source(editor: &mut Editor, source: &str, strict: bool) -> Option<Finding> {
    let json: NodeJson = match serde_json::from_str(source) {
        Ok(json) => json,
        Err(err) => return Some(Finding::Invalid(err.to_string())),
    };

    if let Err(err) = Node::from_json(editor.schema(), &upgrade_document(json.clone())) {
        return Some(Finding::Invalid(err.to_string()));
    }

    if strict {
        if let Err(err) = editor.set_document_json(json.clone()) {
            return Some(Finding::Invalid(err.to_string()));
        }
        if editor.to_json() != json {
            debug!("document differs from its normalized form");
            return Some(Finding::Unnormalized);
        }
    }

    None
}
