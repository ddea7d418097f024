use super::{collect_documents, display_path, open_editor, read_document};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use paper_editor::model::NodeJson;
use paper_editor::{Editor, EditorConfig};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Documents, directories or glob patterns to normalize
    #[arg(default_value = ".")]
    pub inputs: Vec<String>,

    /// Print the normalized documents instead of rewriting them
    #[arg(long)]
    pub stdout: bool,

    /// Seed for new code block identities (random by default)
    #[arg(long)]
    pub seed: Option<String>,
}

pub fn normalize(args: NormalizeArgs, cwd: &Path) -> Result<()> {
    let config = EditorConfig::load(cwd)?;
    let files = collect_documents(&args.inputs, cwd)?;

    if !args.stdout {
        println!("{}", "🧹 Normalizing Paper documents...".bright_blue().bold());
    }

    let mut rewritten = 0;
    for file in &files {
        let json = read_document(file)?;
        let mut editor = open_editor(&config, args.seed.as_deref())?;
        let normalized = normalize_document(&mut editor, json.clone())
            .with_context(|| format!("Cannot normalize {}", display_path(file, cwd)))?;
        let output = serde_json::to_string_pretty(&normalized)?;

        if args.stdout {
            println!("{}", output);
            continue;
        }

        if normalized == json {
            println!("  {} {}", "✓".green(), display_path(file, cwd));
        } else {
            fs::write(file, format!("{}\n", output))?;
            rewritten += 1;
            info!(path = %file.display(), "rewrote document");
            println!("  {} {} {}", "✎".yellow(), display_path(file, cwd), "(rewritten)".dimmed());
        }
    }

    if !args.stdout {
        println!();
        println!("{} {} documents, {} rewritten", "✅".green(), files.len(), rewritten);
    }
    Ok(())
}

/// Load a document into the editor and read back the settled form:
/// legacy kinds upgraded, attributes defaulted, code blocks given
/// identities, the trailing paragraph in place.
pub fn normalize_document(editor: &mut Editor, json: NodeJson) -> Result<NodeJson> {
    editor.set_document_json(json)?;
    Ok(editor.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: serde_json::Value) -> NodeJson {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_document() {
        let mut editor = open_editor(&EditorConfig::default(), Some("n")).unwrap();
        let normalized = normalize_document(
            &mut editor,
            document(json!({
                "type": "doc",
                "content": [
                    {"type": "bullet_list", "content": [
                        {"type": "bullet_item", "content": [
                            {"type": "paragraph", "content": [{"type": "text", "text": "one"}]}
                        ]}
                    ]},
                    {"type": "code_block", "content": [{"type": "text", "text": "ls"}]}
                ]
            })),
        )
        .unwrap();

        let value = serde_json::to_value(&normalized).unwrap();
        assert_eq!(value["content"][0]["content"][0]["type"], "list_item");
        assert_eq!(value["content"][1]["attrs"]["editorId"], "n-1");
        assert_eq!(value["content"][2]["type"], "paragraph");

        // A settled document is left alone.
        let mut editor = open_editor(&EditorConfig::default(), Some("other")).unwrap();
        assert_eq!(normalize_document(&mut editor, normalized.clone()).unwrap(), normalized);
    }

    #[test]
    fn test_normalize_rewrites_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.json");
        fs::write(
            &path,
            json!({"type": "doc", "content": [{"type": "heading", "content": [{"type": "text", "text": "T"}]}]})
                .to_string(),
        )
        .unwrap();
        fs::write(dir.path().join("paper.config.json"), r#"{"trailingParagraph": false}"#).unwrap();

        let args = NormalizeArgs {
            inputs: vec!["note.json".to_string()],
            stdout: false,
            seed: Some("f".to_string()),
        };
        normalize(args, dir.path()).unwrap();

        let written = read_document(&path).unwrap();
        let kinds: Vec<_> = written.content.unwrap().iter().map(|n| n.kind.clone()).collect();
        assert_eq!(kinds, vec!["heading"]);
        let value = serde_json::to_value(read_document(&path).unwrap()).unwrap();
        assert_eq!(value["content"][0]["attrs"]["level"], 1);
    }
}
