pub mod check;
pub mod normalize;
pub mod outline;

pub use check::{check, CheckArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use outline::{outline, OutlineArgs};

use anyhow::{anyhow, Context, Result};
use paper_editor::model::NodeJson;
use paper_editor::sync::{ClientId, IdGenerator};
use paper_editor::{Editor, EditorConfig, DEFAULT_CONFIG_NAME};
use paper_extensions::{extensions_with, CodeBlock};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Client identity of every editor the CLI opens.
pub const CLI_CLIENT: &str = "paper-cli";

/// Expand files, directories and glob patterns into the documents they name.
pub fn collect_documents(inputs: &[String], cwd: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let path = cwd.join(input);
        if path.is_file() {
            files.push(path);
        } else if path.is_dir() {
            files.extend(find_json_files(&path));
        } else {
            let pattern = path.to_string_lossy().to_string();
            let matches: Vec<PathBuf> = glob::glob(&pattern)
                .with_context(|| format!("Invalid pattern: {}", input))?
                .filter_map(|entry| entry.ok())
                .filter(|path| path.is_file())
                .collect();
            if matches.is_empty() {
                return Err(anyhow!("No documents match: {}", input));
            }
            files.extend(matches);
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn find_json_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.is_file()
                && path.extension().map(|e| e == "json").unwrap_or(false)
                && path.file_name().map(|n| n != DEFAULT_CONFIG_NAME).unwrap_or(false)
        })
        .collect()
}

/// An editor over the full extension set. A seed pins the code block
/// identities it hands out.
pub fn open_editor(config: &EditorConfig, seed: Option<&str>) -> Result<Editor> {
    let generator = match seed {
        Some(seed) => IdGenerator::from_seed(seed),
        None => IdGenerator::random(),
    };
    let code_block = CodeBlock::with_identity(ClientId::new(CLI_CLIENT), generator);
    Ok(Editor::new(extensions_with(code_block), config.clone())?)
}

pub fn read_document(path: &Path) -> Result<NodeJson> {
    let source = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("{} is not a document", path.display()))
}

/// Path relative to the working directory when possible, for display.
pub fn display_path<'a>(path: &'a Path, cwd: &Path) -> std::path::Display<'a> {
    path.strip_prefix(cwd).unwrap_or(path).display()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_documents() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("notes")).unwrap();
        fs::write(root.join("a.json"), "{}").unwrap();
        fs::write(root.join("notes/b.json"), "{}").unwrap();
        fs::write(root.join("notes/readme.md"), "").unwrap();
        fs::write(root.join(DEFAULT_CONFIG_NAME), "{}").unwrap();

        let all = collect_documents(&[".".to_string()], root).unwrap();
        let names: Vec<_> = all.iter().map(|p| p.strip_prefix(root).unwrap().to_path_buf()).collect();
        assert_eq!(names, vec![PathBuf::from("a.json"), PathBuf::from("notes/b.json")]);

        let globbed = collect_documents(&["notes/*.json".to_string(), "notes/b.json".to_string()], root).unwrap();
        assert_eq!(globbed, vec![root.join("notes/b.json")]);

        assert!(collect_documents(&["missing/*.json".to_string()], root).is_err());
    }

    #[test]
    fn test_open_editor_settles_empty_document() {
        let editor = open_editor(&EditorConfig::default(), Some("t")).unwrap();
        assert_eq!(editor.doc().child_count(), 1);
    }
}
