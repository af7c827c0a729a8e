//! Nested dataset menu built from a folder-structure document or a data directory scan.
//!
//! The folder-structure document maps each directory name to its own object and lists
//! the CSV files of a directory under `"files"`:
//!
//! ```json
//! { "ttbar": { "m10": { "TP": { "files": ["ttbar.csv"] } } } }
//! ```

use crate::locator::DatasetLocator;
use color_eyre::eyre::{eyre, Result, WrapErr};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Key holding the file list of one directory.
pub const FILES_KEY: &str = "files";

/// File name the folder structure is conventionally stored under.
pub const FOLDER_STRUCTURE_FILE: &str = "folder_structure.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuNode {
    Folder { name: String, children: Vec<MenuNode> },
    Leaf { name: String, locator: DatasetLocator },
}

impl MenuNode {
    pub fn name(&self) -> &str {
        match self {
            Self::Folder { name, .. } | Self::Leaf { name, .. } => name,
        }
    }

    pub fn children(&self) -> &[MenuNode] {
        match self {
            Self::Folder { children, .. } => children,
            Self::Leaf { .. } => &[],
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    pub fn child(&self, name: &str) -> Option<&MenuNode> {
        self.children().iter().find(|c| c.name() == name)
    }

    /// Follow `path` from this node by child names.
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&MenuNode> {
        path.iter()
            .try_fold(self, |node, name| node.child(name.as_ref()))
    }

    /// Number of leaves below this node.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Folder { children, .. } => children.iter().map(MenuNode::leaf_count).sum(),
        }
    }

    /// Build the menu from a folder-structure document. The root is an unnamed folder.
    pub fn from_folder_structure(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| eyre!("folder structure must be a JSON object"))?;
        Ok(Self::Folder {
            name: String::new(),
            children: children_from_object(object, &[])?,
        })
    }

    /// Parse a folder-structure document from text.
    pub fn from_folder_structure_str(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).wrap_err("Failed to parse folder structure JSON")?;
        Self::from_folder_structure(&value)
    }

    /// Build the menu by scanning a `data/` directory.
    pub fn scan_dir(data_dir: &Path) -> Result<Self> {
        Self::from_folder_structure(&folder_structure(data_dir)?)
    }
}

fn children_from_object(object: &Map<String, Value>, path: &[String]) -> Result<Vec<MenuNode>> {
    let mut children = Vec::new();
    for (key, value) in object {
        if key == FILES_KEY {
            let files = value
                .as_array()
                .ok_or_else(|| eyre!("\"files\" under /{} must be an array", path.join("/")))?;
            for file in files {
                let name = file
                    .as_str()
                    .ok_or_else(|| eyre!("file names under /{} must be strings", path.join("/")))?;
                children.push(MenuNode::Leaf {
                    name: name.to_string(),
                    locator: DatasetLocator::new(path.iter().cloned(), name),
                });
            }
        } else {
            let nested = value
                .as_object()
                .ok_or_else(|| eyre!("folder {:?} must be a JSON object", key))?;
            let mut child_path = path.to_vec();
            child_path.push(key.clone());
            children.push(MenuNode::Folder {
                name: key.clone(),
                children: children_from_object(nested, &child_path)?,
            });
        }
    }
    children.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(children)
}

/// Describe `dir` as a folder-structure document. Only `.csv` files are listed.
pub fn folder_structure(dir: &Path) -> Result<Value> {
    let entries =
        fs::read_dir(dir).wrap_err_with(|| format!("Failed to read directory {}", dir.display()))?;
    let mut object = Map::new();
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            object.insert(name, folder_structure(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "csv") {
            files.push(name);
        }
    }
    if !files.is_empty() {
        files.sort();
        object.insert(
            FILES_KEY.to_string(),
            Value::Array(files.into_iter().map(Value::String).collect()),
        );
    }
    Ok(Value::Object(object))
}

/// Scan `data_dir` and write its folder-structure document to `out`.
pub fn write_folder_structure(data_dir: &Path, out: &Path) -> Result<()> {
    let structure = folder_structure(data_dir)?;
    let text = serde_json::to_string_pretty(&structure)?;
    fs::write(out, text + "\n")
        .wrap_err_with(|| format!("Failed to write folder structure to {}", out.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn builds_tree_from_document() {
        let doc = json!({
            "ttbar": { "m10": { "TP": { "files": ["ttbar.csv"] }, "all": { "files": ["ttbar.csv"] } } },
            "dyjets": { "m10": { "TP": { "files": ["b.csv", "a.csv"] } } }
        });
        let menu = MenuNode::from_folder_structure(&doc).unwrap();
        let names: Vec<&str> = menu.children().iter().map(MenuNode::name).collect();
        assert_eq!(names, vec!["dyjets", "ttbar"]);
        assert_eq!(menu.leaf_count(), 4);

        let leaf = menu.find(&["dyjets", "m10", "TP", "a.csv"]).unwrap();
        match leaf {
            MenuNode::Leaf { locator, .. } => {
                assert_eq!(locator, &DatasetLocator::new(["dyjets", "m10", "TP"], "a.csv"));
            }
            other => panic!("expected leaf, got {:?}", other),
        }
        assert!(menu.find(&["dyjets", "nope"]).is_none());
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(MenuNode::from_folder_structure(&json!([])).is_err());
        assert!(MenuNode::from_folder_structure(&json!({"a": "b"})).is_err());
        assert!(MenuNode::from_folder_structure(&json!({"files": [1]})).is_err());
    }

    #[test]
    fn scan_lists_only_csv_files() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("ttbar/m10/TP");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("ttbar.csv"), "a,b\n").unwrap();
        fs::write(dir.join("notes.txt"), "skip").unwrap();

        let doc = folder_structure(temp.path()).unwrap();
        assert_eq!(doc, json!({"ttbar": {"m10": {"TP": {"files": ["ttbar.csv"]}}}}));
    }

    #[test]
    fn written_document_matches_scan() {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");
        fs::create_dir_all(data.join("x/y")).unwrap();
        fs::write(data.join("x/y/x.csv"), "a,b\n").unwrap();
        let out = temp.path().join(FOLDER_STRUCTURE_FILE);

        write_folder_structure(&data, &out).unwrap();
        let from_file = MenuNode::from_folder_structure_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(from_file, MenuNode::scan_dir(&data).unwrap());
    }
}
