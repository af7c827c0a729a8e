//! Picker adapters: turn raw picker input into a [`DatasetLocator`].
//!
//! A selection is one string per slot; an empty string means the slot is not chosen yet.

use crate::locator::DatasetLocator;
use crate::menu::MenuNode;
use std::fmt;

pub trait Picker: fmt::Debug + Send {
    /// Short name, used in logs and the UI.
    fn name(&self) -> &'static str;

    /// Number of slots to show for `selection`.
    fn slot_count(&self, selection: &[String]) -> usize;

    /// Label for one slot.
    fn slot_label(&self, slot: usize) -> String;

    /// Values the user may choose in `slot`, given the slots before it.
    fn options(&self, selection: &[String], slot: usize) -> Vec<String>;

    /// The locator named by `selection`; incomplete while any slot is missing.
    fn resolve(&self, selection: &[String]) -> DatasetLocator;

    /// The selection that resolves to `locator`.
    fn selection_for(&self, locator: &DatasetLocator) -> Vec<String>;

    /// Whether changing a slot invalidates the slots after it.
    fn truncates_deeper_slots(&self) -> bool {
        false
    }

    /// Position of `value` in the options of `slot`.
    fn option_index(&self, selection: &[String], slot: usize, value: &str) -> Option<usize> {
        self.options(selection, slot).iter().position(|o| o == value)
    }
}

/// Store `value` in `slot`, growing the selection as needed.
pub fn set_slot(picker: &dyn Picker, selection: &mut Vec<String>, slot: usize, value: &str) {
    if selection.len() <= slot {
        selection.resize(slot + 1, String::new());
    }
    selection[slot] = value.to_string();
    if picker.truncates_deeper_slots() {
        selection.truncate(slot + 1);
    }
}

/// Three flat selects: class, scaling, mode. The file is `<class>.csv`.
#[derive(Debug, Clone)]
pub struct TriplePicker {
    classes: Vec<String>,
    scalings: Vec<String>,
    modes: Vec<String>,
}

const TRIPLE_LABELS: [&str; 3] = ["class", "scaling", "mode"];

impl TriplePicker {
    pub fn new(classes: Vec<String>, scalings: Vec<String>, modes: Vec<String>) -> Self {
        Self {
            classes,
            scalings,
            modes,
        }
    }

    fn slot(selection: &[String], slot: usize) -> &str {
        selection.get(slot).map(String::as_str).unwrap_or("")
    }
}

impl Picker for TriplePicker {
    fn name(&self) -> &'static str {
        "triple"
    }

    fn slot_count(&self, _selection: &[String]) -> usize {
        TRIPLE_LABELS.len()
    }

    fn slot_label(&self, slot: usize) -> String {
        TRIPLE_LABELS.get(slot).copied().unwrap_or("").to_string()
    }

    fn options(&self, _selection: &[String], slot: usize) -> Vec<String> {
        match slot {
            0 => self.classes.clone(),
            1 => self.scalings.clone(),
            2 => self.modes.clone(),
            _ => Vec::new(),
        }
    }

    fn resolve(&self, selection: &[String]) -> DatasetLocator {
        let class = Self::slot(selection, 0);
        let file = if class.is_empty() {
            String::new()
        } else {
            format!("{}.csv", class)
        };
        DatasetLocator::new(
            (0..TRIPLE_LABELS.len()).map(|slot| Self::slot(selection, slot)),
            file,
        )
    }

    fn selection_for(&self, locator: &DatasetLocator) -> Vec<String> {
        (0..TRIPLE_LABELS.len())
            .map(|slot| locator.segments.get(slot).cloned().unwrap_or_default())
            .collect()
    }
}

/// Nested menu: one slot per folder level, then the file.
#[derive(Debug, Clone)]
pub struct TreePicker {
    root: MenuNode,
}

impl TreePicker {
    pub fn new(root: MenuNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &MenuNode {
        &self.root
    }

    /// Deepest node reached by following the non-empty prefix of `selection`.
    fn walk<'a>(&'a self, selection: &[String]) -> (&'a MenuNode, usize) {
        let mut node = &self.root;
        let mut depth = 0;
        for name in selection {
            match node.child(name) {
                Some(child) => {
                    node = child;
                    depth += 1;
                }
                None => break,
            }
        }
        (node, depth)
    }
}

impl Picker for TreePicker {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn slot_count(&self, selection: &[String]) -> usize {
        let (node, depth) = self.walk(selection);
        if node.is_leaf() {
            depth
        } else {
            depth + 1
        }
    }

    fn slot_label(&self, slot: usize) -> String {
        format!("level {}", slot + 1)
    }

    fn options(&self, selection: &[String], slot: usize) -> Vec<String> {
        let prefix = &selection[..slot.min(selection.len())];
        match self.root.find(prefix) {
            Some(node) if prefix.len() == slot => {
                node.children().iter().map(|c| c.name().to_string()).collect()
            }
            _ => Vec::new(),
        }
    }

    fn resolve(&self, selection: &[String]) -> DatasetLocator {
        match self.root.find(selection) {
            Some(MenuNode::Leaf { locator, .. }) => locator.clone(),
            _ => {
                let (_, depth) = self.walk(selection);
                DatasetLocator::new(selection[..depth].iter().cloned(), String::new())
            }
        }
    }

    fn selection_for(&self, locator: &DatasetLocator) -> Vec<String> {
        locator
            .segments
            .iter()
            .cloned()
            .chain(std::iter::once(locator.file.clone()))
            .collect()
    }

    fn truncates_deeper_slots(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn triple() -> TriplePicker {
        TriplePicker::new(
            strings(&["ttbar", "ggh (all)"]),
            strings(&["m10_to_m10__Binary__Sigmoid"]),
            strings(&["TP", "all"]),
        )
    }

    fn tree() -> TreePicker {
        TreePicker::new(
            MenuNode::from_folder_structure(&json!({
                "ttbar": { "m10": { "TP": { "files": ["ttbar.csv"] } } }
            }))
            .unwrap(),
        )
    }

    #[test]
    fn triple_resolves_class_file() {
        let picker = triple();
        let locator = picker.resolve(&strings(&["ggh (all)", "m10_to_m10__Binary__Sigmoid", "TP"]));
        assert!(locator.is_complete());
        assert_eq!(locator.file, "ggh (all).csv");
        assert_eq!(picker.selection_for(&locator), strings(&["ggh (all)", "m10_to_m10__Binary__Sigmoid", "TP"]));
    }

    #[test]
    fn triple_partial_selection_is_incomplete() {
        let picker = triple();
        assert!(!picker.resolve(&strings(&["ttbar"])).is_complete());
        assert!(!picker.resolve(&strings(&["ttbar", "", "TP"])).is_complete());
        assert!(!picker.resolve(&[]).is_complete());
    }

    #[test]
    fn set_slot_keeps_other_triple_slots() {
        let picker = triple();
        let mut selection = Vec::new();
        set_slot(&picker, &mut selection, 2, "TP");
        set_slot(&picker, &mut selection, 0, "ttbar");
        assert_eq!(selection, strings(&["ttbar", "", "TP"]));
    }

    #[test]
    fn tree_walks_levels() {
        let picker = tree();
        assert_eq!(picker.slot_count(&[]), 1);
        assert_eq!(picker.options(&[], 0), strings(&["ttbar"]));
        let partial = strings(&["ttbar", "m10"]);
        assert_eq!(picker.slot_count(&partial), 3);
        assert_eq!(picker.options(&partial, 2), strings(&["TP"]));
        assert!(!picker.resolve(&partial).is_complete());

        let full = strings(&["ttbar", "m10", "TP", "ttbar.csv"]);
        assert_eq!(picker.slot_count(&full), 4);
        let locator = picker.resolve(&full);
        assert_eq!(locator, DatasetLocator::new(["ttbar", "m10", "TP"], "ttbar.csv"));
        assert_eq!(picker.selection_for(&locator), full);
    }

    #[test]
    fn tree_truncates_deeper_slots() {
        let picker = tree();
        let mut selection = strings(&["ttbar", "m10", "TP", "ttbar.csv"]);
        set_slot(&picker, &mut selection, 1, "other");
        assert_eq!(selection, strings(&["ttbar", "other"]));
        assert!(picker.options(&selection, 3).is_empty());
    }
}
