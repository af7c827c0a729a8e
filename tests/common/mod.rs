#![allow(dead_code)]

use csvboard::{DatasetLocator, DirFetcher};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const SCALING: &str = "m10_to_m10__Binary__Sigmoid";
pub const MODE: &str = "TP";

pub const TTBAR_CSV: &str = "\
feature,process,variable,importance
pt,ttbar,jet_pt,4.0
eta,ttbar,jet_eta,1.5
$\\Delta R$,ttbar,dr,0.25
";

pub const GGH_CSV: &str = "\
feature,process,variable,importance
pt,ggh,jet_pt,8.0
mjj,ggh,mjj,2.0
";

pub fn locator(class: &str) -> DatasetLocator {
    DatasetLocator::new([class, SCALING, MODE], format!("{}.csv", class))
}

pub fn selection(class: &str) -> Vec<String> {
    vec![class.to_string(), SCALING.to_string(), MODE.to_string()]
}

pub fn write_dataset(root: &Path, locator: &DatasetLocator, text: &str) {
    let mut dir = root.join("data");
    for segment in &locator.segments {
        dir.push(segment);
    }
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(&locator.file), text).unwrap();
}

/// A data root with `ttbar` and `ggh (all)` datasets for one scaling and mode.
pub fn data_root() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    write_dataset(temp.path(), &locator("ttbar"), TTBAR_CSV);
    write_dataset(temp.path(), &locator("ggh (all)"), GGH_CSV);
    temp
}

pub fn fetcher(root: &TempDir) -> DirFetcher {
    DirFetcher::new(root.path())
}

pub fn classes() -> Vec<String> {
    vec!["ttbar".to_string(), "ggh (all)".to_string(), "missing".to_string()]
}
