use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub mod app;
pub mod board;
pub mod cache;
pub mod config;
pub mod error;
pub mod error_display;
pub mod highlight;
pub mod loader;
pub mod locator;
pub mod logging;
pub mod menu;
pub mod permalink;
pub mod picker;
pub mod render;
pub mod scale;
pub mod sort;
pub mod store;
pub mod table;
pub mod widgets;

pub use app::{App, AppEvent, InputMode, TerminalBoard};
pub use board::{Board, RestoreOutcome, Surface};
pub use cache::CacheManager;
pub use config::{
    nearest_ansi, nearest_indexed, AppConfig, ColorParser, ConfigManager, Theme,
};
pub use csvboard_cli::{Args, LogLevel, PickerKind};
pub use loader::{fetcher_for_root, AnyFetcher, DirFetcher, Fetcher, MemoryFetcher};
pub use locator::DatasetLocator;
pub use menu::MenuNode;
pub use picker::{Picker, TreePicker, TriplePicker};
pub use widgets::board::TerminalSurface;

/// Application name used for config and cache directories
pub const APP_NAME: &str = "csvboard";

/// Menu for the tree picker.
///
/// Uses the configured folder-structure file when there is one. Otherwise a
/// directory root is scanned under `data/` and an HTTP root is asked for its
/// published folder-structure document.
pub async fn load_menu(config: &AppConfig, fetcher: &AnyFetcher) -> Result<MenuNode> {
    if let Some(path) = &config.data.folder_structure {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read folder structure {}", path.display()))?;
        return MenuNode::from_folder_structure_str(&text);
    }
    match fetcher {
        AnyFetcher::Dir(dir) => MenuNode::scan_dir(&dir.root().join(locator::DATA_DIR)),
        #[cfg(feature = "http")]
        AnyFetcher::Http(_) => {
            let text = fetcher
                .fetch(menu::FOLDER_STRUCTURE_FILE)
                .await
                .map_err(|e| eyre!("Failed to fetch {}: {}", menu::FOLDER_STRUCTURE_FILE, e))?;
            MenuNode::from_folder_structure_str(&text)
        }
    }
}

pub async fn build_picker(config: &AppConfig, fetcher: &AnyFetcher) -> Result<Box<dyn Picker>> {
    let picker: Box<dyn Picker> = match config.picker_kind()? {
        PickerKind::Triple => Box::new(TriplePicker::new(
            config.catalog.classes.clone(),
            config.catalog.scalings.clone(),
            config.catalog.modes.clone(),
        )),
        PickerKind::Tree => {
            let menu = load_menu(config, fetcher).await?;
            if menu.leaf_count() == 0 {
                return Err(eyre!("No datasets found under {}", config.data.root));
            }
            Box::new(TreePicker::new(menu))
        }
    };
    info!(picker = picker.name(), root = %config.data.root, "picker ready");
    Ok(picker)
}

/// Board wired to the terminal surface and the configured data root.
pub async fn build_board(config: &AppConfig) -> Result<TerminalBoard> {
    let fetcher = fetcher_for_root(&config.data.root);
    if let AnyFetcher::Dir(dir) = &fetcher {
        if !dir.root().is_dir() {
            return Err(eyre!(
                "Data root {} is not a directory",
                Path::new(&config.data.root).display()
            ));
        }
    }
    let picker = build_picker(config, &fetcher).await?;
    Ok(Board::new(
        picker,
        Arc::new(fetcher),
        TerminalSurface::new(),
        config.palette_size(),
    ))
}

/// Restore a startup permalink, then apply `--aggregate` on top of it so the flag
/// is not overwritten by the link's own mode.
pub async fn restore_startup<S: Surface, F: Fetcher>(
    board: &mut Board<S, F>,
    permalink: Option<&str>,
    aggregate: bool,
) -> Option<RestoreOutcome> {
    let outcome = match permalink {
        Some(fragment) => Some(board.restore(fragment).await),
        None => None,
    };
    if aggregate {
        board.set_aggregate_mode(true);
    }
    outcome
}
