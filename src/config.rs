use crate::highlight::DEFAULT_PALETTE_SIZE;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use csvboard_cli::{Args, PickerKind};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use supports_color::Stream;

const CONFIG_FILE: &str = "config.toml";

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Default configuration template (every option commented out)
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write the default template to config.toml
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path(CONFIG_FILE);

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version
    pub version: String,
    pub data: DataConfig,
    pub catalog: CatalogConfig,
    pub picker: PickerConfig,
    pub display: DisplayConfig,
    pub theme: ThemeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory or http(s) URL containing the `data/` tree
    pub root: String,
    /// Folder-structure JSON for the tree picker
    pub folder_structure: Option<PathBuf>,
}

/// Choices offered by the triple picker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub classes: Vec<String>,
    pub scalings: Vec<String>,
    pub modes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub column_min_width: u16,
    pub bar_width: u16,
    pub show_bars: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: ColorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Highlight palette; aggregate mode cycles through it
    pub palette: Vec<String>,
    pub row_highlight: String,
    pub bar: String,
    pub header: String,
    pub error: String,
    pub border: String,
    pub border_focus: String,
    pub dimmed: String,
    pub status_bg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file; defaults to csvboard.log in the cache directory
    pub file: Option<PathBuf>,
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            data: DataConfig::default(),
            catalog: CatalogConfig::default(),
            picker: PickerConfig::default(),
            display: DisplayConfig::default(),
            theme: ThemeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            folder_structure: None,
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            classes: to_strings(&[
                "0+1 jets vbf - vbf (201-202)",
                "0 jets ggh - ggh (105-106)",
                "1 jets ggh - ggh (107-109)",
                "2p jets high mjj - ggh (113-116)",
                "2p jets high mjj high ptH vbf (206)",
                "2p jets high mjj low ptH high ptHjj vbf - vbf (209-210)",
                "2p jets high mjj low ptH low ptHjj vbf - vbf (207-208)",
                "2p jets low mjj - ggh (110-112)",
                "2p jets low mjj - vbf (203-205)",
                "background (all)",
                "diboson",
                "dyjets",
                "embedding",
                "ggh (105)",
                "ggh (106)",
                "ggh (107)",
                "ggh (108)",
                "ggh (109)",
                "ggh (all)",
                "high ptH ggh - ggh (101-104)",
                "jetFakes",
                "signal (all)",
                "ttbar",
                "vbf (all)",
                "all (binary)",
            ]),
            scalings: to_strings(&[
                "m10_to_m10__Multiclass__Sigmoid",
                "m10_to_m10__Multiclass__Softmax",
                "m10_to_NaN__Multiclass__Sigmoid",
                "m10_to_NaN__Multiclass__Softmax",
                "m10_to_m10__Binary__Sigmoid",
                "m10_to_NaN__Binary__Sigmoid",
            ]),
            modes: to_strings(&["TP", "all"]),
        }
    }
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            kind: PickerKind::Triple.as_str().to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            column_min_width: 36,
            bar_width: 10,
            show_bars: true,
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            colors: ColorConfig::default(),
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            palette: to_strings(&[
                "#ffd54f", "#81d4fa", "#a5d6a7", "#f48fb1", "#ce93d8", "#ffab91", "#80cbc4",
                "#e6ee9c", "#b0bec5", "#bcaaa4", "#9fa8da", "#ffcc80",
            ]),
            row_highlight: "indexed(238)".to_string(),
            bar: "cyan".to_string(),
            header: "white".to_string(),
            error: "red".to_string(),
            border: "dark_gray".to_string(),
            border_focus: "yellow".to_string(),
            dimmed: "dark_gray".to_string(),
            status_bg: "indexed(236)".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        Self::load_with_manager(&ConfigManager::new(app_name)?)
    }

    /// Load configuration using an explicit config directory
    pub fn load_with_manager(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        config.merge(Self::load_user_config(manager)?);
        config.validate()?;
        Ok(config)
    }

    fn load_user_config(manager: &ConfigManager) -> Result<AppConfig> {
        let config_path = manager.config_path(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.data.merge(other.data);
        self.catalog.merge(other.catalog);
        self.picker.merge(other.picker);
        self.display.merge(other.display);
        self.theme.merge(other.theme);
        self.logging.merge(other.logging);
    }

    /// Command-line flags override the config file
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(root) = &args.data_root {
            self.data.root = root.clone();
        }
        if let Some(path) = &args.folder_structure {
            self.data.folder_structure = Some(path.clone());
        }
        if let Some(kind) = args.picker {
            self.picker.kind = kind.as_str().to_string();
        }
        if let Some(path) = &args.log_file {
            self.logging.file = Some(path.clone());
        }
        if let Some(level) = args.log_level {
            self.logging.level = level.as_str().to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.data.root.trim().is_empty() {
            return Err(eyre!("data.root must not be empty"));
        }

        self.picker_kind()?;

        if self.display.column_min_width < 10 {
            return Err(eyre!("column_min_width must be at least 10"));
        }

        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(eyre!(
                    "Invalid logging level: {}. Must be one of error, warn, info, debug, trace",
                    self.logging.level
                ))
            }
        }

        if self.theme.colors.palette.is_empty() {
            return Err(eyre!("theme.colors.palette must contain at least one color"));
        }

        let parser = ColorParser::new();
        self.theme.colors.validate(&parser)?;

        Ok(())
    }

    pub fn picker_kind(&self) -> Result<PickerKind> {
        match self.picker.kind.to_lowercase().as_str() {
            "triple" => Ok(PickerKind::Triple),
            "tree" => Ok(PickerKind::Tree),
            other => Err(eyre!(
                "Invalid picker kind: {}. Must be 'triple' or 'tree'",
                other
            )),
        }
    }

    /// Number of highlight colors
    pub fn palette_size(&self) -> usize {
        match self.theme.colors.palette.len() {
            0 => DEFAULT_PALETTE_SIZE,
            n => n,
        }
    }
}

impl DataConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DataConfig::default();
        if other.root != default.root {
            self.root = other.root;
        }
        if other.folder_structure.is_some() {
            self.folder_structure = other.folder_structure;
        }
    }
}

impl CatalogConfig {
    pub fn merge(&mut self, other: Self) {
        let default = CatalogConfig::default();
        if other.classes != default.classes {
            self.classes = other.classes;
        }
        if other.scalings != default.scalings {
            self.scalings = other.scalings;
        }
        if other.modes != default.modes {
            self.modes = other.modes;
        }
    }
}

impl PickerConfig {
    pub fn merge(&mut self, other: Self) {
        if other.kind != PickerConfig::default().kind {
            self.kind = other.kind;
        }
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.column_min_width != default.column_min_width {
            self.column_min_width = other.column_min_width;
        }
        if other.bar_width != default.bar_width {
            self.bar_width = other.bar_width;
        }
        if other.show_bars != default.show_bars {
            self.show_bars = other.show_bars;
        }
    }
}

impl ThemeConfig {
    pub fn merge(&mut self, other: Self) {
        self.colors.merge(other.colors);
    }
}

impl ColorConfig {
    /// Validate all color strings can be parsed
    fn validate(&self, parser: &ColorParser) -> Result<()> {
        for (i, color) in self.palette.iter().enumerate() {
            parser
                .parse(color)
                .map_err(|e| eyre!("Invalid color value for 'palette[{}]': {}", i, e))?;
        }
        for (name, value) in self.named() {
            parser
                .parse(value)
                .map_err(|e| eyre!("Invalid color value for '{}': {}", name, e))?;
        }
        Ok(())
    }

    /// Every non-palette color with its config key
    fn named(&self) -> [(&'static str, &String); 8] {
        [
            ("row_highlight", &self.row_highlight),
            ("bar", &self.bar),
            ("header", &self.header),
            ("error", &self.error),
            ("border", &self.border),
            ("border_focus", &self.border_focus),
            ("dimmed", &self.dimmed),
            ("status_bg", &self.status_bg),
        ]
    }

    pub fn merge(&mut self, other: Self) {
        let default = ColorConfig::default();

        if other.palette != default.palette {
            self.palette = other.palette;
        }
        if other.row_highlight != default.row_highlight {
            self.row_highlight = other.row_highlight;
        }
        if other.bar != default.bar {
            self.bar = other.bar;
        }
        if other.header != default.header {
            self.header = other.header;
        }
        if other.error != default.error {
            self.error = other.error;
        }
        if other.border != default.border {
            self.border = other.border;
        }
        if other.border_focus != default.border_focus {
            self.border_focus = other.border_focus;
        }
        if other.dimmed != default.dimmed {
            self.dimmed = other.dimmed;
        }
        if other.status_bg != default.status_bg {
            self.status_bg = other.status_bg;
        }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.file.is_some() {
            self.file = other.file;
        }
        if other.level != LoggingConfig::default().level {
            self.level = other.level;
        }
    }
}

/// How many colors the terminal can show. Hex colors are reduced to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorDepth {
    TrueColor,
    Indexed256,
    Ansi8,
}

/// Turns theme strings into terminal colors for the detected color depth.
///
/// Accepted forms are `#rrggbb`, `indexed(N)` and the ANSI color names.
/// With `NO_COLOR` set every color parses as [`Color::Reset`].
pub struct ColorParser {
    depth: ColorDepth,
    no_color: bool,
}

/// Names are matched after lowercasing, with spaces and dashes read as `_` and
/// `grey` read as `gray`.
const NAMED_COLORS: &[(&str, Color)] = &[
    ("reset", Color::Reset),
    ("black", Color::Black),
    ("red", Color::Red),
    ("green", Color::Green),
    ("yellow", Color::Yellow),
    ("blue", Color::Blue),
    ("magenta", Color::Magenta),
    ("cyan", Color::Cyan),
    ("white", Color::White),
    ("light_gray", Color::Indexed(7)),
    ("gray", Color::Indexed(8)),
    ("dark_gray", Color::Indexed(8)),
    ("bright_red", Color::Indexed(9)),
    ("bright_green", Color::Indexed(10)),
    ("bright_yellow", Color::Indexed(11)),
    ("bright_blue", Color::Indexed(12)),
    ("bright_magenta", Color::Indexed(13)),
    ("bright_cyan", Color::Indexed(14)),
];

impl ColorParser {
    pub fn new() -> Self {
        let depth = match supports_color::on(Stream::Stdout) {
            Some(level) if level.has_16m => ColorDepth::TrueColor,
            Some(level) if level.has_256 => ColorDepth::Indexed256,
            _ => ColorDepth::Ansi8,
        };
        Self {
            depth,
            no_color: std::env::var_os("NO_COLOR").is_some(),
        }
    }

    /// Parser with fixed capabilities
    pub fn with_capabilities(true_color: bool, color_256: bool) -> Self {
        let depth = if true_color {
            ColorDepth::TrueColor
        } else if color_256 {
            ColorDepth::Indexed256
        } else {
            ColorDepth::Ansi8
        };
        Self {
            depth,
            no_color: false,
        }
    }

    pub fn parse(&self, s: &str) -> Result<Color> {
        if self.no_color {
            return Ok(Color::Reset);
        }
        let text = s.trim();

        if text.starts_with('#') {
            let (r, g, b) = parse_hex(text)?;
            return Ok(match self.depth {
                ColorDepth::TrueColor => Color::Rgb(r, g, b),
                ColorDepth::Indexed256 => Color::Indexed(nearest_indexed(r, g, b)),
                ColorDepth::Ansi8 => nearest_ansi(r, g, b),
            });
        }

        let name = text
            .to_lowercase()
            .replace([' ', '-'], "_")
            .replace("grey", "gray");
        if let Some(inner) = name
            .strip_prefix("indexed(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return inner.parse::<u8>().map(Color::Indexed).map_err(|_| {
                eyre!("Invalid indexed color: '{}'. Expected indexed(0-255)", text)
            });
        }

        NAMED_COLORS
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, color)| *color)
            .ok_or_else(|| {
                eyre!(
                    "Unknown color name: '{}'. Use a basic or bright_ ANSI name, \
                     indexed(0-255) or #rrggbb",
                    text
                )
            })
    }
}

impl Default for ColorParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_hex(s: &str) -> Result<(u8, u8, u8)> {
    let value = s
        .strip_prefix('#')
        .filter(|digits| digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_hexdigit()))
        .and_then(|digits| u32::from_str_radix(digits, 16).ok())
        .ok_or_else(|| eyre!("Invalid hex color: '{}'. Expected #rrggbb", s))?;
    let [_, r, g, b] = value.to_be_bytes();
    Ok((r, g, b))
}

fn distance(a: (u8, u8, u8), b: (u8, u8, u8)) -> u32 {
    let d = |x: u8, y: u8| (i32::from(x) - i32::from(y)).pow(2) as u32;
    d(a.0, b.0) + d(a.1, b.1) + d(a.2, b.2)
}

/// Channel levels of the xterm 6x6x6 cube (indexes 16-231).
const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

/// Closest xterm-256 index: the nearest cube entry or gray ramp step (232-255),
/// whichever is closer. The cube wins ties.
pub fn nearest_indexed(r: u8, g: u8, b: u8) -> u8 {
    let level = |c: u8| {
        (0..CUBE_LEVELS.len())
            .min_by_key(|&i| (i32::from(CUBE_LEVELS[i]) - i32::from(c)).abs())
            .unwrap_or(0)
    };
    let (ri, gi, bi) = (level(r), level(g), level(b));
    let cube = (CUBE_LEVELS[ri], CUBE_LEVELS[gi], CUBE_LEVELS[bi]);
    let cube_index = (16 + 36 * ri + 6 * gi + bi) as u8;

    // ramp step k is gray level 8 + 10k
    let mean = (u32::from(r) + u32::from(g) + u32::from(b)) / 3;
    let step = (mean.saturating_sub(3) / 10).min(23) as u8;
    let gray = 8 + 10 * step;

    if distance((r, g, b), (gray, gray, gray)) < distance((r, g, b), cube) {
        232 + step
    } else {
        cube_index
    }
}

/// xterm's default RGB for the eight basic colors.
const ANSI_COLORS: [(Color, (u8, u8, u8)); 8] = [
    (Color::Black, (0, 0, 0)),
    (Color::Red, (205, 0, 0)),
    (Color::Green, (0, 205, 0)),
    (Color::Yellow, (205, 205, 0)),
    (Color::Blue, (0, 0, 238)),
    (Color::Magenta, (205, 0, 205)),
    (Color::Cyan, (0, 205, 205)),
    (Color::White, (229, 229, 229)),
];

/// Closest of the eight basic colors.
pub fn nearest_ansi(r: u8, g: u8, b: u8) -> Color {
    ANSI_COLORS
        .iter()
        .min_by_key(|(_, rgb)| distance((r, g, b), *rgb))
        .map_or(Color::Reset, |(color, _)| *color)
}

/// Theme containing parsed colors ready for use
#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: HashMap<String, Color>,
    pub palette: Vec<Color>,
}

impl Theme {
    /// Parse every color of a ThemeConfig
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        Self::from_config_with(config, &ColorParser::new())
    }

    pub fn from_config_with(config: &ThemeConfig, parser: &ColorParser) -> Result<Self> {
        let mut colors = HashMap::new();
        for (name, value) in config.colors.named() {
            colors.insert(name.to_string(), parser.parse(value)?);
        }
        let palette = config
            .colors
            .palette
            .iter()
            .map(|c| parser.parse(c))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { colors, palette })
    }

    /// Get a color by name, returns Reset if not found
    pub fn get(&self, name: &str) -> Color {
        self.colors.get(name).copied().unwrap_or(Color::Reset)
    }

    /// Palette color for a highlight index; wraps around
    pub fn highlight(&self, index: usize) -> Color {
        if self.palette.is_empty() {
            return Color::Reset;
        }
        self.palette[index % self.palette.len()]
    }
}

// Default configuration template
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");
