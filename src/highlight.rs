//! Cross-column highlighting of variable tokens and whole rows.

use crate::render::{RenderCell, RenderInstruction};

/// Number of highlight colors in the default palette.
pub const DEFAULT_PALETTE_SIZE: usize = 12;

/// Strip one layer of `$( … )$` or `$ … $` from a raw cell value.
///
/// Nested delimiters keep their inner layer (`$$x$$` becomes `$x$`); a delimiter on
/// only one side leaves the value unchanged.
pub fn normalize_token(raw: &str) -> &str {
    if let Some(inner) = raw.strip_prefix("$(").and_then(|r| r.strip_suffix(")$")) {
        return inner;
    }
    if raw.len() >= 2 {
        if let Some(inner) = raw.strip_prefix('$').and_then(|r| r.strip_suffix('$')) {
            return inner;
        }
    }
    raw
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightMode {
    /// At most one token; a new click replaces it.
    #[default]
    Exclusive,
    /// Any number of tokens, each with its own palette color.
    Aggregate,
}

/// Which tokens (or which row) are currently emphasized.
#[derive(Debug, Clone)]
pub struct HighlightState {
    mode: HighlightMode,
    palette_size: usize,
    tokens: Vec<(String, usize)>,
    row: Option<String>,
}

impl Default for HighlightState {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE_SIZE)
    }
}

impl HighlightState {
    pub fn new(palette_size: usize) -> Self {
        Self {
            mode: HighlightMode::default(),
            palette_size: palette_size.max(1),
            tokens: Vec::new(),
            row: None,
        }
    }

    pub fn mode(&self) -> HighlightMode {
        self.mode
    }

    pub fn is_aggregate(&self) -> bool {
        self.mode == HighlightMode::Aggregate
    }

    pub fn palette_size(&self) -> usize {
        self.palette_size
    }

    /// Switching back to exclusive mode drops every highlight right away.
    pub fn set_mode(&mut self, mode: HighlightMode) {
        self.mode = mode;
        if mode == HighlightMode::Exclusive {
            self.clear();
        }
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
        self.row = None;
    }

    /// Highlighted tokens with their color index, in insertion order.
    pub fn entries(&self) -> &[(String, usize)] {
        &self.tokens
    }

    pub fn row(&self) -> Option<&str> {
        self.row.as_deref()
    }

    pub fn color_of(&self, token: &str) -> Option<usize> {
        self.tokens
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, color)| *color)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.row.is_none()
    }

    /// Apply a click on a highlightable cell. Returns the normalized token.
    pub fn click_cell(&mut self, raw: &str) -> String {
        let token = normalize_token(raw).to_string();
        self.row = None;
        match self.mode {
            HighlightMode::Exclusive => {
                self.tokens.clear();
                self.tokens.push((token.clone(), 0));
            }
            HighlightMode::Aggregate => {
                if self.color_of(&token).is_some() {
                    self.tokens.retain(|(t, _)| *t != token);
                } else {
                    let color = self.tokens.len() % self.palette_size;
                    self.tokens.push((token.clone(), color));
                }
            }
        }
        token
    }

    /// Highlight every row with `key`; token highlights are dropped in either mode.
    pub fn click_row(&mut self, key: &str) {
        self.tokens.clear();
        self.row = Some(key.to_string());
    }

    /// Replace the state wholesale (permalink restore). Colors are taken as given.
    pub fn restore(&mut self, mode: HighlightMode, entries: Vec<(String, usize)>) {
        self.mode = mode;
        self.row = None;
        self.tokens = entries;
    }

    /// Decorations for one rendered column under the current state.
    pub fn decorate(&self, instruction: &RenderInstruction) -> ColumnDecorations {
        let mut decorations = ColumnDecorations::default();
        let RenderInstruction::Table(view) = instruction else {
            return decorations;
        };
        for (row_index, row) in view.rows.iter().enumerate() {
            if self.row.as_deref() == Some(row.key.as_str()) {
                decorations.rows.push(row_index);
            }
            if self.tokens.is_empty() {
                continue;
            }
            for (cell_index, cell) in row.cells.iter().enumerate() {
                if let RenderCell::Text(text) = cell {
                    if let Some(color) = self.color_of(&text.token) {
                        decorations.cells.push(CellDecoration {
                            row: row_index,
                            cell: cell_index,
                            color,
                        });
                    }
                }
            }
        }
        decorations
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellDecoration {
    pub row: usize,
    pub cell: usize,
    pub color: usize,
}

/// Highlight hits for one rendered column; indices refer to the render instruction's rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDecorations {
    pub cells: Vec<CellDecoration>,
    pub rows: Vec<usize>,
}

impl ColumnDecorations {
    pub fn color_at(&self, row: usize, cell: usize) -> Option<usize> {
        self.cells
            .iter()
            .find(|d| d.row == row && d.cell == cell)
            .map(|d| d.color)
    }

    pub fn is_row_highlighted(&self, row: usize) -> bool {
        self.rows.contains(&row)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;
    use crate::table::Table;

    #[test]
    fn normalize_strips_one_layer() {
        assert_eq!(normalize_token("$x$"), "x");
        assert_eq!(normalize_token("$(x)$"), "x");
        assert_eq!(normalize_token("$$x$$"), "$x$");
        assert_eq!(normalize_token("$($(x)$)$"), "$(x)$");
        assert_eq!(normalize_token("x"), "x");
    }

    #[test]
    fn normalize_leaves_one_sided_delimiters_alone() {
        assert_eq!(normalize_token("$x"), "$x");
        assert_eq!(normalize_token("x$"), "x$");
        assert_eq!(normalize_token("$(x)"), "$(x)");
        assert_eq!(normalize_token("f(x)"), "f(x)");
        assert_eq!(normalize_token("$"), "$");
        assert_eq!(normalize_token("$$"), "");
    }

    #[test]
    fn exclusive_click_replaces() {
        let mut state = HighlightState::default();
        state.click_cell("a");
        state.click_cell("$b$");
        assert_eq!(state.entries(), &[("b".to_string(), 0)]);
        // clicking the same token again keeps it highlighted
        state.click_cell("b");
        assert_eq!(state.entries(), &[("b".to_string(), 0)]);
    }

    #[test]
    fn aggregate_toggle_keeps_colors_stable() {
        let mut state = HighlightState::default();
        state.set_mode(HighlightMode::Aggregate);
        state.click_cell("A");
        state.click_cell("B");
        state.click_cell("A");
        assert_eq!(state.entries(), &[("B".to_string(), 1)]);
    }

    #[test]
    fn aggregate_next_color_is_len_modulo_palette() {
        let mut state = HighlightState::new(3);
        state.set_mode(HighlightMode::Aggregate);
        for token in ["a", "b", "c", "d"] {
            state.click_cell(token);
        }
        assert_eq!(state.color_of("d"), Some(0));
        state.click_cell("b");
        // three tokens remain, so the next one gets 3 % 3 = 0; nobody is renumbered
        state.click_cell("e");
        assert_eq!(state.color_of("e"), Some(0));
        assert_eq!(state.color_of("c"), Some(2));
    }

    #[test]
    fn leaving_aggregate_mode_clears() {
        let mut state = HighlightState::default();
        state.set_mode(HighlightMode::Aggregate);
        state.click_cell("a");
        state.click_cell("b");
        state.set_mode(HighlightMode::Exclusive);
        assert!(state.is_empty());
    }

    #[test]
    fn row_and_token_highlights_exclude_each_other() {
        let mut state = HighlightState::default();
        state.set_mode(HighlightMode::Aggregate);
        state.click_cell("a");
        state.click_row("x-1");
        assert!(state.entries().is_empty());
        assert_eq!(state.row(), Some("x-1"));
        state.click_cell("a");
        assert_eq!(state.row(), None);
        assert_eq!(state.color_of("a"), Some(0));
    }

    #[test]
    fn decorate_matches_tokens_and_rows() {
        let table = Table::from_rows([
            vec!["var", "other", "score"],
            vec!["$p_T$", "eta", "2"],
            vec!["eta", "p_T", "1"],
        ]);
        let instruction = render(&table, None, 2.0);

        let mut state = HighlightState::default();
        state.click_cell("$(p_T)$");
        let decorations = state.decorate(&instruction);
        assert_eq!(decorations.color_at(0, 0), Some(0));
        assert_eq!(decorations.color_at(1, 1), Some(0));
        assert_eq!(decorations.color_at(0, 1), None);
        assert!(decorations.rows.is_empty());

        state.click_row("eta-p_T-1");
        let decorations = state.decorate(&instruction);
        assert!(decorations.cells.is_empty());
        assert!(decorations.is_row_highlighted(1));
        assert!(!decorations.is_row_highlighted(0));
    }

    #[test]
    fn decorate_empty_instruction_is_empty() {
        let mut state = HighlightState::default();
        state.click_cell("a");
        assert!(state.decorate(&RenderInstruction::Empty).is_empty());
    }
}
