//! Terminal rendering of the board: one pane per column.

use crate::board::Surface;
use crate::config::{DisplayConfig, Theme};
use crate::error::LoadError;
use crate::error_display::user_message_from_load;
use crate::highlight::ColumnDecorations;
use crate::render::{RenderCell, RenderInstruction, TableView, ValueCell};
use crate::sort::SortDirection;
use crate::store::{Column, ColumnId};
use crate::table::MATH_DELIMITER;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, StatefulWidget,
        Table, TableState, Widget, Wrap,
    },
};
use std::collections::BTreeMap;

/// What a pane currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PaneContent {
    #[default]
    Empty,
    Table(TableView),
    Error(String),
}

#[derive(Debug, Clone, Default)]
pub struct Pane {
    pub title: String,
    pub selection: Vec<String>,
    pub content: PaneContent,
    pub decorations: ColumnDecorations,
    pub loading: bool,
    /// Markup cells are shown without their delimiters.
    pub typeset: bool,
}

impl Pane {
    pub fn table(&self) -> Option<&TableView> {
        match &self.content {
            PaneContent::Table(view) => Some(view),
            _ => None,
        }
    }
}

/// [`Surface`] that keeps the latest state of every pane for the next frame.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    panes: BTreeMap<ColumnId, Pane>,
    fragment: String,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pane(&self, id: ColumnId) -> Option<&Pane> {
        self.panes.get(&id)
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    fn pane_mut(&mut self, id: ColumnId) -> &mut Pane {
        self.panes.entry(id).or_default()
    }
}

impl Surface for TerminalSurface {
    fn render_table(&mut self, column: &Column, instruction: &RenderInstruction) {
        let pane = self.pane_mut(column.id);
        pane.title = column.title();
        pane.loading = column.status.is_loading();
        pane.typeset = false;
        pane.decorations = ColumnDecorations::default();
        pane.content = match instruction {
            RenderInstruction::Empty => PaneContent::Empty,
            RenderInstruction::Table(view) => PaneContent::Table(view.clone()),
        };
    }

    fn render_error(&mut self, column: &Column, error: &LoadError) {
        let pane = self.pane_mut(column.id);
        pane.title = column.title();
        pane.loading = false;
        pane.decorations = ColumnDecorations::default();
        pane.content = PaneContent::Error(user_message_from_load(error));
    }

    fn remove_column(&mut self, id: ColumnId) {
        self.panes.remove(&id);
    }

    fn decorate(&mut self, id: ColumnId, decorations: &ColumnDecorations) {
        self.pane_mut(id).decorations = decorations.clone();
    }

    fn show_selection(&mut self, id: ColumnId, selection: &[String]) {
        self.pane_mut(id).selection = selection.to_vec();
    }

    fn typeset(&mut self, id: ColumnId) {
        self.pane_mut(id).typeset = true;
    }

    fn set_fragment(&mut self, fragment: &str) {
        self.fragment = fragment.to_string();
    }
}

/// Bar of `width` cells filled in proportion to `percent`.
pub fn bar_text(percent: f64, width: usize) -> String {
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), " ".repeat(width - filled))
}

/// Cell text as displayed. Typeset markup drops its outer delimiters.
pub fn display_text(raw: &str, markup: bool, typeset: bool) -> &str {
    if markup && typeset {
        raw.strip_prefix(MATH_DELIMITER)
            .and_then(|r| r.strip_suffix(MATH_DELIMITER))
            .unwrap_or(raw)
    } else {
        raw
    }
}

/// Open picker list drawn over a pane.
pub struct PickerOverlay<'a> {
    pub label: String,
    pub options: &'a [String],
    pub selected: usize,
}

pub struct PaneView<'a> {
    pub pane: &'a Pane,
    pub slot_labels: Vec<String>,
    pub focused: bool,
    /// (row, cell) of the cursor in the rendered table
    pub cursor: Option<(usize, usize)>,
    pub active_slot: Option<usize>,
    pub overlay: Option<PickerOverlay<'a>>,
    pub theme: &'a Theme,
    pub display: &'a DisplayConfig,
}

impl PaneView<'_> {
    fn selection_line(&self) -> Line<'static> {
        let mut spans = Vec::new();
        for (slot, label) in self.slot_labels.iter().enumerate() {
            if slot > 0 {
                spans.push(Span::raw(" | "));
            }
            let value = self
                .pane
                .selection
                .get(slot)
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| format!("<{}>", label));
            let mut style = Style::default();
            if self.active_slot == Some(slot) {
                style = style.add_modifier(Modifier::REVERSED);
            } else if value.starts_with('<') {
                style = style.fg(self.theme.get("dimmed"));
            }
            spans.push(Span::styled(value, style));
        }
        Line::from(spans)
    }

    fn render_table(&self, view: &TableView, area: Rect, buf: &mut Buffer) {
        let bar_width = self.display.bar_width as usize;
        let header = Row::new(view.header.iter().enumerate().map(|(i, cell)| {
            let mut text = display_text(&cell.text, cell.markup, self.pane.typeset).to_string();
            if let Some(sort) = view.sort.filter(|s| s.field == i) {
                text.push_str(match sort.direction {
                    SortDirection::Asc => " ▲",
                    SortDirection::Desc => " ▼",
                });
            }
            Cell::from(text)
        }))
        .style(
            Style::default()
                .fg(self.theme.get("header"))
                .add_modifier(Modifier::BOLD),
        );

        let rows = view.rows.iter().enumerate().map(|(r, row)| {
            let cells = row.cells.iter().enumerate().map(|(c, cell)| {
                let mut style = Style::default();
                if let Some(color) = self.pane.decorations.color_at(r, c) {
                    style = style.bg(self.theme.highlight(color)).fg(Color::Black);
                }
                if self.focused && self.cursor == Some((r, c)) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                match cell {
                    RenderCell::Text(text) => Cell::from(
                        display_text(&text.raw, text.markup, self.pane.typeset).to_string(),
                    )
                    .style(style),
                    RenderCell::Value(ValueCell::Bar { percent, display }) => {
                        let mut spans = Vec::new();
                        if self.display.show_bars {
                            spans.push(Span::styled(
                                bar_text(*percent, bar_width),
                                Style::default().fg(self.theme.get("bar")),
                            ));
                            spans.push(Span::raw(" "));
                        }
                        spans.push(Span::raw(display.to_string()));
                        Cell::from(Line::from(spans)).style(style)
                    }
                    RenderCell::Value(ValueCell::Plain(text)) => {
                        Cell::from(text.clone()).style(style)
                    }
                }
            });
            let mut row_style = Style::default();
            if self.pane.decorations.is_row_highlighted(r) {
                row_style = row_style.bg(self.theme.get("row_highlight"));
            }
            Row::new(cells).style(row_style)
        });

        let value_width = if self.display.show_bars {
            bar_width as u16 + 14
        } else {
            14
        };
        let widths = (0..view.width()).map(|i| {
            if i == view.value_index {
                Constraint::Length(value_width)
            } else {
                Constraint::Fill(1)
            }
        });

        let mut state = TableState::default().with_selected(self.cursor.map(|(row, _)| row));
        let table = Table::new(rows, widths).header(header).column_spacing(1);
        StatefulWidget::render(table, area, buf, &mut state);
    }

    fn render_overlay(&self, overlay: &PickerOverlay<'_>, area: Rect, buf: &mut Buffer) {
        let height = (overlay.options.len() as u16 + 2).min(area.height);
        let area = Rect {
            height,
            ..area
        };
        Clear.render(area, buf);
        let items: Vec<ListItem> = overlay
            .options
            .iter()
            .map(|o| ListItem::new(o.as_str()))
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.get("border_focus")))
                    .title(format!(" {} ", overlay.label)),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        let mut state = ListState::default().with_selected(Some(overlay.selected));
        StatefulWidget::render(list, area, buf, &mut state);
    }
}

impl Widget for PaneView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border = if self.focused {
            self.theme.get("border_focus")
        } else {
            self.theme.get("border")
        };
        let mut title = format!(" {} ", self.pane.title);
        if self.pane.loading {
            title.push_str("(loading) ");
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(title);
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Fill(1)])
            .split(inner);

        Paragraph::new(self.selection_line()).render(layout[0], buf);

        match &self.pane.content {
            PaneContent::Empty => {
                let hint = if self.pane.loading {
                    "Loading…"
                } else {
                    "No data. Press p to pick a dataset."
                };
                Paragraph::new(hint)
                    .style(Style::default().fg(self.theme.get("dimmed")))
                    .render(layout[1], buf);
            }
            PaneContent::Error(message) => {
                Paragraph::new(message.as_str())
                    .style(Style::default().fg(self.theme.get("error")))
                    .wrap(Wrap { trim: true })
                    .render(layout[1], buf);
            }
            PaneContent::Table(view) => self.render_table(view, layout[1], buf),
        }

        if let Some(overlay) = &self.overlay {
            self.render_overlay(overlay, layout[1], buf);
        }
    }
}
