use crate::board::Board;
use crate::config::{DisplayConfig, Theme};
use crate::loader::{AnyFetcher, LoadOutcome, LoadRequest};
use crate::render::RenderCell;
use crate::store::ColumnId;
use crate::widgets::board::{Pane, PaneView, PickerOverlay, TerminalSurface};
use crate::widgets::controls::{Controls, NORMAL_CONTROLS, PICKER_CONTROLS};
use crate::widgets::label_input::{LabelInput, LabelInputEvent};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Paragraph, Widget},
};
use std::sync::mpsc::Sender;
use tokio::runtime::Handle;
use tracing::debug;

pub type TerminalBoard = Board<TerminalSurface, AnyFetcher>;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    /// Start fetching a column's dataset in the background
    Load(LoadRequest),
    /// A background fetch finished
    Loaded(LoadOutcome),
    Exit,
    Crash(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Picker,
    Label,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PickerCursor {
    pub slot: usize,
    pub index: usize,
}

pub struct App {
    pub board: TerminalBoard,
    events: Sender<AppEvent>,
    runtime: Handle,
    pub input_mode: InputMode,
    focus: usize,
    /// (row, cell) in the focused column's rendered table
    cursor: (usize, usize),
    picker_cursor: PickerCursor,
    label_input: Option<LabelInput>,
    theme: Theme,
    display: DisplayConfig,
    status: String,
}

impl App {
    pub fn new(
        board: TerminalBoard,
        events: Sender<AppEvent>,
        runtime: Handle,
        theme: Theme,
        display: DisplayConfig,
    ) -> App {
        App {
            board,
            events,
            runtime,
            input_mode: InputMode::Normal,
            focus: 0,
            cursor: (0, 0),
            picker_cursor: PickerCursor::default(),
            label_input: None,
            theme,
            display,
            status: String::new(),
        }
    }

    pub fn sender(&self) -> Sender<AppEvent> {
        self.events.clone()
    }

    pub fn focused(&self) -> Option<ColumnId> {
        self.board.columns().ids().get(self.focus).copied()
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.cursor
    }

    pub fn picker_cursor(&self) -> PickerCursor {
        self.picker_cursor
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn event(&mut self, event: AppEvent) -> Option<AppEvent> {
        match event {
            AppEvent::Key(key) => self.key(&key),
            AppEvent::Load(request) => {
                self.spawn_load(request);
                None
            }
            AppEvent::Loaded(outcome) => {
                let column = outcome.request.column;
                if !self.board.complete_load(outcome) {
                    debug!(%column, "load result ignored");
                }
                self.clamp_cursor();
                None
            }
            AppEvent::Resize(..) | AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn spawn_load(&self, request: LoadRequest) {
        let fetcher = self.board.fetcher();
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let outcome = request.run(fetcher.as_ref()).await;
            // receiver is gone once the app exits
            let _ = events.send(AppEvent::Loaded(outcome));
        });
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        if event.kind != KeyEventKind::Press {
            return None;
        }
        match self.input_mode {
            InputMode::Normal => self.normal_key(event),
            InputMode::Picker => self.picker_key(event),
            InputMode::Label => {
                self.label_key(event);
                None
            }
        }
    }

    fn normal_key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        match event.code {
            KeyCode::Char('q') => return Some(AppEvent::Exit),
            KeyCode::Char('a') => {
                let id = self.board.add_column();
                self.focus = self.board.columns().ids().iter().position(|c| *c == id)?;
                self.cursor = (0, 0);
                self.open_picker();
            }
            KeyCode::Char('x') => {
                let id = self.focused()?;
                self.board.close_column(id);
                self.focus = self.focus.min(self.board.columns().len().saturating_sub(1));
                self.cursor = (0, 0);
            }
            KeyCode::Tab => self.move_focus(1),
            KeyCode::BackTab => self.move_focus(-1),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1, 0),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1, 0),
            KeyCode::Left | KeyCode::Char('h') => self.move_cursor(0, -1),
            KeyCode::Right | KeyCode::Char('l') => self.move_cursor(0, 1),
            KeyCode::Enter => self.activate_cell(),
            KeyCode::Char('r') => self.activate_row(),
            KeyCode::Char('s') => {
                let id = self.focused()?;
                self.board.sort_column(id, self.cursor.1);
            }
            KeyCode::Char('p') => {
                self.focused()?;
                self.open_picker();
            }
            KeyCode::Char('e') => {
                let id = self.focused()?;
                let label = self.board.column(id)?.label.clone();
                self.label_input = Some(LabelInput::new(&label, self.theme.get("border_focus")));
                self.input_mode = InputMode::Label;
            }
            KeyCode::Char('g') => {
                let aggregate = !self.board.highlights().is_aggregate();
                self.board.set_aggregate_mode(aggregate);
            }
            KeyCode::Char('P') => {
                let fragment = self.board.generate_permalink();
                self.status = format!("Permalink: #{}", fragment);
            }
            _ => {}
        }
        None
    }

    fn move_focus(&mut self, delta: isize) {
        let n = self.board.columns().len();
        if n == 0 {
            return;
        }
        self.focus = (self.focus as isize + delta).rem_euclid(n as isize) as usize;
        self.cursor = (0, 0);
    }

    /// Rows and cells of the focused column's table.
    fn table_dims(&self) -> (usize, usize) {
        self.focused()
            .and_then(|id| self.board.rendered(id))
            .and_then(|instruction| instruction.as_table())
            .map(|view| (view.rows.len(), view.width()))
            .unwrap_or((0, 0))
    }

    fn move_cursor(&mut self, rows: isize, cells: isize) {
        let (n_rows, n_cells) = self.table_dims();
        let step = |value: usize, delta: isize, len: usize| {
            (value as isize + delta).clamp(0, len.saturating_sub(1) as isize) as usize
        };
        self.cursor = (
            step(self.cursor.0, rows, n_rows),
            step(self.cursor.1, cells, n_cells),
        );
    }

    fn clamp_cursor(&mut self) {
        self.focus = self.focus.min(self.board.columns().len().saturating_sub(1));
        self.move_cursor(0, 0);
    }

    /// Highlightable cell: highlight its token. Anything else: highlight the row.
    fn activate_cell(&mut self) {
        let Some(id) = self.focused() else {
            return;
        };
        let Some(view) = self.board.rendered(id).and_then(|i| i.as_table()) else {
            return;
        };
        let Some(row) = view.rows.get(self.cursor.0) else {
            return;
        };
        match row.cells.get(self.cursor.1) {
            Some(RenderCell::Text(cell)) if cell.highlightable => {
                let raw = cell.raw.clone();
                let token = self.board.click_cell(&raw);
                self.status = format!("Highlight: {}", token);
            }
            _ => {
                let key = row.key.clone();
                self.board.click_row(&key);
            }
        }
    }

    fn activate_row(&mut self) {
        let key = self
            .focused()
            .and_then(|id| self.board.rendered(id))
            .and_then(|i| i.as_table())
            .and_then(|view| view.rows.get(self.cursor.0))
            .map(|row| row.key.clone());
        if let Some(key) = key {
            self.board.click_row(&key);
        }
    }

    fn selection(&self) -> Vec<String> {
        self.focused()
            .and_then(|id| self.board.column(id))
            .map(|c| c.selection.clone())
            .unwrap_or_default()
    }

    fn picker_options(&self) -> Vec<String> {
        self.board
            .picker()
            .options(&self.selection(), self.picker_cursor.slot)
    }

    /// Point the picker at `slot`, on the option currently chosen there.
    fn set_picker_slot(&mut self, slot: usize) {
        let selection = self.selection();
        let current = selection.get(slot).cloned().unwrap_or_default();
        let index = self
            .board
            .picker()
            .option_index(&selection, slot, &current)
            .unwrap_or(0);
        self.picker_cursor = PickerCursor { slot, index };
    }

    /// Open the picker on the first unset slot.
    fn open_picker(&mut self) {
        let selection = self.selection();
        let slots = self.board.picker().slot_count(&selection);
        let slot = (0..slots)
            .find(|s| selection.get(*s).map_or(true, |v| v.is_empty()))
            .unwrap_or(0);
        self.set_picker_slot(slot);
        self.input_mode = InputMode::Picker;
    }

    fn picker_key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        let id = match self.focused() {
            Some(id) => id,
            None => {
                self.input_mode = InputMode::Normal;
                return None;
            }
        };
        let n_options = self.picker_options().len();
        let slot = self.picker_cursor.slot;
        match event.code {
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Up | KeyCode::Char('k') => {
                self.picker_cursor.index = self.picker_cursor.index.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.picker_cursor.index + 1 < n_options {
                    self.picker_cursor.index += 1;
                }
            }
            KeyCode::Left | KeyCode::Char('h') => self.set_picker_slot(slot.saturating_sub(1)),
            KeyCode::Right | KeyCode::Char('l') => {
                let slots = self.board.picker().slot_count(&self.selection());
                if slot + 1 < slots {
                    self.set_picker_slot(slot + 1);
                }
            }
            KeyCode::Backspace | KeyCode::Delete => {
                return self
                    .board
                    .update_locator_segment(id, slot, "")
                    .map(AppEvent::Load);
            }
            KeyCode::Enter => {
                let value = self.picker_options().get(self.picker_cursor.index)?.clone();
                let request = self.board.update_locator_segment(id, slot, &value);
                let slots = self.board.picker().slot_count(&self.selection());
                if slot + 1 < slots {
                    self.set_picker_slot(slot + 1);
                } else {
                    self.input_mode = InputMode::Normal;
                }
                return request.map(AppEvent::Load);
            }
            _ => {}
        }
        None
    }

    fn label_key(&mut self, event: &KeyEvent) {
        let Some(input) = self.label_input.as_mut() else {
            self.input_mode = InputMode::Normal;
            return;
        };
        match input.handle_key(event) {
            LabelInputEvent::None => {}
            LabelInputEvent::Submit => {
                let value = input.value();
                if let Some(id) = self.focused() {
                    self.board.set_custom_label(id, &value);
                }
                self.label_input = None;
                self.input_mode = InputMode::Normal;
            }
            LabelInputEvent::Cancel => {
                self.label_input = None;
                self.input_mode = InputMode::Normal;
            }
        }
    }

    fn status_line(&self) -> String {
        let mode = if self.board.highlights().is_aggregate() {
            "aggregate"
        } else {
            "exclusive"
        };
        let mut status = format!("[{}] max {:.2e}", mode, self.board.global_max());
        if !self.status.is_empty() {
            status = format!("{}  {}", self.status, status);
        }
        status
    }

    fn render_columns(&self, area: Rect, buf: &mut Buffer) {
        let ids = self.board.columns().ids();
        if ids.is_empty() {
            Paragraph::new("No columns. Press a to add one.")
                .style(Style::default().fg(self.theme.get("dimmed")))
                .centered()
                .render(area, buf);
            return;
        }

        let min_width = self.display.column_min_width.max(1);
        let visible = ((area.width / min_width) as usize).clamp(1, ids.len());
        let start = self
            .focus
            .saturating_sub(visible - 1)
            .min(ids.len() - visible);
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Fill(1); visible])
            .split(area);

        let picker = self.board.picker();
        let empty = Pane::default();
        let options = if self.input_mode == InputMode::Picker {
            self.picker_options()
        } else {
            Vec::new()
        };

        for (slot_area, (index, id)) in layout.iter().zip(ids.iter().enumerate().skip(start)) {
            let pane = self.board.surface().pane(*id).unwrap_or(&empty);
            let focused = index == self.focus;
            let picking = focused && self.input_mode == InputMode::Picker;
            PaneView {
                pane,
                slot_labels: (0..picker.slot_count(&pane.selection))
                    .map(|s| picker.slot_label(s))
                    .collect(),
                focused,
                cursor: focused.then_some(self.cursor),
                active_slot: picking.then_some(self.picker_cursor.slot),
                overlay: picking.then(|| PickerOverlay {
                    label: picker.slot_label(self.picker_cursor.slot),
                    options: &options,
                    selected: self.picker_cursor.index,
                }),
                theme: &self.theme,
                display: &self.display,
            }
            .render(*slot_area, buf);
        }
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut constraints = vec![Constraint::Fill(1)];
        if self.input_mode == InputMode::Label {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Length(1)); // Controls
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        self.render_columns(layout[0], buf);

        if let (InputMode::Label, Some(input)) = (self.input_mode, &self.label_input) {
            input.render(layout[1], buf);
        }

        let hints: &[(&str, &str)] = if self.input_mode == InputMode::Picker {
            &PICKER_CONTROLS
        } else {
            &NORMAL_CONTROLS
        };
        let controls = Controls::new(hints, self.theme.get("status_bg"))
            .with_status(self.status_line())
            .with_dimmed(self.input_mode == InputMode::Label);
        controls.render(layout[layout.len() - 1], buf);
    }
}
