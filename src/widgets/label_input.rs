use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Widget},
};
use tui_textarea::{CursorMove, Input, Key, TextArea};

/// Event emitted by LabelInput
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelInputEvent {
    None,
    Submit, // Enter pressed
    Cancel, // Esc pressed
}

/// Single-line editor for a column's custom label, wrapping tui-textarea
pub struct LabelInput {
    textarea: TextArea<'static>,
    border: Color,
}

impl LabelInput {
    /// Start editing `initial`, cursor at the end
    pub fn new(initial: &str, border: Color) -> Self {
        let single_line = initial.replace(['\n', '\r'], " ");
        let mut textarea = TextArea::new(vec![single_line]);
        textarea.set_cursor_line_style(Style::default());
        textarea.move_cursor(CursorMove::End);
        Self { textarea, border }
    }

    pub fn value(&self) -> String {
        self.textarea.lines().first().cloned().unwrap_or_default()
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> LabelInputEvent {
        match event.code {
            KeyCode::Esc => LabelInputEvent::Cancel,
            KeyCode::Enter => LabelInputEvent::Submit,
            _ => {
                self.textarea.input(key_event_to_input(event));
                LabelInputEvent::None
            }
        }
    }
}

/// Convert crossterm KeyEvent to tui_textarea::Input
fn key_event_to_input(event: &KeyEvent) -> Input {
    let key = match event.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Delete => Key::Delete,
        _ => Key::Null,
    };

    Input {
        key,
        ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
        alt: event.modifiers.contains(KeyModifiers::ALT),
        shift: event.modifiers.contains(KeyModifiers::SHIFT),
    }
}

impl Widget for &LabelInput {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.border))
            .title(" Label (Enter to save, Esc to cancel) ");
        let inner = block.inner(area);
        block.render(area, buf);
        self.textarea.render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_appends_to_initial_value() {
        let mut input = LabelInput::new("base", Color::Yellow);
        assert_eq!(input.handle_key(&key(KeyCode::Char('x'))), LabelInputEvent::None);
        assert_eq!(input.value(), "basex");
        input.handle_key(&key(KeyCode::Backspace));
        input.handle_key(&key(KeyCode::Backspace));
        assert_eq!(input.value(), "bas");
    }

    #[test]
    fn test_enter_and_esc() {
        let mut input = LabelInput::new("", Color::Yellow);
        assert_eq!(input.handle_key(&key(KeyCode::Enter)), LabelInputEvent::Submit);
        assert_eq!(input.handle_key(&key(KeyCode::Esc)), LabelInputEvent::Cancel);
    }

    #[test]
    fn test_newlines_are_flattened() {
        let input = LabelInput::new("a\nb", Color::Yellow);
        assert_eq!(input.value(), "a b");
    }
}
