use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    widgets::{Paragraph, Widget},
};

/// Key hints for one input mode
pub const NORMAL_CONTROLS: [(&str, &str); 10] = [
    ("a", "Add"),
    ("x", "Close"),
    ("p", "Pick"),
    ("e", "Label"),
    ("s", "Sort"),
    ("⏎", "Highlight"),
    ("r", "Row"),
    ("g", "Aggregate"),
    ("P", "Permalink"),
    ("q", "Quit"),
];

pub const PICKER_CONTROLS: [(&str, &str); 4] = [
    ("↑↓", "Choose"),
    ("←→", "Slot"),
    ("⏎", "Select"),
    ("Esc", "Done"),
];

/// Bottom bar: key hints plus a right-aligned status
pub struct Controls<'a> {
    pub controls: &'a [(&'a str, &'a str)],
    pub status: String,
    pub background: Color,
    pub dimmed: bool,
}

impl<'a> Controls<'a> {
    pub fn new(controls: &'a [(&'a str, &'a str)], background: Color) -> Self {
        Self {
            controls,
            status: String::new(),
            background,
            dimmed: false,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }
}

impl Widget for &Controls<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut constraints = self.controls.iter().fold(vec![], |mut acc, (key, action)| {
            acc.push(Constraint::Length(key.chars().count() as u16 + 2));
            acc.push(Constraint::Length(action.chars().count() as u16 + 1));
            acc
        });
        constraints.push(Constraint::Fill(1));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);

        let base_style = if self.dimmed {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        for (i, (key, action)) in self.controls.iter().enumerate() {
            let j = i * 2;
            Paragraph::new(*key)
                .style(base_style.bold())
                .centered()
                .render(layout[j], buf);
            Paragraph::new(*action)
                .style(base_style.bg(self.background))
                .render(layout[j + 1], buf);
        }

        Paragraph::new(self.status.as_str())
            .style(base_style.bg(self.background))
            .right_aligned()
            .render(layout[self.controls.len() * 2], buf);
    }
}
