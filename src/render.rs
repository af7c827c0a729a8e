//! Pure table rendering: sorting, value bars, and per-cell tags for the display surface.

use crate::sort::{sort_rows, SortSpec};
use crate::table::{cell_at, Cell, Table};
use std::fmt;

/// Number of leading fields whose non-blank cells can be clicked to highlight a token.
pub const HIGHLIGHTABLE_FIELDS: usize = 3;

/// Separator used when joining a row's cells into its row key.
pub const ROW_KEY_SEPARATOR: &str = "-";

/// What a surface should paint for one column.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RenderInstruction {
    /// Fewer than two rows: show a placeholder or nothing.
    #[default]
    Empty,
    Table(TableView),
}

impl TableView {
    /// Widest row, header included.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(|row| row.cells.len())
            .fold(self.header.len(), usize::max)
    }
}

impl RenderInstruction {
    pub fn as_table(&self) -> Option<&TableView> {
        match self {
            Self::Table(view) => Some(view),
            Self::Empty => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub header: Vec<HeaderCell>,
    pub rows: Vec<RowView>,
    pub sort: Option<SortSpec>,
    pub value_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub text: String,
    pub markup: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    /// Content-derived identity shared by identical rows across columns.
    pub key: String,
    pub cells: Vec<RenderCell>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCell {
    Text(TextCell),
    Value(ValueCell),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCell {
    pub raw: String,
    pub token: String,
    pub markup: bool,
    pub highlightable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueCell {
    Bar { percent: f64, display: Magnitude },
    /// Non-numeric value field, shown as-is without a bar.
    Plain(String),
}

/// Display form of a numeric value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Magnitude {
    Zero,
    Scientific { mantissa: String, exponent: i32 },
}

impl fmt::Display for Magnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => f.write_str("0.00"),
            Self::Scientific { mantissa, exponent } => {
                write!(f, "{} × 10^{}", mantissa, exponent)
            }
        }
    }
}

/// Significant digits needed to print any `f64` exactly.
const EXACT_DIGITS: usize = 767;

/// Normalized scientific notation with two fractional digits; zero stays plain.
/// Exact ties round away from zero, so `1.125` shows as `1.13`.
pub fn magnitude(value: f64) -> Magnitude {
    if value == 0.0 {
        return Magnitude::Zero;
    }
    let formatted = format!("{:.2e}", value);
    let (mantissa, exponent) = formatted
        .split_once('e')
        .unwrap_or((formatted.as_str(), "0"));
    let mut mantissa = mantissa.to_string();
    if tie_rounded_to_even(value) {
        bump_last_digit(&mut mantissa);
    }
    Magnitude::Scientific {
        mantissa,
        exponent: exponent.parse().unwrap_or(0),
    }
}

/// True when `value` lies exactly halfway between two three-digit mantissas and
/// `{:.2e}` resolved it downwards to an even last digit.
fn tie_rounded_to_even(value: f64) -> bool {
    let shortest = format!("{:e}", value.abs());
    let digits = shortest.split_once('e').map_or(shortest.as_str(), |(m, _)| m);
    // a tie is exactly `d.dd5`
    if digits.len() != 5 || !digits.ends_with('5') {
        return false;
    }
    let exact = format!("{:.*e}", EXACT_DIGITS - 1, value.abs());
    let exact = exact.split_once('e').map_or(exact.as_str(), |(m, _)| m);
    let is_tie = exact.get(5..).is_some_and(|rest| rest.bytes().all(|b| b == b'0'));
    is_tie && (digits.as_bytes()[3] - b'0') % 2 == 0
}

/// Add one unit in the last place. The last digit is even, so nothing carries.
fn bump_last_digit(mantissa: &mut String) {
    if let Some(last) = mantissa.pop() {
        mantissa.push(char::from(last as u8 + 1));
    }
}

/// Bar width in percent of the global maximum, within [0, 100]; 0 when the maximum is 0.
pub fn bar_percent(value: f64, global_max: f64) -> f64 {
    if global_max > 0.0 {
        (value / global_max * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Cells joined with `-`, every whitespace character replaced by `_`.
pub fn row_key(row: &[Cell]) -> String {
    row.iter()
        .map(Cell::raw)
        .collect::<Vec<_>>()
        .join(ROW_KEY_SEPARATOR)
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Render one column. Highlights are not part of the result; they are reapplied afterwards.
pub fn render(table: &Table, sort: Option<SortSpec>, global_max: f64) -> RenderInstruction {
    let (Some(header), Some(value_index)) = (table.header(), table.value_index()) else {
        return RenderInstruction::Empty;
    };
    if !table.has_data() {
        return RenderInstruction::Empty;
    }

    let header = header
        .iter()
        .map(|cell| HeaderCell {
            text: cell.raw().to_string(),
            markup: cell.is_markup(),
        })
        .collect::<Vec<_>>();

    let rows: Vec<&Vec<Cell>> = table.data_rows().iter().collect();
    let rows = match sort {
        Some(spec) => sort_rows(rows, spec),
        None => rows,
    };

    let rows = rows
        .into_iter()
        .map(|row| RowView {
            key: row_key(row),
            cells: (0..header.len().max(row.len()))
                .map(|index| render_cell(cell_at(row, index), index, value_index, global_max))
                .collect(),
        })
        .collect();

    RenderInstruction::Table(TableView {
        header,
        rows,
        sort,
        value_index,
    })
}

fn render_cell(cell: &Cell, index: usize, value_index: usize, global_max: f64) -> RenderCell {
    if index == value_index {
        return RenderCell::Value(match cell.number() {
            Some(value) => ValueCell::Bar {
                percent: bar_percent(value, global_max),
                display: magnitude(value),
            },
            None => ValueCell::Plain(cell.raw().to_string()),
        });
    }
    RenderCell::Text(TextCell {
        raw: cell.raw().to_string(),
        token: cell.token().to_string(),
        markup: cell.is_markup(),
        highlightable: index < HIGHLIGHTABLE_FIELDS && !cell.is_blank(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortDirection;

    fn sample() -> Table {
        Table::from_rows([
            vec!["$\\alpha$", "b", "c", "d", "score"],
            vec!["x", "", "z", "w", "1.0"],
            vec!["y y", "q", "r", "s", "5.0"],
            vec!["u", "v", "t", "o", "n/a"],
        ])
    }

    #[test]
    fn fewer_than_two_rows_is_empty() {
        assert_eq!(render(&Table::default(), None, 1.0), RenderInstruction::Empty);
        assert_eq!(
            render(&Table::parse("a,b\n"), None, 1.0),
            RenderInstruction::Empty
        );
    }

    #[test]
    fn header_carries_markup_flag() {
        let view = render(&sample(), None, 5.0);
        let view = view.as_table().unwrap();
        assert!(view.header[0].markup);
        assert!(!view.header[1].markup);
        assert_eq!(view.value_index, 4);
    }

    #[test]
    fn value_cells_become_bars_scaled_to_global_max() {
        let view = render(&sample(), None, 5.0);
        let view = view.as_table().unwrap();
        match &view.rows[0].cells[4] {
            RenderCell::Value(ValueCell::Bar { percent, display }) => {
                assert!((percent - 20.0).abs() < 1e-9);
                assert_eq!(display.to_string(), "1.00 × 10^0");
            }
            other => panic!("expected bar, got {:?}", other),
        }
        assert_eq!(
            view.rows[2].cells[4],
            RenderCell::Value(ValueCell::Plain("n/a".to_string()))
        );
    }

    #[test]
    fn zero_global_max_gives_zero_width() {
        let view = render(&sample(), None, 0.0);
        let view = view.as_table().unwrap();
        match &view.rows[1].cells[4] {
            RenderCell::Value(ValueCell::Bar { percent, .. }) => assert_eq!(*percent, 0.0),
            other => panic!("expected bar, got {:?}", other),
        }
    }

    #[test]
    fn first_three_non_blank_fields_are_highlightable() {
        let view = render(&sample(), None, 5.0);
        let view = view.as_table().unwrap();
        let flags: Vec<bool> = view.rows[0]
            .cells
            .iter()
            .map(|c| matches!(c, RenderCell::Text(t) if t.highlightable))
            .collect();
        assert_eq!(flags, vec![true, false, true, false, false]);
    }

    #[test]
    fn sort_does_not_mutate_the_table() {
        let table = sample();
        let view = render(&table, Some(SortSpec::descending(4)), 5.0);
        let view = view.as_table().unwrap();
        let keys: Vec<&str> = view.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["u-v-t-o-n/a", "y_y-q-r-s-5.0", "x--z-w-1.0"]);
        assert_eq!(table.rows()[1][0].raw(), "x");
        assert_eq!(view.sort.map(|s| s.direction), Some(SortDirection::Desc));
    }

    #[test]
    fn ragged_rows_are_padded_to_header_width() {
        let table = Table::from_rows([vec!["a", "b", "value"], vec!["x"]]);
        let view = render(&table, None, 1.0);
        let view = view.as_table().unwrap();
        assert_eq!(view.rows[0].cells.len(), 3);
        assert_eq!(
            view.rows[0].cells[2],
            RenderCell::Value(ValueCell::Plain(String::new()))
        );
        assert_eq!(view.rows[0].key, "x");
    }

    #[test]
    fn cells_past_the_header_are_kept() {
        let table = Table::from_rows([vec!["var", "value"], vec!["x", "2", "extra", "more"]]);
        let view = render(&table, None, 2.0);
        let view = view.as_table().unwrap();
        assert_eq!(view.width(), 4);
        let cells = &view.rows[0].cells;
        assert_eq!(cells.len(), 4);
        assert!(matches!(&cells[1], RenderCell::Value(ValueCell::Bar { .. })));
        match &cells[2] {
            RenderCell::Text(text) => {
                assert_eq!(text.token, "extra");
                assert!(text.highlightable);
            }
            other => panic!("expected text, got {:?}", other),
        }
        assert!(matches!(&cells[3], RenderCell::Text(t) if !t.highlightable));
    }

    #[test]
    fn values_with_units_get_bars() {
        let table = Table::from_rows([vec!["var", "score"], vec!["x", "0.5%"], vec!["y", "12 GeV"]]);
        let view = render(&table, None, 12.0);
        let view = view.as_table().unwrap();
        match &view.rows[1].cells[1] {
            RenderCell::Value(ValueCell::Bar { percent, display }) => {
                assert_eq!(*percent, 100.0);
                assert_eq!(display.to_string(), "1.20 × 10^1");
            }
            other => panic!("expected bar, got {:?}", other),
        }
        match &view.rows[0].cells[1] {
            RenderCell::Value(ValueCell::Bar { percent, .. }) => {
                assert!((percent - 0.5 / 12.0 * 100.0).abs() < 1e-9)
            }
            other => panic!("expected bar, got {:?}", other),
        }
    }

    #[test]
    fn magnitude_formats() {
        assert_eq!(magnitude(0.0), Magnitude::Zero);
        assert_eq!(
            magnitude(12345.0),
            Magnitude::Scientific {
                mantissa: "1.23".to_string(),
                exponent: 4
            }
        );
        assert_eq!(magnitude(1.125).to_string(), "1.13 × 10^0");
        assert_eq!(magnitude(-1.125).to_string(), "-1.13 × 10^0");
        assert_eq!(magnitude(1625.0).to_string(), "1.63 × 10^3");
        assert_eq!(magnitude(1.375).to_string(), "1.38 × 10^0");
        assert_eq!(magnitude(2.5).to_string(), "2.50 × 10^0");
        assert_eq!(
            magnitude(-0.000512),
            Magnitude::Scientific {
                mantissa: "-5.12".to_string(),
                exponent: -4
            }
        );
    }

    #[test]
    fn bar_percent_is_clamped() {
        assert_eq!(bar_percent(-3.0, 10.0), 0.0);
        assert_eq!(bar_percent(10.0, 10.0), 100.0);
        assert_eq!(bar_percent(3.0, 0.0), 0.0);
    }
}
