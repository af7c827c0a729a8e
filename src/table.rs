//! Tabular data as loaded from a CSV resource.

use crate::highlight::normalize_token;

/// Delimiter that marks a cell as typeset markup (`$...$`).
pub const MATH_DELIMITER: char = '$';

static EMPTY_CELL: Cell = Cell {
    raw: String::new(),
    token: String::new(),
    markup: false,
};

/// One CSV cell with its markup flag and highlight token computed once at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    raw: String,
    token: String,
    markup: bool,
}

impl Cell {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            token: normalize_token(&raw).to_string(),
            markup: is_markup(&raw),
            raw,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Canonical identity used to match this cell against highlighted tokens.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether the raw text should be handed to a markup typesetter instead of shown verbatim.
    pub fn is_markup(&self) -> bool {
        self.markup
    }

    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }

    pub fn number(&self) -> Option<f64> {
        parse_number(&self.raw)
    }
}

/// True when `raw` starts and ends with the math delimiter.
pub fn is_markup(raw: &str) -> bool {
    raw.len() >= 2 && raw.starts_with(MATH_DELIMITER) && raw.ends_with(MATH_DELIMITER)
}

/// Parse the longest leading float literal of a cell, so `0.5%` reads as `0.5` and
/// `105-106` as `105`. Trailing text is ignored; a cell with no leading digits, or one
/// whose prefix is not finite, is not a number.
pub fn parse_number(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let mut end = if matches!(bytes.first(), Some(b'+' | b'-')) { 1 } else { 0 };
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - end - 1;
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_end = digits_from(end + 1 + sign);
        if exp_end > end + 1 + sign {
            end = exp_end;
        }
    }

    text[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Read a cell by index; out-of-range reads as an empty cell.
pub fn cell_at(row: &[Cell], index: usize) -> &Cell {
    row.get(index).unwrap_or(&EMPTY_CELL)
}

/// Row 0 is the header; rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Split on newlines, drop blank lines, split each line on commas. No quoting support.
    pub fn parse(text: &str) -> Self {
        let rows = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split(',').map(Cell::new).collect())
            .collect();
        Self { rows }
    }

    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Cell::new).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A header plus at least one data row.
    pub fn has_data(&self) -> bool {
        self.rows.len() >= 2
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn header(&self) -> Option<&[Cell]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn data_rows(&self) -> &[Vec<Cell>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Index of the value field: the header's last column.
    pub fn value_index(&self) -> Option<usize> {
        self.header().and_then(|h| h.len().checked_sub(1))
    }

    /// Parsed value field of every data row that has one.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        let index = self.value_index();
        self.data_rows()
            .iter()
            .filter_map(move |row| index.and_then(|i| cell_at(row, i).number()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_blank_lines_and_trailing_newline() {
        let table = Table::parse("var,score\n\nx,1.5\r\n   \ny,2\n\n");
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[1][0].raw(), "x");
        assert_eq!(table.rows()[1][1].raw(), "1.5");
        assert_eq!(table.rows()[2][1].raw(), "2");
    }

    #[test]
    fn parse_does_not_handle_quotes() {
        let table = Table::parse("a,b\n\"x,y\",3");
        assert_eq!(table.rows()[1].len(), 3);
        assert_eq!(table.rows()[1][0].raw(), "\"x");
    }

    #[test]
    fn cell_tags_are_computed_once() {
        let cell = Cell::new("$p_T$");
        assert!(cell.is_markup());
        assert_eq!(cell.token(), "p_T");

        let cell = Cell::new("$(m_{jj})$");
        assert!(cell.is_markup());
        assert_eq!(cell.token(), "m_{jj}");

        let cell = Cell::new("plain");
        assert!(!cell.is_markup());
        assert_eq!(cell.token(), "plain");

        assert!(!Cell::new("$").is_markup());
    }

    #[test]
    fn numbers_must_be_finite() {
        assert_eq!(parse_number(" 2.5e3 "), Some(2500.0));
        assert_eq!(parse_number("-1"), Some(-1.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("Infinity"), None);
        assert_eq!(parse_number("1e999"), None);
    }

    #[test]
    fn numbers_read_the_leading_literal() {
        assert_eq!(parse_number("0.5%"), Some(0.5));
        assert_eq!(parse_number("12 GeV"), Some(12.0));
        assert_eq!(parse_number("105-106"), Some(105.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("3."), Some(3.0));
        assert_eq!(parse_number("2e"), Some(2.0));
        assert_eq!(parse_number("1.5e-2x"), Some(0.015));
        assert_eq!(parse_number("0x10"), Some(0.0));
        assert_eq!(parse_number("-.e3"), None);
        assert_eq!(parse_number("GeV 12"), None);
        assert_eq!(parse_number("."), None);
    }

    #[test]
    fn ragged_rows_read_as_empty_cells() {
        let table = Table::from_rows([vec!["a", "b", "value"], vec!["x"], vec!["y", "z", "3"]]);
        assert_eq!(table.value_index(), Some(2));
        assert_eq!(cell_at(&table.rows()[1], 2).raw(), "");
        assert_eq!(table.values().collect::<Vec<_>>(), vec![3.0]);
    }

    #[test]
    fn header_only_table_has_no_data() {
        let table = Table::parse("a,b\n");
        assert!(!table.has_data());
        assert!(table.data_rows().is_empty());
        assert!(Table::default().data_rows().is_empty());
    }
}
