//! A1 notation, column arithmetic and read-range resolution.
//!
//! Columns are base-26 with no zero digit: `A`=0, `Z`=25, `AA`=26, `AZ`=51,
//! `ZZ`=701. Rows in A1 notation are 1-based; [`CellRange`] is 0-based and
//! inclusive on both ends. The Sheets API wants half-open indices, which
//! [`CellRange::to_grid_range`] produces.

use crate::constants::DEFAULT_READ_RANGE;
use crate::drive::types::SheetProperties;
use crate::error::ServerError;
use serde::Serialize;

/// Convert column letters to a 0-based index.
pub fn letter_to_index(letters: &str) -> Result<u32, ServerError> {
    if letters.is_empty() {
        return Err(ServerError::invalid_range("empty column reference"));
    }

    let mut number: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(ServerError::invalid_range(format!(
                "invalid column '{}'",
                letters
            )));
        }
        let digit = ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        number = number
            .checked_mul(26)
            .and_then(|n| n.checked_add(digit))
            .ok_or_else(|| ServerError::invalid_range(format!("column '{}' is too large", letters)))?;
    }

    Ok(number - 1)
}

/// Convert a 0-based column index to letters.
pub fn index_to_letter(index: u32) -> String {
    let mut column = index as u64 + 1;
    let mut name = String::new();
    while column > 0 {
        let rem = ((column - 1) % 26) as u8;
        name.insert(0, (b'A' + rem) as char);
        column = (column - 1) / 26;
    }
    name
}

/// Quote a sheet name for use in a range, if it needs it.
pub fn quote_sheet_name(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Split `Sheet!A1:B2` into the (unquoted) sheet name and the cell part.
pub fn split_sheet_prefix(range: &str) -> Result<(Option<String>, &str), ServerError> {
    if let Some(rest) = range.strip_prefix('\'') {
        // Quoted name: '' is an escaped quote, a lone ' closes the name.
        let mut name = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((idx, ch)) = chars.next() {
            if ch != '\'' {
                name.push(ch);
                continue;
            }
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                name.push('\'');
                continue;
            }
            let after = &rest[idx + 1..];
            return match after.strip_prefix('!') {
                Some(cells) => Ok((Some(name), cells)),
                None if after.is_empty() => Ok((Some(name), "")),
                None => Err(ServerError::invalid_range(format!(
                    "expected '!' after sheet name in '{}'",
                    range
                ))),
            };
        }
        return Err(ServerError::invalid_range(format!(
            "unterminated sheet name in '{}'",
            range
        )));
    }

    match range.split_once('!') {
        Some((sheet, cells)) => Ok((Some(sheet.to_string()), cells)),
        None => Ok((None, range)),
    }
}

/// One side of an A1 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Cell { col: u32, row: u32 },
    Column(u32),
    Row(u32),
}

fn parse_endpoint(part: &str) -> Result<Endpoint, ServerError> {
    let part = part.trim();
    let mut letters = String::new();
    let mut digits = String::new();

    for ch in part.chars() {
        match ch {
            '$' => continue,
            c if c.is_ascii_alphabetic() && digits.is_empty() => letters.push(c),
            c if c.is_ascii_digit() => digits.push(c),
            _ => {
                return Err(ServerError::invalid_range(format!(
                    "invalid cell reference '{}'",
                    part
                )))
            }
        }
    }

    let row = if digits.is_empty() {
        None
    } else {
        let row: u32 = digits
            .parse()
            .map_err(|_| ServerError::invalid_range(format!("invalid row in '{}'", part)))?;
        if row == 0 {
            return Err(ServerError::invalid_range(format!(
                "rows start at 1 in '{}'",
                part
            )));
        }
        Some(row - 1)
    };

    match (letters.is_empty(), row) {
        (false, Some(row)) => Ok(Endpoint::Cell {
            col: letter_to_index(&letters)?,
            row,
        }),
        (false, None) => Ok(Endpoint::Column(letter_to_index(&letters)?)),
        (true, Some(row)) => Ok(Endpoint::Row(row)),
        (true, None) => Err(ServerError::invalid_range(format!(
            "empty cell reference in '{}'",
            part
        ))),
    }
}

/// A rectangular, non-empty block of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub sheet_name: Option<String>,
    pub start_row: u32,
    pub end_row: u32,
    pub start_col: u32,
    pub end_col: u32,
}

impl CellRange {
    /// Parse an A1 expression.
    ///
    /// Whole-column (`A:C`) and whole-row (`1:5`) forms are bounded by the
    /// grid size of the sheet they refer to.
    pub fn parse(a1: &str, row_count: u32, column_count: u32) -> Result<Self, ServerError> {
        let (sheet_name, cells) = split_sheet_prefix(a1)?;
        if cells.is_empty() {
            return Err(ServerError::invalid_range(format!(
                "no cells in '{}'",
                a1
            )));
        }

        let last_row = row_count.max(1) - 1;
        let last_col = column_count.max(1) - 1;

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (parse_endpoint(start)?, parse_endpoint(end)?),
            None => {
                let single = parse_endpoint(cells)?;
                if !matches!(single, Endpoint::Cell { .. }) {
                    return Err(ServerError::invalid_range(format!(
                        "'{}' needs both ends of the range",
                        a1
                    )));
                }
                (single, single)
            }
        };

        let ((r1, c1), (r2, c2)) = match (start, end) {
            (Endpoint::Cell { col: c1, row: r1 }, Endpoint::Cell { col: c2, row: r2 }) => {
                ((r1, c1), (r2, c2))
            }
            (Endpoint::Column(c1), Endpoint::Column(c2)) => ((0, c1), (last_row, c2)),
            (Endpoint::Row(r1), Endpoint::Row(r2)) => ((r1, 0), (r2, last_col)),
            (Endpoint::Cell { col: c1, row: r1 }, Endpoint::Column(c2)) => {
                ((r1, c1), (last_row, c2))
            }
            _ => {
                return Err(ServerError::invalid_range(format!(
                    "unsupported range shape '{}'",
                    a1
                )))
            }
        };

        Ok(Self {
            sheet_name,
            start_row: r1.min(r2),
            end_row: r1.max(r2),
            start_col: c1.min(c2),
            end_col: c1.max(c2),
        })
    }

    pub fn rows(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn columns(&self) -> u32 {
        self.end_col - self.start_col + 1
    }

    /// Number of cells covered. Widened so huge ranges cannot overflow.
    pub fn cell_count(&self) -> u64 {
        u64::from(self.rows()) * u64::from(self.columns())
    }

    /// The cell part of the range, without a sheet name.
    pub fn cells_a1(&self) -> String {
        format!(
            "{}{}:{}{}",
            index_to_letter(self.start_col),
            self.start_row + 1,
            index_to_letter(self.end_col),
            self.end_row + 1
        )
    }

    /// Render back to A1 notation.
    pub fn to_a1(&self) -> String {
        let cells = self.cells_a1();
        match &self.sheet_name {
            Some(sheet) => format!("{}!{}", quote_sheet_name(sheet), cells),
            None => cells,
        }
    }

    /// Half-open grid coordinates for the given sheet id.
    pub fn to_grid_range(&self, sheet_id: i64) -> GridRange {
        GridRange {
            sheet_id,
            start_row_index: self.start_row,
            end_row_index: self.end_row + 1,
            start_column_index: self.start_col,
            end_column_index: self.end_col + 1,
        }
    }
}

/// Sheets API `GridRange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRange {
    pub sheet_id: i64,
    pub start_row_index: u32,
    pub end_row_index: u32,
    pub start_column_index: u32,
    pub end_column_index: u32,
}

/// `A1:<lastCol><rowCount>` for a grid, clamping empty dimensions to 1.
pub fn full_grid_a1(row_count: u32, column_count: u32) -> String {
    format!(
        "A1:{}{}",
        index_to_letter(column_count.max(1) - 1),
        row_count.max(1)
    )
}

/// Pick the range to read for `read_sheet`.
pub fn resolve_read_range(
    sheet_name: Option<&str>,
    range: Option<&str>,
    sheets: &[SheetProperties],
) -> Result<String, ServerError> {
    match (sheet_name, range) {
        (_, Some(range)) if range.contains('!') => Ok(range.to_string()),
        (Some(sheet), Some(range)) => Ok(format!("{}!{}", quote_sheet_name(sheet), range)),
        (None, Some(range)) => Ok(range.to_string()),
        (Some(sheet), None) => {
            let props = find_sheet(sheets, sheet)?;
            Ok(format!(
                "{}!{}",
                quote_sheet_name(&props.title),
                full_grid_a1(
                    props.grid_properties.row_count,
                    props.grid_properties.column_count
                )
            ))
        }
        (None, None) => Ok(DEFAULT_READ_RANGE.to_string()),
    }
}

/// Look up a sheet by title.
pub fn find_sheet<'a>(
    sheets: &'a [SheetProperties],
    title: &str,
) -> Result<&'a SheetProperties, ServerError> {
    sheets
        .iter()
        .find(|s| s.title == title)
        .ok_or_else(|| ServerError::invalid_range(format!("Sheet '{}' not found", title)))
}

/// Resolve a target range against spreadsheet metadata.
///
/// Unqualified ranges refer to the first sheet.
pub fn locate_range<'a>(
    range: &str,
    sheets: &'a [SheetProperties],
) -> Result<(&'a SheetProperties, CellRange), ServerError> {
    let (sheet_name, _) = split_sheet_prefix(range)?;
    let props = match sheet_name.as_deref() {
        Some(name) => find_sheet(sheets, name)?,
        None => sheets
            .first()
            .ok_or_else(|| ServerError::invalid_range("spreadsheet has no sheets"))?,
    };

    let cells = CellRange::parse(
        range,
        props.grid_properties.row_count,
        props.grid_properties.column_count,
    )?;
    Ok((props, cells))
}
