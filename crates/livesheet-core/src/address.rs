//! Cell address and range types in the remote service's wire notation

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address (e.g., "B5")
///
/// Both coordinates are 1-based, matching the wire notation: row 5 / column 2
/// is `B5`. Construction validates `1 <= row <= MAX_ROWS` and
/// `1 <= col <= MAX_COLS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellAddress {
    /// Row number (1-based)
    pub row: u32,
    /// Column number (1-based, A=1, B=2, ..., XFD=16384)
    pub col: u32,
}

impl CellAddress {
    /// Create a new cell address, validating both coordinates
    pub fn new(row: u32, col: u32) -> Result<Self> {
        if row == 0 || row > MAX_ROWS {
            return Err(Error::InvalidAddress(format!(
                "row {row} outside 1..={MAX_ROWS}"
            )));
        }
        if col == 0 || col > MAX_COLS {
            return Err(Error::InvalidAddress(format!(
                "column {col} outside 1..={MAX_COLS}"
            )));
        }
        Ok(Self { row, col })
    }

    /// Parse a cell address from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use livesheet_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("B5").unwrap();
    /// assert_eq!(addr.row, 5);
    /// assert_eq!(addr.col, 2);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }

        if pos == 0 {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{s}'"
            )));
        }

        let col = Self::letters_to_column(&s[..pos])?;

        let row_str = &s[pos..];
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{s}'")));
        }
        if !row_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!(
                "invalid row number in '{s}'"
            )));
        }

        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("row number too large in '{s}'")))?;

        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{s}'"
            )));
        }

        Self::new(row, col)
    }

    /// Convert a column number to letters (1 = A, 26 = Z, 27 = AA, etc.)
    pub fn column_to_letters(col: u32) -> String {
        let mut result = String::new();
        let mut n = col;

        while n > 0 {
            n -= 1;
            let c = ((n % 26) as u8 + b'A') as char;
            result.insert(0, c);
            n /= 26;
        }

        result
    }

    /// Convert column letters to a column number (A = 1, Z = 26, AA = 27, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u32> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }
        // Anything longer than three letters is past XFD; also keeps the
        // accumulator below overflow.
        if letters.len() > 3 {
            return Err(Error::InvalidAddress(format!(
                "column '{letters}' out of range"
            )));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{c}'"
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }

        if col > MAX_COLS {
            return Err(Error::InvalidAddress(format!(
                "column '{letters}' out of range"
            )));
        }

        Ok(col)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", Self::column_to_letters(self.col), self.row)
    }

    /// Return the address shifted by the given row and column deltas
    pub fn offset(&self, rows: u32, cols: u32) -> Result<Self> {
        let row = self
            .row
            .checked_add(rows)
            .ok_or_else(|| Error::InvalidAddress("row offset overflow".into()))?;
        let col = self
            .col
            .checked_add(cols)
            .ok_or_else(|| Error::InvalidAddress("column offset overflow".into()))?;
        Self::new(row, col)
    }

    /// Create a range from this address to another
    pub fn to(&self, other: CellAddress) -> Result<RangeAddress> {
        RangeAddress::new(*self, other)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular range of cells on one worksheet (e.g., "A1:B10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeAddress {
    /// Top-left corner
    pub start: CellAddress,
    /// Bottom-right corner
    pub end: CellAddress,
}

impl RangeAddress {
    /// Create a range; `start` must be the top-left and `end` the bottom-right corner
    pub fn new(start: CellAddress, end: CellAddress) -> Result<Self> {
        if start.row > end.row || start.col > end.col {
            return Err(Error::InvalidAddress(format!(
                "range {start}:{end} is not ordered top-left to bottom-right"
            )));
        }
        Ok(Self { start, end })
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Create a range starting at `start` spanning `rows` x `cols` cells
    pub fn with_size(start: CellAddress, rows: u32, cols: u32) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidAddress(format!(
                "range at {start} must span at least one cell"
            )));
        }
        let end = start.offset(rows - 1, cols - 1)?;
        Ok(Self { start, end })
    }

    /// Parse a range from `A1:B10` notation (a bare cell is a single-cell range)
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((start, end)) => {
                Self::new(CellAddress::parse(start)?, CellAddress::parse(end)?)
            }
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    /// Check if a cell is within this range
    pub fn contains(&self, addr: &CellAddress) -> bool {
        addr.row >= self.start.row
            && addr.row <= self.end.row
            && addr.col >= self.start.col
            && addr.col <= self.end.col
    }

    /// Get the number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Get the number of columns in the range
    pub fn col_count(&self) -> u32 {
        self.end.col - self.start.col + 1
    }

    /// Iterate over all cell addresses in the range (row by row)
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        (self.start.row..=self.end.row).flat_map(move |row| {
            (self.start.col..=self.end.col).map(move |col| CellAddress { row, col })
        })
    }

    /// Format as `<start>:<end>`, always with both corners
    pub fn to_a1_string(&self) -> String {
        format!("{}:{}", self.start.to_a1_string(), self.end.to_a1_string())
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for RangeAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Encode a (row, column) pair as a wire address.
pub fn encode(row: u32, col: u32) -> Result<String> {
    Ok(CellAddress::new(row, col)?.to_a1_string())
}

/// Decode a wire address into a (row, column) pair.
pub fn decode(address: &str) -> Result<(u32, u32)> {
    let addr = CellAddress::parse(address)?;
    Ok((addr.row, addr.col))
}

/// Encode a range as `<start>:<end>`.
pub fn encode_range(top_left: CellAddress, bottom_right: CellAddress) -> Result<String> {
    Ok(RangeAddress::new(top_left, bottom_right)?.to_a1_string())
}

/// Whole-row span notation (`25:27`) used by row insertion.
pub fn encode_row_span(first_row: u32, row_count: u32) -> Result<String> {
    if first_row == 0 || row_count == 0 {
        return Err(Error::InvalidAddress(format!(
            "row span {first_row}+{row_count} must start at 1 and be non-empty"
        )));
    }
    let last_row = first_row
        .checked_add(row_count - 1)
        .filter(|r| *r <= MAX_ROWS)
        .ok_or_else(|| {
            Error::InvalidAddress(format!("row span {first_row}+{row_count} out of range"))
        })?;
    Ok(format!("{first_row}:{last_row}"))
}

/// Strip a `Sheet!` qualifier from an address returned by the remote service.
///
/// Quoted sheet names (`'My Sheet'!A1`) are handled by splitting on the last `!`.
pub fn strip_sheet_qualifier(address: &str) -> &str {
    match address.rfind('!') {
        Some(pos) => &address[pos + 1..],
        None => address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_column_to_letters() {
        assert_eq!(CellAddress::column_to_letters(1), "A");
        assert_eq!(CellAddress::column_to_letters(2), "B");
        assert_eq!(CellAddress::column_to_letters(26), "Z");
        assert_eq!(CellAddress::column_to_letters(27), "AA");
        assert_eq!(CellAddress::column_to_letters(702), "ZZ");
        assert_eq!(CellAddress::column_to_letters(703), "AAA");
        assert_eq!(CellAddress::column_to_letters(16384), "XFD");
    }

    #[test]
    fn test_letters_to_column() {
        assert_eq!(CellAddress::letters_to_column("A").unwrap(), 1);
        assert_eq!(CellAddress::letters_to_column("Z").unwrap(), 26);
        assert_eq!(CellAddress::letters_to_column("AA").unwrap(), 27);
        assert_eq!(CellAddress::letters_to_column("XFD").unwrap(), 16384);

        // Case insensitive
        assert_eq!(CellAddress::letters_to_column("aa").unwrap(), 27);
    }

    #[test]
    fn test_encode_decode() {
        assert_eq!(encode(5, 2).unwrap(), "B5");
        assert_eq!(decode("B5").unwrap(), (5, 2));
        assert_eq!(decode("XFD1048576").unwrap(), (1_048_576, 16384));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        for bad in ["", "1A", "A0", "ZZZZ1", "A", "1", "B-5", "B5x", "$B$5", "XFE1", "A1048577"] {
            assert!(
                matches!(decode(bad), Err(Error::InvalidAddress(_))),
                "expected InvalidAddress for {bad:?}"
            );
        }
    }

    #[test]
    fn test_encode_rejects_zero() {
        assert!(encode(0, 1).is_err());
        assert!(encode(1, 0).is_err());
    }

    #[test]
    fn test_range_parse_and_encode() {
        let range = RangeAddress::parse("B2:D4").unwrap();
        assert_eq!(range.row_count(), 3);
        assert_eq!(range.col_count(), 3);
        assert!(range.contains(&CellAddress::parse("C3").unwrap()));
        assert!(!range.contains(&CellAddress::parse("A1").unwrap()));
        assert_eq!(range.to_string(), "B2:D4");

        let single = RangeAddress::parse("C3").unwrap();
        assert_eq!(single.to_string(), "C3:C3");

        assert!(RangeAddress::parse("D4:B2").is_err());
        assert_eq!(
            encode_range(
                CellAddress::new(12, 1).unwrap(),
                CellAddress::new(13, 3).unwrap()
            )
            .unwrap(),
            "A12:C13"
        );
    }

    #[test]
    fn test_range_with_size_and_cells() {
        let range = RangeAddress::with_size(CellAddress::new(1, 1).unwrap(), 2, 2).unwrap();
        let cells: Vec<String> = range.cells().map(|c| c.to_string()).collect();
        assert_eq!(cells, vec!["A1", "B1", "A2", "B2"]);
        assert!(RangeAddress::with_size(CellAddress::new(1, 1).unwrap(), 0, 2).is_err());
    }

    #[test]
    fn test_row_span_and_qualifier() {
        assert_eq!(encode_row_span(25, 3).unwrap(), "25:27");
        assert!(encode_row_span(25, 0).is_err());
        assert_eq!(strip_sheet_qualifier("Sheet1!A1:C4"), "A1:C4");
        assert_eq!(strip_sheet_qualifier("'My!Sheet'!B2"), "B2");
        assert_eq!(strip_sheet_qualifier("B2"), "B2");
    }

    proptest! {
        #[test]
        fn prop_encode_decode_roundtrip(row in 1u32..=MAX_ROWS, col in 1u32..=MAX_COLS) {
            let wire = encode(row, col).unwrap();
            prop_assert_eq!(decode(&wire).unwrap(), (row, col));
        }
    }
}
