//! Marker-anchored section configuration and data

use crate::address::{CellAddress, RangeAddress};
use crate::error::{Error, Result};
use crate::value::CellValue;
use crate::MAX_COLS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field values of one logical row, keyed by field name.
pub type FieldValues = BTreeMap<String, CellValue>;

/// How a section is laid out relative to its marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// One row of key-value fields, on the row right below the marker
    #[default]
    Simple,
    /// A header row below the marker followed by N data rows, written in place
    Table,
    /// Like `Table`, but the data rows are inserted, shifting existing rows down
    InsertRows,
}

impl LayoutKind {
    /// Default distance between the marker row and the first written row
    pub fn default_row_offset(self) -> u32 {
        match self {
            LayoutKind::Simple => 1,
            LayoutKind::Table | LayoutKind::InsertRows => 2,
        }
    }
}

/// Field name → 0-based column offset relative to an anchor column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMap(BTreeMap<String, u32>);

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, offset: u32) -> Self {
        self.0.insert(field.into(), offset);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, offset: u32) {
        self.0.insert(field.into(), offset);
    }

    pub fn get(&self, field: &str) -> Option<u32> {
        self.0.get(field).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Smallest offset in the map
    pub fn min_offset(&self) -> Option<u32> {
        self.0.values().copied().min()
    }

    /// Smallest and largest offsets in the map
    pub fn span(&self) -> Option<(u32, u32)> {
        let min = self.0.values().copied().min()?;
        let max = self.0.values().copied().max()?;
        Some((min, max))
    }

    /// Reject offsets that cannot land on a worksheet column.
    pub fn validate_offsets(&self) -> Result<()> {
        match self.0.iter().find(|(_, offset)| **offset >= MAX_COLS) {
            Some((field, offset)) => Err(Error::InvalidAddress(format!(
                "column offset {offset} for field '{field}' exceeds the worksheet width"
            ))),
            None => Ok(()),
        }
    }

    /// Reject field names that the map does not know about.
    ///
    /// Runs before any remote call so that a typo never produces a partial write.
    pub fn validate_fields<'a>(&self, fields: impl IntoIterator<Item = &'a String>) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidSection("column map is empty".into()));
        }
        self.validate_offsets()?;
        let unknown: Vec<&str> = fields
            .into_iter()
            .filter(|f| !self.0.contains_key(f.as_str()))
            .map(String::as_str)
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidSection(format!(
                "fields not present in column map: {}",
                unknown.join(", ")
            )))
        }
    }

    /// Lay rows out as a rectangular matrix spanning `min_offset..=max_offset`.
    ///
    /// Returns the offset of the first matrix column and the matrix. Slots
    /// with no value are `None`: unmapped columns between offsets and mapped
    /// fields missing from a row. They are written as "leave unchanged", so
    /// template content in those cells survives.
    pub fn to_matrix(&self, rows: &[FieldValues]) -> Result<(u32, Vec<Vec<Option<CellValue>>>)> {
        self.validate_offsets()?;
        for row in rows {
            self.validate_fields(row.keys())?;
        }
        let (min, max) = self
            .span()
            .ok_or_else(|| Error::InvalidSection("column map is empty".into()))?;
        let width = max
            .checked_sub(min)
            .and_then(|w| w.checked_add(1))
            .ok_or_else(|| Error::InvalidAddress(format!("column span {min}..={max}")))?
            as usize;
        let matrix = rows
            .iter()
            .map(|row| {
                let mut cells = vec![None; width];
                for (field, value) in row {
                    if let Some(offset) = self.get(field) {
                        cells[(offset - min) as usize] = Some(value.clone());
                    }
                }
                cells
            })
            .collect();
        Ok((min, matrix))
    }
}

impl<K: Into<String>> FromIterator<(K, u32)> for ColumnMap {
    fn from_iter<I: IntoIterator<Item = (K, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A column span merged on every written row, e.g. `C:E`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSpec {
    pub start_col: u32,
    pub end_col: u32,
}

impl MergeSpec {
    /// Parse `"C:E"` (letters only, start <= end)
    pub fn parse(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidMerge(format!("expected 'X:Y', got '{s}'")))?;
        let start_col = CellAddress::letters_to_column(start.trim())
            .map_err(|e| Error::InvalidMerge(format!("'{s}': {e}")))?;
        let end_col = CellAddress::letters_to_column(end.trim())
            .map_err(|e| Error::InvalidMerge(format!("'{s}': {e}")))?;
        if start_col > end_col {
            return Err(Error::InvalidMerge(format!("'{s}' is reversed")));
        }
        Ok(Self { start_col, end_col })
    }

    /// The concrete range this spec covers on `row`
    pub fn on_row(&self, row: u32) -> Result<RangeAddress> {
        RangeAddress::new(
            CellAddress::new(row, self.start_col)?,
            CellAddress::new(row, self.end_col)?,
        )
    }
}

impl std::fmt::Display for MergeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}",
            CellAddress::column_to_letters(self.start_col),
            CellAddress::column_to_letters(self.end_col)
        )
    }
}

impl Serialize for MergeSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MergeSpec {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        MergeSpec::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Per-section configuration supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionConfig {
    /// Literal text of the anchor cell
    pub marker: String,
    #[serde(default)]
    pub layout: LayoutKind,
    pub columns: ColumnMap,
    /// Worksheet override; the document's first sheet when absent
    #[serde(default)]
    pub sheet: Option<String>,
    /// Column spans merged on every written row (TABLE and INSERT layouts)
    #[serde(default)]
    pub merges: Vec<MergeSpec>,
    /// Overrides [`LayoutKind::default_row_offset`]
    #[serde(default)]
    pub row_offset: Option<u32>,
    /// Shift applied before the field offsets.
    ///
    /// SIMPLE and TABLE sections count it from the marker column. INSERT
    /// sections treat it as an absolute 0-based column (`0` is column A);
    /// without it they stay on the marker column.
    #[serde(default)]
    pub column_offset: Option<u32>,
}

impl SectionConfig {
    pub fn simple(marker: impl Into<String>, columns: ColumnMap) -> Self {
        Self::with_layout(marker, LayoutKind::Simple, columns)
    }

    pub fn table(marker: impl Into<String>, columns: ColumnMap) -> Self {
        Self::with_layout(marker, LayoutKind::Table, columns)
    }

    pub fn insert_rows(marker: impl Into<String>, columns: ColumnMap) -> Self {
        Self::with_layout(marker, LayoutKind::InsertRows, columns)
    }

    fn with_layout(marker: impl Into<String>, layout: LayoutKind, columns: ColumnMap) -> Self {
        Self {
            marker: marker.into(),
            layout,
            columns,
            sheet: None,
            merges: Vec::new(),
            row_offset: None,
            column_offset: None,
        }
    }

    pub fn on_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    pub fn with_merges(mut self, merges: Vec<MergeSpec>) -> Self {
        self.merges = merges;
        self
    }

    pub fn with_row_offset(mut self, offset: u32) -> Self {
        self.row_offset = Some(offset);
        self
    }

    pub fn with_column_offset(mut self, offset: u32) -> Self {
        self.column_offset = Some(offset);
        self
    }

    /// Distance between the marker row and the first written row
    pub fn effective_row_offset(&self) -> u32 {
        self.row_offset
            .unwrap_or_else(|| self.layout.default_row_offset())
    }

    /// Cell that field offset 0 of the first written row maps to, given the
    /// marker's current position.
    pub fn anchor(&self, marker: CellAddress) -> Result<CellAddress> {
        let row = marker.offset(self.effective_row_offset(), 0)?;
        match (self.layout, self.column_offset) {
            (LayoutKind::InsertRows, Some(col)) => {
                let col = col
                    .checked_add(1)
                    .ok_or_else(|| Error::InvalidAddress(format!("column offset {col} out of range")))?;
                CellAddress::new(row.row, col)
            }
            (_, col) => row.offset(0, col.unwrap_or(0)),
        }
    }
}

/// Data for one named section: a single field map, or a list of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionData {
    Fields(FieldValues),
    Rows(Vec<FieldValues>),
}

impl SectionData {
    pub fn describe(&self) -> &'static str {
        match self {
            SectionData::Fields(_) => "field map",
            SectionData::Rows(_) => "row list",
        }
    }
}

impl From<FieldValues> for SectionData {
    fn from(fields: FieldValues) -> Self {
        SectionData::Fields(fields)
    }
}

impl From<Vec<FieldValues>> for SectionData {
    fn from(rows: Vec<FieldValues>) -> Self {
        SectionData::Rows(rows)
    }
}

/// Build a [`FieldValues`] map from pairs.
pub fn fields<K, V, I>(pairs: I) -> FieldValues
where
    K: Into<String>,
    V: Into<CellValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
