//! Writing marker-anchored sections.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use graph_transport::HttpClient;
use livesheet_core::{CellAddress, ColumnMap, FieldValues, MergeSpec, RangeAddress, WorksheetRef};

use crate::client::{CallContext, GraphClient};
use crate::error::{LiveError, Result};

/// Result of writing one field of a simple section.
#[derive(Debug, Clone)]
pub enum FieldOutcome {
    Written(CellAddress),
    Failed { cell: CellAddress, error: LiveError },
}

impl FieldOutcome {
    pub fn cell(&self) -> CellAddress {
        match self {
            FieldOutcome::Written(cell) | FieldOutcome::Failed { cell, .. } => *cell,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, FieldOutcome::Written(_))
    }
}

/// Per-field results of a simple section write.
#[derive(Debug, Clone, Default)]
pub struct SimpleSectionReport {
    pub fields: BTreeMap<String, FieldOutcome>,
}

impl SimpleSectionReport {
    pub fn is_success(&self) -> bool {
        self.fields.values().all(FieldOutcome::is_written)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &LiveError)> {
        self.fields.iter().filter_map(|(name, outcome)| match outcome {
            FieldOutcome::Failed { error, .. } => Some((name.as_str(), error)),
            FieldOutcome::Written(_) => None,
        })
    }
}

/// A cosmetic merge: applied, or skipped with the reason. Never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Applied(RangeAddress),
    Skipped { target: String, reason: String },
}

impl MergeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MergeOutcome::Applied(_))
    }
}

/// Result of a tabular write.
#[derive(Debug, Clone, Default)]
pub struct TableSectionReport {
    /// Range written, `None` when there were no rows
    pub range: Option<RangeAddress>,
    pub merges: Vec<MergeOutcome>,
}

impl TableSectionReport {
    pub fn rows_written(&self) -> u32 {
        self.range.map(|r| r.row_count()).unwrap_or(0)
    }

    pub fn merges_skipped(&self) -> usize {
        self.merges.iter().filter(|m| !m.is_applied()).count()
    }
}

impl<C: HttpClient> GraphClient<C> {
    /// Write one row of fields on the row below the marker.
    ///
    /// Field `f` lands at `(marker.row + 1, marker.col + columns[f])`. Unknown
    /// fields are rejected before any request; mapped fields without a value
    /// are left untouched. Each field is written independently and reported
    /// on its own.
    pub async fn write_simple_section(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        marker: CellAddress,
        fields: &FieldValues,
        columns: &ColumnMap,
    ) -> Result<SimpleSectionReport> {
        self.write_fields_at(ctx, sheet, marker.offset(1, 0)?, fields, columns)
            .await
    }

    /// Write fields on `anchor.row`, offsetting columns from `anchor.col`.
    pub async fn write_fields_at(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        anchor: CellAddress,
        fields: &FieldValues,
        columns: &ColumnMap,
    ) -> Result<SimpleSectionReport> {
        columns.validate_fields(fields.keys())?;

        let mut targets = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            if let Some(offset) = columns.get(name) {
                targets.push((name, value, anchor.offset(0, offset)?));
            }
        }

        let mut report = SimpleSectionReport::default();
        if targets.is_empty() {
            return Ok(report);
        }
        let sheet = &self.resolve_worksheet(ctx, sheet).await?;
        for (name, value, cell) in targets {
            let outcome = match self.write_cell(ctx, sheet, cell, value).await {
                Ok(()) => FieldOutcome::Written(cell),
                Err(error) => {
                    tracing::warn!(%sheet, field = %name, %cell, %error, "field write failed");
                    FieldOutcome::Failed { cell, error }
                }
            };
            report.fields.insert(name.clone(), outcome);
        }
        Ok(report)
    }

    /// Write a table whose first data row is two rows below the marker.
    ///
    /// All rows go out as one range write starting at column
    /// `marker.col + min(columns)`. Cells between mapped columns, and mapped
    /// fields a row leaves out, keep whatever the sheet already holds.
    /// Afterwards every merge spec is applied to every written row; merge
    /// failures are reported, not raised.
    pub async fn write_table_section(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        marker: CellAddress,
        rows: &[FieldValues],
        columns: &ColumnMap,
        merges: &[MergeSpec],
    ) -> Result<TableSectionReport> {
        self.write_rows_at(ctx, sheet, marker.offset(2, 0)?, rows, columns, merges)
            .await
    }

    /// Write `rows` starting on `anchor.row`, offsetting columns from `anchor.col`.
    pub async fn write_rows_at(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        anchor: CellAddress,
        rows: &[FieldValues],
        columns: &ColumnMap,
        merges: &[MergeSpec],
    ) -> Result<TableSectionReport> {
        let (min_offset, matrix) = columns.to_matrix(rows)?;
        if matrix.is_empty() {
            return Ok(TableSectionReport::default());
        }

        let top_left = anchor.offset(0, min_offset)?;
        let sheet = &self.resolve_worksheet(ctx, sheet).await?;
        let range = self
            .write_partial_range(ctx, sheet, top_left, &matrix)
            .await?;
        let merges = self
            .apply_merges(ctx, sheet, range.start.row..=range.end.row, merges)
            .await;

        Ok(TableSectionReport {
            range: Some(range),
            merges,
        })
    }

    /// Apply every merge spec to every row in `rows`, collecting outcomes.
    pub async fn apply_merges(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        rows: RangeInclusive<u32>,
        merges: &[MergeSpec],
    ) -> Vec<MergeOutcome> {
        let mut outcomes = Vec::new();
        if merges.is_empty() {
            return outcomes;
        }
        for row in rows {
            for spec in merges {
                let outcome = match spec.on_row(row) {
                    Err(e) => MergeOutcome::Skipped {
                        target: format!("{spec} on row {row}"),
                        reason: e.to_string(),
                    },
                    Ok(range) => match self.merge_range(ctx, sheet, range).await {
                        Ok(()) => MergeOutcome::Applied(range),
                        Err(e) => MergeOutcome::Skipped {
                            target: range.to_string(),
                            reason: e.to_string(),
                        },
                    },
                };
                if let MergeOutcome::Skipped { target, reason } = &outcome {
                    tracing::warn!(%sheet, %target, %reason, "merge skipped");
                }
                outcomes.push(outcome);
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Failure, FakeGraph};
    use graph_transport::{Method, RetryPolicy};
    use livesheet_core::{fields, CellValue, DocumentLocation, DriveScope};
    use pretty_assertions::assert_eq;

    fn location() -> DocumentLocation {
        DocumentLocation::new(DriveScope::Drive("d1".into()), "Factura.xlsx").unwrap()
    }

    fn at(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_simple_section_writes_below_marker() {
        let fake = FakeGraph::new();
        let file = location();
        fake.add_workbook(&file, &["Hoja1"]);
        let columns = ColumnMap::new().with("a", 0).with("b", 1);
        let values = fields([("a", "Foo"), ("b", "Bar")]);

        let report = fake
            .client()
            .write_simple_section(&CallContext::new("t"), &file.sheet("Hoja1"), at("B3"), &values, &columns)
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.fields["a"].cell(), at("B4"));
        assert_eq!(report.fields["b"].cell(), at("C4"));
        assert_eq!(fake.cell(&file, "Hoja1", at("B4")), CellValue::from("Foo"));
        assert_eq!(fake.cell(&file, "Hoja1", at("C4")), CellValue::from("Bar"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simple_section_rejects_unknown_fields_before_writing() {
        let fake = FakeGraph::new();
        let file = location();
        fake.add_workbook(&file, &["Hoja1"]);
        let columns = ColumnMap::new().with("a", 0);
        let values = fields([("a", "Foo"), ("typo", "Bar")]);

        let err = fake
            .client()
            .write_simple_section(&CallContext::new("t"), &file.sheet("Hoja1"), at("B3"), &values, &columns)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidSection);
        assert!(fake.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simple_section_reports_each_field() {
        let fake = FakeGraph::new();
        let file = location();
        fake.add_workbook(&file, &["Hoja1"]);
        fake.inject(Failure::status(Method::Patch, "address='C4'", 403));
        let columns = ColumnMap::new().with("a", 0).with("b", 1).with("c", 2);
        let values = fields([("a", "Foo"), ("b", "Bar")]);

        let ctx = CallContext::new("t").with_policy(RetryPolicy::no_retry());
        let report = fake
            .client()
            .write_simple_section(&ctx, &file.sheet("Hoja1"), at("B3"), &values, &columns)
            .await
            .unwrap();

        assert!(!report.is_success());
        assert!(report.fields["a"].is_written());
        let failures: Vec<&str> = report.failures().map(|(name, _)| name).collect();
        assert_eq!(failures, vec!["b"]);
        // "c" has no value, so nothing is written for it
        assert!(!report.fields.contains_key("c"));
        assert_eq!(fake.count(Method::Patch, ""), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_table_section_one_write_then_merges() {
        let fake = FakeGraph::new();
        let file = location();
        fake.add_workbook(&file, &["Hoja1"]);
        fake.set_cell(&file, "Hoja1", at("F13"), "=F12");
        fake.inject(Failure::status(Method::Post, "address='C13:E13')/merge", 400));
        let columns = ColumnMap::new().with("item", 0).with("desc", 2).with("qty", 5);
        let rows = vec![
            fields([("item", CellValue::from(1)), ("desc", CellValue::from("tornillo")), ("qty", CellValue::from(10))]),
            fields([("item", CellValue::from(2)), ("desc", CellValue::from("tuerca"))]),
        ];
        let merges = vec![MergeSpec::parse("C:E").unwrap()];

        let report = fake
            .client()
            .write_table_section(&CallContext::new("t"), &file.sheet("Hoja1"), at("A10"), &rows, &columns, &merges)
            .await
            .unwrap();

        assert_eq!(report.range, Some(RangeAddress::parse("A12:F13").unwrap()));
        assert_eq!(report.rows_written(), 2);
        assert_eq!(fake.count(Method::Patch, ""), 1);
        assert_eq!(fake.cell(&file, "Hoja1", at("A12")), CellValue::from(1));
        assert_eq!(fake.cell(&file, "Hoja1", at("C13")), CellValue::from("tuerca"));
        // The second row has no "qty", so its cell is left alone
        assert_eq!(fake.cell(&file, "Hoja1", at("F13")), CellValue::from("=F12"));

        assert_eq!(report.merges.len(), 2);
        assert_eq!(
            report.merges[0],
            MergeOutcome::Applied(RangeAddress::parse("C12:E12").unwrap())
        );
        assert!(matches!(
            &report.merges[1],
            MergeOutcome::Skipped { target, .. } if target == "C13:E13"
        ));
        assert_eq!(report.merges_skipped(), 1);
        assert_eq!(fake.merges(&file, "Hoja1"), vec![RangeAddress::parse("C12:E12").unwrap()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_table_section_keeps_cells_between_columns() {
        let fake = FakeGraph::new();
        let file = location();
        fake.add_workbook(&file, &["Hoja1"]);
        fake.set_cell(&file, "Hoja1", at("B12"), "=A12*2");
        let columns = ColumnMap::new().with("a", 0).with("c", 2);
        let rows = vec![
            fields([("a", CellValue::from(5)), ("c", CellValue::from("x"))]),
            fields([("a", CellValue::from(6)), ("c", CellValue::Empty)]),
        ];

        fake.client()
            .write_table_section(&CallContext::new("t"), &file.sheet("Hoja1"), at("A10"), &rows, &columns, &[])
            .await
            .unwrap();

        assert_eq!(fake.cell(&file, "Hoja1", at("A12")), CellValue::from(5));
        assert_eq!(fake.cell(&file, "Hoja1", at("B12")), CellValue::from("=A12*2"));
        assert_eq!(fake.cell(&file, "Hoja1", at("C12")), CellValue::from("x"));
        assert_eq!(fake.cell(&file, "Hoja1", at("C13")), CellValue::Empty);

        let patch = fake
            .requests()
            .into_iter()
            .find(|r| r.method == Method::Patch)
            .unwrap();
        assert_eq!(
            patch.body,
            Some(serde_json::json!({ "values": [[5.0, null, "x"], [6.0, null, ""]] }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_sheet_resolved_once_per_section() {
        let fake = FakeGraph::new();
        let file = location();
        fake.add_workbook(&file, &["Portada", "Hoja1"]);
        let columns = ColumnMap::new().with("a", 0).with("b", 1).with("c", 2);
        let values = fields([("a", "x"), ("b", "y"), ("c", "z")]);
        let merges = vec![MergeSpec::parse("A:B").unwrap()];
        let client = fake.client();
        let ctx = CallContext::new("t");
        let first = WorksheetRef::first(file.clone());

        let report = client
            .write_simple_section(&ctx, &first, at("A1"), &values, &columns)
            .await
            .unwrap();
        assert!(report.is_success());
        assert_eq!(fake.count(Method::Get, "/worksheets"), 1);
        assert_eq!(fake.cell(&file, "Portada", at("C2")), CellValue::from("z"));

        let rows = vec![values.clone(), values];
        client
            .write_table_section(&ctx, &first, at("A5"), &rows, &columns, &merges)
            .await
            .unwrap();
        assert_eq!(fake.count(Method::Get, "/worksheets"), 2);
        assert_eq!(fake.merges(&file, "Portada").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_table_writes_nothing() {
        let fake = FakeGraph::new();
        let file = location();
        fake.add_workbook(&file, &["Hoja1"]);
        let columns = ColumnMap::new().with("a", 0);

        let report = fake
            .client()
            .write_table_section(&CallContext::new("t"), &file.sheet("Hoja1"), at("A1"), &[], &columns, &[])
            .await
            .unwrap();
        assert_eq!(report.range, None);
        assert!(fake.requests().is_empty());
    }
}
