//! Row insertion with content shifting.
//!
//! Inserting rows is the one operation here that is not idempotent. The
//! transport never repeats an insert whose outcome is unknown; instead the
//! editor compares a fingerprint of the row at the insertion point against
//! the live document and only re-issues the insert when it can see that the
//! first attempt did not land.
//!
//! The sequence insert → write → merge is not atomic. After a terminal
//! failure, callers must re-read the document before calling
//! [`GraphClient::insert_rows`] again, or the rows may be inserted twice.

use std::ops::RangeInclusive;

use graph_transport::HttpClient;
use livesheet_core::address::encode_row_span;
use livesheet_core::{CellAddress, CellValue, ColumnMap, FieldValues, MergeSpec, RangeAddress, WorksheetRef};

use crate::accessor::RangeValues;
use crate::client::{CallContext, GraphClient};
use crate::error::{LiveError, Result};
use crate::section::MergeOutcome;

/// Rows to insert and the data to fill them with.
#[derive(Debug, Clone)]
pub struct RowInsert {
    /// First inserted row; the row currently here moves down by `row_count`
    pub start_row: u32,
    pub row_count: u32,
    /// Column that offset 0 maps to
    pub start_column: u32,
    pub rows: Vec<FieldValues>,
    pub columns: ColumnMap,
    pub merges: Vec<MergeSpec>,
}

impl RowInsert {
    /// Insert one row per data row at `start_row`, anchored at column A.
    pub fn new(start_row: u32, rows: Vec<FieldValues>, columns: ColumnMap) -> Self {
        Self {
            start_row,
            row_count: rows.len() as u32,
            start_column: 1,
            rows,
            columns,
            merges: Vec::new(),
        }
    }

    pub fn with_row_count(mut self, row_count: u32) -> Self {
        self.row_count = row_count;
        self
    }

    pub fn at_column(mut self, start_column: u32) -> Self {
        self.start_column = start_column;
        self
    }

    pub fn with_merges(mut self, merges: Vec<MergeSpec>) -> Self {
        self.merges = merges;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.row_count == 0 {
            return Err(livesheet_core::Error::InvalidSection("row count must be positive".into()).into());
        }
        if (self.rows.len() as u32) > self.row_count {
            return Err(livesheet_core::Error::InvalidSection(format!(
                "{} data rows do not fit in {} inserted rows",
                self.rows.len(),
                self.row_count
            ))
            .into());
        }
        CellAddress::new(self.start_row, self.start_column)?;
        for row in &self.rows {
            self.columns.validate_fields(row.keys())?;
        }
        Ok(())
    }
}

/// How the insert request was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertConfirmation {
    /// The first attempt succeeded
    Direct,
    /// The attempt failed ambiguously but the document shows it was applied
    VerifiedApplied,
    /// The attempt failed ambiguously, had not been applied, and was re-issued
    Reissued,
}

/// Result of [`GraphClient::insert_rows`].
#[derive(Debug, Clone)]
pub struct InsertReport {
    pub sheet: WorksheetRef,
    /// Inserted rows in wire notation, e.g. `25:27`
    pub rows: String,
    pub confirmation: InsertConfirmation,
    /// Range the data was written to, `None` with no data rows
    pub written: Option<RangeAddress>,
    pub merges: Vec<MergeOutcome>,
}

/// Contents of the row at the insertion point before the insert.
#[derive(Debug, Clone, PartialEq)]
struct RowFingerprint {
    columns: RangeInclusive<u32>,
    values: Vec<CellValue>,
}

impl RowFingerprint {
    fn take(used: &RangeValues, row: u32) -> Self {
        let columns = used.range.start.col..=used.range.end.col;
        Self {
            values: row_values(used, row, &columns),
            columns,
        }
    }

    fn is_blank(&self) -> bool {
        self.values.iter().all(CellValue::is_empty)
    }
}

fn row_values(values: &RangeValues, row: u32, columns: &RangeInclusive<u32>) -> Vec<CellValue> {
    columns
        .clone()
        .map(|col| values.get(CellAddress { row, col }))
        .collect()
}

enum InsertState {
    Applied,
    NotApplied,
    Unknown(String),
}

impl<C: HttpClient> GraphClient<C> {
    /// Insert blank rows, fill them with data, and merge column spans on each
    /// inserted row.
    ///
    /// Data row `i` field `f` lands at
    /// `(start_row + i, start_column + columns[f])`. Merge failures are
    /// reported in the result and never abort the call.
    pub async fn insert_rows(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        insert: &RowInsert,
    ) -> Result<InsertReport> {
        insert.validate()?;
        let sheet = self.resolve_worksheet(ctx, sheet).await?;
        let span = encode_row_span(insert.start_row, insert.row_count)?;

        let fingerprint = RowFingerprint::take(
            &self.used_range(ctx, &sheet).await?,
            insert.start_row,
        );

        let confirmation = self
            .insert_verified(ctx, &sheet, insert, &span, &fingerprint)
            .await?;

        let anchor = CellAddress::new(insert.start_row, insert.start_column)?;
        let written = self
            .write_rows_at(ctx, &sheet, anchor, &insert.rows, &insert.columns, &[])
            .await?
            .range;

        let last_row = insert.start_row + insert.row_count - 1;
        let merges = self
            .apply_merges(ctx, &sheet, insert.start_row..=last_row, &insert.merges)
            .await;

        Ok(InsertReport {
            sheet,
            rows: span,
            confirmation,
            written,
            merges,
        })
    }

    async fn insert_verified(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        insert: &RowInsert,
        span: &str,
        fingerprint: &RowFingerprint,
    ) -> Result<InsertConfirmation> {
        let first = match self
            .insert_blank_rows(ctx, sheet, insert.start_row, insert.row_count)
            .await
        {
            Ok(()) => return Ok(InsertConfirmation::Direct),
            Err(e) if e.outcome_unknown() => e,
            Err(e) => return Err(e),
        };

        tracing::warn!(%sheet, rows = span, error = %first, "row insert outcome unknown, verifying");
        let unverified = |reason: String, source: &LiveError| LiveError::StructuralEditUnverified {
            rows: span.to_string(),
            reason,
            request_id: source.request_id().map(str::to_string),
        };

        match self.insert_state(ctx, sheet, insert, fingerprint).await {
            InsertState::Applied => {
                tracing::info!(%sheet, rows = span, "row insert was applied");
                Ok(InsertConfirmation::VerifiedApplied)
            }
            InsertState::NotApplied => {
                tracing::info!(%sheet, rows = span, "row insert was not applied, re-issuing");
                match self
                    .insert_blank_rows(ctx, sheet, insert.start_row, insert.row_count)
                    .await
                {
                    Ok(()) => Ok(InsertConfirmation::Reissued),
                    Err(e) if e.outcome_unknown() => {
                        Err(unverified(format!("re-issued insert failed: {e}"), &e))
                    }
                    Err(e) => Err(e),
                }
            }
            InsertState::Unknown(reason) => Err(unverified(reason, &first)),
        }
    }

    async fn insert_state(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        insert: &RowInsert,
        fingerprint: &RowFingerprint,
    ) -> InsertState {
        if fingerprint.is_blank() {
            return InsertState::Unknown(format!(
                "row {} was blank before the insert",
                insert.start_row
            ));
        }
        let used = match self.used_range(ctx, sheet).await {
            Ok(used) => used,
            Err(e) => return InsertState::Unknown(format!("verification read failed: {e}")),
        };

        let at_start = row_values(&used, insert.start_row, &fingerprint.columns);
        let shifted = row_values(
            &used,
            insert.start_row + insert.row_count,
            &fingerprint.columns,
        );

        if shifted == fingerprint.values && at_start.iter().all(CellValue::is_empty) {
            InsertState::Applied
        } else if at_start == fingerprint.values {
            InsertState::NotApplied
        } else {
            InsertState::Unknown(format!(
                "row {} no longer matches its contents before the insert",
                insert.start_row
            ))
        }
    }
}
