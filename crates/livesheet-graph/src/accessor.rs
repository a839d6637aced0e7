//! Cell, range, worksheet, table and workbook operations.
//!
//! Each method maps onto the fewest Graph requests that do the job: cell
//! reads are grouped into `$batch` calls, a rectangular write is one PATCH.
//! Every request goes through the transport and its classified failures are
//! surfaced unchanged. The one exception is `$batch`: sub-responses never
//! reach the transport, so transient per-cell failures are retried here
//! under the same policy.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use graph_transport::{FailureKind, HttpClient, HttpRequest, TransportError};
use livesheet_core::address::{self, strip_sheet_qualifier};
use livesheet_core::location::normalize_path;
use livesheet_core::{CellAddress, CellValue, DocumentLocation, DriveScope, RangeAddress, WorksheetRef};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tokio::time::Instant;

use crate::client::{CallContext, GraphClient};
use crate::error::{LiveError, Result};
use crate::xlsx;

/// Maximum sub-requests per `$batch` call
pub const BATCH_LIMIT: usize = 20;

/// A worksheet as listed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorksheetInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub visibility: Option<String>,
}

/// A file in the drive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub folder: Option<JsonValue>,
}

impl DriveItem {
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableInfo {
    pub id: String,
    pub name: String,
}

/// Values of a rectangular block of cells, anchored at `range.start`.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeValues {
    pub range: RangeAddress,
    pub values: Vec<Vec<CellValue>>,
}

impl RangeValues {
    /// Value at an absolute address; `Empty` outside the block
    pub fn get(&self, addr: CellAddress) -> CellValue {
        if !self.range.contains(&addr) {
            return CellValue::Empty;
        }
        let r = (addr.row - self.range.start.row) as usize;
        let c = (addr.col - self.range.start.col) as usize;
        self.values
            .get(r)
            .and_then(|row| row.get(c))
            .cloned()
            .unwrap_or_default()
    }

    /// Cells in row-major order with their absolute addresses
    pub fn cells(&self) -> impl Iterator<Item = (CellAddress, &CellValue)> + '_ {
        let start = self.range.start;
        self.values.iter().enumerate().flat_map(move |(r, row)| {
            row.iter().enumerate().map(move |(c, value)| {
                (
                    CellAddress {
                        row: start.row + r as u32,
                        col: start.col + c as u32,
                    },
                    value,
                )
            })
        })
    }

    /// Values of one absolute row, clipped to the block's columns
    pub fn row(&self, row: u32) -> Vec<CellValue> {
        (self.range.start.col..=self.range.end.col)
            .map(|col| self.get(CellAddress { row, col }))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeResponse {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    values: Vec<Vec<JsonValue>>,
    #[serde(default)]
    row_index: Option<u32>,
    #[serde(default)]
    column_index: Option<u32>,
}

impl RangeResponse {
    fn into_range_values(self) -> Result<RangeValues> {
        let start = match (self.row_index, self.column_index) {
            (Some(r), Some(c)) => CellAddress::new(r + 1, c + 1)?,
            _ => {
                let addr = self.address.as_deref().ok_or_else(|| {
                    LiveError::UnexpectedResponse("range without address or index".into())
                })?;
                RangeAddress::parse(strip_sheet_qualifier(addr))?.start
            }
        };
        let values: Vec<Vec<CellValue>> = self
            .values
            .iter()
            .map(|row| row.iter().map(CellValue::from_json).collect())
            .collect();
        let rows = values.len().max(1) as u32;
        let cols = values.iter().map(Vec::len).max().unwrap_or(0).max(1) as u32;
        Ok(RangeValues {
            range: RangeAddress::with_size(start, rows, cols)?,
            values,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    responses: Vec<BatchItem>,
}

#[derive(Debug, Deserialize)]
struct BatchItem {
    id: String,
    status: u16,
    #[serde(default)]
    headers: BTreeMap<String, JsonValue>,
    #[serde(default)]
    body: Option<JsonValue>,
}

impl BatchItem {
    fn retry_after(&self) -> Option<Duration> {
        let (_, value) = self
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))?;
        match value {
            JsonValue::String(s) => s.trim().parse().ok(),
            other => other.as_u64(),
        }
        .map(Duration::from_secs)
    }

    fn cell_value(&self) -> CellValue {
        self.body
            .as_ref()
            .and_then(|b| b.get("values"))
            .and_then(|v| v.get(0))
            .and_then(|r| r.get(0))
            .map(CellValue::from_json)
            .unwrap_or_default()
    }
}

/// A batched cell read that failed transiently.
struct BatchFailure {
    cell: CellAddress,
    kind: FailureKind,
    status: u16,
    retry_after: Option<Duration>,
}

/// How to resolve an existing file at an upload destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictBehavior {
    /// Reject the upload with a permanent error
    #[default]
    Fail,
    /// Keep both; the service picks a free name for the new file
    Rename,
    /// Overwrite the existing file
    Replace,
}

impl ConflictBehavior {
    fn as_query(self) -> &'static str {
        match self {
            ConflictBehavior::Fail => "fail",
            ConflictBehavior::Rename => "rename",
            ConflictBehavior::Replace => "replace",
        }
    }
}

/// Check that `values` is a non-empty rectangle and return (rows, cols).
pub fn rectangle_size<T>(values: &[Vec<T>]) -> Result<(u32, u32)> {
    let cols = values
        .first()
        .map(Vec::len)
        .ok_or_else(|| LiveError::NotRectangular("no rows".into()))?;
    if cols == 0 {
        return Err(LiveError::NotRectangular("empty first row".into()));
    }
    if let Some((i, row)) = values.iter().enumerate().find(|(_, row)| row.len() != cols) {
        return Err(LiveError::NotRectangular(format!(
            "row {i} has {} values, expected {cols}",
            row.len()
        )));
    }
    Ok((values.len() as u32, cols as u32))
}

fn values_json<T>(values: &[Vec<T>], encode: impl Fn(&T) -> JsonValue) -> JsonValue {
    JsonValue::Array(
        values
            .iter()
            .map(|row| JsonValue::Array(row.iter().map(&encode).collect()))
            .collect(),
    )
}

fn range_segment(address: &str) -> String {
    format!("range(address='{address}')")
}

impl<C: HttpClient> GraphClient<C> {
    // ========================================================================
    // Worksheets
    // ========================================================================

    /// List the document's worksheets in position order.
    pub async fn list_worksheets(
        &self,
        ctx: &CallContext,
        location: &DocumentLocation,
    ) -> Result<Vec<WorksheetInfo>> {
        let url = self.url(&format!("{}/worksheets", location.workbook_path()));
        let list: ListResponse<WorksheetInfo> = self.send_json(ctx, HttpRequest::get(url)).await?;
        let mut sheets = list.value;
        sheets.sort_by_key(|s| s.position);
        Ok(sheets)
    }

    /// Resolve a possibly-unnamed worksheet reference to a named one.
    ///
    /// An absent sheet name means the sheet at the lowest position.
    pub async fn resolve_worksheet(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
    ) -> Result<WorksheetRef> {
        if sheet.sheet.is_some() {
            return Ok(sheet.clone());
        }
        let first = self
            .list_worksheets(ctx, &sheet.location)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LiveError::SheetNotFound(format!("{} has no worksheets", sheet.location)))?;
        tracing::debug!(document = %sheet.location, sheet = %first.name, "resolved default worksheet");
        Ok(sheet.location.sheet(first.name))
    }

    async fn worksheet_path(&self, ctx: &CallContext, sheet: &WorksheetRef) -> Result<String> {
        match sheet.worksheet_path() {
            Some(path) => Ok(path),
            None => {
                let named = self.resolve_worksheet(ctx, sheet).await?;
                named
                    .worksheet_path()
                    .ok_or_else(|| LiveError::SheetNotFound(named.to_string()))
            }
        }
    }

    pub async fn add_worksheet(
        &self,
        ctx: &CallContext,
        location: &DocumentLocation,
        name: &str,
    ) -> Result<WorksheetInfo> {
        let url = self.url(&format!("{}/worksheets/add", location.workbook_path()));
        let info: WorksheetInfo = self
            .send_json(ctx, HttpRequest::post(url).json(json!({ "name": name })))
            .await?;
        tracing::info!(document = %location, sheet = %info.name, "worksheet added");
        Ok(info)
    }

    /// Delete a worksheet. The service rejects deleting the last one.
    pub async fn delete_worksheet(&self, ctx: &CallContext, sheet: &WorksheetRef) -> Result<()> {
        let path = self.worksheet_path(ctx, sheet).await?;
        self.send(ctx, HttpRequest::delete(self.url(&path))).await?;
        tracing::info!(%sheet, "worksheet deleted");
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read individual cells, batching up to [`BATCH_LIMIT`] per round trip.
    ///
    /// The result holds exactly the requested addresses. A cell whose
    /// sub-request fails permanently reads as `Empty`. Sub-requests that fail
    /// transiently (the batch itself succeeds while single cells report
    /// locked, throttled or a server fault) are re-sent on their own under
    /// the call's retry policy and deadline; once retries run out the read
    /// fails with that classification.
    pub async fn read_cells(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        addresses: &BTreeSet<CellAddress>,
    ) -> Result<BTreeMap<CellAddress, CellValue>> {
        let mut result = BTreeMap::new();
        if addresses.is_empty() {
            return Ok(result);
        }
        let ws = self.worksheet_path(ctx, sheet).await?;
        let policy = ctx
            .options
            .policy
            .as_ref()
            .unwrap_or_else(|| self.transport().policy());
        let all: Vec<CellAddress> = addresses.iter().copied().collect();

        for chunk in all.chunks(BATCH_LIMIT) {
            let mut pending = chunk.to_vec();
            let mut attempt: u32 = 0;
            loop {
                attempt += 1;
                let failures = self.read_batch(ctx, &ws, &pending, &mut result).await?;
                let Some(first) = failures.first() else {
                    break;
                };

                let retryable = failures.iter().all(|f| policy.should_retry(f.kind));
                if !retryable || attempt >= policy.attempts() {
                    tracing::warn!(%sheet, cell = %first.cell, kind = %first.kind, attempt, "batched read failed");
                    return Err(TransportError::Remote {
                        kind: first.kind,
                        status: Some(first.status),
                        message: format!(
                            "batched read of {} returned HTTP {}",
                            first.cell, first.status
                        ),
                        request_id: None,
                        attempts: attempt,
                    }
                    .into());
                }

                let hint = failures.iter().filter_map(|f| f.retry_after).max();
                let delay = policy.delay_before_retry(attempt, hint);
                if let Some(deadline) = ctx.options.deadline {
                    if Instant::now() + delay >= deadline {
                        return Err(TransportError::Timeout {
                            attempts: attempt,
                            last_kind: Some(first.kind),
                            request_id: None,
                        }
                        .into());
                    }
                }
                tracing::info!(
                    %sheet,
                    cells = failures.len(),
                    kind = %first.kind,
                    attempt,
                    ?delay,
                    "retrying batched cell reads"
                );
                tokio::time::sleep(delay).await;
                pending = failures.into_iter().map(|f| f.cell).collect();
            }
        }
        Ok(result)
    }

    /// One `$batch` round trip. Successful and permanently failed cells go
    /// into `result`; transient sub-failures are returned.
    async fn read_batch(
        &self,
        ctx: &CallContext,
        ws: &str,
        cells: &[CellAddress],
        result: &mut BTreeMap<CellAddress, CellValue>,
    ) -> Result<Vec<BatchFailure>> {
        let requests: Vec<JsonValue> = cells
            .iter()
            .enumerate()
            .map(|(i, addr)| {
                json!({
                    "id": i.to_string(),
                    "method": "GET",
                    "url": format!("{ws}/{}", range_segment(&addr.to_a1_string())),
                })
            })
            .collect();

        // A $batch of GETs is a read; repeating it is harmless.
        let request = HttpRequest::post(self.url("/$batch"))
            .json(json!({ "requests": requests }))
            .idempotent(true);
        let batch: BatchResponse = self.send_json(ctx, request).await?;
        let by_id: BTreeMap<&str, &BatchItem> =
            batch.responses.iter().map(|r| (r.id.as_str(), r)).collect();

        let mut failures = Vec::new();
        for (i, addr) in cells.iter().enumerate() {
            let item = by_id.get(i.to_string().as_str()).ok_or_else(|| {
                LiveError::UnexpectedResponse(format!("batch response missing id {i}"))
            })?;
            match FailureKind::classify_status(item.status) {
                None => {
                    result.insert(*addr, item.cell_value());
                }
                Some(FailureKind::PermanentClientError) => {
                    tracing::debug!(cell = %addr, status = item.status, "cell read failed, treating as empty");
                    result.insert(*addr, CellValue::Empty);
                }
                Some(kind) => failures.push(BatchFailure {
                    cell: *addr,
                    kind,
                    status: item.status,
                    retry_after: item.retry_after(),
                }),
            }
        }
        Ok(failures)
    }

    /// Read a rectangular range.
    pub async fn read_range(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        range: RangeAddress,
    ) -> Result<RangeValues> {
        let ws = self.worksheet_path(ctx, sheet).await?;
        let url = self.url(&format!("{ws}/{}", range_segment(&range.to_a1_string())));
        let response: RangeResponse = self.send_json(ctx, HttpRequest::get(url)).await?;
        let mut values = response.into_range_values()?;
        // The service echoes the requested range; trust the request for the anchor.
        values.range = RangeAddress::with_size(
            range.start,
            values.range.row_count(),
            values.range.col_count(),
        )?;
        Ok(values)
    }

    /// Read the smallest block containing every non-empty cell.
    pub async fn used_range(&self, ctx: &CallContext, sheet: &WorksheetRef) -> Result<RangeValues> {
        let ws = self.worksheet_path(ctx, sheet).await?;
        let url = self.url(&format!("{ws}/usedRange(valuesOnly=true)"));
        let response: RangeResponse = self.send_json(ctx, HttpRequest::get(url)).await?;
        response.into_range_values()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    pub async fn write_cell(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        addr: CellAddress,
        value: &CellValue,
    ) -> Result<()> {
        let ws = self.worksheet_path(ctx, sheet).await?;
        let url = self.url(&format!("{ws}/{}", range_segment(&addr.to_a1_string())));
        self.send(
            ctx,
            HttpRequest::patch(url).json(json!({ "values": [[value.to_json()]] })),
        )
        .await?;
        tracing::debug!(%sheet, cell = %addr, "cell written");
        Ok(())
    }

    /// Write a rectangular block anchored at `top_left` in one request.
    ///
    /// All-or-nothing from the caller's view: on failure the prior content of
    /// the range is undefined. Returns the range written.
    pub async fn write_range(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        top_left: CellAddress,
        values: &[Vec<CellValue>],
    ) -> Result<RangeAddress> {
        let (rows, cols) = rectangle_size(values)?;
        let body = values_json(values, CellValue::to_json);
        self.patch_range(ctx, sheet, top_left, rows, cols, body).await
    }

    /// Like [`write_range`](Self::write_range), but `None` slots leave the
    /// existing cell content, formulas included, untouched.
    pub async fn write_partial_range(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        top_left: CellAddress,
        values: &[Vec<Option<CellValue>>],
    ) -> Result<RangeAddress> {
        let (rows, cols) = rectangle_size(values)?;
        let body = values_json(values, |slot| CellValue::slot_to_json(slot.as_ref()));
        self.patch_range(ctx, sheet, top_left, rows, cols, body).await
    }

    async fn patch_range(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        top_left: CellAddress,
        rows: u32,
        cols: u32,
        values: JsonValue,
    ) -> Result<RangeAddress> {
        let range = RangeAddress::with_size(top_left, rows, cols)?;
        let ws = self.worksheet_path(ctx, sheet).await?;
        let url = self.url(&format!("{ws}/{}", range_segment(&range.to_a1_string())));
        self.send(ctx, HttpRequest::patch(url).json(json!({ "values": values })))
            .await?;
        tracing::debug!(%sheet, %range, "range written");
        Ok(range)
    }

    /// Issue the service's native row insert once: `row_count` blank rows at
    /// `start_row`, shifting existing rows down.
    ///
    /// Not idempotent. Only rejections (locked, throttled) are retried; any
    /// ambiguous failure is returned to the caller.
    pub async fn insert_blank_rows(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        start_row: u32,
        row_count: u32,
    ) -> Result<()> {
        let span = address::encode_row_span(start_row, row_count)?;
        let ws = self.worksheet_path(ctx, sheet).await?;
        let url = self.url(&format!("{ws}/{}/insert", range_segment(&span)));
        self.send(
            ctx,
            HttpRequest::post(url)
                .json(json!({ "shift": "Down" }))
                .idempotent(false),
        )
        .await?;
        tracing::info!(%sheet, rows = %span, "rows inserted");
        Ok(())
    }

    /// Merge a range into a single cell.
    pub async fn merge_range(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        range: RangeAddress,
    ) -> Result<()> {
        let ws = self.worksheet_path(ctx, sheet).await?;
        let url = self.url(&format!("{ws}/{}/merge", range_segment(&range.to_a1_string())));
        // Merging an already merged range is a no-op.
        self.send(
            ctx,
            HttpRequest::post(url)
                .json(json!({ "across": true }))
                .idempotent(true),
        )
        .await?;
        Ok(())
    }

    // ========================================================================
    // Tables
    // ========================================================================

    /// Create a table over `range`, optionally renaming it.
    ///
    /// With `has_headers` the first row of `range` is the header row.
    pub async fn create_table(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        range: RangeAddress,
        has_headers: bool,
        name: Option<&str>,
    ) -> Result<TableInfo> {
        let ws = self.worksheet_path(ctx, sheet).await?;
        let url = self.url(&format!("{ws}/tables/add"));
        let mut table: TableInfo = self
            .send_json(
                ctx,
                HttpRequest::post(url).json(json!({
                    "address": range.to_a1_string(),
                    "hasHeaders": has_headers,
                })),
            )
            .await?;

        if let Some(name) = name {
            let url = self.url(&format!(
                "{}/tables/{}",
                sheet.location.workbook_path(),
                urlencoding::encode(&table.id)
            ));
            table = self
                .send_json(ctx, HttpRequest::patch(url).json(json!({ "name": name })))
                .await?;
        }
        tracing::info!(%sheet, table = %table.name, %range, "table created");
        Ok(table)
    }

    /// Append rows to a named table. An empty `rows` issues no request.
    pub async fn add_table_rows(
        &self,
        ctx: &CallContext,
        location: &DocumentLocation,
        table: &str,
        rows: &[Vec<CellValue>],
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        rectangle_size(rows)?;
        let url = self.url(&format!(
            "{}/tables/{}/rows/add",
            location.workbook_path(),
            urlencoding::encode(table)
        ));
        let body = json!({ "values": values_json(rows, CellValue::to_json) });
        self.send(ctx, HttpRequest::post(url).json(body))
            .await?;
        tracing::info!(document = %location, table, rows = rows.len(), "table rows added");
        Ok(())
    }

    // ========================================================================
    // Workbook files
    // ========================================================================

    /// Upload an empty workbook. Fails if a file already exists at `location`.
    pub async fn create_workbook(
        &self,
        ctx: &CallContext,
        location: &DocumentLocation,
    ) -> Result<DriveItem> {
        let content = xlsx::empty_workbook(xlsx::DEFAULT_SHEET_NAME)?;
        let url = self.url(&format!(
            "{}/content?@microsoft.graph.conflictBehavior=fail",
            location.item_path()
        ));
        let item: DriveItem = self
            .send_json(
                ctx,
                HttpRequest::put(url)
                    .bytes(xlsx::XLSX_CONTENT_TYPE, content)
                    .idempotent(false),
            )
            .await?;
        tracing::info!(document = %location, id = %item.id, "workbook created");
        Ok(item)
    }

    /// Copy `source` to `dest` by downloading its content and uploading it
    /// again. The copy is a new file; `conflict` decides what happens when
    /// `dest` already exists.
    pub async fn copy_workbook(
        &self,
        ctx: &CallContext,
        source: &DocumentLocation,
        dest: &DocumentLocation,
        conflict: ConflictBehavior,
    ) -> Result<DriveItem> {
        let url = self.url(&format!("{}/content", source.item_path()));
        let content = self.send(ctx, HttpRequest::get(url)).await?.body;
        if content.is_empty() {
            return Err(LiveError::UnexpectedResponse(format!("{source} has no content")));
        }

        let url = self.url(&format!(
            "{}/content?@microsoft.graph.conflictBehavior={}",
            dest.item_path(),
            conflict.as_query()
        ));
        let request = HttpRequest::put(url)
            .bytes(xlsx::XLSX_CONTENT_TYPE, content)
            .idempotent(conflict == ConflictBehavior::Replace);
        let item: DriveItem = self.send_json(ctx, request).await?;
        tracing::info!(source = %source, dest = %dest, name = %item.name, "workbook copied");
        Ok(item)
    }

    /// List `.xlsx` files directly inside `folder` (empty for the drive root).
    pub async fn list_workbooks(
        &self,
        ctx: &CallContext,
        scope: &DriveScope,
        folder: &str,
    ) -> Result<Vec<DriveItem>> {
        let folder = normalize_path(folder);
        let path = if folder.is_empty() {
            format!("{}/root/children", scope.drive_prefix())
        } else {
            let encoded: Vec<String> = folder
                .split('/')
                .map(|seg| urlencoding::encode(seg).into_owned())
                .collect();
            format!("{}/root:/{}:/children", scope.drive_prefix(), encoded.join("/"))
        };

        let mut items = Vec::new();
        let mut next = Some(self.url(&path));
        while let Some(url) = next {
            let page: ListResponse<DriveItem> = self.send_json(ctx, HttpRequest::get(url)).await?;
            items.extend(
                page.value
                    .into_iter()
                    .filter(|item| !item.is_folder() && item.name.to_ascii_lowercase().ends_with(".xlsx")),
            );
            next = page.next_link;
        }
        Ok(items)
    }

    pub async fn delete_workbook(&self, ctx: &CallContext, location: &DocumentLocation) -> Result<()> {
        self.send(ctx, HttpRequest::delete(self.url(&location.item_path())))
            .await?;
        tracing::info!(document = %location, "workbook deleted");
        Ok(())
    }
}
