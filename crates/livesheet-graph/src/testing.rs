//! In-memory stand-in for the Graph workbook service.
//!
//! [`FakeGraph`] implements [`HttpClient`] and understands the subset of the
//! API this crate uses. It keeps cell contents per worksheet, shifts rows on
//! insert, records merges and tables, serves and accepts file content, logs
//! every request, and can be scripted to fail specific requests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use graph_transport::{BearerToken, HttpClient, HttpRequest, HttpResponse, Method, NetworkError, RequestBody};
use livesheet_core::{CellAddress, CellValue, DocumentLocation, RangeAddress};
use serde_json::{json, Value as JsonValue};

use crate::client::{GraphClient, GraphConfig};

/// API root the fake answers on
pub const FAKE_BASE_URL: &str = "https://graph.fake/v1.0";

/// A request as received by the fake, with the base URL stripped.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<JsonValue>,
    pub client_request_id: Option<String>,
}

/// A scripted failure, consumed by the first matching request.
#[derive(Debug, Clone)]
pub struct Failure {
    method: Method,
    path_contains: String,
    /// `None` fails at the connection level
    status: Option<u16>,
    apply_first: bool,
    retry_after: Option<u64>,
}

impl Failure {
    /// Answer the matching request with `status`
    pub fn status(method: Method, path_contains: &str, status: u16) -> Self {
        Self {
            method,
            path_contains: path_contains.to_string(),
            status: Some(status),
            apply_first: false,
            retry_after: None,
        }
    }

    /// Drop the connection on the matching request
    pub fn network(method: Method, path_contains: &str) -> Self {
        Self {
            status: None,
            ..Self::status(method, path_contains, 0)
        }
    }

    /// Carry out the request before reporting the failure
    pub fn after_applying(mut self) -> Self {
        self.apply_first = true;
        self
    }

    pub fn retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }

    fn matches(&self, method: Method, path: &str) -> bool {
        self.method == method && path.contains(&self.path_contains)
    }
}

#[derive(Debug, Clone)]
struct FakeSheet {
    id: String,
    name: String,
    cells: BTreeMap<(u32, u32), CellValue>,
    merges: Vec<RangeAddress>,
}

impl FakeSheet {
    fn new(id: String, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            cells: BTreeMap::new(),
            merges: Vec::new(),
        }
    }

    fn get(&self, row: u32, col: u32) -> CellValue {
        self.cells.get(&(row, col)).cloned().unwrap_or_default()
    }

    fn set(&mut self, row: u32, col: u32, value: CellValue) {
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    fn qualified(&self, range: &RangeAddress) -> String {
        if self.name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            format!("{}!{range}", self.name)
        } else {
            format!("'{}'!{range}", self.name.replace('\'', "''"))
        }
    }

    fn range_json(&self, range: RangeAddress) -> JsonValue {
        let values: Vec<JsonValue> = (range.start.row..=range.end.row)
            .map(|row| {
                JsonValue::Array(
                    (range.start.col..=range.end.col)
                        .map(|col| self.get(row, col).to_json())
                        .collect(),
                )
            })
            .collect();
        json!({
            "address": self.qualified(&range),
            "rowIndex": range.start.row - 1,
            "columnIndex": range.start.col - 1,
            "rowCount": range.row_count(),
            "columnCount": range.col_count(),
            "values": values,
        })
    }

    fn used_range(&self) -> RangeAddress {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for &(row, col) in self.cells.keys() {
            bounds = Some(match bounds {
                None => (row, col, row, col),
                Some((r0, c0, r1, c1)) => (r0.min(row), c0.min(col), r1.max(row), c1.max(col)),
            });
        }
        let (r0, c0, r1, c1) = bounds.unwrap_or((1, 1, 1, 1));
        RangeAddress {
            start: CellAddress { row: r0, col: c0 },
            end: CellAddress { row: r1, col: c1 },
        }
    }

    fn insert_rows(&mut self, start: u32, count: u32) {
        let cells = std::mem::take(&mut self.cells);
        self.cells = cells
            .into_iter()
            .map(|((row, col), v)| {
                let row = if row >= start { row + count } else { row };
                ((row, col), v)
            })
            .collect();
        for merge in &mut self.merges {
            if merge.start.row >= start {
                merge.start.row += count;
                merge.end.row += count;
            }
        }
    }
}

#[derive(Debug, Clone)]
struct FakeTable {
    id: String,
    name: String,
    sheet: String,
    range: RangeAddress,
}

#[derive(Debug, Clone, Default)]
struct FakeWorkbook {
    sheets: Vec<FakeSheet>,
    tables: Vec<FakeTable>,
    next_id: u32,
    content: Option<Bytes>,
}

impl FakeWorkbook {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn add_sheet(&mut self, name: &str) -> &mut FakeSheet {
        let id = self.next_id("sheet");
        self.sheets.push(FakeSheet::new(id, name));
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    fn sheet_mut(&mut self, name: &str) -> Option<&mut FakeSheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    fn sheet_or_create(&mut self, name: &str) -> &mut FakeSheet {
        match self.sheets.iter().position(|s| s.name == name) {
            Some(i) => &mut self.sheets[i],
            None => self.add_sheet(name),
        }
    }

    fn sheet_json(&self, index: usize) -> JsonValue {
        let sheet = &self.sheets[index];
        json!({
            "id": sheet.id,
            "name": sheet.name,
            "position": index,
            "visibility": "Visible",
        })
    }
}

#[derive(Debug, Default)]
struct State {
    docs: BTreeMap<String, FakeWorkbook>,
    failures: VecDeque<Failure>,
    requests: Vec<RecordedRequest>,
    next_item: u32,
    /// Workbook state captured when its content was downloaded, keyed by the
    /// bytes served, so re-uploading those bytes restores the cells
    snapshots: BTreeMap<Bytes, FakeWorkbook>,
    /// Body of the request being routed, when it is not JSON
    upload: Option<Bytes>,
    /// Non-JSON body for the response being built
    download: Option<Bytes>,
}

type Reply = (u16, JsonValue);

fn error(status: u16, code: &str, message: impl Into<String>) -> Reply {
    (
        status,
        json!({ "error": { "code": code, "message": message.into() } }),
    )
}

fn not_found(what: impl Into<String>) -> Reply {
    error(404, "ItemNotFound", what)
}

fn bad_request(what: impl Into<String>) -> Reply {
    error(400, "InvalidArgument", what)
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

fn doc_key(location: &DocumentLocation) -> String {
    format!("{}/{}", location.scope().drive_prefix(), location.path())
}

/// Split `/drives/x/root:/a/b.xlsx:/rest` into the document key and `/rest`.
fn split_item_path(path: &str) -> Option<(String, &str)> {
    let idx = path.find("/root:/")?;
    let prefix = &path[..idx];
    let (item, rest) = path[idx + "/root:/".len()..].split_once(':')?;
    Some((format!("{prefix}/{}", decode(item)), rest))
}

/// `values` of a write body. `null` slots come back as `None`: the service
/// leaves those cells as they are.
fn parse_matrix(body: Option<&JsonValue>) -> Option<Vec<Vec<Option<CellValue>>>> {
    body?
        .get("values")?
        .as_array()?
        .iter()
        .map(|row| {
            Some(
                row.as_array()?
                    .iter()
                    .map(|v| (!v.is_null()).then(|| CellValue::from_json(v)))
                    .collect::<Vec<_>>(),
            )
        })
        .collect()
}

/// Name the service picks for a renamed upload: `Stem 1.xlsx`, `Stem 2.xlsx`...
fn free_key(docs: &BTreeMap<String, FakeWorkbook>, key: &str) -> String {
    let (stem, ext) = match key.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') => (stem, format!(".{ext}")),
        _ => (key, String::new()),
    };
    (1..)
        .map(|n| format!("{stem} {n}{ext}"))
        .find(|candidate| !docs.contains_key(candidate))
        .unwrap_or_else(|| key.to_string())
}

impl State {
    fn respond(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
    ) -> Result<(Reply, Option<u64>), NetworkError> {
        let scripted = self
            .failures
            .iter()
            .position(|f| f.matches(method, path))
            .and_then(|i| self.failures.remove(i));

        let Some(failure) = scripted else {
            return Ok((self.route(method, path, body), None));
        };
        if failure.apply_first {
            self.route(method, path, body);
        }
        match failure.status {
            None => Err(NetworkError::new("connection reset by peer")),
            Some(status) => Ok((
                error(status, "scripted", format!("scripted failure for {path}")),
                failure.retry_after,
            )),
        }
    }

    fn route(&mut self, method: Method, path: &str, body: Option<&JsonValue>) -> Reply {
        if path == "/$batch" && method == Method::Post {
            return self.batch(body);
        }
        let (path, query) = path.split_once('?').unwrap_or((path, ""));

        if let Some(prefix) = path.strip_suffix("/root/children") {
            return self.children(&format!("{prefix}/"));
        }
        let Some((key, rest)) = split_item_path(path) else {
            return not_found(path);
        };

        match (method, rest) {
            (Method::Get, "/children") => self.children(&format!("{key}/")),
            (Method::Get, "/content") => self.download(&key),
            (Method::Put, "/content") => self.upload(key, query),
            (Method::Delete, "") => match self.docs.remove(&key) {
                Some(_) => (204, JsonValue::Null),
                None => not_found(key),
            },
            (_, rest) => match rest.strip_prefix("/workbook") {
                Some(wb_rest) => self.workbook(&key, method, wb_rest, body),
                None => bad_request(format!("unsupported item route {rest}")),
            },
        }
    }

    fn batch(&mut self, body: Option<&JsonValue>) -> Reply {
        let Some(requests) = body.and_then(|b| b.get("requests")).and_then(JsonValue::as_array) else {
            return bad_request("missing requests");
        };
        if requests.len() > 20 {
            return bad_request("too many requests in batch");
        }
        let mut responses = Vec::new();
        for sub in requests {
            let id = sub.get("id").cloned().unwrap_or(JsonValue::Null);
            let url = sub.get("url").and_then(JsonValue::as_str).unwrap_or_default();
            let (status, body, retry_after) = match self.respond(Method::Get, url, None) {
                Ok(((status, body), retry_after)) => (status, body, retry_after),
                Err(_) => (504, JsonValue::Null, None),
            };
            let mut response = json!({ "id": id, "status": status, "body": body });
            if let Some(secs) = retry_after {
                response["headers"] = json!({ "Retry-After": secs.to_string() });
            }
            responses.push(response);
        }
        // The service does not preserve order.
        responses.reverse();
        (200, json!({ "responses": responses }))
    }

    fn children(&self, folder_prefix: &str) -> Reply {
        let value: Vec<JsonValue> = self
            .docs
            .keys()
            .filter_map(|key| key.strip_prefix(folder_prefix))
            .filter(|name| !name.contains('/'))
            .map(|name| json!({ "id": format!("item-{name}"), "name": name, "file": {} }))
            .collect();
        (200, json!({ "value": value }))
    }

    fn download(&mut self, key: &str) -> Reply {
        let Some(wb) = self.docs.get(key) else {
            return not_found(key);
        };
        let content = wb
            .content
            .clone()
            .unwrap_or_else(|| Bytes::from(format!("fake-xlsx:{key}:{}", self.requests.len())));
        self.snapshots.insert(content.clone(), wb.clone());
        self.download = Some(content);
        (200, JsonValue::Null)
    }

    fn upload(&mut self, key: String, query: &str) -> Reply {
        let exists = self.docs.contains_key(&key);
        let key = if !exists {
            key
        } else if query.contains("conflictBehavior=rename") {
            free_key(&self.docs, &key)
        } else if query.contains("conflictBehavior=replace") {
            key
        } else {
            return error(409, "nameAlreadyExists", format!("{key} already exists"));
        };

        self.next_item += 1;
        let content = self.upload.take();
        let mut workbook = content
            .as_ref()
            .and_then(|bytes| self.snapshots.get(bytes))
            .cloned()
            .unwrap_or_else(|| {
                let mut workbook = FakeWorkbook::default();
                workbook.add_sheet("Sheet1");
                workbook
            });
        workbook.content = content;
        let name = key.rsplit('/').next().unwrap_or_default().to_string();
        self.docs.insert(key.clone(), workbook);
        (
            if exists { 200 } else { 201 },
            json!({
                "id": format!("item-{}", self.next_item),
                "name": name,
                "webUrl": format!("https://fake.sharepoint.test{key}"),
            }),
        )
    }

    fn workbook(&mut self, key: &str, method: Method, rest: &str, body: Option<&JsonValue>) -> Reply {
        let Some(wb) = self.docs.get_mut(key) else {
            return not_found(key);
        };

        if rest == "/worksheets" && method == Method::Get {
            let value: Vec<JsonValue> = (0..wb.sheets.len()).map(|i| wb.sheet_json(i)).collect();
            return (200, json!({ "value": value }));
        }
        if rest == "/worksheets/add" && method == Method::Post {
            let name = body
                .and_then(|b| b.get("name"))
                .and_then(JsonValue::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Sheet{}", wb.sheets.len() + 1));
            if wb.sheets.iter().any(|s| s.name == name) {
                return error(409, "ItemAlreadyExists", format!("sheet {name} exists"));
            }
            wb.add_sheet(&name);
            return (201, wb.sheet_json(wb.sheets.len() - 1));
        }
        if let Some(table_rest) = rest.strip_prefix("/tables/") {
            return table_route(wb, method, table_rest, body);
        }
        let Some(sheet_rest) = rest.strip_prefix("/worksheets/") else {
            return bad_request(format!("unsupported workbook route {rest}"));
        };
        let (enc_name, sub) = sheet_rest.split_once('/').unwrap_or((sheet_rest, ""));
        let name = decode(enc_name);

        if sub.is_empty() && method == Method::Delete {
            if wb.sheets.len() == 1 {
                return bad_request("a workbook must contain at least one visible worksheet");
            }
            let before = wb.sheets.len();
            wb.sheets.retain(|s| s.name != name);
            return if wb.sheets.len() < before {
                (204, JsonValue::Null)
            } else {
                not_found(name)
            };
        }

        if sub == "tables/add" && method == Method::Post {
            let Some(range) = body
                .and_then(|b| b.get("address"))
                .and_then(JsonValue::as_str)
                .and_then(|a| RangeAddress::parse(a).ok())
            else {
                return bad_request("invalid table address");
            };
            if wb.sheet_mut(&name).is_none() {
                return not_found(name);
            }
            let id = wb.next_id("table");
            let table_name = format!("Table{}", wb.tables.len() + 1);
            wb.tables.push(FakeTable {
                id: id.clone(),
                name: table_name.clone(),
                sheet: name,
                range,
            });
            return (201, json!({ "id": id, "name": table_name }));
        }

        let Some(sheet) = wb.sheet_mut(&name) else {
            return not_found(name);
        };
        sheet_route(sheet, method, sub, body)
    }
}

fn sheet_route(sheet: &mut FakeSheet, method: Method, sub: &str, body: Option<&JsonValue>) -> Reply {
    if sub.starts_with("usedRange") && method == Method::Get {
        let used = sheet.used_range();
        return (200, sheet.range_json(used));
    }
    let Some(range_rest) = sub.strip_prefix("range(address='") else {
        return bad_request(format!("unsupported worksheet route {sub}"));
    };
    let Some((address, action)) = range_rest.split_once("')") else {
        return bad_request("unterminated range address");
    };

    match (method, action) {
        (Method::Post, "/insert") => {
            let rows = address
                .split_once(':')
                .and_then(|(a, b)| Some((a.parse::<u32>().ok()?, b.parse::<u32>().ok()?)));
            let Some((first, last)) = rows.filter(|(a, b)| *a >= 1 && a <= b) else {
                return bad_request(format!("invalid row span {address}"));
            };
            sheet.insert_rows(first, last - first + 1);
            let inserted = RangeAddress {
                start: CellAddress { row: first, col: 1 },
                end: CellAddress { row: last, col: 1 },
            };
            (200, sheet.range_json(inserted))
        }
        (method, action) => {
            let Ok(range) = RangeAddress::parse(address) else {
                return bad_request(format!("invalid address {address}"));
            };
            match (method, action) {
                (Method::Get, "") => (200, sheet.range_json(range)),
                (Method::Patch, "") => {
                    let Some(values) = parse_matrix(body) else {
                        return bad_request("missing values");
                    };
                    let fits = values.len() as u32 == range.row_count()
                        && values.iter().all(|r| r.len() as u32 == range.col_count());
                    if !fits {
                        return bad_request("values do not match the range dimensions");
                    }
                    for (r, row) in values.into_iter().enumerate() {
                        for (c, slot) in row.into_iter().enumerate() {
                            if let Some(value) = slot {
                                sheet.set(range.start.row + r as u32, range.start.col + c as u32, value);
                            }
                        }
                    }
                    (200, sheet.range_json(range))
                }
                (Method::Post, "/merge") => {
                    if !sheet.merges.contains(&range) {
                        sheet.merges.push(range);
                    }
                    (204, JsonValue::Null)
                }
                _ => bad_request(format!("unsupported range action {action}")),
            }
        }
    }
}

fn table_route(wb: &mut FakeWorkbook, method: Method, rest: &str, body: Option<&JsonValue>) -> Reply {
    let (enc_table, sub) = rest.split_once('/').unwrap_or((rest, ""));
    let table_key = decode(enc_table);
    let Some(index) = wb
        .tables
        .iter()
        .position(|t| t.id == table_key || t.name == table_key)
    else {
        return not_found(table_key);
    };

    match (method, sub) {
        (Method::Patch, "") => {
            if let Some(name) = body.and_then(|b| b.get("name")).and_then(JsonValue::as_str) {
                wb.tables[index].name = name.to_string();
            }
            let table = &wb.tables[index];
            (200, json!({ "id": table.id, "name": table.name }))
        }
        (Method::Post, "rows/add") => {
            let Some(values) = parse_matrix(body) else {
                return bad_request("missing values");
            };
            let (sheet_name, mut range) = (wb.tables[index].sheet.clone(), wb.tables[index].range);
            if values.iter().any(|r| r.len() as u32 != range.col_count()) {
                return bad_request("row width does not match the table");
            }
            let Some(sheet) = wb.sheet_mut(&sheet_name) else {
                return not_found(sheet_name);
            };
            for row in values {
                range.end.row += 1;
                for (c, slot) in row.into_iter().enumerate() {
                    sheet.set(range.end.row, range.start.col + c as u32, slot.unwrap_or_default());
                }
            }
            wb.tables[index].range = range;
            (201, json!({ "index": range.row_count().saturating_sub(2) }))
        }
        _ => bad_request(format!("unsupported table route {sub}")),
    }
}

/// In-memory Graph workbook service. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeGraph {
    state: Arc<Mutex<State>>,
}

impl FakeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A client talking to this fake with the default configuration
    pub fn client(&self) -> GraphClient<FakeGraph> {
        self.client_with(GraphConfig::default())
    }

    /// A client talking to this fake; `config.base_url` is replaced
    pub fn client_with(&self, config: GraphConfig) -> GraphClient<FakeGraph> {
        GraphClient::with_http_client(
            self.clone(),
            GraphConfig {
                base_url: FAKE_BASE_URL.to_string(),
                ..config
            },
        )
    }

    /// Create a workbook with the given sheets, in position order
    pub fn add_workbook(&self, location: &DocumentLocation, sheets: &[&str]) {
        let mut workbook = FakeWorkbook::default();
        for name in sheets {
            workbook.add_sheet(name);
        }
        self.state().docs.insert(doc_key(location), workbook);
    }

    /// Set a cell, creating the workbook and sheet if needed
    pub fn set_cell(&self, location: &DocumentLocation, sheet: &str, cell: CellAddress, value: impl Into<CellValue>) {
        self.state()
            .docs
            .entry(doc_key(location))
            .or_default()
            .sheet_or_create(sheet)
            .set(cell.row, cell.col, value.into());
    }

    /// Label column A of every row in `rows` with `row-{n}`
    pub fn label_rows(&self, location: &DocumentLocation, sheet: &str, rows: std::ops::RangeInclusive<u32>) {
        for row in rows {
            self.set_cell(location, sheet, CellAddress { row, col: 1 }, format!("row-{row}"));
        }
    }

    pub fn cell(&self, location: &DocumentLocation, sheet: &str, cell: CellAddress) -> CellValue {
        let mut state = self.state();
        state
            .docs
            .get_mut(&doc_key(location))
            .and_then(|wb| wb.sheet_mut(sheet))
            .map(|s| s.get(cell.row, cell.col))
            .unwrap_or_default()
    }

    pub fn merges(&self, location: &DocumentLocation, sheet: &str) -> Vec<RangeAddress> {
        let mut state = self.state();
        state
            .docs
            .get_mut(&doc_key(location))
            .and_then(|wb| wb.sheet_mut(sheet))
            .map(|s| s.merges.clone())
            .unwrap_or_default()
    }

    pub fn sheet_names(&self, location: &DocumentLocation) -> Vec<String> {
        self.state()
            .docs
            .get(&doc_key(location))
            .map(|wb| wb.sheets.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Tables as (name, range)
    pub fn tables(&self, location: &DocumentLocation) -> Vec<(String, RangeAddress)> {
        self.state()
            .docs
            .get(&doc_key(location))
            .map(|wb| wb.tables.iter().map(|t| (t.name.clone(), t.range)).collect())
            .unwrap_or_default()
    }

    pub fn has_workbook(&self, location: &DocumentLocation) -> bool {
        self.state().docs.contains_key(&doc_key(location))
    }

    /// Bytes uploaded for a workbook created through the API
    pub fn uploaded_content(&self, location: &DocumentLocation) -> Option<Bytes> {
        self.state()
            .docs
            .get(&doc_key(location))
            .and_then(|wb| wb.content.clone())
    }

    /// Queue a scripted failure
    pub fn inject(&self, failure: Failure) {
        self.state().failures.push_back(failure);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    /// Number of requests with `method` whose path contains `path_contains`
    pub fn count(&self, method: Method, path_contains: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path.contains(path_contains))
            .count()
    }

    fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, NetworkError> {
        let mut state = self.state();
        let Some(path) = request.url.strip_prefix(FAKE_BASE_URL) else {
            return Ok(HttpResponse::new(400));
        };
        let body = request.json_body().cloned();
        state.requests.push(RecordedRequest {
            method: request.method,
            path: path.to_string(),
            body: body.clone(),
            client_request_id: request.header_value("client-request-id").map(str::to_string),
        });
        let request_id = format!("fake-req-{}", state.requests.len());

        state.upload = match &request.body {
            Some(RequestBody::Bytes { data, .. }) => Some(data.clone()),
            _ => None,
        };
        state.download = None;
        let outcome = state.respond(request.method, path, body.as_ref());
        state.upload = None;
        let download = state.download.take();

        let ((status, json), retry_after) = outcome?;
        let mut response = HttpResponse::new(status).with_header("request-id", request_id);
        if !json.is_null() {
            response = response.with_json(&json);
        } else if let Some(content) = download.filter(|_| status == 200) {
            response = response.with_header("content-type", crate::xlsx::XLSX_CONTENT_TYPE);
            response.body = content;
        }
        if let Some(secs) = retry_after {
            response = response.with_header("retry-after", secs.to_string());
        }
        Ok(response)
    }
}

impl HttpClient for FakeGraph {
    async fn send(&self, request: &HttpRequest, _token: &BearerToken) -> Result<HttpResponse, NetworkError> {
        self.handle(request)
    }
}
