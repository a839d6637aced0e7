//! # livesheet
//!
//! Edit spreadsheets stored in OneDrive or SharePoint in place.
//!
//! Writes are anchored on marker cells: a template carries literal text such
//! as `{{CLIENTE}}`, and each named section of data is written at a fixed
//! offset from wherever that text currently sits. Calls go through the
//! Microsoft Graph workbook API with retries for locked files, throttling and
//! transient server faults.
//!
//! ## Crates
//!
//! - [`livesheet_core`] - addresses, values, locations and section configuration
//! - [`graph_transport`] - retrying HTTP transport with failure classification
//! - [`livesheet_graph`] - the editing engine
//!
//! ## Example
//!
//! ```rust,no_run
//! use livesheet::prelude::*;
//! use std::collections::BTreeMap;
//!
//! # async fn run(token: String) -> livesheet::Result<()> {
//! let client = GraphClient::new(GraphConfig::default())?;
//! let ctx = CallContext::new(token).with_timeout(std::time::Duration::from_secs(120));
//! let file = DocumentLocation::in_folder(DriveScope::Drive("b!x1".into()), "Pedidos", "P-0042.xlsx")?;
//!
//! let mut configs = BTreeMap::new();
//! configs.insert(
//!     "lineas".to_string(),
//!     SectionConfig::insert_rows("{{LINEAS}}", ColumnMap::new().with("desc", 0).with("qty", 4))
//!         .with_merges(vec![MergeSpec::parse("A:D")?]),
//! );
//!
//! let rows = vec![fields([("desc", CellValue::from("Tornillos")), ("qty", CellValue::from(100))])];
//! let report = client.process(&ctx, &file, [("lineas", SectionData::from(rows))], &configs).await;
//! for (name, outcome) in &report.sections {
//!     println!("{name}: {:?}", outcome.error_kind());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Consistency
//!
//! The remote service offers no locks or sessions. Finding a marker and
//! writing next to it are two requests, and another editor may move the
//! marker in between. A batch of sections that partly fails leaves the
//! document partly edited; each section's outcome is reported separately.
//! After a failed row insert, re-read the document before trying again.

pub mod prelude;

pub use livesheet_core::{
    address, fields, CellAddress, CellValue, ColumnMap, DocumentLocation, DriveScope, FieldValues,
    LayoutKind, MergeSpec, RangeAddress, SectionConfig, SectionData, WorksheetRef, MAX_COLS,
    MAX_ROWS,
};

pub use graph_transport::{
    BearerToken, CallOptions, FailureKind, HttpClient, ReqwestClient, RetryPolicy, TransportError,
};

pub use livesheet_graph::{
    CallContext, ConflictBehavior, DriveItem, ErrorKind, FieldOutcome, GraphClient, GraphConfig,
    InsertConfirmation, InsertReport, LiveError, MergeOutcome, ProcessReport, RangeValues, Result,
    RowInsert, SectionOutcome, SectionWrite, SimpleSectionReport, TableInfo, TableSectionReport,
    WorksheetInfo, BATCH_LIMIT, GRAPH_BASE_URL,
};

#[cfg(feature = "testing")]
pub use livesheet_graph::testing;
