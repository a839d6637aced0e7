//! Live editing of spreadsheets stored in OneDrive or SharePoint.
//!
//! This crate edits workbooks in place through the Microsoft Graph workbook
//! API, without downloading and re-uploading the file. Positions are found
//! at call time by searching for literal marker text, so templates can move
//! things around without breaking callers.
//!
//! # Architecture
//!
//! ```text
//! GraphClient::process            (orchestrator)
//!     ├── find_marker             (marker)
//!     ├── write_*_section         (section)
//!     └── insert_rows             (structural)
//!           └── read/write/insert/merge primitives (accessor)
//!                 └── ResilientTransport (graph-transport crate)
//! ```
//!
//! Every operation is independent: nothing is cached between calls and no
//! lock is held on the document. A `Locked` failure means another editor has
//! the file; it is retried with backoff by the transport.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use livesheet_core::{fields, ColumnMap, DocumentLocation, DriveScope, SectionConfig, SectionData};
//! use livesheet_graph::{CallContext, GraphClient, GraphConfig};
//!
//! # async fn example() -> livesheet_graph::Result<()> {
//! let client = GraphClient::new(GraphConfig::default())?;
//! let ctx = CallContext::new("eyJ0eXAi...");
//! let file = DocumentLocation::new(DriveScope::User("ana@contoso.com".into()), "Facturas/F-001.xlsx")?;
//!
//! let mut configs = BTreeMap::new();
//! configs.insert(
//!     "cliente".to_string(),
//!     SectionConfig::simple("{{CLIENTE}}", ColumnMap::new().with("nombre", 0).with("nif", 2)),
//! );
//! let sections = vec![(
//!     "cliente",
//!     SectionData::from(fields([("nombre", "Acme S.L."), ("nif", "B12345678")])),
//! )];
//!
//! let report = client.process(&ctx, &file, sections, &configs).await;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod client;
pub mod error;
pub mod marker;
pub mod orchestrator;
pub mod section;
pub mod structural;
pub mod xlsx;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use accessor::{ConflictBehavior, DriveItem, RangeValues, TableInfo, WorksheetInfo, BATCH_LIMIT};
pub use client::{CallContext, GraphClient, GraphConfig, GRAPH_BASE_URL};
pub use error::{ErrorKind, LiveError, Result};
pub use marker::scan_for_marker;
pub use orchestrator::{ProcessReport, SectionOutcome, SectionWrite};
pub use section::{FieldOutcome, MergeOutcome, SimpleSectionReport, TableSectionReport};
pub use structural::{InsertConfirmation, InsertReport, RowInsert};
