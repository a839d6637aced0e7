//! Convenient re-exports for common use.
//!
//! ```rust
//! use livesheet::prelude::*;
//! ```

pub use crate::{
    fields, CallContext, CellAddress, CellValue, ColumnMap, ConflictBehavior, DocumentLocation,
    DriveScope, ErrorKind, GraphClient, GraphConfig, LayoutKind, LiveError, MergeSpec,
    ProcessReport, RangeAddress, RetryPolicy, RowInsert, SectionConfig, SectionData,
    SectionOutcome, SectionWrite, WorksheetRef,
};
