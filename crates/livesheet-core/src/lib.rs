//! # livesheet-core
//!
//! Core data structures for editing remote spreadsheets in place.
//!
//! This crate provides the I/O-free types shared by the transport and the
//! editing engine:
//! - [`CellAddress`] and [`RangeAddress`] - wire-notation addressing (`B5`, `A12:C13`)
//! - [`CellValue`] - values exchanged with the remote service
//! - [`DocumentLocation`] and [`WorksheetRef`] - which remote file and sheet to edit
//! - [`SectionConfig`], [`ColumnMap`], [`MergeSpec`], [`SectionData`] - marker-anchored sections
//!
//! ## Example
//!
//! ```rust
//! use livesheet_core::{address, CellAddress};
//!
//! assert_eq!(address::encode(5, 2).unwrap(), "B5");
//! assert_eq!(address::decode("B5").unwrap(), (5, 2));
//!
//! let marker = CellAddress::parse("B3").unwrap();
//! assert_eq!(marker.offset(1, 1).unwrap().to_string(), "C4");
//! ```

pub mod address;
pub mod error;
pub mod location;
pub mod section;
pub mod value;

// Re-exports for convenience
pub use address::{CellAddress, RangeAddress};
pub use error::{Error, Result};
pub use location::{DocumentLocation, DriveScope, WorksheetRef};
pub use section::{
    fields, ColumnMap, FieldValues, LayoutKind, MergeSpec, SectionConfig, SectionData,
};
pub use value::CellValue;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u32 = 16_384;
