//! Marker lookup: find the cell holding a literal anchor text.

use graph_transport::HttpClient;
use livesheet_core::{CellAddress, WorksheetRef};

use crate::accessor::RangeValues;
use crate::client::{CallContext, GraphClient};
use crate::error::{LiveError, Result};

/// First cell, in row-major order, whose text equals `marker` exactly.
///
/// Case-sensitive and untrimmed. With duplicates the top-most, then
/// left-most, occurrence wins.
pub fn scan_for_marker(values: &RangeValues, marker: &str) -> Option<CellAddress> {
    values
        .cells()
        .find(|(_, value)| value.matches_text(marker))
        .map(|(addr, _)| addr)
}

impl<C: HttpClient> GraphClient<C> {
    /// Locate `marker` in the worksheet.
    ///
    /// Scans the used range, or [`GraphConfig::scan_window`](crate::GraphConfig)
    /// when one is configured. Absence is `Ok(None)`; callers decide whether
    /// that is fatal.
    pub async fn find_marker(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        marker: &str,
    ) -> Result<Option<CellAddress>> {
        let values = match self.config().scan_window {
            Some(window) => self.read_range(ctx, sheet, window).await?,
            None => self.used_range(ctx, sheet).await?,
        };
        let found = scan_for_marker(&values, marker);
        match found {
            Some(addr) => tracing::debug!(%sheet, marker, cell = %addr, "marker found"),
            None => tracing::debug!(%sheet, marker, scanned = %values.range, "marker not found"),
        }
        Ok(found)
    }

    /// Like [`find_marker`](Self::find_marker), but absence is an error.
    pub async fn require_marker(
        &self,
        ctx: &CallContext,
        sheet: &WorksheetRef,
        marker: &str,
    ) -> Result<CellAddress> {
        self.find_marker(ctx, sheet, marker)
            .await?
            .ok_or_else(|| LiveError::MarkerNotFound {
                marker: marker.to_string(),
                sheet: sheet.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livesheet_core::{CellValue, RangeAddress};

    fn block(start: &str, rows: Vec<Vec<CellValue>>) -> RangeValues {
        let start = CellAddress::parse(start).unwrap();
        let range = RangeAddress::with_size(start, rows.len() as u32, rows[0].len() as u32).unwrap();
        RangeValues { range, values: rows }
    }

    #[test]
    fn test_top_most_then_left_most_wins() {
        let e = CellValue::Empty;
        let x = CellValue::from("X");
        let values = block(
            "A1",
            vec![
                vec![e.clone(), e.clone(), e.clone()],
                vec![e.clone(), e.clone(), e.clone()],
                vec![e.clone(), x.clone(), x.clone()],
                vec![e.clone(), e.clone(), e.clone()],
                vec![e.clone(), x.clone(), e.clone()],
            ],
        );
        assert_eq!(scan_for_marker(&values, "X"), Some(CellAddress::new(3, 2).unwrap()));
    }

    #[test]
    fn test_exact_match_only() {
        let values = block(
            "C4",
            vec![vec![
                CellValue::from("total "),
                CellValue::from("TOTAL"),
                CellValue::from(42),
            ]],
        );
        assert_eq!(scan_for_marker(&values, "total"), None);
        assert_eq!(scan_for_marker(&values, "TOTAL"), Some(CellAddress::parse("D4").unwrap()));
        assert_eq!(scan_for_marker(&values, "42"), Some(CellAddress::parse("E4").unwrap()));
        assert_eq!(scan_for_marker(&values, "Y"), None);
    }
}
