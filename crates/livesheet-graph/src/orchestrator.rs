//! Processing a batch of named sections against one document.

use std::collections::BTreeMap;

use graph_transport::HttpClient;
use livesheet_core::{
    CellAddress, DocumentLocation, LayoutKind, SectionConfig, SectionData, WorksheetRef,
};

use crate::client::{CallContext, GraphClient};
use crate::error::{ErrorKind, LiveError, Result};
use crate::section::{SimpleSectionReport, TableSectionReport};
use crate::structural::{InsertReport, RowInsert};

/// What was written for a section whose marker was found.
#[derive(Debug, Clone)]
pub enum SectionWrite {
    Simple(SimpleSectionReport),
    Table(TableSectionReport),
    Inserted(InsertReport),
    /// An insert section with no rows; nothing was changed
    NoRows,
}

/// Outcome of one named section.
#[derive(Debug, Clone)]
pub enum SectionOutcome {
    Written {
        sheet: String,
        marker: CellAddress,
        write: SectionWrite,
    },
    MarkerNotFound {
        sheet: String,
        marker: String,
    },
    /// No configuration was supplied for the section name
    MissingConfig,
    Failed(LiveError),
}

impl SectionOutcome {
    /// Every requested cell was written. Skipped merges do not count as failures.
    pub fn is_success(&self) -> bool {
        match self {
            SectionOutcome::Written {
                write: SectionWrite::Simple(report),
                ..
            } => report.is_success(),
            SectionOutcome::Written { .. } => true,
            _ => false,
        }
    }

    /// Failure classification, `None` on success
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            SectionOutcome::Written {
                write: SectionWrite::Simple(report),
                ..
            } => report.failures().next().map(|(_, e)| e.kind()),
            SectionOutcome::Written { .. } => None,
            SectionOutcome::MarkerNotFound { .. } => Some(ErrorKind::MarkerNotFound),
            SectionOutcome::MissingConfig => Some(ErrorKind::InvalidSection),
            SectionOutcome::Failed(e) => Some(e.kind()),
        }
    }
}

/// Per-section outcomes, in the order the sections were supplied.
#[derive(Debug, Clone, Default)]
pub struct ProcessReport {
    pub sections: Vec<(String, SectionOutcome)>,
}

impl ProcessReport {
    pub fn get(&self, name: &str) -> Option<&SectionOutcome> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }

    pub fn is_success(&self) -> bool {
        self.sections.iter().all(|(_, o)| o.is_success())
    }

    pub fn succeeded(&self) -> usize {
        self.sections.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.sections.len() - self.succeeded()
    }
}

fn mismatch(layout: LayoutKind, data: &SectionData) -> LiveError {
    livesheet_core::Error::InvalidSection(format!(
        "{layout:?} layout cannot take a {}",
        data.describe()
    ))
    .into()
}

/// Reject data that cannot be written with `config` before touching the document.
fn validate_section(config: &SectionConfig, data: &SectionData) -> Result<()> {
    config.columns.validate_offsets()?;
    match (config.layout, data) {
        (LayoutKind::Simple, SectionData::Fields(fields)) => {
            config.columns.validate_fields(fields.keys())?
        }
        (LayoutKind::Table | LayoutKind::InsertRows, SectionData::Rows(rows)) => {
            for row in rows {
                config.columns.validate_fields(row.keys())?;
            }
            if rows.is_empty() && config.columns.is_empty() {
                return Err(livesheet_core::Error::InvalidSection("column map is empty".into()).into());
            }
        }
        (layout, data) => return Err(mismatch(layout, data)),
    }
    Ok(())
}

impl<C: HttpClient> GraphClient<C> {
    /// Write every named section into the document.
    ///
    /// Sections are processed in the order given. A missing marker or a
    /// failed section is recorded and processing moves on; this method
    /// itself never fails. Sections are not atomic with respect to each
    /// other or to concurrent editors: a marker found in one request may
    /// have moved by the time the write lands.
    pub async fn process<S: Into<String>>(
        &self,
        ctx: &CallContext,
        location: &DocumentLocation,
        sections: impl IntoIterator<Item = (S, SectionData)>,
        configs: &BTreeMap<String, SectionConfig>,
    ) -> ProcessReport {
        let mut report = ProcessReport::default();

        for (name, data) in sections {
            let name = name.into();
            let outcome = match configs.get(&name) {
                None => {
                    tracing::warn!(section = %name, "no configuration for section");
                    SectionOutcome::MissingConfig
                }
                Some(config) => match self.process_section(ctx, location, config, &data).await {
                    Ok(outcome) => outcome,
                    Err(error) => {
                        tracing::warn!(
                            section = %name,
                            %error,
                            request_id = error.request_id().unwrap_or("-"),
                            "section failed"
                        );
                        SectionOutcome::Failed(error)
                    }
                },
            };
            tracing::info!(
                section = %name,
                success = outcome.is_success(),
                "section processed"
            );
            report.sections.push((name, outcome));
        }
        report
    }

    async fn process_section(
        &self,
        ctx: &CallContext,
        location: &DocumentLocation,
        config: &SectionConfig,
        data: &SectionData,
    ) -> Result<SectionOutcome> {
        validate_section(config, data)?;

        let sheet = WorksheetRef {
            location: location.clone(),
            sheet: config.sheet.clone(),
        };
        // Resolve once so every step of the section targets the same sheet.
        let sheet = self.resolve_worksheet(ctx, &sheet).await?;
        let sheet_name = sheet.sheet.clone().unwrap_or_default();

        let Some(marker) = self.find_marker(ctx, &sheet, &config.marker).await? else {
            return Ok(SectionOutcome::MarkerNotFound {
                sheet: sheet_name,
                marker: config.marker.clone(),
            });
        };
        let anchor = config.anchor(marker)?;

        let write = match (config.layout, data) {
            (LayoutKind::Simple, SectionData::Fields(fields)) => SectionWrite::Simple(
                self.write_fields_at(ctx, &sheet, anchor, fields, &config.columns)
                    .await?,
            ),
            (LayoutKind::Table, SectionData::Rows(rows)) => SectionWrite::Table(
                self.write_rows_at(ctx, &sheet, anchor, rows, &config.columns, &config.merges)
                    .await?,
            ),
            (LayoutKind::InsertRows, SectionData::Rows(rows)) if rows.is_empty() => {
                SectionWrite::NoRows
            }
            (LayoutKind::InsertRows, SectionData::Rows(rows)) => {
                let insert = RowInsert::new(anchor.row, rows.clone(), config.columns.clone())
                    .at_column(anchor.col)
                    .with_merges(config.merges.clone());
                SectionWrite::Inserted(self.insert_rows(ctx, &sheet, &insert).await?)
            }
            (layout, data) => return Err(mismatch(layout, data)),
        };

        Ok(SectionOutcome::Written {
            sheet: sheet_name,
            marker,
            write,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livesheet_core::{fields, ColumnMap};

    #[test]
    fn test_validate_section() {
        let columns = ColumnMap::new().with("a", 0).with("b", 1);
        let simple = SectionConfig::simple("M", columns.clone());
        let table = SectionConfig::table("T", columns);

        let one = SectionData::from(fields([("a", "x")]));
        let many = SectionData::from(vec![fields([("a", "x")]), fields([("b", 2)])]);
        let typo = SectionData::from(fields([("c", "x")]));

        assert!(validate_section(&simple, &one).is_ok());
        assert!(validate_section(&table, &many).is_ok());
        assert_eq!(
            validate_section(&simple, &typo).unwrap_err().kind(),
            ErrorKind::InvalidSection
        );
        assert_eq!(
            validate_section(&simple, &many).unwrap_err().kind(),
            ErrorKind::InvalidSection
        );
        assert!(validate_section(&table, &one).is_err());
    }

    #[test]
    fn test_report_counts() {
        let report = ProcessReport {
            sections: vec![
                ("a".into(), SectionOutcome::MissingConfig),
                (
                    "b".into(),
                    SectionOutcome::Written {
                        sheet: "Hoja1".into(),
                        marker: CellAddress::new(1, 1).unwrap(),
                        write: SectionWrite::NoRows,
                    },
                ),
            ],
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert_eq!(
            report.get("a").and_then(SectionOutcome::error_kind),
            Some(ErrorKind::InvalidSection)
        );
    }

    mod remote {
        use super::*;
        use crate::testing::{Failure, FakeGraph};
        use graph_transport::Method;
        use livesheet_core::{CellValue, DriveScope, MergeSpec, RangeAddress};
        use pretty_assertions::assert_eq;

        fn at(s: &str) -> CellAddress {
            CellAddress::parse(s).unwrap()
        }

        fn setup() -> (FakeGraph, DocumentLocation) {
            let fake = FakeGraph::new();
            let file = DocumentLocation::new(DriveScope::User("ana@contoso.com".into()), "Facturas/F-001.xlsx").unwrap();
            fake.add_workbook(&file, &["Datos", "Lineas"]);
            fake.set_cell(&file, "Datos", at("B3"), "{{CLIENTE}}");
            fake.set_cell(&file, "Lineas", at("A5"), "{{LINEAS}}");
            (fake, file)
        }

        fn cliente() -> SectionConfig {
            SectionConfig::simple("{{CLIENTE}}", ColumnMap::new().with("nombre", 0).with("nif", 2))
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_marker_does_not_stop_other_sections() {
            let (fake, file) = setup();
            let mut configs = BTreeMap::new();
            configs.insert("cliente".to_string(), cliente());
            configs.insert(
                "envio".to_string(),
                SectionConfig::simple("{{ENVIO}}", ColumnMap::new().with("calle", 0)),
            );

            let sections = vec![
                ("envio", SectionData::from(fields([("calle", "Mayor 1")]))),
                ("cliente", SectionData::from(fields([("nombre", "Acme S.L."), ("nif", "B12345678")]))),
                ("notas", SectionData::from(fields([("texto", "-")]))),
            ];
            let report = fake
                .client()
                .process(&CallContext::new("t"), &file, sections, &configs)
                .await;

            let names: Vec<&str> = report.sections.iter().map(|(n, _)| n.as_str()).collect();
            assert_eq!(names, vec!["envio", "cliente", "notas"]);
            assert!(matches!(
                report.get("envio"),
                Some(SectionOutcome::MarkerNotFound { sheet, marker }) if sheet == "Datos" && marker == "{{ENVIO}}"
            ));
            assert!(matches!(report.get("notas"), Some(SectionOutcome::MissingConfig)));
            assert!(report.get("cliente").is_some_and(SectionOutcome::is_success));
            assert_eq!(report.succeeded(), 1);
            assert_eq!(report.failed(), 2);

            assert_eq!(fake.cell(&file, "Datos", at("B4")), CellValue::from("Acme S.L."));
            assert_eq!(fake.cell(&file, "Datos", at("D4")), CellValue::from("B12345678"));
            assert_eq!(fake.cell(&file, "Datos", at("C4")), CellValue::Empty);
        }

        #[tokio::test(start_paused = true)]
        async fn test_table_section_on_named_sheet() {
            let (fake, file) = setup();
            let mut configs = BTreeMap::new();
            configs.insert(
                "lineas".to_string(),
                SectionConfig::table("{{LINEAS}}", ColumnMap::new().with("desc", 0).with("qty", 3))
                    .on_sheet("Lineas")
                    .with_merges(vec![MergeSpec::parse("B:C").unwrap()]),
            );
            let rows = vec![
                fields([("desc", CellValue::from("Tornillos")), ("qty", CellValue::from(100))]),
                fields([("desc", CellValue::from("Tuercas")), ("qty", CellValue::from(40))]),
            ];

            let report = fake
                .client()
                .process(&CallContext::new("t"), &file, [("lineas", SectionData::from(rows))], &configs)
                .await;

            let Some(SectionOutcome::Written { sheet, marker, write: SectionWrite::Table(table) }) = report.get("lineas") else {
                panic!("unexpected outcome: {:?}", report.get("lineas"));
            };
            assert_eq!(sheet, "Lineas");
            assert_eq!(*marker, at("A5"));
            assert_eq!(table.range, Some(RangeAddress::parse("A7:D8").unwrap()));
            assert_eq!(table.rows_written(), 2);
            assert_eq!(table.merges_skipped(), 0);

            assert_eq!(fake.cell(&file, "Lineas", at("A8")), CellValue::from("Tuercas"));
            assert_eq!(fake.cell(&file, "Lineas", at("D7")), CellValue::Number(100.0));
            assert_eq!(
                fake.merges(&file, "Lineas"),
                vec![RangeAddress::parse("B7:C7").unwrap(), RangeAddress::parse("B8:C8").unwrap()]
            );
            assert_eq!(fake.count(Method::Patch, "/range("), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_later_markers_are_found_after_insert() {
            let (fake, file) = setup();
            fake.set_cell(&file, "Datos", at("A20"), "{{ITEMS}}");
            fake.label_rows(&file, "Datos", 21..=30);
            fake.set_cell(&file, "Datos", at("A40"), "{{TOTAL}}");

            let mut configs = BTreeMap::new();
            configs.insert(
                "items".to_string(),
                SectionConfig::insert_rows("{{ITEMS}}", ColumnMap::new().with("desc", 1)),
            );
            configs.insert(
                "total".to_string(),
                SectionConfig::simple("{{TOTAL}}", ColumnMap::new().with("importe", 1)),
            );
            let sections = vec![
                ("items", SectionData::from(vec![fields([("desc", "a")]), fields([("desc", "b")])])),
                ("total", SectionData::from(fields([("importe", 12.5)]))),
            ];

            let report = fake
                .client()
                .process(&CallContext::new("t"), &file, sections, &configs)
                .await;
            assert!(report.is_success(), "{report:?}");

            let Some(SectionOutcome::Written { write: SectionWrite::Inserted(insert), .. }) = report.get("items") else {
                panic!("unexpected outcome: {:?}", report.get("items"));
            };
            assert_eq!(insert.rows, "22:23");
            assert_eq!(insert.confirmation, crate::InsertConfirmation::Direct);

            assert_eq!(fake.cell(&file, "Datos", at("A21")), CellValue::from("row-21"));
            assert_eq!(fake.cell(&file, "Datos", at("B22")), CellValue::from("a"));
            assert_eq!(fake.cell(&file, "Datos", at("B23")), CellValue::from("b"));
            assert_eq!(fake.cell(&file, "Datos", at("A24")), CellValue::from("row-22"));
            assert_eq!(fake.cell(&file, "Datos", at("A42")), CellValue::from("{{TOTAL}}"));
            assert_eq!(fake.cell(&file, "Datos", at("B43")), CellValue::Number(12.5));
        }

        #[tokio::test(start_paused = true)]
        async fn test_empty_insert_section_changes_nothing() {
            let (fake, file) = setup();
            let mut configs = BTreeMap::new();
            configs.insert(
                "lineas".to_string(),
                SectionConfig::insert_rows("{{LINEAS}}", ColumnMap::new().with("desc", 0)).on_sheet("Lineas"),
            );

            let report = fake
                .client()
                .process(&CallContext::new("t"), &file, [("lineas", SectionData::Rows(Vec::new()))], &configs)
                .await;

            assert!(matches!(
                report.get("lineas"),
                Some(SectionOutcome::Written { write: SectionWrite::NoRows, .. })
            ));
            assert_eq!(fake.count(Method::Post, "/insert"), 0);
            assert_eq!(fake.count(Method::Patch, ""), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_column_offset_moves_the_anchor() {
            let (fake, file) = setup();
            fake.set_cell(&file, "Lineas", at("C20"), "{{EXTRAS}}");
            fake.label_rows(&file, "Lineas", 21..=22);

            let mut configs = BTreeMap::new();
            configs.insert("cliente".to_string(), cliente().with_column_offset(1));
            configs.insert(
                "extras".to_string(),
                SectionConfig::insert_rows("{{EXTRAS}}", ColumnMap::new().with("desc", 0).with("qty", 1))
                    .on_sheet("Lineas")
                    .with_column_offset(4),
            );
            let sections = vec![
                ("cliente", SectionData::from(fields([("nombre", "Acme"), ("nif", "B1")]))),
                ("extras", SectionData::from(vec![fields([("desc", CellValue::from("cola")), ("qty", CellValue::from(2))])])),
            ];

            let report = fake
                .client()
                .process(&CallContext::new("t"), &file, sections, &configs)
                .await;
            assert!(report.is_success(), "{report:?}");

            // Marker B3: fields start one column to the right
            assert_eq!(fake.cell(&file, "Datos", at("C4")), CellValue::from("Acme"));
            assert_eq!(fake.cell(&file, "Datos", at("E4")), CellValue::from("B1"));
            assert_eq!(fake.cell(&file, "Datos", at("B4")), CellValue::Empty);

            // Inserted rows start at column E whatever the marker column
            assert_eq!(fake.cell(&file, "Lineas", at("A21")), CellValue::from("row-21"));
            assert_eq!(fake.cell(&file, "Lineas", at("E22")), CellValue::from("cola"));
            assert_eq!(fake.cell(&file, "Lineas", at("F22")), CellValue::Number(2.0));
            assert_eq!(fake.cell(&file, "Lineas", at("A23")), CellValue::from("row-22"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_offset_past_last_column_fails_the_section() {
            let (fake, file) = setup();
            let mut configs = BTreeMap::new();
            configs.insert(
                "lineas".to_string(),
                SectionConfig::table("{{LINEAS}}", ColumnMap::new().with("a", 0).with("b", u32::MAX))
                    .on_sheet("Lineas"),
            );
            configs.insert("cliente".to_string(), cliente());
            let sections = vec![
                ("lineas", SectionData::from(vec![fields([("a", "x"), ("b", "y")])])),
                ("cliente", SectionData::from(fields([("nombre", "Acme")]))),
            ];

            let report = fake
                .client()
                .process(&CallContext::new("t"), &file, sections, &configs)
                .await;
            assert_eq!(report.sections[0].1.error_kind(), Some(ErrorKind::InvalidAddress));
            assert!(report.get("cliente").is_some_and(SectionOutcome::is_success));
            assert_eq!(fake.count(Method::Patch, "Lineas"), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_failed_sections_are_recorded() {
            let (fake, file) = setup();
            fake.inject(Failure::status(Method::Patch, "Lineas", 400));

            let mut configs = BTreeMap::new();
            configs.insert("cliente".to_string(), cliente());
            configs.insert(
                "lineas".to_string(),
                SectionConfig::table("{{LINEAS}}", ColumnMap::new().with("desc", 0)).on_sheet("Lineas"),
            );
            configs.insert("perdida".to_string(), cliente().on_sheet("NoExiste"));

            let sections = vec![
                ("lineas", SectionData::from(vec![fields([("desc", "x")])])),
                ("perdida", SectionData::from(fields([("nombre", "x")]))),
                ("cliente", SectionData::from(fields([("nombre", "Acme"), ("telefono", "1")]))),
                ("cliente", SectionData::from(fields([("nombre", "Acme")]))),
            ];
            let report = fake
                .client()
                .process(&CallContext::new("t"), &file, sections, &configs)
                .await;

            let kinds: Vec<Option<ErrorKind>> = report.sections.iter().map(|(_, o)| o.error_kind()).collect();
            assert_eq!(
                kinds,
                vec![
                    Some(ErrorKind::PermanentClientError),
                    Some(ErrorKind::PermanentClientError),
                    Some(ErrorKind::InvalidSection),
                    None,
                ]
            );
            assert!(matches!(&report.sections[0].1, SectionOutcome::Failed(e) if e.request_id().is_some()));
            assert_eq!(fake.cell(&file, "Datos", at("B4")), CellValue::from("Acme"));
        }
    }
}
