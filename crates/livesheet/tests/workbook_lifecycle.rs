//! Creating a workbook, filling it and removing it again.

use std::collections::BTreeMap;

use livesheet::prelude::*;
use livesheet_graph::testing::FakeGraph;
use pretty_assertions::assert_eq;

#[tokio::test(start_paused = true)]
async fn test_create_fill_and_delete() {
    let fake = FakeGraph::new();
    let client = fake.client();
    let ctx = CallContext::new("t");
    let scope = DriveScope::Drive("b!x1".into());
    let file = DocumentLocation::in_folder(scope.clone(), "Informes", "Semana 42.xlsx").unwrap();

    client.create_workbook(&ctx, &file).await.unwrap();
    let resumen = client.add_worksheet(&ctx, &file, "Resumen").await.unwrap();
    assert_eq!(resumen.name, "Resumen");

    let sheets = client.list_worksheets(&ctx, &file).await.unwrap();
    let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Sheet1", "Resumen"]);

    let marker = CellAddress::parse("B2").unwrap();
    client
        .write_cell(&ctx, &file.sheet("Resumen"), marker, &CellValue::from("{{KPI}}"))
        .await
        .unwrap();

    let mut configs = BTreeMap::new();
    configs.insert(
        "kpi".to_string(),
        SectionConfig::table("{{KPI}}", ColumnMap::new().with("nombre", 0).with("valor", 1))
            .on_sheet("Resumen"),
    );
    let rows = vec![
        fields([("nombre", CellValue::from("pedidos")), ("valor", CellValue::from(118))]),
        fields([("nombre", CellValue::from("devoluciones")), ("valor", CellValue::from(3))]),
    ];
    let report = client
        .process(&ctx, &file, [("kpi", SectionData::from(rows))], &configs)
        .await;
    assert!(report.is_success(), "{report:?}");

    let written = client
        .read_range(&ctx, &file.sheet("Resumen"), RangeAddress::parse("B4:C5").unwrap())
        .await
        .unwrap();
    assert_eq!(
        written.values,
        vec![
            vec![CellValue::from("pedidos"), CellValue::Number(118.0)],
            vec![CellValue::from("devoluciones"), CellValue::Number(3.0)],
        ]
    );

    let listed = client.list_workbooks(&ctx, &scope, "Informes").await.unwrap();
    assert_eq!(listed.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(), vec!["Semana 42.xlsx"]);

    client.delete_workbook(&ctx, &file).await.unwrap();
    assert!(!fake.has_workbook(&file));
}

#[tokio::test(start_paused = true)]
async fn test_copy_template_then_fill() {
    let fake = FakeGraph::new();
    let client = fake.client();
    let ctx = CallContext::new("t");
    let scope = DriveScope::Drive("b!x1".into());
    let template = DocumentLocation::new(scope.clone(), "Plantillas/Factura.xlsx").unwrap();
    let copy = DocumentLocation::new(scope, "Facturas/F-007.xlsx").unwrap();
    fake.add_workbook(&template, &["Factura"]);
    fake.set_cell(&template, "Factura", CellAddress::parse("A3").unwrap(), "{{CLIENTE}}");
    fake.set_cell(&template, "Factura", CellAddress::parse("C4").unwrap(), "=A4&B4");

    client
        .copy_workbook(&ctx, &template, &copy, ConflictBehavior::Fail)
        .await
        .unwrap();

    let mut configs = BTreeMap::new();
    configs.insert(
        "cliente".to_string(),
        SectionConfig::simple("{{CLIENTE}}", ColumnMap::new().with("nombre", 0).with("nif", 1)),
    );
    let report = client
        .process(
            &ctx,
            &copy,
            [("cliente", SectionData::from(fields([("nombre", "Acme"), ("nif", "B1")])))],
            &configs,
        )
        .await;
    assert!(report.is_success(), "{report:?}");

    assert_eq!(fake.cell(&copy, "Factura", CellAddress::parse("A4").unwrap()), CellValue::from("Acme"));
    assert_eq!(fake.cell(&copy, "Factura", CellAddress::parse("C4").unwrap()), CellValue::from("=A4&B4"));
    assert_eq!(fake.cell(&template, "Factura", CellAddress::parse("A4").unwrap()), CellValue::Empty);
}

#[tokio::test(start_paused = true)]
async fn test_default_sheet_is_lowest_position() {
    let fake = FakeGraph::new();
    let file = DocumentLocation::new(DriveScope::Drive("b!x1".into()), "Plantilla.xlsx").unwrap();
    fake.add_workbook(&file, &["Portada", "Datos"]);

    let resolved = fake
        .client()
        .resolve_worksheet(&CallContext::new("t"), &file.first_sheet())
        .await
        .unwrap();
    assert_eq!(resolved.sheet.as_deref(), Some("Portada"));
}
