mod common;

use anyhow::Result;
use common::{test_service, Fleet, CAR_ID};
use nada_schedule::domain::Series;
use nada_schedule::io::{Exporter, TemplateFormat, TEMPLATE_CSV_FILENAME};

#[tokio::test]
async fn test_export_detailed_schedule() -> Result<()> {
    let (service, temp) = test_service().await?;
    Fleet::create(&service).await?;
    Fleet::record_all(&service, Series::WithAdd, &[(1, 1, "2024-03", 25000.0)]).await?;
    Fleet::record_all(
        &service,
        Series::Current,
        &[(1, 1, "2024-03", 20000.0), (2, 6, "2024-03", 12000.0)],
    )
    .await?;

    let dir = temp.path().join("exports");
    let path = Exporter::new(&service)
        .export_detailed(CAR_ID, "2024", &dir)
        .await?;

    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("Export 2024 Toyota Camry-Ana Lopez NADA depreciation schedule.csv")
    );

    let text = std::fs::read_to_string(&path)?;
    assert!(text.starts_with('\u{FEFF}'));
    assert!(text.contains("NADA Depreciation Schedule,2024\n"));
    assert!(text.contains("Model Year,2021\n"));
    assert!(text.contains("Email,ana@example.com\n"));
    assert!(text.contains("Retail,0.00%,0.00%,-20.00%,"));
    assert!(text.contains("Mileage,$ 0.00"));

    let equity = text.lines().last().unwrap();
    assert!(equity.starts_with("Equity,$ 0.00,$ 0.00,\"$ 8,000.00\""));

    Ok(())
}

#[tokio::test]
async fn test_export_detailed_unknown_car_fails() -> Result<()> {
    let (service, temp) = test_service().await?;

    let result = Exporter::new(&service)
        .export_detailed(CAR_ID, "2024", temp.path())
        .await;
    assert!(result.is_err());

    Ok(())
}

#[tokio::test]
async fn test_export_template_csv() -> Result<()> {
    let (service, temp) = test_service().await?;
    Fleet::create(&service).await?;

    let path = Exporter::new(&service)
        .export_template(TemplateFormat::Csv, temp.path())
        .await?;
    assert_eq!(path, temp.path().join(TEMPLATE_CSV_FILENAME));

    let text = std::fs::read_to_string(&path)?;
    let lines: Vec<_> = text.lines().collect();
    // 2 sections of title + header + 6 categories, plus a separator
    assert_eq!(lines.len(), 17);
    assert_eq!(lines[2], "Retail,0,0,0,0,0,0,0,0,0,0,0,0");
    assert_eq!(lines[7], "Amount Owed,0,0,0,0,0,0,0,0,0,0,0,0");
    assert_eq!(lines[9], "Current Year");

    Ok(())
}

#[cfg(feature = "xlsx")]
#[tokio::test]
async fn test_export_template_xlsx() -> Result<()> {
    use calamine::{Data, Reader};
    use nada_schedule::io::{TEMPLATE_SHEET_NAME, TEMPLATE_XLSX_FILENAME};
    use std::io::Read;

    let (service, temp) = test_service().await?;
    Fleet::create(&service).await?;
    // Saved out of ID order; the template lists categories by ID
    service
        .save_category(&nada_schedule::domain::CostCategory::new(0, "Trade-In"))
        .await?;

    let path = Exporter::new(&service)
        .export_template(TemplateFormat::Xlsx, temp.path())
        .await?;
    assert_eq!(path, temp.path().join(TEMPLATE_XLSX_FILENAME));

    let mut workbook = calamine::open_workbook_auto(&path)?;
    assert_eq!(workbook.sheet_names(), vec![TEMPLATE_SHEET_NAME.to_string()]);

    let range = workbook.worksheet_range(TEMPLATE_SHEET_NAME)?;
    let rows: Vec<_> = range.rows().collect();
    // 2 sections of title + header + 7 categories, plus a separator
    assert_eq!(rows.len(), 19);
    assert_eq!(rows[0][0], Data::String("Prior Year".into()));
    assert_eq!(rows[1][0], Data::String("Category".into()));
    assert_eq!(rows[1][12], Data::String("Dec".into()));
    assert_eq!(rows[2][0], Data::String("Trade-In".into()));
    assert!(rows[2][1..13].iter().all(|cell| *cell == Data::Float(0.0)));
    assert_eq!(rows[8][0], Data::String("Amount Owed".into()));
    assert_eq!(rows[10][0], Data::String("Current Year".into()));

    // Column widths live in the sheet XML
    let mut archive = zip::ZipArchive::new(std::fs::File::open(&path)?)?;
    let mut sheet_xml = String::new();
    archive
        .by_name("xl/worksheets/sheet1.xml")?
        .read_to_string(&mut sheet_xml)?;
    assert!(sheet_xml.contains(r#"<col min="1" max="1" width="25.7"#));
    assert!(sheet_xml.contains(r#"<col min="2" max="13" width="12.7"#));

    Ok(())
}

#[cfg(feature = "xlsx")]
#[test]
fn test_template_xlsx_write_failure_is_export_error() -> Result<()> {
    use nada_schedule::application::AppError;
    use nada_schedule::io::write_template_xlsx;

    let temp = tempfile::TempDir::new()?;
    let path = temp.path().join("missing").join("template.xlsx");

    let err = write_template_xlsx(&Fleet::categories(), &path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Export(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_export_snapshot() -> Result<()> {
    let (service, _temp) = test_service().await?;
    Fleet::create(&service).await?;
    Fleet::record_all(&service, Series::Current, &[(1, 1, "2024-03", 20000.0)]).await?;
    Fleet::record_all(&service, Series::WithAdd, &[(1, 1, "2024-03", 25000.0)]).await?;

    let mut out = Vec::new();
    let snapshot = Exporter::new(&service).export_snapshot_json(&mut out).await?;
    assert_eq!(snapshot.cars.len(), 1);
    assert_eq!(snapshot.categories.len(), 6);
    assert_eq!(snapshot.depreciation.len(), 1);
    assert_eq!(snapshot.depreciation_with_add[0].amount, 25000.0);

    let json: serde_json::Value = serde_json::from_slice(&out)?;
    assert_eq!(json["cars"][0]["make_model"], "Toyota Camry");
    assert_eq!(json["categories"][5]["name"], "Amount Owed");

    Ok(())
}
