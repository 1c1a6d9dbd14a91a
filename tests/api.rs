use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use excel_service::router;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::ServiceExt;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

async fn post_json(uri: &str, payload: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, _, body) = send(router(), request).await;
    (status, body)
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, _, body) = send(router(), request).await;
    (status, body)
}

fn file_info_uri(path: &Path) -> String {
    // temp paths contain no characters that need escaping beyond these
    let encoded = path
        .to_string_lossy()
        .replace('%', "%25")
        .replace(' ', "%20")
        .replace('+', "%2B");
    format!("/api/v1/file-info?file_path={encoded}")
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Two header rows, the first with a merged "Sales" group over B1:C1.
fn merged_header_fixture(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("merged.xlsx");
    let mut workbook = XlsxWorkbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Report").unwrap();

    sheet.write_string(0, 0, "Region").unwrap();
    sheet.merge_range(0, 1, 0, 2, "Sales", &Format::new()).unwrap();
    sheet.write_string(1, 1, "Q1").unwrap();
    sheet.write_string(1, 2, "Q2").unwrap();
    sheet.write_string(2, 0, "North").unwrap();
    sheet.write_number(2, 1, 10.0).unwrap();
    sheet.write_number(2, 2, 12.0).unwrap();

    workbook.save(&path).unwrap();
    path
}

async fn write_rows(path: &Path, data: Value) -> (StatusCode, Value) {
    post_json(
        "/api/v1/write",
        json!({"file_path": path_str(path), "data": data}),
    )
    .await
}

#[derive(Debug, PartialEq)]
struct LabelFlags {
    value: bool,
    percent: bool,
    series_name: bool,
    category_name: bool,
    leader_lines: Option<bool>,
}

const FIXED_LABELS: LabelFlags = LabelFlags {
    value: true,
    percent: true,
    series_name: true,
    category_name: false,
    leader_lines: Some(false),
};

#[derive(Debug)]
struct SavedChart {
    plot: &'static str,
    series: Vec<String>,
    labels: LabelFlags,
}

/// Reopen `path` and describe every chart stored on `sheet`.
fn saved_charts(path: &Path, sheet: &str) -> Vec<SavedChart> {
    let book = umya_spreadsheet::reader::xlsx::read(path).unwrap();
    let sheet = book.get_sheet_by_name(sheet).unwrap();

    sheet
        .get_chart_collection()
        .iter()
        .map(|chart| {
            let area = chart.get_chart_space().get_chart().get_plot_area();
            let (plot, series, labels) = if let Some(c) = area.get_bar_chart() {
                ("bar", c.get_area_chart_series_list(), c.get_data_labels())
            } else if let Some(c) = area.get_line_chart() {
                ("line", c.get_area_chart_series_list(), c.get_data_labels())
            } else if let Some(c) = area.get_pie_chart() {
                ("pie", c.get_area_chart_series_list(), c.get_data_labels())
            } else {
                panic!("chart has no bar, line or pie plot");
            };

            SavedChart {
                plot,
                series: series
                    .get_area_chart_series()
                    .iter()
                    .filter_map(|s| s.get_values())
                    .map(|v| v.get_number_reference().get_formula().get_address_str())
                    .collect(),
                labels: LabelFlags {
                    value: *labels.get_show_value().get_val(),
                    percent: *labels.get_show_percent().get_val(),
                    series_name: *labels.get_show_series_name().get_val(),
                    category_name: *labels.get_show_category_name().get_val(),
                    leader_lines: labels.get_show_leader_lines().map(|l| *l.get_val()),
                },
            }
        })
        .collect()
}

#[tokio::test]
async fn health_reports_service() {
    let (status, body) = get("/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["service"], "excel-service");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn options_anywhere_is_204_with_cors() {
    for uri in ["/api/v1/read", "/api/v1/health", "/somewhere/else"] {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(router(), request).await;

        assert_eq!(status, StatusCode::NO_CONTENT, "{uri}");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Authorization"
        );
    }
}

#[tokio::test]
async fn regular_responses_carry_cors_headers() {
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(router(), request).await;
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn unknown_route_is_enveloped_404() {
    let (status, body) = get("/api/v2/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn file_info_requires_file_path() {
    let (status, body) = get("/api/v1/file-info").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "file_path parameter is required");

    let (status, _) = get("/api/v1/file-info?file_path=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn read_missing_file_is_400_naming_the_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ghost.xlsx");

    let (status, body) = post_json("/api/v1/read", json!({"file_path": path_str(&path)})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains(&path_str(&path)));
}

#[tokio::test]
async fn malformed_requests_are_400_envelopes() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/read")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request"));

    // `data` is required for writes
    let (status, body) = post_json("/api/v1/write", json!({"file_path": "/tmp/x.xlsx"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = post_json("/api/v1/chart", json!({"file_path": "/tmp/x.xlsx"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn write_then_read_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("round.xlsx");

    let (status, body) = write_rows(
        &path,
        json!([{"a": "1", "b": "2"}, {"a": "3", "b": "4"}]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["sheet_name"], "Sheet1");
    assert_eq!(body["data"]["rows_written"], 2);
    assert_eq!(body["data"]["file_path"], path_str(&path));

    let (status, body) = post_json("/api/v1/read", json!({"file_path": path_str(&path)})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["sheet_name"], "Sheet1");
    assert_eq!(body["data"]["total_rows"], 3);
    assert_eq!(
        body["data"]["rows"],
        json!([["a", "b"], ["1", "2"], ["3", "4"]])
    );
}

#[tokio::test]
async fn write_into_named_sheet_at_offset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("offset.xlsx");

    let payload = json!({
        "file_path": path_str(&path),
        "sheet_name": "Stock",
        "data": [{"sku": "S-1", "qty": "7"}],
        "start_row": 2,
        "start_col": "B",
    });
    let (status, body) = post_json("/api/v1/write", payload).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["sheet_name"], "Stock");

    let (_, body) = post_json(
        "/api/v1/read",
        json!({"file_path": path_str(&path), "sheet_name": "Stock"}),
    )
    .await;
    assert_eq!(
        body["data"]["rows"],
        json!([[], ["", "sku", "qty"], ["", "S-1", "7"]])
    );
}

#[tokio::test]
async fn empty_write_still_succeeds() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.xlsx");

    let (status, body) = write_rows(&path, json!([])).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["rows_written"], 0);
    assert!(path.exists());
}

#[tokio::test]
async fn write_past_sheet_limits_is_400() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("limits.xlsx");

    for (start_row, start_col) in [
        (json!(4294967295u64), json!("A")),
        (json!(2000000), json!("A")),
        (json!(1048576), json!("A")),
        (json!(1), json!("XFD")),
    ] {
        let payload = json!({
            "file_path": path_str(&path),
            "data": [{"a": "1", "b": "2"}],
            "start_row": start_row,
            "start_col": start_col,
        });
        let (status, body) = post_json("/api/v1/write", payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{start_row} {start_col}: {body}");
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request"));
    }
    assert!(!path.exists());
}

#[tokio::test]
async fn read_applies_row_window() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("window.xlsx");
    let data: Vec<Value> = (1..=5).map(|i| json!({"n": i.to_string()})).collect();
    write_rows(&path, Value::Array(data)).await;

    let (_, body) = post_json(
        "/api/v1/read",
        json!({"file_path": path_str(&path), "start_row": 2, "end_row": 3}),
    )
    .await;
    assert_eq!(body["data"]["rows"], json!([["1"], ["2"]]));
    assert_eq!(body["data"]["total_rows"], 2);

    // end past the sheet clamps to the last row
    let (_, body) = post_json(
        "/api/v1/read",
        json!({"file_path": path_str(&path), "start_row": 5, "end_row": 99}),
    )
    .await;
    assert_eq!(body["data"]["rows"], json!([["4"], ["5"]]));

    // inverted window falls back to every row
    let (_, body) = post_json(
        "/api/v1/read",
        json!({"file_path": path_str(&path), "start_row": 9, "end_row": 2}),
    )
    .await;
    assert_eq!(body["data"]["total_rows"], 6);
}

#[tokio::test]
async fn read_unknown_sheet_is_500() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sheets.xlsx");
    write_rows(&path, json!([{"a": "1"}])).await;

    let (status, body) = post_json(
        "/api/v1/read",
        json!({"file_path": path_str(&path), "sheet_name": "Missing"}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to read sheet data"));
}

#[tokio::test]
async fn read_corrupt_file_is_500() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupt.xlsx");
    std::fs::write(&path, b"definitely not xlsx").unwrap();

    let (status, body) = post_json("/api/v1/read", json!({"file_path": path_str(&path)})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to open Excel file"));
}

#[tokio::test]
async fn chart_kinds_and_fallback() {
    let dir = TempDir::new().unwrap();
    let cases = [
        ("col", "Sheet1!$B$2:$B$3", "bar"),
        ("line", "B2:B3", "line"),
        ("pie", "Sheet1!$B$2:$B$3", "pie"),
        ("scatter", "B2:B3", "bar"),
    ];

    for (kind, range, plot) in cases {
        let path = dir.path().join(format!("chart_{kind}.xlsx"));
        write_rows(
            &path,
            json!([{"month": "Jan", "value": "3"}, {"month": "Feb", "value": "5"}]),
        )
        .await;

        let (status, body) = post_json(
            "/api/v1/chart",
            json!({
                "file_path": path_str(&path),
                "chart_type": kind,
                "data_range": range,
                "title": "Monthly",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{kind}: {body}");
        assert_eq!(body["data"]["chart_type"], kind);
        assert_eq!(body["data"]["sheet_name"], "Sheet1");
        assert_eq!(body["message"], "Chart created successfully");

        let charts = saved_charts(&path, "Sheet1");
        assert_eq!(charts.len(), 1, "{kind}");
        assert_eq!(charts[0].plot, plot, "{kind}");
        assert_eq!(charts[0].series, vec!["Sheet1!$B$2:$B$3"], "{kind}");
        assert_eq!(charts[0].labels, FIXED_LABELS, "{kind}");

        let (status, body) =
            post_json("/api/v1/read", json!({"file_path": path_str(&path)})).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["rows"][2], json!(["Feb", "5"]));
    }
}

#[tokio::test]
async fn chart_on_missing_file_is_500() {
    let dir = TempDir::new().unwrap();
    let (status, body) = post_json(
        "/api/v1/chart",
        json!({
            "file_path": path_str(&dir.path().join("none.xlsx")),
            "chart_type": "col",
            "data_range": "A1:A3",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn chart_on_unknown_sheet_is_500() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chart_sheet.xlsx");
    write_rows(&path, json!([{"a": "1"}])).await;

    let (status, body) = post_json(
        "/api/v1/chart",
        json!({
            "file_path": path_str(&path),
            "sheet_name": "Nope",
            "chart_type": "line",
            "data_range": "A1:A2",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to create chart"));
}

#[tokio::test]
async fn file_info_flags_merged_header() {
    let dir = TempDir::new().unwrap();
    let path = merged_header_fixture(&dir);

    let (status, body) = get(&file_info_uri(&path)).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let data = &body["data"];
    assert_eq!(data["file_name"], "merged.xlsx");
    assert_eq!(data["sheet_count"], 1);
    assert!(data["file_size"].as_u64().unwrap() > 0);
    assert!(data["modified_time"].as_str().unwrap().contains('T'));

    let sheet = &data["sheets"]["Report"];
    assert_eq!(sheet["row_count"], 3);
    assert_eq!(sheet["has_data"], true);
    assert_eq!(sheet["multi_level_header"]["detected"], true);
    assert_eq!(sheet["multi_level_header"]["structure_type"], "merged_header");
    assert_eq!(sheet["multi_level_header"]["confidence"], 0.8);
    assert_eq!(sheet["merged_cells"]["count"], 1);
    assert_eq!(sheet["merged_cells"]["ranges"][0]["range"], "B1:C1");
    assert_eq!(sheet["merged_cells"]["ranges"][0]["span_cols"], 2);
    assert_eq!(sheet["merged_cells"]["ranges"][0]["span_rows"], 1);

    let summary = &data["file_structure_summary"];
    assert_eq!(summary["total_merged_cells"], 1);
    assert_eq!(summary["sheets_with_multi_headers"], 1);
    assert_eq!(summary["complex_structure_detected"], true);
}

#[tokio::test]
async fn file_info_detects_stacked_text_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stacked.xlsx");
    write_rows(
        &path,
        json!([{"region": "group", "metric": "label"}, {"region": "North", "metric": "10"}]),
    )
    .await;

    let (status, body) = get(&file_info_uri(&path)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let header = &body["data"]["sheets"]["Sheet1"]["multi_level_header"];
    assert_eq!(header["detected"], true);
    assert_eq!(header["structure_type"], "multi_level");
    assert_eq!(header["confidence"], 0.7);
    assert_eq!(header["header_candidates"], json!([1, 2]));
    assert_eq!(body["data"]["sheets"]["Sheet1"]["col_count"], 2);
    assert_eq!(body["data"]["file_structure_summary"]["total_merged_cells"], 0);
}

#[tokio::test]
async fn file_info_missing_file_is_400() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(&file_info_uri(&dir.path().join("gone.xlsx"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("File not found"));
}
