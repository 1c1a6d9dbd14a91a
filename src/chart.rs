use umya_spreadsheet::structs::drawing::charts::{DataLabels, ShowLeaderLines};
use umya_spreadsheet::structs::drawing::spreadsheet::MarkerType;
use umya_spreadsheet::structs::{Chart, ChartType};

use crate::coordinate::{cell_name, parse_range};
use crate::error::{Result, ServiceError};
use crate::workbook::Workbook;

/// Top-left cell every chart is anchored to.
pub const CHART_ANCHOR: &str = "E1";

/// Bottom-right cell of the anchor box, roughly 480x290 px at default sizes.
pub const CHART_EXTENT: &str = "L16";

/// Chart kinds the service can insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    Col,
    Line,
    Pie,
}

impl ChartKind {
    /// Map a request's `chart_type`; unknown kinds fall back to a column chart.
    pub fn from_request(name: &str) -> Self {
        match name {
            "col" => ChartKind::Col,
            "line" => ChartKind::Line,
            "pie" => ChartKind::Pie,
            other => {
                log::debug!("unknown chart type {other:?}, using col");
                ChartKind::Col
            }
        }
    }

    fn chart_type(self) -> ChartType {
        match self {
            ChartKind::Col => ChartType::BarChart,
            ChartKind::Line => ChartType::LineChart,
            ChartKind::Pie => ChartType::PieChart,
        }
    }

    fn has_axes(self) -> bool {
        !matches!(self, ChartKind::Pie)
    }
}

/// What to draw: one series whose categories and values share `data_range`.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub data_range: String,
    pub title: Option<String>,
    pub x_axis_title: Option<String>,
    pub y_axis_title: Option<String>,
}

fn quote_sheet(sheet: &str) -> String {
    if sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// Give a bare `A1:B5` range the target sheet and absolute markers.
///
/// References that already name a sheet are passed through untouched.
pub fn qualify_range(sheet: &str, range: &str) -> Result<String> {
    let range = range.trim();
    if range.contains('!') {
        return Ok(range.to_string());
    }

    let (c0, r0, c1, r1) = parse_range(range)
        .ok_or_else(|| ServiceError::Chart(format!("invalid data range {range:?}")))?;
    let absolute = |col: u32, row: u32| {
        let name = cell_name(col, row);
        let digits = name.find(|c: char| c.is_ascii_digit()).unwrap_or(name.len());
        format!("${}${}", &name[..digits], &name[digits..])
    };

    Ok(format!(
        "{}!{}:{}",
        quote_sheet(sheet),
        absolute(c0, r0),
        absolute(c1, r1)
    ))
}

/// Label settings shared by every chart: values, percentages and the series
/// name are shown; category names and pie leader lines are not.
fn apply_label_flags(labels: &mut DataLabels) {
    labels.get_show_value_mut().set_val(true);
    labels.get_show_percent_mut().set_val(true);
    labels.get_show_series_name_mut().set_val(true);
    labels.get_show_category_name_mut().set_val(false);

    let mut leader_lines = ShowLeaderLines::default();
    leader_lines.set_val(false);
    labels.set_show_leader_lines(leader_lines);
}

/// Data labels of the plot-area chart that `kind` produces, if it is there.
fn data_labels_mut(chart: &mut Chart, kind: ChartKind) -> Option<&mut DataLabels> {
    let plot_area = chart
        .get_chart_space_mut()
        .get_chart_mut()
        .get_plot_area_mut();
    match kind {
        ChartKind::Col => plot_area.get_bar_chart_mut().map(|c| c.get_data_labels_mut()),
        ChartKind::Line => plot_area.get_line_chart_mut().map(|c| c.get_data_labels_mut()),
        ChartKind::Pie => plot_area.get_pie_chart_mut().map(|c| c.get_data_labels_mut()),
    }
}

fn build_chart(spec: &ChartSpec, series_ref: &str) -> Chart {
    let mut from_marker = MarkerType::default();
    from_marker.set_coordinate(CHART_ANCHOR);
    let mut to_marker = MarkerType::default();
    to_marker.set_coordinate(CHART_EXTENT);

    let mut chart = Chart::default();
    chart.new_chart(spec.kind.chart_type(), from_marker, to_marker, vec![series_ref]);

    match data_labels_mut(&mut chart, spec.kind) {
        Some(labels) => apply_label_flags(labels),
        None => log::warn!("no {:?} plot in new chart, labels left as default", spec.kind),
    }

    if let Some(title) = spec.title.as_deref().filter(|t| !t.is_empty()) {
        chart.set_series_title(vec![title]);
        chart.set_title(title);
    }

    if spec.kind.has_axes() {
        if let Some(x_title) = spec.x_axis_title.as_deref().filter(|t| !t.is_empty()) {
            chart.set_horizontal_title(x_title);
        }
        if let Some(y_title) = spec.y_axis_title.as_deref().filter(|t| !t.is_empty()) {
            chart.set_vertical_title(y_title);
        }
    }

    chart
}

/// Add one chart to `sheet`. The caller saves the workbook.
pub fn insert_chart(book: &mut Workbook, sheet: &str, spec: &ChartSpec) -> Result<()> {
    let series_ref = qualify_range(sheet, &spec.data_range)?;
    let chart = build_chart(spec, &series_ref);

    let worksheet = book
        .worksheet_mut(sheet)
        .ok_or_else(|| ServiceError::Chart(format!("sheet {sheet} does not exist")))?;
    worksheet.add_chart(chart);

    log::debug!("added {:?} chart over {series_ref}", spec.kind);
    Ok(())
}
