//! Export payload rendering.

use sensorgrid_core::{CoreError, DeviceLog, ExportFormat, time as core_time};
use serde::Serialize;

/// One exported record. Timestamps are pre-rendered to RFC 3339 so JSON
/// and CSV output agree byte-for-byte on the format.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub device_id: String,
    pub event: String,
    pub value: f64,
    pub timestamp: String,
}

impl ExportRow {
    pub fn from_log(log: &DeviceLog) -> Result<Self, CoreError> {
        Ok(Self {
            device_id: log.device_id.to_string(),
            event: log.event.clone(),
            value: log.value,
            timestamp: core_time::format_rfc3339(log.timestamp)?,
        })
    }
}

/// Render rows in the requested format. An empty record set is not an
/// error: it renders a bare header (CSV) or an empty array (JSON).
pub fn render(rows: &[ExportRow], format: ExportFormat) -> Result<String, CoreError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string(rows)?),
        ExportFormat::Csv => Ok(render_csv(rows)),
    }
}

const CSV_HEADER: &str = "device_id,event,value,timestamp";

fn render_csv(rows: &[ExportRow]) -> String {
    let mut out = String::with_capacity(64 * (rows.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&row.device_id);
        out.push(',');
        out.push_str(&csv_escape(&row.event));
        out.push(',');
        out.push_str(&row.value.to_string());
        out.push(',');
        out.push_str(&row.timestamp);
        out.push('\n');
    }
    out
}

/// Quote a field when it contains a delimiter, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
