//! Employee records read from a Google Sheets worksheet.
//!
//! The first row of the configured range holds column headers; every
//! following non-empty row becomes one [`Record`]. The sheet is read on each
//! lookup so edits made by HR apply immediately.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use staffbot_core::config::{SpreadsheetColumns, SpreadsheetConfig};
use staffbot_core::domain::{Record, RecordField};
use staffbot_core::stores::{RecordStore, StoreError};

pub struct SheetsRecordStore {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    range: String,
    api_key: SecretString,
    columns: SpreadsheetColumns,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsRecordStore {
    pub fn new(config: &SpreadsheetConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            api_key: config.api_key.clone(),
            columns: config.columns.clone(),
        }
    }

    fn values_url(&self) -> Result<reqwest::Url, StoreError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|error| StoreError::Unavailable(format!("invalid sheets url: {error}")))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Unavailable("sheets url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", &self.spreadsheet_id, "values", &self.range]);
        Ok(url)
    }

    /// Every employee row in sheet order.
    pub async fn fetch_records(&self) -> Result<Vec<Record>, StoreError> {
        let url = self.values_url()?;
        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.expose_secret())])
            .send()
            .await
            .map_err(|error| {
                warn!(error = %error, "spreadsheet request failed");
                StoreError::Unavailable(format!("spreadsheet request failed: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, spreadsheet_id = %self.spreadsheet_id, "spreadsheet rejected request");
            return Err(StoreError::Unavailable(format!("spreadsheet api returned {status}")));
        }

        let payload: ValueRange = response.json().await.map_err(|error| {
            StoreError::Malformed(format!("failed to decode spreadsheet values: {error}"))
        })?;

        let records = records_from_rows(payload.values, &self.columns)?;
        debug!(rows = records.len(), "spreadsheet rows loaded");
        Ok(records)
    }
}

#[async_trait]
impl RecordStore for SheetsRecordStore {
    async fn get_record_by_condition(
        &self,
        field: RecordField,
        value: &str,
    ) -> Result<Option<Record>, StoreError> {
        let records = self.fetch_records().await?;
        let found = records.into_iter().find(|record| record.field(field) == value);
        debug!(column = field.label(), matched = found.is_some(), "spreadsheet lookup");
        Ok(found)
    }
}

/// Maps raw sheet rows onto records using the header row. Short rows are
/// padded with empty cells; rows with no content are skipped.
pub fn records_from_rows(
    rows: Vec<Vec<Value>>,
    columns: &SpreadsheetColumns,
) -> Result<Vec<Record>, StoreError> {
    let mut rows = rows.into_iter();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row.iter().map(cell_text).collect();

    let position = |name: &str| {
        headers.iter().position(|header| header == name).ok_or_else(|| {
            StoreError::Malformed(format!("spreadsheet header row is missing column `{name}`"))
        })
    };
    let name_at = position(&columns.name)?;
    let phone_at = position(&columns.phone_number)?;
    let salary_at = position(&columns.salary)?;
    let day_offs_at = position(&columns.day_offs)?;

    let mut records = Vec::new();
    for row in rows {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        if cells.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let cell = |index: usize| cells.get(index).cloned().unwrap_or_default();

        records.push(Record {
            full_name: cell(name_at),
            phone_number: cell(phone_at),
            salary: cell(salary_at),
            day_off_balance: cell(day_offs_at),
        });
    }

    Ok(records)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use staffbot_core::config::{AppConfig, SpreadsheetColumns};
    use staffbot_core::stores::StoreError;

    use super::{records_from_rows, SheetsRecordStore};

    fn columns() -> SpreadsheetColumns {
        AppConfig::default().spreadsheet.columns
    }

    fn rows(value: serde_json::Value) -> Vec<Vec<serde_json::Value>> {
        serde_json::from_value(value).expect("rows")
    }

    #[test]
    fn header_row_maps_cells_by_name() {
        let records = records_from_rows(
            rows(json!([
                ["Department", "Name", "Phone number", "Salary", "Day-offs"],
                ["QA", "Jane Doe", "37360000001", "1500 EUR", 12],
                ["Dev", "John Roe", " 37360000002 ", "2000 EUR", "3.5"]
            ])),
            &columns(),
        )
        .expect("records");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].full_name, "Jane Doe");
        assert_eq!(records[0].phone_number, "37360000001");
        assert_eq!(records[0].day_off_balance, "12");
        assert_eq!(records[1].phone_number, " 37360000002 ");
    }

    #[test]
    fn short_and_blank_rows_are_tolerated() {
        let records = records_from_rows(
            rows(json!([
                ["Name", "Phone number", "Salary", "Day-offs"],
                ["Jane Doe", "37360000001"],
                ["", "", "", ""],
                []
            ])),
            &columns(),
        )
        .expect("records");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].salary, "");
        assert_eq!(records[0].day_off_balance, "");
    }

    #[test]
    fn missing_header_is_reported_as_malformed() {
        let error = records_from_rows(
            rows(json!([["Name", "Phone", "Salary", "Day-offs"], ["Jane Doe", "1", "2", "3"]])),
            &columns(),
        )
        .expect_err("phone column missing");

        assert!(
            matches!(error, StoreError::Malformed(ref message) if message.contains("Phone number"))
        );
    }

    #[test]
    fn empty_sheet_has_no_records() {
        assert!(records_from_rows(Vec::new(), &columns()).expect("records").is_empty());
    }

    #[test]
    fn values_url_encodes_sheet_range() {
        let mut config = AppConfig::default().spreadsheet;
        config.spreadsheet_id = "abc123".to_string();
        config.range = "Staff list!A1:F".to_string();
        config.base_url = "https://sheets.example.test/".to_string();

        let url = SheetsRecordStore::new(&config).values_url().expect("url");

        assert_eq!(
            url.as_str(),
            "https://sheets.example.test/v4/spreadsheets/abc123/values/Staff%20list!A1:F"
        );
    }
}
