pub mod error;
pub mod types;

pub use error::{Result, SheetsError};
pub use types::{BatchUpdateRequest, ReadValues, SpreadsheetMeta, ValueRange};

use std::time::Duration;

const BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Client bound to one spreadsheet. Writes use USER_ENTERED input so the
/// stored values behave like values typed into the sheet.
#[derive(Clone)]
pub struct SheetsClient {
    client: reqwest::Client,
    spreadsheet_id: String,
    token: String,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: &str, token: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            spreadsheet_id: spreadsheet_id.to_string(),
            token: token.to_string(),
        }
    }

    /// Titles of every tab in the spreadsheet.
    pub async fn list_tabs(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&[])?;

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await?;

        let meta: SpreadsheetMeta = Self::parse(resp).await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    /// Every populated cell of a tab as a row-major grid of strings.
    /// Trailing empty cells/rows are absent, matching the API's shape.
    pub async fn read_all(&self, tab: &str) -> Result<Vec<Vec<String>>> {
        let url = self.endpoint(&["values", &quote_tab(tab)])?;

        let resp = self.client.get(url).bearer_auth(&self.token).send().await?;

        let read: ReadValues = Self::parse(resp).await?;
        Ok(read.values)
    }

    /// Write one cell (1-based row/column).
    pub async fn write_cell(&self, tab: &str, row: u32, col: u32, value: &str) -> Result<()> {
        let range = format!("{}!{}", quote_tab(tab), rowcol_to_a1(row, col)?);
        let url = self.endpoint(&["values", &range])?;

        let body = ValueRange {
            range: range.clone(),
            values: vec![vec![value.to_string()]],
        };

        let resp = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body)
            .send()
            .await?;

        Self::check(resp).await
    }

    /// Write many cells in one round trip, one single-cell range per entry.
    pub async fn batch_write(&self, tab: &str, updates: &[(u32, u32, String)]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut data = Vec::with_capacity(updates.len());
        for (row, col, value) in updates {
            data.push(ValueRange {
                range: format!("{}!{}", quote_tab(tab), rowcol_to_a1(*row, *col)?),
                values: vec![vec![value.clone()]],
            });
        }

        let url = self.endpoint(&["values:batchUpdate"])?;
        let body = BatchUpdateRequest {
            value_input_option: "USER_ENTERED",
            data,
        };

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        Self::check(resp).await?;
        tracing::debug!(tab, cells = updates.len(), "Batch write complete");
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<url::Url> {
        let mut url = url::Url::parse(BASE_URL)
            .map_err(|e| SheetsError::InvalidRequest(e.to_string()))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| SheetsError::InvalidRequest("base URL cannot be a base".into()))?;
            path.push(&self.spreadsheet_id);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn parse<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }

    async fn check(resp: reqwest::Response) -> Result<()> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

/// Quote a tab title for use in an A1 range. Embedded quotes double up,
/// per the A1 grammar.
fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

/// 1-based (row, col) to A1 notation: (1, 1) → "A1", (2, 28) → "AB2".
pub fn rowcol_to_a1(row: u32, col: u32) -> Result<String> {
    if row == 0 || col == 0 {
        return Err(SheetsError::InvalidRequest(format!(
            "row and column are 1-based, got ({row}, {col})"
        )));
    }

    let mut letters = Vec::new();
    let mut n = col;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    let col_letters: String = letters.into_iter().rev().collect();
    Ok(format!("{col_letters}{row}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a1_single_letters() {
        assert_eq!(rowcol_to_a1(1, 1).unwrap(), "A1");
        assert_eq!(rowcol_to_a1(3, 8).unwrap(), "H3");
        assert_eq!(rowcol_to_a1(10, 26).unwrap(), "Z10");
    }

    #[test]
    fn a1_double_letters() {
        assert_eq!(rowcol_to_a1(2, 27).unwrap(), "AA2");
        assert_eq!(rowcol_to_a1(2, 28).unwrap(), "AB2");
        assert_eq!(rowcol_to_a1(5, 52).unwrap(), "AZ5");
        assert_eq!(rowcol_to_a1(5, 53).unwrap(), "BA5");
        assert_eq!(rowcol_to_a1(7, 702).unwrap(), "ZZ7");
        assert_eq!(rowcol_to_a1(7, 703).unwrap(), "AAA7");
    }

    #[test]
    fn a1_rejects_zero() {
        assert!(rowcol_to_a1(0, 1).is_err());
        assert!(rowcol_to_a1(1, 0).is_err());
    }

    #[test]
    fn tab_quoting() {
        assert_eq!(quote_tab("Stores"), "'Stores'");
        assert_eq!(quote_tab("North 'A'"), "'North ''A'''");
    }
}
