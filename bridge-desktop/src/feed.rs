//! Supplier feed downloaded as a zip archive holding the stock table.
//!
//! The supplier ships the table as an Excel workbook (`ostatki.xls`); a CSV
//! export is accepted when the archive holds no workbook. The table starts
//! with a block of banner rows (company name, report date, legend) before the
//! real header row. The number of such rows is configurable and counts from
//! the top of the sheet.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    feed::SupplierFeedSource,
    http::{HttpClient, HttpMethod, HttpRequest},
    marketplace::SupplierRecord,
};
use calamine::Reader;
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const CODE_COLUMN: &str = "Код";
const QUANTITY_COLUMN: &str = "Количество";
const PRICE_COLUMN: &str = "Цена";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// `SupplierFeedSource` that fetches the supplier archive over HTTP.
pub struct ArchiveSupplierFeed {
    http_client: Arc<dyn HttpClient>,
    url: String,
    preamble_rows: usize,
}

impl ArchiveSupplierFeed {
    /// Feed at `url` with no preamble rows.
    pub fn new(http_client: Arc<dyn HttpClient>, url: impl Into<String>) -> Self {
        Self {
            http_client,
            url: url.into(),
            preamble_rows: 0,
        }
    }

    /// Skip `rows` rows before the header row.
    pub fn with_preamble_rows(mut self, rows: usize) -> Self {
        self.preamble_rows = rows;
        self
    }
}

#[async_trait]
impl SupplierFeedSource for ArchiveSupplierFeed {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn load_supplier_feed(&self) -> Result<Vec<SupplierRecord>> {
        let request = HttpRequest::new(HttpMethod::Get, self.url.as_str()).timeout(DOWNLOAD_TIMEOUT);
        let response = self.http_client.execute(request).await?.error_for_status()?;

        debug!(bytes = response.body.len(), "Downloaded supplier archive");

        let records = parse_feed_archive(&response.body, self.preamble_rows)?;
        info!(records = records.len(), "Parsed supplier feed");
        Ok(records)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableFormat {
    Workbook,
    Csv,
}

impl TableFormat {
    fn of(entry_name: &str) -> Option<Self> {
        let name = entry_name.to_lowercase();
        if name.ends_with(".xls") || name.ends_with(".xlsx") {
            Some(Self::Workbook)
        } else if name.ends_with(".csv") {
            Some(Self::Csv)
        } else {
            None
        }
    }
}

/// Read the stock table out of a zip archive.
///
/// The first workbook entry (`.xls`/`.xlsx`) is used; without one, the
/// first `.csv` entry.
pub fn parse_feed_archive(archive: &[u8], preamble_rows: usize) -> Result<Vec<SupplierRecord>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| BridgeError::OperationFailed(format!("Invalid feed archive: {}", e)))?;

    let mut workbook = None;
    let mut csv = None;
    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| BridgeError::OperationFailed(format!("Unreadable archive entry: {}", e)))?;
        if !entry.is_file() {
            continue;
        }
        match TableFormat::of(entry.name()) {
            Some(TableFormat::Workbook) if workbook.is_none() => workbook = Some(index),
            Some(TableFormat::Csv) if csv.is_none() => csv = Some(index),
            _ => {}
        }
    }

    let (index, format) = match (workbook, csv) {
        (Some(index), _) => (index, TableFormat::Workbook),
        (None, Some(index)) => (index, TableFormat::Csv),
        (None, None) => {
            return Err(BridgeError::OperationFailed(
                "Feed archive contains no stock table".to_string(),
            ))
        }
    };

    let mut entry = archive
        .by_index(index)
        .map_err(|e| BridgeError::OperationFailed(format!("Unreadable archive entry: {}", e)))?;
    debug!(entry = entry.name(), ?format, "Reading feed table");
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents)?;

    match format {
        TableFormat::Workbook => parse_workbook(contents, preamble_rows),
        TableFormat::Csv => parse_csv(&contents, preamble_rows),
    }
}

/// Rows of the first worksheet, cells rendered as text.
fn parse_workbook(contents: Vec<u8>, preamble_rows: usize) -> Result<Vec<SupplierRecord>> {
    let mut workbook =
        calamine::open_workbook_auto_from_rs(Cursor::new(contents)).map_err(workbook_error)?;
    let sheet = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| BridgeError::OperationFailed("Feed workbook has no sheets".to_string()))?
        .map_err(workbook_error)?;

    // The range begins at the first non-empty row, not at the top of the sheet.
    let first_row = sheet.start().map(|(row, _)| row as usize).unwrap_or(0);
    let rows = sheet
        .rows()
        .skip(preamble_rows.saturating_sub(first_row))
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>());

    records_from_rows(rows)
}

fn parse_csv(contents: &[u8], preamble_rows: usize) -> Result<Vec<SupplierRecord>> {
    let text = String::from_utf8_lossy(contents);
    let text = text.trim_start_matches('\u{FEFF}');

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let rows = reader
        .records()
        .skip(preamble_rows)
        .filter_map(|row| match row {
            Ok(row) => Some(row.iter().map(str::to_string).collect::<Vec<String>>()),
            Err(e) => {
                warn!("Skipping malformed feed row: {}", e);
                None
            }
        });

    records_from_rows(rows)
}

/// Turn table rows, header row first, into supplier records.
///
/// Columns are located by header name, so extra or reordered columns are
/// fine. Rows with an empty code (section titles, totals) are skipped.
fn records_from_rows(mut rows: impl Iterator<Item = Vec<String>>) -> Result<Vec<SupplierRecord>> {
    let headers = rows
        .next()
        .ok_or_else(|| BridgeError::OperationFailed("Feed table has no header row".to_string()))?;

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| BridgeError::OperationFailed(format!("Feed table has no '{}' column", name)))
    };
    let code_at = column(CODE_COLUMN)?;
    let quantity_at = column(QUANTITY_COLUMN)?;
    let price_at = column(PRICE_COLUMN)?;

    let mut records = Vec::new();
    for row in rows {
        let field = |at: usize| row.get(at).map(|v| v.trim()).unwrap_or_default().to_string();
        let code = field(code_at);
        if code.is_empty() {
            continue;
        }

        records.push(SupplierRecord::new(code, field(quantity_at), field(price_at)));
    }

    Ok(records)
}

fn workbook_error(error: calamine::Error) -> BridgeError {
    BridgeError::OperationFailed(format!("Unreadable feed workbook: {}", error))
}
