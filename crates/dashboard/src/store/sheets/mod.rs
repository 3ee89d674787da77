//! Google Sheets record store.
//!
//! The order table is the first worksheet of a spreadsheet found by name
//! (through a Drive files query) or addressed directly by id. Reads use
//! `values.get`; writes clear the worksheet and then write the header and
//! every row in one `values.update` call starting at `A1`.

pub mod auth;

use std::sync::Arc;

use async_trait::async_trait;
use order_desk_core::Order;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::instrument;
use url::Url;

use self::auth::{AccessToken, ServiceAccountKey};
use super::{RecordStore, StoreError, codec};

/// Sheets API base.
const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Drive files endpoint, used to look spreadsheets up by name.
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";

/// Default wait when a 429 carries no `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// How the spreadsheet is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetLocator {
    /// Look up by spreadsheet title.
    Name(String),
    /// Use this spreadsheet id directly.
    Id(String),
}

impl std::fmt::Display for SheetLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(f, "spreadsheet \"{name}\""),
            Self::Id(id) => write!(f, "spreadsheet {id}"),
        }
    }
}

/// Resolved spreadsheet and worksheet.
#[derive(Debug, Clone)]
struct SheetTarget {
    spreadsheet_id: String,
    worksheet: String,
}

/// Record store backed by a Google Sheets worksheet.
#[derive(Clone)]
pub struct GoogleSheetsStore {
    inner: Arc<GoogleSheetsStoreInner>,
}

struct GoogleSheetsStoreInner {
    client: reqwest::Client,
    key: ServiceAccountKey,
    locator: SheetLocator,
    /// In-memory token cache
    token: RwLock<Option<AccessToken>>,
    /// Resolved on first use
    target: RwLock<Option<SheetTarget>>,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<WorksheetMeta>,
}

#[derive(Debug, Deserialize)]
struct WorksheetMeta {
    properties: WorksheetProperties,
}

#[derive(Debug, Deserialize)]
struct WorksheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleSheetsStore {
    /// Create a store for the given service account and spreadsheet.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Http` if the HTTP client cannot be built.
    pub fn new(key: ServiceAccountKey, locator: SheetLocator) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(GoogleSheetsStoreInner {
                client,
                key,
                locator,
                token: RwLock::new(None),
                target: RwLock::new(None),
            }),
        })
    }

    /// Current access token, exchanging a new one when needed.
    async fn access_token(&self) -> Result<AccessToken, StoreError> {
        if let Some(token) = self.inner.token.read().await.as_ref()
            && token.is_fresh()
        {
            return Ok(token.clone());
        }

        let mut guard = self.inner.token.write().await;
        if let Some(token) = guard.as_ref()
            && token.is_fresh()
        {
            return Ok(token.clone());
        }
        let token = auth::exchange(&self.inner.client, &self.inner.key).await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Send an authorized request and map error statuses.
    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token.secret()).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED {
            // Force a fresh exchange on the next call.
            *self.inner.token.write().await = None;
        }
        if status == StatusCode::NOT_FOUND {
            *self.inner.target.write().await = None;
        }

        Err(status_error(status, retry_after.as_deref(), &body))
    }

    /// Resolve (once) the spreadsheet id and first worksheet title.
    async fn target(&self) -> Result<SheetTarget, StoreError> {
        if let Some(target) = self.inner.target.read().await.as_ref() {
            return Ok(target.clone());
        }

        let spreadsheet_id = match &self.inner.locator {
            SheetLocator::Id(id) => id.clone(),
            SheetLocator::Name(name) => self.find_spreadsheet(name).await?,
        };
        let worksheet = self.first_worksheet(&spreadsheet_id).await?;
        tracing::info!(
            spreadsheet_id = %spreadsheet_id,
            worksheet = %worksheet,
            "Resolved order spreadsheet"
        );

        let target = SheetTarget {
            spreadsheet_id,
            worksheet,
        };
        *self.inner.target.write().await = Some(target.clone());
        Ok(target)
    }

    #[instrument(skip(self))]
    async fn find_spreadsheet(&self, name: &str) -> Result<String, StoreError> {
        let mut url = endpoint(DRIVE_FILES_API, &[])?;
        url.query_pairs_mut()
            .append_pair("q", &drive_name_query(name))
            .append_pair("fields", "files(id,name)")
            .append_pair("pageSize", "1")
            .append_pair("supportsAllDrives", "true")
            .append_pair("includeItemsFromAllDrives", "true");

        let list: DriveFileList = self
            .send(self.inner.client.get(url))
            .await?
            .json()
            .await?;

        list.files
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or_else(|| StoreError::SheetNotFound(name.to_string()))
    }

    #[instrument(skip(self))]
    async fn first_worksheet(&self, spreadsheet_id: &str) -> Result<String, StoreError> {
        let mut url = endpoint(SHEETS_API, &[spreadsheet_id])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");

        let meta: SpreadsheetMeta = self
            .send(self.inner.client.get(url))
            .await?
            .json()
            .await?;

        meta.sheets
            .into_iter()
            .next()
            .map(|sheet| sheet.properties.title)
            .ok_or_else(|| StoreError::SheetNotFound(format!("{spreadsheet_id} has no worksheets")))
    }
}

#[async_trait]
impl RecordStore for GoogleSheetsStore {
    fn describe(&self) -> String {
        self.inner.locator.to_string()
    }

    #[instrument(skip(self), fields(sheet = %self.inner.locator))]
    async fn fetch(&self) -> Result<Vec<Order>, StoreError> {
        let target = self.target().await?;
        let mut url = endpoint(
            SHEETS_API,
            &[
                target.spreadsheet_id.as_str(),
                "values",
                worksheet_range(&target.worksheet).as_str(),
            ],
        )?;
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");

        let range: ValueRange = self
            .send(self.inner.client.get(url))
            .await?
            .json()
            .await?;

        tracing::debug!(rows = range.values.len(), "Fetched worksheet values");
        codec::decode_table(&range.values)
    }

    #[instrument(skip(self, orders), fields(sheet = %self.inner.locator, count = orders.len()))]
    async fn replace_all(&self, orders: &[Order]) -> Result<(), StoreError> {
        let target = self.target().await?;
        let range = worksheet_range(&target.worksheet);

        let clear_url = endpoint(
            SHEETS_API,
            &[
                target.spreadsheet_id.as_str(),
                "values",
                format!("{range}:clear").as_str(),
            ],
        )?;
        self.send(self.inner.client.post(clear_url).json(&json!({})))
            .await?;

        let mut values = Vec::with_capacity(orders.len() + 1);
        values.push(codec::header_row());
        values.extend(orders.iter().map(codec::order_to_row));

        let start = format!("{range}!A1");
        let mut update_url = endpoint(
            SHEETS_API,
            &[target.spreadsheet_id.as_str(), "values", start.as_str()],
        )?;
        update_url
            .query_pairs_mut()
            .append_pair("valueInputOption", "RAW");
        self.send(self.inner.client.put(update_url).json(&json!({
            "range": start,
            "majorDimension": "ROWS",
            "values": values,
        })))
        .await?;

        tracing::info!("Replaced worksheet contents");
        Ok(())
    }
}

/// Build an API URL from a base and path segments (each percent-encoded).
fn endpoint(base: &str, segments: &[&str]) -> Result<Url, StoreError> {
    let mut url = Url::parse(base)
        .map_err(|e| StoreError::Unavailable(format!("invalid endpoint {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| StoreError::Unavailable(format!("endpoint {base} cannot take a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// A1 range covering a whole worksheet, quoting the title.
fn worksheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Drive query matching a non-trashed spreadsheet with this exact title.
fn drive_name_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{escaped}' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false"
    )
}

/// Map a non-success status to a store error.
fn status_error(status: StatusCode, retry_after: Option<&str>, body: &str) -> StoreError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => StoreError::RateLimited(
            retry_after
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        ),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::Authentication(format!("{status}: {}", excerpt(body)))
        }
        StatusCode::NOT_FOUND => StoreError::SheetNotFound(excerpt(body)),
        _ => StoreError::Api {
            status: status.as_u16(),
            message: excerpt(body),
        },
    }
}

/// First part of an error body, for messages.
pub(crate) fn excerpt(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", trimmed.get(..cut).unwrap_or(trimmed)),
        None => trimmed.to_string(),
    }
}
