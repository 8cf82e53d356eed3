//! Smartsheet HTTP client with retry / backoff / error classification.

use std::thread;
use std::time::Duration;

use serde::de::DeserializeOwned;

use scm_recon::{ReconError, SheetRef, SheetSource, Table, WorkspaceRef};

use crate::wire::{Container, Listing, Named, Sheet};

pub const DEFAULT_API_BASE: &str = "https://api.smartsheet.com/2.0";

const MAX_RETRIES: u32 = 3;
const USER_AGENT: &str = concat!("scm/", env!("CARGO_PKG_VERSION"));

/// Smartsheet API client (blocking).
#[derive(Clone)]
pub struct SmartsheetClient {
    http: reqwest::blocking::Client,
    api_base: String,
    token: String,
    backoff_base: Duration,
}

/// Error type for Smartsheet operations.
#[derive(Debug)]
pub enum SmartsheetError {
    /// No access token configured
    NotAuthenticated,
    /// Network error (connect, timeout, TLS)
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// Still rate limited after retries
    RateLimited,
    /// JSON parsing error
    Parse(String),
    /// Workspace or sheet does not exist (or is not shared with the token)
    NotFound(String),
}

impl SmartsheetError {
    /// The token was rejected (401/403).
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, SmartsheetError::Http(401 | 403, _))
    }
}

impl std::fmt::Display for SmartsheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmartsheetError::NotAuthenticated => write!(f, "No Smartsheet access token provided"),
            SmartsheetError::Network(msg) => write!(f, "Network error: {}", msg),
            SmartsheetError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            SmartsheetError::RateLimited => {
                write!(f, "Smartsheet rate limited after {} attempts", MAX_RETRIES + 1)
            }
            SmartsheetError::Parse(msg) => write!(f, "Parse error: {}", msg),
            SmartsheetError::NotFound(what) => write!(f, "Not found: {}", what),
        }
    }
}

impl std::error::Error for SmartsheetError {}

impl From<SmartsheetError> for ReconError {
    fn from(e: SmartsheetError) -> Self {
        ReconError::RemoteAccess(e.to_string())
    }
}

/// Smartsheet error bodies look like `{"errorCode": 1002, "message": "..."}`.
fn error_message(body: &serde_json::Value, status: u16) -> String {
    match (body["errorCode"].as_i64(), body["message"].as_str()) {
        (Some(code), Some(msg)) => format!("{} (error {})", msg, code),
        (None, Some(msg)) => msg.to_string(),
        _ => format!("HTTP {}", status),
    }
}

impl SmartsheetClient {
    pub fn new(token: &str) -> Result<Self, SmartsheetError> {
        Self::with_base_url(token, DEFAULT_API_BASE)
    }

    /// Client against another API root (region endpoints, tests).
    pub fn with_base_url(token: &str, api_base: &str) -> Result<Self, SmartsheetError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SmartsheetError::NotAuthenticated);
        }

        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SmartsheetError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            backoff_base: Duration::from_secs(1),
        })
    }

    #[cfg(test)]
    fn without_backoff(mut self) -> Self {
        self.backoff_base = Duration::ZERO;
        self
    }

    /// Workspaces whose name contains `query` (case-insensitive), in API order.
    pub fn list_workspaces(&self, query: &str) -> Result<Vec<WorkspaceRef>, SmartsheetError> {
        let url = format!("{}/workspaces?includeAll=true", self.api_base);
        let listing: Listing<Named> = self.get_json(&url, "workspaces")?;
        let query = query.trim().to_lowercase();

        Ok(listing
            .data
            .into_iter()
            .filter(|w| w.name.to_lowercase().contains(&query))
            .map(WorkspaceRef::from)
            .collect())
    }

    /// Every sheet in a workspace, including sheets inside folders.
    pub fn list_sheets(&self, workspace: &WorkspaceRef) -> Result<Vec<SheetRef>, SmartsheetError> {
        let url = format!("{}/workspaces/{}?loadAll=true", self.api_base, workspace.id);
        let container: Container =
            self.get_json(&url, &format!("workspace '{}'", workspace.name))?;
        Ok(container.flatten())
    }

    /// All rows of a sheet as a table named after the sheet.
    pub fn get_sheet(&self, sheet: &SheetRef) -> Result<Table, SmartsheetError> {
        let url = format!("{}/sheets/{}", self.api_base, sheet.id);
        let body: Sheet = self.get_json(&url, &format!("sheet '{}'", sheet.name))?;
        let table = body.into_table(&sheet.name);
        log::debug!(
            "sheet '{}': {} column(s), {} row(s)",
            table.name,
            table.headers.len(),
            table.rows.len()
        );
        Ok(table)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, SmartsheetError> {
        let body = self.get_with_retry(url, what)?;
        serde_json::from_value(body)
            .map_err(|e| SmartsheetError::Parse(format!("{}: {}", what, e)))
    }

    /// GET with retry + exponential backoff. 429 and 5xx are retried (429
    /// honours Retry-After), other 4xx fail immediately.
    fn get_with_retry(&self, url: &str, what: &str) -> Result<serde_json::Value, SmartsheetError> {
        let mut backoff = self.backoff_base;

        for attempt in 0..=MAX_RETRIES {
            let result = self.http.get(url).bearer_auth(&self.token).send();

            let resp = match result {
                Ok(resp) => resp,
                Err(e) => {
                    if attempt == MAX_RETRIES {
                        return Err(SmartsheetError::Network(e.to_string()));
                    }
                    log::warn!(
                        "retry {}/{} in {:?} ({})",
                        attempt + 1,
                        MAX_RETRIES,
                        backoff,
                        e
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                    continue;
                }
            };

            let status = resp.status().as_u16();

            if status == 429 || status >= 500 {
                if attempt == MAX_RETRIES {
                    if status == 429 {
                        return Err(SmartsheetError::RateLimited);
                    }
                    let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
                    return Err(SmartsheetError::Http(status, error_message(&body, status)));
                }

                let wait = if status == 429 {
                    resp.headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .map(Duration::from_secs)
                        .unwrap_or(backoff)
                } else {
                    backoff
                };

                log::warn!(
                    "retry {}/{} in {:?} (HTTP {})",
                    attempt + 1,
                    MAX_RETRIES,
                    wait,
                    status
                );
                thread::sleep(wait);
                backoff *= 2;
                continue;
            }

            if status == 404 {
                return Err(SmartsheetError::NotFound(what.to_string()));
            }

            if status >= 400 {
                let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
                return Err(SmartsheetError::Http(status, error_message(&body, status)));
            }

            let text = resp
                .text()
                .map_err(|e| SmartsheetError::Network(format!("reading {}: {}", what, e)))?;
            return serde_json::from_str(text.trim_start_matches('\u{feff}')).map_err(|e| {
                SmartsheetError::Parse(format!(
                    "{}: {} (body: {})",
                    what,
                    e,
                    text.chars().take(200).collect::<String>()
                ))
            });
        }

        Err(SmartsheetError::Network(format!("{}: retries exhausted", what)))
    }
}

impl SheetSource for SmartsheetClient {
    fn list_workspaces(&self, query: &str) -> Result<Vec<WorkspaceRef>, ReconError> {
        Ok(SmartsheetClient::list_workspaces(self, query)?)
    }

    fn list_sheets(&self, workspace: &WorkspaceRef) -> Result<Vec<SheetRef>, ReconError> {
        Ok(SmartsheetClient::list_sheets(self, workspace)?)
    }

    fn get_rows(&self, sheet: &SheetRef) -> Result<Table, ReconError> {
        Ok(self.get_sheet(sheet)?)
    }
}
