//! Holiday calendar HTTP client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::HolidayConfig;
use crate::error::{AppError, Result};
use crate::store::HolidaySource;

/// One day as returned by the holiday API.
///
/// `month` is `YYYYMM` and `date` is `YYYYMMDD`, both as integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayDay {
    pub year: i64,
    pub month: i64,
    pub date: i64,
    pub week: u8,
    /// 1 = workday, 2 = rest day
    pub workday: u8,
}

#[derive(Debug, Deserialize)]
struct HolidayResponse {
    code: i32,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: HolidayPage,
}

#[derive(Debug, Default, Deserialize)]
struct HolidayPage {
    #[serde(default)]
    list: Vec<HolidayDay>,
    #[serde(default)]
    total: u32,
}

/// Holiday API client.
///
/// Requests carry an explicit timeout and are never retried.
pub struct HolidayClient {
    client: Client,
    base_url: String,
}

impl HolidayClient {
    /// Create a new client from config.
    pub fn new(config: &HolidayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    /// Download the day list of a year.
    pub async fn fetch_year(&self, year: i32, size: u32) -> Result<Vec<HolidayDay>> {
        debug!("Fetching holiday calendar for {year} from {}", self.base_url);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("year", year.to_string()), ("size", size.to_string())])
            .send()
            .await
            .map_err(|e| {
                error!("Holiday API request failed: {e}");
                AppError::upstream(format!("Holiday API unreachable: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Holiday API returned HTTP {status}");
            return Err(AppError::upstream(format!("Holiday API returned HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::upstream(format!("Failed to read holiday API body: {e}")))?;

        parse_response(&body)
    }
}

/// Decode a holiday API body, rejecting non-zero codes.
fn parse_response(body: &str) -> Result<Vec<HolidayDay>> {
    let response: HolidayResponse = serde_json::from_str(body).map_err(|e| {
        error!("Undecodable holiday API body: {e}");
        AppError::upstream(format!("Invalid holiday API response: {e}"))
    })?;

    if response.code != 0 {
        error!("Holiday API failed with code {}: {}", response.code, response.msg);
        return Err(AppError::upstream(format!(
            "Holiday API returned code {}: {}",
            response.code, response.msg
        )));
    }

    debug!(
        "Holiday API returned {} of {} days",
        response.data.list.len(),
        response.data.total
    );
    Ok(response.data.list)
}

#[async_trait]
impl HolidaySource for HolidayClient {
    async fn fetch(&self, year: i32, max_days: u32) -> Result<Vec<HolidayDay>> {
        self.fetch_year(year, max_days).await
    }
}
