use crate::io::client::{parse_band_matrix, parse_region_table, ImageCollectionService, RegionTable};
use crate::io::expression::{self, Expression};
use crate::types::{CollectionQuery, EarthDataError, EarthDataResult, GeoPoint, Rectangle};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Public Earth Engine REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://earthengine.googleapis.com";

/// HTTP options for [`RestClient`]
#[derive(Debug, Clone)]
pub struct RestClientOptions {
    /// Service root, without the `/v1` suffix
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for RestClientOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(300), // sampleRectangle on large regions is slow
            user_agent: format!("earthdata/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Serialize)]
struct ComputeRequest<'a> {
    expression: &'a Expression,
}

#[derive(Deserialize)]
struct ComputeResponse {
    result: Value,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ServiceErrorBody,
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Blocking client for the Earth Engine `value:compute` endpoint.
///
/// Holds an OAuth bearer token obtained outside this crate. Requests are not
/// retried; any failure is returned to the caller.
pub struct RestClient {
    client: reqwest::blocking::Client,
    compute_url: String,
    access_token: String,
}

impl RestClient {
    pub fn new(project: &str, access_token: &str, options: RestClientOptions) -> EarthDataResult<Self> {
        if project.is_empty() {
            return Err(EarthDataError::InvalidInput(
                "a cloud project id is required".to_string(),
            ));
        }
        if access_token.is_empty() {
            return Err(EarthDataError::InvalidInput(
                "an access token is required".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .build()?;

        let compute_url = compute_url(&options.endpoint, project);
        log::info!("Image collection service: {}", compute_url);

        Ok(Self {
            client,
            compute_url,
            access_token: access_token.to_string(),
        })
    }

    /// Evaluate `expression` and return its JSON result
    pub fn compute_value(&self, expression: &Expression) -> EarthDataResult<Value> {
        log::debug!(
            "Computing expression with {} nodes (result {})",
            expression.values.len(),
            expression.result
        );

        let response = self
            .client
            .post(&self.compute_url)
            .bearer_auth(&self.access_token)
            .json(&ComputeRequest { expression })
            .send()?;

        let status = response.status().as_u16();
        let body = response.text()?;
        parse_compute_response(status, &body)
    }
}

impl ImageCollectionService for RestClient {
    fn get_region(
        &self,
        query: &CollectionQuery,
        point: &GeoPoint,
        scale: f64,
    ) -> EarthDataResult<RegionTable> {
        log::info!(
            "Listing observations of {} ({}) at ({}, {})",
            query.dataset,
            query.band,
            point.lon,
            point.lat
        );
        let value = self.compute_value(&expression::get_region(query, point, scale))?;
        parse_region_table(value)
    }

    fn sample_rectangle(
        &self,
        query: &CollectionQuery,
        date: NaiveDate,
        region: &Rectangle,
    ) -> EarthDataResult<Vec<Vec<f64>>> {
        log::debug!("Sampling {} on {} over {:?}", query.band, date, region);
        let value = self.compute_value(&expression::sample_rectangle(query, date, region))?;
        parse_band_matrix(value)
    }
}

fn compute_url(endpoint: &str, project: &str) -> String {
    format!(
        "{}/v1/projects/{}/value:compute",
        endpoint.trim_end_matches('/'),
        project
    )
}

/// Decode a `value:compute` reply into its `result`
fn parse_compute_response(http_status: u16, body: &str) -> EarthDataResult<Value> {
    if !(200..300).contains(&http_status) {
        return Err(service_error(http_status, body));
    }

    let parsed: ComputeResponse = serde_json::from_str(body)?;
    Ok(parsed.result)
}

/// Map an unsuccessful response to an error, keeping the service's message when present
fn service_error(http_status: u16, body: &str) -> EarthDataError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => EarthDataError::Service {
            code: envelope.error.code,
            status: envelope.error.status,
            message: envelope.error.message,
        },
        Err(_) => EarthDataError::Service {
            code: http_status,
            status: String::new(),
            message: body.trim().to_string(),
        },
    }
}
