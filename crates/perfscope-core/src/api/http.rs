//! HTTP binding of the trace service

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::TraceService;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::models::{
    Device, NewQuery, PollLocation, PollResponse, QueryDefinition, StartedTrace, TraceReadiness,
};

/// Trace service reached over its REST API
#[derive(Debug, Clone)]
pub struct HttpTraceService {
    client: Client,
    base: Url,
}

impl HttpTraceService {
    /// Create a client for the configured base URL
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {e}")))?;

        // Url::join treats the last segment as a file unless the base ends with '/'
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .map_err(|e| Error::config(format!("api.base_url '{}': {e}", config.base_url)))?;

        Ok(Self { client, base })
    }

    /// Base URL every endpoint is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::config(format!("invalid endpoint '{path}': {e}")))
    }

    /// Resolve a poll location the way an HTTP `Location` header is resolved
    pub fn resolve_location(&self, location: &PollLocation) -> Result<Url> {
        self.base
            .join(location.as_str())
            .map_err(|e| Error::transport(format!("invalid poll location '{location}': {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct DevicesBody {
    devices: Vec<Device>,
}

#[derive(Debug, Serialize)]
struct StartTraceBody<'a> {
    device_id: &'a str,
}

#[derive(Debug, Serialize)]
struct RunQueryBody<'a> {
    trace_id: &'a str,
    query_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct RunQueryAccepted {
    poll_location: String,
}

#[derive(Debug, Deserialize)]
struct TraceStatusBody {
    status: TraceReadiness,
}

/// Turn a non-success response into `Error::Remote`, keeping the service's `detail`
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("detail").cloned())
        .map(|d| match d {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or(body);

    Err(Error::remote(status.as_u16(), detail))
}

async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| Error::transport(format!("unexpected response body: {e}")))
}

#[async_trait]
impl TraceService for HttpTraceService {
    async fn list_devices(&self) -> Result<Vec<Device>> {
        let url = self.endpoint("devices")?;
        debug!(%url, "Listing devices");
        let response = check(self.client.get(url).send().await?).await?;
        let body: DevicesBody = decode(response).await?;
        Ok(body.devices)
    }

    async fn list_queries(&self) -> Result<Vec<QueryDefinition>> {
        let url = self.endpoint("queries")?;
        debug!(%url, "Listing queries");
        let response = check(self.client.get(url).send().await?).await?;
        decode(response).await
    }

    async fn add_query(&self, query: &NewQuery) -> Result<()> {
        let url = self.endpoint("queries")?;
        debug!(%url, name = %query.name, "Adding query");
        check(self.client.post(url).json(query).send().await?).await?;
        Ok(())
    }

    async fn delete_query(&self, id: &str) -> Result<()> {
        let mut url = self.endpoint("queries")?;
        url.path_segments_mut()
            .map_err(|()| Error::config("api.base_url cannot carry a path"))?
            .pop_if_empty()
            .push(id);
        debug!(%url, "Deleting query");
        check(self.client.delete(url).send().await?).await?;
        Ok(())
    }

    async fn start_trace(&self, device: &Device) -> Result<StartedTrace> {
        let url = self.endpoint("traces/start")?;
        debug!(%url, %device, "Starting trace");
        let body = StartTraceBody {
            device_id: device.as_str(),
        };
        let response = check(self.client.post(url).json(&body).send().await?).await?;
        decode(response).await
    }

    async fn execute_query(&self, trace_id: &str, query_id: &str) -> Result<PollLocation> {
        let url = self.endpoint("queries/run")?;
        debug!(%url, trace_id, query_id, "Submitting query");
        let body = RunQueryBody {
            trace_id,
            query_key: query_id,
        };
        let response = check(self.client.post(url).json(&body).send().await?).await?;

        let from_header = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if let Some(location) = from_header {
            return Ok(PollLocation::new(location));
        }

        let accepted: RunQueryAccepted = decode(response).await?;
        Ok(PollLocation::new(accepted.poll_location))
    }

    async fn poll_result(&self, location: &PollLocation) -> Result<PollResponse> {
        let url = self.resolve_location(location)?;
        debug!(%url, "Polling query result");
        let response = check(self.client.get(url).send().await?).await?;
        decode(response).await
    }

    async fn trace_status(&self, trace_id: &str) -> Result<TraceReadiness> {
        let mut url = self.endpoint("traces")?;
        url.path_segments_mut()
            .map_err(|()| Error::config("api.base_url cannot carry a path"))?
            .pop_if_empty()
            .push(trace_id)
            .push("status");
        let response = check(self.client.get(url).send().await?).await?;
        let body: TraceStatusBody = decode(response).await?;
        Ok(body.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base: &str) -> HttpTraceService {
        let config = ApiConfig {
            base_url: base.to_string(),
            ..ApiConfig::default()
        };
        HttpTraceService::new(&config).unwrap()
    }

    #[test]
    fn test_base_gets_trailing_slash() {
        let svc = service("http://localhost:8000/api");
        assert_eq!(svc.base_url().as_str(), "http://localhost:8000/api/");
        assert_eq!(
            svc.endpoint("traces/start").unwrap().as_str(),
            "http://localhost:8000/api/traces/start"
        );
    }

    #[test]
    fn test_poll_location_resolution() {
        let svc = service("http://localhost:8000/api");
        let relative = svc.resolve_location(&PollLocation::new("jobs/j1")).unwrap();
        assert_eq!(relative.as_str(), "http://localhost:8000/api/jobs/j1");

        let rooted = svc.resolve_location(&PollLocation::new("/poll/j1")).unwrap();
        assert_eq!(rooted.as_str(), "http://localhost:8000/poll/j1");

        let absolute = svc
            .resolve_location(&PollLocation::new("http://worker:9000/poll/j1"))
            .unwrap();
        assert_eq!(absolute.as_str(), "http://worker:9000/poll/j1");
    }
}
