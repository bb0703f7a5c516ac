use crate::error::{Result, ScanError};
use crate::query::QuerySpec;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

const ACCEPT_JSON: &str = "application/json;odata=nometadata";

/// Connection settings for [`SiteClient`]
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Tenant root used to resolve server-relative URLs
    pub base_url: Option<String>,
    /// Pre-issued bearer token, attached verbatim
    pub access_token: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            access_token: None,
            timeout_secs: 30,
            user_agent: format!("SiteWarden/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Thin wrapper over the platform's `/_api/` REST surface
#[derive(Clone)]
pub struct SiteClient {
    client: Client,
    base_url: Option<Url>,
    access_token: Option<String>,
}

impl SiteClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let timeout_secs = settings.timeout_secs.max(1);
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        let base_url = settings
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(|b| {
                Url::parse(b).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", b, e)))
            })
            .transpose()?;

        Ok(Self {
            client,
            base_url,
            access_token: settings.access_token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Resolve a site URL. Absolute URLs are used as given, server-relative
    /// ones are joined onto the configured tenant URL.
    pub fn resolve(&self, site_url: &str) -> Result<Url> {
        let site_url = site_url.trim();
        if site_url.is_empty() {
            return Err(ScanError::InvalidUrl("empty site URL".to_string()));
        }

        if let Ok(url) = Url::parse(site_url) {
            return match url.scheme() {
                "http" | "https" => Ok(url),
                other => Err(ScanError::InvalidUrl(format!(
                    "{}: unsupported scheme '{}'",
                    site_url, other
                ))),
            };
        }

        let base = self.base_url.as_ref().ok_or_else(|| {
            ScanError::InvalidUrl(format!(
                "{}: relative URL but no tenant URL is configured",
                site_url
            ))
        })?;

        base.join(site_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", site_url, e)))
    }

    /// `<site>/_api/<path>`
    pub fn api_url(&self, site_url: &str, path: &str) -> Result<Url> {
        let site = self.resolve(site_url)?;
        let mut raw = site.as_str().split(['?', '#']).next().unwrap_or_default().to_string();
        while raw.ends_with('/') {
            raw.pop();
        }
        let full = format!("{}/_api/{}", raw, path.trim_start_matches('/'));
        Url::parse(&full).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", full, e)))
    }

    /// GET an API path and decode the JSON body
    pub async fn get_json(&self, site_url: &str, path: &str, query: &QuerySpec) -> Result<Value> {
        let mut url = self.api_url(site_url, path)?;
        query.apply(&mut url);

        debug!("GET {}", url);
        let start = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .headers(self.headers())
            .send()
            .await?;
        let response = check_status(&url, response)?;
        let body = response.json::<Value>().await?;
        debug!("GET {} took {:?}", url, start.elapsed());

        Ok(body)
    }

    /// Query the web at `site_url`
    pub async fn get_web(&self, site_url: &str, query: &QuerySpec) -> Result<Value> {
        self.get_json(site_url, "web", query).await
    }

    /// Run a search query scoped by the caller and flatten the result table
    /// into one map per hit, keyed by managed property name.
    pub async fn search(
        &self,
        site_url: &str,
        query_text: &str,
        select_properties: &[&str],
        row_limit: u32,
    ) -> Result<Vec<Map<String, Value>>> {
        let mut url = self.api_url(site_url, "search/query")?;
        url.query_pairs_mut()
            .append_pair("querytext", &quote(query_text))
            .append_pair("selectproperties", &quote(&select_properties.join(",")))
            .append_pair("rowlimit", &row_limit.to_string());

        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .headers(self.headers())
            .send()
            .await?;
        let body: Value = check_status(&url, response)?.json().await?;

        let rows = body
            .pointer("/PrimaryQueryResult/RelevantResults/Table/Rows")
            .or_else(|| body.pointer("/d/query/PrimaryQueryResult/RelevantResults/Table/Rows/results"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(rows.iter().map(flatten_search_row).collect())
    }

    /// Request digest required by mutating calls
    pub async fn form_digest(&self, site_url: &str) -> Result<String> {
        let url = self.api_url(site_url, "contextinfo")?;
        let response = self
            .client
            .post(url.clone())
            .headers(self.headers())
            .send()
            .await?;
        let body: Value = check_status(&url, response)?.json().await?;

        body.get("FormDigestValue")
            .or_else(|| body.pointer("/d/GetContextWebInformation/FormDigestValue"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ScanError::ParseError(format!("no FormDigestValue from {}", url)))
    }

    /// Issue one mutating POST. `method` becomes the `X-HTTP-Method`
    /// override (e.g. `DELETE`). Never retried.
    pub async fn post_action(&self, site_url: &str, path: &str, method: Option<&str>) -> Result<()> {
        let digest = self.form_digest(site_url).await?;
        let url = self.api_url(site_url, path)?;

        let mut headers = self.headers();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(ACCEPT_JSON));
        headers.insert("if-match", HeaderValue::from_static("*"));
        headers.insert(
            "x-requestdigest",
            HeaderValue::from_str(&digest)
                .map_err(|e| ScanError::ParseError(format!("invalid digest: {}", e)))?,
        );
        if let Some(method) = method {
            headers.insert(
                "x-http-method",
                HeaderValue::from_str(method)
                    .map_err(|e| ScanError::Other(format!("invalid method override: {}", e)))?,
            );
        }

        info!("POST {} ({})", url, method.unwrap_or("POST"));
        let response = self.client.post(url.clone()).headers(headers).send().await?;
        check_status(&url, response)?;
        Ok(())
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
        if let Some(token) = &self.access_token
            && let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token))
        {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }
}

fn check_status(url: &Url, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ScanError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Search parameters are passed as quoted string literals
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn flatten_search_row(row: &Value) -> Map<String, Value> {
    let cells = row
        .get("Cells")
        .map(|cells| match cells {
            Value::Object(obj) => obj.get("results").cloned().unwrap_or(Value::Null),
            other => other.clone(),
        })
        .and_then(|cells| cells.as_array().cloned())
        .unwrap_or_default();

    cells
        .iter()
        .filter_map(|cell| {
            let key = cell.get("Key")?.as_str()?.to_string();
            let value = cell.get("Value").cloned().unwrap_or(Value::Null);
            Some((key, value))
        })
        .collect()
}
