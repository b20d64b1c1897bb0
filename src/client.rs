use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::FetchError;

const SEARCH_PATH: &str = "/search.aspx";
const PEAK_PATH: &str = "/peak.aspx";
const PEAK_ASCENTS_PATH: &str = "/climber/PeakAscents.aspx";
const ASCENT_PATH: &str = "/climber/ascent.aspx";

/// Page fetcher for peakbagger.com. Requests are serialized and spaced at
/// least `rate_limit` seconds apart.
pub struct Client {
    http: reqwest::Client,
    settings: Settings,
    last_request: Mutex<Option<Instant>>,
}

impl Client {
    pub fn new(settings: Settings) -> Result<Self, FetchError> {
        if reqwest::Url::parse(&settings.base_url).is_err() {
            return Err(FetchError::BaseUrl(settings.base_url));
        }
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout())
            .build()?;
        Ok(Client {
            http,
            settings,
            last_request: Mutex::new(None),
        })
    }

    pub async fn search(&self, query: &str) -> Result<String, FetchError> {
        self.get(SEARCH_PATH, &[("ss", query), ("tid", "M")]).await
    }

    pub async fn peak(&self, pid: &str) -> Result<String, FetchError> {
        self.get(PEAK_PATH, &[("pid", pid)]).await
    }

    pub async fn peak_ascents(&self, pid: &str) -> Result<String, FetchError> {
        self.get(
            PEAK_ASCENTS_PATH,
            &[("pid", pid), ("sort", "ascentdate"), ("u", "ft"), ("y", "9999")],
        )
        .await
    }

    pub async fn ascent(&self, aid: &str) -> Result<String, FetchError> {
        self.get(ASCENT_PATH, &[("aid", aid)]).await
    }

    /// GET a site-relative path (or absolute URL) and return the body.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String, FetchError> {
        let url = self.url_for(path);

        // Held across the request so concurrent callers queue up.
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let wait = self.settings.request_interval().saturating_sub(prev.elapsed());
            if !wait.is_zero() {
                debug!(wait_ms = wait.as_millis() as u64, "rate limit");
                tokio::time::sleep(wait).await;
            }
        }

        info!(%url, ?query, "GET");
        let started = Instant::now();
        let result = self.http.get(&url).query(query).send().await;
        *last = Some(Instant::now());
        let response = result?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        debug!(
            %url,
            bytes = body.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "fetched"
        );
        Ok(body)
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.settings.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        }
    }
}
