use crate::error::{Result, ScanError};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::debug;

/// HTTP capability used by the analyzer: one full page fetch plus cheap existence probes.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `url` and return the body. Anything other than 200 is a `FetchStatus` error.
    async fn fetch_page(&self, url: &str) -> Result<String>;

    /// HEAD `url` within `timeout` and return the response status.
    async fn probe(&self, url: &str, timeout: Duration) -> Result<u16>;
}

/// Redirect policy that follows at most `max_redirects` hops and then hands back the
/// last response instead of failing.
pub fn redirect_policy(max_redirects: usize) -> Policy {
    Policy::custom(move |attempt| {
        // previous() holds the original request plus every hop already followed
        if attempt.previous().len() > max_redirects {
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration, max_redirects: usize) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                "pagescope/",
                env!("CARGO_PKG_VERSION"),
                " (https://github.com/trapdoorsec/pagescope)"
            ))
            .timeout(timeout)
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(redirect_policy(max_redirects))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(ScanError::FetchStatus(status));
        }

        Ok(response.text().await?)
    }

    async fn probe(&self, url: &str, timeout: Duration) -> Result<u16> {
        let response = self.client.head(url).timeout(timeout).send().await?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn client(max_redirects: usize) -> ReqwestClient {
        ReqwestClient::new(Duration::from_secs(5), max_redirects).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_page_returns_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&mock_server)
            .await;

        let body = client(5).fetch_page(&mock_server.uri()).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_page_rejects_non_200() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/created"))
            .respond_with(ResponseTemplate::new(201).set_body_string("made"))
            .mount(&mock_server)
            .await;

        let missing = client(5)
            .fetch_page(&format!("{}/missing", mock_server.uri()))
            .await;
        assert!(matches!(missing, Err(ScanError::FetchStatus(404))));

        let created = client(5)
            .fetch_page(&format!("{}/created", mock_server.uri()))
            .await;
        assert!(matches!(created, Err(ScanError::FetchStatus(201))));
    }

    #[tokio::test]
    async fn test_redirect_ceiling_returns_last_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved here"))
            .mount(&mock_server)
            .await;

        let url = format!("{}/old", mock_server.uri());

        let capped = client(0).fetch_page(&url).await;
        assert!(matches!(capped, Err(ScanError::FetchStatus(302))));

        let followed = client(1).fetch_page(&url).await.unwrap();
        assert_eq!(followed, "moved here");
    }

    #[tokio::test]
    async fn test_probe_reports_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/alive"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let client = client(5);
        let alive = client
            .probe(
                &format!("{}/alive", mock_server.uri()),
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert_eq!(alive, 204);

        let missing = client
            .probe(
                &format!("{}/gone", mock_server.uri()),
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert_eq!(missing, 404);
    }

    #[tokio::test]
    async fn test_probe_malformed_url_is_error() {
        let result = client(5)
            .probe("not a url", Duration::from_secs(1))
            .await;
        assert!(result.is_err());
    }
}
