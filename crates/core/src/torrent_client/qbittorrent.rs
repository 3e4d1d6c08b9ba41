//! qBittorrent Web API v2 client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::QBittorrentConfig;

use super::retry::with_retry;
use super::{AddTorrentRequest, DaemonState, DaemonTorrent, Session, TorrentClient, TorrentClientError};

/// qBittorrent reports this ETA for torrents that will never finish.
const ETA_INFINITY: i64 = 8_640_000;

/// qBittorrent client implementation.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client.
    pub fn new(config: QBittorrentConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| TorrentClientError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    fn with_session(request: RequestBuilder, session: &Session) -> RequestBuilder {
        match session.cookie() {
            Some(sid) => request.header(COOKIE, format!("SID={sid}")),
            None => request,
        }
    }

    async fn login_once(&self) -> Result<Session, TorrentClientError> {
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(self.endpoint("/api/v2/auth/login"))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(TorrentClientError::Unavailable(status.as_u16()));
        }

        let sid = extract_sid(&response);
        let body = response.text().await.unwrap_or_default();

        if body.trim() == "Ok." {
            debug!("qBittorrent login successful");
            Ok(sid.map(Session::new).unwrap_or_else(Session::anonymous))
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    async fn list_once(&self, session: &Session) -> Result<Vec<DaemonTorrent>, TorrentClientError> {
        let request = self.client.get(self.endpoint("/api/v2/torrents/info"));
        let response = Self::with_session(request, session).send().await?;
        let response = check_status(response)?;

        let infos: Vec<QBTorrentInfo> = response
            .json()
            .await
            .map_err(|e| TorrentClientError::ApiError(format!("invalid torrent listing: {e}")))?;

        Ok(infos.into_iter().map(QBTorrentInfo::into_daemon_torrent).collect())
    }

    async fn post_form(
        &self,
        session: &Session,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TorrentClientError> {
        let request = self.client.post(self.endpoint(path)).form(params);
        let response = Self::with_session(request, session).send().await?;
        let response = check_status(response)?;

        response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }
}

fn check_status(response: Response) -> Result<Response, TorrentClientError> {
    let status = response.status();
    if status.is_server_error() {
        Err(TorrentClientError::Unavailable(status.as_u16()))
    } else if status.as_u16() == 403 {
        Err(TorrentClientError::AuthenticationFailed(
            "session rejected".to_string(),
        ))
    } else if !status.is_success() {
        Err(TorrentClientError::ApiError(format!("HTTP {}", status)))
    } else {
        Ok(response)
    }
}

/// Pull the `SID` value out of the login response's cookies.
fn extract_sid(response: &Response) -> Option<String> {
    response
        .cookies()
        .find(|cookie| cookie.name() == "SID" && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_string())
}

/// qBittorrent torrent info response.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    downloaded: i64,
    #[serde(default)]
    dlspeed: i64,
    #[serde(default)]
    upspeed: i64,
    #[serde(default)]
    ratio: f64,
    #[serde(default)]
    eta: i64,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    category: String,
}

impl QBTorrentInfo {
    fn into_daemon_torrent(self) -> DaemonTorrent {
        DaemonTorrent {
            hash: self.hash.to_lowercase(),
            name: self.name,
            state: DaemonState::parse(&self.state),
            progress: self.progress.clamp(0.0, 1.0),
            downloaded_bytes: self.downloaded.max(0) as u64,
            size_bytes: self.size.max(0) as u64,
            download_speed: self.dlspeed.max(0) as u64,
            upload_speed: self.upspeed.max(0) as u64,
            eta_secs: if self.eta > 0 && self.eta < ETA_INFINITY {
                Some(self.eta as u64)
            } else {
                None
            },
            ratio: self.ratio,
            save_path: self.save_path,
            category: if self.category.is_empty() {
                None
            } else {
                Some(self.category)
            },
        }
    }
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn check_reachable(&self) -> bool {
        let result = self
            .client
            .get(self.endpoint("/api/v2/app/version"))
            .timeout(Duration::from_secs(self.config.health_timeout_secs as u64))
            .send()
            .await;

        match result {
            Ok(response) => {
                // 403 still proves the Web UI is up; it only means we are not logged in.
                let status = response.status();
                status.is_success() || status.as_u16() == 403
            }
            Err(e) => {
                debug!(error = %e, "qBittorrent health probe failed");
                false
            }
        }
    }

    async fn authenticate(&self) -> Result<Session, TorrentClientError> {
        with_retry(&self.config.retry, "login", || self.login_once()).await
    }

    async fn list_torrents(
        &self,
        session: &Session,
    ) -> Result<Vec<DaemonTorrent>, TorrentClientError> {
        with_retry(&self.config.retry, "list_torrents", || self.list_once(session)).await
    }

    async fn add_torrent(
        &self,
        session: &Session,
        request: AddTorrentRequest,
    ) -> Result<(), TorrentClientError> {
        let save_path = request
            .save_path
            .as_ref()
            .or(self.config.default_save_path.as_ref());

        let mut params: Vec<(&str, &str)> = vec![("urls", request.url.as_str())];
        if let Some(path) = save_path {
            params.push(("savepath", path.as_str()));
        }
        if let Some(category) = request.category.as_deref() {
            params.push(("category", category));
        }

        let body = self.post_form(session, "/api/v2/torrents/add", &params).await?;
        if body.trim() == "Ok." {
            debug!(url = %request.url, "Torrent added to qBittorrent");
            Ok(())
        } else {
            Err(TorrentClientError::Rejected(
                body.chars().take(100).collect(),
            ))
        }
    }

    async fn remove_torrent(
        &self,
        session: &Session,
        hash: &str,
        delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        let params = [
            ("hashes", hash),
            ("deleteFiles", if delete_files { "true" } else { "false" }),
        ];

        self.post_form(session, "/api/v2/torrents/delete", &params)
            .await?;
        debug!(hash = %hash, delete_files, "Torrent removed from qBittorrent");
        Ok(())
    }

    async fn logout(&self, session: &Session) {
        if let Err(e) = self.post_form(session, "/api/v2/auth/logout", &[]).await {
            warn!(error = %e, "qBittorrent logout failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_json(state: &str, eta: i64) -> String {
        format!(
            r#"{{
                "hash": "ABCDEF0123",
                "name": "Example.Show.S01",
                "state": "{state}",
                "progress": 1.0,
                "size": 2048,
                "downloaded": 2048,
                "dlspeed": 0,
                "upspeed": 512,
                "ratio": 0.25,
                "eta": {eta},
                "save_path": "/dl",
                "category": "",
                "num_seeds": 4
            }}"#
        )
    }

    #[test]
    fn test_info_conversion() {
        let info: QBTorrentInfo = serde_json::from_str(&info_json("stalledUP", 8_640_000)).unwrap();
        let torrent = info.into_daemon_torrent();

        assert_eq!(torrent.hash, "abcdef0123");
        assert_eq!(torrent.name, "Example.Show.S01");
        assert_eq!(torrent.state, DaemonState::StalledUploading);
        assert_eq!(torrent.size_bytes, 2048);
        assert_eq!(torrent.upload_speed, 512);
        assert_eq!(torrent.eta_secs, None);
        assert_eq!(torrent.save_path, "/dl");
        assert_eq!(torrent.category, None);
    }

    #[test]
    fn test_info_conversion_keeps_finite_eta() {
        let info: QBTorrentInfo = serde_json::from_str(&info_json("downloading", 120)).unwrap();
        let torrent = info.into_daemon_torrent();
        assert_eq!(torrent.eta_secs, Some(120));
        assert_eq!(torrent.state, DaemonState::Downloading);
    }

    #[test]
    fn test_info_conversion_unknown_state() {
        let info: QBTorrentInfo = serde_json::from_str(&info_json("brandNewState", 0)).unwrap();
        assert_eq!(info.into_daemon_torrent().state, DaemonState::Unknown);
    }

    /// Serve one canned HTTP response on a local port.
    async fn serve_once(response: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(url: String) -> QBittorrentClient {
        QBittorrentClient::new(QBittorrentConfig {
            url,
            ..QBittorrentConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_login_reads_sid_cookie() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\n\
             set-cookie: other=1; path=/\r\n\
             set-cookie: SID=abc123; HttpOnly; path=/; SameSite=Strict\r\n\
             content-length: 3\r\n\
             connection: close\r\n\r\nOk.",
        )
        .await;

        let session = client_for(url).login_once().await.unwrap();
        assert_eq!(session.cookie(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_login_without_cookie_is_anonymous() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-length: 3\r\nconnection: close\r\n\r\nOk.",
        )
        .await;

        let session = client_for(url).login_once().await.unwrap();
        assert_eq!(session.cookie(), None);
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-length: 6\r\nconnection: close\r\n\r\nFails.",
        )
        .await;

        let result = client_for(url).login_once().await;
        assert!(matches!(result, Err(TorrentClientError::AuthenticationFailed(_))));
    }

    #[test]
    fn test_base_url_trims_slash() {
        let config = QBittorrentConfig {
            url: "http://localhost:8080/".to_string(),
            ..QBittorrentConfig::default()
        };
        let client = QBittorrentClient::new(config).unwrap();
        assert_eq!(
            client.endpoint("/api/v2/app/version"),
            "http://localhost:8080/api/v2/app/version"
        );
    }

    #[tokio::test]
    async fn test_unreachable_daemon() {
        let config = QBittorrentConfig {
            url: "http://127.0.0.1:9".to_string(),
            health_timeout_secs: 1,
            ..QBittorrentConfig::default()
        };
        let client = QBittorrentClient::new(config).unwrap();
        assert!(!client.check_reachable().await);
    }
}
