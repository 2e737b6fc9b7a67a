//! WebDAV remote store
//!
//! Maps a project onto the collection `<base_url>/<project_id>/`.
//! Compatible with NextCloud, ownCloud, Apache mod_dav, rclone serve, etc.

use async_trait::async_trait;
use dsync_core::{ListingEntry, RemotePath, RemoteStore, SyncError, SyncResult};
use futures::StreamExt;
use reqwest::{header, Client, Method, StatusCode, Url};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:resourcetype/>
  </d:prop>
</d:propfind>"#;

/// WebDAV authentication method
#[derive(Debug, Clone)]
pub enum WebDavAuth {
    /// No authentication
    None,
    /// Basic authentication
    Basic { username: String, password: String },
    /// Bearer token (OAuth)
    Bearer(String),
}

/// WebDAV store configuration
#[derive(Debug, Clone)]
pub struct WebDavConfig {
    /// Server base URL (e.g., "https://cloud.example.com/remote.php/dav/files/username")
    pub base_url: String,
    pub project_id: String,
    pub auth: WebDavAuth,
}

/// WebDAV-backed remote store
pub struct WebDavStore {
    config: WebDavConfig,
    /// `<base_url>/<project_id>` without trailing slash
    project_url: String,
    /// URL path of `project_url`, used to turn hrefs back into remote paths
    project_href: String,
    http: Client,
}

impl WebDavStore {
    pub fn new(config: WebDavConfig) -> SyncResult<Self> {
        let project_url = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            urlencoding::encode(&config.project_id)
        );
        let parsed = Url::parse(&project_url)
            .map_err(|e| SyncError::Config(format!("invalid endpoint {}: {e}", config.base_url)))?;
        let project_href = decode_href(parsed.path()).trim_end_matches('/').to_string();

        Ok(Self {
            config,
            project_url,
            project_href,
            http: Client::new(),
        })
    }

    /// Build authenticated request
    fn request(&self, method: Method, path: &RemotePath) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.project_url, to_url_path(path));
        let request = self.http.request(method, &url);

        match &self.config.auth {
            WebDavAuth::None => request,
            WebDavAuth::Basic { username, password } => request.basic_auth(username, Some(password)),
            WebDavAuth::Bearer(token) => request.bearer_auth(token),
        }
    }

    /// PROPFIND with `Depth: 1` on a collection
    async fn propfind(&self, path: &RemotePath) -> SyncResult<Vec<DavResponse>> {
        let response = self
            .request(dav_method(b"PROPFIND"), path)
            .header("Depth", "1")
            .header(header::CONTENT_TYPE, "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::MULTI_STATUS {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, path, body));
        }

        let text = response.text().await.map_err(network_error)?;
        Ok(parse_multistatus(&text))
    }

    /// MKCOL every ancestor of `path`, tolerating ones that already exist.
    async fn ensure_collections(&self, path: &RemotePath) -> SyncResult<()> {
        let mut current = RemotePath::root();
        for segment in &path.segments {
            current = current.join(segment);
            let response = self
                .request(dav_method(b"MKCOL"), &current)
                .send()
                .await
                .map_err(network_error)?;

            let status = response.status();
            // 405: collection already exists
            if !status.is_success() && status != StatusCode::METHOD_NOT_ALLOWED {
                let body = response.text().await.unwrap_or_default();
                return Err(status_error(status, &current, body));
            }
        }
        Ok(())
    }

    /// Remote path for an href returned by the server
    fn href_to_remote(&self, href: &str) -> Option<RemotePath> {
        let path = match Url::parse(href) {
            Ok(url) => decode_href(url.path()),
            Err(_) => decode_href(href),
        };
        let relative = path.strip_prefix(&self.project_href)?;
        if !relative.is_empty() && !relative.starts_with('/') {
            return None;
        }
        Some(RemotePath::new(relative))
    }
}

#[async_trait]
impl RemoteStore for WebDavStore {
    fn project_id(&self) -> &str {
        &self.config.project_id
    }

    fn display_name(&self) -> &str {
        "WebDAV"
    }

    async fn list(&self, dir: &RemotePath) -> SyncResult<Vec<ListingEntry>> {
        let mut entries = vec![ListingEntry::directory(dir.to_path_string())];
        let mut pending = vec![dir.clone()];

        while let Some(collection) = pending.pop() {
            debug!("PROPFIND {}", collection);
            for response in self.propfind(&collection).await? {
                let Some(path) = self.href_to_remote(&response.href) else {
                    continue;
                };
                // The collection itself is echoed back first
                if path == collection {
                    continue;
                }
                if response.is_collection {
                    entries.push(ListingEntry::directory(path.to_path_string()));
                    pending.push(path);
                } else {
                    entries.push(ListingEntry::file(path.to_path_string()));
                }
            }
        }

        Ok(entries)
    }

    async fn get(&self, remote: &RemotePath, local: &Path) -> SyncResult<()> {
        let response = self
            .request(Method::GET, remote)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, remote, body));
        }

        let mut file = tokio::fs::File::create(local).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk.map_err(network_error)?).await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn put(&self, local: &Path, remote: &RemotePath) -> SyncResult<()> {
        let file = tokio::fs::File::open(local).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SyncError::NotFound(local.display().to_string()),
            _ => SyncError::Io(e),
        })?;
        let size = file.metadata().await?.len();

        if let Some(parent) = remote.parent() {
            self.ensure_collections(&parent).await?;
        }

        let response = self
            .request(Method::PUT, remote)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, size)
            .body(reqwest::Body::from(file))
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, remote, body));
        }
        Ok(())
    }
}

fn dav_method(name: &'static [u8]) -> Method {
    Method::from_bytes(name).unwrap_or(Method::GET)
}

/// Convert RemotePath to an encoded URL path
fn to_url_path(path: &RemotePath) -> String {
    path.segments
        .iter()
        .map(|s| urlencoding::encode(s).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn decode_href(href: &str) -> String {
    urlencoding::decode(href)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| href.to_string())
}

fn network_error(err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::Timeout
    } else {
        SyncError::Network(err.to_string())
    }
}

fn status_error(status: StatusCode, path: &RemotePath, body: String) -> SyncError {
    match status {
        StatusCode::NOT_FOUND => SyncError::NotFound(path.to_string()),
        StatusCode::UNAUTHORIZED => SyncError::AuthFailed(path.to_string()),
        StatusCode::FORBIDDEN => SyncError::PermissionDenied(path.to_string()),
        StatusCode::TOO_MANY_REQUESTS => SyncError::RateLimited { retry_after_secs: None },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => SyncError::Timeout,
        _ => SyncError::ProviderApi {
            provider: "webdav".into(),
            message: format!("{} {}: {}", status, path, body.trim()),
        },
    }
}

/// DAV response from PROPFIND
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct DavResponse {
    href: String,
    is_collection: bool,
}

/// Parse a WebDAV multistatus body, whatever namespace prefix the server uses
fn parse_multistatus(xml: &str) -> Vec<DavResponse> {
    let mut responses = Vec::new();
    let mut rest = xml;

    while let Some((_, open_end)) = find_tag(rest, "response", false) {
        let body = &rest[open_end..];
        let (block, next) = match find_tag(body, "response", true) {
            Some((close_start, close_end)) => (&body[..close_start], &body[close_end..]),
            None => (body, ""),
        };

        responses.push(DavResponse {
            href: extract_tag_content(block, "href").unwrap_or_default(),
            is_collection: find_tag(block, "collection", false).is_some(),
        });
        rest = next;
    }

    responses
}

/// Locate `<prefix:tag ...>` (or `</prefix:tag>` when `closing`).
///
/// Returns the byte offsets of the tag start and of the byte after `>`.
fn find_tag(s: &str, tag: &str, closing: bool) -> Option<(usize, usize)> {
    let mut offset = 0;
    while let Some(pos) = s[offset..].find('<') {
        let start = offset + pos;
        let inner = &s[start + 1..];
        let end = start + 1 + inner.find('>')?;
        let raw = &s[start + 1..end];

        let (is_closing, name) = match raw.strip_prefix('/') {
            Some(name) => (true, name),
            None => (false, raw),
        };
        let name = name
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");
        let local = name.rsplit(':').next().unwrap_or(name);

        if local == tag && is_closing == closing {
            return Some((start, end + 1));
        }
        offset = end + 1;
    }
    None
}

/// Extract content between XML tags
fn extract_tag_content(block: &str, tag: &str) -> Option<String> {
    let (_, content_start) = find_tag(block, tag, false)?;
    let (len, _) = find_tag(&block[content_start..], tag, true)?;
    Some(block[content_start..content_start + len].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULTISTATUS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/dav/proj/output/</d:href>
    <d:propstat><d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop></d:propstat>
  </d:response>
  <d:response>
    <d:href>/dav/proj/output/sub/</d:href>
    <d:propstat><d:prop><d:resourcetype><d:collection /></d:resourcetype></d:prop></d:propstat>
  </d:response>
  <d:response>
    <d:href>/dav/proj/output/my%20file.txt</d:href>
    <d:propstat><d:prop><d:resourcetype/></d:prop></d:propstat>
  </d:response>
</d:multistatus>"#;

    fn store() -> WebDavStore {
        WebDavStore::new(WebDavConfig {
            base_url: "https://files.example.com/dav/".into(),
            project_id: "proj".into(),
            auth: WebDavAuth::None,
        })
        .unwrap()
    }

    #[test]
    fn test_parse_multistatus() {
        let responses = parse_multistatus(MULTISTATUS);
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].href, "/dav/proj/output/");
        assert!(responses[0].is_collection);
        assert!(responses[1].is_collection);
        assert!(!responses[2].is_collection);
    }

    #[test]
    fn test_parse_multistatus_single_line_uppercase_prefix() {
        let xml = r#"<D:multistatus xmlns:D="DAV:"><D:response><D:href>/dav/proj/a.txt</D:href><D:propstat><D:prop><D:resourcetype></D:resourcetype></D:prop></D:propstat></D:response><D:response><D:href>/dav/proj/dir/</D:href><D:propstat><D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop></D:propstat></D:response></D:multistatus>"#;
        let responses = parse_multistatus(xml);
        assert_eq!(
            responses,
            vec![
                DavResponse { href: "/dav/proj/a.txt".into(), is_collection: false },
                DavResponse { href: "/dav/proj/dir/".into(), is_collection: true },
            ]
        );
    }

    #[test]
    fn test_href_to_remote() {
        let store = store();
        assert_eq!(
            store.href_to_remote("/dav/proj/output/my%20file.txt"),
            Some(RemotePath::new("/output/my file.txt"))
        );
        assert_eq!(
            store.href_to_remote("https://files.example.com/dav/proj/output/sub/"),
            Some(RemotePath::new("/output/sub"))
        );
        assert_eq!(store.href_to_remote("/elsewhere/x"), None);
    }

    #[test]
    fn test_to_url_path_encodes_segments() {
        assert_eq!(to_url_path(&RemotePath::new("/output/my file.txt")), "output/my%20file.txt");
        assert_eq!(to_url_path(&RemotePath::root()), "");
    }

    #[test]
    fn test_status_error_mapping() {
        let path = RemotePath::new("/output/a.txt");
        assert!(matches!(status_error(StatusCode::NOT_FOUND, &path, String::new()), SyncError::NotFound(_)));
        assert!(matches!(status_error(StatusCode::UNAUTHORIZED, &path, String::new()), SyncError::AuthFailed(_)));
        assert!(matches!(status_error(StatusCode::FORBIDDEN, &path, String::new()), SyncError::PermissionDenied(_)));
        assert!(status_error(StatusCode::BAD_GATEWAY, &path, "down".into()).is_retryable());
    }

    #[test]
    fn test_invalid_endpoint_is_config_error() {
        let result = WebDavStore::new(WebDavConfig {
            base_url: "not a url".into(),
            project_id: "proj".into(),
            auth: WebDavAuth::None,
        });
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}
