use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{info, warn};
use url::Url;

use crate::utils::http::get_http_client;

const MEDIA_DOWNLOAD_MAX_ATTEMPTS: usize = 3;
const MEDIA_DOWNLOAD_BASE_DELAY_MS: u64 = 400;
const MEDIA_DOWNLOAD_TIMEOUT_SECS: u64 = 60;
const FALLBACK_FILE_NAME: &str = "image.png";

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Image download failed for {url}: {reason}")]
    Download { url: String, reason: String },
    #[error("Image download failed for {url} with status {status}")]
    Status { url: String, status: StatusCode },
    #[error("Could not write image to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    infer::get(data).map(|kind| kind.mime_type().to_string())
}

/// Last path segment of `url`, percent-decoded. Falls back to `image.png`.
pub fn file_name_from_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return FALLBACK_FILE_NAME.to_string();
    };
    let Some(segment) = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
    else {
        return FALLBACK_FILE_NAME.to_string();
    };

    let decoded = urlencoding::decode(segment)
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    // A decoded %2F must not turn the name into a path.
    let name = decoded
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return FALLBACK_FILE_NAME.to_string();
    }
    name.to_string()
}

fn should_retry_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

pub async fn download_image(url: &str) -> Result<Vec<u8>, MediaError> {
    let client = get_http_client();
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        let last_attempt = attempt == MEDIA_DOWNLOAD_MAX_ATTEMPTS;
        let delay = Duration::from_millis(MEDIA_DOWNLOAD_BASE_DELAY_MS << (attempt - 1));

        let response = match client
            .get(url)
            .timeout(Duration::from_secs(MEDIA_DOWNLOAD_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                warn!(
                    "Failed to fetch image {url}: {err} (timeout={}, connect={}, attempt={}/{})",
                    err.is_timeout(),
                    err.is_connect(),
                    attempt,
                    MEDIA_DOWNLOAD_MAX_ATTEMPTS
                );
                if !should_retry_error(&err) || last_attempt {
                    return Err(MediaError::Download {
                        url: url.to_string(),
                        reason: err.to_string(),
                    });
                }
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(
                "Image download failed for {url} with status {status} (attempt={}/{})",
                attempt, MEDIA_DOWNLOAD_MAX_ATTEMPTS
            );
            if !should_retry_status(status) || last_attempt {
                return Err(MediaError::Status {
                    url: url.to_string(),
                    status,
                });
            }
            tokio::time::sleep(delay).await;
            continue;
        }

        return response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|err| MediaError::Download {
                url: url.to_string(),
                reason: err.to_string(),
            });
    }
}

pub async fn write_image(bytes: &[u8], dir: &Path, file_name: &str) -> Result<PathBuf, MediaError> {
    let path = dir.join(file_name);
    let to_write_error = |source| MediaError::Write {
        path: path.clone(),
        source,
    };
    tokio::fs::create_dir_all(dir).await.map_err(to_write_error)?;
    tokio::fs::write(&path, bytes).await.map_err(to_write_error)?;
    Ok(path)
}

/// Downloads `url` into `dir`, naming the file after the URL's last path segment.
pub async fn save_image(url: &str, dir: &Path) -> Result<PathBuf, MediaError> {
    let bytes = download_image(url).await?;
    let file_name = file_name_from_url(url);
    let path = write_image(&bytes, dir, &file_name).await?;
    info!(
        "Saved image {} ({} bytes, mime={})",
        path.display(),
        bytes.len(),
        detect_mime_type(&bytes).unwrap_or_else(|| "unknown".to_string())
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_last_path_segment() {
        assert_eq!(file_name_from_url("https://x/y/img.png"), "img.png");
        assert_eq!(
            file_name_from_url(
                "https://dashscope-result.oss-cn-beijing.aliyuncs.com/1d/7f/abc.png?Expires=1&Signature=x"
            ),
            "abc.png"
        );
    }

    #[test]
    fn file_name_is_percent_decoded() {
        assert_eq!(
            file_name_from_url("https://x/y/%E7%8C%AB%20cat.png"),
            "猫 cat.png"
        );
        assert_eq!(file_name_from_url("https://x/y/a%2Fb.png"), "b.png");
    }

    #[test]
    fn file_name_falls_back_without_segment() {
        assert_eq!(file_name_from_url("https://x/"), FALLBACK_FILE_NAME);
        assert_eq!(file_name_from_url("https://x"), FALLBACK_FILE_NAME);
        assert_eq!(file_name_from_url("not a url"), FALLBACK_FILE_NAME);
        assert_eq!(file_name_from_url("https://x/%2E%2E"), FALLBACK_FILE_NAME);
    }

    #[test]
    fn detects_png_signature() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(detect_mime_type(&png).as_deref(), Some("image/png"));
        assert_eq!(detect_mime_type(b"plain text"), None);
    }

    #[tokio::test]
    async fn write_image_creates_directory() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("nested").join("out");

        let path = write_image(b"bytes", &dir, "img.png").await.unwrap();

        assert_eq!(path, dir.join("img.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn write_image_reports_path_on_failure() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let err = write_image(b"bytes", &blocker, "img.png").await.unwrap_err();

        assert!(matches!(err, MediaError::Write { .. }));
        assert!(err.to_string().contains("img.png"));
    }
}
