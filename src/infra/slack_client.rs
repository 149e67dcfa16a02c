use crate::app::ports::ChatPort;
use crate::types::ImageBuffer;
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Deserialize)]
struct SlackFile {
    #[serde(default)]
    url_private: Option<String>,
    #[serde(default)]
    url_private_download: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
}

/// Envelope shared by every Web API response
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    file: Option<SlackFile>,
}

impl SlackResponse {
    fn into_result(self, method: &str) -> anyhow::Result<Self> {
        if self.ok {
            Ok(self)
        } else {
            Err(anyhow!(
                "{} failed: {}",
                method,
                self.error.as_deref().unwrap_or("unknown_error")
            ))
        }
    }
}

/// Chat client speaking the Slack Web API with a per-request bearer token
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl SlackClient {
    pub fn new(api_base: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    async fn read_response(resp: reqwest::Response, method: &str) -> anyhow::Result<SlackResponse> {
        let status = resp.status();
        if !status.is_success() {
            bail!("{} returned HTTP {}", method, status.as_u16());
        }
        let body: SlackResponse = resp
            .json()
            .await
            .with_context(|| format!("decoding {method} response"))?;
        body.into_result(method)
    }
}

fn download_url(file: &SlackFile) -> Option<&str> {
    file.url_private_download
        .as_deref()
        .or(file.url_private.as_deref())
}

#[async_trait]
impl ChatPort for SlackClient {
    async fn file_content(&self, file_id: &str) -> anyhow::Result<String> {
        let resp = self
            .http
            .get(self.url("files.info"))
            .bearer_auth(&self.token)
            .query(&[("file", file_id)])
            .send()
            .await?;
        let info = Self::read_response(resp, "files.info").await?;
        let file = info.file.ok_or_else(|| anyhow!("files.info returned no file"))?;
        let url = download_url(&file).ok_or_else(|| anyhow!("file {} has no download url", file_id))?;

        debug!("Downloading file {} from {}", file_id, url);
        let content = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(content)
    }

    async fn upload_file(&self, image: ImageBuffer) -> anyhow::Result<String> {
        let part = Part::bytes(image.bytes)
            .file_name(image.filename.clone())
            .mime_str(&image.content_type)?;
        let form = Form::new()
            .text("filename", image.filename.clone())
            .part("file", part);

        let resp = self
            .http
            .post(self.url("files.upload"))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        let uploaded = Self::read_response(resp, "files.upload").await?;
        uploaded
            .file
            .and_then(|f| f.permalink)
            .ok_or_else(|| anyhow!("files.upload returned no permalink for {}", image.filename))
    }

    async fn post_message(&self, channel: &str, text: &str, thread_ts: Option<&str>) -> anyhow::Result<()> {
        let mut body = json!({ "channel": channel, "text": text });
        if let Some(ts) = thread_ts {
            body["thread_ts"] = json!(ts);
        }
        let resp = self
            .http
            .post(self.url("chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Self::read_response(resp, "chat.postMessage").await?;
        Ok(())
    }
}
