// Audio-search API client

use crate::config::SoundConfig;
use crate::sound::output::Clip;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// A sound found by the search API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSound {
    pub preview_url: String,
}

impl RemoteSound {
    /// File extension of the preview, used when handing it to a player
    fn extension(&self) -> String {
        let path = self.preview_url.split(['?', '#']).next().unwrap_or_default();
        path.rsplit_once('/')
            .map_or(path, |(_, name)| name)
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "mp3".to_string())
    }
}

/// A resolved sound with its preview already downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSound {
    pub sound: RemoteSound,
    pub clip: Clip,
}

/// Why no remote sound could be resolved
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned {0}")]
    Status(StatusCode),

    #[error("no sounds found")]
    NoResults,

    #[error("preview download returned {0}")]
    PreviewStatus(StatusCode),

    #[error("preview is empty")]
    EmptyPreview,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "previewUrl")]
    preview_url: Option<String>,
}

/// Client for the notification sound search
#[derive(Debug, Clone)]
pub struct SoundSearch {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    query: String,
    order: String,
}

impl SoundSearch {
    pub fn new(config: &SoundConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            query: config.query.clone(),
            order: config.order.clone(),
        }
    }

    /// Ask for one notification-style sound and take the first hit's preview
    pub async fn find_notification_sound(&self) -> Result<RemoteSound, ResolveError> {
        let key = self.api_key.as_deref().ok_or(ResolveError::MissingApiKey)?;

        info!(api = %self.api_base, query = %self.query, "Fetching notification sound");
        let response = self
            .client
            .get(&self.api_base)
            .query(&[
                ("key", key),
                ("q", self.query.as_str()),
                ("order", self.order.as_str()),
                ("per_page", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status(status));
        }

        let body: SearchResponse = response.json().await?;
        let preview_url = body
            .hits
            .into_iter()
            .next()
            .and_then(|hit| hit.preview_url)
            .filter(|url| !url.is_empty())
            .ok_or(ResolveError::NoResults)?;

        debug!(url = %preview_url, "Resolved notification sound");
        Ok(RemoteSound { preview_url })
    }

    /// Find a sound and download its preview
    pub async fn load_notification_sound(&self) -> Result<LoadedSound, ResolveError> {
        let sound = self.find_notification_sound().await?;
        let clip = self.download(&sound).await?;
        Ok(LoadedSound { sound, clip })
    }

    /// Fetch the audio bytes behind a resolved sound
    pub async fn download(&self, sound: &RemoteSound) -> Result<Clip, ResolveError> {
        let response = self.client.get(&sound.preview_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::PreviewStatus(status));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ResolveError::EmptyPreview);
        }
        debug!(url = %sound.preview_url, size = bytes.len(), "Downloaded sound preview");

        Ok(Clip {
            bytes: bytes.to_vec(),
            extension: sound.extension(),
        })
    }
}
