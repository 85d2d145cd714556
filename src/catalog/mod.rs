//! Remote sound catalog: descriptors, downloads and decoding.
//!
//! A sound id resolves to a JSON descriptor whose `preview-hq-ogg` field
//! points at the audio preview. The preview is downloaded, decoded and
//! resampled into an `ImpulseBuffer` for the convolver.

mod decode;
mod fetch;

use serde::Deserialize;
use std::time::Duration;

use crate::error::FetchError;
use crate::params::CatalogConfig;

pub use decode::{AudioDecoder, SampleDecoder};
pub use fetch::{FetchHandle, FetchQueue, SampleFetcher};

/// Sound metadata returned by the catalog
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SoundDescriptor {
    pub id: u64,

    #[serde(default)]
    pub original_filename: Option<String>,

    #[serde(default)]
    pub duration: Option<f64>,

    /// High quality Ogg Vorbis preview
    #[serde(rename = "preview-hq-ogg")]
    pub preview_hq_ogg: String,
}

/// Byte-level GET against the network
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP transport
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client { reason: e.to_string() })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let transport_error = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().map_err(transport_error)?;
        Ok(bytes.to_vec())
    }
}

/// Catalog API client
pub struct CatalogClient {
    config: CatalogConfig,
    transport: Box<dyn Transport>,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig, transport: Box<dyn Transport>) -> Self {
        if config.api_key.is_none() {
            tracing::warn!("No catalog API key configured; requests are sent without one");
        }
        Self { config, transport }
    }

    /// Client over HTTP using the configured timeout
    pub fn http(config: CatalogConfig) -> Result<Self, FetchError> {
        let transport = HttpTransport::new(config.timeout())?;
        Ok(Self::new(config, Box::new(transport)))
    }

    /// Look up a sound's descriptor
    pub fn sound(&self, sound_id: &str) -> Result<SoundDescriptor, FetchError> {
        let sound_id = validate_sound_id(sound_id)?;
        let url = self.config.sound_url(sound_id);
        tracing::debug!("Fetching descriptor for sound {}", sound_id);
        let body = self.transport.get(&url)?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Download an asset referenced by a descriptor
    pub fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!("Downloading {}", url);
        self.transport.get(url)
    }
}

/// Trim and check a user-supplied sound id
pub fn validate_sound_id(sound_id: &str) -> Result<&str, FetchError> {
    let trimmed = sound_id.trim();
    let valid = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(trimmed)
    } else {
        Err(FetchError::InvalidSoundId {
            id: sound_id.to_string(),
        })
    }
}
