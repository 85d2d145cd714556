//! Remote sound catalog configuration.

use std::time::Duration;

/// Sound the convolver loads at startup
pub const DEFAULT_SOUND_ID: &str = "163223";

/// Remote sound catalog settings
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// API root, without trailing slash (e.g. `http://www.freesound.org/api`)
    pub base_url: String,

    /// API key appended to every descriptor request; omitted when `None`
    pub api_key: Option<String>,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Sound fetched once the audio session is up
    pub initial_sound_id: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://www.freesound.org/api".to_string(),
            api_key: None,
            timeout_secs: 30,
            initial_sound_id: DEFAULT_SOUND_ID.to_string(),
        }
    }
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Descriptor URL for a sound id
    pub fn sound_url(&self, sound_id: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        match &self.api_key {
            Some(key) => format!("{}/sounds/{}?api_key={}", base, sound_id, key),
            None => format!("{}/sounds/{}", base, sound_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sound_url_with_key() {
        let config = CatalogConfig {
            base_url: "http://catalog.test/api/".to_string(),
            api_key: Some("k3y".to_string()),
            ..CatalogConfig::default()
        };
        assert_eq!(
            config.sound_url("163223"),
            "http://catalog.test/api/sounds/163223?api_key=k3y"
        );
    }

    #[test]
    fn test_sound_url_without_key() {
        let config = CatalogConfig::default();
        assert_eq!(
            config.sound_url("42"),
            "http://www.freesound.org/api/sounds/42"
        );
    }
}
