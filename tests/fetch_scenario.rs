use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use convolver::audio::{convolver, ConvolverHandle, ImpulseBuffer};
use convolver::catalog::{AudioDecoder, CatalogClient, FetchQueue, SampleFetcher, Transport};
use convolver::error::{DecodeError, FetchError};
use convolver::params::CatalogConfig;

const API_ROOT: &str = "http://catalog.test/api";
const PREVIEW_ROOT: &str = "http://catalog.test/previews";
const PREVIEW_MAGIC: &str = "OggS-fake:";

/// One sound the mock catalog knows about
#[derive(Clone)]
struct MockSound {
    preview: Vec<u8>,
    delay: Duration,
}

impl MockSound {
    /// Preview the mock decoder turns into `fixed_buffer(level, ..)`
    fn level(level: f32) -> Self {
        Self {
            preview: format!("{}{}", PREVIEW_MAGIC, level).into_bytes(),
            delay: Duration::ZERO,
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Canned catalog that records every requested URL
#[derive(Clone)]
struct MockNetwork {
    requests: Arc<Mutex<Vec<String>>>,
    sounds: Arc<HashMap<String, MockSound>>,
    fail_descriptor: bool,
}

impl Default for MockNetwork {
    fn default() -> Self {
        Self::with_sounds([("163223", MockSound::level(0.25))])
    }
}

impl MockNetwork {
    fn with_sounds<const N: usize>(sounds: [(&str, MockSound); N]) -> Self {
        Self {
            requests: Arc::default(),
            sounds: Arc::new(sounds.into_iter().map(|(id, sound)| (id.to_string(), sound)).collect()),
            fail_descriptor: false,
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn not_found(url: &str) -> FetchError {
        FetchError::Status {
            url: url.to_string(),
            status: 404,
        }
    }
}

impl Transport for MockNetwork {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        if let Some(rest) = url.strip_prefix(&format!("{}/sounds/", API_ROOT)) {
            let id = rest.split('?').next().unwrap_or_default();
            let sound = self.sounds.get(id).ok_or_else(|| Self::not_found(url))?;
            std::thread::sleep(sound.delay);
            if self.fail_descriptor {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: 503,
                });
            }
            let body = format!(
                r#"{{"id": {}, "original_filename": "hall.wav", "preview-hq-ogg": "{}"}}"#,
                id,
                preview_url(id)
            );
            return Ok(body.into_bytes());
        }

        if let Some(rest) = url.strip_prefix(&format!("{}/", PREVIEW_ROOT)) {
            let id = rest.trim_end_matches("-hq.ogg");
            let sound = self.sounds.get(id).ok_or_else(|| Self::not_found(url))?;
            return Ok(sound.preview.clone());
        }

        Err(Self::not_found(url))
    }
}

/// Decoder that reads a level out of the fake preview bytes
struct MockDecoder;

impl AudioDecoder for MockDecoder {
    fn decode(&self, bytes: &[u8], sample_rate: u32) -> Result<ImpulseBuffer, DecodeError> {
        let level = std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| text.strip_prefix(PREVIEW_MAGIC))
            .and_then(|level| level.parse::<f32>().ok())
            .ok_or(DecodeError::UnsupportedFormat)?;
        Ok(fixed_buffer(level, sample_rate))
    }
}

fn preview_url(id: &str) -> String {
    format!("{}/{}-hq.ogg", PREVIEW_ROOT, id)
}

fn descriptor_url(id: &str) -> String {
    format!("{}/sounds/{}?api_key=test-key", API_ROOT, id)
}

fn fixed_buffer(level: f32, sample_rate: u32) -> ImpulseBuffer {
    ImpulseBuffer::new(sample_rate, vec![vec![level; 64], vec![-level; 64]])
}

fn config() -> CatalogConfig {
    CatalogConfig {
        base_url: API_ROOT.to_string(),
        api_key: Some("test-key".to_string()),
        ..CatalogConfig::default()
    }
}

fn fetcher(network: &MockNetwork) -> SampleFetcher {
    let client = CatalogClient::new(config(), Box::new(network.clone()));
    SampleFetcher::new(client, Arc::new(MockDecoder), 44100)
}

fn seeded_convolver(buffer: ImpulseBuffer) -> ConvolverHandle {
    let (_convolver, handle) = convolver(buffer, 44100, true, 10.0);
    handle
}

fn poll_until_idle(queue: &mut FetchQueue, handle: &ConvolverHandle) -> usize {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut installed = 0;
    while queue.pending() > 0 && Instant::now() < deadline {
        installed += queue.poll(handle);
        std::thread::sleep(Duration::from_millis(5));
    }
    installed
}

#[test]
fn fetch_installs_decoded_preview_as_impulse() {
    let network = MockNetwork::default();
    let handle = seeded_convolver(ImpulseBuffer::new(44100, vec![vec![1.0]]));
    let mut queue = FetchQueue::new(fetcher(&network));

    queue.request("163223");
    let installed = poll_until_idle(&mut queue, &handle);

    assert_eq!(installed, 1);
    assert_eq!(
        network.requests(),
        vec![descriptor_url("163223"), preview_url("163223")]
    );
    assert_eq!(*handle.buffer(), fixed_buffer(0.25, 44100));
}

#[test]
fn blocking_fetch_returns_decoded_buffer() {
    let network = MockNetwork::default();
    let buffer = fetcher(&network).fetch_blocking("163223").unwrap();
    assert_eq!(buffer, fixed_buffer(0.25, 44100));
}

#[test]
fn slow_earlier_request_finishing_last_wins() {
    let network = MockNetwork::with_sounds([
        ("100", MockSound::level(0.1).delayed(Duration::from_millis(300))),
        ("200", MockSound::level(0.2)),
    ]);
    let handle = seeded_convolver(ImpulseBuffer::new(44100, vec![vec![1.0]]));
    let mut queue = FetchQueue::new(fetcher(&network));

    queue.request("100");
    queue.request("200");
    let installed = poll_until_idle(&mut queue, &handle);

    assert_eq!(installed, 2);
    assert_eq!(*handle.buffer(), fixed_buffer(0.1, 44100));
}

#[test]
fn results_finished_between_polls_install_in_completion_order() {
    let network = MockNetwork::with_sounds([
        ("100", MockSound::level(0.1).delayed(Duration::from_millis(150))),
        ("200", MockSound::level(0.2)),
    ]);
    let handle = seeded_convolver(ImpulseBuffer::new(44100, vec![vec![1.0]]));
    let mut queue = FetchQueue::new(fetcher(&network));

    queue.request("100");
    queue.request("200");

    // Both finish before the first poll
    std::thread::sleep(Duration::from_millis(600));
    let installed = queue.poll(&handle);

    assert_eq!(installed, 2);
    assert_eq!(queue.pending(), 0);
    assert_eq!(*handle.buffer(), fixed_buffer(0.1, 44100));
}

#[test]
fn descriptor_failure_skips_download_and_keeps_buffer() {
    let network = MockNetwork {
        fail_descriptor: true,
        ..MockNetwork::default()
    };
    let original = ImpulseBuffer::new(44100, vec![vec![1.0]]);
    let handle = seeded_convolver(original.clone());
    let mut queue = FetchQueue::new(fetcher(&network));

    queue.request("163223");
    let installed = poll_until_idle(&mut queue, &handle);

    assert_eq!(installed, 0);
    assert_eq!(network.requests().len(), 1);
    assert_eq!(*handle.buffer(), original);
}

#[test]
fn undecodable_preview_keeps_buffer() {
    let network = MockNetwork::with_sounds([(
        "300",
        MockSound {
            preview: b"<html>not audio</html>".to_vec(),
            delay: Duration::ZERO,
        },
    )]);
    let original = ImpulseBuffer::new(44100, vec![vec![1.0]]);
    let handle = seeded_convolver(original.clone());
    let mut queue = FetchQueue::new(fetcher(&network));

    queue.request("300");
    let installed = poll_until_idle(&mut queue, &handle);

    assert_eq!(installed, 0);
    assert_eq!(network.requests(), vec![descriptor_url("300"), preview_url("300")]);
    assert_eq!(*handle.buffer(), original);

    let result = fetcher(&network).fetch_blocking("300");
    assert!(matches!(result, Err(FetchError::Decode(DecodeError::UnsupportedFormat))));
}

#[test]
fn unknown_sound_is_an_error() {
    let network = MockNetwork::default();
    let result = fetcher(&network).fetch("999").wait();
    assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
}

#[test]
fn invalid_id_issues_no_request() {
    let network = MockNetwork::default();
    let result = fetcher(&network).fetch_blocking("../etc");
    assert!(matches!(result, Err(FetchError::InvalidSoundId { .. })));
    assert!(network.requests().is_empty());
}
