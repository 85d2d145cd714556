//! Fetch-and-decode as a single operation with an explicit result.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use super::decode::AudioDecoder;
use super::CatalogClient;
use crate::audio::{ConvolverHandle, ImpulseBuffer};
use crate::error::FetchError;

/// Resolves sound ids to decoded impulse buffers
#[derive(Clone)]
pub struct SampleFetcher {
    client: Arc<CatalogClient>,
    decoder: Arc<dyn AudioDecoder>,
    sample_rate: u32,
}

impl SampleFetcher {
    /// Create a fetcher decoding to `sample_rate`
    pub fn new(client: CatalogClient, decoder: Arc<dyn AudioDecoder>, sample_rate: u32) -> Self {
        Self {
            client: Arc::new(client),
            decoder,
            sample_rate,
        }
    }

    /// Descriptor lookup, preview download and decode, on the calling thread
    pub fn fetch_blocking(&self, sound_id: &str) -> Result<ImpulseBuffer, FetchError> {
        let descriptor = self.client.sound(sound_id)?;
        let bytes = self.client.download(&descriptor.preview_hq_ogg)?;
        let buffer = self.decoder.decode(&bytes, self.sample_rate)?;
        tracing::info!(
            "Decoded sound {} ({:.2}s, {} channels)",
            descriptor.id,
            buffer.duration_s(),
            buffer.channel_count()
        );
        Ok(buffer)
    }

    /// Run `fetch_blocking` on a worker thread
    pub fn fetch(&self, sound_id: &str) -> FetchHandle {
        let (sender, receiver) = mpsc::channel();
        let fetcher = self.clone();
        let id = sound_id.trim().to_string();
        let worker_id = id.clone();

        thread::spawn(move || {
            let result = fetcher.fetch_blocking(&worker_id);
            // The handle may have been dropped; the result is discarded then
            let _ = sender.send(Completed {
                finished: Instant::now(),
                result,
            });
        });

        FetchHandle { id, receiver }
    }
}

/// Worker output stamped with the moment the fetch finished
struct Completed {
    finished: Instant,
    result: Result<ImpulseBuffer, FetchError>,
}

/// Pending result of a background fetch
pub struct FetchHandle {
    id: String,
    receiver: Receiver<Completed>,
}

impl FetchHandle {
    pub fn sound_id(&self) -> &str {
        &self.id
    }

    /// Non-blocking poll; `None` while the fetch is still running
    pub fn try_take(&self) -> Option<Result<ImpulseBuffer, FetchError>> {
        self.try_take_completed().map(|completed| completed.result)
    }

    /// Block until the fetch completes
    pub fn wait(self) -> Result<ImpulseBuffer, FetchError> {
        match self.receiver.recv() {
            Ok(completed) => completed.result,
            Err(_) => Err(self.worker_lost()),
        }
    }

    fn try_take_completed(&self) -> Option<Completed> {
        match self.receiver.try_recv() {
            Ok(completed) => Some(completed),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Completed {
                finished: Instant::now(),
                result: Err(self.worker_lost()),
            }),
        }
    }

    fn worker_lost(&self) -> FetchError {
        FetchError::WorkerLost { id: self.id.clone() }
    }
}

/// Outstanding fetches whose results go straight into the convolver
///
/// Results are installed in completion order, so the last fetch to finish
/// wins. Failures are logged and dropped; the active buffer is left alone.
pub struct FetchQueue {
    fetcher: SampleFetcher,
    pending: Vec<FetchHandle>,
}

impl FetchQueue {
    pub fn new(fetcher: SampleFetcher) -> Self {
        Self {
            fetcher,
            pending: Vec::new(),
        }
    }

    /// Start fetching `sound_id` in the background
    pub fn request(&mut self, sound_id: &str) {
        tracing::info!("Fetching sound {}", sound_id.trim());
        self.pending.push(self.fetcher.fetch(sound_id));
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Install every finished fetch; returns how many buffers were installed
    ///
    /// Fetches that finished since the last poll are installed oldest first,
    /// regardless of the order they were requested in.
    pub fn poll(&mut self, convolver: &ConvolverHandle) -> usize {
        let mut finished = Vec::new();
        self.pending.retain(|handle| match handle.try_take_completed() {
            None => true,
            Some(completed) => {
                finished.push((handle.sound_id().to_string(), completed));
                false
            }
        });
        finished.sort_by_key(|(_, completed)| completed.finished);

        let mut installed = 0;
        for (sound_id, completed) in finished {
            match completed.result {
                Ok(buffer) => {
                    tracing::info!("Installing sound {} as impulse response", sound_id);
                    convolver.set_buffer(buffer);
                    installed += 1;
                }
                Err(e) => tracing::warn!("Fetching sound {} failed: {}", sound_id, e),
            }
        }
        installed
    }
}
