//! Audio session: microphone capture, graph processing and playback.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufWriter;
use std::sync::mpsc::{self, Receiver};
use tracing::{info, warn};

use super::analyser::Analyser;
use super::convolver::ConvolverHandle;
use super::graph::{AudioGraph, SweepTrigger};
use super::song::SongControl;
use crate::error::AudioError;
use crate::params::{audio_constants::BLOCK_SIZE, GraphParams, RecordingConfig};

type WavRecorder = hound::WavWriter<BufWriter<File>>;

/// Live audio session: one per program run
pub struct AudioSession {
    sample_rate: u32,
    convolver: ConvolverHandle,
    sweeps: SweepTrigger,
    song: SongControl,
    pre_analyser: Analyser,
    post_analyser: Analyser,

    /// Device streams (kept alive)
    _input_stream: cpal::Stream,
    _output_stream: cpal::Stream,
}

impl AudioSession {
    /// Open the default microphone and output, build the graph and start playback
    pub fn new(
        params: &GraphParams,
        recording_config: Option<&RecordingConfig>,
    ) -> Result<Self, AudioError> {
        params
            .validate()
            .map_err(|reason| AudioError::InvalidParams { reason })?;

        let host = cpal::default_host();
        info!("Audio host: {}", host.id().name());

        // Output device sets the graph rate
        let output_device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let output_config = output_device.default_output_config()?;
        let sample_rate = output_config.sample_rate().0;
        let output_channels = output_config.channels() as usize;
        info!(
            "Audio output: {} @ {}Hz, {} channels",
            output_device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate,
            output_channels
        );

        let input_device = host
            .default_input_device()
            .ok_or(AudioError::NoInputDevice)?;
        let input_config = input_device.default_input_config()?;
        let input_channels = input_config.channels() as usize;
        info!(
            "Audio input: {} @ {}Hz, {} channels",
            input_device.name().unwrap_or_else(|_| "Unknown".to_string()),
            input_config.sample_rate().0,
            input_channels
        );
        if input_config.sample_rate().0 != sample_rate {
            warn!(
                "Input sample rate of {}Hz does not match output sample rate of {}Hz",
                input_config.sample_rate().0,
                sample_rate
            );
        }

        let recorder = match recording_config {
            Some(config) => {
                let spec = hound::WavSpec {
                    channels: 2,
                    sample_rate,
                    bits_per_sample: 32,
                    sample_format: hound::SampleFormat::Float,
                };
                info!("Recording audio to {}", config.audio_path());
                Some(hound::WavWriter::create(config.audio_path(), spec)?)
            }
            None => None,
        };

        let (graph, handles) = AudioGraph::new(params, sample_rate);
        let (mic_sender, mic_receiver) = mpsc::channel::<Vec<f32>>();

        let input_stream_config: cpal::StreamConfig = input_config.into();
        let input_stream = input_device.build_input_stream(
            &input_stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mono: Vec<f32> = data
                    .chunks(input_channels)
                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                    .collect();
                // Receiver only goes away during shutdown
                let _ = mic_sender.send(mono);
            },
            |err| warn!("Audio input stream error: {}", err),
            None,
        )?;

        let mut renderer = BlockRenderer::new(
            graph,
            mic_receiver,
            output_channels,
            params.max_input_latency_frames,
            recorder,
        );
        let output_stream_config: cpal::StreamConfig = output_config.into();
        let output_stream = output_device.build_output_stream(
            &output_stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| renderer.fill(data),
            |err| warn!("Audio output stream error: {}", err),
            None,
        )?;

        input_stream.play()?;
        output_stream.play()?;

        Ok(Self {
            sample_rate,
            convolver: handles.convolver,
            sweeps: handles.sweeps,
            song: handles.song,
            pre_analyser: handles.pre_analyser,
            post_analyser: handles.post_analyser,
            _input_stream: input_stream,
            _output_stream: output_stream,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Handle for replacing the convolver's impulse buffer
    pub fn convolver(&self) -> &ConvolverHandle {
        &self.convolver
    }

    pub fn trigger_sweep(&self) {
        self.sweeps.trigger();
    }

    /// Backing track controls
    pub fn song(&self) -> &SongControl {
        &self.song
    }

    /// Pre-effect and post-effect analysers
    pub fn analysers_mut(&mut self) -> (&mut Analyser, &mut Analyser) {
        (&mut self.pre_analyser, &mut self.post_analyser)
    }
}

/// Drives the graph from the output callback in whole blocks
struct BlockRenderer {
    graph: AudioGraph,
    mic: Receiver<Vec<f32>>,
    pending_input: VecDeque<f32>,
    pending_output: VecDeque<(f32, f32)>,
    channels: usize,
    max_input_latency: usize,
    recorder: Option<WavRecorder>,
}

impl BlockRenderer {
    fn new(
        graph: AudioGraph,
        mic: Receiver<Vec<f32>>,
        channels: usize,
        max_input_latency: usize,
        recorder: Option<WavRecorder>,
    ) -> Self {
        Self {
            graph,
            mic,
            pending_input: VecDeque::new(),
            pending_output: VecDeque::with_capacity(BLOCK_SIZE * 8),
            channels: channels.max(1),
            max_input_latency: max_input_latency.max(BLOCK_SIZE),
            recorder,
        }
    }

    /// Fill an interleaved output buffer
    fn fill(&mut self, data: &mut [f32]) {
        let frames = data.len() / self.channels;
        while self.pending_output.len() < frames {
            self.render_block();
        }

        for frame in data.chunks_mut(self.channels) {
            let (left, right) = self.pending_output.pop_front().unwrap_or((0.0, 0.0));
            if let [only] = frame {
                *only = 0.5 * (left + right);
            } else {
                frame[0] = left;
                frame[1] = right;
                frame[2..].fill(0.0);
            }

            if let Some(recorder) = self.recorder.as_mut() {
                let written = recorder
                    .write_sample(left)
                    .and_then(|_| recorder.write_sample(right));
                if let Err(e) = written {
                    warn!("Stopping audio recording: {}", e);
                    self.recorder = None;
                }
            }
        }
    }

    fn render_block(&mut self) {
        while let Ok(chunk) = self.mic.try_recv() {
            self.pending_input.extend(chunk);
        }
        let excess = self
            .pending_input
            .len()
            .saturating_sub(self.max_input_latency);
        self.pending_input.drain(..excess);

        // Missing microphone input plays as silence
        let mut input = [0.0f32; BLOCK_SIZE];
        let available = self.pending_input.len().min(BLOCK_SIZE);
        for (dst, src) in input.iter_mut().zip(self.pending_input.drain(..available)) {
            *dst = src;
        }

        let mut left = [0.0f32; BLOCK_SIZE];
        let mut right = [0.0f32; BLOCK_SIZE];
        self.graph.process_block(&input, &mut left, &mut right);
        self.pending_output
            .extend(left.iter().copied().zip(right.iter().copied()));
    }
}
