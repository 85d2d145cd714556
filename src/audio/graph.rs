//! Fixed audio graph: mic -> all-pass -> convolver -> master gain -> output.
//!
//! ```text
//! mic ──┬──> all-pass ──> convolver ──┬──> master gain ──> output
//!       │                             │         ^
//!       v                             v         │
//!   pre analyser                post analyser   saw sweeps, song
//! ```

use rand::thread_rng;
use std::sync::mpsc::{self, Receiver, Sender};

use super::analyser::{analyser, Analyser, AnalyserTap};
use super::buffer::create_noise;
use super::convolver::{convolver, Convolver, ConvolverHandle};
use super::filter::AllPassFilter;
use super::song::{SongCommand, SongControl, SongVoice};
use super::sweep::SawSweep;
use crate::params::{audio_constants::BLOCK_SIZE, GraphParams};

/// Audio-thread side of the graph
pub struct AudioGraph {
    filter: AllPassFilter,
    convolver: Convolver,
    master_gain: f32,
    pre_tap: AnalyserTap,
    post_tap: AnalyserTap,
    sweep_requests: Receiver<()>,
    sweeps: Vec<SawSweep>,
    song_commands: Receiver<SongCommand>,
    song: Option<Box<SongVoice>>,
    sample_rate: u32,
    filtered: [f32; BLOCK_SIZE],
    wet_left: [f32; BLOCK_SIZE],
    wet_right: [f32; BLOCK_SIZE],
    mono: [f32; BLOCK_SIZE],
    voices: [f32; BLOCK_SIZE],
    song_left: [f32; BLOCK_SIZE],
    song_right: [f32; BLOCK_SIZE],
}

/// Control-thread side of the graph
pub struct GraphHandles {
    pub convolver: ConvolverHandle,
    pub pre_analyser: Analyser,
    pub post_analyser: Analyser,
    pub sweeps: SweepTrigger,
    pub song: SongControl,
}

/// Starts saw sweeps on the audio thread
#[derive(Clone)]
pub struct SweepTrigger(Sender<()>);

impl SweepTrigger {
    pub fn trigger(&self) {
        if self.0.send(()).is_err() {
            tracing::debug!("audio graph dropped; sweep ignored");
        }
    }
}

impl AudioGraph {
    /// Build the graph at `sample_rate`, seeding the convolver with noise
    pub fn new(params: &GraphParams, sample_rate: u32) -> (Self, GraphHandles) {
        let noise = create_noise(
            sample_rate,
            params.noise_duration_s,
            params.noise_channels,
            &mut thread_rng(),
        );
        let (convolver, convolver_handle) = convolver(
            noise,
            sample_rate,
            params.normalize_impulse,
            params.max_impulse_s,
        );
        let (pre_analyser, pre_tap) = analyser(&params.analyser);
        let (post_analyser, post_tap) = analyser(&params.analyser);
        let (sweep_sender, sweep_requests) = mpsc::channel();
        let (song_sender, song_commands) = mpsc::channel();

        let graph = Self {
            filter: AllPassFilter::new(
                params.allpass_frequency_hz,
                params.allpass_q,
                sample_rate,
            ),
            convolver,
            master_gain: params.master_gain,
            pre_tap,
            post_tap,
            sweep_requests,
            sweeps: Vec::new(),
            song_commands,
            song: None,
            sample_rate,
            filtered: [0.0; BLOCK_SIZE],
            wet_left: [0.0; BLOCK_SIZE],
            wet_right: [0.0; BLOCK_SIZE],
            mono: [0.0; BLOCK_SIZE],
            voices: [0.0; BLOCK_SIZE],
            song_left: [0.0; BLOCK_SIZE],
            song_right: [0.0; BLOCK_SIZE],
        };
        let handles = GraphHandles {
            convolver: convolver_handle,
            pre_analyser,
            post_analyser,
            sweeps: SweepTrigger(sweep_sender),
            song: SongControl(song_sender),
        };
        (graph, handles)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Run one processing block
    ///
    /// `input` is mono microphone audio; all slices are `BLOCK_SIZE` long.
    pub fn process_block(&mut self, input: &[f32], left: &mut [f32], right: &mut [f32]) {
        self.pre_tap.push(input);

        self.filter.process(input, &mut self.filtered);
        self.convolver
            .process(&self.filtered, &mut self.wet_left, &mut self.wet_right);

        for ((m, &l), &r) in self.mono.iter_mut().zip(&self.wet_left).zip(&self.wet_right) {
            *m = 0.5 * (l + r);
        }
        self.post_tap.push(&self.mono);

        while self.sweep_requests.try_recv().is_ok() {
            self.sweeps.push(SawSweep::new(self.sample_rate));
        }
        self.voices.fill(0.0);
        for sweep in &mut self.sweeps {
            sweep.mix_into(&mut self.voices);
        }
        self.sweeps.retain(|s| !s.is_finished());

        self.apply_song_commands();
        self.song_left.copy_from_slice(&self.voices);
        self.song_right.copy_from_slice(&self.voices);
        if let Some(song) = self.song.as_mut() {
            song.mix_into(&mut self.song_left, &mut self.song_right);
        }

        for ((out, &wet), &voice) in left.iter_mut().zip(&self.wet_left).zip(&self.song_left) {
            *out = (wet + voice) * self.master_gain;
        }
        for ((out, &wet), &voice) in right.iter_mut().zip(&self.wet_right).zip(&self.song_right) {
            *out = (wet + voice) * self.master_gain;
        }
    }

    fn apply_song_commands(&mut self) {
        while let Ok(command) = self.song_commands.try_recv() {
            match command {
                SongCommand::Load(voice) => self.song = Some(voice),
                SongCommand::Toggle => {
                    if let Some(song) = self.song.as_mut() {
                        song.toggle();
                    }
                }
            }
        }
    }

    /// Whether a loaded song is currently playing
    pub fn song_playing(&self) -> bool {
        self.song.as_ref().is_some_and(|song| song.is_playing())
    }

    /// Number of sweeps still sounding
    pub fn active_sweeps(&self) -> usize {
        self.sweeps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ImpulseBuffer;

    fn silent_block() -> Vec<f32> {
        vec![0.0; BLOCK_SIZE]
    }

    #[test]
    fn test_graph_seeds_noise_impulse() {
        let params = GraphParams::default();
        let (graph, handles) = AudioGraph::new(&params, 44100);

        let noise = handles.convolver.buffer();
        assert_eq!(graph.sample_rate(), 44100);
        assert_eq!(noise.channel_count(), 2);
        assert_eq!(noise.len(), 44100);
        assert_eq!(noise.channel(0), noise.channel(1));
    }

    #[test]
    fn test_silence_in_silence_out() {
        let (mut graph, _handles) = AudioGraph::new(&GraphParams::default(), 8000);
        let mut left = vec![1.0; BLOCK_SIZE];
        let mut right = vec![1.0; BLOCK_SIZE];
        graph.process_block(&silent_block(), &mut left, &mut right);
        assert!(left.iter().chain(&right).all(|&s| s == 0.0));
    }

    #[test]
    fn test_replaced_buffer_shapes_output() {
        let params = GraphParams {
            normalize_impulse: false,
            master_gain: 0.5,
            ..GraphParams::default()
        };
        let (mut graph, handles) = AudioGraph::new(&params, 8000);

        // Unit impulse on the left, silence on the right
        let impulse = ImpulseBuffer::new(8000, vec![vec![1.0], vec![0.0]]);
        handles.convolver.set_buffer(impulse.clone());
        assert_eq!(*handles.convolver.buffer(), impulse);

        let input: Vec<f32> = (0..BLOCK_SIZE).map(|i| if i == 0 { 1.0 } else { 0.0 }).collect();
        let mut left = vec![0.0; BLOCK_SIZE];
        let mut right = vec![0.0; BLOCK_SIZE];
        graph.process_block(&input, &mut left, &mut right);

        // All-pass output scaled by master gain on the left only
        let mut filter = AllPassFilter::new(350.0, 1.0, 8000);
        let first = filter.process_sample(1.0);
        assert!((left[0] - first * 0.5).abs() < 1e-4);
        assert!(right.iter().all(|s| s.abs() < 1e-4));
    }

    #[test]
    fn test_song_toggle_starts_and_pauses_output() {
        let params = GraphParams {
            master_gain: 0.5,
            ..GraphParams::default()
        };
        let (mut graph, handles) = AudioGraph::new(&params, 8000);
        handles
            .song
            .load(ImpulseBuffer::new(8000, vec![vec![0.4; BLOCK_SIZE * 4]]));

        let mut left = vec![0.0; BLOCK_SIZE];
        let mut right = vec![0.0; BLOCK_SIZE];

        // Loaded songs start paused
        graph.process_block(&silent_block(), &mut left, &mut right);
        assert!(!graph.song_playing());
        assert!(left.iter().all(|&s| s == 0.0));

        handles.song.toggle();
        graph.process_block(&silent_block(), &mut left, &mut right);
        assert!(graph.song_playing());
        assert!(left.iter().chain(&right).all(|&s| (s - 0.2).abs() < 1e-6));

        handles.song.toggle();
        graph.process_block(&silent_block(), &mut left, &mut right);
        assert!(!graph.song_playing());
        assert!(left.iter().chain(&right).all(|&s| s == 0.0));
    }

    #[test]
    fn test_sweep_is_mixed_and_retired() {
        let (mut graph, handles) = AudioGraph::new(&GraphParams::default(), 8000);
        handles.sweeps.trigger();

        let mut left = vec![0.0; BLOCK_SIZE];
        let mut right = vec![0.0; BLOCK_SIZE];
        graph.process_block(&silent_block(), &mut left, &mut right);
        assert_eq!(graph.active_sweeps(), 1);
        assert_eq!(left, right);
        assert!(left.iter().any(|&s| s != 0.0));

        // 5 seconds at 8kHz plus slack
        let blocks = 8000 * 5 / BLOCK_SIZE + 2;
        for _ in 0..blocks {
            graph.process_block(&silent_block(), &mut left, &mut right);
        }
        assert_eq!(graph.active_sweeps(), 0);
    }
}
