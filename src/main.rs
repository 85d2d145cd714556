//! Convolver - microphone through a swappable impulse response
//!
//! Speak into the microphone and hear it convolved with samples from a remote
//! sound catalog, while a spectrogram paints the dry signal in red and the
//! wet signal in blue. Move the mouse to reveal the sound id field.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use convolver::audio::{AudioSession, ImpulseBuffer};
use convolver::catalog::{AudioDecoder, CatalogClient, FetchQueue, SampleDecoder, SampleFetcher};
use convolver::cli::Args;
use convolver::overlay::SoundInput;
use convolver::params::{CatalogConfig, GraphParams, RecordingConfig, RenderConfig};
use convolver::rendering::RenderSystem;
use convolver::visual::{Canvas, RenderLoop, RenderLoopHandle, Spectrogram};

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,
    canvas: Canvas,
    frame: Canvas,
    sound_input: SoundInput,
    cursor: (f64, f64),

    // Audio, fetching and the spectrogram loop; only present once the session is up
    audio: Option<AudioSession>,
    fetches: Option<FetchQueue>,
    render_loop: Option<(RenderLoop, RenderLoopHandle)>,

    // Configuration
    graph_params: GraphParams,
    catalog_config: CatalogConfig,
    render_config: RenderConfig,
    recording_config: Option<RecordingConfig>,
    recorded_frames: usize,
    song_path: Option<PathBuf>,
}

impl App {
    fn new(args: &Args, recording_config: Option<RecordingConfig>) -> Self {
        let render_config = args.render_config();
        Self {
            window: None,
            render_system: None,
            canvas: Canvas::new(0, 0),
            frame: Canvas::new(0, 0),
            sound_input: SoundInput::new(Duration::from_millis(render_config.input_idle_ms)),
            cursor: (0.0, 0.0),
            audio: None,
            fetches: None,
            render_loop: None,
            graph_params: args.graph_params(),
            catalog_config: args.catalog_config(),
            render_config,
            recording_config,
            recorded_frames: 0,
            song_path: args.song.clone(),
        }
    }

    /// Open the audio session, start the first fetch and the render loop
    fn start_audio(&mut self) {
        let audio = match AudioSession::new(&self.graph_params, self.recording_config.as_ref()) {
            Ok(audio) => audio,
            Err(e) => {
                error!("Audio unavailable, visualization disabled: {}", e);
                return;
            }
        };

        match CatalogClient::http(self.catalog_config.clone()) {
            Ok(client) => {
                let decoder = SampleDecoder::new(Some(self.graph_params.max_impulse_s));
                let fetcher = SampleFetcher::new(client, Arc::new(decoder), audio.sample_rate());
                let mut fetches = FetchQueue::new(fetcher);
                fetches.request(&self.catalog_config.initial_sound_id);
                self.fetches = Some(fetches);
            }
            Err(e) => warn!("Sound catalog unavailable: {}", e),
        }

        if let Some(path) = &self.song_path {
            match load_song(path, audio.sample_rate()) {
                Ok(song) => {
                    info!("Loaded song {} ({:.1}s); press S to play", path.display(), song.duration_s());
                    audio.song().load(song);
                }
                Err(e) => warn!("Song unavailable: {:#}", e),
            }
        }

        self.render_loop = Some(RenderLoop::new(Spectrogram::new(&self.render_config)));
        self.audio = Some(audio);
    }

    fn stop(&mut self, event_loop: &ActiveEventLoop) {
        if let Some((_, handle)) = &self.render_loop {
            handle.stop();
        }
        event_loop.exit();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.canvas.resize(width, height);
        if let Some((render_loop, _)) = self.render_loop.as_mut() {
            render_loop.on_resize(width);
        }
        if let Some(render_system) = self.render_system.as_mut() {
            render_system.resize(width, height);
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };

        match code {
            KeyCode::Enter | KeyCode::NumpadEnter => {
                if let (Some(sound_id), Some(fetches)) = (self.sound_input.submit(), self.fetches.as_mut()) {
                    fetches.request(&sound_id);
                }
            }
            KeyCode::Backspace => self.sound_input.backspace(),
            KeyCode::Escape if self.sound_input.is_focused() => self.sound_input.set_focus(false),
            KeyCode::Escape => self.stop(event_loop),
            KeyCode::KeyP if !self.sound_input.is_focused() => {
                if let Some(audio) = &self.audio {
                    info!("Saw sweep");
                    audio.trigger_sweep();
                }
            }
            KeyCode::KeyS if !self.sound_input.is_focused() => {
                if let Some(audio) = &self.audio {
                    audio.song().toggle();
                }
            }
            _ => {
                if let Some(text) = &event.text {
                    self.sound_input.key_text(text);
                }
            }
        }
    }

    /// Render a single frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        self.sound_input.tick(now);

        if let (Some(fetches), Some(audio)) = (self.fetches.as_mut(), self.audio.as_ref()) {
            fetches.poll(audio.convolver());
        }

        let painted = match (self.render_loop.as_mut(), self.audio.as_mut()) {
            (Some((render_loop, _)), Some(audio)) => {
                let (pre, post) = audio.analysers_mut();
                render_loop.run_frame(&mut self.canvas, pre, post)
            }
            _ => false,
        };

        // Overlay goes on a copy so the spectrogram keeps its history
        self.frame.clone_from(&self.canvas);
        self.sound_input.draw(&mut self.frame);

        if let Some(render_system) = self.render_system.as_mut() {
            match render_system.present(&self.frame) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    if let Some(window) = &self.window {
                        let size = window.inner_size();
                        render_system.resize(size.width, size.height);
                    }
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    error!("GPU out of memory");
                    self.stop(event_loop);
                    return;
                }
                Err(e) => warn!("Render error: {:?}", e),
            }
        }

        if painted {
            self.capture_frame(event_loop);
        }
    }

    /// Save the presented frame while recording
    fn capture_frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(config) = &self.recording_config else {
            return;
        };

        let path = config.frame_path(self.recorded_frames);
        if let Err(e) = image::save_buffer(
            &path,
            self.frame.as_bytes(),
            self.frame.width(),
            self.frame.height(),
            image::ColorType::Rgba8,
        ) {
            warn!("Failed to save frame {}: {}", self.recorded_frames, e);
        }
        self.recorded_frames += 1;

        if self.recorded_frames >= config.total_frames() {
            info!(
                "Recording complete: {} frames in {}",
                self.recorded_frames, config.output_dir
            );
            self.stop(event_loop);
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("Convolver")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(RenderSystem::new(Arc::clone(&window))) {
            Ok(render_system) => self.render_system = Some(render_system),
            Err(e) => {
                error!("Failed to initialize rendering: {}", e);
                event_loop.exit();
                return;
            }
        }

        let size = window.inner_size();
        self.resize(size.width, size.height);
        self.window = Some(window);

        self.start_audio();
        info!("Convolver is running; move the mouse to enter a sound id, P for a saw sweep, S for the song, ESC to quit");
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.stop(event_loop),
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x, position.y);
                self.sound_input.pointer_moved(Instant::now());
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                let focused = self.sound_input.contains(self.cursor.0, self.cursor.1);
                self.sound_input.set_focus(focused);
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                self.handle_key(event_loop, &event);
            }
            WindowEvent::RedrawRequested => self.render_frame(event_loop),
            _ => {}
        }
    }
}

/// Read and decode a song file at the session's sample rate
fn load_song(path: &Path, sample_rate: u32) -> Result<ImpulseBuffer> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let song = SampleDecoder::new(None)
        .decode(&bytes, sample_rate)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok(song)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    args.graph_params()
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid audio parameters")?;
    let recording_config = args
        .create_recording_config()
        .context("Failed to create recording directories")?;

    let mut app = App::new(&args, recording_config);
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
