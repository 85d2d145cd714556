//! Backing track voice: play/pause toggle feeding the master gain.

use std::sync::mpsc::Sender;

use super::buffer::ImpulseBuffer;

/// Commands from the control thread
pub(crate) enum SongCommand {
    Load(Box<SongVoice>),
    Toggle,
}

/// Loads and toggles the song on the audio thread
#[derive(Clone)]
pub struct SongControl(pub(crate) Sender<SongCommand>);

impl SongControl {
    /// Replace the song; it starts paused at the beginning
    pub fn load(&self, song: ImpulseBuffer) {
        if self.0.send(SongCommand::Load(Box::new(SongVoice::new(song)))).is_err() {
            tracing::debug!("audio graph dropped; song ignored");
        }
    }

    /// Play if paused, pause if playing
    pub fn toggle(&self) {
        if self.0.send(SongCommand::Toggle).is_err() {
            tracing::debug!("audio graph dropped; song toggle ignored");
        }
    }
}

/// A decoded song with a play position
///
/// Plays once; reaching the end pauses and rewinds, so the next toggle starts over.
#[derive(Debug)]
pub struct SongVoice {
    song: ImpulseBuffer,
    position: usize,
    playing: bool,
}

impl SongVoice {
    pub fn new(song: ImpulseBuffer) -> Self {
        Self {
            song,
            position: 0,
            playing: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn toggle(&mut self) {
        self.playing = !self.playing && !self.song.is_empty();
    }

    /// Add the song into a stereo pair; mono songs feed both sides
    pub fn mix_into(&mut self, left: &mut [f32], right: &mut [f32]) {
        if !self.playing {
            return;
        }

        let right_channel = if self.song.channel_count() > 1 { 1 } else { 0 };
        let l_src = &self.song.channel(0)[self.position..];
        let r_src = &self.song.channel(right_channel)[self.position..];
        let frames = left.len().min(right.len()).min(l_src.len());

        for (out, &s) in left.iter_mut().zip(&l_src[..frames]) {
            *out += s;
        }
        for (out, &s) in right.iter_mut().zip(&r_src[..frames]) {
            *out += s;
        }

        self.position += frames;
        if self.position >= self.song.len() {
            self.position = 0;
            self.playing = false;
        }
    }
}
