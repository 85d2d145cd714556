//! Partitioned FFT convolution with lock-free buffer replacement.
//!
//! The impulse response is split into partitions of one processing block and
//! convolved with uniformly partitioned overlap-save. New responses are
//! prepared on the caller's thread and handed to the audio thread over a
//! channel; they take effect at the start of the next block.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use super::buffer::ImpulseBuffer;
use crate::params::audio_constants::BLOCK_SIZE;

const PARTITION: usize = BLOCK_SIZE;
const FFT_SIZE: usize = 2 * BLOCK_SIZE;

const ZERO: Complex<f32> = Complex { re: 0.0, im: 0.0 };

/// Frequency-domain partitions of an impulse response, ready for the audio thread
pub struct ConvolverKernel {
    /// [channel][partition][bin]
    channels: Vec<Vec<Vec<Complex<f32>>>>,
}

impl ConvolverKernel {
    /// Prepare `buffer` for convolution at `sample_rate`
    ///
    /// Responses longer than `max_duration_s` are truncated, before and after
    /// resampling to `sample_rate`. At most two channels are used.
    pub fn new(buffer: &ImpulseBuffer, sample_rate: u32, normalize: bool, max_duration_s: f32) -> Self {
        let buffer = buffer
            .truncated(max_duration_s)
            .resampled(sample_rate)
            .truncated(max_duration_s);
        let scale = if normalize {
            buffer.normalization_scale()
        } else {
            1.0
        };

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        let channels = buffer
            .channels()
            .iter()
            .take(2)
            .map(|samples| {
                samples
                    .chunks(PARTITION)
                    .map(|chunk| {
                        let mut spectrum = vec![ZERO; FFT_SIZE];
                        for (bin, &s) in spectrum.iter_mut().zip(chunk) {
                            bin.re = s * scale;
                        }
                        fft.process(&mut spectrum);
                        spectrum
                    })
                    .collect()
            })
            .collect();

        Self { channels }
    }

    pub fn partition_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Kernel plus a zeroed input history ring sized for it
///
/// Both are allocated on the control thread; the audio thread only swaps them in
/// and hands the previous pair back for dropping.
struct KernelSwap {
    kernel: Option<Arc<ConvolverKernel>>,
    history: Vec<Vec<Complex<f32>>>,
}

impl KernelSwap {
    fn prepare(kernel: ConvolverKernel) -> Self {
        let history = vec![vec![ZERO; FFT_SIZE]; kernel.partition_count()];
        Self {
            kernel: Some(Arc::new(kernel)),
            history,
        }
    }
}

/// Convolver node living on the audio thread
pub struct Convolver {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    kernel: Option<Arc<ConvolverKernel>>,
    updates: Receiver<KernelSwap>,
    retired: Sender<KernelSwap>,
    /// Previous block followed by the current block
    window: Vec<f32>,
    /// Ring of input spectra, one per partition
    history: Vec<Vec<Complex<f32>>>,
    head: usize,
    spectrum: Vec<Complex<f32>>,
    accumulator: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

/// Create a convolver and its control handle, seeded with `initial`
///
/// Impulse responses longer than `max_duration_s` are truncated.
pub fn convolver(
    initial: ImpulseBuffer,
    sample_rate: u32,
    normalize: bool,
    max_duration_s: f32,
) -> (Convolver, ConvolverHandle) {
    let (sender, receiver) = mpsc::channel();
    let (retired_sender, retired_receiver) = mpsc::channel();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(FFT_SIZE);
    let ifft = planner.plan_fft_inverse(FFT_SIZE);
    let scratch_len = fft
        .get_inplace_scratch_len()
        .max(ifft.get_inplace_scratch_len());

    let convolver = Convolver {
        fft,
        ifft,
        kernel: None,
        updates: receiver,
        retired: retired_sender,
        window: vec![0.0; FFT_SIZE],
        history: Vec::new(),
        head: 0,
        spectrum: vec![ZERO; FFT_SIZE],
        accumulator: vec![ZERO; FFT_SIZE],
        scratch: vec![ZERO; scratch_len],
    };

    let handle = ConvolverHandle {
        current: Arc::new(Mutex::new(Arc::new(ImpulseBuffer::new(sample_rate, vec![])))),
        updates: sender,
        retired: Arc::new(Mutex::new(retired_receiver)),
        sample_rate,
        normalize,
        max_duration_s,
    };
    handle.set_buffer(initial);

    (convolver, handle)
}

impl Convolver {
    /// Install the most recent pending kernel; replaced ones go back to the control side
    fn apply_updates(&mut self) {
        while let Ok(mut swap) = self.updates.try_recv() {
            std::mem::swap(&mut self.kernel, &mut swap.kernel);
            std::mem::swap(&mut self.history, &mut swap.history);
            self.head = 0;
            self.window.fill(0.0);
            // Control side gone: the old kernel is dropped here instead
            let _ = self.retired.send(swap);
        }
    }

    /// Convolve one block of mono input into stereo output
    ///
    /// All slices must be `BLOCK_SIZE` long. Outputs silence until a kernel is installed.
    pub fn process(&mut self, input: &[f32], left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(input.len(), PARTITION);
        self.apply_updates();

        let kernel = match &self.kernel {
            Some(kernel) if kernel.partition_count() > 0 => Arc::clone(kernel),
            _ => {
                left.fill(0.0);
                right.fill(0.0);
                return;
            }
        };

        self.window.copy_within(PARTITION.., 0);
        self.window[PARTITION..].copy_from_slice(input);
        for (bin, &s) in self.spectrum.iter_mut().zip(&self.window) {
            *bin = Complex::new(s, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);
        self.history[self.head].copy_from_slice(&self.spectrum);

        self.convolve_channel(&kernel.channels[0], left);
        match kernel.channels.get(1) {
            Some(partitions) => self.convolve_channel(partitions, right),
            None => right.copy_from_slice(left),
        }

        self.head = (self.head + 1) % self.history.len();
    }

    /// Partitions in the installed kernel
    pub fn partition_count(&self) -> usize {
        self.kernel.as_ref().map_or(0, |k| k.partition_count())
    }

    fn convolve_channel(&mut self, partitions: &[Vec<Complex<f32>>], out: &mut [f32]) {
        let count = self.history.len();
        self.accumulator.fill(ZERO);
        for (p, h) in partitions.iter().enumerate() {
            let x = &self.history[(self.head + count - p) % count];
            for ((acc, &xv), &hv) in self.accumulator.iter_mut().zip(x).zip(h) {
                *acc += xv * hv;
            }
        }
        self.ifft
            .process_with_scratch(&mut self.accumulator, &mut self.scratch);

        let norm = 1.0 / FFT_SIZE as f32;
        for (o, v) in out.iter_mut().zip(&self.accumulator[PARTITION..]) {
            *o = v.re * norm;
        }
    }
}

/// Control side of the convolver: replace and read back the impulse buffer
#[derive(Clone)]
pub struct ConvolverHandle {
    current: Arc<Mutex<Arc<ImpulseBuffer>>>,
    updates: Sender<KernelSwap>,
    retired: Arc<Mutex<Receiver<KernelSwap>>>,
    sample_rate: u32,
    normalize: bool,
    max_duration_s: f32,
}

impl ConvolverHandle {
    /// Replace the impulse buffer
    ///
    /// The new buffer is visible to `buffer()` immediately and audible from the
    /// next processing block. Responses longer than the configured maximum are
    /// truncated for playback.
    pub fn set_buffer(&self, buffer: ImpulseBuffer) {
        self.release_retired();

        let kernel = ConvolverKernel::new(&buffer, self.sample_rate, self.normalize, self.max_duration_s);
        if buffer.duration_s() > self.max_duration_s {
            tracing::info!(
                "Impulse of {:.2}s truncated to {:.2}s",
                buffer.duration_s(),
                self.max_duration_s
            );
        }
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(buffer);
        if self.updates.send(KernelSwap::prepare(kernel)).is_err() {
            tracing::debug!("convolver dropped; buffer stored without playback");
        }
    }

    /// Currently active impulse buffer
    pub fn buffer(&self) -> Arc<ImpulseBuffer> {
        Arc::clone(&self.current.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Drop kernels the audio thread has replaced; returns how many were released
    pub fn release_retired(&self) -> usize {
        let retired = self.retired.lock().unwrap_or_else(PoisonError::into_inner);
        retired.try_iter().count()
    }
}
