use crate::decoder::{BarcodeDecoder, PixelBuffer};
use crate::error::DecodeError;
use crate::messages::{DecodedSender, QrDecodedMessage};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Settings for one decode loop
#[derive(Debug, Clone, Copy)]
pub struct DecodeLoopConfig {
    /// Size of the pixel buffer frames are rendered into
    pub width: u32,
    pub height: u32,
    /// Halt after the first published result
    pub stop_after_first: bool,
}

/// Snapshot of the loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub frames: u64,
    pub dropped: u64,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    frames: AtomicU64,
    dropped: AtomicU64,
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> DecodeStats {
        DecodeStats {
            frames: self.frames.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// What happened to a frame-available notification
#[derive(Debug)]
pub enum FrameOutcome {
    /// A decode attempt was started; the handle resolves when it is finished
    /// and the busy flag has been cleared
    Dispatched(JoinHandle<()>),
    /// An attempt was already in flight
    Dropped,
    /// The loop has stopped after its first result
    Halted,
}

impl FrameOutcome {
    pub fn into_task(self) -> Option<JoinHandle<()>> {
        match self {
            Self::Dispatched(handle) => Some(handle),
            Self::Dropped | Self::Halted => None,
        }
    }
}

/// Clears the busy flag when the attempt ends, however it ends
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Frame decode loop
///
/// Each frame-available notification either claims the busy flag and starts
/// one decode attempt on the blocking pool, or is dropped. Nothing is queued.
pub struct FrameDecodeLoop<D: BarcodeDecoder> {
    decoder: Arc<D>,
    buffer: Arc<Mutex<PixelBuffer>>,
    busy: Arc<AtomicBool>,
    halted: Arc<watch::Sender<bool>>,
    stop_after_first: bool,
    events: DecodedSender,
    counters: Arc<Counters>,
    runtime: Handle,
}

impl<D: BarcodeDecoder> FrameDecodeLoop<D> {
    pub fn new(
        decoder: Arc<D>,
        config: DecodeLoopConfig,
        events: DecodedSender,
        runtime: Handle,
    ) -> Self {
        debug!(
            "Decode loop buffer {}x{}, stop_after_first={}",
            config.width, config.height, config.stop_after_first
        );

        let (halted, _) = watch::channel(false);

        Self {
            decoder,
            buffer: Arc::new(Mutex::new(PixelBuffer::new(config.width, config.height))),
            busy: Arc::new(AtomicBool::new(false)),
            halted: Arc::new(halted),
            stop_after_first: config.stop_after_first,
            events,
            counters: Arc::new(Counters::default()),
            runtime,
        }
    }

    /// Handle one frame-available notification
    pub fn on_frame_available(&self, frame: &RgbImage) -> FrameOutcome {
        self.counters.frames.fetch_add(1, Ordering::Relaxed);

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            trace!("Decode in flight, frame dropped");
            return FrameOutcome::Dropped;
        }
        let guard = BusyGuard(Arc::clone(&self.busy));

        // Re-checked under the busy flag; a publishing attempt halts before
        // it releases busy
        if self.is_halted() {
            return FrameOutcome::Halted;
        }

        // Only the busy-flag holder touches the buffer, so this never waits
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .render(frame);

        self.counters.attempts.fetch_add(1, Ordering::Relaxed);

        let decoder = Arc::clone(&self.decoder);
        let buffer = Arc::clone(&self.buffer);
        let counters = Arc::clone(&self.counters);
        let halted = Arc::clone(&self.halted);
        let events = self.events.clone();
        let stop_after_first = self.stop_after_first;

        let task = self.runtime.spawn(async move {
            let _guard = guard;

            let outcome = tokio::task::spawn_blocking(move || {
                let buffer = buffer.lock().unwrap_or_else(PoisonError::into_inner);
                decoder.decode(&buffer)
            })
            .await
            .unwrap_or_else(|e| Err(DecodeError::Worker(e.to_string())));

            match outcome {
                Ok(Some(result)) if !result.text.is_empty() => {
                    counters.successes.fetch_add(1, Ordering::Relaxed);
                    debug!(text = %result.text, "Decoded QR code");

                    if stop_after_first {
                        halted.send_replace(true);
                    }
                    if events.send(QrDecodedMessage::new(result.text)).is_err() {
                        debug!("No listener for decoded message");
                    }
                }
                Ok(_) => trace!("No symbol in frame"),
                Err(e) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "Decode attempt failed");
                }
            }
        });

        FrameOutcome::Dispatched(task)
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_halted(&self) -> bool {
        *self.halted.borrow()
    }

    /// Receiver that flips to `true` when the loop halts
    pub fn halted(&self) -> watch::Receiver<bool> {
        self.halted.subscribe()
    }

    pub fn stats(&self) -> DecodeStats {
        self.counters.snapshot()
    }
}
