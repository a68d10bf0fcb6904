use super::decode_loop::{DecodeLoopConfig, DecodeStats, FrameDecodeLoop};
use super::fps::FpsMeter;
use crate::capture::{FrameSource, PreviewProperties, PreviewPump};
use crate::config::{ScannerConfig, STATS_INTERVAL};
use crate::decoder::BarcodeDecoder;
use crate::error::{CaptureError, ScanError};
use crate::messages::DecodedSender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Scanner screen: owns the preview and the decode loop for as long as it
/// is shown.
pub struct ScannerView<D: BarcodeDecoder> {
    decoder: Arc<D>,
    events: DecodedSender,
    runtime: Handle,
    preview_width: u32,
    stop_after_first: bool,
    pump: Option<PreviewPump>,
    decode_loop: Option<Arc<FrameDecodeLoop<D>>>,
    initialized: Arc<AtomicBool>,
    in_flight: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<D: BarcodeDecoder> ScannerView<D> {
    pub fn new(decoder: D, events: DecodedSender, runtime: Handle, config: &ScannerConfig) -> Self {
        Self {
            decoder: Arc::new(decoder),
            events,
            runtime,
            preview_width: config.preview_width,
            stop_after_first: config.stop_after_first,
            pump: None,
            decode_loop: None,
            initialized: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the preview and subscribe the decode loop to its frames
    pub fn init<S, F>(&mut self, open: F) -> Result<PreviewProperties, ScanError>
    where
        S: FrameSource + 'static,
        F: FnOnce() -> Result<S, CaptureError> + Send + 'static,
    {
        self.clean();

        let pump = PreviewPump::start("qrreader", open)?;
        let properties = pump.properties();
        let (width, height) = properties.scaled_to_width(self.preview_width);

        tracing::info!(
            "Preview {}x{}, decoding at {}x{}",
            properties.width,
            properties.height,
            width,
            height
        );

        let decode_loop = Arc::new(FrameDecodeLoop::new(
            Arc::clone(&self.decoder),
            DecodeLoopConfig {
                width,
                height,
                stop_after_first: self.stop_after_first,
            },
            self.events.clone(),
            self.runtime.clone(),
        ));

        let subscriber_loop = Arc::clone(&decode_loop);
        let initialized = Arc::clone(&self.initialized);
        let in_flight = Arc::clone(&self.in_flight);
        let mut fps = FpsMeter::new(STATS_INTERVAL);

        pump.subscribe(Box::new(move |frame| {
            if !initialized.load(Ordering::Acquire) {
                return;
            }

            if let Some(task) = subscriber_loop.on_frame_available(frame).into_task() {
                *in_flight.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
            }

            if let Some(rate) = fps.tick() {
                let stats = subscriber_loop.stats();
                tracing::info!(
                    "FPS: {:.1} (frames={}, dropped={}, attempts={}, decoded={}, failed={})",
                    rate,
                    stats.frames,
                    stats.dropped,
                    stats.attempts,
                    stats.successes,
                    stats.failures
                );
            }
        }));

        self.pump = Some(pump);
        self.decode_loop = Some(decode_loop);
        self.initialized.store(true, Ordering::Release);

        Ok(properties)
    }

    /// Unsubscribe from frames and stop the preview. Safe to call repeatedly.
    pub fn clean(&mut self) {
        self.initialized.store(false, Ordering::Release);

        if let Some(mut pump) = self.pump.take() {
            pump.stop();
            tracing::info!("Scanner preview closed");
        }
    }

    /// Wait for the decode attempt still running after [`clean`](Self::clean),
    /// so its result is published and counted
    pub async fn settle(&self) {
        let task = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Decode task did not finish");
            }
        }
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> Result<DecodeStats, ScanError> {
        self.decode_loop
            .as_ref()
            .map(|l| l.stats())
            .ok_or(ScanError::NotInitialized)
    }

    /// Receiver that flips to `true` once the decode loop halts
    pub fn halted(&self) -> Result<watch::Receiver<bool>, ScanError> {
        self.decode_loop
            .as_ref()
            .map(|l| l.halted())
            .ok_or(ScanError::NotInitialized)
    }
}

impl<D: BarcodeDecoder> Drop for ScannerView<D> {
    fn drop(&mut self) {
        self.clean();
    }
}
