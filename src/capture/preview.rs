use super::{FrameSource, PreviewProperties};
use crate::error::CaptureError;
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pause after a failed capture so a broken device does not spin the thread
const CAPTURE_ERROR_PAUSE: Duration = Duration::from_millis(50);

/// Callback invoked on the capture thread for every new frame
pub type FrameSubscriber = Box<dyn FnMut(&RgbImage) + Send>;

/// Runs a frame source on its own thread and delivers its frames to at most
/// one subscriber.
///
/// The source is built on the capture thread through a factory closure, so
/// it does not need to be `Send`.
pub struct PreviewPump {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    subscriber: Arc<Mutex<Option<FrameSubscriber>>>,
    properties: PreviewProperties,
    name: String,
}

impl PreviewPump {
    /// Open the source, start its preview and begin pumping frames.
    ///
    /// Returns once the preview has started, or with the error that
    /// prevented it. Frames captured before [`subscribe`](Self::subscribe)
    /// are discarded.
    pub fn start<S, F>(name: &str, open: F) -> Result<Self, CaptureError>
    where
        S: FrameSource + 'static,
        F: FnOnce() -> Result<S, CaptureError> + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let subscriber: Arc<Mutex<Option<FrameSubscriber>>> = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread_stop = Arc::clone(&stop_signal);
        let thread_subscriber = Arc::clone(&subscriber);
        let thread_name = name.to_string();

        info!(name = %name, "Starting preview");

        let thread_handle = thread::Builder::new()
            .name(format!("{name}-capture"))
            .spawn(move || {
                let mut source = match open() {
                    Ok(source) => source,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                match source.start_preview() {
                    Ok(properties) => {
                        let _ = ready_tx.send(Ok(properties));
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                }

                pump_frames(&thread_name, &mut source, &thread_stop, &thread_subscriber);

                if let Err(e) = source.stop_preview() {
                    warn!(name = %thread_name, error = %e, "Failed to stop preview");
                }
                info!(name = %thread_name, "Preview stopped");
            })
            .map_err(|e| CaptureError::PreviewStart(format!("failed to spawn capture thread: {e}")))?;

        let ready = ready_rx.recv().unwrap_or_else(|_| {
            Err(CaptureError::PreviewStart(
                "capture thread exited before the preview started".to_string(),
            ))
        });

        match ready {
            Ok(properties) => Ok(Self {
                thread_handle: Some(thread_handle),
                stop_signal,
                subscriber,
                properties,
                name: name.to_string(),
            }),
            Err(e) => {
                let _ = thread_handle.join();
                Err(e)
            }
        }
    }

    pub fn properties(&self) -> PreviewProperties {
        self.properties
    }

    /// Install the frame-available callback, replacing any previous one
    pub fn subscribe(&self, callback: FrameSubscriber) {
        if let Ok(mut slot) = self.subscriber.lock() {
            *slot = Some(callback);
            debug!(name = %self.name, "Frame subscriber attached");
        }
    }

    /// Remove the callback. Once this returns no further frames are delivered.
    pub fn unsubscribe(&self) {
        if let Ok(mut slot) = self.subscriber.lock() {
            if slot.take().is_some() {
                debug!(name = %self.name, "Frame subscriber detached");
            }
        }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Unsubscribe, stop the preview and wait for the capture thread
    pub fn stop(&mut self) {
        self.unsubscribe();
        self.stop_signal.store(true, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!(name = %self.name, "Capture thread panicked");
            }
        }
    }
}

impl Drop for PreviewPump {
    fn drop(&mut self) {
        self.stop();
    }
}

fn pump_frames<S: FrameSource>(
    name: &str,
    source: &mut S,
    stop_signal: &AtomicBool,
    subscriber: &Mutex<Option<FrameSubscriber>>,
) {
    debug!(name = %name, "Capture loop running");

    while !stop_signal.load(Ordering::SeqCst) {
        let frame = match source.capture_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(name = %name, error = %e, "Capture failed");
                thread::sleep(CAPTURE_ERROR_PAUSE);
                continue;
            }
        };

        // The lock is held for the whole callback so unsubscribe waits for
        // an in-progress notification.
        if let Ok(mut slot) = subscriber.lock() {
            if let Some(callback) = slot.as_mut() {
                callback(&frame);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingSource {
        started: bool,
        stopped: Arc<AtomicBool>,
    }

    impl FrameSource for CountingSource {
        fn start_preview(&mut self) -> Result<PreviewProperties, CaptureError> {
            self.started = true;
            Ok(PreviewProperties {
                width: 8,
                height: 6,
            })
        }

        fn stop_preview(&mut self) -> Result<(), CaptureError> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn capture_frame(&mut self) -> Result<RgbImage, CaptureError> {
            assert!(self.started);
            thread::sleep(Duration::from_millis(1));
            Ok(RgbImage::new(8, 6))
        }
    }

    struct BrokenSource;

    impl FrameSource for BrokenSource {
        fn start_preview(&mut self) -> Result<PreviewProperties, CaptureError> {
            Err(CaptureError::PreviewStart("device busy".to_string()))
        }

        fn stop_preview(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        fn capture_frame(&mut self) -> Result<RgbImage, CaptureError> {
            unreachable!()
        }
    }

    #[test]
    fn test_start_reports_properties_and_stop_stops_preview() {
        let stopped = Arc::new(AtomicBool::new(false));
        let source_stopped = Arc::clone(&stopped);

        let mut pump = PreviewPump::start("test", move || {
            Ok(CountingSource {
                started: false,
                stopped: source_stopped,
            })
        })
        .unwrap();

        assert_eq!(
            pump.properties(),
            PreviewProperties {
                width: 8,
                height: 6
            }
        );
        assert!(pump.is_running());

        pump.stop();
        assert!(!pump.is_running());
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_no_frames_after_unsubscribe() {
        let stopped = Arc::new(AtomicBool::new(false));
        let source_stopped = Arc::clone(&stopped);
        let mut pump = PreviewPump::start("test", move || {
            Ok(CountingSource {
                started: false,
                stopped: source_stopped,
            })
        })
        .unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        pump.subscribe(Box::new(move |frame| {
            assert_eq!(frame.dimensions(), (8, 6));
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        while count.load(Ordering::SeqCst) < 3 {
            thread::sleep(Duration::from_millis(1));
        }

        pump.unsubscribe();
        let after_unsubscribe = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), after_unsubscribe);

        pump.stop();
    }

    #[test]
    fn test_start_failure_is_returned() {
        let result = PreviewPump::start("test", || Ok(BrokenSource));
        assert!(matches!(result, Err(CaptureError::PreviewStart(_))));

        let result = PreviewPump::start::<BrokenSource, _>("test", || Err(CaptureError::NoCamera));
        assert!(matches!(result, Err(CaptureError::NoCamera)));
    }
}
