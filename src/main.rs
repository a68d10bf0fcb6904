mod capture;
mod config;
mod decoder;
mod dialog;
mod error;
mod messages;
mod scanner;
mod view_model;

use anyhow::{Context, Result};
use capture::{CameraSelection, FrameSource, ImageSequenceSource, WebcamCapture};
use clap::Parser;
use config::ScannerConfig;
use decoder::DecodeOptions;
use dialog::ConsoleDialog;
use scanner::ScannerView;
use std::path::PathBuf;
use view_model::MainViewModel;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Open the first camera whose name contains this text (e.g. "back")
    #[arg(long)]
    camera_name: Option<String>,

    /// Replay these images as the preview instead of opening a camera
    #[arg(long, num_args = 1..)]
    images: Vec<PathBuf>,

    /// Width of the decode buffer; height keeps the preview aspect ratio
    #[arg(long, default_value_t = config::DEFAULT_PREVIEW_WIDTH)]
    preview_width: u32,

    /// Frames per second when replaying images
    #[arg(long, default_value_t = config::DEFAULT_REPLAY_FPS)]
    fps: u32,

    /// Exit after the first decoded code
    #[arg(long)]
    stop_after_first: bool,

    /// Skip the inverted-image retry when nothing is found
    #[arg(long)]
    no_try_harder: bool,

    /// Dialog title for decoded messages
    #[arg(long, default_value = config::DEFAULT_TITLE)]
    title: String,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> ScannerConfig {
        ScannerConfig {
            camera: CameraSelection {
                index: self.input_device,
                name: self.camera_name,
            },
            images: self.images,
            preview_width: self.preview_width,
            replay_fps: self.fps,
            stop_after_first: self.stop_after_first,
            decode: DecodeOptions {
                try_harder: !self.no_try_harder,
            },
            title: self.title,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = args.into_config();

    tracing::info!("QRReader starting");
    tracing::info!("Decode width: {}", config.preview_width);
    tracing::info!("Try harder: {}", config.decode.try_harder);

    let (events, receiver) = messages::channel();

    let mut view_model = MainViewModel::new(ConsoleDialog::stdout(), config.title.clone());
    view_model.activate(receiver);

    let mut view = ScannerView::new(
        decoder::create_default_decoder(config.decode),
        events,
        tokio::runtime::Handle::current(),
        &config,
    );

    // Opening the source and joining the capture thread both block
    tokio::task::block_in_place(|| {
        if config.uses_camera() {
            let selection = config.camera.clone();
            init_view(&mut view, move || WebcamCapture::new(&selection))
                .context("Failed to initialize camera preview")
        } else {
            let images = config.images.clone();
            let fps = config.replay_fps;
            init_view(&mut view, move || ImageSequenceSource::open(&images, fps))
                .context("Failed to initialize image replay")
        }
    })?;

    let mut halted = view.halted()?;

    if config.stop_after_first {
        tracing::info!("Waiting for the first code, press Ctrl+C to stop");
    } else {
        tracing::info!("Scanning, press Ctrl+C to stop");
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            tracing::info!("Interrupted");
        }
        _ = halted.wait_for(|h| *h) => {
            tracing::info!("Code decoded, stopping");
        }
    }

    tokio::task::block_in_place(|| view.clean());
    view.settle().await;
    if let Ok(stats) = view.stats() {
        tracing::info!(
            "Frames={}, dropped={}, attempts={}, decoded={}, failed={}",
            stats.frames,
            stats.dropped,
            stats.attempts,
            stats.successes,
            stats.failures
        );
    }

    // Dropping the view releases the last sender, letting the relay drain
    drop(view);
    let shown = view_model.closed().await;
    tracing::info!("Showed {} decoded message(s)", shown);

    Ok(())
}

fn init_view<S, F>(view: &mut ScannerView<decoder::RqrrDecoder>, open: F) -> Result<()>
where
    S: FrameSource + 'static,
    F: FnOnce() -> Result<S, error::CaptureError> + Send + 'static,
{
    let properties = view.init(open)?;
    tracing::info!("Preview: {}x{}", properties.width, properties.height);
    Ok(())
}
