//! Calib-capture binary: captures frames and logs calibrated pairs.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use calib_capture::{CaptureConfig, CaptureSession, LogPublisher, Parameters, Source};

/// Capture frames and attach reconciled calibration.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML parameter file.
    #[arg(long, env = "CALIB_CAPTURE_CONFIG")]
    config: Option<PathBuf>,
    /// V4L2 device index.
    #[arg(long, conflicts_with_all = ["device_path", "file"])]
    device_id: Option<u32>,
    /// V4L2 device node path.
    #[arg(long, conflicts_with = "file")]
    device_path: Option<PathBuf>,
    /// Image file or directory of images.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Calibration file URL.
    #[arg(long)]
    camera_info_url: Option<String>,
    /// Rescale calibration to the frame resolution on mismatch.
    #[arg(long)]
    rescale_camera_info: bool,
    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run() -> calib_capture::Result<()> {
    let args = Args::parse();

    let mut parameters = match &args.config {
        Some(path) => Parameters::load(path)?,
        None => Parameters::new(),
    };
    if let Some(url) = &args.camera_info_url {
        parameters.set("camera_info_url", url.as_str());
    }
    if args.rescale_camera_info {
        parameters.set("rescale_camera_info", true);
    }

    let mut config = CaptureConfig::from_parameters(parameters)?;
    if let Some(index) = args.device_id {
        config.source = Source::Index(index);
    }
    if let Some(path) = args.device_path {
        config.source = Source::Path(path);
    }
    if let Some(path) = args.file {
        config.source = Source::File(path);
    }

    log::info!("opening {} at {} Hz", config.source, config.rate());
    let is_file = matches!(config.source, Source::File(_));
    let period = config.period();
    let mut session = CaptureSession::open(config)?;
    let mut publisher = LogPublisher::default();

    let mut next_tick = Instant::now();
    while !matches!(args.frames, Some(limit) if publisher.published() >= limit) {
        if session.cycle() {
            session.publish(&mut publisher);
        } else if is_file {
            log::info!("end of file input");
            break;
        }

        let now = Instant::now();
        match next_tick.checked_add(period) {
            Some(deadline) if deadline > now => {
                std::thread::sleep(deadline - now);
                next_tick = deadline;
            }
            Some(_) => next_tick = now,
            None => std::thread::sleep(period),
        }
    }

    log::info!("published {} frame(s)", publisher.published());
    Ok(())
}
