//! End-to-end session tests over image files on disk.

use std::path::Path;
use std::time::Duration;

use calib_capture::calibration::Resolution;
use calib_capture::validation::{validate_frame_sequence, validate_pair};
use calib_capture::{
    CalibrationRecord, CalibrationStore, CaptureConfig, CaptureError, CaptureSession,
    Parameters, Publisher, ReconciliationOutcome, Source,
};
use image::{Rgb, RgbImage};

#[derive(Default)]
struct Recorder {
    frames: Vec<calib_capture::Frame>,
    calibrations: Vec<CalibrationRecord>,
}

impl Publisher for Recorder {
    fn publish(&mut self, frame: &calib_capture::Frame, calibration: &CalibrationRecord) {
        self.frames.push(frame.clone());
        self.calibrations.push(calibration.clone());
    }
}

fn write_sequence(dir: &Path, count: u32, width: u32, height: u32) {
    for i in 0..count {
        let shade = u8::try_from(i * 10).expect("shade fits in u8");
        RgbImage::from_pixel(width, height, Rgb([shade, shade, shade]))
            .save(dir.join(format!("frame_{i:03}.png")))
            .expect("write png");
    }
}

fn write_calibration(path: &Path) {
    let mut store = CalibrationStore::new("bench");
    store.set(CalibrationRecord {
        width: 640,
        height: 480,
        distortion_model: "plumb_bob".to_owned(),
        d: vec![0.1, -0.2, 0.0, 0.0, 0.0],
        k: [500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0],
        r: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        p: [500.0, 0.0, 320.0, 12.5, 0.0, 500.0, 240.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        ..CalibrationRecord::default()
    })
    .expect("set calibration");
    store.save(path).expect("save calibration");
}

fn file_config(frames: &Path, calibration_url: &str, rescale: bool) -> CaptureConfig {
    let text = format!(
        r#"
        file = "{}"
        frame_id = "bench_optical"
        camera_name = "bench"
        camera_info_url = "{calibration_url}"
        rescale_camera_info = {rescale}
        capture_delay = 0.05
        "#,
        frames.display()
    );
    CaptureConfig::from_parameters(Parameters::parse(&text).expect("parameters")).expect("config")
}

#[test]
fn test_session_rescales_file_sequence() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames = dir.path().join("frames");
    std::fs::create_dir(&frames).expect("mkdir");
    write_sequence(&frames, 3, 320, 240);
    write_calibration(&dir.path().join("bench.toml"));

    let url = format!("file://{}/${{NAME}}.toml", dir.path().display());
    let mut session = CaptureSession::open(file_config(&frames, &url, true)).expect("open");
    assert!(session.store().is_calibrated());

    let mut recorder = Recorder::default();
    while session.cycle() {
        assert!(session.publish(&mut recorder));
    }

    assert_eq!(recorder.frames.len(), 3);
    validate_frame_sequence(&recorder.frames).expect("sequence");
    for (frame, calibration) in recorder.frames.iter().zip(&recorder.calibrations) {
        validate_pair(frame, calibration).expect("pair");
        assert_eq!(frame.frame_id, "bench_optical");
        assert_eq!(calibration.k[0].to_bits(), 250.0_f64.to_bits());
        assert_eq!(calibration.p[3].to_bits(), 12.5_f64.to_bits());
        assert_eq!(calibration.d, vec![0.1, -0.2, 0.0, 0.0, 0.0]);
    }
    assert_eq!(
        session.last_outcome(),
        Some(ReconciliationOutcome::MismatchAutoRescale {
            from: Resolution::new(640, 480),
            to: Resolution::new(320, 240),
        })
    );
}

#[test]
fn test_session_without_rescale_keeps_stale_calibration() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames = dir.path().join("frames");
    std::fs::create_dir(&frames).expect("mkdir");
    write_sequence(&frames, 2, 320, 240);
    let calibration = dir.path().join("bench.toml");
    write_calibration(&calibration);

    let url = calibration.display().to_string();
    let mut session = CaptureSession::open(file_config(&frames, &url, false)).expect("open");

    assert!(session.cycle());
    assert_eq!(session.calibration().resolution(), Resolution::new(640, 480));
    assert_eq!(session.calibration().k[0].to_bits(), 500.0_f64.to_bits());
    assert!(matches!(
        session.last_outcome(),
        Some(ReconciliationOutcome::MismatchWarn { .. })
    ));
}

#[test]
fn test_session_with_invalid_url_runs_uncalibrated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let frames = dir.path().join("frames");
    std::fs::create_dir(&frames).expect("mkdir");
    write_sequence(&frames, 1, 64, 48);

    let mut session =
        CaptureSession::open(file_config(&frames, "package://bench/calib.yaml", true))
            .expect("open");
    assert!(!session.store().is_calibrated());

    assert!(session.cycle());
    assert_eq!(session.last_outcome(), Some(ReconciliationOutcome::Unset));
    assert_eq!(session.calibration().resolution(), Resolution::new(64, 48));
    assert!(!session.cycle());
}

#[test]
fn test_capture_delay_is_applied() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_sequence(dir.path(), 1, 8, 8);
    let config = file_config(dir.path(), "", false);
    assert_eq!(config.capture_delay, Duration::from_millis(50));

    let before = std::time::SystemTime::now();
    let mut session = CaptureSession::open(config).expect("open");
    assert!(session.cycle());
    let stamp = session.frame().expect("frame").stamp;
    assert!(stamp <= std::time::SystemTime::now() - Duration::from_millis(50));
    assert!(stamp >= before - Duration::from_millis(50));
}

#[test]
fn test_missing_source_aborts_startup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nothing-here");
    let mut config = file_config(dir.path(), "", false);
    config.source = Source::File(missing.clone());

    let Err(CaptureError::Device(message)) = CaptureSession::open(config) else {
        unreachable!("a missing file cannot be opened");
    };
    assert!(message.contains(&missing.display().to_string()), "{message}");
}

#[test]
fn test_missing_device_path_aborts_startup() {
    let mut config = CaptureConfig::from_parameters(Parameters::new()).expect("config");
    config.source = Source::Path("/dev/calib-capture-no-such-node".into());

    let Err(CaptureError::Device(message)) = CaptureSession::open(config) else {
        unreachable!("a missing device node cannot be opened");
    };
    assert!(message.contains("/dev/calib-capture-no-such-node"), "{message}");
}
