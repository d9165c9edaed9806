//! Strokescreen - console demo shell
//!
//! Runs one full screening session with simulated sensors and canned
//! collaborators against the configured analysis endpoint. The real
//! deployment replaces the collaborators with the platform camera, speech
//! recognizer, and audio player; the session core is identical.

use anyhow::Result;
use strokescreen::{
    AxisSample, CompletionCue, PhotoCapture, ScreeningConfig, SensorChannel, SensorSource,
    SessionEvent, SessionOrchestrator, SimulatedSensor, SpeechCapture,
};

/// Minimal 1x1 PNG standing in for the camera collaborator's output.
const DEMO_PHOTO: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

struct DemoCamera;

impl PhotoCapture for DemoCamera {
    fn request(&mut self) -> Option<Vec<u8>> {
        println!("[camera] captured demo photo ({} bytes)", DEMO_PHOTO.len());
        Some(DEMO_PHOTO.to_vec())
    }
}

struct DemoRecognizer;

impl SpeechCapture for DemoRecognizer {
    fn request(&mut self, prompt: &str) -> Option<String> {
        println!("[speech] prompt: {prompt}");
        Some("It was a pretty ordinary day.".to_string())
    }
}

struct DemoCue;

impl CompletionCue for DemoCue {
    fn play(&mut self) {
        println!("[audio] *measurement complete cue*");
    }
}

/// A gentle hand tremor around rest for the given channel.
fn simulated_channel(channel: SensorChannel) -> Box<dyn SensorSource> {
    Box::new(SimulatedSensor::new(channel, move |elapsed| {
        let t = elapsed.as_secs_f64();
        match channel {
            SensorChannel::Accel => AxisSample {
                x: 0.12 * (t * 11.0).sin(),
                y: 0.08 * (t * 7.0).cos(),
                z: 9.81 + 0.05 * (t * 13.0).sin(),
            },
            SensorChannel::Gyro => AxisSample {
                x: 0.02 * (t * 9.0).sin(),
                y: 0.015 * (t * 5.0).cos(),
                z: 0.01 * (t * 3.0).sin(),
            },
            SensorChannel::Gravity => AxisSample {
                x: 0.3 * (t * 0.5).sin(),
                y: 0.2,
                z: 9.79,
            },
        }
    }))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strokescreen=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-v") {
        println!("strokescreen {}", strokescreen::VERSION);
        return Ok(());
    }
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("Usage: strokescreen");
        println!();
        println!("Runs one demo screening session with simulated sensors.");
        println!("Set STROKESCREEN_ENDPOINT to point at the analysis server");
        println!("(default {}).", strokescreen::DEFAULT_ENDPOINT);
        return Ok(());
    }

    let config = ScreeningConfig::from_env();
    println!("strokescreen {} -> {}", strokescreen::VERSION, config.endpoint);

    let (events_tx, events_rx) = crossbeam_channel::unbounded();

    // Event printer: status lines as they come, timer at 1s granularity.
    let printer = std::thread::spawn(move || {
        let mut last_second = -1i64;
        for event in events_rx {
            match event {
                SessionEvent::StatusText { text } => println!("[screen] {text}"),
                SessionEvent::Tick { elapsed_ms } => {
                    let second = elapsed_ms / 1000;
                    if second != last_second {
                        last_second = second;
                        println!("[timer] {:.1} sec", elapsed_ms as f64 / 1000.0);
                    }
                }
                SessionEvent::StateChanged { .. } => {}
                SessionEvent::VerdictReady { verdict } => {
                    println!("[screen] verdict: {verdict:?}");
                }
            }
        }
    });

    let sources = vec![
        simulated_channel(SensorChannel::Accel),
        simulated_channel(SensorChannel::Gyro),
        simulated_channel(SensorChannel::Gravity),
    ];

    let mut session = SessionOrchestrator::new(
        config,
        sources,
        Box::new(DemoCamera),
        Box::new(DemoRecognizer),
        Box::new(DemoCue),
        events_tx,
    );

    session.begin()?;
    let verdict = session.confirm()?;

    drop(session);
    let _ = printer.join();

    println!("session finished: {verdict:?}");
    Ok(())
}
