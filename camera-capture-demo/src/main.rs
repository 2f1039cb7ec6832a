//! Headless walk-through of a capture session on the virtual backend.
//!
//! Usage: `camera-capture-demo [config.json]`. Set `RUST_LOG=debug` to see
//! the orchestrator's own logging.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use camera_capture_core::{
    CameraConfiguration, CaptureSessionOrchestrator, FlashMode, HostSignal, LifecycleBridge,
    OutputKind, PermissionGate, Subscription, VideoOrientation, VirtualCaptureDevice,
    VirtualPermissionAuthority,
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => CameraConfiguration::load(Path::new(&path))?,
        None => CameraConfiguration::default(),
    };
    println!("configuration: {}", serde_json::to_string(&config)?);

    let device = VirtualCaptureDevice::new();
    let authority = Arc::new(VirtualPermissionAuthority::answering(true, false));
    let gate = PermissionGate::new(authority);
    let session = Arc::new(CaptureSessionOrchestrator::new(config, device.clone(), gate)?);
    let events = session.subscribe();
    let bridge = LifecycleBridge::new(&session);

    let result = bridge.view_did_load()?.wait()?;
    println!("setup: {}", serde_json::to_string(&result)?);
    print_events(&events)?;

    if let Err(e) = session.switch_active_camera().wait()? {
        println!("switch failed: {}", e);
    }
    println!("flash on: {}", session.set_flash_mode(FlashMode::On));
    session.set_zoom_factor(2.5);
    bridge.handle(HostSignal::DeviceOrientationChanged(VideoOrientation::LandscapeLeft))?;
    session.flush().wait()?;
    print_events(&events)?;

    bridge.handle(HostSignal::ViewDidDisappear)?;
    bridge.handle(HostSignal::DidEnterBackground)?;
    session.flush().wait()?;
    device.drop_output(OutputKind::Movie);

    bridge.handle(HostSignal::WillEnterForeground)?;
    bridge.handle(HostSignal::ViewDidAppear)?;
    session.flush().wait()?;
    print_events(&events)?;

    println!("snapshot: {}", serde_json::to_string_pretty(&session.snapshot())?);
    drop(session);

    // Teardown runs on drop; its phase change is the last event.
    if let Some(event) = events.next_timeout(Duration::from_millis(100)) {
        println!("event: {}", serde_json::to_string(&event)?);
    }
    Ok(())
}

fn print_events(events: &Subscription) -> Result<(), serde_json::Error> {
    for event in events.drain() {
        println!("event: {}", serde_json::to_string(&event)?);
    }
    Ok(())
}
