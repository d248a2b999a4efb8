use super::*;
use crate::{
    controller::{ParameterController, Tuning},
    state::SharedControlState,
};
use mixer::{MixerSession, SimulatedEngine};
use shared::domain::{EngineVariant, ParamField, Target};
use std::{
    io::Cursor,
    sync::{Arc, Mutex},
};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().expect("buffer").clone()).expect("utf8")
    }
}

/// Blocks the hook thread until a key is sent or the sender is dropped.
struct BlockingSource(std::sync::mpsc::Receiver<KeyNotification>);

impl KeySource for BlockingSource {
    fn next_key(&mut self) -> Option<KeyNotification> {
        self.0.recv().ok()
    }
}

#[test]
fn parses_symbolic_names_and_raw_codes() {
    assert_eq!(
        parse_key_line("volume_up\n"),
        Some(KeyNotification::symbolic(MediaKey::VolumeUp))
    );
    assert_eq!(
        parse_key_line(" Media-Volume-Down "),
        Some(KeyNotification::symbolic(MediaKey::VolumeDown))
    );
    assert_eq!(
        parse_key_line("MUTE"),
        Some(KeyNotification::symbolic(MediaKey::Mute))
    );
    assert_eq!(parse_key_line("0xAF"), Some(KeyNotification::raw(0xAF)));
    assert_eq!(parse_key_line("174"), Some(KeyNotification::raw(0xAE)));
    assert_eq!(
        parse_key_line("space"),
        Some(KeyNotification::symbolic(MediaKey::Other))
    );
    assert_eq!(parse_key_line("   "), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn routes_keys_from_the_hook_thread_and_reports_decisions() {
    let engine = SimulatedEngine::new(EngineVariant::Potato);
    let state = Arc::new(SharedControlState::new(Target::strip(5)));
    let session = MixerSession::connect(&engine).await.expect("connect");
    state.install_session(Arc::new(session)).await;
    let router = EventRouter::new(
        Arc::clone(&state),
        ParameterController::new(Tuning::immediate()),
        1.0,
    );

    let echo = SharedBuf::default();
    let source = LineKeySource::new(Cursor::new("volume_up\n\nspace\n0xAF\nmute\n"))
        .with_echo(Box::new(echo.clone()));
    let capture = KeyCapture::spawn(source, router).expect("spawn");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while capture.is_alive() {
        assert!(tokio::time::Instant::now() < deadline, "capture never finished");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(echo.text(), "consumed\npass\nconsumed\nconsumed\n");
    assert_eq!(engine.parameter(Target::strip(5).param(ParamField::Gain)), 2.0);
    assert_eq!(engine.parameter(Target::strip(5).param(ParamField::Mute)), 1.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_ends_routing_within_the_timeout() {
    let state = Arc::new(SharedControlState::new(Target::strip(0)));
    let router = EventRouter::new(state, ParameterController::default(), 1.0);

    let (_keep_open, keys) = std::sync::mpsc::channel();
    let source = BlockingSource(keys);
    let capture = KeyCapture::spawn(source, router).expect("spawn");
    assert!(capture.is_alive());

    assert!(capture.stop(Duration::from_secs(1)).await);
}
