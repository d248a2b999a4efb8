use std::{
    io::{self, BufRead, Write},
    thread,
    time::Duration,
};

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    router::{Disposition, EventRouter, KeyNotification, MediaKey},
    supervisor::Monitored,
};

/// Producer side of key capture. Runs on its own OS thread and may block.
pub trait KeySource: Send + 'static {
    /// Next key press, or `None` once the source is exhausted.
    fn next_key(&mut self) -> Option<KeyNotification>;

    /// Routing decision for the key last returned by `next_key`. Enforcing
    /// suppression at the platform level is up to the source.
    fn report(&mut self, _event: KeyNotification, _disposition: Disposition) {}
}

/// Reads one key per line: `volume_up`, `volume_down`, `mute`, a raw code
/// such as `0xAF` or `175`, or any other word for an unrelated key.
pub struct LineKeySource<R> {
    reader: R,
    echo: Option<Box<dyn Write + Send>>,
}

impl LineKeySource<io::BufReader<io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(io::BufReader::new(io::stdin())).with_echo(Box::new(io::stdout()))
    }
}

impl<R: BufRead + Send + 'static> LineKeySource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, echo: None }
    }

    /// Writes `consumed` or `pass` for every routed line.
    pub fn with_echo(mut self, echo: Box<dyn Write + Send>) -> Self {
        self.echo = Some(echo);
        self
    }
}

impl<R: BufRead + Send + 'static> KeySource for LineKeySource<R> {
    fn next_key(&mut self) -> Option<KeyNotification> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    if let Some(event) = parse_key_line(&line) {
                        return Some(event);
                    }
                }
                Err(err) => {
                    error!(%err, "key source read failed");
                    return None;
                }
            }
        }
    }

    fn report(&mut self, _event: KeyNotification, disposition: Disposition) {
        let Some(echo) = self.echo.as_mut() else {
            return;
        };
        let word = match disposition {
            Disposition::Consumed => "consumed",
            Disposition::PassThrough => "pass",
        };
        let _ = writeln!(echo, "{word}");
        let _ = echo.flush();
    }
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_key_line(line: &str) -> Option<KeyNotification> {
    let word = line.trim();
    if word.is_empty() {
        return None;
    }

    if let Some(hex) = word
        .strip_prefix("0x")
        .or_else(|| word.strip_prefix("0X"))
    {
        if let Ok(code) = u32::from_str_radix(hex, 16) {
            return Some(KeyNotification::raw(code));
        }
    }
    if let Ok(code) = word.parse::<u32>() {
        return Some(KeyNotification::raw(code));
    }

    let key = match word.to_ascii_lowercase().replace('-', "_").as_str() {
        "volume_up" | "media_volume_up" => MediaKey::VolumeUp,
        "volume_down" | "media_volume_down" => MediaKey::VolumeDown,
        "mute" | "volume_mute" | "media_volume_mute" => MediaKey::Mute,
        _ => MediaKey::Other,
    };
    Some(KeyNotification::symbolic(key))
}

struct KeyRequest {
    event: KeyNotification,
    reply: oneshot::Sender<Disposition>,
}

/// The running key-capture context: a hook thread feeding a routing task.
pub struct KeyCapture {
    task: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

impl KeyCapture {
    /// Starts `source` on a dedicated thread and routes its keys through
    /// `router`. Must be called from within a tokio runtime.
    pub fn spawn(source: impl KeySource, router: EventRouter) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel(16);
        let (stop, stop_rx) = watch::channel(false);

        thread::Builder::new()
            .name("key-capture".into())
            .spawn(move || hook_loop(source, tx))?;
        let task = tokio::spawn(route_loop(rx, router, stop_rx));

        Ok(Self { task, stop })
    }

    /// Asks the routing task to stop and waits up to `timeout` for it.
    /// The hook thread exits on its next key once routing is gone.
    pub async fn stop(self, timeout: Duration) -> bool {
        let _ = self.stop.send(true);
        tokio::time::timeout(timeout, self.task).await.is_ok()
    }
}

impl Monitored for KeyCapture {
    fn name(&self) -> &str {
        "key capture"
    }

    fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }
}

fn hook_loop(mut source: impl KeySource, tx: mpsc::Sender<KeyRequest>) {
    while let Some(event) = source.next_key() {
        let (reply, decision) = oneshot::channel();
        if tx.blocking_send(KeyRequest { event, reply }).is_err() {
            break;
        }
        let disposition = decision.blocking_recv().unwrap_or(Disposition::PassThrough);
        source.report(event, disposition);
    }
    info!("key source finished");
}

async fn route_loop(
    mut rx: mpsc::Receiver<KeyRequest>,
    router: EventRouter,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    debug!("key routing stopping");
                    break;
                }
            }
            request = rx.recv() => {
                let Some(KeyRequest { event, reply }) = request else {
                    warn!("key source closed");
                    break;
                };
                let disposition = dispatch(&router, event).await;
                let _ = reply.send(disposition);
            }
        }
    }
}

/// Runs one event in its own task so a panic while handling it is contained
/// to that event.
async fn dispatch(router: &EventRouter, event: KeyNotification) -> Disposition {
    let router = router.clone();
    match tokio::spawn(async move { router.handle(event).await }).await {
        Ok(disposition) => disposition,
        Err(err) => {
            error!(?event, %err, "key handling failed");
            Disposition::PassThrough
        }
    }
}

#[cfg(test)]
#[path = "tests/capture_tests.rs"]
mod tests;
