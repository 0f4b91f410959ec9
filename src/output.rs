use crate::command::Caller;
use crate::host::HostThread;
use std::io::Write;
use std::sync::Arc;

/// Host side of chat/console output. Implementations are only ever called on the
/// privileged thread.
pub trait MessageSink: Send + Sync + 'static {
    /// Say something to everyone.
    fn broadcast(&self, text: &str);
    /// Say something to one caller.
    fn send_to(&self, caller: &Caller, text: &str);
}

/// Routes output to the sink, hopping onto the privileged thread when needed.
#[derive(Clone)]
pub struct Messenger {
    host: Arc<dyn HostThread>,
    sink: Arc<dyn MessageSink>,
}

impl Messenger {
    pub fn new(host: Arc<dyn HostThread>, sink: Arc<dyn MessageSink>) -> Self {
        Self { host, sink }
    }

    pub fn broadcast(&self, text: impl Into<String>) {
        let text = text.into();
        if self.host.is_privileged() {
            self.sink.broadcast(&text);
            return;
        }

        let sink = self.sink.clone();
        self.host.run_on_privileged(Box::new(move || sink.broadcast(&text)));
    }

    pub fn send_to(&self, caller: &Caller, text: impl Into<String>) {
        let text = text.into();
        if self.host.is_privileged() {
            self.sink.send_to(caller, &text);
            return;
        }

        let sink = self.sink.clone();
        let caller = caller.clone();
        self.host.run_on_privileged(Box::new(move || sink.send_to(&caller, &text)));
    }

    pub fn host(&self) -> &Arc<dyn HostThread> {
        &self.host
    }
}

/// Writes everything to stdout. Player-directed lines are prefixed with the player's name.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl MessageSink for StdoutSink {
    fn broadcast(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "[all] {text}");
    }

    fn send_to(&self, caller: &Caller, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = match caller {
            Caller::Console => writeln!(out, "{text}"),
            Caller::Player { name, .. } => writeln!(out, "[to {name}] {text}"),
        };
    }
}
