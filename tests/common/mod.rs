#![allow(dead_code)]

use extended_commands::{Caller, Dispatcher, HostThread, MessageSink, Messenger};
use extended_commands::host::MainJob;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Remembers every delivered line.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<(Option<Caller>, String)>>,
}

impl RecordingSink {
    /// Lines sent to `caller`, in order.
    pub fn to(&self, caller: &Caller) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(c, _)| c.as_ref() == Some(caller))
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub fn broadcasts(&self) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(c, _)| c.is_none())
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }
}

impl MessageSink for RecordingSink {
    fn broadcast(&self, text: &str) {
        self.lines.lock().push((None, text.to_string()));
    }

    fn send_to(&self, caller: &Caller, text: &str) {
        self.lines.lock().push((Some(caller.clone()), text.to_string()));
    }
}

/// Treats every thread as privileged, so delivery happens on the spot.
pub struct InlineHost;

impl HostThread for InlineHost {
    fn is_privileged(&self) -> bool {
        true
    }

    fn run_on_privileged(&self, job: MainJob) {
        job();
    }
}

pub fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("runtime")
}

pub struct Harness {
    pub runtime: Runtime,
    pub dispatcher: Dispatcher,
    pub sink: Arc<RecordingSink>,
}

/// Dispatcher on a fresh runtime with inline delivery into a recording sink.
pub fn harness() -> Harness {
    let runtime = runtime();
    let sink = Arc::new(RecordingSink::default());
    let messenger = Messenger::new(Arc::new(InlineHost), sink.clone());
    let dispatcher = Dispatcher::new(runtime.handle().clone(), messenger);
    Harness { runtime, dispatcher, sink }
}

pub fn tokens(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

pub fn player() -> Caller {
    Caller::player("42", "ada")
}
