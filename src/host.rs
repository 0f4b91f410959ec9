//! The host's privileged ("main"/game) thread.
//!
//! Chat and console output may only be produced on that thread. Other threads hand it
//! closures through a bounded queue. [`HostThread::run_on_privileged`] never blocks and
//! drops the job when the queue is full; input sources that must not lose work use
//! [`MainThread::submit_blocking`] instead.
//!
//!   let (main, mut main_loop) = MainThread::channel(1024);
//!   main_loop.bind();                       // this thread is now privileged
//!   main.run_on_privileged(Box::new(|| println!("hello from main")));
//!   main_loop.run_pending();                // drain once per game tick, or
//!   main_loop.run();                        // block until shutdown

use once_cell::sync::OnceCell;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tracing::{debug, error, warn};

/// A closure queued for the privileged thread.
pub type MainJob = Box<dyn FnOnce() + Send + 'static>;

/// What the dispatch core needs from the host's thread model.
pub trait HostThread: Send + Sync + 'static {
    /// Is the current thread the privileged one?
    fn is_privileged(&self) -> bool;

    /// Run `job` on the privileged thread at some later point. Must not block.
    fn run_on_privileged(&self, job: MainJob);
}

enum MainMessage {
    Job(MainJob),
    Shutdown,
}

/// Cloneable handle used by any thread to reach the privileged loop.
#[derive(Clone)]
pub struct MainThread {
    tx: mpsc::Sender<MainMessage>,
    privileged: Arc<OnceCell<ThreadId>>,
    dropped: Arc<AtomicU64>,
}

/// Receiving end, owned by the privileged thread.
pub struct MainLoop {
    rx: mpsc::Receiver<MainMessage>,
    privileged: Arc<OnceCell<ThreadId>>,
}

impl MainThread {
    /// Create a handle/loop pair. The loop is not bound to a thread until
    /// [`MainLoop::bind`] (or [`MainLoop::run`]) is called.
    pub fn channel(capacity: usize) -> (MainThread, MainLoop) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let privileged = Arc::new(OnceCell::new());

        let handle = MainThread {
            tx,
            privileged: privileged.clone(),
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (handle, MainLoop { rx, privileged })
    }

    /// Start a dedicated privileged thread running the loop until shutdown.
    pub fn spawn(name: &str, capacity: usize) -> std::io::Result<(MainThread, thread::JoinHandle<()>)> {
        let (handle, main_loop) = Self::channel(capacity);
        let jh = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || main_loop.run())?;
        Ok((handle, jh))
    }

    /// Ask the loop to stop once everything queued before this call has run.
    pub fn request_shutdown(&self) {
        if self.tx.try_send(MainMessage::Shutdown).is_err() {
            warn!("main thread queue unavailable, shutdown request lost");
        }
    }

    /// Queue `job`, waiting for room if the queue is full. Returns `false` once the loop
    /// has stopped. Never call this from the privileged thread or from async code.
    pub fn submit_blocking(&self, job: MainJob) -> bool {
        self.tx.blocking_send(MainMessage::Job(job)).is_ok()
    }

    /// Like [`MainThread::request_shutdown`], but waits for room in the queue.
    pub fn request_shutdown_blocking(&self) {
        if self.tx.blocking_send(MainMessage::Shutdown).is_err() {
            debug!("main thread loop already stopped");
        }
    }

    /// Number of jobs dropped because the queue was full.
    pub fn dropped_jobs(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl HostThread for MainThread {
    fn is_privileged(&self) -> bool {
        self.privileged.get() == Some(&thread::current().id())
    }

    fn run_on_privileged(&self, job: MainJob) {
        match self.tx.try_send(MainMessage::Job(job)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("main thread queue full, dropping job");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("main thread loop has stopped, dropping job");
            }
        }
    }
}

impl MainLoop {
    /// Mark the current thread as the privileged one. Binding twice to different
    /// threads keeps the first binding.
    pub fn bind(&self) {
        let current = thread::current().id();
        if self.privileged.set(current).is_err() && self.privileged.get() != Some(&current) {
            warn!("main loop already bound to another thread");
        }
    }

    /// Run every job queued right now without waiting for more. Returns the number run,
    /// or `None` once a shutdown request was seen.
    pub fn run_pending(&mut self) -> Option<usize> {
        let mut ran = 0;
        loop {
            match self.rx.try_recv() {
                Ok(MainMessage::Job(job)) => {
                    run_job(job);
                    ran += 1;
                }
                Ok(MainMessage::Shutdown) => return None,
                Err(TryRecvError::Empty) => return Some(ran),
                Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Bind to the current thread and run jobs until shutdown is requested or every
    /// handle is gone.
    pub fn run(mut self) {
        self.bind();
        while let Some(msg) = self.rx.blocking_recv() {
            match msg {
                MainMessage::Job(job) => run_job(job),
                MainMessage::Shutdown => break,
            }
        }
        debug!("main loop stopped");
    }
}

fn run_job(job: MainJob) {
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(job)) {
        error!(reason = %panic_message(panic.as_ref()), "main thread job panicked");
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn t_bound_thread_is_privileged() {
        let (main, main_loop) = MainThread::channel(4);
        assert!(!main.is_privileged());

        main_loop.bind();
        assert!(main.is_privileged());

        let other = main.clone();
        let seen = thread::spawn(move || other.is_privileged()).join().unwrap();
        assert!(!seen);
    }

    #[test]
    fn t_jobs_run_in_order_on_drain() {
        let (main, mut main_loop) = MainThread::channel(8);
        let out = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let out = out.clone();
            main.run_on_privileged(Box::new(move || out.lock().push(i)));
        }
        assert!(out.lock().is_empty());

        assert_eq!(main_loop.run_pending(), Some(3));
        assert_eq!(*out.lock(), vec![0, 1, 2]);
        assert_eq!(main_loop.run_pending(), Some(0));
    }

    #[test]
    fn t_full_queue_drops_without_blocking() {
        let (main, mut main_loop) = MainThread::channel(1);
        main.run_on_privileged(Box::new(|| {}));
        main.run_on_privileged(Box::new(|| {}));

        assert_eq!(main.dropped_jobs(), 1);
        assert_eq!(main_loop.run_pending(), Some(1));
    }

    #[test]
    fn t_panicking_job_keeps_loop_alive() {
        let (main, mut main_loop) = MainThread::channel(4);
        let out = Arc::new(Mutex::new(false));
        let flag = out.clone();

        main.run_on_privileged(Box::new(|| panic!("boom")));
        main.run_on_privileged(Box::new(move || *flag.lock() = true));

        assert_eq!(main_loop.run_pending(), Some(2));
        assert!(*out.lock());
    }

    #[test]
    fn t_spawned_loop_stops_on_shutdown() {
        let (main, jh) = MainThread::spawn("main-test", 8).unwrap();
        let (tx, rx) = std::sync::mpsc::channel();

        let probe = main.clone();
        main.run_on_privileged(Box::new(move || {
            let _ = tx.send(probe.is_privileged());
        }));
        main.request_shutdown();

        jh.join().unwrap();
        assert!(rx.recv().unwrap());
    }

    #[test]
    fn t_blocking_submit_waits_for_room() {
        let (main, mut main_loop) = MainThread::channel(1);
        let out = Arc::new(Mutex::new(Vec::new()));

        let producer = {
            let main = main.clone();
            let out = out.clone();
            thread::spawn(move || {
                for i in 0..5 {
                    let out = out.clone();
                    assert!(main.submit_blocking(Box::new(move || out.lock().push(i))));
                }
                main.request_shutdown_blocking();
            })
        };

        while main_loop.run_pending().is_some() {
            thread::yield_now();
        }
        producer.join().unwrap();

        assert_eq!(*out.lock(), vec![0, 1, 2, 3, 4]);
        assert_eq!(main.dropped_jobs(), 0);
    }
}
