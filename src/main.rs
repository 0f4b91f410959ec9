use extended_commands::config::Config;
use extended_commands::output::StdoutSink;
use extended_commands::translation::store::{TomlTranslationStore, TranslationStore};
use extended_commands::{Caller, CommandRegistry, Dispatcher, MainThread, Messenger, RegistryError};
use std::io::BufRead;
use std::sync::Arc;
use std::time::{Duration, Instant};

mod commands;

/// Console host: the process main thread is the privileged thread, stdin lines are
/// queued onto it and dispatched from there. Prefix a line with `@name` to run it as
/// that player; `reload` re-reads the translation file.
fn main() -> anyhow::Result<()> {
    let started = Instant::now();
    init_tracing();

    let cfg = Config::from_env()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(cfg.worker_threads.max(1))
        .thread_name("command-worker")
        .enable_all()
        .build()?;

    let (main_thread, main_loop) = MainThread::channel(cfg.main_queue_capacity);
    main_loop.bind();

    let messenger = Messenger::new(Arc::new(main_thread.clone()), Arc::new(StdoutSink));
    let dispatcher = Dispatcher::new(runtime.handle().clone(), messenger)
        .with_log_policy(cfg.console_failure_log)
        .on_unhandled(|err| {
            tracing::warn!(command = %err.command(), error = %err, "off-thread command failed");
        });

    let store: Arc<dyn TranslationStore> = Arc::new(TomlTranslationStore::new(&cfg.translations_path));
    let registry = Arc::new(CommandRegistry::new());
    registry.load_and_register(commands::all(started), store.as_ref())?;

    let console = Console { registry, dispatcher, store };
    spawn_reader(main_thread.clone(), console)?;

    tracing::info!(
        workers = cfg.worker_threads,
        translations = %cfg.translations_path.display(),
        "command console ready"
    );
    main_loop.run();

    runtime.shutdown_timeout(Duration::from_secs(1));
    tracing::info!(dropped_jobs = main_thread.dropped_jobs(), "command console stopped");
    Ok(())
}

#[derive(Clone)]
struct Console {
    registry: Arc<CommandRegistry>,
    dispatcher: Dispatcher,
    store: Arc<dyn TranslationStore>,
}

impl Console {
    /// Runs on the privileged thread.
    fn handle_line(&self, line: &str) {
        let line = line.trim();
        let (caller, rest) = match line.strip_prefix('@') {
            Some(rest) => {
                let (name, rest) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                (Caller::player(name, name), rest)
            }
            None => (Caller::Console, line),
        };

        let tokens: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            return;
        }

        let messenger = self.dispatcher.messenger();
        if tokens.len() == 1 && tokens[0].eq_ignore_ascii_case("reload") {
            match self.registry.reload(self.store.as_ref()) {
                Ok(count) => messenger.send_to(&caller, format!("Reloaded translations for {count} commands.")),
                Err(e) => {
                    tracing::error!(error = %e, "translation reload failed");
                    messenger.send_to(&caller, e.to_string());
                }
            }
            return;
        }

        match self.registry.execute(&self.dispatcher, caller.clone(), &tokens) {
            Ok(()) => {}
            // Already reported to the caller
            Err(RegistryError::Dispatch(e)) => tracing::debug!(error = %e, "command returned failure"),
            Err(e) => messenger.send_to(&caller, e.to_string()),
        }
    }
}

fn spawn_reader(main: MainThread, console: Console) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("console-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let console = console.clone();
                if !main.submit_blocking(Box::new(move || console.handle_line(&line))) {
                    return;
                }
            }
            main.request_shutdown_blocking();
        })
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, prelude::*};

    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporting: {e}");
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,extended_commands=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::uptime()),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();
}
