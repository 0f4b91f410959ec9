//! Runs command bodies on the worker runtime.
//!
//! Both execution modes spawn the body as one task wrapped in the same run-and-catch
//! step. They differ only in whether `invoke` waits for that task. The body never runs
//! on the invoking thread, so a body that waits on the privileged thread cannot
//! deadlock a privileged caller.

use crate::command::{Caller, Command, CommandContext};
use crate::error::{DispatchError, DispatchResult};
use crate::host::panic_message;
use crate::hooks::Failure;
use crate::output::Messenger;
use anyhow::anyhow;
use futures::FutureExt;
use serde::Deserialize;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

/// Receives failures of off-thread invocations, which have nobody waiting for them.
pub type UnhandledHook = Arc<dyn Fn(&DispatchError) + Send + Sync>;

/// Whether a failure is logged server side when the caller already saw the full detail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureLogPolicy {
    /// Console callers get the full error in their reply; do not log it again.
    #[default]
    SkipConsole,
    Always,
}

impl FailureLogPolicy {
    pub fn should_log(self, caller: &Caller) -> bool {
        match self {
            FailureLogPolicy::SkipConsole => !caller.is_console(),
            FailureLogPolicy::Always => true,
        }
    }
}

impl FromStr for FailureLogPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip_console" => Ok(FailureLogPolicy::SkipConsole),
            "always" => Ok(FailureLogPolicy::Always),
            other => Err(format!("expected `skip_console` or `always`, got `{other}`")),
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    runtime: Handle,
    messenger: Messenger,
    policy: FailureLogPolicy,
    unhandled: UnhandledHook,
}

impl Dispatcher {
    /// `runtime` must be a multi-thread runtime: synchronous invocations block the
    /// calling thread until a worker finishes the body.
    pub fn new(runtime: Handle, messenger: Messenger) -> Self {
        Self {
            runtime,
            messenger,
            policy: FailureLogPolicy::default(),
            unhandled: Arc::new(|err: &DispatchError| {
                debug!(command = %err.command(), error = %err, "off-thread command failed");
            }),
        }
    }

    pub fn with_log_policy(mut self, policy: FailureLogPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn on_unhandled(mut self, hook: impl Fn(&DispatchError) + Send + Sync + 'static) -> Self {
        self.unhandled = Arc::new(hook);
        self
    }

    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    /// Run `command` for `caller` with the tokens that followed the command name.
    ///
    /// Off-thread commands return `Ok(())` as soon as the body is scheduled; their failure
    /// goes to the unhandled hook. Other commands return once the body has finished,
    /// with its failure as `Err`. Either way the caller has been told about the failure.
    pub fn invoke(&self, command: &Command, caller: Caller, args: Vec<String>) -> DispatchResult {
        let off_thread = command.runs_off_thread();
        debug!(command = %command.name(), caller = %caller, off_thread, "dispatching command");

        let unit = self.unit_of_work(command, caller, args);

        if off_thread {
            let unhandled = self.unhandled.clone();
            self.runtime.spawn(async move {
                if let Err(err) = unit.await {
                    unhandled(&err);
                }
            });
            return Ok(());
        }

        let handle = self.runtime.spawn(unit);
        match wait_for(handle) {
            Ok(result) => result,
            Err(err) => Err(DispatchError::WorkerLost {
                command: command.name().to_string(),
                reason: err.to_string(),
            }),
        }
    }

    fn unit_of_work(
        &self,
        command: &Command,
        caller: Caller,
        args: Vec<String>,
    ) -> impl Future<Output = DispatchResult> + Send + 'static {
        let ctx = CommandContext::new(command, caller, self.messenger.clone());
        let body = command.body();
        let policy = self.policy;

        async move {
            let outcome = AssertUnwindSafe(body.execute(&ctx, &args)).catch_unwind().await;
            let error = match outcome {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(err)) => err,
                Err(panic) => anyhow!("command panicked: {}", panic_message(panic.as_ref())),
            };

            let failure = Failure {
                info: &ctx.info,
                caller: &ctx.caller,
                args: &args,
                error: &error,
                translations: ctx.translations(),
            };
            ctx.reply(ctx.hooks().failure_message(&failure));
            if policy.should_log(&ctx.caller) {
                ctx.hooks().log_failure(&failure);
            }

            Err(DispatchError::CommandFailed {
                command: ctx.info.name.clone(),
                source: error,
            })
        }
    }
}

/// Block the current thread on a worker task. Inside a multi-thread runtime the thread
/// is handed over first so the runtime keeps its other workers going.
fn wait_for<T>(handle: JoinHandle<T>) -> Result<T, JoinError> {
    match Handle::try_current() {
        Ok(current) if current.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| futures::executor::block_on(handle))
        }
        _ => futures::executor::block_on(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_policy_skips_console_by_default() {
        let policy = FailureLogPolicy::default();
        assert!(!policy.should_log(&Caller::Console));
        assert!(policy.should_log(&Caller::player("1", "ada")));
        assert!(FailureLogPolicy::Always.should_log(&Caller::Console));
    }

    #[test]
    fn t_policy_from_str() {
        assert_eq!("always".parse::<FailureLogPolicy>(), Ok(FailureLogPolicy::Always));
        assert_eq!(" Skip_Console ".parse::<FailureLogPolicy>(), Ok(FailureLogPolicy::SkipConsole));
        assert!("sometimes".parse::<FailureLogPolicy>().is_err());
    }
}
