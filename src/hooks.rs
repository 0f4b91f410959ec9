//! Overridable pieces of command behavior: what a failure says to the caller, how it
//! is logged, and how help text is wrapped before delivery.

use crate::command::{Caller, CommandInfo};
use crate::help::HelpReport;
use crate::translation::{
    COMMAND_EXCEPTION_DETAIL_KEY, COMMAND_EXCEPTION_DETAIL_TEXT, COMMAND_EXCEPTION_KEY, COMMAND_EXCEPTION_TEXT,
    Placeholder, TranslationTable, substitute,
};
use std::fmt;
use tracing::error;

/// A failed invocation as seen by [`CommandHooks`].
pub struct Failure<'a> {
    pub info: &'a CommandInfo,
    pub caller: &'a Caller,
    pub args: &'a [String],
    pub error: &'a anyhow::Error,
    pub translations: Option<&'a TranslationTable>,
}

impl Failure<'_> {
    /// `Error during command execution. Command: <name> <args>. Error: <message>.`
    /// Console callers also get the full error chain.
    pub fn default_message(&self) -> String {
        let input = self.args.join(" ");
        let message = self.error.to_string();
        let args: [Placeholder<'_>; 3] = [
            Some(&self.info.name as &dyn fmt::Display),
            Some(&input as &dyn fmt::Display),
            Some(&message as &dyn fmt::Display),
        ];
        let mut text = self.text(COMMAND_EXCEPTION_KEY, &args);

        if self.caller.is_console() {
            let detail = format!("{:?}", self.error);
            text.push_str(&self.text(COMMAND_EXCEPTION_DETAIL_KEY, &[Some(&detail as &dyn fmt::Display)]));
        }
        text
    }

    fn text(&self, key: &str, args: &[Placeholder<'_>]) -> String {
        match self.translations {
            Some(table) => table.resolve(key, args),
            None => {
                let template = if key == COMMAND_EXCEPTION_KEY {
                    COMMAND_EXCEPTION_TEXT
                } else {
                    COMMAND_EXCEPTION_DETAIL_TEXT
                };
                substitute(template, args)
            }
        }
    }
}

pub trait CommandHooks: Send + Sync + 'static {
    /// Text sent to the caller when the body fails.
    fn failure_message(&self, failure: &Failure<'_>) -> String {
        failure.default_message()
    }

    /// Log a failed invocation.
    fn log_failure(&self, failure: &Failure<'_>) {
        error!(
            command = %failure.info.name,
            caller = %failure.caller,
            error = ?failure.error,
            "exception during command execution"
        );
    }

    /// Final text of a help report before it is sent.
    fn help_message(&self, report: &HelpReport) -> String {
        report.to_string()
    }
}

/// Keeps every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl CommandHooks for DefaultHooks {}
