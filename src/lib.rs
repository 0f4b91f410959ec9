pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod help;
pub mod hooks;
pub mod host;
pub mod output;
pub mod parsing;
pub mod registry;
pub mod translation;

// Convenient re-exports (so call sites can do `extended_commands::Command`, etc.)
pub use command::{AllowedCaller, Caller, Command, CommandBody, CommandContext, CommandInfo};
pub use dispatch::{Dispatcher, FailureLogPolicy};
pub use error::{DispatchError, DispatchResult, RegistryError};
pub use hooks::{CommandHooks, DefaultHooks, Failure};
pub use host::{HostThread, MainLoop, MainThread};
pub use output::{MessageSink, Messenger};
pub use parsing::{CommandArgs, HelpFlag, HelpOnly, ParsedCommand};
pub use registry::CommandRegistry;
pub use translation::{Translate, TranslationTable};
