use crate::hooks::{CommandHooks, DefaultHooks};
use crate::output::Messenger;
use crate::parsing::{ParsedCommand, WithParsing};
use crate::translation::{self, Placeholder, Translate, TranslationTable};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Who may run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedCaller {
    Console,
    Player,
    Both,
}

impl AllowedCaller {
    pub fn permits(&self, caller: &Caller) -> bool {
        match self {
            AllowedCaller::Console => caller.is_console(),
            AllowedCaller::Player => caller.is_player(),
            AllowedCaller::Both => true,
        }
    }
}

impl fmt::Display for AllowedCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AllowedCaller::Console => "Console",
            AllowedCaller::Player => "Player",
            AllowedCaller::Both => "Both",
        })
    }
}

/// The entity that issued a command. Supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Caller {
    Console,
    Player { id: String, name: String },
}

impl Caller {
    pub fn player(id: impl Into<String>, name: impl Into<String>) -> Self {
        Caller::Player { id: id.into(), name: name.into() }
    }

    pub fn is_console(&self) -> bool {
        matches!(self, Caller::Console)
    }

    pub fn is_player(&self) -> bool {
        matches!(self, Caller::Player { .. })
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caller::Console => f.write_str("Console"),
            Caller::Player { name, .. } => f.write_str(name),
        }
    }
}

/// Static description of a command, shown in help output and used for registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    /// Unique name, fixed once registered
    pub name: String,
    /// One line summary
    pub help: String,
    /// Free-form usage hint, e.g. `<player> [amount]`
    pub syntax: String,
    pub aliases: Vec<String>,
    /// Defaults to the command name
    pub permissions: Vec<String>,
    pub allowed_caller: AllowedCaller,
}

impl CommandInfo {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            permissions: vec![name.clone()],
            name,
            help: String::new(),
            syntax: String::new(),
            aliases: Vec::new(),
            allowed_caller: AllowedCaller::Both,
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn syntax(mut self, syntax: impl Into<String>) -> Self {
        self.syntax = syntax.into();
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the default `[name]` permission set. Duplicates are dropped.
    pub fn permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions.clear();
        for p in permissions {
            let p = p.into();
            if !self.permissions.contains(&p) {
                self.permissions.push(p);
            }
        }
        self
    }

    pub fn allowed_caller(mut self, allowed: AllowedCaller) -> Self {
        self.allowed_caller = allowed;
        self
    }
}

/// The body of a command: receives the raw tokens that followed the command name.
#[async_trait]
pub trait CommandBody: Send + Sync + 'static {
    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> anyhow::Result<()>;
}

/// A command ready to be registered and dispatched.
pub struct Command {
    info: Arc<CommandInfo>,
    off_thread: AtomicBool,
    translations: Option<Arc<TranslationTable>>,
    hooks: Arc<dyn CommandHooks>,
    body: Arc<dyn CommandBody>,
}

impl Command {
    /// A command that runs synchronously (the caller waits) until told otherwise.
    pub fn new(info: CommandInfo, body: impl CommandBody) -> Self {
        Self {
            info: Arc::new(info),
            off_thread: AtomicBool::new(false),
            translations: None,
            hooks: Arc::new(DefaultHooks),
            body: Arc::new(body),
        }
    }

    /// A command whose tokens are parsed into `P::Args` before the body sees them.
    pub fn parsed<P: ParsedCommand>(info: CommandInfo, body: P) -> Self {
        Self::new(info, WithParsing::new(body))
    }

    pub fn off_thread(self, off_thread: bool) -> Self {
        self.off_thread.store(off_thread, Ordering::Relaxed);
        self
    }

    /// Attach a translation table built from `defaults` plus the built-in keys.
    /// Entries in `defaults` win over built-in ones.
    pub fn translations<I, K, V>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let merged = translation::builtin_defaults()
            .into_iter()
            .chain(defaults.into_iter().map(|(k, v)| (k.into(), v.into())));
        self.translations = Some(Arc::new(TranslationTable::new(merged)));
        self
    }

    pub fn hooks(mut self, hooks: impl CommandHooks) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &Arc<CommandInfo> {
        &self.info
    }

    pub fn translation_table(&self) -> Option<&Arc<TranslationTable>> {
        self.translations.as_ref()
    }

    /// Change the execution mode. In-flight invocations keep the mode they started with.
    pub fn set_off_thread(&self, off_thread: bool) {
        self.off_thread.store(off_thread, Ordering::Relaxed);
    }

    pub fn runs_off_thread(&self) -> bool {
        self.off_thread.load(Ordering::Relaxed)
    }

    pub(crate) fn body(&self) -> Arc<dyn CommandBody> {
        self.body.clone()
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("info", &self.info)
            .field("off_thread", &self.runs_off_thread())
            .field("translations", &self.translations.is_some())
            .finish()
    }
}

/// Everything a running body may touch
pub struct CommandContext {
    pub caller: Caller,
    pub info: Arc<CommandInfo>,
    messenger: Messenger,
    translations: Option<Arc<TranslationTable>>,
    hooks: Arc<dyn CommandHooks>,
}

impl CommandContext {
    pub(crate) fn new(command: &Command, caller: Caller, messenger: Messenger) -> Self {
        Self {
            caller,
            info: command.info.clone(),
            messenger,
            translations: command.translations.clone(),
            hooks: command.hooks.clone(),
        }
    }

    /// Send text to whoever ran the command.
    pub fn reply(&self, text: impl Into<String>) {
        self.messenger.send_to(&self.caller, text);
    }

    /// Send text to everyone.
    pub fn broadcast(&self, text: impl Into<String>) {
        self.messenger.broadcast(text);
    }

    pub fn reply_translated(&self, key: &str, args: &[Placeholder<'_>]) {
        self.reply(self.translate(key, args));
    }

    pub fn broadcast_translated(&self, key: &str, args: &[Placeholder<'_>]) {
        self.broadcast(self.translate(key, args));
    }

    pub fn translations(&self) -> Option<&TranslationTable> {
        self.translations.as_deref()
    }

    pub fn hooks(&self) -> &dyn CommandHooks {
        self.hooks.as_ref()
    }

    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }
}

impl Translate for CommandContext {
    /// Without a table every key resolves to itself, placeholders still filled in.
    fn translate(&self, key: &str, args: &[Placeholder<'_>]) -> String {
        match &self.translations {
            Some(table) => table.resolve(key, args),
            None => translation::substitute(key, args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_permissions_default_to_name() {
        let info = CommandInfo::new("heal");
        assert_eq!(info.permissions, vec!["heal"]);

        let info = info.permissions(["heal.self", "heal.other", "heal.self"]);
        assert_eq!(info.permissions, vec!["heal.self", "heal.other"]);
    }

    #[test]
    fn t_allowed_caller_permits() {
        let player = Caller::player("1", "ada");
        assert!(AllowedCaller::Both.permits(&player));
        assert!(AllowedCaller::Player.permits(&player));
        assert!(!AllowedCaller::Console.permits(&player));
        assert!(AllowedCaller::Console.permits(&Caller::Console));
        assert_eq!(AllowedCaller::Console.to_string(), "Console");
    }
}
