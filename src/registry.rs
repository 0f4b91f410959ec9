use crate::command::{Caller, Command};
use crate::dispatch::Dispatcher;
use crate::error::RegistryError;
use crate::translation::store::TranslationStore;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Commands by name and alias. Lookup ignores case.
#[derive(Default)]
pub struct CommandRegistry {
    by_name: DashMap<String, Arc<Command>>,
    /// Registration order; also serializes registrations
    order: RwLock<Vec<Arc<Command>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the name and every alias. Fails without registering anything if one
    /// of them is already taken.
    pub fn register(&self, command: Command) -> Result<Arc<Command>, RegistryError> {
        let mut order = self.order.write();
        self.claim_names(&command, &mut HashSet::new())?;
        Ok(self.insert(&mut order, command))
    }

    /// Register `commands` and hook their translation tables up to `store`.
    ///
    /// Names are checked for the whole batch first: on a clash nothing is registered.
    /// Default keys missing from the stored table (compared ignoring case) are written
    /// back once; stored values are never overwritten and nothing is saved when no key
    /// was missing.
    pub fn load_and_register<I>(&self, commands: I, store: &dyn TranslationStore) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = Command>,
    {
        let commands: Vec<Command> = commands.into_iter().collect();
        let mut stored = store.load()?;

        let registered: Vec<Arc<Command>> = {
            let mut order = self.order.write();
            let mut batch = HashSet::new();
            for command in &commands {
                self.claim_names(command, &mut batch)?;
            }
            commands.into_iter().map(|c| self.insert(&mut order, c)).collect()
        };

        let mut present: HashSet<String> = stored.keys().map(|k| k.to_lowercase()).collect();
        let mut added = 0;
        for command in &registered {
            let Some(table) = command.translation_table() else {
                continue;
            };
            for (key, text) in table.defaults() {
                if present.insert(key.to_lowercase()) {
                    stored.insert(key.clone(), text.clone());
                    added += 1;
                }
            }
        }

        if added > 0 {
            store.save(&stored)?;
            info!(added, "missing translation keys written back");
        }

        let reloaded = apply(&registered, &stored);
        debug!(commands = registered.len(), translated = reloaded, "commands loaded");
        Ok(())
    }

    /// Check the name and aliases of `command` against the registry and against `batch`,
    /// the names already claimed by the same registration. Adds them to `batch`.
    fn claim_names(&self, command: &Command, batch: &mut HashSet<String>) -> Result<(), RegistryError> {
        let mut own = HashSet::new();
        for name in std::iter::once(command.name()).chain(command.info().aliases.iter().map(String::as_str)) {
            let key = name.to_lowercase();
            if self.by_name.contains_key(&key) || batch.contains(&key) || !own.insert(key) {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }
        }
        batch.extend(own);
        Ok(())
    }

    /// Caller holds the `order` lock and has claimed the names.
    fn insert(&self, order: &mut Vec<Arc<Command>>, command: Command) -> Arc<Command> {
        let command = Arc::new(command);
        let names = std::iter::once(command.name()).chain(command.info().aliases.iter().map(String::as_str));
        for name in names {
            self.by_name.insert(name.to_lowercase(), command.clone());
        }
        order.push(command.clone());

        info!(
            command = %command.name(),
            aliases = ?command.info().aliases,
            off_thread = command.runs_off_thread(),
            "command registered"
        );
        command
    }

    /// Re-read `store` and apply it to every translated command. Returns how many
    /// commands were updated.
    pub fn reload(&self, store: &dyn TranslationStore) -> Result<usize, RegistryError> {
        let stored = store.load()?;
        let commands = self.commands();
        let reloaded = apply(&commands, &stored);
        info!(commands = reloaded, keys = stored.len(), "translations reloaded");
        Ok(reloaded)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.by_name.get(&name.to_lowercase()).map(|c| c.value().clone())
    }

    /// All commands in registration order.
    pub fn commands(&self) -> Vec<Arc<Command>> {
        self.order.read().clone()
    }

    /// Resolve the first token to a command and dispatch the rest as its arguments.
    pub fn execute(&self, dispatcher: &Dispatcher, caller: Caller, tokens: &[String]) -> Result<(), RegistryError> {
        let (first, rest) = tokens.split_first().ok_or(RegistryError::EmptyInput)?;
        let command = self
            .get(first)
            .ok_or_else(|| RegistryError::UnknownCommand(first.clone()))?;

        if !command.info().allowed_caller.permits(&caller) {
            return Err(RegistryError::CallerNotAllowed {
                command: command.name().to_string(),
                caller: caller.to_string(),
            });
        }

        dispatcher.invoke(&command, caller, rest.to_vec())?;
        Ok(())
    }
}

fn apply(commands: &[Arc<Command>], stored: &HashMap<String, String>) -> usize {
    let mut applied = 0;
    for table in commands.iter().filter_map(|c| c.translation_table()) {
        table.reload(stored);
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandBody, CommandContext, CommandInfo};
    use crate::translation::store::MemoryTranslationStore;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl CommandBody for Noop {
        async fn execute(&self, _ctx: &CommandContext, _args: &[String]) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn translated(name: &str, key: &str, text: &str) -> Command {
        Command::new(CommandInfo::new(name), Noop).translations([(key, text)])
    }

    #[test]
    fn t_lookup_by_alias_ignores_case() {
        let registry = CommandRegistry::new();
        registry
            .register(Command::new(CommandInfo::new("teleport").aliases(["tp"]), Noop))
            .unwrap();

        assert_eq!(registry.get("TP").unwrap().name(), "teleport");
        assert_eq!(registry.get("Teleport").unwrap().name(), "teleport");
        assert!(registry.get("warp").is_none());
    }

    #[test]
    fn t_duplicate_names_are_rejected() {
        let registry = CommandRegistry::new();
        registry
            .register(Command::new(CommandInfo::new("teleport").aliases(["tp"]), Noop))
            .unwrap();

        let err = registry
            .register(Command::new(CommandInfo::new("tpa").aliases(["TP"]), Noop))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(ref n) if n == "TP"));
        assert!(registry.get("tpa").is_none());
        assert_eq!(registry.commands().len(), 1);
    }

    #[test]
    fn t_missing_keys_are_written_back_once() {
        let store = MemoryTranslationStore::new([("pong", "Stored pong")]);
        let registry = CommandRegistry::new();
        registry
            .load_and_register([translated("ping", "pong", "Pong!")], &store)
            .unwrap();

        assert_eq!(store.save_count(), 1);
        assert_eq!(store.get("pong").as_deref(), Some("Stored pong"));
        assert!(store.get("command_exception").is_some());

        let ping = registry.get("ping").unwrap();
        let table = ping.translation_table().unwrap();
        assert_eq!(table.resolve("pong", &[]), "Stored pong");

        let again = CommandRegistry::new();
        again
            .load_and_register([translated("ping", "pong", "Pong!")], &store)
            .unwrap();
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn t_reload_applies_new_values() {
        let store = MemoryTranslationStore::default();
        let registry = CommandRegistry::new();
        registry
            .load_and_register(
                [translated("ping", "pong", "Pong!"), Command::new(CommandInfo::new("plain"), Noop)],
                &store,
            )
            .unwrap();

        store.set("pong", "Pong again");
        store.set("unrelated", "ignored");
        assert_eq!(registry.reload(&store).unwrap(), 1);

        let ping = registry.get("ping").unwrap();
        let table = ping.translation_table().unwrap();
        assert_eq!(table.resolve("pong", &[]), "Pong again");
        assert!(!table.overrides().contains_key("unrelated"));
    }

    #[test]
    fn t_batch_with_clash_registers_nothing() {
        let store = MemoryTranslationStore::default();
        let registry = CommandRegistry::new();

        let err = registry
            .load_and_register(
                [
                    translated("ping", "pong", "Pong!"),
                    Command::new(CommandInfo::new("echo").aliases(["PING"]), Noop),
                ],
                &store,
            )
            .unwrap_err();

        assert!(matches!(err, RegistryError::DuplicateName(ref n) if n == "PING"));
        assert!(registry.commands().is_empty());
        assert!(registry.get("ping").is_none());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn t_stored_keys_match_defaults_ignoring_case() {
        let store = MemoryTranslationStore::new([("Pong", "Stored pong")]);
        let registry = CommandRegistry::new();
        registry
            .load_and_register([translated("ping", "pong", "Pong!")], &store)
            .unwrap();

        assert!(store.get("pong").is_none());
        assert_eq!(store.get("Pong").as_deref(), Some("Stored pong"));

        let ping = registry.get("ping").unwrap();
        assert_eq!(ping.translation_table().unwrap().resolve("pong", &[]), "Stored pong");
    }
}
