//! Per-command message tables: an override table layered over compiled-in defaults.
//!
//! Lookup order is override, default, then the key itself. A missing translation never
//! fails; it shows up as its raw key instead.

pub mod store;

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Sent to the caller when a command body fails. `{0}` name, `{1}` input, `{2}` error.
pub const COMMAND_EXCEPTION_KEY: &str = "command_exception";
/// Appended for console callers. `{0}` full error detail.
pub const COMMAND_EXCEPTION_DETAIL_KEY: &str = "command_exception_detail";

pub(crate) const COMMAND_EXCEPTION_TEXT: &str = "Error during command execution. Command: {0} {1}. Error: {2}.";
pub(crate) const COMMAND_EXCEPTION_DETAIL_TEXT: &str = " Full exception: {0}.";

/// One positional placeholder value. `None` renders as `NULL`.
pub type Placeholder<'a> = Option<&'a dyn fmt::Display>;

/// Keys every translated command carries unless it brings its own text.
pub fn builtin_defaults() -> Vec<(String, String)> {
    vec![
        (COMMAND_EXCEPTION_KEY.to_string(), COMMAND_EXCEPTION_TEXT.to_string()),
        (COMMAND_EXCEPTION_DETAIL_KEY.to_string(), COMMAND_EXCEPTION_DETAIL_TEXT.to_string()),
    ]
}

/// Anything that can turn a key plus placeholders into text.
pub trait Translate {
    fn translate(&self, key: &str, args: &[Placeholder<'_>]) -> String;
}

#[derive(Debug)]
pub struct TranslationTable {
    defaults: BTreeMap<String, String>,
    /// Swapped as a whole on reload, never edited in place
    overrides: RwLock<Arc<HashMap<String, String>>>,
}

impl TranslationTable {
    pub fn new<I, K, V>(defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            defaults: defaults.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            overrides: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Look up `key` and fill in `{0}`, `{1}`, ... from `args`.
    pub fn resolve(&self, key: &str, args: &[Placeholder<'_>]) -> String {
        let overrides = self.overrides.read().clone();
        let template = overrides
            .get(key)
            .or_else(|| self.defaults.get(key))
            .map(String::as_str);

        match template {
            Some(template) => substitute(template, args),
            None => key.to_string(),
        }
    }

    /// Replace the overrides with those entries of `table` whose key has a default.
    /// Keys match ignoring case; an exact match wins over a differently cased one.
    pub fn reload(&self, table: &HashMap<String, String>) {
        let mut filtered: HashMap<String, String> = HashMap::new();
        for (key, text) in table {
            let Some(declared) = self.declared_key(key) else {
                continue;
            };
            if declared == key.as_str() {
                filtered.insert(declared.to_string(), text.clone());
            } else {
                filtered.entry(declared.to_string()).or_insert_with(|| text.clone());
            }
        }

        debug!(
            supplied = table.len(),
            kept = filtered.len(),
            "translation overrides reloaded"
        );
        *self.overrides.write() = Arc::new(filtered);
    }

    /// The default key `key` refers to, compared ignoring case.
    pub fn declared_key(&self, key: &str) -> Option<&str> {
        match self.defaults.get_key_value(key) {
            Some((declared, _)) => Some(declared.as_str()),
            None => self
                .defaults
                .keys()
                .find(|k| k.eq_ignore_ascii_case(key))
                .map(String::as_str),
        }
    }

    pub fn defaults(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }

    /// Snapshot of the current overrides.
    pub fn overrides(&self) -> Arc<HashMap<String, String>> {
        self.overrides.read().clone()
    }
}

impl Translate for TranslationTable {
    fn translate(&self, key: &str, args: &[Placeholder<'_>]) -> String {
        self.resolve(key, args)
    }
}

/// Positional substitution. Placeholders past the end of `args` stay as they are.
pub fn substitute(template: &str, args: &[Placeholder<'_>]) -> String {
    let mut out = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        let token = format!("{{{i}}}");
        if !out.contains(&token) {
            continue;
        }
        let value = match arg {
            Some(v) => v.to_string(),
            None => "NULL".to_string(),
        };
        out = out.replace(&token, &value);
    }
    out
}

/// Translate with `Display` arguments:
///
///   tr!(ctx, "greeting", player_name, 3)
#[macro_export]
macro_rules! tr {
    ($target:expr, $key:expr $(, $arg:expr)* $(,)?) => {{
        use $crate::translation::Translate as _;
        ($target).translate($key, &[$(Some(&$arg as &dyn ::std::fmt::Display)),*])
    }};
}
