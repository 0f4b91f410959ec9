//! Ordered parameter descriptions for help output.
//!
//! A schema is either declared by hand or read once from a clap definition and kept per
//! argument type for the life of the process.

use crate::parsing::prepare_command;
use clap::builder::ValueParser;
use clap::{ArgAction, CommandFactory};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::sync::Arc;

static SCHEMAS: Lazy<DashMap<TypeId, Arc<Schema>>> = Lazy::new(DashMap::new);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// `-s` / `--long` style option or switch
    Flag { short: Option<char>, long: Option<String> },
    /// Bare value at `index` (0-based). `max` is the number of values it takes,
    /// `None` when unbounded.
    Positional { index: usize, max: Option<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub help: String,
    pub hidden: bool,
    /// Flag expects a value (`-n 3`) rather than being a switch
    pub takes_value: bool,
    /// Variant names for enum-typed fields, in declaration order
    pub enum_values: Vec<String>,
}

impl FieldSpec {
    pub fn flag(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Flag { short: None, long: None })
    }

    pub fn positional(name: impl Into<String>, index: usize) -> Self {
        Self::with_kind(name, FieldKind::Positional { index, max: Some(1) })
    }

    fn with_kind(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            help: String::new(),
            hidden: false,
            takes_value: false,
            enum_values: Vec::new(),
        }
    }

    pub fn short(mut self, c: char) -> Self {
        if let FieldKind::Flag { short, .. } = &mut self.kind {
            *short = Some(c);
        }
        self
    }

    pub fn long(mut self, name: impl Into<String>) -> Self {
        if let FieldKind::Flag { long, .. } = &mut self.kind {
            *long = Some(name.into());
        }
        self
    }

    /// Number of values a positional takes. `None` means unbounded.
    pub fn max(mut self, count: Option<usize>) -> Self {
        if let FieldKind::Positional { max, .. } = &mut self.kind {
            *max = count;
        }
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn takes_value(mut self, yes: bool) -> Self {
        self.takes_value = yes;
        self
    }

    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_flag(&self) -> bool {
        matches!(self.kind, FieldKind::Flag { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Schema of a clap argument type, read on first use and cached afterwards.
    pub fn of<A: CommandFactory + 'static>() -> Arc<Schema> {
        let id = TypeId::of::<A>();
        if let Some(schema) = SCHEMAS.get(&id) {
            return Arc::clone(schema.value());
        }

        let schema = Arc::new(Schema::from_command(A::command()));
        Arc::clone(SCHEMAS.entry(id).or_insert(schema).value())
    }

    /// Read a clap definition. Arguments keep their declaration order.
    pub fn from_command(cmd: clap::Command) -> Self {
        let mut cmd = prepare_command(cmd);
        cmd.build();

        let mut next_index = 0;
        let mut fields = Vec::new();

        let bool_id = ValueParser::bool().type_id();

        for arg in cmd.get_arguments() {
            let takes_value = arg.get_action().takes_values();
            // `bool` parsers list `true`/`false` as possible values; only enums are listed
            let enum_values = if takes_value && arg.get_value_parser().type_id() != bool_id {
                arg.get_possible_values()
                    .iter()
                    .filter(|v| !v.is_hide_set())
                    .map(|v| v.get_name().to_string())
                    .collect()
            } else {
                Vec::new()
            };

            let kind = if arg.is_positional() {
                let index = next_index;
                next_index += 1;

                let max = arg.get_num_args().map(|r| r.max_values()).unwrap_or(1);
                let unbounded = matches!(arg.get_action(), ArgAction::Append) || max == usize::MAX;
                FieldKind::Positional {
                    index,
                    max: if unbounded { None } else { Some(max.max(1)) },
                }
            } else {
                FieldKind::Flag {
                    short: arg.get_short(),
                    long: arg.get_long().map(str::to_string),
                }
            };

            fields.push(FieldSpec {
                name: arg.get_id().as_str().to_string(),
                kind,
                help: arg.get_help().map(|h| h.to_string()).unwrap_or_default(),
                hidden: arg.is_hide_set(),
                takes_value,
                enum_values,
            });
        }

        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn flags(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_flag())
    }

    pub fn positionals(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| !f.is_flag())
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::HelpFlag;
    use clap::{Parser, ValueEnum};

    #[derive(Debug, Clone, Copy, ValueEnum)]
    enum Weather {
        Clear,
        Rain,
        Storm,
    }

    #[derive(Debug, Parser)]
    struct WeatherArgs {
        /// Where to change the weather
        world: String,

        /// Kind of weather
        #[arg(short, long, value_enum)]
        kind: Weather,

        /// Seconds it lasts
        #[arg(long, hide = true)]
        duration: Option<u32>,

        /// Extra worlds
        others: Vec<String>,

        #[command(flatten)]
        help: HelpFlag,
    }

    #[test]
    fn t_reads_clap_arguments_in_order() {
        let schema = Schema::from_command(WeatherArgs::command());
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["world", "kind", "duration", "others", "help"]);

        let world = schema.field("world").unwrap();
        assert_eq!(world.kind, FieldKind::Positional { index: 0, max: Some(1) });
        assert_eq!(world.help, "Where to change the weather");

        let others = schema.field("others").unwrap();
        assert_eq!(others.kind, FieldKind::Positional { index: 1, max: None });

        let kind = schema.field("kind").unwrap();
        assert_eq!(
            kind.kind,
            FieldKind::Flag { short: Some('k'), long: Some("kind".to_string()) }
        );
        assert_eq!(kind.enum_values, vec!["clear", "rain", "storm"]);

        assert!(kind.takes_value);

        let duration = schema.field("duration").unwrap();
        assert!(duration.hidden);
        assert!(duration.enum_values.is_empty());

        let help = schema.field("help").unwrap();
        assert!(help.enum_values.is_empty());
        assert!(!help.takes_value);
        assert_eq!(help.kind, FieldKind::Flag { short: Some('h'), long: Some("help".to_string()) });
    }

    #[test]
    fn t_schema_is_cached_per_type() {
        let a = Schema::of::<WeatherArgs>();
        let b = Schema::of::<WeatherArgs>();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
