//! Turn raw tokens into a typed argument record with clap, and fall back to a help
//! report when the caller asked for help or typed something the parser rejected.

pub mod schema;

use crate::command::{CommandBody, CommandContext};
use crate::help::HelpReport;
use async_trait::async_trait;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Args, ColorChoice, Parser};
use schema::{FieldKind, Schema};
use std::fmt;
use tracing::debug;

/// The reserved help switch. Flatten it into every argument type:
///
///   #[derive(Parser)]
///   struct GiveArgs {
///       target: String,
///       #[command(flatten)]
///       help: HelpFlag,
///   }
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HelpFlag {
    #[arg(
        short = 'h',
        long = "help",
        help = "Displays the current help information about the command."
    )]
    pub help: bool,
}

/// Argument record for commands that take nothing but `-h`.
#[derive(Parser, Debug, Clone, Default)]
pub struct HelpOnly {
    #[command(flatten)]
    pub help: HelpFlag,
}

/// A clap argument type usable by [`WithParsing`].
pub trait CommandArgs: Parser + Send + 'static {
    fn help_flag(&self) -> &HelpFlag;

    fn wants_help(&self) -> bool {
        self.help_flag().help
    }
}

impl CommandArgs for HelpOnly {
    fn help_flag(&self) -> &HelpFlag {
        &self.help
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Help was asked for. Not an error.
    HelpRequested,
    /// Help for a sub-verb was asked for. Not an error.
    HelpVerbRequested,
    /// Version was asked for. Not an error.
    VersionRequested,
    MissingRequiredArgument,
    UnknownArgument,
    InvalidValue,
    WrongNumberOfValues,
    ArgumentConflict,
    Other,
}

impl ParseErrorKind {
    pub fn is_help_request(self) -> bool {
        matches!(
            self,
            ParseErrorKind::HelpRequested
                | ParseErrorKind::HelpVerbRequested
                | ParseErrorKind::VersionRequested
        )
    }
}

impl From<ErrorKind> for ParseErrorKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::DisplayHelp => ParseErrorKind::HelpRequested,
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => ParseErrorKind::HelpVerbRequested,
            ErrorKind::DisplayVersion => ParseErrorKind::VersionRequested,
            ErrorKind::MissingRequiredArgument | ErrorKind::MissingSubcommand => {
                ParseErrorKind::MissingRequiredArgument
            }
            ErrorKind::UnknownArgument | ErrorKind::InvalidSubcommand => ParseErrorKind::UnknownArgument,
            ErrorKind::InvalidValue | ErrorKind::ValueValidation | ErrorKind::InvalidUtf8 => {
                ParseErrorKind::InvalidValue
            }
            ErrorKind::NoEquals | ErrorKind::TooManyValues | ErrorKind::TooFewValues | ErrorKind::WrongNumberOfValues => {
                ParseErrorKind::WrongNumberOfValues
            }
            ErrorKind::ArgumentConflict => ParseErrorKind::ArgumentConflict,
            _ => ParseErrorKind::Other,
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub detail: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }

    pub fn help_requested() -> Self {
        Self::new(ParseErrorKind::HelpRequested, "help requested")
    }
}

impl From<clap::Error> for ParseError {
    fn from(err: clap::Error) -> Self {
        Self {
            kind: err.kind().into(),
            detail: summarize(&err.to_string()),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// Keep clap's message, drop the usage and tip paragraphs, fold the rest onto one line.
fn summarize(rendered: &str) -> String {
    let body = rendered.trim_start_matches("error: ");
    let first = body.split("\n\n").next().unwrap_or(body);
    first.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Result of one parse attempt.
#[derive(Debug)]
pub enum ParseOutcome<A> {
    Parsed(A),
    /// Never empty
    NotParsed(Vec<ParseError>),
}

/// Settings shared by parsing and schema reading: no binary name in the token list, no
/// clap-generated help or version switches, plain text, values matched ignoring case.
pub(crate) fn prepare_command(cmd: clap::Command) -> clap::Command {
    cmd.no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .color(ColorChoice::Never)
        .mut_args(|arg| {
            let takes_value = arg.get_action().takes_values();
            arg.ignore_case(takes_value)
        })
}

/// Parse `tokens` into `A`. If the help switch is present the outcome is a help request
/// even when other arguments are missing or malformed.
///
/// Long option names match ignoring case and unknown options are skipped.
pub fn parse_args<A: CommandArgs>(tokens: &[String]) -> ParseOutcome<A> {
    let schema = Schema::of::<A>();
    let mut tokens = canonical_longs(&schema, tokens);
    let mut cmd = prepare_command(A::command());

    loop {
        let result = cmd
            .try_get_matches_from_mut(&tokens)
            .and_then(|matches| A::from_arg_matches(&matches));

        let err = match result {
            Ok(args) => return ParseOutcome::Parsed(args),
            Err(_) if asks_for_help(&schema, &tokens) => {
                return ParseOutcome::NotParsed(vec![ParseError::help_requested()]);
            }
            Err(err) => err,
        };

        if err.kind() == ErrorKind::UnknownArgument {
            if let Some(ContextValue::String(unknown)) = err.get(ContextKind::InvalidArg) {
                if drop_option(&schema, &mut tokens, unknown) {
                    debug!(option = %unknown, "skipping unknown option");
                    continue;
                }
            }
        }
        return ParseOutcome::NotParsed(vec![ParseError::from(err)]);
    }
}

/// Tokens before `--`, the ones clap reads as options.
fn option_span(tokens: &[String]) -> usize {
    tokens.iter().position(|t| t == "--").unwrap_or(tokens.len())
}

/// Rewrite `--Name` / `--Name=v` to the declared spelling of that long option.
fn canonical_longs(schema: &Schema, tokens: &[String]) -> Vec<String> {
    let end = option_span(tokens);
    let mut out = tokens.to_vec();

    for token in &mut out[..end] {
        let Some(body) = token.strip_prefix("--") else {
            continue;
        };
        let (name, value) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        let declared = schema.flags().find_map(|f| match &f.kind {
            FieldKind::Flag { long: Some(long), .. } if long.eq_ignore_ascii_case(name) => Some(long.as_str()),
            _ => None,
        });
        if let Some(long) = declared {
            *token = match value {
                Some(value) => format!("--{long}={value}"),
                None => format!("--{long}"),
            };
        }
    }
    out
}

/// Switch characters of a `-abc` cluster, up to and including the first one that takes a
/// value (the rest of the token is that value). `None` for anything else.
fn short_cluster(schema: &Schema, token: &str) -> Option<Vec<char>> {
    let body = token.strip_prefix('-')?;
    if body.is_empty() || body.starts_with('-') {
        return None;
    }

    let mut switches = Vec::new();
    for c in body.chars() {
        switches.push(c);
        let takes_value = schema
            .flags()
            .any(|f| f.takes_value && matches!(f.kind, FieldKind::Flag { short: Some(s), .. } if s == c));
        if takes_value {
            break;
        }
    }
    Some(switches)
}

/// Remove an option clap did not recognise: the whole `--name[=v]` token, or one switch
/// out of a short cluster. Returns `false` if it could not be located.
fn drop_option(schema: &Schema, tokens: &mut Vec<String>, unknown: &str) -> bool {
    let end = option_span(tokens);

    if unknown.starts_with("--") {
        let with_value = format!("{unknown}=");
        return match tokens[..end].iter().position(|t| t == unknown || t.starts_with(&with_value)) {
            Some(i) => {
                tokens.remove(i);
                true
            }
            None => false,
        };
    }

    let mut chars = unknown.chars().skip(1);
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return false;
    };

    let hit = tokens[..end]
        .iter()
        .position(|t| short_cluster(schema, t).is_some_and(|switches| switches.contains(&c)));
    let Some(i) = hit else {
        return false;
    };

    // `c` is among the leading switches, so its first occurrence is the switch itself
    let mut rest = tokens[i][1..].to_string();
    if let Some(at) = rest.find(c) {
        rest.remove(at);
    }
    if rest.is_empty() {
        tokens.remove(i);
    } else {
        tokens[i] = format!("-{rest}");
    }
    true
}

fn asks_for_help(schema: &Schema, tokens: &[String]) -> bool {
    let Some(FieldKind::Flag { short, long }) = schema.field("help").map(|f| &f.kind) else {
        return false;
    };

    tokens[..option_span(tokens)].iter().any(|t| {
        let is_short = short.is_some_and(|c| short_cluster(schema, t).is_some_and(|switches| switches.contains(&c)));
        let is_long = long.as_deref().is_some_and(|l| match t.strip_prefix("--") {
            Some(body) if body == l => true,
            Some(body) => body
                .strip_prefix(l)
                .and_then(|rest| rest.strip_prefix('='))
                .is_some_and(|value| !matches!(value.to_ascii_lowercase().as_str(), "false" | "no" | "off" | "0")),
            None => false,
        });
        is_short || is_long
    })
}

/// A command body that works on parsed arguments instead of raw tokens.
#[async_trait]
pub trait ParsedCommand: Send + Sync + 'static {
    type Args: CommandArgs;

    async fn execute(&self, ctx: &CommandContext, args: Self::Args) -> anyhow::Result<()>;
}

/// Adapts a [`ParsedCommand`] into a [`CommandBody`].
pub struct WithParsing<P> {
    inner: P,
}

impl<P: ParsedCommand> WithParsing<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: ParsedCommand> CommandBody for WithParsing<P> {
    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> anyhow::Result<()> {
        match parse_args::<P::Args>(args) {
            ParseOutcome::Parsed(parsed) if parsed.wants_help() => {
                display_help::<P::Args>(ctx, None);
                Ok(())
            }
            ParseOutcome::Parsed(parsed) => self.inner.execute(ctx, parsed).await,
            ParseOutcome::NotParsed(errors) if errors.iter().all(|e| e.kind.is_help_request()) => {
                display_help::<P::Args>(ctx, None);
                Ok(())
            }
            ParseOutcome::NotParsed(errors) => {
                debug!(command = %ctx.info.name, errors = errors.len(), "arguments not parsed");
                display_help::<P::Args>(ctx, Some(&errors));
                Ok(())
            }
        }
    }
}

fn display_help<A: CommandArgs>(ctx: &CommandContext, errors: Option<&[ParseError]>) {
    let schema = Schema::of::<A>();
    let report = HelpReport::build(&ctx.info, &schema, errors);
    ctx.reply(ctx.hooks().help_message(&report));
}
