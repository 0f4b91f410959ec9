mod common;

use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use common::{harness, player, tokens};
use extended_commands::parsing::{ParseErrorKind, ParseOutcome, parse_args};
use extended_commands::{
    Caller, Command, CommandArgs, CommandContext, CommandInfo, HelpFlag, HelpOnly, ParsedCommand,
};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Speed {
    Walk,
    Run,
}

#[derive(Debug, Parser)]
struct MoveArgs {
    /// Where to go
    destination: String,

    /// How fast
    #[arg(short, long, value_enum, default_value = "walk")]
    speed: Speed,

    #[command(flatten)]
    help: HelpFlag,
}

impl CommandArgs for MoveArgs {
    fn help_flag(&self) -> &HelpFlag {
        &self.help
    }
}

/// Remembers what it was called with.
#[derive(Clone, Default)]
struct Move {
    calls: Arc<Mutex<Vec<(String, Speed)>>>,
}

#[async_trait]
impl ParsedCommand for Move {
    type Args = MoveArgs;

    async fn execute(&self, ctx: &CommandContext, args: MoveArgs) -> anyhow::Result<()> {
        self.calls.lock().push((args.destination.clone(), args.speed));
        ctx.reply(format!("moving to {}", args.destination));
        Ok(())
    }
}

fn move_command(body: Move) -> Command {
    Command::parsed(
        CommandInfo::new("move").help("Moves you.").syntax("<destination> [-s speed]"),
        body,
    )
}

#[test]
fn parsed_arguments_reach_the_body() {
    let h = harness();
    let body = Move::default();
    let cmd = move_command(body.clone());

    h.dispatcher.invoke(&cmd, player(), tokens("harbor --speed run")).unwrap();

    assert_eq!(*body.calls.lock(), vec![("harbor".to_string(), Speed::Run)]);
    assert_eq!(h.sink.to(&player()), vec!["moving to harbor"]);
}

#[test]
fn help_flag_alone_shows_help_despite_missing_required_field() {
    let h = harness();
    let body = Move::default();
    let cmd = move_command(body.clone());

    h.dispatcher.invoke(&cmd, player(), tokens("-h")).unwrap();

    assert!(body.calls.lock().is_empty());
    let sent = h.sink.to(&player());
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("Command: move\nMoves you.\n"));
    assert!(!sent[0].contains("Errors during parsing:"));
}

#[test]
fn help_flag_with_valid_input_shows_help() {
    let h = harness();
    let body = Move::default();
    let cmd = move_command(body.clone());

    h.dispatcher.invoke(&cmd, player(), tokens("harbor --help")).unwrap();

    assert!(body.calls.lock().is_empty());
    let sent = h.sink.to(&player());
    assert!(sent[0].contains("    destination pos. 1"));
    assert!(!sent[0].contains("Errors during parsing:"));
}

#[test]
fn malformed_input_shows_help_with_errors_and_is_not_a_failure() {
    let h = harness();
    let body = Move::default();
    let cmd = move_command(body.clone());

    h.dispatcher.invoke(&cmd, player(), tokens("harbor paris")).unwrap();

    assert!(body.calls.lock().is_empty());
    let sent = h.sink.to(&player());
    assert_eq!(sent.len(), 1);

    let lines: Vec<&str> = sent[0].lines().collect();
    let at = lines.iter().position(|l| *l == "Errors during parsing:").expect("error block");
    assert_eq!(lines.len(), at + 2);
    assert!(lines[at + 1].starts_with("UnknownArgument: unexpected argument 'paris'"));
}

#[test]
fn option_names_and_values_ignore_case_and_unknown_options_are_skipped() {
    let h = harness();
    let body = Move::default();
    let cmd = move_command(body.clone());

    h.dispatcher.invoke(&cmd, player(), tokens("harbor --SPEED Run --sneaky")).unwrap();

    assert_eq!(*body.calls.lock(), vec![("harbor".to_string(), Speed::Run)]);
    assert_eq!(h.sink.to(&player()), vec!["moving to harbor"]);
}

#[test]
fn bad_enum_value_is_listed() {
    let h = harness();
    let cmd = move_command(Move::default());

    h.dispatcher.invoke(&cmd, Caller::Console, tokens("harbor -s fly")).unwrap();

    let sent = h.sink.to(&Caller::Console);
    assert!(sent[0].contains("        Possible values: walk (0), run (1)"));
    assert!(sent[0].contains("InvalidValue: invalid value 'fly'"));
}

#[test]
fn parse_outcome_for_missing_field() {
    match parse_args::<MoveArgs>(&tokens("--speed run")) {
        ParseOutcome::NotParsed(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].kind, ParseErrorKind::MissingRequiredArgument);
        }
        ParseOutcome::Parsed(args) => panic!("unexpected parse: {args:?}"),
    }
}

struct Noop;

#[async_trait]
impl ParsedCommand for Noop {
    type Args = HelpOnly;

    async fn execute(&self, ctx: &CommandContext, _args: HelpOnly) -> anyhow::Result<()> {
        ctx.reply("ran");
        Ok(())
    }
}

#[test]
fn help_only_command_runs_or_shows_help() {
    let h = harness();
    let cmd = Command::parsed(CommandInfo::new("noop").help("Does nothing."), Noop);

    h.dispatcher.invoke(&cmd, player(), vec![]).unwrap();
    h.dispatcher.invoke(&cmd, player(), tokens("-h")).unwrap();
    h.dispatcher.invoke(&cmd, player(), tokens("extra")).unwrap();

    let sent = h.sink.to(&player());
    assert_eq!(sent[0], "ran");
    assert!(sent[1].starts_with("Command: noop\nDoes nothing.\n"));
    assert!(!sent[1].contains("Errors during parsing:"));
    assert!(sent[2].contains("Errors during parsing:"));
}
