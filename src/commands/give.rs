use anyhow::bail;
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use extended_commands::{CommandArgs, Command, CommandContext, CommandInfo, HelpFlag, ParsedCommand};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Item {
    Apple,
    Sword,
    Shield,
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Item::Apple => "apple",
            Item::Sword => "sword",
            Item::Shield => "shield",
        })
    }
}

#[derive(Debug, Parser)]
struct GiveArgs {
    /// Player receiving the items
    target: String,

    /// Item to hand out
    #[arg(short, long, value_enum, default_value = "apple")]
    item: Item,

    /// How many each player gets
    #[arg(short = 'n', long, default_value_t = 1)]
    amount: u32,

    /// More players getting the same
    others: Vec<String>,

    #[command(flatten)]
    help: HelpFlag,
}

impl CommandArgs for GiveArgs {
    fn help_flag(&self) -> &HelpFlag {
        &self.help
    }
}

pub fn command() -> Command {
    Command::parsed(
        CommandInfo::new("give")
            .help("Hands items to one or more players.")
            .syntax("<target> [others...] [-i item] [-n amount]")
            .permissions(["give", "give.others"]),
        Give,
    )
}

struct Give;

#[async_trait]
impl ParsedCommand for Give {
    type Args = GiveArgs;

    async fn execute(&self, ctx: &CommandContext, args: GiveArgs) -> anyhow::Result<()> {
        if args.amount == 0 {
            bail!("amount must be at least 1");
        }

        for name in std::iter::once(&args.target).chain(&args.others) {
            ctx.broadcast(format!("{} gave {} x {} to {name}", ctx.caller, args.amount, args.item));
        }
        Ok(())
    }
}
