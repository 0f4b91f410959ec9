use anyhow::{anyhow, bail};
use async_trait::async_trait;
use clap::Parser;
use extended_commands::{CommandArgs, Command, CommandContext, CommandInfo, HelpFlag, ParsedCommand};

#[derive(Debug, Parser)]
#[command(allow_negative_numbers = true)]
struct DivideArgs {
    /// Number to divide
    dividend: i64,

    /// Number to divide by
    divisor: i64,

    #[command(flatten)]
    help: HelpFlag,
}

impl CommandArgs for DivideArgs {
    fn help_flag(&self) -> &HelpFlag {
        &self.help
    }
}

pub fn command() -> Command {
    Command::parsed(
        CommandInfo::new("divide")
            .help("Integer division. Fails on a zero divisor.")
            .syntax("<dividend> <divisor>")
            .aliases(["div"]),
        Divide,
    )
}

struct Divide;

#[async_trait]
impl ParsedCommand for Divide {
    type Args = DivideArgs;

    async fn execute(&self, ctx: &CommandContext, args: DivideArgs) -> anyhow::Result<()> {
        if args.divisor == 0 {
            bail!("division by zero");
        }
        let quotient = args
            .dividend
            .checked_div(args.divisor)
            .ok_or_else(|| anyhow!("{} / {} overflows", args.dividend, args.divisor))?;

        ctx.reply(format!("{} / {} = {quotient}", args.dividend, args.divisor));
        Ok(())
    }
}
