use async_trait::async_trait;
use extended_commands::{AllowedCaller, Command, CommandContext, CommandInfo, HelpOnly, ParsedCommand};
use std::time::Instant;

pub fn command(started: Instant) -> Command {
    Command::parsed(
        CommandInfo::new("uptime")
            .help("Shows how long the console has been running.")
            .allowed_caller(AllowedCaller::Console),
        Uptime { started },
    )
}

struct Uptime {
    started: Instant,
}

#[async_trait]
impl ParsedCommand for Uptime {
    type Args = HelpOnly;

    async fn execute(&self, ctx: &CommandContext, _args: HelpOnly) -> anyhow::Result<()> {
        let secs = self.started.elapsed().as_secs();
        ctx.reply(format!("Up for {}h {}m {}s", secs / 3600, secs / 60 % 60, secs % 60));
        Ok(())
    }
}
