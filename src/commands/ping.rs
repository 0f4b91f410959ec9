use async_trait::async_trait;
use extended_commands::{Command, CommandBody, CommandContext, CommandInfo, tr};
use std::time::{Duration, Instant};
use tracing::debug;

const PONG: &str = "pong";
const PONG_ECHO: &str = "pong_echo";

/// Answers from a worker after a short pause, so it never holds up the caller.
pub fn command() -> Command {
    Command::new(
        CommandInfo::new("ping")
            .help("Checks that the server answers.")
            .syntax("[message]")
            .aliases(["p"]),
        Ping,
    )
    .off_thread(true)
    .translations([(PONG, "Pong, {0}!"), (PONG_ECHO, "Pong, {0}: {1}")])
}

struct Ping;

#[async_trait]
impl CommandBody for Ping {
    async fn execute(&self, ctx: &CommandContext, args: &[String]) -> anyhow::Result<()> {
        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(25)).await;

        let text = if args.is_empty() {
            tr!(ctx, PONG, ctx.caller)
        } else {
            tr!(ctx, PONG_ECHO, ctx.caller, args.join(" "))
        };
        ctx.reply(text);

        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "ping answered");
        Ok(())
    }
}
