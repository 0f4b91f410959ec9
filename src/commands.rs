//! Commands the console binary ships with.

use extended_commands::Command;
use std::time::Instant;

mod divide;
mod give;
mod ping;
mod uptime;

pub fn all(started: Instant) -> Vec<Command> {
    vec![ping::command(), give::command(), divide::command(), uptime::command(started)]
}
