//! Console commands understood by the counter binary.

use anyhow::{bail, Context, Result};

use crate::counter::CounterAction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dispatch(CounterAction),
    Later,
    Help,
    Quit,
    Empty,
}

/// Parse one input line. Besides the shorthands, a JSON action record such
/// as `{"type":"DECREMENT"}` is dispatched as-is.
pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    if line.starts_with('{') {
        let action = serde_json::from_str(line)
            .with_context(|| format!("Not a counter action: {line}"))?;
        return Ok(Command::Dispatch(action));
    }

    Ok(match line.to_ascii_lowercase().as_str() {
        "" => Command::Empty,
        "+" | "inc" | "increment" => Command::Dispatch(CounterAction::Increment),
        "-" | "dec" | "decrement" => Command::Dispatch(CounterAction::Decrement),
        "later" => Command::Later,
        "?" | "help" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        _ => bail!("Unknown command `{line}`, try `help`"),
    })
}
