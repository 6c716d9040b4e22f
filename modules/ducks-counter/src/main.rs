use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ducks_counter::{
    build_store, count, increment_later, parse_command, Command, CounterAction, CounterState,
    CounterStore, StateFile,
};
use ducks_engine::{Dispatchable, EngineConfig};

#[derive(Parser)]
#[command(name = "ducks-counter", about = "Interactive counter driven by the ducks engine")]
struct Cli {
    /// Where the counter state is saved after every change
    #[arg(long, env = "DUCKS_STATE_PATH", default_value = "counter-state.json")]
    state_path: PathBuf,

    /// Delay before a `later` command increments the counter
    #[arg(long, env = "DUCKS_LATER_DELAY_MS", default_value_t = 3000)]
    later_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ducks=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env()?;
    config.log();

    let state_file = StateFile::new(cli.state_path);
    let initial = state_file.load()?;
    info!(path = %state_file.path().display(), count = initial.count, "Counter starting");

    let saver = state_file.clone();
    let store = build_store(initial, config, move |state: &CounterState| saver.save(state))?;
    render(&store.state());
    store.subscribe(|state: &Arc<CounterState>| render(state));
    print_help();

    let later_delay = Duration::from_millis(cli.later_delay_ms);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Command::Dispatch(action)) => dispatch(&store, action),
            Ok(Command::Later) => dispatch(&store, increment_later(later_delay)),
            Ok(Command::Help) => print_help(),
            Ok(Command::Quit) => break,
            Ok(Command::Empty) => {}
            Err(err) => error!("{err:#}"),
        }
    }

    info!(count = store.select(count), "Counter exiting");
    Ok(())
}

fn dispatch(store: &CounterStore, input: impl Into<Dispatchable<CounterState, CounterAction>>) {
    if let Err(err) = store.dispatch(input) {
        error!(error = %err, "Dispatch failed");
    }
}

fn render(state: &CounterState) {
    println!("Count: {}", state.count);
}

fn print_help() {
    println!("Commands: + (increment), - (decrement), later, help, quit");
    println!("JSON actions are accepted too, e.g. {{\"type\":\"DECREMENT\"}}");
}
