use anyhow::Context;
use clap::Parser;
use common::config::{Config, ConfigOverrides};
use log::{error, info};
use rand::{rngs::StdRng, SeedableRng};
use rust_decimal::Decimal;
use rustyline::Editor;
use std::{
    io,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
};
use wolfstreet::{
    broker::Ledger,
    command::CommandReader,
    engine::Engine,
    logging,
    market::PriceModel,
};

/// Wolf of Wall Street - Stock Market Game
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Starting balance (default: 10000, or the value in the config file)
    #[arg(long)]
    balance: Option<Decimal>,

    /// Seed for the price model, for a reproducible game
    #[arg(long)]
    seed: Option<u64>,

    /// Path to the config file
    #[arg(long)]
    config: Option<PathBuf>,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        Self {
            path: args.config,
            starting_balance: args.balance,
            rng_seed: args.seed,
        }
    }
}

fn main() {
    if let Err(error) = setup_and_launch() {
        println!("{error:?}");
    }
}

fn setup_and_launch() -> anyhow::Result<()> {
    let args = Args::parse();

    let (editor, logger_printer) = Editor::<()>::new()
        .and_then(|mut editor| {
            let printer = editor.create_external_printer()?;
            Ok((editor, printer))
        })
        .context("Failed to setup CLI")?;

    Config::init(args.into()).context("Failed to initialize config")?;

    logging::init_logger(logger_printer, Config::get().log_level_filter)
        .context("Failed to initialize logger")?;

    let result = panic::catch_unwind(AssertUnwindSafe(|| launch(editor)));

    match result {
        // Success
        Ok(Ok(())) => (),
        // Regular error which was bubbled up to us
        Ok(Err(error)) => error!("Caught error: {error:?}"),
        // We caught a panic
        Err(panic) => {
            let message = panic
                .downcast_ref::<String>()
                .map(|string| &**string)
                .or_else(|| panic.downcast_ref::<&'static str>().copied());

            match message {
                Some(message) => error!("Caught panic: {message}"),
                None => error!("Caught panic; unable to extract associated message"),
            }
        }
    }

    logging::cleanup();
    Ok(())
}

fn launch(editor: Editor<()>) -> anyhow::Result<()> {
    let config = Config::get();

    let market = PriceModel::new(
        config
            .instruments
            .iter()
            .map(|seed| (seed.name.as_str(), seed.price)),
    )
    .context("Invalid instrument configuration")?;
    let ledger = Ledger::new(config.starting_balance).context("Invalid starting balance")?;

    let rng = match config.rng_seed {
        Some(seed) => {
            info!("Seeding price model with {seed}");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let mut reader = CommandReader::new(editor);
    Engine::new(market, ledger, rng, io::stdout()).run(&mut reader)
}
