mod reader;

pub use reader::{CommandReader, LineSource};

use std::num::NonZeroU64;

pub const ACTION_PROMPT: &str =
    "\nWhat would you like to do? (buy, sell, balance, portfolio, history, quit): ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Buy(OrderArgs),
    Sell(OrderArgs),
    Balance,
    Portfolio,
    History,
    Help,
    Dump,
    Quit,
    Unknown(String),
}

/// Arguments given inline with a buy or sell. Anything missing is asked for interactively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderArgs {
    pub instrument: Option<String>,
    pub shares: Option<String>,
}

pub fn parse_command(input: &str) -> Command {
    let input = input.trim();

    let mut components = input.split_whitespace();
    let command = match components.next() {
        Some(command) => command.to_lowercase(),
        None => return Command::Unknown(String::new()),
    };
    let args = components.collect::<Vec<_>>();

    match command.as_str() {
        "buy" | "b" => Command::Buy(order_args(&args)),
        "sell" | "s" => Command::Sell(order_args(&args)),
        "balance" | "bal" => Command::Balance,
        "portfolio" | "pf" => Command::Portfolio,
        "history" | "hist" => Command::History,
        "help" | "?" => Command::Help,
        "dump" => Command::Dump,
        "quit" | "q" | "exit" | "stop" => Command::Quit,
        _ => Command::Unknown(command),
    }
}

// Instrument names may contain spaces, so the share count is taken from the end
fn order_args(args: &[&str]) -> OrderArgs {
    match args {
        [] => OrderArgs::default(),
        [instrument] => OrderArgs {
            instrument: Some((*instrument).to_owned()),
            shares: None,
        },
        [instrument @ .., shares] => OrderArgs {
            instrument: Some(instrument.join(" ")),
            shares: Some((*shares).to_owned()),
        },
    }
}

/// Parses a share count typed by the player. Only positive whole numbers are accepted.
pub fn parse_shares(input: &str) -> Option<NonZeroU64> {
    match input.trim().parse::<u64>().map(NonZeroU64::new) {
        Ok(shares @ Some(_)) => shares,
        Ok(None) | Err(_) => None,
    }
}

pub fn help_text() -> &'static str {
    "Commands:\n  \
     buy [company] [shares]   (b)     buy shares at the current price\n  \
     sell [company] [shares]  (s)     sell shares at the current price\n  \
     balance                  (bal)   show your cash balance\n  \
     portfolio                (pf)    list the shares you own\n  \
     history                  (hist)  list every transaction\n  \
     dump                             write the session state to session.json\n  \
     quit                     (q)     leave the game"
}
