use std::{
    fs,
    io::{self, Write},
};

use log::{debug, error, info, trace};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;

use super::display;
use crate::{
    broker::Ledger,
    command::{self, Command, LineSource, OrderArgs, ACTION_PROMPT},
    market::PriceModel,
};

const DUMP_PATH: &str = "session.json";

/// One game session: the market, the player's ledger, the random source driving prices, and
/// where output is written.
pub struct Engine<R, W> {
    market: PriceModel,
    ledger: Ledger,
    rng: R,
    out: W,
    ticks: u64,
}

#[derive(Serialize)]
struct SessionDump<'a> {
    ticks: u64,
    market: &'a PriceModel,
    ledger: &'a Ledger,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Flow {
    Continue,
    Quit,
}

#[derive(Clone, Copy)]
enum Side {
    Buy,
    Sell,
}

impl Side {
    fn verb(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl<R: Rng, W: Write> Engine<R, W> {
    pub fn new(market: PriceModel, ledger: Ledger, rng: R, out: W) -> Self {
        Self {
            market,
            ledger,
            rng,
            out,
            ticks: 0,
        }
    }

    pub fn market(&self) -> &PriceModel {
        &self.market
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs turns until the player quits. Every turn that does not quit ends with exactly one
    /// tick of the market, whether or not the command did anything.
    pub fn run<L>(&mut self, input: &mut L) -> anyhow::Result<()>
    where
        L: LineSource + ?Sized,
    {
        info!(
            "Starting session with {} instruments and a balance of {:.2}",
            self.market.len(),
            self.ledger.balance()
        );

        loop {
            display::write_ticker_board(&mut self.out, &self.market)?;
            display::write_account_info(&mut self.out, &self.ledger, &self.market)?;
            self.out.flush()?;

            let command = match input.read_line(ACTION_PROMPT)? {
                Some(line) => command::parse_command(&line),
                None => Command::Quit,
            };
            trace!("Received command {command:?}");

            if self.handle_command(command, input)? == Flow::Quit {
                writeln!(self.out, "Thank you for playing!")?;
                self.out.flush()?;
                info!("Session ended after {} ticks", self.ticks);
                return Ok(());
            }

            self.tick();
        }
    }

    fn tick(&mut self) {
        self.market.tick(&mut self.rng);
        self.ticks += 1;
    }

    fn handle_command<L>(&mut self, command: Command, input: &mut L) -> io::Result<Flow>
    where
        L: LineSource + ?Sized,
    {
        match command {
            Command::Buy(args) => return self.execute_order(Side::Buy, args, input),
            Command::Sell(args) => return self.execute_order(Side::Sell, args, input),
            Command::Balance => {
                writeln!(self.out, "Your current balance: {:.2}", self.ledger.balance())?;
            }
            Command::Portfolio => display::write_portfolio(&mut self.out, &self.ledger)?,
            Command::History => display::write_history(&mut self.out, &self.ledger)?,
            Command::Help => writeln!(self.out, "{}", command::help_text())?,
            Command::Dump => self.dump()?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Unknown(_) => writeln!(self.out, "Invalid action. Please try again.")?,
        }

        Ok(Flow::Continue)
    }

    fn execute_order<L>(&mut self, side: Side, args: OrderArgs, input: &mut L) -> io::Result<Flow>
    where
        L: LineSource + ?Sized,
    {
        let instrument = match args.instrument {
            Some(instrument) => instrument,
            None => match self.prompt(input, "Enter the company name: ")? {
                Some(instrument) => instrument.trim().to_owned(),
                None => return Ok(Flow::Quit),
            },
        };

        let shares = match args.shares {
            Some(shares) => shares,
            None => {
                let prompt = format!("Enter the number of shares to {}: ", side.verb());
                match self.prompt(input, &prompt)? {
                    Some(shares) => shares,
                    None => return Ok(Flow::Quit),
                }
            }
        };

        let shares = match command::parse_shares(&shares) {
            Some(shares) => shares.get(),
            None => {
                writeln!(self.out, "Shares must be a positive whole number.")?;
                return Ok(Flow::Continue);
            }
        };

        let price = match self.market.price(&instrument) {
            Some(price) if price > Decimal::ZERO => price,
            _ => {
                writeln!(self.out, "Invalid company name.")?;
                return Ok(Flow::Continue);
            }
        };

        let result = match side {
            Side::Buy => self.ledger.buy(&instrument, shares, price),
            Side::Sell => self.ledger.sell(&instrument, shares, price),
        };

        match (side, result) {
            (Side::Buy, Ok(true)) => writeln!(
                self.out,
                "Bought {shares} shares of {instrument} at {price:.2} each."
            )?,
            (Side::Buy, Ok(false)) => {
                writeln!(self.out, "Insufficient balance to make the purchase.")?
            }
            (Side::Sell, Ok(true)) => writeln!(
                self.out,
                "Sold {shares} shares of {instrument} at {price:.2} each."
            )?,
            (Side::Sell, Ok(false)) => writeln!(self.out, "Not enough shares to make the sale.")?,
            (side, Err(error)) => {
                error!("Ledger rejected {} order for {instrument}: {error}", side.verb());
                writeln!(self.out, "Unable to {} {instrument} right now.", side.verb())?;
            }
        }

        Ok(Flow::Continue)
    }

    // Input failures while prompting are reported and treated as leaving the game
    fn prompt<L>(&mut self, input: &mut L, prompt: &str) -> io::Result<Option<String>>
    where
        L: LineSource + ?Sized,
    {
        self.out.flush()?;

        match input.read_line(prompt) {
            Ok(line) => Ok(line),
            Err(error) => {
                error!("Failed to read input: {error:?}");
                Ok(None)
            }
        }
    }

    fn dump(&mut self) -> io::Result<()> {
        let dump = SessionDump {
            ticks: self.ticks,
            market: &self.market,
            ledger: &self.ledger,
        };

        let json = match serde_json::to_string_pretty(&dump) {
            Ok(json) => json,
            Err(error) => {
                error!("Failed to dump session state to json: {error:?}");
                return Ok(());
            }
        };

        match fs::write(DUMP_PATH, &json) {
            Ok(()) => {
                debug!("Wrote session state to {DUMP_PATH}");
                writeln!(self.out, "Session state written to {DUMP_PATH}.")
            }
            Err(error) => {
                error!("Failed to write JSON to file, writing to console instead. {error:?}");
                writeln!(self.out, "{json}")
            }
        }
    }
}
