use colored::{Color, Colorize};
use common::util;
use flate2::{write::GzEncoder, Compression};
use log::{error, Level, LevelFilter, Record};
use log4rs::{
    append::{
        rolling_file::{
            policy::compound::{roll::Roll, trigger::size::SizeTrigger, CompoundPolicy},
            RollingFileAppender,
        },
        Append,
    },
    config::{Appender, Config, Root},
    encode::{self, Encode},
    filter::{Filter, Response},
};
use rustyline::ExternalPrinter;
use std::{
    fmt::{self, Debug, Formatter},
    fs::{self, File},
    io,
    path::{Component, Path, PathBuf},
    sync::Mutex,
    thread,
};

const FILE_SIZE_LIMIT: u64 = 50_000_000;
const LOG_DIR: &str = "./logs";
const LATEST_LOG: &str = "./logs/latest.log";
const LOG_CRATES: [&str; 3] = ["common", "entity", "wolfstreet"];

// Everything from our crates goes to a size-rolled log file that is gzipped when rolled. Warnings
// and errors are also echoed through rustyline so they do not clobber the prompt.
pub fn init_logger<P>(printer: P, level: LevelFilter) -> anyhow::Result<()>
where
    P: ExternalPrinter + Send + 'static,
{
    let console = ConsoleAppender {
        printer: Mutex::new(printer),
    };

    let log_file = RollingFileAppender::builder()
        .encoder(Box::new(PlainEncoder))
        .build(
            LATEST_LOG,
            Box::new(CompoundPolicy::new(
                Box::new(SizeTrigger::new(FILE_SIZE_LIMIT)),
                Box::new(GzipRoller::new()),
            )),
        )?;

    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(CrateFilter))
                .build("console", Box::new(console)),
        )
        .appender(
            Appender::builder()
                .filter(Box::new(CrateFilter))
                .build("log_file", Box::new(log_file)),
        )
        .build(
            Root::builder()
                .appender("console")
                .appender("log_file")
                .build(level),
        )?;

    log4rs::init_config(config)?;

    Ok(())
}

/// Compresses the log of the session that is ending. Failures are ignored since there is nobody
/// left to report them to.
pub fn cleanup() {
    let _ = GzipRoller::new().roll_now(Path::new(LATEST_LOG), false);
}

fn format_record(record: &Record) -> String {
    let time = util::local_now()
        .format(&*util::TIME_FORMAT)
        .unwrap_or_else(|_| "??:??:??".to_owned());

    match source_location(record) {
        Some(location) => format!("[{time} {} {location}]: {}", record.level(), record.args()),
        None => format!("[{time} {}]: {}", record.level(), record.args()),
    }
}

// Info and warnings are meant for the player, so only the noisier levels and errors carry a
// source location
fn source_location(record: &Record) -> Option<String> {
    if matches!(record.level(), Level::Info | Level::Warn) {
        return None;
    }

    let file = record.file()?;
    let line = record.line()?;

    let trimmed = Path::new(file)
        .components()
        .skip_while(|component| {
            matches!(
                component,
                Component::Prefix(_)
                    | Component::RootDir
                    | Component::CurDir
                    | Component::ParentDir
            ) || component == &Component::Normal("src".as_ref())
        })
        .collect::<PathBuf>();

    Some(format!("{}:{line}", trimmed.display()))
}

fn accepts_module(path: &str) -> bool {
    LOG_CRATES.iter().any(|&krate| {
        path.strip_prefix(krate)
            .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
    })
}

#[derive(Debug)]
struct CrateFilter;

impl Filter for CrateFilter {
    fn filter(&self, record: &Record) -> Response {
        match record.module_path() {
            Some(path) if accepts_module(path) => Response::Accept,
            _ => Response::Reject,
        }
    }
}

struct ConsoleAppender<P> {
    printer: Mutex<P>,
}

impl<P: ExternalPrinter + Send + 'static> Append for ConsoleAppender<P> {
    fn append(&self, record: &Record) -> anyhow::Result<()> {
        let color = match record.level() {
            Level::Error => Color::Red,
            Level::Warn => Color::Yellow,
            _ => return Ok(()),
        };

        let line = format!("{}\n", format_record(record).color(color));
        self.printer
            .lock()
            .map_err(|_| anyhow::anyhow!("Console printer mutex poisoned"))?
            .print(line)?;

        Ok(())
    }

    fn flush(&self) {}
}

impl<P> Debug for ConsoleAppender<P> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("ConsoleAppender { .. }")
    }
}

#[derive(Debug)]
struct PlainEncoder;

impl Encode for PlainEncoder {
    fn encode(&self, writer: &mut dyn encode::Write, record: &Record<'_>) -> anyhow::Result<()> {
        writeln!(writer, "{}", format_record(record)).map_err(Into::into)
    }
}

/// Rolls `latest.log` into `{date}-{n}.log.gz`, where `n` counts the rolls made that day.
#[derive(Debug)]
struct GzipRoller {
    // (day of the year, rolls made that day)
    today: Mutex<(u16, u32)>,
}

impl GzipRoller {
    fn new() -> Self {
        let now = util::local_now();
        let date = now.format(&*util::DATE_FORMAT).unwrap_or_default();

        let rolled_today = fs::read_dir(LOG_DIR)
            .map(|entries| {
                entries
                    .flatten()
                    .filter_map(|entry| entry.file_name().into_string().ok())
                    .filter_map(|name| roll_index(&name, &date))
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);

        Self {
            today: Mutex::new((now.ordinal(), rolled_today)),
        }
    }

    fn roll_now(&self, file: &Path, background: bool) -> anyhow::Result<()> {
        let now = util::local_now();

        let index = {
            let mut today = self
                .today
                .lock()
                .map_err(|_| anyhow::anyhow!("Log roller mutex poisoned"))?;
            if today.0 != now.ordinal() {
                *today = (now.ordinal(), 1);
            } else {
                today.1 = today.1.wrapping_add(1);
            }
            today.1
        };

        // Move the file out of the way first so logging can continue while it is compressed
        let staging = PathBuf::from(LOG_DIR).join("latest-tmp.log");
        fs::rename(file, &staging)?;

        let output = PathBuf::from(LOG_DIR).join(format!(
            "{}-{index}.log.gz",
            now.format(&*util::DATE_FORMAT)?
        ));

        if background {
            thread::spawn(move || {
                if let Err(error) = compress(&staging, &output) {
                    error!("Failed to compress log file: {error:?}");
                }
            });
        } else {
            compress(&staging, &output)?;
        }

        Ok(())
    }
}

impl Roll for GzipRoller {
    fn roll(&self, file: &Path) -> anyhow::Result<()> {
        self.roll_now(file, true)
    }
}

// Parses `n` out of `{date}-{n}.log.gz`
fn roll_index(file_name: &str, date: &str) -> Option<u32> {
    file_name
        .strip_prefix(date)?
        .strip_prefix('-')?
        .strip_suffix(".log.gz")?
        .parse()
        .ok()
}

fn compress(input_path: &Path, output_path: &Path) -> io::Result<()> {
    let mut input = File::open(input_path)?;
    let mut output = GzEncoder::new(File::create(output_path)?, Compression::default());
    io::copy(&mut input, &mut output)?;
    output.finish()?;
    // Some platforms refuse to delete a file that is still open
    drop(input);
    fs::remove_file(input_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_our_crates_are_logged() {
        assert!(accepts_module("wolfstreet"));
        assert!(accepts_module("wolfstreet::broker"));
        assert!(accepts_module("common::config"));
        assert!(accepts_module("entity::trading"));
        assert!(!accepts_module("rustyline::edit"));
        assert!(!accepts_module("commonplace"));
    }

    #[test]
    fn roll_index_parsing() {
        assert_eq!(roll_index("2026-10-15-3.log.gz", "2026-10-15"), Some(3));
        assert_eq!(roll_index("2026-10-15-12.log.gz", "2026-10-15"), Some(12));
        assert_eq!(roll_index("2026-10-14-3.log.gz", "2026-10-15"), None);
        assert_eq!(roll_index("latest.log", "2026-10-15"), None);
    }

    fn location_for(level: Level) -> Option<String> {
        source_location(
            &Record::builder()
                .level(level)
                .file(Some("engine/src/broker/mod.rs"))
                .line(Some(10))
                .args(format_args!("hello"))
                .build(),
        )
    }

    #[test]
    fn location_is_omitted_for_player_facing_levels() {
        assert_eq!(location_for(Level::Info), None);
        assert_eq!(location_for(Level::Warn), None);

        let expected = format!("{}:10", Path::new("engine/src/broker/mod.rs").display());
        assert_eq!(location_for(Level::Debug), Some(expected.clone()));
        assert_eq!(location_for(Level::Error), Some(expected));
    }
}
