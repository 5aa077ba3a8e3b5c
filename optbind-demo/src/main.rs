mod format;

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context as _;
use optbind::{Bind, Command, Description, Handler, Opt, Outcome, ValueRegistry};
use optbind::completion::{complete_filenames, complete_matching_filenames};

use crate::format::Format;

const BAUD_RATES: &[u32] = &[
    1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600,
];

#[derive(Debug, Default, Bind)]
struct Logging {
    /// Copy everything received to this file
    #[opts(tag = "--log,name:file")]
    log: Option<PathBuf>,

    /// Only show lines containing one of these words
    #[opts(tag = "--filter,sep:\\,,name:words")]
    filters: Vec<String>,
}

#[derive(Debug, Default, Bind)]
struct Sercat {
    /// Display the list of available serial ports and exit
    #[opts(tag = "-l,--list")]
    list: bool,

    /// Display additional information on startup
    #[opts(tag = "-v,--verbose")]
    verbose: bool,

    #[opts(tag = "-b,--baud,default:115200,env:SERCAT_BAUD,name:rate", desc = "Baud rate")]
    baud: u32,

    #[opts(tag = "-f,--format,default:8N1,name:fmt", desc = "Frame format")]
    format: Format,

    /// Prefix every line with the time since the previous one
    #[opts(tag = "-t,--timestamp")]
    timestamp: Option<bool>,

    /// Reopen the port after this long if it's disconnected
    #[opts(tag = "--reconnect,name:delay")]
    reconnect: Option<Duration>,

    #[opts(embed)]
    logging: Logging,

    /// Serial port to open
    #[opts(tag = "arg:1,name:port")]
    port: Option<PathBuf>,
}

impl Handler for Sercat {
    fn version(&self) -> Option<String> {
        Some(env!("CARGO_PKG_VERSION").to_owned())
    }

    fn complete(&self, opt: &Opt<Self>, word: &str) -> Vec<Description> {
        match opt.field() {
            "baud" => BAUD_RATES
                .iter()
                .map(|rate| Description::bare(rate.to_string()))
                .collect(),
            "format" => ["8N1", "8E1", "8O1", "7E1", "7O1", "8N2"]
                .map(Description::bare)
                .into(),
            "port" => complete_matching_filenames("/dev/tty*", word),
            _ => complete_filenames(word),
        }
    }
}

fn list_ports(out: &mut impl io::Write) -> anyhow::Result<()> {
    let mut ports: Vec<PathBuf> = std::fs::read_dir("/dev")
        .context("failed to list /dev")?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("ttyUSB") || name.starts_with("ttyACM"))
        })
        .collect();

    ports.sort();

    for port in ports {
        writeln!(out, "{}", port.display())?;
    }

    Ok(())
}

fn run(options: &Sercat, out: &mut impl io::Write) -> anyhow::Result<()> {
    if options.list {
        return list_ports(out);
    }

    let port = options
        .port
        .as_ref()
        .context("no serial port given; use --list to find one")?;

    if options.verbose {
        writeln!(
            out,
            "{port}, {baud} baud, {format}",
            port = port.display(),
            baud = options.baud,
            format = options.format,
        )?;

        if let Some(delay) = options.reconnect {
            writeln!(out, "reconnecting after {delay:?}")?;
        }
        if let Some(log) = &options.logging.log {
            writeln!(out, "logging to {}", log.display())?;
        }
        if !options.logging.filters.is_empty() {
            writeln!(out, "showing lines with: {}", options.logging.filters.join(", "))?;
        }
    }

    log::info!("settings: {options:?}");
    Ok(())
}

/// The width of the terminal, if there's one and it reports a usable size
fn terminal_width(size: io::Result<(u16, u16)>) -> Option<usize> {
    match size {
        Ok((0, _)) => None,
        Ok((columns, _rows)) => Some(usize::from(columns)),
        Err(err) => {
            log::debug!("can't read the terminal size: {err}");
            None
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();

    let mut registry = ValueRegistry::default();
    registry.register_text::<Format>();

    let mut command = Command::with_registry(Sercat::default(), registry);
    command.description = "Read from and write to a serial port".to_owned();
    command.capture_process();

    if let Some(width) = terminal_width(crossterm::terminal::size()) {
        command.console_width = width;
    }

    let outcome = match command.resolve() {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{}: {err}", command.process_name);
            return Ok(ExitCode::FAILURE);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command.message(&outcome)? {
        Some(message) => out.write_all(message.as_bytes())?,
        None => {
            debug_assert_eq!(outcome, Outcome::Ready);
            run(command.handler(), &mut out)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
