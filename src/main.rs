use trs_xray::config::SystemConfig;
use trs_xray::console;
use trs_xray::disassembler::Z80Disassembler;
use trs_xray::events::{self, AppEvent};
use trs_xray::session::Session;
use trs_xray::sut::client::WsConnector;
use trs_xray::sut::connection::ConnectionManager;

use anyhow::{Context, Result};
use clap::Parser;
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

#[derive(Parser, Debug)]
#[command(
    name = "trs-xray",
    version,
    about = "Remote debugger for Z80 TRS-80 emulators."
)]
struct Args {
    /// Emulator debug server, as host[:port]. Overrides the saved config.
    #[arg(long, value_name = "HOST")]
    connect: Option<String>,

    /// Never open a channel. Useful with --import.
    #[arg(long, default_value_t = false, conflicts_with = "connect")]
    offline: bool,

    /// trs80gp dump to load on startup.
    #[arg(long, value_name = "PATH")]
    import: Option<PathBuf>,

    /// Also write the log (at debug level) to this file.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Debug-level logging on the terminal.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Store the effective settings as the new defaults.
    #[arg(long, default_value_t = false)]
    save_config: bool,
}

fn init_logging(args: &Args) -> Result<()> {
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(path) = &args.log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Unable to create log file {}", path.display()))?;
        loggers.push(WriteLogger::new(LevelFilter::Debug, Config::default(), file));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let mut config = SystemConfig::load();
    if let Some(host) = &args.connect {
        config.sut_host = Some(host.clone());
    }
    if args.save_config {
        config.save()?;
    }

    let (tx, rx) = mpsc::channel::<AppEvent>();

    let host = if args.offline {
        None
    } else {
        config.sut_host.clone()
    };
    let connector = WsConnector::new(host.as_deref().unwrap_or_default(), tx.clone());
    let connection = match &host {
        Some(_) => {
            log::info!("Debugging SUT at {}", connector.url());
            ConnectionManager::new(connector, config.liveness_policy())
        }
        None => {
            log::info!("No SUT host configured, running offline");
            ConnectionManager::new(connector, config.liveness_policy()).offline()
        }
    };

    let mut session = Session::new(
        connection,
        Z80Disassembler::new(),
        config.session_settings(),
    );
    session.subscribe(|notification| {
        if let Some(line) = console::describe(notification) {
            println!("{}", line);
        }
    });

    if let Some(path) = &args.import {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        session
            .import_trs80gp(&content)
            .with_context(|| format!("Unable to import {}", path.display()))?;
    }

    let input_tx = tx.clone();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if input_tx.send(AppEvent::Input(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    log::error!("Unable to read input: {}", e);
                    break;
                }
            }
        }
        let _ = input_tx.send(AppEvent::Quit);
    });
    drop(tx);

    events::run_session(&mut session, &rx, &mut io::stdout())
}
