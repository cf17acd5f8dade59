//! markswap - select text in markup and swap it out, from the terminal

use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use markswap::app::App;
use markswap::config::Config;
use markswap::error::{MarkswapError, Result};
use markswap::reveal::{self, Revealer};
use markswap::session::{CommitMode, Session};
use markswap::terminal::Terminal;
use markswap::{insert_marker, strip_addressing, tokenize};

/// What to do, from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Help,
    Version,
    Interactive(PathBuf),
    Tokenize(PathBuf),
    Strip(PathBuf),
    Replace {
        file: PathBuf,
        start: usize,
        end: usize,
        text: String,
        stream: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    command: Command,
    tick_ms: Option<u64>,
    mode: Option<CommitMode>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let args = parse_args(&args)?;

    let mut config = Config::load();
    if let Some(ms) = args.tick_ms {
        config.set_tick_interval_ms(ms);
    }
    if let Some(mode) = args.mode {
        config.commit_mode = mode;
    }

    let interactive = matches!(args.command, Command::Interactive(_));
    init_logging(&config, interactive)?;

    match args.command {
        Command::Help => print_usage(),
        Command::Version => print_version(),
        Command::Tokenize(path) => println!("{}", tokenize(&read_source(&path)?)?),
        Command::Strip(path) => println!("{}", strip_addressing(&read_source(&path)?)?),
        Command::Replace {
            file,
            start,
            end,
            text,
            stream,
        } => {
            let mode = match (stream, args.mode) {
                (true, _) => CommitMode::Stream,
                (false, Some(mode)) => mode,
                (false, None) => CommitMode::Immediate,
            };
            replace(&file, start, end, &text, mode, &config)?;
        }
        Command::Interactive(path) => {
            if path.as_os_str() == "-" {
                return Err(MarkswapError::Message(
                    "interactive mode needs a file, not stdin".to_string(),
                ));
            }
            let source = read_source(&path)?;
            let session = Session::new(&source, config.tick_interval())?;
            let name = path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let terminal = Terminal::new()?;
            let document = App::new(terminal, session, name, config.commit_mode).run()?;
            println!("{}", document);
        }
    }

    Ok(())
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut positional = Vec::new();
    let mut tick_ms = None;
    let mut mode = None;
    let mut stream = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                return Ok(Args {
                    command: Command::Help,
                    tick_ms,
                    mode,
                })
            }
            "--version" | "-V" => {
                return Ok(Args {
                    command: Command::Version,
                    tick_ms,
                    mode,
                })
            }
            "--tick" => {
                let value = iter.next().ok_or_else(|| usage_error("--tick needs a value"))?;
                let ms = value
                    .parse::<u64>()
                    .map_err(|_| usage_error(&format!("invalid tick interval: {}", value)))?;
                tick_ms = Some(ms);
            }
            "--mode" => {
                let value = iter.next().ok_or_else(|| usage_error("--mode needs a value"))?;
                mode = Some(
                    CommitMode::parse(value)
                        .ok_or_else(|| usage_error(&format!("unknown mode: {}", value)))?,
                );
            }
            "--stream" => stream = true,
            "-" => positional.push(arg.clone()),
            s if s.starts_with('-') => return Err(usage_error(&format!("unknown option: {}", s))),
            _ => positional.push(arg.clone()),
        }
    }

    let command = match positional.first().map(String::as_str) {
        None => return Err(usage_error("no input file")),
        Some("tokenize") => Command::Tokenize(single_file(&positional)?),
        Some("strip") => Command::Strip(single_file(&positional)?),
        Some("replace") => {
            let [_, file, start, end, text] = positional.as_slice() else {
                return Err(usage_error("replace needs FILE START END TEXT"));
            };
            Command::Replace {
                file: PathBuf::from(file),
                start: parse_index(start)?,
                end: parse_index(end)?,
                text: text.clone(),
                stream,
            }
        }
        Some(file) if positional.len() == 1 => Command::Interactive(PathBuf::from(file)),
        Some(_) => return Err(usage_error("too many arguments")),
    };

    Ok(Args {
        command,
        tick_ms,
        mode,
    })
}

fn single_file(positional: &[String]) -> Result<PathBuf> {
    match positional {
        [_, file] => Ok(PathBuf::from(file)),
        _ => Err(usage_error("expected exactly one FILE")),
    }
}

fn parse_index(s: &str) -> Result<usize> {
    s.parse()
        .map_err(|_| usage_error(&format!("invalid segment index: {}", s)))
}

fn usage_error(msg: &str) -> MarkswapError {
    MarkswapError::Message(format!("{} (see --help)", msg))
}

/// Read a file, or stdin for `-`
fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn replace(file: &Path, start: usize, end: usize, text: &str, mode: CommitMode, config: &Config) -> Result<()> {
    let annotated = tokenize(&read_source(file)?)?;
    let clean = strip_addressing(&insert_marker(&annotated, start, end)?)?;

    match mode {
        CommitMode::MarkerOnly => println!("{}", clean),
        CommitMode::Immediate => println!("{}", reveal::replace_marker(&clean, text)?),
        CommitMode::Stream => {
            // every step of the reveal, one document per line
            let mut document = clean;
            Revealer::new(config.tick_interval())
                .run_to_completion(text, &mut document, |step| println!("{}", step))?;
        }
    }
    Ok(())
}

/// Install the tracing subscriber
///
/// Logs go to the configured file. Without one, subcommands log warnings to
/// stderr and the interactive surface logs nothing.
fn init_logging(config: &Config, interactive: bool) -> Result<()> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None if !interactive => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                )
                .with_writer(io::stderr)
                .init();
        }
        None => {}
    }
    Ok(())
}

fn print_usage() {
    println!("markswap {} - select text in markup and replace it", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: markswap [OPTIONS] FILE");
    println!("       markswap tokenize FILE");
    println!("       markswap strip FILE");
    println!("       markswap replace FILE START END TEXT [--stream]");
    println!();
    println!("FILE may be - for stdin (not in interactive mode).");
    println!();
    println!("Options:");
    println!("  -h, --help     Show this help message");
    println!("  -V, --version  Show version information");
    println!("  --tick MS      Delay between reveal steps (1-1000, default 10)");
    println!("  --mode MODE    stream, immediate or marker-only");
    println!("  --stream       replace: print every reveal step");
    println!();
    println!("Interactive keys:");
    println!("  drag           Select segments with the left mouse button");
    println!("  Enter          Commit the typed replacement");
    println!("  Esc, C-g       Dismiss the selection or cancel a reveal");
    println!("  s              Stream typed text into a leftover marker");
    println!("  m              Cycle the commit mode");
    println!("  Up/Down, PgUp/PgDn  Scroll");
    println!("  q, C-c         Quit and print the document");
    println!();
    println!("Settings are read from ~/.markswap.toml");
}

fn print_version() {
    println!("markswap {}", env!("CARGO_PKG_VERSION"));
}
