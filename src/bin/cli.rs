use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{ArgAction, CommandFactory, Parser as ClapParser};
use log::debug;

use wirefeed::transport::DEFAULT_FRAGMENT_SIZE;
use wirefeed::{
    BodyPolicy, FetchError, ParserConfig, Response, fetch, format_debug, format_headers_only,
    format_json, read_response,
};

/// wirefeed CLI: incremental HTTP/1.1 response parser.
///
/// Parses a raw HTTP response read from a file, a --raw string, stdin, or
/// fetched live from an http:// --url, and prints a structured
/// representation in the chosen format.
///
/// Escape sequences (\r, \n, \t, \\) in the --raw value are interpreted so
/// you can pass a full HTTP response as a single shell argument.
#[derive(ClapParser)]
#[command(name = "wirefeed-cli", version, about, long_about = None)]
struct Cli {
    /// Path to a file containing a raw HTTP response.
    /// Reads from stdin when neither FILE, --raw nor --url is given.
    #[arg(value_name = "FILE", conflicts_with_all = ["raw", "url"])]
    file: Option<PathBuf>,

    /// Raw HTTP response string (escape sequences \r \n \t \\ are expanded).
    #[arg(long, conflicts_with = "url")]
    raw: Option<String>,

    /// Fetch this http:// URL with a GET request and parse the reply.
    #[arg(long)]
    url: Option<String>,

    /// Output format.
    #[arg(short, long, default_value = "json", value_enum)]
    format: OutputFormat,

    /// Pretty-print JSON output (ignored for other formats).
    #[arg(short, long)]
    pretty: bool,

    /// Feed the parser at most this many bytes at a time.
    #[arg(long, default_value_t = DEFAULT_FRAGMENT_SIZE)]
    fragment_size: usize,

    /// JSON file with parser limits; flags below override it.
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Maximum allowed body size in bytes.
    #[arg(long)]
    max_body_size: Option<usize>,

    /// Maximum number of headers allowed.
    #[arg(long)]
    max_headers: Option<usize>,

    /// Reject responses that declare neither Content-Length nor
    /// Transfer-Encoding instead of reading until close.
    #[arg(long)]
    require_length: bool,

    /// Read timeout in seconds for --url.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Increase log verbosity (-v, -vv, -vvv). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable debug output
    Debug,
    /// Status line + headers only
    Headers,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // When no input source is provided and stdin is a terminal (not piped),
    // show help instead of blocking.
    if cli.file.is_none() && cli.raw.is_none() && cli.url.is_none() && io::stdin().is_terminal() {
        Cli::command().print_help().ok();
        println!();
        process::exit(0);
    }

    let config = match build_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading config: {e}");
            process::exit(1);
        }
    };
    debug!("parser config: {config:?}");

    let response = match run(&cli, config) {
        Ok(r) => r,
        Err(RunError::Input(e)) => {
            eprintln!("Error reading input: {e}");
            process::exit(1);
        }
        Err(RunError::Fetch(e)) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    let output = match cli.format {
        OutputFormat::Json => format_json(&response, cli.pretty),
        OutputFormat::Debug => format_debug(&response),
        OutputFormat::Headers => format_headers_only(&response),
    };

    print!("{output}");
}

enum RunError {
    Input(io::Error),
    Fetch(FetchError),
}

impl From<FetchError> for RunError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Io(e) => Self::Input(e),
            other => Self::Fetch(other),
        }
    }
}

fn run(cli: &Cli, config: ParserConfig) -> Result<Response, RunError> {
    if let Some(url) = &cli.url {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(RunError::Input)?;
        let timeout = Some(Duration::from_secs(cli.timeout));
        // Connection failures are transport errors, not bad input.
        return runtime
            .block_on(fetch(url, config, timeout))
            .map_err(RunError::Fetch);
    }

    if let Some(raw) = &cli.raw {
        let data = unescape(raw).into_bytes();
        return Ok(read_response(data.as_slice(), config, cli.fragment_size)?);
    }

    match &cli.file {
        Some(path) => {
            let file = std::fs::File::open(path).map_err(RunError::Input)?;
            Ok(read_response(file, config, cli.fragment_size)?)
        }
        None => Ok(read_response(io::stdin().lock(), config, cli.fragment_size)?),
    }
}

/// Start from the --config file (or defaults) and apply flag overrides.
fn build_config(cli: &Cli) -> io::Result<ParserConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut text = String::new();
            std::fs::File::open(path)?.read_to_string(&mut text)?;
            serde_json::from_str::<ParserConfig>(&text)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        }
        None => ParserConfig::default(),
    };

    if let Some(max) = cli.max_body_size {
        config.max_body_size = max;
    }
    if let Some(max) = cli.max_headers {
        config.max_headers_count = max;
    }
    if cli.require_length {
        config.body_policy = BodyPolicy::RequireLength;
    }
    Ok(config)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Expand C-style escape sequences (`\r`, `\n`, `\t`, `\\`) in a string.
///
/// Any other `\X` sequence is kept as-is (both the backslash and `X`).
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}
