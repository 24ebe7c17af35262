extern crate getopts;

use crate::result;

pub const AGENCY: &str = "emery";
pub const DEFAULT_STOP_ID: &str = "5319";
pub const USERNAME: &str = "Emery Go Round";

pub const DEFAULT_FEED_HOST: &str = "http://webservices.nextbus.com";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub agency: String,
    pub default_stop_id: String,
    pub username: String,

    pub feed_host: String,
    pub fetch_timeout: std::time::Duration,

    pub bind_address: String,
    pub port: u16,
    pub workers: usize,
    pub log_to_file: bool,
}

impl Default for Config {
    fn default() -> Config {
        return Config{
            agency: AGENCY.to_string(),
            default_stop_id: DEFAULT_STOP_ID.to_string(),
            username: USERNAME.to_string(),
            feed_host: DEFAULT_FEED_HOST.to_string(),
            fetch_timeout: std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            log_to_file: false,
        };
    }
}

impl Config {
    pub fn listen_address(&self) -> String {
        return format!("{}:{}", self.bind_address, self.port);
    }
}

pub fn options() -> getopts::Options {
    let mut opts = getopts::Options::new();
    opts.optopt("b", "bind", "Address to listen on.", "ADDR");
    opts.optopt("p", "port", "Port to listen on.", "PORT");
    opts.optopt("f", "feed-host", "Base URL of the NextBus feed.", "URL");
    opts.optopt("t", "timeout-secs", "Give up on NextBus after this long.", "SECS");
    opts.optopt("w", "workers", "Number of request handling threads.", "N");
    opts.optflag("l", "log-to-file", "Write logs to a file in the working directory");
    opts.optflag("h", "help", "Print this help");
    return opts;
}

pub fn usage(program: &str) -> String {
    return options().usage(&format!("Usage: {} [options]", program));
}

/// Returns `None` when help was requested.
pub fn from_args(args: &[String]) -> result::GoRoundResult<Option<Config>> {
    let matches = options().parse(args)
        .map_err(|e| result::make_error(&format!("{}", e)))?;

    if matches.opt_present("help") {
        return Ok(None);
    }

    let mut config = Config::default();

    if let Some(bind) = matches.opt_str("bind") {
        config.bind_address = bind;
    }
    if let Some(port) = matches.opt_str("port") {
        config.port = parse_number(&port, "port")?;
    }
    if let Some(feed_host) = matches.opt_str("feed-host") {
        config.feed_host = feed_host.trim_end_matches('/').to_string();
    }
    if let Some(timeout) = matches.opt_str("timeout-secs") {
        let secs: u64 = parse_number(&timeout, "timeout-secs")?;
        if secs == 0 {
            return Err(result::make_error("timeout-secs must be at least 1"));
        }
        config.fetch_timeout = std::time::Duration::from_secs(secs);
    }
    if let Some(workers) = matches.opt_str("workers") {
        config.workers = parse_number(&workers, "workers")?;
        if config.workers == 0 {
            return Err(result::make_error("workers must be at least 1"));
        }
    }
    config.log_to_file = matches.opt_present("log-to-file");

    return Ok(Some(config));
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> result::GoRoundResult<T> {
    return value.trim().parse::<T>().map_err(|_| result::make_error(
        &format!("Invalid value for --{}: '{}'", flag, value)));
}
