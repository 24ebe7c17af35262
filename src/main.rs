extern crate anyhow;
extern crate flexi_logger;
extern crate getopts;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate reqwest;
#[macro_use]
extern crate serde_derive;

mod config;
mod nextbus;
mod responder;
mod result;
mod sanitize;
mod server;

use anyhow::Context;

fn start_logger(to_file: bool) -> anyhow::Result<flexi_logger::LoggerHandle> {
    let logger = flexi_logger::Logger::try_with_env_or_str("info")
        .context("while configuring the logger")?;

    let logger = if to_file {
        logger
            .log_to_file(flexi_logger::FileSpec::default())
            .duplicate_to_stderr(flexi_logger::Duplicate::Warn)
    } else {
        logger.log_to_stderr()
    };

    return logger.start().context("while starting the logger");
}

fn run(config: config::Config) -> anyhow::Result<()> {
    let _logger = start_logger(config.log_to_file)?;

    info!("Running. feed={} agency={} default_stop={} timeout={:?}",
          config.feed_host, config.agency, config.default_stop_id, config.fetch_timeout);

    return server::serve(config);
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let config = match config::from_args(&args[1..]) {
        Ok(Some(config)) => config,
        Ok(None) => {
            print!("{}", config::usage(&args[0]));
            return;
        },
        Err(err) => {
            eprintln!("{}", err);
            eprint!("{}", config::usage(&args[0]));
            std::process::exit(2);
        },
    };

    if let Err(err) = run(config) {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}
