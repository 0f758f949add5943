use std::io::IsTerminal;

use clap::Parser;
use env_logger::Env;
use log::debug;

use crate::booth::{Status, Tone};

mod args;
mod booth;

fn main() {
    let args = args::Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
    debug!("args: {:?}", args);

    let color = std::io::stdout().is_terminal();
    let status = match booth::run(&args) {
        Ok(s) => s,
        Err(e) => Status::from(&e),
    };
    println!("{}", status.render(color));
    if status.tone == Tone::Failure {
        std::process::exit(1);
    }
}
