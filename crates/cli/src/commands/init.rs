//! `contreact init`: print a starter run configuration.

use contreact_config::{RunConfig, TELEGRAM_TOKEN_ENV};

pub fn run() {
    println!("# ContReAct run configuration");
    println!("# The Telegram bot token is read from {TELEGRAM_TOKEN_ENV}, never from this file.");
    println!();
    print!("{}", RunConfig::default_toml());
}
