//! Human facing status output.
//!
//! Colour is an explicit setting resolved once at startup and carried by the
//! [`Reporter`], so nothing in the crate consults terminal state on its own.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

const BLUE: &str = "\x1b[1;34m";
const YELLOW: &str = "\x1b[1;33m";
const WHITE: &str = "\x1b[1;37m";
const RESET: &str = "\x1b[00m";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn resolve(self, is_terminal: bool) -> bool {
        match self {
            ColorChoice::Auto => is_terminal,
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reporter {
    color: bool,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, code: &'static str) -> &'static str {
        if self.color {
            code
        } else {
            ""
        }
    }

    pub fn status_line<D: Display>(&self, msg: D) -> String {
        format!(
            " {}*{} {}{}",
            self.paint(YELLOW),
            self.paint(WHITE),
            msg,
            self.paint(RESET)
        )
    }

    pub fn command_line<D: Display>(&self, command: D) -> String {
        format!(
            "{}->{} {}{}",
            self.paint(BLUE),
            self.paint(WHITE),
            command,
            self.paint(RESET)
        )
    }

    pub fn banner_line<D: Display>(&self, msg: D) -> String {
        format!(
            " {}*{} {}{}",
            self.paint(BLUE),
            self.paint(WHITE),
            msg,
            self.paint(RESET)
        )
    }

    pub fn status<D: Display>(&self, msg: D) {
        println!("{}", self.status_line(msg));
    }

    pub fn command<D: Display>(&self, command: D) {
        println!("{}", self.command_line(command));
    }
}
