//! Terminal rendering for escrow commands.
//!
//! With `--json` each command writes exactly one document to stdout; section
//! and field lines are dropped, while cautions and failures still reach
//! stderr. Text mode lays results out as titled sections of aligned fields,
//! with scripts and transactions printed bare on their own line so they can
//! be copied between parties.

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::fmt::Display;
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};

const LABEL_WIDTH: usize = 14;
const SATS_PER_BTC: u64 = 100_000_000;

/// Kind of a one-line message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Note {
    /// Command finished with an effect worth stating (stdout).
    Done,
    /// Next step for the user (stdout).
    Hint,
    /// Suspicious input that does not stop the command (stderr).
    Caution,
    /// Command failed (stderr).
    Failure,
}

impl Note {
    fn marker(self) -> &'static str {
        match self {
            Note::Done => "✓",
            Note::Hint => "→",
            Note::Caution => "!",
            Note::Failure => "✗",
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Note::Caution | Note::Failure)
    }
}

pub struct Output {
    color: bool,
    json: bool,
}

impl Output {
    pub fn new(color: bool, json: bool) -> Self {
        Self { color, json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// In JSON mode print `doc` and return `true`; in text mode do nothing
    /// and return `false` so the caller renders text instead.
    pub fn document<T: Serialize>(&self, doc: &T) -> Result<bool> {
        if !self.json {
            return Ok(false);
        }
        println!("{}", serde_json::to_string_pretty(doc)?);
        Ok(true)
    }

    pub fn section(&self, title: &str) {
        if self.json {
            return;
        }
        if self.color {
            println!("\n{}", title.bold());
        } else {
            println!("\n{}", title);
        }
    }

    pub fn field(&self, label: &str, value: impl Display) {
        if self.json {
            return;
        }
        let label = format!("{:<width$}", label, width = LABEL_WIDTH);
        if self.color {
            println!("  {} {}", label.dimmed(), value);
        } else {
            println!("  {} {}", label, value);
        }
    }

    /// Field showing satoshis together with their BTC value.
    pub fn amount(&self, label: &str, sats: u64) {
        self.field(label, sats_and_btc(sats));
    }

    /// Hex blob under its label, unindented and unwrapped.
    pub fn hex(&self, label: &str, hex: &str) {
        if self.json {
            return;
        }
        if self.color {
            println!("  {}\n{}", label.dimmed(), hex.cyan());
        } else {
            println!("  {}\n{}", label, hex);
        }
    }

    /// Valid/invalid marker for a checked value.
    pub fn verdict(&self, label: &str, valid: bool) {
        let text = verdict_text(valid);
        let painted = match (self.color, valid) {
            (false, _) => text.normal(),
            (true, true) => text.green(),
            (true, false) => text.red(),
        };
        self.field(label, painted);
    }

    pub fn note(&self, kind: Note, message: &str) {
        if self.json && !kind.to_stderr() {
            return;
        }

        let line = if self.color {
            let marker = match kind {
                Note::Done => kind.marker().green().bold(),
                Note::Hint => kind.marker().blue(),
                Note::Caution => kind.marker().yellow().bold(),
                Note::Failure => kind.marker().red().bold(),
            };
            format!("{} {}", marker, message)
        } else {
            format!("{} {}", kind.marker(), message)
        };

        if kind.to_stderr() {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    pub fn table<T: Tabled>(&self, rows: Vec<T>) {
        if self.json || rows.is_empty() {
            return;
        }
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{}", table);
    }

    /// Spinner on stderr while waiting for the explorer; hidden in JSON mode.
    pub fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        if self.json {
            spinner.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.into());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}

fn verdict_text(valid: bool) -> &'static str {
    if valid {
        "valid"
    } else {
        "invalid"
    }
}

/// `1234567` as `1,234,567`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Exact BTC value with eight decimals; no float rounding.
pub fn btc(sats: u64) -> String {
    format!("{}.{:08} BTC", sats / SATS_PER_BTC, sats % SATS_PER_BTC)
}

pub fn sats_and_btc(sats: u64) -> String {
    format!("{} sats ({})", group_thousands(sats), btc(sats))
}
