// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Construction of the root logger shared by all components.

use std::fs::OpenOptions;
use std::str::FromStr;

use anyhow::anyhow;
use anyhow::Context;
use slog::Drain;

/// The structure of the emitted log records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable terminal output
    Human,
    /// Bunyan-style newline-delimited JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            x => Err(anyhow!("invalid log format: {x}")),
        }
    }
}

/// Build the root logger.  Records go to `log_file` if one is given and to
/// stdout otherwise.
pub fn init(
    name: &'static str,
    log_file: &Option<String>,
    log_format: LogFormat,
) -> anyhow::Result<slog::Logger> {
    let log = match (log_file, log_format) {
        (Some(path), LogFormat::Json) => {
            let file = open_log_file(path)?;
            let drain = slog_bunyan::with_name(name, file).build().fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            slog::Logger::root(drain, slog::o!())
        }
        (Some(path), LogFormat::Human) => {
            let file = open_log_file(path)?;
            let decorator = slog_term::PlainDecorator::new(file);
            let drain = slog_term::FullFormat::new(decorator).build().fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            slog::Logger::root(drain, slog::o!())
        }
        (None, LogFormat::Json) => {
            let drain = slog_bunyan::with_name(name, std::io::stdout())
                .build()
                .fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            slog::Logger::root(drain, slog::o!())
        }
        (None, LogFormat::Human) => {
            let decorator = slog_term::TermDecorator::new().build();
            let drain = slog_term::FullFormat::new(decorator).build().fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            slog::Logger::root(drain, slog::o!())
        }
    };
    Ok(log)
}

fn open_log_file(path: &str) -> anyhow::Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {path}"))
}
