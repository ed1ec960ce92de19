// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Construction of the root `slog::Logger` used by the multicast table code.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use slog::{o, Drain};

/// How log records should be rendered.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Unstructured, human-readable text
    Human,
    /// Bunyan-formatted json
    Json,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid log format: {0}")]
pub struct LogFormatError(String);

impl FromStr for LogFormat {
    type Err = LogFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            _ => Err(LogFormatError(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogFormat::Human => write!(f, "human"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

fn log_writer(
    log_file: &Option<String>,
) -> anyhow::Result<Box<dyn Write + Send>> {
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {path}"))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}

/// Build the root logger.  Records go to `log_file` if one is named, and to
/// stdout otherwise.
pub fn init(
    name: &'static str,
    log_file: &Option<String>,
    log_format: LogFormat,
) -> anyhow::Result<slog::Logger> {
    let writer = log_writer(log_file)?;

    let log = match log_format {
        LogFormat::Json => {
            let drain = slog_bunyan::with_name(name, writer).build().fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            slog::Logger::root(drain, o!())
        }
        LogFormat::Human => {
            let decorator = slog_term::PlainDecorator::new(writer);
            let drain = slog_term::FullFormat::new(decorator).build().fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            slog::Logger::root(drain, o!("name" => name.to_string()))
        }
    };
    Ok(log)
}

/// A synchronous logger whose output is captured by the test harness.
pub fn test_logger() -> slog::Logger {
    let decorator =
        slog_term::PlainSyncDecorator::new(slog_term::TestStdoutWriter);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    slog::Logger::root(drain, o!())
}
