// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::path::PathBuf;

use anyhow::Context;
use structopt::*;

use aal::{RidTableOps, RidTableSelect};
use common::logging::{self, LogFormat};
use mcrid::{FabricConfig, McRidTableParams, PortMap, RidTable};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "mcadm",
    about = "compiles and decodes multicast RID table rows",
    version = "0.0.1"
)]
struct GlobalOpts {
    #[structopt(
        short,
        long,
        help = "TOML description of the fabric; the reference fabric is \
                used if omitted"
    )]
    fabric: Option<PathBuf>,

    #[structopt(long, help = "write log records to this file")]
    log_file: Option<String>,

    #[structopt(long, default_value = "human", help = "human or json")]
    log_format: LogFormat,

    #[structopt(subcommand)]
    cmd: Commands,
}

#[derive(Debug, StructOpt)]
enum Commands {
    /// Compile a TOML or JSON row request into the row's register words.
    Compile { request: PathBuf },
    /// Decode a row's register words into a row request.
    Decode {
        #[structopt(short, long, default_value = "0")]
        port: u8,
        #[structopt(short, long, default_value = "0")]
        index: u8,
        #[structopt(short, long)]
        extended: bool,
        /// The row's words, in hex, header first
        words: Vec<String>,
    },
    /// Print the JSON schema of a row request.
    Schema,
    /// Print the fabric dimensions in use.
    Fabric,
}

fn parse_word(s: &str) -> anyhow::Result<u32> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
        .replace('_', "");
    u32::from_str_radix(&digits, 16)
        .with_context(|| format!("invalid register word: {s}"))
}

fn compile(
    log: &slog::Logger,
    config: FabricConfig,
    request: PathBuf,
) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(&request)
        .with_context(|| format!("reading {}", request.display()))?;
    // TOML has no null, so a group without a primary replica can only be
    // requested in JSON.
    let params: McRidTableParams =
        match request.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .context("parsing row request")?,
            _ => toml::from_str(&contents).context("parsing row request")?,
        };

    let hdl = asic::Handle::new(log, config.num_ports);
    let map = PortMap::reference(&config);
    let table = RidTable::new(log, config, map)?;
    table.set(&hdl, &params)?;

    let words = hdl
        .row(params.port_num, params.table(), params.index)
        .context("row was not written")?;
    for word in words {
        println!("{word:#010x}");
    }
    Ok(())
}

fn decode(
    log: &slog::Logger,
    config: FabricConfig,
    port: u8,
    index: u8,
    table_select: RidTableSelect,
    words: &[String],
) -> anyhow::Result<()> {
    let words = words
        .iter()
        .map(|w| parse_word(w))
        .collect::<anyhow::Result<Vec<u32>>>()?;
    if words.len() != config.row_words() {
        anyhow::bail!(
            "a row has {} words, but {} were supplied",
            config.row_words(),
            words.len()
        );
    }

    let hdl = asic::Handle::new(log, config.num_ports);
    hdl.mc_rid_write(port, table_select, index, &words)?;
    let map = PortMap::reference(&config);
    let table = RidTable::new(log, config, map)?;
    let params = table.get(&hdl, port, index, table_select)?;
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let opts = GlobalOpts::from_args();

    // Log records would be interleaved with the output, so they are dropped
    // unless a file is named for them.
    let log = match &opts.log_file {
        Some(_) => logging::init("mcadm", &opts.log_file, opts.log_format)?,
        None => slog::Logger::root(slog::Discard, slog::o!()),
    };

    let config = match &opts.fabric {
        Some(path) => FabricConfig::load(path)?,
        None => FabricConfig::default(),
    };

    match opts.cmd {
        Commands::Compile { request } => compile(&log, config, request),
        Commands::Decode {
            port,
            index,
            extended,
            words,
        } => {
            let table = if extended {
                RidTableSelect::Extended
            } else {
                RidTableSelect::Main
            };
            decode(&log, config, port, index, table, &words)
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(McRidTableParams);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Commands::Fabric => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
