//
// Copyright (c) 2026 Axel Kenzo contributors
// This source code is subject to the terms of the MIT license.
// If a copy of the license was not distributed with this file, you can obtain one at https://opensource.org/licenses/MIT.
//
// Project: aktool-icode -- file and process integrity verification engine.
//

//! `aktool-icode` — compute and verify file and process integrity codes.

mod config;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use icode_core::{
    ControlSet, Database, ElfMode, Evaluator, FileWalker, Format, Fragment, HashTable, Primitive,
    Secret, Statistics, VerifyOutcome,
};
use output::{ExitCode, Mode, Report};
use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;

const DEFAULT_DATABASE_PATH: &str = "icode.db";
const DEFAULT_BUCKET_COUNT: usize = 512;

fn parse_int_offset(s: &str) -> Result<u64, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<u64>().map_err(|e| e.to_string())
    }
}

fn parse_int_size(s: &str) -> Result<i64, String> {
    if let Some(rest) = s.strip_prefix('-') {
        return rest
            .parse::<i64>()
            .map(|v| -v)
            .map_err(|e| e.to_string());
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<i64>().map_err(|e| e.to_string())
    }
}

/// Compute and verify file and process integrity codes.
#[derive(Parser, Debug)]
#[command(name = "aktool-icode", version, about)]
struct IcodeArgs {
    /// Files or directories to process (evaluate/verify modes).
    paths: Vec<String>,

    /// Compute integrity codes for `paths` and store them (default mode
    /// when neither --verify, --list, nor --clean is given).
    #[arg(long)]
    evaluate: bool,

    /// Verify `paths` (or the whole database, if no paths given) against
    /// the stored database.
    #[arg(long)]
    verify: bool,

    /// List the contents of the database.
    #[arg(long)]
    list: bool,

    /// Remove the database file.
    #[arg(long)]
    clean: bool,

    /// Verify the executable mappings of a running process.
    #[arg(long)]
    pid: Option<i32>,

    /// Verify exactly this one process, ignoring --min-pid/--max-pid.
    #[arg(long)]
    only_one_pid: Option<i32>,

    /// Lower bound (inclusive) of a `/proc` PID sweep.
    #[arg(long)]
    min_pid: Option<i32>,

    /// Upper bound (inclusive) of a `/proc` PID sweep.
    #[arg(long)]
    max_pid: Option<i32>,

    /// Path to the integrity code database.
    #[arg(long, short = 'd', default_value = DEFAULT_DATABASE_PATH)]
    database: PathBuf,

    /// Path to a master key file; when absent an unkeyed hash is used.
    #[arg(long)]
    key: Option<PathBuf>,

    /// Algorithm name (e.g. `streebog256`, `crc64`, `hmac-sha256`, `cmac-aes256`).
    #[arg(long)]
    algorithm: Option<String>,

    /// Compute both the whole-file code and per-segment codes for ELF
    /// executables' PT_LOAD segments.
    #[arg(long)]
    with_segments: bool,

    /// Compute only per-segment codes for ELF executables' PT_LOAD
    /// segments, skipping the whole-file code.
    #[arg(long)]
    only_segments: bool,

    /// Fragment start within each file (decimal or `0x`-prefixed hex).
    #[arg(long, value_parser = parse_int_offset)]
    offset: Option<u64>,

    /// Fragment length (decimal or `0x`-prefixed hex); `-1` means to EOF.
    #[arg(long, value_parser = parse_int_size)]
    size: Option<i64>,

    /// When verifying from a directory, also report entries the
    /// database has but the directory no longer does.
    #[arg(long)]
    search_deleted: bool,

    /// Glob pattern restricting which file names are considered.
    #[arg(long)]
    pattern: Vec<String>,

    /// Directory path to exclude from traversal.
    #[arg(long)]
    exclude_path: Vec<String>,

    /// File name to exclude from traversal.
    #[arg(long)]
    exclude_file: Vec<String>,

    /// Symlink name to exclude from traversal.
    #[arg(long)]
    exclude_link: Vec<String>,

    /// Load additional control/option settings from a config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the database in bsd-style tagged text format instead of linux-style.
    #[arg(long)]
    bsd: bool,

    /// Save the database in binary format (default for a fresh database).
    #[arg(long)]
    binary: bool,

    /// Emit the report as JSON instead of human-readable text.
    #[arg(long)]
    json: bool,

    /// Suppress all non-error output.
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Suppress the trailing statistics summary.
    #[arg(long)]
    dont_show_stat: bool,

    /// Increase log verbosity (repeatable).
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

impl IcodeArgs {
    fn elf_mode(&self) -> ElfMode {
        if self.only_segments {
            ElfMode::OnlySegments
        } else if self.with_segments {
            ElfMode::WithSegments
        } else {
            ElfMode::IgnoreSegments
        }
    }

    fn fragment(&self) -> Option<Fragment> {
        if self.offset.is_none() && self.size.is_none() {
            return None;
        }
        Some(Fragment {
            offset: self.offset.unwrap_or(0),
            size: self.size.unwrap_or(-1),
        })
    }

    fn wants_process_mode(&self) -> bool {
        self.pid.is_some() || self.only_one_pid.is_some() || self.min_pid.is_some() || self.max_pid.is_some()
    }
}

fn main() -> ProcessExitCode {
    let args = IcodeArgs::parse();
    init_logging(args.verbose, args.quiet);

    match run(args) {
        Ok(code) => ProcessExitCode::from(code.as_i32() as u8),
        Err(e) => {
            log::error!("{e:?}");
            ProcessExitCode::from(ExitCode::Internal.as_i32() as u8)
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).try_init();
}

fn run(mut args: IcodeArgs) -> Result<ExitCode> {
    let mut control = ControlSet::new();
    for p in &args.exclude_path {
        control.add_exclude_path(p.clone());
    }
    for f in &args.exclude_file {
        control.add_exclude_file(f.clone());
    }
    for l in &args.exclude_link {
        control.add_exclude_link(l.clone());
    }
    for p in &args.pattern {
        control.add_include_file(p.clone());
    }

    if let Some(config_path) = &args.config {
        let file_config = config::load(config_path)
            .with_context(|| format!("loading config file {}", config_path.display()))?;
        for path in file_config.control.include_paths {
            control.add_include_path(path);
        }
        for pattern in file_config.control.include_files {
            control.add_include_file(pattern);
        }
        for p in file_config.control.exclude_paths {
            control.add_exclude_path(p);
        }
        for f in file_config.control.exclude_files {
            control.add_exclude_file(f);
        }
        for l in file_config.control.exclude_links {
            control.add_exclude_link(l);
        }
        if let Some(alg) = file_config.options.get("algorithm") {
            args.algorithm = Some(alg.clone());
        }
    }
    for p in &args.paths {
        control.add_include_path(p.clone());
    }

    let master_key = match &args.key {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading key file {}", path.display()))?;
            Some(Secret::new(bytes))
        }
        None => None,
    };
    let derived = master_key
        .as_ref()
        .map(|m| icode_core::derive_entity_key(m, b"aktool-icode", 32));
    let primitive = Primitive::from_config(args.algorithm.as_deref(), derived)
        .context("selecting integrity primitive")?;

    if args.wants_process_mode() {
        return run_process_mode(&args, &primitive);
    }
    if args.list {
        return run_list_mode(&args);
    }
    if args.clean {
        return run_clean_mode(&args);
    }
    if args.verify {
        return run_verify_mode(&args, &control, &primitive);
    }
    run_evaluate_mode(&args, &control, &primitive)
}

fn open_or_create_database(args: &IcodeArgs, stats: &mut Statistics) -> Result<Database> {
    if args.database.exists() {
        Database::load(&args.database, DEFAULT_BUCKET_COUNT, stats)
            .with_context(|| format!("loading database {}", args.database.display()))
    } else {
        let format = if args.bsd { Format::Bsd } else { Format::Binary };
        Ok(Database::new(HashTable::new(DEFAULT_BUCKET_COUNT)?, format))
    }
}

fn run_evaluate_mode(args: &IcodeArgs, control: &ControlSet, primitive: &Primitive) -> Result<ExitCode> {
    let mut stats = Statistics::new();
    let mut db = open_or_create_database(args, &mut stats)?;
    let walker = FileWalker::new(control.clone());
    {
        let mut evaluator = Evaluator::new(primitive, &mut db.table, &mut stats, args.elf_mode())
            .with_fragment(args.fragment());
        evaluator.run(&walker)?;
    }
    db.save(&args.database, args.bsd)
        .with_context(|| format!("saving database {}", args.database.display()))?;

    let mut report = Report::new(stats);
    render(args, &mut report)?;
    Ok(report.exit_code(Mode::Evaluate))
}

fn run_verify_mode(args: &IcodeArgs, control: &ControlSet, primitive: &Primitive) -> Result<ExitCode> {
    let mut stats = Statistics::new();
    let db = open_or_create_database(args, &mut stats)?;

    let mut verifier = icode_core::FsVerifier::new(primitive, &mut stats);
    let results = if args.paths.is_empty() {
        verifier.verify_from_database(&db)
    } else {
        let walker = FileWalker::new(control.clone());
        verifier.verify_from_directory(&walker, &db, args.search_deleted)?
    };

    let mut report = Report::new(stats);
    for r in results {
        match r.outcome {
            VerifyOutcome::Changed => report.changed.push(r.key),
            VerifyOutcome::Deleted => report.deleted.push(r.key),
            VerifyOutcome::New => report.new.push(r.key),
            VerifyOutcome::Matched => {}
        }
    }
    render(args, &mut report)?;
    Ok(report.exit_code(Mode::Verify))
}

fn run_list_mode(args: &IcodeArgs) -> Result<ExitCode> {
    let mut stats = Statistics::new();
    let db = open_or_create_database(args, &mut stats)?;
    for kp in db.table.iter() {
        let key = icode_core::display_key(&kp.key);
        println!("{} {}", hex::encode(&kp.value), key);
    }
    if !args.quiet && !args.dont_show_stat {
        println!("the database contains {} value(s)", db.table.len());
    }
    Ok(ExitCode::Ok)
}

/// `--clean` removes the database file outright; it does not prune or
/// rewrite it.
fn run_clean_mode(args: &IcodeArgs) -> Result<ExitCode> {
    if args.database.exists() {
        std::fs::remove_file(&args.database)
            .with_context(|| format!("removing database {}", args.database.display()))?;
        if !args.quiet {
            println!("removed database {}", args.database.display());
        }
    } else if !args.quiet {
        println!("no database at {} to remove", args.database.display());
    }
    Ok(ExitCode::Ok)
}

/// Enumerate the PIDs a process-mode invocation targets: a single
/// `--pid`, a single `--only-one-pid` (which takes precedence), or every
/// numeric subdirectory of `/proc` within `[--min-pid, --max-pid]`,
/// excluding the current process.
#[cfg(unix)]
fn collect_target_pids(args: &IcodeArgs) -> Result<Vec<i32>> {
    if let Some(pid) = args.only_one_pid {
        return Ok(vec![pid]);
    }
    if args.min_pid.is_none() && args.max_pid.is_none() {
        if let Some(pid) = args.pid {
            return Ok(vec![pid]);
        }
    }

    let min = args.min_pid.unwrap_or(1);
    let max = args.max_pid.unwrap_or(i32::MAX);
    let current = std::process::id() as i32;
    let mut pids = Vec::new();
    for entry in std::fs::read_dir("/proc").context("reading /proc")? {
        let entry = entry.context("reading /proc entry")?;
        if let Some(name) = entry.file_name().to_str() {
            if let Ok(pid) = name.parse::<i32>() {
                if pid != current && pid >= min && pid <= max {
                    pids.push(pid);
                }
            }
        }
    }
    pids.sort_unstable();
    Ok(pids)
}

#[cfg(unix)]
fn run_process_mode(args: &IcodeArgs, primitive: &Primitive) -> Result<ExitCode> {
    let pids = collect_target_pids(args)?;
    let mut stats = Statistics::new();
    let db = open_or_create_database(args, &mut stats)?;

    let mut verifier = icode_core::ProcessVerifier::new();
    let mut report = Report::new(Statistics::new());
    for pid in pids {
        match verifier.verify_pid(pid, primitive, &db, &mut stats) {
            Ok(results) => {
                for r in results {
                    let key = r.path.to_string_lossy().to_string();
                    match r.outcome {
                        VerifyOutcome::Changed => report.changed.push(key),
                        VerifyOutcome::Deleted => report.deleted.push(key),
                        VerifyOutcome::New => report.new.push(key),
                        VerifyOutcome::Matched => {}
                    }
                }
            }
            Err(e) => log::warn!("pid {pid}: {e}"),
        }
    }
    report.stats = stats;

    render(args, &mut report)?;
    Ok(report.exit_code(Mode::Verify))
}

#[cfg(not(unix))]
fn run_process_mode(_args: &IcodeArgs, _primitive: &Primitive) -> Result<ExitCode> {
    anyhow::bail!("process verification is only supported on Unix targets")
}

fn render(args: &IcodeArgs, report: &mut Report) -> Result<()> {
    if args.json {
        report.print_json()?;
    } else {
        report.print_human(args.quiet, !args.dont_show_stat);
    }
    Ok(())
}
