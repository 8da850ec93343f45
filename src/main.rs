// SPDX-FileCopyrightText: 2026 Infotag Contributors
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod access;
mod audit;
mod command;
mod error;
mod metadata;
mod password;
mod patient;
mod session;
mod storage;

use std::{path::PathBuf, process, time::Duration};

use access::{AccessControl, ExpiryPolicy, Settings};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use command::{AuditStorage, Environment};
use error::Result;
use log::{debug, error, warn};
use patient::Directory;
use secrecy::SecretString;

#[derive(Debug, Subcommand)]
enum Command {
    Lookup(command::lookup::Command),
    Audit(command::audit::Command),
    Patients(command::patients::Command),
    Shell(command::shell::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, env: &Environment) -> Result<()> {
        match self {
            Self::Lookup(cmd) => cmd.execute(env).await,
            Self::Audit(cmd) => cmd.execute(env).await,
            Self::Patients(cmd) => cmd.execute(env).await,
            Self::Shell(cmd) => cmd.execute(env).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The directory holding the access log. Defaults to the platform's data
    /// directory for this application.
    #[arg(long, env = "INFOTAG_DATA_DIR", value_hint = clap::ValueHint::DirPath)]
    data_dir: Option<PathBuf>,

    /// Keep the access log in memory only; nothing survives this process.
    #[arg(long, env = "INFOTAG_NO_PERSIST")]
    no_persist: bool,

    /// Seconds after a successful authentication before the session ends on
    /// its own.
    #[arg(
        long,
        env = "INFOTAG_SESSION_TIMEOUT",
        default_value_t = metadata::DEFAULT_SESSION_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    session_timeout: u64,

    /// What a new authentication or a logout does to a session expiry that is
    /// still pending. `reset`, the default, restarts the timeout on every
    /// authentication and cancels it on logout; `independent` never cancels a
    /// timer, so an earlier one can end a later session early.
    #[arg(
        long,
        env = "INFOTAG_EXPIRY_POLICY",
        value_enum,
        default_value_t = ExpiryPolicy::Reset
    )]
    expiry_policy: ExpiryPolicy,

    /// The shared password for the access log viewer. This keeps casual users
    /// out of the log; it is not a security boundary.
    #[arg(
        long,
        env = "INFOTAG_ADMIN_PASSWORD",
        default_value = metadata::DEFAULT_ADMIN_PASSWORD,
        hide_default_value = true,
        hide_env_values = true
    )]
    admin_password: String,

    /// A patient dataset to use instead of the bundled one.
    #[arg(long, env = "INFOTAG_PATIENTS", value_hint = clap::ValueHint::FilePath)]
    patients: Option<PathBuf>,

    /// The path to the Pinentry program to use when asking for the
    /// administrator password.
    #[arg(long, env = "INFOTAG_PINENTRY_PROGRAM", value_hint = clap::ValueHint::ExecutablePath)]
    pinentry_program: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

fn get_audit_storage(args: &Args) -> AuditStorage {
    if !args.no_persist {
        let file_storage = match &args.data_dir {
            Some(dir) => Some(storage::File::in_dir(dir, metadata::ACCESS_LOG_KEY)),
            None => storage::File::new(metadata::ACCESS_LOG_KEY),
        };
        if let Some(file_storage) = file_storage {
            debug!("Keeping the access log in {}", file_storage.path().display());
            return Box::new(file_storage);
        }

        warn!("We need to fall back to in-memory storage because there is no data directory for the access log");
    }

    Box::new(storage::Memory::<audit::Record>::new())
}

async fn run(args: Args) -> Result<()> {
    let prompt: Vec<Box<dyn password::Prompt>> = vec![
        Box::new(args.pinentry_program.clone().map_or_else(
            password::PinentryPrompt::new,
            password::PinentryPrompt::new_with_executable,
        )),
        Box::new(password::RpasswordPrompt),
    ];

    let directory = match &args.patients {
        Some(path) => Directory::from_path(path)?,
        None => Directory::bundled()?,
    };

    let settings = Settings {
        timeout: Duration::from_secs(args.session_timeout),
        expiry_policy: args.expiry_policy,
    };
    let access = AccessControl::open(get_audit_storage(&args), settings).await?;

    let env = Environment {
        access,
        directory,
        gate: password::AdminGate::new(SecretString::new(args.admin_password)),
        prompt: Box::new(prompt),
    };

    command::Command::execute(args.command, &env).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("INFOTAG_LOG", "warn")
        .write_style("INFOTAG_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
