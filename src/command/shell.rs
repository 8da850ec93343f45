// SPDX-FileCopyrightText: 2026 Infotag Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Write};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use log::debug;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, BufReader, Lines};

use crate::{
    error::Result,
    metadata,
    patient,
};

use super::Environment;

/// Start an interactive session. Authentication lasts across lookups until
/// you log out or the session times out.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, env: &Environment) -> Result<()> {
        Shell::new(env, BufReader::new(tokio::io::stdin()), io::stdout())
            .run()
            .await
    }
}

#[derive(Debug, Parser)]
#[command(multicall = true)]
struct Input {
    #[command(subcommand)]
    line: Line,
}

#[derive(Debug, Subcommand)]
enum Line {
    /// Authenticate for a patient and show their record.
    Lookup { patient_id: String },
    /// Show a patient's record, if this session may access it.
    View { patient_id: String },
    /// Show who is authenticated, and for which patient.
    Status,
    /// End the current session.
    Logout,
    /// Show the access log (administrator password required).
    Audit,
    /// List the demo patient identifiers.
    Patients,
    /// Leave the shell.
    #[command(alias = "quit")]
    Exit,
}

enum Flow {
    Continue,
    Exit,
}

pub(crate) struct Shell<'env, R, W> {
    env: &'env Environment,
    lines: Lines<R>,
    out: W,
}

impl<'env, R: AsyncBufRead + Unpin, W: Write> Shell<'env, R, W> {
    pub(crate) fn new(env: &'env Environment, input: R, out: W) -> Self {
        Self {
            env,
            lines: input.lines(),
            out,
        }
    }

    pub(crate) async fn run(mut self) -> Result<()> {
        writeln!(
            self.out,
            "{} emergency access. Type `help` for commands.",
            *metadata::CLIENT_DISPLAY_NAME
        )?;

        while let Some(line) = self.ask("> ").await? {
            let words = line.split_whitespace().collect::<Vec<_>>();
            if words.is_empty() {
                continue;
            }

            let input = match Input::try_parse_from(words) {
                Ok(input) => input,
                Err(e) => {
                    write!(self.out, "{}", e.render())?;
                    continue;
                }
            };

            match self.dispatch(input.line).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                // Failures are local to the line that caused them.
                Err(e) => writeln!(self.out, "Error: {e}")?,
            }
        }

        debug!("Leaving the shell");
        Ok(())
    }

    async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        Ok(self.lines.next_line().await?)
    }

    async fn dispatch(&mut self, line: Line) -> Result<Flow> {
        let env = self.env;
        match line {
            Line::Lookup { patient_id } => {
                let name = self.ask("Professional name: ").await?.unwrap_or_default();
                let justification = self.ask("Justification: ").await?.unwrap_or_default();
                let patient =
                    super::lookup::lookup(env, &patient_id, &justification, &name).await?;
                writeln!(self.out, "{}", super::page(env, patient).await)?;
            }
            Line::View { patient_id } => {
                let id = patient::normalize_id(&patient_id);
                let patient = super::view_patient(env, &id).await?;
                writeln!(self.out, "{}", super::page(env, patient).await)?;
            }
            Line::Status => match env.access.patient_id().await {
                Some(patient_id) => writeln!(
                    self.out,
                    "Authenticated as {} for patient {}",
                    env.access.professional_name().await.trim(),
                    patient_id
                )?,
                None => writeln!(self.out, "Not authenticated")?,
            },
            Line::Logout => {
                env.access.logout().await;
                writeln!(self.out, "Logged out")?;
            }
            Line::Audit => {
                env.gate.unlock(env.prompt.as_ref()).await?;
                let entries = env.access.access_logs().await;
                writeln!(self.out, "{}", super::audit::render(&entries))?;
            }
            Line::Patients => writeln!(self.out, "{}", super::patients::render())?,
            Line::Exit => return Ok(Flow::Exit),
        }

        Ok(Flow::Continue)
    }
}
