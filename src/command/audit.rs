// SPDX-FileCopyrightText: 2026 Infotag Contributors
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use chrono::Local;
use clap::Parser;
use tabled::{settings::Style, Table, Tabled};

use crate::{audit::AccessLogEntry, error::Result};

use super::Environment;

/// Show every recorded access, newest first. Asks for the administrator
/// password first.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Print the log as JSON, oldest first, instead of a table.
    #[arg(long)]
    json: bool,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, env: &Environment) -> Result<()> {
        println!("{}", self.output(env).await?);
        Ok(())
    }
}

impl Command {
    async fn output(&self, env: &Environment) -> Result<String> {
        env.gate.unlock(env.prompt.as_ref()).await?;
        let entries = env.access.access_logs().await;
        if self.json {
            Ok(serde_json::to_string_pretty(&entries)?)
        } else {
            Ok(render(&entries))
        }
    }
}

#[derive(Tabled)]
struct Row<'entry> {
    #[tabled(rename = "#")]
    number: usize,
    #[tabled(rename = "Patient")]
    patient_id: &'entry str,
    #[tabled(rename = "Professional")]
    professional_name: &'entry str,
    #[tabled(rename = "Date/Time")]
    timestamp: String,
    #[tabled(rename = "Justification")]
    justification: &'entry str,
}

/// Newest entry first; the oldest entry is #1.
pub(crate) fn render(entries: &[AccessLogEntry]) -> String {
    if entries.is_empty() {
        return "No accesses recorded yet.".to_owned();
    }

    let rows = entries.iter().enumerate().rev().map(|(index, entry)| Row {
        number: index + 1,
        patient_id: entry.patient_id(),
        professional_name: entry.professional_name(),
        timestamp: entry
            .timestamp()
            .with_timezone(&Local)
            .format("%d/%m/%Y %H:%M:%S")
            .to_string(),
        justification: entry.justification(),
    });

    format!(
        "Total accesses recorded: {}\n{}",
        entries.len(),
        Table::new(rows).with(Style::rounded())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::environment;

    #[test]
    fn render_empty_log() {
        assert_eq!(render(&[]), "No accesses recorded yet.");
    }

    #[test]
    fn render_lists_newest_first() {
        let entries = [
            AccessLogEntry::new("PAC001", "SAMU emergency", "Dr. Silva").unwrap(),
            AccessLogEntry::new("PAC002", "Trauma triage", "Nurse Costa").unwrap(),
        ];
        let out = render(&entries);

        assert!(out.starts_with("Total accesses recorded: 2\n"));
        let newest = out.find("PAC002").unwrap();
        let oldest = out.find("PAC001").unwrap();
        assert!(newest < oldest);
        assert!(out.contains("Nurse Costa"));
        assert!(out.contains("Trauma triage"));
    }

    #[tokio::test]
    async fn json_lists_oldest_first() {
        let env = environment(&["admin123"]).await;
        let accesses = [("PAC001", "SAMU emergency"), ("PAC003", "Fall at home")];
        for (patient_id, justification) in accesses {
            assert!(env
                .access
                .authenticate(patient_id, justification, "Dr. Silva")
                .await
                .unwrap());
        }

        let out = Command { json: true }.output(&env).await.unwrap();
        let logged: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(logged.len(), 2);
        assert_eq!(logged[0]["patientId"], "PAC001");
        assert_eq!(logged[1]["patientId"], "PAC003");
        assert_eq!(logged[1]["justification"], "Fall at home");
        assert_eq!(logged[1]["professionalName"], "Dr. Silva");
    }

    #[tokio::test]
    async fn json_needs_the_password() {
        let env = environment(&[]).await;
        assert!(Command { json: true }.output(&env).await.is_err());
    }
}
