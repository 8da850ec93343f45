// SPDX-FileCopyrightText: 2026 Infotag Contributors
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use tabled::{settings::Style, Table};

use crate::{error::Result, patient::DEMO_PATIENTS};

use super::Environment;

/// List the demo patient identifiers.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, _env: &Environment) -> Result<()> {
        println!("{}", render());
        Ok(())
    }
}

pub(crate) fn render() -> String {
    Table::new(DEMO_PATIENTS).with(Style::rounded()).to_string()
}
