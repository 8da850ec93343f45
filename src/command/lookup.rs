// SPDX-FileCopyrightText: 2026 Infotag Contributors
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::error;

use crate::{
    error::{self, Result},
    patient::{self, Patient},
};

use super::Environment;

/// Authenticate for one patient and show their record. The access is
/// recorded in the access log.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Your name, as it should appear in the access log.
    #[arg(long, short)]
    name: String,

    /// Why you need this record, as it should appear in the access log.
    #[arg(long, short)]
    justification: String,

    /// The patient identifier, typed or read from the patient's tag.
    #[clap()]
    patient_id: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, env: &Environment) -> Result<()> {
        let patient = lookup(env, &self.patient_id, &self.justification, &self.name).await?;
        println!("{}", super::page(env, patient).await);
        Ok(())
    }
}

/// Authenticates for `raw_id` and fetches the record it unlocks.
pub(crate) async fn lookup<'env>(
    env: &'env Environment,
    raw_id: &str,
    justification: &str,
    professional_name: &str,
) -> Result<&'env Patient> {
    let patient_id = patient::normalize_id(raw_id);
    if patient_id.is_empty() {
        error!("A patient identifier is required");
        return Err(error::Error::Command);
    }

    if !env
        .access
        .authenticate(&patient_id, justification, professional_name)
        .await?
    {
        return Err(error::Error::Authentication);
    }

    super::view_patient(env, &patient_id).await
}
