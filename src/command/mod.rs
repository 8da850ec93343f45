// SPDX-FileCopyrightText: 2026 Infotag Contributors
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use log::warn;

use crate::{
    access::AccessControl,
    audit::Record,
    error::{Error, Result},
    password::{AdminGate, Prompt},
    patient::{Card, Directory, Patient},
    storage::Storage,
};

pub(crate) mod audit;
pub(crate) mod lookup;
pub(crate) mod patients;
pub(crate) mod shell;

pub(crate) type AuditStorage = Box<dyn Storage<Record>>;

/// Everything a command may touch, built once per process.
pub(crate) struct Environment {
    pub(crate) access: AccessControl<AuditStorage>,
    pub(crate) directory: Directory,
    pub(crate) gate: AdminGate,
    pub(crate) prompt: Box<dyn Prompt>,
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, env: &Environment) -> Result<()>;
}

/// Returns the record of `patient_id` if the current session may see it.
pub(crate) async fn view_patient<'env>(
    env: &'env Environment,
    patient_id: &str,
) -> Result<&'env Patient> {
    if !env.access.can_access_patient(patient_id).await {
        warn!("Denied access to patient {}", patient_id);
        return Err(Error::AccessDenied(patient_id.to_owned()));
    }

    env.directory
        .get(patient_id)
        .ok_or_else(|| Error::PatientNotFound(patient_id.to_owned()))
}

/// A patient record headed by who is looking at it.
pub(crate) async fn page(env: &Environment, patient: &Patient) -> String {
    format!(
        "Accessed by {}\n{}",
        env.access.professional_name().await.trim(),
        Card(patient)
    )
}
