// SPDX-FileCopyrightText: 2026 Infotag Contributors
//
// SPDX-License-Identifier: Apache-2.0

/// Which single patient, if any, the current professional may view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum Session {
    #[default]
    Unauthenticated,
    Authenticated {
        patient_id: String,
        professional_name: String,
    },
}

impl Session {
    pub(crate) fn authenticated(patient_id: &str, professional_name: &str) -> Self {
        Self::Authenticated {
            patient_id: patient_id.to_owned(),
            professional_name: professional_name.to_owned(),
        }
    }

    pub(crate) fn patient_id(&self) -> Option<&str> {
        match self {
            Self::Authenticated { patient_id, .. } => Some(patient_id),
            Self::Unauthenticated => None,
        }
    }

    /// Empty when unauthenticated.
    pub(crate) fn professional_name(&self) -> &str {
        match self {
            Self::Authenticated {
                professional_name, ..
            } => professional_name,
            Self::Unauthenticated => "",
        }
    }

    pub(crate) fn can_access_patient(&self, patient_id: &str) -> bool {
        self.patient_id() == Some(patient_id)
    }
}
