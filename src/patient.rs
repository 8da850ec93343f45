// SPDX-FileCopyrightText: 2026 Infotag Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::HashMap, fmt, fs, io::BufReader, path::Path};

use serde::Deserialize;
use tabled::{settings::Style, Table, Tabled};

use crate::error::Result;

static BUNDLED_PATIENTS: &str = include_str!("../data/patients.json");

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Patient {
    pub(crate) id: String,
    pub(crate) personal_info: PersonalInfo,
    pub(crate) medical_info: MedicalInfo,
    pub(crate) allergies: Vec<Allergy>,
    pub(crate) medications: Vec<Medication>,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) emergency_contacts: Vec<EmergencyContact>,
    pub(crate) medical_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub(crate) observations: String,
    pub(crate) last_update: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersonalInfo {
    pub(crate) name: String,
    pub(crate) birth_date: String,
    pub(crate) age: u32,
    pub(crate) gender: String,
    pub(crate) cpf: String,
    pub(crate) photo: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MedicalInfo {
    pub(crate) blood_type: String,
    pub(crate) height: String,
    pub(crate) weight: String,
    pub(crate) organ_donor: bool,
}

#[derive(Clone, Debug, Deserialize, Tabled)]
pub(crate) struct Allergy {
    #[tabled(rename = "Allergy")]
    pub(crate) name: String,
    #[tabled(rename = "Severity")]
    pub(crate) severity: String,
    #[tabled(rename = "Reaction")]
    pub(crate) reaction: String,
}

#[derive(Clone, Debug, Deserialize, Tabled)]
pub(crate) struct Medication {
    #[tabled(rename = "Medication")]
    pub(crate) name: String,
    #[tabled(rename = "Dosage")]
    pub(crate) dosage: String,
    #[tabled(rename = "Frequency")]
    pub(crate) frequency: String,
    #[tabled(rename = "Time")]
    pub(crate) time: String,
}

#[derive(Clone, Debug, Deserialize, Tabled)]
pub(crate) struct Condition {
    #[tabled(rename = "Condition")]
    pub(crate) name: String,
    #[tabled(rename = "Since")]
    pub(crate) since: String,
    #[tabled(rename = "Status")]
    pub(crate) status: String,
}

#[derive(Clone, Debug, Deserialize, Tabled)]
pub(crate) struct EmergencyContact {
    #[tabled(rename = "Priority")]
    pub(crate) priority: u32,
    #[tabled(rename = "Contact")]
    pub(crate) name: String,
    #[tabled(rename = "Relationship")]
    pub(crate) relationship: String,
    #[tabled(rename = "Phone")]
    pub(crate) phone: String,
}

#[derive(Clone, Debug, Deserialize, Tabled)]
pub(crate) struct HistoryEntry {
    #[tabled(rename = "Date")]
    pub(crate) date: String,
    #[tabled(rename = "Event")]
    pub(crate) description: String,
    #[tabled(rename = "Hospital")]
    pub(crate) hospital: String,
}

#[derive(Clone, Copy, Debug, Tabled)]
pub(crate) struct DemoPatient {
    #[tabled(rename = "ID")]
    pub(crate) id: &'static str,
    #[tabled(rename = "Name")]
    pub(crate) name: &'static str,
}

/// Identifiers offered for quick access on the lookup screen.
pub(crate) const DEMO_PATIENTS: [DemoPatient; 3] = [
    DemoPatient {
        id: "PAC001",
        name: "João Silva",
    },
    DemoPatient {
        id: "PAC002",
        name: "Maria Santos",
    },
    DemoPatient {
        id: "PAC003",
        name: "Pedro Oliveira",
    },
];

/// Patient identifiers are typed or scanned in any case but stored upper-case.
pub(crate) fn normalize_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Static patient records keyed by identifier.
pub(crate) struct Directory {
    patients: HashMap<String, Patient>,
}

impl Directory {
    pub(crate) fn bundled() -> Result<Self> {
        Ok(Self {
            patients: serde_json::from_str(BUNDLED_PATIENTS)?,
        })
    }

    pub(crate) fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let fp = fs::File::open(path)?;
        Ok(Self {
            patients: serde_json::from_reader(BufReader::new(fp))?,
        })
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Patient> {
        self.patients.get(id)
    }
}

/// Terminal rendering of a full patient record.
pub(crate) struct Card<'patient>(pub(crate) &'patient Patient);

impl fmt::Display for Card<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn section<T: Tabled>(
            f: &mut fmt::Formatter<'_>,
            title: &str,
            rows: impl IntoIterator<Item = T>,
        ) -> fmt::Result {
            let mut rows = rows.into_iter().peekable();
            writeln!(f)?;
            writeln!(f, "{title}")?;
            if rows.peek().is_none() {
                writeln!(f, "None recorded")
            } else {
                writeln!(f, "{}", Table::new(rows).with(Style::rounded()))
            }
        }

        let patient = self.0;
        let personal = &patient.personal_info;
        let medical = &patient.medical_info;

        writeln!(f, "{} [{}]", personal.name, patient.id)?;
        writeln!(
            f,
            "{} years, {}, born {}, CPF {}",
            personal.age, personal.gender, personal.birth_date, personal.cpf
        )?;
        writeln!(
            f,
            "Blood type {} | Height {} | Weight {} | Organ donor: {}",
            medical.blood_type,
            medical.height,
            medical.weight,
            if medical.organ_donor { "yes" } else { "no" }
        )?;
        if !patient.observations.trim().is_empty() {
            writeln!(f)?;
            writeln!(f, "Observations: {}", patient.observations.trim())?;
        }

        section(f, "Allergies", &patient.allergies)?;
        section(f, "Medications", &patient.medications)?;
        section(f, "Conditions", &patient.conditions)?;

        let mut contacts = patient.emergency_contacts.iter().collect::<Vec<_>>();
        contacts.sort_by_key(|contact| contact.priority);
        section(f, "Emergency contacts", contacts)?;

        section(f, "Medical history", &patient.medical_history)?;

        writeln!(f)?;
        write!(
            f,
            "Photo: {} | Last updated {}",
            personal.photo, patient.last_update
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_directory_has_demo_patients() {
        let directory = Directory::bundled().unwrap();
        for demo in DEMO_PATIENTS {
            let patient = directory.get(demo.id).unwrap();
            assert_eq!(patient.id, demo.id);
            assert_eq!(patient.personal_info.name, demo.name);
        }
        assert!(directory.get("pac001").is_none());
        assert!(directory.get("PAC999").is_none());
    }

    #[test]
    fn normalize_id_trims_and_uppercases() {
        assert_eq!(normalize_id("  pac001\n"), "PAC001");
        assert_eq!(normalize_id("PAC002"), "PAC002");
        assert_eq!(normalize_id("   "), "");
    }

    #[test]
    fn card_orders_contacts_by_priority() {
        let directory = Directory::bundled().unwrap();
        let card = Card(directory.get("PAC001").unwrap()).to_string();

        let spouse = card.find("Ana Silva").unwrap();
        let son = card.find("Carlos Silva").unwrap();
        assert!(spouse < son);
        assert!(card.contains("Penicilina"));
        assert!(card.contains("Observations: Portador de stent"));
    }

    #[test]
    fn card_marks_empty_sections() {
        let directory = Directory::bundled().unwrap();
        let card = Card(directory.get("PAC003").unwrap()).to_string();

        assert!(card.contains("Allergies\nNone recorded"));
        assert!(card.contains("Medical history\nNone recorded"));
    }

    #[test]
    fn directory_reads_alternate_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patients.json");
        fs::write(&path, BUNDLED_PATIENTS).unwrap();

        let directory = Directory::from_path(&path).unwrap();
        assert!(directory.get("PAC002").is_some());
    }
}
