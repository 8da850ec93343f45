// SPDX-FileCopyrightText: 2026 Infotag Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! The access log: one entry per successful authentication, mirrored into a
//! durable slot after every append.

use chrono::{DateTime, SubsecRound as _, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::{self, Result},
    storage::Storage,
};

/// Shape of the durable slot.
pub(crate) type Record = Vec<AccessLogEntry>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AccessLogEntry {
    patient_id: String,
    #[serde(with = "timestamp")]
    timestamp: DateTime<Utc>,
    justification: String,
    professional_name: String,
}

impl AccessLogEntry {
    /// Builds an entry stamped with the current instant. Returns `None` when
    /// either the justification or the professional name is blank.
    pub(crate) fn new(
        patient_id: &str,
        justification: &str,
        professional_name: &str,
    ) -> Option<Self> {
        Self::at(Utc::now(), patient_id, justification, professional_name)
    }

    pub(crate) fn at(
        timestamp: DateTime<Utc>,
        patient_id: &str,
        justification: &str,
        professional_name: &str,
    ) -> Option<Self> {
        let justification = justification.trim();
        let professional_name = professional_name.trim();
        if justification.is_empty() || professional_name.is_empty() {
            return None;
        }

        Some(Self {
            patient_id: patient_id.to_owned(),
            // The slot keeps millisecond precision.
            timestamp: timestamp.trunc_subsecs(3),
            justification: justification.to_owned(),
            professional_name: professional_name.to_owned(),
        })
    }

    pub(crate) fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub(crate) const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub(crate) fn justification(&self) -> &str {
        &self.justification
    }

    pub(crate) fn professional_name(&self) -> &str {
        &self.professional_name
    }
}

pub(crate) struct AuditLog<S> {
    storage: S,
    entries: Record,
}

impl<S: Storage<Record>> AuditLog<S> {
    /// Reads the slot once. A missing slot is an empty log, and so is a
    /// malformed one: it is reported and replaced on the next append.
    pub(crate) async fn load(mut storage: S) -> Result<Self> {
        if !storage.is_persistent() {
            warn!("The access log is kept in memory and will not outlive this process");
        }

        let entries = match storage.get().await {
            Ok(Some(entries)) => entries,
            Ok(None) => Record::new(),
            Err(error::Error::Storage(e @ error::Storage::Malformed(..))) => {
                warn!("Starting with an empty access log: {}", e);
                Record::new()
            }
            Err(e) => return Err(e),
        };
        debug!("Loaded {} access log entries", entries.len());

        Ok(Self { storage, entries })
    }

    /// Appends `entry` and overwrites the slot with the full log. On failure
    /// the in-memory log is left as it was.
    pub(crate) async fn append(&mut self, entry: AccessLogEntry) -> Result<()> {
        self.entries.push(entry);
        if let Err(e) = self.storage.update(&self.entries).await {
            _ = self.entries.pop();
            return Err(e);
        }
        Ok(())
    }

    pub(crate) fn entries(&self) -> &[AccessLogEntry] {
        &self.entries
    }
}

/// Timestamps are written as RFC 3339 strings with millisecond precision.
/// Older slots may hold milliseconds since the Unix epoch instead.
mod timestamp {
    use std::fmt;

    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        deserializer.deserialize_any(Visitor)
    }

    struct Visitor;

    impl de::Visitor<'_> for Visitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an RFC 3339 date-time or a number of milliseconds since the Unix epoch")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            DateTime::parse_from_rfc3339(v)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(E::custom)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            DateTime::from_timestamp_millis(v)
                .ok_or_else(|| E::custom(format_args!("timestamp {v} is out of range")))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            i64::try_from(v)
                .map_err(|_| E::custom(format_args!("timestamp {v} is out of range")))
                .and_then(|millis| self.visit_i64(millis))
        }

        #[allow(clippy::cast_possible_truncation)]
        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            if !v.is_finite() {
                return Err(E::custom(format_args!("timestamp {v} is not finite")));
            }
            self.visit_i64(v.trunc() as i64)
        }
    }
}
