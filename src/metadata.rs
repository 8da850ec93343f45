// SPDX-FileCopyrightText: 2026 Infotag Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use directories::ProjectDirs;
use inflector::Inflector;
use once_cell::sync::Lazy;

pub(crate) static CLIENT_TYPE_ID: Lazy<String> =
    Lazy::new(|| option_env!("CARGO_PKG_NAME").unwrap_or("infotag").to_owned());
pub(crate) static CLIENT_DISPLAY_NAME: Lazy<String> = Lazy::new(|| CLIENT_TYPE_ID.to_title_case());

pub(crate) static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("org", "Infotag", &CLIENT_DISPLAY_NAME));

/// Name of the durable slot holding the serialized access log.
pub(crate) const ACCESS_LOG_KEY: &str = "infotag_access_logs";

pub(crate) const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Shared password in front of the audit viewer. This is a demo gate, not
/// access control: it runs in the same trust domain as the data it guards.
pub(crate) const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
