// SPDX-FileCopyrightText: 2026 Infotag Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! The shared administrator password in front of the access log viewer.
//!
//! This is a courtesy gate, not access control: the password ships with the
//! application and the log it guards is a plain file on the same machine.

use std::{ffi::OsString, path::Path};

use async_trait::async_trait;
use log::warn;
use secrecy::{ExposeSecret as _, SecretString};
use subtle::ConstantTimeEq as _;
use tokio::task;

use crate::{
    error::{self, Result},
    metadata,
};

pub(crate) const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Default, Clone)]
pub(crate) struct Request {
    error: Option<String>,
}

pub(crate) struct RequestBuilder {
    error: Option<String>,
}

impl RequestBuilder {
    pub(crate) const fn new() -> Self {
        Self { error: None }
    }

    pub(crate) fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_owned());
        self
    }

    pub(crate) fn into_request(self) -> Request {
        Request { error: self.error }
    }
}

#[async_trait]
pub(crate) trait Prompt: Send + Sync {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>>;
}

#[async_trait]
impl<T: Prompt + ?Sized> Prompt for Box<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        (**self).prompt(req).await
    }
}

#[async_trait]
impl<T: Prompt> Prompt for Vec<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        for candidate in self {
            if let r @ (Ok(Some(_)) | Err(_)) = candidate.prompt(req.clone()).await {
                return r;
            }
        }

        Ok(None)
    }
}

pub(crate) struct PinentryPrompt {
    executable: Option<OsString>,
}

impl PinentryPrompt {
    pub(crate) const fn new() -> Self {
        Self { executable: None }
    }

    pub(crate) fn new_with_executable<P: AsRef<Path>>(executable: P) -> Self {
        Self {
            executable: Some(executable.as_ref().as_os_str().into()),
        }
    }
}

#[async_trait]
impl Prompt for PinentryPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        fn interact<'input>(
            mut input: pinentry::PassphraseInput<'input>,
            title: &'input str,
            error: Option<&'input String>,
        ) -> Result<SecretString> {
            _ = input.required("The access log is restricted to administrators.");
            _ = input.with_title(title);
            _ = input.with_prompt("Administrator password");
            if let Some(e) = error {
                _ = input.with_error(e);
            }

            Ok(input.interact()?)
        }

        let title = format!("Access log - {}", *metadata::CLIENT_DISPLAY_NAME);

        let input = self
            .executable
            .as_ref()
            .and_then(pinentry::PassphraseInput::with_binary)
            .or_else(pinentry::PassphraseInput::with_default_binary)
            .map(|input| task::spawn_blocking(move || interact(input, &title, req.error.as_ref())));

        Ok(match input {
            Some(fut) => Some(fut.await??),
            None => None,
        })
    }
}

pub(crate) struct RpasswordPrompt;

#[async_trait]
impl Prompt for RpasswordPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        if let Some(error) = req.error {
            eprintln!("Error: {error}");
        }

        Ok(Some(
            task::spawn_blocking(|| {
                rpassword::prompt_password("Administrator password: ").map(SecretString::new)
            })
            .await??,
        ))
    }
}

pub(crate) struct AdminGate {
    password: SecretString,
}

impl AdminGate {
    pub(crate) const fn new(password: SecretString) -> Self {
        Self { password }
    }

    pub(crate) fn verify(&self, candidate: &SecretString) -> bool {
        self.password
            .expose_secret()
            .as_bytes()
            .ct_eq(candidate.expose_secret().as_bytes())
            .into()
    }

    /// Asks for the password until it matches, giving up after
    /// [`MAX_ATTEMPTS`] wrong answers.
    pub(crate) async fn unlock(&self, prompt: &(dyn Prompt + '_)) -> Result<()> {
        let mut req = RequestBuilder::new().into_request();
        for attempt in 1..=MAX_ATTEMPTS {
            let candidate = prompt
                .prompt(req)
                .await?
                .ok_or(error::Password::NoPrompt)?;
            if self.verify(&candidate) {
                return Ok(());
            }

            warn!("Incorrect administrator password (attempt {attempt} of {MAX_ATTEMPTS})");
            req = RequestBuilder::new()
                .with_error("Incorrect password")
                .into_request();
        }

        Err(error::Password::Incorrect(MAX_ATTEMPTS).into())
    }
}
