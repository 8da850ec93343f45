// SPDX-FileCopyrightText: 2026 Infotag Contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    fs,
    io::{self, BufReader, Write as _},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::{self, Result},
    metadata,
};

use super::{IsPersistent, Storage};

/// A JSON document on local disk named after its slot key.
pub(crate) struct File {
    path: PathBuf,
}

impl File {
    /// Places the slot in the user's data directory, if one can be determined.
    pub(crate) fn new(key: &str) -> Option<Self> {
        metadata::PROJECT_DIRS
            .as_ref()
            .map(|dirs| Self::in_dir(dirs.data_dir(), key))
    }

    pub(crate) fn in_dir<P: AsRef<Path>>(dir: P, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{key}.json")),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_owned();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl IsPersistent for File {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl<T: Send + Serialize + Sync + for<'de> Deserialize<'de>> Storage<T> for File {
    async fn get(&mut self) -> Result<Option<T>> {
        let fp = match fs::File::open(&self.path) {
            Ok(fp) => fp,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_reader::<_, T>(BufReader::new(fp)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_io() => Err(e.into()),
            Err(e) => Err(error::Storage::Malformed(self.path.clone(), e).into()),
        }
    }

    async fn update(&mut self, data: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Readers must never see a half-written slot, so stage the whole
        // document next to the target and swap it in.
        let staging = self.staging_path();
        let written = stage(&staging, data)
            .and_then(|()| fs::rename(&staging, &self.path).map_err(Into::into));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&staging) {
                debug!("Could not remove {}: {}", staging.display(), cleanup);
            }
            return Err(e);
        }

        debug!("Wrote {}", self.path.display());
        Ok(())
    }
}

fn stage<T: Serialize>(staging: &Path, data: &T) -> Result<()> {
    let mut file = fs::File::create(staging)?;
    serde_json::to_writer(&mut file, data)?;
    file.flush()?;
    file.sync_all()?;
    Ok(())
}
