//! Project file

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::encoding::{latin1_encoder, utf8_encoder, StringEncoder};
use crate::errors::DeserializeError;

use relative_path::RelativePathBuf;
use serde::Deserialize;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StringEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl StringEncoding {
    pub fn encoder(self) -> StringEncoder {
        match self {
            Self::Utf8 => utf8_encoder,
            Self::Latin1 => latin1_encoder,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A list of MML sources and the options used to compile them.
///
/// Paths are relative to the project file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Project {
    pub sources: Vec<RelativePathBuf>,
    pub output: Option<RelativePathBuf>,

    #[serde(default = "default_true")]
    pub use_default_macros: bool,
    #[serde(default)]
    pub continue_on_error: bool,
    #[serde(default)]
    pub disable_running_status: bool,
    #[serde(default)]
    pub string_encoding: StringEncoding,
}

pub struct ProjectFile {
    pub path: PathBuf,
    pub file_name: String,
    pub parent_path: PathBuf,

    pub project: Project,
}

impl ProjectFile {
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.project
            .sources
            .iter()
            .map(|s| s.to_path(&self.parent_path))
            .collect()
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        self.project
            .output
            .as_ref()
            .map(|o| o.to_path(&self.parent_path))
    }
}

pub fn load_project_file(path: PathBuf) -> Result<ProjectFile, DeserializeError> {
    let file_name = path
        .file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .to_string();

    let parent_path = match path.parent() {
        Some(p) => p.to_owned(),
        None => return Err(DeserializeError::NoParentPath(file_name)),
    };

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) => return Err(DeserializeError::OpenError(file_name, e)),
    };
    let reader = BufReader::new(file);

    let project = match serde_json::from_reader(reader) {
        Ok(p) => p,
        Err(e) => return Err(DeserializeError::SerdeError(file_name, e)),
    };

    Ok(ProjectFile {
        path,
        file_name,
        parent_path,
        project,
    })
}
