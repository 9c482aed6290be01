/*
 * Copyright 2020 Nikhil Marathe <nsm.nikhil@gmail.com>
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::path::{Path, PathBuf};

use bzl_parse::{ParseError, ParseErrorKind};
use thiserror::Error;

use crate::rules::UnknownRule;

#[derive(Error, Debug)]
pub enum ConvertError {
    /// A call (or a bare name) that no handler exists for. Parse failures land here too, since
    /// anything outside the accepted subset is equally something we cannot handle.
    #[error("{}: missing a rule handler for '{}': {}", .path.display(), .name, .reason)]
    MissingHandler {
        path: PathBuf,
        name: String,
        reason: String,
    },
    #[error("{}: missing a CMake conversion for external target '{}'", .path.display(), .alias)]
    MissingMapping { path: PathBuf, alias: String },
    #[error(
        "{}: {} '{}': argument '{}' must be {}",
        .path.display(),
        .rule,
        .target,
        .argument,
        .expected
    )]
    InvalidArgument {
        path: PathBuf,
        rule: &'static str,
        target: String,
        argument: String,
        expected: &'static str,
    },
    #[error("cannot find directory '{}'", .0.display())]
    FileNotFound(PathBuf),
    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub(crate) fn from_parse_error(path: &Path, err: ParseError) -> ConvertError {
        let name = match err.kind() {
            ParseErrorKind::UnknownName(name) => name.clone(),
            ParseErrorKind::Syntax => err.near().to_owned(),
        };
        ConvertError::MissingHandler {
            path: path.to_owned(),
            name,
            reason: err.to_string(),
        }
    }

    pub(crate) fn from_unknown_rule(path: &Path, err: UnknownRule) -> ConvertError {
        ConvertError::MissingHandler {
            path: path.to_owned(),
            reason: format!("{} at line {}", err, err.position.line),
            name: err.name,
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> ConvertError {
        ConvertError::Io {
            path: path.to_owned(),
            source,
        }
    }

    /// The BUILD (or output) file the error is about, if any.
    pub fn path(&self) -> &Path {
        match self {
            ConvertError::MissingHandler { path, .. }
            | ConvertError::MissingMapping { path, .. }
            | ConvertError::InvalidArgument { path, .. }
            | ConvertError::Io { path, .. } => path,
            ConvertError::FileNotFound(path) => path,
        }
    }

    /// Where to look to fix it.
    pub fn hint(&self) -> &'static str {
        match self {
            ConvertError::MissingHandler { .. } => "Missing a rule handler in the converter?",
            ConvertError::MissingMapping { .. } => {
                "Missing a conversion in the external target table?"
            }
            ConvertError::InvalidArgument { .. } => "Unexpected argument type in the BUILD file?",
            ConvertError::FileNotFound(_) => "Check the directory argument.",
            ConvertError::Io { .. } => "Check file permissions.",
        }
    }
}
