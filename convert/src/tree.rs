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

use std::path::{Component, Path, PathBuf};

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::{
    error::ConvertError,
    interpret::{ConversionContext, Interpreter},
    targets::{ExternalTargets, Resolver},
    template::{self, Header},
    writer::OutputWriter,
};

pub const BUILD_FILE: &str = "BUILD";
pub const CMAKE_FILE: &str = "CMakeLists.txt";

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Directory arguments and package names are relative to this.
    pub repo_root: PathBuf,
    /// Labels under `//<project>` are rewritten in place, everything else goes through the
    /// external table.
    pub project: String,
    pub header: Header,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Holds the path of the generated file.
    Converted(PathBuf),
    /// No BUILD file.
    Skipped,
}

#[derive(Debug, Default)]
pub struct TreeReport {
    pub converted: Vec<PathBuf>,
    pub skipped: usize,
    pub failed: Vec<ConvertError>,
}

impl TreeReport {
    fn record(&mut self, result: Result<Outcome, ConvertError>) {
        match result {
            Ok(Outcome::Converted(path)) => self.converted.push(path),
            Ok(Outcome::Skipped) => self.skipped += 1,
            Err(err) => {
                error!("Failed to convert {}. {}", err.path().display(), err.hint());
                error!("  Reason: {}", err);
                self.failed.push(err);
            }
        }
    }
}

pub struct TreeConverter<'a, W: OutputWriter> {
    options: &'a ConvertOptions,
    externals: &'a dyn ExternalTargets,
    writer: W,
}

impl<'a, W: OutputWriter> TreeConverter<'a, W> {
    pub fn new(
        options: &'a ConvertOptions,
        externals: &'a dyn ExternalTargets,
        writer: W,
    ) -> TreeConverter<'a, W> {
        TreeConverter {
            options,
            externals,
            writer,
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Converts every directory under `root` (relative to the repository root), parents before
    /// children. A failing directory is logged and does not stop the walk.
    pub fn convert_tree(&mut self, root: &Path) -> TreeReport {
        let root = self.options.repo_root.join(root);
        let mut report = TreeReport::default();
        if !root.is_dir() {
            warn!("{} is not a directory, nothing to convert", root.display());
            return report;
        }

        info!("Converting directory tree {}", root.display());
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            report.record(self.convert_directory(entry.path()));
        }
        report
    }

    /// Converts a single directory (relative to the repository root). Only a missing directory
    /// is returned as an error; conversion failures are logged and reported.
    pub fn convert_single(&mut self, dir: &Path) -> Result<TreeReport, ConvertError> {
        let dir = self.options.repo_root.join(dir);
        let mut report = TreeReport::default();
        match self.convert_directory(&dir) {
            Err(err @ ConvertError::FileNotFound(_)) => Err(err),
            result => {
                report.record(result);
                Ok(report)
            }
        }
    }

    pub fn convert_directory(&mut self, dir: &Path) -> Result<Outcome, ConvertError> {
        if !dir.is_dir() {
            return Err(ConvertError::FileNotFound(dir.to_owned()));
        }
        let build_file = dir.join(BUILD_FILE);
        if !build_file.is_file() {
            debug!("no {} in {}, skipping", BUILD_FILE, dir.display());
            return Ok(Outcome::Skipped);
        }

        let relative = dir.strip_prefix(&self.options.repo_root).unwrap_or(dir);
        let rel_build_file = relative.join(BUILD_FILE);
        let cmake_file = dir.join(CMAKE_FILE);
        info!(
            "Converting {} to {}",
            rel_build_file.display(),
            relative.join(CMAKE_FILE).display()
        );

        let source =
            std::fs::read_to_string(&build_file).map_err(|e| ConvertError::io(&build_file, e))?;
        let mut ctx = ConversionContext::new(rel_build_file, package_path(relative));
        let resolver = Resolver::new(&self.options.project, self.externals);
        Interpreter::new(&resolver).run(&source, &mut ctx)?;

        let subdirs = child_directories(dir)?;
        let text = template::render(&self.options.header, &subdirs, ctx.body());
        self.writer
            .write(&cmake_file, &text)
            .map_err(|e| ConvertError::io(&cmake_file, e))?;
        Ok(Outcome::Converted(cmake_file))
    }
}

/// `iree/base` style package path, regardless of platform separators.
fn package_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Immediate subdirectories, sorted by name so output does not depend on the filesystem.
fn child_directories(dir: &Path) -> Result<Vec<String>, ConvertError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ConvertError::io(dir, e))?;
    let mut children = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConvertError::io(dir, e))?;
        if entry.path().is_dir() {
            children.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    children.sort();
    Ok(children)
}
