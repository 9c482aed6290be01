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

use std::{ffi::OsString, path::PathBuf};

use anyhow::{self, Context};
use chrono::Datelike;
use thiserror::Error;
use tracing::{info, warn};

use bzl_convert::{
    ConvertOptions, ExternalTargets, FileWriter, Header, IreeExternalTargets, OutputWriter,
    PreviewWriter, TreeConverter, TreeReport,
};

pub const USAGE: &str = "\
Converts Bazel BUILD files to CMakeLists.txt files.

USAGE:
    bazel-to-cmake [OPTIONS]

OPTIONS:
    --preview           Print results instead of writing files
    --dir DIR           Convert the BUILD file in DIR only
    --root_dir DIR      Convert every BUILD file under DIR [default: iree]
    --repo_root PATH    Paths are relative to PATH [default: .]
    --project NAME      Labels under //NAME are project targets [default: iree]
    --year YYYY         Year in the generated license header [default: current year]
    -v, --verbose       Log more
    -h, --help          Print this help
";

const DEFAULT_ROOT_DIR: &str = "iree";
const DEFAULT_PROJECT: &str = "iree";
const COPYRIGHT_HOLDER: &str = "Google LLC";

/// What to convert.
#[derive(Debug, PartialEq, Eq)]
pub enum Target {
    /// One directory.
    Dir(PathBuf),
    /// A directory and everything below it.
    Tree(PathBuf),
}

#[derive(Debug)]
pub struct Config {
    pub preview: bool,
    pub target: Target,
    pub repo_root: PathBuf,
    pub project: String,
    pub year: i32,
    pub verbose: bool,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Args(#[from] pico_args::Error),
    #[error("--dir and --root_dir are mutually exclusive")]
    ConflictingTargets,
    #[error("unexpected arguments: {0}")]
    Unexpected(String),
}

impl Config {
    /// Returns `None` if help was requested.
    pub fn from_args() -> Result<Option<Config>, ConfigError> {
        Config::parse(pico_args::Arguments::from_env())
    }

    pub fn from_vec(args: Vec<OsString>) -> Result<Option<Config>, ConfigError> {
        Config::parse(pico_args::Arguments::from_vec(args))
    }

    fn parse(mut args: pico_args::Arguments) -> Result<Option<Config>, ConfigError> {
        if args.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let preview = args.contains("--preview");
        let verbose = args.contains(["-v", "--verbose"]);
        let dir: Option<PathBuf> = args.opt_value_from_str("--dir")?;
        let root_dir: Option<PathBuf> = args.opt_value_from_str("--root_dir")?;
        let repo_root: Option<PathBuf> = args.opt_value_from_str("--repo_root")?;
        let project: Option<String> = args.opt_value_from_str("--project")?;
        let year: Option<i32> = args.opt_value_from_str("--year")?;

        let rest = args.finish();
        if !rest.is_empty() {
            let rest: Vec<_> = rest.iter().map(|a| a.to_string_lossy()).collect();
            return Err(ConfigError::Unexpected(rest.join(" ")));
        }

        let target = match (dir, root_dir) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingTargets),
            (Some(dir), None) => Target::Dir(dir),
            (None, Some(root)) => Target::Tree(root),
            (None, None) => Target::Tree(PathBuf::from(DEFAULT_ROOT_DIR)),
        };

        Ok(Some(Config {
            preview,
            target,
            repo_root: repo_root.unwrap_or_else(|| PathBuf::from(".")),
            project: project.unwrap_or_else(|| DEFAULT_PROJECT.to_owned()),
            year: year.unwrap_or_else(|| chrono::Local::now().year()),
            verbose,
        }))
    }

    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            repo_root: self.repo_root.clone(),
            project: self.project.clone(),
            header: Header::new(self.year, COPYRIGHT_HOLDER),
        }
    }
}

fn convert<W: OutputWriter>(
    target: &Target,
    options: &ConvertOptions,
    externals: &dyn ExternalTargets,
    writer: W,
) -> anyhow::Result<TreeReport> {
    let mut converter = TreeConverter::new(options, externals, writer);
    match target {
        Target::Tree(root) => Ok(converter.convert_tree(root)),
        Target::Dir(dir) => converter
            .convert_single(dir)
            .with_context(|| format!("converting --dir {}", dir.display())),
    }
}

pub fn run(config: Config) -> anyhow::Result<()> {
    let options = config.convert_options();
    let externals = IreeExternalTargets;

    let report = if config.preview {
        let stdout = std::io::stdout();
        convert(
            &config.target,
            &options,
            &externals,
            PreviewWriter::new(stdout.lock()),
        )?
    } else {
        convert(&config.target, &options, &externals, FileWriter)?
    };

    info!(
        "Converted {} directories, skipped {} without a BUILD file",
        report.converted.len(),
        report.skipped
    );
    // Failures were logged as they happened; they do not fail the run.
    if !report.failed.is_empty() {
        warn!("{} directories failed to convert", report.failed.len());
    }
    Ok(())
}
