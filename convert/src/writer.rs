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

use std::{
    collections::BTreeMap,
    io::{Result, Write},
    path::{Path, PathBuf},
};

use tracing::info;

/// Where generated CMakeLists.txt contents end up.
pub trait OutputWriter {
    fn write(&mut self, path: &Path, contents: &str) -> Result<()>;
}

/// Overwrites files in place.
#[derive(Debug, Default)]
pub struct FileWriter;

impl OutputWriter for FileWriter {
    fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        if path.is_file() {
            info!("  {} already exists, overwriting", path.display());
        } else {
            info!("  {} does not exist yet, creating", path.display());
        }
        std::fs::write(path, contents)
    }
}

/// Prints contents instead of writing them, one blank line after each file.
pub struct PreviewWriter<W: Write> {
    out: W,
}

impl<W: Write> PreviewWriter<W> {
    pub fn new(out: W) -> PreviewWriter<W> {
        PreviewWriter { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OutputWriter for PreviewWriter<W> {
    fn write(&mut self, _path: &Path, contents: &str) -> Result<()> {
        self.out.write_all(contents.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

/// Keeps everything in memory, keyed by destination path.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub files: BTreeMap<PathBuf, String>,
}

impl OutputWriter for MemoryWriter {
    fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        self.files.insert(path.to_owned(), contents.to_owned());
        Ok(())
    }
}

impl<T: OutputWriter + ?Sized> OutputWriter for &mut T {
    fn write(&mut self, path: &Path, contents: &str) -> Result<()> {
        (**self).write(path, contents)
    }
}
