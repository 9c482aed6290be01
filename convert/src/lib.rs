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

//! Converts Bazel BUILD files into CMakeLists.txt files that call the project's
//! `iree_cc_library`-style CMake functions.
//!
//! Parsing lives in `bzl-parse`. This crate binds parsed calls to known rules, rewrites target
//! labels, renders CMake text and walks directory trees.

pub mod emit;
mod error;
pub mod interpret;
pub mod rules;
pub mod targets;
pub mod template;
pub mod tree;
pub mod writer;

pub use error::ConvertError;
pub use interpret::{ConversionContext, Interpreter};
pub use rules::RuleKind;
pub use targets::{ExternalTargets, IreeExternalTargets, Resolver};
pub use template::Header;
pub use tree::{ConvertOptions, Outcome, TreeConverter, TreeReport, BUILD_FILE, CMAKE_FILE};
pub use writer::{FileWriter, MemoryWriter, OutputWriter, PreviewWriter};
