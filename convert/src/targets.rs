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

//! Translation of Bazel labels into CMake target names.
//!
//! ```text
//! :logging                 (in iree/base)  -> iree::base::logging
//! :api                     (in iree/api)   -> iree::api
//! //iree/base:api                          -> iree::base::api
//! //iree/base                              -> iree::base
//! @com_google_absl//absl/strings           -> absl::strings
//! ```

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use thiserror::Error;

const SCOPE: &str = "::";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("no CMake mapping for external target '{0}'")]
    MissingMapping(String),
}

/// Lookup from external (non-project) labels to CMake target names.
pub trait ExternalTargets {
    fn convert(&self, alias: &str) -> Option<String>;
}

impl ExternalTargets for HashMap<String, String> {
    fn convert(&self, alias: &str) -> Option<String> {
        self.get(alias).cloned()
    }
}

static IREE_EXTERNAL_TARGETS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    vec![
        // Abseil.
        ("@com_google_absl//absl/base", "absl::base"),
        ("@com_google_absl//absl/base:core_headers", "absl::core_headers"),
        ("@com_google_absl//absl/container:flat_hash_map", "absl::flat_hash_map"),
        ("@com_google_absl//absl/container:inlined_vector", "absl::inlined_vector"),
        ("@com_google_absl//absl/flags:flag", "absl::flags"),
        ("@com_google_absl//absl/flags:parse", "absl::flags_parse"),
        ("@com_google_absl//absl/memory", "absl::memory"),
        ("@com_google_absl//absl/strings", "absl::strings"),
        ("@com_google_absl//absl/synchronization", "absl::synchronization"),
        ("@com_google_absl//absl/time", "absl::time"),
        ("@com_google_absl//absl/types:optional", "absl::optional"),
        ("@com_google_absl//absl/types:span", "absl::span"),
        ("@com_google_absl//absl/types:variant", "absl::variant"),
        // Testing.
        ("@com_google_googletest//:gtest", "gmock"),
        ("@com_google_googletest//:gtest_main", "gtest_main"),
        ("@com_google_benchmark//:benchmark", "benchmark"),
        // Third party libraries.
        ("@com_github_google_flatbuffers//:flatbuffers", "flatbuffers"),
        ("@vulkan_headers//:vulkan_headers", "Vulkan::Headers"),
        ("@vulkan_sdk//:sdk", "Vulkan::Vulkan"),
        ("@com_google_tracing_framework_cpp//:tracing_framework_bindings_cpp", "wtf"),
        // MLIR and LLVM.
        ("@local_config_mlir//:IR", "MLIRIR"),
        ("@local_config_mlir//:Pass", "MLIRPass"),
        ("@local_config_mlir//:StandardOps", "MLIRStandardOps"),
        ("@local_config_mlir//:Support", "MLIRSupport"),
        ("@local_config_mlir//:TransformUtils", "MLIRTransformUtils"),
        ("@local_config_mlir//:Transforms", "MLIRTransforms"),
        ("@llvm//:support", "LLVMSupport"),
        // Build tools.
        ("//build_tools:dl", "${CMAKE_DL_LIBS}"),
        ("//build_tools:pthreads", "Threads::Threads"),
    ]
    .into_iter()
    .collect()
});

/// The closed table of external labels used by the IREE source tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct IreeExternalTargets;

impl ExternalTargets for IreeExternalTargets {
    fn convert(&self, alias: &str) -> Option<String> {
        IREE_EXTERNAL_TARGETS.get(alias).map(|t| (*t).to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    PackageRelative,
    ProjectAbsolute,
    External,
}

/// Rewrites labels for targets declared in `project`'s own packages.
pub struct Resolver<'a> {
    project: &'a str,
    externals: &'a dyn ExternalTargets,
}

impl<'a> Resolver<'a> {
    pub fn new(project: &'a str, externals: &'a dyn ExternalTargets) -> Resolver<'a> {
        Resolver { project, externals }
    }

    /// Unlike a plain prefix test, `//<project>` must be followed by `/`, `:` or the end of the
    /// label, so `//iree_tf/base:api` is external rather than part of `//iree`.
    pub fn classify(&self, raw: &str) -> TargetKind {
        if raw.starts_with(':') {
            return TargetKind::PackageRelative;
        }
        match raw
            .strip_prefix("//")
            .and_then(|rest| rest.strip_prefix(self.project))
        {
            Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with(':') => {
                TargetKind::ProjectAbsolute
            }
            _ => TargetKind::External,
        }
    }

    /// `package` is the enclosing package's path relative to the repository root, `/` separated.
    pub fn resolve(&self, raw: &str, package: &str) -> Result<String, TargetError> {
        match self.classify(raw) {
            TargetKind::PackageRelative => Ok(resolve_relative(&raw[1..], package)),
            TargetKind::External => self
                .externals
                .convert(raw)
                .ok_or_else(|| TargetError::MissingMapping(raw.to_owned())),
            TargetKind::ProjectAbsolute => Ok(resolve_absolute(&raw[2..])),
        }
    }

    /// Resolves a dependency list, deduplicated and sorted.
    pub fn resolve_all<S: AsRef<str>>(
        &self,
        deps: &[S],
        package: &str,
    ) -> Result<Vec<String>, TargetError> {
        let resolved = deps
            .iter()
            .map(|dep| self.resolve(dep.as_ref(), package))
            .collect::<Result<BTreeSet<String>, TargetError>>()?;
        Ok(resolved.into_iter().collect())
    }
}

pub fn package_identifier(package: &str) -> String {
    package
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(SCOPE)
}

fn resolve_relative(name: &str, package: &str) -> String {
    let package = package_identifier(package);
    // A package's primary target shares the package's name.
    if package.rsplit(SCOPE).next() == Some(name) {
        return package;
    }
    if package.is_empty() {
        return name.to_owned();
    }
    format!("{}{}{}", package, SCOPE, name)
}

fn resolve_absolute(label: &str) -> String {
    // Directory separators first, then the name separator.
    label.replace('/', SCOPE).replace(':', SCOPE)
}
