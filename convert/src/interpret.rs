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

use tracing::debug;

use crate::{
    emit,
    error::ConvertError,
    rules::{ArgumentError, Handling, RuleInvocation},
    targets::{Resolver, TargetError},
};

/// Per-directory conversion state. Never shared between directories.
#[derive(Debug)]
pub struct ConversionContext {
    build_file: PathBuf,
    package: String,
    body: String,
}

impl ConversionContext {
    /// `build_file` is used for diagnostics; `package` is the directory relative to the
    /// repository root, `/` separated.
    pub fn new<P: Into<PathBuf>, S: Into<String>>(build_file: P, package: S) -> Self {
        ConversionContext {
            build_file: build_file.into(),
            package: package.into(),
            body: String::new(),
        }
    }

    pub fn build_file(&self) -> &Path {
        &self.build_file
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }
}

pub struct Interpreter<'a> {
    resolver: &'a Resolver<'a>,
}

impl<'a> Interpreter<'a> {
    pub fn new(resolver: &'a Resolver<'a>) -> Self {
        Interpreter { resolver }
    }

    /// Runs every call in `source`, appending converted blocks to the context body in file order.
    ///
    /// All calls are bound to the rule registry before any of them runs, so an unknown rule fails
    /// the file without producing partial output.
    pub fn run(&self, source: &str, ctx: &mut ConversionContext) -> Result<(), ConvertError> {
        let calls = bzl_parse::parse(source, Some(ctx.build_file.display().to_string()))
            .map_err(|err| ConvertError::from_parse_error(&ctx.build_file, err))?;
        let invocations = calls
            .into_iter()
            .map(RuleInvocation::from_call)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ConvertError::from_unknown_rule(&ctx.build_file, err))?;

        for invocation in invocations {
            self.execute(invocation, ctx)?;
        }
        Ok(())
    }

    fn execute(
        &self,
        mut invocation: RuleInvocation,
        ctx: &mut ConversionContext,
    ) -> Result<(), ConvertError> {
        // Arguments are evaluated before the call itself, so e.g. a `glob` marker precedes the
        // rule that uses it.
        for nested in invocation.take_nested() {
            self.execute(nested, ctx)?;
        }

        match invocation.kind.handling() {
            Handling::Ignore => {
                debug!(rule = %invocation.kind, "no CMake mapping, ignoring");
            }
            Handling::Unimplemented => {
                ctx.body.push_str(&emit::unimplemented(
                    invocation.kind,
                    invocation.display_name(),
                ));
            }
            Handling::Convert(rule) => {
                let deps = if rule.has_deps() {
                    let deps = invocation
                        .strings("deps")
                        .map_err(|err| invalid_argument(ctx, &invocation, err))?;
                    self.resolver
                        .resolve_all(deps, &ctx.package)
                        .map_err(|err| missing_mapping(ctx, err))?
                } else {
                    Vec::new()
                };
                let block = emit::render(rule, &invocation, &deps)
                    .map_err(|err| invalid_argument(ctx, &invocation, err))?;
                ctx.body.push_str(&block);
            }
        }
        Ok(())
    }
}

fn invalid_argument(
    ctx: &ConversionContext,
    invocation: &RuleInvocation,
    err: ArgumentError,
) -> ConvertError {
    ConvertError::InvalidArgument {
        path: ctx.build_file.clone(),
        rule: invocation.kind.name(),
        target: invocation.display_name().to_owned(),
        argument: err.argument,
        expected: err.expected,
    }
}

fn missing_mapping(ctx: &ConversionContext, err: TargetError) -> ConvertError {
    match err {
        TargetError::MissingMapping(alias) => ConvertError::MissingMapping {
            path: ctx.build_file.clone(),
            alias,
        },
    }
}

#[cfg(test)]
mod test {
    use super::{ConversionContext, Interpreter};
    use crate::{error::ConvertError, targets::Resolver};
    use std::collections::HashMap;

    fn externals() -> HashMap<String, String> {
        let mut table = HashMap::new();
        table.insert(
            "@com_google_absl//absl/strings".to_owned(),
            "absl::strings".to_owned(),
        );
        table
    }

    fn run(source: &str, package: &str) -> Result<String, ConvertError> {
        let table = externals();
        let resolver = Resolver::new("iree", &table);
        let interpreter = Interpreter::new(&resolver);
        let mut ctx = ConversionContext::new(format!("{}/BUILD", package), package);
        interpreter.run(source, &mut ctx)?;
        Ok(ctx.into_body())
    }

    #[test]
    fn converts_in_file_order() {
        let body = run(
            r#"
load("//iree:build_defs.bzl", "iree_build_test")
package(default_visibility = ["//visibility:public"])

cc_library(
    name = "api",
    hdrs = ["api.h"],
    deps = [":status", "@com_google_absl//absl/strings", ":api", ":status"],
)

filegroup(name = "data")

cc_binary(name = "tool", srcs = ["tool.cc"], deps = ["//iree/base:api"])
"#,
            "iree/api",
        )
        .unwrap();
        assert_eq!(
            body,
            "iree_cc_library(\n  NAME\n    api\n  HDRS\n    \"api.h\"\n\
             \x20 DEPS\n    absl::strings\n    iree::api\n    iree::api::status\n  PUBLIC\n)\n\n\
             # Unimplemented filegroup data\n\
             iree_cc_binary(\n  NAME\n    tool\n  SRCS\n    \"tool.cc\"\n\
             \x20 DEPS\n    iree::base::api\n)\n\n"
        );
    }

    #[test]
    fn nested_glob_marker_precedes_its_rule() {
        let body = run(
            r#"filegroup(name = "all", srcs = glob(["*.mlir"]))"#,
            "iree/test",
        )
        .unwrap();
        assert_eq!(
            body,
            "# Unimplemented glob unnamed\n# Unimplemented filegroup all\n"
        );
    }

    #[test]
    fn unknown_rule_fails_before_any_output() {
        let err = run(
            "cc_library(name = \"a\")\nproto_library(name = \"p\")",
            "iree/base",
        )
        .unwrap_err();
        match err {
            ConvertError::MissingHandler { path, name, .. } => {
                assert_eq!(path.to_str(), Some("iree/base/BUILD"));
                assert_eq!(name, "proto_library");
            }
            e => panic!("Unexpected error {:?}", e),
        }
    }

    #[test]
    fn variables_are_missing_handlers() {
        let err = run("cc_library(name = \"a\", copts = COPTS)", "iree/base").unwrap_err();
        match err {
            ConvertError::MissingHandler { name, reason, .. } => {
                assert_eq!(name, "COPTS");
                assert!(reason.starts_with("iree/base/BUILD:1:"), "{}", reason);
            }
            e => panic!("Unexpected error {:?}", e),
        }
        let err = run("x = 1", "iree/base").unwrap_err();
        assert!(matches!(err, ConvertError::MissingHandler { ref name, .. } if name == "="));
    }

    #[test]
    fn unmapped_external_is_missing_mapping() {
        let err = run(
            "cc_library(name = \"a\", deps = [\"@llvm//:support\"])",
            "iree/base",
        )
        .unwrap_err();
        match err {
            ConvertError::MissingMapping { alias, .. } => assert_eq!(alias, "@llvm//:support"),
            e => panic!("Unexpected error {:?}", e),
        }
    }

    #[test]
    fn wrong_shape_is_invalid_argument() {
        let err = run("cc_test(name = \"t\", deps = \":a\")", "iree/base").unwrap_err();
        match err {
            ConvertError::InvalidArgument {
                rule,
                target,
                argument,
                ..
            } => {
                assert_eq!(rule, "cc_test");
                assert_eq!(target, "t");
                assert_eq!(argument, "deps");
            }
            e => panic!("Unexpected error {:?}", e),
        }
    }

    #[test]
    fn deps_ignored_without_deps_block() {
        let body = run(
            r#"spirv_kernel_cc_library(
    name = "k",
    srcs = ["k.comp"],
    deps = ["@vulkan_sdk//:unmapped"],
)
iree_bytecode_module(name = "m", src = "m.mlir", deps = "not a list")"#,
            "iree/k",
        )
        .unwrap();
        assert_eq!(
            body,
            "iree_spirv_kernel_cc_library(\n  NAME\n    k\n  SRCS\n    \"k.comp\"\n)\n\n\
             iree_bytecode_module(\n  NAME\n    m\n  SRC\n    \"m.mlir\"\n  PUBLIC\n)\n\n"
        );
    }

    #[test]
    fn ignored_rules_produce_nothing() {
        let body = run(
            r#"exports_files(["LICENSE"])
config_setting(name = "debug", values = ["x"])
iree_build_test(name = "all_targets", targets = [":a"])"#,
            "iree",
        )
        .unwrap();
        assert!(body.is_empty());
    }
}
