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

use crate::rules::{ArgumentError, ConvertedRule, RuleInvocation, RuleKind};

/// Builds the text of one CMake function call:
///
/// ```text
/// iree_cc_library(
///   NAME
///     api
///   HDRS
///     "api.h"
///   DEPS
///     iree::base::status
///   PUBLIC
/// )
/// ```
///
/// Every sub-block with an empty, false or absent value is left out.
#[derive(Debug)]
pub struct Block {
    text: String,
}

impl Block {
    pub fn new(function: &str) -> Block {
        Block {
            text: format!("{}(\n", function),
        }
    }

    fn label(&mut self, label: &str) {
        self.text.push_str(&format!("  {}\n", label));
    }

    fn entry(&mut self, entry: &str) {
        self.text.push_str(&format!("    {}\n", entry));
    }

    pub fn name(mut self, name: Option<&str>) -> Block {
        if let Some(name) = name {
            self.label("NAME");
            self.entry(name);
        }
        self
    }

    /// A list of quoted file names.
    pub fn files(mut self, label: &str, files: &[String]) -> Block {
        if !files.is_empty() {
            self.label(label);
            for file in files {
                self.entry(&format!("\"{}\"", file));
            }
        }
        self
    }

    /// A list of bare target names.
    pub fn targets(mut self, label: &str, targets: &[String]) -> Block {
        if !targets.is_empty() {
            self.label(label);
            for target in targets {
                self.entry(target);
            }
        }
        self
    }

    pub fn quoted(mut self, label: &str, value: Option<&str>) -> Block {
        if let Some(value) = value {
            self.label(label);
            self.entry(&format!("\"{}\"", value));
        }
        self
    }

    pub fn option(mut self, label: &str, enabled: bool) -> Block {
        if enabled {
            self.label(label);
        }
        self
    }

    pub fn finish(mut self) -> String {
        // One blank line separates consecutive blocks.
        self.text.push_str(")\n\n");
        self.text
    }
}

/// Renders a converted rule. `deps` must already be resolved, sorted and deduplicated.
pub fn render(
    rule: ConvertedRule,
    invocation: &RuleInvocation,
    deps: &[String],
) -> Result<String, ArgumentError> {
    let block = Block::new(rule.cmake_function()).name(invocation.string("name")?);
    let block = match rule {
        ConvertedRule::CcLibrary => block
            .files("HDRS", invocation.strings("hdrs")?)
            .files("SRCS", invocation.strings("srcs")?)
            .targets("DEPS", deps)
            .option("ALWAYSLINK", invocation.flag("alwayslink"))
            .option("TESTONLY", invocation.flag("testonly"))
            .option("PUBLIC", true),
        ConvertedRule::CcTest => block
            .files("HDRS", invocation.strings("hdrs")?)
            .files("SRCS", invocation.strings("srcs")?)
            .targets("DEPS", deps),
        ConvertedRule::CcBinary => block
            .files("SRCS", invocation.strings("srcs")?)
            .targets("DEPS", deps),
        ConvertedRule::SpirvKernelCcLibrary => block.files("SRCS", invocation.strings("srcs")?),
        ConvertedRule::BytecodeModule => block
            .quoted("SRC", invocation.string("src")?)
            .quoted("CC_NAMESPACE", invocation.string("cc_namespace")?)
            .quoted("TRANSLATION", invocation.string("translation")?)
            .option("PUBLIC", true),
    };
    Ok(block.finish())
}

/// Passthrough marker for rules we know about but cannot convert yet.
pub fn unimplemented(kind: RuleKind, name: &str) -> String {
    format!("# Unimplemented {} {}\n", kind, name)
}

#[cfg(test)]
mod test {
    use super::{render, unimplemented, Block};
    use crate::rules::{ConvertedRule, RuleInvocation, RuleKind};
    use insta::assert_snapshot;

    fn invocation(input: &str) -> RuleInvocation {
        let mut calls = bzl_parse::parse(input, None).expect("valid parse");
        RuleInvocation::from_call(calls.remove(0)).expect("known rule")
    }

    fn deps(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_cc_library_all_blocks() {
        let inv = invocation(
            r#"cc_library(
    name = "api",
    hdrs = ["api.h"],
    srcs = ["api.cc", "api_util.cc"],
    alwayslink = True,
    testonly = 1,
)"#,
        );
        let text = render(
            ConvertedRule::CcLibrary,
            &inv,
            &deps(&["absl::strings", "iree::base::status"]),
        )
        .unwrap();
        assert_snapshot!(text, @r###"
iree_cc_library(
  NAME
    api
  HDRS
    "api.h"
  SRCS
    "api.cc"
    "api_util.cc"
  DEPS
    absl::strings
    iree::base::status
  ALWAYSLINK
  TESTONLY
  PUBLIC
)
"###);
        assert!(text.ends_with(")\n\n"));
    }

    #[test]
    fn test_empty_blocks_are_omitted() {
        let inv = invocation(
            r#"cc_library(name = "hdrs_only", hdrs = [], srcs = None, testonly = False)"#,
        );
        let text = render(ConvertedRule::CcLibrary, &inv, &[]).unwrap();
        assert_eq!(text, "iree_cc_library(\n  NAME\n    hdrs_only\n  PUBLIC\n)\n\n");
    }

    #[test]
    fn test_cc_test_and_binary() {
        let inv =
            invocation(r#"cc_test(name = "t", srcs = ["t.cc"], hdrs = ["t.h"], shard_count = 4)"#);
        let text = render(ConvertedRule::CcTest, &inv, &deps(&["gtest_main"])).unwrap();
        assert_snapshot!(text, @r###"
iree_cc_test(
  NAME
    t
  HDRS
    "t.h"
  SRCS
    "t.cc"
  DEPS
    gtest_main
)
"###);

        // Headers are not part of a binary.
        let inv = invocation(r#"cc_binary(name = "tool", srcs = ["main.cc"], hdrs = ["x.h"])"#);
        let text = render(ConvertedRule::CcBinary, &inv, &[]).unwrap();
        assert_eq!(
            text,
            "iree_cc_binary(\n  NAME\n    tool\n  SRCS\n    \"main.cc\"\n)\n\n"
        );
    }

    #[test]
    fn test_spirv_kernel_ignores_deps() {
        let inv = invocation(r#"spirv_kernel_cc_library(name = "k", srcs = ["k.comp"])"#);
        let text = render(
            ConvertedRule::SpirvKernelCcLibrary,
            &inv,
            &deps(&["ignored"]),
        )
        .unwrap();
        assert_eq!(
            text,
            "iree_spirv_kernel_cc_library(\n  NAME\n    k\n  SRCS\n    \"k.comp\"\n)\n\n"
        );
    }

    #[test]
    fn test_bytecode_module() {
        let inv = invocation(
            r#"iree_bytecode_module(
    name = "simple_module",
    src = "simple_module.mlir",
    cc_namespace = "iree::vm",
    translation = "-iree-mlir-to-vm-bytecode-module",
)"#,
        );
        let text = render(ConvertedRule::BytecodeModule, &inv, &[]).unwrap();
        assert_snapshot!(text, @r###"
iree_bytecode_module(
  NAME
    simple_module
  SRC
    "simple_module.mlir"
  CC_NAMESPACE
    "iree::vm"
  TRANSLATION
    "-iree-mlir-to-vm-bytecode-module"
  PUBLIC
)
"###);

        let inv = invocation(r#"iree_bytecode_module(name = "m", src = "m.mlir")"#);
        let text = render(ConvertedRule::BytecodeModule, &inv, &[]).unwrap();
        assert_eq!(
            text,
            "iree_bytecode_module(\n  NAME\n    m\n  SRC\n    \"m.mlir\"\n  PUBLIC\n)\n\n"
        );
    }

    #[test]
    fn test_wrong_argument_shape() {
        let inv = invocation(r#"cc_library(name = "api", srcs = "api.cc")"#);
        let err = render(ConvertedRule::CcLibrary, &inv, &[]).unwrap_err();
        assert_eq!(err.argument, "srcs");
    }

    #[test]
    fn test_unimplemented_marker() {
        assert_eq!(
            unimplemented(RuleKind::Filegroup, "all_mlir"),
            "# Unimplemented filegroup all_mlir\n"
        );
        assert_eq!(
            Block::new("f").name(None).option("X", false).finish(),
            "f(\n)\n\n"
        );
    }
}
