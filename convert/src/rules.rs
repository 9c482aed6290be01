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

//! The closed set of BUILD functions we know how to handle, and the argument records they are
//! invoked with.

use std::fmt;

use bzl_parse::{ast, Position};
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    // No CMake counterpart, dropped silently.
    Load,
    Package,
    ExportsFiles,
    ConfigSetting,
    IreeBuildTest,
    // Known, but not converted yet.
    Filegroup,
    Glob,
    Gentbl,
    CcEmbedData,
    IreeSetupLitPackage,
    IreeGlobLitTests,
    // Converted to a CMake function call.
    CcLibrary,
    CcTest,
    CcBinary,
    SpirvKernelCcLibrary,
    IreeBytecodeModule,
}

/// What the interpreter does with an invocation of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    Ignore,
    Unimplemented,
    Convert(ConvertedRule),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertedRule {
    CcLibrary,
    CcTest,
    CcBinary,
    SpirvKernelCcLibrary,
    BytecodeModule,
}

impl ConvertedRule {
    /// The CMake function from build_tools/cmake/ that imitates the Bazel rule.
    pub fn cmake_function(self) -> &'static str {
        match self {
            ConvertedRule::CcLibrary => "iree_cc_library",
            ConvertedRule::CcTest => "iree_cc_test",
            ConvertedRule::CcBinary => "iree_cc_binary",
            ConvertedRule::SpirvKernelCcLibrary => "iree_spirv_kernel_cc_library",
            ConvertedRule::BytecodeModule => "iree_bytecode_module",
        }
    }

    /// Whether the rendered block carries a DEPS list. `deps` is neither read nor resolved for
    /// the other rules.
    pub fn has_deps(self) -> bool {
        match self {
            ConvertedRule::CcLibrary | ConvertedRule::CcTest | ConvertedRule::CcBinary => true,
            ConvertedRule::SpirvKernelCcLibrary | ConvertedRule::BytecodeModule => false,
        }
    }
}

const ALL_KINDS: &[RuleKind] = &[
    RuleKind::Load,
    RuleKind::Package,
    RuleKind::ExportsFiles,
    RuleKind::ConfigSetting,
    RuleKind::IreeBuildTest,
    RuleKind::Filegroup,
    RuleKind::Glob,
    RuleKind::Gentbl,
    RuleKind::CcEmbedData,
    RuleKind::IreeSetupLitPackage,
    RuleKind::IreeGlobLitTests,
    RuleKind::CcLibrary,
    RuleKind::CcTest,
    RuleKind::CcBinary,
    RuleKind::SpirvKernelCcLibrary,
    RuleKind::IreeBytecodeModule,
];

impl RuleKind {
    pub fn all() -> &'static [RuleKind] {
        ALL_KINDS
    }

    /// The function name as spelled in BUILD files.
    pub fn name(self) -> &'static str {
        match self {
            RuleKind::Load => "load",
            RuleKind::Package => "package",
            RuleKind::ExportsFiles => "exports_files",
            RuleKind::ConfigSetting => "config_setting",
            RuleKind::IreeBuildTest => "iree_build_test",
            RuleKind::Filegroup => "filegroup",
            RuleKind::Glob => "glob",
            RuleKind::Gentbl => "gentbl",
            RuleKind::CcEmbedData => "cc_embed_data",
            RuleKind::IreeSetupLitPackage => "iree_setup_lit_package",
            RuleKind::IreeGlobLitTests => "iree_glob_lit_tests",
            RuleKind::CcLibrary => "cc_library",
            RuleKind::CcTest => "cc_test",
            RuleKind::CcBinary => "cc_binary",
            RuleKind::SpirvKernelCcLibrary => "spirv_kernel_cc_library",
            RuleKind::IreeBytecodeModule => "iree_bytecode_module",
        }
    }

    pub fn handling(self) -> Handling {
        match self {
            RuleKind::Load
            | RuleKind::Package
            | RuleKind::ExportsFiles
            | RuleKind::ConfigSetting
            | RuleKind::IreeBuildTest => Handling::Ignore,
            RuleKind::Filegroup
            | RuleKind::Glob
            | RuleKind::Gentbl
            | RuleKind::CcEmbedData
            | RuleKind::IreeSetupLitPackage
            | RuleKind::IreeGlobLitTests => Handling::Unimplemented,
            RuleKind::CcLibrary => Handling::Convert(ConvertedRule::CcLibrary),
            RuleKind::CcTest => Handling::Convert(ConvertedRule::CcTest),
            RuleKind::CcBinary => Handling::Convert(ConvertedRule::CcBinary),
            RuleKind::SpirvKernelCcLibrary => {
                Handling::Convert(ConvertedRule::SpirvKernelCcLibrary)
            }
            RuleKind::IreeBytecodeModule => Handling::Convert(ConvertedRule::BytecodeModule),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{name}' is not a known BUILD rule")]
pub struct UnknownRule {
    pub name: String,
    pub position: Position,
}

impl std::str::FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_KINDS
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| s.to_owned())
    }
}

/// An argument value after every nested call has been checked against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
    /// `None` in the source, or the result of a call that has already been executed.
    Absent,
    Invocation(Box<RuleInvocation>),
}

impl Value {
    fn from_ast(value: ast::Value) -> Result<Value, UnknownRule> {
        Ok(match value {
            ast::Value::Str(s) => Value::Str(s),
            ast::Value::Int(i) => Value::Int(i),
            ast::Value::Bool(b) => Value::Bool(b),
            ast::Value::None => Value::Absent,
            ast::Value::List(items) => Value::List(items),
            ast::Value::Call(call) => Value::Invocation(Box::new(RuleInvocation::from_call(call)?)),
        })
    }

    /// Starlark truthiness.
    fn is_truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Int(i) => *i != 0,
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
            Value::Absent => false,
            // Calls evaluate to None.
            Value::Invocation(_) => false,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("argument '{argument}' must be {expected}")]
pub struct ArgumentError {
    pub argument: String,
    pub expected: &'static str,
}

/// One call in a BUILD file, bound to a known rule kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInvocation {
    pub kind: RuleKind,
    pub positional: Vec<Value>,
    pub keywords: IndexMap<String, Value>,
    pub position: Position,
}

impl RuleInvocation {
    /// Binds a parsed call, and every call nested in its arguments, to the registry.
    pub fn from_call(call: ast::Call) -> Result<RuleInvocation, UnknownRule> {
        let kind = call.function.parse::<RuleKind>().map_err(|name| UnknownRule {
            name,
            position: call.position.clone(),
        })?;

        let mut positional = Vec::new();
        let mut keywords = IndexMap::with_capacity(call.args.len());
        for arg in call.args {
            let value = Value::from_ast(arg.value)?;
            match arg.name {
                Some(name) => {
                    keywords.insert(name, value);
                }
                None => positional.push(value),
            }
        }

        Ok(RuleInvocation {
            kind,
            positional,
            keywords,
            position: call.position,
        })
    }

    /// Removes nested invocations from the arguments, leaving `Absent` in their place. They are
    /// returned in evaluation order: positional arguments first, then keywords as written.
    pub fn take_nested(&mut self) -> Vec<RuleInvocation> {
        let mut nested = Vec::new();
        for value in self.positional.iter_mut().chain(self.keywords.values_mut()) {
            if let Value::Invocation(_) = value {
                if let Value::Invocation(inner) = std::mem::replace(value, Value::Absent) {
                    nested.push(*inner);
                }
            }
        }
        nested
    }

    pub fn string(&self, key: &str) -> Result<Option<&str>, ArgumentError> {
        match self.keywords.get(key) {
            None | Some(Value::Absent) => Ok(None),
            Some(Value::Str(s)) if s.is_empty() => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(ArgumentError {
                argument: key.to_owned(),
                expected: "a string",
            }),
        }
    }

    pub fn strings(&self, key: &str) -> Result<&[String], ArgumentError> {
        match self.keywords.get(key) {
            None | Some(Value::Absent) => Ok(&[][..]),
            Some(Value::List(items)) => Ok(items.as_slice()),
            Some(_) => Err(ArgumentError {
                argument: key.to_owned(),
                expected: "a list of strings",
            }),
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        self.keywords.get(key).map_or(false, Value::is_truthy)
    }

    /// The target name used in diagnostics and passthrough markers.
    pub fn display_name(&self) -> &str {
        match self.keywords.get("name") {
            Some(Value::Str(name)) => name.as_str(),
            _ => "unnamed",
        }
    }
}
