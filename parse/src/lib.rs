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

//! A lexer+parser for the data-only subset of Starlark found in Bazel BUILD files.
//!
//! Only top-level calls with literal arguments are accepted:
//!
//! ```text
//! cc_library(
//!     name = "api",
//!     hdrs = ["api.h"],
//!     srcs = glob(["*.cc"]),
//!     testonly = True,
//! )
//! ```
//!
//! Assignments, variables, control flow and operators are parse errors rather than something to
//! evaluate.

pub mod ast;
pub mod lexer;
mod parser;

pub use ast::{Argument, Call, Value};
pub use lexer::Position;
pub use parser::{ParseError, ParseErrorKind, Parser};

/// Parses a whole BUILD file into its calls, in file order.
pub fn parse(input: &str, source_name: Option<String>) -> Result<Vec<Call>, ParseError> {
    Parser::new(input, source_name).parse()
}
