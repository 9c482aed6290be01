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
    collections::HashSet,
    fmt::{Display, Formatter},
};

use thiserror::Error;

use super::{
    ast::*,
    lexer,
    lexer::{Lexeme, Lexer, LexerError, LexerItem, Position},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A construct outside of the accepted subset.
    Syntax,
    /// A bare name used as a value, i.e. a variable reference.
    UnknownName(String),
}

#[derive(Debug, Error)]
pub struct ParseError {
    kind: ParseErrorKind,
    position: Position,
    line: String,
    near: String,
    message: String,
}

impl ParseError {
    fn new<S: Into<String>>(msg: S, near: &str, pos: lexer::Pos, lexer: &Lexer) -> ParseError {
        let position = lexer.to_position(pos);
        let line = lexer.retrieve_line(&position).to_owned();
        ParseError {
            kind: ParseErrorKind::Syntax,
            position,
            line,
            near: near.to_owned(),
            message: msg.into(),
        }
    }

    fn unexpected(expected: &str, lexeme: &Lexeme, pos: lexer::Pos, lexer: &Lexer) -> ParseError {
        ParseError::new(
            format!("Expected {}, got {}", expected, lexeme),
            &lexeme.to_string(),
            pos,
            lexer,
        )
    }

    fn unknown_name(name: &str, pos: lexer::Pos, lexer: &Lexer) -> ParseError {
        let mut err = ParseError::new(
            format!("name '{}' is not defined; variables are not supported", name),
            name,
            pos,
            lexer,
        );
        err.kind = ParseErrorKind::UnknownName(name.to_owned());
        err
    }

    fn eof<S: Into<String>>(msg: S, lexer: &Lexer) -> ParseError {
        ParseError::new(msg, "EOF", lexer.current_pos(), lexer)
    }

    fn from_lexer_error(err: LexerError, lexer: &Lexer) -> ParseError {
        match err {
            LexerError::UnterminatedString(pos) => {
                ParseError::new("Unterminated string literal", "\"", pos, lexer)
            }
            LexerError::InvalidEscape(pos, ch) => ParseError::new(
                format!("Invalid escape sequence '\\{}'", ch),
                "\\",
                pos,
                lexer,
            ),
            LexerError::InvalidUtf8(pos) => {
                ParseError::new("String literal is not valid utf-8", "\"", pos, lexer)
            }
        }
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// The text of the construct the parser stopped at.
    pub fn near(&self) -> &str {
        &self.near
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{position}: {msg}\n{line}\n{indent}^ near here",
            position = self.position,
            msg = self.message,
            line = self.line,
            indent = " ".repeat(self.position.column.saturating_sub(1)),
        )
    }
}

#[derive(Default)]
struct Peeker<'a> {
    peeked: Option<LexerItem<'a>>,
}

impl<'a> Peeker<'a> {
    fn next(&mut self, lexer: &mut Lexer<'a>) -> Option<LexerItem<'a>> {
        if self.peeked.is_some() {
            self.peeked.take()
        } else {
            lexer.next()
        }
    }

    fn peek(&mut self, lexer: &mut Lexer<'a>) -> Option<&LexerItem<'a>> {
        if self.peeked.is_none() {
            self.peeked = self.next(lexer);
        }
        self.peeked.as_ref()
    }
}

// Statements and expressions that would need an evaluator.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "and", "class", "def", "elif", "else", "for", "from", "if", "import", "in", "lambda", "not",
    "or", "pass", "return", "while", "with",
];

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    peeker: Peeker<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, source_name: Option<String>) -> Parser<'a> {
        Parser {
            lexer: Lexer::new(input, source_name),
            peeker: Default::default(),
        }
    }

    fn next_lexeme(&mut self, expected: &str) -> Result<(Lexeme<'a>, lexer::Pos), ParseError> {
        match self.peeker.next(&mut self.lexer) {
            None => Err(ParseError::eof(
                format!("Expected {}, got EOF", expected),
                &self.lexer,
            )),
            Some(item) => item.map_err(|err| ParseError::from_lexer_error(err, &self.lexer)),
        }
    }

    fn peek_is(&mut self, wanted: &Lexeme) -> bool {
        match self.peeker.peek(&mut self.lexer) {
            Some(Ok((lexeme, _))) => lexeme == wanted,
            _ => false,
        }
    }

    fn reject_keyword(&self, name: &str, pos: lexer::Pos) -> Result<(), ParseError> {
        if UNSUPPORTED_KEYWORDS.contains(&name) {
            return Err(ParseError::new(
                format!("'{}' is not supported; BUILD files may only contain rule calls", name),
                name,
                pos,
                &self.lexer,
            ));
        }
        Ok(())
    }

    fn parse_call(&mut self, function: &'a str, pos: lexer::Pos) -> Result<Call, ParseError> {
        self.reject_keyword(function, pos)?;
        let (lexeme, open_pos) = self.next_lexeme("(")?;
        match lexeme {
            Lexeme::LParen => {}
            Lexeme::Equals => {
                return Err(ParseError::new(
                    format!("Assignment to '{}' is not supported", function),
                    "=",
                    open_pos,
                    &self.lexer,
                ));
            }
            _ => return Err(ParseError::unexpected("(", &lexeme, open_pos, &self.lexer)),
        }

        let mut args: Vec<Argument> = Vec::new();
        let mut keywords = HashSet::new();
        loop {
            if self.peek_is(&Lexeme::RParen) {
                self.peeker.next(&mut self.lexer);
                break;
            }

            let (arg, arg_pos) = self.parse_argument()?;
            match &arg.name {
                Some(name) => {
                    if !keywords.insert(name.clone()) {
                        return Err(ParseError::new(
                            format!("Keyword argument '{}' repeated", name),
                            name,
                            arg_pos,
                            &self.lexer,
                        ));
                    }
                }
                None if !keywords.is_empty() => {
                    return Err(ParseError::new(
                        "Positional argument follows keyword argument",
                        "",
                        arg_pos,
                        &self.lexer,
                    ));
                }
                None => {}
            }
            args.push(arg);

            let (lexeme, sep_pos) = self.next_lexeme(", or )")?;
            match lexeme {
                Lexeme::Comma => {}
                Lexeme::RParen => break,
                Lexeme::Illegal(_) => return Err(self.computed(&lexeme, sep_pos)),
                _ => return Err(ParseError::unexpected(", or )", &lexeme, sep_pos, &self.lexer)),
            }
        }

        Ok(Call {
            function: function.to_owned(),
            args,
            position: self.lexer.to_position(pos),
        })
    }

    fn parse_argument(&mut self) -> Result<(Argument, lexer::Pos), ParseError> {
        let (lexeme, pos) = self.next_lexeme("argument")?;
        if let Lexeme::Identifier(name) = lexeme {
            if self.peek_is(&Lexeme::Equals) {
                self.peeker.next(&mut self.lexer);
                self.reject_keyword(name, pos)?;
                let (value_lexeme, value_pos) = self.next_lexeme("value")?;
                let value = self.parse_value(value_lexeme, value_pos)?;
                return Ok((
                    Argument {
                        name: Some(name.to_owned()),
                        value,
                    },
                    pos,
                ));
            }
        }
        let value = self.parse_value(lexeme, pos)?;
        Ok((Argument { name: None, value }, pos))
    }

    fn parse_value(&mut self, lexeme: Lexeme<'a>, pos: lexer::Pos) -> Result<Value, ParseError> {
        match lexeme {
            Lexeme::Str(value) => Ok(Value::Str(value)),
            Lexeme::Integer(digits) => digits.parse().map(Value::Int).map_err(|_| {
                ParseError::new("Integer literal out of range", digits, pos, &self.lexer)
            }),
            Lexeme::LBracket => self.parse_list().map(Value::List),
            Lexeme::Identifier("True") => Ok(Value::Bool(true)),
            Lexeme::Identifier("False") => Ok(Value::Bool(false)),
            Lexeme::Identifier("None") => Ok(Value::None),
            Lexeme::Identifier(name) => {
                self.reject_keyword(name, pos)?;
                if self.peek_is(&Lexeme::LParen) {
                    self.parse_call(name, pos).map(Value::Call)
                } else {
                    Err(ParseError::unknown_name(name, pos, &self.lexer))
                }
            }
            Lexeme::Illegal(_) => Err(self.computed(&lexeme, pos)),
            _ => Err(ParseError::unexpected("value", &lexeme, pos, &self.lexer)),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut items = Vec::new();
        loop {
            let (lexeme, pos) = self.next_lexeme("string literal or ]")?;
            match lexeme {
                Lexeme::RBracket => break,
                Lexeme::Str(value) => items.push(value),
                Lexeme::Identifier(name) if !UNSUPPORTED_KEYWORDS.contains(&name) => {
                    return Err(ParseError::unknown_name(name, pos, &self.lexer));
                }
                Lexeme::Identifier(name) => {
                    return Err(ParseError::new(
                        "List comprehensions are not supported",
                        name,
                        pos,
                        &self.lexer,
                    ));
                }
                _ => {
                    return Err(ParseError::unexpected(
                        "string literal or ]",
                        &lexeme,
                        pos,
                        &self.lexer,
                    ))
                }
            }

            let (lexeme, pos) = self.next_lexeme(", or ]")?;
            match lexeme {
                Lexeme::Comma => {}
                Lexeme::RBracket => break,
                Lexeme::Identifier(name) if UNSUPPORTED_KEYWORDS.contains(&name) => {
                    return Err(ParseError::new(
                        "List comprehensions are not supported",
                        name,
                        pos,
                        &self.lexer,
                    ));
                }
                Lexeme::Illegal(_) => return Err(self.computed(&lexeme, pos)),
                _ => return Err(ParseError::unexpected(", or ]", &lexeme, pos, &self.lexer)),
            }
        }
        Ok(items)
    }

    fn computed(&self, lexeme: &Lexeme, pos: lexer::Pos) -> ParseError {
        ParseError::new(
            format!("Computed expressions are not supported (found '{}')", lexeme),
            &lexeme.to_string(),
            pos,
            &self.lexer,
        )
    }

    /// Parses the whole input into its top-level calls, in file order.
    pub fn parse(mut self) -> Result<Vec<Call>, ParseError> {
        let mut calls = Vec::new();
        while let Some(item) = self.peeker.next(&mut self.lexer) {
            let (lexeme, pos) =
                item.map_err(|err| ParseError::from_lexer_error(err, &self.lexer))?;
            match lexeme {
                Lexeme::Identifier(name) => calls.push(self.parse_call(name, pos)?),
                Lexeme::Illegal(_) => return Err(self.computed(&lexeme, pos)),
                _ => {
                    return Err(ParseError::unexpected(
                        "a rule invocation",
                        &lexeme,
                        pos,
                        &self.lexer,
                    ))
                }
            }
        }
        Ok(calls)
    }
}

#[cfg(test)]
mod test {
    use super::{ParseError, ParseErrorKind, Parser};
    use crate::ast::{Argument, Value};

    fn parse(input: &str) -> Result<Vec<super::Call>, ParseError> {
        Parser::new(input, None).parse()
    }

    #[test]
    fn test_simple() {
        let input = r#"
cc_library(
    name = "api",
    hdrs = ["api.h"],
    testonly = True,
    deps = [
        ":status",
        "//iree/base:core_headers",  # comment
    ],
)
"#;
        let calls = parse(input).expect("valid parse");
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.function, "cc_library");
        assert_eq!(call.position.line, 2);
        assert_eq!(call.position.column, 1);
        assert_eq!(
            call.args,
            vec![
                Argument {
                    name: Some("name".to_owned()),
                    value: Value::Str("api".to_owned()),
                },
                Argument {
                    name: Some("hdrs".to_owned()),
                    value: Value::List(vec!["api.h".to_owned()]),
                },
                Argument {
                    name: Some("testonly".to_owned()),
                    value: Value::Bool(true),
                },
                Argument {
                    name: Some("deps".to_owned()),
                    value: Value::List(vec![
                        ":status".to_owned(),
                        "//iree/base:core_headers".to_owned()
                    ]),
                },
            ]
        );
    }

    #[test]
    fn test_positional_and_nested_calls() {
        let input = r#"load("//build_tools/bazel:build_defs.bzl", "iree_build_test")
filegroup(name = "files", srcs = glob(["*.mlir"]), shard_count = 4, licenses = None)
exports_files(["LICENSE"])"#;
        let calls = parse(input).expect("valid parse");
        let functions: Vec<&str> = calls.iter().map(|c| c.function.as_str()).collect();
        assert_eq!(functions, vec!["load", "filegroup", "exports_files"]);
        assert_eq!(calls[0].args.len(), 2);
        assert!(calls[0].args.iter().all(|arg| arg.name.is_none()));

        match calls[1].keyword("srcs") {
            Some(Value::Call(glob)) => {
                assert_eq!(glob.function, "glob");
                assert_eq!(glob.args[0].value, Value::List(vec!["*.mlir".to_owned()]));
            }
            other => panic!("Unexpected srcs {:?}", other),
        }
        assert_eq!(calls[1].keyword("shard_count"), Some(&Value::Int(4)));
        assert_eq!(calls[1].keyword("licenses"), Some(&Value::None));
        assert_eq!(calls[1].position.line, 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").expect("valid parse").is_empty());
        assert!(parse("# only a comment\n\n").expect("valid parse").is_empty());
    }

    #[test]
    fn test_variable_reference_is_unknown_name() {
        let err = parse("cc_library(name = \"a\", copts = DEFAULT_COPTS)").unwrap_err();
        assert_eq!(
            err.kind(),
            &ParseErrorKind::UnknownName("DEFAULT_COPTS".to_owned())
        );
        assert_eq!(err.near(), "DEFAULT_COPTS");
        assert_eq!(err.position().line, 1);
        assert_eq!(err.position().column, 32);
    }

    #[test]
    fn test_unsupported_constructs() {
        for (input, expected_line, expected_col, expected_near) in &[
            ("COPTS = [\"-Wall\"]", 1, 7, "="),
            ("if True:\n  cc_library(name = \"a\")", 1, 1, "if"),
            ("cc_library(name = \"a\" + \"b\")", 1, 23, "+"),
            ("cc_library(srcs = [\"a\" for f in x])", 1, 24, "for"),
            ("cc_library(name = \"a\", name = \"b\")", 1, 24, "name"),
            ("cc_library(name = \"a\", \"b\")", 1, 24, ""),
            ("cc_library(deps = select({}))", 1, 26, "{"),
            ("native.cc_library(name = \"a\")", 1, 7, "."),
            ("cc_library(\n  name = \"a\",\n", 3, 1, "EOF"),
            ("cc_library(name = \"a)\n", 1, 19, "\""),
            ("\"just a string\"", 1, 1, "\"just a string\""),
        ] {
            let err = parse(input).expect_err("parse should fail");
            assert_eq!(err.kind(), &ParseErrorKind::Syntax, "input {:?}", input);
            assert_eq!(err.position().line, *expected_line, "input {:?}", input);
            assert_eq!(err.position().column, *expected_col, "input {:?}", input);
            assert_eq!(err.near(), *expected_near, "input {:?}", input);
        }
    }

    #[test]
    fn test_error_display() {
        let err = Parser::new(
            "cc_library(\n  name = \"a\" + \"b\",\n)",
            Some("iree/base/BUILD".to_owned()),
        )
        .parse()
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "iree/base/BUILD:2:14: Computed expressions are not supported (found '+')\n\
             \x20 name = \"a\" + \"b\",\n\
             \x20            ^ near here"
        );
    }
}
