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

use std::fmt::{Display, Formatter};

/// Reflects a position in the stream. This can be translated to a line+column Position using
/// Lexer::to_position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
// This way, it is only possible to obtain a Pos from a lexeme/error.
pub struct Pos(pub(crate) usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub filename: Option<String>,
    pub line: usize,
    pub column: usize,
}

impl Position {
    fn new(filename: Option<String>, line: usize, column: usize) -> Position {
        Position {
            filename,
            line,
            column,
        }
    }

    #[cfg(test)]
    pub(crate) fn untitled(line: usize, column: usize) -> Position {
        Position::new(None, line, column)
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match &self.filename {
            Some(name) => write!(f, "{}:{}:{}", name, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lexeme<'a> {
    Identifier(&'a str),
    Integer(&'a str),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Equals,
    Illegal(char),
}

impl<'a> Display for Lexeme<'a> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Lexeme::Identifier(name) => write!(f, "{}", name),
            Lexeme::Integer(value) => write!(f, "{}", value),
            Lexeme::Str(value) => write!(f, "\"{}\"", value),
            Lexeme::LParen => write!(f, "("),
            Lexeme::RParen => write!(f, ")"),
            Lexeme::LBracket => write!(f, "["),
            Lexeme::RBracket => write!(f, "]"),
            Lexeme::Comma => write!(f, ","),
            Lexeme::Equals => write!(f, "="),
            Lexeme::Illegal(ch) => write!(f, "{}", ch),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexerError {
    UnterminatedString(Pos),
    InvalidEscape(Pos, char),
    InvalidUtf8(Pos),
}

pub type LexerItem<'a> = Result<(Lexeme<'a>, Pos), LexerError>;

pub struct Lexer<'a> {
    data: &'a str,
    filename: Option<String>,
    ch: u8,
    offset: usize,
    next_offset: usize,
    // Byte offset of the first character of every line seen so far.
    line_offsets: Vec<usize>,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a str, filename: Option<String>) -> Lexer<'a> {
        Lexer {
            data,
            filename,
            // This allows skip_trivia as the first call to advance by one and set everything up.
            ch: b' ',
            offset: 0,
            next_offset: 0,
            line_offsets: vec![0],
        }
    }

    fn advance(&mut self) -> Option<u8> {
        let bytes = self.data.as_bytes();
        if self.ch == b'\n' && !self.done() {
            self.line_offsets.push(self.offset + 1);
        }
        if self.next_offset < bytes.len() {
            self.offset = self.next_offset;
            self.ch = bytes[self.next_offset];
            self.next_offset += 1;
            Some(self.ch)
        } else {
            self.offset = bytes.len();
            self.ch = 0;
            None
        }
    }

    fn done(&self) -> bool {
        self.offset >= self.data.len()
    }

    fn peek_is(&self, ahead: usize, expected: u8) -> bool {
        self.data.as_bytes().get(self.offset + ahead) == Some(&expected)
    }

    /// Skips whitespace (newlines included), line continuations and comments.
    fn skip_trivia(&mut self) {
        loop {
            if self.done() {
                return;
            }
            match self.ch {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.advance();
                }
                b'\\' if self.peek_is(1, b'\n') => {
                    self.advance();
                    self.advance();
                }
                b'#' => {
                    while !self.done() && self.ch != b'\n' {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn read_identifier(&mut self) -> Lexeme<'a> {
        let data = self.data;
        let start = self.offset;
        while self.ch.is_ascii_alphanumeric() || self.ch == b'_' {
            if self.advance().is_none() {
                break;
            }
        }
        Lexeme::Identifier(&data[start..self.offset])
    }

    fn read_integer(&mut self) -> Lexeme<'a> {
        let data = self.data;
        let start = self.offset;
        while self.ch.is_ascii_digit() {
            if self.advance().is_none() {
                break;
            }
        }
        Lexeme::Integer(&data[start..self.offset])
    }

    fn read_string(&mut self) -> Result<String, LexerError> {
        let start = self.offset;
        let quote = self.ch;
        let triple = self.peek_is(1, quote) && self.peek_is(2, quote);
        let delimiter_len = if triple { 3 } else { 1 };
        for _ in 0..delimiter_len {
            self.advance();
        }

        let mut value = Vec::new();
        loop {
            if self.done() {
                return Err(LexerError::UnterminatedString(Pos(start)));
            }
            match self.ch {
                ch if ch == quote => {
                    if !triple {
                        self.advance();
                        break;
                    }
                    if self.peek_is(1, quote) && self.peek_is(2, quote) {
                        for _ in 0..delimiter_len {
                            self.advance();
                        }
                        break;
                    }
                    value.push(ch);
                    self.advance();
                }
                b'\n' if !triple => {
                    return Err(LexerError::UnterminatedString(Pos(start)));
                }
                b'\\' => {
                    let escape_start = self.offset;
                    if self.advance().is_none() {
                        return Err(LexerError::UnterminatedString(Pos(start)));
                    }
                    let escaped = match self.ch {
                        b'\\' => b'\\',
                        b'"' => b'"',
                        b'\'' => b'\'',
                        b'n' => b'\n',
                        b't' => b'\t',
                        b'\n' => {
                            // Escaped newline continues the literal.
                            self.advance();
                            continue;
                        }
                        other => {
                            return Err(LexerError::InvalidEscape(
                                Pos(escape_start),
                                other as char,
                            ));
                        }
                    };
                    value.push(escaped);
                    self.advance();
                }
                ch => {
                    value.push(ch);
                    self.advance();
                }
            }
        }
        String::from_utf8(value).map_err(|_| LexerError::InvalidUtf8(Pos(start)))
    }

    fn read_illegal(&mut self) -> Lexeme<'a> {
        let ch = self.data[self.offset..]
            .chars()
            .next()
            .unwrap_or(std::char::REPLACEMENT_CHARACTER);
        for _ in 0..ch.len_utf8() {
            self.advance();
        }
        Lexeme::Illegal(ch)
    }

    pub fn to_position(&self, pos: Pos) -> Position {
        match self.line_offsets.binary_search(&pos.0) {
            Ok(idx) => Position::new(self.filename.clone(), idx + 1, 1),
            Err(idx) => {
                // Since 0 is the first element in the vec, nothing can be inserted before that, at
                // position 0.
                debug_assert!(idx > 0);
                Position::new(
                    self.filename.clone(),
                    idx,
                    pos.0 - self.line_offsets[idx - 1] + 1,
                )
            }
        }
    }

    /// The full text of the line `position` is on, without the line terminator.
    pub fn retrieve_line(&self, position: &Position) -> &'a str {
        let data = self.data;
        let start = self
            .line_offsets
            .get(position.line.saturating_sub(1))
            .copied()
            .unwrap_or(data.len());
        let rest = &data[start..];
        let end = rest.find('\n').unwrap_or_else(|| rest.len());
        rest[..end].trim_end_matches('\r')
    }

    /// Position of the current character, or of the end of input.
    pub fn current_pos(&self) -> Pos {
        Pos(self.offset)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexerItem<'a>;

    // The lexer knows nothing about calls and arguments; it only emits a token stream. Newlines
    // carry no meaning in the subset we accept, so they are dropped along with comments.
    fn next(&mut self) -> Option<Self::Item> {
        self.skip_trivia();
        if self.done() {
            return None;
        }

        let start = self.offset;
        let ch = self.ch;
        if ch.is_ascii_alphabetic() || ch == b'_' {
            return Some(Ok((self.read_identifier(), Pos(start))));
        }
        if ch.is_ascii_digit() {
            return Some(Ok((self.read_integer(), Pos(start))));
        }
        if ch == b'"' || ch == b'\'' {
            return Some(
                self.read_string()
                    .map(|value| (Lexeme::Str(value), Pos(start))),
            );
        }
        if !ch.is_ascii() {
            return Some(Ok((self.read_illegal(), Pos(start))));
        }

        // Always make progress.
        self.advance();
        let lexeme = match ch {
            b'(' => Lexeme::LParen,
            b')' => Lexeme::RParen,
            b'[' => Lexeme::LBracket,
            b']' => Lexeme::RBracket,
            b',' => Lexeme::Comma,
            b'=' => Lexeme::Equals,
            other => Lexeme::Illegal(other as char),
        };
        Some(Ok((lexeme, Pos(start))))
    }
}

#[cfg(test)]
mod test {
    use super::{Lexeme, Lexer, LexerError, Pos, Position};

    fn lex(input: &str) -> Vec<Lexeme> {
        Lexer::new(input, None)
            .map(|item| item.expect("valid lexeme").0)
            .collect()
    }

    #[test]
    fn test_simple() {
        assert_eq!(
            lex("cc_library(name = \"api\")"),
            vec![
                Lexeme::Identifier("cc_library"),
                Lexeme::LParen,
                Lexeme::Identifier("name"),
                Lexeme::Equals,
                Lexeme::Str("api".to_owned()),
                Lexeme::RParen,
            ]
        );
    }

    #[test]
    fn test_list_and_trailing_comma() {
        assert_eq!(
            lex("['a.h', \"b.h\",]"),
            vec![
                Lexeme::LBracket,
                Lexeme::Str("a.h".to_owned()),
                Lexeme::Comma,
                Lexeme::Str("b.h".to_owned()),
                Lexeme::Comma,
                Lexeme::RBracket,
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines_skipped() {
        let input = r#"# Copyright header
package(default_visibility = ["//visibility:public"])  # trailing

# between
"#;
        assert_eq!(
            lex(input),
            vec![
                Lexeme::Identifier("package"),
                Lexeme::LParen,
                Lexeme::Identifier("default_visibility"),
                Lexeme::Equals,
                Lexeme::LBracket,
                Lexeme::Str("//visibility:public".to_owned()),
                Lexeme::RBracket,
                Lexeme::RParen,
            ]
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            lex(r#""a\"b\\c\n" 'it\'s'"#),
            vec![
                Lexeme::Str("a\"b\\c\n".to_owned()),
                Lexeme::Str("it's".to_owned()),
            ]
        );
    }

    #[test]
    fn test_triple_quoted() {
        assert_eq!(
            lex("\"\"\"multi\nline \"quoted\" text\"\"\" x"),
            vec![
                Lexeme::Str("multi\nline \"quoted\" text".to_owned()),
                Lexeme::Identifier("x"),
            ]
        );
    }

    #[test]
    fn test_illegal_and_integer() {
        assert_eq!(
            lex("a + 42 . é"),
            vec![
                Lexeme::Identifier("a"),
                Lexeme::Illegal('+'),
                Lexeme::Integer("42"),
                Lexeme::Illegal('.'),
                Lexeme::Illegal('é'),
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("name = \"oops\n", None);
        assert!(lexer.next().unwrap().is_ok());
        assert!(lexer.next().unwrap().is_ok());
        assert_eq!(
            lexer.next().unwrap().unwrap_err(),
            LexerError::UnterminatedString(Pos(7))
        );
    }

    #[test]
    fn test_invalid_escape() {
        let mut lexer = Lexer::new(r#""\q""#, None);
        assert_eq!(
            lexer.next().unwrap().unwrap_err(),
            LexerError::InvalidEscape(Pos(1), 'q')
        );
    }

    #[test]
    fn test_simple_positions() {
        let input = "load(\"x\")\ncc_library(\n    name = 1,\n)";
        let table = &[
            (0, Position::untitled(1, 1)),
            (4, Position::untitled(1, 5)),
            (9, Position::untitled(1, 10)),
            (10, Position::untitled(2, 1)),
            (21, Position::untitled(2, 12)),
            (26, Position::untitled(3, 5)),
            (36, Position::untitled(4, 1)),
        ];

        let mut lexer = Lexer::new(input, None);
        for _ in &mut lexer {}
        for (pos, expected) in table {
            assert_eq!(lexer.to_position(Pos(*pos)), *expected);
        }
        assert_eq!(lexer.retrieve_line(&Position::untitled(3, 5)), "    name = 1,");
    }
}
