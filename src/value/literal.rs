//! Parser for settings saved as Python literal text
//!
//! Accepts the literal subset of Python expressions: numbers, strings and
//! bytes (with prefixes, escapes and implicit concatenation), `True`,
//! `False`, `None`, lists, tuples, sets and dicts. Nothing is evaluated.

use crate::errors::{Result, literal_syntax_error};

use super::{MAX_DEPTH, PyValue};

/// Parses a complete literal expression
pub fn parse_literal(text: &str) -> Result<PyValue> {
    let mut parser = LiteralParser {
        chars: text.chars().collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.parse_value()?;
    parser.skip_trivia();
    if parser.pos < parser.chars.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

enum StringPart {
    Text(String),
    Bytes(Vec<u8>),
}

impl LiteralParser {
    fn error(&self, detail: &str) -> crate::errors::Error {
        literal_syntax_error(self.pos, detail)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '\\' && matches!(self.peek_at(1), Some('\n')) {
                self.pos += 2;
            } else if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_trivia();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            _ => Err(literal_syntax_error(
                self.pos.saturating_sub(1),
                &format!("expected '{expected}'"),
            )),
        }
    }

    fn parse_value(&mut self) -> Result<PyValue> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        let value = self.parse_value_inner();
        self.depth -= 1;
        value
    }

    fn parse_value_inner(&mut self) -> Result<PyValue> {
        self.skip_trivia();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('{') => self.parse_braces(),
            Some('[') => {
                self.pos += 1;
                Ok(PyValue::List(self.parse_items(']')?.0))
            }
            Some('(') => self.parse_parens(),
            Some('-') | Some('+') => {
                let negative = self.bump() == Some('-');
                self.skip_trivia();
                match self.parse_value()? {
                    PyValue::Int(i) if negative => i
                        .checked_neg()
                        .map(PyValue::Int)
                        .ok_or_else(|| self.error("integer out of range")),
                    PyValue::Float(f) if negative => Ok(PyValue::Float(-f)),
                    number @ (PyValue::Int(_) | PyValue::Float(_)) => Ok(number),
                    _ => Err(self.error("unary sign applied to a non-number")),
                }
            }
            Some(c) if c.is_ascii_digit() => self.parse_number(),
            Some('.') if matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) => {
                self.parse_number()
            }
            Some('\'') | Some('"') => self.parse_strings(),
            Some(c) if c.is_alphabetic() || c == '_' => {
                if self.string_prefix_len().is_some() {
                    return self.parse_strings();
                }
                let word = self.read_identifier();
                match word.as_str() {
                    "True" => Ok(PyValue::Bool(true)),
                    "False" => Ok(PyValue::Bool(false)),
                    "None" => Ok(PyValue::None),
                    _ => Err(literal_syntax_error(
                        self.pos - word.chars().count(),
                        &format!("'{word}' is not a literal"),
                    )),
                }
            }
            Some(c) => Err(self.error(&format!("unexpected character '{c}'"))),
        }
    }

    /// Comma separated values up to `close`; reports whether a comma was seen
    fn parse_items(&mut self, close: char) -> Result<(Vec<PyValue>, bool)> {
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok((items, saw_comma));
            }
            items.push(self.parse_value()?);
            self.skip_trivia();
            match self.bump() {
                Some(',') => saw_comma = true,
                Some(c) if c == close => return Ok((items, saw_comma)),
                _ => {
                    return Err(literal_syntax_error(
                        self.pos.saturating_sub(1),
                        &format!("expected ',' or '{close}'"),
                    ));
                }
            }
        }
    }

    fn parse_parens(&mut self) -> Result<PyValue> {
        self.pos += 1;
        let (mut items, saw_comma) = self.parse_items(')')?;
        if items.len() == 1 && !saw_comma {
            return Ok(items.remove(0));
        }
        Ok(PyValue::Tuple(items))
    }

    fn parse_braces(&mut self) -> Result<PyValue> {
        self.pos += 1;
        self.skip_trivia();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(PyValue::Dict(Vec::new()));
        }

        let first = self.parse_value()?;
        self.skip_trivia();
        if self.peek() != Some(':') {
            let mut items = vec![first];
            match self.bump() {
                Some('}') => return Ok(PyValue::Set(items)),
                Some(',') => {}
                _ => return Err(self.error("expected ',', ':' or '}'")),
            }
            items.extend(self.parse_items('}')?.0);
            return Ok(PyValue::Set(items));
        }

        self.pos += 1;
        let value = self.parse_value()?;
        let mut entries = vec![(first, value)];
        loop {
            self.skip_trivia();
            match self.bump() {
                Some('}') => break,
                Some(',') => {
                    self.skip_trivia();
                    if self.peek() == Some('}') {
                        self.pos += 1;
                        break;
                    }
                    let key = self.parse_value()?;
                    self.expect(':')?;
                    let value = self.parse_value()?;
                    entries.push((key, value));
                }
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
        Ok(PyValue::Dict(entries))
    }

    fn read_identifier(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_number(&mut self) -> Result<PyValue> {
        let start = self.pos;
        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('x') | Some('X') => Some(16),
                Some('o') | Some('O') => Some(8),
                Some('b') | Some('B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.pos += 2;
                let digits = self.take_digits(|c| c.is_digit(radix));
                return i64::from_str_radix(&digits, radix)
                    .map(PyValue::Int)
                    .map_err(|_| literal_syntax_error(start, "invalid integer literal"));
            }
        }

        let mut text = self.take_digits(|c| c.is_ascii_digit());
        let mut is_float = false;
        if self.peek() == Some('.') {
            self.pos += 1;
            is_float = true;
            text.push('.');
            text.push_str(&self.take_digits(|c| c.is_ascii_digit()));
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            self.pos += 1;
            text.push('e');
            if let Some(sign @ ('+' | '-')) = self.peek() {
                self.pos += 1;
                text.push(sign);
            }
            let exponent = self.take_digits(|c| c.is_ascii_digit());
            if exponent.is_empty() {
                return Err(literal_syntax_error(start, "invalid float exponent"));
            }
            text.push_str(&exponent);
        }
        if matches!(self.peek(), Some('j') | Some('J')) {
            return Err(self.error("complex numbers are not supported"));
        }

        if is_float {
            text.parse::<f64>()
                .map(PyValue::Float)
                .map_err(|_| literal_syntax_error(start, "invalid float literal"))
        } else {
            text.parse::<i64>()
                .map(PyValue::Int)
                .map_err(|_| literal_syntax_error(start, "invalid integer literal"))
        }
    }

    /// Digits accepted by `is_digit`, with single underscores between them removed
    fn take_digits(&mut self, is_digit: impl Fn(char) -> bool) -> String {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if is_digit(c) {
                digits.push(c);
                self.pos += 1;
            } else if c == '_' && matches!(self.peek_at(1), Some(next) if is_digit(next)) {
                self.pos += 1;
            } else {
                break;
            }
        }
        digits
    }

    /// Length of a string prefix (`r`, `b`, `u`, `rb`, `br`) directly followed by a quote
    fn string_prefix_len(&self) -> Option<usize> {
        let mut len = 0;
        while let Some(c) = self.peek_at(len) {
            if matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U') && len < 2 {
                len += 1;
            } else {
                break;
            }
        }
        match self.peek_at(len) {
            Some('\'') | Some('"') if len > 0 => {
                let prefix: String = self.chars[self.pos..self.pos + len]
                    .iter()
                    .collect::<String>()
                    .to_lowercase();
                matches!(prefix.as_str(), "r" | "b" | "u" | "rb" | "br").then_some(len)
            }
            _ => None,
        }
    }

    /// One or more adjacent string literals, concatenated
    fn parse_strings(&mut self) -> Result<PyValue> {
        let mut result = self.parse_string_part()?;
        loop {
            let checkpoint = self.pos;
            self.skip_trivia();
            let starts_string = match self.peek() {
                Some('\'') | Some('"') => true,
                Some(_) => self.string_prefix_len().is_some(),
                None => false,
            };
            if !starts_string {
                self.pos = checkpoint;
                break;
            }
            match (&mut result, self.parse_string_part()?) {
                (StringPart::Text(text), StringPart::Text(more)) => text.push_str(&more),
                (StringPart::Bytes(bytes), StringPart::Bytes(more)) => bytes.extend(more),
                _ => return Err(self.error("cannot mix bytes and text literals")),
            }
        }
        Ok(match result {
            StringPart::Text(text) => PyValue::Str(text),
            StringPart::Bytes(bytes) => PyValue::Bytes(bytes),
        })
    }

    fn parse_string_part(&mut self) -> Result<StringPart> {
        let start = self.pos;
        let prefix_len = self.string_prefix_len().unwrap_or(0);
        let prefix: String = self.chars[self.pos..self.pos + prefix_len]
            .iter()
            .collect::<String>()
            .to_lowercase();
        self.pos += prefix_len;
        let raw = prefix.contains('r');
        let is_bytes = prefix.contains('b');

        let quote = self.bump().ok_or_else(|| self.error("expected a quote"))?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        let mut bytes = Vec::new();
        loop {
            let c = self
                .bump()
                .ok_or_else(|| literal_syntax_error(start, "unterminated string"))?;
            if c == quote {
                if !triple {
                    break;
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.pos += 2;
                    break;
                }
            }
            if c == '\n' && !triple {
                return Err(literal_syntax_error(start, "unterminated string"));
            }

            if c != '\\' || raw {
                if raw && c == '\\' {
                    // a raw string still cannot end with an escaped quote
                    if let Some(next) = self.bump() {
                        push_char(&mut out, &mut bytes, is_bytes, '\\', start)?;
                        push_char(&mut out, &mut bytes, is_bytes, next, start)?;
                        continue;
                    }
                }
                push_char(&mut out, &mut bytes, is_bytes, c, start)?;
                continue;
            }

            let escape = self
                .bump()
                .ok_or_else(|| literal_syntax_error(start, "unterminated string"))?;
            match escape {
                '\n' => {}
                '\\' | '\'' | '"' => push_char(&mut out, &mut bytes, is_bytes, escape, start)?,
                'n' => push_char(&mut out, &mut bytes, is_bytes, '\n', start)?,
                't' => push_char(&mut out, &mut bytes, is_bytes, '\t', start)?,
                'r' => push_char(&mut out, &mut bytes, is_bytes, '\r', start)?,
                'a' => push_char(&mut out, &mut bytes, is_bytes, '\x07', start)?,
                'b' => push_char(&mut out, &mut bytes, is_bytes, '\x08', start)?,
                'f' => push_char(&mut out, &mut bytes, is_bytes, '\x0c', start)?,
                'v' => push_char(&mut out, &mut bytes, is_bytes, '\x0b', start)?,
                '0'..='7' => {
                    let mut code = escape.to_digit(8).unwrap_or(0);
                    for _ in 0..2 {
                        match self.peek().and_then(|d| d.to_digit(8)) {
                            Some(d) => {
                                code = code * 8 + d;
                                self.pos += 1;
                            }
                            None => break,
                        }
                    }
                    self.push_code(&mut out, &mut bytes, is_bytes, code)?;
                }
                'x' => {
                    let code = self.read_hex(2)?;
                    self.push_code(&mut out, &mut bytes, is_bytes, code)?;
                }
                'u' if !is_bytes => {
                    let code = self.read_hex(4)?;
                    self.push_code(&mut out, &mut bytes, is_bytes, code)?;
                }
                'U' if !is_bytes => {
                    let code = self.read_hex(8)?;
                    self.push_code(&mut out, &mut bytes, is_bytes, code)?;
                }
                other => {
                    // unknown escapes are kept verbatim
                    push_char(&mut out, &mut bytes, is_bytes, '\\', start)?;
                    push_char(&mut out, &mut bytes, is_bytes, other, start)?;
                }
            }
        }

        Ok(if is_bytes {
            StringPart::Bytes(bytes)
        } else {
            StringPart::Text(out)
        })
    }

    fn read_hex(&mut self, count: usize) -> Result<u32> {
        let start = self.pos;
        let mut code = 0u32;
        for _ in 0..count {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| literal_syntax_error(start, "truncated escape sequence"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn push_code(&self, out: &mut String, bytes: &mut Vec<u8>, is_bytes: bool, code: u32) -> Result<()> {
        if is_bytes {
            let byte = u8::try_from(code).map_err(|_| self.error("byte escape out of range"))?;
            bytes.push(byte);
        } else {
            let c = char::from_u32(code).ok_or_else(|| self.error("invalid code point"))?;
            out.push(c);
        }
        Ok(())
    }
}

fn push_char(out: &mut String, bytes: &mut Vec<u8>, is_bytes: bool, c: char, start: usize) -> Result<()> {
    if is_bytes {
        if !c.is_ascii() {
            return Err(literal_syntax_error(start, "bytes can only contain ASCII characters"));
        }
        bytes.push(c as u8);
    } else {
        out.push(c);
    }
    Ok(())
}
