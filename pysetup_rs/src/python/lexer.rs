//! Python tokenizer.
//!
//! Produces just enough structure for import extraction: names, dots,
//! brackets, statement separators and indentation. Literals are consumed and
//! collapsed so that text inside strings and comments never looks like code.
//! Along the way it rejects the syntax errors a tokenizer can see.

use super::ParseError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Name(String),
    Number,
    Str,
    Dot,
    Comma,
    Colon,
    Semicolon,
    Star,
    Open(char),
    Close(char),
    Op,
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub fn is_name(&self, text: &str) -> bool {
        matches!(&self.kind, TokenKind::Name(name) if name == text)
    }
}

const STRING_PREFIXES: &[&str] = &[
    "r", "u", "b", "f", "t", "br", "rb", "fr", "rf", "tr", "rt",
];

const TAB_SIZE: usize = 8;

fn is_string_prefix(ident: &str) -> bool {
    let lower = ident.to_ascii_lowercase();
    STRING_PREFIXES.contains(&lower.as_str())
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
    indents: Vec<usize>,
    brackets: Vec<(char, usize)>,
    at_line_start: bool,
    line_has_tokens: bool,
    /// The previous logical line ended with `:` and must be followed by a block.
    expect_block: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            tokens: Vec::new(),
            indents: vec![0],
            brackets: Vec::new(),
            at_line_start: true,
            line_has_tokens: false,
            expect_block: false,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        loop {
            if self.at_line_start && self.brackets.is_empty() {
                if !self.start_line()? {
                    continue;
                }
            }
            let Some(c) = self.peek(0) else {
                break;
            };
            match c {
                '\n' => {
                    self.pos += 1;
                    self.end_physical_line();
                }
                '\r' => {
                    self.pos += 1;
                    if self.peek(0) != Some('\n') {
                        self.end_physical_line();
                    }
                }
                ' ' | '\t' | '\x0c' => self.pos += 1,
                '#' => self.skip_comment(),
                '\\' => self.line_continuation()?,
                '\'' | '"' => self.string()?,
                c if is_ident_start(c) => self.name_or_prefixed_string()?,
                c if c.is_ascii_digit() => self.number(),
                '.' if self.peek(1).is_some_and(|n| n.is_ascii_digit()) => self.number(),
                '.' => self.single(TokenKind::Dot),
                ',' => self.single(TokenKind::Comma),
                ';' => self.single(TokenKind::Semicolon),
                '*' => self.single(TokenKind::Star),
                ':' if self.peek(1) == Some('=') => {
                    self.pos += 1;
                    self.single(TokenKind::Op);
                }
                ':' => self.single(TokenKind::Colon),
                '(' | '[' | '{' => {
                    self.brackets.push((c, self.line));
                    self.single(TokenKind::Open(c));
                }
                ')' | ']' | '}' => self.close_bracket(c)?,
                '$' | '?' | '`' => {
                    return Err(self.error(format!("invalid character '{c}'")));
                }
                _ => self.single(TokenKind::Op),
            }
        }
        self.finish()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(self.line, message)
    }

    fn push(&mut self, kind: TokenKind) {
        if !matches!(kind, TokenKind::Indent | TokenKind::Dedent | TokenKind::Newline) {
            self.line_has_tokens = true;
        }
        self.tokens.push(Token {
            kind,
            line: self.line,
        });
    }

    fn single(&mut self, kind: TokenKind) {
        self.pos += 1;
        self.push(kind);
    }

    /// Measure indentation at the start of a logical line.
    ///
    /// Returns `false` when the line turned out to be blank or comment-only and
    /// the caller should restart the loop.
    fn start_line(&mut self) -> Result<bool, ParseError> {
        let mut width = 0usize;
        while let Some(c) = self.peek(0) {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / TAB_SIZE + 1) * TAB_SIZE,
                '\x0c' => width = 0,
                _ => break,
            }
            self.pos += 1;
        }
        match self.peek(0) {
            None => return Ok(true),
            Some('\n') | Some('\r') => {
                self.pos += 1;
                if self.peek(0) == Some('\n') && self.chars[self.pos - 1] == '\r' {
                    self.pos += 1;
                }
                self.line += 1;
                return Ok(false);
            }
            Some('#') => {
                self.skip_comment();
                return Ok(false);
            }
            Some(_) => {}
        }

        self.at_line_start = false;
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            if !self.expect_block {
                return Err(self.error("unexpected indent"));
            }
            self.indents.push(width);
            self.push(TokenKind::Indent);
        } else {
            if self.expect_block {
                return Err(self.error("expected an indented block"));
            }
            while width < self.indents.last().copied().unwrap_or(0) {
                self.indents.pop();
                self.push(TokenKind::Dedent);
            }
            if width != self.indents.last().copied().unwrap_or(0) {
                return Err(self.error("unindent does not match any outer indentation level"));
            }
        }
        self.expect_block = false;
        Ok(true)
    }

    fn end_physical_line(&mut self) {
        if self.brackets.is_empty() {
            self.end_logical_line();
            self.at_line_start = true;
        }
        self.line += 1;
    }

    fn end_logical_line(&mut self) {
        if self.line_has_tokens {
            self.expect_block = matches!(
                self.tokens.last().map(|t| &t.kind),
                Some(TokenKind::Colon)
            );
            self.push(TokenKind::Newline);
            self.line_has_tokens = false;
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' || c == '\r' {
                break;
            }
            self.pos += 1;
        }
    }

    fn line_continuation(&mut self) -> Result<(), ParseError> {
        self.pos += 1;
        match self.peek(0) {
            None => Err(self.error("unexpected EOF after line continuation character")),
            Some('\r') => {
                self.pos += 1;
                if self.peek(0) == Some('\n') {
                    self.pos += 1;
                }
                self.line += 1;
                Ok(())
            }
            Some('\n') => {
                self.pos += 1;
                self.line += 1;
                Ok(())
            }
            Some(_) => Err(self.error("unexpected character after line continuation character")),
        }
    }

    fn name_or_prefixed_string(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        while self.peek(0).is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        let ident: String = self.chars[start..self.pos].iter().collect();
        if matches!(self.peek(0), Some('\'') | Some('"')) && is_string_prefix(&ident) {
            return self.string();
        }
        self.push(TokenKind::Name(ident));
        Ok(())
    }

    fn number(&mut self) {
        while let Some(c) = self.peek(0) {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                let exponent = matches!(c, 'e' | 'E')
                    && matches!(self.peek(1), Some('+') | Some('-'));
                self.pos += if exponent { 2 } else { 1 };
            } else {
                break;
            }
        }
        self.push(TokenKind::Number);
    }

    /// Consume a string literal starting at an opening quote.
    fn string(&mut self) -> Result<(), ParseError> {
        let start_line = self.line;
        let quote = self.chars[self.pos];
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        loop {
            let Some(c) = self.peek(0) else {
                let message = if triple {
                    "unterminated triple-quoted string literal"
                } else {
                    "unterminated string literal"
                };
                return Err(ParseError::syntax(start_line, message));
            };
            match c {
                '\\' => match (self.peek(1), self.peek(2)) {
                    (Some('\r'), Some('\n')) => {
                        self.line += 1;
                        self.pos += 3;
                    }
                    (Some('\n' | '\r'), _) => {
                        self.line += 1;
                        self.pos += 2;
                    }
                    _ => self.pos += 2,
                },
                '\n' if !triple => {
                    return Err(ParseError::syntax(start_line, "unterminated string literal"));
                }
                '\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                c if c == quote => {
                    if !triple {
                        self.pos += 1;
                        break;
                    }
                    if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                        self.pos += 3;
                        break;
                    }
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        self.push(TokenKind::Str);
        Ok(())
    }

    fn close_bracket(&mut self, close: char) -> Result<(), ParseError> {
        match self.brackets.pop() {
            Some((open, _)) if closer_for(open) == close => {
                self.single(TokenKind::Close(close));
                Ok(())
            }
            Some((open, _)) => Err(self.error(format!(
                "closing parenthesis '{close}' does not match opening parenthesis '{open}'"
            ))),
            None => Err(self.error(format!("unmatched '{close}'"))),
        }
    }

    fn finish(mut self) -> Result<Vec<Token>, ParseError> {
        if let Some((open, line)) = self.brackets.first().copied() {
            return Err(ParseError::syntax(line, format!("'{open}' was never closed")));
        }
        self.end_logical_line();
        if self.expect_block {
            return Err(self.error("expected an indented block"));
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent);
        }
        self.push(TokenKind::Eof);
        Ok(self.tokens)
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).tokenize()
}
