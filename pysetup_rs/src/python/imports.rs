//! Import statement parsing over the token stream.
//!
//! Statements are split on logical newlines and `;`. A compound statement
//! header (`if x:`, `try:`, `def f():` ...) may carry a simple statement on the
//! same line, so the text after its colon is parsed again as a statement.

use super::ParseError;
use super::lexer::{Token, TokenKind};
use crate::types::ImportRecord;

/// `match` and `case` are soft keywords: as plain identifiers they never
/// reach a header colon, or the text after it is not an import.
const COMPOUND_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "try", "except", "finally", "for", "while", "with", "def", "class",
    "async", "match", "case",
];

/// Hard keywords; none of them can be a module or symbol name.
const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Walk the token stream and collect import records in declaration order.
pub fn collect_imports(tokens: &[Token]) -> Result<Vec<ImportRecord>, ParseError> {
    let mut records = Vec::new();
    let mut segment: Vec<&Token> = Vec::new();
    let mut depth = 0usize;

    for token in tokens {
        match &token.kind {
            TokenKind::Indent | TokenKind::Dedent => {}
            TokenKind::Newline | TokenKind::Eof => {
                parse_statement(&segment, &mut records)?;
                segment.clear();
                depth = 0;
            }
            TokenKind::Semicolon if depth == 0 => {
                parse_statement(&segment, &mut records)?;
                segment.clear();
            }
            kind => {
                match kind {
                    TokenKind::Open(_) => depth += 1,
                    TokenKind::Close(_) => depth = depth.saturating_sub(1),
                    _ => {}
                }
                segment.push(token);
            }
        }
    }
    Ok(records)
}

fn parse_statement(tokens: &[&Token], records: &mut Vec<ImportRecord>) -> Result<(), ParseError> {
    let Some(first) = tokens.first() else {
        return Ok(());
    };
    match &first.kind {
        TokenKind::Name(kw) if kw == "import" => {
            StatementParser::new(tokens, 1).import_names(records)
        }
        TokenKind::Name(kw) if kw == "from" => StatementParser::new(tokens, 1).from_import(records),
        TokenKind::Name(kw) if COMPOUND_KEYWORDS.contains(&kw.as_str()) => {
            match header_colon(tokens) {
                Some(idx) => parse_statement(&tokens[idx + 1..], records),
                None => Ok(()),
            }
        }
        _ => Ok(()),
    }
}

/// Index of the colon that ends a compound statement header.
fn header_colon(tokens: &[&Token]) -> Option<usize> {
    let mut depth = 0usize;
    let mut lambdas = 0usize;
    for (idx, token) in tokens.iter().enumerate() {
        match &token.kind {
            TokenKind::Open(_) => depth += 1,
            TokenKind::Close(_) => depth = depth.saturating_sub(1),
            TokenKind::Name(name) if depth == 0 && name == "lambda" => lambdas += 1,
            TokenKind::Colon if depth == 0 && lambdas > 0 => lambdas -= 1,
            TokenKind::Colon if depth == 0 => return Some(idx),
            _ => {}
        }
    }
    None
}

struct StatementParser<'t> {
    tokens: &'t [&'t Token],
    pos: usize,
}

impl<'t> StatementParser<'t> {
    fn new(tokens: &'t [&'t Token], pos: usize) -> Self {
        Self { tokens, pos }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last().copied())
            .map(|t| t.line)
            .unwrap_or(0)
    }

    fn error(&self, what: &str) -> ParseError {
        ParseError::syntax(self.line(), format!("invalid syntax in {what}"))
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| &t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_name(&mut self, text: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_name(text)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn identifier(&mut self) -> Option<String> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Name(name)) if !KEYWORDS.contains(&name.as_str()) => {
                self.pos += 1;
                Some(name.clone())
            }
            _ => None,
        }
    }

    fn dotted_name(&mut self) -> Option<String> {
        let mut path = self.identifier()?;
        while self.peek().is_some_and(|t| t.kind == TokenKind::Dot) {
            self.pos += 1;
            let segment = self.identifier()?;
            path.push('.');
            path.push_str(&segment);
        }
        Some(path)
    }

    /// Optional `as alias`; the alias itself is not recorded.
    fn alias(&mut self, what: &str) -> Result<(), ParseError> {
        if self.eat_name("as") && self.identifier().is_none() {
            return Err(self.error(what));
        }
        Ok(())
    }

    /// `import a.b as c, d`
    fn import_names(mut self, records: &mut Vec<ImportRecord>) -> Result<(), ParseError> {
        const WHAT: &str = "import statement";
        loop {
            let module = self.dotted_name().ok_or_else(|| self.error(WHAT))?;
            self.alias(WHAT)?;
            records.push(module);
            if self.at_end() {
                return Ok(());
            }
            if !self.eat(&TokenKind::Comma) {
                return Err(self.error(WHAT));
            }
        }
    }

    /// `from [dots]module import names | (names) | *`
    fn from_import(mut self, records: &mut Vec<ImportRecord>) -> Result<(), ParseError> {
        const WHAT: &str = "from-import statement";
        let mut dots = 0usize;
        while self.eat(&TokenKind::Dot) {
            dots += 1;
        }
        let module = if self.peek().is_some_and(|t| t.is_name("import")) {
            None
        } else {
            Some(self.dotted_name().ok_or_else(|| self.error(WHAT))?)
        };
        if dots == 0 && module.is_none() {
            return Err(self.error(WHAT));
        }
        if !self.eat_name("import") {
            return Err(self.error(WHAT));
        }

        let prefix = match &module {
            Some(module) => format!("{}{}.", ".".repeat(dots), module),
            None => ".".repeat(dots),
        };

        if self.eat(&TokenKind::Star) {
            if !self.at_end() {
                return Err(self.error(WHAT));
            }
            records.push(format!("{prefix}*"));
            return Ok(());
        }

        let parenthesized = self.eat(&TokenKind::Open('('));
        let mut symbols = Vec::new();
        loop {
            let symbol = self.identifier().ok_or_else(|| self.error(WHAT))?;
            self.alias(WHAT)?;
            symbols.push(symbol);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            // A trailing comma is only allowed inside parentheses.
            if parenthesized && self.peek().is_some_and(|t| t.kind == TokenKind::Close(')')) {
                break;
            }
        }
        if parenthesized && !self.eat(&TokenKind::Close(')')) {
            return Err(self.error(WHAT));
        }
        if !self.at_end() {
            return Err(self.error(WHAT));
        }

        records.extend(symbols.into_iter().map(|symbol| format!("{prefix}{symbol}")));
        Ok(())
    }
}
