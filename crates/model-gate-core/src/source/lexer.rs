// crates/model-gate-core/src/source/lexer.rs
// ============================================================================
// Module: Model Gate Source Lexer
// Description: Indentation-aware tokenizer for interpreted model source.
// Purpose: Produce a token stream with logical-line and block structure.
// Dependencies: crate::source::syntax
// ============================================================================

//! ## Overview
//! The lexer turns source text into tokens carrying their starting line. It
//! tracks bracket depth so that newlines inside brackets do not end a logical
//! line, and it emits `Indent`/`Dedent` tokens from an indentation stack the
//! way the language's own tokenizer does. String literals are not evaluated;
//! interpolated expressions inside formatted strings are captured as raw text
//! so the parser can parse them in turn.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::source::syntax::SourceSyntaxError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tab stop used when measuring indentation.
const TAB_WIDTH: usize = 8;

/// Operators, longest first so greedy matching picks the right token.
const OPERATORS: [&str; 47] = [
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "==", "!=", "<=", ">=", "**", "//", "<<", ">>",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@", "&", "|",
    "^", "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ";", ".", "=",
];

// ============================================================================
// SECTION: Tokens
// ============================================================================

/// An interpolated expression captured from a formatted string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolation {
    /// Raw expression text.
    pub text: String,
    /// Line the expression starts on.
    pub line: usize,
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Name(String),
    /// Numeric literal.
    Number,
    /// String literal with any captured interpolations.
    Str(Vec<Interpolation>),
    /// Operator or delimiter.
    Op(&'static str),
    /// End of a logical line.
    Newline,
    /// Indentation increased.
    Indent,
    /// Indentation decreased.
    Dedent,
    /// End of input.
    EndOfFile,
}

/// A token and the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// One-based line number.
    pub line: usize,
}

// ============================================================================
// SECTION: Lexer
// ============================================================================

/// Tokenizes `source`, numbering lines from `first_line`.
///
/// # Errors
///
/// Returns [`SourceSyntaxError`] for unterminated strings, unbalanced
/// brackets, inconsistent dedents, and characters outside the grammar.
pub fn tokenize(source: &str, first_line: usize) -> Result<Vec<Token>, SourceSyntaxError> {
    Lexer::new(source, first_line).run()
}

/// Lexer state over one source text.
struct Lexer {
    /// Source characters.
    chars: Vec<char>,
    /// Cursor into `chars`.
    pos: usize,
    /// Current line number.
    line: usize,
    /// Open brackets with the line each opened on.
    brackets: Vec<(char, usize)>,
    /// Indentation widths of enclosing blocks.
    indents: Vec<usize>,
    /// True at the start of a physical line outside brackets.
    at_line_start: bool,
    /// Tokens produced so far.
    tokens: Vec<Token>,
}

impl Lexer {
    /// Creates a lexer at the start of `source`.
    fn new(source: &str, first_line: usize) -> Self {
        Self {
            chars: source.strip_prefix('\u{feff}').unwrap_or(source).chars().collect(),
            pos: 0,
            line: first_line,
            brackets: Vec::new(),
            indents: vec![0],
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    /// Returns the character `offset` positions ahead of the cursor.
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Pushes a token at the current line.
    fn push(&mut self, kind: TokenKind, line: usize) {
        self.tokens.push(Token {
            kind,
            line,
        });
    }

    /// Returns true when the last token ends a logical line (or nothing was emitted).
    fn after_logical_line(&self) -> bool {
        self.tokens.last().is_none_or(|token| {
            matches!(token.kind, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent)
        })
    }

    /// Runs the lexer to completion.
    fn run(mut self) -> Result<Vec<Token>, SourceSyntaxError> {
        while self.pos < self.chars.len() {
            if self.at_line_start && self.brackets.is_empty() {
                self.measure_indentation()?;
                if self.pos >= self.chars.len() {
                    break;
                }
            }
            let Some(ch) = self.peek(0) else {
                break;
            };
            match ch {
                '\n' => {
                    self.pos += 1;
                    if self.brackets.is_empty() && !self.after_logical_line() {
                        self.push(TokenKind::Newline, self.line);
                    }
                    self.line += 1;
                    self.at_line_start = self.brackets.is_empty();
                }
                '\r' | ' ' | '\t' | '\x0c' => self.pos += 1,
                '#' => self.skip_comment(),
                '\\' => self.line_continuation()?,
                _ if ch.is_ascii_digit()
                    || (ch == '.' && self.peek(1).is_some_and(|next| next.is_ascii_digit())) =>
                {
                    self.number();
                }
                _ if is_identifier_start(ch) => self.name_or_string()?,
                '"' | '\'' => self.string(false)?,
                _ => self.operator(ch)?,
            }
        }
        self.finish()
    }

    /// Measures leading whitespace and emits `Indent`/`Dedent` tokens.
    fn measure_indentation(&mut self) -> Result<(), SourceSyntaxError> {
        loop {
            let mut width = 0usize;
            while let Some(ch) = self.peek(0) {
                match ch {
                    ' ' => width += 1,
                    '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                    '\x0c' => width = 0,
                    _ => break,
                }
                self.pos += 1;
            }
            match self.peek(0) {
                None => return Ok(()),
                Some('#') => {
                    self.skip_comment();
                    self.skip_newline();
                }
                Some('\r' | '\n') => self.skip_newline(),
                Some(_) => {
                    self.at_line_start = false;
                    return self.apply_indentation(width);
                }
            }
        }
    }

    /// Consumes one line break on a blank or comment-only line.
    fn skip_newline(&mut self) {
        if self.peek(0) == Some('\r') {
            self.pos += 1;
        }
        if self.peek(0) == Some('\n') {
            self.pos += 1;
            self.line += 1;
        }
    }

    /// Compares `width` with the indentation stack.
    fn apply_indentation(&mut self, width: usize) -> Result<(), SourceSyntaxError> {
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.push(TokenKind::Indent, self.line);
            return Ok(());
        }
        while self.indents.last().is_some_and(|level| *level > width) {
            self.indents.pop();
            self.push(TokenKind::Dedent, self.line);
        }
        if self.indents.last().copied().unwrap_or(0) != width {
            return Err(SourceSyntaxError::new(
                self.line,
                "unindent does not match any outer indentation level",
            ));
        }
        Ok(())
    }

    /// Skips a comment up to (not including) the line break.
    fn skip_comment(&mut self) {
        while self.peek(0).is_some_and(|ch| ch != '\n' && ch != '\r') {
            self.pos += 1;
        }
    }

    /// Handles an explicit backslash line continuation.
    fn line_continuation(&mut self) -> Result<(), SourceSyntaxError> {
        self.pos += 1;
        if self.peek(0) == Some('\r') {
            self.pos += 1;
        }
        if self.peek(0) == Some('\n') {
            self.pos += 1;
            self.line += 1;
            return Ok(());
        }
        Err(SourceSyntaxError::new(
            self.line,
            "unexpected character after line continuation character",
        ))
    }

    /// Consumes a numeric literal.
    fn number(&mut self) {
        let line = self.line;
        let mut previous = '\0';
        while let Some(ch) = self.peek(0) {
            let exponent_sign = (ch == '+' || ch == '-') && matches!(previous, 'e' | 'E');
            if !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' || exponent_sign) {
                break;
            }
            previous = ch;
            self.pos += 1;
        }
        self.push(TokenKind::Number, line);
    }

    /// Consumes an identifier, or a prefixed string literal such as `f"..."`.
    fn name_or_string(&mut self) -> Result<(), SourceSyntaxError> {
        let start = self.pos;
        while self.peek(0).is_some_and(is_identifier_continue) {
            self.pos += 1;
        }
        let word: String = self.chars[start .. self.pos].iter().collect();
        if matches!(self.peek(0), Some('"' | '\'')) && is_string_prefix(&word) {
            let formatted = word.to_ascii_lowercase().contains('f');
            return self.string(formatted);
        }
        self.push(TokenKind::Name(word), self.line);
        Ok(())
    }

    /// Consumes a string literal whose quote starts at the cursor.
    fn string(&mut self, formatted: bool) -> Result<(), SourceSyntaxError> {
        let line = self.line;
        let Some(quote) = self.peek(0) else {
            return Err(SourceSyntaxError::new(line, "unterminated string literal"));
        };
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };
        let mut body = String::new();
        loop {
            let Some(ch) = self.peek(0) else {
                let message = if triple {
                    "unterminated triple-quoted string literal"
                } else {
                    "unterminated string literal"
                };
                return Err(SourceSyntaxError::new(line, message));
            };
            if ch == '\\' {
                body.push(ch);
                self.pos += 1;
                if let Some(next) = self.peek(0) {
                    if next == '\n' {
                        self.line += 1;
                    }
                    body.push(next);
                    self.pos += 1;
                }
                continue;
            }
            if ch == quote {
                if !triple {
                    self.pos += 1;
                    break;
                }
                if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                    self.pos += 3;
                    break;
                }
            }
            if ch == '\n' {
                if !triple {
                    return Err(SourceSyntaxError::new(line, "unterminated string literal"));
                }
                self.line += 1;
            }
            body.push(ch);
            self.pos += 1;
        }
        let interpolations = if formatted { interpolations(&body, line)? } else { Vec::new() };
        self.push(TokenKind::Str(interpolations), line);
        Ok(())
    }

    /// Consumes an operator or delimiter.
    fn operator(&mut self, ch: char) -> Result<(), SourceSyntaxError> {
        let line = self.line;
        let Some(op) = OPERATORS.iter().copied().find(|op| {
            op.chars().enumerate().all(|(offset, expected)| self.peek(offset) == Some(expected))
        }) else {
            return Err(SourceSyntaxError::new(line, format!("invalid character '{ch}'")));
        };
        self.pos += op.chars().count();
        match op {
            "(" | "[" | "{" => self.brackets.push((ch, line)),
            ")" | "]" | "}" => {
                let Some((open, _)) = self.brackets.pop() else {
                    return Err(SourceSyntaxError::new(line, format!("unmatched '{op}'")));
                };
                if closing_for(open) != ch {
                    return Err(SourceSyntaxError::new(
                        line,
                        format!(
                            "closing parenthesis '{ch}' does not match opening parenthesis '{open}'"
                        ),
                    ));
                }
            }
            _ => {}
        }
        self.push(TokenKind::Op(op), line);
        Ok(())
    }

    /// Emits the trailing newline, closing dedents, and end-of-file.
    fn finish(mut self) -> Result<Vec<Token>, SourceSyntaxError> {
        if let Some((open, line)) = self.brackets.first().copied() {
            return Err(SourceSyntaxError::new(line, format!("'{open}' was never closed")));
        }
        if !self.after_logical_line() {
            self.push(TokenKind::Newline, self.line);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, self.line);
        }
        self.push(TokenKind::EndOfFile, self.line);
        Ok(self.tokens)
    }
}

// ============================================================================
// SECTION: Formatted Strings
// ============================================================================

/// Extracts interpolated expressions from a formatted-string body.
fn interpolations(body: &str, first_line: usize) -> Result<Vec<Interpolation>, SourceSyntaxError> {
    let chars: Vec<char> = body.chars().collect();
    let mut found = Vec::new();
    let mut line = first_line;
    let mut index = 0usize;
    while index < chars.len() {
        let ch = chars[index];
        if ch == '\n' {
            line += 1;
        }
        if ch == '{' && chars.get(index + 1) == Some(&'{') {
            index += 2;
            continue;
        }
        if ch != '{' {
            index += 1;
            continue;
        }
        let start_line = line;
        let (text, next) = interpolation_text(&chars, index + 1, start_line)?;
        line += text.matches('\n').count();
        found.push(Interpolation {
            text,
            line: start_line,
        });
        index = next;
    }
    Ok(found)
}

/// Reads one replacement field starting after `{`; returns the expression text
/// and the index after the closing `}`.
fn interpolation_text(
    chars: &[char],
    start: usize,
    line: usize,
) -> Result<(String, usize), SourceSyntaxError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut expression_end: Option<usize> = None;
    let mut index = start;
    while let Some(&ch) = chars.get(index) {
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            index += 1;
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '}' if depth > 0 => depth -= 1,
            '}' => {
                let end = expression_end.unwrap_or(index);
                let text: String = chars[start .. end].iter().collect();
                return Ok((strip_self_documenting(&text), index + 1));
            }
            '!' if depth == 0 && expression_end.is_none() && chars.get(index + 1) != Some(&'=') => {
                expression_end = Some(index);
            }
            ':' if depth == 0 && expression_end.is_none() => expression_end = Some(index),
            _ => {}
        }
        index += 1;
    }
    Err(SourceSyntaxError::new(line, "f-string: expecting '}'"))
}

/// Removes a trailing self-documenting `=` from an interpolation.
fn strip_self_documenting(text: &str) -> String {
    let trimmed = text.trim_end();
    let comparison = ["==", "!=", "<=", ">="].iter().any(|op| trimmed.ends_with(op));
    match trimmed.strip_suffix('=') {
        Some(stripped) if !comparison => stripped.to_string(),
        _ => text.to_string(),
    }
}

// ============================================================================
// SECTION: Character Classes
// ============================================================================

/// Returns true for characters that may start an identifier.
fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

/// Returns true for characters that may continue an identifier.
fn is_identifier_continue(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

/// Returns true when `word` is a valid string prefix.
fn is_string_prefix(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    matches!(lower.as_str(), "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf")
}

/// Returns the closing bracket for an opening bracket.
const fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}
