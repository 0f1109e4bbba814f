// crates/model-gate-core/src/source/parser.rs
// ============================================================================
// Module: Model Gate Source Parser
// Description: Recursive-descent parser from tokens to the syntax tree.
// Purpose: Build the tagged tree the contract check and scanner walk.
// Dependencies: crate::source::{lexer, syntax}
// ============================================================================

//! ## Overview
//! The parser recognises statement structure exactly (blocks, imports,
//! definitions, decorators, compound headers) and expression structure as far
//! as the checks need it: primaries with attribute, call, and subscript
//! trailers. Operators and keywords inside expressions only separate
//! operands, so a binary expression becomes a group of its operands.
//! Interpolations inside formatted strings are parsed recursively.
//! Invariants:
//! - Every reported error carries the line it was detected on.
//! - Two operands with nothing between them are rejected.
//! - Nesting (blocks, brackets, trailers, interpolations) is bounded by
//!   [`MAX_NESTING_DEPTH`], so the tree depth is bounded too.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::source::lexer::Interpolation;
use crate::source::lexer::Token;
use crate::source::lexer::TokenKind;
use crate::source::lexer::tokenize;
use crate::source::syntax::Expr;
use crate::source::syntax::ImportedModule;
use crate::source::syntax::Module;
use crate::source::syntax::SourceSyntaxError;
use crate::source::syntax::Stmt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Reserved words.
const KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

/// Keywords that open a compound statement header.
const COMPOUND_KEYWORDS: [&str; 10] =
    ["if", "elif", "else", "while", "for", "try", "except", "finally", "with", "async"];

/// Soft keywords that open a compound statement when the line ends in `:`.
const SOFT_COMPOUND_KEYWORDS: [&str; 2] = ["match", "case"];

/// Keywords that may never appear inside an expression.
const STATEMENT_ONLY_KEYWORDS: [&str; 3] = ["import", "class", "def"];

/// Message used for structurally invalid input.
const INVALID_SYNTAX: &str = "invalid syntax";

/// Deepest nesting of blocks, brackets, trailers, and interpolations accepted.
pub const MAX_NESTING_DEPTH: usize = 200;

/// Message used when input nests past [`MAX_NESTING_DEPTH`].
const TOO_DEEP: &str = "too many nesting levels";

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Parses a complete module.
///
/// # Errors
///
/// Returns [`SourceSyntaxError`] with the offending line when the source is
/// not well formed.
pub fn parse_module(source: &str) -> Result<Module, SourceSyntaxError> {
    let mut parser = Parser::new(tokenize(source, 1)?, 0);
    let mut body = Vec::new();
    loop {
        match parser.peek().kind {
            TokenKind::EndOfFile => break,
            TokenKind::Newline => parser.advance(),
            TokenKind::Dedent => {
                return Err(SourceSyntaxError::new(
                    parser.peek().line,
                    "unindent does not match any outer indentation level",
                ));
            }
            _ => parser.statement(&mut body)?,
        }
    }
    Ok(Module {
        body,
    })
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Token cursor.
struct Parser {
    /// Tokens ending in `EndOfFile`.
    tokens: Vec<Token>,
    /// Cursor.
    pos: usize,
    /// Current nesting level.
    depth: usize,
}

/// Placeholder returned past the end of the token list.
static END: Token = Token {
    kind: TokenKind::EndOfFile,
    line: 0,
};

impl Parser {
    /// Creates a parser over `tokens`.
    const fn new(tokens: Vec<Token>, depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth,
        }
    }

    /// Returns the current token.
    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    /// Returns the token `offset` ahead.
    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).or_else(|| self.tokens.last()).unwrap_or(&END)
    }

    /// Advances past the current token.
    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Returns true when the current token is the operator `op`.
    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek().kind, TokenKind::Op(current) if current == op)
    }

    /// Returns true when the current token is the word `word`.
    fn at_word(&self, word: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Name(current) if current == word)
    }

    /// Builds an error at the current token.
    fn error(&self, message: &str) -> SourceSyntaxError {
        SourceSyntaxError::new(self.peek().line, message)
    }

    /// Enters one nesting level.
    fn descend(&mut self) -> Result<(), SourceSyntaxError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error(TOO_DEEP));
        }
        self.depth += 1;
        Ok(())
    }

    /// Leaves `levels` nesting levels.
    const fn ascend(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    /// Consumes the operator `op` or fails with `message`.
    fn expect_op(&mut self, op: &str, message: &str) -> Result<(), SourceSyntaxError> {
        if self.at_op(op) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    /// Consumes an identifier.
    fn expect_name(&mut self) -> Result<(String, usize), SourceSyntaxError> {
        match &self.peek().kind {
            TokenKind::Name(name) if !is_keyword(name) => {
                let found = (name.clone(), self.peek().line);
                self.advance();
                Ok(found)
            }
            _ => Err(self.error(INVALID_SYNTAX)),
        }
    }

    /// Consumes the end of a logical line.
    fn end_of_line(&mut self) -> Result<(), SourceSyntaxError> {
        match self.peek().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::EndOfFile | TokenKind::Dedent => Ok(()),
            _ => Err(self.error(INVALID_SYNTAX)),
        }
    }

    /// Returns true when the current logical line ends in `:`.
    fn line_ends_with_colon(&self) -> bool {
        let mut offset = 0usize;
        loop {
            match self.peek_at(offset).kind {
                TokenKind::Newline | TokenKind::EndOfFile => break,
                _ => offset += 1,
            }
        }
        offset > 0 && matches!(self.peek_at(offset - 1).kind, TokenKind::Op(":"))
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    /// Parses one statement (or one line of simple statements) into `out`.
    fn statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), SourceSyntaxError> {
        match &self.peek().kind {
            TokenKind::Indent => Err(self.error("unexpected indent")),
            TokenKind::Op("@") => self.decorated(out),
            TokenKind::Name(word) if word == "class" => {
                out.push(self.class_def(Vec::new())?);
                Ok(())
            }
            TokenKind::Name(word) if word == "def" => {
                out.push(self.function_def(Vec::new())?);
                Ok(())
            }
            TokenKind::Name(word)
                if word == "async" && matches!(&self.peek_at(1).kind, TokenKind::Name(next) if next == "def") =>
            {
                self.advance();
                out.push(self.function_def(Vec::new())?);
                Ok(())
            }
            TokenKind::Name(word) if COMPOUND_KEYWORDS.contains(&word.as_str()) => {
                out.push(self.compound()?);
                Ok(())
            }
            TokenKind::Name(word)
                if SOFT_COMPOUND_KEYWORDS.contains(&word.as_str()) && self.line_ends_with_colon() =>
            {
                out.push(self.compound()?);
                Ok(())
            }
            _ => self.simple_line(out),
        }
    }

    /// Parses decorators followed by a class or function definition.
    fn decorated(&mut self, out: &mut Vec<Stmt>) -> Result<(), SourceSyntaxError> {
        let mut decorators = Vec::new();
        while self.at_op("@") {
            self.advance();
            let (items, _) = self.items(&[])?;
            decorators.extend(items);
            self.end_of_line()?;
            while matches!(self.peek().kind, TokenKind::Newline) {
                self.advance();
            }
        }
        if self.at_word("async") {
            self.advance();
        }
        if self.at_word("class") {
            out.push(self.class_def(decorators)?);
        } else if self.at_word("def") {
            out.push(self.function_def(decorators)?);
        } else {
            return Err(self.error(INVALID_SYNTAX));
        }
        Ok(())
    }

    /// Parses a compound statement header and its block.
    fn compound(&mut self) -> Result<Stmt, SourceSyntaxError> {
        let line = self.peek().line;
        self.advance();
        let (exprs, _) = self.items(&[":"])?;
        self.expect_op(":", "expected ':'")?;
        let body = self.block()?;
        Ok(Stmt::Other {
            exprs,
            body,
            line,
        })
    }

    /// Parses the block following a `:`.
    fn block(&mut self) -> Result<Vec<Stmt>, SourceSyntaxError> {
        self.descend()?;
        let body = self.block_body()?;
        self.ascend(1);
        Ok(body)
    }

    /// Parses the statements of a block.
    fn block_body(&mut self) -> Result<Vec<Stmt>, SourceSyntaxError> {
        let mut body = Vec::new();
        if !matches!(self.peek().kind, TokenKind::Newline) {
            self.simple_line(&mut body)?;
            return Ok(body);
        }
        self.advance();
        if !matches!(self.peek().kind, TokenKind::Indent) {
            return Err(self.error("expected an indented block"));
        }
        self.advance();
        loop {
            match self.peek().kind {
                TokenKind::Dedent => {
                    self.advance();
                    break;
                }
                TokenKind::EndOfFile => break,
                TokenKind::Newline => self.advance(),
                _ => self.statement(&mut body)?,
            }
        }
        Ok(body)
    }

    /// Parses `;`-separated simple statements up to the end of the line.
    fn simple_line(&mut self, out: &mut Vec<Stmt>) -> Result<(), SourceSyntaxError> {
        loop {
            self.simple_statement(out)?;
            if !self.at_op(";") {
                break;
            }
            self.advance();
            if matches!(self.peek().kind, TokenKind::Newline | TokenKind::EndOfFile) {
                break;
            }
        }
        self.end_of_line()
    }

    /// Parses one simple statement.
    fn simple_statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), SourceSyntaxError> {
        if self.at_word("import") {
            out.push(self.import()?);
            return Ok(());
        }
        if self.at_word("from") {
            out.push(self.import_from()?);
            return Ok(());
        }
        let line = self.peek().line;
        let leading_keyword = match &self.peek().kind {
            TokenKind::Name(word)
                if word == "type"
                    && matches!(&self.peek_at(1).kind, TokenKind::Name(next) if !is_keyword(next)) =>
            {
                self.advance();
                true
            }
            TokenKind::Name(word) if is_keyword(word) && !is_constant(word) => {
                if STATEMENT_ONLY_KEYWORDS.contains(&word.as_str()) {
                    return Err(self.error(INVALID_SYNTAX));
                }
                self.advance();
                true
            }
            _ => false,
        };
        let mut exprs = Vec::new();
        let mut separators = 0usize;
        loop {
            let (items, skipped) = self.items(&[";", ":"])?;
            exprs.extend(items);
            separators += skipped;
            if !self.at_op(":") {
                break;
            }
            if matches!(self.peek_at(1).kind, TokenKind::Newline) {
                self.advance();
                let body = self.block()?;
                out.push(Stmt::Other {
                    exprs,
                    body,
                    line,
                });
                return Ok(());
            }
            self.advance();
            separators += 1;
        }
        if !leading_keyword
            && separators == 0
            && exprs.len() == 1
            && let Some(value) = exprs.pop()
        {
            out.push(Stmt::Expr {
                value,
                line,
            });
            return Ok(());
        }
        out.push(Stmt::Other {
            exprs,
            body: Vec::new(),
            line,
        });
        Ok(())
    }

    /// Parses `import a.b [as c], ...`.
    fn import(&mut self) -> Result<Stmt, SourceSyntaxError> {
        let line = self.peek().line;
        self.advance();
        let mut modules = Vec::new();
        loop {
            let module_line = self.peek().line;
            let name = self.dotted_name()?;
            modules.push(ImportedModule {
                name,
                line: module_line,
            });
            if self.at_word("as") {
                self.advance();
                self.expect_name()?;
            }
            if !self.at_op(",") {
                break;
            }
            self.advance();
        }
        Ok(Stmt::Import {
            modules,
            line,
        })
    }

    /// Parses `from [.]module import names`.
    fn import_from(&mut self) -> Result<Stmt, SourceSyntaxError> {
        let line = self.peek().line;
        self.advance();
        let mut level = 0usize;
        loop {
            if self.at_op(".") {
                level += 1;
            } else if self.at_op("...") {
                level += 3;
            } else {
                break;
            }
            self.advance();
        }
        let module = if self.at_word("import") { None } else { Some(self.dotted_name()?) };
        if level == 0 && module.is_none() {
            return Err(self.error(INVALID_SYNTAX));
        }
        if !self.at_word("import") {
            return Err(self.error(INVALID_SYNTAX));
        }
        self.advance();
        let mut names = Vec::new();
        if self.at_op("*") {
            self.advance();
            names.push("*".to_string());
        } else {
            let parenthesized = self.at_op("(");
            if parenthesized {
                self.advance();
            }
            loop {
                if parenthesized && self.at_op(")") {
                    break;
                }
                let (name, _) = self.expect_name()?;
                names.push(name);
                if self.at_word("as") {
                    self.advance();
                    self.expect_name()?;
                }
                if !self.at_op(",") {
                    break;
                }
                self.advance();
            }
            if parenthesized {
                self.expect_op(")", INVALID_SYNTAX)?;
            }
        }
        Ok(Stmt::ImportFrom {
            module,
            level,
            names,
            line,
        })
    }

    /// Parses `name(.name)*`.
    fn dotted_name(&mut self) -> Result<String, SourceSyntaxError> {
        let (mut name, _) = self.expect_name()?;
        while self.at_op(".") {
            self.advance();
            let (segment, _) = self.expect_name()?;
            name.push('.');
            name.push_str(&segment);
        }
        Ok(name)
    }

    /// Parses a class definition.
    fn class_def(&mut self, decorators: Vec<Expr>) -> Result<Stmt, SourceSyntaxError> {
        let line = self.peek().line;
        self.advance();
        let (name, _) = self.expect_name()?;
        let mut exprs = decorators;
        if self.at_op("[") {
            exprs.push(self.bracketed("[", "]")?);
        }
        if self.at_op("(") {
            exprs.push(self.bracketed("(", ")")?);
        }
        self.expect_op(":", "expected ':'")?;
        let body = self.block()?;
        Ok(Stmt::ClassDef {
            name,
            exprs,
            body,
            line,
        })
    }

    /// Parses a function definition.
    fn function_def(&mut self, decorators: Vec<Expr>) -> Result<Stmt, SourceSyntaxError> {
        let line = self.peek().line;
        self.advance();
        let (name, _) = self.expect_name()?;
        let mut exprs = decorators;
        if self.at_op("[") {
            exprs.push(self.bracketed("[", "]")?);
        }
        self.expect_op("(", "expected '('")?;
        let params = self.parameters(&mut exprs)?;
        self.expect_op(")", INVALID_SYNTAX)?;
        if self.at_op("->") {
            self.advance();
            let (returns, _) = self.items(&[":"])?;
            exprs.extend(returns);
        }
        self.expect_op(":", "expected ':'")?;
        let body = self.block()?;
        Ok(Stmt::FunctionDef {
            name,
            params,
            exprs,
            body,
            line,
        })
    }

    /// Parses a parameter list up to (not including) `)`.
    fn parameters(&mut self, exprs: &mut Vec<Expr>) -> Result<Vec<String>, SourceSyntaxError> {
        let mut params = Vec::new();
        let mut positional = true;
        while !self.at_op(")") {
            if self.at_op("/") {
                self.advance();
            } else if self.at_op("*") {
                self.advance();
                positional = false;
                if matches!(&self.peek().kind, TokenKind::Name(_)) {
                    self.expect_name()?;
                }
            } else if self.at_op("**") {
                self.advance();
                positional = false;
                self.expect_name()?;
            } else {
                let (name, _) = self.expect_name()?;
                if positional {
                    params.push(name);
                }
            }
            if self.at_op(":") {
                self.advance();
                let (annotation, _) = self.items(&[",", "="])?;
                exprs.extend(annotation);
            }
            if self.at_op("=") {
                self.advance();
                let (default, _) = self.items(&[","])?;
                exprs.extend(default);
            }
            if self.at_op(",") {
                self.advance();
            } else if !self.at_op(")") {
                return Err(self.error(INVALID_SYNTAX));
            }
        }
        Ok(params)
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    /// Collects operands up to a stop operator, a closing bracket, or the end
    /// of the line. Returns the operands and the number of separators skipped.
    fn items(&mut self, stops: &[&str]) -> Result<(Vec<Expr>, usize), SourceSyntaxError> {
        self.descend()?;
        let found = self.operands(stops)?;
        self.ascend(1);
        Ok(found)
    }

    /// Collects operands for [`Self::items`].
    fn operands(&mut self, stops: &[&str]) -> Result<(Vec<Expr>, usize), SourceSyntaxError> {
        let mut items = Vec::new();
        let mut skipped = 0usize;
        let mut after_operand = false;
        loop {
            let starts_operand = match &self.peek().kind {
                TokenKind::Newline
                | TokenKind::EndOfFile
                | TokenKind::Indent
                | TokenKind::Dedent => break,
                TokenKind::Op(op) if stops.contains(op) => break,
                TokenKind::Op(")" | "]" | "}") => break,
                TokenKind::Op("(" | "[" | "{" | "...") | TokenKind::Number | TokenKind::Str(_) => {
                    true
                }
                TokenKind::Name(word) if is_constant(word) || !is_keyword(word) => true,
                TokenKind::Name(word) if STATEMENT_ONLY_KEYWORDS.contains(&word.as_str()) => {
                    return Err(self.error(INVALID_SYNTAX));
                }
                TokenKind::Op(_) | TokenKind::Name(_) => false,
            };
            if starts_operand {
                if after_operand {
                    return Err(self.error("invalid syntax. Perhaps you forgot a comma?"));
                }
                items.push(self.primary()?);
                after_operand = true;
            } else {
                self.advance();
                skipped += 1;
                after_operand = false;
            }
        }
        Ok((items, skipped))
    }

    /// Parses an atom followed by any trailers.
    fn primary(&mut self) -> Result<Expr, SourceSyntaxError> {
        let line = self.peek().line;
        let mut expr = self.atom()?;
        let mut trailers = 0usize;
        loop {
            if self.at_op(".") || self.at_op("(") || self.at_op("[") {
                self.descend()?;
                trailers += 1;
            }
            if self.at_op(".") {
                self.advance();
                let attr = match &self.peek().kind {
                    TokenKind::Name(name) => name.clone(),
                    _ => return Err(self.error(INVALID_SYNTAX)),
                };
                self.advance();
                expr = Expr::Attribute {
                    value: Box::new(expr),
                    attr,
                    line,
                };
            } else if self.at_op("(") {
                self.advance();
                let (args, _) = self.items(&[])?;
                self.expect_op(")", INVALID_SYNTAX)?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                    line,
                };
            } else if self.at_op("[") {
                self.advance();
                let (index, _) = self.items(&[])?;
                self.expect_op("]", INVALID_SYNTAX)?;
                expr = Expr::Subscript {
                    value: Box::new(expr),
                    index,
                    line,
                };
            } else {
                self.ascend(trailers);
                return Ok(expr);
            }
        }
    }

    /// Parses a single atom.
    fn atom(&mut self) -> Result<Expr, SourceSyntaxError> {
        let line = self.peek().line;
        match &self.peek().kind {
            TokenKind::Name(word) if is_constant(word) => {
                self.advance();
                Ok(Expr::Literal {
                    line,
                })
            }
            TokenKind::Name(word) => {
                let id = word.clone();
                self.advance();
                Ok(Expr::Name {
                    id,
                    line,
                })
            }
            TokenKind::Number | TokenKind::Op("...") => {
                self.advance();
                Ok(Expr::Literal {
                    line,
                })
            }
            TokenKind::Str(_) => self.strings(),
            TokenKind::Op("(") => self.bracketed("(", ")"),
            TokenKind::Op("[") => self.bracketed("[", "]"),
            TokenKind::Op("{") => self.bracketed("{", "}"),
            _ => Err(self.error(INVALID_SYNTAX)),
        }
    }

    /// Parses a bracketed display or group.
    fn bracketed(&mut self, open: &str, close: &str) -> Result<Expr, SourceSyntaxError> {
        let line = self.peek().line;
        self.expect_op(open, INVALID_SYNTAX)?;
        let (items, _) = self.items(&[])?;
        self.expect_op(close, INVALID_SYNTAX)?;
        Ok(Expr::Group {
            items,
            line,
        })
    }

    /// Parses adjacent string literals, expanding interpolations.
    fn strings(&mut self) -> Result<Expr, SourceSyntaxError> {
        let line = self.peek().line;
        let mut fragments: Vec<Interpolation> = Vec::new();
        while let TokenKind::Str(found) = &self.peek().kind {
            fragments.extend(found.iter().cloned());
            self.advance();
        }
        if fragments.is_empty() {
            return Ok(Expr::Literal {
                line,
            });
        }
        let mut items = Vec::new();
        for fragment in &fragments {
            items.extend(parse_interpolation(fragment, self.depth)?);
        }
        Ok(Expr::Group {
            items,
            line,
        })
    }
}

/// Parses the expression text of one interpolation nested `depth` levels deep.
fn parse_interpolation(
    fragment: &Interpolation,
    depth: usize,
) -> Result<Vec<Expr>, SourceSyntaxError> {
    let text = fragment.text.trim();
    if text.is_empty() {
        return Err(SourceSyntaxError::new(fragment.line, "f-string: valid expression required"));
    }
    let mut parser = Parser::new(tokenize(text, fragment.line)?, depth);
    let (items, _) = parser.items(&[])?;
    Ok(items)
}

/// Returns true for reserved words.
fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Returns true for the literal keywords.
fn is_constant(word: &str) -> bool {
    matches!(word, "True" | "False" | "None")
}
