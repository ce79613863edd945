//! Single-pass byte-stream scanner (spec §4.1).
//!
//! Produces one [`Token`] per call to [`Lexer::next_token`]. Newline tokens
//! are kept in the stream `tokenize` returns: statements are newline- or
//! `}`-terminated (spec §5 "Source syntax"), so the parser relies on a
//! newline it did not consume to end an expression rather than continue it.
//! `;` scans to the same `Newline` token kind — an explicit statement
//! separator is equivalent to an implicit one.

use crate::{
    error::{GridError, GridResult},
    token::{FStringPart, Token, TokenKind, keyword_kind},
};

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src: src.as_bytes(), pos: 0, line: 1, col: 1 }
    }

    /// Scans the whole source into a token vector. Runs of consecutive
    /// newlines collapse to one, and a newline immediately after `{` or
    /// before `}` is dropped, so blank lines and brace-adjacent layout don't
    /// produce spurious empty statements.
    pub fn tokenize(src: &str) -> GridResult<Vec<Token>> {
        let mut lexer = Self::new(src);
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let is_eof = matches!(tok.kind, TokenKind::Eof);
            let is_newline = matches!(tok.kind, TokenKind::Newline);
            if is_newline {
                let redundant = matches!(tokens.last().map(|t| &t.kind), None | Some(TokenKind::Newline | TokenKind::LBrace));
                if !redundant {
                    tokens.push(tok);
                }
            } else {
                if matches!(tok.kind, TokenKind::RBrace) && matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Newline)) {
                    tokens.pop();
                }
                tokens.push(tok);
            }
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(byte)
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r') => {
                    self.advance();
                }
                Some(b'#') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    pub fn next_token(&mut self) -> GridResult<Token> {
        self.skip_whitespace_and_comments();
        let (line, col) = (self.line, self.col);

        let Some(byte) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, line, col));
        };

        if byte == b'\n' || byte == b';' {
            self.advance();
            return Ok(Token::new(TokenKind::Newline, line, col));
        }

        if byte.is_ascii_digit() {
            return self.scan_number(line, col);
        }

        if byte == b'_' || byte.is_ascii_alphabetic() {
            return self.scan_identifier_or_prefixed(line, col);
        }

        if byte == b'"' || byte == b'\'' {
            let s = self.scan_string(byte, false)?;
            return Ok(Token::new(TokenKind::String(s), line, col));
        }

        self.advance();
        let kind = match byte {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => {
                if self.matches(b'*') {
                    TokenKind::StarStar
                } else {
                    TokenKind::Star
                }
            }
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'=' => {
                if self.matches(b'=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            b'!' => {
                if self.matches(b'=') {
                    TokenKind::NotEq
                } else {
                    return Err(GridError::lex(line, col, "unexpected character '!'"));
                }
            }
            b'<' => {
                if self.matches(b'=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                if self.matches(b'=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b':' => TokenKind::Colon,
            b'?' => {
                if self.matches(b':') {
                    TokenKind::QuestionColon
                } else {
                    TokenKind::Question
                }
            }
            other => {
                return Err(GridError::lex(line, col, format!("unexpected character '{}'", other as char)));
            }
        };
        Ok(Token::new(kind, line, col))
    }

    fn scan_number(&mut self, line: u32, col: u32) -> GridResult<Token> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.advance();
            }
        }
        let lexeme = std::str::from_utf8(&self.src[start..self.pos]).expect("ascii digits are valid utf8");
        let value: f64 = lexeme.parse().map_err(|_| GridError::lex(line, col, format!("invalid number '{lexeme}'")))?;
        Ok(Token::new(TokenKind::Number(value), line, col))
    }

    fn scan_identifier_or_prefixed(&mut self, line: u32, col: u32) -> GridResult<Token> {
        // Single-letter prefixes `r"..."`/`f"..."` are only prefixes when
        // immediately followed by a quote; otherwise they're plain identifiers.
        let first = self.peek().unwrap();
        if (first == b'r' || first == b'f') && matches!(self.peek_at(1), Some(b'"' | b'\'')) {
            self.advance();
            let quote = self.advance().unwrap();
            return if first == b'r' {
                let s = self.scan_string(quote, true)?;
                Ok(Token::new(TokenKind::RawRegex(s), line, col))
            } else {
                let parts = self.scan_fstring(quote, line, col)?;
                Ok(Token::new(TokenKind::FString(parts), line, col))
            };
        }

        let start = self.pos;
        while self.peek().is_some_and(|b| b == b'_' || b.is_ascii_alphanumeric()) {
            self.advance();
        }
        let word = std::str::from_utf8(&self.src[start..self.pos]).expect("identifier bytes are valid utf8").to_owned();
        if let Some(kind) = keyword_kind(&word) {
            return Ok(Token::new(kind, line, col));
        }
        Ok(Token::new(TokenKind::Identifier(word), line, col))
    }

    /// Scans a quoted string body. When `raw` is true, backslashes are kept
    /// verbatim except immediately before the matching quote, where they
    /// produce a literal quote (spec §4.1 "Raw strings").
    fn scan_string(&mut self, quote: u8, raw: bool) -> GridResult<String> {
        let (start_line, start_col) = (self.line, self.col);
        let mut out = String::new();
        loop {
            let Some(byte) = self.peek() else {
                return Err(GridError::lex(start_line, start_col, "unterminated string literal"));
            };
            if byte == quote {
                self.advance();
                break;
            }
            if byte == b'\n' {
                return Err(GridError::lex(start_line, start_col, "unterminated string literal"));
            }
            if byte == b'\\' {
                self.advance();
                if raw {
                    if self.peek() == Some(quote) {
                        out.push(quote as char);
                        self.advance();
                    } else {
                        out.push('\\');
                    }
                    continue;
                }
                let Some(escaped) = self.advance() else {
                    return Err(GridError::lex(start_line, start_col, "unterminated string literal"));
                };
                out.push(match escaped {
                    b'n' => '\n',
                    b't' => '\t',
                    b'r' => '\r',
                    b'\\' => '\\',
                    b'"' => '"',
                    b'\'' => '\'',
                    other => other as char,
                });
                continue;
            }
            out.push(self.advance().unwrap() as char);
        }
        Ok(out)
    }

    /// Scans an f-string body into alternating literal/path parts (spec §4.1).
    fn scan_fstring(&mut self, quote: u8, start_line: u32, start_col: u32) -> GridResult<Vec<FStringPart>> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        loop {
            let Some(byte) = self.peek() else {
                return Err(GridError::lex(start_line, start_col, "unterminated f-string literal"));
            };
            if byte == quote {
                self.advance();
                break;
            }
            if byte == b'\n' {
                return Err(GridError::lex(start_line, start_col, "unterminated f-string literal"));
            }
            match byte {
                b'{' if self.peek_at(1) == Some(b'{') => {
                    self.advance();
                    self.advance();
                    literal.push('{');
                }
                b'}' if self.peek_at(1) == Some(b'}') => {
                    self.advance();
                    self.advance();
                    literal.push('}');
                }
                b'{' => {
                    self.advance();
                    if !literal.is_empty() {
                        parts.push(FStringPart::Literal(std::mem::take(&mut literal)));
                    }
                    let path = self.scan_fstring_path(start_line, start_col)?;
                    parts.push(FStringPart::Path(path));
                }
                b'\\' => {
                    self.advance();
                    let Some(escaped) = self.advance() else {
                        return Err(GridError::lex(start_line, start_col, "unterminated f-string literal"));
                    };
                    literal.push(match escaped {
                        b'n' => '\n',
                        b't' => '\t',
                        b'r' => '\r',
                        b'\\' => '\\',
                        b'"' => '"',
                        b'\'' => '\'',
                        other => other as char,
                    });
                }
                _ => literal.push(self.advance().unwrap() as char),
            }
        }
        if !literal.is_empty() {
            parts.push(FStringPart::Literal(literal));
        }
        Ok(parts)
    }

    /// Scans a dotted identifier path inside `{...}` (no expression language,
    /// per spec §9 "F-string scope").
    fn scan_fstring_path(&mut self, start_line: u32, start_col: u32) -> GridResult<Vec<String>> {
        let mut segments = Vec::new();
        loop {
            let seg_start = self.pos;
            while self.peek().is_some_and(|b| b == b'_' || b.is_ascii_alphanumeric()) {
                self.advance();
            }
            if self.pos == seg_start {
                return Err(GridError::lex(start_line, start_col, "expected identifier in f-string interpolation"));
            }
            segments.push(std::str::from_utf8(&self.src[seg_start..self.pos]).unwrap().to_owned());
            if self.peek() == Some(b'.') {
                self.advance();
                continue;
            }
            break;
        }
        if self.peek() != Some(b'}') {
            return Err(GridError::lex(start_line, start_col, "expected '}' to close f-string interpolation"));
        }
        self.advance();
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numbers_round_trip_ieee754_parse() {
        for lexeme in ["0", "42", "3.14159", "0.5", "100.0"] {
            let toks = Lexer::tokenize(lexeme).unwrap();
            let TokenKind::Number(n) = toks[0].kind else { panic!("expected number") };
            assert_eq!(n, lexeme.parse::<f64>().unwrap());
        }
    }

    #[test]
    fn string_escapes() {
        let toks = Lexer::tokenize(r#""a\nb\tc\\d\"e""#).unwrap();
        let TokenKind::String(ref s) = toks[0].kind else { panic!("expected string") };
        assert_eq!(s, "a\nb\tc\\d\"e");
    }

    #[test]
    fn unknown_escape_keeps_literal_char() {
        let toks = Lexer::tokenize(r#""a\qb""#).unwrap();
        let TokenKind::String(ref s) = toks[0].kind else { panic!("expected string") };
        assert_eq!(s, "aqb");
    }

    #[test]
    fn raw_string_keeps_backslashes() {
        let toks = Lexer::tokenize(r#"r"(?<y>\d+)-(?<m>\d+)""#).unwrap();
        let TokenKind::RawRegex(ref s) = toks[0].kind else { panic!("expected raw regex") };
        assert_eq!(s, r"(?<y>\d+)-(?<m>\d+)");
    }

    #[test]
    fn fstring_parts() {
        let toks = Lexer::tokenize(r#"f"hi {a.b}, {{lit}}""#).unwrap();
        let TokenKind::FString(ref parts) = toks[0].kind else { panic!("expected fstring") };
        assert_eq!(
            parts,
            &vec![
                FStringPart::Literal("hi ".to_owned()),
                FStringPart::Path(vec!["a".to_owned(), "b".to_owned()]),
                FStringPart::Literal(", {lit}".to_owned()),
            ]
        );
    }

    #[test]
    fn multi_char_operators() {
        assert_eq!(
            kinds("== != <= >= **"),
            vec![TokenKind::EqEq, TokenKind::NotEq, TokenKind::LtEq, TokenKind::GtEq, TokenKind::StarStar]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(kinds("if x"), vec![TokenKind::If, TokenKind::Identifier("x".to_owned())]);
    }

    #[test]
    fn unknown_character_is_lex_error() {
        let err = Lexer::tokenize("@").unwrap_err();
        assert!(matches!(err, GridError::Lex(_)));
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            kinds("1 # comment\n2"),
            vec![TokenKind::Number(1.0), TokenKind::Newline, TokenKind::Number(2.0)]
        );
    }

    #[test]
    fn blank_lines_collapse_to_one_newline() {
        assert_eq!(
            kinds("1\n\n\n2"),
            vec![TokenKind::Number(1.0), TokenKind::Newline, TokenKind::Number(2.0)]
        );
    }

    #[test]
    fn newline_after_open_brace_and_before_close_brace_is_dropped() {
        assert_eq!(
            kinds("{\n1\n}"),
            vec![TokenKind::LBrace, TokenKind::Number(1.0), TokenKind::RBrace]
        );
    }

    #[test]
    fn semicolon_acts_as_statement_separator() {
        assert_eq!(kinds("1;2"), vec![TokenKind::Number(1.0), TokenKind::Newline, TokenKind::Number(2.0)]);
    }
}
