//! Hand-written lexer for Sigma source text.
//!
//! A single forward pass with one character of lookahead (two for the
//! fractional-dot rule) turns source text into a token stream terminated by
//! an `Eof` token. Operator recognition prefers the longer match, `#` starts
//! a line comment, and string literals may span lines. A string literal
//! whose decoded content contains a `{...}` placeholder is tagged
//! [`TokenKind::InterpStr`] so the parser can split it.
//!
//! Lexical errors are recorded in the [`Reporter`] and scanning continues;
//! the driver refuses to parse a stream that produced errors.

use crate::errors::Reporter;

/// Token kinds. One variant per punctuation, operator, literal form and
/// reserved word; `Invalid` marks bytes the lexer could not make sense of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Compound assignment
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,

    // Increment / decrement
    PlusPlus,
    MinusMinus,

    // Comparison
    EqEq,
    BangEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,

    // Logical
    AmpAmp,
    PipePipe,
    Bang,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,

    // Assignment
    Eq,

    // Literals
    Int,
    Float,
    Str,
    InterpStr,
    Ident,

    // Reserved words
    Fr,      // variable declaration
    Say,     // print
    Lowkey,  // if
    Midkey,  // else-if
    Highkey, // else
    Goon,    // while
    Edge,    // for
    Vibe,    // function definition
    Send,    // return
    Ongod,   // true
    Cap,     // false
    Nah,     // null
    Mog,     // break
    Skip,    // continue
    Simp,    // switch
    Stan,    // case
    Ghost,   // default
    Yeet,    // try
    Caught,  // catch

    Eof,
    Invalid,
}

/// Decoded literal payload carried by literal tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    None,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Literal,
    /// 1-indexed line the token starts on.
    pub line: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: String, literal: Literal, line: usize) -> Self {
        Token {
            kind,
            lexeme,
            literal,
            line,
        }
    }
}

/// Map a lexeme to its reserved-word kind, if it is one.
fn keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "fr" => TokenKind::Fr,
        "say" => TokenKind::Say,
        "lowkey" => TokenKind::Lowkey,
        "midkey" => TokenKind::Midkey,
        "highkey" => TokenKind::Highkey,
        "goon" => TokenKind::Goon,
        "edge" => TokenKind::Edge,
        "vibe" => TokenKind::Vibe,
        "send" => TokenKind::Send,
        "ongod" => TokenKind::Ongod,
        "cap" => TokenKind::Cap,
        "nah" => TokenKind::Nah,
        "mog" => TokenKind::Mog,
        "skip" => TokenKind::Skip,
        "simp" => TokenKind::Simp,
        "stan" => TokenKind::Stan,
        "ghost" => TokenKind::Ghost,
        "yeet" => TokenKind::Yeet,
        "caught" => TokenKind::Caught,
        _ => return None,
    };
    Some(kind)
}

pub struct Lexer<'r> {
    chars: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    reporter: &'r mut Reporter,
}

impl<'r> Lexer<'r> {
    pub fn new(source: &str, reporter: &'r mut Reporter) -> Self {
        Lexer {
            chars: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            reporter,
        }
    }

    /// Scan the entire source, always ending with an `Eof` token on the
    /// final line encountered.
    pub fn scan(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }
        self.tokens
            .push(Token::new(TokenKind::Eof, String::new(), Literal::None, self.line));
        self.tokens
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.push(TokenKind::LeftParen),
            ')' => self.push(TokenKind::RightParen),
            '{' => self.push(TokenKind::LeftBrace),
            '}' => self.push(TokenKind::RightBrace),
            '[' => self.push(TokenKind::LeftBracket),
            ']' => self.push(TokenKind::RightBracket),
            ',' => self.push(TokenKind::Comma),
            ':' => self.push(TokenKind::Colon),
            '~' => self.push(TokenKind::Tilde),
            '^' => self.push(TokenKind::Caret),

            '+' => {
                if self.match_char('=') {
                    self.push(TokenKind::PlusEq);
                } else if self.match_char('+') {
                    self.push(TokenKind::PlusPlus);
                } else {
                    self.push(TokenKind::Plus);
                }
            }
            '-' => {
                if self.match_char('=') {
                    self.push(TokenKind::MinusEq);
                } else if self.match_char('-') {
                    self.push(TokenKind::MinusMinus);
                } else {
                    self.push(TokenKind::Minus);
                }
            }
            '*' => {
                let kind = if self.match_char('=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                };
                self.push(kind);
            }
            '/' => {
                let kind = if self.match_char('=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                };
                self.push(kind);
            }
            '%' => {
                let kind = if self.match_char('=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                };
                self.push(kind);
            }
            '!' => {
                let kind = if self.match_char('=') {
                    TokenKind::BangEq
                } else {
                    TokenKind::Bang
                };
                self.push(kind);
            }
            '=' => {
                let kind = if self.match_char('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                };
                self.push(kind);
            }
            '<' => {
                if self.match_char('=') {
                    self.push(TokenKind::LessEq);
                } else if self.match_char('<') {
                    self.push(TokenKind::Shl);
                } else {
                    self.push(TokenKind::Less);
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.push(TokenKind::GreaterEq);
                } else if self.match_char('>') {
                    self.push(TokenKind::Shr);
                } else {
                    self.push(TokenKind::Greater);
                }
            }
            '&' => {
                let kind = if self.match_char('&') {
                    TokenKind::AmpAmp
                } else {
                    TokenKind::Amp
                };
                self.push(kind);
            }
            '|' => {
                let kind = if self.match_char('|') {
                    TokenKind::PipePipe
                } else {
                    TokenKind::Pipe
                };
                self.push(kind);
            }

            '#' => {
                // Line comment: skip to end of line
                while self.peek() != '\n' && !self.is_at_end() {
                    self.advance();
                }
            }

            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,

            '"' => self.string(),

            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),

            c => {
                self.reporter
                    .lexer_error(self.line, format!("Unexpected character '{}'", c));
                self.push(TokenKind::Invalid);
            }
        }
    }

    fn string(&mut self) {
        let start_line = self.line;
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.reporter.lexer_error_with_hint(
                start_line,
                "Unterminated string literal",
                "add a closing '\"'",
            );
            self.push(TokenKind::Invalid);
            return;
        }

        // Closing quote
        self.advance();

        // Content without the surrounding quotes. Escape sequences are not
        // decoded: a backslash-n stays two characters through to the output.
        let content: String = self.chars[self.start + 1..self.current - 1]
            .iter()
            .collect();

        let kind = if has_placeholder(&content) {
            TokenKind::InterpStr
        } else {
            TokenKind::Str
        };
        self.push_literal(kind, Literal::Str(content), start_line);
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let lexeme: String = self.chars[self.start..self.current].iter().collect();
        if is_float {
            match lexeme.parse::<f64>() {
                Ok(value) => self.push_literal(TokenKind::Float, Literal::Float(value), self.line),
                Err(_) => {
                    self.reporter
                        .lexer_error(self.line, format!("Invalid number literal '{}'", lexeme));
                    self.push(TokenKind::Invalid);
                }
            }
        } else {
            match lexeme.parse::<i64>() {
                Ok(value) => self.push_literal(TokenKind::Int, Literal::Int(value), self.line),
                Err(_) => {
                    self.reporter
                        .lexer_error(self.line, format!("Invalid number literal '{}'", lexeme));
                    self.push(TokenKind::Invalid);
                }
            }
        }
    }

    fn identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        let lexeme: String = self.chars[self.start..self.current].iter().collect();
        let kind = keyword(&lexeme).unwrap_or(TokenKind::Ident);
        self.push(kind);
    }

    fn push(&mut self, kind: TokenKind) {
        let lexeme: String = self.chars[self.start..self.current].iter().collect();
        self.tokens
            .push(Token::new(kind, lexeme, Literal::None, self.line));
    }

    fn push_literal(&mut self, kind: TokenKind, literal: Literal, line: usize) {
        let lexeme: String = self.chars[self.start..self.current].iter().collect();
        self.tokens.push(Token::new(kind, lexeme, literal, line));
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.chars.len() {
            '\0'
        } else {
            self.chars[self.current + 1]
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }
}

/// True when the content holds a `{` with a `}` somewhere after it.
fn has_placeholder(content: &str) -> bool {
    match content.find('{') {
        Some(open) => content[open..].contains('}'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> (Vec<Token>, Reporter) {
        let mut reporter = Reporter::new();
        let tokens = Lexer::new(source, &mut reporter).scan();
        (tokens, reporter)
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_source_yields_only_eof() {
        let (tokens, reporter) = lex("");
        assert_eq!(kinds(&tokens), vec![TokenKind::Eof]);
        assert_eq!(tokens[0].line, 1);
        assert!(!reporter.had_error());
    }

    #[test]
    fn keywords_are_recognized() {
        let (tokens, _) = lex("fr say lowkey midkey highkey goon edge vibe send");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Fr,
                TokenKind::Say,
                TokenKind::Lowkey,
                TokenKind::Midkey,
                TokenKind::Highkey,
                TokenKind::Goon,
                TokenKind::Edge,
                TokenKind::Vibe,
                TokenKind::Send,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keyword_prefix_is_an_identifier() {
        let (tokens, _) = lex("frfr sendit");
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].lexeme, "frfr");
        assert_eq!(tokens[1].kind, TokenKind::Ident);
    }

    #[test]
    fn operators_prefer_the_longer_match() {
        let (tokens, _) = lex("+ += ++ - -= -- << <= < >> >= > == = != ! && & || |");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Plus,
                TokenKind::PlusEq,
                TokenKind::PlusPlus,
                TokenKind::Minus,
                TokenKind::MinusEq,
                TokenKind::MinusMinus,
                TokenKind::Shl,
                TokenKind::LessEq,
                TokenKind::Less,
                TokenKind::Shr,
                TokenKind::GreaterEq,
                TokenKind::Greater,
                TokenKind::EqEq,
                TokenKind::Eq,
                TokenKind::BangEq,
                TokenKind::Bang,
                TokenKind::AmpAmp,
                TokenKind::Amp,
                TokenKind::PipePipe,
                TokenKind::Pipe,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn adjacent_compound_operators_do_not_merge() {
        // `+++` is `++` then `+` under maximal munch
        let (tokens, _) = lex("+++");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::PlusPlus, TokenKind::Plus, TokenKind::Eof]
        );
    }

    #[test]
    fn integer_and_float_literals() {
        let (tokens, _) = lex("42 1.5 7.");
        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert_eq!(tokens[0].literal, Literal::Int(42));
        assert_eq!(tokens[1].kind, TokenKind::Float);
        assert_eq!(tokens[1].literal, Literal::Float(1.5));
        // `7.` is an int followed by a stray dot: the fractional rule needs
        // a digit after the dot
        assert_eq!(tokens[2].kind, TokenKind::Int);
        assert_eq!(tokens[3].kind, TokenKind::Invalid);
    }

    #[test]
    fn i64_boundary_literal_stays_integer() {
        let (tokens, reporter) = lex("9223372036854775807");
        assert_eq!(tokens[0].literal, Literal::Int(i64::MAX));
        assert!(!reporter.had_error());
    }

    #[test]
    fn out_of_range_integer_is_a_lexer_error() {
        let (tokens, reporter) = lex("9223372036854775808");
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
        assert!(reporter.had_error());
    }

    #[test]
    fn string_literal_content_excludes_quotes() {
        let (tokens, _) = lex("\"hello\"");
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].literal, Literal::Str("hello".to_string()));
    }

    #[test]
    fn escape_sequences_are_not_decoded() {
        let (tokens, _) = lex("\"a\\nb\"");
        assert_eq!(tokens[0].literal, Literal::Str("a\\nb".to_string()));
    }

    #[test]
    fn interpolated_string_is_tagged() {
        let (tokens, _) = lex("\"hi {name}!\" \"no braces\" \"{unclosed\"");
        assert_eq!(tokens[0].kind, TokenKind::InterpStr);
        assert_eq!(tokens[1].kind, TokenKind::Str);
        // an opening brace with no closing brace is a plain string
        assert_eq!(tokens[2].kind, TokenKind::Str);
    }

    #[test]
    fn multiline_string_counts_lines() {
        let (tokens, _) = lex("\"a\nb\"\nx");
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn unterminated_string_is_reported_and_eof_still_emitted() {
        let (tokens, reporter) = lex("\"oops");
        assert!(reporter.had_error());
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn comments_run_to_end_of_line() {
        let (tokens, _) = lex("fr x # this is ignored\nsay x");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Fr,
                TokenKind::Ident,
                TokenKind::Say,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[2].line, 2);
    }

    #[test]
    fn token_lines_match_preceding_newlines() {
        let (tokens, _) = lex("a\nb\n\nc");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].line, 4);
        assert_eq!(tokens[3].line, 4); // Eof on the final line
    }

    #[test]
    fn unexpected_character_is_reported_but_scanning_continues() {
        let (tokens, reporter) = lex("fr x = 1 @ say x");
        assert!(reporter.had_error());
        assert_eq!(reporter.error_count(), 1);
        // the rest of the stream is intact
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Say));
    }

    #[test]
    fn relexing_lexemes_reproduces_token_kinds() {
        let source = "fr x = 1 + 2.5 * foo(3) say \"hi\"";
        let (tokens, _) = lex(source);
        let joined = tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.lexeme.clone())
            .collect::<Vec<_>>()
            .join(" ");
        let (relexed, _) = lex(&joined);
        assert_eq!(kinds(&tokens), kinds(&relexed));
    }
}
