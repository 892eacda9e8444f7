//! Decorator expressions: `@pjax_block("content", title_variable="title")`.
//!
//! Configuration names decorators with the same text a developer would write
//! above a view. The text is tokenised and parsed into a tiny expression tree,
//! checked against the whitelist of call shapes, and only then turned into a
//! [`PjaxDecorator`]. Nothing is ever evaluated.
//!
//! Accepted: one call to `pjax_block` or `pjax_template` whose arguments are
//! all string literals, positional or keyword. Everything else is rejected
//! with the specific rule it broke.

use std::fmt;

use crate::error::{ConfigErrorKind, ImproperlyConfigured};

use super::decorators::{pjax_block, pjax_template, PjaxDecorator, DEFAULT_BLOCK};

const MARKER: char = '@';

const BLOCK_PARAMS: &[&str] = &["block", "title_variable", "title_block"];
const TEMPLATE_PARAMS: &[&str] = &["template"];

/// Parses one decorator expression.
///
/// ```rust
/// use tsu_pjax::pjax::{parse_decorator, pjax_block, PjaxDecorator};
///
/// let parsed = parse_decorator(r#"@pjax_block("main", title_variable="title")"#).unwrap();
/// assert_eq!(parsed, PjaxDecorator::Block(pjax_block("main").title_variable("title")));
///
/// assert!(parse_decorator("pjax_block('main')").is_err());
/// ```
pub fn parse_decorator(text: &str) -> Result<PjaxDecorator, ImproperlyConfigured> {
    let fail = |kind: ConfigErrorKind| ImproperlyConfigured::new(text, kind);

    let source = text.strip_prefix(MARKER).ok_or_else(|| fail(ConfigErrorKind::MissingMarker))?;
    let tokens = tokenize(source).map_err(|msg| fail(ConfigErrorKind::Syntax(msg)))?;
    let expr = Parser { tokens: &tokens, pos: 0 }.parse().map_err(fail)?;

    let Expr::Call { func, args } = expr else {
        return Err(fail(ConfigErrorKind::NotACall));
    };
    let name = match *func {
        Expr::Name(name) | Expr::Attribute(name) => name,
        _ => "<expression>".to_owned(),
    };
    let params = match name.as_str() {
        "pjax_block" => BLOCK_PARAMS,
        "pjax_template" => TEMPLATE_PARAMS,
        _ => return Err(fail(ConfigErrorKind::UnknownFunction(name))),
    };

    if args.iter().any(|arg| matches!(arg, Arg::Star | Arg::DoubleStar)) {
        return Err(fail(ConfigErrorKind::Unpacking));
    }
    let literals = args.into_iter()
        .map(|arg| match arg {
            Arg::Positional(Expr::Str(value)) => Ok((None, value)),
            Arg::Keyword(key, Expr::Str(value)) => Ok((Some(key), value)),
            _ => Err(fail(ConfigErrorKind::NonStringArgument)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut slots = bind(params, literals)
        .map_err(|msg| fail(ConfigErrorKind::InvalidArguments(msg)))?
        .into_iter();
    let mut next = || slots.next().flatten();

    if params == TEMPLATE_PARAMS {
        return Ok(pjax_template(next().as_deref()).into());
    }
    let decorator = pjax_block(next().as_deref().unwrap_or(DEFAULT_BLOCK));
    let decorator = match (next(), next()) {
        (Some(_), Some(_)) => {
            return Err(fail(ConfigErrorKind::InvalidArguments(
                "title_variable and title_block are mutually exclusive".to_owned(),
            )));
        }
        (Some(variable), None) => decorator.title_variable(&variable),
        (None, Some(block)) => decorator.title_block(&block),
        (None, None) => decorator,
    };
    Ok(decorator.into())
}

/// Assigns literal arguments to named parameters, the way a call would.
fn bind(
    params: &[&str],
    args: Vec<(Option<String>, String)>,
) -> Result<Vec<Option<String>>, String> {
    let mut slots = vec![None; params.len()];
    let mut positional = 0;
    let mut seen_keyword = false;

    for (key, value) in args {
        let index = match key {
            None if seen_keyword => {
                return Err("positional argument follows keyword argument".to_owned());
            }
            None => {
                positional += 1;
                if positional > params.len() {
                    return Err(format!("takes at most {} positional arguments", params.len()));
                }
                positional - 1
            }
            Some(key) => {
                seen_keyword = true;
                params.iter()
                    .position(|p| *p == key)
                    .ok_or_else(|| format!("unexpected keyword argument '{key}'"))?
            }
        };
        if slots[index].is_some() {
            return Err(format!("got multiple values for argument '{}'", params[index]));
        }
        slots[index] = Some(value);
    }
    Ok(slots)
}

// ── Tokens ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Name(String),
    Str(String),
    /// Numbers, byte strings and f-strings: well-formed, never a text literal.
    Literal,
    Punct(&'static str),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "name '{name}'"),
            Self::Str(_) => f.write_str("string literal"),
            Self::Literal => f.write_str("literal"),
            Self::Punct(p) => write!(f, "'{p}'"),
        }
    }
}

// Longest first.
const PUNCT: &[&str] = &[
    "**", "==", "!=", "<=", ">=", "//",
    "(", ")", "[", "]", "{", "}", ",", "=", "*", ".", ":",
    "+", "-", "/", "%", "<", ">", "|", "&", "~", "^", "@",
];

/// How a prefixed string literal is read.
struct Prefix {
    /// Backslashes are kept as written.
    raw: bool,
    /// The literal is a text string (`u`, `r`), not bytes or an f-string.
    text: bool,
}

fn string_prefix(name: &str) -> Option<Prefix> {
    let (raw, text) = match name.to_ascii_lowercase().as_str() {
        "u" => (false, true),
        "r" => (true, true),
        "b" | "f" => (false, false),
        "br" | "rb" | "fr" | "rf" => (true, false),
        _ => return None,
    };
    Some(Prefix { raw, text })
}

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let mut lexer = Lexer { chars: src.chars().collect(), pos: 0 };
    let mut tokens = Vec::new();

    while let Some(c) = lexer.peek(0) {
        if c.is_whitespace() {
            lexer.pos += 1;
        } else if c == '\'' || c == '"' {
            tokens.push(Token::Str(lexer.string(false)?));
        } else if c.is_alphabetic() || c == '_' {
            let name = lexer.name();
            match (string_prefix(&name), lexer.peek(0)) {
                (Some(prefix), Some('\'' | '"')) if prefix.text => {
                    tokens.push(Token::Str(lexer.string(prefix.raw)?));
                }
                (Some(_), Some('\'' | '"')) => {
                    // Only the extent matters; the value is never used.
                    lexer.string(true)?;
                    tokens.push(Token::Literal);
                }
                _ => tokens.push(Token::Name(name)),
            }
        } else if c.is_ascii_digit() {
            while lexer.peek(0).is_some_and(|ch| ch.is_alphanumeric() || ch == '.' || ch == '_') {
                lexer.pos += 1;
            }
            tokens.push(Token::Literal);
        } else {
            let punct = PUNCT.iter()
                .find(|p| lexer.starts_with(p))
                .ok_or_else(|| format!("unexpected character {c:?}"))?;
            lexer.pos += punct.len();
            tokens.push(Token::Punct(*punct));
        }
    }
    Ok(tokens)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0);
        self.pos += 1;
        c
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek(i) == Some(c))
    }

    fn name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek(0).filter(|c| c.is_alphanumeric() || *c == '_') {
            name.push(c);
            self.pos += 1;
        }
        name
    }

    /// A quoted literal starting at the opening quote, single or triple.
    fn string(&mut self, raw: bool) -> Result<String, String> {
        let unterminated = || "unterminated string literal".to_owned();
        let Some(quote) = self.bump() else { return Err(unterminated()) };
        let triple = self.peek(0) == Some(quote) && self.peek(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut value = String::new();
        loop {
            match self.bump().ok_or_else(unterminated)? {
                c if c == quote && !triple => return Ok(value),
                c if c == quote && self.peek(0) == Some(quote) && self.peek(1) == Some(quote) => {
                    self.pos += 2;
                    return Ok(value);
                }
                '\n' if !triple => return Err(unterminated()),
                '\\' if raw => {
                    // A raw literal keeps the backslash but still cannot end
                    // on an escaped quote.
                    value.push('\\');
                    value.push(self.bump().ok_or_else(unterminated)?);
                }
                '\\' => self.escape(&mut value)?,
                c => value.push(c),
            }
        }
    }

    /// Decodes the escape sequence after a backslash.
    fn escape(&mut self, value: &mut String) -> Result<(), String> {
        let c = self.bump().ok_or_else(|| "unterminated string literal".to_owned())?;
        let decoded = match c {
            '\n' => return Ok(()),
            '\\' | '\'' | '"' => c,
            'a' => '\u{07}',
            'b' => '\u{08}',
            'f' => '\u{0c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\u{0b}',
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek(0).and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                char::from_u32(code).ok_or_else(|| format!("invalid octal escape \\{code:o}"))?
            }
            'x' => self.hex_escape(2, "\\xXX")?,
            'u' => self.hex_escape(4, "\\uXXXX")?,
            'U' => self.hex_escape(8, "\\UXXXXXXXX")?,
            'N' => return Err("\\N{...} escapes are not supported".to_owned()),
            other => {
                value.push('\\');
                other
            }
        };
        value.push(decoded);
        Ok(())
    }

    fn hex_escape(&mut self, digits: usize, form: &str) -> Result<char, String> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self.peek(0)
                .and_then(|d| d.to_digit(16))
                .ok_or_else(|| format!("truncated {form} escape"))?;
            code = code * 16 + digit;
            self.pos += 1;
        }
        char::from_u32(code).ok_or_else(|| format!("{form} escape is not a valid character"))
    }
}

// ── Expression tree ───────────────────────────────────────────────────────────

/// Just enough structure to tell a whitelisted call from everything else.
#[derive(Debug)]
enum Expr {
    Name(String),
    /// Dotted name, e.g. `djpjax.pjax_block`.
    Attribute(String),
    Str(String),
    Call { func: Box<Expr>, args: Vec<Arg> },
    /// Any other well-formed expression.
    Other,
}

#[derive(Debug)]
enum Arg {
    Positional(Expr),
    Keyword(String, Expr),
    Star,
    DoubleStar,
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl Parser<'_> {
    fn parse(mut self) -> Result<Expr, ConfigErrorKind> {
        if self.tokens.is_empty() {
            return Err(ConfigErrorKind::Syntax("empty expression".to_owned()));
        }
        let expr = self.primary()?;
        if self.pos == self.tokens.len() {
            return Ok(expr);
        }
        // Trailing operators make this something other than a lone call, as
        // long as what follows is still balanced.
        self.skip_until(&[])?;
        Ok(Expr::Other)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, punct: &str) -> bool {
        let hit = matches!(self.peek(), Some(Token::Punct(p)) if *p == punct);
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn primary(&mut self) -> Result<Expr, ConfigErrorKind> {
        let mut expr = match self.bump() {
            Some(Token::Name(name)) => Expr::Name(name),
            Some(Token::Str(mut value)) => {
                while let Some(Token::Str(more)) = self.peek() {
                    value.push_str(more);
                    self.pos += 1;
                }
                Expr::Str(value)
            }
            Some(Token::Literal) => Expr::Other,
            Some(Token::Punct("(")) if self.eat(")") => Expr::Other,
            Some(Token::Punct("(")) => {
                // A parenthesised expression is that expression; anything
                // with a comma is a tuple.
                let inner = self.value()?;
                if self.eat(")") {
                    inner
                } else {
                    self.skip_group("(")?;
                    Expr::Other
                }
            }
            Some(Token::Punct(open @ ("[" | "{"))) => {
                self.skip_group(open)?;
                Expr::Other
            }
            Some(Token::Punct("-" | "+" | "~")) => {
                self.primary()?;
                Expr::Other
            }
            Some(token) => return Err(syntax(format!("unexpected {token}"))),
            None => return Err(syntax("unexpected end of expression".to_owned())),
        };

        loop {
            if self.eat(".") {
                let Some(Token::Name(attr)) = self.bump() else {
                    return Err(syntax("expected a name after '.'".to_owned()));
                };
                expr = match expr {
                    Expr::Name(base) | Expr::Attribute(base) => Expr::Attribute(format!("{base}.{attr}")),
                    _ => Expr::Other,
                };
            } else if self.eat("(") {
                let args = self.arguments()?;
                expr = Expr::Call { func: Box::new(expr), args };
            } else if self.eat("[") {
                self.skip_group("[")?;
                expr = Expr::Other;
            } else {
                return Ok(expr);
            }
        }
    }

    /// Argument list after an opening `(`, through the closing `)`.
    fn arguments(&mut self) -> Result<Vec<Arg>, ConfigErrorKind> {
        let mut args = Vec::new();
        loop {
            if self.eat(")") {
                return Ok(args);
            }
            let arg = if self.eat("**") {
                self.value()?;
                Arg::DoubleStar
            } else if self.eat("*") {
                self.value()?;
                Arg::Star
            } else if let (Some(Token::Name(key)), Some(Token::Punct("="))) =
                (self.peek(), self.tokens.get(self.pos + 1))
            {
                let key = key.clone();
                self.pos += 2;
                Arg::Keyword(key, self.value()?)
            } else {
                Arg::Positional(self.value()?)
            };
            args.push(arg);

            if self.eat(")") {
                return Ok(args);
            }
            if !self.eat(",") {
                return Err(syntax("expected ',' or ')' in argument list".to_owned()));
            }
        }
    }

    /// One argument value; anything past a bare primary makes it `Other`.
    fn value(&mut self) -> Result<Expr, ConfigErrorKind> {
        let expr = self.primary()?;
        if matches!(self.peek(), Some(Token::Punct("," | ")"))) {
            return Ok(expr);
        }
        self.skip_until(&[",", ")"])?;
        Ok(Expr::Other)
    }

    /// Consumes tokens up to (not including) one of `stops` at nesting depth
    /// zero, or to the end when `stops` is empty.
    fn skip_until(&mut self, stops: &[&str]) -> Result<(), ConfigErrorKind> {
        loop {
            match self.peek() {
                None if stops.is_empty() => return Ok(()),
                None => return Err(syntax("unclosed '('".to_owned())),
                Some(Token::Punct(p)) if stops.contains(p) => return Ok(()),
                Some(Token::Punct(open @ ("(" | "[" | "{"))) => {
                    let open = *open;
                    self.pos += 1;
                    self.skip_group(open)?;
                }
                Some(Token::Punct(close @ (")" | "]" | "}"))) => {
                    return Err(syntax(format!("unmatched '{close}'")));
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Skips a bracketed group whose opener was just consumed.
    fn skip_group(&mut self, open: &str) -> Result<(), ConfigErrorKind> {
        let close = match open {
            "(" => ")",
            "[" => "]",
            _ => "}",
        };
        self.skip_until(&[close]).map_err(|_| syntax(format!("unclosed '{open}'")))?;
        self.pos += 1;
        Ok(())
    }
}

fn syntax(msg: String) -> ConfigErrorKind {
    ConfigErrorKind::Syntax(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(text: &str) -> ConfigErrorKind {
        parse_decorator(text).expect_err(text).kind
    }

    #[test]
    fn accepts_positional_and_keyword_literals() {
        assert_eq!(
            parse_decorator("@pjax_block('body', title_block=\"title\")").unwrap(),
            PjaxDecorator::from(pjax_block("body").title_block("title")),
        );
        assert_eq!(
            parse_decorator("@pjax_block(block='main', title_variable='t')").unwrap(),
            PjaxDecorator::from(pjax_block("main").title_variable("t")),
        );
        assert_eq!(
            parse_decorator("@ pjax_template ( 'frag.html' , )").unwrap(),
            PjaxDecorator::from(pjax_template(Some("frag.html"))),
        );
        assert_eq!(parse_decorator("@pjax_template()").unwrap(), PjaxDecorator::from(pjax_template(None)));
        for text in [
            "@pjax_template(r'frag.html')",
            "@pjax_template(R'frag.html')",
            "@pjax_template(u'frag.html')",
            "@pjax_template(U\"frag.html\")",
            "@pjax_template(('frag.html'))",
            "@pjax_template(template=(('frag.html')))",
            "@pjax_template('''frag.html''')",
            "@(pjax_template)('frag.html')",
        ] {
            assert_eq!(
                parse_decorator(text).unwrap(),
                PjaxDecorator::from(pjax_template(Some("frag.html"))),
                "{text}",
            );
        }
    }

    #[test]
    fn block_name_defaults_to_content() {
        assert_eq!(
            parse_decorator("@pjax_block()").unwrap(),
            PjaxDecorator::from(pjax_block(DEFAULT_BLOCK)),
        );
    }

    #[test]
    fn adjacent_literals_concatenate_and_escapes_decode() {
        assert_eq!(
            parse_decorator(r#"@pjax_template("a/" 'b\'s.html')"#).unwrap(),
            PjaxDecorator::from(pjax_template(Some("a/b's.html"))),
        );
        for (text, expected) in [
            (r"@pjax_template('\x41.html')", "A.html"),
            (r"@pjax_template('\101.html')", "A.html"),
            (r"@pjax_template('caf\u00e9.html')", "caf\u{e9}.html"),
            (r"@pjax_template('caf\U000000e9.html')", "caf\u{e9}.html"),
            (r"@pjax_template('\a\b\f\v')", "\u{07}\u{08}\u{0c}\u{0b}"),
            (r"@pjax_template('a\d')", "a\\d"),
            (r"@pjax_template(r'a\x41\'')", "a\\x41\\'"),
        ] {
            assert_eq!(
                parse_decorator(text).unwrap(),
                PjaxDecorator::from(pjax_template(Some(expected))),
                "{text}",
            );
        }
    }

    #[test]
    fn rejects_missing_marker() {
        assert!(matches!(kind("pjax_block('x')"), ConfigErrorKind::MissingMarker));
        assert!(matches!(kind(" @pjax_block('x')"), ConfigErrorKind::MissingMarker));
    }

    #[test]
    fn rejects_anything_but_a_single_call() {
        for text in ["@pjax_block", "@'pjax_block'", "@pjax_block('x') + 1", "@[pjax_block('x')]", "@(pjax_block)", "@(pjax_block('x'),)"] {
            assert!(matches!(kind(text), ConfigErrorKind::NotACall), "{text}");
        }
    }

    #[test]
    fn rejects_unknown_functions() {
        assert!(matches!(kind("@eval('1')"), ConfigErrorKind::UnknownFunction(n) if n == "eval"));
        assert!(matches!(
            kind("@djpjax.pjax_block('x')"),
            ConfigErrorKind::UnknownFunction(n) if n == "djpjax.pjax_block"
        ));
        assert!(matches!(kind("@pjax_block('x')('y')"), ConfigErrorKind::UnknownFunction(_)));
    }

    #[test]
    fn rejects_unpacking() {
        assert!(matches!(kind("@pjax_block(*args)"), ConfigErrorKind::Unpacking));
        assert!(matches!(kind("@pjax_block('x', **opts)"), ConfigErrorKind::Unpacking));
    }

    #[test]
    fn rejects_non_string_arguments() {
        for text in [
            "@pjax_block(1)",
            "@pjax_block(content)",
            "@pjax_block(None)",
            "@pjax_block('a' + 'b')",
            "@pjax_block(block=open('x'))",
            "@pjax_template(['a.html'])",
            "@pjax_block(f'x')",
            "@pjax_block(F'{x}')",
            "@pjax_block(b'x')",
            "@pjax_block(rb'x')",
            "@pjax_block(('a', 'b'))",
        ] {
            assert!(matches!(kind(text), ConfigErrorKind::NonStringArgument), "{text}");
        }
    }

    #[test]
    fn rejects_arguments_that_do_not_bind() {
        for text in [
            "@pjax_template('a', 'b')",
            "@pjax_template(name='a')",
            "@pjax_block('a', block='b')",
            "@pjax_block(block='a', 'b')",
            "@pjax_block('a', title_variable='t', title_block='t')",
        ] {
            assert!(matches!(kind(text), ConfigErrorKind::InvalidArguments(_)), "{text}");
        }
    }

    #[test]
    fn reports_syntax_errors() {
        for text in ["@", "@pjax_block('x'", "@pjax_block('x)", "@pjax_block(,)", "@pjax_block('x'))", "@pjax_block($)"] {
            assert!(matches!(kind(text), ConfigErrorKind::Syntax(_)), "{text}");
        }
        for text in [r"@pjax_block('\x4')", r"@pjax_block('\ud800')", r"@pjax_block('\N{BULLET}')", r"@pjax_block(r'x\')"] {
            assert!(matches!(kind(text), ConfigErrorKind::Syntax(_)), "{text}");
        }
    }

    #[test]
    fn error_message_names_expression_and_rule() {
        let err = parse_decorator("@pjax_block(1)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "\"@pjax_block(1)\" does not define a valid PJAX decorator: only string arguments are allowed",
        );
    }
}
