//! Recursive-descent parser for dialog expressions.
//!
//! ```text
//! expr     := prefix* disj
//! prefix   := '^' token ('=' value)? | '{' token '~'? '}' | '!' | '@'
//! disj     := conj ('|' conj)*              -> OR(...)
//! conj     := operand ('&' operand)*        -> AND(...)
//! operand  := prefix* primary
//! primary  := ('<' | '>' | '<=' | '>=' | '~=') operand
//!           | ':' token '(' expr ')'        -> getattr(token, expr)
//!           | '$' token | '$#' digits ('(' ')')?
//!           | '"' chars '"'
//!           | '(' args ')'                  -> anonymous group
//!           | token '?'* ('(' args ')')?
//! args     := (arg (',' arg)*)?
//! arg      := (token '=')? expr
//! ```
//!
//! Unnamed arguments get roles `pos1`, `pos2`, ... numbered from the
//! highest positional index seen so far in the same call.

use crate::ast::{AstNode, Binding, Reference};
use crate::error::ParseError;
use crate::signature::{positional_role, positional_role_index, ViewMode};

const DELIMITERS: &[char] = &[
    '(', ')', ',', '=', '"', ':', '{', '}', '$', '^', '#', '?', '!', '|', '@', '~', '<', '>', '/', '&',
];

fn is_token_char(c: char) -> bool {
    !c.is_whitespace() && !DELIMITERS.contains(&c)
}

/// Parse one expression. The whole input must be consumed.
pub fn parse_expression(text: &str) -> Result<AstNode, ParseError> {
    let mut parser = Parser::new(text);
    parser.skip_ws();
    if parser.at_end() {
        return Err(ParseError::Empty);
    }
    let node = parser.parse_expr()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(ParseError::TrailingInput {
            pos: parser.position,
            rest: parser.chars[parser.position..].iter().collect(),
        });
    }
    Ok(node)
}

/// Annotations written in front of an expression.
#[derive(Default)]
struct Prefix {
    tags: Vec<(String, String)>,
    binding: Option<Binding>,
    view: Option<ViewMode>,
    position: usize,
}

impl Prefix {
    fn apply(self, node: &mut AstNode) -> Result<(), ParseError> {
        if let Some(binding) = self.binding {
            if node.binding.is_some() {
                return Err(ParseError::MultipleBindings {
                    pos: self.position,
                });
            }
            node.binding = Some(binding);
        }
        if self.view.is_some() {
            node.view = self.view;
        }
        if !self.tags.is_empty() {
            let inner = std::mem::take(&mut node.tags);
            node.tags = self.tags;
            node.tags.extend(inner);
        }
        Ok(())
    }
}

struct Parser {
    chars: Vec<char>,
    position: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Parser {
            chars: text.chars().collect(),
            position: 0,
        }
    }

    // -- Character helpers --

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(found) => ParseError::UnexpectedChar {
                pos: self.position,
                found,
                expected: expected.to_string(),
            },
            None => ParseError::UnexpectedEnd {
                expected: expected.to_string(),
            },
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.position += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{expected}'")))
        }
    }

    /// A bare token. Inside `[...]`, `/` and `?` are part of the token.
    fn token(&mut self) -> String {
        let mut out = String::new();
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            let inside = depth > 0 && (c == '/' || c == '?');
            if !is_token_char(c) && !inside {
                break;
            }
            match c {
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                _ => {}
            }
            out.push(c);
            self.position += 1;
        }
        out
    }

    fn expect_token(&mut self, expected: &str) -> Result<String, ParseError> {
        self.skip_ws();
        let token = self.token();
        if token.is_empty() {
            Err(self.unexpected(expected))
        } else {
            Ok(token)
        }
    }

    fn quoted(&mut self) -> Result<String, ParseError> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.advance() {
                None => {
                    return Err(ParseError::UnexpectedEnd {
                        expected: "closing '\"'".into(),
                    })
                }
                Some('"') => return Ok(out),
                Some('\\') => match self.advance() {
                    Some(c) => out.push(c),
                    None => {
                        return Err(ParseError::UnexpectedEnd {
                            expected: "escaped character".into(),
                        })
                    }
                },
                Some(c) => out.push(c),
            }
        }
    }

    // -- Grammar --

    fn parse_expr(&mut self) -> Result<AstNode, ParseError> {
        let prefix = self.parse_prefix()?;
        let mut node = self.parse_disjunction()?;
        prefix.apply(&mut node)?;
        Ok(node)
    }

    fn parse_prefix(&mut self) -> Result<Prefix, ParseError> {
        self.skip_ws();
        let mut prefix = Prefix {
            position: self.position,
            ..Prefix::default()
        };
        loop {
            self.skip_ws();
            match self.peek() {
                Some('^') => {
                    self.position += 1;
                    let tag = self.expect_token("a tag name")?;
                    self.skip_ws();
                    let value = if self.peek() == Some('=') {
                        self.position += 1;
                        self.skip_ws();
                        if self.peek() == Some('"') {
                            self.quoted()?
                        } else {
                            self.expect_token("a tag value")?
                        }
                    } else {
                        String::new()
                    };
                    prefix.tags.push((tag, value));
                }
                Some('{') => {
                    let pos = self.position;
                    self.position += 1;
                    let name = self.expect_token("a binding name")?;
                    self.skip_ws();
                    let to_result = self.peek() == Some('~');
                    if to_result {
                        self.position += 1;
                    }
                    self.expect('}')?;
                    if prefix.binding.is_some() {
                        return Err(ParseError::MultipleBindings { pos });
                    }
                    prefix.binding = Some(Binding { name, to_result });
                }
                Some('!') => {
                    self.position += 1;
                    prefix.view = Some(ViewMode::Intension);
                }
                Some('@') => {
                    self.position += 1;
                    prefix.view = Some(ViewMode::Extension);
                }
                _ => return Ok(prefix),
            }
        }
    }

    fn parse_disjunction(&mut self) -> Result<AstNode, ParseError> {
        self.parse_chain('|', "OR", Self::parse_conjunction)
    }

    fn parse_conjunction(&mut self) -> Result<AstNode, ParseError> {
        self.parse_chain('&', "AND", Self::parse_operand)
    }

    /// `a op b op c` -> `name(a, b, c)`; a single operand is returned as is.
    fn parse_chain(
        &mut self,
        op: char,
        name: &str,
        operand: fn(&mut Self) -> Result<AstNode, ParseError>,
    ) -> Result<AstNode, ParseError> {
        let first = operand(self)?;
        self.skip_ws();
        if self.peek() != Some(op) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.peek() == Some(op) {
            self.position += 1;
            operands.push(operand(self)?);
            self.skip_ws();
        }
        Ok(AstNode::positional_call(name, operands))
    }

    fn parse_operand(&mut self) -> Result<AstNode, ParseError> {
        let prefix = self.parse_prefix()?;
        let mut node = self.parse_primary()?;
        prefix.apply(&mut node)?;
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<AstNode, ParseError> {
        self.skip_ws();
        match self.peek() {
            None => Err(self.unexpected("an expression")),
            Some('<') | Some('>') | Some('~') => self.parse_qualifier(),
            Some(':') => self.parse_getattr(),
            Some('$') => self.parse_reference(),
            Some('"') => Ok(AstNode::quoted(self.quoted()?)),
            Some('(') => Ok(AstNode::call("", self.parse_args()?)),
            Some(c) if is_token_char(c) => self.parse_named(),
            Some(_) => Err(self.unexpected("an expression")),
        }
    }

    fn parse_qualifier(&mut self) -> Result<AstNode, ParseError> {
        let name = match self.advance() {
            Some('<') if self.peek() == Some('=') => "LE",
            Some('<') => "LT",
            Some('>') if self.peek() == Some('=') => "GE",
            Some('>') => "GT",
            Some('~') if self.peek() == Some('=') => "LIKE",
            _ => {
                self.position -= 1;
                return Err(self.unexpected("a comparison operator"));
            }
        };
        if self.peek() == Some('=') {
            self.position += 1;
        }
        let operand = self.parse_operand()?;
        Ok(AstNode::positional_call(name, vec![operand]))
    }

    fn parse_getattr(&mut self) -> Result<AstNode, ParseError> {
        self.expect(':')?;
        let property = self.expect_token("a property name")?;
        self.expect('(')?;
        let object = self.parse_expr()?;
        self.expect(')')?;
        Ok(AstNode::positional_call(
            "getattr",
            vec![AstNode::terminal(property), object],
        ))
    }

    fn parse_reference(&mut self) -> Result<AstNode, ParseError> {
        let start = self.position;
        self.expect('$')?;
        if self.peek() == Some('#') {
            self.position += 1;
            let digits: String = std::iter::from_fn(|| {
                let c = self.peek().filter(char::is_ascii_digit)?;
                self.position += 1;
                Some(c)
            })
            .collect();
            let id = digits.parse::<u32>().map_err(|_| ParseError::InvalidReference {
                pos: start,
                text: format!("$#{digits}"),
            })?;
            let save = self.position;
            self.skip_ws();
            if self.peek() == Some('(') {
                self.position += 1;
                self.expect(')')?;
            } else {
                self.position = save;
            }
            return Ok(AstNode::reference(Reference::Id(id)));
        }
        let name = self.token();
        if name.is_empty() {
            return Err(ParseError::InvalidReference {
                pos: start,
                text: "$".into(),
            });
        }
        Ok(AstNode::reference(Reference::Name(name)))
    }

    fn parse_named(&mut self) -> Result<AstNode, ParseError> {
        let mut name = self.token();
        while self.peek() == Some('?') {
            self.position += 1;
            name.push('?');
        }
        let constrained = name.ends_with('?');
        let save = self.position;
        self.skip_ws();
        if self.peek() == Some('(') {
            return Ok(AstNode::call(name, self.parse_args()?));
        }
        self.position = save;
        if constrained {
            Ok(AstNode::call(name, Vec::new()))
        } else {
            Ok(AstNode::terminal(name))
        }
    }

    fn parse_args(&mut self) -> Result<Vec<(String, AstNode)>, ParseError> {
        self.expect('(')?;
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.position += 1;
            return Ok(args);
        }
        let mut last_positional = 0usize;
        loop {
            let role = match self.named_role() {
                Some(role) => {
                    if let Some(index) = positional_role_index(&role) {
                        last_positional = last_positional.max(index);
                    }
                    role
                }
                None => {
                    last_positional += 1;
                    positional_role(last_positional)
                }
            };
            let value = self.parse_expr()?;
            args.push((role, value));
            self.skip_ws();
            match self.peek() {
                Some(',') => self.position += 1,
                Some(')') => {
                    self.position += 1;
                    return Ok(args);
                }
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }
    }

    /// Consume `token =` if present.
    fn named_role(&mut self) -> Option<String> {
        let save = self.position;
        self.skip_ws();
        let token = self.token();
        if !token.is_empty() {
            self.skip_ws();
            if self.peek() == Some('=') {
                self.position += 1;
                return Some(token);
            }
        }
        self.position = save;
        None
    }
}
