//! Template syntax model and a tolerant parser.
//!
//! The grammar is deliberately small: markup, `@`-prefixed directives at the
//! start of a line, inline `@expr` / `@(expr)` expressions, and elements.
//! Malformed input never fails the parse; problems are recorded as
//! diagnostics and the tree is completed best-effort, so every later phase
//! must tolerate partial trees.

use vellum_core::{SourceSpan, SourceText};

use crate::diagnostic::{Diagnostic, codes};

/// A declarative directive collected during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `@import some::namespace`: brings a component namespace into scope.
    Import { path: String, span: SourceSpan },
    /// `@typeparam TItem` or `@typeparam TItem: Clone`.
    TypeParam {
        name: String,
        constraint: Option<String>,
        span: SourceSpan,
    },
    /// `@namespace my_app::pages`: overrides the generated namespace.
    Namespace { value: String, span: SourceSpan },
    /// `@preservews`: keep insignificant whitespace in output.
    PreserveWhitespace { span: SourceSpan },
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
    pub span: SourceSpan,
}

/// One node of the template tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal markup text.
    Text(String),
    /// An embedded host-language expression.
    Expression { code: String, span: SourceSpan },
    /// An element; `closed` is false when recovery synthesized the end.
    Element {
        name: String,
        attributes: Vec<Attribute>,
        children: Vec<Node>,
        closed: bool,
        span: SourceSpan,
    },
}

/// The parsed form of one template file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxTree {
    pub roots: Vec<Node>,
    pub directives: Vec<Directive>,
    /// Parse-time diagnostics, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse one template file. Never fails; see module docs.
pub fn parse_template(source: &SourceText) -> SyntaxTree {
    let mut parser = Parser {
        text: source.content(),
        path: source.path(),
        pos: 0,
        tree: SyntaxTree::default(),
    };
    let roots = parser.parse_nodes(None);
    parser.tree.roots = roots;
    parser.tree
}

struct Parser<'a> {
    text: &'a str,
    path: &'a str,
    pos: usize,
    tree: SyntaxTree,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn span_from(&self, start: usize) -> SourceSpan {
        SourceSpan::new(self.path, start, self.pos - start)
    }

    fn at_line_start(&self) -> bool {
        self.text[..self.pos]
            .chars()
            .rev()
            .take_while(|ch| *ch != '\n')
            .all(char::is_whitespace)
    }

    /// Parse sibling nodes until EOF or the close tag of `enclosing`.
    fn parse_nodes(&mut self, enclosing: Option<&str>) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut text = String::new();
        let text_flush = |text: &mut String, nodes: &mut Vec<Node>| {
            if !text.is_empty() {
                nodes.push(Node::Text(std::mem::take(text)));
            }
        };

        while let Some(ch) = self.peek() {
            match ch {
                '<' if self.rest().starts_with("</") => {
                    // Close tag: ours, or a mismatch we stop at anyway.
                    text_flush(&mut text, &mut nodes);
                    return nodes;
                }
                '<' if self.rest()[1..].starts_with(|c: char| c.is_alphabetic() || c == '_') => {
                    text_flush(&mut text, &mut nodes);
                    let element = self.parse_element();
                    nodes.push(element);
                }
                '@' => {
                    if self.rest().starts_with("@@") {
                        self.bump();
                        self.bump();
                        text.push('@');
                    } else if self.at_line_start() && self.directive_ahead() {
                        text_flush(&mut text, &mut nodes);
                        self.parse_directive_line();
                    } else {
                        text_flush(&mut text, &mut nodes);
                        nodes.push(self.parse_expression());
                    }
                }
                _ => {
                    self.bump();
                    text.push(ch);
                }
            }
        }

        text_flush(&mut text, &mut nodes);
        if let Some(name) = enclosing {
            // Reached EOF with an element still open; the caller marks it.
            let _ = name;
        }
        nodes
    }

    fn directive_ahead(&self) -> bool {
        let word: String = self.rest()[1..]
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        matches!(
            word.as_str(),
            "import" | "typeparam" | "namespace" | "preservews"
        )
    }

    fn parse_directive_line(&mut self) {
        let start = self.pos;
        self.bump(); // '@'
        let keyword: String = {
            let word: String = self
                .rest()
                .chars()
                .take_while(|c| c.is_ascii_alphabetic())
                .collect();
            self.pos += word.len();
            word
        };
        let line: String = self.rest().chars().take_while(|c| *c != '\n').collect();
        self.pos += line.len();
        // Swallow the trailing newline so directives leave no text behind.
        if self.peek() == Some('\n') {
            self.bump();
        }
        let argument = line.trim().to_owned();
        let span = self.span_from(start);

        let directive = match keyword.as_str() {
            "import" if !argument.is_empty() => Directive::Import {
                path: argument,
                span,
            },
            "typeparam" if !argument.is_empty() => {
                let (name, constraint) = match argument.split_once(':') {
                    Some((name, constraint)) => {
                        (name.trim().to_owned(), Some(constraint.trim().to_owned()))
                    }
                    None => (argument, None),
                };
                Directive::TypeParam {
                    name,
                    constraint,
                    span,
                }
            }
            "namespace" if !argument.is_empty() => Directive::Namespace {
                value: argument,
                span,
            },
            "preservews" => Directive::PreserveWhitespace { span },
            _ => {
                self.tree.diagnostics.push(
                    Diagnostic::error(
                        codes::PARSE_ERROR,
                        format!("directive '@{keyword}' is missing its argument"),
                    )
                    .at(span),
                );
                return;
            }
        };
        self.tree.directives.push(directive);
    }

    fn parse_expression(&mut self) -> Node {
        let start = self.pos;
        self.bump(); // '@'

        let code = if self.peek() == Some('(') {
            let mut depth = 0usize;
            let mut code = String::new();
            while let Some(ch) = self.bump() {
                match ch {
                    '(' => {
                        if depth > 0 {
                            code.push(ch);
                        }
                        depth += 1;
                    }
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                        code.push(ch);
                    }
                    _ => code.push(ch),
                }
            }
            if depth > 0 {
                self.tree.diagnostics.push(
                    Diagnostic::error(codes::PARSE_ERROR, "unterminated '@(' expression")
                        .at(self.span_from(start)),
                );
            }
            code
        } else {
            // Simple member chain: @model.name
            let code: String = self
                .rest()
                .chars()
                .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '.'))
                .collect();
            self.pos += code.len();
            code
        };

        if code.is_empty() {
            self.tree.diagnostics.push(
                Diagnostic::error(codes::PARSE_ERROR, "empty '@' expression")
                    .at(self.span_from(start)),
            );
        }

        Node::Expression {
            code,
            span: self.span_from(start),
        }
    }

    fn parse_element(&mut self) -> Node {
        let start = self.pos;
        self.bump(); // '<'
        let name: String = self
            .rest()
            .chars()
            .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-'))
            .collect();
        self.pos += name.len();

        let attributes = self.parse_attributes();

        // Tag end: '/>', '>', or EOF mid-tag.
        if self.rest().starts_with("/>") {
            self.pos += 2;
            return Node::Element {
                name,
                attributes,
                children: Vec::new(),
                closed: true,
                span: self.span_from(start),
            };
        }
        if self.peek() == Some('>') {
            self.bump();
        } else {
            self.tree.diagnostics.push(
                Diagnostic::error(
                    codes::PARSE_ERROR,
                    format!("tag '<{name}' is never terminated"),
                )
                .at(self.span_from(start)),
            );
            return Node::Element {
                name,
                attributes,
                children: Vec::new(),
                closed: false,
                span: self.span_from(start),
            };
        }

        let children = self.parse_nodes(Some(&name));

        let closed = if self.rest().starts_with("</") {
            let close_start = self.pos;
            self.pos += 2;
            let close_name: String = self
                .rest()
                .chars()
                .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-'))
                .collect();
            self.pos += close_name.len();
            if self.peek() == Some('>') {
                self.bump();
            }
            if close_name == name {
                true
            } else {
                self.tree.diagnostics.push(
                    Diagnostic::error(
                        codes::PARSE_ERROR,
                        format!("expected '</{name}>' but found '</{close_name}>'"),
                    )
                    .at(self.span_from(close_start)),
                );
                false
            }
        } else {
            self.tree.diagnostics.push(
                Diagnostic::error(codes::PARSE_ERROR, format!("unclosed tag '<{name}>'"))
                    .at(self.span_from(start)),
            );
            false
        };

        Node::Element {
            name,
            attributes,
            children,
            closed,
            span: self.span_from(start),
        }
    }

    fn parse_attributes(&mut self) -> Vec<Attribute> {
        let mut attributes = Vec::new();
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            }
            let Some(ch) = self.peek() else { break };
            if ch == '>' || ch == '/' {
                break;
            }

            let attr_start = self.pos;
            let name: String = self
                .rest()
                .chars()
                .take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/'))
                .collect();
            if name.is_empty() {
                // Stray character inside a tag; skip it rather than loop.
                self.bump();
                continue;
            }
            self.pos += name.len();

            let value = if self.peek() == Some('=') {
                self.bump();
                match self.peek() {
                    Some(quote @ ('"' | '\'')) => {
                        self.bump();
                        let value: String =
                            self.rest().chars().take_while(|c| *c != quote).collect();
                        self.pos += value.len();
                        self.bump(); // closing quote
                        Some(value)
                    }
                    _ => {
                        let value: String = self
                            .rest()
                            .chars()
                            .take_while(|c| !c.is_whitespace() && !matches!(c, '>' | '/'))
                            .collect();
                        self.pos += value.len();
                        Some(value)
                    }
                }
            } else {
                None
            };

            attributes.push(Attribute {
                name,
                value,
                span: self.span_from(attr_start),
            });
        }
        attributes
    }
}
