//! Generic type-parameter rewriting.
//!
//! Specializes a generated type's open type parameters to the concrete
//! argument types supplied at a usage site, recursing through nested
//! generic instantiations. Operates on type-reference text in the host
//! language's grammar and passes everything it does not rewrite through
//! byte-for-byte, so rewriting a fully-bound reference is the identity.

use indexmap::IndexMap;

/// Substituted for a parameter whose binding has no usable content. Never
/// leave the unbound parameter name in place, and never leave a blank: the
/// placeholder keeps the generated code parseable while the caller raises
/// its own diagnostic for the missing binding.
pub const DEFAULT_TYPE_PLACEHOLDER: &str = "object";

/// A binding consumed during rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundValue {
    /// The type parameter name that was bound.
    pub parameter: String,
    /// The bound argument text, if the binding had usable content.
    pub content: Option<String>,
}

impl BoundValue {
    /// The text substituted into the rewritten reference.
    pub fn substitution(&self) -> &str {
        match self.content.as_deref() {
            Some(content) if !content.trim().is_empty() => content,
            _ => DEFAULT_TYPE_PLACEHOLDER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Ident,
    /// `::` or `.`, a namespace qualification.
    Qualifier,
    /// `<`, opening a type-argument list.
    AngleOpen,
    Other,
}

struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
}

fn lex(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while let Some(ch) = rest.chars().next() {
        let (kind, len) = if ch.is_alphanumeric() || ch == '_' {
            let len = rest
                .find(|c: char| !c.is_alphanumeric() && c != '_')
                .unwrap_or(rest.len());
            (TokenKind::Ident, len)
        } else if rest.starts_with("::") {
            (TokenKind::Qualifier, 2)
        } else if ch == '.' {
            (TokenKind::Qualifier, 1)
        } else if ch == '<' {
            (TokenKind::AngleOpen, 1)
        } else {
            (TokenKind::Other, ch.len_utf8())
        };
        tokens.push(Token {
            kind,
            text: &rest[..len],
        });
        rest = &rest[len..];
    }
    tokens
}

/// Rewrite a type reference, substituting bound type-parameter names with
/// their argument types.
///
/// A bare identifier (one not adjacent to a namespace qualifier and not the
/// head of a generic instantiation) that appears in `bindings` is replaced
/// and recorded, in first-encountered order, into the returned list. Type
/// argument lists are walked left to right, so nested instantiations are
/// rewritten recursively. Everything else passes through unchanged.
///
/// Never fails: an unresolvable binding substitutes
/// [`DEFAULT_TYPE_PLACEHOLDER`] and correctness diagnostics are the
/// caller's job, driven by the returned bindings.
pub fn rewrite_generic_type(
    type_text: &str,
    bindings: &IndexMap<String, Option<String>>,
) -> (String, Vec<BoundValue>) {
    let tokens = lex(type_text);
    let mut rewritten = String::with_capacity(type_text.len());
    let mut used = Vec::new();

    let significant = |from: usize, tokens: &[Token<'_>], forward: bool| -> Option<TokenKind> {
        if forward {
            tokens[from + 1..]
                .iter()
                .find(|t| !t.text.trim().is_empty())
                .map(|t| t.kind)
        } else {
            tokens[..from]
                .iter()
                .rev()
                .find(|t| !t.text.trim().is_empty())
                .map(|t| t.kind)
        }
    };

    for (i, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Ident
            && let Some(content) = bindings.get(token.text)
        {
            let prev = significant(i, &tokens, false);
            let next = significant(i, &tokens, true);
            let qualified = prev == Some(TokenKind::Qualifier) || next == Some(TokenKind::Qualifier);
            let generic_head = next == Some(TokenKind::AngleOpen);

            if !qualified && !generic_head {
                let value = BoundValue {
                    parameter: token.text.to_owned(),
                    content: content.clone(),
                };
                rewritten.push_str(value.substitution());
                used.push(value);
                continue;
            }
        }
        rewritten.push_str(token.text);
    }

    (rewritten, used)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, Option<&str>)]) -> IndexMap<String, Option<String>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_owned)))
            .collect()
    }

    #[test]
    fn test_simple_substitution() {
        let (out, used) = rewrite_generic_type("TItem", &bindings(&[("TItem", Some("i32"))]));
        assert_eq!(out, "i32");
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].parameter, "TItem");
    }

    #[test]
    fn test_nested_recursion_preserves_order() {
        let (out, used) = rewrite_generic_type(
            "Dictionary<T,List<U>>",
            &bindings(&[("T", Some("int")), ("U", Some("string"))]),
        );
        assert_eq!(out, "Dictionary<int,List<string>>");
        let consumed: Vec<_> = used.iter().map(|b| b.content.as_deref().unwrap()).collect();
        assert_eq!(consumed, ["int", "string"]);
    }

    #[test]
    fn test_fully_bound_reference_is_identity() {
        let input = "Dictionary<int, List<string>>";
        let (out, used) = rewrite_generic_type(input, &bindings(&[("T", Some("int"))]));
        assert_eq!(out, input);
        assert!(used.is_empty());
    }

    #[test]
    fn test_qualified_names_are_not_substituted() {
        // `T` under a namespace qualification is a real type, not a
        // parameter reference.
        let (out, used) = rewrite_generic_type(
            "models.T",
            &bindings(&[("T", Some("i32")), ("models", Some("nope"))]),
        );
        assert_eq!(out, "models.T");
        assert!(used.is_empty());

        let (out, _) = rewrite_generic_type("T::Assoc", &bindings(&[("T", Some("i32"))]));
        assert_eq!(out, "T::Assoc");
    }

    #[test]
    fn test_generic_head_is_not_substituted() {
        // `List` names a generic type here even if a binding shadows it.
        let (out, used) =
            rewrite_generic_type("List<T>", &bindings(&[("List", Some("Vec")), ("T", Some("u8"))]));
        assert_eq!(out, "List<u8>");
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].parameter, "T");
    }

    #[test]
    fn test_missing_content_substitutes_placeholder() {
        let (out, used) = rewrite_generic_type("List<T>", &bindings(&[("T", None)]));
        assert_eq!(out, format!("List<{DEFAULT_TYPE_PLACEHOLDER}>"));
        assert_eq!(used.len(), 1);
        assert!(used[0].content.is_none());

        let (out, _) = rewrite_generic_type("List<T>", &bindings(&[("T", Some("  "))]));
        assert_eq!(out, format!("List<{DEFAULT_TYPE_PLACEHOLDER}>"));
    }

    #[test]
    fn test_whitespace_passes_through() {
        let (out, _) = rewrite_generic_type(
            "Dictionary< T , List< U > >",
            &bindings(&[("T", Some("int")), ("U", Some("string"))]),
        );
        assert_eq!(out, "Dictionary< int , List< string > >");
    }
}
