//! Precompiled `%{VAR}` macro expansion.
//!
//! Macros appear in operator arguments, `msg`, `logdata`, and `setvar`
//! values. They are compiled once at rule-load time into a token sequence;
//! expansion walks the tokens against a transaction without reparsing.
//! Unknown variable names are rejected at compile time.

use crate::engine::Transaction;
use crate::error::{Error, Result};
use crate::parser::Variable;

/// A compiled macro: literal text interleaved with variable references.
#[derive(Debug, Clone)]
pub struct Macro {
    source: String,
    tokens: Vec<Token>,
}

#[derive(Debug, Clone)]
enum Token {
    Literal(String),
    Variable {
        variable: Variable,
        key: Option<String>,
    },
}

impl Macro {
    /// Compile a macro expression.
    pub fn compile(input: &str) -> Result<Self> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut rest = input;

        while let Some(start) = rest.find("%{") {
            literal.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find('}').ok_or_else(|| Error::InvalidMacro {
                expression: input.to_string(),
                message: "unterminated %{".to_string(),
            })?;

            let name = &after[..end];
            let (var_str, key) = match name.split_once(['.', ':']) {
                Some((v, k)) => (v, Some(k.to_string())),
                None => (name, None),
            };

            let variable =
                Variable::from_name(var_str).ok_or_else(|| Error::InvalidMacro {
                    expression: input.to_string(),
                    message: format!("unknown variable '{var_str}'"),
                })?;

            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(Token::Variable { variable, key });

            rest = &after[end + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self {
            source: input.to_string(),
            tokens,
        })
    }

    /// Expand against a transaction. Absent variables expand to "".
    pub fn expand(&self, tx: &Transaction) -> String {
        let mut out = String::with_capacity(self.source.len());
        for token in &self.tokens {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::Variable { variable, key } => {
                    if let Some(value) = tx.first_value(*variable, key.as_deref()) {
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }

    /// Whether the macro contains no variable references.
    pub fn is_literal(&self) -> bool {
        !self
            .tokens
            .iter()
            .any(|t| matches!(t, Token::Variable { .. }))
    }

    /// The original source text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Waf;

    fn transaction() -> Transaction {
        Waf::from_directives("").unwrap().new_transaction()
    }

    #[test]
    fn test_literal_macro() {
        let m = Macro::compile("no variables here").unwrap();
        assert!(m.is_literal());
        assert_eq!(m.expand(&transaction()), "no variables here");
    }

    #[test]
    fn test_tx_variable_expansion() {
        let m = Macro::compile("score=%{TX.score}!").unwrap();
        assert!(!m.is_literal());

        let mut tx = transaction();
        tx.tx_data_mut().set("score", "7");
        assert_eq!(m.expand(&tx), "score=7!");
    }

    #[test]
    fn test_absent_variable_expands_empty() {
        let m = Macro::compile("[%{TX.missing}]").unwrap();
        assert_eq!(m.expand(&transaction()), "[]");
    }

    #[test]
    fn test_scalar_variable() {
        let m = Macro::compile("uri=%{REQUEST_URI}").unwrap();
        let mut tx = transaction();
        tx.process_uri("/index.html", "GET", "HTTP/1.1").unwrap();
        assert_eq!(m.expand(&tx), "uri=/index.html");
    }

    #[test]
    fn test_unknown_variable_rejected_at_compile() {
        assert!(matches!(
            Macro::compile("%{NOPE.key}"),
            Err(Error::InvalidMacro { .. })
        ));
    }

    #[test]
    fn test_unterminated_rejected() {
        assert!(matches!(
            Macro::compile("%{TX.score"),
            Err(Error::InvalidMacro { .. })
        ));
    }

    #[test]
    fn test_colon_key_form() {
        let m = Macro::compile("%{tx:blocking_paranoia_level}").unwrap();
        let mut tx = transaction();
        tx.tx_data_mut().set("blocking_paranoia_level", "2");
        assert_eq!(m.expand(&tx), "2");
    }
}
