//! Type-expression grammar.
//!
//! ```text
//! type   := name ( '[' type ( ',' type )* ']' )?
//! name   := segment ( '::' segment )*
//! segment:= [A-Z] [A-Za-z0-9_]*
//! ```
//!
//! Parsing is done in full before any name is resolved, so a syntax error
//! always wins over an unknown name.

use super::{Type, TypeError};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Word(String),
    Open,
    Close,
    Comma,
    End,
}

impl Token {
    fn text(&self) -> &str {
        match self {
            Token::Name(s) | Token::Word(s) => s,
            Token::Open => "[",
            Token::Close => "]",
            Token::Comma => ",",
            Token::End => "",
        }
    }
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0 }
    }

    fn next_token(&mut self) -> Token {
        let rest = &self.src[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();

        let Some(c) = trimmed.chars().next() else {
            return Token::End;
        };
        match c {
            '[' => {
                self.pos += 1;
                Token::Open
            }
            ']' => {
                self.pos += 1;
                Token::Close
            }
            ',' => {
                self.pos += 1;
                Token::Comma
            }
            _ => {
                let len = trimmed
                    .find(|ch: char| ch.is_whitespace() || matches!(ch, '[' | ']' | ','))
                    .unwrap_or(trimmed.len());
                let word = &trimmed[..len];
                self.pos += len;
                if is_type_name(word) {
                    Token::Name(word.to_string())
                } else {
                    Token::Word(word.to_string())
                }
            }
        }
    }
}

fn is_type_name(word: &str) -> bool {
    word.split("::").all(|segment| {
        let mut chars = segment.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Unresolved parse tree.
#[derive(Debug, Clone)]
struct RawType {
    name: String,
    params: Vec<RawType>,
}

struct TypeParser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> TypeParser<'a> {
    fn new(src: &'a str) -> Self {
        let mut lexer = Lexer::new(src);
        let current = lexer.next_token();
        TypeParser { lexer, current }
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn parse(mut self) -> Result<RawType, TypeError> {
        let ty = self.parse_type()?;
        if self.current != Token::End {
            return Err(syntax(format!(
                "expected end of input, got '{}'",
                self.current.text()
            )));
        }
        Ok(ty)
    }

    fn parse_type(&mut self) -> Result<RawType, TypeError> {
        let name = match self.advance() {
            Token::Name(name) => name,
            other => {
                return Err(syntax(format!(
                    "expected a type name, got '{}'",
                    other.text()
                )));
            }
        };

        let mut params = Vec::new();
        if self.current == Token::Open {
            self.advance();
            loop {
                params.push(self.parse_type()?);
                match self.advance() {
                    Token::Comma => continue,
                    Token::Close => break,
                    other => {
                        return Err(syntax(format!(
                            "expected one of ',' or ']', got '{}'",
                            other.text()
                        )));
                    }
                }
            }
        }
        Ok(RawType { name, params })
    }
}

fn syntax(message: String) -> TypeError {
    TypeError::Syntax { message }
}

/// Parse `text`, resolving non-builtin names through `resolve`.
pub fn parse_with<F>(text: &str, resolve: F) -> Result<Type, TypeError>
where
    F: Fn(&str) -> Option<Type>,
{
    let raw = TypeParser::new(text).parse()?;
    check_arity(&raw)?;
    resolve_raw(&raw, &resolve)
}

fn check_arity(raw: &RawType) -> Result<(), TypeError> {
    let allowed: &[usize] = match raw.name.as_str() {
        "Array" => &[0, 1],
        "Hash" => &[0, 2],
        "Optional" => &[1],
        _ => &[0],
    };
    if !allowed.contains(&raw.params.len()) {
        return Err(syntax(match allowed {
            [0] => format!("{} does not accept type parameters", raw.name),
            _ => format!(
                "{} expects {} type parameter(s), got {}",
                raw.name,
                allowed
                    .iter()
                    .filter(|n| **n > 0)
                    .map(|n| n.to_string())
                    .collect::<Vec<_>>()
                    .join(" or "),
                raw.params.len()
            ),
        }));
    }
    raw.params.iter().try_for_each(check_arity)
}

fn resolve_raw<F>(raw: &RawType, resolve: &F) -> Result<Type, TypeError>
where
    F: Fn(&str) -> Option<Type>,
{
    let params = raw
        .params
        .iter()
        .map(|p| resolve_raw(p, resolve))
        .collect::<Result<Vec<_>, _>>()?;
    let mut params = params.into_iter();

    let ty = match raw.name.as_str() {
        "Any" => Type::Any,
        "String" => Type::String,
        "Integer" => Type::Integer,
        "Float" => Type::Float,
        "Boolean" => Type::Boolean,
        "Array" => Type::array(params.next().unwrap_or(Type::Any)),
        "Hash" => {
            let key = params.next().unwrap_or(Type::Any);
            let value = params.next().unwrap_or(Type::Any);
            Type::hash(key, value)
        }
        "Optional" => params.next().unwrap_or(Type::Any).optional(),
        name => resolve(name).ok_or_else(|| TypeError::Unresolved {
            name: name.to_string(),
        })?,
    };
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin(text: &str) -> Result<Type, TypeError> {
        parse_with(text, |_| None)
    }

    #[test]
    fn parses_nested_parameters() {
        let ty = builtin("Hash[String, Array[Optional[Integer]]]").unwrap();
        assert_eq!(
            ty,
            Type::hash(Type::String, Type::array(Type::Integer.optional()))
        );
    }

    #[test]
    fn whitespace_is_insignificant() {
        assert_eq!(
            builtin(" Hash [ String ,String ] ").unwrap(),
            Type::hash(Type::String, Type::String)
        );
    }

    #[test]
    fn unknown_name_is_unresolved() {
        let err = builtin("Array[No::Such::Type]").unwrap_err();
        assert_eq!(
            err,
            TypeError::Unresolved {
                name: "No::Such::Type".into()
            }
        );
    }

    #[test]
    fn custom_names_go_through_the_resolver() {
        let ty = parse_with("Optional[Aws::Vpc]", |n| {
            (n == "Aws::Vpc").then(|| Type::object(n))
        })
        .unwrap();
        assert_eq!(ty, Type::object("Aws::Vpc").optional());
    }

    #[test]
    fn unterminated_parameter_list() {
        let err = builtin("Hash[String, String").unwrap_err();
        assert_eq!(
            err,
            TypeError::Syntax {
                message: "expected one of ',' or ']', got ''".into()
            }
        );
    }

    #[test]
    fn syntax_error_wins_over_unknown_name() {
        let err = builtin("No::Such[String").unwrap_err();
        assert!(matches!(err, TypeError::Syntax { .. }));
    }

    #[test]
    fn lowercase_name_is_not_a_type() {
        let err = builtin("string").unwrap_err();
        assert_eq!(err.to_string(), "expected a type name, got 'string'");
    }

    #[test]
    fn trailing_input_is_rejected() {
        let err = builtin("String]").unwrap_err();
        assert_eq!(err.to_string(), "expected end of input, got ']'");
    }

    #[test]
    fn arity_is_checked() {
        assert_eq!(
            builtin("String[Integer]").unwrap_err().to_string(),
            "String does not accept type parameters"
        );
        assert_eq!(
            builtin("Hash[String]").unwrap_err().to_string(),
            "Hash expects 2 type parameter(s), got 1"
        );
    }
}
