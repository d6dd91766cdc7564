//! Reader for the s-expression surface of Lexis.
//!
//! Lists read as forms, `a:b` as qualified names and `()` as `nil`.

pub mod errors;

pub use errors::ParseError;

#[cfg(feature = "pest")]
pub use reader::{parse, parse_form, LexisParser, Rule};

#[cfg(feature = "pest")]
mod reader {
    use super::errors::{invalid_literal_error, pair_position, ParseError};
    use crate::quark::Quark;
    use crate::runtime::values::Value;
    use pest::iterators::Pair;
    use pest::Parser;

    // Define the parser struct using the grammar file
    #[derive(pest_derive::Parser)]
    #[grammar = "lexis.pest"] // Path relative to src/
    pub struct LexisParser;

    /// Read every top-level form of `source`.
    pub fn parse(source: &str) -> Result<Vec<Value>, ParseError> {
        let mut pairs = LexisParser::parse(Rule::program, source)?;
        let program = pairs
            .next()
            .ok_or_else(|| ParseError::Syntax("no program in input".to_string()))?;
        program
            .into_inner()
            .filter(|pair| pair.as_rule() != Rule::EOI)
            .map(build_value)
            .collect()
    }

    /// Read exactly one form.
    pub fn parse_form(source: &str) -> Result<Value, ParseError> {
        let mut forms = parse(source)?;
        match forms.len() {
            1 => Ok(forms.remove(0)),
            n => Err(ParseError::FormCount(n)),
        }
    }

    fn build_value(pair: Pair<Rule>) -> Result<Value, ParseError> {
        match pair.as_rule() {
            Rule::list => {
                let items = pair
                    .into_inner()
                    .map(build_value)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(items))
            }
            Rule::integer => pair
                .as_str()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| invalid_literal_error(format!("integer {}: {}", pair.as_str(), e), &pair)),
            Rule::real => pair
                .as_str()
                .parse::<f64>()
                .map(Value::Real)
                .map_err(|e| invalid_literal_error(format!("real {}: {}", pair.as_str(), e), &pair)),
            Rule::string => {
                let inner = pair.clone().into_inner().next().map(|p| p.as_str()).unwrap_or("");
                unescape(inner).map(Value::String).ok_or_else(|| {
                    invalid_literal_error(format!("string {}", pair.as_str()), &pair)
                })
            }
            Rule::boolean => Ok(Value::Boolean(pair.as_str() == "true")),
            Rule::nil => Ok(Value::Nil),
            Rule::qualified => Ok(Value::Qualified(
                pair.into_inner().map(|name| Quark::intern(name.as_str())).collect(),
            )),
            Rule::lexical => Ok(Value::Lexical(Quark::intern(pair.as_str()))),
            rule => Err(ParseError::UnexpectedRule {
                rule: format!("{:?}", rule),
                position: pair_position(&pair),
            }),
        }
    }

    fn unescape(text: &str) -> Option<String> {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                _ => return None,
            }
        }
        Some(out)
    }
}

#[cfg(all(test, feature = "pest"))]
mod tests {
    use super::*;
    use crate::runtime::values::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_scalars() {
        assert_eq!(
            parse("1 -2 2.5 true false nil \"a\\n\\\"b\\\"\"").unwrap(),
            vec![
                Value::Integer(1),
                Value::Integer(-2),
                Value::Real(2.5),
                Value::Boolean(true),
                Value::Boolean(false),
                Value::Nil,
                Value::from("a\n\"b\""),
            ]
        );
    }

    #[test]
    fn reads_names() {
        assert_eq!(
            parse("x .. nil? a:b:c - 12ab").unwrap(),
            vec![
                Value::lexical("x"),
                Value::lexical(".."),
                Value::lexical("nil?"),
                Value::qualified(&["a", "b", "c"]),
                Value::lexical("-"),
                Value::lexical("12ab"),
            ]
        );
    }

    #[test]
    fn reads_lists_comments_and_commas() {
        let forms = parse("# leading comment\n(f 1, (g) ())  # trailing").unwrap();
        assert_eq!(
            forms,
            vec![Value::list(vec![
                Value::lexical("f"),
                Value::Integer(1),
                Value::list(vec![Value::lexical("g")]),
                Value::Nil,
            ])]
        );
        assert_eq!(parse("").unwrap(), vec![]);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(parse("(f 1"), Err(ParseError::Syntax(_))));
        assert!(matches!(
            parse("99999999999999999999"),
            Err(ParseError::InvalidLiteral { .. })
        ));
        assert!(matches!(parse_form("1 2"), Err(ParseError::FormCount(2))));
        assert_eq!(parse_form("(a)").unwrap(), Value::list(vec![Value::lexical("a")]));
    }
}
