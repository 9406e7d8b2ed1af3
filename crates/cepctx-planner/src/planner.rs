//! Plan enrichment: prefix a single plan body with the stream definitions it
//! actually uses.
//!
//! `ExecutionPlanner` is the seam for a real query-language planner. The bundled
//! `ReferencedStreamPlanner` works on tokens only; it never parses the query.

use std::collections::BTreeSet;

use cepctx_core::error::{Error, Result};
use cepctx_core::schema::{SchemaRegistry, StreamSchema};

pub trait ExecutionPlanner {
    /// Build a runnable program for `body` from the registered `schemas`.
    fn enrich<S: StreamSchema>(&self, schemas: &SchemaRegistry<S>, body: &str) -> Result<String>;
}

/// Selects every registered stream whose id appears as an identifier in the
/// plan body, and requires each `from`/`join` source to be registered or
/// created by the body itself (`define stream X`, `insert into X`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferencedStreamPlanner;

impl ReferencedStreamPlanner {
    /// Registered stream ids referenced by `body`, sorted.
    pub fn referenced_streams<S>(
        &self,
        schemas: &SchemaRegistry<S>,
        body: &str,
    ) -> Result<Vec<String>> {
        let tokens = tokenize(body);
        let local = local_streams(&tokens);

        for source in source_streams(&tokens) {
            if !schemas.contains(source) && !local.contains(source) {
                return Err(Error::UndefinedStream(source.to_string()));
            }
        }

        let used: BTreeSet<&str> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Ident(s) if schemas.contains(s) => Some(*s),
                _ => None,
            })
            .collect();
        Ok(used.into_iter().map(str::to_string).collect())
    }
}

impl ExecutionPlanner for ReferencedStreamPlanner {
    fn enrich<S: StreamSchema>(&self, schemas: &SchemaRegistry<S>, body: &str) -> Result<String> {
        let mut out = String::new();
        for id in self.referenced_streams(schemas, body)? {
            out.push_str(&schemas.render(&id)?);
        }
        out.push_str(body);
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Ident(&'a str),
    Sym(char),
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// String literals and comments are skipped so they never count as references.
fn tokenize(src: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        if c == '-' && matches!(chars.peek(), Some(&(_, '-'))) {
            for (_, n) in chars.by_ref() {
                if n == '\n' {
                    break;
                }
            }
            continue;
        }
        if c == '/' && matches!(chars.peek(), Some(&(_, '*'))) {
            chars.next();
            let mut prev = '\0';
            for (_, n) in chars.by_ref() {
                if prev == '*' && n == '/' {
                    break;
                }
                prev = n;
            }
            continue;
        }
        if c == '\'' || c == '"' {
            for (_, q) in chars.by_ref() {
                if q == c {
                    break;
                }
            }
            continue;
        }
        if is_ident_char(c) {
            let mut end = start + c.len_utf8();
            while let Some(&(i, n)) = chars.peek() {
                if !is_ident_char(n) {
                    break;
                }
                end = i + n.len_utf8();
                chars.next();
            }
            tokens.push(Token::Ident(&src[start..end]));
        } else {
            tokens.push(Token::Sym(c));
        }
    }
    tokens
}

/// Streams the body creates itself: `define stream X` and `... into X`.
fn local_streams<'a>(tokens: &[Token<'a>]) -> BTreeSet<&'a str> {
    let mut out = BTreeSet::new();
    for (i, tok) in tokens.iter().enumerate() {
        let Token::Ident(kw) = tok else { continue };
        if kw.eq_ignore_ascii_case("define") {
            if let (Some(Token::Ident(kind)), Some(Token::Ident(name))) =
                (tokens.get(i + 1), tokens.get(i + 2))
            {
                if kind.eq_ignore_ascii_case("stream") {
                    out.insert(*name);
                }
            }
        } else if kw.eq_ignore_ascii_case("into") {
            if let Some(Token::Ident(name)) = tokens.get(i + 1) {
                out.insert(*name);
            }
        }
    }
    out
}

/// Streams read by `from`/`join` clauses, with `every` and `alias=` skipped.
fn source_streams<'a>(tokens: &[Token<'a>]) -> Vec<&'a str> {
    let mut out = Vec::new();
    for (i, tok) in tokens.iter().enumerate() {
        let Token::Ident(kw) = tok else { continue };
        if !kw.eq_ignore_ascii_case("from") && !kw.eq_ignore_ascii_case("join") {
            continue;
        }
        let mut j = i + 1;
        if matches!(tokens.get(j), Some(Token::Ident(s)) if s.eq_ignore_ascii_case("every")) {
            j += 1;
        }
        if matches!(tokens.get(j + 1), Some(Token::Sym('='))) {
            j += 2;
        }
        if let Some(Token::Ident(stream)) = tokens.get(j) {
            out.push(*stream);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cepctx_core::schema::{DataType, Field, Schema};

    fn registry() -> SchemaRegistry {
        let schema = Schema::new(vec![Field::new("v", DataType::Int32)]);
        let mut reg = SchemaRegistry::new();
        reg.replace_all([
            ("Trades", schema.clone()),
            ("Quotes", schema.clone()),
            ("Unused", schema),
        ])
        .unwrap();
        reg
    }

    #[test]
    fn selects_only_referenced_streams() {
        let body = "from Trades#window.length(5) join Quotes on Trades.v == Quotes.v \
                    select Trades.v insert into Out;";
        let out = ReferencedStreamPlanner.enrich(&registry(), body).unwrap();
        assert_eq!(
            out,
            format!("define stream Quotes (v int);define stream Trades (v int);{body}")
        );
    }

    #[test]
    fn pattern_aliases_and_every_are_skipped() {
        let body = "from every e1=Trades -> e2=Quotes select e1.v insert into Out;";
        let ids = ReferencedStreamPlanner
            .referenced_streams(&registry(), body)
            .unwrap();
        assert_eq!(ids, vec!["Quotes", "Trades"]);
    }

    #[test]
    fn unknown_source_stream_fails() {
        let err = ReferencedStreamPlanner
            .enrich(&registry(), "from Missing select v insert into Out;")
            .unwrap_err();
        assert_eq!(err, Error::UndefinedStream("Missing".into()));
    }

    #[test]
    fn chained_queries_may_read_their_own_outputs() {
        let body = "from Trades[v > 10] select v insert into Big; \
                    from Big select v insert into Out;";
        let out = ReferencedStreamPlanner.enrich(&registry(), body).unwrap();
        assert_eq!(out, format!("define stream Trades (v int);{body}"));
    }

    #[test]
    fn inline_definitions_satisfy_sources() {
        let body = "define stream Extra (v int); from Extra join Quotes on Extra.v == Quotes.v \
                    select Extra.v insert into Out;";
        let ids = ReferencedStreamPlanner
            .referenced_streams(&registry(), body)
            .unwrap();
        assert_eq!(ids, vec!["Quotes"]);
    }

    #[test]
    fn comments_are_not_references() {
        let body = "-- reads from Orders later\n\
                    /* from Missing */ from Trades select v insert into Out;";
        let ids = ReferencedStreamPlanner
            .referenced_streams(&registry(), body)
            .unwrap();
        assert_eq!(ids, vec!["Trades"]);
    }

    #[test]
    fn local_output_does_not_hide_unknown_source() {
        let body = "from Trades select v insert into Big; from Orders select v insert into Out;";
        let err = ReferencedStreamPlanner
            .enrich(&registry(), body)
            .unwrap_err();
        assert_eq!(err, Error::UndefinedStream("Orders".into()));
    }

    #[test]
    fn quoted_text_is_not_a_reference() {
        let body = "from Trades[v == 'Unused'] select v insert into Out;";
        let ids = ReferencedStreamPlanner
            .referenced_streams(&registry(), body)
            .unwrap();
        assert_eq!(ids, vec!["Trades"]);
    }
}
