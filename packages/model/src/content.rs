//! # Content expressions
//!
//! A node kind declares which children it accepts with a small regular
//! language over node kind and group names:
//!
//! ```text
//! block+                 one or more members of the "block" group
//! paragraph block*       a paragraph followed by any number of blocks
//! (heading | paragraph)? optional choice
//! list_item{1,3}         bounded repetition
//! ```
//!
//! Expressions are lexed with logos, parsed by recursive descent and compiled
//! to an NFA whose edges are labelled with node kind indices.

use crate::error::SchemaError;
use logos::Logos;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

/// Tokens of the content expression language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token<'src> {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Name(&'src str),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<usize>().ok())]
    Number(usize),

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token("|")]
    Pipe,

    #[token("*")]
    Star,

    #[token("+")]
    Plus,

    #[token("?")]
    Question,
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "name '{}'", name),
            Token::Number(n) => write!(f, "number {}", n),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Pipe => write!(f, "|"),
            Token::Star => write!(f, "*"),
            Token::Plus => write!(f, "+"),
            Token::Question => write!(f, "?"),
        }
    }
}

/// Tokenize a content expression
pub fn tokenize(source: &str) -> Result<Vec<(Token<'_>, usize)>, SchemaError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span.start)),
            Err(()) => {
                return Err(SchemaError::invalid_expression(
                    source,
                    span.start,
                    "unexpected character",
                ))
            }
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Choice(Vec<Expr>),
    Seq(Vec<Expr>),
    Star(Box<Expr>),
    Plus(Box<Expr>),
    Opt(Box<Expr>),
    Range {
        expr: Box<Expr>,
        min: usize,
        max: Option<usize>,
    },
    Kinds(Vec<usize>),
}

struct Parser<'a, R> {
    source: &'a str,
    tokens: Vec<(Token<'a>, usize)>,
    pos: usize,
    resolve: R,
}

impl<'a, R> Parser<'a, R>
where
    R: FnMut(&str) -> Option<Vec<usize>>,
{
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, offset)| *offset)
            .unwrap_or(self.source.len())
    }

    fn eat(&mut self, token: &Token<'_>) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::invalid_expression(self.source, self.offset(), message)
    }

    fn parse_choice(&mut self) -> Result<Expr, SchemaError> {
        let mut exprs = vec![self.parse_seq()?];
        while self.eat(&Token::Pipe) {
            exprs.push(self.parse_seq()?);
        }
        Ok(if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::Choice(exprs)
        })
    }

    fn parse_seq(&mut self) -> Result<Expr, SchemaError> {
        let mut exprs = Vec::new();
        while !matches!(self.peek(), None | Some(Token::RParen) | Some(Token::Pipe)) {
            exprs.push(self.parse_subscript()?);
        }
        if exprs.is_empty() && self.pos > 0 {
            return Err(self.error("expected a name or group"));
        }
        Ok(if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::Seq(exprs)
        })
    }

    fn parse_subscript(&mut self) -> Result<Expr, SchemaError> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat(&Token::Plus) {
                expr = Expr::Plus(Box::new(expr));
            } else if self.eat(&Token::Star) {
                expr = Expr::Star(Box::new(expr));
            } else if self.eat(&Token::Question) {
                expr = Expr::Opt(Box::new(expr));
            } else if self.eat(&Token::LBrace) {
                expr = self.parse_range(expr)?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_number(&mut self) -> Result<usize, SchemaError> {
        match self.peek() {
            Some(Token::Number(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(n)
            }
            _ => Err(self.error("expected a number")),
        }
    }

    fn parse_range(&mut self, expr: Expr) -> Result<Expr, SchemaError> {
        let min = self.parse_number()?;
        let mut max = Some(min);
        if self.eat(&Token::Comma) {
            max = if self.peek() == Some(&Token::RBrace) {
                None
            } else {
                Some(self.parse_number()?)
            };
        }
        if !self.eat(&Token::RBrace) {
            return Err(self.error("unclosed braced range"));
        }
        if let Some(max) = max {
            if max < min {
                return Err(self.error("range maximum below minimum"));
            }
        }
        Ok(Expr::Range {
            expr: Box::new(expr),
            min,
            max,
        })
    }

    fn parse_atom(&mut self) -> Result<Expr, SchemaError> {
        match self.peek().cloned() {
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.parse_choice()?;
                if !self.eat(&Token::RParen) {
                    return Err(self.error("missing closing paren"));
                }
                Ok(expr)
            }
            Some(Token::Name(name)) => {
                self.pos += 1;
                match (self.resolve)(name) {
                    Some(kinds) => Ok(Expr::Kinds(kinds)),
                    None => Err(SchemaError::UnknownContentName {
                        expr: self.source.to_string(),
                        name: name.to_string(),
                    }),
                }
            }
            Some(token) => Err(self.error(format!("unexpected {}", token))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

const DANGLING: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Edge {
    term: Option<usize>,
    to: usize,
}

#[derive(Default)]
struct NfaBuilder {
    states: Vec<Vec<Edge>>,
}

impl NfaBuilder {
    fn node(&mut self) -> usize {
        self.states.push(Vec::new());
        self.states.len() - 1
    }

    fn edge(&mut self, from: usize, term: Option<usize>) -> (usize, usize) {
        self.states[from].push(Edge { term, to: DANGLING });
        (from, self.states[from].len() - 1)
    }

    fn connect(&mut self, edges: &[(usize, usize)], to: usize) {
        for &(state, edge) in edges {
            self.states[state][edge].to = to;
        }
    }

    fn compile(&mut self, expr: &Expr, from: usize) -> Vec<(usize, usize)> {
        match expr {
            Expr::Choice(exprs) => {
                let mut out = Vec::new();
                for expr in exprs {
                    out.extend(self.compile(expr, from));
                }
                out
            }
            Expr::Seq(exprs) => {
                if exprs.is_empty() {
                    return vec![self.edge(from, None)];
                }
                let mut from = from;
                let mut out = Vec::new();
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        from = self.node();
                        self.connect(&out, from);
                    }
                    out = self.compile(expr, from);
                }
                out
            }
            Expr::Star(expr) => {
                let lp = self.node();
                let entry = self.edge(from, None);
                self.connect(&[entry], lp);
                let inner = self.compile(expr, lp);
                self.connect(&inner, lp);
                vec![self.edge(lp, None)]
            }
            Expr::Plus(expr) => {
                let lp = self.node();
                let first = self.compile(expr, from);
                self.connect(&first, lp);
                let again = self.compile(expr, lp);
                self.connect(&again, lp);
                vec![self.edge(lp, None)]
            }
            Expr::Opt(expr) => {
                let mut out = vec![self.edge(from, None)];
                out.extend(self.compile(expr, from));
                out
            }
            Expr::Range { expr, min, max } => {
                let mut cur = from;
                for _ in 0..*min {
                    let next = self.node();
                    let edges = self.compile(expr, cur);
                    self.connect(&edges, next);
                    cur = next;
                }
                match max {
                    None => {
                        let edges = self.compile(expr, cur);
                        self.connect(&edges, cur);
                    }
                    Some(max) => {
                        for _ in *min..*max {
                            let next = self.node();
                            let skip = self.edge(cur, None);
                            self.connect(&[skip], next);
                            let edges = self.compile(expr, cur);
                            self.connect(&edges, next);
                            cur = next;
                        }
                    }
                }
                vec![self.edge(cur, None)]
            }
            Expr::Kinds(kinds) => kinds.iter().map(|kind| self.edge(from, Some(*kind))).collect(),
        }
    }
}

/// A compiled content expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentExpr {
    source: String,
    states: Vec<Vec<Edge>>,
    accept: usize,
}

impl ContentExpr {
    /// Parse and compile `source`, resolving each name to the node kind
    /// indices it stands for (a kind name or a group name).
    pub fn parse<R>(source: &str, resolve: R) -> Result<Self, SchemaError>
    where
        R: FnMut(&str) -> Option<Vec<usize>>,
    {
        let tokens = tokenize(source)?;
        let expr = if tokens.is_empty() {
            Expr::Seq(Vec::new())
        } else {
            let mut parser = Parser {
                source,
                tokens,
                pos: 0,
                resolve,
            };
            let expr = parser.parse_choice()?;
            if parser.peek().is_some() {
                return Err(parser.error("unexpected trailing input"));
            }
            expr
        };

        let mut nfa = NfaBuilder::default();
        let start = nfa.node();
        let out = nfa.compile(&expr, start);
        let accept = nfa.node();
        nfa.connect(&out, accept);

        Ok(Self {
            source: source.to_string(),
            states: nfa.states,
            accept,
        })
    }

    /// The expression accepting only empty content.
    pub fn empty() -> Self {
        Self {
            source: String::new(),
            states: vec![vec![Edge { term: None, to: 1 }], Vec::new()],
            accept: 1,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// State before any child has been matched.
    pub fn start(&self) -> ContentMatch<'_> {
        ContentMatch {
            expr: self,
            states: self.closure(BTreeSet::from([0])),
        }
    }

    /// Whether the expression accepts the given sequence of kind indices.
    pub fn matches(&self, kinds: impl IntoIterator<Item = usize>) -> bool {
        self.start()
            .match_kinds(kinds)
            .map(|state| state.valid_end())
            .unwrap_or(false)
    }

    /// True when no child kind can ever be matched.
    pub fn is_leaf(&self) -> bool {
        self.states.iter().flatten().all(|edge| edge.term.is_none())
    }

    /// Every kind index that appears anywhere in the expression.
    pub fn kinds(&self) -> BTreeSet<usize> {
        self.states
            .iter()
            .flatten()
            .filter_map(|edge| edge.term)
            .collect()
    }

    /// Whether the two expressions share at least one kind.
    pub fn compatible(&self, other: &ContentExpr) -> bool {
        let ours = self.kinds();
        other.kinds().iter().any(|kind| ours.contains(kind))
    }

    fn closure(&self, seed: BTreeSet<usize>) -> Vec<usize> {
        let mut seen = seed.clone();
        let mut work: Vec<usize> = seed.into_iter().collect();
        while let Some(state) = work.pop() {
            for edge in &self.states[state] {
                if edge.term.is_none() && edge.to != DANGLING && seen.insert(edge.to) {
                    work.push(edge.to);
                }
            }
        }
        seen.into_iter().collect()
    }
}

/// A position inside a content expression, reached after matching some
/// prefix of children.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentMatch<'a> {
    expr: &'a ContentExpr,
    states: Vec<usize>,
}

impl<'a> ContentMatch<'a> {
    /// Advance over a child of the given kind.
    pub fn match_kind(&self, kind: usize) -> Option<ContentMatch<'a>> {
        let next: BTreeSet<usize> = self
            .states
            .iter()
            .flat_map(|state| &self.expr.states[*state])
            .filter(|edge| edge.term == Some(kind) && edge.to != DANGLING)
            .map(|edge| edge.to)
            .collect();
        if next.is_empty() {
            None
        } else {
            Some(ContentMatch {
                expr: self.expr,
                states: self.expr.closure(next),
            })
        }
    }

    pub fn match_kinds(&self, kinds: impl IntoIterator<Item = usize>) -> Option<ContentMatch<'a>> {
        let mut cur = self.clone();
        for kind in kinds {
            cur = cur.match_kind(kind)?;
        }
        Some(cur)
    }

    /// Whether the content may end here.
    pub fn valid_end(&self) -> bool {
        self.states.contains(&self.expr.accept)
    }

    /// Kinds that may follow, in declaration order.
    pub fn next_kinds(&self) -> Vec<usize> {
        let mut out = Vec::new();
        for state in &self.states {
            for edge in &self.expr.states[*state] {
                if let Some(term) = edge.term {
                    if !out.contains(&term) {
                        out.push(term);
                    }
                }
            }
        }
        out
    }

    /// The first kind that may follow, if any.
    pub fn default_kind(&self, mut usable: impl FnMut(usize) -> bool) -> Option<usize> {
        self.next_kinds().into_iter().find(|kind| usable(*kind))
    }

    /// Find the shortest sequence of kinds to insert here so that `after`
    /// matches behind it (and, with `to_end`, completes the content).
    ///
    /// Only kinds accepted by `creatable` are considered as fillers.
    pub fn fill_before(
        &self,
        after: &[usize],
        to_end: bool,
        mut creatable: impl FnMut(usize) -> bool,
    ) -> Option<Vec<usize>> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        seen.insert(self.states.clone());
        queue.push_back((self.clone(), Vec::new()));

        while let Some((state, path)) = queue.pop_front() {
            if let Some(end) = state.match_kinds(after.iter().copied()) {
                if !to_end || end.valid_end() {
                    return Some(path);
                }
            }
            for kind in state.next_kinds() {
                if !creatable(kind) {
                    continue;
                }
                if let Some(next) = state.match_kind(kind) {
                    if seen.insert(next.states.clone()) {
                        let mut path = path.clone();
                        path.push(kind);
                        queue.push_back((next, path));
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // doc=0 paragraph=1 heading=2 text=3 list_item=4
    fn resolve(name: &str) -> Option<Vec<usize>> {
        match name {
            "doc" => Some(vec![0]),
            "paragraph" => Some(vec![1]),
            "heading" => Some(vec![2]),
            "text" => Some(vec![3]),
            "list_item" => Some(vec![4]),
            "block" => Some(vec![1, 2]),
            _ => None,
        }
    }

    #[test]
    fn test_tokens() {
        let tokens = tokenize("(paragraph | heading){1,2} block*").unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            kinds,
            vec![
                Token::LParen,
                Token::Name("paragraph"),
                Token::Pipe,
                Token::Name("heading"),
                Token::RParen,
                Token::LBrace,
                Token::Number(1),
                Token::Comma,
                Token::Number(2),
                Token::RBrace,
                Token::Name("block"),
                Token::Star,
            ]
        );
    }

    #[test]
    fn test_lexer_rejects_garbage() {
        assert!(matches!(
            tokenize("block & text"),
            Err(SchemaError::InvalidExpression { pos: 6, .. })
        ));
    }

    #[test]
    fn test_plus() {
        let expr = ContentExpr::parse("block+", resolve).unwrap();
        assert!(!expr.matches([]));
        assert!(expr.matches([1]));
        assert!(expr.matches([1, 2, 1]));
        assert!(!expr.matches([3]));
    }

    #[test]
    fn test_star_and_empty() {
        let star = ContentExpr::parse("text*", resolve).unwrap();
        assert!(star.matches([]));
        assert!(star.matches([3, 3]));
        assert!(!star.matches([1]));

        let empty = ContentExpr::parse("", resolve).unwrap();
        assert!(empty.matches([]));
        assert!(empty.is_leaf());
        assert!(!empty.matches([3]));
    }

    #[test]
    fn test_sequence() {
        let expr = ContentExpr::parse("paragraph block*", resolve).unwrap();
        assert!(!expr.matches([]));
        assert!(!expr.matches([2]));
        assert!(expr.matches([1]));
        assert!(expr.matches([1, 2, 2]));
    }

    #[test]
    fn test_choice_and_optional() {
        let expr = ContentExpr::parse("(heading | list_item)? paragraph", resolve).unwrap();
        assert!(expr.matches([1]));
        assert!(expr.matches([2, 1]));
        assert!(expr.matches([4, 1]));
        assert!(!expr.matches([4, 2]));
    }

    #[test]
    fn test_ranges() {
        let bounded = ContentExpr::parse("paragraph{2,3}", resolve).unwrap();
        assert!(!bounded.matches([1]));
        assert!(bounded.matches([1, 1]));
        assert!(bounded.matches([1, 1, 1]));
        assert!(!bounded.matches([1, 1, 1, 1]));

        let open = ContentExpr::parse("paragraph{2,}", resolve).unwrap();
        assert!(open.matches([1, 1, 1, 1]));
        assert!(!open.matches([1]));
    }

    #[test]
    fn test_unknown_name() {
        let err = ContentExpr::parse("blok+", resolve).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownContentName {
                expr: "blok+".to_string(),
                name: "blok".to_string()
            }
        );
    }

    #[test]
    fn test_malformed() {
        assert!(ContentExpr::parse("(block", resolve).is_err());
        assert!(ContentExpr::parse("block{3,1}", resolve).is_err());
        assert!(ContentExpr::parse("block |", resolve).is_err());
    }

    #[test]
    fn test_fill_before() {
        let expr = ContentExpr::parse("paragraph block*", resolve).unwrap();
        let fill = expr.start().fill_before(&[], true, |_| true).unwrap();
        assert_eq!(fill, vec![1]);

        let fill = expr.start().fill_before(&[2], true, |_| true).unwrap();
        assert_eq!(fill, vec![1]);

        let plus = ContentExpr::parse("block+", resolve).unwrap();
        let fill = plus.start().fill_before(&[], true, |kind| kind != 1).unwrap();
        assert_eq!(fill, vec![2]);
    }

    #[test]
    fn test_next_kinds_follow_declaration_order() {
        let expr = ContentExpr::parse("block+", resolve).unwrap();
        assert_eq!(expr.start().next_kinds(), vec![1, 2]);
        assert_eq!(expr.start().default_kind(|k| k != 1), Some(2));
    }
}
