use crate::signature::{ParamNode, TypeExpr};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char as nchar, multispace1, not_line_ending, one_of};
use nom::combinator::{map, opt, recognize, value, verify};
use nom::multi::{many0, many1, separated_list1};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated, tuple};
use nom::IResult;
use std::rc::Rc;

/// The syntactic form of a signature paragraph, before mapping-line validation and vararg
/// substitution. A vararg item initially carries the unresolvable placeholder `Name("...")`.
#[derive(Debug)]
pub(crate) struct RawSignature {
    pub(crate) designator: String,
    pub(crate) is_method: bool,
    pub(crate) params: Vec<ParamNode>,
    pub(crate) returns: Vec<TypeExpr>,
    pub(crate) mappings: Vec<(Rc<str>, TypeExpr)>,
}

pub(crate) fn full_signature(input: &str) -> IResult<&str, RawSignature> {
    map(
        delimited(
            pad,
            tuple((
                designator,
                delimited(
                    tuple((pad, nchar('('), pad)),
                    param_list,
                    tuple((pad, nchar(')'))),
                ),
                many0(preceded(pad, return_clause)),
                many0(preceded(pad, mapping)),
            )),
            pad,
        ),
        |((designator, is_method), params, returns, mappings)| RawSignature {
            designator,
            is_method,
            params,
            returns,
            mappings,
        },
    )(input)
}

/// Checks whether a paragraph starts like a signature: a designator followed by `(`. Paragraphs
/// failing the probe are skipped silently; paragraphs passing it but failing [full_signature]
/// are reported as malformed.
pub(crate) fn probe(input: &str) -> bool {
    let result: IResult<&str, ()> = value((), tuple((pad, designator, pad, nchar('('))))(input);
    result.is_ok()
}

fn designator(input: &str) -> IResult<&str, (String, bool)> {
    map(
        pair(
            recognize(pair(ident, many0(preceded(nchar('.'), ident)))),
            opt(preceded(nchar(':'), ident)),
        ),
        |(path, method)| match method {
            Some(name) => (format!("{path}:{name}"), true),
            None => (path.to_string(), false),
        },
    )(input)
}

// Items separated by whitespace with optional commas. A group may open with the separating
// comma inside the bracket, as in `f( a [, b] )`, and a trailing comma before `]` or `)` is
// fine too.
fn param_list(input: &str) -> IResult<&str, Vec<ParamNode>> {
    terminated(many0(preceded(list_comma, param_item)), list_comma)(input)
}

// Whitespace with at most one comma somewhere inside it. May match empty.
fn list_comma(input: &str) -> IResult<&str, ()> {
    value((), tuple((pad, opt(tuple((nchar(','), pad))))))(input)
}

fn param_item(input: &str) -> IResult<&str, ParamNode> {
    alt((
        map(tag("..."), |_| {
            ParamNode::Vararg(TypeExpr::Name(Rc::from("...")))
        }),
        map(ident, |name| ParamNode::Named(Rc::from(name))),
        map(
            delimited(pair(nchar('['), pad), param_list, pair(pad, nchar(']'))),
            ParamNode::Group,
        ),
    ))(input)
}

fn return_clause(input: &str) -> IResult<&str, TypeExpr> {
    preceded(pair(arrow, pad), type_expr)(input)
}

// `=>` with any number of `=`, so `==>` and `=====>` parse alike.
fn arrow(input: &str) -> IResult<&str, ()> {
    value((), pair(many1(nchar('=')), nchar('>')))(input)
}

fn mapping(input: &str) -> IResult<&str, (Rc<str>, TypeExpr)> {
    alt((
        map(
            separated_pair(tag("..."), mapping_colon, type_expr),
            |(_, expr)| (Rc::from("..."), expr),
        ),
        // For named parameters the right-hand side is restricted to an alternation of plain
        // type names; only the vararg admits a full type expression.
        map(
            separated_pair(ident, mapping_colon, name_alt),
            |(name, expr)| (Rc::from(name), expr),
        ),
    ))(input)
}

fn mapping_colon(input: &str) -> IResult<&str, ()> {
    value((), tuple((pad, nchar(':'), pad)))(input)
}

fn name_alt(input: &str) -> IResult<&str, TypeExpr> {
    map(
        separated_list1(
            tuple((pad, nchar('/'), pad)),
            map(ident, |name| TypeExpr::Name(Rc::from(name))),
        ),
        wrap_multiple(TypeExpr::Alt),
    )(input)
}

// Sequence (`,`) binds loosest, then alternation (`/`), then the postfix operators.
fn type_expr(input: &str) -> IResult<&str, TypeExpr> {
    map(
        separated_list1(tuple((pad, nchar(','), pad)), alt_expr),
        wrap_multiple(TypeExpr::Seq),
    )(input)
}

fn alt_expr(input: &str) -> IResult<&str, TypeExpr> {
    map(
        separated_list1(tuple((pad, nchar('/'), pad)), postfix_expr),
        wrap_multiple(TypeExpr::Alt),
    )(input)
}

fn wrap_multiple(f: impl Fn(Vec<TypeExpr>) -> TypeExpr) -> impl Fn(Vec<TypeExpr>) -> TypeExpr {
    move |mut items| {
        if items.len() > 1 {
            f(items)
        } else {
            items.remove(0)
        }
    }
}

fn postfix_expr(input: &str) -> IResult<&str, TypeExpr> {
    map(pair(primary_expr, opt(one_of("*?"))), |(expr, op)| match op {
        Some('*') => TypeExpr::Star(Box::new(expr)),
        Some('?') => TypeExpr::Opt(Box::new(expr)),
        _ => expr,
    })(input)
}

fn primary_expr(input: &str) -> IResult<&str, TypeExpr> {
    alt((
        map(ident, |name| TypeExpr::Name(Rc::from(name))),
        delimited(
            pair(nchar('('), pad),
            type_expr,
            pair(pad, nchar(')')),
        ),
    ))(input)
}

fn ident(input: &str) -> IResult<&str, &str> {
    verify(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        |name: &str| !name.starts_with(|c: char| c.is_ascii_digit()),
    )(input)
}

// `-- …` comments count as whitespace anywhere inside a signature paragraph.
fn pad(input: &str) -> IResult<&str, ()> {
    value((), many0(alt((value((), multispace1), comment))))(input)
}

fn comment(input: &str) -> IResult<&str, ()> {
    value((), pair(tag("--"), not_line_ending))(input)
}
