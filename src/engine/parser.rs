//! nom-based parser for translated statement lines.
//!
//! One statement per line; a trailing `;` is accepted and ignored so that
//! verbatim interop lines without terminators still parse.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, none_of},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value},
    error::VerboseError,
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    Finish, IResult,
};

use crate::engine::ast::{BinOp, Expr, Stmt, UnaryOp};

pub type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Parses one translated line into a statement. The caller strips blank
/// lines; the terminator is optional here.
pub fn parse_line(line: &str) -> Result<Stmt, String> {
    let trimmed = line.trim().trim_end_matches(';').trim_end();
    all_consuming(terminated(parse_stmt, multispace0))(trimmed)
        .finish()
        .map(|(_, stmt)| stmt)
        .map_err(|_| format!("invalid statement: '{}'", line.trim()))
}

fn parse_stmt(input: &str) -> ParseResult<'_, Stmt> {
    let (input, _) = multispace0(input)?;
    alt((parse_print, parse_assign, map(parse_expr, Stmt::Expr)))(input)
}

/// `print ( expr )`
fn parse_print(input: &str) -> ParseResult<'_, Stmt> {
    let (input, _) = tag("print")(input)?;
    let (input, _) = multispace0(input)?;
    let (input, expr) = delimited(
        pair(char('('), multispace0),
        parse_expr,
        pair(multispace0, char(')')),
    )(input)?;
    Ok((input, Stmt::Print(expr)))
}

/// `place = expr`, where `=` must not begin `==`.
fn parse_assign(input: &str) -> ParseResult<'_, Stmt> {
    let (input, name) = parse_place(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char('=')(input)?;
    let (input, _) = not(char('='))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, value) = parse_expr(input)?;
    Ok((input, Stmt::Assign { name, value }))
}

/// `ident` or `this.ident`; both resolve to the bare field name.
fn parse_place(input: &str) -> ParseResult<'_, String> {
    let (input, _) = opt(terminated(tag("this"), char('.')))(input)?;
    let (input, name) = parse_identifier(input)?;
    Ok((input, name))
}

fn parse_identifier(input: &str) -> ParseResult<'_, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        |s: &str| s.to_string(),
    )(input)
}

pub fn parse_expr(input: &str) -> ParseResult<'_, Expr> {
    parse_comparison(input)
}

fn parse_comparison(input: &str) -> ParseResult<'_, Expr> {
    let (input, lhs) = parse_additive(input)?;
    let (input, rest) = opt(tuple((
        delimited(multispace0, comparison_op, multispace0),
        parse_additive,
    )))(input)?;
    Ok((
        input,
        match rest {
            Some((op, rhs)) => Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            None => lhs,
        },
    ))
}

fn comparison_op(input: &str) -> ParseResult<'_, BinOp> {
    alt((
        value(BinOp::Eq, tag("==")),
        value(BinOp::Ne, tag("!=")),
        value(BinOp::Le, tag("<=")),
        value(BinOp::Ge, tag(">=")),
        value(BinOp::Lt, tag("<")),
        value(BinOp::Gt, tag(">")),
    ))(input)
}

fn parse_additive(input: &str) -> ParseResult<'_, Expr> {
    let (input, first) = parse_term(input)?;
    let (input, rest) = many0(tuple((
        delimited(
            multispace0,
            alt((value(BinOp::Add, char('+')), value(BinOp::Sub, char('-')))),
            multispace0,
        ),
        parse_term,
    )))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn parse_term(input: &str) -> ParseResult<'_, Expr> {
    let (input, first) = parse_unary(input)?;
    let (input, rest) = many0(tuple((
        delimited(
            multispace0,
            alt((
                value(BinOp::Mul, char('*')),
                value(BinOp::Div, char('/')),
                value(BinOp::Mod, char('%')),
            )),
            multispace0,
        ),
        parse_unary,
    )))(input)?;
    Ok((input, fold_binary(first, rest)))
}

fn fold_binary(first: Expr, rest: Vec<(BinOp, Expr)>) -> Expr {
    rest.into_iter().fold(first, |lhs, (op, rhs)| Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

fn parse_unary(input: &str) -> ParseResult<'_, Expr> {
    alt((
        map(
            preceded(pair(char('-'), multispace0), parse_unary),
            |operand| Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            },
        ),
        map(
            preceded(pair(char('!'), multispace0), parse_unary),
            |operand| Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            },
        ),
        parse_primary,
    ))(input)
}

fn parse_primary(input: &str) -> ParseResult<'_, Expr> {
    alt((
        parse_number,
        map(parse_string_literal, Expr::Str),
        delimited(
            pair(char('('), multispace0),
            parse_expr,
            pair(multispace0, char(')')),
        ),
        parse_var_or_bool,
    ))(input)
}

/// Integer or float literal; the decimal point decides which. A literal
/// that does not fit its type is a parse error, not a truncated value.
fn parse_number(input: &str) -> ParseResult<'_, Expr> {
    map_res(
        recognize(pair(digit1, opt(preceded(char('.'), digit1)))),
        |text: &str| -> Result<Expr, String> {
            if text.contains('.') {
                text.parse().map(Expr::Float).map_err(|e| e.to_string())
            } else {
                text.parse().map(Expr::Int).map_err(|e| e.to_string())
            }
        },
    )(input)
}

/// Parse string literals with proper escaping.
fn parse_string_literal(input: &str) -> ParseResult<'_, String> {
    delimited(
        char('"'),
        map(
            many0(alt((
                value('\n', tag("\\n")),
                value('\t', tag("\\t")),
                value('\\', tag("\\\\")),
                value('"', tag("\\\"")),
                none_of("\"\\"),
            ))),
            |chars| chars.into_iter().collect(),
        ),
        char('"'),
    )(input)
}

fn parse_var_or_bool(input: &str) -> ParseResult<'_, Expr> {
    let (input, name) = parse_place(input)?;
    let expr = match name.as_str() {
        "true" => Expr::Bool(true),
        "false" => Expr::Bool(false),
        _ => Expr::Var(name),
    };
    Ok((input, expr))
}
