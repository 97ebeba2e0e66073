use std::convert::TryFrom;

use nom::{branch::alt, bytes::complete::tag};

use super::common::{label_identifier, maybe_lpadded, metric_identifier, separated_list};
use super::result::{IResult, ParseError, Span};
use super::string::string_literal;
use crate::model::{LabelMatcher, MatchOp};

pub(super) fn vector_selector(input: Span) -> IResult<Vec<LabelMatcher>> {
    //   metric_identifier label_matchers
    // | metric_identifier
    // | label_matchers

    let (rest, metric) = match metric_identifier(input) {
        Ok((r, m)) => (r, Some(m)),
        Err(_) => (input, None),
    };

    let (rest, mut matchers) = match maybe_lpadded(label_matchers)(rest) {
        Ok((r, ms)) => (r, ms),
        Err(nom::Err::Error(_)) if metric.is_some() => (rest, vec![]),
        Err(e) => return Err(e),
    };

    if let Some(metric) = metric {
        if matchers.iter().any(|m| m.is_name_matcher()) {
            return Err(nom::Err::Failure(ParseError::new(
                String::from("potentially ambiguous metric name match"),
                input,
            )));
        }
        matchers.insert(0, LabelMatcher::name_matcher(metric));
    }

    // Same rule as Prometheus: a selector matching the empty label set would
    // select every series.
    if matchers.iter().all(|m| m.matches("")) {
        return Err(nom::Err::Failure(ParseError::new(
            String::from("vector selector must contain at least one non-empty matcher"),
            input,
        )));
    }

    Ok((rest, matchers))
}

fn label_matchers(input: Span) -> IResult<Vec<LabelMatcher>> {
    //   LEFT_BRACE label_match_list RIGHT_BRACE
    // | LEFT_BRACE label_match_list COMMA RIGHT_BRACE
    // | LEFT_BRACE RIGHT_BRACE

    separated_list(
        '{',
        '}',
        ',',
        label_matcher,
        "label matching",
        r#"identifier or "}""#,
    )(input)
}

fn label_matcher(input: Span) -> IResult<LabelMatcher> {
    // IDENTIFIER match_op STRING

    let (rest, label) = label_identifier(input)?;

    let (rest, op) = match maybe_lpadded(match_op)(rest) {
        Ok(v) => v,
        Err(_) => {
            return Err(nom::Err::Failure(ParseError::partial(
                "label matching",
                r#"one of "=", "!=", "=~", "!~""#,
                rest,
            )))
        }
    };

    let (rest, value) = match maybe_lpadded(string_literal)(rest) {
        Ok(v) => v,
        Err(_) => {
            return Err(nom::Err::Failure(ParseError::partial(
                "label matching",
                "label value as string literal",
                rest,
            )))
        }
    };

    let matcher = LabelMatcher::new(label, op, value)
        .map_err(|e| nom::Err::Failure(ParseError::new(e.to_string(), input)))?;

    Ok((rest, matcher))
}

fn match_op(input: Span) -> IResult<MatchOp> {
    let (rest, m) = alt((tag("=~"), tag("!~"), tag("!="), tag("=")))(input)?;
    let op = MatchOp::try_from(*m.fragment())
        .map_err(|e| nom::Err::Failure(ParseError::new(e.to_string(), input)))?;
    Ok((rest, op))
}
