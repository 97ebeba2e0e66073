mod common;
mod result;
mod string;
mod vector;

pub use result::{ParseError, Span};

use crate::error::Result;
use crate::model::LabelMatcher;
use vector::vector_selector;

/// Parses a PromQL vector selector, e.g. `http_requests{code=~"5.."}`, into
/// its label matchers. A bare metric name becomes a leading `__name__`
/// equality matcher.
pub fn parse_selector(input: &str) -> Result<Vec<LabelMatcher>> {
    let (rest, matchers) = vector_selector(Span::new(input)).map_err(ParseError::from)?;

    let rest = common::skip_space(rest);
    if !rest.fragment().is_empty() {
        return Err(ParseError::partial("vector selector", "end of input", rest).into());
    }

    Ok(matchers)
}
