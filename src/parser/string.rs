use nom::{branch::alt, character::complete::char as nom_char, InputTake};

use super::result::{IResult, ParseError, Span};

pub fn string_literal(input: Span) -> IResult<String> {
    let (rest, quote) = alt((nom_char('"'), nom_char('\'')))(input)?;

    let mut value = String::new();
    let mut escaped = false;
    for (i, c) in rest.fragment().char_indices() {
        if escaped {
            match c {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                '\\' | '"' | '\'' => value.push(c),
                // Keep regex escapes such as \. intact.
                _ => {
                    value.push('\\');
                    value.push(c);
                }
            }
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            let (rest, _) = rest.take_split(i + c.len_utf8());
            return Ok((rest, value));
        } else {
            value.push(c);
        }
    }

    Err(nom::Err::Failure(ParseError::partial(
        "string literal",
        "closing quote",
        rest.take_split(rest.fragment().len()).0,
    )))
}
