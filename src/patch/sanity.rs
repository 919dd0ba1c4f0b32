//! Structural checks on a single replacement.
//!
//! A replacement is refused when it could change how the surrounding template
//! parses: unbalanced brackets, a quote that would end an attribute value
//! early, or template delimiters that were not there before.

/// Bracket pairs whose net balance must survive a replacement.
const BRACKETS: [(char, char); 4] = [('<', '>'), ('{', '}'), ('(', ')'), ('[', ']')];

/// Template engine delimiters a replacement may not introduce.
const TEMPLATE_DELIMITERS: [&str; 9] = ["{{", "}}", "{!!", "!!}", "{%", "%}", "<?", "?>", "@php"];

/// Check replacing `old` at byte `start` of `content` with `new`.
///
/// Returns the reason on failure.
pub fn check(content: &str, start: usize, old: &str, new: &str) -> Result<(), String> {
    for (open, close) in BRACKETS {
        if balance(old, open, close) != balance(new, open, close) {
            return Err(format!("changes the balance of `{open}` and `{close}`"));
        }
    }

    if let Some(quote) = attribute_quote(content, start)
        && new.contains(quote)
    {
        return Err(format!("`{quote}` would end the attribute value"));
    }

    for delim in TEMPLATE_DELIMITERS {
        if new.matches(delim).count() > old.matches(delim).count() {
            return Err(format!("introduces template delimiter `{delim}`"));
        }
    }

    Ok(())
}

fn balance(s: &str, open: char, close: char) -> isize {
    s.chars().fold(0, |acc, c| match c {
        c if c == open => acc + 1,
        c if c == close => acc - 1,
        _ => acc,
    })
}

/// Quote character enclosing `pos` when it lies inside a quoted attribute
/// value of an open tag.
fn attribute_quote(content: &str, pos: usize) -> Option<char> {
    let before = content.get(..pos)?;
    let tag_start = before.rfind('<')?;
    let mut quote: Option<char> = None;

    for c in before[tag_start + 1..].chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            // Tag closed before `pos`: we are in text
            (None, '>') => return None,
            (None, _) => {}
        }
    }
    quote
}
