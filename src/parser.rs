use crate::prompt::PromptComponent;

/// Parse prompt text written in display syntax into components.
///
/// A parenthesized group that contains `|` becomes a choice component.
/// Everything else, including emphasis like `(masterpiece)` and unbalanced
/// or nested parentheses, is kept as literal text. Blank input yields one
/// empty fixed component.
///
/// # Example
/// ```
/// use diffusion_loop::{parse, PromptComponent};
///
/// let components = parse("a (red | blue) hat, (masterpiece)");
/// assert_eq!(
///     components,
///     vec![
///         PromptComponent::fixed("a"),
///         PromptComponent::choice(["red", "blue"]),
///         PromptComponent::fixed("hat, (masterpiece)"),
///     ]
/// );
/// ```
pub fn parse(raw: &str) -> Vec<PromptComponent> {
    let mut components = Vec::new();
    let mut literal = String::new();
    let mut rest = raw;

    while let Some(open) = rest.find('(') {
        literal.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        match group_end(after_open) {
            Some(close) if after_open[..close].contains('|') => {
                flush_literal(&mut literal, &mut components);
                components.push(PromptComponent::choice(
                    after_open[..close].split('|').map(str::trim),
                ));
                rest = &after_open[close + 1..];
            }
            Some(close) => {
                literal.push_str(&rest[open..open + close + 2]);
                rest = &after_open[close + 1..];
            }
            None => {
                literal.push('(');
                rest = after_open;
            }
        }
    }
    literal.push_str(rest);
    flush_literal(&mut literal, &mut components);

    if components.is_empty() {
        components.push(PromptComponent::fixed(""));
    }
    components
}

/// Index of the `)` closing a group, if the group has no nested `(`.
fn group_end(s: &str) -> Option<usize> {
    let close = s.find(')')?;
    match s.find('(') {
        Some(nested) if nested < close => None,
        _ => Some(close),
    }
}

fn flush_literal(literal: &mut String, components: &mut Vec<PromptComponent>) {
    let text = literal.trim();
    if !text.is_empty() {
        components.push(PromptComponent::fixed(text));
    }
    literal.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::expand;

    #[test]
    fn test_plain_text() {
        assert_eq!(
            parse("  a lighthouse in a storm "),
            vec![PromptComponent::fixed("a lighthouse in a storm")]
        );
    }

    #[test]
    fn test_blank_input() {
        assert_eq!(parse(""), vec![PromptComponent::fixed("")]);
        assert_eq!(parse("   "), vec![PromptComponent::fixed("")]);
    }

    #[test]
    fn test_leading_and_adjacent_groups() {
        assert_eq!(
            parse("(a | b)(c | d) e"),
            vec![
                PromptComponent::choice(["a", "b"]),
                PromptComponent::choice(["c", "d"]),
                PromptComponent::fixed("e"),
            ]
        );
    }

    #[test]
    fn test_empty_alternative_kept() {
        assert_eq!(
            parse("( | golden) retriever"),
            vec![
                PromptComponent::choice(["", "golden"]),
                PromptComponent::fixed("retriever"),
            ]
        );
    }

    #[test]
    fn test_emphasis_stays_literal() {
        assert_eq!(
            parse("(masterpiece) a fox"),
            vec![PromptComponent::fixed("(masterpiece) a fox")]
        );
    }

    #[test]
    fn test_unbalanced_stays_literal() {
        assert_eq!(
            parse("a fox (running | jumping"),
            vec![PromptComponent::fixed("a fox (running | jumping")]
        );
    }

    #[test]
    fn test_nested_stays_literal() {
        assert_eq!(
            parse("((a | b) c)"),
            vec![
                PromptComponent::fixed("("),
                PromptComponent::choice(["a", "b"]),
                PromptComponent::fixed("c)"),
            ]
        );
    }

    #[test]
    fn test_display_text_round_trip() {
        let components = vec![
            PromptComponent::fixed("a portrait of"),
            PromptComponent::choice(["a cat", "a dog", "an owl"]),
            PromptComponent::fixed("in the style of"),
            PromptComponent::choice(["monet", "hokusai"]),
        ];
        let expanded = expand(&components);
        assert_eq!(parse(&expanded.display_text), components);
    }
}
