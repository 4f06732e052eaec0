use serde::{Deserialize, Serialize};

/// One segment of an authored prompt.
///
/// A component with a single alternative is a fixed piece of text. A
/// component with two or more alternatives is a point of choice: every
/// alternative ends up in its own concrete prompt.
///
/// # Example
/// ```
/// use diffusion_loop::PromptComponent;
///
/// let subject = PromptComponent::fixed("a portrait of a cat");
/// let style = PromptComponent::choice(["oil painting", "watercolor"]).with_label("style");
///
/// assert!(subject.is_fixed());
/// assert_eq!(style.render(), "(oil painting | watercolor)");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptComponent {
    /// Display name for the UI. Not used when expanding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub alternatives: Vec<String>,
}

impl PromptComponent {
    /// A component that always contributes the same text.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            label: None,
            alternatives: vec![text.into()],
        }
    }

    /// A component with the given alternatives, in order.
    pub fn choice<I, S>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: None,
            alternatives: alternatives.into_iter().map(Into::into).collect(),
        }
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Replace an empty alternative list with a single empty string.
    pub fn normalized(mut self) -> Self {
        if self.alternatives.is_empty() {
            self.alternatives.push(String::new());
        }
        self
    }

    /// Number of alternatives after normalization (never zero).
    pub fn choice_count(&self) -> usize {
        self.alternatives.len().max(1)
    }

    /// Whether this component contributes no choice dimension.
    pub fn is_fixed(&self) -> bool {
        self.choice_count() == 1
    }

    /// Display fragment: `(a | b | c)` for choices, the bare text otherwise.
    pub fn render(&self) -> String {
        if self.is_fixed() {
            self.sole_alternative().to_string()
        } else {
            format!("({})", self.alternatives.join(" | "))
        }
    }

    fn sole_alternative(&self) -> &str {
        self.alternatives.first().map(String::as_str).unwrap_or("")
    }
}

/// The full enumeration derived from a sequence of [`PromptComponent`]s.
///
/// Recomputed wholesale by [`expand`] whenever the components change.
/// `ExpandedPrompt::default()` is the empty expansion with no prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedPrompt {
    /// Components joined by spaces, choices rendered as `(a | b)`.
    pub display_text: String,
    /// Leading sentinel `1`, then the alternative count of every choice component.
    pub dimension_sizes: Vec<usize>,
    /// One prompt per combination, earlier choices varying slowest.
    pub concrete_prompts: Vec<String>,
}

impl ExpandedPrompt {
    pub fn len(&self) -> usize {
        self.concrete_prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concrete_prompts.is_empty()
    }

    /// Prompt at `index`, wrapping around the enumeration.
    pub fn prompt_at(&self, index: usize) -> Option<&str> {
        if self.concrete_prompts.is_empty() {
            return None;
        }
        self.concrete_prompts
            .get(index % self.concrete_prompts.len())
            .map(String::as_str)
    }

    /// Product of the dimension sizes.
    pub fn combination_count(&self) -> usize {
        self.dimension_sizes.iter().product()
    }
}

/// Expand prompt components into every combination of their alternatives.
///
/// Total and pure: an empty alternative list counts as a single empty
/// alternative, and no input produces an error.
///
/// # Example
/// ```
/// use diffusion_loop::{expand, PromptComponent};
///
/// let expanded = expand(&[
///     PromptComponent::choice(["a red", "a blue"]),
///     PromptComponent::fixed("hat"),
/// ]);
///
/// assert_eq!(expanded.display_text, "(a red | a blue) hat");
/// assert_eq!(expanded.dimension_sizes, vec![1, 2]);
/// assert_eq!(expanded.concrete_prompts, vec!["a red hat", "a blue hat"]);
/// ```
pub fn expand(components: &[PromptComponent]) -> ExpandedPrompt {
    ExpandedPrompt {
        display_text: display_text(components),
        dimension_sizes: dimension_sizes(components),
        concrete_prompts: prompts(components).collect(),
    }
}

/// Render the components the way the prompt field displays them.
pub fn display_text(components: &[PromptComponent]) -> String {
    components
        .iter()
        .map(PromptComponent::render)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sentinel `1` followed by the alternative count of each choice component.
pub fn dimension_sizes(components: &[PromptComponent]) -> Vec<usize> {
    std::iter::once(1)
        .chain(
            components
                .iter()
                .filter(|c| !c.is_fixed())
                .map(PromptComponent::choice_count),
        )
        .collect()
}

/// Lazily enumerate the concrete prompts in [`expand`] order.
pub fn prompts(components: &[PromptComponent]) -> PromptIter<'_> {
    PromptIter {
        components,
        coordinates: Coordinates::new(&dimension_sizes(components)),
    }
}

/// Build the concrete prompt selected by one coordinate vector.
///
/// Slot 0 of `coord` belongs to the sentinel dimension and is skipped.
/// Returns `None` if `coord` is too short or selects a missing alternative.
pub fn prompt_at_coordinate(components: &[PromptComponent], coord: &[usize]) -> Option<String> {
    let mut parts = Vec::with_capacity(components.len());
    let mut slot = 1;
    for component in components {
        if component.is_fixed() {
            parts.push(component.sole_alternative());
        } else {
            let choice = *coord.get(slot)?;
            parts.push(component.alternatives.get(choice)?.as_str());
            slot += 1;
        }
    }
    Some(parts.join(" "))
}

/// Mixed-radix counter over a list of dimension sizes.
///
/// Yields every coordinate vector exactly once, the last dimension varying
/// fastest. Clone it to restart the enumeration from the same position.
#[derive(Debug, Clone)]
pub struct Coordinates {
    radices: Vec<usize>,
    next: Option<Vec<usize>>,
    remaining: usize,
}

impl Coordinates {
    pub fn new(radices: &[usize]) -> Self {
        let empty = radices.iter().any(|&r| r == 0);
        Self {
            radices: radices.to_vec(),
            next: (!empty).then(|| vec![0; radices.len()]),
            remaining: radices
                .iter()
                .try_fold(1usize, |acc, &r| acc.checked_mul(r))
                .unwrap_or(usize::MAX),
        }
    }
}

impl Iterator for Coordinates {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;

        let mut advanced = current.clone();
        for pos in (0..advanced.len()).rev() {
            advanced[pos] += 1;
            if advanced[pos] < self.radices[pos] {
                self.next = Some(advanced);
                break;
            }
            advanced[pos] = 0;
        }

        self.remaining = self.remaining.saturating_sub(1);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.next.is_none() {
            (0, Some(0))
        } else {
            (self.remaining, Some(self.remaining))
        }
    }
}

/// Lazy iterator returned by [`prompts`].
#[derive(Debug, Clone)]
pub struct PromptIter<'a> {
    components: &'a [PromptComponent],
    coordinates: Coordinates,
}

impl Iterator for PromptIter<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let coord = self.coordinates.next()?;
        prompt_at_coordinate(self.components, &coord)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.coordinates.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_choice_then_fixed() {
        let expanded = expand(&[
            PromptComponent::choice(["a1", "a2"]),
            PromptComponent::fixed("b1"),
        ]);
        assert_eq!(expanded.dimension_sizes, vec![1, 2]);
        assert_eq!(expanded.concrete_prompts, vec!["a1 b1", "a2 b1"]);
    }

    #[test]
    fn test_later_dimension_varies_fastest() {
        let expanded = expand(&[
            PromptComponent::choice(["a1", "a2"]),
            PromptComponent::choice(["b1", "b2"]),
        ]);
        assert_eq!(expanded.dimension_sizes, vec![1, 2, 2]);
        assert_eq!(
            expanded.concrete_prompts,
            vec!["a1 b1", "a1 b2", "a2 b1", "a2 b2"]
        );
    }

    #[test]
    fn test_mixed_radix_three_dimensions() {
        let expanded = expand(&[
            PromptComponent::choice(["x", "y"]),
            PromptComponent::fixed("and"),
            PromptComponent::choice(["1", "2", "3"]),
        ]);
        assert_eq!(expanded.dimension_sizes, vec![1, 2, 3]);
        assert_eq!(
            expanded.concrete_prompts,
            vec!["x and 1", "x and 2", "x and 3", "y and 1", "y and 2", "y and 3"]
        );
    }

    #[test]
    fn test_only_fixed_components() {
        let expanded = expand(&[
            PromptComponent::fixed("a castle"),
            PromptComponent::fixed("at dusk"),
        ]);
        assert_eq!(expanded.dimension_sizes, vec![1]);
        assert_eq!(expanded.concrete_prompts, vec!["a castle at dusk"]);
        assert_eq!(expanded.display_text, "a castle at dusk");
    }

    #[test]
    fn test_no_components() {
        let expanded = expand(&[]);
        assert_eq!(expanded.dimension_sizes, vec![1]);
        assert_eq!(expanded.concrete_prompts, vec![""]);
        assert_eq!(expanded.display_text, "");
    }

    #[test]
    fn test_empty_alternatives_treated_as_empty_string() {
        let expanded = expand(&[
            PromptComponent::fixed("cat"),
            PromptComponent::choice(Vec::<String>::new()),
        ]);
        assert_eq!(expanded.dimension_sizes, vec![1]);
        assert_eq!(expanded.concrete_prompts, vec!["cat "]);
        assert_eq!(expanded.display_text, "cat ");
    }

    #[test]
    fn test_empty_string_is_distinct_alternative() {
        let expanded = expand(&[
            PromptComponent::choice(["", "golden"]),
            PromptComponent::fixed("retriever"),
        ]);
        assert_eq!(expanded.concrete_prompts, vec![" retriever", "golden retriever"]);
        assert_eq!(expanded.display_text, "( | golden) retriever");
    }

    #[test]
    fn test_label_ignored() {
        let plain = expand(&[PromptComponent::choice(["a", "b"])]);
        let labeled = expand(&[PromptComponent::choice(["a", "b"]).with_label("letters")]);
        assert_eq!(plain, labeled);
    }

    #[test]
    fn test_normalized() {
        let component = PromptComponent::choice(Vec::<String>::new()).normalized();
        assert_eq!(component.alternatives, vec![String::new()]);
        assert!(component.is_fixed());
    }

    #[test]
    fn test_coordinates_order_and_size_hint() {
        let coords = Coordinates::new(&[1, 2, 3]);
        assert_eq!(coords.size_hint(), (6, Some(6)));
        let all: Vec<_> = coords.collect();
        assert_eq!(
            all,
            vec![
                vec![0, 0, 0],
                vec![0, 0, 1],
                vec![0, 0, 2],
                vec![0, 1, 0],
                vec![0, 1, 1],
                vec![0, 1, 2],
            ]
        );
    }

    #[test]
    fn test_coordinates_restart_by_clone() {
        let mut coords = Coordinates::new(&[1, 2]);
        let snapshot = coords.clone();
        assert_eq!(coords.next(), Some(vec![0, 0]));
        assert_eq!(coords.next(), Some(vec![0, 1]));
        assert_eq!(coords.next(), None);
        assert_eq!(snapshot.count(), 2);
    }

    #[test]
    fn test_coordinates_zero_radix_is_empty() {
        let mut coords = Coordinates::new(&[1, 0]);
        assert_eq!(coords.size_hint(), (0, Some(0)));
        assert_eq!(coords.next(), None);
    }

    #[test]
    fn test_prompt_at_wraps() {
        let expanded = expand(&[PromptComponent::choice(["p0", "p1", "p2"])]);
        assert_eq!(expanded.prompt_at(0), Some("p0"));
        assert_eq!(expanded.prompt_at(4), Some("p1"));
        assert_eq!(ExpandedPrompt::default().prompt_at(0), None);
    }

    #[test]
    fn test_prompt_at_coordinate_short_coord() {
        let components = [PromptComponent::choice(["a", "b"])];
        assert_eq!(prompt_at_coordinate(&components, &[0]), None);
        assert_eq!(prompt_at_coordinate(&components, &[0, 1]), Some("b".into()));
        assert_eq!(prompt_at_coordinate(&components, &[0, 5]), None);
    }

    #[test]
    fn test_serde_camel_case() {
        let expanded = expand(&[PromptComponent::choice(["a", "b"])]);
        let json = serde_json::to_value(&expanded).unwrap();
        assert_eq!(json["displayText"], "(a | b)");
        assert_eq!(json["dimensionSizes"], serde_json::json!([1, 2]));
        assert_eq!(json["concretePrompts"], serde_json::json!(["a", "b"]));
    }
}
