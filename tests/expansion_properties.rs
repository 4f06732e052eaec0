//! Property-based tests for prompt expansion

use diffusion_loop::prompt::{dimension_sizes, prompt_at_coordinate, prompts};
use diffusion_loop::{expand, parse, PromptComponent};
use proptest::prelude::*;

/// Components with zero to three alternatives each.
fn components() -> impl Strategy<Value = Vec<PromptComponent>> {
    prop::collection::vec(
        prop::collection::vec("[a-z]{0,3}", 0..4).prop_map(PromptComponent::choice),
        0..5,
    )
}

/// Components whose display text parses back unambiguously: non-empty
/// single-word fixed text and choices of two or more alternatives.
fn displayable_components() -> impl Strategy<Value = Vec<PromptComponent>> {
    let fixed = "[a-z]{1,3}".prop_map(PromptComponent::fixed);
    let choice = prop::collection::vec("[a-z]{0,3}", 2..4).prop_map(PromptComponent::choice);
    prop::collection::vec(prop_oneof![fixed, choice], 0..5)
}

/// Test that the number of prompts is the product of the dimension sizes
#[test]
fn test_prompt_count_is_product_of_dimensions() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&components(), |components| {
            let expanded = expand(&components);

            assert_eq!(expanded.dimension_sizes[0], 1);
            assert!(expanded.dimension_sizes[1..].iter().all(|&d| d >= 2));
            assert_eq!(expanded.len(), expanded.combination_count());
            assert!(!expanded.is_empty());

            Ok(())
        })
        .unwrap();
}

/// Test that expansion is a pure function of its input
#[test]
fn test_expansion_determinism_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&components(), |components| {
            assert_eq!(expand(&components), expand(&components));
            assert_eq!(
                prompts(&components).collect::<Vec<_>>(),
                expand(&components).concrete_prompts
            );

            Ok(())
        })
        .unwrap();
}

/// Test that prompt `i` is the mixed-radix decoding of `i`, last dimension fastest
#[test]
fn test_prompt_order_matches_mixed_radix() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&components(), |components| {
            let dims = dimension_sizes(&components);
            let expanded = expand(&components);

            for (i, prompt) in expanded.concrete_prompts.iter().enumerate() {
                let mut coord = vec![0; dims.len()];
                let mut rest = i;
                for pos in (0..dims.len()).rev() {
                    coord[pos] = rest % dims[pos];
                    rest /= dims[pos];
                }
                assert_eq!(rest, 0);
                assert_eq!(prompt_at_coordinate(&components, &coord).as_ref(), Some(prompt));
            }

            Ok(())
        })
        .unwrap();
}

/// Test that each alternative appears in at least its share of prompts
#[test]
fn test_each_choice_alternative_appears() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&displayable_components(), |components| {
            let expanded = expand(&components);

            for component in components.iter().filter(|c| !c.is_fixed()) {
                let share = expanded.len() / component.alternatives.len();
                for alternative in &component.alternatives {
                    if alternative.is_empty() {
                        continue;
                    }
                    let hits = expanded
                        .concrete_prompts
                        .iter()
                        .filter(|p| p.split(' ').any(|word| word == alternative.as_str()))
                        .count();
                    assert!(hits >= share);
                }
            }

            Ok(())
        })
        .unwrap();
}

/// Test that parsing the display text reproduces the same prompts
#[test]
fn test_parse_display_text_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&displayable_components(), |components| {
            let expanded = expand(&components);
            let reparsed = expand(&parse(&expanded.display_text));

            assert_eq!(reparsed.concrete_prompts, expanded.concrete_prompts);
            assert_eq!(reparsed.dimension_sizes, expanded.dimension_sizes);

            Ok(())
        })
        .unwrap();
}
