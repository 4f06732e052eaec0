//! Expand a prompt written in display syntax and list every combination.
//!
//! ```sh
//! cargo run --example expand_prompt -- "a portrait of (a cat | a dog) in (oil | ink)"
//! ```

use diffusion_loop::{expand, parse};

fn main() {
    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "a (red | blue | green) hat on a (cat | dog)".to_string());

    let components = parse(&text);
    let expanded = expand(&components);

    println!("Prompt:     {}", expanded.display_text);
    println!("Dimensions: {:?}", expanded.dimension_sizes);
    println!("Combinations: {}", expanded.len());
    for (i, prompt) in expanded.concrete_prompts.iter().enumerate() {
        println!("  [{}] {}", i, prompt);
    }
}
