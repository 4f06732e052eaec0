//! # diffusion-loop
//!
//! Prompt combinatorics and a cancellable generation loop for Stable
//! Diffusion web clients.
//!
//! A prompt is authored as a sequence of components, some fixed and some
//! offering alternatives (`a portrait of (a cat | a dog) in (oil | ink)`).
//! [`expand`] enumerates every combination in a deterministic order, and
//! [`GenerationLoop`] walks that enumeration, requesting one image at a time
//! from a [`GenerationClient`], cycling until it is stopped.
//!
//! ## Features
//!
//! - Deterministic expansion: earlier choices vary slowest, with lazy
//!   [`Coordinates`] and [`PromptIter`]
//! - Parsing of the `(a | b)` display syntax back into components ([`parse`])
//! - One request in flight at a time, results appended in issue order
//! - Epoch-based cancellation of stale responses
//! - Parameters read from a `tokio::sync::watch` channel at every request
//! - [`LoopEvent`]s over a broadcast channel
//!
//! ## Quick Start
//!
//! ```no_run
//! use diffusion_loop::*;
//! use tokio::sync::watch;
//!
//! # async fn example() -> diffusion_loop::Result<()> {
//! let expanded = expand(&parse("a (red | blue) hat on a (cat | dog)"));
//! assert_eq!(expanded.len(), 4);
//!
//! let generation = GenerationLoop::new(HttpGenerationClient::new("http://127.0.0.1:8000"));
//! let mut events = generation.subscribe();
//! let (_params_tx, params_rx) = watch::channel(GenerationParameters::default().with_size(512, 512));
//!
//! generation.start(expanded, params_rx)?;
//!
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         LoopEvent::ImageGenerated { index, image, .. } => println!("{}: {}", index, image.src),
//!         LoopEvent::Failed { error, .. } => {
//!             eprintln!("{}", error);
//!             break;
//!         }
//!         _ => {}
//!     }
//!     if generation.results()?.len() >= 8 {
//!         generation.stop()?;
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
mod executor;
pub mod params;
pub mod parser;
pub mod prompt;
pub mod state;
pub mod types;

pub use client::{GenerationClient, HttpGenerationClient};
pub use config::{LoopConfig, LoopConfigBuilder};
pub use controller::GenerationLoop;
pub use error::{LoopError, Result};
pub use events::LoopEvent;
pub use params::GenerationParameters;
pub use parser::parse;
pub use prompt::{expand, Coordinates, ExpandedPrompt, PromptComponent, PromptIter};
pub use state::{LoopState, Reconfigured, Resolution};
pub use types::{GeneratedImage, LoopSnapshot, LoopStatus, PendingRequest};
