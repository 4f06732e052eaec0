//! Cycle through every combination of a prompt against a running backend.
//!
//! Set `DIFFUSION_ENDPOINT` to point at the server (defaults to
//! `http://127.0.0.1:8000`) and `RUST_LOG=debug` to see each request.
//!
//! ```sh
//! DIFFUSION_ENDPOINT=http://127.0.0.1:8000 cargo run --example generation_loop
//! ```

use diffusion_loop::*;
use std::time::Duration;
use tokio::sync::watch;

const IMAGES: usize = 6;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let endpoint =
        std::env::var("DIFFUSION_ENDPOINT").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
    let client = HttpGenerationClient::new(endpoint).with_timeout(Duration::from_secs(120));

    let config = LoopConfig::builder()
        .with_cooldown(Duration::from_millis(250))
        .with_abort_in_flight_on_stop(true)
        .build();
    let generation = GenerationLoop::with_config(client, config);
    let mut events = generation.subscribe();

    let expanded = expand(&parse("a lighthouse at (dawn | dusk), (oil painting | pencil sketch)"));
    println!("{} combinations of: {}", expanded.len(), expanded.display_text);

    let (params_tx, params_rx) = watch::channel(
        GenerationParameters::default()
            .with_target_size(768, 512, false)
            .with_inference_steps(30)
            .with_guidance_scale(7.5),
    );
    generation.start(expanded, params_rx)?;

    while let Ok(event) = events.recv().await {
        match event {
            LoopEvent::ImageGenerated { index, image, .. } => {
                println!("[{}] {}", index, generation.client().image_url(&image));
                let done = generation.results()?.len();
                if done >= IMAGES {
                    generation.stop()?;
                    break;
                }
                // Later images get face restoration.
                if done == IMAGES / 2 {
                    params_tx.send_modify(|p| p.fix_faces = Some(true));
                }
            }
            LoopEvent::Failed { index, error, .. } => {
                eprintln!("Request {} failed: {}", index, error);
                break;
            }
            _ => {}
        }
    }

    println!("Generated {} image(s)", generation.results()?.len());
    Ok(())
}
