//! Image editing demo - describes an image, then edits it.
//!
//! Run with: `cargo run --example edit_image -- <input_image.png> [instruction]`
//!
//! Without an instruction the model's own description is used as the prompt.
//! Requires `GEMINI_API_KEY` (or `GOOGLE_API_KEY`). Set `RUST_LOG=gemedit=debug`
//! to see request timings.

use anyhow::Context;
use gemedit::{EditorController, GeminiProvider, ImageAsset, Outcome};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let input_path = args
        .next()
        .context("Usage: edit_image <input_image.png> [instruction]")?;
    let instruction = args.collect::<Vec<_>>().join(" ");

    let provider = GeminiProvider::builder().build()?;
    let asset = ImageAsset::from_path(&input_path).await?;
    anyhow::ensure!(asset.is_image(), "{input_path} is not a supported image");

    let mut editor = EditorController::new();
    editor.select_asset(asset);

    if instruction.trim().is_empty() {
        if editor.request_description(&provider).await != Outcome::Applied {
            anyhow::bail!("{}", editor.error().unwrap_or("description failed"));
        }
        println!("Prompt: {}", editor.instruction());
    } else {
        editor.set_instruction(instruction);
    }

    if editor.request_edit(&provider).await != Outcome::Applied {
        anyhow::bail!("{}", editor.error().unwrap_or("edit failed"));
    }

    let image = editor.result().context("edit produced no result")?;
    let output = image.suggested_file_name();
    image.save(&output)?;
    println!("Edited image saved to {output}");

    Ok(())
}
