use std::sync::Arc;

use finsage::embeddings::HashingEmbedding;
use finsage::providers::completions::OpenAI;
use finsage::{Config, FinSage};

// cargo run --example ask -- "What was the highest stock price in 2023?"
// Reads `finsage.json` from the working directory when present.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = if std::path::Path::new("finsage.json").exists() {
        Config::from_path("finsage.json")?
    } else {
        Config::default()
    };
    let service = FinSage::new(
        config,
        Arc::new(HashingEmbedding::default()),
        Arc::new(OpenAI::new(None)?),
    );

    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let result = service.handle_query(&question).await;

    println!("{}", result.answer);
    if !result.sources.is_empty() {
        println!("\nSources: {}", result.sources.join(", "));
    }
    println!("\n{}", serde_json::to_string(&service.health())?);
    Ok(())
}
