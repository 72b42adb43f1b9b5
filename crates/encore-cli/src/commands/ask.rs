use anyhow::{Context, Result};
use encore_etl::Config;

pub async fn run_ask(config: &Config, question: &str, verbose: bool) -> Result<()> {
    let assistant = super::build_assistant(config)?;

    if verbose {
        println!("🔍 Searching for: {question}");
    }

    let answer = assistant
        .answer(question)
        .await
        .context("Failed to answer question")?;

    if verbose {
        super::print_sources(&answer);
    }

    println!("\n🎸 Encore:\n{}\n", answer.text);
    Ok(())
}
