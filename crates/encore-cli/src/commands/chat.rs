use anyhow::Result;
use std::io::{self, BufRead, Write};

use encore_etl::Config;

const EXAMPLE_QUESTIONS: &[&str] = &[
    "Which shows had Dark Star?",
    "What was played as an encore on July 5, 2015?",
    "How many shows were at Soldier Field?",
    "What songs did they play most often?",
    "Show me all performances from the Fare Thee Well tour",
    "Which venue had the longest setlists?",
];

/// What a line typed at the prompt asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Quit,
    Help,
    Verbose(bool),
    Question(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    let lower = line.to_lowercase();

    match lower.as_str() {
        "" => Input::Empty,
        "quit" | "exit" | "q" => Input::Quit,
        "help" => Input::Help,
        "verbose on" => Input::Verbose(true),
        "verbose off" => Input::Verbose(false),
        _ => Input::Question(line),
    }
}

fn print_banner() {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!("🎸 Encore - Interactive Mode");
    println!("{rule}");
    println!("Ask questions about live music performances!");
    println!("Type 'quit' or 'exit' to end the session");
    println!("Type 'help' for example queries");
    println!("Type 'verbose on/off' to toggle detailed output");
    println!("{rule}\n");
}

fn print_help() {
    let rule = "-".repeat(60);
    println!("\n📖 Example Queries:");
    println!("{rule}");
    for example in EXAMPLE_QUESTIONS {
        println!("  • {example}");
    }
    println!("{rule}\n");
}

pub async fn run_chat(config: &Config, verbose: bool) -> Result<()> {
    let assistant = super::build_assistant(config)?;
    let mut verbose = verbose;

    print_banner();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("You: ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            // End of input.
            println!("\n\n👋 Thanks for using Encore!");
            break;
        };
        let line = line?;

        match parse_input(&line) {
            Input::Empty => {}
            Input::Quit => {
                println!("\n👋 Thanks for using Encore!");
                break;
            }
            Input::Help => print_help(),
            Input::Verbose(on) => {
                verbose = on;
                println!(
                    "✓ Verbose mode {}\n",
                    if on { "enabled" } else { "disabled" }
                );
            }
            Input::Question(question) => {
                if verbose {
                    println!("🔍 Searching for: {question}");
                }
                match assistant.answer(question).await {
                    Ok(answer) => {
                        if verbose {
                            super::print_sources(&answer);
                        }
                        println!("\n🎸 Encore:\n{}\n", answer.text);
                        println!("{}\n", "-".repeat(60));
                    }
                    Err(e) => eprintln!("\n❌ Error: {e}\n"),
                }
            }
        }
    }

    Ok(())
}
