use dotenv::dotenv;
use pdf_assistant::{AssistantConfig, AssistantSession};
use std::io::{self, Write};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let pdf_paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if pdf_paths.is_empty() {
        eprintln!("Usage: chat_with_pdf <file.pdf> [more.pdf ...]");
        return Ok(());
    }

    let config = AssistantConfig::from_env()?;
    println!("💬 PDF Assistant (model: {})\n", config.model);

    let mut session = AssistantSession::from_config(config);

    // Each bind replaces the previous assistant, so questions go to the last file.
    for path in &pdf_paths {
        println!("☁️  Uploading {}...", path.display());
        let handle = session.bind_path(path).await?;
        println!("✅ Assistant {} ready.", handle.assistant_id);
    }

    println!("\n🤖 Ask questions about your document (type 'exit' or 'quit' to leave).");
    println!("------------------------------------------------------------------");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let question = input.trim();

        if question.eq_ignore_ascii_case("quit") || question.eq_ignore_ascii_case("exit") {
            break;
        }

        if question.is_empty() {
            continue;
        }

        println!("\nThinking...");

        match session.ask(question).await {
            Ok(answers) => {
                for answer in answers {
                    println!("\nAnswer: {}\n", answer);
                }
                println!("------------------------------------------------------------------");
            }
            Err(e) => {
                eprintln!("❌ Error: {}", e);
            }
        }
    }

    Ok(())
}
