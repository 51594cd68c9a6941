//! Line-oriented chat client over the webchat runtime.
//!
//! Commands: `/image <path> [text]`, `/clear`, `/stats`, `/quit`.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use webchat::{AppConfig, Attachment, RuntimeBundle, TurnOutcome, build_runtime, init_logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();

    let config = AppConfig::from_env().context("invalid webchat configuration")?;
    let runtime = build_runtime(&config).context("failed to assemble chat runtime")?;

    let restored = runtime
        .chat
        .load_history()
        .await
        .context("failed to load chat history")?;
    info!(
        endpoint = %config.endpoint,
        model = %config.chat.generation.model,
        restored,
        "webchat ready"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "/quit" | "/exit" => break,
            "/clear" => {
                runtime.chat.clear_messages().await;
                println!("(conversation cleared)");
            }
            "/stats" => print_stats(&runtime),
            _ => {
                let (text, attachment) = parse_input(line);
                let outcome = runtime.chat.send_message(text, attachment).await;
                print_outcome(&runtime, &outcome);
            }
        }
    }

    Ok(())
}

fn parse_input(line: &str) -> (&str, Option<Attachment>) {
    let Some(rest) = line.strip_prefix("/image ") else {
        return (line, None);
    };
    let rest = rest.trim_start();
    match rest.split_once(char::is_whitespace) {
        Some((path, text)) => (text.trim(), Some(Attachment::file(path))),
        None => ("", Some(Attachment::file(rest))),
    }
}

fn print_outcome(runtime: &RuntimeBundle, outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Skipped => {}
        TurnOutcome::Busy => println!("(still waiting on the previous reply)"),
        TurnOutcome::Resolved { message } => {
            println!("{}", message.content);
            for source in &message.sources {
                match &source.url {
                    Some(url) => println!("  [{}] {url}", source.title),
                    None => println!("  [{}]", source.title),
                }
            }
        }
        TurnOutcome::AdmissionDenied { .. } | TurnOutcome::Failed { .. } => {
            if let Some(error) = runtime.chat.state().error {
                eprintln!("! {error}");
            }
        }
    }
}

fn print_stats(runtime: &RuntimeBundle) {
    let metrics = runtime.client.metrics();
    let window = runtime.limiter.snapshot();
    println!(
        "requests={} errors={} retries={} avg={:.0}ms error_rate={:.2}",
        metrics.request_count,
        metrics.error_count,
        metrics.retry_count,
        metrics.average_response_time_ms(),
        metrics.error_rate(),
    );
    println!(
        "window: {}/{} used, backoff x{:.2}, effective window {}s",
        window.live_requests,
        window.max_requests,
        window.backoff_multiplier,
        window.effective_window.as_secs(),
    );
    println!(
        "log: {} entries, {:.0}% errors",
        runtime.logger.len(),
        runtime.logger.error_rate() * 100.0
    );
}
