use chat_relay::cli::ClientArgs;
use chat_relay::client::{ ChatSession, HistoryStore, HtmlTranscript, RelayClient, TerminalRenderer };
use clap::Parser;
use dotenv::dotenv;
use log::{ info, warn };
use std::error::Error;
use std::io::Write;
use tokio::io::{ AsyncBufReadExt, BufReader };

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    let args = ClientArgs::parse();
    let default_filter = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let client = RelayClient::new(&args.relay_url)?;
    info!("Relay endpoint: {}", client.endpoint());
    let mut session = ChatSession::new(client);

    if !args.no_history {
        let store = HistoryStore::new(&args.history_dir, &args.history_key);
        if args.resume {
            match store.load() {
                Ok(history) => {
                    println!("Resumed {} messages from {}", history.len(), store.path().display());
                    session = session.with_history(history);
                }
                Err(e) => warn!("Could not read {}: {}", store.path().display(), e),
            }
        }
        session = session.with_store(store);
    }

    println!("Type a message and press Enter. /quit to exit.");
    let mut renderer = TerminalRenderer::new(std::io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if matches!(line.trim(), "/quit" | "/exit") {
            break;
        }
        session.submit(&line, &mut renderer).await;
    }

    if let Some(path) = &args.export_html {
        let transcript = HtmlTranscript::from_history(session.history());
        std::fs::write(path, transcript.to_html())?;
        println!("Transcript written to {}", path);
    }

    Ok(())
}
