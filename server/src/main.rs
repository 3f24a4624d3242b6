use clap::Parser;
use cli::{Cli, Command};

mod aggregate;
mod cache;
mod catalog;
mod cli;
mod config;
mod csv_export;
mod diagnostics;
mod error;
mod extract;
mod feeds;
mod fields;
mod normalizer;
mod parse;
mod proxy;
mod rama;
mod scrape;
mod server;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Cli::parse();

    match args.cmd {
        Command::Http { address } => server::run(address).await,
        Command::Scrape { buoy_id, parameter } => {
            let scraper = scrape::Scraper::new(config::config())?;
            let output = match scraper
                .scrape(&buoy_id, &parameter, &diagnostics::LogSink)
                .await
            {
                Ok(envelope) => serde_json::to_string_pretty(&envelope)?,
                Err(err) => serde_json::to_string_pretty(&err.body())?,
            };
            println!("{}", output);
            Ok(())
        }
        Command::Feed { feed } => {
            let client = feeds::IncoisClient::new(config::config())?;
            let result = feeds::fetch_feed(&client, feed, &diagnostics::LogSink).await;
            if let Some(cause) = &result.failure {
                anyhow::bail!("{} fetch failed: {}", feed, cause);
            }
            println!("{}", serde_json::to_string_pretty(&result.normalized.records)?);
            eprintln!(
                "{}: {} raw, {} kept, {} excluded",
                feed,
                result.normalized.raw_count,
                result.normalized.records.len(),
                result.normalized.excluded
            );
            Ok(())
        }
    }
}
