use shared::models::FeedType;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(about = "INCOIS buoy data proxy.")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the dashboard API.
    Http {
        #[arg(env = "INCOIS_SERVER_ADDRESS", default_value = "127.0.0.1:5000")]
        address: std::net::SocketAddr,
    },
    /// Scrape one moored buoy chart page and print the result.
    Scrape {
        /// Moored buoy identifier, e.g. AD06
        buoy_id: String,
        /// Parameter label exactly as listed upstream, e.g. "Air Temperature"
        parameter: String,
    },
    /// Fetch and normalize a single feed.
    Feed {
        #[arg(value_parser = parse_feed)]
        feed: FeedType,
    },
}

fn parse_feed(s: &str) -> Result<FeedType, String> {
    s.parse()
}
