//! One-shot fetch with the configured options; prints one line per event.

use quake_feed::display::{format_date, format_magnitude, split_location};
use quake_feed::feed::{config::FeedConfig, fetch_records};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    quake_feed::init_tracing();

    let cfg = FeedConfig::load_default()?;
    let fetcher = cfg.fetcher()?;
    let events = fetch_records(&fetcher, &cfg.endpoint, &cfg.request_options()).await?;

    if events.is_empty() {
        println!("no earthquakes found");
    }
    for ev in &events {
        let (offset, place) = split_location(ev.location());
        let offset = if offset.is_empty() { "Near the" } else { offset };
        println!(
            "{:>4}  {:<22} {:<40} {}",
            format_magnitude(ev.magnitude()),
            offset,
            place,
            format_date(ev.timestamp())
        );
    }
    Ok(())
}
