use candlefeed::FeedError;
use candlefeed::config::fetch_config;
use candlefeed::{FeedEvent, MarketFeed};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), FeedError> {
    // Initialize tracing subscriber, honoring RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let app_config = fetch_config()?;
    info!(url = app_config.websocket_url(), "Loaded configuration");

    let (mut feed, mut events) = MarketFeed::spawn(&app_config)?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(FeedEvent::Candles { topic, candles }) => {
                    if let Some(last) = candles.last() {
                        info!(
                            %topic,
                            count = candles.len(),
                            start = last.start,
                            open = %last.open,
                            high = %last.high,
                            low = %last.low,
                            close = %last.close,
                            "Candles"
                        );
                    }
                }
                Some(FeedEvent::Markets(tickers)) => {
                    for ticker in &tickers {
                        info!(
                            symbol = ticker.symbol,
                            price = %ticker.current_px,
                            ret_24h = %ticker.ret_24h_perc,
                            open = ticker.is_open,
                            "Market"
                        );
                    }
                }
                Some(FeedEvent::Connection(status)) => info!(?status, "Connection"),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    feed.shutdown().await;

    Ok(())
}
