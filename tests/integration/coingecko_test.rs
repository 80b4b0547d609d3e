//! Integration tests for the CoinGecko client and quote fetcher

use crate::support::{MockCoinGecko, NoWait};
use axum::http::StatusCode;
use price_ticker::price::{
    CoinGeckoClient, CoinGeckoConfig, FetchError, FetchOutcome, PriceQuote, PriceSource,
    QuoteFetcher, RetryPolicy, SourceError,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn client(base_url: String) -> CoinGeckoClient {
    CoinGeckoClient::with_config(CoinGeckoConfig {
        base_url,
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_simple_price_request_shape() {
    let mock = MockCoinGecko::new(vec![(
        StatusCode::OK,
        json!({"stepn": {"usd": 0.1234, "jpy": 18.5}}),
    )]);
    let client = client(mock.start().await);

    let prices = client
        .simple_price(&ids(&["stepn", "green-satoshi-token"]))
        .await
        .unwrap();

    assert_eq!(prices["stepn"]["jpy"].as_f64(), Some(18.5));
    let requests = mock.requests.lock().unwrap();
    assert_eq!(requests[0]["ids"], "stepn,green-satoshi-token");
    assert_eq!(requests[0]["vs_currencies"], "usd,jpy");
}

#[tokio::test]
async fn test_simple_price_status_mapping() {
    let mock = MockCoinGecko::new(vec![
        (StatusCode::TOO_MANY_REQUESTS, json!({"status": {"error_code": 429}})),
        (StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})),
    ]);
    let client = client(mock.start().await);
    let ids = ids(&["stepn"]);

    assert_eq!(client.simple_price(&ids).await, Err(SourceError::RateLimited));
    assert!(matches!(
        client.simple_price(&ids).await,
        Err(SourceError::Upstream(msg)) if msg.contains("500")
    ));
}

#[tokio::test]
async fn test_simple_price_malformed_body() {
    let mock = MockCoinGecko::always(StatusCode::OK, "<html>maintenance</html>");
    let client = client(mock.start().await);

    assert!(matches!(
        client.simple_price(&ids(&["stepn"])).await,
        Err(SourceError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_unreachable_host_is_upstream_error() {
    // Nothing listens on the discard port
    let client = client("http://127.0.0.1:9".to_string());

    assert!(matches!(
        client.simple_price(&ids(&["stepn"])).await,
        Err(SourceError::Upstream(_))
    ));
}

#[tokio::test]
async fn test_fetcher_recovers_after_rate_limits() {
    let mut responses = vec![(StatusCode::TOO_MANY_REQUESTS, json!({})); 3];
    responses.push((StatusCode::OK, json!({"stepn": {"usd": 0.1234, "jpy": 18.5}})));
    let mock = MockCoinGecko::new(responses);
    let sleeper = Arc::new(NoWait::default());
    let fetcher = QuoteFetcher::new(
        client(mock.start().await),
        RetryPolicy::new(5, Duration::from_secs(5)),
    )
    .with_sleeper(sleeper.clone());

    let outcome = fetcher.fetch(&ids(&["stepn"])).await;

    let quotes = outcome.quotes().unwrap();
    assert_eq!(
        quotes["stepn"],
        PriceQuote {
            usd: 0.1234,
            jpy: 18.5
        }
    );
    assert_eq!(mock.request_count(), 4);
    assert_eq!(*sleeper.sleeps.lock().unwrap(), vec![Duration::from_secs(5); 3]);
}

#[tokio::test]
async fn test_fetcher_gives_up_after_max_attempts() {
    let mock = MockCoinGecko::always(StatusCode::TOO_MANY_REQUESTS, "{}");
    let sleeper = Arc::new(NoWait::default());
    let fetcher = QuoteFetcher::new(
        client(mock.start().await),
        RetryPolicy::new(3, Duration::from_secs(5)),
    )
    .with_sleeper(sleeper.clone());

    let outcome = fetcher.fetch(&ids(&["stepn"])).await;

    assert_eq!(
        outcome,
        FetchOutcome::Failure(FetchError::RateLimited { attempts: 3 })
    );
    assert_eq!(mock.request_count(), 3);
    assert_eq!(sleeper.sleeps.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_fetcher_drops_invalid_tokens() {
    let mock = MockCoinGecko::new(vec![(
        StatusCode::OK,
        json!({
            "stepn": {"usd": 0.1, "jpy": 15},
            "green-satoshi-token": {"usd": "n/a", "jpy": 1.0},
        }),
    )]);
    let fetcher = QuoteFetcher::new(client(mock.start().await), RetryPolicy::default())
        .with_sleeper(Arc::new(NoWait::default()));

    let outcome = fetcher
        .fetch(&ids(&["stepn", "green-satoshi-token", "go-game-token"]))
        .await;

    let quotes = outcome.quotes().unwrap();
    assert_eq!(quotes.len(), 1);
    assert!(quotes.contains_key("stepn"));
}

#[tokio::test]
async fn test_per_token_mode_sends_one_request_each() {
    let mock = MockCoinGecko::new(vec![
        (StatusCode::OK, json!({"stepn": {"usd": 0.1, "jpy": 15}})),
        (StatusCode::INTERNAL_SERVER_ERROR, json!({})),
    ]);
    let fetcher = QuoteFetcher::new(client(mock.start().await), RetryPolicy::default())
        .with_sleeper(Arc::new(NoWait::default()))
        .batched(false);

    let outcome = fetcher.fetch(&ids(&["stepn", "green-satoshi-token"])).await;

    let requested: Vec<String> = mock
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|params| params["ids"].clone())
        .collect();
    assert_eq!(requested, ["stepn", "green-satoshi-token"]);
    assert_eq!(outcome.quotes().unwrap().len(), 1);
}
