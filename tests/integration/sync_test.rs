//! End-to-end sync cycles against mock CoinGecko and Discord servers

use crate::support::{MockCoinGecko, MockDiscord, BOT_TOKEN, GUILD_TEXT, GUILD_VOICE};
use axum::http::StatusCode;
use price_ticker::cli::live_scheduler;
use price_ticker::config::Config;
use price_ticker::notify::{DispatchError, DispatchOutcome, DispatchStage};
use price_ticker::price::FetchError;
use price_ticker::sync::SchedulerState;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TOKENS: &str = r#"
[[tokens]]
id = "stepn"
symbol = "GMT"
emoji = "🟡"

[[tokens]]
id = "green-satoshi-token"
symbol = "GST"
emoji = "⚪"
"#;

/// Config pointing at the mocks, with targets taken from the env override
fn config(pricing: &str, discord: &str, extra: &str, targets: &str) -> Config {
    let text = format!(
        r#"
[pricing]
base_url = "{pricing}"
max_attempts = 3
retry_delay_secs = 0

[discord]
api_base = "{discord}"

{extra}
{TOKENS}
"#
    );
    let mut config = Config::parse(&text).unwrap();
    config.apply_overrides(|key| match key {
        "DISCORD_BOT_TOKEN" => Some(BOT_TOKEN.to_string()),
        "TARGET_CHANNEL_IDS" => Some(targets.to_string()),
        _ => None,
    });
    config.validate().unwrap();
    config
}

fn gmt_only() -> serde_json::Value {
    json!({"stepn": {"usd": 0.1234, "jpy": 18.5}})
}

#[tokio::test]
async fn test_cycle_renames_and_omits_missing_token() {
    let coingecko = MockCoinGecko::new(vec![(StatusCode::OK, gmt_only())]);
    let discord = MockDiscord::default()
        .with_channel("T1", "old", GUILD_VOICE)
        .with_channel("T2", "old", GUILD_VOICE);
    let config = config(
        &coingecko.start().await,
        &discord.start().await,
        "",
        "T1,T2",
    );
    let scheduler = live_scheduler(&config).unwrap();

    let report = scheduler.run_cycle().await;

    assert_eq!(report.plan.len(), 1);
    assert_eq!(report.plan.omitted, ["green-satoshi-token"]);
    assert_eq!(report.outcomes, [DispatchOutcome::Applied]);
    assert_eq!(discord.name_of("T1"), "🟡 GMT: $0.123 / ¥18.50");
    assert_eq!(discord.name_of("T2"), "old");
}

#[tokio::test]
async fn test_rate_limited_cycle_touches_nothing() {
    let coingecko = MockCoinGecko::always(StatusCode::TOO_MANY_REQUESTS, "{}");
    let discord = MockDiscord::default()
        .with_channel("T1", "old", GUILD_VOICE)
        .with_channel("T2", "old", GUILD_VOICE);
    let config = config(
        &coingecko.start().await,
        &discord.start().await,
        "",
        "T1,T2",
    );
    let scheduler = live_scheduler(&config).unwrap();

    let report = scheduler.run_cycle().await;

    assert_eq!(
        report.fetch_error,
        Some(FetchError::RateLimited { attempts: 3 })
    );
    assert_eq!(coingecko.request_count(), 3);
    assert!(discord.calls().is_empty());
}

#[tokio::test]
async fn test_failing_target_does_not_block_others() {
    let coingecko = MockCoinGecko::new(vec![(StatusCode::OK, gmt_only())]);
    let discord = MockDiscord::default()
        .with_channel("locked-1", "old", GUILD_VOICE)
        .with_channel("T2", "old", GUILD_VOICE)
        .with_channel("T3", "general", GUILD_TEXT);
    let extra = r#"
[targets]
mode = "broadcast"
"#;
    let config = config(
        &coingecko.start().await,
        &discord.start().await,
        extra,
        "missing,locked-1,T2,T3",
    );
    let scheduler = live_scheduler(&config).unwrap();

    let report = scheduler.run_cycle().await;

    assert_eq!(
        report.outcomes,
        [
            DispatchOutcome::Failed {
                stage: DispatchStage::Resolve,
                error: DispatchError::NotFound("missing".to_string()),
            },
            DispatchOutcome::Failed {
                stage: DispatchStage::Apply,
                error: DispatchError::Forbidden("locked-1".to_string()),
            },
            DispatchOutcome::Applied,
            DispatchOutcome::Failed {
                stage: DispatchStage::Apply,
                error: DispatchError::UnsupportedOperation {
                    id: "T3".to_string(),
                    operation: "rename",
                    kind: price_ticker::notify::DestinationKind::Text,
                },
            },
        ]
    );
    assert_eq!(discord.name_of("T2"), "🟡 GMT: $0.123 / ¥18.50");
    assert!(!discord.calls().contains(&"PATCH T3".to_string()));
}

#[tokio::test]
async fn test_repeated_prices_are_not_resent() {
    let coingecko = MockCoinGecko::always(
        StatusCode::OK,
        r#"{"stepn":{"usd":0.1234,"jpy":18.5},"green-satoshi-token":{"usd":0.0123,"jpy":1.8}}"#,
    );
    let discord = MockDiscord::default()
        .with_channel("T1", "old", GUILD_VOICE)
        .with_channel("P1", "prices", GUILD_TEXT);
    let extra = r#"
[targets]
mode = "paired"
default_kind = "post"
"#;
    let mut config = config(
        &coingecko.start().await,
        &discord.start().await,
        extra,
        "T1,P1",
    );
    config.targets.list[0].kind = price_ticker::config::TargetKind::Rename;
    let scheduler = live_scheduler(&config).unwrap();

    let first = scheduler.run_cycle().await;
    let second = scheduler.run_cycle().await;

    assert_eq!(
        first.outcomes,
        [DispatchOutcome::Applied, DispatchOutcome::Applied]
    );
    assert_eq!(
        second.outcomes,
        [DispatchOutcome::Unchanged, DispatchOutcome::Unchanged]
    );
    assert_eq!(discord.messages.lock().unwrap().len(), 1);
    let patches = discord
        .calls()
        .iter()
        .filter(|c| c.starts_with("PATCH"))
        .count();
    assert_eq!(patches, 1);
}

#[tokio::test]
async fn test_broadcast_posts_are_not_resent() {
    let coingecko = MockCoinGecko::always(
        StatusCode::OK,
        r#"{"stepn":{"usd":0.1234,"jpy":18.5},"green-satoshi-token":{"usd":0.0123,"jpy":1.8}}"#,
    );
    let discord = MockDiscord::default().with_channel("P1", "prices", GUILD_TEXT);
    let extra = r#"
[targets]
mode = "broadcast"
default_kind = "post"
"#;
    let config = config(
        &coingecko.start().await,
        &discord.start().await,
        extra,
        "P1",
    );
    let scheduler = live_scheduler(&config).unwrap();

    let first = scheduler.run_cycle().await;
    let second = scheduler.run_cycle().await;

    assert_eq!(
        first.outcomes,
        [DispatchOutcome::Applied, DispatchOutcome::Applied]
    );
    assert_eq!(
        second.outcomes,
        [DispatchOutcome::Unchanged, DispatchOutcome::Unchanged]
    );
    let contents: Vec<String> = discord
        .messages
        .lock()
        .unwrap()
        .iter()
        .map(|(_, body)| body["content"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        contents,
        ["🟡 GMT: $0.123 / ¥18.50", "⚪ GST: $0.012 / ¥1.80"]
    );
}

#[tokio::test]
async fn test_run_until_shutdown() {
    let coingecko = MockCoinGecko::always(
        StatusCode::OK,
        r#"{"stepn":{"usd":0.1234,"jpy":18.5}}"#,
    );
    let discord = MockDiscord::default().with_channel("T1", "old", GUILD_VOICE);
    let extra = r#"
[targets]
mode = "broadcast"
"#;
    let config = config(
        &coingecko.start().await,
        &discord.start().await,
        extra,
        "T1",
    );
    let scheduler = live_scheduler(&config).unwrap();
    let mut states = scheduler.subscribe();
    let shutdown = CancellationToken::new();

    let run = scheduler.run(shutdown.clone());
    let observe = async {
        // Startup cycle begins right after login
        states
            .wait_for(|s| *s == SchedulerState::Running)
            .await
            .unwrap();
        states.wait_for(|s| *s == SchedulerState::Idle).await.unwrap();
        shutdown.cancel();
    };

    let (result, ()) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(run, observe)
    })
    .await
    .unwrap();

    result.unwrap();
    assert_eq!(coingecko.request_count(), 1);
    assert_eq!(discord.name_of("T1"), "🟡 GMT: $0.123 / ¥18.50");
}

#[tokio::test]
async fn test_run_fails_on_rejected_token() {
    let coingecko = MockCoinGecko::always(StatusCode::OK, "{}");
    let discord = MockDiscord::default().with_channel("T1", "old", GUILD_VOICE);
    let extra = r#"
[targets]
mode = "broadcast"
"#;
    let mut config = config(
        &coingecko.start().await,
        &discord.start().await,
        extra,
        "T1",
    );
    config.discord.bot_token = Some("revoked".to_string());
    let scheduler = live_scheduler(&config).unwrap();

    let result = scheduler.run(CancellationToken::new()).await;

    assert_eq!(result, Err(DispatchError::Unauthorized));
    assert_eq!(coingecko.request_count(), 0);
}
