//! Pushes one synthetic post through the configured dispatcher.
//! Honours dry-run, so with a test config it only prints the result line.

use std::collections::BTreeSet;

use chrono::Utc;
use postwatch::config::load_config_default;
use postwatch::{build_dispatcher, Decision, Item};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let (_, cfg) = load_config_default()?;
    let dispatcher = build_dispatcher(&cfg)?;

    let source = cfg
        .sources
        .keys()
        .next()
        .cloned()
        .unwrap_or_else(|| "test".to_string());
    let recipients: BTreeSet<String> = cfg
        .sources
        .values()
        .flat_map(|s| s.filters.iter().flat_map(|f| f.notify.iter().cloned()))
        .collect();

    let item = Item {
        id: "demo".into(),
        title: "postwatch demo notification".into(),
        created: Utc::now(),
        permalink: format!("/r/{source}/"),
    };
    let decision = Decision {
        notify: true,
        recipients,
    };

    let outcome = dispatcher.dispatch(&source, &item, &decision).await?;
    println!("notify-demo done: {outcome:?}");
    Ok(())
}
