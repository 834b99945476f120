use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wikifeat_db::{CouchStore, StoreConfig};
use wikifeat_wikis::provision;

/// Provision wiki databases: `wikifeat-wikis-init <wiki-id>...`
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wikifeat_wikis=debug,wikifeat_db=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let wiki_ids: Vec<String> = std::env::args().skip(1).collect();
    if wiki_ids.is_empty() {
        eprintln!("usage: wikifeat-wikis-init <wiki-id>...");
        std::process::exit(2);
    }

    let config = StoreConfig::from_env();
    tracing::info!(url = %config.url, "Connecting to document store");
    let store = CouchStore::new(&config).expect("Invalid document store configuration");

    let mut failed = 0usize;
    for wiki_id in &wiki_ids {
        if let Err(e) = provision::create_wiki(&store, wiki_id).await {
            tracing::error!(error = %e, wiki_id = %wiki_id, "Failed to provision wiki");
            failed += 1;
        }
    }

    tracing::info!(
        requested = wiki_ids.len(),
        failed,
        "Wiki provisioning finished"
    );
    if failed > 0 {
        std::process::exit(1);
    }
}
