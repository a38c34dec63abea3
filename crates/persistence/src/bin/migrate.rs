#![deny(warnings)]

use persistence::default_sqlite_url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_sqlite_url().to_string());
    let store = persistence::SnapshotStore::open(&url).await?;
    let rooms = store
        .load_aggregate()
        .await?
        .map(|s| s.rooms.len())
        .unwrap_or(0);
    println!("DB migrated at {} ({} rooms in last aggregate snapshot)", url, rooms);
    Ok(())
}
