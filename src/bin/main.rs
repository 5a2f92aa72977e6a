use chrono::Utc;
use futures::StreamExt as _;
use nova4x::config::CONFIG;
use nova4x::db::DbClient;
use nova4x::loader;
use nova4x::repo;
use tracing::*;

/// Maintenance sweep. The engine is lazy and correct without it; this just
/// keeps overdue bodies and fleets from piling work onto the first reader.
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let db = match DbClient::new().await {
        Ok(db) => db,
        Err(e) => {
            error!("failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "sweeper started, interval {}s",
        CONFIG.sweep_interval_secs
    );

    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(CONFIG.sweep_interval_secs));
    loop {
        interval.tick().await;
        if let Err(e) = sweep(&db).await {
            warn!("sweep failed: {}", e);
        }
    }
}

async fn sweep(db: &DbClient) -> nova4x::error::Result<()> {
    let now = Utc::now();
    let mut conn = db.conn().await?;

    let due_fleets = repo::fleets::due(&mut conn, now).await?;
    let due_bodies = repo::actions::due_bodies(&mut conn, now).await?;
    drop(conn);
    debug!(
        "sweep: {} fleets, {} bodies due",
        due_fleets.len(),
        due_bodies.len()
    );

    futures::stream::iter(due_fleets)
        .for_each_concurrent(4, |fleet| async move {
            match loader::fleet(db, fleet.id, now).await {
                Ok(_) => {}
                // consumed fleets disappear mid-advance, which is the goal
                Err(nova4x::error::Error::ElementNotFound) => {}
                Err(e) => warn!("fleet {} sweep failed: {}", fleet.id, e),
            }
        })
        .await;
    futures::stream::iter(due_bodies)
        .for_each_concurrent(4, |body_id| async move {
            if let Err(e) = loader::body(db, body_id, now).await {
                warn!("body {} sweep failed: {}", body_id, e);
            }
        })
        .await;
    Ok(())
}
