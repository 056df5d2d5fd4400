use std::{sync::Arc, time::Duration};

use chrono::Utc;
use engine::{ChannelSink, Engine, Notification};
use migration::{Migrator, MigratorTrait};
use sea_orm::ConnectOptions;
use settings::Database;
use tokio::sync::mpsc;

mod settings;
mod timer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "coinquest={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;
    let (sink, inbox) = ChannelSink::new();
    let engine = Arc::new(
        Engine::builder()
            .database(db)
            .notification_sink(Arc::new(sink))
            .lock_timeout(Duration::from_millis(settings.wallet.lock_timeout_ms))
            .build()
            .await?,
    );

    tasks.spawn(store_notifications(Arc::clone(&engine), inbox));

    if settings.scheduler.enabled {
        let run_at = settings.scheduler.run_at()?;
        let tz = settings.scheduler.timezone()?;
        let engine = Arc::clone(&engine);
        tasks.spawn(async move {
            tracing::info!(%tz, %run_at, "recurring task scheduler enabled");
            // Catch up on anything missed while the daemon was down.
            run_scheduler(&engine, tz).await;
            loop {
                let now = Utc::now().with_timezone(&tz);
                let Some(next) = timer::next_run(&now, run_at) else {
                    tracing::error!("no next scheduler run could be computed");
                    return;
                };
                tracing::debug!(%next, "next scheduler run");
                tokio::time::sleep(timer::until(&now, &next)).await;
                run_scheduler(&engine, tz).await;
            }
        });
    } else {
        tracing::info!("recurring task scheduler disabled");
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::error!("failed to listen for shutdown signal: {err}");
            }
            tracing::info!("shutting down");
        }
        Some(_) = tasks.join_next() => {
            tracing::warn!("a background task stopped, shutting down");
        }
    }
    tasks.shutdown().await;

    Ok(())
}

async fn run_scheduler(engine: &Engine, tz: chrono_tz::Tz) {
    if let Err(err) = engine.run_recurring_tasks(Utc::now().with_timezone(&tz)).await {
        tracing::error!("scheduler run failed: {err}");
    }
}

/// Drain the notification channel into the stored inboxes.
async fn store_notifications(engine: Arc<Engine>, mut inbox: mpsc::UnboundedReceiver<Notification>) {
    while let Some(notification) = inbox.recv().await {
        if let Err(err) = engine.store_notification(&notification).await {
            tracing::warn!(
                user_id = %notification.user_id,
                kind = notification.kind.as_str(),
                "notification not stored: {err}"
            );
        }
    }
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let options = match config {
        // Every pooled connection would get its own empty in-memory database.
        Database::Memory => ConnectOptions::new("sqlite::memory:")
            .max_connections(1)
            .to_owned(),
        Database::Sqlite(path) => ConnectOptions::new(format!("sqlite:{path}?mode=rwc")),
    };

    let database = sea_orm::Database::connect(options).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
