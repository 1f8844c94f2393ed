use basicroom::{
    config::AppConfig, ChannelParticipantFactory, InMemoryPipelineFactory, Room, RoomError,
    RoomOptions, TaskError, TaskFailureHook,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("basicroom={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(room = %config.room_name, "Starting room demo");

    if let Err(e) = run(config).await {
        error!(error = %e, "Room demo failed");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), RoomError> {
    let pipelines = Arc::new(if config.fail_pipeline {
        InMemoryPipelineFactory::failing()
    } else {
        InMemoryPipelineFactory::new()
    });

    let hook: TaskFailureHook = Arc::new(|label: &str, e: &TaskError| {
        warn!(serializer = %label, error = %e, "Room task failed");
    });
    let room = Room::with_options(
        config.room_name.clone(),
        pipelines.clone(),
        Arc::new(ChannelParticipantFactory),
        RoomOptions {
            task_failure_hook: Some(hook),
        },
    );

    // Each member gets a channel standing in for its socket
    let mut members = Vec::new();
    for name in &config.participants {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let participant = room.join(name, tx).await?;

        let member = name.clone();
        let printer = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                info!(participant = %member, frame = %frame, "Frame delivered");
            }
        });
        members.push((participant, printer));
    }

    let names = room.participant_names().await?;
    info!(
        participants = ?names,
        pipelines_created = pipelines.created_count(),
        "Everyone joined"
    );

    room.execute(async { Err::<(), TaskError>(TaskError::failed("demo task failure")) })
        .await?;

    if let Some((first, _)) = members.first() {
        room.leave(first.as_ref()).await?;
    }

    let names = room.participant_names().await?;
    info!(participants = ?names, "After first departure");

    if let Some(release) = room.close().await {
        match release.outcome().await {
            Ok(()) => info!("Pipeline released"),
            Err(e) => warn!(error = %e, "Pipeline release failed"),
        }
    }

    // Dropping the last handle to a participant closes its transport
    for (participant, printer) in members {
        drop(participant);
        if let Err(e) = printer.await {
            warn!(error = %e, "Frame printer task failed");
        }
    }

    Ok(())
}
