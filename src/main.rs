use peercall::application::SessionManager;
use peercall::config::Config;
use peercall::domain::session::identity::IdentityProvider;
use peercall::domain::session::value_object::CallPhase;
use peercall::infrastructure::media::MemoryMediaBridge;
use peercall::infrastructure::signaling::{MemorySignaling, MemorySignalingHub};
use peercall::interface::events::SessionNotice;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting peercall demo");

    // An optional path argument points at a TOML config file
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)?,
        None => Config::default(),
    };
    info!("Configuration loaded: {:?}", config);

    // Two endpoints on an in-process hub stand in for two browsers and a
    // signaling server
    demo_call_lifecycle(&config).await?;

    info!("Demo complete");
    Ok(())
}

/// Walk one call through its whole lifecycle
async fn demo_call_lifecycle(config: &Config) -> anyhow::Result<()> {
    let hub = Arc::new(MemorySignalingHub::new());
    let provider = IdentityProvider::new(config.identity.code_length);

    let (caller, mut caller_notices) = endpoint(&hub, &provider);
    let (callee, mut callee_notices) = endpoint(&hub, &provider);

    caller.startup().await?;
    callee.startup().await?;
    info!("Callee sharing code: {}", callee.identity());

    // Caller enters the callee's sharing code
    caller.place_call(callee.identity().as_str()).await?;

    // Callee sees the incoming call and answers it
    wait_for(&mut callee_notices, |n| {
        matches!(n, SessionNotice::IncomingCallPending { .. })
    })
    .await?;
    callee.accept_incoming().await?;

    // Both sides report connected once the streams cross
    wait_for(&mut caller_notices, |n| {
        matches!(n, SessionNotice::StateChanged { to: CallPhase::Connected, .. })
    })
    .await?;
    info!(
        "Connected: {} <-> {}",
        caller.identity(),
        callee.identity()
    );

    caller.hang_up().await?;
    wait_for(&mut callee_notices, |n| {
        matches!(
            n,
            SessionNotice::StateChanged { to: CallPhase::Idle, .. }
        )
    })
    .await?;
    info!("Call ended, both endpoints idle");

    caller.shutdown().await?;
    callee.shutdown().await?;

    Ok(())
}

fn endpoint(
    hub: &Arc<MemorySignalingHub>,
    provider: &IdentityProvider,
) -> (Arc<SessionManager>, broadcast::Receiver<SessionNotice>) {
    let (signaling, events) = MemorySignaling::attach(hub.clone());
    let manager = Arc::new(SessionManager::new(
        provider.generate(),
        signaling,
        Arc::new(MemoryMediaBridge::new()),
    ));
    let notices = manager.subscribe();
    tokio::spawn(manager.clone().run(events));
    (manager, notices)
}

async fn wait_for(
    notices: &mut broadcast::Receiver<SessionNotice>,
    predicate: impl Fn(&SessionNotice) -> bool,
) -> anyhow::Result<SessionNotice> {
    timeout(Duration::from_secs(2), async {
        loop {
            let notice = notices.recv().await?;
            if predicate(&notice) {
                return Ok(notice);
            }
        }
    })
    .await?
}
