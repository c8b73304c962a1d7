use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 3000;

fn bind_addr_from_env_and_args() -> anyhow::Result<SocketAddr> {
    let mut bind_override: Option<SocketAddr> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args.next().ok_or_else(|| {
                    anyhow::anyhow!("--bind requires an address, e.g. 0.0.0.0:3000")
                })?;
                bind_override = Some(addr.parse()?);
            }
            "-h" | "--help" => {
                eprintln!(
                    "loadmix-testapp\n\nUSAGE:\n  loadmix-testapp [--bind 0.0.0.0:3000]\n\nENVIRONMENT:\n  PORT  Port to listen on when --bind is not given (default 3000)."
                );
                std::process::exit(0);
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    if let Some(addr) = bind_override {
        return Ok(addr);
    }

    let port = match std::env::var("PORT") {
        Ok(raw) => raw
            .parse::<u16>()
            .map_err(|_| anyhow::anyhow!("invalid PORT value: {raw}"))?,
        Err(_) => DEFAULT_PORT,
    };

    Ok(SocketAddr::from(([0, 0, 0, 0], port)))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loadmix_testapp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let bind_addr = bind_addr_from_env_and_args()?;

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let state = loadmix_testapp::AppState::default();
    let app = loadmix_testapp::router(state);

    tracing::info!(%addr, "listening");

    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
    });

    serve.await?;
    Ok(())
}
