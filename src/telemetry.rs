//! `tracing` initialization, grounded on the teacher's
//! `tracing_subscriber::fmt::init()` call in `coordinator::main` /
//! `node::main`.

pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
