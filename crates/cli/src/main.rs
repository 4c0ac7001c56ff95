use autobuild_config::{Cli, Settings};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod supervisor;

#[tokio::main]
async fn main() {
    // Deterministic output from make, git and ldd regardless of the host
    // locale.
    std::env::set_var("LC_ALL", "C");

    init_tracing();

    let cli = Cli::parse();
    let settings = match Settings::resolve(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("autobuild-run: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = supervisor::run(settings).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}
