use anyhow::Context;
use clap::{Parser, Subcommand};

use bookshelf_kernel::settings::Settings;

#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(about = "Book catalog with review-derived ratings", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server until Ctrl-C or SIGTERM
    Serve {
        /// Overrides `server.port`
        #[arg(long, env = "BOOKSHELF_PORT")]
        port: Option<u16>,
    },
    /// Print the effective settings as JSON
    Settings,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;

    match cli.command {
        Command::Settings => {
            let rendered = serde_json::to_string_pretty(&settings)
                .context("failed to render settings")?;
            println!("{}", rendered);
            Ok(())
        }
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            bookshelf_telemetry::init(&settings.telemetry)?;

            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to build tokio runtime")?
                .block_on(async move {
                    tracing::info!(
                        env = ?settings.environment,
                        port = settings.server.port,
                        "bookshelf serve starting"
                    );
                    bookshelf_app::run(settings, bookshelf_http::shutdown_signal()).await
                })
        }
    }
}
