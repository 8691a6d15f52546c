use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use listen_tube::app::AppContext;
use listen_tube::cli::{commands, Cli, Commands, UserAction};
use listen_tube::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("listen_tube=info")))
        .init();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(ref path) => Config::load_or_create(path)?,
        None => Config::load()?,
    };
    let mut ctx = AppContext::new(config)?;

    match cli.command {
        Commands::User { action } => match action {
            UserAction::Add { name } => commands::add_user(&ctx, &name)?,
            UserAction::List => commands::list_users(&ctx)?,
        },
        Commands::Subscribe { user, channel } => {
            commands::subscribe(&ctx, &user, &channel).await?;
        }
        Commands::Unsubscribe { user, channel } => {
            commands::unsubscribe(&ctx, &user, &channel)?;
        }
        Commands::Subscriptions { user } => {
            commands::list_subscriptions(&ctx, &user)?;
        }
        Commands::Contents { user, page, size } => {
            commands::list_contents(&ctx, &user, page, size)?;
        }
        Commands::Content { credit } => {
            commands::show_content(&ctx, &credit)?;
        }
        Commands::Channel { credit } => {
            commands::show_channel(&ctx, &credit)?;
        }
        Commands::Run => {
            commands::run(&mut ctx).await?;
        }
        Commands::Discover => {
            commands::discover(&ctx).await?;
        }
        Commands::Download => {
            commands::download(&mut ctx).await?;
        }
    }

    Ok(())
}
