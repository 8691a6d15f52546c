use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::{AppContext, ErrorKind, Result};
use crate::discovery::timefmt::format_length;
use crate::domain::{Channel, Content, Subscription, User, UserFilter};
use crate::scheduler::AcquisitionOutcome;
use crate::store::Store;

pub fn add_user(ctx: &AppContext, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(crate::app::ListenError::InvalidInput(
            "user name is required".to_string(),
        ));
    }

    let user = User::new(name);
    ctx.store.add_user(&user)?;
    println!("Added user {}: {}", user.name, user.credit);
    Ok(())
}

pub fn list_users(ctx: &AppContext) -> Result<()> {
    let users = ctx.store.find_users(&UserFilter::default())?;

    if users.is_empty() {
        println!("No users");
        return Ok(());
    }

    for user in users {
        println!("{}  {}", user.credit, user.name);
    }
    Ok(())
}

pub async fn subscribe(ctx: &AppContext, user: &str, channel: &str) -> Result<()> {
    ctx.subscriptions.add_subscription(user, channel).await?;
    let channel = ctx.subscriptions.get_channel(channel.trim())?;
    println!("Subscribed to {}", channel.display_name());
    Ok(())
}

pub fn unsubscribe(ctx: &AppContext, user: &str, channel: &str) -> Result<()> {
    ctx.subscriptions.delete_subscription(user, channel)?;
    println!("Unsubscribed from {}", channel);
    Ok(())
}

pub fn list_subscriptions(ctx: &AppContext, user: &str) -> Result<()> {
    let subscriptions = ctx.subscriptions.list_subscriptions(user)?;

    if subscriptions.is_empty() {
        println!("No subscriptions");
        return Ok(());
    }

    for subscription in &subscriptions {
        println!("{}", subscription_line(ctx, subscription)?);
    }
    Ok(())
}

/// A subscription whose channel row is gone is still listed, without a name.
fn subscription_line(ctx: &AppContext, subscription: &Subscription) -> Result<String> {
    let name = match ctx.subscriptions.get_channel(&subscription.channel_credit) {
        Ok(channel) => channel.display_name().to_string(),
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };
    Ok(format!(
        "{} {}  {}",
        subscription.created_at.format("%Y-%m-%d"),
        subscription.channel_credit,
        name
    ))
}

pub fn list_contents(ctx: &AppContext, user: &str, page: usize, size: usize) -> Result<()> {
    let page = ctx.subscriptions.list_content(user, page, size)?;

    if page.contents.is_empty() {
        println!("No content on page {}", page.page_index);
        return Ok(());
    }

    for content in &page.contents {
        println!("{}", content_line(content));
    }
    Ok(())
}

pub fn show_content(ctx: &AppContext, credit: &str) -> Result<()> {
    let content = ctx.subscriptions.get_content(credit)?;
    println!("{}", content.display_title());
    println!("  credit:    {}", content.content_credit);
    println!("  channel:   {}", content.channel_credit);
    println!("  state:     {} ({})", content.state, content.info);
    println!("  published: {}", content.published_at.format("%Y-%m-%d %H:%M"));
    println!("  length:    {}", format_length(content.duration));
    if let Some(path) = &content.path {
        println!("  file:      {}", path);
    }
    Ok(())
}

pub fn show_channel(ctx: &AppContext, credit: &str) -> Result<()> {
    let channel = ctx.subscriptions.get_channel(credit)?;
    print!("{}", channel_summary(&channel));
    Ok(())
}

/// Runs one discovery pass and prints its report.
pub async fn discover(ctx: &AppContext) -> Result<()> {
    let report = ctx
        .discovery_scheduler()
        .tick(&CancellationToken::new())
        .await?;
    println!(
        "Discovery complete: {} channels, {} new items, {} errors",
        report.channels, report.inserted, report.errors
    );
    Ok(())
}

/// Downloads the next pending item, if any.
pub async fn download(ctx: &mut AppContext) -> Result<()> {
    ctx.prepare_acquirer().await?;

    match ctx.acquisition_scheduler().tick().await? {
        AcquisitionOutcome::Idle => println!("Nothing to download"),
        AcquisitionOutcome::Downloaded {
            content_credit,
            path,
        } => println!("Downloaded {} to {}", content_credit, path),
        AcquisitionOutcome::Failed {
            content_credit,
            reason,
        } => eprintln!("Download of {} failed: {}", content_credit, reason),
    }
    Ok(())
}

/// Starts both loops and blocks until SIGINT or SIGTERM.
pub async fn run(ctx: &mut AppContext) -> Result<()> {
    if ctx.config.acquisition.enabled {
        ctx.prepare_acquirer().await?;
    }

    let handle = ctx.pipeline().start(CancellationToken::new());
    info!(
        "listen-tube running with {} loops, press Ctrl-C to stop",
        handle.running()
    );

    wait_for_shutdown().await?;

    info!("Shutting down, waiting for in-flight work");
    handle.shutdown().await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

fn content_line(content: &Content) -> String {
    let marker = match content.state {
        crate::domain::ContentState::Downloaded => "●",
        crate::domain::ContentState::Failed => "✗",
        _ => " ",
    };
    format!(
        "{} {} {:>8} {} [{}] {}",
        marker,
        content.published_at.format("%Y-%m-%d"),
        format_length(content.duration),
        content.content_credit,
        content.state,
        content.display_title()
    )
}

fn channel_summary(channel: &Channel) -> String {
    let mut out = format!("{}\n  credit:   {}\n", channel.display_name(), channel.channel_credit);
    out.push_str(&format!("  platform: {}\n", channel.platform));
    out.push_str(&format!(
        "  checked:  {}\n",
        channel.updated_at.format("%Y-%m-%d %H:%M")
    ));
    for url in &channel.owner_urls {
        out.push_str(&format!("  owner:    {}\n", url));
    }
    if !channel.description.is_empty() {
        out.push_str(&format!("\n{}\n", channel.description));
    }
    out
}
