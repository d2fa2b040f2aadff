mod catalog;
mod commands;
mod config;
mod error;
mod state;
mod store;

use std::sync::Arc;

use poise::serenity_prelude as serenity;
use poise::{Framework, FrameworkOptions};
use tracing::{error, info, Level};

use catalog::CatalogManager;
use config::CatalogConfig;
use state::AppState;
use store::DiskStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    // Load env
    let _ = dotenv::dotenv();
    let config = CatalogConfig::from_env()?;
    let guild_id = config.guild_id.map(serenity::GuildId::new);

    // Init storage
    let store = Arc::new(DiskStore::new(&config.data_dir).await?);
    info!("Catalog store initialized at {:?}", config.data_dir);

    let catalog = Arc::new(CatalogManager::new(store));
    match catalog.fsck(false).await {
        Ok(report) if !report.is_clean() => info!(
            issues = report.issues.len(),
            "Catalog has inconsistencies; run `/catalog fsck repair:true`"
        ),
        Ok(_) => {}
        Err(e) => error!("Startup consistency check failed: {}", e),
    }

    if !config.admin_ids.is_empty() {
        info!(count = config.admin_ids.len(), "Admin users configured");
    }

    let app_state = AppState {
        catalog,
        admin_ids: config.admin_ids,
    };

    let intents = serenity::GatewayIntents::GUILDS;

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![commands::catalog()],
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as: {} ({})", ready.user.name, ready.user.id);

                let commands = &framework.options().commands;
                for cmd in commands {
                    info!("  /{} ({} subcommands)", cmd.name, cmd.subcommands.len());
                }

                if let Some(gid) = guild_id {
                    info!("Registering to guild {} (instant)", gid);
                    poise::builtins::register_in_guild(ctx, commands, gid).await?;
                } else {
                    info!("Registering globally (up to 1 hour delay)");
                    poise::builtins::register_globally(ctx, commands).await?;
                }

                Ok(app_state)
            })
        })
        .build();

    info!("Starting catalog bot...");

    let mut client = serenity::ClientBuilder::new(&config.token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }

    Ok(())
}
