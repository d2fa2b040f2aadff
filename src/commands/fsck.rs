use tracing::info;

use super::{ensure_admin, report, send_chunked};
use crate::state::Context;

/// Check topic/question references, optionally repairing them (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn fsck(
    ctx: Context<'_>,
    #[description = "Fix what is found"] repair: Option<bool>,
) -> Result<(), anyhow::Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    ctx.defer().await?;

    let repair = repair.unwrap_or(false);
    info!(user = %ctx.author().name, repair, "Catalog fsck started");

    let summary = match ctx.data().catalog.fsck(repair).await {
        Ok(r) => r,
        Err(e) => return report(&ctx, e).await,
    };

    let mut output = format!(
        "**Catalog fsck** — {} topics, {} questions, {} issues",
        summary.topics,
        summary.questions,
        summary.issues.len()
    );
    if repair {
        output.push_str(&format!(", {} repaired", summary.repaired));
    }
    output.push('\n');
    for issue in summary.issues.iter().take(50) {
        output.push_str(&format!("- {}\n", issue));
    }
    if summary.issues.len() > 50 {
        output.push_str(&format!("…and {} more\n", summary.issues.len() - 50));
    }
    send_chunked(&ctx, &output).await
}
