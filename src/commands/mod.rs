mod fsck;
mod questions;
mod topics;

use tracing::error;

use crate::catalog::project::{QuestionView, TopicView};
use crate::error::CatalogError;
use crate::state::Context;

/// Topic & question catalog
#[poise::command(
    slash_command,
    subcommands(
        "topics::topics",
        "topics::topic",
        "topics::create_topic",
        "topics::update_topic",
        "topics::delete_topic",
        "questions::questions",
        "questions::question",
        "questions::add_question",
        "questions::update_question",
        "questions::delete_question",
        "fsck::fsck"
    )
)]
pub async fn catalog(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Reply and return false unless the caller is an admin.
async fn ensure_admin(ctx: &Context<'_>) -> Result<bool, anyhow::Error> {
    if ctx.data().is_admin(ctx.author().id.get()) {
        return Ok(true);
    }
    ctx.say("This command is admin-only.").await?;
    Ok(false)
}

/// Tell the user what went wrong. Input errors are echoed verbatim; anything
/// else is logged and summarized.
async fn report(ctx: &Context<'_>, err: CatalogError) -> Result<(), anyhow::Error> {
    if err.is_user_error() {
        ctx.say(err.to_string()).await?;
        return Ok(());
    }

    error!(user = %ctx.author().name, "Catalog command failed: {:#}", err);
    let notice = match &err {
        CatalogError::Consistency {
            compensated: false, ..
        } => "The catalog could not be updated and may need `/catalog fsck repair:true`.",
        _ => "The catalog could not be updated; try again.",
    };
    ctx.say(notice).await?;
    Ok(())
}

fn format_topic(topic: &TopicView) -> String {
    format!(
        "**{}** — `{}` ({} questions)",
        topic.data_structure,
        topic.id,
        topic.question_ids.len()
    )
}

fn format_question(question: &QuestionView) -> String {
    let mut line = format!(
        "[{}]({}) · {} — `{}`",
        question.question_name, question.url, question.level, question.id
    );
    if let Some(ds) = &question.data_structure {
        line.push_str(&format!(" · {}", ds));
    }
    line
}

/// Send a message in Discord-safe chunks (max 1990 chars).
async fn send_chunked(ctx: &Context<'_>, text: &str) -> Result<(), anyhow::Error> {
    let mut remaining = text;
    while !remaining.is_empty() {
        let split_at = chunk_boundary(remaining, 1990);
        ctx.say(&remaining[..split_at]).await?;
        remaining = &remaining[split_at..];
    }
    Ok(())
}

/// Byte offset to split at: the last newline within `max`, else `max`
/// rounded down to a char boundary.
fn chunk_boundary(text: &str, max: usize) -> usize {
    if text.len() <= max {
        return text.len();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].rfind('\n').map(|i| i + 1).unwrap_or(end)
}
