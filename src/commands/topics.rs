use tracing::info;

use super::{ensure_admin, format_question, format_topic, report, send_chunked};
use crate::catalog::project::TopicInput;
use crate::state::Context;

/// List all topics
#[poise::command(slash_command, guild_only)]
pub async fn topics(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let topics = match ctx.data().catalog.get_all_topics().await {
        Ok(topics) => topics,
        Err(e) => return report(&ctx, e).await,
    };

    if topics.is_empty() {
        ctx.say("No topics yet. An admin can add one with `/catalog create_topic`.")
            .await?;
        return Ok(());
    }

    let mut output = String::from("**Topics**\n\n");
    for topic in &topics {
        output.push_str(&format!("- {}\n", format_topic(topic)));
    }
    send_chunked(&ctx, &output).await
}

/// Show a topic and its questions
#[poise::command(slash_command, guild_only)]
pub async fn topic(
    ctx: Context<'_>,
    #[description = "Topic ID"] id: String,
) -> Result<(), anyhow::Error> {
    let catalog = &ctx.data().catalog;
    let topic = match catalog.get_topic_by_id(&id).await {
        Ok(topic) => topic,
        Err(e) => return report(&ctx, e).await,
    };
    let questions = match catalog.get_questions_by_topic(&id).await {
        Ok(questions) => questions,
        Err(e) => return report(&ctx, e).await,
    };

    let mut output = format!("{}\n\n", format_topic(&topic));
    if questions.is_empty() {
        output.push_str("_No questions yet._\n");
    }
    for (i, question) in questions.iter().enumerate() {
        output.push_str(&format!("{}. {}\n", i + 1, format_question(question)));
    }
    send_chunked(&ctx, &output).await
}

/// Create a topic (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn create_topic(
    ctx: Context<'_>,
    #[description = "Data structure, e.g. Arrays"] data_structure: String,
) -> Result<(), anyhow::Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    let input = TopicInput {
        data_structure: Some(data_structure),
    };
    match ctx.data().catalog.create_topic(&input).await {
        Ok(topic) => {
            info!(user = %ctx.author().name, topic_id = %topic.id, "Topic created via command");
            ctx.say(format!("Created {}", format_topic(&topic))).await?;
            Ok(())
        }
        Err(e) => report(&ctx, e).await,
    }
}

/// Rename a topic's data structure (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn update_topic(
    ctx: Context<'_>,
    #[description = "Topic ID"] id: String,
    #[description = "New data structure"] data_structure: String,
) -> Result<(), anyhow::Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    let input = TopicInput {
        data_structure: Some(data_structure),
    };
    match ctx.data().catalog.update_topic(&id, &input).await {
        Ok(topic) => {
            ctx.say(format!("Updated {}", format_topic(&topic))).await?;
            Ok(())
        }
        Err(e) => report(&ctx, e).await,
    }
}

/// Delete a topic and all of its questions (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn delete_topic(
    ctx: Context<'_>,
    #[description = "Topic ID"] id: String,
) -> Result<(), anyhow::Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }
    ctx.defer().await?;

    match ctx.data().catalog.delete_topic(&id).await {
        Ok(()) => {
            info!(user = %ctx.author().name, topic_id = %id, "Topic deleted via command");
            ctx.say(format!("Deleted topic `{}` and its questions.", id))
                .await?;
            Ok(())
        }
        Err(e) => report(&ctx, e).await,
    }
}
