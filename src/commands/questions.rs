use tracing::info;

use super::{ensure_admin, format_question, report, send_chunked};
use crate::catalog::project::QuestionInput;
use crate::state::Context;

/// List the questions in a topic
#[poise::command(slash_command, guild_only)]
pub async fn questions(
    ctx: Context<'_>,
    #[description = "Topic ID"] topic_id: String,
) -> Result<(), anyhow::Error> {
    let questions = match ctx.data().catalog.get_questions_by_topic(&topic_id).await {
        Ok(questions) => questions,
        Err(e) => return report(&ctx, e).await,
    };

    if questions.is_empty() {
        ctx.say(format!("No questions in topic `{}`.", topic_id))
            .await?;
        return Ok(());
    }

    let output: String = questions
        .iter()
        .map(|q| format!("- {}\n", format_question(q)))
        .collect();
    send_chunked(&ctx, &output).await
}

/// Add a question to a topic (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn add_question(
    ctx: Context<'_>,
    #[description = "Topic ID"] topic_id: String,
    #[description = "Question name"] name: String,
    #[description = "Problem URL"] url: String,
    #[description = "Easy | Medium | Hard"] level: String,
    #[description = "Data structure used"] data_structure: Option<String>,
) -> Result<(), anyhow::Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    let input = QuestionInput {
        question_name: Some(name),
        url: Some(url),
        level: Some(level),
        data_structure,
    };
    match ctx.data().catalog.add_question_to_topic(&topic_id, &input).await {
        Ok(question) => {
            info!(
                user = %ctx.author().name,
                question_id = %question.id,
                topic_id = %question.topic_id,
                "Question added via command"
            );
            ctx.say(format!("Added {}", format_question(&question)))
                .await?;
            Ok(())
        }
        Err(e) => report(&ctx, e).await,
    }
}

/// Edit a question's details (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn update_question(
    ctx: Context<'_>,
    #[description = "Question ID"] question_id: String,
    #[description = "Question name"] name: String,
    #[description = "Problem URL"] url: String,
    #[description = "Easy | Medium | Hard"] level: String,
    #[description = "Data structure used"] data_structure: Option<String>,
) -> Result<(), anyhow::Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    let input = QuestionInput {
        question_name: Some(name),
        url: Some(url),
        level: Some(level),
        data_structure,
    };
    match ctx.data().catalog.update_question(&question_id, &input).await {
        Ok(question) => {
            ctx.say(format!("Updated {}", format_question(&question)))
                .await?;
            Ok(())
        }
        Err(e) => report(&ctx, e).await,
    }
}

/// Remove a question from a topic (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn delete_question(
    ctx: Context<'_>,
    #[description = "Topic ID the question belongs to"] topic_id: String,
    #[description = "Question ID"] question_id: String,
) -> Result<(), anyhow::Error> {
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    match ctx
        .data()
        .catalog
        .delete_question(&topic_id, &question_id)
        .await
    {
        Ok(()) => {
            ctx.say(format!("Deleted question `{}`.", question_id))
                .await?;
            Ok(())
        }
        Err(e) => report(&ctx, e).await,
    }
}

/// Show a single question
#[poise::command(slash_command, guild_only)]
pub async fn question(
    ctx: Context<'_>,
    #[description = "Question ID"] id: String,
) -> Result<(), anyhow::Error> {
    match ctx.data().catalog.get_question(&id).await {
        Ok(question) => {
            ctx.say(format!(
                "{}\nTopic: `{}`",
                format_question(&question),
                question.topic_id
            ))
            .await?;
            Ok(())
        }
        Err(e) => report(&ctx, e).await,
    }
}
