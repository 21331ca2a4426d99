//! Assistant pipeline: prompt selection, model call, parse, validate.
//!
//! One upstream call per request. Structured modes (flashcards, quiz,
//! mindmap) get their mode block as the system prompt and a generated task
//! prompt as the user message; chat mode gets the full persona prompt and the
//! client's conversation history.

use crate::error::ApiError;
use crate::groq::{ChatParams, GroqClient, Message};
use crate::parse;
use crate::prompts::{PromptStore, SUMMARIZE_SYSTEM_PROMPT};
use crate::schema::{
    self, AcademicContext, IncomingMessage, Mindmap, Mode, QuizItem, ValidatedFlashcard,
};
use std::sync::Arc;
use tracing::{debug, info};

const CHAT_PARAMS: ChatParams = ChatParams {
    temperature: 0.7,
    max_tokens: 2000,
};
const FLASHCARD_PARAMS: ChatParams = ChatParams {
    temperature: 0.7,
    max_tokens: 1200,
};
const QUIZ_PARAMS: ChatParams = ChatParams {
    temperature: 0.6,
    max_tokens: 2000,
};
const MINDMAP_PARAMS: ChatParams = ChatParams {
    temperature: 0.6,
    max_tokens: 1500,
};
const SUMMARY_PARAMS: ChatParams = ChatParams {
    temperature: 0.7,
    max_tokens: 500,
};

/// Typed result of a chat request; the handler maps it onto the wire shape.
#[derive(Debug)]
pub enum AssistantReply {
    Chat { content: String },
    Flashcards { flashcards: Vec<ValidatedFlashcard> },
    Quiz { quiz: Vec<QuizItem> },
    Mindmap { mindmap: Mindmap },
}

pub struct Assistant {
    client: GroqClient,
    prompts: Arc<PromptStore>,
}

impl Assistant {
    pub fn new(client: GroqClient, prompts: Arc<PromptStore>) -> Self {
        Self { client, prompts }
    }

    /// Run one request through the pipeline.
    pub async fn respond(
        &self,
        mode: Mode,
        messages: &[IncomingMessage],
        context: &AcademicContext,
    ) -> Result<AssistantReply, ApiError> {
        let latest_query = messages
            .last()
            .map(|m| m.content.as_str())
            .ok_or_else(|| ApiError::BadRequest("Messages must not be empty".to_string()))?;

        info!("Assistant request: mode={}", mode.as_str());

        match mode {
            Mode::Chat => self.chat(messages, context, latest_query).await,
            Mode::Flashcards => self.flashcards(context, latest_query).await,
            Mode::Quiz => self.quiz(context, latest_query).await,
            Mode::Mindmap => self.mindmap(context, latest_query).await,
        }
    }

    async fn chat(
        &self,
        messages: &[IncomingMessage],
        context: &AcademicContext,
        latest_query: &str,
    ) -> Result<AssistantReply, ApiError> {
        let system = self.prompts.chat_system_prompt(context, latest_query);

        let mut outgoing = vec![Message::system(system)];
        for message in messages {
            outgoing.push(match message.role.as_str() {
                "assistant" => Message::assistant(&message.content),
                _ => Message::user(&message.content),
            });
        }

        let content = self.client.chat(outgoing, CHAT_PARAMS).await?;
        Ok(AssistantReply::Chat { content })
    }

    async fn flashcards(
        &self,
        context: &AcademicContext,
        latest_query: &str,
    ) -> Result<AssistantReply, ApiError> {
        let raw = self
            .structured_call(Mode::Flashcards, context, latest_query, FLASHCARD_PARAMS)
            .await?;

        let cards: Vec<schema::Flashcard> =
            parse::parse_array(&raw).map_err(|e| ApiError::Parse {
                mode: "flashcards",
                details: e.to_string(),
                raw: raw.clone(),
            })?;

        let flashcards = schema::validate_flashcards(cards, context.branch.as_deref()).map_err(
            |e| ApiError::Validation {
                mode: "Flashcard",
                details: e.to_string(),
            },
        )?;

        info!("Flashcard validation successful: {} cards", flashcards.len());
        Ok(AssistantReply::Flashcards { flashcards })
    }

    async fn quiz(
        &self,
        context: &AcademicContext,
        latest_query: &str,
    ) -> Result<AssistantReply, ApiError> {
        let raw = self
            .structured_call(Mode::Quiz, context, latest_query, QUIZ_PARAMS)
            .await?;

        let quiz: Vec<QuizItem> = parse::parse_array(&raw).map_err(|e| ApiError::Parse {
            mode: "quiz",
            details: e.to_string(),
            raw: raw.clone(),
        })?;

        schema::validate_quiz(&quiz).map_err(|e| ApiError::Validation {
            mode: "Quiz",
            details: e.to_string(),
        })?;

        info!("Quiz validation successful: {} questions", quiz.len());
        Ok(AssistantReply::Quiz { quiz })
    }

    async fn mindmap(
        &self,
        context: &AcademicContext,
        latest_query: &str,
    ) -> Result<AssistantReply, ApiError> {
        let raw = self
            .structured_call(Mode::Mindmap, context, latest_query, MINDMAP_PARAMS)
            .await?;

        let mindmap: Mindmap = parse::parse_object(&raw).map_err(|e| ApiError::Parse {
            mode: "mindmap",
            details: e.to_string(),
            raw: raw.clone(),
        })?;

        schema::validate_mindmap(&mindmap).map_err(|e| ApiError::Validation {
            mode: "Mindmap",
            details: e.to_string(),
        })?;

        Ok(AssistantReply::Mindmap { mindmap })
    }

    async fn structured_call(
        &self,
        mode: Mode,
        context: &AcademicContext,
        latest_query: &str,
        params: ChatParams,
    ) -> Result<String, ApiError> {
        let messages = vec![
            Message::system(self.prompts.structured_system_prompt(mode)),
            Message::user(self.prompts.structured_user_prompt(mode, context, latest_query)),
        ];

        let raw = self.client.chat(messages, params).await?;
        debug!("Raw {} response length: {} chars", mode.as_str(), raw.len());
        Ok(raw)
    }

    /// Summarize extracted note text for the upload endpoint.
    pub async fn summarize_notes(&self, text: &str) -> Result<String, ApiError> {
        let messages = vec![
            Message::system(SUMMARIZE_SYSTEM_PROMPT),
            Message::user(format!(
                "Please provide a concise summary of the following text, highlighting the most important points:\n\n{text}"
            )),
        ];

        self.client.chat(messages, SUMMARY_PARAMS).await
    }
}
