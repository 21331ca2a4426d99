//! Wire types and structured-output schemas.
//!
//! Field names follow the browser client's existing JSON contract, so several
//! structs carry camelCase renames. Validation mirrors the limits the prompts
//! promise the model will honor, applying defaults where the original client
//! tolerated missing fields.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Assistant mode, selecting prompt template and output schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Chat,
    Flashcards,
    Quiz,
    Mindmap,
}

impl Mode {
    /// Parse a mode string. Unknown modes fall back to chat.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("flashcards") => Self::Flashcards,
            Some("quiz") => Self::Quiz,
            Some("mindmap") => Self::Mindmap,
            _ => Self::Chat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Flashcards => "flashcards",
            Self::Quiz => "quiz",
            Self::Mindmap => "mindmap",
        }
    }
}

/// User-selected academic metadata injected into prompts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcademicContext {
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default, rename = "uploadedNoteContext")]
    pub uploaded_note_context: Option<String>,
}

/// A single turn of the client conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub role: String,
    pub content: String,
}

// ============================================================================
// Flashcards
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// A flashcard with defaults applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedFlashcard {
    pub question: String,
    pub answer: String,
    pub subject: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Validate parsed flashcards, applying defaults the client relied on:
/// subject falls back to the academic branch, difficulty to medium.
pub fn validate_flashcards(
    cards: Vec<Flashcard>,
    fallback_subject: Option<&str>,
) -> Result<Vec<ValidatedFlashcard>> {
    if cards.is_empty() {
        bail!("No flashcards generated");
    }

    let mut validated = Vec::with_capacity(cards.len());
    for (index, card) in cards.into_iter().enumerate() {
        let question = card.question.trim().to_string();
        let answer = card.answer.trim().to_string();
        if question.is_empty() || answer.is_empty() {
            bail!("Flashcard {} missing question or answer", index + 1);
        }

        let difficulty = match card.difficulty.as_deref() {
            Some("easy") => Difficulty::Easy,
            Some("hard") => Difficulty::Hard,
            _ => Difficulty::Medium,
        };

        validated.push(ValidatedFlashcard {
            question,
            answer,
            subject: card
                .subject
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| fallback_subject.unwrap_or("General").to_string()),
            difficulty,
        });
    }

    Ok(validated)
}

// ============================================================================
// Quiz
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub explanation: String,
    #[serde(rename = "type")]
    pub question_type: QuizQuestionType,
    pub importance: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizQuestionType {
    Recall,
    Application,
    Reasoning,
}

/// Strict quiz validation. The quiz UI renders exactly four options and
/// matches the answer string against them, so there are no defaults here.
pub fn validate_quiz(items: &[QuizItem]) -> Result<()> {
    if items.is_empty() {
        bail!("No quiz questions generated");
    }

    for (index, item) in items.iter().enumerate() {
        let n = index + 1;
        let qlen = item.question.chars().count();
        if !(5..=500).contains(&qlen) {
            bail!("Question {n}: question must be 5-500 characters");
        }
        if item.options.len() != 4 {
            bail!(
                "Question {n}: expected exactly 4 options, got {}",
                item.options.len()
            );
        }
        for option in &item.options {
            let olen = option.chars().count();
            if !(1..=200).contains(&olen) {
                bail!("Question {n}: options must be 1-200 characters");
            }
        }
        let alen = item.answer.chars().count();
        if !(1..=200).contains(&alen) {
            bail!("Question {n}: answer must be 1-200 characters");
        }
        if !item.options.iter().any(|o| o == &item.answer) {
            bail!("Question {n}: answer does not match any option");
        }
        if item.explanation.chars().count() < 10 {
            bail!("Question {n}: explanation must be at least 10 characters");
        }
        if item.importance.chars().count() < 5 {
            bail!("Question {n}: importance must be at least 5 characters");
        }
    }

    Ok(())
}

// ============================================================================
// Mindmap
// ============================================================================

// `nodes` is required at every level; the generation prompt always asks for
// it, and the renderer indexes into it unconditionally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mindmap {
    pub title: String,
    pub nodes: Vec<MindmapNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindmapNode {
    pub title: String,
    pub nodes: Vec<MindmapNode>,
}

/// Validate a mindmap tree: every title 1-100 characters at every level.
pub fn validate_mindmap(map: &Mindmap) -> Result<()> {
    check_title(&map.title, "root")?;
    check_nodes(&map.nodes)
}

fn check_nodes(nodes: &[MindmapNode]) -> Result<()> {
    for node in nodes {
        check_title(&node.title, "node")?;
        check_nodes(&node.nodes)?;
    }
    Ok(())
}

fn check_title(title: &str, kind: &str) -> Result<()> {
    let len = title.chars().count();
    if !(1..=100).contains(&len) {
        bail!("Mindmap {kind} title must be 1-100 characters, got {len}");
    }
    Ok(())
}
