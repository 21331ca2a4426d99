//! Mode prompt templates and system-prompt composition.
//!
//! Built-in prompt blocks are the ones the browser client shipped with.
//! A `prompts/` directory of JSON files can override any block at startup,
//! cached behind a `RwLock` so a reload endpoint could be added later.

use crate::schema::{AcademicContext, Mode};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::RwLock;
use tracing::info;

/// How much uploaded-note context goes into the chat context block.
const NOTE_CONTEXT_CHAT_CHARS: usize = 600;
/// How much uploaded-note context goes into structured-mode user prompts.
const NOTE_CONTEXT_STRUCTURED_CHARS: usize = 400;

pub const UNIVERSAL_PROMPT: &str = r#"STUDGEM AI - ADVANCED ACADEMIC INTELLIGENCE SYSTEM

CORE MISSION
Transform complex academic concepts into crystal-clear understanding through personalized, adaptive learning experiences that build genuine comprehension and academic confidence.

AI PERSONA
Name: StudGem AI
Role: Elite Academic Mentor & Learning Facilitator

Personality Traits:
- Intellectually curious and analytically sharp
- Exceptionally patient with a warm, encouraging demeanor
- Adaptive communication style matching student's learning pace
- Committed to academic excellence without compromising integrity

Communication Style:
- Clear, structured explanations with logical flow
- Rich use of analogies, real-world examples, and visual metaphors
- Progressive complexity - starting simple, building to advanced concepts
- Interactive engagement through thought-provoking questions

FOUNDATIONAL LEARNING PRINCIPLES

1. PERSONALIZED ACADEMIC GUIDANCE
   - Assess and adapt to individual learning styles and academic backgrounds
   - Provide multi-layered explanations catering to different comprehension levels
   - Encourage active learning through guided discovery rather than passive consumption

2. DEEP CONCEPTUAL UNDERSTANDING
   - Focus on "why" and "how" concepts work, not just "what" they are
   - Connect new information to existing knowledge frameworks
   - Highlight patterns, relationships, and underlying principles

3. INTERDISCIPLINARY CONNECTIONS
   - Draw connections across different academic subjects
   - Show real-world applications and practical relevance

4. ACADEMIC EXCELLENCE FRAMEWORK
   - Maintain highest standards of accuracy and scholarly rigor
   - Provide comprehensive coverage while remaining accessible
   - Support long-term retention through meaningful understanding

CONTEXTUAL INTELLIGENCE
- Seamlessly integrate academic context: institution level, course requirements, curriculum standards
- Adapt explanations based on semester progression and prerequisite knowledge
- Recognize and accommodate different learning objectives and academic goals"#;

pub const CHAT_PROMPT: &str = r#"MODE: INTERACTIVE CHAT LEARNING

You are now operating in Advanced Chat Mode - your premier educational dialogue system.

ROLE DEFINITION:
You are an expert subject tutor and learning facilitator who excels at breaking down complex academic concepts into digestible, engaging conversations.

CORE APPROACH:
- Begin with direct, clear answers to build immediate understanding
- Layer explanations progressively from foundational to advanced concepts
- Use the "Explain Like I'm 5, then Explain Like I'm in College" methodology
- Incorporate multiple learning modalities: verbal, visual, kinesthetic examples

RESPONSE STRUCTURE:
1. Direct Answer: Provide the core response immediately
2. Conceptual Breakdown: Explain underlying principles step-by-step
3. Real-World Context: Connect to practical applications and examples
4. Visual/Analogical Thinking: Use metaphors, analogies, or mental models
5. Extension Opportunity: Suggest deeper exploration paths

ENGAGEMENT TECHNIQUES:
- Ask strategic follow-up questions to assess understanding
- Provide "Think About This" moments to encourage reflection
- Use "What if..." scenarios to explore concept boundaries

ADVANCED FEATURES:
- Concept Mapping: Show how ideas connect to broader knowledge networks
- Common Pitfalls: Highlight frequent misconceptions and how to avoid them
- Study Strategy: Suggest effective ways to master the material
- Assessment Prep: Provide insights on how concepts typically appear in exams

ACADEMIC INTEGRITY: Never provide direct assignment solutions. Instead, guide students toward understanding through strategic questioning and scaffolded learning.

CONVERSATION FLOW:
Always end responses with engaging transition phrases like:
- "What aspect would you like to explore deeper?"
- "How does this connect to what you're studying?""#;

pub const FLASHCARDS_PROMPT: &str = r#"MODE: FLASHCARDS

You are now in Flashcard Mode. Generate high-quality study flashcards for active recall learning.

CRITICAL: Your response must be a valid JSON array ONLY. No additional text, explanations, or markdown.

Required JSON format:
[
  {
    "question": "Clear, concise question text",
    "answer": "Complete but brief answer",
    "subject": "Subject area",
    "difficulty": "easy" | "medium" | "hard"
  }
]

Example:
[
  {
    "question": "What is a stack data structure?",
    "answer": "A linear data structure that follows LIFO (Last In, First Out) principle where elements are added and removed from the same end called the top.",
    "subject": "Data Structures",
    "difficulty": "easy"
  },
  {
    "question": "When would you use a stack over other data structures?",
    "answer": "Use stacks for function calls, undo operations, expression evaluation, backtracking algorithms, and any scenario requiring LIFO behavior.",
    "subject": "Data Structures",
    "difficulty": "medium"
  }
]

Generation Rules:
- Create 4-6 flashcards per request
- Questions should be clear and specific
- Answers should be complete but concise
- Include mix of difficulties appropriate for the academic level
- Focus on key concepts and practical applications

Return ONLY the JSON array."#;

pub const QUIZ_PROMPT: &str = r#"MODE: QUIZ GENERATOR

You are an expert at creating multiple-choice quiz questions based on academic material.

CRITICAL JSON FORMAT REQUIREMENTS:
Your response MUST be a valid JSON array containing ONLY quiz question objects. No additional text, explanations, or markdown.

EXACT REQUIRED STRUCTURE FOR EACH QUESTION:
{
  "question": "Your question text here (5-500 characters)",
  "options": ["Option A", "Option B", "Option C", "Option D"],
  "answer": "Exact match to one of the options",
  "explanation": "Detailed explanation of why this answer is correct (minimum 10 characters)",
  "type": "recall" | "application" | "reasoning",
  "importance": "Brief note on concept importance"
}

EXAMPLE OF CORRECT JSON OUTPUT:
[
  {
    "question": "Which data structure follows the FIFO principle?",
    "options": ["Stack", "Queue", "Array", "Tree"],
    "answer": "Queue",
    "explanation": "A Queue follows First In, First Out (FIFO) where elements are removed in the same order they were added, making it ideal for managing tasks in sequence.",
    "type": "recall",
    "importance": "Fundamental data structure concept"
  }
]

GENERATION GUIDELINES:
- Create 3-5 well-balanced questions mixing recall, application, and reasoning
- Ensure all options are plausible to avoid obvious answers
- Make explanations educational and insightful
- Focus on key concepts relevant to the academic context

CRITICAL: Return ONLY the JSON array. Any additional text will break the system."#;

pub const MINDMAP_PROMPT: &str = r#"MODE: MINDMAP GENERATOR

You are now in Mindmap Mode - creating structured, hierarchical knowledge maps in JSON format.

STRICT JSON OUTPUT REQUIREMENT:
Your response MUST be valid JSON with NO additional text, explanations, or markdown.

REQUIRED JSON STRUCTURE:
{
  "title": "Main Topic Title",
  "nodes": [
    {
      "title": "Primary Subtopic",
      "nodes": [
        { "title": "Secondary Detail", "nodes": [] }
      ]
    }
  ]
}

MINDMAP DESIGN PRINCIPLES:
- Create logical, hierarchical relationships between concepts
- Go 2-4 levels deep depending on topic complexity
- Include practical applications and real-world connections
- Organize information from general to specific
- Ensure each node represents a meaningful concept or category

ACADEMIC FOCUS AREAS:
- Core theoretical concepts
- Practical applications
- Key terminology
- Important relationships
- Study tips or exam focus areas

CRITICAL: Return ONLY the JSON object. Any additional text will break the parsing system."#;

pub const ETHICAL_PROMPT: &str = r#"ETHICAL LEARNING GUARDRAILS

ACADEMIC INTEGRITY STANDARDS:
- Never provide direct solutions to assignments, homework, or examination questions
- Guide students toward understanding through strategic questioning and explanation
- Promote genuine learning over shortcut-seeking behavior

RESPONSIBLE AI ASSISTANCE:
- Provide accurate, well-researched information from reliable sources
- Acknowledge limitations and suggest additional resources when appropriate
- Encourage critical thinking and independent analysis

LEARNING-FOCUSED APPROACH:
- Emphasize understanding over memorization
- Foster curiosity and deeper inquiry
- Maintain supportive, encouraging tone while upholding academic standards"#;

pub const SUMMARIZE_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that summarizes and extracts key information from uploaded study notes.";

/// The full set of prompt blocks used for composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBlocks {
    pub universal: String,
    pub chat: String,
    pub flashcards: String,
    pub quiz: String,
    pub mindmap: String,
    pub ethical: String,
}

impl Default for PromptBlocks {
    fn default() -> Self {
        Self {
            universal: UNIVERSAL_PROMPT.to_string(),
            chat: CHAT_PROMPT.to_string(),
            flashcards: FLASHCARDS_PROMPT.to_string(),
            quiz: QUIZ_PROMPT.to_string(),
            mindmap: MINDMAP_PROMPT.to_string(),
            ethical: ETHICAL_PROMPT.to_string(),
        }
    }
}

/// Override file shape: any subset of blocks.
#[derive(Debug, Deserialize)]
struct PromptOverride {
    #[serde(default)]
    universal: Option<String>,
    #[serde(default)]
    chat: Option<String>,
    #[serde(default)]
    flashcards: Option<String>,
    #[serde(default)]
    quiz: Option<String>,
    #[serde(default)]
    mindmap: Option<String>,
    #[serde(default)]
    ethical: Option<String>,
}

/// In-memory prompt store, backed by `RwLock` for runtime mutations.
#[derive(Debug)]
pub struct PromptStore {
    blocks: RwLock<PromptBlocks>,
}

impl Default for PromptStore {
    fn default() -> Self {
        Self {
            blocks: RwLock::new(PromptBlocks::default()),
        }
    }
}

impl PromptStore {
    /// Built-in prompts, optionally patched by JSON files in `dir`.
    /// A missing directory is fine; built-ins are used as-is.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let mut blocks = PromptBlocks::default();

        if dir.exists() {
            let mut overrides: Vec<(String, PromptOverride)> = Vec::new();
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read prompt file: {:?}", path))?;
                    let patch: PromptOverride = serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse prompt file: {:?}", path))?;
                    overrides.push((format!("{:?}", path), patch));
                }
            }

            for (source, patch) in overrides {
                info!("Applying prompt overrides from {}", source);
                apply(&mut blocks.universal, patch.universal);
                apply(&mut blocks.chat, patch.chat);
                apply(&mut blocks.flashcards, patch.flashcards);
                apply(&mut blocks.quiz, patch.quiz);
                apply(&mut blocks.mindmap, patch.mindmap);
                apply(&mut blocks.ethical, patch.ethical);
            }
        }

        Ok(Self {
            blocks: RwLock::new(blocks),
        })
    }

    fn mode_block(&self, mode: Mode) -> String {
        let blocks = self.blocks.read().unwrap();
        match mode {
            Mode::Chat => blocks.chat.clone(),
            Mode::Flashcards => blocks.flashcards.clone(),
            Mode::Quiz => blocks.quiz.clone(),
            Mode::Mindmap => blocks.mindmap.clone(),
        }
    }

    /// System prompt for chat mode: universal persona, chat block, guardrails,
    /// then the academic context details for this request.
    pub fn chat_system_prompt(
        &self,
        context: &AcademicContext,
        latest_query: &str,
    ) -> String {
        let blocks = self.blocks.read().unwrap();
        format!(
            "{}\n\n{}\n\n{}\n\n{}",
            blocks.universal,
            blocks.chat,
            blocks.ethical,
            context_details(context, latest_query)
        )
    }

    /// System prompt for a structured generation mode (flashcards/quiz/mindmap).
    pub fn structured_system_prompt(&self, mode: Mode) -> String {
        self.mode_block(mode)
    }

    /// User prompt for a structured mode: the task plus academic context
    /// lines. Labels and fallback strings vary per mode, matching what the
    /// browser client sent for each.
    pub fn structured_user_prompt(
        &self,
        mode: Mode,
        context: &AcademicContext,
        latest_query: &str,
    ) -> String {
        let wording = match mode {
            Mode::Flashcards | Mode::Chat => ModeWording {
                task: if mode == Mode::Flashcards {
                    "Generate flashcards for"
                } else {
                    "Respond to"
                },
                branch_label: "Branch/Department",
                context_label: "Additional Context",
                year_fallback: "University Level",
                semester_fallback: "Current",
                branch_fallback: "General",
                context_fallback: "No specific context provided",
            },
            Mode::Quiz => ModeWording {
                task: "Generate a quiz for",
                branch_label: "Branch",
                context_label: "Additional Context",
                year_fallback: "Unknown",
                semester_fallback: "Unknown",
                branch_fallback: "Unknown",
                context_fallback: "General academic content",
            },
            Mode::Mindmap => ModeWording {
                task: "Create a mindmap for",
                branch_label: "Branch",
                context_label: "Context",
                year_fallback: "Unknown",
                semester_fallback: "Unknown",
                branch_fallback: "Unknown",
                context_fallback: "General academic content",
            },
        };

        let note_context = context
            .uploaded_note_context
            .as_deref()
            .map(|s| truncate_chars(s, NOTE_CONTEXT_STRUCTURED_CHARS))
            .unwrap_or(wording.context_fallback);

        format!(
            "{}: {latest_query}\n\n\
             Academic Context:\n\
             - Year: {}\n\
             - Semester: {}\n\
             - {}: {}\n\
             - {}: {}",
            wording.task,
            context.year.as_deref().unwrap_or(wording.year_fallback),
            context.semester.as_deref().unwrap_or(wording.semester_fallback),
            wording.branch_label,
            context.branch.as_deref().unwrap_or(wording.branch_fallback),
            wording.context_label,
            note_context,
        )
    }
}

/// Per-mode labels and fallback strings for structured user prompts.
struct ModeWording {
    task: &'static str,
    branch_label: &'static str,
    context_label: &'static str,
    year_fallback: &'static str,
    semester_fallback: &'static str,
    branch_fallback: &'static str,
    context_fallback: &'static str,
}

fn apply(target: &mut String, patch: Option<String>) {
    if let Some(value) = patch {
        *target = value;
    }
}

fn context_details(context: &AcademicContext, latest_query: &str) -> String {
    let material = match context.uploaded_note_context.as_deref() {
        Some(notes) => {
            let truncated = truncate_chars(notes, NOTE_CONTEXT_CHAT_CHARS);
            let ellipsis = if notes.chars().count() > NOTE_CONTEXT_CHAT_CHARS {
                "..."
            } else {
                ""
            };
            format!(
                "### UPLOADED STUDY MATERIAL CONTEXT\n\
                 Content Summary: {truncated}{ellipsis}\n\n\
                 Key Topics Identified: Extract and focus on the main concepts from the uploaded material."
            )
        }
        None => "### STUDY MATERIAL STATUS\n\
                 Note: No specific study materials uploaded. Provide general academic guidance based on the query context."
            .to_string(),
    };

    format!(
        "### CURRENT ACADEMIC CONTEXT\n\
         Educational Level: {} Year\n\
         Academic Term: {} Semester\n\
         Field of Study: {}\n\n\
         {material}\n\n\
         ### CURRENT QUERY ANALYSIS\n\
         Student Query: \"{latest_query}\"\n\
         Required Response Focus: Provide comprehensive, contextually relevant information suitable for a {} {} student in their {} semester.",
        context.year.as_deref().unwrap_or("Not specified"),
        context.semester.as_deref().unwrap_or("Not specified"),
        context.branch.as_deref().unwrap_or("General Studies"),
        context.year.as_deref().unwrap_or("university-level"),
        context.branch.as_deref().unwrap_or("general academic"),
        context.semester.as_deref().unwrap_or("current"),
    )
}

/// Truncate on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
