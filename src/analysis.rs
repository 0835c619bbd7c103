use std::sync::Arc;
use tracing::{info, warn};

use crate::completion::{CompletionClient, CompletionError};
use crate::response::TextAnalysisResult;

/// The five questions asked about every text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPrompt {
    Summary,
    Language,
    KeyCharacters,
    Sentiment,
    TitleAndAuthor,
}

impl AnalysisPrompt {
    pub const ALL: [AnalysisPrompt; 5] = [
        AnalysisPrompt::Summary,
        AnalysisPrompt::Language,
        AnalysisPrompt::KeyCharacters,
        AnalysisPrompt::Sentiment,
        AnalysisPrompt::TitleAndAuthor,
    ];

    /// Embed `content` verbatim into this prompt's template
    pub fn render(self, content: &str) -> String {
        match self {
            AnalysisPrompt::Summary => format!("Summarize this text in English: {}", content),
            AnalysisPrompt::Language => format!("In one word, detect the language: {}", content),
            AnalysisPrompt::KeyCharacters => {
                format!("Identify key characters in this text: {}", content)
            }
            AnalysisPrompt::Sentiment => {
                format!("Perform a sentiment analysis on this text: {}", content)
            }
            AnalysisPrompt::TitleAndAuthor => format!(
                "Detect the title and author: {}\n return an object with 'Title' and 'Author'",
                content
            ),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AnalysisPrompt::Summary => "summary",
            AnalysisPrompt::Language => "language",
            AnalysisPrompt::KeyCharacters => "key_characters",
            AnalysisPrompt::Sentiment => "sentiment_analysis",
            AnalysisPrompt::TitleAndAuthor => "title_and_author",
        }
    }
}

/// Runs all analysis prompts against one completion backend
#[derive(Clone)]
pub struct TextAnalyzer {
    client: Arc<dyn CompletionClient>,
}

impl TextAnalyzer {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Ask every prompt concurrently. Any failure fails the whole analysis
    /// and the remaining requests are dropped.
    pub async fn analyze_book(
        &self,
        book_id: u64,
        content: &str,
    ) -> Result<TextAnalysisResult, CompletionError> {
        info!(book_id, chars = content.chars().count(), "Starting text analysis");

        let (summary, language, key_characters, sentiment_analysis, title_and_author) = tokio::try_join!(
            self.ask(book_id, AnalysisPrompt::Summary, content),
            self.ask(book_id, AnalysisPrompt::Language, content),
            self.ask(book_id, AnalysisPrompt::KeyCharacters, content),
            self.ask(book_id, AnalysisPrompt::Sentiment, content),
            self.ask(book_id, AnalysisPrompt::TitleAndAuthor, content),
        )?;

        info!(book_id, "Text analysis completed");

        Ok(TextAnalysisResult {
            book_id,
            title_and_author,
            language,
            summary,
            key_characters,
            sentiment_analysis,
        })
    }

    async fn ask(
        &self,
        book_id: u64,
        prompt: AnalysisPrompt,
        content: &str,
    ) -> Result<String, CompletionError> {
        self.client
            .complete(&prompt.render(content))
            .await
            .map_err(|e| {
                warn!(book_id, prompt = prompt.name(), error = %e, "Analysis prompt failed");
                e
            })
    }
}
