//! Interactive question shell
//!
//! A cooperative read-eval loop over rustyline: free-text input is a
//! question, a handful of keywords are commands. Everything routes
//! through the same [`RagPipeline`] as the batch entry points; the shell
//! adds no retrieval or synthesis logic of its own.

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::cli::output;
use crate::errors::Result;
use crate::models::ModelConfig;
use crate::rag::RagPipeline;

const PROMPT: &str = ">docbuddy: ";

/// Input handler managing the readline interface and persistent history
struct InputHandler {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
}

impl InputHandler {
    fn new(history_path: Option<PathBuf>) -> Result<Self> {
        let mut editor = DefaultEditor::new()
            .map_err(|e| crate::errors::RagError::Config(format!("readline: {}", e)))?;
        if let Some(path) = &history_path {
            if path.exists() {
                let _ = editor.load_history(path);
            }
        }
        Ok(Self {
            editor,
            history_path,
        })
    }

    /// Ok(Some(line)) for input, Ok(None) for EOF or interrupt
    fn read_line(&mut self) -> Result<Option<String>> {
        match self.editor.readline(PROMPT) {
            Ok(line) => {
                let trimmed = line.trim().to_string();
                if !trimmed.is_empty() {
                    let _ = self.editor.add_history_entry(&trimmed);
                }
                Ok(Some(trimmed))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(crate::errors::RagError::Config(format!(
                "readline error: {}",
                e
            ))),
        }
    }

    fn save_history(&mut self) {
        if let Some(path) = &self.history_path {
            let _ = self.editor.save_history(path);
        }
    }
}

/// Interactive shell session over a ready pipeline
pub struct ReplSession {
    pipeline: Arc<RagPipeline>,
    data_path: PathBuf,
    model: ModelConfig,
    k: usize,
    score_threshold: f32,
}

impl ReplSession {
    pub fn new(pipeline: Arc<RagPipeline>, data_path: PathBuf, model: ModelConfig) -> Self {
        Self {
            pipeline,
            data_path,
            model,
            k: 5,
            score_threshold: 0.0,
        }
    }

    /// Run the loop until quit/EOF
    pub async fn run(&self, history_path: Option<PathBuf>) -> Result<()> {
        let mut input = InputHandler::new(history_path)?;
        self.show_banner().await;

        loop {
            let line = match input.read_line()? {
                Some(line) => line,
                None => break,
            };
            if line.is_empty() {
                continue;
            }

            match line.to_lowercase().as_str() {
                "quit" | "exit" | "q" => break,
                "help" => self.show_help(),
                "reset" => self.handle_reset().await,
                _ => self.handle_question(&line).await,
            }
        }

        input.save_history();
        println!("{}", "Goodbye!".cyan());
        Ok(())
    }

    async fn show_banner(&self) {
        let rule = "=".repeat(50);
        println!("\n{}", rule.cyan());
        println!("{}", "  docbuddy - Interactive Document Q&A".bold().cyan());
        let count = self.pipeline.index_count().await.unwrap_or(0);
        println!(
            "{}",
            format!("  Model: {} | Indexed chunks: {}", self.model.model, count).dimmed()
        );
        println!("{}\n", rule.cyan());
        println!(
            "Ask a question, or type {} for commands, {} to quit\n",
            "help".green(),
            "quit".green()
        );
    }

    fn show_help(&self) {
        println!("  {}  repopulate the index from {}", "reset".green(), self.data_path.display());
        println!("  {}   show this message", "help".green());
        println!("  {}   leave the shell", "quit".green());
        println!("  anything else is treated as a question");
    }

    async fn handle_reset(&self) {
        println!("{}", "Resetting index...".cyan());
        match self.pipeline.populate(&self.data_path, true).await {
            Ok(report) => output::print_population_report(&report),
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
    }

    async fn handle_question(&self, question: &str) {
        println!("{}", "Thinking...".dimmed());
        match self
            .pipeline
            .query(question, self.k, self.score_threshold, &self.model)
            .await
        {
            Ok(outcome) => output::print_outcome(&outcome, false),
            Err(e) => output::print_query_error(&e),
        }
    }
}
