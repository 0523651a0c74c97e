//! Terminal input/output abstraction for the provisioning core.
//!
//! The core never touches stdin/stdout directly; it talks to the [`Console`]
//! trait. The standard implementation is line-oriented stdio; tests use the
//! scripted [`mock::MockConsole`].

pub mod mock;
pub mod term;

use async_trait::async_trait;
use azd_types::UxItem;
use thiserror::Error;

pub use term::StdConsole;

/// Options for a free-form text prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    pub message: String,
    /// Suggested value accepted on empty input
    pub default: Option<String>,
    /// Collect without echoing the entered value
    pub is_password: bool,
}

/// Options for a pick-one selection.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub message: String,
    pub choices: Vec<String>,
    pub default_index: Option<usize>,
}

/// Visual style of the transient spinner line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinnerStyle {
    /// A step inside a longer operation
    Step,
}

/// Console interaction failed or was canceled by the operator.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The operator canceled the pending interaction. Propagated unchanged
    /// through the core; never wrapped into another error kind.
    #[error("interaction canceled")]
    Canceled,
    #[error("console io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstract terminal the provisioning core reads from and writes to.
#[async_trait]
pub trait Console: Send + Sync {
    /// Free-form text input.
    async fn prompt(&self, options: PromptOptions) -> Result<String, ConsoleError>;

    /// Pick-one from a fixed list; returns the chosen index.
    async fn select(&self, options: SelectOptions) -> Result<usize, ConsoleError>;

    /// Update the transient status line.
    fn show_spinner(&self, message: &str, style: SpinnerStyle);

    /// Display a structured message.
    fn emit(&self, item: UxItem);

    /// Display a plain explanatory line (validation feedback and the like).
    fn message(&self, text: &str);

    /// Whether the terminal supports transient updates.
    fn is_spinner_interactive(&self) -> bool;
}
