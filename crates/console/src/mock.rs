//! Scripted console for tests.
//!
//! Prompt responses are consumed from a queue; selections are answered by a
//! registered handler that also gets to assert on the offered choices. All
//! output is captured for later inspection. An interaction with nothing
//! scripted yields [`ConsoleError::Canceled`], which makes "no prompt should
//! have been issued" scenarios fail loudly.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use azd_types::UxItem;

use crate::{Console, ConsoleError, PromptOptions, SelectOptions, SpinnerStyle};

type SelectHandler = Box<dyn FnMut(&SelectOptions) -> usize + Send>;

#[derive(Default)]
pub struct MockConsole {
    prompt_responses: Mutex<VecDeque<String>>,
    select_handler: Mutex<Option<SelectHandler>>,
    prompts_seen: Mutex<Vec<PromptOptions>>,
    selects_seen: Mutex<Vec<SelectOptions>>,
    messages: Mutex<Vec<String>>,
    items: Mutex<Vec<UxItem>>,
    spinners: Mutex<Vec<String>>,
    interactive: bool,
}

impl MockConsole {
    pub fn new() -> Self {
        Self {
            interactive: true,
            ..Self::default()
        }
    }

    pub fn non_interactive() -> Self {
        Self::default()
    }

    /// Queue one prompt response.
    pub fn respond(&self, input: impl Into<String>) -> &Self {
        self.prompt_responses.lock().unwrap().push_back(input.into());
        self
    }

    /// Queue several prompt responses in order.
    pub fn respond_all<I, S>(&self, inputs: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queue = self.prompt_responses.lock().unwrap();
        queue.extend(inputs.into_iter().map(Into::into));
        drop(queue);
        self
    }

    /// Register the handler answering `select` calls.
    pub fn on_select(&self, handler: impl FnMut(&SelectOptions) -> usize + Send + 'static) -> &Self {
        *self.select_handler.lock().unwrap() = Some(Box::new(handler));
        self
    }

    /// All `message` lines written so far.
    pub fn output(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// All structured items emitted so far.
    pub fn items(&self) -> Vec<UxItem> {
        self.items.lock().unwrap().clone()
    }

    /// All spinner updates written so far.
    pub fn spinner_messages(&self) -> Vec<String> {
        self.spinners.lock().unwrap().clone()
    }

    /// Prompt options observed, in call order.
    pub fn prompts_seen(&self) -> Vec<PromptOptions> {
        self.prompts_seen.lock().unwrap().clone()
    }

    /// Select options observed, in call order.
    pub fn selects_seen(&self) -> Vec<SelectOptions> {
        self.selects_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Console for MockConsole {
    async fn prompt(&self, options: PromptOptions) -> Result<String, ConsoleError> {
        self.prompts_seen.lock().unwrap().push(options);
        self.prompt_responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ConsoleError::Canceled)
    }

    async fn select(&self, options: SelectOptions) -> Result<usize, ConsoleError> {
        let index = match self.select_handler.lock().unwrap().as_mut() {
            Some(handler) => handler(&options),
            None => return Err(ConsoleError::Canceled),
        };
        self.selects_seen.lock().unwrap().push(options);
        Ok(index)
    }

    fn show_spinner(&self, message: &str, _style: SpinnerStyle) {
        self.spinners.lock().unwrap().push(message.to_string());
    }

    fn emit(&self, item: UxItem) {
        self.items.lock().unwrap().push(item);
    }

    fn message(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }

    fn is_spinner_interactive(&self) -> bool {
        self.interactive
    }
}
