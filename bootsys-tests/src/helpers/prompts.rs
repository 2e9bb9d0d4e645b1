//! Operator stand-in that answers every confirmation the same way

use std::sync::Mutex;

use bootsys_core::groups::Confirm;
use bootsys_core::Result;

pub struct ScriptedPrompt {
    answer: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn yes() -> Self {
        Self::answering("yes")
    }

    pub fn no() -> Self {
        Self::answering("no")
    }

    /// Every prompt shown so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Confirm for ScriptedPrompt {
    fn confirm(&self, prompt: &str, _choices: &[&str]) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answer.clone())
    }
}
