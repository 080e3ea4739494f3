use std::fmt;
use std::io;

/// What the session asks the prompt to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptRequest<'a> {
    /// Pre-filled username
    pub username: Option<&'a str>,
    /// The username may not be edited
    pub username_locked: bool,
    /// Error from the previous attempt
    pub message: Option<&'a str>,
    /// Offer the "remember me" choice
    pub allow_remember: bool,
}

/// Credentials as typed by the operator.
#[derive(Clone, PartialEq, Eq)]
pub struct Submission {
    pub username: String,
    pub password: String,
    pub remember: bool,
}

impl Submission {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            remember: false,
        }
    }

    pub fn remembered(mut self) -> Self {
        self.remember = true;
        self
    }
}

impl fmt::Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submission")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("remember", &self.remember)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResponse {
    Submitted(Submission),
    /// Escaped the dialog
    Cancelled,
    /// Asked to leave the application altogether
    Quit,
}

/// A modal credentials form.
///
/// `run` blocks until the operator submits, cancels or quits. The same
/// instance is reused across retries, so implementations may keep state
/// between calls.
pub trait PromptUi {
    fn run(&mut self, request: &PromptRequest<'_>) -> io::Result<PromptResponse>;

    /// Show a message for a failure that ends the login
    fn warn(&mut self, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_debug_hides_password() {
        let submission = Submission::new("maria", "hunter2").remembered();
        let debug = format!("{:?}", submission);
        assert!(debug.contains("maria"));
        assert!(debug.contains("remember: true"));
        assert!(!debug.contains("hunter2"));
    }
}
