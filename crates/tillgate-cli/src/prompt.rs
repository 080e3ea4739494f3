//! Line-based login prompt for a terminal.

use std::io::{self, BufRead, Write};

use tillgate_core::auth::{PromptRequest, PromptResponse, PromptUi, Submission};

/// Typed at the username prompt to leave the application
const QUIT_COMMAND: &str = "\\q";

/// What the operator typed at the username prompt
#[derive(Debug, PartialEq, Eq)]
pub enum UsernameInput {
    Name(String),
    Quit,
}

/// Interpret a username line, falling back to `default` on an empty line.
pub fn parse_username_input(line: &str, default: Option<&str>) -> UsernameInput {
    let input = line.trim();
    if input == QUIT_COMMAND {
        UsernameInput::Quit
    } else if input.is_empty() {
        UsernameInput::Name(default.unwrap_or_default().to_string())
    } else {
        UsernameInput::Name(input.to_string())
    }
}

pub fn is_yes(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

pub struct TerminalPrompt {
    /// Offered when the operator just presses enter
    last_username: Option<String>,
    header_shown: bool,
}

impl TerminalPrompt {
    pub fn new(last_username: Option<String>) -> Self {
        Self {
            last_username,
            header_shown: false,
        }
    }

    fn ask_username(&self, request: &PromptRequest<'_>) -> io::Result<Option<UsernameInput>> {
        if request.username_locked {
            let name = request.username.unwrap_or_default();
            println!("Username: {}", name);
            return Ok(Some(UsernameInput::Name(name.to_string())));
        }

        let default = request.username.or(self.last_username.as_deref());
        match default {
            Some(name) => print!("Username [{}]: ", name),
            None => print!("Username: "),
        }
        io::stdout().flush()?;

        Ok(read_line()?.map(|line| parse_username_input(&line, default)))
    }
}

impl PromptUi for TerminalPrompt {
    fn run(&mut self, request: &PromptRequest<'_>) -> io::Result<PromptResponse> {
        if !self.header_shown {
            println!("\n=== Tillgate - Access Control ===");
            println!("(Ctrl+D to cancel, {} to quit)\n", QUIT_COMMAND);
            self.header_shown = true;
        }

        if let Some(message) = request.message {
            eprintln!("{}", message);
        }

        let username = match self.ask_username(request)? {
            Some(UsernameInput::Name(name)) => name,
            Some(UsernameInput::Quit) => return Ok(PromptResponse::Quit),
            None => {
                println!();
                return Ok(PromptResponse::Cancelled);
            }
        };

        let password = rpassword::prompt_password("Password: ")?;

        let remember = if request.allow_remember {
            print!("Remember me? [y/N]: ");
            io::stdout().flush()?;
            read_line()?.map(|line| is_yes(&line)).unwrap_or(false)
        } else {
            false
        };

        println!(" Authenticating user...");
        Ok(PromptResponse::Submitted(Submission {
            username,
            password,
            remember,
        }))
    }

    fn warn(&mut self, message: &str) {
        eprintln!("\nWarning: {}\n", message);
    }
}

/// Read one line from stdin. `None` at end of input.
fn read_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    Ok((read > 0).then_some(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_username_input() {
        assert_eq!(
            parse_username_input("maria\n", None),
            UsernameInput::Name("maria".to_string())
        );
        assert_eq!(
            parse_username_input("  joao  ", Some("maria")),
            UsernameInput::Name("joao".to_string())
        );
    }

    #[test]
    fn test_parse_username_input_uses_default() {
        assert_eq!(
            parse_username_input("\n", Some("maria")),
            UsernameInput::Name("maria".to_string())
        );
        assert_eq!(parse_username_input("\n", None), UsernameInput::Name(String::new()));
    }

    #[test]
    fn test_parse_username_input_quit() {
        assert_eq!(parse_username_input("\\q\n", Some("maria")), UsernameInput::Quit);
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes("YES"));
        assert!(!is_yes("\n"));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }
}
