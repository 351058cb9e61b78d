use thiserror::Error;

/// Core error types for ufw-sweep
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ufw command execution failed
    #[error("ufw error: {message}")]
    Ufw {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    /// The ufw executable could not be located
    #[error(
        "could not locate the 'ufw' executable (searched UFW_SWEEP_UFW_COMMAND, PATH, /usr/sbin, /sbin, /usr/local/sbin)"
    )]
    ToolNotFound,
}

/// Represents a translated error with helpful context
#[derive(Debug, Clone)]
pub struct ErrorTranslation {
    pub user_message: String,
    pub suggestions: Vec<String>,
    pub help_url: Option<String>,
}

impl ErrorTranslation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user_message: message.into(),
            suggestions: Vec::new(),
            help_url: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, url: impl Into<String>) -> Self {
        self.help_url = Some(url.into());
        self
    }
}

/// Database of ufw error patterns and their translations
pub struct UfwErrorPattern;

impl UfwErrorPattern {
    /// Matches an error message against known patterns and returns a user-friendly translation.
    pub fn match_error(msg: &str) -> ErrorTranslation {
        let lower = msg.to_lowercase();

        // Privilege errors
        if lower.contains("you need to be root") || lower.contains("permission denied") {
            return ErrorTranslation::new("Insufficient privileges to query or modify ufw rules")
                .with_suggestion("Run the tool as root, or install sudo/run0 so it can elevate itself")
                .with_suggestion("Check that your account is allowed to use sudo: sudo -l")
                .with_help("https://help.ubuntu.com/community/UFW");
        }

        // Missing ufw
        if lower.contains("could not locate")
            || lower.contains("no such file")
            || lower.contains("command not found")
        {
            return ErrorTranslation::new("ufw is not installed or not found on this system")
                .with_suggestion("Install ufw: sudo apt install ufw  (Debian/Ubuntu)")
                .with_suggestion("Or: sudo dnf install ufw  (Fedora)")
                .with_suggestion("Or: sudo pacman -S ufw  (Arch)")
                .with_help("https://launchpad.net/ufw");
        }

        // Stale index (the rule table changed between snapshot and delete)
        if lower.contains("non-existent rule") || lower.contains("invalid position") {
            return ErrorTranslation::new("A rule index no longer exists in the live rule table")
                .with_suggestion("Another process changed the rules mid-run; simply re-run the sweep")
                .with_suggestion("Use --watch to keep re-applying the policy until it converges");
        }

        // Firewall disabled
        if lower.contains("firewall is not enabled") || lower.contains("status: inactive") {
            return ErrorTranslation::new("The ufw firewall is not enabled")
                .with_suggestion("Enable it first: sudo ufw enable")
                .with_help("https://help.ubuntu.com/community/UFW");
        }

        // Generic fallback
        ErrorTranslation::new(format!("Firewall error: {msg}"))
            .with_suggestion("Check the detailed error message for more information")
            .with_suggestion("Verify ufw is working: sudo ufw status numbered")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
