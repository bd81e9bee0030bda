//! Outcome of a single tool invocation

use std::fmt;
use std::time::Duration;

/// Prefix every failure rendering starts with
pub const ERROR_PREFIX: &str = "Error: ";

/// What kind of external action an interruption hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Command,
    Request,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Command => write!(f, "Command"),
            Subject::Request => write!(f, "Request"),
        }
    }
}

/// Tagged result of one tool call.
///
/// Non-zero exits and non-2xx statuses are still `Success`: the captured
/// output is the useful part and the annotation lives in `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        text: String,
        exit_code: Option<i32>,
        status_code: Option<u16>,
    },
    TimedOut {
        subject: Subject,
        after: Duration,
    },
    Cancelled {
        subject: Subject,
    },
    InputError {
        field: Option<String>,
        detail: String,
    },
    ProtocolError {
        detail: String,
    },
    TransportError {
        context: String,
        detail: String,
    },
}

impl Outcome {
    pub fn text(text: impl Into<String>) -> Self {
        Outcome::Success {
            text: text.into(),
            exit_code: None,
            status_code: None,
        }
    }

    pub fn process(text: String, exit_code: i32) -> Self {
        Outcome::Success {
            text,
            exit_code: Some(exit_code),
            status_code: None,
        }
    }

    pub fn http(text: String, status_code: u16) -> Self {
        Outcome::Success {
            text,
            exit_code: None,
            status_code: Some(status_code),
        }
    }

    /// A required argument is absent; `action` names the sub-operation that needed it
    pub fn missing(field: &str, action: Option<&str>) -> Self {
        let detail = match action {
            Some(action) => format!("'{}' parameter required for {} action", field, action),
            None => format!("'{}' parameter required", field),
        };
        Outcome::InputError {
            field: Some(field.to_string()),
            detail,
        }
    }

    pub fn invalid(field: &str, detail: impl Into<String>) -> Self {
        Outcome::InputError {
            field: Some(field.to_string()),
            detail: detail.into(),
        }
    }

    pub fn protocol(detail: impl Into<String>) -> Self {
        Outcome::ProtocolError {
            detail: detail.into(),
        }
    }

    pub fn transport(context: impl Into<String>, detail: impl fmt::Display) -> Self {
        Outcome::TransportError {
            context: context.into(),
            detail: detail.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Render for the agent runtime
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success { text, .. } => f.write_str(text),
            Outcome::TimedOut { subject, after } => {
                write!(f, "{}{} timed out after {} seconds", ERROR_PREFIX, subject, format_secs(*after))
            }
            Outcome::Cancelled { subject } => write!(f, "{}{} cancelled", ERROR_PREFIX, subject),
            Outcome::InputError { detail, .. } => write!(f, "{}{}", ERROR_PREFIX, detail),
            Outcome::ProtocolError { detail } => write!(f, "{}{}", ERROR_PREFIX, detail),
            Outcome::TransportError { context, detail } => {
                write!(f, "{}{}: {}", ERROR_PREFIX, context, detail)
            }
        }
    }
}

fn format_secs(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        d.as_secs().to_string()
    } else {
        format!("{:.1}", d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_share_prefix() {
        let failures = [
            Outcome::TimedOut { subject: Subject::Command, after: Duration::from_secs(3) },
            Outcome::Cancelled { subject: Subject::Request },
            Outcome::missing("url", None),
            Outcome::protocol("Failed to send message (status 502)"),
            Outcome::transport("HTTP request failed", "connection refused"),
        ];
        for outcome in failures {
            assert!(!outcome.is_success());
            assert!(outcome.render().starts_with(ERROR_PREFIX), "{}", outcome);
        }
    }

    #[test]
    fn test_timeout_rendering() {
        let outcome = Outcome::TimedOut { subject: Subject::Command, after: Duration::from_secs(60) };
        assert_eq!(outcome.render(), "Error: Command timed out after 60 seconds");

        let outcome = Outcome::TimedOut { subject: Subject::Request, after: Duration::from_millis(1500) };
        assert_eq!(outcome.render(), "Error: Request timed out after 1.5 seconds");
    }

    #[test]
    fn test_missing_names_field_and_action() {
        let outcome = Outcome::missing("id", Some("get"));
        assert_eq!(outcome.render(), "Error: 'id' parameter required for get action");
        assert!(matches!(outcome, Outcome::InputError { field: Some(ref f), .. } if f == "id"));
    }

    #[test]
    fn test_success_renders_verbatim() {
        let outcome = Outcome::process("partial\nExit code: 2".to_string(), 2);
        assert!(outcome.is_success());
        assert_eq!(outcome.render(), "partial\nExit code: 2");
    }
}
