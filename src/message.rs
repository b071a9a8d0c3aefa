use serde::{Deserialize, Serialize};

/// A single turn in a tutoring conversation, with a role and text content.
///
/// Messages carry the conversation history into a pipeline run and receive
/// the assistant's reply when the chat stage completes. Each message has a
/// role (typically "user", "assistant", or "system") and text content.
///
/// # Examples
///
/// ```
/// use lessonweave::message::Message;
///
/// let question = Message::user("What is the derivative of x^2?");
/// let reply = Message::assistant("The derivative of x^2 is 2x.");
/// let framing = Message::system("You are a patient math tutor.");
///
/// assert!(question.has_role(Message::USER));
/// assert!(framing.has_role(Message::SYSTEM));
/// assert_eq!(reply.content, "The derivative of x^2 is 2x.");
/// ```
///
/// Messages serialize to the `{role, content}` shape collaborating services
/// exchange:
///
/// ```
/// use lessonweave::message::Message;
///
/// let msg = Message::user("Explain fractions");
/// let json = serde_json::to_string(&msg).unwrap();
/// assert_eq!(json, r#"{"role":"user","content":"Explain fractions"}"#);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender (e.g., "user", "assistant", "system").
    ///
    /// Use the constants on [`Message`] for standardized values.
    pub role: String,
    /// The text content of the message.
    pub content: String,
}

impl Message {
    /// Learner or educator input message role.
    pub const USER: &'static str = "user";
    /// Assistant reply message role.
    pub const ASSISTANT: &'static str = "assistant";
    /// System framing or instruction message role.
    pub const SYSTEM: &'static str = "system";

    /// Creates a new message with the specified role and content.
    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    /// Creates a user message with the specified content.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    /// Creates an assistant message with the specified content.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    /// Creates a system message with the specified content.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    /// Returns true if this message has the specified role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    /// Renders this message as a single transcript line (`role: content`).
    ///
    /// Prompt builders use this to flatten history into model input.
    #[must_use]
    pub fn transcript_line(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}

/// Flattens a message slice into a newline-separated transcript.
///
/// # Examples
///
/// ```
/// use lessonweave::message::{render_transcript, Message};
///
/// let history = vec![
///     Message::user("What is 2 + 2?"),
///     Message::assistant("2 + 2 = 4."),
/// ];
/// let transcript = render_transcript(&history);
/// assert_eq!(transcript, "user: What is 2 + 2?\nassistant: 2 + 2 = 4.");
/// ```
#[must_use]
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(Message::transcript_line)
        .collect::<Vec<_>>()
        .join("\n")
}
