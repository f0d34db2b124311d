//! Inbound message from the messaging transport: delivered to the conversation engine.

/// A chat message addressed to the bot.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    /// Transport address of the sender (e.g. `5531999990000@c.us`).
    pub sender_id: String,
    /// Message text as received; the engine trims it.
    pub body: String,
    /// True when the chat is a group.
    pub is_group: bool,
    /// Set by the transport when the message was authored inside a group context.
    pub author: Option<String>,
    /// Contact's display name, when the transport knows it.
    pub display_name: Option<String>,
}

impl InboundMessage {
    /// Direct message with no group metadata.
    pub fn direct(sender_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Group chats, messages with an author, and broadcast-style ids (containing `-`) are not
    /// handled by the bot.
    pub fn is_group_traffic(&self) -> bool {
        self.is_group
            || self.sender_id.contains('-')
            || self
                .author
                .as_deref()
                .is_some_and(|a| !a.trim().is_empty())
    }
}
