use crate::types::{Message, Role};

/// Ordered chat log plus the loading flag shown by the front-end.
///
/// Only the trailing assistant message is ever rewritten; appending a user
/// message freezes everything before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    messages: Vec<Message>,
    is_loading: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Replaces the trailing assistant message, or appends one if the log
    /// does not end with an assistant turn.
    pub fn upsert_assistant(&mut self, content: &str) {
        match self.messages.last_mut() {
            Some(last) if last.role == Role::Assistant => {
                last.content.clear();
                last.content.push_str(content);
            }
            _ => self.messages.push(Message::assistant(content)),
        }
    }

    /// Removes the most recent user message, leaving later assistant text alone.
    pub fn remove_last_user(&mut self) -> Option<Message> {
        let index = self
            .messages
            .iter()
            .rposition(|message| message.role == Role::User)?;
        Some(self.messages.remove(index))
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.is_loading = false;
    }

    /// Loading and no reply text has arrived yet.
    pub fn awaiting_reply(&self) -> bool {
        self.is_loading && self.last().is_some_and(|m| m.role == Role::User)
    }

    /// Index of the assistant message currently being extended.
    pub fn streaming_index(&self) -> Option<usize> {
        match self.last() {
            Some(last) if self.is_loading && last.role == Role::Assistant => {
                Some(self.messages.len() - 1)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_appends_then_replaces_in_place() {
        let mut session = SessionState::new();
        session.push_user("hi");
        session.upsert_assistant("Hel");
        session.upsert_assistant("Hello");
        assert_eq!(session.len(), 2);
        assert_eq!(session.messages()[1], Message::assistant("Hello"));
    }

    #[test]
    fn test_new_user_turn_freezes_previous_reply() {
        let mut session = SessionState::new();
        session.push_user("one");
        session.upsert_assistant("first reply");
        session.push_user("two");
        session.upsert_assistant("second");
        assert_eq!(session.messages()[1].content, "first reply");
        assert_eq!(session.messages()[3].content, "second");
    }

    #[test]
    fn test_remove_last_user_skips_trailing_assistant() {
        let mut session = SessionState::new();
        session.push_user("earlier");
        session.upsert_assistant("answer");
        session.push_user("test");
        session.upsert_assistant("partial");

        let removed = session.remove_last_user();
        assert_eq!(removed, Some(Message::user("test")));
        assert_eq!(
            session.messages(),
            &[
                Message::user("earlier"),
                Message::assistant("answer"),
                Message::assistant("partial")
            ]
        );
    }

    #[test]
    fn test_remove_last_user_on_empty_log() {
        let mut session = SessionState::new();
        assert_eq!(session.remove_last_user(), None);
    }

    #[test]
    fn test_loading_views() {
        let mut session = SessionState::new();
        session.push_user("hi");
        session.set_loading(true);
        assert!(session.awaiting_reply());
        assert_eq!(session.streaming_index(), None);

        session.upsert_assistant("H");
        assert!(!session.awaiting_reply());
        assert_eq!(session.streaming_index(), Some(1));

        session.clear();
        assert!(session.is_empty());
        assert!(!session.is_loading());
    }
}
