pub mod message;
pub mod telegram;

use std::{fmt::Display, future::Future};

/// Delivers plain text messages to the configured chat.
pub trait Notifier {
    /// Longest message the service accepts, in UTF-16 code units.
    const MAX_MESSAGE_LEN: usize;

    type Error: Display + Send;

    fn send_message(&self, text: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
