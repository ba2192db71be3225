use std::time::Duration;

use foundation::time::Millis;
use serde::Serialize;

pub const DEFAULT_STATUS_DELAY: Duration = Duration::from_millis(5000);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Info,
    Loading,
    Success,
    Error,
}

impl StatusKind {
    /// Loading messages stay up until something replaces them.
    pub fn expires(&self) -> bool {
        !matches!(self, StatusKind::Loading)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
    pub visible: bool,
}

/// Handle for one scheduled hide.
///
/// A ticket is only honoured while the message it was issued for is still the
/// current one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ExpiryTicket {
    pub token: u64,
    pub due_at: Millis,
}

impl ExpiryTicket {
    pub fn delay_from(&self, now: Millis) -> Duration {
        self.due_at.since(now)
    }
}

/// Single-slot transient status line.
///
/// Ordering contract:
/// - Every `post` supersedes the previous message and invalidates its ticket.
/// - `expire` with a stale ticket is a no-op, so a late timer belonging to an
///   older message can never hide a newer one.
#[derive(Debug)]
pub struct StatusNotifier {
    delay: Duration,
    current: Option<StatusMessage>,
    deadline: Option<ExpiryTicket>,
    next_token: u64,
}

impl Default for StatusNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_DELAY)
    }
}

impl StatusNotifier {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            current: None,
            deadline: None,
            next_token: 0,
        }
    }

    pub fn post(
        &mut self,
        text: impl Into<String>,
        kind: StatusKind,
        now: Millis,
    ) -> Option<ExpiryTicket> {
        self.next_token = self.next_token.wrapping_add(1);
        self.current = Some(StatusMessage {
            text: text.into(),
            kind,
            visible: true,
        });
        self.deadline = if kind.expires() {
            Some(ExpiryTicket {
                token: self.next_token,
                due_at: now.after(self.delay),
            })
        } else {
            None
        };
        self.deadline
    }

    /// Returns `true` if the ticket was current and the message got hidden.
    pub fn expire(&mut self, ticket: ExpiryTicket) -> bool {
        if self.deadline != Some(ticket) {
            return false;
        }
        self.hide()
    }

    /// Hides the current message once its deadline has passed.
    pub fn tick(&mut self, now: Millis) -> bool {
        match self.deadline {
            Some(ticket) if now >= ticket.due_at => self.hide(),
            _ => false,
        }
    }

    fn hide(&mut self) -> bool {
        self.deadline = None;
        match self.current.as_mut() {
            Some(msg) if msg.visible => {
                msg.visible = false;
                true
            }
            _ => false,
        }
    }

    /// The message currently on screen, if any.
    pub fn visible(&self) -> Option<&StatusMessage> {
        self.current.as_ref().filter(|m| m.visible)
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.current.as_ref()
    }
}
