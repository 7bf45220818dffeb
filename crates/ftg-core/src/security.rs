use async_trait::async_trait;

use crate::{
    domain::UserId, identity::SessionIdentity, message::IncomingMessage, registry::CommandBinding,
};

// ============== Authorization ==============

pub fn is_authorized(user_id: Option<UserId>, allowed_users: &[i64]) -> bool {
    let Some(user_id) = user_id else {
        return false;
    };
    if allowed_users.is_empty() {
        return false;
    }
    allowed_users.contains(&user_id.0)
}

/// Decides whether `message` may run the command bound in `binding`.
///
/// Anything other than `true` blocks the command silently.
#[async_trait]
pub trait SecurityGate: Send + Sync {
    async fn check(&self, message: &IncomingMessage, binding: &CommandBinding) -> bool;
}

/// Allows the session itself and a fixed list of owners.
#[derive(Clone, Debug)]
pub struct OwnerGate {
    identity: SessionIdentity,
    owners: Vec<i64>,
}

impl OwnerGate {
    pub fn new(identity: SessionIdentity, owners: Vec<i64>) -> Self {
        Self { identity, owners }
    }
}

#[async_trait]
impl SecurityGate for OwnerGate {
    async fn check(&self, message: &IncomingMessage, _binding: &CommandBinding) -> bool {
        let sender = message.sender_id();
        self.identity.is_self(sender) || is_authorized(sender, &self.owners)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

#[async_trait]
impl SecurityGate for AllowAll {
    async fn check(&self, _message: &IncomingMessage, _binding: &CommandBinding) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        domain::{ChatId, MessageId},
        message::Sender,
        registry::CommandHandler,
        Result,
    };

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn handle(&self, _message: &IncomingMessage) -> Result<()> {
            Ok(())
        }
    }

    fn from(user: Option<i64>) -> IncomingMessage {
        let mut m = IncomingMessage::new(ChatId(1), MessageId(1), ".x");
        m.sender = user.map(|id| Sender {
            id: UserId(id),
            username: None,
            lang_code: None,
            phone: None,
        });
        m
    }

    fn binding() -> CommandBinding {
        CommandBinding {
            name: "x".to_string(),
            module: "m".to_string(),
            handler: Arc::new(Noop),
        }
    }

    #[test]
    fn authorization_requires_listed_user() {
        assert!(is_authorized(Some(UserId(1)), &[1, 2]));
        assert!(!is_authorized(Some(UserId(3)), &[1, 2]));
        assert!(!is_authorized(None, &[1]));
        assert!(!is_authorized(Some(UserId(1)), &[]));
    }

    #[tokio::test]
    async fn owner_gate_allows_self_and_owners_only() {
        let gate = OwnerGate::new(SessionIdentity::new(UserId(100), "me", false), vec![5]);
        assert!(gate.check(&from(Some(100)), &binding()).await);
        assert!(gate.check(&from(Some(5)), &binding()).await);
        assert!(!gate.check(&from(Some(6)), &binding()).await);
        assert!(!gate.check(&from(None), &binding()).await);
    }
}
