use crate::{domain::UserId, errors::Error, ports::AccountPort, Result};

/// Who this session is. Resolved once at startup, read-only afterwards.
///
/// The router takes a `SessionIdentity` by value, so it cannot be built (and
/// therefore cannot route) before resolution has succeeded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionIdentity {
    self_id: UserId,
    self_handle: String,
    is_bot: bool,
}

impl SessionIdentity {
    /// Fetch and cache the session's id and lowercased handle.
    ///
    /// Fails when the account cannot be fetched or has no username; callers
    /// treat that as fatal to startup.
    pub async fn resolve(client: &dyn AccountPort) -> Result<Self> {
        let me = client
            .get_me()
            .await
            .map_err(|e| Error::Identity(e.to_string()))?;
        let handle = me
            .username
            .ok_or_else(|| Error::Identity(format!("account {} has no username", me.id.0)))?;
        Ok(Self::new(me.id, &handle, me.is_bot))
    }

    pub fn new(self_id: UserId, handle: &str, is_bot: bool) -> Self {
        Self {
            self_id,
            self_handle: handle.to_lowercase(),
            is_bot,
        }
    }

    pub fn self_id(&self) -> UserId {
        self.self_id
    }

    pub fn self_handle(&self) -> &str {
        &self.self_handle
    }

    pub fn is_bot(&self) -> bool {
        self.is_bot
    }

    pub fn is_self(&self, user: Option<UserId>) -> bool {
        user == Some(self.self_id)
    }
}
