//! Interruptions: the engine's decision to stop a transaction.

/// How the adapter should conclude the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptionAction {
    /// Respond with `status` and stop.
    Deny,
    /// Close the connection without a response.
    Drop,
    /// Respond with `status` and a Location of `data`.
    Redirect,
    /// Stop evaluating rules; the request proceeds unblocked.
    Allow,
}

impl InterruptionAction {
    /// Lowercase name as used in logs and audit records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deny => "deny",
            Self::Drop => "drop",
            Self::Redirect => "redirect",
            Self::Allow => "allow",
        }
    }

    /// Whether the adapter must block the client.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Self::Allow)
    }
}

/// An immutable record of the blocking decision.
///
/// At most one per transaction; once set, no further rules run except
/// phase 5.
#[derive(Debug, Clone)]
pub struct Interruption {
    /// What to do.
    pub action: InterruptionAction,
    /// HTTP status, 0 when not applicable (drop, allow).
    pub status: u16,
    /// Action payload: the redirect URL, otherwise "".
    pub data: String,
    /// The rule that raised the interruption.
    pub rule_id: u64,
}

impl Interruption {
    /// A deny with an explicit status.
    pub fn deny(status: u16, rule_id: u64) -> Self {
        Self {
            action: InterruptionAction::Deny,
            status,
            data: String::new(),
            rule_id,
        }
    }

    /// A connection drop.
    pub fn drop(rule_id: u64) -> Self {
        Self {
            action: InterruptionAction::Drop,
            status: 0,
            data: String::new(),
            rule_id,
        }
    }

    /// A redirect to `url`.
    pub fn redirect(status: u16, url: impl Into<String>, rule_id: u64) -> Self {
        Self {
            action: InterruptionAction::Redirect,
            status,
            data: url.into(),
            rule_id,
        }
    }

    /// An allow: suppresses further rules without blocking the client.
    pub fn allow(rule_id: u64) -> Self {
        Self {
            action: InterruptionAction::Allow,
            status: 0,
            data: String::new(),
            rule_id,
        }
    }
}

impl std::fmt::Display for Interruption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (status {}, rule {})",
            self.action.name(),
            self.status,
            self.rule_id
        )?;
        if !self.data.is_empty() {
            write!(f, " -> {}", self.data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        let deny = Interruption::deny(500, 2);
        assert_eq!(deny.status, 500);
        assert_eq!(deny.data, "");
        assert_eq!(deny.rule_id, 2);
        assert!(deny.action.is_blocking());

        let drop = Interruption::drop(33);
        assert_eq!(drop.status, 0);

        let redirect = Interruption::redirect(302, "https://www.example.com", 21);
        assert_eq!(redirect.data, "https://www.example.com");

        let allow = Interruption::allow(7);
        assert_eq!(allow.status, 0);
        assert!(!allow.action.is_blocking());
    }

    #[test]
    fn test_display() {
        let i = Interruption::redirect(302, "https://x", 9);
        assert_eq!(i.to_string(), "redirect (status 302, rule 9) -> https://x");
    }
}
