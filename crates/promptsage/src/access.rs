//! Per-source access control.
//!
//! Each resolved source may carry an owner. [`AccessControl`] compares that
//! owner with the requesting user and applies an [`AccessControlPolicy`]:
//! reject the whole request, or drop the source and carry on. Unowned sources
//! and sources owned by the requester always pass.
//!
//! With no requesting user, [`AnonymousAccess`] decides. The default,
//! [`AnonymousAccess::Permissive`], performs no filtering at all.

use crate::PromptError;
use crate::source::ResolvedSource;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What to do with a source owned by someone other than the requester.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessControlPolicy {
    /// Abort the request with [`PromptError::Unauthorized`].
    #[default]
    RejectUnauthorized,
    /// Omit the source and continue.
    SkipUnauthorized,
}

/// How owned sources are treated when no `user_id` is given.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnonymousAccess {
    /// No access control is applied; every source is included.
    #[default]
    Permissive,
    /// Every owned source counts as unauthorized and the policy applies.
    Restricted,
}

/// A requester identity together with the policies that govern it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessControl {
    pub user_id: Option<String>,
    pub policy: AccessControlPolicy,
    pub anonymous: AnonymousAccess,
}

impl AccessControl {
    pub fn new(user_id: Option<String>, policy: AccessControlPolicy) -> Self {
        Self {
            user_id,
            policy,
            anonymous: AnonymousAccess::default(),
        }
    }

    /// Set the anonymous-access rule (builder pattern).
    pub fn with_anonymous(mut self, anonymous: AnonymousAccess) -> Self {
        self.anonymous = anonymous;
        self
    }

    /// Whether content with the given owner is visible to the requester.
    pub fn is_authorized(&self, owner_id: Option<&str>) -> bool {
        match (owner_id, self.user_id.as_deref()) {
            (None, _) => true,
            (Some(owner), Some(user)) => owner == user,
            (Some(_), None) => self.anonymous == AnonymousAccess::Permissive,
        }
    }

    /// Filter resolved sources, preserving the order of those kept.
    ///
    /// Under [`AccessControlPolicy::RejectUnauthorized`] the first unauthorized
    /// source ends the request; nothing is returned.
    pub fn apply(&self, sources: Vec<ResolvedSource>) -> Result<Vec<ResolvedSource>, PromptError> {
        let total = sources.len();
        let mut kept = Vec::with_capacity(total);

        for source in sources {
            if self.is_authorized(source.owner_id.as_deref()) {
                kept.push(source);
                continue;
            }

            match self.policy {
                AccessControlPolicy::RejectUnauthorized => {
                    return Err(PromptError::Unauthorized {
                        source_label: source.display_label(),
                        owner_id: source.owner_id.unwrap_or_default(),
                        user_id: self.user_id.clone(),
                    });
                }
                AccessControlPolicy::SkipUnauthorized => {
                    debug!("Skipping unauthorized {}", source.display_label());
                }
            }
        }

        debug!(
            "Access control: kept {}/{} source(s) for user={}",
            kept.len(),
            total,
            self.user_id.as_deref().unwrap_or("(anonymous)"),
        );
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(index: usize, owner: Option<&str>, content: &str) -> ResolvedSource {
        ResolvedSource {
            index,
            label: "echo".into(),
            owner_id: owner.map(str::to_string),
            content: content.into(),
        }
    }

    fn password_sources() -> Vec<ResolvedSource> {
        vec![
            resolved(0, Some("user1"), "User 1 knows that the password is XXX"),
            resolved(1, Some("user2"), "User 2 knows that the password is YYY"),
            resolved(2, Some("user3"), "User 3 knows that the password is ZZZ"),
        ]
    }

    #[test]
    fn default_policy_is_reject() {
        assert_eq!(
            AccessControlPolicy::default(),
            AccessControlPolicy::RejectUnauthorized
        );
    }

    #[test]
    fn reject_names_first_offender() {
        let ac = AccessControl::new(Some("user2".into()), AccessControlPolicy::RejectUnauthorized);
        let err = ac.apply(password_sources()).unwrap_err();
        match err {
            PromptError::Unauthorized {
                source_label,
                owner_id,
                user_id,
            } => {
                assert_eq!(source_label, "source #0 (echo)");
                assert_eq!(owner_id, "user1");
                assert_eq!(user_id.as_deref(), Some("user2"));
            }
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[test]
    fn skip_keeps_only_own_sources() {
        let ac = AccessControl::new(Some("user2".into()), AccessControlPolicy::SkipUnauthorized);
        let kept = ac.apply(password_sources()).unwrap();
        assert_eq!(kept.len(), 1);
        assert!(kept[0].content.contains("YYY"));
    }

    #[test]
    fn unowned_sources_always_pass_in_order() {
        let ac = AccessControl::new(Some("bob".into()), AccessControlPolicy::SkipUnauthorized);
        let sources = vec![
            resolved(0, None, "a"),
            resolved(1, Some("alice"), "b"),
            resolved(2, Some("bob"), "c"),
            resolved(3, None, "d"),
        ];
        let kept: Vec<_> = ac
            .apply(sources)
            .unwrap()
            .into_iter()
            .map(|s| s.content)
            .collect();
        assert_eq!(kept, vec!["a", "c", "d"]);
    }

    #[test]
    fn anonymous_permissive_bypasses_checks() {
        let ac = AccessControl::new(None, AccessControlPolicy::RejectUnauthorized);
        assert_eq!(ac.apply(password_sources()).unwrap().len(), 3);
    }

    #[test]
    fn anonymous_restricted_applies_policy() {
        let skip = AccessControl::new(None, AccessControlPolicy::SkipUnauthorized)
            .with_anonymous(AnonymousAccess::Restricted);
        let mut sources = password_sources();
        sources.push(resolved(3, None, "public"));
        let kept = skip.apply(sources).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].content, "public");

        let reject = AccessControl::new(None, AccessControlPolicy::RejectUnauthorized)
            .with_anonymous(AnonymousAccess::Restricted);
        assert!(matches!(
            reject.apply(password_sources()),
            Err(PromptError::Unauthorized { user_id: None, .. })
        ));
    }

    #[test]
    fn policy_serde_names() {
        let policy: AccessControlPolicy = serde_json::from_str("\"skip_unauthorized\"").unwrap();
        assert_eq!(policy, AccessControlPolicy::SkipUnauthorized);
        assert_eq!(
            serde_json::to_string(&AnonymousAccess::Restricted).unwrap(),
            "\"restricted\""
        );
    }
}
