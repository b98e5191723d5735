// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Deny-list for stateless session tokens.
//!
//! A signed token stays cryptographically valid until it expires, so logout
//! and account deletion record the session (or the whole subject) here and
//! every authentication consults the list after signature verification.
//!
//! The list is process-local and pruned lazily on every write.
//!
//! A subject entry also covers tokens whose `iat` runs up to
//! [`MAX_CLOCK_SKEW_SECS`] past the cutoff, and it is kept until the latest
//! such token could expire. The verifier rejects anything issued further
//! ahead or living longer than the TTL, so no session of a revoked subject
//! outlives its entry.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use super::{SessionClaims, MAX_CLOCK_SKEW_SECS};

#[derive(Debug, Default)]
struct Entries {
    /// Session ID -> token expiry (unix seconds)
    sessions: HashMap<String, i64>,
    /// Subject -> cutoff; tokens issued at or before it are dead
    subjects: HashMap<String, DateTime<Utc>>,
}

/// In-memory revocation list shared by the gate and the account service.
#[derive(Debug)]
pub struct RevocationList {
    entries: RwLock<Entries>,
    /// Longest lifetime of any token, used to expire subject entries
    max_token_ttl: Duration,
}

impl RevocationList {
    /// Create an empty list for tokens living at most `max_token_ttl`.
    pub fn new(max_token_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            max_token_ttl,
        }
    }

    /// Revoke a single session (logout).
    pub fn revoke_session(&self, claims: &SessionClaims, now: DateTime<Utc>) {
        let mut entries = self.write();
        entries.sessions.insert(claims.jti.clone(), claims.exp);
        self.prune(&mut entries, now);
    }

    /// Revoke every session of `subject` issued at or before `cutoff`,
    /// allowing for issuer clock skew.
    pub fn revoke_subject(&self, subject: &str, cutoff: DateTime<Utc>) {
        let mut entries = self.write();
        entries.subjects.insert(subject.to_string(), cutoff);
        self.prune(&mut entries, cutoff);
    }

    /// Whether these claims belong to a revoked session.
    pub fn is_revoked(&self, claims: &SessionClaims) -> bool {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if entries.sessions.contains_key(&claims.jti) {
            return true;
        }

        entries
            .subjects
            .get(&claims.sub)
            .is_some_and(|cutoff| {
                claims.iat <= cutoff.timestamp().saturating_add(MAX_CLOCK_SKEW_SECS)
            })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.sessions.len() + entries.subjects.len()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Entries> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn prune(&self, entries: &mut Entries, now: DateTime<Utc>) {
        let now_secs = now.timestamp();
        entries.sessions.retain(|_, exp| *exp > now_secs);

        let horizon = self.max_token_ttl + Duration::seconds(MAX_CLOCK_SKEW_SECS);
        entries
            .subjects
            .retain(|_, cutoff| *cutoff + horizon > now);
    }
}

impl Default for RevocationList {
    fn default() -> Self {
        Self::new(Duration::days(7))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, jti: &str, iat: DateTime<Utc>) -> SessionClaims {
        SessionClaims {
            sub: sub.to_string(),
            iat: iat.timestamp(),
            exp: (iat + Duration::hours(1)).timestamp(),
            jti: jti.to_string(),
        }
    }

    #[test]
    fn revoking_a_session_leaves_siblings_alone() {
        let now = Utc::now();
        let list = RevocationList::default();
        let first = claims("user_1", "sess_a", now);
        let second = claims("user_1", "sess_b", now);

        list.revoke_session(&first, now);

        assert!(list.is_revoked(&first));
        assert!(!list.is_revoked(&second));
    }

    #[test]
    fn revoking_a_subject_kills_all_earlier_sessions() {
        let now = Utc::now();
        let list = RevocationList::default();
        let old = claims("user_1", "sess_a", now - Duration::minutes(5));
        let current = claims("user_1", "sess_b", now);
        let other_user = claims("user_2", "sess_c", now);

        list.revoke_subject("user_1", now);

        assert!(list.is_revoked(&old));
        assert!(list.is_revoked(&current));
        assert!(!list.is_revoked(&other_user));
    }

    #[test]
    fn subject_entry_covers_skewed_sessions_until_they_expire() {
        let now = Utc::now();
        let list = RevocationList::new(Duration::hours(1));
        let skewed = claims("user_1", "sess_a", now + Duration::seconds(MAX_CLOCK_SKEW_SECS));

        list.revoke_subject("user_1", now);
        assert!(list.is_revoked(&skewed));

        // Still held just before the skewed session's expiry
        let before_expiry = now + Duration::hours(1) + Duration::seconds(MAX_CLOCK_SKEW_SECS - 1);
        list.revoke_session(&claims("user_2", "sess_b", before_expiry), before_expiry);
        assert!(list.is_revoked(&skewed));
    }

    #[test]
    fn expired_entries_are_pruned() {
        let start = Utc::now();
        let list = RevocationList::new(Duration::hours(1));
        let stale = claims("user_1", "sess_a", start);
        list.revoke_session(&stale, start);
        list.revoke_subject("user_9", start);
        assert_eq!(list.len(), 2);

        let later = start + Duration::hours(2);
        list.revoke_session(&claims("user_2", "sess_b", later), later);

        assert_eq!(list.len(), 1);
        assert!(!list.is_revoked(&stale));
    }
}
