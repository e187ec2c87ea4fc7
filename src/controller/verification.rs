//! # Verification Token
//!
//! The token stored in `spec.sha` authorizes updates and deletions of the
//! organization named by `spec.id`. It is the lowercase hex SHA-1 digest of the
//! UTF-8 bytes of the id. Tokens already persisted on resources were written
//! with this exact digest, so the encoding must never change.
//!
//! The check recomputes the token from the id carried in the same event. A
//! writer who changes `id` and `sha` together to a matching pair passes it;
//! the token catches stale or hand-edited ids, not a deliberate forgery.

use sha1::{Digest, Sha1};

use crate::crd::OrganizationSpec;

/// Compute the verification token for an organization id
#[must_use]
pub fn token(id: &str) -> String {
    format!("{:x}", Sha1::digest(id.as_bytes()))
}

/// Whether `spec.sha` matches the token recomputed from `spec.id`
///
/// A spec with no id, or with an id but no token, never verifies.
#[must_use]
pub fn verify(spec: &OrganizationSpec) -> bool {
    match (spec.organization_id(), spec.sha.as_deref()) {
        (Some(id), Some(sha)) => sha == token(id),
        _ => false,
    }
}
