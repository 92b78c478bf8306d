//! Identity normalization between the roster and the forum.
//!
//! Roster members are numeric account ids; the forum knows the same people by
//! a username that is the decimal rendering of that id. One reserved forum
//! account (`system`) owns every topic and must never be added or removed.

use std::collections::BTreeSet;
use std::fmt;

/// Username of the reserved forum account excluded from all reconciliation.
pub const SYSTEM_USERNAME: &str = "system";

/// Account id in the authoritative (roster) system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(u64);

impl MemberId {
    /// Wrap a raw account id. Zero is not a valid account id.
    #[must_use]
    pub fn new(id: u64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// The forum username that represents this member.
    #[must_use]
    pub fn to_forum_username(self) -> ForumUsername {
        ForumUsername(self.0.to_string())
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Username of a forum account.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ForumUsername(String);

impl ForumUsername {
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self(username.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the reserved system account.
    #[must_use]
    pub fn is_system(&self) -> bool {
        is_system_account(&self.0)
    }

    /// Map back to a roster member.
    ///
    /// Returns `None` for the system account and for any username that is not
    /// exactly the canonical rendering of a positive id. `"007"` parses to 7
    /// but is a different forum account from `"7"`, so it stays unmanaged.
    #[must_use]
    pub fn to_member_id(&self) -> Option<MemberId> {
        if self.is_system() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let member = self.0.parse::<u64>().ok().and_then(MemberId::new)?;
        (member.to_forum_username() == *self).then_some(member)
    }
}

impl fmt::Display for ForumUsername {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<MemberId> for ForumUsername {
    fn from(id: MemberId) -> Self {
        id.to_forum_username()
    }
}

/// Forum topic id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicId(u64);

impl TopicId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// True only for the reserved system account.
#[must_use]
pub fn is_system_account(username: &str) -> bool {
    username == SYSTEM_USERNAME
}

/// Forum usernames after passing the system-account filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedUsers {
    /// Usernames that map to roster members.
    pub members: BTreeSet<MemberId>,
    /// Usernames the roster does not manage (never touched by a sync).
    pub unmanaged: Vec<ForumUsername>,
}

/// Normalize raw forum usernames at the boundary where they enter the core.
///
/// The system account is dropped; every other name is classified as a
/// managed member or an unmanaged account.
pub fn normalize_usernames<I>(usernames: I) -> NormalizedUsers
where
    I: IntoIterator<Item = ForumUsername>,
{
    let mut normalized = NormalizedUsers::default();
    for username in usernames {
        if username.is_system() {
            continue;
        }
        match username.to_member_id() {
            Some(member) => {
                normalized.members.insert(member);
            }
            None => normalized.unmanaged.push(username),
        }
    }
    normalized
}
