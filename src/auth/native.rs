//! Native platform permission bits
//!
//! The platform resolves an actor's permission integer and ships it with
//! the inbound interaction; the gate only compares bit sets. The named
//! constants cover the permissions handlers declare in practice.

/// Kick members
pub const KICK_MEMBERS: u64 = 1 << 1;
/// Ban members
pub const BAN_MEMBERS: u64 = 1 << 2;
/// Administrator
pub const ADMINISTRATOR: u64 = 1 << 3;
/// Manage channels
pub const MANAGE_CHANNELS: u64 = 1 << 4;
/// Manage the guild
pub const MANAGE_GUILD: u64 = 1 << 5;
/// Manage messages
pub const MANAGE_MESSAGES: u64 = 1 << 13;
/// Manage roles
pub const MANAGE_ROLES: u64 = 1 << 28;
/// Time out members
pub const MODERATE_MEMBERS: u64 = 1 << 40;

/// Whether `bits` is a superset of `required`.
pub fn contains_all(bits: u64, required: u64) -> bool {
    bits & required == required
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superset_check() {
        assert!(contains_all(MANAGE_GUILD | KICK_MEMBERS, MANAGE_GUILD));
        assert!(contains_all(
            MANAGE_GUILD | KICK_MEMBERS,
            MANAGE_GUILD | KICK_MEMBERS
        ));
        assert!(!contains_all(KICK_MEMBERS, MANAGE_GUILD));
        assert!(contains_all(0, 0));
    }
}
