//! Permission gate
//!
//! One pure decision function over both requirement tiers: platform-native
//! permission bits and application-defined custom permissions stored on the
//! guild profile. Recomputed on every call — guild profiles mutate, so no
//! decision is ever cached.

use std::collections::HashSet;
use tracing::debug;

use super::native;
use crate::db::schemas::GuildProfileDoc;
use crate::platform::Actor;

/// Authorization decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Decide whether `actor` satisfies the given requirements.
///
/// Order of evaluation:
/// 1. A developer/override identity is always allowed.
/// 2. No requirements at all: allowed.
/// 3. Native: the actor's permission bits must be a superset of
///    `required_native`; bits that cannot be evaluated deny.
/// 4. Custom: each required name must resolve to a grant on the guild
///    profile that the actor holds (AND across requirements). Custom
///    permissions are guild-scoped — without a guild profile they deny.
pub fn authorize(
    actor: &Actor,
    required_native: u64,
    required_custom: &[String],
    guild: Option<&GuildProfileDoc>,
    developers: &HashSet<String>,
) -> Decision {
    if developers.contains(&actor.user_id) {
        return Decision::Allow;
    }

    if required_native == 0 && required_custom.is_empty() {
        return Decision::Allow;
    }

    if required_native != 0 {
        let Some(bits) = actor.native_permissions else {
            debug!(actor = %actor.user_id, "Actor permissions not evaluable, denying");
            return Decision::Deny;
        };
        if !native::contains_all(bits, required_native) {
            return Decision::Deny;
        }
    }

    if !required_custom.is_empty() {
        let Some(guild) = guild else {
            debug!(actor = %actor.user_id, "Custom requirements without guild context, denying");
            return Decision::Deny;
        };
        for name in required_custom {
            let held = guild.grant(name).is_some_and(|grant| grant.holds(actor));
            if !held {
                return Decision::Deny;
            }
        }
    }

    Decision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::PermissionGrant;

    fn actor(user: &str, bits: Option<u64>, roles: &[&str]) -> Actor {
        Actor {
            user_id: user.into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            native_permissions: bits,
        }
    }

    fn guild_with_grant(permission: &str, users: &[&str], roles: &[&str]) -> GuildProfileDoc {
        let mut guild = GuildProfileDoc::new("g1");
        guild.custom_permissions.insert(
            permission.to_string(),
            PermissionGrant {
                users: users.iter().map(|u| u.to_string()).collect(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
        );
        guild
    }

    fn no_devs() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn developer_bypasses_everything() {
        let devs: HashSet<String> = ["dev-1".to_string()].into();
        // No evaluable bits, no guild context, both tiers required.
        let decision = authorize(
            &actor("dev-1", None, &[]),
            native::ADMINISTRATOR,
            &["manage-points".into()],
            None,
            &devs,
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn empty_requirements_allow() {
        let decision = authorize(&actor("u1", None, &[]), 0, &[], None, &no_devs());
        assert!(decision.is_allowed());
    }

    #[test]
    fn native_superset_required() {
        let a = actor("u1", Some(native::MANAGE_GUILD | native::KICK_MEMBERS), &[]);
        assert!(authorize(&a, native::MANAGE_GUILD, &[], None, &no_devs()).is_allowed());
        assert!(!authorize(&a, native::BAN_MEMBERS, &[], None, &no_devs()).is_allowed());
    }

    #[test]
    fn unevaluable_bits_deny() {
        let a = actor("u1", None, &[]);
        assert!(!authorize(&a, native::MANAGE_GUILD, &[], None, &no_devs()).is_allowed());
    }

    #[test]
    fn custom_requires_guild_context() {
        let a = actor("u1", Some(0), &[]);
        let decision = authorize(&a, 0, &["manage-points".into()], None, &no_devs());
        assert!(!decision.is_allowed());
    }

    #[test]
    fn custom_grant_by_user_and_role() {
        let guild = guild_with_grant("manage-points", &["u1"], &["mods"]);

        let direct = actor("u1", Some(0), &[]);
        assert!(
            authorize(&direct, 0, &["manage-points".into()], Some(&guild), &no_devs())
                .is_allowed()
        );

        let via_role = actor("u2", Some(0), &["mods"]);
        assert!(
            authorize(&via_role, 0, &["manage-points".into()], Some(&guild), &no_devs())
                .is_allowed()
        );

        let neither = actor("u3", Some(0), &["vip"]);
        assert!(
            !authorize(&neither, 0, &["manage-points".into()], Some(&guild), &no_devs())
                .is_allowed()
        );
    }

    #[test]
    fn custom_requirements_are_anded() {
        let mut guild = guild_with_grant("manage-points", &["u1"], &[]);
        guild.custom_permissions.insert(
            "manage-ranks".into(),
            PermissionGrant {
                users: vec!["u2".into()],
                roles: vec![],
            },
        );

        let a = actor("u1", Some(0), &[]);
        let both = vec!["manage-points".to_string(), "manage-ranks".to_string()];
        assert!(!authorize(&a, 0, &both, Some(&guild), &no_devs()).is_allowed());

        let one = vec!["manage-points".to_string()];
        assert!(authorize(&a, 0, &one, Some(&guild), &no_devs()).is_allowed());
    }

    #[test]
    fn unconfigured_custom_permission_denies() {
        let guild = GuildProfileDoc::new("g1");
        let a = actor("u1", Some(u64::MAX), &[]);
        assert!(
            !authorize(&a, 0, &["manage-points".into()], Some(&guild), &no_devs()).is_allowed()
        );
    }

    #[test]
    fn both_tiers_must_pass() {
        let guild = guild_with_grant("manage-points", &["u1"], &[]);

        // Custom grant held, native bit missing.
        let a = actor("u1", Some(0), &[]);
        assert!(!authorize(
            &a,
            native::MANAGE_GUILD,
            &["manage-points".into()],
            Some(&guild),
            &no_devs()
        )
        .is_allowed());

        // Native bit held, custom grant missing.
        let b = actor("u2", Some(native::MANAGE_GUILD), &[]);
        assert!(!authorize(
            &b,
            native::MANAGE_GUILD,
            &["manage-points".into()],
            Some(&guild),
            &no_devs()
        )
        .is_allowed());
    }

    #[test]
    fn pure_function_of_inputs() {
        let guild = guild_with_grant("manage-points", &["u1"], &[]);
        let a = actor("u1", Some(native::MANAGE_GUILD), &[]);
        let required = vec!["manage-points".to_string()];

        let first = authorize(&a, native::MANAGE_GUILD, &required, Some(&guild), &no_devs());
        let second = authorize(&a, native::MANAGE_GUILD, &required, Some(&guild), &no_devs());
        assert_eq!(first, second);
    }
}
