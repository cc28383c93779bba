//! Admin console commands for the granted flag.
//!
//! | command     | privilege | effect                                       |
//! |-------------|-----------|----------------------------------------------|
//! | `set_given` | `Debug`   | marks the caller's own reward as granted     |
//! | `is_given`  | `Debug`   | prints the caller's cached granted flag      |
//! | `make_wipe` | `Host`    | clears the granted flag for every player     |
//!
//! Privilege checks belong to the console front end; this module only
//! declares what each command needs.

use std::fmt;
use std::str::FromStr;

use sponsors_cache::{PendingWrite, SponsorsManager};
use sponsors_protocol::UserId;
use sponsors_remote::EntitlementService;

use crate::SponsorsError;

/// Admin privilege a command requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdminPrivilege {
    Debug,
    Host,
}

/// A console command operating on the granted flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminCommand {
    SetGiven,
    IsGiven,
    MakeWipe,
}

/// What a command produced.
#[derive(Debug, Default)]
pub struct AdminReply {
    /// Text to print on the caller's console, if any.
    pub message: Option<String>,
    /// The remote write the command queued, if any.
    pub write: Option<PendingWrite>,
}

impl AdminCommand {
    pub const ALL: [AdminCommand; 3] = [Self::SetGiven, Self::IsGiven, Self::MakeWipe];

    /// The console name of the command.
    pub fn name(self) -> &'static str {
        match self {
            Self::SetGiven => "set_given",
            Self::IsGiven => "is_given",
            Self::MakeWipe => "make_wipe",
        }
    }

    pub fn required_privilege(self) -> AdminPrivilege {
        match self {
            Self::SetGiven | Self::IsGiven => AdminPrivilege::Debug,
            Self::MakeWipe => AdminPrivilege::Host,
        }
    }

    /// Runs the command on behalf of `actor`.
    ///
    /// `actor` is `None` when the command comes from the server console
    /// rather than a connected player. `set_given` and `is_given` act on
    /// the caller's own record and do nothing without one.
    pub fn execute<S: EntitlementService>(
        self,
        manager: &SponsorsManager<S>,
        actor: Option<UserId>,
    ) -> AdminReply {
        match self {
            Self::SetGiven => {
                let Some(user_id) = actor else {
                    return AdminReply::default();
                };
                AdminReply {
                    message: None,
                    write: manager.grant(user_id),
                }
            }
            Self::IsGiven => {
                let message = actor
                    .and_then(|user_id| manager.check_granted_status(user_id))
                    .map(|granted| {
                        let status = if granted { "GIVEN" } else { "NONGIVEN" };
                        format!("Your given status is: {status}")
                    });
                AdminReply {
                    message,
                    write: None,
                }
            }
            Self::MakeWipe => {
                let receipt = manager.wipe_all_granted();
                tracing::info!(
                    actor = ?actor,
                    reset = receipt.reset,
                    "granted status wipe requested"
                );
                AdminReply {
                    message: Some(format!(
                        "Wiped given status for {} cached sponsor(s)",
                        receipt.reset
                    )),
                    write: Some(receipt.write),
                }
            }
        }
    }
}

impl fmt::Display for AdminCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AdminCommand {
    type Err = SponsorsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.name() == s)
            .ok_or_else(|| SponsorsError::UnknownCommand(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use sponsors_protocol::{
        ConfigReader, LORD_SPONSOR_ROLE, RoleId, RoleMapping, SponsorsConfig,
    };
    use sponsors_remote::RemoteError;

    use super::*;

    /// Everyone is a lord sponsor; nothing is granted; writes succeed.
    struct AllLords;

    impl EntitlementService for AllLords {
        async fn fetch_roles(&self, _: UserId) -> Result<Vec<RoleId>, RemoteError> {
            Ok(vec![RoleId::from(LORD_SPONSOR_ROLE)])
        }

        async fn fetch_granted(&self, _: UserId) -> Result<bool, RemoteError> {
            Ok(false)
        }

        async fn set_granted(&self, _: UserId, _: bool) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn wipe_granted(&self) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    fn manager() -> SponsorsManager<AllLords> {
        let config = SponsorsConfig {
            enabled: true,
            ..SponsorsConfig::default()
        };
        SponsorsManager::new(AllLords, ConfigReader::fixed(config), RoleMapping::builtin())
    }

    async fn sponsor(mgr: &SponsorsManager<AllLords>) -> UserId {
        let user = UserId::new_random();
        mgr.on_player_verified(user).await;
        user
    }

    // =====================================================================
    // Parsing
    // =====================================================================

    #[test]
    fn test_from_str_known_names_parse() {
        assert_eq!("set_given".parse::<AdminCommand>().unwrap(), AdminCommand::SetGiven);
        assert_eq!("is_given".parse::<AdminCommand>().unwrap(), AdminCommand::IsGiven);
        assert_eq!("make_wipe".parse::<AdminCommand>().unwrap(), AdminCommand::MakeWipe);
    }

    #[test]
    fn test_from_str_unknown_name_returns_error() {
        let err = "give_all".parse::<AdminCommand>().unwrap_err();
        assert!(matches!(err, SponsorsError::UnknownCommand(ref name) if name == "give_all"));
    }

    #[test]
    fn test_display_roundtrips_through_from_str() {
        for cmd in AdminCommand::ALL {
            assert_eq!(cmd.to_string().parse::<AdminCommand>().unwrap(), cmd);
        }
    }

    #[test]
    fn test_required_privilege_wipe_needs_host() {
        assert_eq!(AdminCommand::SetGiven.required_privilege(), AdminPrivilege::Debug);
        assert_eq!(AdminCommand::IsGiven.required_privilege(), AdminPrivilege::Debug);
        assert_eq!(AdminCommand::MakeWipe.required_privilege(), AdminPrivilege::Host);
        assert!(AdminPrivilege::Host > AdminPrivilege::Debug);
    }

    // =====================================================================
    // execute()
    // =====================================================================

    #[tokio::test]
    async fn test_execute_set_given_marks_caller_granted() {
        let mgr = manager();
        let user = sponsor(&mgr).await;

        let reply = AdminCommand::SetGiven.execute(&mgr, Some(user));

        assert!(reply.message.is_none());
        reply.write.expect("write queued").outcome().await.unwrap();
        assert_eq!(mgr.check_granted_status(user), Some(true));
    }

    #[tokio::test]
    async fn test_execute_set_given_without_actor_does_nothing() {
        let mgr = manager();
        let user = sponsor(&mgr).await;

        let reply = AdminCommand::SetGiven.execute(&mgr, None);

        assert!(reply.write.is_none());
        assert_eq!(mgr.check_granted_status(user), Some(false));
    }

    #[tokio::test]
    async fn test_execute_set_given_without_record_does_nothing() {
        let mgr = manager();

        let reply = AdminCommand::SetGiven.execute(&mgr, Some(UserId::new_random()));

        assert!(reply.write.is_none());
        assert!(reply.message.is_none());
    }

    #[tokio::test]
    async fn test_execute_is_given_reports_status() {
        let mgr = manager();
        let user = sponsor(&mgr).await;

        let before = AdminCommand::IsGiven.execute(&mgr, Some(user));
        let _ = AdminCommand::SetGiven.execute(&mgr, Some(user));
        let after = AdminCommand::IsGiven.execute(&mgr, Some(user));

        assert_eq!(before.message.as_deref(), Some("Your given status is: NONGIVEN"));
        assert_eq!(after.message.as_deref(), Some("Your given status is: GIVEN"));
    }

    #[tokio::test]
    async fn test_execute_is_given_without_record_is_silent() {
        let mgr = manager();

        let reply = AdminCommand::IsGiven.execute(&mgr, Some(UserId::new_random()));

        assert!(reply.message.is_none());
        assert!(reply.write.is_none());
    }

    #[tokio::test]
    async fn test_execute_make_wipe_resets_everyone() {
        let mgr = manager();
        let a = sponsor(&mgr).await;
        let b = sponsor(&mgr).await;
        let _ = AdminCommand::SetGiven.execute(&mgr, Some(a));
        let _ = AdminCommand::SetGiven.execute(&mgr, Some(b));

        let reply = AdminCommand::MakeWipe.execute(&mgr, None);

        assert_eq!(
            reply.message.as_deref(),
            Some("Wiped given status for 2 cached sponsor(s)")
        );
        reply.write.expect("wipe queued").outcome().await.unwrap();
        assert_eq!(mgr.check_granted_status(a), Some(false));
        assert_eq!(mgr.check_granted_status(b), Some(false));
    }
}
