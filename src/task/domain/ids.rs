//! Identifier newtypes and caller identity for the task domain.

use serde::{Deserialize, Serialize};

/// Declares a UUID-backed entity identifier newtype.
///
/// Each identifier gets `new`/`from_uuid`/`into_inner`, `Default`,
/// `AsRef<Uuid>`, and `Display` so adapters and log lines can use them
/// interchangeably without unwrapping.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(::uuid::Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: ::uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn into_inner(self) -> ::uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<::uuid::Uuid> for $name {
            fn as_ref(&self) -> &::uuid::Uuid {
                &self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

pub(crate) use entity_id;

entity_id!(
    /// Unique identifier for a board task.
    TaskId
);

entity_id!(
    /// Unique identifier for a project.
    ProjectId
);

entity_id!(
    /// Unique identifier for an organization.
    OrgId
);

entity_id!(
    /// Unique identifier for a user account.
    UserId
);

entity_id!(
    /// Unique identifier for a task type.
    TaskTypeId
);

entity_id!(
    /// Unique identifier for a card, the grouping entity tasks may belong
    /// to. Opaque to the lifecycle engine beyond equality and inheritance.
    CardId
);

entity_id!(
    /// Unique identifier for a capability maintained outside this core.
    CapabilityId
);

entity_id!(
    /// Unique identifier for a lifecycle audit event.
    EventId
);

entity_id!(
    /// Unique identifier for a work session.
    SessionId
);

/// Authenticated caller identity supplied by the external HTTP layer.
///
/// The engine never resolves identities itself; it trusts the org and user
/// the caller was authenticated as and stamps them into events, sessions,
/// and created tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Organization the caller is acting within.
    pub org_id: OrgId,
    /// User performing the operation.
    pub user_id: UserId,
}

impl Actor {
    /// Creates an actor from an organization and user pair.
    #[must_use]
    pub const fn new(org_id: OrgId, user_id: UserId) -> Self {
        Self { org_id, user_id }
    }
}
