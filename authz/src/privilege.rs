//! Privileges checked by the mutation core.

use std::fmt;

/// A capability requested from the authorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Privilege {
    EntityRead,
    EntityCreate,
    EntityUpdate,
    EntityDelete,
    EntityAddClassification,
    EntityUpdateClassification,
    EntityRemoveClassification,
    EntityAddLabel,
    EntityRemoveLabel,
    EntityUpdateBusinessMetadata,
    AdminPurge,
}

impl Privilege {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privilege::EntityRead => "entity-read",
            Privilege::EntityCreate => "entity-create",
            Privilege::EntityUpdate => "entity-update",
            Privilege::EntityDelete => "entity-delete",
            Privilege::EntityAddClassification => "entity-add-classification",
            Privilege::EntityUpdateClassification => "entity-update-classification",
            Privilege::EntityRemoveClassification => "entity-remove-classification",
            Privilege::EntityAddLabel => "add-label",
            Privilege::EntityRemoveLabel => "remove-label",
            Privilege::EntityUpdateBusinessMetadata => "entity-update-business-metadata",
            Privilege::AdminPurge => "admin-purge",
        }
    }

    /// True for privileges checked through admin-directed requests.
    pub fn is_admin(&self) -> bool {
        matches!(self, Privilege::AdminPurge)
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
