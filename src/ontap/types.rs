//! Newtypes for ONTAP identifiers so volume and snapshot UUIDs cannot be
//! mixed up.

use std::fmt;

use uuid::Uuid;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub struct $name(Uuid);

        impl $name {
            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

uuid_newtype!(
    /// Identifier the API assigns to a volume; invalid once it is deleted.
    VolumeUuid
);
uuid_newtype!(
    /// Identifier the API assigns to a snapshot, scoped to its volume.
    SnapshotUuid
);
