use std::{fmt, str::FromStr};

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Permission
///
/// The closed permission catalog. Route wiring names required permissions
/// through these variants, so a key that is not catalogued cannot be required
/// anywhere. Roles store the same keys as plain strings in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    Sudo,
    UsersRead,
    UsersWrite,
    RolesRead,
    RolesWrite,
    EventosRead,
    EventosWrite,
    SucursalesWrite,
    BodegasWrite,
}

impl Permission {
    pub const ALL: [Permission; 9] = [
        Permission::Sudo,
        Permission::UsersRead,
        Permission::UsersWrite,
        Permission::RolesRead,
        Permission::RolesWrite,
        Permission::EventosRead,
        Permission::EventosWrite,
        Permission::SucursalesWrite,
        Permission::BodegasWrite,
    ];

    /// Stable lowercase key, as stored in `permisos.clave`.
    pub const fn key(self) -> &'static str {
        match self {
            Permission::Sudo => "sudo",
            Permission::UsersRead => "users:read",
            Permission::UsersWrite => "users:write",
            Permission::RolesRead => "roles:read",
            Permission::RolesWrite => "roles:write",
            Permission::EventosRead => "eventos:read",
            Permission::EventosWrite => "eventos:write",
            Permission::SucursalesWrite => "sucursales:write",
            Permission::BodegasWrite => "bodegas:write",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown permission key '{0}'")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.key() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}
