//! Principal kinds and their storage bindings.
//!
//! Admin and user principals share one authentication algorithm but live in
//! separate tables. A [`Directory`] binds the table set for a kind once, so
//! the rest of the core is written against a single parameterized component
//! instead of mutating a shared service.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PrincipalKind {
    Admin,
    User,
}

impl PrincipalKind {
    pub(crate) fn directory(self) -> Directory {
        Directory { kind: self }
    }
}

/// Table bindings for one principal kind.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Directory {
    kind: PrincipalKind,
}

impl Directory {
    pub(crate) fn principals(&self) -> &'static str {
        match self.kind {
            PrincipalKind::Admin => "admin_principals",
            PrincipalKind::User => "user_principals",
        }
    }

    pub(crate) fn credentials(&self) -> &'static str {
        match self.kind {
            PrincipalKind::Admin => "admin_credentials",
            PrincipalKind::User => "user_credentials",
        }
    }

    pub(crate) fn login_attempts(&self) -> &'static str {
        match self.kind {
            PrincipalKind::Admin => "admin_login_attempts",
            PrincipalKind::User => "user_login_attempts",
        }
    }

    pub(crate) fn login_history(&self) -> &'static str {
        match self.kind {
            PrincipalKind::Admin => "admin_login_history",
            PrincipalKind::User => "user_login_history",
        }
    }

    pub(crate) fn flagged_ips(&self) -> &'static str {
        match self.kind {
            PrincipalKind::Admin => "admin_flagged_ips",
            PrincipalKind::User => "user_flagged_ips",
        }
    }

    pub(crate) fn one_time_passwords(&self) -> &'static str {
        match self.kind {
            PrincipalKind::Admin => "admin_one_time_passwords",
            PrincipalKind::User => "user_one_time_passwords",
        }
    }
}
