wire_enum! {
    /// Caller role. The only axis along which record visibility is scoped.
    Role {
        Patient => "patient",
        Doctor => "doctor",
        Admin => "admin",
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Patient
    }
}

impl Role {
    /// Doctors and admins act on behalf of patients; patients only for themselves.
    #[must_use]
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Doctor | Role::Admin)
    }
}
