//! Employee profile codes.

/// Designation given to the tenant's first administrator.
pub const EMPLOYEE_DESIGNATION: &str = "Administrator";

/// `{TENANT_CODE}-{PREFIX}-{SEQ:03}`, e.g. `ACME-B-001`.
pub fn employee_code(tenant_code: &str, plan_prefix: char, sequence: u32) -> String {
    format!(
        "{}-{}-{:03}",
        tenant_code.to_ascii_uppercase(),
        plan_prefix.to_ascii_uppercase(),
        sequence
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_admin_code() {
        assert_eq!(employee_code("ACME", 'B', 1), "ACME-B-001");
    }

    #[test]
    fn code_is_upper_cased_and_padded() {
        assert_eq!(employee_code("acme_co", 'c', 42), "ACME_CO-C-042");
    }
}
