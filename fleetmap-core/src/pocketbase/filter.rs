use fleetmap_model::RoleSet;

use crate::normalize::fields;

/// Quote a string literal for a PocketBase filter expression.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Records whose primary or legacy role field equals any of `roles`.
///
/// Returns `None` for an empty set, which would otherwise match nothing.
pub fn role_filter(roles: &RoleSet) -> Option<String> {
    if roles.is_empty() {
        return None;
    }
    let clauses = roles
        .roles()
        .iter()
        .map(|role| {
            let value = quote(role);
            format!(
                "({} = {value} || {} = {value})",
                fields::ROLE,
                fields::LEGACY_ROLE
            )
        })
        .collect::<Vec<_>>();
    Some(format!("({})", clauses.join(" || ")))
}
