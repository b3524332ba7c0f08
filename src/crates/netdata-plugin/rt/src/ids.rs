//! Dimension identifiers for services and accounts.

/// Replace the separators of an address (`.`, `:` and `/`) with `_`.
pub fn sanitize(part: &str) -> String {
    part.replace(['.', ':', '/'], "_")
}

/// Identifier of a service within a namespace: `<ns>.<service>[.<volume>]`.
///
/// Separators in the service address are replaced so that `10.0.0.1:6000`
/// becomes `10_0_0_1_6000`. The volume is appended unchanged.
pub fn sid(service: &str, ns: &str, volume: Option<&str>) -> String {
    match volume.filter(|v| !v.is_empty()) {
        Some(volume) => format!("{}.{}.{}", ns, sanitize(service), volume),
        None => format!("{}.{}", ns, sanitize(service)),
    }
}

/// Identifier of an account, or of one container within it:
/// `<ns>.<account>[.<container>]`.
pub fn account_id(ns: &str, account: &str, container: Option<&str>) -> String {
    match container.filter(|c| !c.is_empty()) {
        Some(container) => format!("{}.{}.{}", ns, sanitize(account), sanitize(container)),
        None => format!("{}.{}", ns, sanitize(account)),
    }
}
