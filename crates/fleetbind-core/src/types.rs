//! Naming conventions shared across fleetbind crates.

/// JSON pointer rewritten by namespace-mapping overrides.
pub const NAMESPACE_PATH: &str = "/metadata/namespace";

/// Label domain used for namespace-mapping labels on namespaces.
pub const NAMESPACE_MAPPING_DOMAIN: &str = "mapping.fleetbind.io";

/// Suffix appended to a policy name to form its binding name.
pub const BINDING_SUFFIX: &str = "-binding";

/// Kind recorded in a binding's owner reference.
pub const SCHEDULE_POLICY_KIND: &str = "SchedulePolicy";

/// Composite key for namespaced records: `{namespace}/{name}`.
pub fn object_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Split a `{namespace}/{name}` key. Returns `None` for malformed keys.
pub fn split_object_key(key: &str) -> Option<(&str, &str)> {
    let (ns, name) = key.split_once('/')?;
    (!ns.is_empty() && !name.is_empty()).then_some((ns, name))
}

/// Deterministic binding name for a schedule policy.
pub fn binding_name(policy_name: &str) -> String {
    format!("{policy_name}{BINDING_SUFFIX}")
}

/// Label key on a namespace that maps `namespace` to another namespace
/// on the given cluster (or role, for role-based cluster sets).
///
/// `mapping.fleetbind.io/{target}.{namespace}` → mapped namespace name.
pub fn namespace_mapping_label(target: &str, namespace: &str) -> String {
    format!("{NAMESPACE_MAPPING_DOMAIN}/{target}.{namespace}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_roundtrips_through_split() {
        let key = object_key("prod", "web");
        assert_eq!(key, "prod/web");
        assert_eq!(split_object_key(&key), Some(("prod", "web")));
    }

    #[test]
    fn split_rejects_malformed_keys() {
        assert_eq!(split_object_key("no-slash"), None);
        assert_eq!(split_object_key("/name"), None);
        assert_eq!(split_object_key("ns/"), None);
    }

    #[test]
    fn binding_name_is_derived_from_policy() {
        assert_eq!(binding_name("web"), "web-binding");
    }

    #[test]
    fn mapping_label_includes_target_and_namespace() {
        assert_eq!(
            namespace_mapping_label("cluster1", "default"),
            "mapping.fleetbind.io/cluster1.default"
        );
    }
}
