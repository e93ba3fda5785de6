//! Service identity and the hints persisted on it.

use std::collections::BTreeMap;

/// User-specified load balancer; highest priority.
pub const ANNOTATION_LOAD_BALANCER_ID: &str = "service.beta.kubernetes.io/cce-load-balancer-id";
/// Written after a successful creation.
pub const ANNOTATION_AUTO_ADD_ID: &str = "service.beta.kubernetes.io/cce-auto-add-loadbalancer-id";
/// Identity scheme used by older clusters.
pub const ANNOTATION_EXIST_ID: &str = "service.beta.kubernetes.io/cce-load-balancer-exist-id";
pub const ANNOTATION_ALLOCATE_VIP: &str = "service.beta.kubernetes.io/cce-load-balancer-allocate-vip";
/// Marks a load balancer that must survive service deletion.
pub const ANNOTATION_RESERVE_LB: &str = "service.beta.kubernetes.io/cce-load-balancer-reserve-lb";

/// Provider limit on load-balancer names.
pub const MAX_NAME_LEN: usize = 65;

/// Identity hints stored alongside a service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceIdentityHints {
    pub explicit_load_balancer_id: Option<String>,
    pub auto_assigned_id: Option<String>,
    pub legacy_reserved_id: Option<String>,
    pub allocate_virtual_ip: bool,
    /// Never auto-delete the load balancer when the service goes away.
    pub reserve: bool,
}

impl ServiceIdentityHints {
    /// Read hints from a service's annotations. Empty values count as unset.
    pub fn from_annotations(annotations: &BTreeMap<String, String>) -> Self {
        let id = |key: &str| {
            annotations
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let flag = |key: &str| annotations.get(key).is_some_and(|v| v.trim() == "true");

        Self {
            explicit_load_balancer_id: id(ANNOTATION_LOAD_BALANCER_ID),
            auto_assigned_id: id(ANNOTATION_AUTO_ADD_ID),
            legacy_reserved_id: id(ANNOTATION_EXIST_ID),
            allocate_virtual_ip: flag(ANNOTATION_ALLOCATE_VIP),
            reserve: flag(ANNOTATION_RESERVE_LB),
        }
    }

    /// Write identity hints back. Unset ids leave existing annotations alone.
    pub fn write_annotations(&self, annotations: &mut BTreeMap<String, String>) {
        let pairs = [
            (ANNOTATION_LOAD_BALANCER_ID, &self.explicit_load_balancer_id),
            (ANNOTATION_AUTO_ADD_ID, &self.auto_assigned_id),
            (ANNOTATION_EXIST_ID, &self.legacy_reserved_id),
        ];
        for (key, value) in pairs {
            if let Some(v) = value {
                annotations.insert(key.to_string(), v.clone());
            }
        }
        if self.reserve {
            annotations.insert(ANNOTATION_RESERVE_LB.to_string(), "true".to_string());
        }
    }

    /// Record a newly created load balancer under both the primary and the
    /// compatibility hint. Both are set together or not at all.
    pub fn record_assigned(&mut self, load_balancer_id: &str) {
        let id = Some(load_balancer_id.to_string());
        *self = Self {
            auto_assigned_id: id.clone(),
            explicit_load_balancer_id: id,
            ..self.clone()
        };
    }
}

/// A service whose exposure this crate reconciles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceRef {
    pub namespace: String,
    pub name: String,
    pub hints: ServiceIdentityHints,
}

impl ServiceRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            hints: ServiceIdentityHints::default(),
        }
    }

    pub fn with_hints(mut self, hints: ServiceIdentityHints) -> Self {
        self.hints = hints;
        self
    }

    /// `namespace/name`, used in logs.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Deterministic load-balancer name for this service in `cluster_id`.
    pub fn load_balancer_name(&self, cluster_id: &str) -> String {
        let full = format!("{}/{}/{}", cluster_id, self.namespace, self.name);
        truncate_chars(full, MAX_NAME_LEN)
    }
}

fn truncate_chars(mut s: String, max: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
    s
}
