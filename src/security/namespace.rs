//! Well-known security namespaces and their action catalogs.
//!
//! The action catalog of a namespace is fetched the first time the
//! namespace is used and cached on the [`NamespaceCatalog`] for the
//! lifetime of the configured provider.

use azdo_api::SecurityClient;
use azdo_api::models::security::ActionDefinition;
use declarative::{Context, Error, Result, ResultExt};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// Namespaces the provider builds tokens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityNamespace {
    Analytics,
    AnalyticsViews,
    AuditLog,
    Build,
    BuildAdministration,
    Collection,
    Css,
    DistributedTask,
    GitRepositories,
    Iteration,
    Library,
    Process,
    Project,
    Server,
    ServiceEndpoints,
    ServiceHooks,
    Tagging,
    VersionControlPrivileges,
    WorkItemQueryFolders,
}

impl SecurityNamespace {
    pub const ALL: &'static [Self] = &[
        Self::Analytics,
        Self::AnalyticsViews,
        Self::AuditLog,
        Self::Build,
        Self::BuildAdministration,
        Self::Collection,
        Self::Css,
        Self::DistributedTask,
        Self::GitRepositories,
        Self::Iteration,
        Self::Library,
        Self::Process,
        Self::Project,
        Self::Server,
        Self::ServiceEndpoints,
        Self::ServiceHooks,
        Self::Tagging,
        Self::VersionControlPrivileges,
        Self::WorkItemQueryFolders,
    ];

    pub const fn id(self) -> Uuid {
        Uuid::from_u128(match self {
            Self::Analytics => 0x58450c49_b02d_465a_ab12_59ae512d6531,
            Self::AnalyticsViews => 0xd34d3680_dfe5_4cc6_a949_7d9c68f73cba,
            Self::AuditLog => 0xa6cc6381_a1ca_4b36_b3c1_4e65211e82b6,
            Self::Build => 0x33344d9c_fc72_4d6f_aba5_fa317101a7e9,
            Self::BuildAdministration => 0x302acaca_b667_436d_a946_87133492041c,
            Self::Collection => 0x3e65f728_f8bc_4ecd_8764_7e378b19bfa7,
            Self::Css => 0x83e28ad4_2d72_4ceb_97b0_c7726d5502c3,
            Self::DistributedTask => 0x101eae8c_1709_47f9_b228_0e476c35b3ba,
            Self::GitRepositories => 0x2e9eb7ed_3c0a_47d4_87c1_0ffdd275fd87,
            Self::Iteration => 0xbf7bfa03_b2b7_47db_8113_fa2e002cc5b1,
            Self::Library => 0xb7e84409_6553_448a_bbb2_af228e07cbeb,
            Self::Process => 0x2dab47f9_bd70_49ed_9bd5_8eb051e59c02,
            Self::Project => 0x52d39943_cb85_4d7f_8fa8_c6baac873819,
            Self::Server => 0x1f4179b3_6bac_4d01_b421_71ea09171400,
            Self::ServiceEndpoints => 0x49b48001_ca20_4adc_8111_5b60c903a50c,
            Self::ServiceHooks => 0xcb594ebe_87dd_4fc9_ac2c_6a10a4c92046,
            Self::Tagging => 0xbb50f182_8e5e_40b8_bc21_e8752a1e7ae2,
            Self::VersionControlPrivileges => 0x66312704_deb5_43f9_b51c_ab4ff5e351c3,
            Self::WorkItemQueryFolders => 0x71356614_aad7_4757_8f2c_0fb3bff6f680,
        })
    }

    /// Name the service reports for the namespace.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Analytics => "Analytics",
            Self::AnalyticsViews => "AnalyticsViews",
            Self::AuditLog => "AuditLog",
            Self::Build => "Build",
            Self::BuildAdministration => "BuildAdministration",
            Self::Collection => "Collection",
            Self::Css => "CSS",
            Self::DistributedTask => "DistributedTask",
            Self::GitRepositories => "Git Repositories",
            Self::Iteration => "Iteration",
            Self::Library => "Library",
            Self::Process => "Process",
            Self::Project => "Project",
            Self::Server => "Server",
            Self::ServiceEndpoints => "ServiceEndpoints",
            Self::ServiceHooks => "ServiceHooks",
            Self::Tagging => "Tagging",
            Self::VersionControlPrivileges => "VersionControlPrivileges",
            Self::WorkItemQueryFolders => "WorkItemQueryFolders",
        }
    }

    pub fn from_id(id: Uuid) -> Option<Self> {
        Self::ALL.iter().copied().find(|ns| ns.id() == id)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|ns| ns.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for SecurityNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Action definitions of one namespace, keyed by action name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCatalog {
    namespace_id: Uuid,
    actions: BTreeMap<String, ActionDefinition>,
}

impl ActionCatalog {
    pub fn new(namespace_id: Uuid, actions: Vec<ActionDefinition>) -> Self {
        Self {
            namespace_id,
            actions: actions.into_iter().map(|a| (a.name.clone(), a)).collect(),
        }
    }

    pub fn namespace_id(&self) -> Uuid {
        self.namespace_id
    }

    pub fn bit(&self, name: &str) -> Option<i64> {
        self.actions.get(name).map(|a| a.bit)
    }

    /// `(name, bit)` for every action.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.actions.iter().map(|(name, action)| (name.as_str(), action.bit))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Resolve permission keys to bits.
    ///
    /// A key is an action name, or a display name shared by no other
    /// action. Two keys resolving to the same bit are rejected.
    pub fn resolve_keys<'a, I>(&self, keys: I) -> Result<BTreeMap<String, i64>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut by_display: HashMap<&str, Vec<&str>> = HashMap::new();
        for action in self.actions.values() {
            if let Some(display) = action.display_name.as_deref().filter(|d| !d.is_empty()) {
                by_display.entry(display).or_default().push(action.name.as_str());
            }
        }

        let mut resolved = BTreeMap::new();
        let mut by_bit: BTreeMap<i64, Vec<&str>> = BTreeMap::new();
        for key in keys {
            let bit = match self.bit(key) {
                Some(bit) => bit,
                None => match by_display.get(key).map(Vec::as_slice) {
                    Some([name]) => self.bit(name).unwrap_or_default(),
                    Some(names) if names.len() > 1 => {
                        return Err(Error::attribute(
                            "permissions",
                            format!(
                                "permission key '{key}' is ambiguous - it matches DisplayName for multiple actions: {names:?}. Please use the action Name instead"
                            ),
                        ));
                    }
                    _ => {
                        return Err(Error::attribute(
                            "permissions",
                            format!("permission '{key}' not found in namespace {}", self.namespace_id),
                        ));
                    }
                },
            };
            by_bit.entry(bit).or_default().push(key);
            resolved.insert(key.to_string(), bit);
        }

        if let Some((bit, keys)) = by_bit.iter().find(|(_, keys)| keys.len() > 1) {
            return Err(Error::attribute(
                "permissions",
                format!(
                    "permission specified multiple times using different keys: {keys:?} (all refer to the same permission bit {bit})"
                ),
            ));
        }
        Ok(resolved)
    }
}

/// Process-wide cache of action catalogs, one entry per namespace.
pub struct NamespaceCatalog {
    client: Arc<dyn SecurityClient>,
    cache: RwLock<HashMap<Uuid, Arc<ActionCatalog>>>,
}

impl NamespaceCatalog {
    pub fn new(client: Arc<dyn SecurityClient>) -> Self {
        Self {
            client,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Action catalog of `namespace_id`, loading it on first use.
    pub fn actions(&self, ctx: &Context, namespace_id: Uuid) -> Result<Arc<ActionCatalog>> {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&namespace_id)
            .cloned();
        if let Some(catalog) = cached {
            return Ok(catalog);
        }

        log::debug!("Loading action definitions of security namespace {namespace_id}");
        let namespaces = self
            .client
            .query_security_namespaces(ctx, namespace_id)
            .context("Query security namespace")?;
        let actions = namespaces
            .into_iter()
            .find(|ns| ns.namespace_id == namespace_id)
            .map(|ns| ns.actions)
            .unwrap_or_default();
        if actions.is_empty() {
            return Err(Error::internal(format!(
                "Failed to load security namespace definition with id [{namespace_id}]"
            )));
        }

        let catalog = Arc::new(ActionCatalog::new(namespace_id, actions));
        // A concurrent loader may have won; both values are equal.
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace_id, Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Id of the namespace the service knows by `name`.
    pub fn find_by_name(&self, ctx: &Context, name: &str) -> Result<Uuid> {
        let namespaces = self
            .client
            .query_security_namespaces(ctx, Uuid::nil())
            .context("Query security namespaces")?;
        namespaces
            .into_iter()
            .find(|ns| ns.name == name)
            .map(|ns| ns.namespace_id)
            .ok_or_else(|| Error::input(format!("namespace with name '{name}' not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeDevOps, action};
    use std::time::Duration;

    fn ctx() -> Context {
        Context::background(Duration::from_secs(5))
    }

    fn catalog() -> ActionCatalog {
        let mut read = action("GenericRead", 1);
        read.display_name = Some("Read".to_string());
        let mut contribute = action("GenericContribute", 4);
        contribute.display_name = Some("Contribute".to_string());
        let mut manage_a = action("ManageA", 8);
        manage_a.display_name = Some("Manage".to_string());
        let mut manage_b = action("ManageB", 16);
        manage_b.display_name = Some("Manage".to_string());
        ActionCatalog::new(SecurityNamespace::GitRepositories.id(), vec![read, contribute, manage_a, manage_b])
    }

    #[test]
    fn test_namespace_ids_round_trip() {
        for ns in SecurityNamespace::ALL {
            assert_eq!(SecurityNamespace::from_id(ns.id()), Some(*ns));
            assert_eq!(SecurityNamespace::from_name(ns.name()), Some(*ns));
        }
        assert_eq!(
            SecurityNamespace::Project.id().to_string(),
            "52d39943-cb85-4d7f-8fa8-c6baac873819"
        );
    }

    #[test]
    fn test_resolve_keys_by_name_and_display_name() {
        let resolved = catalog().resolve_keys(["GenericRead", "Contribute"]).unwrap();
        assert_eq!(resolved["GenericRead"], 1);
        assert_eq!(resolved["Contribute"], 4);
    }

    #[test]
    fn test_resolve_keys_rejects_same_bit_twice() {
        let err = catalog().resolve_keys(["GenericRead", "Read"]).unwrap_err();
        assert!(err.to_string().contains("multiple times using different keys"));
    }

    #[test]
    fn test_resolve_keys_rejects_ambiguous_display_name() {
        let err = catalog().resolve_keys(["Manage"]).unwrap_err();
        assert!(err.to_string().contains("is ambiguous"));
    }

    #[test]
    fn test_resolve_keys_rejects_unknown() {
        let err = catalog().resolve_keys(["Delete"]).unwrap_err();
        assert!(err.to_string().contains("permission 'Delete' not found"));
    }

    #[test]
    fn test_catalog_is_loaded_once() {
        let fake = FakeDevOps::new();
        let ns = SecurityNamespace::Project.id();
        fake.add_namespace(ns, "Project", vec![action("GENERIC_READ", 1)]);
        let catalog = NamespaceCatalog::new(fake.clone());

        let first = catalog.actions(&ctx(), ns).unwrap();
        let second = catalog.actions(&ctx(), ns).unwrap();
        assert_eq!(first.bit("GENERIC_READ"), Some(1));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fake.calls("query_security_namespaces"), 1);
    }

    #[test]
    fn test_empty_catalog_is_fatal() {
        let fake = FakeDevOps::new();
        let ns = SecurityNamespace::Build.id();
        fake.add_namespace(ns, "Build", Vec::new());
        let err = NamespaceCatalog::new(fake).actions(&ctx(), ns).unwrap_err();
        assert!(err.to_string().contains("Failed to load security namespace definition"));
        assert_eq!(err.category(), declarative::ErrorCategory::Internal);
    }

    #[test]
    fn test_find_by_name() {
        let fake = FakeDevOps::new();
        fake.add_namespace(SecurityNamespace::Tagging.id(), "Tagging", vec![action("Enumerate", 1)]);
        let catalog = NamespaceCatalog::new(fake);
        assert_eq!(
            catalog.find_by_name(&ctx(), "Tagging").unwrap(),
            SecurityNamespace::Tagging.id()
        );
        let err = catalog.find_by_name(&ctx(), "Nope").unwrap_err();
        assert_eq!(err.to_string(), "namespace with name 'Nope' not found");
    }
}
