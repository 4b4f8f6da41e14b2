//! Principal permissions on a single namespace.
//!
//! Callers address principals by subject descriptor; ACLs store identity
//! descriptors. Every path resolves the former into the latter through the
//! identity service first.

use super::namespace::{ActionCatalog, NamespaceCatalog};
use super::{PermissionType, PrincipalPermission, SetPrincipalPermission};
use crate::client::Clients;
use azdo_api::models::identity::Identity;
use azdo_api::models::security::{AccessControlEntriesUpdate, AccessControlEntry, AccessControlList};
use azdo_api::{IdentityClient, SecurityClient};
use declarative::{Context, Error, Result, ResultExt};
use log::{debug, trace};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;

/// Set `bit` of `ace` to `permission`, keeping allow and deny disjoint.
pub fn apply_permission(ace: &mut AccessControlEntry, bit: i64, permission: PermissionType) {
    match permission {
        PermissionType::Allow => {
            ace.deny &= !bit;
            ace.allow |= bit;
        }
        PermissionType::Deny => {
            ace.allow &= !bit;
            ace.deny |= bit;
        }
        PermissionType::NotSet => {
            ace.allow &= !bit;
            ace.deny &= !bit;
        }
    }
}

/// Apply every declared permission to `ace` by action name.
pub fn apply_permissions(
    ace: &mut AccessControlEntry,
    catalog: &ActionCatalog,
    permissions: &BTreeMap<String, PermissionType>,
) -> Result<()> {
    for (name, permission) in permissions {
        let bit = catalog
            .bit(name)
            .ok_or_else(|| Error::attribute("permissions", format!("Invalid permission [{name}]")))?;
        apply_permission(ace, bit, *permission);
    }
    Ok(())
}

/// ACL operations scoped to one security namespace.
pub struct AclEngine {
    identity: Arc<dyn IdentityClient>,
    security: Arc<dyn SecurityClient>,
    namespaces: Arc<NamespaceCatalog>,
    namespace_id: Uuid,
}

impl AclEngine {
    pub fn new(clients: &Clients, namespace_id: Uuid) -> Self {
        Self {
            identity: clients.identity.clone(),
            security: clients.security.clone(),
            namespaces: clients.namespaces.clone(),
            namespace_id,
        }
    }

    pub fn namespace_id(&self) -> Uuid {
        self.namespace_id
    }

    pub fn actions(&self, ctx: &Context) -> Result<Arc<ActionCatalog>> {
        self.namespaces.actions(ctx, self.namespace_id)
    }

    /// Resolve subject descriptors to identities, one record per subject.
    pub fn resolve_identities(&self, ctx: &Context, subjects: &[String]) -> Result<Vec<Identity>> {
        if subjects.is_empty() {
            return Err(Error::input("principal is nil or empty"));
        }
        let identities = self
            .identity
            .read_identities_by_subject(ctx, subjects)
            .context("Read identities")?;
        if identities.len() != subjects.len() {
            return Err(Error::internal(format!(
                "Failed to load identity information for defined principals [{}]",
                subjects.join(",")
            )));
        }
        Ok(identities)
    }

    /// The ACL of `token`, restricted to `descriptors` when not empty.
    pub fn access_control_list(
        &self,
        ctx: &Context,
        token: &str,
        descriptors: &[String],
    ) -> Result<Option<AccessControlList>> {
        let mut acls = self
            .security
            .query_access_control_lists(ctx, self.namespace_id, token, descriptors, true)
            .context("Query access control lists")?;
        match acls.len() {
            0 => Ok(None),
            1 => Ok(acls.pop()),
            _ => Err(Error::internal(format!(
                "Failed to load current ACL for token [{token}]. Result set contains more than one ACL"
            ))),
        }
    }

    /// Permissions of `subjects` on `token` over the full action catalog.
    ///
    /// `None` when the token has no ACL yet. Principals without an entry
    /// in the ACL are omitted.
    pub fn get_principal_permissions(
        &self,
        ctx: &Context,
        token: &str,
        subjects: &[String],
    ) -> Result<Option<Vec<PrincipalPermission>>> {
        let catalog = self.actions(ctx)?;
        let identities = self.resolve_identities(ctx, subjects)?;
        let descriptors = identities
            .iter()
            .map(|identity| identity_descriptor(identity).map(str::to_string))
            .collect::<Result<Vec<_>>>()?;

        let Some(acl) = self.access_control_list(ctx, token, &descriptors)? else {
            debug!("No ACL for token {token} in namespace {}", self.namespace_id);
            return Ok(None);
        };

        let by_descriptor: HashMap<&str, &Identity> = identities
            .iter()
            .filter_map(|identity| identity.descriptor.as_deref().map(|d| (d, identity)))
            .collect();

        let mut result = Vec::with_capacity(acl.aces_dictionary.len());
        for (descriptor, ace) in &acl.aces_dictionary {
            let identity = by_descriptor.get(descriptor.as_str()).ok_or_else(|| {
                Error::internal(format!("identity map does not contain an item with key [{descriptor}]"))
            })?;
            let subject = identity.subject_descriptor.clone().ok_or_else(|| {
                Error::internal(format!("Identity {descriptor} does not contain a subject descriptor value"))
            })?;
            let permissions = catalog
                .iter()
                .map(|(name, bit)| (name.to_string(), PermissionType::from_bits(ace.allow, ace.deny, bit)))
                .collect();
            result.push(PrincipalPermission {
                subject_descriptor: subject,
                permissions,
            });
        }
        Ok(Some(result))
    }

    /// Write one ACE per principal, merging unless the entry asks to replace.
    ///
    /// Entries for the same subject collapse to the last one.
    pub fn set_principal_permissions(
        &self,
        ctx: &Context,
        token: &str,
        permissions: &[SetPrincipalPermission],
    ) -> Result<()> {
        if permissions.is_empty() {
            return Ok(());
        }

        let mut by_subject: BTreeMap<&str, &SetPrincipalPermission> = BTreeMap::new();
        for entry in permissions {
            by_subject.insert(entry.principal_permission.subject_descriptor.as_str(), entry);
        }
        let subjects: Vec<String> = by_subject.keys().map(|s| s.to_string()).collect();

        let identities = self.resolve_identities(ctx, &subjects)?;
        let by_subject_descriptor: HashMap<&str, &Identity> = identities
            .iter()
            .filter_map(|identity| identity.subject_descriptor.as_deref().map(|s| (s, identity)))
            .collect();
        let descriptors = identities
            .iter()
            .map(|identity| identity_descriptor(identity).map(str::to_string))
            .collect::<Result<Vec<_>>>()?;

        // A token that has never carried an ACE has no ACL yet.
        let acl = self.access_control_list(ctx, token, &descriptors)?.unwrap_or_default();
        let catalog = self.actions(ctx)?;

        for (subject, entry) in by_subject {
            let identity = by_subject_descriptor.get(subject).ok_or_else(|| {
                Error::internal(format!("Unable to resolve id descriptor for principal [{subject}]"))
            })?;
            let descriptor = identity_descriptor(identity)?;

            let mut ace = match acl.aces_dictionary.get(descriptor) {
                Some(existing) => {
                    trace!("Updating ACE for descriptor [{descriptor}]");
                    existing.clone()
                }
                None => {
                    trace!("Creating new ACE for subject [{subject}]");
                    AccessControlEntry {
                        descriptor: descriptor.to_string(),
                        ..AccessControlEntry::default()
                    }
                }
            };
            apply_permissions(&mut ace, &catalog, &entry.principal_permission.permissions)?;

            let update = AccessControlEntriesUpdate {
                token: token.to_string(),
                merge: !entry.replace,
                access_control_entries: vec![ace],
            };
            debug!(
                "Set ACE for {subject} on token {token} (namespace {}, merge {})",
                self.namespace_id, update.merge
            );
            self.security
                .set_access_control_entries(ctx, self.namespace_id, &update)
                .context("Set access control entries")?;
        }
        Ok(())
    }

    /// Remove the ACEs of `subjects` from `token`.
    ///
    /// Succeeds without a call when the token has no ACL.
    pub fn remove_principal_permissions(&self, ctx: &Context, token: &str, subjects: &[String]) -> Result<()> {
        let identities = self.resolve_identities(ctx, subjects)?;
        let Some(acl) = self.access_control_list(ctx, token, &[])? else {
            return Ok(());
        };

        let descriptors: Vec<String> = identities
            .iter()
            .filter_map(|identity| identity.descriptor.clone())
            .filter(|descriptor| acl.aces_dictionary.contains_key(descriptor))
            .collect();
        if descriptors.is_empty() {
            return Ok(());
        }

        trace!("Removing the following principals from the ACL {}", descriptors.join(","));
        let removed = self
            .security
            .remove_access_control_entries(ctx, self.namespace_id, token, &descriptors)
            .context("Remove access control entries")?;
        if !removed {
            return Err(Error::internal(format!(
                "Failed to remove ACL entries for principals {}",
                descriptors.join(",")
            )));
        }
        Ok(())
    }
}

fn identity_descriptor(identity: &Identity) -> Result<&str> {
    identity.descriptor.as_deref().ok_or_else(|| {
        Error::internal(format!(
            "identity descriptor is nil for subject {}",
            identity.subject_descriptor.as_deref().unwrap_or("<unknown>")
        ))
    })
}
