//! Identity registry
//!
//! User and group creation and lookup. The free functions work on an
//! explicit [`Store`] value; [`RegistryService`] wraps them in a
//! load/mutate/save cycle against a repository.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::audit::{AuditEntry, AuditLogger};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Group, GroupId, Store, User, UserId};
use crate::storage::StoreRepository;

use super::record_audit;

/// Return the id of the user called `name`, creating the user if needed
///
/// Matching is exact and case-sensitive. The flag is `true` when a new user
/// was created.
pub fn upsert_user(store: &mut Store, name: &str) -> LedgerResult<(UserId, bool)> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation("User name cannot be empty".into()));
    }

    if let Some(existing) = store.find_user_by_name(name) {
        return Ok((existing.id.clone(), false));
    }

    let user = User::new(name);
    let user_id = user.id.clone();
    store.users.push(user);
    Ok((user_id, true))
}

/// Create a group with the given members and an empty balance partition
///
/// Repeated member ids are collapsed, keeping the first occurrence.
pub fn create_group(
    store: &mut Store,
    name: &str,
    member_ids: &[UserId],
    now: DateTime<Utc>,
) -> LedgerResult<GroupId> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation("Group name cannot be empty".into()));
    }
    for user_id in member_ids {
        store.require_user(user_id)?;
    }

    let mut members: Vec<UserId> = Vec::with_capacity(member_ids.len());
    for user_id in member_ids {
        if !members.contains(user_id) {
            members.push(user_id.clone());
        }
    }

    let group = Group::new(name, members);
    let group_id = group.id.clone();
    store.groups.push(group);
    store.balances.ensure_group(&group_id);
    store.balances.updated_at = Some(now);
    Ok(group_id)
}

/// Append a member to a group; returns `false` if they were already in it
pub fn add_group_member(
    store: &mut Store,
    group_id: &GroupId,
    user_id: &UserId,
) -> LedgerResult<bool> {
    store.require_user(user_id)?;
    let group = store
        .group_mut(group_id)
        .ok_or_else(|| LedgerError::unknown_group(group_id.as_str()))?;

    if group.has_member(user_id) {
        return Ok(false);
    }
    group.member_ids.push(user_id.clone());
    store.balances.ensure_group(group_id);
    Ok(true)
}

/// Resolve a user from an id or, failing that, a display name
pub fn resolve_user(store: &Store, identifier: &str) -> LedgerResult<UserId> {
    let as_id = UserId::from(identifier);
    if store.user(&as_id).is_some() {
        return Ok(as_id);
    }
    store
        .find_user_by_name(identifier)
        .map(|u| u.id.clone())
        .ok_or_else(|| LedgerError::unknown_user(identifier))
}

/// Resolve a group from an id or, failing that, a display name
pub fn resolve_group(store: &Store, identifier: &str) -> LedgerResult<GroupId> {
    let as_id = GroupId::from(identifier);
    if store.group(&as_id).is_some() {
        return Ok(as_id);
    }
    store
        .find_group_by_name(identifier)
        .map(|g| g.id.clone())
        .ok_or_else(|| LedgerError::unknown_group(identifier))
}

/// Service for managing users and groups in a stored ledger
pub struct RegistryService<'a, R: StoreRepository> {
    repo: &'a R,
    audit: Option<&'a AuditLogger>,
}

impl<'a, R: StoreRepository> RegistryService<'a, R> {
    /// Create a new registry service
    pub fn new(repo: &'a R) -> Self {
        Self { repo, audit: None }
    }

    /// Record additions in an audit log
    pub fn with_audit(mut self, audit: &'a AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Create a user or return the existing one with the same name
    pub fn upsert_user(&self, name: &str) -> LedgerResult<(UserId, bool)> {
        let mut store = self.repo.load()?;
        let (user_id, created) = upsert_user(&mut store, name)?;

        if created {
            self.repo.save(&store)?;
            info!(user_id = %user_id, name, "Registered user");
            if let Some(user) = store.user(&user_id) {
                record_audit(self.audit, AuditEntry::user_added(user));
            }
        }
        Ok((user_id, created))
    }

    /// Create a group from member ids
    pub fn create_group(&self, name: &str, member_ids: &[UserId]) -> LedgerResult<GroupId> {
        let mut store = self.repo.load()?;
        let group_id = create_group(&mut store, name, member_ids, Utc::now())?;
        self.repo.save(&store)?;

        info!(group_id = %group_id, name, members = member_ids.len(), "Created group");
        if let Some(group) = store.group(&group_id) {
            record_audit(self.audit, AuditEntry::group_created(group));
        }
        Ok(group_id)
    }

    /// Add a member to an existing group
    pub fn add_member(&self, group_id: &GroupId, user_id: &UserId) -> LedgerResult<bool> {
        let mut store = self.repo.load()?;
        let added = add_group_member(&mut store, group_id, user_id)?;
        if added {
            self.repo.save(&store)?;
            info!(group_id = %group_id, user_id = %user_id, "Added group member");
            let name = store.display_name(user_id);
            record_audit(self.audit, AuditEntry::member_added(group_id, user_id, &name));
        }
        Ok(added)
    }

    /// All users in registration order
    pub fn list_users(&self) -> LedgerResult<Vec<User>> {
        Ok(self.repo.load()?.users)
    }

    /// All groups in creation order
    pub fn list_groups(&self) -> LedgerResult<Vec<Group>> {
        Ok(self.repo.load()?.groups)
    }

    /// Resolve a user id or name
    pub fn resolve_user(&self, identifier: &str) -> LedgerResult<UserId> {
        resolve_user(&self.repo.load()?, identifier)
    }

    /// Resolve a group id or name
    pub fn resolve_group(&self, identifier: &str) -> LedgerResult<GroupId> {
        resolve_group(&self.repo.load()?, identifier)
    }

    /// Get a group with its member records
    pub fn group_with_members(&self, group_id: &GroupId) -> LedgerResult<(Group, Vec<User>)> {
        let store = self.repo.load()?;
        let group = store.require_group(group_id)?.clone();
        let members = group
            .member_ids
            .iter()
            .filter_map(|id| store.user(id).cloned())
            .collect();
        Ok((group, members))
    }
}
