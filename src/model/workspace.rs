use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend-assigned workspace identifier. Opaque to the client.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct WorkspaceId(u64);

impl WorkspaceId {
    pub const fn new(raw: u64) -> Self { Self(raw) }

    pub fn get(self) -> u64 { self.0 }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    /// Backend-owned location of the workspace's files.
    pub path: String,
    pub is_active: bool,
    pub file_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("backend reported {} active workspaces ({ids:?}), expected at most one", .ids.len())]
    MultipleActive { ids: Vec<WorkspaceId> },
}

/// The full ordered list of workspaces known at one instant.
///
/// Position defines both display order and hotkey order: hotkey index `n`
/// refers to the `n`th entry. A snapshot never holds more than one active
/// workspace; zero is allowed while a switch is settling.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(try_from = "Vec<Workspace>", into = "Vec<Workspace>")]
pub struct WorkspaceSnapshot {
    workspaces: Vec<Workspace>,
}

impl WorkspaceSnapshot {
    pub fn new(workspaces: Vec<Workspace>) -> Result<Self, SnapshotError> {
        let active: Vec<WorkspaceId> =
            workspaces.iter().filter(|ws| ws.is_active).map(|ws| ws.id).collect();
        if active.len() > 1 {
            return Err(SnapshotError::MultipleActive { ids: active });
        }
        Ok(Self { workspaces })
    }

    pub fn len(&self) -> usize { self.workspaces.len() }

    pub fn is_empty(&self) -> bool { self.workspaces.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Workspace> { self.workspaces.iter() }

    pub fn as_slice(&self) -> &[Workspace] { &self.workspaces }

    pub fn get(&self, id: WorkspaceId) -> Option<&Workspace> {
        self.workspaces.iter().find(|ws| ws.id == id)
    }

    pub fn contains(&self, id: WorkspaceId) -> bool { self.get(id).is_some() }

    /// Resolves a 1-based hotkey index.
    pub fn at_hotkey_index(&self, index: u32) -> Option<&Workspace> {
        let position = usize::try_from(index).ok()?.checked_sub(1)?;
        self.workspaces.get(position)
    }

    pub fn active(&self) -> Option<&Workspace> { self.workspaces.iter().find(|ws| ws.is_active) }

    pub fn active_id(&self) -> Option<WorkspaceId> { self.active().map(|ws| ws.id) }

    pub fn has_active(&self) -> bool { self.active().is_some() }

    pub fn is_active(&self, id: WorkspaceId) -> bool { self.active_id() == Some(id) }

    /// Derives a snapshot where only `id` is active. Only the `is_active`
    /// flags differ from `self`. Returns `None` if `id` is not present.
    pub fn with_active(&self, id: WorkspaceId) -> Option<Self> {
        if !self.contains(id) {
            return None;
        }
        let workspaces = self
            .workspaces
            .iter()
            .map(|ws| Workspace { is_active: ws.id == id, ..ws.clone() })
            .collect();
        Some(Self { workspaces })
    }
}

impl TryFrom<Vec<Workspace>> for WorkspaceSnapshot {
    type Error = SnapshotError;

    fn try_from(workspaces: Vec<Workspace>) -> Result<Self, Self::Error> { Self::new(workspaces) }
}

impl From<WorkspaceSnapshot> for Vec<Workspace> {
    fn from(snapshot: WorkspaceSnapshot) -> Self { snapshot.workspaces }
}

#[cfg(test)]
pub(crate) fn ws(id: u64, name: &str, is_active: bool) -> Workspace {
    Workspace {
        id: WorkspaceId::new(id),
        name: name.to_string(),
        path: format!("workspaces/{name}"),
        is_active,
        file_count: id as u32 * 3,
    }
}
