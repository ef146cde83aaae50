//! In-memory registry of live users and disks.
//!
//! Every operation takes the single registry lock for its whole body. Ids
//! start at 1, only ever grow, and are never handed out twice.

use std::collections::BTreeMap;
use std::net::IpAddr;

use tokio::sync::Mutex;

pub type UserId = u32;
pub type DiskId = u32;
pub type DssId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    pub addr: IpAddr,
    pub port: u16,
    pub status: RecordStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disk {
    pub disk_id: DiskId,
    pub name: String,
    pub addr: IpAddr,
    pub port: u16,
    pub capacity_bytes: u64,
    pub zone: String,
    pub status: RecordStatus,
}

/// Shared store handed to every connection.
///
/// Disks live in a `BTreeMap` so allocation walks them in ascending id
/// order, which is also registration order.
#[derive(Debug, Default)]
pub struct Registry {
    state: Mutex<RegistryState>,
}

#[derive(Debug)]
struct RegistryState {
    users: BTreeMap<UserId, User>,
    disks: BTreeMap<DiskId, Disk>,
    next_user_id: UserId,
    next_disk_id: DiskId,
    next_dss_id: DssId,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            disks: BTreeMap::new(),
            next_user_id: 1,
            next_disk_id: 1,
            next_dss_id: 1,
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new user. Name and port are validated by the caller.
    pub async fn register_user(&self, name: String, addr: IpAddr, port: u16) -> UserId {
        let mut state = self.state.lock().await;
        let user_id = state.next_user_id;
        state.next_user_id += 1;
        state.users.insert(
            user_id,
            User {
                user_id,
                name,
                addr,
                port,
                status: RecordStatus::Ready,
            },
        );
        user_id
    }

    /// Returns whether the user was registered.
    pub async fn deregister_user(&self, user_id: UserId) -> bool {
        self.state.lock().await.users.remove(&user_id).is_some()
    }

    /// Stores a new disk. Name, port and capacity are validated by the caller.
    pub async fn register_disk(
        &self,
        name: String,
        addr: IpAddr,
        port: u16,
        capacity_bytes: u64,
        zone: String,
    ) -> DiskId {
        let mut state = self.state.lock().await;
        let disk_id = state.next_disk_id;
        state.next_disk_id += 1;
        state.disks.insert(
            disk_id,
            Disk {
                disk_id,
                name,
                addr,
                port,
                capacity_bytes,
                zone,
                status: RecordStatus::Ready,
            },
        );
        disk_id
    }

    pub async fn deregister_disk(&self, disk_id: DiskId) -> bool {
        self.state.lock().await.disks.remove(&disk_id).is_some()
    }

    /// Picks the first `n` registered disks by id, or `None` when fewer exist.
    ///
    /// Selected disks stay `Ready`; a later allocation may return them again.
    pub async fn allocate_disks(&self, n: usize) -> Option<Vec<DiskId>> {
        let state = self.state.lock().await;
        if state.disks.len() < n {
            return None;
        }
        Some(state.disks.keys().take(n).copied().collect())
    }

    /// Issues the next DSS id.
    ///
    /// Runs under its own lock acquisition, separate from
    /// [`Registry::allocate_disks`].
    pub async fn next_dss_id(&self) -> DssId {
        let mut state = self.state.lock().await;
        let dss_id = state.next_dss_id;
        state.next_dss_id += 1;
        dss_id
    }

    pub async fn user(&self, user_id: UserId) -> Option<User> {
        self.state.lock().await.users.get(&user_id).cloned()
    }

    pub async fn disk(&self, disk_id: DiskId) -> Option<Disk> {
        self.state.lock().await.disks.get(&disk_id).cloned()
    }

    /// Copies out every user, ordered by id.
    pub async fn users(&self) -> Vec<User> {
        self.state.lock().await.users.values().cloned().collect()
    }

    /// Copies out every disk, ordered by id.
    pub async fn disks(&self) -> Vec<Disk> {
        self.state.lock().await.disks.values().cloned().collect()
    }
}
