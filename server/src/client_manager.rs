//! Participant roster for the UDP server
//!
//! This module tracks who is connected, independent of whether a game is
//! running:
//! - Participant id assignment within the fixed number of actor slots
//! - Capacity enforcement (joins beyond the last slot are rejected)
//! - Address lookup for routing inbound datagrams
//! - Connection health monitoring and timeout cleanup
//!
//! Ids double as actor slot numbers in the session, so they are always in
//! `1..=max_clients` and the lowest free one is handed out first.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected participant
#[derive(Debug)]
pub struct Client {
    /// Participant id, also the actor slot number
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    /// Marks the client as active right now
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if nothing arrived from this client within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected participants
///
/// Lives behind a `RwLock` shared by the receive loop, the sender task and the
/// timeout checker.
pub struct ClientManager {
    /// Connected clients indexed by their participant id
    clients: HashMap<u32, Client>,
    /// Maximum number of concurrent participants
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
        }
    }

    /// Attempts to register a new participant
    ///
    /// Returns Some(participant_id) if successful, None if every slot is taken.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = (1..=self.max_clients as u32).find(|id| !self.clients.contains_key(id))?;

        info!("Player {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    /// Removes a participant. Returns false if they were already gone.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Player {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    /// Finds a participant id by network address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Refreshes a participant's activity timestamp
    pub fn touch(&mut self, client_id: u32) -> bool {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.touch();
            true
        } else {
            false
        }
    }

    /// Checks for and removes timed-out participants
    ///
    /// Returns the removed ids so their actors can be dropped from the session.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    /// Gets all participant ids and their network addresses for broadcasting
    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    /// Connected participant ids in ascending order
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.clients.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Drops every participant, returning their addresses
    pub fn clear(&mut self) -> Vec<(u32, SocketAddr)> {
        let addrs = self.get_client_addrs();
        self.clients.clear();
        addrs
    }

    /// Returns the number of currently connected participants
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no participants are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_clients
    }
}

/// Tests cover participant lifecycle, capacity, id reuse and timeouts.
#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_client_creation() {
        let addr = test_addr(8080);
        let client = Client::new(1, addr);

        assert_eq!(client.id, 1);
        assert_eq!(client.addr, addr);
        assert!(!client.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_client_timeout() {
        let mut client = Client::new(1, test_addr(8080));
        client.last_seen = Instant::now() - Duration::from_secs(2);
        assert!(client.is_timed_out(Duration::from_secs(1)));

        client.touch();
        assert!(!client.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new(4);
        assert_eq!(manager.max_clients, 4);
        assert!(manager.is_empty());
        assert!(!manager.is_full());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_add_multiple_clients() {
        let mut manager = ClientManager::new(3);

        assert_eq!(manager.add_client(test_addr(8080)), Some(1));
        assert_eq!(manager.add_client(test_addr(8081)), Some(2));
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.ids(), vec![1, 2]);
    }

    #[test]
    fn test_add_client_max_capacity() {
        let mut manager = ClientManager::new(1);

        assert!(manager.add_client(test_addr(8080)).is_some());
        assert!(manager.is_full());

        assert!(manager.add_client(test_addr(8081)).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_lowest_free_id_is_reused() {
        let mut manager = ClientManager::new(4);
        for port in 0..4 {
            manager.add_client(test_addr(9000 + port));
        }

        assert!(manager.remove_client(&2));
        assert_eq!(manager.add_client(test_addr(9100)), Some(2));
        assert!(manager.add_client(test_addr(9101)).is_none());
    }

    #[test]
    fn test_remove_nonexistent_client() {
        let mut manager = ClientManager::new(2);
        assert!(!manager.remove_client(&999));
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_find_client_by_addr() {
        let mut manager = ClientManager::new(2);
        let client_id = manager.add_client(test_addr(8080)).unwrap();
        manager.add_client(test_addr(8081)).unwrap();

        assert_eq!(manager.find_client_by_addr(test_addr(8080)), Some(client_id));
        assert_eq!(manager.find_client_by_addr(test_addr(9999)), None);
    }

    #[test]
    fn test_check_timeouts_removes_silent_clients() {
        let mut manager = ClientManager::new(2);
        let quiet = manager.add_client(test_addr(8080)).unwrap();
        let chatty = manager.add_client(test_addr(8081)).unwrap();

        manager.clients.get_mut(&quiet).unwrap().last_seen =
            Instant::now() - Duration::from_secs(30);
        assert!(manager.touch(chatty));
        assert!(!manager.touch(42));

        let removed = manager.check_timeouts(Duration::from_secs(10));
        assert_eq!(removed, vec![quiet]);
        assert_eq!(manager.ids(), vec![chatty]);
    }

    #[test]
    fn test_clear_returns_everyone() {
        let mut manager = ClientManager::new(3);
        manager.add_client(test_addr(8080));
        manager.add_client(test_addr(8081));

        let mut dropped = manager.clear();
        dropped.sort_by_key(|(id, _)| *id);
        assert_eq!(dropped, vec![(1, test_addr(8080)), (2, test_addr(8081))]);
        assert!(manager.is_empty());
    }
}
