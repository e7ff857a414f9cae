//! Shared settings store.
//!
//! One snapshot of [`Settings`] behind a lock, mutated only through
//! [`Store::update`], which persists the result and pushes the new snapshot
//! to every subscriber. Subscribers that have gone away are dropped on the
//! next notification.

use std::path::PathBuf;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::config::{self, Settings};

pub struct Store {
    state: RwLock<Settings>,
    subscribers: Mutex<Vec<Sender<Settings>>>,
    save_path: Option<PathBuf>,
}

impl Store {
    /// A store that persists to `save_path` on every update. Pass `None` to
    /// keep changes in memory only (tests, read-only environments).
    pub fn new(initial: Settings, save_path: Option<PathBuf>) -> Self {
        Self {
            state: RwLock::new(initial),
            subscribers: Mutex::new(Vec::new()),
            save_path,
        }
    }

    pub fn snapshot(&self) -> Settings {
        self.state.read().clone()
    }

    /// Apply `change` to the current settings, persist, and notify
    /// subscribers. Persistence failure is logged and does not roll back the
    /// in-memory change.
    pub fn update<F>(&self, change: F) -> Settings
    where
        F: FnOnce(&mut Settings),
    {
        let updated = {
            let mut state = self.state.write();
            change(&mut state);
            state.clone()
        };

        if self.save_path.is_some() {
            if let Err(err) = config::save(self.save_path.clone(), &updated) {
                log::warn!("settings: failed to persist: {err:#}");
            }
        }

        self.notify(&updated);
        updated
    }

    /// Change notifications. Each subscriber receives every snapshot produced
    /// by [`Store::update`] after the subscription.
    pub fn subscribe(&self) -> Receiver<Settings> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    fn notify(&self, snapshot: &Settings) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::HighlightStyle;
    use tempfile::tempdir;

    #[test]
    fn update_mutates_the_snapshot() {
        let store = Store::new(Settings::default(), None);
        store.update(|s| s.show_badges = false);
        assert!(!store.snapshot().show_badges);
    }

    #[test]
    fn subscribers_receive_each_update() {
        let store = Store::new(Settings::default(), None);
        let rx = store.subscribe();
        store.update(|s| s.highlight_style = HighlightStyle::Glow);
        store.update(|s| s.enable_scroll_keys = false);
        assert_eq!(rx.recv().unwrap().highlight_style, HighlightStyle::Glow);
        assert!(!rx.recv().unwrap().enable_scroll_keys);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let store = Store::new(Settings::default(), None);
        drop(store.subscribe());
        let live = store.subscribe();
        store.update(|s| s.show_badges = false);
        assert!(!live.recv().unwrap().show_badges);
        assert_eq!(store.subscribers.lock().len(), 1);
    }

    #[test]
    fn update_persists_to_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let store = Store::new(Settings::default(), Some(path.clone()));
        store.update(|s| s.highlight_color = "#112233".into());
        let written: Settings =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.highlight_color, "#112233");
    }
}
