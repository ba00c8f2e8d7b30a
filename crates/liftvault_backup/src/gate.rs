//! Connection-safety gate for network operations.
//!
//! Every engine entry point consults the gate before its first remote call.
//! The classifier is injected so tests can pin the connection class.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{BackupError, BackupResult};

/// How the device is currently connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionClass {
    /// Wi-Fi or wired; no data charges.
    Unmetered,
    /// Cellular or another charged link.
    Metered,
    /// No connectivity.
    Offline,
}

impl ConnectionClass {
    /// Parses `unmetered`, `metered` or `offline`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "unmetered" => Some(ConnectionClass::Unmetered),
            "metered" => Some(ConnectionClass::Metered),
            "offline" => Some(ConnectionClass::Offline),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionClass::Unmetered => "unmetered",
            ConnectionClass::Metered => "metered",
            ConnectionClass::Offline => "offline",
        })
    }
}

/// Reports the current connection class.
pub trait ConnectionClassifier: Send + Sync {
    /// Classifies the current connection.
    fn classify(&self) -> ConnectionClass;
}

/// A classifier that returns whatever it was last set to.
#[derive(Debug)]
pub struct StaticClassifier {
    class: RwLock<ConnectionClass>,
}

impl StaticClassifier {
    /// Creates a classifier fixed at `class`.
    pub fn new(class: ConnectionClass) -> Self {
        Self {
            class: RwLock::new(class),
        }
    }

    /// Changes the reported class.
    pub fn set(&self, class: ConnectionClass) {
        *self.class.write() = class;
    }
}

impl ConnectionClassifier for StaticClassifier {
    fn classify(&self) -> ConnectionClass {
        *self.class.read()
    }
}

/// Decides whether a network operation may proceed.
#[derive(Clone)]
pub struct NetworkGate {
    classifier: Arc<dyn ConnectionClassifier>,
}

impl NetworkGate {
    /// Creates a gate over the given classifier.
    pub fn new(classifier: Arc<dyn ConnectionClassifier>) -> Self {
        Self { classifier }
    }

    /// Returns the current connection class.
    pub fn classify(&self) -> ConnectionClass {
        self.classifier.classify()
    }

    /// Returns true only on an unmetered connection.
    pub fn is_safe(&self) -> bool {
        self.classify() == ConnectionClass::Unmetered
    }

    /// Returns true if a transfer may proceed.
    ///
    /// `allow_metered` lets a metered link through; offline never passes.
    pub fn permits(&self, allow_metered: bool) -> bool {
        Self::admits(self.classify(), allow_metered)
    }

    /// Fails with [`BackupError::NetworkBlocked`] unless a transfer may proceed.
    pub fn check(&self, allow_metered: bool) -> BackupResult<()> {
        let class = self.classify();
        if Self::admits(class, allow_metered) {
            Ok(())
        } else {
            Err(BackupError::NetworkBlocked { class })
        }
    }

    fn admits(class: ConnectionClass, allow_metered: bool) -> bool {
        match class {
            ConnectionClass::Unmetered => true,
            ConnectionClass::Metered => allow_metered,
            ConnectionClass::Offline => false,
        }
    }
}

impl fmt::Debug for NetworkGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkGate")
            .field("class", &self.classify())
            .finish()
    }
}
