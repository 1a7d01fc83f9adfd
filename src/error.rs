//! Error types for the esl-price-sync crate.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// The label is not part of the expected label set.
    #[error("Label not found: {name}")]
    LabelNotFound {
        /// The label name that was looked up.
        name: String,
    },

    /// The label was not discovered in the last scan, so it cannot be written.
    #[error("Label {name} is offline")]
    LabelOffline {
        /// The label name.
        name: String,
    },

    /// A send to this label is already running.
    #[error("A price is already being sent to {name}")]
    SendInProgress {
        /// The label name.
        name: String,
    },

    /// Failed to establish a connection to the label.
    #[error("Connection to {address} failed: {reason}")]
    ConnectionFailed {
        /// Address of the label.
        address: String,
        /// Description of why the connection failed.
        reason: String,
    },

    /// The label did not acknowledge the characteristic write.
    #[error("Write to {address} rejected: {reason}")]
    WriteRejected {
        /// Address of the label.
        address: String,
        /// Description of the rejection.
        reason: String,
    },

    /// Characteristic not found on the label.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// The typed price could not be used.
    #[error("Invalid price {input:?}: {reason}")]
    MalformedPrice {
        /// The raw input.
        input: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The document store could not be reached or rejected the operation.
    #[error("Persistence error: {reason}")]
    Persistence {
        /// Description of the store failure.
        reason: String,
    },

    /// The label accepted the new price but the ledger could not record it.
    ///
    /// The physical label and the price history now disagree.
    #[error("Label {label} now shows {price} but the price history was not updated: {reason}")]
    LedgerDiverged {
        /// The label name.
        label: String,
        /// The price the label is displaying.
        price: String,
        /// The underlying store failure.
        reason: String,
    },

    /// I/O error from a file-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error from a file-backed store.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used by the UI to pick a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Rejected before any radio activity; nothing changed.
    PreWrite,
    /// The link or the write failed; the label was not updated.
    Transport,
    /// The label was updated but the ledger was not.
    Diverged,
    /// Storage failed outside of a send.
    Storage,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::LabelNotFound { .. }
            | Self::LabelOffline { .. }
            | Self::SendInProgress { .. }
            | Self::MalformedPrice { .. } => FailureKind::PreWrite,
            Self::Bluetooth(_)
            | Self::BluetoothUnavailable
            | Self::ConnectionFailed { .. }
            | Self::WriteRejected { .. }
            | Self::CharacteristicNotFound { .. } => FailureKind::Transport,
            Self::LedgerDiverged { .. } => FailureKind::Diverged,
            Self::Persistence { .. } | Self::Io(_) | Self::Json(_) => FailureKind::Storage,
        }
    }

    pub(crate) fn malformed(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedPrice {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence {
            reason: err.to_string(),
        }
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
