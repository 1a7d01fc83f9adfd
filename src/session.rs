//! Per-label UI session state.
//!
//! Each label panel is a small state machine that the UI binding drives with
//! [`LabelPanel::on_draft_change`] and a send, and reads with
//! [`LabelPanel::render`]. A successful send marks the draft for clearing and
//! the clear is applied by the next render, never in the middle of the send.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::ble::connection::{Ack, ConnectionManager};
use crate::ble::scanner::DiscoveryResult;
use crate::data::{format_last_contact, LabelDocument};
use crate::error::{Error, FailureKind, Result};
use crate::ledger::PriceLedger;
use crate::utils::{format_price, parse_price};

/// Send lifecycle of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PanelState {
    /// Nothing typed.
    #[default]
    Idle,
    /// The operator has typed a price that was not sent yet.
    Editing,
    /// A send is running.
    Sending,
    /// The last send was acknowledged at the given time.
    Sent(NaiveDateTime),
}

impl PanelState {
    /// Check if a send is running.
    pub fn is_sending(&self) -> bool {
        matches!(self, Self::Sending)
    }
}

impl std::fmt::Display for PanelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Editing => write!(f, "Editing"),
            Self::Sending => write!(f, "Sending"),
            Self::Sent(at) => write!(f, "Sent at {}", at.format("%H:%M:%S")),
        }
    }
}

/// Whether a label was seen in the latest discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelStatus {
    /// Seen in the latest discovery result.
    Online,
    /// Not seen.
    Offline,
}

impl LabelStatus {
    fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }
}

/// Severity of a panel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// The send went through.
    Success,
    /// The label was updated but needs operator attention.
    Warning,
    /// Nothing was changed.
    Error,
}

/// Message shown under a panel after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelMessage {
    /// Severity.
    pub kind: MessageKind,
    /// Human readable text.
    pub text: String,
}

impl PanelMessage {
    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            text: text.into(),
        }
    }

    fn from_error(err: &Error) -> Self {
        match err.kind() {
            FailureKind::PreWrite => Self {
                kind: MessageKind::Error,
                text: err.to_string(),
            },
            FailureKind::Transport => Self {
                kind: MessageKind::Error,
                text: format!("Label not updated: {}", err),
            },
            FailureKind::Diverged => Self {
                kind: MessageKind::Warning,
                text: err.to_string(),
            },
            FailureKind::Storage => Self {
                kind: MessageKind::Error,
                text: format!("Storage error: {}", err),
            },
        }
    }
}

/// Everything the UI binding needs to draw one label panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    /// Label name.
    pub name: String,
    /// Bound product.
    pub product: String,
    /// Online or offline.
    pub status: LabelStatus,
    /// Formatted current price, e.g. `R$ 27,45`.
    pub current_price_display: String,
    /// Formatted last contact or `Never`.
    pub last_contact_display: String,
    /// Contents of the price input.
    pub draft_value: String,
    /// Whether the send action is available.
    pub send_enabled: bool,
    /// Result of the last action, if any.
    pub message: Option<PanelMessage>,
}

/// Session state of one label panel.
#[derive(Debug, Clone)]
pub struct LabelPanel {
    name: String,
    product: String,
    current_price: Decimal,
    last_contact: Option<NaiveDateTime>,
    draft: String,
    clear_pending: bool,
    state: PanelState,
    message: Option<PanelMessage>,
}

impl LabelPanel {
    /// Create a panel for a label with no history.
    pub fn new(name: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            product: product.into(),
            current_price: Decimal::ZERO,
            last_contact: None,
            draft: String::new(),
            clear_pending: false,
            state: PanelState::Idle,
            message: None,
        }
    }

    /// Create a panel from the ledger's document for the label.
    pub fn from_document(document: &LabelDocument) -> Self {
        let mut panel = Self::new(&document.name, &document.product);
        panel.current_price = document.current_price();
        panel.last_contact = document.last_contact;
        panel
    }

    /// Label name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound product.
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Last committed price.
    pub fn current_price(&self) -> Decimal {
        self.current_price
    }

    /// Last acknowledged contact.
    pub fn last_contact(&self) -> Option<NaiveDateTime> {
        self.last_contact
    }

    /// Current draft text.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Current state.
    pub fn state(&self) -> PanelState {
        self.state
    }

    /// Whether the draft will be cleared by the next render.
    pub fn is_clear_pending(&self) -> bool {
        self.clear_pending
    }

    /// The operator typed into the price input.
    ///
    /// Ignored while a send is running.
    pub fn on_draft_change(&mut self, text: impl Into<String>) {
        if self.state.is_sending() {
            debug!("{}: ignoring input while sending", self.name);
            return;
        }

        self.draft = text.into();
        self.clear_pending = false;
        self.message = None;
        self.state = if self.draft.is_empty() {
            PanelState::Idle
        } else {
            PanelState::Editing
        };
    }

    /// Apply deferred state changes, then produce the view.
    pub fn render(&mut self, online: bool) -> PanelView {
        if self.clear_pending {
            self.draft.clear();
            self.clear_pending = false;
        }
        self.view(online)
    }

    /// Produce the view without applying deferred changes.
    pub fn view(&self, online: bool) -> PanelView {
        PanelView {
            name: self.name.clone(),
            product: self.product.clone(),
            status: LabelStatus::from_online(online),
            current_price_display: format_price(self.current_price),
            last_contact_display: format_last_contact(self.last_contact),
            draft_value: self.draft.clone(),
            send_enabled: self.can_send(online),
            message: self.message.clone(),
        }
    }

    /// Whether a send may start.
    pub fn can_send(&self, online: bool) -> bool {
        online && self.state == PanelState::Editing && !self.clear_pending
    }

    /// Validate the draft and enter [`PanelState::Sending`].
    ///
    /// On error the state and draft are left untouched.
    pub fn begin_send(&mut self, online: bool, max_price: Decimal) -> Result<Decimal> {
        let result = self.check_send(online, max_price);
        match &result {
            Ok(price) => {
                debug!("{}: {} -> Sending ({})", self.name, self.state, price);
                self.state = PanelState::Sending;
                self.message = None;
            }
            // Nothing new to send after a success; keep its confirmation.
            Err(_) if self.awaiting_new_price() => {
                debug!("{}: send ignored, no new price since last send", self.name)
            }
            Err(e) => self.message = Some(PanelMessage::from_error(e)),
        }
        result
    }

    fn awaiting_new_price(&self) -> bool {
        matches!(self.state, PanelState::Sent(_)) && (self.clear_pending || self.draft.is_empty())
    }

    fn check_send(&self, online: bool, max_price: Decimal) -> Result<Decimal> {
        if self.state.is_sending() {
            return Err(Error::SendInProgress {
                name: self.name.clone(),
            });
        }
        if !online {
            return Err(Error::LabelOffline {
                name: self.name.clone(),
            });
        }
        if self.state != PanelState::Editing || self.clear_pending {
            return Err(Error::malformed(&self.draft, "no new price entered"));
        }
        parse_price(&self.draft, max_price)
    }

    /// The label acknowledged `price` at `at`.
    pub fn complete_send(&mut self, price: Decimal, at: NaiveDateTime) {
        self.commit(price, at);
        self.message = Some(PanelMessage::success(format!(
            "Sent at {}",
            at.format("%H:%M:%S")
        )));
    }

    /// The label acknowledged `price` but the ledger did not record it.
    pub fn complete_diverged(&mut self, price: Decimal, at: NaiveDateTime, err: &Error) {
        self.commit(price, at);
        self.message = Some(PanelMessage::from_error(err));
    }

    /// The send failed before the label was updated. The draft is kept.
    pub fn fail_send(&mut self, err: &Error) {
        self.state = PanelState::Editing;
        self.message = Some(PanelMessage::from_error(err));
    }

    fn commit(&mut self, price: Decimal, at: NaiveDateTime) {
        self.current_price = price;
        self.last_contact = Some(self.last_contact.map_or(at, |prev| prev.max(at)));
        self.state = PanelState::Sent(at);
        self.clear_pending = true;
    }
}

/// Runs a panel's send through the connection manager and the ledger.
pub struct SessionReconciler {
    connection: Arc<ConnectionManager>,
    ledger: Arc<PriceLedger>,
    max_price: Decimal,
}

impl SessionReconciler {
    /// Create a reconciler.
    pub fn new(
        connection: Arc<ConnectionManager>,
        ledger: Arc<PriceLedger>,
        max_price: Decimal,
    ) -> Self {
        Self {
            connection,
            ledger,
            max_price,
        }
    }

    /// Send the panel's draft to its label.
    ///
    /// The panel is left in its resulting state with a message describing
    /// the outcome; the same outcome is returned for callers that need the
    /// typed error.
    ///
    /// # Errors
    ///
    /// - [`Error::LabelOffline`] / [`Error::MalformedPrice`] /
    ///   [`Error::SendInProgress`]: nothing was attempted
    /// - [`Error::ConnectionFailed`] / [`Error::WriteRejected`]: the label was
    ///   not updated, the draft is kept
    /// - [`Error::LedgerDiverged`]: the label shows the new price but the
    ///   history was not updated
    pub async fn send(&self, panel: &mut LabelPanel, discovery: &DiscoveryResult) -> Result<Ack> {
        let address = discovery.address(panel.name()).map(str::to_string);
        let price = panel.begin_send(address.is_some(), self.max_price)?;
        let Some(address) = address else {
            // begin_send rejects offline labels
            return Err(Error::LabelOffline {
                name: panel.name().to_string(),
            });
        };

        let ack = match self
            .connection
            .send_price(&address, panel.product(), price)
            .await
        {
            Ok(ack) => ack,
            Err(e) => {
                warn!("{}: send failed: {}", panel.name(), e);
                panel.fail_send(&e);
                return Err(e);
            }
        };

        let at = ack.acknowledged_at;
        match self
            .ledger
            .record_price_at(panel.name(), at.date(), price, at)
            .await
        {
            Ok(_) => {
                info!("{}: now showing {}", panel.name(), format_price(price));
                panel.complete_send(price, at);
                Ok(ack)
            }
            Err(e) => {
                let diverged = Error::LedgerDiverged {
                    label: panel.name().to_string(),
                    price: format_price(price),
                    reason: e.to_string(),
                };
                error!("{}", diverged);
                panel.complete_diverged(price, at, &diverged);
                Err(diverged)
            }
        }
    }
}
