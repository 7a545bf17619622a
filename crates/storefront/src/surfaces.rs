//! Collaborator interfaces supplied by the embedding UI layer.
//!
//! The engine never talks to UI components or global session state
//! directly. The screen that owns a [`crate::cart::CartStore`] or
//! [`crate::checkout::CheckoutWizard`] injects these capabilities at
//! construction time.

use async_trait::async_trait;
use secrecy::SecretString;

use petalpost_core::ClientId;

/// Supplies the signed-in user and their bearer credential.
///
/// Treated as an external authority; `None` means no active session.
pub trait SessionProvider: Send + Sync {
    /// The currently signed-in client, if any.
    fn current_client_id(&self) -> Option<ClientId>;

    /// Bearer credential for authenticated remote calls.
    fn bearer_token(&self) -> Option<SecretString>;
}

/// Asks the user to acknowledge a destructive action before it runs.
#[async_trait]
pub trait ConfirmationSurface: Send + Sync {
    /// Returns `true` if the user confirmed.
    async fn confirm(&self, message: &str) -> bool;
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// Fire-and-forget user notifications (toasts, banners).
///
/// Implementations must not block; the engine calls this from async
/// contexts and moves on immediately.
pub trait NotificationSurface: Send + Sync {
    fn notify(&self, message: &str, kind: NoticeKind);
}
