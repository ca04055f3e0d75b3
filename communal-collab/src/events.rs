use crossbeam::channel::{Receiver, Sender};

use crate::{CommunityName, PrivacyType, UserId};

pub type EventSender = Sender<CollabEvent>;
pub type EventReceiver = Receiver<CollabEvent>;

/// Events emitted by the collab system after an operation succeeds
#[derive(Debug, Clone, PartialEq)]
pub enum CollabEvent {
    /// A new account was registered
    AccountCreated { user_id: UserId },
    /// A user signed in and received a new session
    UserSignedIn { user_id: UserId },
    /// A session was ended
    UserSignedOut { user_id: UserId },
    /// A community was registered, with its creator as moderator
    CommunityCreated {
        name: CommunityName,
        creator_id: UserId,
        privacy_type: PrivacyType,
    },
}
