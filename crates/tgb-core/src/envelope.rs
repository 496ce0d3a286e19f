//! Response envelopes: the `{ok, description, result}` wrapper every Bot API
//! call returns.

use serde::{Deserialize, Serialize};

use crate::{
    errors::Error,
    types::{
        Chat, ChatMember, File, GameHighScore, Message, Poll, StickerSet, Update, User,
        UserProfilePhotos, WebhookInfo,
    },
    Result,
};

/// Extra hints Telegram attaches to some failures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrate_to_chat_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ResponseParameters>,
}

impl<T> ResponseEnvelope<T> {
    /// A locally synthesized failure (transport or decode problem).
    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            ok: false,
            description: Some(description.into()),
            result: None,
            error_code: None,
            parameters: None,
        }
    }

    pub fn success(result: T) -> Self {
        Self {
            ok: true,
            description: None,
            result: Some(result),
            error_code: None,
            parameters: None,
        }
    }

    /// Collapse into a `Result`; `ok:false` becomes [`Error::Api`].
    pub fn into_result(self) -> Result<Option<T>> {
        if self.ok {
            return Ok(self.result);
        }
        Err(Error::Api {
            description: self
                .description
                .unwrap_or_else(|| "request failed without description".to_string()),
            error_code: self.error_code,
        })
    }

    /// Map the payload, keeping status fields.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseEnvelope<U> {
        ResponseEnvelope {
            ok: self.ok,
            description: self.description,
            result: self.result.map(f),
            error_code: self.error_code,
            parameters: self.parameters,
        }
    }
}

/// Result of "edit" style calls: the edited message when the bot can address it,
/// `true` for inline messages it cannot fetch back.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageOrBool {
    Message(Box<Message>),
    Bool(bool),
}

impl ResponseEnvelope<MessageOrBool> {
    pub fn result_message(&self) -> Option<&Message> {
        match &self.result {
            Some(MessageOrBool::Message(m)) => Some(m),
            _ => None,
        }
    }

    pub fn result_bool(&self) -> Option<bool> {
        match self.result {
            Some(MessageOrBool::Bool(b)) => Some(b),
            _ => None,
        }
    }
}

pub type UserResponse = ResponseEnvelope<User>;
pub type MessageResponse = ResponseEnvelope<Message>;
pub type MessagesResponse = ResponseEnvelope<Vec<Message>>;
pub type UpdatesResponse = ResponseEnvelope<Vec<Update>>;
pub type FileResponse = ResponseEnvelope<File>;
pub type ChatResponse = ResponseEnvelope<Chat>;
pub type ChatMemberResponse = ResponseEnvelope<ChatMember>;
pub type ChatAdministratorsResponse = ResponseEnvelope<Vec<ChatMember>>;
pub type UserProfilePhotosResponse = ResponseEnvelope<UserProfilePhotos>;
pub type BoolResponse = ResponseEnvelope<bool>;
pub type StringResponse = ResponseEnvelope<String>;
pub type IntResponse = ResponseEnvelope<i64>;
pub type PollResponse = ResponseEnvelope<Poll>;
pub type StickerSetResponse = ResponseEnvelope<StickerSet>;
pub type GameHighScoresResponse = ResponseEnvelope<Vec<GameHighScore>>;
pub type WebhookInfoResponse = ResponseEnvelope<WebhookInfo>;
pub type MessageOrBoolResponse = ResponseEnvelope<MessageOrBool>;
