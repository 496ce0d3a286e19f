use std::{fmt, sync::Arc};

use tgb_core::{
    config::Config,
    envelope::{
        BoolResponse, ChatAdministratorsResponse, ChatMemberResponse, ChatResponse, FileResponse,
        GameHighScoresResponse, IntResponse, MessageOrBoolResponse, MessageResponse,
        MessagesResponse, PollResponse, StickerSetResponse, StringResponse, UpdatesResponse,
        UserProfilePhotosResponse, UserResponse, WebhookInfoResponse,
    },
    types::{ChatAction, ChatId, File, InputMedia, UpdateType},
    Result,
};
use tgb_transport::{
    call, call_message_or_bool, HttpTransport, InputFile, ParamBag, ParamValue, Transport,
};
use tracing::debug;

/// Telegram bot handle.
///
/// Cheap to clone; clones share the transport. All calls block the calling
/// thread until the HTTP exchange completes.
#[derive(Clone)]
pub struct Bot {
    transport: Arc<dyn Transport>,
    token: Arc<str>,
    file_base_url: Arc<str>,
}

impl Bot {
    pub fn new(cfg: &Config) -> Result<Self> {
        let transport = HttpTransport::new(cfg)?;
        Ok(Self::with_transport(Arc::new(transport), cfg))
    }

    /// Use a custom transport (tests, proxies).
    pub fn with_transport(transport: Arc<dyn Transport>, cfg: &Config) -> Self {
        Self {
            transport,
            token: Arc::from(cfg.bot_token.as_str()),
            file_base_url: Arc::from(cfg.file_base_url.as_str()),
        }
    }

    fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: ParamBag,
    ) -> tgb_core::envelope::ResponseEnvelope<T> {
        call(self.transport.as_ref(), method, params)
    }

    fn call_edit(&self, method: &str, params: ParamBag) -> MessageOrBoolResponse {
        call_message_or_bool(self.transport.as_ref(), method, params)
    }

    // ============== Updates & webhook ==============

    /// Options: `offset`, `limit`, `timeout`, `allowed_updates`.
    pub fn get_updates(&self, options: ParamBag) -> UpdatesResponse {
        self.call("getUpdates", options)
    }

    /// Register `url` for pushed updates, optionally uploading a self-signed
    /// certificate.
    pub fn set_webhook(
        &self,
        url: &str,
        certificate: Option<InputFile>,
        max_connections: u32,
        allowed_updates: Vec<UpdateType>,
    ) -> BoolResponse {
        let mut params = ParamBag::new()
            .with("url", url)
            .with("max_connections", max_connections)
            .with("allowed_updates", allowed_updates);
        params.insert_opt("certificate", certificate);

        debug!("setting webhook url");
        self.call("setWebhook", params)
    }

    pub fn delete_webhook(&self) -> BoolResponse {
        debug!("deleting webhook url");
        self.call("deleteWebhook", ParamBag::new())
    }

    pub fn get_webhook_info(&self) -> WebhookInfoResponse {
        self.call("getWebhookInfo", ParamBag::new())
    }

    // ============== Sending ==============

    pub fn get_me(&self) -> UserResponse {
        self.call("getMe", ParamBag::new())
    }

    /// Options: `parse_mode`, `disable_web_page_preview`, `disable_notification`,
    /// `reply_to_message_id`, `reply_markup`.
    pub fn send_message(&self, chat_id: ChatId, text: &str, options: ParamBag) -> MessageResponse {
        let params = options.with("chat_id", chat_id).with("text", text);
        self.call("sendMessage", params)
    }

    pub fn forward_message(
        &self,
        chat_id: ChatId,
        from_chat_id: ChatId,
        message_id: i64,
        options: ParamBag,
    ) -> MessageResponse {
        let params = options
            .with("chat_id", chat_id)
            .with("from_chat_id", from_chat_id)
            .with("message_id", message_id);
        self.call("forwardMessage", params)
    }

    pub fn send_photo(&self, chat_id: ChatId, photo: InputFile, options: ParamBag) -> MessageResponse {
        let params = options.with("chat_id", chat_id).with("photo", photo);
        self.call("sendPhoto", params)
    }

    pub fn send_document(
        &self,
        chat_id: ChatId,
        document: InputFile,
        options: ParamBag,
    ) -> MessageResponse {
        let params = options.with("chat_id", chat_id).with("document", document);
        self.call("sendDocument", params)
    }

    pub fn send_location(
        &self,
        chat_id: ChatId,
        latitude: f64,
        longitude: f64,
        options: ParamBag,
    ) -> MessageResponse {
        let params = options
            .with("chat_id", chat_id)
            .with("latitude", latitude)
            .with("longitude", longitude);
        self.call("sendLocation", params)
    }

    pub fn send_media_group(
        &self,
        chat_id: ChatId,
        media: Vec<InputMedia>,
        options: ParamBag,
    ) -> MessagesResponse {
        let params = options
            .with("chat_id", chat_id)
            .with("media", ParamValue::json(media));
        self.call("sendMediaGroup", params)
    }

    pub fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> BoolResponse {
        let params = ParamBag::new()
            .with("chat_id", chat_id)
            .with("action", action);
        self.call("sendChatAction", params)
    }

    // ============== Users, files & chats ==============

    pub fn get_user_profile_photos(&self, user_id: i64, options: ParamBag) -> UserProfilePhotosResponse {
        self.call("getUserProfilePhotos", options.with("user_id", user_id))
    }

    pub fn get_file(&self, file_id: &str) -> FileResponse {
        self.call("getFile", ParamBag::new().with("file_id", file_id))
    }

    /// Download link for a file returned by [`Bot::get_file`].
    ///
    /// Pure formatting; `None` when Telegram did not provide a `file_path`.
    /// The link embeds the token: do not log or share it.
    pub fn file_url(&self, file: &File) -> Option<String> {
        let path = file.file_path.as_deref()?;
        Some(format!("{}{}/{}", self.file_base_url, self.token, path))
    }

    pub fn get_chat(&self, chat_id: ChatId) -> ChatResponse {
        self.call("getChat", ParamBag::new().with("chat_id", chat_id))
    }

    pub fn get_chat_administrators(&self, chat_id: ChatId) -> ChatAdministratorsResponse {
        self.call(
            "getChatAdministrators",
            ParamBag::new().with("chat_id", chat_id),
        )
    }

    pub fn get_chat_member(&self, chat_id: ChatId, user_id: i64) -> ChatMemberResponse {
        let params = ParamBag::new()
            .with("chat_id", chat_id)
            .with("user_id", user_id);
        self.call("getChatMember", params)
    }

    pub fn get_chat_members_count(&self, chat_id: ChatId) -> IntResponse {
        self.call("getChatMembersCount", ParamBag::new().with("chat_id", chat_id))
    }

    pub fn export_chat_invite_link(&self, chat_id: ChatId) -> StringResponse {
        self.call(
            "exportChatInviteLink",
            ParamBag::new().with("chat_id", chat_id),
        )
    }

    /// Options: `text`, `show_alert`, `url`, `cache_time`.
    pub fn answer_callback_query(&self, callback_query_id: &str, options: ParamBag) -> BoolResponse {
        self.call(
            "answerCallbackQuery",
            options.with("callback_query_id", callback_query_id),
        )
    }

    // ============== Updating messages ==============
    //
    // Options name the target: `chat_id` + `message_id`, or `inline_message_id`.

    pub fn edit_message_text(&self, text: &str, options: ParamBag) -> MessageOrBoolResponse {
        self.call_edit("editMessageText", options.with("text", text))
    }

    pub fn edit_message_caption(&self, caption: &str, options: ParamBag) -> MessageOrBoolResponse {
        self.call_edit("editMessageCaption", options.with("caption", caption))
    }

    pub fn edit_message_reply_markup(&self, options: ParamBag) -> MessageOrBoolResponse {
        self.call_edit("editMessageReplyMarkup", options)
    }

    pub fn edit_message_live_location(
        &self,
        latitude: f64,
        longitude: f64,
        options: ParamBag,
    ) -> MessageOrBoolResponse {
        let params = options
            .with("latitude", latitude)
            .with("longitude", longitude);
        self.call_edit("editMessageLiveLocation", params)
    }

    pub fn stop_message_live_location(&self, options: ParamBag) -> MessageOrBoolResponse {
        self.call_edit("stopMessageLiveLocation", options)
    }

    pub fn delete_message(&self, chat_id: ChatId, message_id: i64) -> BoolResponse {
        let params = ParamBag::new()
            .with("chat_id", chat_id)
            .with("message_id", message_id);
        self.call("deleteMessage", params)
    }

    pub fn stop_poll(&self, chat_id: ChatId, message_id: i64, options: ParamBag) -> PollResponse {
        let params = options
            .with("chat_id", chat_id)
            .with("message_id", message_id);
        self.call("stopPoll", params)
    }

    // ============== Stickers & games ==============

    pub fn get_sticker_set(&self, name: &str) -> StickerSetResponse {
        self.call("getStickerSet", ParamBag::new().with("name", name))
    }

    pub fn upload_sticker_file(&self, user_id: i64, png_sticker: InputFile) -> FileResponse {
        let params = ParamBag::new()
            .with("user_id", user_id)
            .with("png_sticker", png_sticker);
        self.call("uploadStickerFile", params)
    }

    /// Options name the target message like the edit calls.
    pub fn set_game_score(&self, user_id: i64, score: i64, options: ParamBag) -> MessageOrBoolResponse {
        let params = options.with("user_id", user_id).with("score", score);
        self.call_edit("setGameScore", params)
    }

    pub fn get_game_high_scores(&self, user_id: i64, options: ParamBag) -> GameHighScoresResponse {
        self.call("getGameHighScores", options.with("user_id", user_id))
    }
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("file_base_url", &self.file_base_url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}
