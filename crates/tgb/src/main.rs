use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use anyhow::Context;
use tgb_client::{run_polling, Bot};
use tgb_core::{
    config::{Config, WebhookConfig},
    ports::UpdateHandler,
    types::{ChatId, Update},
    Result,
};
use tgb_transport::{InputFile, ParamBag};
use tgb_webhook::{router, serve, webhook_path, webhook_url, WebhookIngest};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Replies to every text message with the same text.
struct Echo {
    bot: Bot,
}

impl UpdateHandler for Echo {
    fn handle(&self, update: Result<Update>) {
        let update = match update {
            Ok(update) => update,
            Err(e) => {
                warn!("skipping update: {e}");
                return;
            }
        };
        let Some(message) = update.message else {
            return;
        };
        let Some(text) = message.text.as_deref() else {
            return;
        };

        let sent = self.bot.send_message(
            ChatId::Id(message.chat.id),
            text,
            ParamBag::new().with("reply_to_message_id", message.message_id),
        );
        if let Err(e) = sent.into_result() {
            warn!(chat_id = message.chat.id, "echo failed: {e}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;
    tgb_core::logging::init("tgb", cfg.verbose)?;

    let bot = Bot::new(&cfg)?;
    let me = bot.get_me().into_result().context("getMe failed")?;
    if let Some(me) = me {
        info!(
            id = me.id,
            username = me.username.as_deref().unwrap_or("-"),
            "tgb started"
        );
    }

    // Kept alive here so the blocking client is never dropped on a runtime thread.
    let handler: Arc<dyn UpdateHandler> = Arc::new(Echo { bot: bot.clone() });

    match &cfg.webhook {
        Some(webhook) => run_webhook(&bot, handler.clone(), &cfg, webhook)?,
        None => {
            let stop = Arc::new(AtomicBool::new(false));
            stop_on_ctrl_c(stop.clone())?;
            run_polling(&bot, handler.as_ref(), &cfg.polling, &stop);
        }
    }

    drop(handler);
    Ok(())
}

fn run_webhook(
    bot: &Bot,
    handler: Arc<dyn UpdateHandler>,
    cfg: &Config,
    webhook: &WebhookConfig,
) -> anyhow::Result<()> {
    let url = webhook_url(&webhook.host, webhook.port, &cfg.bot_token);
    let certificate = webhook.certificate_path.clone().map(InputFile::path);
    bot.set_webhook(
        &url,
        certificate,
        webhook.max_connections,
        webhook.allowed_updates.clone(),
    )
    .into_result()
    .context("setWebhook failed")?;
    info!(host = %webhook.host, port = webhook.port, "webhook registered");

    let app = router(
        Arc::new(WebhookIngest::new(handler)),
        &webhook_path(&cfg.bot_token),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(webhook.bind_addr)
            .await
            .with_context(|| format!("bind {}", webhook.bind_addr))?;

        let shutdown = CancellationToken::new();
        let on_signal = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("ctrl-c listener failed: {e}");
            }
            on_signal.cancel();
        });

        serve(listener, app, shutdown).await
    })
}

/// Raise `stop` on ctrl-c. The in-flight long poll still runs to completion.
fn stop_on_ctrl_c(stop: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build signal runtime")?;

    thread::Builder::new()
        .name("tgb-signal".to_string())
        .spawn(move || {
            match runtime.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => {
                    info!("ctrl-c received, stopping after the current poll");
                    stop.store(true, Ordering::SeqCst);
                }
                Err(e) => error!("ctrl-c listener failed: {e}"),
            }
        })
        .context("spawn signal thread")?;
    Ok(())
}
