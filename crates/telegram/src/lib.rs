//! Telegram Bot API transport for the relay.
//!
//! - **Updates** (`types`) - serde model of the webhook `Update` payload
//! - **Commands** (`commands`) - bot command parsing, the `/start` welcome
//! - **Events** (`events`) - `Update` → `InboundEvent` decoding and dispatch
//! - **Bot API** (`api`) - `getMe`, `sendMessage`, `editMessageText`, `setWebhook`
//!
//! ```text
//! webhook Update → UpdateDispatcher → AgentRuntime → BotApi (ReplySink)
//!                        ↓
//!                 /start welcome
//! ```

pub mod api;
pub mod commands;
pub mod events;
pub mod types;

pub use api::{ApiError, BotApi};
pub use events::{
    decode_update, DispatchOutcome, TelegramEvent, UpdateDecodeError, UpdateDispatcher,
};
pub use types::Update;
