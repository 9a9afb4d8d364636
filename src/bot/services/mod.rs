//! Application services for the bot.

mod matcher;

pub use matcher::{BotMatcher, BotMatcherError, BotMatcherResult};
