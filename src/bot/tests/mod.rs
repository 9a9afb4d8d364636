//! Unit tests for the bot matcher.
