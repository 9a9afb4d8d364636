//! Unit tests for the conversation subsystem.

mod support;
