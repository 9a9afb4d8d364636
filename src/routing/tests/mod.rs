//! Unit tests for routing decisions.
