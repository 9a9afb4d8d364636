//! Unit tests for agents and the in-memory directory.
