//! Unit tests for the session store.

mod store_tests;
