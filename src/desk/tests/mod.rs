//! Unit tests for the support desk facade.

mod facade_tests;
mod support;
