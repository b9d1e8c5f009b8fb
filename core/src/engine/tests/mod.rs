//! Tests for the authentication engine

#[cfg(test)]
mod service_tests;
