//! Tests for domain entities

#[cfg(test)]
mod auth_result_tests;
#[cfg(test)]
mod lockout_state_tests;
