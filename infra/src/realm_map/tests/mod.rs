//! Tests for the infrastructure realm map providers
