//! Tests for the infrastructure backends

#[cfg(test)]
mod file_tests;
#[cfg(test)]
mod radius_codec_tests;
#[cfg(test)]
mod sql_backend_tests;
