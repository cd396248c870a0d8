//! Integration tests for Sumi-Binder
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! fetch client, the TOC crawler and complete harvest runs end-to-end.

mod common;
mod pipeline_tests;
mod toc_tests;
