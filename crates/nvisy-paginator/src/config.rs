//! Paginator configuration.
//!
//! Settings can be deserialized or, with the `config` feature, read from
//! command-line arguments and environment variables.

use std::fmt;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::cursor::{CursorCodec, DEFAULT_SALT};
use crate::source::RecordSource;
use crate::{Paginator, PaginatorError, PaginatorResult, TRACING_TARGET_PAGINATOR};

// Configuration constants
const DEFAULT_MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_MAX_BUTTON_COUNT: u32 = 20;
const DEFAULT_LOOKUP_CONCURRENCY: usize = 4;

const MAX_PAGE_SIZE_LIMIT: u32 = 1000;
const MAX_BUTTON_COUNT_LIMIT: u32 = 100;
const MAX_LOOKUP_CONCURRENCY: usize = 64;

/// Configuration for a [`Paginator`].
///
/// ## Example
///
/// ```rust
/// use nvisy_paginator::PaginatorConfig;
///
/// let config = PaginatorConfig::default()
///     .with_max_page_size(50)
///     .with_lookup_concurrency(2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "paginator configurations must be used to create paginators"]
pub struct PaginatorConfig {
    /// Salt prepended to record identifiers before cursor encoding
    #[cfg_attr(
        feature = "config",
        arg(
            long = "paginator-cursor-salt",
            env = "PAGINATOR_CURSOR_SALT",
            default_value = DEFAULT_SALT
        )
    )]
    #[serde(default = "default_cursor_salt")]
    pub cursor_salt: String,

    /// Largest page size a request may ask for (1-1000)
    #[cfg_attr(
        feature = "config",
        arg(
            long = "paginator-max-page-size",
            env = "PAGINATOR_MAX_PAGE_SIZE",
            default_value = "100"
        )
    )]
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Largest number of page buttons a request may ask for (1-100)
    #[cfg_attr(
        feature = "config",
        arg(
            long = "paginator-max-button-count",
            env = "PAGINATOR_MAX_BUTTON_COUNT",
            default_value = "20"
        )
    )]
    #[serde(default = "default_max_button_count")]
    pub max_button_count: u32,

    /// Number of page boundary lookups issued concurrently (1-64)
    #[cfg_attr(
        feature = "config",
        arg(
            long = "paginator-lookup-concurrency",
            env = "PAGINATOR_LOOKUP_CONCURRENCY",
            default_value = "4"
        )
    )]
    #[serde(default = "default_lookup_concurrency")]
    pub lookup_concurrency: usize,
}

fn default_cursor_salt() -> String {
    DEFAULT_SALT.to_owned()
}

fn default_max_page_size() -> u32 {
    DEFAULT_MAX_PAGE_SIZE
}

fn default_max_button_count() -> u32 {
    DEFAULT_MAX_BUTTON_COUNT
}

fn default_lookup_concurrency() -> usize {
    DEFAULT_LOOKUP_CONCURRENCY
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            cursor_salt: default_cursor_salt(),
            max_page_size: default_max_page_size(),
            max_button_count: default_max_button_count(),
            lookup_concurrency: default_lookup_concurrency(),
        }
    }
}

impl PaginatorConfig {
    /// Sets the cursor salt.
    pub fn with_cursor_salt(mut self, salt: impl Into<String>) -> Self {
        tracing::debug!(target: TRACING_TARGET_PAGINATOR, "Setting cursor salt");
        self.cursor_salt = salt.into();
        self
    }

    /// Sets the largest accepted page size.
    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        tracing::debug!(target: TRACING_TARGET_PAGINATOR, max_page_size, "Setting max page size");
        self.max_page_size = max_page_size;
        self
    }

    /// Sets the largest accepted button count.
    pub fn with_max_button_count(mut self, max_button_count: u32) -> Self {
        tracing::debug!(target: TRACING_TARGET_PAGINATOR, max_button_count, "Setting max button count");
        self.max_button_count = max_button_count;
        self
    }

    /// Sets the number of concurrent boundary lookups.
    pub fn with_lookup_concurrency(mut self, lookup_concurrency: usize) -> Self {
        tracing::debug!(target: TRACING_TARGET_PAGINATOR, lookup_concurrency, "Setting lookup concurrency");
        self.lookup_concurrency = lookup_concurrency;
        self
    }

    /// Returns the cursor codec for the configured salt.
    pub fn codec(&self) -> CursorCodec {
        CursorCodec::new(self.cursor_salt.clone())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> PaginatorResult<()> {
        if self.cursor_salt.is_empty() {
            return Err(PaginatorError::Config(
                "cursor_salt cannot be empty".to_owned(),
            ));
        }

        if !(1..=MAX_PAGE_SIZE_LIMIT).contains(&self.max_page_size) {
            return Err(PaginatorError::Config(format!(
                "max_page_size must be between 1 and {MAX_PAGE_SIZE_LIMIT}"
            )));
        }

        if !(1..=MAX_BUTTON_COUNT_LIMIT).contains(&self.max_button_count) {
            return Err(PaginatorError::Config(format!(
                "max_button_count must be between 1 and {MAX_BUTTON_COUNT_LIMIT}"
            )));
        }

        if !(1..=MAX_LOOKUP_CONCURRENCY).contains(&self.lookup_concurrency) {
            return Err(PaginatorError::Config(format!(
                "lookup_concurrency must be between 1 and {MAX_LOOKUP_CONCURRENCY}"
            )));
        }

        Ok(())
    }

    /// Builds a paginator over the given record source.
    ///
    /// Validates the configuration first.
    #[tracing::instrument(skip_all, target = TRACING_TARGET_PAGINATOR)]
    pub fn build<S: RecordSource>(self, source: S) -> PaginatorResult<Paginator<S>> {
        self.validate()?;
        Ok(Paginator::with_config(source, self))
    }
}

impl fmt::Debug for PaginatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaginatorConfig")
            .field("cursor_salt", &"***")
            .field("max_page_size", &self.max_page_size)
            .field("max_button_count", &self.max_button_count)
            .field("lookup_concurrency", &self.lookup_concurrency)
            .finish()
    }
}
