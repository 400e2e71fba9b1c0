//! Batch lookup engine
//!
//! Runs one search per identifier over a single session and collects the
//! results into a [`ResultTable`].

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DirectoryConfig, SearchSpec};
use crate::error::{LookupError, LookupResult};
use crate::filter::build_filter;
use crate::session::{DirectorySession, SessionFactory};
use crate::table::{LookupFailure, ResultTable};

/// Drives batch lookups through a [`SessionFactory`].
#[derive(Debug, Clone, Default)]
pub struct BatchLookup<F> {
    factory: F,
}

impl<F: SessionFactory> BatchLookup<F> {
    /// Create a new engine over the given session factory.
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    /// Look up every identifier and return the result table.
    pub async fn run<S: AsRef<str>>(
        &self,
        config: &DirectoryConfig,
        spec: &SearchSpec,
        identifiers: &[S],
    ) -> LookupResult<ResultTable> {
        self.run_with_cancellation(config, spec, identifiers, &CancellationToken::new())
            .await
    }

    /// Like [`BatchLookup::run`], checking `cancel` between identifiers.
    ///
    /// A cancelled run returns [`LookupError::Cancelled`] carrying the rows
    /// accumulated so far.
    pub async fn run_with_cancellation<S: AsRef<str>>(
        &self,
        config: &DirectoryConfig,
        spec: &SearchSpec,
        identifiers: &[S],
        cancel: &CancellationToken,
    ) -> LookupResult<ResultTable> {
        spec.validate()?;
        let attributes = spec.effective_attributes();

        let start = Instant::now();
        let mut session = self.factory.open(config).await?;

        info!(
            base = %spec.base,
            field = %spec.field,
            identifiers = identifiers.len(),
            "Starting batch lookup"
        );

        let mut table = ResultTable::new(attributes.clone());
        let outcome =
            Self::lookup_all(&mut session, spec, &attributes, identifiers, cancel, &mut table).await;

        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close directory session");
        }

        match outcome {
            Ok(()) => {
                info!(
                    rows = table.rows().len(),
                    failures = table.failures().len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Batch lookup completed"
                );
                Ok(table)
            }
            Err(LookupError::Cancelled { .. }) => {
                info!(rows = table.rows().len(), "Batch lookup cancelled");
                Err(LookupError::Cancelled {
                    partial: Box::new(table),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn lookup_all<S: AsRef<str>>(
        session: &mut F::Session,
        spec: &SearchSpec,
        attributes: &[String],
        identifiers: &[S],
        cancel: &CancellationToken,
        table: &mut ResultTable,
    ) -> LookupResult<()> {
        for (index, identifier) in identifiers.iter().enumerate() {
            let identifier = identifier.as_ref().trim();
            if identifier.is_empty() {
                continue;
            }

            if cancel.is_cancelled() {
                return Err(LookupError::Cancelled {
                    partial: Box::default(),
                });
            }

            match Self::lookup_one(session, spec, attributes, identifier).await {
                Ok(rows) => {
                    debug!(identifier = %identifier, entries = rows.len(), "Identifier resolved");
                    for row in rows {
                        table.push_row(row);
                    }
                }
                Err(e) if !e.is_fatal() => {
                    warn!(
                        identifier = %identifier,
                        error = %e,
                        "Lookup failed, continuing with next identifier"
                    );
                    table.push_failure(LookupFailure::new(index, identifier, &e));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    async fn lookup_one(
        session: &mut F::Session,
        spec: &SearchSpec,
        attributes: &[String],
        identifier: &str,
    ) -> LookupResult<Vec<Vec<String>>> {
        let filter = build_filter(&spec.field, identifier)?;
        let entries = session.search(&spec.base, &filter, attributes).await?;

        // The match column shows the identifier as submitted, not the
        // entry's own value for that attribute.
        Ok(entries
            .iter()
            .map(|entry| {
                std::iter::once(identifier.to_string())
                    .chain(
                        attributes[1..]
                            .iter()
                            .map(|attr| entry.project(attr, &spec.multi_value_separator)),
                    )
                    .collect()
            })
            .collect())
    }
}
