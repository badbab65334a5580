//! Database-specific error types and conversions.

use upkeep_core::error::{ConflictReason, UpkeepError};

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Statement failed: {0}")]
    Query(String),

    #[error("Duplicate {entity}: {detail}")]
    Duplicate { entity: String, detail: String },

    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    /// Classify a failed statement. Unique-index violations and retryable
    /// transaction conflicts are recognised from the engine's message.
    pub(crate) fn statement(entity: &str, err: impl std::fmt::Display) -> Self {
        let detail = err.to_string();
        if detail.contains("already contains") {
            DbError::Duplicate {
                entity: entity.to_string(),
                detail,
            }
        } else if detail.contains("Transaction conflict:")
            || detail.contains("This transaction can be retried")
        {
            DbError::WriteConflict(detail)
        } else {
            DbError::Query(detail)
        }
    }

    /// Classify a failed transaction. When one statement fails the
    /// engine marks every other one as not executed, so the most
    /// specific error among them is kept.
    pub(crate) fn transaction<E: std::fmt::Display>(
        entity: &str,
        errors: impl IntoIterator<Item = E>,
    ) -> Option<Self> {
        let mut found: Option<DbError> = None;
        for err in errors {
            let classified = Self::statement(entity, err);
            if found
                .as_ref()
                .is_none_or(|f| f.specificity() < classified.specificity())
            {
                found = Some(classified);
            }
        }
        found
    }

    fn specificity(&self) -> u8 {
        match self {
            DbError::Duplicate { .. } | DbError::WriteConflict(_) => 2,
            DbError::Query(detail) if !detail.contains("not executed") => 1,
            _ => 0,
        }
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn corrupt(what: &str, err: impl std::fmt::Display) -> Self {
        DbError::Corrupt(format!("{what}: {err}"))
    }
}

impl From<DbError> for UpkeepError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => UpkeepError::NotFound { entity, id },
            DbError::Duplicate { entity, .. } => {
                UpkeepError::Conflict(ConflictReason::Duplicate { entity })
            }
            DbError::WriteConflict(detail) => {
                UpkeepError::Conflict(ConflictReason::Concurrent { detail })
            }
            DbError::Surreal(e) => match DbError::statement("record", &e) {
                DbError::Surreal(_) | DbError::Query(_) => UpkeepError::Database(e.to_string()),
                classified => classified.into(),
            },
            other => UpkeepError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_index_violation_is_a_duplicate_conflict() {
        let err = DbError::statement(
            "asset",
            "Database index `idx_asset_tenant_tag` already contains ['t', 'A-1']",
        );
        let err: UpkeepError = err.into();
        assert!(matches!(
            err,
            UpkeepError::Conflict(ConflictReason::Duplicate { ref entity }) if entity == "asset"
        ));
    }

    #[test]
    fn retryable_transaction_is_a_concurrent_conflict() {
        let err = DbError::statement("asset", "Failed to commit transaction due to a read or write conflict. This transaction can be retried");
        assert!(UpkeepError::from(err).is_conflict());
    }

    #[test]
    fn unrelated_mentions_of_conflict_stay_database_errors() {
        let err = DbError::statement(
            "asset",
            "Found 'conflict' for field `status`, but expected a string enum",
        );
        assert!(matches!(UpkeepError::from(err), UpkeepError::Database(_)));
    }

    #[test]
    fn failed_commit_reports_the_conflict_not_the_skipped_statements() {
        let err = DbError::transaction(
            "asset",
            [
                "The query was not executed due to a failed transaction",
                "Cannot COMMIT: Transaction conflict: Key write conflict. This transaction can be retried",
                "The query was not executed due to a failed transaction",
            ],
        );
        assert!(matches!(err, Some(DbError::WriteConflict(_))));
    }

    #[test]
    fn failed_statement_inside_a_transaction_is_reported() {
        let err = DbError::transaction(
            "asset",
            [
                "The query was not executed due to a failed transaction",
                "Database index `idx_asset_tenant_tag` already contains ['t', 'A-1']",
            ],
        )
        .unwrap();
        assert!(matches!(err, DbError::Duplicate { .. }));
        assert!(DbError::transaction("asset", Vec::<String>::new()).is_none());
    }

    #[test]
    fn other_failures_are_database_errors() {
        let err = DbError::statement("asset", "Found 'x' for field `status`");
        assert!(matches!(UpkeepError::from(err), UpkeepError::Database(_)));
        let err = DbError::corrupt("invalid UUID", "bad");
        assert!(matches!(UpkeepError::from(err), UpkeepError::Database(_)));
    }

    #[test]
    fn missing_rows_stay_not_found() {
        let err = DbError::not_found("location", "abc");
        assert!(matches!(UpkeepError::from(err), UpkeepError::NotFound { .. }));
    }
}
