use crate::error::Result;
use crate::models::{CategoryCounts, ClassificationRecord, DbUser, NewClassification, NewUser};

/// Append-only access to users and their classification history.
///
/// No update or delete operations exist.
#[cfg_attr(test, mockall::automock)]
pub trait RecordStore: Send + Sync {
    /// Insert the user if no row has this external id yet; return the row id
    /// either way. Existing rows are never modified.
    fn upsert_user(&self, user: &NewUser) -> Result<i64>;

    /// Look up a user by identity provider subject id
    fn find_user(&self, external_id: &str) -> Result<Option<DbUser>>;

    /// Append one classification record.
    ///
    /// The referenced user must already exist and the confidence must lie in
    /// [0, 100]; violations are rejected without writing anything.
    fn insert_classification(&self, new: &NewClassification) -> Result<ClassificationRecord>;

    /// Count a user's classifications grouped by category
    fn aggregate_by_category(&self, user_id: i64) -> Result<CategoryCounts>;

    /// Most recent classifications for a user, newest first
    fn recent_classifications(&self, user_id: i64, limit: usize) -> Result<Vec<ClassificationRecord>>;
}
