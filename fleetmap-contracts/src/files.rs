use crate::error::ResolveError;

use fleetmap_model::RawRecord;
use std::fmt;

/// Turns a file attached to a record into a displayable URL.
pub trait FileUrlResolver: Send + Sync + fmt::Debug {
    /// `thumb` is a backend-specific size hint such as `"100x100"`.
    fn file_url(
        &self,
        record: &RawRecord,
        file_name: &str,
        thumb: Option<&str>,
    ) -> Result<String, ResolveError>;
}
