use fleetmap_contracts::{ResolveError, files::FileUrlResolver};
use fleetmap_model::RawRecord;
use url::Url;

const COLLECTION_ID: &str = "collectionId";
const COLLECTION_NAME: &str = "collectionName";

/// Builds `{base}/api/files/{collection}/{record}/{file}?thumb={WxH}`.
#[derive(Debug, Clone)]
pub struct PocketBaseFiles {
    base_url: Url,
}

impl PocketBaseFiles {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }
}

impl FileUrlResolver for PocketBaseFiles {
    fn file_url(
        &self,
        record: &RawRecord,
        file_name: &str,
        thumb: Option<&str>,
    ) -> Result<String, ResolveError> {
        if file_name.is_empty() {
            return Err(ResolveError::EmptyFileName);
        }
        let collection = record
            .non_empty_str(COLLECTION_ID)
            .or_else(|| record.non_empty_str(COLLECTION_NAME))
            .ok_or(ResolveError::MissingField(COLLECTION_ID))?;
        let id = record
            .non_empty_str("id")
            .ok_or(ResolveError::MissingField("id"))?;

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ResolveError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "files", collection, id, file_name]);
        if let Some(thumb) = thumb.filter(|thumb| !thumb.is_empty()) {
            url.query_pairs_mut().append_pair("thumb", thumb);
        }
        Ok(url.into())
    }
}
