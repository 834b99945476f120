//! File records and their binary attachments.

use std::sync::Arc;

use chrono::Utc;
use wikifeat_core::pagination::Pagination;
use wikifeat_core::wiki::{wiki_db_name, DOC_TYPE_FILE};
use wikifeat_db::indexes::WikiIndex;
use wikifeat_db::models::{FileRecord, Paged};
use wikifeat_db::store::{AttachmentData, IndexQuery, Reduce};
use wikifeat_db::DocumentStore;

use crate::error::{NotFoundExt, WikiError, WikiResult};
use crate::queries::fetch_page;

pub struct FileManager<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> FileManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create (empty `rev`) or update a file record's metadata.
    ///
    /// Updates keep the attachments already stored on the record.
    pub async fn save_record(
        &self,
        wiki: &str,
        mut file: FileRecord,
        id: &str,
        rev: &str,
        uploaded_by: &str,
    ) -> WikiResult<String> {
        let db = wiki_db_name(wiki);

        file.id = id.to_string();
        file.doc_type = DOC_TYPE_FILE.to_string();
        file.uploaded_by = uploaded_by.to_string();
        file.timestamp = Utc::now();
        file.validate()?;

        let rev = if rev.is_empty() {
            file.attachments.clear();
            None
        } else {
            let (stored, _) = self.read_record(wiki, id).await?;
            file.keep_attachments(stored.attachments);
            Some(rev)
        };

        let new_rev = self.store.put(&db, id, &to_body(&file)?, rev).await?;
        tracing::info!(db = %db, file_id = id, name = %file.name, uploaded_by, "File record saved");
        Ok(new_rev)
    }

    pub async fn read_record(&self, wiki: &str, id: &str) -> WikiResult<(FileRecord, String)> {
        let db = wiki_db_name(wiki);
        let (body, rev) = self.store.get(&db, id).await.or_not_found("file", id)?;
        let mut file: FileRecord = serde_json::from_value(body)?;
        file.id = id.to_string();
        Ok((file, rev))
    }

    /// Delete a file record and its attachments at the current revision.
    pub async fn delete_record(&self, wiki: &str, id: &str) -> WikiResult<String> {
        let db = wiki_db_name(wiki);
        let (_, rev) = self.read_record(wiki, id).await?;
        let deleted_rev = self.store.delete(&db, id, &rev).await?;
        tracing::info!(db = %db, file_id = id, "File record deleted");
        Ok(deleted_rev)
    }

    /// Store binary content on the record at revision `rev`.
    pub async fn save_attachment(
        &self,
        wiki: &str,
        id: &str,
        rev: &str,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> WikiResult<String> {
        if name.is_empty() {
            return Err(WikiError::validation("Attachment name must not be empty"));
        }
        let db = wiki_db_name(wiki);
        let size = data.len();
        let new_rev = self
            .store
            .put_attachment(&db, id, rev, name, content_type, data)
            .await
            .or_not_found("file", id)?;
        tracing::info!(db = %db, file_id = id, attachment = name, size, "Attachment saved");
        Ok(new_rev)
    }

    /// Fetch an attachment, optionally at a specific record revision.
    pub async fn get_attachment(
        &self,
        wiki: &str,
        id: &str,
        rev: Option<&str>,
        name: &str,
    ) -> WikiResult<AttachmentData> {
        let db = wiki_db_name(wiki);
        self.store
            .get_attachment(&db, id, rev, name)
            .await
            .or_not_found("attachment", name)
    }

    pub async fn delete_attachment(
        &self,
        wiki: &str,
        id: &str,
        rev: &str,
        name: &str,
    ) -> WikiResult<String> {
        let db = wiki_db_name(wiki);
        let new_rev = self
            .store
            .delete_attachment(&db, id, rev, name)
            .await
            .or_not_found("attachment", name)?;
        tracing::info!(db = %db, file_id = id, attachment = name, "Attachment deleted");
        Ok(new_rev)
    }

    /// All file records of a wiki, ordered by name.
    pub async fn index(&self, wiki: &str, pagination: Pagination) -> WikiResult<Paged<FileRecord>> {
        self.list(wiki, WikiIndex::FileIndex, pagination).await
    }

    /// File records carrying an image attachment, ordered by name.
    pub async fn image_index(
        &self,
        wiki: &str,
        pagination: Pagination,
    ) -> WikiResult<Paged<FileRecord>> {
        self.list(wiki, WikiIndex::ImageFileIndex, pagination).await
    }

    async fn list(
        &self,
        wiki: &str,
        index: WikiIndex,
        pagination: Pagination,
    ) -> WikiResult<Paged<FileRecord>> {
        let db = wiki_db_name(wiki);
        let (total, rows) = fetch_page(
            self.store.as_ref(),
            &db,
            index,
            IndexQuery::new(),
            Reduce::Count,
            pagination,
        )
        .await?;

        let files = rows
            .into_iter()
            .map(|row| -> WikiResult<FileRecord> {
                let mut file: FileRecord = serde_json::from_value(row.value)?;
                if let Some(id) = row.id {
                    file.id = id;
                }
                Ok(file)
            })
            .collect::<WikiResult<Vec<_>>>()?;
        Ok(Paged::new(total, files))
    }
}

fn to_body(file: &FileRecord) -> WikiResult<serde_json::Value> {
    let mut body = serde_json::to_value(file)?;
    if let Some(obj) = body.as_object_mut() {
        obj.remove("id");
    }
    Ok(body)
}
