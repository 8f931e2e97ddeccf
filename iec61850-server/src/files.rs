//! File services rooted in a configured directory

use crate::association::ServerAssociation;
use chrono::{DateTime, Utc};
use iec61850_codec::{
    ConfirmedResponse, DirectoryEntry, FileAttributes, FileDirectoryRequest, FileDirectoryResponse,
    FileOpenRequest, FileOpenResponse, FileReadResponse,
};
use iec61850_core::{ErrorCode, ServiceError};
use std::collections::HashMap;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Component, Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Bytes of a PDU not available for file data or directory entries
const PDU_OVERHEAD: u32 = 200;
/// Estimated encoding overhead of one directory entry besides its name
const DIRECTORY_ENTRY_OVERHEAD: usize = 40;

/// Files opened by one association, keyed by FRSM id
#[derive(Debug)]
pub(crate) struct FileStates {
    root: Option<PathBuf>,
    open: HashMap<i32, File>,
    next_frsm_id: i32,
}

impl FileStates {
    pub(crate) fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            open: HashMap::new(),
            next_frsm_id: 1,
        }
    }

    /// Path of a file name below the root
    ///
    /// # Errors
    ///
    /// Returns `AccessViolation` without a root directory or for names that
    /// leave it
    fn resolve(&self, name: &str) -> Result<PathBuf, ServiceError> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| ServiceError::access_violation("file services are not available"))?;
        let relative = Path::new(name.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ServiceError::access_violation(format!("invalid file name {}", name)));
        }
        Ok(root.join(relative))
    }

    fn insert(&mut self, file: File) -> i32 {
        let id = self.next_frsm_id;
        self.next_frsm_id = self.next_frsm_id.wrapping_add(1).max(1);
        self.open.insert(id, file);
        id
    }

    pub(crate) fn close_all(&mut self) {
        self.open.clear();
    }
}

fn io_error(name: &str, error: std::io::Error) -> ServiceError {
    match error.kind() {
        ErrorKind::NotFound => {
            ServiceError::new(ErrorCode::FileNoneExistent, format!("{} does not exist", name))
        }
        ErrorKind::PermissionDenied => ServiceError::access_violation(format!("{}: {}", name, error)),
        _ => ServiceError::server_constraint(format!("{}: {}", name, error)),
    }
}

fn attributes(metadata: &std::fs::Metadata) -> FileAttributes {
    FileAttributes {
        size_of_file: u32::try_from(metadata.len()).unwrap_or(u32::MAX),
        last_modified: metadata.modified().ok().map(|time| {
            DateTime::<Utc>::from(time)
                .format("%Y%m%d%H%M%S%.3fZ")
                .to_string()
        }),
    }
}

fn unknown_frsm(frsm_id: i32) -> ServiceError {
    ServiceError::instance_not_available(format!("no open file with FRSM id {}", frsm_id))
}

impl ServerAssociation {
    fn file_chunk_size(&self) -> usize {
        self.max_pdu_size.saturating_sub(PDU_OVERHEAD).max(1) as usize
    }

    pub(crate) async fn file_open(&mut self, request: FileOpenRequest) -> Result<ConfirmedResponse, ServiceError> {
        let path = self.files.resolve(&request.file_name)?;
        let mut file = File::open(&path)
            .await
            .map_err(|e| io_error(&request.file_name, e))?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| io_error(&request.file_name, e))?;
        if metadata.is_dir() {
            return Err(ServiceError::access_violation(format!(
                "{} is a directory",
                request.file_name
            )));
        }
        if request.initial_position > 0 {
            file.seek(SeekFrom::Start(u64::from(request.initial_position)))
                .await
                .map_err(|e| io_error(&request.file_name, e))?;
        }
        let frsm_id = self.files.insert(file);
        log::debug!("{}: opened {} as {}", self.context.id(), request.file_name, frsm_id);
        Ok(ConfirmedResponse::FileOpen(FileOpenResponse {
            frsm_id,
            attributes: attributes(&metadata),
        }))
    }

    pub(crate) async fn file_read(&mut self, frsm_id: i32) -> Result<ConfirmedResponse, ServiceError> {
        let chunk = self.file_chunk_size();
        let file = self.files.open.get_mut(&frsm_id).ok_or_else(|| unknown_frsm(frsm_id))?;
        let mut data = vec![0u8; chunk];
        let mut filled = 0;
        while filled < chunk {
            let n = file
                .read(&mut data[filled..])
                .await
                .map_err(|e| ServiceError::server_constraint(e.to_string()))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        data.truncate(filled);
        Ok(ConfirmedResponse::FileRead(FileReadResponse {
            more_follows: filled == chunk,
            data,
        }))
    }

    pub(crate) fn file_close(&mut self, frsm_id: i32) -> Result<ConfirmedResponse, ServiceError> {
        self.files.open.remove(&frsm_id).ok_or_else(|| unknown_frsm(frsm_id))?;
        Ok(ConfirmedResponse::FileClose)
    }

    pub(crate) async fn file_directory(
        &mut self,
        request: FileDirectoryRequest,
    ) -> Result<ConfirmedResponse, ServiceError> {
        let specification = request.file_specification.unwrap_or_default();
        let path = self.files.resolve(&specification)?;
        let prefix = specification.trim_matches('/');

        let mut entries = Vec::new();
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_error(&specification, e))?;
        if metadata.is_dir() {
            let mut read_dir = tokio::fs::read_dir(&path)
                .await
                .map_err(|e| io_error(&specification, e))?;
            while let Some(entry) = read_dir
                .next_entry()
                .await
                .map_err(|e| io_error(&specification, e))?
            {
                let Ok(metadata) = entry.metadata().await else {
                    continue;
                };
                let name = entry.file_name().to_string_lossy().into_owned();
                let file_name = if prefix.is_empty() {
                    name
                } else {
                    format!("{}/{}", prefix, name)
                };
                entries.push(DirectoryEntry {
                    file_name,
                    attributes: attributes(&metadata),
                });
            }
        } else {
            entries.push(DirectoryEntry {
                file_name: prefix.to_string(),
                attributes: attributes(&metadata),
            });
        }
        entries.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        if let Some(after) = &request.continue_after {
            entries.retain(|entry| entry.file_name.as_str() > after.as_str());
        }

        let budget = self.file_chunk_size();
        let mut used = 0;
        let mut more_follows = false;
        let mut page = Vec::new();
        for entry in entries {
            let size = entry.file_name.len() + DIRECTORY_ENTRY_OVERHEAD;
            if used + size > budget && !page.is_empty() {
                more_follows = true;
                break;
            }
            used += size;
            page.push(entry);
        }
        Ok(ConfirmedResponse::FileDirectory(FileDirectoryResponse {
            entries: page,
            more_follows,
        }))
    }

    pub(crate) async fn file_delete(&mut self, name: &str) -> Result<ConfirmedResponse, ServiceError> {
        let path = self.files.resolve(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| io_error(name, e))?;
        log::info!("{}: deleted file {}", self.context.id(), name);
        Ok(ConfirmedResponse::FileDelete)
    }
}
