//! File services

use crate::association::ClientAssociation;
use iec61850_codec::{ConfirmedRequest, ConfirmedResponse, DirectoryEntry, FileDirectoryRequest, FileOpenRequest};
use iec61850_core::Iec61850Result;

impl ClientAssociation {
    /// List a directory on the server, following continuation
    ///
    /// # Arguments
    ///
    /// * `directory` - directory to list, `None` for the file root
    pub async fn get_file_directory(&mut self, directory: Option<&str>) -> Iec61850Result<Vec<DirectoryEntry>> {
        let mut entries: Vec<DirectoryEntry> = Vec::new();
        let mut continue_after = None;
        loop {
            let request = ConfirmedRequest::FileDirectory(FileDirectoryRequest {
                file_specification: directory.map(str::to_string),
                continue_after: continue_after.take(),
            });
            let ConfirmedResponse::FileDirectory(response) = self.request(request).await? else {
                return Err(self.malformed("FileDirectory"));
            };
            entries.extend(response.entries);
            match entries.last() {
                Some(last) if response.more_follows => continue_after = Some(last.file_name.clone()),
                _ => return Ok(entries),
            }
        }
    }

    /// Read a file block by block.
    ///
    /// `on_data` receives every block as it arrives and returns whether to
    /// continue; the file is closed on the server either way.
    ///
    /// # Errors
    ///
    /// Returns `FileNoneExistent` if the server has no such file, and the
    /// failure of the first failing read otherwise
    pub async fn get_file<F>(&mut self, file_name: &str, mut on_data: F) -> Iec61850Result<()>
    where
        F: FnMut(&[u8]) -> bool,
    {
        let request = ConfirmedRequest::FileOpen(FileOpenRequest {
            file_name: file_name.to_string(),
            initial_position: 0,
        });
        let ConfirmedResponse::FileOpen(opened) = self.request(request).await? else {
            return Err(self.malformed("FileOpen"));
        };
        let frsm_id = opened.frsm_id;
        log::debug!("reading {} ({} bytes)", file_name, opened.attributes.size_of_file);

        let read = self.read_blocks(frsm_id, &mut on_data).await;
        let closed = match self.request(ConfirmedRequest::FileClose(frsm_id)).await {
            Ok(ConfirmedResponse::FileClose) => Ok(()),
            Ok(_) => Err(self.malformed("FileClose")),
            Err(e) => Err(e),
        };
        read.and(closed)
    }

    async fn read_blocks<F>(&mut self, frsm_id: i32, on_data: &mut F) -> Iec61850Result<()>
    where
        F: FnMut(&[u8]) -> bool,
    {
        loop {
            let ConfirmedResponse::FileRead(block) = self.request(ConfirmedRequest::FileRead(frsm_id)).await? else {
                return Err(self.malformed("FileRead"));
            };
            if !on_data(&block.data) || !block.more_follows {
                return Ok(());
            }
        }
    }

    pub async fn delete_file(&mut self, file_name: &str) -> Iec61850Result<()> {
        match self
            .request(ConfirmedRequest::FileDelete(file_name.to_string()))
            .await?
        {
            ConfirmedResponse::FileDelete => Ok(()),
            _ => Err(self.malformed("FileDelete")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::association::tests::connect;
    use iec61850_codec::{
        ConfirmedRequest, ConfirmedResponse, DirectoryEntry, FileAttributes, FileDirectoryResponse,
        FileOpenResponse, FileReadResponse,
    };

    fn entry(name: &str) -> DirectoryEntry {
        DirectoryEntry {
            file_name: name.to_string(),
            attributes: FileAttributes {
                size_of_file: 10,
                last_modified: None,
            },
        }
    }

    #[tokio::test]
    async fn test_directory_continuation() {
        let (mut association, mut peer) = connect(None).await;
        let server = tokio::spawn(async move {
            let first = ConfirmedResponse::FileDirectory(FileDirectoryResponse {
                entries: vec![entry("a.cfg")],
                more_follows: true,
            });
            peer.respond(first).await;
            let second = ConfirmedResponse::FileDirectory(FileDirectoryResponse {
                entries: vec![entry("b.cfg")],
                more_follows: false,
            });
            let ConfirmedRequest::FileDirectory(request) = peer.respond(second).await else {
                panic!("expected a file directory request");
            };
            assert_eq!(request.continue_after.as_deref(), Some("a.cfg"));
            peer
        });
        let entries = association.get_file_directory(None).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.cfg", "b.cfg"]);
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_get_file_stops_early_and_closes() {
        let (mut association, mut peer) = connect(None).await;
        let server = tokio::spawn(async move {
            let opened = ConfirmedResponse::FileOpen(FileOpenResponse {
                frsm_id: 3,
                attributes: FileAttributes {
                    size_of_file: 8,
                    last_modified: None,
                },
            });
            peer.respond(opened).await;
            let block = ConfirmedResponse::FileRead(FileReadResponse {
                data: vec![1, 2, 3, 4],
                more_follows: true,
            });
            peer.respond(block).await;
            let request = peer.respond(ConfirmedResponse::FileClose).await;
            assert_eq!(request, ConfirmedRequest::FileClose(3));
            peer
        });
        let mut received = Vec::new();
        association
            .get_file("rec1.dat", |data| {
                received.extend_from_slice(data);
                false
            })
            .await
            .unwrap();
        assert_eq!(received, vec![1, 2, 3, 4]);
        drop(server.await.unwrap());
    }
}
