use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::format::write_table;
use super::{document_name, XmlFormat};
use crate::core::{CloseState, Consumer, RecordStream, Schema, Table};
use crate::error::{CopyError, Result};

/// Writes one document per table into an archive or a directory.
pub struct XmlConsumer {
    path: PathBuf,
    format: XmlFormat,
    archive: Option<ZipWriter<BufWriter<File>>>,
    opened: bool,
}

impl XmlConsumer {
    pub fn new(path: impl Into<PathBuf>, format: XmlFormat) -> Self {
        Self {
            path: path.into(),
            format,
            archive: None,
            opened: false,
        }
    }

    fn resource(&self) -> String {
        self.path.display().to_string()
    }
}

#[async_trait]
impl Consumer for XmlConsumer {
    fn describe(&self) -> String {
        format!("XML {} [{}]", self.format, self.path.display())
    }

    async fn open(&mut self, source: &Schema) -> Result<()> {
        match self.format {
            XmlFormat::Archive => {
                let file =
                    File::create(&self.path).map_err(|e| CopyError::open(self.resource(), e))?;
                self.archive = Some(ZipWriter::new(BufWriter::new(file)));
            }
            XmlFormat::Directory => {
                if !self.path.is_dir() {
                    return Err(CopyError::open(self.resource(), "not a directory"));
                }
            }
        }
        self.opened = true;
        info!("Writing {} tables to {}", source.len(), self.describe());
        Ok(())
    }

    async fn table(&mut self, table: &Table, records: RecordStream<'_>) -> Result<()> {
        if !self.opened {
            return Err(CopyError::Lifecycle("XML consumer used before open".into()));
        }
        let name = document_name(&table.name);

        let count = match self.archive.as_mut() {
            Some(archive) => {
                let options =
                    FileOptions::default().compression_method(CompressionMethod::Deflated);
                archive.start_file(name.as_str(), options)?;
                write_table(archive, table, records).await?
            }
            None => {
                let file = File::create(self.path.join(&name))?;
                let mut out = BufWriter::new(file);
                let count = write_table(&mut out, table, records).await?;
                out.flush()?;
                count
            }
        };

        debug!("{}: wrote {} records to {}", table.name, count, name);
        Ok(())
    }

    async fn close(&mut self, state: CloseState) -> Result<()> {
        let was_open = std::mem::replace(&mut self.opened, false);
        if let Some(mut archive) = self.archive.take() {
            let mut file = archive.finish()?;
            file.flush()?;
        }
        if was_open && state == CloseState::Incomplete {
            warn!("{} holds an incomplete data set", self.describe());
        }
        Ok(())
    }
}
