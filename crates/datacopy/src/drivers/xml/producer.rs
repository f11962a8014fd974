use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tracing::{debug, info};
use zip::ZipArchive;

use super::format::TableReader;
use super::{is_document, XmlFormat};
use crate::core::{Producer, RecordStream, Schema};
use crate::error::{CopyError, Result};

/// Reads table documents from an archive or a directory.
pub struct XmlProducer {
    path: PathBuf,
    format: XmlFormat,
    archive: Option<ZipArchive<BufReader<File>>>,
    schema: Option<Schema>,
    /// Entry or file name per table, in schema order.
    documents: Vec<String>,
}

impl XmlProducer {
    pub fn new(path: impl Into<PathBuf>, format: XmlFormat) -> Self {
        Self {
            path: path.into(),
            format,
            archive: None,
            schema: None,
            documents: Vec::new(),
        }
    }

    fn resource(&self) -> String {
        self.path.display().to_string()
    }

    fn open_archive(&mut self) -> Result<Vec<crate::core::Table>> {
        let file = File::open(&self.path).map_err(|e| CopyError::open(self.resource(), e))?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| CopyError::open(self.resource(), e))?;

        let mut tables = Vec::new();
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            if entry.is_dir() || !is_document(entry.name()) {
                continue;
            }
            let name = entry.name().to_string();
            let table = TableReader::new(BufReader::new(entry), stem(&name))?.into_table();
            debug!("{}: found in entry {}", table.name, name);
            tables.push(table);
            self.documents.push(name);
        }

        self.archive = Some(archive);
        Ok(tables)
    }

    fn open_directory(&mut self) -> Result<Vec<crate::core::Table>> {
        let entries =
            std::fs::read_dir(&self.path).map_err(|e| CopyError::open(self.resource(), e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_file() && is_document(&name) {
                names.push(name);
            }
        }
        names.sort();

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let file = File::open(self.path.join(&name))
                .map_err(|e| CopyError::open(self.path.join(&name).display().to_string(), e))?;
            let table = TableReader::new(BufReader::new(file), stem(&name))?.into_table();
            debug!("{}: found in file {}", table.name, name);
            tables.push(table);
            self.documents.push(name);
        }
        Ok(tables)
    }

    fn document(&mut self, table: &str) -> Result<Box<dyn BufRead + Send>> {
        let schema = self.schema()?;
        let index = schema
            .tables()
            .iter()
            .position(|t| t.is_named(table))
            .ok_or_else(|| CopyError::transfer(table, "no such table in the XML data set"))?;
        let name = self.documents[index].clone();

        match (self.format, self.archive.as_mut()) {
            (XmlFormat::Archive, Some(archive)) => {
                // entries are read whole; a zip entry cannot outlive its borrow of the archive
                let mut entry = archive.by_name(&name)?;
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut bytes)?;
                Ok(Box::new(Cursor::new(bytes)))
            }
            (XmlFormat::Directory, _) => {
                let file = File::open(self.path.join(&name))?;
                Ok(Box::new(BufReader::new(file)))
            }
            (XmlFormat::Archive, None) => {
                Err(CopyError::Lifecycle("archive read before open".into()))
            }
        }
    }
}

fn stem(name: &str) -> &str {
    let file = name.rsplit('/').next().unwrap_or(name);
    Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file)
}

#[async_trait]
impl Producer for XmlProducer {
    fn describe(&self) -> String {
        format!("XML {} [{}]", self.format, self.path.display())
    }

    async fn open(&mut self) -> Result<()> {
        self.documents.clear();
        let tables = match self.format {
            XmlFormat::Archive => self.open_archive()?,
            XmlFormat::Directory => self.open_directory()?,
        };
        info!("Opened {} with {} tables", self.describe(), tables.len());
        self.schema = Some(Schema::new(tables)?);
        Ok(())
    }

    fn schema(&self) -> Result<&Schema> {
        self.schema
            .as_ref()
            .ok_or_else(|| CopyError::Lifecycle("XML schema read before open".into()))
    }

    fn records(&mut self, table: &str) -> Result<RecordStream<'_>> {
        let source = self.document(table)?;
        let reader = TableReader::new(source, table)?;

        Ok(stream::try_unfold(reader, |mut reader| async move {
            let next = reader.next_record()?;
            Ok::<_, CopyError>(next.map(|record| (record, reader)))
        })
        .boxed())
    }

    async fn close(&mut self) -> Result<()> {
        self.archive = None;
        self.schema = None;
        self.documents.clear();
        Ok(())
    }
}
