//! Endpoints: configured handles to one backing store.
//!
//! An endpoint knows which roles its store can play and whether enough
//! configuration is present to play them. Readiness checks only look at
//! configuration and the filesystem; nothing is opened until a producer or
//! consumer built from the endpoint is itself opened.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::adapters::SchemaReconciling;
use crate::config::{DatabaseConfig, EndpointConfig, EndpointType};
use crate::core::{Consumer, Producer};
use crate::drivers::database::{
    display_url, DatabaseConsumer, DatabaseProducer, DatabaseSchemaEditor, Vendor,
};
use crate::drivers::spreadsheet::{SpreadsheetConsumer, SpreadsheetProducer};
use crate::drivers::xml::{XmlConsumer, XmlFormat, XmlProducer};
use crate::error::{CopyError, Result};

/// Backing-store variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Database,
    ArchivedFile,
    Directory,
    SpreadsheetSource,
    SpreadsheetTarget,
}

impl EndpointKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointKind::Database => "database",
            EndpointKind::ArchivedFile => "archived file",
            EndpointKind::Directory => "directory",
            EndpointKind::SpreadsheetSource => "spreadsheet source",
            EndpointKind::SpreadsheetTarget => "spreadsheet target",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseEndpoint {
    pub config: DatabaseConfig,
}

#[derive(Debug, Clone)]
pub struct XmlEndpoint {
    pub path: Option<PathBuf>,
    pub format: XmlFormat,
}

#[derive(Debug, Clone, Default)]
pub struct SpreadsheetSourceEndpoint {
    pub folder: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct SpreadsheetTargetEndpoint {
    pub file: Option<PathBuf>,
    pub configuration: Option<PathBuf>,
}

/// A configured backing store.
#[derive(Debug, Clone)]
pub enum Endpoint {
    Database(DatabaseEndpoint),
    Xml(XmlEndpoint),
    SpreadsheetSource(SpreadsheetSourceEndpoint),
    SpreadsheetTarget(SpreadsheetTargetEndpoint),
}

const PRODUCER: &str = "producer";
const CONSUMER: &str = "consumer";

impl Endpoint {
    /// Endpoint for the `source` side of a configuration.
    pub fn source(config: &EndpointConfig) -> Result<Self> {
        Self::from_config(config, true)
    }

    /// Endpoint for the `destination` side of a configuration.
    pub fn destination(config: &EndpointConfig) -> Result<Self> {
        Self::from_config(config, false)
    }

    fn from_config(config: &EndpointConfig, is_source: bool) -> Result<Self> {
        let missing = |section: &str| CopyError::Config(format!("{section} settings are required"));
        let endpoint = match config.endpoint_type {
            EndpointType::Database => Endpoint::Database(DatabaseEndpoint {
                config: config.database.clone().ok_or_else(|| missing("database"))?,
            }),
            EndpointType::Xml => {
                let xml = config.xml.as_ref().ok_or_else(|| missing("xml"))?;
                match (&xml.file, &xml.directory) {
                    (Some(file), None) => Endpoint::Xml(XmlEndpoint {
                        path: Some(file.clone()),
                        format: XmlFormat::Archive,
                    }),
                    (None, Some(directory)) => Endpoint::Xml(XmlEndpoint {
                        path: Some(directory.clone()),
                        format: XmlFormat::Directory,
                    }),
                    _ => {
                        return Err(CopyError::Config(
                            "xml needs exactly one of file or directory".into(),
                        ))
                    }
                }
            }
            EndpointType::Spreadsheet => {
                let spreadsheet = config
                    .spreadsheet
                    .as_ref()
                    .ok_or_else(|| missing("spreadsheet"))?;
                if is_source {
                    Endpoint::SpreadsheetSource(SpreadsheetSourceEndpoint {
                        folder: spreadsheet.folder.clone(),
                    })
                } else {
                    Endpoint::SpreadsheetTarget(SpreadsheetTargetEndpoint {
                        file: spreadsheet.file.clone(),
                        configuration: spreadsheet.configuration.clone(),
                    })
                }
            }
        };
        Ok(endpoint)
    }

    pub fn kind(&self) -> EndpointKind {
        match self {
            Endpoint::Database(_) => EndpointKind::Database,
            Endpoint::Xml(xml) => match xml.format {
                XmlFormat::Archive => EndpointKind::ArchivedFile,
                XmlFormat::Directory => EndpointKind::Directory,
            },
            Endpoint::SpreadsheetSource(_) => EndpointKind::SpreadsheetSource,
            Endpoint::SpreadsheetTarget(_) => EndpointKind::SpreadsheetTarget,
        }
    }

    fn unsupported(&self, role: &'static str) -> CopyError {
        CopyError::Unsupported {
            endpoint: self.kind().as_str(),
            role,
        }
    }

    /// Why this endpoint cannot act as a producer: an unsupported-operation
    /// error for a pure destination, a configuration error when not ready.
    pub fn check_producer(&self) -> Result<()> {
        match self {
            Endpoint::Database(db) => db.check(),
            Endpoint::Xml(xml) => {
                let path = xml.path()?;
                if !path.exists() {
                    return Err(not_ready(format!("{} does not exist", path.display())));
                }
                let want_dir = xml.format == XmlFormat::Directory;
                if path.is_dir() != want_dir {
                    return Err(not_ready(format!(
                        "{} is not an XML {}",
                        path.display(),
                        xml.format
                    )));
                }
                Ok(())
            }
            Endpoint::SpreadsheetSource(source) => match &source.folder {
                None => Err(not_ready("spreadsheet folder is not set")),
                Some(folder) if !folder.exists() => {
                    Err(not_ready(format!("{} does not exist", folder.display())))
                }
                Some(_) => Ok(()),
            },
            Endpoint::SpreadsheetTarget(_) => Err(self.unsupported(PRODUCER)),
        }
    }

    /// Why this endpoint cannot act as a consumer: an unsupported-operation
    /// error for a pure source, a configuration error when not ready.
    pub fn check_consumer(&self) -> Result<()> {
        match self {
            Endpoint::Database(db) => db.check(),
            Endpoint::Xml(xml) => {
                let path = xml.path()?;
                // an archive is created, so only its directory must exist
                let dir = match xml.format {
                    XmlFormat::Archive => parent_dir(path),
                    XmlFormat::Directory => path,
                };
                if dir.is_dir() {
                    Ok(())
                } else {
                    Err(not_ready(format!("{} is not a directory", dir.display())))
                }
            }
            Endpoint::SpreadsheetSource(_) => Err(self.unsupported(CONSUMER)),
            Endpoint::SpreadsheetTarget(target) => {
                let file = target
                    .file
                    .as_deref()
                    .ok_or_else(|| not_ready("spreadsheet output file is not set"))?;
                let dir = parent_dir(file);
                if !dir.is_dir() {
                    return Err(not_ready(format!("{} is not a directory", dir.display())));
                }
                match &target.configuration {
                    Some(configuration) if !configuration.is_file() => Err(not_ready(format!(
                        "{} does not exist",
                        configuration.display()
                    ))),
                    _ => Ok(()),
                }
            }
        }
    }

    pub fn can_create_producer(&self) -> bool {
        self.check_producer().is_ok()
    }

    pub fn can_create_consumer(&self) -> bool {
        self.check_consumer().is_ok()
    }

    /// A producer reading this store.
    pub fn as_producer(&self) -> Result<Box<dyn Producer>> {
        self.check_producer()?;
        let producer: Box<dyn Producer> = match self {
            Endpoint::Database(db) => Box::new(DatabaseProducer::new(db.config.clone())),
            Endpoint::Xml(xml) => Box::new(XmlProducer::new(xml.path()?, xml.format)),
            Endpoint::SpreadsheetSource(source) => {
                Box::new(SpreadsheetProducer::new(source.folder.clone().unwrap_or_default()))
            }
            Endpoint::SpreadsheetTarget(_) => return Err(self.unsupported(PRODUCER)),
        };
        Ok(producer)
    }

    /// A consumer writing this store. Databases with `update_schema` get
    /// missing tables and columns created first.
    pub fn as_consumer(&self) -> Result<Box<dyn Consumer>> {
        self.check_consumer()?;
        let consumer: Box<dyn Consumer> = match self {
            Endpoint::Database(db) => {
                let consumer = DatabaseConsumer::new(db.config.clone());
                if db.config.update_schema {
                    Box::new(SchemaReconciling::new(
                        consumer,
                        DatabaseSchemaEditor::new(db.config.clone()),
                    ))
                } else {
                    Box::new(consumer)
                }
            }
            Endpoint::Xml(xml) => Box::new(XmlConsumer::new(xml.path()?, xml.format)),
            Endpoint::SpreadsheetSource(_) => return Err(self.unsupported(CONSUMER)),
            Endpoint::SpreadsheetTarget(target) => Box::new(SpreadsheetConsumer::new(
                target.file.clone().unwrap_or_default(),
                target.configuration.clone(),
            )),
        };
        Ok(consumer)
    }

    pub fn describe(&self) -> String {
        let location = match self {
            Endpoint::Database(db) => display_url(&db.config.url),
            Endpoint::Xml(xml) => display(xml.path.as_deref()),
            Endpoint::SpreadsheetSource(source) => display(source.folder.as_deref()),
            Endpoint::SpreadsheetTarget(target) => display(target.file.as_deref()),
        };
        format!("{} [{}]", self.kind(), location)
    }
}

impl DatabaseEndpoint {
    fn check(&self) -> Result<()> {
        if self.config.url.trim().is_empty() {
            return Err(not_ready("database URL is not set"));
        }
        let vendor = Vendor::from_url(&self.config.url)
            .ok_or_else(|| not_ready("database URL must start with sqlite: or postgres:"))?;
        let has_username = self
            .config
            .username
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty());
        if vendor.requires_username() && !has_username {
            return Err(not_ready(format!("{} needs a username", vendor)));
        }
        Ok(())
    }
}

impl XmlEndpoint {
    fn path(&self) -> Result<&Path> {
        self.path
            .as_deref()
            .ok_or_else(|| not_ready("XML path is not set"))
    }
}

fn not_ready(reason: impl Into<String>) -> CopyError {
    CopyError::Config(reason.into())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn display(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}
