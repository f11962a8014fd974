//! Transfer orchestrator - turns a configuration into one assembled transfer.

use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::adapters::{BlanksToZero, ProgressTracking, WithMetadata};
use crate::config::Config;
use crate::core::{Consumer, Producer};
use crate::endpoint::{Endpoint, EndpointKind};
use crate::error::Result;
use crate::monitor::{Cancellable, ProgressMonitor, SilentMonitor, TextProgressBar};
use crate::transfer::{Connector, TransferSummary};

/// Transfer orchestrator.
pub struct Orchestrator {
    source: Endpoint,
    destination: Endpoint,
    progress: Option<ProgressOutput>,
}

/// Stream the text progress bar is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutput {
    Stdout,
    /// Keeps stdout free for machine-readable output.
    Stderr,
}

/// Whether one side can play its role.
#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    /// Endpoint description.
    pub endpoint: String,

    pub ready: bool,

    /// Why the endpoint is not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Readiness {
    fn of(endpoint: &Endpoint, check: Result<()>) -> Self {
        Self {
            endpoint: endpoint.describe(),
            ready: check.is_ok(),
            reason: check.err().map(|e| e.to_string()),
        }
    }
}

/// Result of [`Orchestrator::check`].
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    /// The source as a producer.
    pub source: Readiness,

    /// The destination as a consumer.
    pub destination: Readiness,
}

impl ReadinessReport {
    pub fn is_ready(&self) -> bool {
        self.source.ready && self.destination.ready
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Orchestrator {
    /// Create a new orchestrator from a configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_endpoints(
            Endpoint::source(&config.source)?,
            Endpoint::destination(&config.destination)?,
        ))
    }

    pub fn from_endpoints(source: Endpoint, destination: Endpoint) -> Self {
        Self {
            source,
            destination,
            progress: None,
        }
    }

    /// Draw a text progress bar while transferring, silent when `None`.
    pub fn with_progress(mut self, output: Option<ProgressOutput>) -> Self {
        self.progress = output;
        self
    }

    pub fn source(&self) -> &Endpoint {
        &self.source
    }

    pub fn destination(&self) -> &Endpoint {
        &self.destination
    }

    /// Evaluate both readiness predicates without opening anything.
    pub fn check(&self) -> ReadinessReport {
        ReadinessReport {
            source: Readiness::of(&self.source, self.source.check_producer()),
            destination: Readiness::of(&self.destination, self.destination.check_consumer()),
        }
    }

    /// Run the transfer. `cancel` stops it at the next table or record.
    pub async fn run(&self, cancel: CancellationToken) -> Result<TransferSummary> {
        // configuration and capability errors surface before anything opens
        self.source.check_producer()?;
        self.destination.check_consumer()?;

        let producer = self.producer()?;
        let consumer = self.consumer(cancel)?;

        info!(
            "Starting transfer from [{}] to [{}]",
            producer.describe(),
            consumer.describe()
        );
        let started = Instant::now();
        let summary = Connector::new(producer, consumer).run().await?;
        info!(
            "Transfer complete - {}ms elapsed.",
            started.elapsed().as_millis()
        );

        Ok(summary)
    }

    /// The source producer. A spreadsheet source only carries text, so when
    /// the destination can be read back its column types are borrowed and
    /// blank numeric fields become zero.
    fn producer(&self) -> Result<Box<dyn Producer>> {
        let source = self.source.as_producer()?;
        if self.source.kind() != EndpointKind::SpreadsheetSource
            || !self.destination.can_create_producer()
        {
            return Ok(source);
        }

        debug!(
            "Typing spreadsheet columns from {}",
            self.destination.describe()
        );
        let augmented = WithMetadata::new(source, self.destination.as_producer()?);
        let metadata = augmented.destination_metadata();
        Ok(Box::new(BlanksToZero::new(augmented, metadata)))
    }

    fn consumer(&self, cancel: CancellationToken) -> Result<Box<dyn Consumer>> {
        Ok(Box::new(ProgressTracking::new(
            self.destination.as_consumer()?,
            Cancellable::new(self.monitor(), cancel),
        )))
    }

    fn monitor(&self) -> Box<dyn ProgressMonitor> {
        match self.progress {
            Some(ProgressOutput::Stdout) => Box::new(TextProgressBar::stdout()),
            Some(ProgressOutput::Stderr) => Box::new(TextProgressBar::stderr()),
            None => Box::new(SilentMonitor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{SpreadsheetSourceEndpoint, SpreadsheetTargetEndpoint, XmlEndpoint};
    use crate::drivers::xml::XmlFormat;
    use crate::error::CopyError;

    #[test]
    fn test_check_reports_reasons() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::from_endpoints(
            Endpoint::SpreadsheetSource(SpreadsheetSourceEndpoint {
                folder: Some(dir.path().join("missing")),
            }),
            Endpoint::Xml(XmlEndpoint {
                path: Some(dir.path().join("out.zip")),
                format: XmlFormat::Archive,
            }),
        );
        let report = orchestrator.check();
        assert!(!report.is_ready());
        assert!(!report.source.ready);
        assert!(report.source.reason.as_deref().unwrap().contains("missing"));
        assert!(report.destination.ready);
        assert!(report.destination.reason.is_none());
        assert!(report.to_json().unwrap().contains("\"ready\": false"));
    }

    #[tokio::test]
    async fn test_unsupported_destination_fails_before_opening() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::from_endpoints(
            Endpoint::SpreadsheetTarget(SpreadsheetTargetEndpoint {
                file: Some(dir.path().join("in.xlsx")),
                configuration: None,
            }),
            Endpoint::Xml(XmlEndpoint {
                path: Some(dir.path().join("out.zip")),
                format: XmlFormat::Archive,
            }),
        );
        let err = orchestrator.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CopyError::Unsupported { .. }));
        assert!(!dir.path().join("out.zip").exists());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in");
        std::fs::create_dir(&source).unwrap();
        std::fs::write(
            source.join("T.xml"),
            r#"<table><metadata name="T"><column name="n" type="INTEGER"/></metadata><data><record n="1"/></data></table>"#,
        )
        .unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();

        let orchestrator = Orchestrator::from_endpoints(
            Endpoint::Xml(XmlEndpoint {
                path: Some(source),
                format: XmlFormat::Directory,
            }),
            Endpoint::Xml(XmlEndpoint {
                path: Some(out.clone()),
                format: XmlFormat::Directory,
            }),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = orchestrator.run(cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!out.join("T.xml").exists());
    }
}
