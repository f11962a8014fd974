//! Configuration validation.
//!
//! Only the shape of the file is checked here. Whether a store can actually
//! be reached is the endpoint readiness check.

use super::{Config, EndpointConfig, EndpointType};
use crate::error::{CopyError, Result};

#[derive(Clone, Copy)]
enum Side {
    Source,
    Destination,
}

impl Side {
    fn key(self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Destination => "destination",
        }
    }
}

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_endpoint(&config.source, Side::Source)?;
    validate_endpoint(&config.destination, Side::Destination)?;
    Ok(())
}

fn validate_endpoint(endpoint: &EndpointConfig, side: Side) -> Result<()> {
    let key = side.key();
    match endpoint.endpoint_type {
        EndpointType::Database => {
            let database = endpoint
                .database
                .as_ref()
                .ok_or_else(|| CopyError::Config(format!("{key}.database is required")))?;
            if database.url.trim().is_empty() {
                return Err(CopyError::Config(format!("{key}.database.url is required")));
            }
        }
        EndpointType::Xml => {
            let xml = endpoint
                .xml
                .as_ref()
                .ok_or_else(|| CopyError::Config(format!("{key}.xml is required")))?;
            match (&xml.file, &xml.directory) {
                (Some(_), Some(_)) => {
                    return Err(CopyError::Config(format!(
                        "{key}.xml: set either file or directory, not both"
                    )))
                }
                (None, None) => {
                    return Err(CopyError::Config(format!(
                        "{key}.xml.file or {key}.xml.directory is required"
                    )))
                }
                _ => {}
            }
        }
        EndpointType::Spreadsheet => {
            let spreadsheet = endpoint
                .spreadsheet
                .as_ref()
                .ok_or_else(|| CopyError::Config(format!("{key}.spreadsheet is required")))?;
            match side {
                Side::Source => {
                    if spreadsheet.folder.is_none() {
                        return Err(CopyError::Config(
                            "source.spreadsheet.folder is required".into(),
                        ));
                    }
                    if spreadsheet.file.is_some() || spreadsheet.configuration.is_some() {
                        return Err(CopyError::Config(
                            "source.spreadsheet only accepts folder".into(),
                        ));
                    }
                }
                Side::Destination => {
                    if spreadsheet.file.is_none() {
                        return Err(CopyError::Config(
                            "destination.spreadsheet.file is required".into(),
                        ));
                    }
                    if spreadsheet.folder.is_some() {
                        return Err(CopyError::Config(
                            "destination.spreadsheet does not accept folder".into(),
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, SpreadsheetConfig, XmlConfig};

    fn valid_config() -> Config {
        let mut database = DatabaseConfig::new("postgres://localhost/stock");
        database.username = Some("loader".to_string());
        database.password = Some("password".to_string());
        Config {
            source: EndpointConfig::database(database),
            destination: EndpointConfig::xml(XmlConfig {
                file: Some("out.zip".into()),
                directory: None,
            }),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_database_section() {
        let mut config = valid_config();
        config.source.database = None;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("source.database is required"));
    }

    #[test]
    fn test_blank_url() {
        let mut config = valid_config();
        config.source.database.as_mut().unwrap().url = "  ".to_string();
        assert!(matches!(validate(&config), Err(CopyError::Config(_))));
    }

    #[test]
    fn test_xml_file_and_directory_are_exclusive() {
        let mut config = valid_config();
        config.destination.xml.as_mut().unwrap().directory = Some("out".into());
        assert!(validate(&config).is_err());

        config.destination.xml = Some(XmlConfig::default());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_spreadsheet_sides() {
        let mut config = valid_config();
        config.destination = EndpointConfig::spreadsheet(SpreadsheetConfig {
            folder: Some("in".into()),
            ..Default::default()
        });
        assert!(validate(&config).is_err());

        config.destination = EndpointConfig::spreadsheet(SpreadsheetConfig {
            file: Some("out.xlsx".into()),
            ..Default::default()
        });
        assert!(validate(&config).is_ok());

        config.source = EndpointConfig::spreadsheet(SpreadsheetConfig {
            file: Some("in.xlsx".into()),
            ..Default::default()
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_database_config_debug_redacts_password() {
        let mut config = valid_config();
        config.source.database.as_mut().unwrap().password =
            Some("super_secret_password_123".to_string());
        let debug_output = format!("{:?}", config.source);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }
}
