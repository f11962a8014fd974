//! Table document format.
//!
//! ```xml
//! <table>
//!   <metadata name="CUSTOMER">
//!     <column name="id" type="INTEGER" width="0" scale="0" nullable="false" primaryKey="true"/>
//!   </metadata>
//!   <data>
//!     <record id="1"/>
//!   </data>
//! </table>
//! ```
//!
//! A NULL field is an absent attribute; blobs are hex encoded. Record
//! attribute names are column names with every character that cannot appear
//! in an XML name written as `_xHHHH_` (see [`attribute_name`]).

use std::io::{BufRead, Write};

use futures::StreamExt;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::core::{Column, DataType, Record, RecordStream, Table, Value};
use crate::error::{CopyError, Result};

const TABLE: &[u8] = b"table";
const METADATA: &[u8] = b"metadata";
const COLUMN: &[u8] = b"column";
const DATA: &[u8] = b"data";
const RECORD: &[u8] = b"record";

fn start(name: &[u8]) -> BytesStart<'static> {
    BytesStart::new(String::from_utf8_lossy(name).into_owned())
}

fn end(name: &[u8]) -> BytesEnd<'static> {
    BytesEnd::new(String::from_utf8_lossy(name).into_owned())
}

/// Write one table document, draining `records`. Returns the record count.
pub async fn write_table<W: Write + Send>(
    out: W,
    table: &Table,
    mut records: RecordStream<'_>,
) -> Result<u64> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    emit(&mut writer, Event::Start(start(TABLE)))?;

    let mut metadata = start(METADATA);
    metadata.push_attribute(("name", table.name.as_str()));
    emit(&mut writer, Event::Start(metadata))?;
    for column in &table.columns {
        let width = column.width.to_string();
        let scale = column.scale.to_string();
        let mut element = start(COLUMN);
        element.push_attribute(("name", column.name.as_str()));
        element.push_attribute(("type", column.data_type.as_str()));
        element.push_attribute(("width", width.as_str()));
        element.push_attribute(("scale", scale.as_str()));
        element.push_attribute(("nullable", bool_text(column.nullable)));
        element.push_attribute(("primaryKey", bool_text(column.primary_key)));
        emit(&mut writer, Event::Empty(element))?;
    }
    emit(&mut writer, Event::End(end(METADATA)))?;

    let attributes: Vec<String> = table.columns.iter().map(|c| attribute_name(&c.name)).collect();
    emit(&mut writer, Event::Start(start(DATA)))?;
    let mut count = 0u64;
    while let Some(record) = records.next().await {
        let record = record?;
        let mut element = start(RECORD);
        for (column, attribute) in table.columns.iter().zip(&attributes) {
            if let Some(text) = record.get(&column.name).and_then(Value::to_text) {
                element.push_attribute((attribute.as_str(), text.as_str()));
            }
        }
        emit(&mut writer, Event::Empty(element))?;
        count += 1;
    }
    emit(&mut writer, Event::End(end(DATA)))?;
    emit(&mut writer, Event::End(end(TABLE)))?;

    writer.into_inner().flush()?;
    Ok(count)
}

/// XML attribute name for a column. Characters outside the XML name
/// alphabet, a leading digit, `-` or `.`, and any `_` that would start an
/// escape become `_xHHHH_` (`_UHHHHHHHH_` outside the BMP), so distinct
/// column names never collide.
pub fn attribute_name(column: &str) -> String {
    let chars: Vec<char> = column.chars().collect();
    let mut name = String::with_capacity(column.len());
    for (i, &c) in chars.iter().enumerate() {
        let starts_escape = c == '_' && matches!(chars.get(i + 1), Some('x' | 'U'));
        let allowed = if i == 0 {
            c.is_alphabetic() || c == '_'
        } else {
            c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
        };
        if allowed && !starts_escape {
            name.push(c);
        } else if (c as u32) <= 0xFFFF {
            name.push_str(&format!("_x{:04X}_", c as u32));
        } else {
            name.push_str(&format!("_U{:08X}_", c as u32));
        }
    }
    name
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(CopyError::xml)
}

fn bool_text(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

fn attributes(element: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    element
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(CopyError::xml)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.decode_and_unescape_value(element.decoder()).map_err(CopyError::xml)?.into_owned();
            Ok((key, value))
        })
        .collect()
}

fn find<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

fn parse_column(element: &BytesStart<'_>) -> Result<Column> {
    let attrs = attributes(element)?;
    let name = find(&attrs, "name")
        .ok_or_else(|| CopyError::Xml("column without a name".into()))?;
    let type_name = find(&attrs, "type").unwrap_or("STRING");
    let data_type = DataType::parse(type_name)
        .ok_or_else(|| CopyError::Xml(format!("column {name}: unknown type {type_name}")))?;
    let number = |key: &str| -> Result<u32> {
        match find(&attrs, key) {
            None | Some("") => Ok(0),
            Some(v) => v
                .parse()
                .map_err(|_| CopyError::Xml(format!("column {name}: invalid {key} {v}"))),
        }
    };
    let flag = |key: &str| find(&attrs, key).is_some_and(|v| v.eq_ignore_ascii_case("true"));

    Ok(Column {
        name: name.to_string(),
        data_type,
        width: number("width")?,
        scale: number("scale")?,
        nullable: flag("nullable"),
        primary_key: flag("primaryKey"),
    })
}

/// Pull parser over one table document.
///
/// The metadata section is read eagerly by [`TableReader::new`]; records are
/// parsed one at a time by [`TableReader::next_record`].
pub struct TableReader<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    table: Table,
    /// Record attribute name per column.
    attributes: Vec<String>,
    done: bool,
}

impl<R: BufRead> TableReader<R> {
    /// Read the metadata section. `fallback_name` names the table when the
    /// document does not.
    pub fn new(source: R, fallback_name: &str) -> Result<Self> {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut name = None;
        let mut columns = Vec::new();
        let mut seen_root = false;
        let done = loop {
            buf.clear();
            match reader.read_event_into(&mut buf).map_err(CopyError::xml)? {
                Event::Start(e) if e.name().as_ref() == TABLE => seen_root = true,
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == METADATA => {
                    name = find(&attributes(&e)?, "name").map(str::to_string);
                }
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == COLUMN => {
                    columns.push(parse_column(&e)?);
                }
                Event::Start(e) if e.name().as_ref() == DATA => break false,
                Event::Empty(e) if e.name().as_ref() == DATA => break true,
                Event::End(e) if e.name().as_ref() == TABLE => break true,
                Event::Eof => {
                    if seen_root {
                        break true;
                    }
                    return Err(CopyError::Xml(format!(
                        "{fallback_name}: not a table document"
                    )));
                }
                _ => {}
            }
        };

        let name = name.unwrap_or_else(|| fallback_name.to_string());
        let attributes = columns.iter().map(|c| attribute_name(&c.name)).collect();
        Ok(Self {
            reader,
            buf,
            table: Table::new(name, columns),
            attributes,
            done,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    /// Next record with values converted to the declared column types.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.done {
            return Ok(None);
        }
        loop {
            self.buf.clear();
            match self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(CopyError::xml)?
            {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == RECORD => {
                    let attrs = attributes(&e)?;
                    let mut record = Record::with_capacity(self.table.columns.len());
                    for (column, attribute) in self.table.columns.iter().zip(&self.attributes) {
                        let value = match find(&attrs, attribute) {
                            Some(text) => Value::from(text)
                                .coerce(column.data_type)
                                .map_err(|e| CopyError::transfer(&self.table.name, e.to_string()))?,
                            None => Value::Null,
                        };
                        record.set(column.name.clone(), value);
                    }
                    return Ok(Some(record));
                }
                Event::End(e) if e.name().as_ref() == DATA => {
                    self.done = true;
                    return Ok(None);
                }
                Event::Eof => {
                    self.done = true;
                    return Err(CopyError::Xml(format!(
                        "{}: document ends inside the data section",
                        self.table.name
                    )));
                }
                _ => {}
            }
        }
    }
}
