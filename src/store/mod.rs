use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use quick_xml::events::{BytesText, Event};
use quick_xml::se::Serializer;
use quick_xml::Reader;
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{Device, Inventory};

/// File-backed persistence for the whole device collection.
///
/// Every load parses the full document and every save rewrites it. Writes
/// go straight to the target path, so a failure halfway through can leave a
/// truncated file that the next load reports as corrupt.
#[derive(Debug, Clone)]
pub struct DeviceStore {
    path: PathBuf,
}

impl DeviceStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the document with an empty collection if the file is missing.
    /// An existing file is left untouched, whatever it contains.
    pub async fn ensure_exists(&self) -> AppResult<()> {
        if fs::try_exists(&self.path).await? {
            return Ok(());
        }

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).await?;
            }
        }

        fs::write(&self.path, encode(&[])?).await?;
        info!(path = %self.path.display(), "Created empty device store");
        Ok(())
    }

    pub async fn load_all(&self) -> AppResult<Vec<Device>> {
        self.ensure_exists().await?;

        let contents = fs::read_to_string(&self.path).await?;
        let devices = decode(&contents).map_err(|e| {
            AppError::StorageCorrupt(format!("{}: {}", self.path.display(), e))
        })?;

        debug!(count = devices.len(), path = %self.path.display(), "Loaded devices");
        Ok(devices)
    }

    pub async fn save_all(&self, devices: &[Device]) -> AppResult<()> {
        fs::write(&self.path, encode(devices)?).await?;

        debug!(count = devices.len(), path = %self.path.display(), "Saved devices");
        Ok(())
    }
}

// ── XML codec ─────────────────────────────────────────────────────────────────

fn encode(devices: &[Device]) -> io::Result<String> {
    let inventory = Inventory::from(devices.to_vec());

    let mut buffer = String::new();
    let mut ser = Serializer::new(&mut buffer);
    ser.indent(' ', 2);
    inventory
        .serialize(ser)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    buffer.push('\n');

    Ok(buffer)
}

// Decoded event by event so text keeps its surrounding whitespace; the serde
// deserializer trims it.
fn decode(contents: &str) -> Result<Vec<Device>, DecodeError> {
    let mut reader = Reader::from_str(contents);
    reader.config_mut().trim_text(false);

    loop {
        match reader.read_event()? {
            Event::Start(_) => break,
            Event::Empty(_) => return Ok(Vec::new()),
            Event::Text(t) if is_blank(&t) => {}
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => return Err(DecodeError::Shape("missing root element".to_string())),
            other => return Err(unexpected(&other, "before root element")),
        }
    }

    let mut devices = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"device" => {
                devices.push(read_device(&mut reader)?);
            }
            Event::End(_) => break,
            Event::Text(t) if is_blank(&t) => {}
            Event::Comment(_) | Event::PI(_) => {}
            Event::Eof => return Err(DecodeError::Shape("unclosed root element".to_string())),
            other => return Err(unexpected(&other, "in collection")),
        }
    }

    Ok(devices)
}

fn read_device(reader: &mut Reader<&[u8]>) -> Result<Device, DecodeError> {
    let mut fields = DeviceFields::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let text = read_text(reader)?;
                fields.set(&name, text);
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                fields.set(&name, String::new());
            }
            Event::End(_) => break,
            Event::Text(t) if is_blank(&t) => {}
            Event::Comment(_) | Event::PI(_) => {}
            Event::Eof => return Err(DecodeError::Shape("unclosed <device>".to_string())),
            other => return Err(unexpected(&other, "in <device>")),
        }
    }
    fields.into_device()
}

fn read_text(reader: &mut Reader<&[u8]>) -> Result<String, DecodeError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| DecodeError::Shape(e.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(_) => return Ok(text),
            Event::Comment(_) | Event::PI(_) => {}
            Event::Eof => return Err(DecodeError::Shape("unclosed field element".to_string())),
            other => return Err(unexpected(&other, "in field")),
        }
    }
}

fn is_blank(text: &BytesText) -> bool {
    text.iter().all(u8::is_ascii_whitespace)
}

fn unexpected(event: &Event, place: &str) -> DecodeError {
    DecodeError::Shape(format!("unexpected {:?} {}", event, place))
}

#[derive(Debug, Error)]
enum DecodeError {
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error("{0}")]
    Shape(String),

    #[error("device is missing <{0}>")]
    MissingField(&'static str),

    #[error("<{field}> has invalid value {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

/// Raw field texts of one `<device>` element. Unknown elements are ignored.
#[derive(Default)]
struct DeviceFields {
    id: Option<String>,
    name: Option<String>,
    brand: Option<String>,
    price: Option<String>,
    category: Option<String>,
    warehouse: Option<String>,
}

impl DeviceFields {
    fn set(&mut self, element: &str, text: String) {
        let slot = match element {
            "id" => &mut self.id,
            "name" => &mut self.name,
            "brand" => &mut self.brand,
            "price" => &mut self.price,
            "category" => &mut self.category,
            "warehouse" => &mut self.warehouse,
            _ => return,
        };
        *slot = Some(text);
    }

    fn into_device(self) -> Result<Device, DecodeError> {
        Ok(Device {
            id: parse_number("id", required("id", self.id)?)?,
            name: required("name", self.name)?,
            brand: required("brand", self.brand)?,
            price: parse_number("price", required("price", self.price)?)?,
            category: required("category", self.category)?,
            warehouse: required("warehouse", self.warehouse)?,
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, DecodeError> {
    value.ok_or(DecodeError::MissingField(field))
}

// Numbers tolerate surrounding whitespace; string fields are kept verbatim.
fn parse_number<T: FromStr>(field: &'static str, value: String) -> Result<T, DecodeError> {
    value
        .trim()
        .parse()
        .map_err(|_| DecodeError::InvalidValue { field, value })
}
