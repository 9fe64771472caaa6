//! On-disk descriptor cache, one CSV file per dataset.
//!
//! ```text
//! Filename,Mean Color
//! red.png,"(255, 0, 0)"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{
    descriptor::ColorDescriptor,
    error::{MosaicError, Result},
};

const HEADER: [&str; 2] = ["Filename", "Mean Color"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheRecord {
    pub filename: String,
    pub descriptor: ColorDescriptor,
}

#[derive(Clone, Debug)]
pub struct DescriptorCache {
    path: PathBuf,
}

impl DescriptorCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DescriptorCache { path: path.into() }
    }

    /// Cache for the dataset called `name`, stored as `<cache_dir>/<name>.csv`.
    pub fn for_dataset(cache_dir: &Path, name: &str) -> Self {
        Self::new(cache_dir.join(format!("{name}.csv")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn read(&self) -> Result<Vec<CacheRecord>> {
        let text = fs::read_to_string(&self.path).map_err(|e| MosaicError::io(&self.path, e))?;
        let records = decode(&text).map_err(|(line, reason)| MosaicError::CorruptCache {
            path: self.path.clone(),
            line,
            reason,
        })?;
        debug!("read {} records from {}", records.len(), self.path.display());
        Ok(records)
    }

    pub fn write(&self, records: &[CacheRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| MosaicError::io(parent, e))?;
        }
        fs::write(&self.path, encode(records)).map_err(|e| MosaicError::io(&self.path, e))?;
        debug!("wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

fn encode(records: &[CacheRecord]) -> String {
    let mut out = format!("{}\n", HEADER.join(","));
    for record in records {
        out.push_str(&quote(&record.filename));
        out.push(',');
        out.push_str(&quote(&record.descriptor.to_string()));
        out.push('\n');
    }
    out
}

/// Quotes anything the reader would otherwise split, trim or end the record on.
fn quote(field: &str) -> String {
    let needs_quotes = field.contains([',', '"', '\n', '\r'])
        || field.starts_with(char::is_whitespace)
        || field.ends_with(char::is_whitespace);
    if needs_quotes {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Errors carry the 1-based line number on which the offending record starts.
fn decode(text: &str) -> std::result::Result<Vec<CacheRecord>, (usize, String)> {
    let mut rows = split_records(text)?.into_iter();
    match rows.next() {
        Some((_, header)) if header == HEADER => {}
        Some((line, header)) => return Err((line, format!("unexpected header {header:?}"))),
        None => return Err((1, "missing header".to_string())),
    }
    rows.map(|(line, fields)| {
        let [filename, color] = <[String; 2]>::try_from(fields)
            .map_err(|f| (line, format!("expected 2 fields, got {}", f.len())))?;
        let descriptor = color.parse().map_err(|e| (line, e))?;
        Ok(CacheRecord {
            filename,
            descriptor,
        })
    })
    .collect()
}

/// Splits `text` into records of fields, each tagged with its starting line.
///
/// Quoted fields may span lines. Spaces around unquoted fields are dropped and
/// blank lines are skipped.
fn split_records(text: &str) -> std::result::Result<Vec<(usize, Vec<String>)>, (usize, String)> {
    let mut records = vec![];
    let mut chars = text.chars().peekable();
    let mut line = 1;
    while chars.peek().is_some() {
        let start = line;
        let mut fields = vec![];
        loop {
            while chars.next_if_eq(&' ').is_some() {}
            let mut field = String::new();
            if chars.next_if_eq(&'"').is_some() {
                loop {
                    match chars.next() {
                        Some('"') if chars.next_if_eq(&'"').is_some() => field.push('"'),
                        Some('"') => break,
                        Some(c) => {
                            if c == '\n' {
                                line += 1;
                            }
                            field.push(c);
                        }
                        None => return Err((start, "unterminated quoted field".to_string())),
                    }
                }
                while chars.next_if_eq(&' ').is_some() {}
            } else {
                while let Some(c) = chars.next_if(|c| !matches!(c, ',' | '\n' | '\r')) {
                    field.push(c);
                }
                field.truncate(field.trim_end().len());
            }
            fields.push(field);
            match chars.next() {
                Some(',') => {}
                Some('\n') => {
                    line += 1;
                    break;
                }
                Some('\r') if chars.next_if_eq(&'\n').is_some() => {
                    line += 1;
                    break;
                }
                None => break,
                Some(c) => return Err((line, format!("unexpected {c:?} after field"))),
            }
        }
        if fields != [""] {
            records.push((start, fields));
        }
    }
    Ok(records)
}
