//! WFDB header/data reader
//!
//! Supports single-segment records whose signals all live in one data file
//! stored in format 16 (little-endian i16) or format 212 (packed 12-bit
//! pairs). Physical units are `(digital - baseline) / gain`.

use ndarray::Array2;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// ADC gain assumed when the header gives none (or zero)
pub const DEFAULT_GAIN: f64 = 200.0;

/// Sampling frequency assumed when the header gives none
pub const DEFAULT_SAMPLING_FREQUENCY: f64 = 250.0;

#[derive(Debug, Error)]
pub enum WfdbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid header: {0}")]
    Header(String),

    #[error("Invalid signal data: {0}")]
    Data(String),
}

/// Sample storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    Format16,
    Format212,
}

impl StorageFormat {
    fn from_code(code: u32) -> Result<Self, WfdbError> {
        match code {
            16 => Ok(StorageFormat::Format16),
            212 => Ok(StorageFormat::Format212),
            other => Err(WfdbError::Header(format!("unsupported storage format {}", other))),
        }
    }

    /// Digital value marking a missing sample
    pub fn invalid_sample(self) -> i32 {
        match self {
            StorageFormat::Format16 => -32768,
            StorageFormat::Format212 => -2048,
        }
    }

    /// Whole samples stored in `bytes` bytes
    fn samples_in(self, bytes: usize) -> usize {
        match self {
            StorageFormat::Format16 => bytes / 2,
            StorageFormat::Format212 => bytes * 2 / 3,
        }
    }
}

/// One signal specification line
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSpec {
    pub file_name: String,
    pub format: StorageFormat,
    /// Byte offset of the first sample in the data file
    pub byte_offset: usize,
    /// ADC units per physical unit
    pub gain: f64,
    pub baseline: i32,
    pub units: String,
    pub adc_resolution: Option<u32>,
    pub adc_zero: i32,
    pub description: Option<String>,
}

/// Parsed record header
#[derive(Debug, Clone, PartialEq)]
pub struct RecordHeader {
    pub record_name: String,
    pub sampling_frequency: f64,
    /// Samples per signal, when declared
    pub num_samples: Option<usize>,
    pub signals: Vec<SignalSpec>,
}

impl RecordHeader {
    pub fn parse(text: &str) -> Result<Self, WfdbError> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));

        let record_line = lines
            .next()
            .ok_or_else(|| WfdbError::Header("empty header".to_string()))?;
        let mut fields = record_line.split_whitespace();

        let name_field = fields
            .next()
            .ok_or_else(|| WfdbError::Header("missing record name".to_string()))?;
        if name_field.contains('/') {
            return Err(WfdbError::Header(format!(
                "multi-segment record '{}' not supported",
                name_field
            )));
        }

        let num_signals: usize = parse_field(fields.next(), "number of signals")?;
        let sampling_frequency = match fields.next() {
            Some(token) => parse_frequency(token)?,
            None => DEFAULT_SAMPLING_FREQUENCY,
        };
        let num_samples = match fields.next() {
            Some(token) => Some(parse_field::<usize>(Some(token), "number of samples")?),
            None => None,
        };

        let signals = lines
            .take(num_signals)
            .map(parse_signal_line)
            .collect::<Result<Vec<_>, _>>()?;
        if signals.len() != num_signals {
            return Err(WfdbError::Header(format!(
                "declared {} signals, found {} signal lines",
                num_signals,
                signals.len()
            )));
        }

        Ok(Self {
            record_name: name_field.to_string(),
            sampling_frequency,
            num_samples,
            signals,
        })
    }

    /// The single data file shared by all signals
    pub fn data_file(&self) -> Result<&str, WfdbError> {
        let first = self
            .signals
            .first()
            .ok_or_else(|| WfdbError::Header("record has no signals".to_string()))?;
        let shared = self.signals.iter().all(|s| {
            s.file_name == first.file_name
                && s.format == first.format
                && s.byte_offset == first.byte_offset
        });
        if !shared {
            return Err(WfdbError::Header(
                "signals spread over multiple files or formats are not supported".to_string(),
            ));
        }
        Ok(&first.file_name)
    }
}

fn parse_field<T: std::str::FromStr>(token: Option<&str>, what: &str) -> Result<T, WfdbError> {
    let token = token.ok_or_else(|| WfdbError::Header(format!("missing {}", what)))?;
    token
        .parse::<T>()
        .map_err(|_| WfdbError::Header(format!("invalid {} '{}'", what, token)))
}

/// `fs[/counter][(base)]`
fn parse_frequency(token: &str) -> Result<f64, WfdbError> {
    let end = token.find(['/', '(']).unwrap_or(token.len());
    let fs: f64 = parse_field(Some(&token[..end]), "sampling frequency")?;
    if !(fs.is_finite() && fs > 0.0) {
        return Err(WfdbError::Header(format!("invalid sampling frequency '{}'", token)));
    }
    Ok(fs)
}

/// `file format[+offset] [gain[(baseline)][/units] [adcres [adczero [...] [desc]]]]`
fn parse_signal_line(line: &str) -> Result<SignalSpec, WfdbError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let file_name = fields
        .first()
        .ok_or_else(|| WfdbError::Header("empty signal line".to_string()))?
        .to_string();

    let format_token = fields
        .get(1)
        .ok_or_else(|| WfdbError::Header(format!("missing format for '{}'", file_name)))?;
    let (format, byte_offset) = parse_format(format_token)?;

    let mut gain = 0.0;
    let mut baseline = None;
    let mut units = "mV".to_string();
    if let Some(token) = fields.get(2) {
        let (gain_part, unit_part) = match token.split_once('/') {
            Some((g, u)) => (g, Some(u)),
            None => (*token, None),
        };
        let (gain_text, baseline_text) = match gain_part.split_once('(') {
            Some((g, b)) => (g, Some(b.trim_end_matches(')'))),
            None => (gain_part, None),
        };
        gain = parse_field(Some(gain_text), "gain")?;
        if let Some(b) = baseline_text {
            baseline = Some(parse_field::<i32>(Some(b), "baseline")?);
        }
        if let Some(u) = unit_part {
            units = u.to_string();
        }
    }
    if gain == 0.0 {
        gain = DEFAULT_GAIN;
    }

    let adc_resolution = match fields.get(3) {
        Some(token) => Some(parse_field::<u32>(Some(token), "ADC resolution")?),
        None => None,
    };
    let adc_zero = match fields.get(4) {
        Some(token) => parse_field::<i32>(Some(token), "ADC zero")?,
        None => 0,
    };
    // initial value, checksum and block size precede the description
    let description = if fields.len() > 8 {
        Some(fields[8..].join(" "))
    } else {
        None
    };

    Ok(SignalSpec {
        file_name,
        format,
        byte_offset,
        gain,
        baseline: baseline.unwrap_or(adc_zero),
        units,
        adc_resolution,
        adc_zero,
        description,
    })
}

fn parse_format(token: &str) -> Result<(StorageFormat, usize), WfdbError> {
    let digits_end = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    let code: u32 = parse_field(Some(&token[..digits_end]), "storage format")?;
    let rest = &token[digits_end..];

    let byte_offset = if rest.is_empty() {
        0
    } else if let Some(offset) = rest.strip_prefix('+') {
        parse_field(Some(offset), "byte offset")?
    } else {
        return Err(WfdbError::Header(format!(
            "unsupported format modifier '{}'",
            token
        )));
    };
    Ok((StorageFormat::from_code(code)?, byte_offset))
}

/// Decode interleaved samples into a (samples × signals) matrix of
/// physical values
pub fn decode_samples(header: &RecordHeader, bytes: &[u8]) -> Result<Array2<f32>, WfdbError> {
    header.data_file()?;
    let first = &header.signals[0];
    let num_signals = header.signals.len();
    let data = bytes.get(first.byte_offset..).ok_or_else(|| {
        WfdbError::Data(format!(
            "byte offset {} beyond data length {}",
            first.byte_offset,
            bytes.len()
        ))
    })?;

    let available = first.format.samples_in(data.len()) / num_signals;
    let num_samples = match header.num_samples {
        Some(declared) if declared > available => {
            return Err(WfdbError::Data(format!(
                "truncated data: header declares {} samples per signal, file holds {}",
                declared, available
            )));
        }
        Some(declared) => declared,
        None => available,
    };

    let digital = match first.format {
        StorageFormat::Format16 => unpack_format16(data, num_samples * num_signals),
        StorageFormat::Format212 => unpack_format212(data, num_samples * num_signals),
    };

    let invalid = first.format.invalid_sample();
    let mut matrix = Array2::<f32>::zeros((num_samples, num_signals));
    for (flat, &value) in digital.iter().enumerate() {
        let (row, col) = (flat / num_signals, flat % num_signals);
        if value == invalid {
            return Err(WfdbError::Data(format!(
                "missing sample marker at sample {} of signal {}",
                row, col
            )));
        }
        let spec = &header.signals[col];
        matrix[[row, col]] = ((value - spec.baseline) as f64 / spec.gain) as f32;
    }
    Ok(matrix)
}

fn unpack_format16(data: &[u8], count: usize) -> Vec<i32> {
    data.chunks_exact(2)
        .take(count)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as i32)
        .collect()
}

fn unpack_format212(data: &[u8], count: usize) -> Vec<i32> {
    let mut values = Vec::with_capacity(count);
    for triple in data.chunks(3) {
        if values.len() >= count {
            break;
        }
        if triple.len() >= 2 {
            let first = (triple[0] as i32) | (((triple[1] as i32) & 0x0F) << 8);
            values.push(sign_extend_12(first));
        }
        if values.len() < count && triple.len() == 3 {
            let second = (triple[2] as i32) | (((triple[1] as i32) & 0xF0) << 4);
            values.push(sign_extend_12(second));
        }
    }
    values
}

fn sign_extend_12(value: i32) -> i32 {
    if value & 0x800 != 0 {
        value - 0x1000
    } else {
        value
    }
}

/// `<record>.hea` for a record path without extension
pub fn header_path(record: &Path) -> PathBuf {
    with_suffix(record, ".hea")
}

/// `<record>.dat` for a record path without extension
pub fn data_path(record: &Path) -> PathBuf {
    with_suffix(record, ".dat")
}

fn with_suffix(record: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = record.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Read header and data for a record path (no extension)
pub fn read_record(record: &Path) -> Result<(RecordHeader, Array2<f32>), WfdbError> {
    let header_text = std::fs::read_to_string(header_path(record))?;
    let header = RecordHeader::parse(&header_text)?;
    let data_name = header.data_file()?;
    let data_file = match record.parent() {
        Some(dir) => dir.join(data_name),
        None => PathBuf::from(data_name),
    };
    let bytes = std::fs::read(&data_file)?;
    let samples = decode_samples(&header, &bytes)?;
    tracing::trace!(
        record = %record.display(),
        signals = header.signals.len(),
        samples = samples.nrows(),
        "Decoded WFDB record"
    );
    Ok((header, samples))
}
