//! Field-by-field readers and writers over a canonical (little-endian) record.
//!
//! [`RecordReader`] is a thin cursor around the nom little-endian number
//! parsers; every read either consumes exactly the field width or fails with
//! a [`GeoframeError::Format`] naming the record being decoded.
//! [`RecordWriter`] is the mirror image used by the encoders.

use nom::{
    bytes::complete::take,
    number::complete::{le_f32, le_f64, le_i16, le_i32},
    IResult,
};

use crate::geoframe_errors::GeoframeError;

type NomError<'a> = nom::error::Error<&'a [u8]>;

/// Decode a NUL-padded character block into a trimmed `String`.
pub fn chars_to_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim_end().to_string()
}

pub struct RecordReader<'a> {
    input: &'a [u8],
    record: &'static str,
}

impl<'a> RecordReader<'a> {
    pub fn new(input: &'a [u8], record: &'static str) -> Self {
        RecordReader { input, record }
    }

    fn step<T>(&mut self, res: IResult<&'a [u8], T, NomError<'a>>) -> Result<T, GeoframeError> {
        match res {
            Ok((rest, value)) => {
                self.input = rest;
                Ok(value)
            }
            Err(_) => Err(GeoframeError::format(format!(
                "truncated {} record",
                self.record
            ))),
        }
    }

    pub fn i16(&mut self) -> Result<i16, GeoframeError> {
        let res = le_i16::<_, NomError>(self.input);
        self.step(res)
    }

    pub fn i32(&mut self) -> Result<i32, GeoframeError> {
        let res = le_i32::<_, NomError>(self.input);
        self.step(res)
    }

    pub fn f32(&mut self) -> Result<f32, GeoframeError> {
        let res = le_f32::<_, NomError>(self.input);
        self.step(res)
    }

    pub fn f64(&mut self) -> Result<f64, GeoframeError> {
        let res = le_f64::<_, NomError>(self.input);
        self.step(res)
    }

    pub fn doubles<const N: usize>(&mut self) -> Result<[f64; N], GeoframeError> {
        let mut out = [0.0; N];
        for value in out.iter_mut() {
            *value = self.f64()?;
        }
        Ok(out)
    }

    pub fn chars(&mut self, len: usize) -> Result<String, GeoframeError> {
        let raw = self.bytes(len)?;
        Ok(chars_to_string(raw))
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], GeoframeError> {
        let res = take::<_, _, NomError>(len)(self.input);
        self.step(res)
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Fail unless the whole record was consumed.
    pub fn finish(self) -> Result<(), GeoframeError> {
        if self.input.is_empty() {
            Ok(())
        } else {
            Err(GeoframeError::format(format!(
                "{} trailing bytes after {} record",
                self.input.len(),
                self.record
            )))
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordWriter {
    buf: Vec<u8>,
}

impl RecordWriter {
    pub fn with_capacity(size: usize) -> Self {
        RecordWriter {
            buf: Vec::with_capacity(size),
        }
    }

    pub fn i16(&mut self, value: i16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn f32(&mut self, value: f32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn f64(&mut self, value: f64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn doubles(&mut self, values: &[f64]) -> &mut Self {
        for v in values {
            self.f64(*v);
        }
        self
    }

    /// Write `value` into a `len`-byte NUL-padded block, keeping at least one NUL.
    pub fn chars(&mut self, value: &str, len: usize) -> &mut Self {
        let bytes = value.as_bytes();
        let n = bytes.len().min(len.saturating_sub(1));
        self.buf.extend_from_slice(&bytes[..n]);
        self.zeros(len - n)
    }

    pub fn zeros(&mut self, len: usize) -> &mut Self {
        self.buf.resize(self.buf.len() + len, 0);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
