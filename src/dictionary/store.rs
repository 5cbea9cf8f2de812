//! # Dictionary file store
//!
//! A dictionary file is a 4-byte magic number followed by fixed-size
//! records sorted by key name (ASCII case-insensitive). The store never
//! loads a whole file: a lookup is a binary search that seeks to each probed
//! record, and enumeration streams the file front to back.
//!
//! The file is assumed to be sorted. Sorting is an explicit step performed by
//! [`write_sorted`] (used by the compiler and the merge).
//!
//! ```text
//! +--------+----------+----------+-----+----------+
//! | magic  | record 0 | record 1 | ... | record n |
//! +--------+----------+----------+-----+----------+
//!   4 bytes  record_size(level) bytes each
//! ```

use std::{
    cmp::Ordering,
    fmt,
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write},
    marker::PhantomData,
};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{
    codec::{decode_record, encode_record, expect_magic, ByteOrder, DictMagic, Obfuscation},
    dictionary::DictRecord,
    geoframe_errors::{Diagnostic, GeoframeError, ValidationErrors},
    key_name::cmp_key,
};

const MAGIC_LEN: u64 = 4;

/// Handle on one binary dictionary file.
///
/// The handle only keeps the header information; every operation reopens the
/// file so that handles are cheap to share and never hold a stream open.
#[derive(Debug, Clone)]
pub struct DictionaryFile<R: DictRecord> {
    path: Utf8PathBuf,
    magic: DictMagic,
    record_size: usize,
    count: usize,
    trailing: usize,
    _record: PhantomData<R>,
}

impl<R: DictRecord> DictionaryFile<R> {
    /// Open a dictionary file and check its magic number.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: Location of the dictionary file.
    ///
    /// Return
    /// ----------
    /// * The handle, or [`GeoframeError::Format`] if the magic number does not
    ///   identify a dictionary of kind `R::KIND` at a supported level.
    ///
    /// See also
    /// ------------
    /// * [`expect_magic`] – Magic number detection, including byte order.
    pub fn open(path: &Utf8Path) -> Result<Self, GeoframeError> {
        let mut file = File::open(path)?;
        let mut head = [0u8; 4];
        file.read_exact(&mut head).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => {
                GeoframeError::format(format!("{path} is too short to hold a magic number"))
            }
            _ => GeoframeError::Io(err),
        })?;
        let magic = expect_magic(head, R::KIND)?;
        let record_size = R::record_size(magic.level)?;
        let body = file.metadata()?.len().saturating_sub(MAGIC_LEN) as usize;
        let count = body / record_size;
        let trailing = body % record_size;

        debug!(
            %path,
            kind = %R::KIND,
            level = magic.level,
            order = %magic.order,
            records = count,
            "opened dictionary"
        );

        Ok(DictionaryFile {
            path: path.to_owned(),
            magic,
            record_size,
            count,
            trailing,
            _record: PhantomData,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn level(&self) -> u8 {
        self.magic.level
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.magic.order
    }

    /// Number of complete records in the file.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn read_at(&self, reader: &mut BufReader<File>, index: usize) -> Result<R, GeoframeError> {
        let offset = MAGIC_LEN + (index * self.record_size) as u64;
        reader.seek(SeekFrom::Start(offset))?;
        let mut raw = vec![0u8; self.record_size];
        reader.read_exact(&mut raw).map_err(|err| match err.kind() {
            ErrorKind::UnexpectedEof => GeoframeError::format(format!(
                "truncated {} record {index} in {}",
                R::KIND,
                self.path
            )),
            _ => GeoframeError::Io(err),
        })?;
        decode_record(&raw, self.magic.level, self.magic.order)
    }

    /// Case-insensitive lookup by key name.
    ///
    /// Binary search over the sorted file, seeking to each probed record.
    ///
    /// Return
    /// ----------
    /// * The record migrated to the current level, or
    ///   [`GeoframeError::NotFound`] if no record carries `key`.
    pub fn get(&self, key: &str) -> Result<R, GeoframeError> {
        let mut reader = BufReader::with_capacity(self.record_size, File::open(&self.path)?);
        let (mut lo, mut hi) = (0usize, self.count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let record = self.read_at(&mut reader, mid)?;
            match cmp_key(record.key_name(), key) {
                Ordering::Equal => return Ok(record),
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
            }
        }
        Err(GeoframeError::NotFound {
            dictionary: R::KIND,
            key: key.to_string(),
        })
    }

    /// `true` when `key` is present.
    pub fn contains(&self, key: &str) -> Result<bool, GeoframeError> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(GeoframeError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Stream every record in key order.
    ///
    /// Each call opens a fresh stream, so enumeration can be restarted at
    /// will. A partial record at the end of the file yields one
    /// [`GeoframeError::Format`] item; a clean end of file simply ends the
    /// sequence.
    pub fn iter(&self) -> Result<RecordIter<R>, GeoframeError> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(MAGIC_LEN))?;
        Ok(RecordIter {
            reader,
            magic: self.magic,
            record_size: self.record_size,
            remaining: self.count,
            trailing: self.trailing,
            path: self.path.clone(),
            _record: PhantomData,
        })
    }

    /// Stream the records whose group matches `group` (case-insensitive).
    pub fn iter_group<'g>(
        &self,
        group: &'g str,
    ) -> Result<impl Iterator<Item = Result<R, GeoframeError>> + 'g, GeoframeError>
    where
        R: 'g,
    {
        Ok(self.iter()?.filter(move |item| match item {
            Ok(record) => cmp_key(record.group(), group) == Ordering::Equal,
            Err(_) => true,
        }))
    }

    /// Every key name, in file order.
    pub fn key_names(&self) -> Result<Vec<String>, GeoframeError> {
        self.iter()?
            .map(|item| item.map(|record| record.key_name().to_string()))
            .collect()
    }
}

impl<R: DictRecord> fmt::Display for DictionaryFile<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LABEL_WIDTH: usize = 14;
        const VALUE_WIDTH: usize = 44;

        let border = format!(
            "+{:-<label$}+{:-<value$}+",
            "",
            "",
            label = LABEL_WIDTH + 1,
            value = VALUE_WIDTH + 1
        );
        let rows = [
            ("File", self.path.to_string()),
            ("Kind", R::KIND.to_string()),
            ("Level", self.magic.level.to_string()),
            ("Byte order", self.magic.order.to_string()),
            ("Record size", format!("{} bytes", self.record_size)),
            ("Records", self.count.to_string()),
        ];
        writeln!(f, "{border}")?;
        for (label, value) in rows {
            writeln!(
                f,
                "| {label:<label_w$}| {value:<value_w$}|",
                label_w = LABEL_WIDTH,
                value_w = VALUE_WIDTH
            )?;
        }
        writeln!(f, "{border}")
    }
}

/// Lazy record stream returned by [`DictionaryFile::iter`].
pub struct RecordIter<R: DictRecord> {
    reader: BufReader<File>,
    magic: DictMagic,
    record_size: usize,
    remaining: usize,
    trailing: usize,
    path: Utf8PathBuf,
    _record: PhantomData<R>,
}

impl<R: DictRecord> Iterator for RecordIter<R> {
    type Item = Result<R, GeoframeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            if self.trailing == 0 {
                return None;
            }
            let partial = self.trailing;
            self.trailing = 0;
            return Some(Err(GeoframeError::format(format!(
                "{} ends with a partial {} record ({partial} bytes)",
                self.path,
                R::KIND
            ))));
        }
        self.remaining -= 1;
        let mut raw = vec![0u8; self.record_size];
        if let Err(err) = self.reader.read_exact(&mut raw) {
            self.remaining = 0;
            self.trailing = 0;
            return Some(Err(match err.kind() {
                ErrorKind::UnexpectedEof => {
                    GeoframeError::format(format!("{} is truncated", self.path))
                }
                _ => GeoframeError::Io(err),
            }));
        }
        Some(decode_record(&raw, self.magic.level, self.magic.order))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let extra = usize::from(self.trailing > 0);
        (self.remaining, Some(self.remaining + extra))
    }
}

/// How a dictionary is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    pub order: ByteOrder,
    pub obfuscation: Obfuscation,
}

/// Sort `records` by key, reject duplicates and write them to `path`.
///
/// The file is written to a temporary file in the destination directory and
/// swapped in only once every record has been written, so a failure leaves
/// any existing file at `path` untouched.
///
/// Return
/// ----------
/// * The number of records written, [`GeoframeError::Validation`] listing
///   every duplicated key, or a system error.
pub fn write_sorted<R: DictRecord>(
    path: &Utf8Path,
    mut records: Vec<R>,
    options: WriteOptions,
) -> Result<usize, GeoframeError> {
    records.sort_by(|a, b| cmp_key(a.key_name(), b.key_name()));

    let duplicates: Vec<Diagnostic> = records
        .windows(2)
        .filter(|pair| cmp_key(pair[0].key_name(), pair[1].key_name()) == Ordering::Equal)
        .map(|pair| {
            Diagnostic::new(
                pair[1].key_name(),
                0,
                format!("duplicate {} name", R::KIND),
            )
        })
        .collect();
    if !duplicates.is_empty() {
        return Err(GeoframeError::Validation(ValidationErrors(duplicates)));
    }

    let dir = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(tmp.as_file());
        let mut magic = DictMagic::current(R::KIND);
        magic.order = options.order;
        out.write_all(&magic.to_bytes())?;
        for record in &records {
            out.write_all(&encode_record(record, options.order, options.obfuscation)?)?;
        }
        out.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    info!(%path, kind = %R::KIND, records = records.len(), "dictionary written");
    Ok(records.len())
}

#[cfg(test)]
mod test_store {
    use super::*;
    use crate::dictionary::ellipsoid_def::EllipsoidDef;

    fn ellipsoids() -> Vec<EllipsoidDef> {
        ["WGS84", "clrk66", "GRS1980", "BESSEL", "INTNL", "AIRY30"]
            .iter()
            .enumerate()
            .map(|(i, name)| EllipsoidDef::new(name, 6_378_000.0 + i as f64, 6_356_000.0))
            .collect()
    }

    fn scratch(name: &str) -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        (dir, path)
    }

    #[test]
    fn test_write_then_lookup() {
        let (_dir, path) = scratch("Elipsoid.CSD");
        let written = write_sorted(&path, ellipsoids(), WriteOptions::default()).unwrap();
        assert_eq!(written, 6);

        let dict = DictionaryFile::<EllipsoidDef>::open(&path).unwrap();
        assert_eq!(dict.len(), 6);
        assert_eq!(dict.get("Clrk66").unwrap().key_nm, "clrk66");
        assert_eq!(dict.get("airy30").unwrap().key_nm, "AIRY30");
        assert!(matches!(
            dict.get("NOPE"),
            Err(GeoframeError::NotFound { .. })
        ));

        let names = dict.key_names().unwrap();
        assert_eq!(names, ["AIRY30", "BESSEL", "clrk66", "GRS1980", "INTNL", "WGS84"]);
        // restartable
        assert_eq!(dict.iter().unwrap().count(), 6);
        assert_eq!(dict.iter().unwrap().count(), 6);
    }

    #[test]
    fn test_big_endian_obfuscated_file() {
        let (_dir, path) = scratch("Elipsoid.CSD");
        let options = WriteOptions {
            order: ByteOrder::Big,
            obfuscation: Obfuscation::Key(0x42),
        };
        write_sorted(&path, ellipsoids(), options).unwrap();
        let dict = DictionaryFile::<EllipsoidDef>::open(&path).unwrap();
        assert_eq!(dict.byte_order(), ByteOrder::Big);
        let bessel = dict.get("BESSEL").unwrap();
        assert_eq!(bessel, ellipsoids()[3]);
    }

    #[test]
    fn test_duplicates_rejected_and_nothing_written() {
        let (_dir, path) = scratch("Elipsoid.CSD");
        let mut records = ellipsoids();
        records.push(EllipsoidDef::new("Wgs84", 1.0, 1.0));
        let err = write_sorted(&path, records, WriteOptions::default()).unwrap_err();
        match err {
            GeoframeError::Validation(diags) => assert_eq!(diags.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_partial_trailing_record() {
        let (_dir, path) = scratch("Elipsoid.CSD");
        write_sorted(&path, ellipsoids(), WriteOptions::default()).unwrap();
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0u8; 17]).unwrap();

        let dict = DictionaryFile::<EllipsoidDef>::open(&path).unwrap();
        let items: Vec<_> = dict.iter().unwrap().collect();
        assert_eq!(items.len(), 7);
        assert!(items[..6].iter().all(Result::is_ok));
        assert!(matches!(items[6], Err(GeoframeError::Format(_))));
    }

    #[test]
    fn test_wrong_kind_is_format_error() {
        let (_dir, path) = scratch("Elipsoid.CSD");
        write_sorted(&path, ellipsoids(), WriteOptions::default()).unwrap();
        let err = DictionaryFile::<crate::dictionary::datum_def::DatumDef>::open(&path).unwrap_err();
        assert!(matches!(err, GeoframeError::Format(_)));
    }
}
