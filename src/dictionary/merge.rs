//! Upgrade merge of a distribution dictionary into a local one.
//!
//! Both files are sorted by key, so the merge is a single merge-join pass.
//! On a name present in both files the distribution record wins: local
//! edits of a distribution-owned record are discarded. Names unique to
//! either side pass through unchanged, which is how user definitions
//! survive a product upgrade.

use std::fs;

use camino::Utf8Path;
use itertools::{EitherOrBoth, Itertools};
use tracing::{debug, info};

use crate::{
    dictionary::{
        store::{write_sorted, DictionaryFile, WriteOptions},
        DictRecord,
    },
    geoframe_errors::GeoframeError,
    key_name::cmp_key,
};

/// Counts reported by [`merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeReport {
    /// Records present only in the distribution.
    pub added: usize,
    /// Records present in both; the distribution version was kept.
    pub replaced: usize,
    /// Records present only in the previous file.
    pub kept: usize,
}

impl MergeReport {
    pub fn total(&self) -> usize {
        self.added + self.replaced + self.kept
    }
}

/// Merge-join two sorted record sequences, the update side winning ties.
pub fn merge_records<R: DictRecord>(update: Vec<R>, old: Vec<R>) -> (Vec<R>, MergeReport) {
    let mut report = MergeReport::default();
    let merged = update
        .into_iter()
        .merge_join_by(old, |u, o| cmp_key(u.key_name(), o.key_name()))
        .map(|pair| match pair {
            EitherOrBoth::Both(update, old) => {
                if update != old {
                    debug!(key = update.key_name(), "local record replaced by distribution");
                }
                report.replaced += 1;
                update
            }
            EitherOrBoth::Left(update) => {
                report.added += 1;
                update
            }
            EitherOrBoth::Right(old) => {
                report.kept += 1;
                old
            }
        })
        .collect();
    (merged, report)
}

/// Merge the `distribution` dictionary into `previous`, in place.
///
/// Arguments
/// -----------------
/// * `distribution`: Dictionary shipped with the new release.
/// * `previous`: Local dictionary; replaced by the merged result. If it does
///   not exist the result is a copy of the distribution.
/// * `backup`: When given, the previous file is copied there before being replaced.
/// * `options`: Byte order and obfuscation of the merged file.
///
/// Return
/// ----------
/// * The merge counts. On error the previous file is left untouched.
pub fn merge<R: DictRecord>(
    distribution: &Utf8Path,
    previous: &Utf8Path,
    backup: Option<&Utf8Path>,
    options: WriteOptions,
) -> Result<MergeReport, GeoframeError> {
    let update: Vec<R> = DictionaryFile::<R>::open(distribution)?
        .iter()?
        .collect::<Result<_, _>>()?;
    let old: Vec<R> = if previous.exists() {
        DictionaryFile::<R>::open(previous)?
            .iter()?
            .collect::<Result<_, _>>()?
    } else {
        Vec::new()
    };

    let (merged, report) = merge_records(update, old);

    if let Some(backup) = backup {
        if previous.exists() {
            fs::copy(previous, backup)?;
        }
    }
    write_sorted(previous, merged, options)?;

    info!(
        kind = %R::KIND,
        added = report.added,
        replaced = report.replaced,
        kept = report.kept,
        "dictionary merged"
    );
    Ok(report)
}

#[cfg(test)]
mod test_merge {
    use super::*;
    use crate::dictionary::ellipsoid_def::EllipsoidDef;

    #[test]
    fn test_update_wins_ties() {
        let mut dist_clrk = EllipsoidDef::new("CLRK66", 6_378_206.4, 6_356_583.8);
        dist_clrk.protect = 1;
        let mut local_clrk = dist_clrk.clone();
        local_clrk.desc_nm = "my edit".into();

        let update = vec![EllipsoidDef::new("BESSEL", 6_377_397.155, 6_356_078.963), dist_clrk.clone()];
        let old = vec![local_clrk, EllipsoidDef::new("MY:ELL", 6_378_000.0, 6_357_000.0)];

        let (merged, report) = merge_records(update, old);
        let names: Vec<_> = merged.iter().map(|e| e.key_nm.as_str()).collect();
        assert_eq!(names, ["BESSEL", "CLRK66", "MY:ELL"]);
        assert_eq!(merged[1], dist_clrk);
        assert_eq!(
            report,
            MergeReport {
                added: 1,
                replaced: 1,
                kept: 1
            }
        );
        assert_eq!(report.total(), 3);
    }
}
