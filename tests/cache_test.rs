use std::sync::Arc;

use geoframe::{
    cache::CacheStats,
    dictionary::DictKind,
    geoframe::CoordSysSource,
    geoframe_errors::GeoframeError,
};

mod common;

#[test]
fn test_lru_eviction_and_reload() {
    let (_guard, frame) = common::builtin_frame(|config| config.with_coordsys_cache(2));

    let ll84 = frame.create("LL84".into()).unwrap();
    frame.create("LL83".into()).unwrap();
    // LL84 is the least recently used entry and leaves the cache
    frame.create("LL27".into()).unwrap();
    assert_eq!(
        frame.cache_stats().coordsys,
        CacheStats {
            hits: 0,
            loads: 3,
            evictions: 1
        }
    );

    // the evicted object stays usable by whoever holds it
    assert_eq!(ll84.key_name(), "LL84");

    let reloaded = frame.create("ll84".into()).unwrap();
    assert!(!Arc::ptr_eq(&ll84, &reloaded));
    frame.create("LL27".into()).unwrap();
    assert_eq!(
        frame.cache_stats().coordsys,
        CacheStats {
            hits: 1,
            loads: 4,
            evictions: 2
        }
    );
}

#[test]
fn test_load_error_is_not_cached() {
    let (_guard, frame) = common::builtin_frame(|config| config);
    for _ in 0..2 {
        assert_eq!(
            frame.create(CoordSysSource::Key("NO-SUCH-CS".into())).unwrap_err(),
            GeoframeError::NotFound {
                dictionary: DictKind::CoordSys,
                key: "NO-SUCH-CS".into()
            }
        );
    }
    assert_eq!(frame.cache_stats().coordsys, CacheStats::default());
}

#[test]
fn test_release_empties_both_caches() {
    let (_guard, frame) = common::builtin_frame(|config| config.with_datum_cache(1));
    frame
        .transform_by_name("ED50.LL", "LL84", [2.0, 45.0, 0.0])
        .unwrap();
    frame
        .transform_by_name("LL27", "LL84", [-80.0, 40.0, 0.0])
        .unwrap();
    assert_eq!(frame.cache_stats().datum.evictions, 1);

    frame.release();
    frame
        .transform_by_name("LL27", "LL84", [-80.0, 40.0, 0.0])
        .unwrap();
    assert_eq!(frame.cache_stats().datum.loads, 3);
    assert_eq!(frame.cache_stats().coordsys.loads, 5);
}

#[test]
fn test_shared_between_threads() {
    let (_guard, frame) = common::builtin_frame(|config| config);
    std::thread::scope(|scope| {
        for zone in ["UTM84-31N", "UTM84-32N", "UTM84-31N", "UTM84-32N"] {
            let frame = &frame;
            scope.spawn(move || {
                let cs = frame.create(zone.into()).unwrap();
                assert_eq!(cs.key_name(), zone);
            });
        }
    });
    let stats = frame.cache_stats().coordsys;
    assert_eq!(stats.loads, 2);
    assert_eq!(stats.hits, 2);
}
