//! Sorted set command tests

use crate::common::*;
use redstone::ScanParams;

#[test]
fn zadd_zscore_zrank() {
    let db = create_db();

    assert_eq!(db.zadd("z", &[(2.0, "b"), (1.0, "a")]).unwrap(), 2);
    assert_eq!(db.zadd("z", &[(3.0, "b")]).unwrap(), 0);

    assert_eq!(db.zscore("z", "b").unwrap(), Some(3.0));
    assert_eq!(db.zscore("z", "q").unwrap(), None);
    assert_eq!(db.zrank("z", "a").unwrap(), Some(0));
    assert_eq!(db.zrank("z", "b").unwrap(), Some(1));
    assert_eq!(db.zrank("z", "q").unwrap(), None);
}

#[test]
fn zincr_by_creates_and_updates() {
    let db = create_db();

    assert_eq!(db.zincr_by("z", 1.5, "m").unwrap(), 1.5);
    assert_eq!(db.zincr_by("z", 1.0, "m").unwrap(), 2.5);
    assert_eq!(db.zcard("z").unwrap(), 1);
}

#[test]
fn zrange_variants() {
    let db = create_db();
    db.zadd("z", &[(1.0, "a"), (2.0, "b"), (3.0, "c")]).unwrap();

    assert_eq!(all_ok(db.zrange::<String>("z", 0, -1).unwrap()), vec!["a", "b", "c"]);
    assert_eq!(all_ok(db.zrange::<String>("z", -2, -1).unwrap()), vec!["b", "c"]);

    let scored: Vec<(String, f64)> = db
        .zrange_with_scores::<String>("z", 0, 1)
        .unwrap()
        .into_iter()
        .map(|(m, s)| (m.unwrap(), s))
        .collect();
    assert_eq!(scored, vec![("a".to_string(), 1.0), ("b".to_string(), 2.0)]);

    assert_eq!(
        all_ok(db.zrange_by_score::<String>("z", 1.5, 3.0).unwrap()),
        vec!["b", "c"]
    );
}

#[test]
fn zrem_and_zcount() {
    let db = create_db();
    db.zadd("z", &[(1.0, 1), (5.0, 5), (9.0, 9)]).unwrap();

    assert_eq!(db.zcount("z", 0.0, 5.0).unwrap(), 2);
    assert_eq!(db.zrem("z", &[5, 6]).unwrap(), 1);
    assert_eq!(db.zcount("z", 0.0, 10.0).unwrap(), 2);
}

#[test]
fn zscan_returns_members_with_scores() {
    let db = create_db();
    let members: Vec<(f64, i32)> = (0..30).map(|i| (i as f64 * 0.5, i)).collect();
    db.zadd("z", &members).unwrap();

    let mut seen: Vec<(i32, f64)> = db
        .zscan::<i32>("z", ScanParams::new().count(4))
        .items()
        .map(|item| {
            let (member, score) = item.unwrap();
            (member.unwrap(), score)
        })
        .collect();
    seen.sort_by_key(|(m, _)| *m);

    assert_eq!(seen.len(), 30);
    for (member, score) in seen {
        assert_eq!(score, member as f64 * 0.5);
    }
}
