mod common;

use common::*;
use fkarray::{DeferredOp, Expr, KeySequence, Slot, Value};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn push_after_load_shows_the_new_record() {
    let store = store();
    let assoc = videos();
    let mut p = find_playlist(&store, 2);
    {
        let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();
        assert_eq!(list.to_vec().unwrap().len(), 1);

        list.push(&food_chain()).unwrap();
        let slots = list.to_vec().unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].record(), Some(&food_chain()));
    }
    assert_eq!(p.video_ids, keys(&[Some(1), Some(4)]));
}

#[test]
fn mutations_do_not_persist() {
    let store = store();
    let assoc = videos();
    let mut p = find_playlist(&store, 2);
    fkarray::collection(&assoc, &mut p, &store)
        .unwrap()
        .push(3_i64)
        .unwrap();
    assert_eq!(p.video_ids.len(), 2);
    assert_eq!(find_playlist(&store, 2).video_ids.len(), 1);

    store.save(&p).unwrap();
    assert_eq!(find_playlist(&store, 2).video_ids, keys(&[Some(1), Some(3)]));
}

#[test]
fn delete_returns_the_record_and_updates_the_owner() {
    let store = store();
    let assoc = videos();
    let mut a = find_playlist(&store, 3);
    {
        let mut list = fkarray::collection(&assoc, &mut a, &store).unwrap();
        let removed = list.delete(&return_of_harmony()).unwrap();
        assert_eq!(removed.record(), Some(&return_of_harmony()));
        assert!(list.eq_records(&[something_big()]).unwrap());
        assert_eq!(list.delete(&food_chain()).unwrap(), Slot::Empty);
    }
    assert_eq!(a.video_ids, keys(&[Some(2)]));
    store.save(&a).unwrap();
    assert_eq!(find_playlist(&store, 3).video_ids, keys(&[Some(2)]));
}

#[test]
fn delete_removes_every_occurrence() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "dups", vec![Some(2), Some(1), Some(2)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();
    let removed = list.delete(2_i64).unwrap();
    assert_eq!(removed.record(), Some(&something_big()));
    assert_eq!(list.keys(), &keys(&[Some(1)]));
}

#[test]
fn positional_removal() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "mix", vec![Some(1), None, Some(3), Some(4)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();

    assert_eq!(list.delete_at(1).unwrap(), Slot::Empty);
    assert_eq!(list.len(), 3);
    assert_eq!(list.delete_at(10).unwrap(), Slot::Empty);
    assert_eq!(list.len(), 3);

    assert_eq!(list.pop().unwrap().record(), Some(&food_chain()));
    assert_eq!(list.shift().unwrap().record(), Some(&return_of_harmony()));
    assert_eq!(list.keys(), &keys(&[Some(3)]));
    list.clear();
    assert_eq!(list.pop().unwrap(), Slot::Empty);
    assert_eq!(list.shift().unwrap(), Slot::Empty);
}

#[test]
fn removal_from_a_filtered_view_returns_the_row() {
    let store = store();
    let assoc = videos();
    let mut p = find_playlist(&store, 3);
    let mut list = fkarray::collection(&assoc, &mut p, &store)
        .unwrap()
        .filter(Expr::col("id").ge(2));
    assert_eq!(list.to_vec().unwrap().len(), 1);

    let removed = list.delete(&return_of_harmony()).unwrap();
    assert_eq!(removed.record(), Some(&return_of_harmony()));
    assert_eq!(list.keys(), &keys(&[Some(2)]));

    // a row the filter keeps comes from the fetched slots
    list.load().unwrap();
    store.clear_query_log();
    let removed = list.shift().unwrap();
    assert!(store.query_log().is_empty());
    assert_eq!(removed.record(), Some(&something_big()));
    assert!(list.is_empty());
}

#[test]
fn positional_removal_from_a_filtered_view_ignores_the_filter() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "mix", vec![Some(4), Some(99), Some(1)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store)
        .unwrap()
        .filter(Expr::col("name").eq("food_chain"));

    assert_eq!(list.pop().unwrap().record(), Some(&return_of_harmony()));
    assert_eq!(list.pop().unwrap(), Slot::Missing(Value::BigInt(99)));
    assert_eq!(list.shift().unwrap().record(), Some(&food_chain()));
}

#[test]
fn replace_discards_the_old_sequence() {
    let store = store();
    let assoc = videos();
    let mut p = find_playlist(&store, 3);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();
    list.load().unwrap();

    let new = vec![food_chain(), food_chain(), escape_from_the_citadel()];
    list.replace(&new).unwrap();
    assert_eq!(list.len(), 3);
    assert!(list.eq_records(&new).unwrap());

    list.replace(Vec::<Value>::new()).unwrap();
    assert!(list.is_empty());
    assert!(list.to_vec().unwrap().is_empty());
}

#[test]
fn assign_round_trips_order_and_duplicates() {
    let store = store();
    let assoc = videos();
    let records = vec![something_big(), return_of_harmony(), something_big()];
    let mut p = playlist(9, "new", vec![]);
    assoc.assign(&mut p, &records).unwrap();
    store.insert(&p).unwrap();

    let mut loaded = find_playlist(&store, 9);
    let list = fkarray::collection(&assoc, &mut loaded, &store).unwrap();
    assert!(list.eq_records(&records).unwrap());
}

#[test]
fn unsaved_records_are_rejected() {
    let store = store();
    let assoc = videos();
    let mut p = find_playlist(&store, 2);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();
    let mut draft = food_chain();
    draft.id = None;
    assert!(list.push(&draft).unwrap_err().is_invalid_argument());
    assert_eq!(list.len(), 1);
}

#[test]
fn insert_concat_and_unshift() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "mix", vec![Some(1), Some(2)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();

    list.insert(1, [4_i64, 3]).unwrap();
    assert_eq!(list.keys(), &keys(&[Some(1), Some(4), Some(3), Some(2)]));

    list.unshift(&escape_from_the_citadel()).unwrap();
    list.concat(vec![Value::Null]).unwrap();
    assert_eq!(
        list.keys(),
        &keys(&[Some(3), Some(1), Some(4), Some(3), Some(2), None])
    );
}

#[test]
fn writes_past_the_end_pad_with_nulls() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "short", vec![Some(1)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();

    list.insert(3, [2_i64]).unwrap();
    assert_eq!(list.keys(), &keys(&[Some(1), None, None, Some(2)]));

    list.set(5, 4_i64).unwrap();
    assert_eq!(
        list.keys(),
        &keys(&[Some(1), None, None, Some(2), None, Some(4)])
    );

    let slots = list.to_vec().unwrap();
    assert_eq!(slots.len(), 6);
    assert_eq!(slots[4], Slot::Empty);
    assert_eq!(slots[5].record(), Some(&food_chain()));
}

#[test]
fn set_at_the_last_index_is_rejected() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "short", vec![Some(1)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();

    let err = list.set(usize::MAX, 2_i64).unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(list.keys(), &keys(&[Some(1)]));
}

#[test]
fn splice_replaces_ranges() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "mix", vec![Some(1), Some(2), Some(3)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();

    list.splice(1, 1, [4_i64, 4]).unwrap();
    assert_eq!(list.keys(), &keys(&[Some(1), Some(4), Some(4), Some(3)]));

    list.splice(2, 100, Vec::<Value>::new()).unwrap();
    assert_eq!(list.keys(), &keys(&[Some(1), Some(4)]));

    list.splice(4, 0, [2_i64]).unwrap();
    assert_eq!(list.keys(), &keys(&[Some(1), Some(4), None, None, Some(2)]));
}

#[test]
fn fill_whole_and_ranged() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "mix", vec![Some(1), Some(2), Some(3)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();

    list.fill(4_i64, None).unwrap();
    assert_eq!(list.keys(), &keys(&[Some(4), Some(4), Some(4)]));

    list.fill(&return_of_harmony(), Some(2..5)).unwrap();
    assert_eq!(
        list.keys(),
        &keys(&[Some(4), Some(4), Some(1), Some(1), Some(1)])
    );

    list.fill_with(|i| Value::BigInt(i64::try_from(i).unwrap() % 4 + 1), Some(0..2))
        .unwrap();
    assert_eq!(
        list.keys(),
        &keys(&[Some(1), Some(2), Some(1), Some(1), Some(1)])
    );
}

#[test]
fn dedup_keeps_first_occurrences() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "dups", vec![Some(2), Some(1), Some(2), Some(3), Some(1)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();
    list.dedup();
    assert_eq!(list.keys(), &keys(&[Some(2), Some(1), Some(3)]));
}

#[test]
fn dedup_by_groups_on_the_transform() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "mix", vec![Some(4), Some(1), Some(3), Some(2)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();
    // group by whether the title starts with "The"
    list.dedup_by(|slot| slot.record().is_some_and(|v| v.title.starts_with("The")))
        .unwrap();
    assert_eq!(list.keys(), &keys(&[Some(4), Some(1)]));
}

#[test]
fn reverse_rotate_and_compact() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "mix", vec![Some(1), None, Some(2), Some(3)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();

    list.reverse();
    assert_eq!(list.keys(), &keys(&[Some(3), Some(2), None, Some(1)]));
    list.rotate(1);
    assert_eq!(list.keys(), &keys(&[Some(2), None, Some(1), Some(3)]));
    list.rotate(-2);
    assert_eq!(list.keys(), &keys(&[Some(1), Some(3), Some(2), None]));
    list.rotate(9);
    assert_eq!(list.keys(), &keys(&[Some(3), Some(2), None, Some(1)]));
    list.compact();
    assert_eq!(list.keys(), &keys(&[Some(3), Some(2), Some(1)]));
}

#[test]
fn shuffle_permutes_keys_only() {
    let store = store();
    let assoc = videos();
    let original = vec![Some(1), Some(2), Some(3), Some(4), None, Some(2)];
    let mut p = playlist(9, "mix", original.clone());
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();
    list.load().unwrap();

    list.shuffle_with(&mut StdRng::seed_from_u64(7));
    assert!(!list.is_loaded());
    let mut shuffled: Vec<Value> = list.keys().as_slice().to_vec();
    let mut expected: Vec<Value> = keys(&original).into_vec();
    let sort = |v: &mut Vec<Value>| v.sort_by_key(|k| k.as_i64().unwrap_or(-1));
    sort(&mut shuffled);
    sort(&mut expected);
    assert_eq!(shuffled, expected);

    list.shuffle();
    assert_eq!(list.len(), 6);
}

#[test]
fn remove_and_keep_matching() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "mix", vec![Some(1), None, Some(2), Some(99), Some(3)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();

    list.remove_matching(Slot::is_absent).unwrap();
    assert_eq!(list.keys(), &keys(&[Some(1), Some(2), Some(3)]));

    list.keep_matching(|s| s.record().is_some_and(|v| v.id != Some(2)))
        .unwrap();
    assert_eq!(list.keys(), &keys(&[Some(1), Some(3)]));
}

#[test]
fn reject_and_select_report_no_change() {
    let store = store();
    let assoc = videos();
    let mut p = find_playlist(&store, 1);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();

    assert!(list.reject(|_| false).unwrap().is_none());
    assert!(list.select(|_| true).unwrap().is_none());
    assert!(list.is_loaded());

    assert!(list.reject(|s| s.record().is_some_and(|v| v.id == Some(2))).unwrap().is_some());
    assert_eq!(list.keys(), &keys(&[Some(3)]));
    assert!(list.select(|_| false).unwrap().is_some());
    assert!(list.is_empty());
}

#[test]
fn map_in_place_rewrites_keys() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "mix", vec![Some(1), None, Some(2)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();
    list.map_in_place(|slot| match slot.record() {
        Some(v) => Value::from(v.id.map(|id| id + 2)),
        None => Value::BigInt(4),
    })
    .unwrap();
    assert_eq!(list.keys(), &keys(&[Some(3), Some(4), Some(4)]));
}

#[test]
fn mutating_a_filtered_view_edits_the_full_sequence() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "mix", vec![None, Some(1), Some(2), Some(3)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store)
        .unwrap()
        .filter(Expr::col("id").ge(2));
    assert_eq!(list.to_vec().unwrap().len(), 2);

    let condition = format!("{:?}", list.condition());
    list.push(4_i64).unwrap();
    assert_eq!(list.len(), 5);
    let names: Vec<_> = list
        .to_vec()
        .unwrap()
        .iter()
        .filter_map(|s| s.record().map(|v| v.name.clone()))
        .collect();
    assert_eq!(
        names,
        vec!["something_big", "escape_from_the_citadel", "food_chain"]
    );
    // the filter survives mutation unchanged
    assert_eq!(format!("{:?}", list.condition()), condition);
    assert_eq!(
        list.to_sql(),
        "SELECT * FROM \"videos\" WHERE \"id\" IN ($1, $2, $3, $4) AND \"id\" >= $5"
    );
    drop(list);
    assert_eq!(p.video_ids, keys(&[None, Some(1), Some(2), Some(3), Some(4)]));
}

#[test]
fn filter_in_place_narrows_and_invalidates() {
    let store = store();
    let assoc = videos();
    let mut p = find_playlist(&store, 3);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();
    assert_eq!(list.to_vec().unwrap().len(), 2);
    list.filter_in_place(Expr::col("id").eq(1));
    assert!(!list.is_loaded());
    assert!(list.eq_records(&[return_of_harmony()]).unwrap());
}

#[test]
fn deferred_operations_run_once_given_a_function() {
    let store = store();
    let assoc = videos();
    let mut p = playlist(9, "mix", vec![Some(1), None, Some(2), Some(2)]);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();

    store.clear_query_log();
    let pending = list.defer(DeferredOp::RemoveMatching);
    assert_eq!(pending.op(), DeferredOp::RemoveMatching);
    assert_eq!(pending.len(), 4);
    // lazy until enumerated
    assert!(store.query_log().is_empty());
    // restartable and finite
    assert_eq!(pending.iter().unwrap().count(), 4);
    assert_eq!(pending.iter().unwrap().filter(|s| s.is_record()).count(), 3);
    assert!(pending.with_predicate(Slot::is_absent).unwrap());
    assert_eq!(list.keys(), &keys(&[Some(1), Some(2), Some(2)]));

    assert!(list.defer(DeferredOp::DedupBy).with_key(|s| s.record().map(|v| v.id)).unwrap());
    assert_eq!(list.keys(), &keys(&[Some(1), Some(2)]));

    assert!(
        list.defer(DeferredOp::MapInPlace)
            .with_transform(|_| Value::BigInt(3))
            .unwrap()
    );
    assert_eq!(list.keys(), &keys(&[Some(3), Some(3)]));

    let fill = list.defer(DeferredOp::FillWith(Some((1, 3))));
    assert_eq!(fill.positions(), 1..3);
    assert_eq!(fill.iter().unwrap().count(), 0);
    assert!(fill.with_index(|i| Value::from(i64::try_from(i).unwrap())).unwrap());
    assert_eq!(list.keys(), &keys(&[Some(3), Some(1), Some(2)]));

    assert!(!list.defer(DeferredOp::KeepMatching).with_predicate(|_| true).unwrap());
}

#[test]
fn deferred_rejects_the_wrong_function_kind() {
    let store = store();
    let assoc = videos();
    let mut p = find_playlist(&store, 1);
    let mut list = fkarray::collection(&assoc, &mut p, &store).unwrap();
    let err = list
        .defer(DeferredOp::MapInPlace)
        .with_predicate(|_| true)
        .unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(list.keys(), &KeySequence::from(vec![2_i64, 3]));
}
