//! Tests for the record indexes.

use super::*;
use geofeature_core::test_support::{feature_set, point_feature};
use geofeature_core::{Envelope, Geometry};
use rstest::{fixture, rstest};

#[fixture]
fn indexes() -> FeatureIndexes {
    FeatureIndexes::new(4, 8)
}

fn with_set(indexes: &mut FeatureIndexes) -> FeatureSetId {
    indexes
        .insert_set(feature_set("src", "pts", "Set1"))
        .expect("set insert")
        .id
}

#[rstest]
fn ids_are_assigned_from_one(mut indexes: FeatureIndexes) {
    let set = with_set(&mut indexes);
    assert_eq!(set, FeatureSetId(1));
    let first = indexes
        .insert_feature(set, point_feature("a", 0.0, 0.0))
        .expect("insert");
    let second = indexes
        .insert_feature(set, point_feature("b", 0.0, 0.0))
        .expect("insert");
    assert_eq!((first.id, second.id), (FeatureId(1), FeatureId(2)));
    assert_eq!(first.version, INITIAL_VERSION);
}

#[rstest]
fn explicit_ids_advance_the_generator(mut indexes: FeatureIndexes) {
    let set = with_set(&mut indexes);
    indexes
        .insert_feature(set, point_feature("a", 0.0, 0.0).with_id(FeatureId(40)))
        .expect("insert");
    let next = indexes
        .insert_feature(set, point_feature("b", 0.0, 0.0))
        .expect("insert");
    assert_eq!(next.id, FeatureId(41));
}

#[rstest]
fn duplicate_explicit_ids_are_rejected(mut indexes: FeatureIndexes) {
    let set = with_set(&mut indexes);
    indexes
        .insert_feature(set, point_feature("a", 0.0, 0.0).with_id(FeatureId(3)))
        .expect("insert");
    let err = indexes
        .insert_feature(set, point_feature("b", 0.0, 0.0).with_id(FeatureId(3)))
        .expect_err("duplicate id");
    assert!(matches!(err, StoreError::InvalidArgument { .. }));
    assert_eq!(indexes.feature_count(), 1);

    let err = indexes
        .insert_set(feature_set("p", "t", "n").with_id(set))
        .expect_err("duplicate set id");
    assert!(matches!(err, StoreError::InvalidArgument { .. }));
}

#[rstest]
fn inserting_into_a_missing_set_fails(mut indexes: FeatureIndexes) {
    let err = indexes
        .insert_feature(FeatureSetId(9), point_feature("a", 0.0, 0.0))
        .expect_err("missing set");
    assert_eq!(err, StoreError::NoSuchFeatureSet(FeatureSetId(9)));
}

#[rstest]
fn updates_move_index_entries(mut indexes: FeatureIndexes) {
    let set = with_set(&mut indexes);
    let feature = indexes
        .insert_feature(set, point_feature("Alpha", 1.0, 1.0))
        .expect("insert");
    let update = FeatureUpdate::new().name("Beta").geometry(Geometry::LineString(
        geo::LineString::from(vec![(10.0, 10.0), (12.0, 12.0)]),
    ));
    let updated = indexes.update_feature(feature.id, &update).expect("update");

    assert_eq!(updated.version, feature.version + 1);
    assert!(indexes.features_named("alpha").is_none());
    assert!(
        indexes
            .features_named("beta")
            .is_some_and(|bucket| bucket.contains(&feature.id))
    );
    assert!(indexes.features_of_class(GeometryClass::Point).is_none());
    assert!(indexes.features_of_class(GeometryClass::LineString).is_some());
    let old_spot = Envelope::from_bounds(0.5, 0.5, 1.5, 1.5);
    assert!(indexes.spatial().query(&old_spot).is_empty());
    let new_spot = Envelope::from_bounds(11.0, 11.0, 11.5, 11.5);
    assert_eq!(indexes.spatial().query(&new_spot), vec![feature.id]);
}

#[rstest]
fn removing_a_set_unindexes_its_members(mut indexes: FeatureIndexes) {
    let set = with_set(&mut indexes);
    for n in 0..20 {
        indexes
            .insert_feature(set, point_feature("same", f64::from(n), 0.0))
            .expect("insert");
    }
    let removed = indexes.remove_set(set).expect("remove");
    assert_eq!(removed.len(), 20);
    assert_eq!(indexes.feature_count(), 0);
    assert_eq!(indexes.set_count(), 0);
    assert!(indexes.features_named("same").is_none());
    assert!(indexes.sets_named("set1").is_none());
    assert!(indexes.spatial().is_empty());
}

#[rstest]
fn renaming_a_set_reindexes_it(mut indexes: FeatureIndexes) {
    let set = with_set(&mut indexes);
    let update = FeatureSetUpdate {
        name: Some("Renamed".to_owned()),
        thresholds: None,
    };
    let record = indexes.update_set(set, update).expect("update");
    assert_eq!(record.version, INITIAL_VERSION + 1);
    assert!(indexes.sets_named("set1").is_none());
    assert!(indexes.sets_named("renamed").is_some());
}

#[rstest]
fn time_bounds_track_timestamps(mut indexes: FeatureIndexes) {
    let set = with_set(&mut indexes);
    assert_eq!(indexes.time_bounds(), None);
    let early = indexes
        .insert_feature(set, point_feature("a", 0.0, 0.0).with_timestamp(10))
        .expect("insert");
    indexes
        .insert_feature(set, point_feature("b", 0.0, 0.0).with_timestamp(30))
        .expect("insert");
    assert_eq!(indexes.time_bounds(), Some((10, 30)));
    indexes.remove_feature(early.id).expect("remove");
    assert_eq!(indexes.time_bounds(), Some((30, 30)));
}

#[rstest]
fn deleting_a_visible_member_keeps_the_collapse_invariant(mut indexes: FeatureIndexes) {
    let set = with_set(&mut indexes);
    let hidden = indexes
        .insert_feature(set, point_feature("a", 0.0, 0.0))
        .expect("insert");
    let shown = indexes
        .insert_feature(set, point_feature("b", 0.0, 0.0))
        .expect("insert");
    assert!(indexes.set_feature_visible(hidden.id, false).expect("visibility"));
    indexes.remove_feature(shown.id).expect("remove");
    assert_eq!(indexes.is_feature_visible(hidden.id), Ok(false));
    assert_eq!(indexes.is_set_visible(set), Ok(false));
}
