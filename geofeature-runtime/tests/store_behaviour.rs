//! Behavioural tests for `RuntimeFeatureDataStore` using rstest-bdd.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::Arc;

use geofeature_core::test_support::{RecordingListener, feature_set, point_feature};
use geofeature_core::{
    ChangeEvent, DisplayThresholds, Envelope, Feature, FeatureDataStore, FeatureId,
    FeatureQueryParameters, FeatureSetId, GeometryClass, SpatialFilter,
};
use geofeature_runtime::{PrimaryIndex, RuntimeFeatureDataStore};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

#[derive(Debug, Default)]
struct StoreWorld {
    store: RefCell<RuntimeFeatureDataStore>,
    set: RefCell<Option<FeatureSetId>>,
    members: RefCell<Vec<FeatureId>>,
    inserted: RefCell<Option<Arc<Feature>>>,
    listener: RefCell<Option<Arc<RecordingListener>>>,
    params: RefCell<FeatureQueryParameters>,
    names: RefCell<BTreeSet<String>>,
}

impl StoreWorld {
    #[expect(
        clippy::expect_used,
        reason = "behaviour tests use expect for readable failures"
    )]
    fn set_id(&self) -> FeatureSetId {
        self.set
            .borrow()
            .expect("a feature set should be inserted before use")
    }

    #[expect(
        clippy::expect_used,
        reason = "behaviour tests use expect for readable failures"
    )]
    fn populate(&self, names: &[String]) {
        let store = self.store.borrow();
        let set = store
            .insert_feature_set(feature_set("src", "pts", "Set1"))
            .expect("feature set insert");
        let mut members = Vec::with_capacity(names.len());
        for (x, name) in (0_u32..).zip(names) {
            let feature = store
                .insert_feature(set.id, point_feature(name, f64::from(x), 0.0))
                .expect("feature insert");
            members.push(feature.id);
        }
        self.set.replace(Some(set.id));
        self.members.replace(members);
    }

    #[expect(
        clippy::expect_used,
        reason = "behaviour tests use expect for readable failures"
    )]
    fn set_visible(&self) -> bool {
        self.store
            .borrow()
            .is_feature_set_visible(self.set_id())
            .expect("set visibility")
    }

    fn count(&self, params: &FeatureQueryParameters) -> Result<usize, geofeature_core::StoreError> {
        self.store.borrow().query_features_count(params)
    }
}

#[fixture]
fn world() -> StoreWorld {
    StoreWorld::default()
}

fn numbered(count: u32) -> Vec<String> {
    (0..count).map(|n| format!("feature-{n}")).collect()
}

#[given("an empty data store")]
fn given_empty_store(world: &StoreWorld) {
    world.store.replace(RuntimeFeatureDataStore::new());
}

#[given("a feature set Set1 with unbounded thresholds")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn given_unbounded_set(world: &StoreWorld) {
    let thresholds =
        DisplayThresholds::new(Some(f64::NAN), Some(0.0)).expect("NaN reads as no threshold");
    let set = world
        .store
        .borrow()
        .insert_feature_set(feature_set("src", "pts", "Set1").with_thresholds(thresholds))
        .expect("feature set insert");
    world.set.replace(Some(set.id));
}

#[given("a feature set Set1 with ten point features")]
fn given_ten_features(world: &StoreWorld) {
    world.populate(&numbered(10));
}

#[given("a feature set Set1 with one hundred point features")]
fn given_hundred_features(world: &StoreWorld) {
    world.populate(&numbered(100));
}

#[given("a feature set Set1 with the features abcdef abc and xabc")]
fn given_named_features(world: &StoreWorld) {
    world.populate(&["abcdef".to_owned(), "abc".to_owned(), "xabc".to_owned()]);
}

#[given("a recording listener")]
fn given_listener(world: &StoreWorld) {
    let listener = Arc::new(RecordingListener::new());
    world.store.borrow().add_change_listener(listener.clone());
    world.listener.replace(Some(listener));
}

#[when("a point feature A is inserted at one one")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn when_point_inserted(world: &StoreWorld) {
    let feature = world
        .store
        .borrow()
        .insert_feature(world.set_id(), point_feature("A", 1.0, 1.0))
        .expect("feature insert");
    world.inserted.replace(Some(feature));
}

#[when("nine features are hidden")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn when_nine_hidden(world: &StoreWorld) {
    let store = world.store.borrow();
    for id in world.members.borrow().iter().take(9) {
        store.set_feature_visible(*id, false).expect("hide feature");
    }
}

#[when("the tenth feature is hidden")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn when_tenth_hidden(world: &StoreWorld) {
    let members = world.members.borrow();
    let tenth = members.get(9).expect("ten members");
    world
        .store
        .borrow()
        .set_feature_visible(*tenth, false)
        .expect("hide feature");
}

#[when("one feature is shown again")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn when_one_shown(world: &StoreWorld) {
    let members = world.members.borrow();
    let first = members.first().expect("ten members");
    world
        .store
        .borrow()
        .set_feature_visible(*first, true)
        .expect("show feature");
}

#[when("five features are deleted inside a bulk modification")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn when_bulk_delete(world: &StoreWorld) {
    let store = world.store.borrow();
    store.begin_bulk_modification().expect("begin bulk");
    for id in world.members.borrow().iter().take(5) {
        store.delete_feature(*id).expect("delete feature");
    }
    store.end_bulk_modification(true).expect("end bulk");
}

#[when("features are queried with the name pattern abc%")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn when_wildcard_query(world: &StoreWorld) {
    let params = FeatureQueryParameters::new().with_names(["abc%"]);
    let names = world
        .store
        .borrow()
        .query_features(&params)
        .expect("query")
        .map(|feature| feature.name.clone())
        .collect();
    world.names.replace(names);
    world.params.replace(params);
}

#[when("the feature set is deleted")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn when_set_deleted(world: &StoreWorld) {
    world
        .store
        .borrow()
        .delete_feature_set(world.set_id())
        .expect("delete feature set");
}

#[then("a query by the name A returns only that feature")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn then_found_by_name(world: &StoreWorld) {
    let params = FeatureQueryParameters::new().with_names(["A"]);
    let found: Vec<Arc<Feature>> = world
        .store
        .borrow()
        .query_features(&params)
        .expect("query")
        .collect();
    let inserted = world.inserted.borrow().clone().expect("inserted feature");
    assert_eq!(found, vec![inserted]);
}

#[then("a query by a region excluding one one returns nothing")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn then_region_excludes(world: &StoreWorld) {
    let params = FeatureQueryParameters::new().with_spatial_filter(SpatialFilter::Region(
        Envelope::from_bounds(10.0, 10.0, 20.0, 20.0),
    ));
    assert_eq!(world.count(&params).expect("count"), 0);
}

#[then("the feature set is still visible")]
fn then_set_still_visible(world: &StoreWorld) {
    assert!(world.set_visible());
}

#[then("the feature set is visible")]
fn then_set_visible(world: &StoreWorld) {
    assert!(world.set_visible());
}

#[then("the feature set is not visible")]
fn then_set_hidden(world: &StoreWorld) {
    assert!(!world.set_visible());
}

#[then("every feature reports hidden")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn then_all_hidden(world: &StoreWorld) {
    let store = world.store.borrow();
    for id in world.members.borrow().iter() {
        assert!(!store.is_feature_visible(*id).expect("feature visibility"));
    }
    let visible = FeatureQueryParameters::new().visible_only();
    assert_eq!(world.count(&visible).expect("count"), 0);
}

#[then("the listener received exactly one content change")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn then_one_content_change(world: &StoreWorld) {
    let listener = world.listener.borrow().clone().expect("listener registered");
    assert_eq!(listener.events(), vec![ChangeEvent::ContentChanged]);
}

#[then("the features abcdef and abc match")]
fn then_wildcard_matches(world: &StoreWorld) {
    let expected = BTreeSet::from(["abc".to_owned(), "abcdef".to_owned()]);
    assert_eq!(*world.names.borrow(), expected);
}

#[then("the query plan uses a full scan")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn then_full_scan(world: &StoreWorld) {
    let plan = world
        .store
        .borrow()
        .explain(&world.params.borrow())
        .expect("plan");
    assert_eq!(plan.primary, PrimaryIndex::FullScan);
    assert_eq!(plan.estimate(PrimaryIndex::Names), Some(3));
}

#[then("none of the hundred features can be retrieved by id")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn then_unretrievable(world: &StoreWorld) {
    let store = world.store.borrow();
    let members = world.members.borrow();
    assert_eq!(members.len(), 100);
    for id in members.iter() {
        assert!(store.get_feature(*id).expect("lookup").is_none());
    }
}

#[then("no index returns any of the hundred features")]
#[expect(
    clippy::expect_used,
    reason = "behaviour tests use expect for readable failures"
)]
fn then_absent_from_indexes(world: &StoreWorld) {
    let members = world.members.borrow().clone();
    let by_id = FeatureQueryParameters::new().with_ids(members);
    let by_region =
        FeatureQueryParameters::new().with_spatial_filter(SpatialFilter::Region(Envelope::WORLD));
    let by_name = FeatureQueryParameters::new().with_names(numbered(100));
    let by_class = FeatureQueryParameters::new().with_geometry_types([GeometryClass::Point]);
    for params in [by_id, by_region, by_name, by_class] {
        assert_eq!(world.count(&params).expect("count"), 0);
    }
}

#[scenario(path = "tests/features/data_store.feature", index = 0)]
fn insert_and_query(world: StoreWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/data_store.feature", index = 1)]
fn visibility_collapse(world: StoreWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/data_store.feature", index = 2)]
fn bulk_notifications(world: StoreWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/data_store.feature", index = 3)]
fn wildcard_planning(world: StoreWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/data_store.feature", index = 4)]
fn cascading_set_delete(world: StoreWorld) {
    let _ = world;
}
