//! Descendant invalidation: changing an ancestor selection clears every
//! dependent key and resets the dependent lists to empty without waiting on
//! the network.

use std::sync::Arc;
use std::time::Duration;

use kardex_catalog::{CareerId, CatalogGateway, MemoryCatalog};
use kardex_core::{CoordinatorConfig, EnrollmentCoordinator, QueryState, SessionIdentity};
use tokio::time::sleep;

const SETTLE: Duration = Duration::from_millis(100);

#[tokio::test(start_paused = true)]
async fn career_change_clears_course_and_group_and_empties_groups_list() {
    let catalog = Arc::new(MemoryCatalog::new());
    let cycle = catalog.add_cycle("2026B");
    let career = CareerId::new();
    let course = catalog.add_course(career, "Compilers", 8);
    let group = catalog.add_group(course, cycle, "D01", 30);

    let coord = EnrollmentCoordinator::new(
        Arc::clone(&catalog) as Arc<dyn CatalogGateway>,
        SessionIdentity::administrative(),
        CoordinatorConfig { settle: SETTLE },
    );

    coord.set_career(Some(career));
    coord.set_cycle(Some(cycle));
    sleep(Duration::from_millis(300)).await;
    coord.set_course(Some(course));
    sleep(Duration::from_millis(300)).await;
    coord.set_group(Some(group));
    sleep(Duration::from_millis(300)).await;

    match coord.groups() {
        QueryState::Ready(groups) => assert_eq!(groups.len(), 1),
        other => panic!("expected populated groups, got {other:?}"),
    }
    let groups_fetches = catalog.fetch_counts().groups;

    // Ancestor change: course and group must unset synchronously.
    coord.set_career(Some(CareerId::new()));
    let sel = coord.selection();
    assert_eq!(sel.course, None);
    assert_eq!(sel.group, None);
    assert_eq!(sel.cycle, Some(cycle), "cycle does not depend on career");

    // After the settle the groups pipeline publishes empty without having
    // issued any fetch: its inputs are gone.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(coord.groups(), QueryState::Ready(vec![]));
    assert_eq!(catalog.fetch_counts().groups, groups_fetches);
}

#[tokio::test(start_paused = true)]
async fn redundant_setter_does_not_reevaluate_pipelines() {
    let catalog = Arc::new(MemoryCatalog::new());
    let cycle = catalog.add_cycle("2026B");
    let career = CareerId::new();
    catalog.add_course(career, "Compilers", 8);

    let coord = EnrollmentCoordinator::new(
        Arc::clone(&catalog) as Arc<dyn CatalogGateway>,
        SessionIdentity::administrative(),
        CoordinatorConfig { settle: SETTLE },
    );
    coord.set_career(Some(career));
    coord.set_cycle(Some(cycle));
    sleep(Duration::from_millis(300)).await;
    let baseline = catalog.fetch_counts();

    // Same values again: no pulse, no re-fetch anywhere.
    coord.set_career(Some(career));
    coord.set_cycle(Some(cycle));
    sleep(Duration::from_millis(300)).await;
    assert_eq!(catalog.fetch_counts(), baseline);
}
