//! Debounce coalescing: a burst of rapid selection changes produces a
//! single settle-and-fetch per affected pipeline, not one fetch per change.

use std::sync::Arc;
use std::time::Duration;

use kardex_catalog::{CareerId, CatalogGateway, MemoryCatalog};
use kardex_core::{CoordinatorConfig, EnrollmentCoordinator, QueryState, SessionIdentity};
use tokio::time::sleep;

const SETTLE: Duration = Duration::from_millis(100);

#[tokio::test(start_paused = true)]
async fn five_rapid_changes_produce_one_courses_fetch() {
    let catalog = Arc::new(MemoryCatalog::new());
    let cycle = catalog.add_cycle("2026B");
    let careers: Vec<CareerId> = (0..5).map(|_| CareerId::new()).collect();
    let final_course = catalog.add_course(careers[4], "Operating Systems", 8);

    let coord = EnrollmentCoordinator::new(
        Arc::clone(&catalog) as Arc<dyn CatalogGateway>,
        SessionIdentity::administrative(),
        CoordinatorConfig { settle: SETTLE },
    );
    coord.set_cycle(Some(cycle));
    // Bootstrap burst settles with no career selected: no courses fetch.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(catalog.fetch_counts().courses, 0);

    // A user scrolling through the career spinner: five changes inside the
    // settle window.
    for career in &careers {
        coord.set_career(Some(*career));
        sleep(Duration::from_millis(10)).await;
    }
    sleep(Duration::from_millis(300)).await;

    assert_eq!(
        catalog.fetch_counts().courses,
        1,
        "burst must coalesce into a single fetch"
    );
    // And that one fetch used the final selection.
    match coord.courses() {
        QueryState::Ready(courses) => {
            assert_eq!(courses.iter().map(|c| c.id).collect::<Vec<_>>(), vec![final_course]);
        }
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn changes_outside_the_window_fetch_separately() {
    let catalog = Arc::new(MemoryCatalog::new());
    let cycle = catalog.add_cycle("2026B");
    let career_a = CareerId::new();
    let career_b = CareerId::new();
    catalog.add_course(career_a, "Physics I", 8);
    catalog.add_course(career_b, "Databases", 8);

    let coord = EnrollmentCoordinator::new(
        Arc::clone(&catalog) as Arc<dyn CatalogGateway>,
        SessionIdentity::administrative(),
        CoordinatorConfig { settle: SETTLE },
    );
    coord.set_cycle(Some(cycle));
    coord.set_career(Some(career_a));
    sleep(Duration::from_millis(300)).await;
    assert_eq!(catalog.fetch_counts().courses, 1);

    coord.set_career(Some(career_b));
    sleep(Duration::from_millis(300)).await;
    assert_eq!(catalog.fetch_counts().courses, 2);
}
