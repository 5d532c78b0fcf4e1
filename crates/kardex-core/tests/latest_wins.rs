//! The central correctness property: visible derived state is always
//! consistent with the most recently observed selection, never a stale one,
//! even when fetches complete out of order.

use std::sync::Arc;
use std::time::Duration;

use kardex_catalog::{CareerId, CatalogGateway, MemoryCatalog};
use kardex_core::{CoordinatorConfig, EnrollmentCoordinator, QueryState, SessionIdentity};
use tokio::time::sleep;

const SETTLE: Duration = Duration::from_millis(100);

fn coordinator(catalog: &Arc<MemoryCatalog>) -> EnrollmentCoordinator {
    EnrollmentCoordinator::new(
        Arc::clone(catalog) as Arc<dyn CatalogGateway>,
        SessionIdentity::administrative(),
        CoordinatorConfig { settle: SETTLE },
    )
}

#[tokio::test(start_paused = true)]
async fn slow_superseded_fetch_never_overwrites_newer_result() {
    let catalog = Arc::new(MemoryCatalog::new());
    let cycle = catalog.add_cycle("2026B");
    let career_a = CareerId::new();
    let career_b = CareerId::new();
    catalog.add_course(career_a, "Physics I", 8);
    let databases = catalog.add_course(career_b, "Databases", 8);
    // Career A answers slowly, career B fast: A's fetch is issued first but
    // completes long after B's.
    catalog.set_courses_latency(career_a, Duration::from_millis(500));
    catalog.set_courses_latency(career_b, Duration::from_millis(50));

    let coord = coordinator(&catalog);
    coord.set_cycle(Some(cycle));
    coord.set_career(Some(career_a));
    // Let the first burst settle so A's fetch is actually on the wire.
    sleep(Duration::from_millis(150)).await;

    coord.set_career(Some(career_b));
    // B's fetch settles at +100ms and lands at +150ms; A's lands around
    // +450ms from here and must be discarded as stale.
    sleep(Duration::from_millis(600)).await;

    match coord.courses() {
        QueryState::Ready(courses) => {
            assert_eq!(
                courses.iter().map(|c| c.id).collect::<Vec<_>>(),
                vec![databases],
                "visible courses must come from the latest selection"
            );
        }
        other => panic!("expected Ready, got {other:?}"),
    }
    // Both fetches were issued; the slow one completed and was dropped at
    // the publication gate.
    assert_eq!(catalog.fetch_counts().courses, 2);
}

#[tokio::test(start_paused = true)]
async fn stale_result_never_becomes_visible_even_transiently() {
    let catalog = Arc::new(MemoryCatalog::new());
    let cycle = catalog.add_cycle("2026B");
    let career_a = CareerId::new();
    let career_b = CareerId::new();
    let physics = catalog.add_course(career_a, "Physics I", 8);
    let databases = catalog.add_course(career_b, "Databases", 8);
    catalog.set_courses_latency(career_a, Duration::from_millis(500));
    catalog.set_courses_latency(career_b, Duration::from_millis(50));

    let coord = coordinator(&catalog);
    let mut watch = coord.watch_courses();
    coord.set_cycle(Some(cycle));
    coord.set_career(Some(career_a));
    sleep(Duration::from_millis(150)).await;
    coord.set_career(Some(career_b));

    // Collect every publication over the window in which both fetches
    // complete; A's payload must appear in none of them.
    let mut seen = Vec::new();
    let deadline = sleep(Duration::from_millis(800));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            state = watch.next() => match state {
                Some(state) => seen.push(state),
                None => break,
            },
        }
    }

    for state in &seen {
        if let QueryState::Ready(courses) = state {
            assert!(
                courses.iter().all(|c| c.id != physics),
                "superseded result became visible: {state:?}"
            );
        }
    }
    match seen.last() {
        Some(QueryState::Ready(courses)) => {
            assert_eq!(courses.iter().map(|c| c.id).collect::<Vec<_>>(), vec![databases]);
        }
        other => panic!("expected final Ready publication, got {other:?}"),
    }
}
