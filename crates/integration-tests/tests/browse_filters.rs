use chrono::{Duration, Utc};
use integration_tests::Harness;
use pb_core::record::format_timestamp;
use pb_core::{FilterCriteria, RawFilter};
use serde_json::json;

async fn seed(h: &Harness, name: &str, location: &str, collar: serde_json::Value, days_ago: i64) {
    let created = format_timestamp(Utc::now() - Duration::days(days_ago));
    h.seed(json!({
        "ownerId": "u1",
        "ownerEmail": "u1@example.com",
        "createdAt": created,
        "lostDate": "2024-05-30",
        "location": location,
        "name": name,
        "breed": "Mixed",
        "color": "Brown",
        "age": "2",
        "gender": "female",
        "hasCollar": collar,
        "images": ["/static/uploads/pets/x.jpg"],
        "contactName": "Lin",
        "contactPhone": "0912345678"
    }))
    .await;
}

fn names(h: &Harness) -> Vec<String> {
    h.store.view().reports.iter().map(|r| r.name.clone()).collect()
}

async fn browse(h: &Harness, pairs: &[(&str, &str)]) -> Vec<String> {
    h.store
        .set_criteria(FilterCriteria::from(RawFilter::from_pairs(pairs.iter().copied())))
        .await;
    names(h)
}

#[tokio::test]
async fn region_date_and_collar_filters_combine() {
    let h = Harness::new().await;
    seed(&h, "A", "taipei", json!(true), 3).await;
    seed(&h, "Old", "taipei", json!(true), 20).await;
    seed(&h, "South", "kaohsiung", json!(false), 1).await;
    h.store.refresh().await.unwrap();

    assert_eq!(browse(&h, &[]).await, vec!["South", "A", "Old"]);
    assert_eq!(browse(&h, &[("region", "taipei"), ("date", "week")]).await, vec!["A"]);
    assert_eq!(browse(&h, &[("region", "kaohsiung")]).await, vec!["South"]);
    assert_eq!(browse(&h, &[("collar", "false")]).await, vec!["South"]);
    assert_eq!(browse(&h, &[("date", "month")]).await, vec!["South", "A", "Old"]);
}

#[tokio::test]
async fn legacy_records_and_unknown_values() {
    let h = Harness::new().await;
    seed(&h, "Legacy", "tainan", json!("有項圈"), 2).await;
    h.seed(json!({"name": "Broken", "images": []})).await;
    h.store.refresh().await.unwrap();

    // the malformed record is skipped, the legacy one is readable
    assert_eq!(names(&h), vec!["Legacy"]);
    assert_eq!(browse(&h, &[("collar", "true")]).await, vec!["Legacy"]);

    // unrecognized values place no constraint
    assert_eq!(
        browse(&h, &[("region", "atlantis"), ("date", "fortnight")]).await,
        vec!["Legacy"]
    );

    assert_eq!(browse(&h, &[("search", "  MIXED ")]).await, vec!["Legacy"]);
    assert!(browse(&h, &[("search", "poodle")]).await.is_empty());

    h.store.reset_criteria().await;
    assert_eq!(names(&h), vec!["Legacy"]);
}
