use integration_tests::{draft, photo, Harness, COLLECTION};
use pb_core::{DocumentStore, Identity, ReportId, ReportPatch};
use pb_engine::ViewRefresh;
use serde_json::{json, Value};

/// A record in the shape older clients wrote.
fn legacy(owner: &Identity, extra: Value) -> Value {
    let mut fields = json!({
        "userId": owner.id.0,
        "userEmail": owner.email,
        "createdAt": {"seconds": 1_717_236_000i64, "nanoseconds": 0},
        "lostDate": "2024-05-30",
        "location": "kaohsiung",
        "name": "Mochi",
        "breed": "Mixed",
        "gender": "母",
        "collar": "無項圈",
        "contactName": "Lin",
        "contactPhone": "0912345678"
    });
    let target = fields.as_object_mut().unwrap();
    for (key, value) in extra.as_object().cloned().unwrap() {
        target.insert(key, value);
    }
    fields
}

fn keep(images: &[&str]) -> ReportPatch {
    ReportPatch {
        draft: draft("Mochi"),
        retained_images: images.iter().map(|s| s.to_string()).collect(),
    }
}

#[tokio::test]
async fn board_is_ordered_by_instant_whatever_the_timestamp_shape() {
    let h = Harness::new().await;
    let me = h.sign_up("lin");
    let seconds_2020 = h
        .seed(legacy(
            &me,
            json!({"createdAt": {"seconds": 1_577_836_800i64, "nanoseconds": 0}, "imageUrls": ["/a.jpg"]}),
        ))
        .await;
    let millis_2021 = h
        .seed(legacy(
            &me,
            json!({"createdAt": 1_609_459_200_000i64, "imageUrls": ["/b.jpg"]}),
        ))
        .await;
    let text_2024 = h
        .seed(legacy(
            &me,
            json!({"createdAt": "2024-01-01T08:00:00+08:00", "imageUrls": ["/c.jpg"]}),
        ))
        .await;

    let snapshot = h.store.refresh().await.unwrap();
    let ids: Vec<_> = snapshot.iter().map(|r| r.id.0.clone()).collect();
    assert_eq!(ids, vec![text_2024, millis_2021, seconds_2020]);
}

#[tokio::test]
async fn owner_can_edit_a_legacy_record_more_than_once() {
    let h = Harness::new().await;
    let me = h.sign_up("lin");
    let id = ReportId(h.seed(legacy(&me, json!({"imageUrls": ["/b.jpg"]}))).await);
    h.store.refresh().await.unwrap();
    assert!(!h.store.find(&id).await.unwrap().has_collar);

    let receipt = h
        .gateway
        .update(Some(&me), &id, &keep(&["/b.jpg"]), vec![])
        .await
        .unwrap();
    assert_eq!(receipt.view, ViewRefresh::Current);

    let edited = h.store.find(&id).await.expect("edited record left the board");
    assert!(edited.has_collar);
    assert_eq!(edited.owner_id, me.id);
    assert_eq!(edited.images.as_slice(), ["/b.jpg"]);

    let stored = h.documents.get(COLLECTION, &id.0).await.unwrap().unwrap();
    for key in ["collar", "imageUrls", "imageUrl"] {
        assert!(!stored.fields.contains_key(key), "{key} survived the edit");
    }

    h.gateway
        .update(Some(&me), &id, &keep(&["/b.jpg"]), vec![photo("new.jpg")])
        .await
        .unwrap();
    assert_eq!(h.store.find(&id).await.unwrap().images.len(), 2);
}

#[tokio::test]
async fn dropped_legacy_photo_does_not_come_back() {
    let h = Harness::new().await;
    let me = h.sign_up("lin");
    let id = ReportId(
        h.seed(legacy(
            &me,
            json!({"imageUrl": "/legacy.jpg", "images": ["/b.jpg"]}),
        ))
        .await,
    );
    h.store.refresh().await.unwrap();
    assert_eq!(
        h.store.find(&id).await.unwrap().images.as_slice(),
        ["/legacy.jpg", "/b.jpg"]
    );

    h.gateway
        .update(Some(&me), &id, &keep(&["/b.jpg"]), vec![])
        .await
        .unwrap();
    assert_eq!(h.store.find(&id).await.unwrap().images.as_slice(), ["/b.jpg"]);
}

#[tokio::test]
async fn keeping_every_legacy_photo_and_adding_one_stays_within_three() {
    let h = Harness::new().await;
    let me = h.sign_up("lin");
    let id = ReportId(
        h.seed(legacy(
            &me,
            json!({"imageUrl": "/legacy.jpg", "images": ["/b.jpg"]}),
        ))
        .await,
    );
    h.store.refresh().await.unwrap();

    h.gateway
        .update(
            Some(&me),
            &id,
            &keep(&["/legacy.jpg", "/b.jpg"]),
            vec![photo("new.jpg")],
        )
        .await
        .unwrap();
    let report = h.store.find(&id).await.expect("edited record left the board");
    assert_eq!(report.images.len(), 3);
    assert_eq!(report.images.as_slice()[..2], ["/legacy.jpg", "/b.jpg"]);

    let kept: Vec<&str> = report.images.as_slice().iter().map(String::as_str).collect();
    h.gateway
        .update(Some(&me), &id, &keep(&kept), vec![])
        .await
        .unwrap();
    assert_eq!(h.store.find(&id).await.unwrap().images, report.images);
}
