use furnimart_api::routes::health::health_check;

#[tokio::test]
async fn health_reports_service_identity() {
    let response = health_check().await;
    assert!(response.success);
    assert_eq!(response.status_code, 200);
    assert_eq!(response.message, "FurniMart API is running");

    let data = response.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.service, "furnimart-api");
    assert!(!data.version.is_empty());
}
