//! Integration tests for the geocoding client (wiremock-based)

use integration_geocoding::{
    ErrorCode, GeocodeOptions, GeocodingClient, GeocodingConfig, NominatimGeocodingClient,
    ReverseOptions, format_address,
};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> NominatimGeocodingClient {
    NominatimGeocodingClient::new(&GeocodingConfig::for_testing(server.uri())).unwrap()
}

const fn sample_search_json() -> &'static str {
    r#"[
        {
            "place_id": 101,
            "lat": "-38.7390",
            "lon": "-72.6010",
            "display_name": "Avenida Alemania, Temuco, Cautín, Araucanía, Chile",
            "type": "residential",
            "importance": 0.6,
            "address": { "road": "Avenida Alemania", "city": "Temuco", "state": "Araucanía", "country": "Chile" }
        },
        {
            "place_id": 102,
            "lat": "-38.7397",
            "lon": "-72.5984",
            "display_name": "1450, Avenida Alemania, Temuco, Araucanía, Chile",
            "type": "house",
            "importance": 0.9,
            "boundingbox": ["-38.7398", "-38.7396", "-72.5985", "-72.5983"],
            "address": {
                "house_number": "1450",
                "road": "Avenida Alemania",
                "suburb": "Centro",
                "city": "Temuco",
                "state": "Araucanía",
                "postcode": "4780000",
                "country": "Chile"
            }
        }
    ]"#
}

#[tokio::test]
async fn test_geocode_sorted_by_importance() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Av. Alemania 1450, Temuco, Chile"))
        .and(query_param("countrycodes", "cl"))
        .and(query_param("format", "json"))
        .and(query_param("addressdetails", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sample_search_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = GeocodeOptions::default()
        .with_city("Temuco")
        .with_country("Chile")
        .with_country_code("cl");

    let results = assert_ok!(client.geocode("Av. Alemania 1450", &options).await);

    assert_eq!(results.len(), 2);
    assert!((results[0].importance - 0.9).abs() < f64::EPSILON);
    assert!((results[1].importance - 0.6).abs() < f64::EPSILON);
    assert_eq!(results[0].place_id.as_deref(), Some("102"));
    assert!((results[0].lat + 38.7397).abs() < 1e-9);
    assert_eq!(
        results[0].formatted(),
        "Avenida Alemania 1450, Centro, Temuco, Araucanía"
    );
    let bbox = results[0].bounding_box.unwrap();
    assert!((bbox.south + 38.7398).abs() < 1e-9);
    assert!((bbox.east + 72.5983).abs() < 1e-9);
    assert!(results[1].bounding_box.is_none());
}

#[tokio::test]
async fn test_geocode_sends_user_agent_and_language() {
    let server = MockServer::start().await;
    let config = GeocodingConfig {
        accept_language: Some("es-CL".to_string()),
        ..GeocodingConfig::for_testing(server.uri())
    };

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(header("user-agent", config.user_agent.as_str()))
        .and(query_param("accept-language", "es-CL"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sample_search_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = NominatimGeocodingClient::new(&config).unwrap();
    assert_ok!(client.geocode("Temuco", &GeocodeOptions::default()).await);
}

#[tokio::test]
async fn test_geocode_served_from_cache() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sample_search_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = GeocodeOptions::default().with_city("Temuco");

    let first = assert_ok!(client.geocode("Av. Alemania 1450", &options).await);
    let second = assert_ok!(client.geocode("Av. Alemania 1450", &options).await);
    assert_eq!(first, second);
    assert_eq!(client.stats().cache_entries, 1);
    assert!(client.stats().last_request_at.is_some());
}

#[tokio::test]
async fn test_geocode_without_cache_always_queries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sample_search_json()))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = GeocodeOptions::default().without_cache();

    assert_ok!(client.geocode("Temuco", &options).await);
    assert_ok!(client.geocode("Temuco", &options).await);
    // Bypassing reads still writes the result back
    assert_eq!(client.stats().cache_entries, 1);
}

#[tokio::test]
async fn test_geocode_not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = assert_err!(client.geocode("Temuco", &GeocodeOptions::default()).await);
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_geocode_empty_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = assert_err!(
        client
            .geocode("Calle Inexistente 999", &GeocodeOptions::default())
            .await
    );
    assert_eq!(err.code(), ErrorCode::NoResults);
    assert!(err.to_string().contains("Calle Inexistente 999"));
}

#[tokio::test]
async fn test_geocode_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = assert_err!(client.geocode("Temuco", &GeocodeOptions::default()).await);
    assert_eq!(err.code(), ErrorCode::ServerError);
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_geocode_rate_limited_exhausts_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = assert_err!(client.geocode("Temuco", &GeocodeOptions::default()).await);
    assert_eq!(err.code(), ErrorCode::RateLimitExceeded);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_geocode_recovers_after_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sample_search_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let results = assert_ok!(client.geocode("Temuco", &GeocodeOptions::default()).await);
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn test_geocode_unreachable_upstream() {
    // Bind then release a port so nothing is listening on it
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let config = GeocodingConfig::for_testing(format!("http://127.0.0.1:{port}"));
    let client = NominatimGeocodingClient::new(&config).unwrap();

    let err = assert_err!(client.geocode("Temuco", &GeocodeOptions::default()).await);
    assert_eq!(err.code(), ErrorCode::NetworkError);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_geocode_blank_address_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = assert_err!(client.geocode("  ", &GeocodeOptions::default()).await);
    assert_eq!(err.code(), ErrorCode::InvalidInput);
}

#[tokio::test]
async fn test_reverse_geocode_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", "-38.7397"))
        .and(query_param("lon", "-72.5984"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"address": {"road": "Av. Alemania", "city": "Temuco"}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = assert_ok!(
        client
            .reverse_geocode(-38.7397, -72.5984, &ReverseOptions::default())
            .await
    );

    assert_eq!(format_address(&result.address, None), "Av. Alemania, Temuco");
    assert_eq!(result.formatted(), "Av. Alemania, Temuco");
    assert!((result.lat + 38.7397).abs() < 1e-9);
    assert!((result.lng + 72.5984).abs() < 1e-9);
}

#[tokio::test]
async fn test_reverse_geocode_town_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{
                "lat": "-39.2833",
                "lon": "-72.2333",
                "display_name": "Pucón, Cautín, Araucanía, Chile",
                "address": { "town": "Pucón", "state": "Araucanía", "road": "" }
            }"#,
        ))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = assert_ok!(
        client
            .reverse_geocode(-39.2833, -72.2333, &ReverseOptions::default())
            .await
    );
    assert_eq!(result.address.city.as_deref(), Some("Pucón"));
    assert!(result.address.road.is_none());
    assert_eq!(result.formatted_short(), "Pucón");
}

#[tokio::test]
async fn test_reverse_geocode_error_marker() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"error": "Unable to geocode"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = assert_err!(
        client
            .reverse_geocode(-60.0, -100.0, &ReverseOptions::default())
            .await
    );
    assert_eq!(err.code(), ErrorCode::ReverseGeocodeFailed);
}

#[tokio::test]
async fn test_reverse_geocode_invalid_coordinates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = assert_err!(
        client
            .reverse_geocode(91.0, 0.0, &ReverseOptions::default())
            .await
    );
    assert_eq!(err.code(), ErrorCode::InvalidCoordinates);

    let err = assert_err!(
        client
            .reverse_geocode(0.0, -180.5, &ReverseOptions::default())
            .await
    );
    assert_eq!(err.code(), ErrorCode::InvalidCoordinates);
}
