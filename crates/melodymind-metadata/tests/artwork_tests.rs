use melodymind_config::ArtworkConfig;
use melodymind_metadata::artwork::{ArtworkError, ArtworkProvider, ArtworkResolver};
use melodymind_metadata::lastfm::LastFmClient;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn artwork_config(itunes: &MockServer, wikipedia: &MockServer) -> ArtworkConfig {
    ArtworkConfig {
        itunes_base_url: Some(itunes.uri()),
        itunes_regions: vec!["US".to_string(), "NP".to_string()],
        wikipedia_base_url: Some(wikipedia.uri()),
        ..ArtworkConfig::default()
    }
}

#[tokio::test]
async fn test_resolve_prefers_lastfm_images_by_size() {
    let lastfm_server = MockServer::start().await;
    let itunes_server = MockServer::start().await;
    let wikipedia_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("method", "track.getInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "track": {
                "name": "Numb",
                "artist": { "name": "Linkin Park" },
                "album": { "image": [
                    { "#text": "https://img.example/m.png", "size": "medium" },
                    { "#text": "https://img.example/l.png", "size": "large" }
                ] }
            }
        })))
        .expect(1)
        .mount(&lastfm_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(0)
        .mount(&itunes_server)
        .await;

    let lastfm = Arc::new(LastFmClient::new(
        "test_api_key".to_string(),
        Some(lastfm_server.uri()),
    ));
    let resolver = ArtworkResolver::from_config(
        &artwork_config(&itunes_server, &wikipedia_server),
        Some(lastfm),
    );

    let result = resolver.resolve("Linkin Park", Some("Numb")).await.unwrap();
    assert_eq!(result.provider, ArtworkProvider::LastFm);
    assert_eq!(result.image_url, "https://img.example/l.png");
}

#[tokio::test]
async fn test_resolve_falls_back_to_itunes_regions() {
    let lastfm_server = MockServer::start().await;
    let itunes_server = MockServer::start().await;
    let wikipedia_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("lastfm down"))
        .mount(&lastfm_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("country", "US"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultCount": 0,
            "results": []
        })))
        .expect(1)
        .mount(&itunes_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("country", "NP"))
        .and(query_param("entity", "song"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultCount": 1,
            "results": [{ "artworkUrl100": "https://is1.example/cover/100x100bb.jpg" }]
        })))
        .expect(1)
        .mount(&itunes_server)
        .await;

    let lastfm = Arc::new(LastFmClient::new(
        "test_api_key".to_string(),
        Some(lastfm_server.uri()),
    ));
    let resolver = ArtworkResolver::from_config(
        &artwork_config(&itunes_server, &wikipedia_server),
        Some(lastfm),
    );

    let result = resolver.resolve("Night", Some("Aakash")).await.unwrap();
    assert_eq!(result.provider, ArtworkProvider::Itunes);
    assert_eq!(result.image_url, "https://is1.example/cover/600x600bb.jpg");
}

#[tokio::test]
async fn test_resolve_uses_wikipedia_for_artist_lookups() {
    let itunes_server = MockServer::start().await;
    let wikipedia_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&itunes_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page/summary/Sigur_R%C3%B3s"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Sigur Rós",
            "thumbnail": { "source": "https://upload.example/sigur.jpg", "width": 320 }
        })))
        .expect(1)
        .mount(&wikipedia_server)
        .await;

    let resolver =
        ArtworkResolver::from_config(&artwork_config(&itunes_server, &wikipedia_server), None);

    let result = resolver.resolve("Sigur Rós", None).await.unwrap();
    assert_eq!(result.provider, ArtworkProvider::Wikipedia);
    assert_eq!(result.image_url, "https://upload.example/sigur.jpg");

    // second lookup is served from the cache
    let cached = resolver.resolve("sigur rós ", None).await.unwrap();
    assert_eq!(cached, result);
}

#[tokio::test]
async fn test_resolve_skips_wikipedia_for_track_lookups() {
    let itunes_server = MockServer::start().await;
    let wikipedia_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&itunes_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "thumbnail": { "source": "https://upload.example/x.jpg" }
        })))
        .expect(0)
        .mount(&wikipedia_server)
        .await;

    let resolver =
        ArtworkResolver::from_config(&artwork_config(&itunes_server, &wikipedia_server), None);

    let result = resolver.resolve("Somebody", Some("Something")).await;
    assert!(matches!(result, Err(ArtworkError::NoArtworkFound)));
}

#[tokio::test]
async fn test_resolve_reports_when_every_provider_failed() {
    let itunes_server = MockServer::start().await;
    let wikipedia_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&itunes_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&wikipedia_server)
        .await;

    let resolver =
        ArtworkResolver::from_config(&artwork_config(&itunes_server, &wikipedia_server), None);

    match resolver.resolve("Anyone", None).await {
        Err(ArtworkError::ProvidersFailed(errors)) => {
            let providers: Vec<_> = errors.iter().map(|error| error.provider).collect();
            assert_eq!(
                providers,
                vec![ArtworkProvider::Itunes, ArtworkProvider::Wikipedia]
            );
        }
        other => panic!("expected ProvidersFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_wikipedia_page_is_not_a_failure() {
    let itunes_server = MockServer::start().await;
    let wikipedia_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&itunes_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "type": "not_found" })))
        .mount(&wikipedia_server)
        .await;

    let resolver =
        ArtworkResolver::from_config(&artwork_config(&itunes_server, &wikipedia_server), None);

    let result = resolver.resolve("Unknown Band", None).await;
    assert!(matches!(result, Err(ArtworkError::NoArtworkFound)));
}
