use holocron::database_ops::models::{NewFilm, NewPlanet};
use holocron::database_ops::swapi::{import_official_data, import_on_startup, ImportSummary};
use holocron::database_ops::{films, planets};
use holocron::{AppConfig, AppError, Db, ImportConfig};
use httpmock::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;

fn config(server: &MockServer) -> ImportConfig {
    ImportConfig {
        base_url: server.url("/api"),
        max_retries: 1,
        backoff: Duration::from_millis(5),
        request_timeout: Duration::from_secs(5),
        deadline: Duration::from_secs(30),
        expected_films: 2,
        expected_planets: 3,
    }
}

fn film_page(server: &MockServer) -> serde_json::Value {
    json!({
        "count": 2,
        "next": null,
        "results": [
            {"title": "A New Hope", "release_date": "1977-05-25", "url": server.url("/api/films/1/")},
            {"title": "The Empire Strikes Back", "release_date": "1980-05-17", "url": server.url("/api/films/2/")}
        ]
    })
}

/// Two planet pages chained through `next`.
async fn mock_swapi(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/films/");
            then.status(200).json_body(film_page(server));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/planets/");
            then.status(200).json_body(json!({
                "count": 3,
                "next": server.url("/api/planets/more/"),
                "results": [
                    {
                        "name": "Tatooine",
                        "climate": "arid",
                        "diameter": "10465",
                        "population": "200000",
                        "films": [server.url("/api/films/1/")]
                    },
                    {
                        "name": "Hoth",
                        "climate": "frozen",
                        "diameter": "7200",
                        "population": "unknown",
                        "films": [server.url("/api/films/2/")]
                    }
                ]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/planets/more/");
            then.status(200).json_body(json!({
                "count": 3,
                "next": null,
                "results": [
                    {
                        "name": "Dagobah",
                        "climate": "murky",
                        "diameter": "8900",
                        "population": "unknown",
                        "films": [server.url("/api/films/2/"), server.url("/api/films/1/")]
                    }
                ]
            }));
        })
        .await;
}

#[tokio::test]
async fn imports_every_page_with_links() {
    let server = MockServer::start_async().await;
    mock_swapi(&server).await;
    let db = Db::connect_in_memory().await.unwrap();

    let summary = import_official_data(&db, &config(&server)).await.unwrap();
    assert_eq!(
        summary,
        ImportSummary {
            skipped: false,
            films_created: 2,
            films_reused: 0,
            planets_created: 3,
            planets_skipped: 0,
            associations_created: 4,
        }
    );

    let counts = db.counts().await.unwrap();
    assert_eq!(counts.official_films, 2);
    assert_eq!(counts.official_planets, 3);
    assert_eq!(counts.official_associations, 4);

    let all = planets::list(&db).await.unwrap();
    let hoth = all.iter().find(|p| p.name == "Hoth").unwrap();
    assert_eq!(hoth.population, None);
    assert_eq!(hoth.diameter, Some(7200.0));
    assert_eq!(hoth.climates.as_deref(), Some("frozen"));

    let dagobah = all.iter().find(|p| p.name == "Dagobah").unwrap();
    assert_eq!(dagobah.films.len(), 2);
}

#[tokio::test]
async fn second_run_is_skipped() {
    let server = MockServer::start_async().await;
    mock_swapi(&server).await;
    let db = Db::connect_in_memory().await.unwrap();
    let config = config(&server);

    import_official_data(&db, &config).await.unwrap();
    let before = db.counts().await.unwrap();

    let summary = import_official_data(&db, &config).await.unwrap();
    assert!(summary.skipped);
    assert_eq!(db.counts().await.unwrap(), before);
}

#[tokio::test]
async fn rerun_below_threshold_creates_no_duplicates() {
    let server = MockServer::start_async().await;
    mock_swapi(&server).await;
    let db = Db::connect_in_memory().await.unwrap();
    let mut config = config(&server);
    config.expected_planets = 100;

    import_official_data(&db, &config).await.unwrap();
    let summary = import_official_data(&db, &config).await.unwrap();

    assert!(!summary.skipped);
    assert_eq!(summary.films_reused, 2);
    assert_eq!(summary.films_created, 0);
    assert_eq!(summary.planets_skipped, 3);
    assert_eq!(summary.associations_created, 0);

    let counts = db.counts().await.unwrap();
    assert_eq!(counts.films, 2);
    assert_eq!(counts.planets, 3);
    assert_eq!(counts.associations, 4);
}

#[tokio::test]
async fn user_rows_are_reused_and_left_alone() {
    let server = MockServer::start_async().await;
    mock_swapi(&server).await;
    let db = Db::connect_in_memory().await.unwrap();

    // a client already created a film and a planet with canonical names
    let film = films::create(
        &db,
        NewFilm {
            title: "A New Hope".into(),
            release_date: chrono::NaiveDate::from_ymd_opt(1977, 5, 25).unwrap(),
            official: false,
        },
        &BTreeSet::new(),
    )
    .await
    .unwrap();
    let planet = planets::create(
        &db,
        NewPlanet {
            name: "Tatooine".into(),
            climates: Some("sandy".into()),
            diameter: None,
            population: None,
            official: false,
        },
        &BTreeSet::new(),
    )
    .await
    .unwrap();

    let summary = import_official_data(&db, &config(&server)).await.unwrap();
    assert_eq!(summary.films_reused, 1);
    assert_eq!(summary.films_created, 1);
    assert_eq!(summary.planets_skipped, 1);
    assert_eq!(summary.planets_created, 2);

    let tatooine = planets::get(&db, planet.id).await.unwrap();
    assert_eq!(tatooine.climates.as_deref(), Some("sandy"));
    assert!(tatooine.films.is_empty());

    // Dagobah still links to the reused film
    let reused = films::get(&db, film.id).await.unwrap();
    assert_eq!(reused.planets.len(), 1);
}

#[tokio::test]
async fn server_errors_fail_after_retries() {
    let server = MockServer::start_async().await;
    let films_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/films/");
            then.status(503);
        })
        .await;
    let db = Db::connect_in_memory().await.unwrap();

    let err = import_official_data(&db, &config(&server)).await.unwrap_err();
    assert!(matches!(err, AppError::UpstreamStatus { status: 503, .. }));
    // one attempt plus one retry
    films_mock.assert_hits_async(2).await;
    assert_eq!(db.counts().await.unwrap().films, 0);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/films/");
            then.status(200).json_body(film_page(&server));
        })
        .await;
    let planets_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/planets/");
            then.status(404);
        })
        .await;
    let db = Db::connect_in_memory().await.unwrap();

    let err = import_official_data(&db, &config(&server)).await.unwrap_err();
    assert_eq!(err.code(), "upstream_failure");
    planets_mock.assert_hits_async(1).await;

    // films committed before the planet failure stay; the next run reuses them
    assert_eq!(db.counts().await.unwrap().official_films, 2);
}

#[tokio::test]
async fn malformed_payload_is_an_upstream_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/films/");
            then.status(200).body("<html>maintenance</html>");
        })
        .await;
    let db = Db::connect_in_memory().await.unwrap();

    let err = import_official_data(&db, &config(&server)).await.unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));
}

#[tokio::test]
async fn failing_planet_leaves_earlier_ones_committed() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/films/");
            then.status(200).json_body(film_page(&server));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/planets/");
            then.status(200).json_body(json!({
                "count": 2,
                "next": null,
                "results": [
                    {
                        "name": "Tatooine",
                        "climate": "arid",
                        "diameter": "10465",
                        "population": "200000",
                        "films": [server.url("/api/films/1/")]
                    },
                    {
                        "name": "Exegol",
                        "climate": "stormy",
                        "diameter": "unknown",
                        "population": "unknown",
                        "films": [server.url("/api/films/1/"), server.url("/api/films/9/")]
                    }
                ]
            }));
        })
        .await;
    let db = Db::connect_in_memory().await.unwrap();

    let err = import_official_data(&db, &config(&server)).await.unwrap_err();
    assert!(matches!(err, AppError::Upstream(ref msg) if msg.contains("/api/films/9/")));

    let counts = db.counts().await.unwrap();
    assert_eq!(counts.films, 2);
    assert_eq!(counts.planets, 1);
    assert_eq!(counts.associations, 1);
    let names: Vec<String> = planets::list(&db).await.unwrap().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Tatooine".to_string()]);
}

#[tokio::test]
async fn slow_upstream_hits_the_deadline() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/films/");
            then.status(200)
                .json_body(film_page(&server))
                .delay(Duration::from_secs(3));
        })
        .await;
    let db = Db::connect_in_memory().await.unwrap();
    let mut config = config(&server);
    config.deadline = Duration::from_millis(300);

    let err = import_official_data(&db, &config).await.unwrap_err();
    match err {
        AppError::Upstream(msg) => assert!(msg.contains("300ms"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(db.counts().await.unwrap().films, 0);
}

fn app_config(import: ImportConfig, enabled: bool) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        max_connections: 1,
        host: "127.0.0.1".into(),
        port: 0,
        allowed_origins: "*".into(),
        import_on_startup: enabled,
        import,
    }
}

#[tokio::test]
async fn startup_import_honours_the_flag_and_swallows_failures() {
    let server = MockServer::start_async().await;
    let films_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/films/");
            then.status(500);
        })
        .await;
    let db = Db::connect_in_memory().await.unwrap();

    assert_eq!(import_on_startup(&db, &app_config(config(&server), false)).await, None);
    films_mock.assert_hits_async(0).await;

    assert_eq!(import_on_startup(&db, &app_config(config(&server), true)).await, None);
    films_mock.assert_hits_async(2).await;
    assert_eq!(db.counts().await.unwrap().films, 0);
}

#[tokio::test]
async fn startup_import_reports_its_summary() {
    let server = MockServer::start_async().await;
    mock_swapi(&server).await;
    let db = Db::connect_in_memory().await.unwrap();

    let summary = import_on_startup(&db, &app_config(config(&server), true))
        .await
        .unwrap();
    assert_eq!(summary.planets_created, 3);
    assert_eq!(summary.associations_created, 4);
}
